//! The crossfilter controller.
//!
//! Owns the full dataset, the widget-filtered dataset, the plot
//! configuration, and the current display tree. Every mutation runs the same
//! synchronous path: update state, recompute shared ranges, rebuild the
//! display, publish. Structural errors leave the previous display intact.

use crate::chart::{AxisRange, Chart};
use crate::data::{describe_columns, ColumnDescriptor, ColumnKind, Dataset};
use crate::error::{Error, Result};
use crate::facet::{apply_facets, cross_columns, facet_title, Facet};
use crate::filter::{apply_filters, FilterSelection, FilterWidget};
use crate::grid::{assemble_1d, assemble_2d, Display, Tab};
use crate::plot::{compute_shared_ranges, make_chart, Aggregation, PlotConfig, PlotFrame, PlotType};
use std::collections::HashMap;

/// Default cap on the facet cross product before a rebuild refuses to run
pub const DEFAULT_MAX_FACET_COMBINATIONS: usize = 100;

/// Faceting and plot-dispatch engine over one tabular dataset
pub struct CrossFilter {
    df: Dataset,
    filtered: Dataset,
    descriptors: Vec<ColumnDescriptor>,
    config: PlotConfig,
    filtering_columns: Vec<String>,
    filter_widgets: HashMap<String, FilterWidget>,
    x_range: AxisRange,
    y_range: AxisRange,
    display: Option<Display>,
    pub max_facet_combinations: usize,
}

impl CrossFilter {
    /// Build a controller with default axes: the first two non-discrete
    /// columns become x and y, plotted as a scatter
    pub fn new(dataset: Dataset) -> Result<CrossFilter> {
        let descriptors = describe_columns(&dataset);
        let mut numeric = descriptors
            .iter()
            .filter(|d| d.kind != ColumnKind::Discrete)
            .map(|d| d.name.clone());
        let x = numeric.next();
        let y = numeric.next();
        let (Some(x), Some(y)) = (x, y) else {
            return Err(Error::Config(
                "dataset needs at least two numeric columns for default axes".to_string(),
            ));
        };
        log::info!(
            "crossfilter over {} rows, {} columns; default axes {} / {}",
            dataset.n_rows(),
            descriptors.len(),
            x,
            y
        );

        let config = PlotConfig {
            x,
            y,
            aggregation: Aggregation::Sum,
            plot_type: PlotType::Scatter,
            facet_x: Vec::new(),
            facet_y: Vec::new(),
            facet_tab: Vec::new(),
        };
        let mut controller = CrossFilter {
            filtered: dataset.clone(),
            df: dataset,
            descriptors,
            config,
            filtering_columns: Vec::new(),
            filter_widgets: HashMap::new(),
            x_range: AxisRange::Numeric {
                start: 0.0,
                end: 1.0,
            },
            y_range: AxisRange::Numeric {
                start: 0.0,
                end: 1.0,
            },
            display: None,
            max_facet_combinations: DEFAULT_MAX_FACET_COMBINATIONS,
        };
        controller.refresh()?;
        Ok(controller)
    }

    pub fn dataset(&self) -> &Dataset {
        &self.df
    }

    pub fn filtered(&self) -> &Dataset {
        &self.filtered
    }

    pub fn descriptors(&self) -> &[ColumnDescriptor] {
        &self.descriptors
    }

    pub fn config(&self) -> &PlotConfig {
        &self.config
    }

    pub fn filtering_columns(&self) -> &[String] {
        &self.filtering_columns
    }

    pub fn filter_widget(&self, column: &str) -> Option<&FilterWidget> {
        self.filter_widgets.get(column)
    }

    /// The last successfully built display tree
    pub fn display(&self) -> Option<&Display> {
        self.display.as_ref()
    }

    fn check_column(&self, column: &str) -> Result<()> {
        if self.df.has_column(column) {
            Ok(())
        } else {
            Err(Error::Config(format!("unknown column '{}'", column)))
        }
    }

    fn check_columns(&self, columns: &[String]) -> Result<()> {
        for column in columns {
            self.check_column(column)?;
        }
        Ok(())
    }

    pub fn set_x(&mut self, column: &str) -> Result<()> {
        self.check_column(column)?;
        self.config.x = column.to_string();
        self.refresh()
    }

    pub fn set_y(&mut self, column: &str) -> Result<()> {
        self.check_column(column)?;
        self.config.y = column.to_string();
        self.refresh()
    }

    pub fn set_aggregation(&mut self, aggregation: Aggregation) -> Result<()> {
        self.config.aggregation = aggregation;
        self.refresh()
    }

    pub fn set_plot_type(&mut self, plot_type: PlotType) -> Result<()> {
        self.config.plot_type = plot_type;
        self.refresh()
    }

    pub fn set_facet_x(&mut self, columns: Vec<String>) -> Result<()> {
        self.check_columns(&columns)?;
        self.config.facet_x = columns;
        self.refresh()
    }

    pub fn set_facet_y(&mut self, columns: Vec<String>) -> Result<()> {
        self.check_columns(&columns)?;
        self.config.facet_y = columns;
        self.refresh()
    }

    pub fn set_facet_tab(&mut self, columns: Vec<String>) -> Result<()> {
        self.check_columns(&columns)?;
        self.config.facet_tab = columns;
        self.refresh()
    }

    /// Replace the whole plot configuration in one rebuild
    pub fn apply_config(&mut self, config: PlotConfig) -> Result<()> {
        self.check_column(&config.x)?;
        self.check_column(&config.y)?;
        self.check_columns(&config.facet_x)?;
        self.check_columns(&config.facet_y)?;
        self.check_columns(&config.facet_tab)?;
        self.config = config;
        self.refresh()
    }

    /// Replace the set of filterable columns.
    ///
    /// Widgets for removed columns are dropped first, then widgets for new
    /// columns are created from the unfiltered dataset, and only then is the
    /// filtered dataset recomputed.
    pub fn set_filtering_columns(&mut self, columns: Vec<String>) -> Result<()> {
        self.check_columns(&columns)?;

        self.filter_widgets.retain(|name, _| columns.contains(name));
        for column in &columns {
            if !self.filter_widgets.contains_key(column) {
                log::debug!("creating filter widget for '{}'", column);
                let widget = FilterWidget::for_column(&self.df, column)?;
                self.filter_widgets.insert(column.clone(), widget);
            }
        }
        self.filtering_columns = columns;

        self.filtered = apply_filters(&self.df, &self.filter_widgets)?;
        self.refresh()
    }

    /// Push a selection into one filter widget and rebuild
    pub fn set_filter_selection(
        &mut self,
        column: &str,
        selection: FilterSelection,
    ) -> Result<()> {
        let widget = self.filter_widgets.get_mut(column).ok_or_else(|| {
            Error::Config(format!("'{}' is not a filtering column", column))
        })?;
        widget.set_selection(selection);
        self.filtered = apply_filters(&self.df, &self.filter_widgets)?;
        self.refresh()
    }

    /// Recompute shared ranges and rebuild the display tree.
    ///
    /// On error the previous display stays published.
    pub fn refresh(&mut self) -> Result<()> {
        let (x_range, y_range) = compute_shared_ranges(&self.config, &self.df)?;
        self.x_range = x_range;
        self.y_range = y_range;

        let display = self.build_display()?;
        log::debug!("publishing {:?} display", display.shape());
        self.display = Some(display);
        Ok(())
    }

    fn build_display(&self) -> Result<Display> {
        if self.df.n_rows() == 0 {
            return Ok(Display::Message("No data to display.".to_string()));
        }

        if self.config.facet_tab.is_empty() {
            return self.build_page(&[]);
        }

        // 1. one facet combination per tab, built from the full dataset
        let combos = cross_columns(
            &self.df,
            &self.config.facet_tab,
            self.max_facet_combinations,
        )?;

        // 2. each tab holds a full page filtered by its combination
        let mut tabs = Vec::with_capacity(combos.len());
        for combo in &combos {
            tabs.push(Tab {
                label: facet_title(combo),
                content: Box::new(self.build_page(combo)?),
            });
        }
        Ok(Display::Tabs(tabs))
    }

    /// One page: a single chart, a 1-D grid, or a 2-D grid, additionally
    /// filtered by any active tab facets
    fn build_page(&self, tab_facets: &[Facet]) -> Result<Display> {
        let has_x = !self.config.facet_x.is_empty();
        let has_y = !self.config.facet_y.is_empty();

        match (has_x, has_y) {
            (false, false) => {
                // Tab filtering alone does not make the cell faceted, so an
                // empty tab subset still gets the filtered-out diagnostic
                let chart = self.facet_chart(&[], tab_facets, None, false)?;
                Ok(Display::Chart(chart))
            }
            (true, false) | (false, true) => {
                let fields = if has_x {
                    &self.config.facet_x
                } else {
                    &self.config.facet_y
                };
                let combos = cross_columns(&self.df, fields, self.max_facet_combinations)?;
                let mut charts = Vec::with_capacity(combos.len());
                for combo in &combos {
                    let title = facet_title(combo);
                    charts.push(self.facet_chart(combo, tab_facets, Some(title), true)?);
                }
                Ok(assemble_1d(charts))
            }
            (true, true) => {
                let x_combos =
                    cross_columns(&self.df, &self.config.facet_x, self.max_facet_combinations)?;
                let y_combos =
                    cross_columns(&self.df, &self.config.facet_y, self.max_facet_combinations)?;
                let count = x_combos.len() * y_combos.len();
                if count > self.max_facet_combinations {
                    return Err(Error::TooManyFacets {
                        count,
                        max: self.max_facet_combinations,
                    });
                }

                // rows indexed by y-facet, columns by x-facet
                let mut rows = Vec::with_capacity(y_combos.len());
                for y_combo in &y_combos {
                    let mut row = Vec::with_capacity(x_combos.len());
                    for x_combo in &x_combos {
                        let mut combo = x_combo.clone();
                        combo.extend(y_combo.iter().cloned());
                        let title = facet_title(&combo);
                        row.push(self.facet_chart(&combo, tab_facets, Some(title), true)?);
                    }
                    rows.push(row);
                }
                Ok(assemble_2d(rows))
            }
        }
    }

    /// Render one chart over the widget-filtered dataset, transiently
    /// narrowed by the cell's facets
    fn facet_chart(
        &self,
        facets: &[Facet],
        tab_facets: &[Facet],
        title_override: Option<String>,
        faceted: bool,
    ) -> Result<Chart> {
        let mut subset = apply_facets(&self.filtered, tab_facets)?;
        subset = apply_facets(&subset, facets)?;
        let frame = PlotFrame {
            config: &self.config,
            subset: &subset,
            x_range: &self.x_range,
            y_range: &self.y_range,
            faceted,
            title_override,
        };
        make_chart(&frame)
    }
}
