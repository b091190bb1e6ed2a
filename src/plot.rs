//! Plot-type plugins.
//!
//! Each plot type implements the same contract: validate a filtered subset,
//! optionally transform it (bar aggregation), compute the shared axis ranges
//! for the full dataset, and emit a renderable `Chart`. Dispatch is a closed
//! table keyed by `PlotType`; there is no runtime registration.

use crate::chart::{AxisRange, BarRect, BoxSelectDims, Chart, ChartKind, Mark};
use crate::data::{ColumnKind, Dataset};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// Relative bar width in category units
pub const BAR_WIDTH: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlotType {
    Scatter,
    Line,
    Bar,
}

impl PlotType {
    fn chart_kind(self) -> ChartKind {
        match self {
            PlotType::Scatter => ChartKind::Scatter,
            PlotType::Line => ChartKind::Line,
            PlotType::Bar => ChartKind::Bar,
        }
    }
}

impl FromStr for PlotType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "scatter" => Ok(PlotType::Scatter),
            "line" => Ok(PlotType::Line),
            "bar" => Ok(PlotType::Bar),
            other => Err(Error::Config(format!("unknown plot type '{}'", other))),
        }
    }
}

/// How bar charts aggregate the value axis within each group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    Sum,
    Mean,
    Last,
}

impl Aggregation {
    pub fn name(self) -> &'static str {
        match self {
            Aggregation::Sum => "sum",
            Aggregation::Mean => "mean",
            Aggregation::Last => "last",
        }
    }

    fn apply(self, values: &[f64]) -> f64 {
        match self {
            Aggregation::Sum => values.iter().sum(),
            Aggregation::Mean => {
                if values.is_empty() {
                    0.0
                } else {
                    values.iter().sum::<f64>() / values.len() as f64
                }
            }
            Aggregation::Last => values.last().copied().unwrap_or(0.0),
        }
    }
}

impl FromStr for Aggregation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sum" => Ok(Aggregation::Sum),
            "mean" => Ok(Aggregation::Mean),
            "last" => Ok(Aggregation::Last),
            other => Err(Error::Config(format!("unknown aggregation '{}'", other))),
        }
    }
}

/// The controller-owned plot configuration, passed by reference into the
/// pure plugin functions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotConfig {
    pub x: String,
    pub y: String,
    pub aggregation: Aggregation,
    pub plot_type: PlotType,
    #[serde(default)]
    pub facet_x: Vec<String>,
    #[serde(default)]
    pub facet_y: Vec<String>,
    #[serde(default)]
    pub facet_tab: Vec<String>,
}

/// Everything a plugin needs to produce one chart
pub struct PlotFrame<'a> {
    pub config: &'a PlotConfig,
    pub subset: &'a Dataset,
    pub x_range: &'a AxisRange,
    pub y_range: &'a AxisRange,
    pub faceted: bool,
    pub title_override: Option<String>,
}

/// The per-plot-type strategy.
///
/// `validate` returns a diagnostic title for degenerate configurations;
/// it never raises. `render_marks` is only called for valid frames.
pub trait PlotPlugin {
    fn validate(&self, frame: &PlotFrame) -> Option<String>;
    fn default_title(&self, config: &PlotConfig) -> String;
    fn render_marks(&self, frame: &PlotFrame) -> Result<Vec<Mark>>;
    fn shared_ranges(&self, config: &PlotConfig, dataset: &Dataset)
        -> Result<(AxisRange, AxisRange)>;
}

static SCATTER: ScatterPlugin = ScatterPlugin;
static LINE: LinePlugin = LinePlugin;
static BAR: BarPlugin = BarPlugin;

/// Closed dispatch table from plot type to plugin
pub fn plugin_for(plot_type: PlotType) -> &'static dyn PlotPlugin {
    match plot_type {
        PlotType::Scatter => &SCATTER,
        PlotType::Line => &LINE,
        PlotType::Bar => &BAR,
    }
}

/// Build one chart: validate, then render marks only when valid.
///
/// A failed validation flips the chart to an empty figure with the
/// diagnostic title; it never aborts the surrounding rebuild.
pub fn make_chart(frame: &PlotFrame) -> Result<Chart> {
    let plot_type = frame.config.plot_type;
    let plugin = plugin_for(plot_type);

    let title = frame
        .title_override
        .clone()
        .unwrap_or_else(|| plugin.default_title(frame.config));

    let mut chart = Chart::new(
        plot_type.chart_kind(),
        title,
        frame.x_range.clone(),
        frame.y_range.clone(),
    );
    if plot_type == PlotType::Bar {
        chart.symmetric = false;
        chart.box_select = BoxSelectDims::WidthOnly;
    }

    if let Some(diagnostic) = plugin.validate(frame) {
        log::debug!("chart invalid: {}", diagnostic);
        chart.title = diagnostic;
        return Ok(chart);
    }

    chart.marks = plugin.render_marks(frame)?;
    Ok(chart)
}

/// Resolve one row of a column to a plot coordinate: category index for
/// discrete columns, raw value otherwise
fn coordinates(dataset: &Dataset, column: &str, range: &AxisRange) -> Result<Vec<f64>> {
    match dataset.column(column)? {
        crate::data::ColumnData::Discrete(values) => Ok(values
            .iter()
            .map(|v| range.category_index(v).map(|i| i as f64).unwrap_or(f64::NAN))
            .collect()),
        _ => dataset.numeric_values(column),
    }
}

fn xy_points(frame: &PlotFrame) -> Result<Vec<(f64, f64)>> {
    let xs = coordinates(frame.subset, &frame.config.x, frame.x_range)?;
    let ys = coordinates(frame.subset, &frame.config.y, frame.y_range)?;
    Ok(xs.into_iter().zip(ys).collect())
}

/// Shared ranges for point-style plots: categorical over sorted unique
/// values for discrete columns, observed min/max otherwise
fn point_axis_range(dataset: &Dataset, column: &str) -> Result<AxisRange> {
    match dataset.column_kind(column)? {
        ColumnKind::Discrete => Ok(AxisRange::Categorical(dataset.sorted_unique(column)?)),
        ColumnKind::Continuous | ColumnKind::Temporal => {
            let (start, end) = dataset.numeric_range(column)?.unwrap_or((0.0, 1.0));
            Ok(AxisRange::Numeric { start, end })
        }
    }
}

/// Base validation shared by scatter and line: outside faceting, an empty
/// axis column means everything was filtered away
fn validate_nonempty(frame: &PlotFrame) -> Option<String> {
    if frame.faceted {
        return None;
    }
    let x_empty = frame
        .subset
        .column(&frame.config.x)
        .map(|c| c.is_empty())
        .unwrap_or(true);
    let y_empty = frame
        .subset
        .column(&frame.config.y)
        .map(|c| c.is_empty())
        .unwrap_or(true);
    if x_empty || y_empty {
        Some("All data is filtered out.".to_string())
    } else {
        None
    }
}

struct ScatterPlugin;

impl PlotPlugin for ScatterPlugin {
    fn validate(&self, frame: &PlotFrame) -> Option<String> {
        validate_nonempty(frame)
    }

    fn default_title(&self, config: &PlotConfig) -> String {
        format!("{} by {}", config.y, config.x)
    }

    fn render_marks(&self, frame: &PlotFrame) -> Result<Vec<Mark>> {
        Ok(vec![Mark::Points(xy_points(frame)?)])
    }

    fn shared_ranges(
        &self,
        config: &PlotConfig,
        dataset: &Dataset,
    ) -> Result<(AxisRange, AxisRange)> {
        Ok((
            point_axis_range(dataset, &config.x)?,
            point_axis_range(dataset, &config.y)?,
        ))
    }
}

struct LinePlugin;

impl PlotPlugin for LinePlugin {
    fn validate(&self, frame: &PlotFrame) -> Option<String> {
        validate_nonempty(frame)
    }

    fn default_title(&self, config: &PlotConfig) -> String {
        format!("{} by {}", config.y, config.x)
    }

    fn render_marks(&self, frame: &PlotFrame) -> Result<Vec<Mark>> {
        // Path follows subset row order; no implicit sort
        Ok(vec![Mark::Path(xy_points(frame)?)])
    }

    fn shared_ranges(
        &self,
        config: &PlotConfig,
        dataset: &Dataset,
    ) -> Result<(AxisRange, AxisRange)> {
        Ok((
            point_axis_range(dataset, &config.x)?,
            point_axis_range(dataset, &config.y)?,
        ))
    }
}

struct BarPlugin;

impl BarPlugin {
    fn config_usable(config: &PlotConfig, dataset: &Dataset) -> bool {
        config.x != config.y
            && dataset
                .column_kind(&config.y)
                .map(|k| k != ColumnKind::Discrete)
                .unwrap_or(false)
    }
}

impl PlotPlugin for BarPlugin {
    fn validate(&self, frame: &PlotFrame) -> Option<String> {
        // Later checks win, matching the cascade of the per-case titles
        let mut diagnostic = validate_nonempty(frame);

        let y_kind = frame.subset.column_kind(&frame.config.y).ok();
        if y_kind == Some(ColumnKind::Discrete) {
            diagnostic = Some("Bar does not support discrete y column".to_string());
        }
        if frame.config.x == frame.config.y {
            diagnostic = Some("Bar does not support x and y of same column".to_string());
        }
        if frame.subset.n_rows() == 0 {
            diagnostic = Some("All data is filtered out".to_string());
        }
        diagnostic
    }

    fn default_title(&self, config: &PlotConfig) -> String {
        format!(
            "{}({}) by {}",
            config.aggregation.name(),
            config.y,
            config.x
        )
    }

    fn render_marks(&self, frame: &PlotFrame) -> Result<Vec<Mark>> {
        let groups = aggregate_by(
            frame.subset,
            &frame.config.x,
            &frame.config.y,
            frame.config.aggregation,
        )?;
        let rects = groups
            .into_iter()
            .map(|(key, value)| {
                let x = match &key {
                    GroupKey::Category(label) => frame
                        .x_range
                        .category_index(label)
                        .map(|i| i as f64)
                        .unwrap_or(f64::NAN),
                    GroupKey::Value(v) => *v,
                };
                // Center at half the value so the bar sits on the baseline
                BarRect {
                    x,
                    y: value / 2.0,
                    width: BAR_WIDTH,
                    height: value,
                }
            })
            .collect();
        Ok(vec![Mark::Bars(rects)])
    }

    fn shared_ranges(
        &self,
        config: &PlotConfig,
        dataset: &Dataset,
    ) -> Result<(AxisRange, AxisRange)> {
        // Degenerate bar configurations still need ranges for the titled
        // empty chart that validation will produce
        if !Self::config_usable(config, dataset) || dataset.n_rows() == 0 {
            let unit = AxisRange::Numeric {
                start: 0.0,
                end: 1.0,
            };
            return Ok((unit.clone(), unit));
        }

        let groups = aggregate_by(dataset, &config.x, &config.y, config.aggregation)?;
        let x_range = match dataset.column_kind(&config.x)? {
            ColumnKind::Discrete => AxisRange::Categorical(
                groups
                    .iter()
                    .map(|(key, _)| match key {
                        GroupKey::Category(label) => label.clone(),
                        GroupKey::Value(v) => v.to_string(),
                    })
                    .collect(),
            ),
            ColumnKind::Continuous | ColumnKind::Temporal => {
                let (min, max) = dataset.numeric_range(&config.x)?.unwrap_or((0.0, 1.0));
                AxisRange::Numeric {
                    start: min - BAR_WIDTH,
                    end: max - BAR_WIDTH,
                }
            }
        };
        let top = groups
            .iter()
            .map(|(_, v)| *v)
            .fold(f64::NEG_INFINITY, f64::max);
        let y_range = AxisRange::Numeric {
            start: 0.0,
            end: if top.is_finite() { top } else { 1.0 },
        };
        Ok((x_range, y_range))
    }
}

/// Key of one aggregation group
#[derive(Debug, Clone, PartialEq)]
pub enum GroupKey {
    Category(String),
    Value(f64),
}

/// Group the y column by the x column and aggregate each group.
///
/// Discrete x groups by category with keys sorted; numeric x groups rows
/// sharing the same value, keys ascending. Values within a group keep row
/// order so `last` is well defined.
pub fn aggregate_by(
    dataset: &Dataset,
    x: &str,
    y: &str,
    aggregation: Aggregation,
) -> Result<Vec<(GroupKey, f64)>> {
    let y_values = dataset.numeric_values(y)?;

    match dataset.column(x)? {
        crate::data::ColumnData::Discrete(categories) => {
            let mut groups: HashMap<&str, Vec<f64>> = HashMap::new();
            for (cat, &val) in categories.iter().zip(&y_values) {
                groups.entry(cat.as_str()).or_default().push(val);
            }
            let mut keys: Vec<&str> = groups.keys().copied().collect();
            keys.sort();
            Ok(keys
                .into_iter()
                .map(|k| {
                    (
                        GroupKey::Category(k.to_string()),
                        aggregation.apply(&groups[k]),
                    )
                })
                .collect())
        }
        _ => {
            let x_values = dataset.numeric_values(x)?;
            // Insertion-ordered grouping keeps `last` meaningful, then sort keys
            let mut order: Vec<f64> = Vec::new();
            let mut groups: Vec<Vec<f64>> = Vec::new();
            for (&xv, &yv) in x_values.iter().zip(&y_values) {
                match order.iter().position(|&k| k == xv) {
                    Some(i) => groups[i].push(yv),
                    None => {
                        order.push(xv);
                        groups.push(vec![yv]);
                    }
                }
            }
            let mut pairs: Vec<(f64, f64)> = order
                .into_iter()
                .zip(groups)
                .map(|(k, vs)| (k, aggregation.apply(&vs)))
                .collect();
            pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
            Ok(pairs
                .into_iter()
                .map(|(k, v)| (GroupKey::Value(k), v))
                .collect())
        }
    }
}

/// Shared ranges for the active plot type, computed once per full dataset
/// so every faceted cell uses the same axes
pub fn compute_shared_ranges(
    config: &PlotConfig,
    dataset: &Dataset,
) -> Result<(AxisRange, AxisRange)> {
    plugin_for(config.plot_type).shared_ranges(config, dataset)
}
