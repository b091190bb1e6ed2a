//! Filter widgets and the widget-driven filter pipeline.
//!
//! Each filterable column owns one widget: a multi-select over unique values
//! for discrete columns, or a range selection over histogram bin centers for
//! continuous and temporal columns. Widgets are always seeded from the
//! unfiltered dataset so their option lists do not shrink as filters narrow.

use crate::data::{ColumnKind, Dataset};
use crate::error::Result;
use std::collections::HashMap;

/// Number of equal-width bins behind a numeric range widget
pub const HISTOGRAM_BINS: usize = 10;

/// Precomputed histogram backing a numeric range widget
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSource {
    pub centers: Vec<f64>,
    pub counts: Vec<usize>,
}

impl HistogramSource {
    /// Bin a numeric column into `HISTOGRAM_BINS` equal-width bins
    pub fn from_column(dataset: &Dataset, column: &str) -> Result<HistogramSource> {
        let values = dataset.numeric_values(column)?;
        let Some((min, max)) = dataset.numeric_range(column)? else {
            return Ok(HistogramSource {
                centers: Vec::new(),
                counts: Vec::new(),
            });
        };

        let width = (max - min) / HISTOGRAM_BINS as f64;
        let centers: Vec<f64> = (0..HISTOGRAM_BINS)
            .map(|i| min + width * (i as f64 + 0.5))
            .collect();
        let mut counts = vec![0usize; HISTOGRAM_BINS];
        for &v in &values {
            let idx = if width > 0.0 {
                (((v - min) / width) as usize).min(HISTOGRAM_BINS - 1)
            } else {
                0
            };
            counts[idx] += 1;
        }
        Ok(HistogramSource { centers, counts })
    }
}

/// A host-side selection pushed into a filter widget
#[derive(Debug, Clone, PartialEq)]
pub enum FilterSelection {
    /// Selected discrete values; empty clears the filter
    Values(Vec<String>),
    /// Inclusive histogram bin index range
    Range(usize, usize),
    /// Clear any selection
    None,
}

/// Per-column filter widget state
#[derive(Debug, Clone, PartialEq)]
pub enum FilterWidget {
    MultiSelect {
        options: Vec<String>,
        selected: Vec<String>,
    },
    HistogramRange {
        source: HistogramSource,
        /// Inclusive (low, high) bin index pair
        selected: Option<(usize, usize)>,
    },
}

impl FilterWidget {
    /// Create the widget for a column, seeded from the unfiltered dataset
    pub fn for_column(dataset: &Dataset, column: &str) -> Result<FilterWidget> {
        match dataset.column_kind(column)? {
            ColumnKind::Discrete => Ok(FilterWidget::MultiSelect {
                options: dataset.sorted_unique(column)?,
                selected: Vec::new(),
            }),
            ColumnKind::Continuous | ColumnKind::Temporal => Ok(FilterWidget::HistogramRange {
                source: HistogramSource::from_column(dataset, column)?,
                selected: None,
            }),
        }
    }

    pub fn set_selection(&mut self, selection: FilterSelection) {
        match (self, selection) {
            (FilterWidget::MultiSelect { selected, .. }, FilterSelection::Values(values)) => {
                *selected = values;
            }
            (FilterWidget::MultiSelect { selected, .. }, FilterSelection::None) => {
                selected.clear();
            }
            (FilterWidget::HistogramRange { source, selected }, FilterSelection::Range(lo, hi)) => {
                let last = source.centers.len().saturating_sub(1);
                *selected = Some((lo.min(last), hi.min(last)));
            }
            (FilterWidget::HistogramRange { selected, .. }, FilterSelection::None) => {
                *selected = None;
            }
            (widget, selection) => {
                log::warn!("ignoring {:?} on mismatched widget {:?}", selection, widget);
            }
        }
    }

    /// Row mask for this widget's selection, or `None` when nothing is
    /// selected and the widget does not constrain the dataset
    pub fn mask(&self, dataset: &Dataset, column: &str) -> Result<Option<Vec<bool>>> {
        match self {
            FilterWidget::MultiSelect { selected, .. } => {
                if selected.is_empty() {
                    return Ok(None);
                }
                match dataset.column(column)? {
                    crate::data::ColumnData::Discrete(values) => Ok(Some(
                        values.iter().map(|v| selected.contains(v)).collect(),
                    )),
                    _ => Ok(None),
                }
            }
            FilterWidget::HistogramRange { source, selected } => {
                let Some((lo_idx, hi_idx)) = selected else {
                    return Ok(None);
                };
                if source.centers.is_empty() {
                    return Ok(None);
                }
                let lo = source.centers[*lo_idx];
                let hi = source.centers[*hi_idx];
                let mask = dataset
                    .numeric_values(column)?
                    .iter()
                    .map(|&v| v >= lo && v <= hi)
                    .collect();
                Ok(Some(mask))
            }
        }
    }
}

/// Intersect every active widget selection, in dataset column order
pub fn apply_filters(
    dataset: &Dataset,
    widgets: &HashMap<String, FilterWidget>,
) -> Result<Dataset> {
    let mut df = dataset.clone();
    for column in dataset.names() {
        let Some(widget) = widgets.get(column) else {
            continue;
        };
        if let Some(mask) = widget.mask(&df, column)? {
            df = df.retain(&mask);
        }
    }
    log::debug!(
        "filter pipeline: {} of {} rows pass {} widget(s)",
        df.n_rows(),
        dataset.n_rows(),
        widgets.len()
    );
    Ok(df)
}
