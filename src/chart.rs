//! Renderable chart objects.
//!
//! The engine does not talk to a widget toolkit directly; it emits plain
//! data that a backend (see `render`) or a host session can consume.

/// Axis range shared across all faceted cells of a display
#[derive(Debug, Clone, PartialEq)]
pub enum AxisRange {
    /// Ordered category labels; positions are the label indices
    Categorical(Vec<String>),
    Numeric {
        start: f64,
        end: f64,
    },
}

impl AxisRange {
    /// Numeric span of the range as used by the renderer
    pub fn span(&self) -> (f64, f64) {
        match self {
            AxisRange::Categorical(labels) => (-0.5, labels.len() as f64 - 0.5),
            AxisRange::Numeric { start, end } => (*start, *end),
        }
    }

    /// Index of a category label, if this is a categorical range
    pub fn category_index(&self, value: &str) -> Option<usize> {
        match self {
            AxisRange::Categorical(labels) => labels.iter().position(|l| l == value),
            AxisRange::Numeric { .. } => None,
        }
    }
}

/// One bar rectangle, center-anchored so bars sit on the zero baseline
/// when y is half the aggregated value
#[derive(Debug, Clone, PartialEq)]
pub struct BarRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Geometry drawn into a chart
#[derive(Debug, Clone, PartialEq)]
pub enum Mark {
    Points(Vec<(f64, f64)>),
    /// Connected path in subset row order, no implicit sort
    Path(Vec<(f64, f64)>),
    Bars(Vec<BarRect>),
}

/// Which dimensions a box-style selection tool may span
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxSelectDims {
    Both,
    /// Bar charts restrict range selection to the width dimension
    WidthOnly,
}

/// The kind of geometry a chart was rendered with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Scatter,
    Line,
    Bar,
}

/// A single renderable chart.
///
/// An invalid configuration produces a chart with empty marks and a
/// diagnostic title rather than an error.
#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    pub kind: ChartKind,
    pub title: String,
    pub x_range: AxisRange,
    pub y_range: AxisRange,
    pub marks: Vec<Mark>,
    pub x_axis_visible: bool,
    pub y_axis_visible: bool,
    /// Symmetric plot frame; bar charts force this off
    pub symmetric: bool,
    pub box_select: BoxSelectDims,
}

impl Chart {
    pub fn new(kind: ChartKind, title: String, x_range: AxisRange, y_range: AxisRange) -> Chart {
        Chart {
            kind,
            title,
            x_range,
            y_range,
            marks: Vec::new(),
            x_axis_visible: true,
            y_axis_visible: true,
            symmetric: true,
            box_select: BoxSelectDims::Both,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    /// Hide the named axes; used by the grid assembler on interior cells
    pub fn hide_axes(&mut self, x: bool, y: bool) {
        if x {
            self.x_axis_visible = false;
        }
        if y {
            self.y_axis_visible = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorical_span() {
        let range = AxisRange::Categorical(vec!["A".to_string(), "B".to_string()]);
        assert_eq!(range.span(), (-0.5, 1.5));
        assert_eq!(range.category_index("B"), Some(1));
        assert_eq!(range.category_index("Z"), None);
    }

    #[test]
    fn test_hide_axes() {
        let mut chart = Chart::new(
            ChartKind::Scatter,
            "t".to_string(),
            AxisRange::Numeric {
                start: 0.0,
                end: 1.0,
            },
            AxisRange::Numeric {
                start: 0.0,
                end: 1.0,
            },
        );
        chart.hide_axes(true, false);
        assert!(!chart.x_axis_visible);
        assert!(chart.y_axis_visible);
    }
}
