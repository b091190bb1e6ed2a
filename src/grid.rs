//! Grid assembly and the final display tree.
//!
//! Faceted charts arrive as a flat list (1-D faceting) or as rows keyed by
//! y-facet (2-D faceting). This module reflows, de-duplicates interior axis
//! labels, and wraps the result in a `Display` tree the host can render.

use crate::chart::Chart;

/// One tab of a tabbed display, labeled by its facet title
#[derive(Debug, Clone, PartialEq)]
pub struct Tab {
    pub label: String,
    pub content: Box<Display>,
}

/// The renderable output of one rebuild
#[derive(Debug, Clone, PartialEq)]
pub enum Display {
    /// Unfaceted: a single chart
    Chart(Chart),
    /// Faceted: rows of charts
    Grid(Vec<Vec<Chart>>),
    /// Tab-faceted: one tab per tab-facet combination
    Tabs(Vec<Tab>),
    /// Top-level diagnostic, e.g. an empty dataset
    Message(String),
}

/// How a display was produced, used in logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayShape {
    Chart,
    Grid,
    Tabs,
    Message,
}

impl Display {
    pub fn shape(&self) -> DisplayShape {
        match self {
            Display::Chart(_) => DisplayShape::Chart,
            Display::Grid(_) => DisplayShape::Grid,
            Display::Tabs(_) => DisplayShape::Tabs,
            Display::Message(_) => DisplayShape::Message,
        }
    }
}

/// Reflow a flat chart list into a roughly square grid with
/// `ceil(sqrt(n))` columns per row
pub fn reflow(charts: Vec<Chart>) -> Vec<Vec<Chart>> {
    if charts.is_empty() {
        return Vec::new();
    }
    let chunk_size = (charts.len() as f64).sqrt().ceil() as usize;
    let mut rows = Vec::new();
    let mut iter = charts.into_iter().peekable();
    while iter.peek().is_some() {
        rows.push(iter.by_ref().take(chunk_size).collect());
    }
    rows
}

/// Suppress redundant axis labels on interior grid cells.
///
/// A cell keeps its y axis only in the first column, and keeps its x axis
/// only when no cell sits beneath it: the bottom row, or a cell the short
/// final row does not reach. This keeps a staircase-shaped last row from
/// leaving unlabeled columns.
pub fn hide_interior_axes(rows: &mut [Vec<Chart>]) {
    let row_count = rows.len();
    for i in 0..row_count {
        let is_bottom = i + 1 == row_count;
        let next_is_bottom = i + 2 == row_count;
        let next_len = if is_bottom { 0 } else { rows[i + 1].len() };

        for (j, chart) in rows[i].iter_mut().enumerate() {
            if j != 0 {
                if is_bottom || (next_is_bottom && j >= next_len) {
                    chart.hide_axes(false, true);
                } else {
                    chart.hide_axes(true, true);
                }
            } else if !is_bottom {
                chart.hide_axes(true, false);
            }
        }
    }
}

/// Assemble a 1-D faceted chart list into a grid display
pub fn assemble_1d(charts: Vec<Chart>) -> Display {
    let mut rows = reflow(charts);
    hide_interior_axes(&mut rows);
    Display::Grid(rows)
}

/// Assemble a 2-D faceted grid, rows indexed by y-facet and columns by x-facet
pub fn assemble_2d(mut rows: Vec<Vec<Chart>>) -> Display {
    hide_interior_axes(&mut rows);
    Display::Grid(rows)
}
