//! PNG rendering backend.
//!
//! Draws a `Display` tree into an RGB buffer and encodes it as PNG. Grid
//! cells share one bitmap split evenly; hidden axes collapse their label
//! areas so interior cells butt against each other.

use crate::chart::{AxisRange, Chart, Mark};
use crate::error::{Error, Result};
use crate::grid::Display;
use image::ImageEncoder;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::ops::Range;

fn render_err<E: std::fmt::Display>(e: E) -> Error {
    Error::Render(e.to_string())
}

/// Pad a data span so degenerate and edge-hugging ranges stay visible
fn padded(span: (f64, f64)) -> Range<f64> {
    let (min, max) = span;
    if min == max {
        (min - 1.0)..(max + 1.0)
    } else {
        let padding = (max - min) * 0.05;
        (min - padding)..(max + padding)
    }
}

fn axis_label(value: f64, labels: &[String]) -> String {
    if labels.is_empty() {
        return format!("{:.1}", value);
    }
    let idx = value.round();
    if idx < 0.0 || (value - idx).abs() > 0.25 {
        return String::new();
    }
    labels.get(idx as usize).cloned().unwrap_or_default()
}

fn draw_chart<DB: DrawingBackend>(area: &DrawingArea<DB, Shift>, chart: &Chart) -> Result<()> {
    area.fill(&WHITE).map_err(render_err)?;

    let x_labels = match &chart.x_range {
        AxisRange::Categorical(labels) => labels.clone(),
        AxisRange::Numeric { .. } => Vec::new(),
    };
    let y_labels = match &chart.y_range {
        AxisRange::Categorical(labels) => labels.clone(),
        AxisRange::Numeric { .. } => Vec::new(),
    };

    let mut ctx = ChartBuilder::on(area)
        .margin(10)
        .caption(&chart.title, ("sans-serif", 16))
        .x_label_area_size(if chart.x_axis_visible { 40 } else { 0 })
        .y_label_area_size(if chart.y_axis_visible { 50 } else { 0 })
        .build_cartesian_2d(padded(chart.x_range.span()), padded(chart.y_range.span()))
        .map_err(render_err)?;

    ctx.configure_mesh()
        .x_labels(if x_labels.is_empty() {
            10
        } else {
            x_labels.len()
        })
        .y_labels(if y_labels.is_empty() {
            10
        } else {
            y_labels.len()
        })
        .x_label_formatter(&|v| axis_label(*v, &x_labels))
        .y_label_formatter(&|v| axis_label(*v, &y_labels))
        .draw()
        .map_err(render_err)?;

    for mark in &chart.marks {
        match mark {
            Mark::Points(points) => {
                ctx.draw_series(
                    points
                        .iter()
                        .filter(|(x, y)| !x.is_nan() && !y.is_nan())
                        .map(|&(x, y)| Circle::new((x, y), 3, BLUE.filled())),
                )
                .map_err(render_err)?;
            }
            Mark::Path(points) => {
                let clean: Vec<(f64, f64)> = points
                    .iter()
                    .filter(|(x, y)| !x.is_nan() && !y.is_nan())
                    .copied()
                    .collect();
                ctx.draw_series(LineSeries::new(clean, BLUE.stroke_width(1)))
                    .map_err(render_err)?;
            }
            Mark::Bars(rects) => {
                for rect in rects {
                    if rect.x.is_nan() {
                        continue;
                    }
                    ctx.draw_series(std::iter::once(Rectangle::new(
                        [
                            (rect.x - rect.width / 2.0, rect.y - rect.height / 2.0),
                            (rect.x + rect.width / 2.0, rect.y + rect.height / 2.0),
                        ],
                        BLUE.mix(0.8).filled(),
                    )))
                    .map_err(render_err)?;
                }
            }
        }
    }
    Ok(())
}

fn draw_message<DB: DrawingBackend>(area: &DrawingArea<DB, Shift>, message: &str) -> Result<()> {
    area.fill(&WHITE).map_err(render_err)?;
    let (_, height) = area.dim_in_pixel();
    area.draw(&Text::new(
        message.to_string(),
        (20, height as i32 / 2),
        ("sans-serif", 20),
    ))
    .map_err(render_err)?;
    Ok(())
}

/// Render a display tree to PNG bytes.
///
/// A tabbed display renders its first tab; callers wanting every tab render
/// each tab's content separately.
pub fn render_display(display: &Display, width: u32, height: u32) -> Result<Vec<u8>> {
    if let Display::Tabs(tabs) = display {
        return match tabs.first() {
            Some(tab) => render_display(&tab.content, width, height),
            None => render_display(&Display::Message("No tabs to display.".to_string()), width, height),
        };
    }

    let mut buffer = vec![0u8; (width * height * 3) as usize];
    {
        let root =
            BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        match display {
            Display::Chart(chart) => draw_chart(&root, chart)?,
            Display::Grid(rows) => {
                root.fill(&WHITE).map_err(render_err)?;
                let n_rows = rows.len().max(1);
                let n_cols = rows.iter().map(|r| r.len()).max().unwrap_or(1).max(1);
                let cells = root.split_evenly((n_rows, n_cols));
                for (i, row) in rows.iter().enumerate() {
                    for (j, chart) in row.iter().enumerate() {
                        draw_chart(&cells[i * n_cols + j], chart)?;
                    }
                }
            }
            Display::Message(message) => draw_message(&root, message)?,
            Display::Tabs(_) => unreachable!("tabs handled above"),
        }
        root.present().map_err(render_err)?;
    }

    let mut png_bytes = Vec::new();
    {
        let encoder = image::codecs::png::PngEncoder::new(&mut png_bytes);
        encoder
            .write_image(&buffer, width, height, image::ColorType::Rgb8)
            .map_err(render_err)?;
    }
    Ok(png_bytes)
}
