use anyhow::{bail, Context, Result};
use clap::Parser;
use crossplot::filter::FilterSelection;
use crossplot::render::render_display;
use crossplot::{Aggregation, CrossFilter, Dataset, Display, PlotConfig, PlotType};
use serde::Deserialize;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "crossplot")]
#[command(about = "Explore CSV data as faceted scatter, line, and bar charts", long_about = None)]
struct Args {
    /// CSV input path; reads stdin when omitted
    input: Option<PathBuf>,

    /// Column for the x axis (default: first numeric column)
    #[arg(long)]
    x: Option<String>,

    /// Column for the y axis (default: second numeric column)
    #[arg(long)]
    y: Option<String>,

    /// Plot type: scatter, line, or bar (default: scatter)
    #[arg(long)]
    plot_type: Option<PlotType>,

    /// Bar aggregation: sum, mean, or last (default: sum)
    #[arg(long)]
    agg: Option<Aggregation>,

    /// Facet column along the x dimension (repeatable)
    #[arg(long)]
    facet_x: Vec<String>,

    /// Facet column along the y dimension (repeatable)
    #[arg(long)]
    facet_y: Vec<String>,

    /// Facet column along the tab dimension (repeatable)
    #[arg(long)]
    facet_tab: Vec<String>,

    /// Discrete filter, e.g. --filter category=A,B (repeatable)
    #[arg(long)]
    filter: Vec<String>,

    /// JSON session file holding a plot configuration and filtering columns
    #[arg(long)]
    session: Option<PathBuf>,

    /// Output PNG path; writes stdout when omitted (tabs require a path)
    #[arg(long, short)]
    output: Option<PathBuf>,

    #[arg(long, default_value_t = 800)]
    width: u32,

    #[arg(long, default_value_t = 600)]
    height: u32,
}

#[derive(Debug, Deserialize)]
struct Session {
    config: PlotConfig,
    #[serde(default)]
    filtering_columns: Vec<String>,
}

fn parse_filter(raw: &str) -> Result<(String, Vec<String>)> {
    let Some((column, values)) = raw.split_once('=') else {
        bail!("filter '{}' is not of the form column=v1,v2", raw);
    };
    let values = values.split(',').map(str::to_string).collect();
    Ok((column.to_string(), values))
}

/// File-system-safe version of a tab label
fn sanitize(label: &str) -> String {
    label
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
        .collect()
}

fn write_png(path: Option<&PathBuf>, bytes: &[u8]) -> Result<()> {
    match path {
        Some(path) => {
            fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(bytes)
                .context("Failed to write PNG to stdout")?;
            handle.flush().context("Failed to flush stdout")
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    // 1. Ingest the dataset
    let dataset = match &args.input {
        Some(path) => Dataset::from_csv_path(path)
            .with_context(|| format!("Failed to read CSV from {}", path.display()))?,
        None => Dataset::from_csv_reader(io::stdin()).context("Failed to read CSV from stdin")?,
    };

    let mut crossfilter =
        CrossFilter::new(dataset).context("Failed to initialize the crossfilter")?;

    // 2. Session file first, so explicit flags can override it
    let mut filtering_columns: Vec<String> = Vec::new();
    if let Some(path) = &args.session {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read session {}", path.display()))?;
        let session: Session =
            serde_json::from_str(&raw).context("Failed to parse session JSON")?;
        crossfilter
            .apply_config(session.config)
            .context("Failed to apply session configuration")?;
        filtering_columns = session.filtering_columns;
    }

    // 3. Flag overrides
    let mut config = crossfilter.config().clone();
    if let Some(x) = &args.x {
        config.x = x.clone();
    }
    if let Some(y) = &args.y {
        config.y = y.clone();
    }
    if let Some(plot_type) = args.plot_type {
        config.plot_type = plot_type;
    }
    if let Some(agg) = args.agg {
        config.aggregation = agg;
    }
    if !args.facet_x.is_empty() {
        config.facet_x = args.facet_x.clone();
    }
    if !args.facet_y.is_empty() {
        config.facet_y = args.facet_y.clone();
    }
    if !args.facet_tab.is_empty() {
        config.facet_tab = args.facet_tab.clone();
    }
    crossfilter
        .apply_config(config)
        .context("Failed to apply plot configuration")?;

    // 4. Filters: register the filtering columns, then push selections
    let filters: Vec<(String, Vec<String>)> = args
        .filter
        .iter()
        .map(|raw| parse_filter(raw))
        .collect::<Result<_>>()?;
    for (column, _) in &filters {
        if !filtering_columns.contains(column) {
            filtering_columns.push(column.clone());
        }
    }
    if !filtering_columns.is_empty() {
        crossfilter
            .set_filtering_columns(filtering_columns)
            .context("Failed to set filtering columns")?;
    }
    for (column, values) in filters {
        crossfilter
            .set_filter_selection(&column, FilterSelection::Values(values))
            .with_context(|| format!("Failed to apply filter on '{}'", column))?;
    }

    // 5. Render the published display
    let display = crossfilter
        .display()
        .context("No display was produced")?;

    if let Display::Tabs(tabs) = display {
        let Some(output) = &args.output else {
            bail!("tab-faceted output needs --output to name the per-tab files");
        };
        let stem = output
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("crossplot");
        for tab in tabs {
            let bytes = render_display(&tab.content, args.width, args.height)
                .with_context(|| format!("Failed to render tab '{}'", tab.label))?;
            let path = output.with_file_name(format!("{}-{}.png", stem, sanitize(&tab.label)));
            write_png(Some(&path), &bytes)?;
            log::info!("wrote {}", path.display());
        }
        return Ok(());
    }

    let bytes =
        render_display(display, args.width, args.height).context("Failed to render display")?;
    write_png(args.output.as_ref(), &bytes)
}
