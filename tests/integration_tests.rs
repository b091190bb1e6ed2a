use crossplot::chart::Chart;
use crossplot::data::{ColumnData, Dataset};
use crossplot::filter::FilterSelection;
use crossplot::grid::Display;
use crossplot::{CrossFilter, PlotType};
use std::process::{Command, Stdio};

/// Dataset with a two-value discrete column and two numeric columns
fn make_dataset() -> Dataset {
    Dataset::new(vec![
        (
            "category".to_string(),
            ColumnData::Discrete(vec![
                "A".to_string(),
                "B".to_string(),
                "A".to_string(),
                "B".to_string(),
            ]),
        ),
        (
            "value".to_string(),
            ColumnData::Continuous(vec![1.0, 2.0, 3.0, 4.0]),
        ),
        (
            "weight".to_string(),
            ColumnData::Continuous(vec![10.0, 20.0, 30.0, 40.0]),
        ),
    ])
    .unwrap()
}

fn grid_charts(display: &Display) -> Vec<&Chart> {
    match display {
        Display::Grid(rows) => rows.iter().flatten().collect(),
        other => panic!("expected grid, got {:?}", other.shape()),
    }
}

#[test]
fn test_facet_x_scatter_grid() {
    let mut cf = CrossFilter::new(make_dataset()).unwrap();
    cf.set_facet_x(vec!["category".to_string()]).unwrap();

    let charts = grid_charts(cf.display().unwrap());
    assert_eq!(charts.len(), 2);
    assert_eq!(charts[0].title, "category:A");
    assert_eq!(charts[1].title, "category:B");

    // Each cell holds only the rows of its category
    match &charts[0].marks[0] {
        crossplot::chart::Mark::Points(points) => {
            let ys: Vec<f64> = points.iter().map(|p| p.1).collect();
            assert_eq!(ys, vec![10.0, 30.0]);
        }
        other => panic!("expected points, got {:?}", other),
    }
}

#[test]
fn test_filter_column_removal_restores_rows() {
    let mut cf = CrossFilter::new(make_dataset()).unwrap();
    cf.set_filtering_columns(vec!["category".to_string()])
        .unwrap();
    cf.set_filter_selection("category", FilterSelection::Values(vec!["A".to_string()]))
        .unwrap();
    assert_eq!(cf.filtered().n_rows(), 2);

    cf.set_filtering_columns(Vec::new()).unwrap();
    assert_eq!(cf.filtered().n_rows(), 4);
    assert!(cf.filter_widget("category").is_none());
}

#[test]
fn test_rebuild_is_idempotent() {
    let mut cf = CrossFilter::new(make_dataset()).unwrap();
    cf.set_facet_x(vec!["category".to_string()]).unwrap();
    cf.set_filtering_columns(vec!["category".to_string()])
        .unwrap();

    let first = cf.display().cloned();
    cf.refresh().unwrap();
    let second = cf.display().cloned();
    assert_eq!(first, second);
}

#[test]
fn test_tabs_of_grids() {
    let mut cf = CrossFilter::new(make_dataset()).unwrap();
    cf.set_facet_tab(vec!["category".to_string()]).unwrap();
    cf.set_facet_x(vec!["category".to_string()]).unwrap();

    match cf.display().unwrap() {
        Display::Tabs(tabs) => {
            assert_eq!(tabs.len(), 2);
            assert_eq!(tabs[0].label, "category:A");
            // Tab A's grid still shows both x-facet cells; the B cell has no
            // rows left after the tab filter
            let charts = grid_charts(&tabs[0].content);
            assert_eq!(charts.len(), 2);
            match &charts[1].marks[0] {
                crossplot::chart::Mark::Points(points) => assert!(points.is_empty()),
                other => panic!("expected points, got {:?}", other),
            }
        }
        other => panic!("expected tabs, got {:?}", other.shape()),
    }
}

#[test]
fn test_bar_with_discrete_y_soft_fails() {
    let mut cf = CrossFilter::new(make_dataset()).unwrap();
    cf.set_y("category").unwrap();
    cf.set_plot_type(PlotType::Bar).unwrap();

    match cf.display().unwrap() {
        Display::Chart(chart) => {
            assert!(chart.is_empty());
            assert_eq!(chart.title, "Bar does not support discrete y column");
        }
        other => panic!("expected chart, got {:?}", other.shape()),
    }
}

#[test]
fn test_quantile_facets_on_continuous_column() {
    let mut cf = CrossFilter::new(make_dataset()).unwrap();
    cf.set_facet_y(vec!["value".to_string()]).unwrap();

    let charts = grid_charts(cf.display().unwrap());
    assert_eq!(charts.len(), 4);
    for chart in &charts {
        assert!(chart.title.starts_with("value:"));
    }
}

/// Run the binary against a CSV fixture
fn run_crossplot(args: &[&str]) -> Result<Vec<u8>, String> {
    let mut full_args = vec!["run", "--bin", "crossplot", "--", "test/vehicles.csv"];
    full_args.extend_from_slice(args);
    let output = Command::new("cargo")
        .args(&full_args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| format!("Failed to spawn process: {}", e))?;

    if output.status.success() {
        Ok(output.stdout)
    } else {
        Err(String::from_utf8_lossy(&output.stderr).to_string())
    }
}

/// Check if bytes are a valid PNG
fn is_valid_png(bytes: &[u8]) -> bool {
    bytes.len() > 8 && &bytes[0..8] == &[137, 80, 78, 71, 13, 10, 26, 10]
}

#[test]
fn test_end_to_end_scatter() {
    let result = run_crossplot(&["--x", "displacement", "--y", "weight"]);
    assert!(result.is_ok(), "Failed: {:?}", result.err());
    assert!(is_valid_png(&result.unwrap()), "Output is not a valid PNG");
}

#[test]
fn test_end_to_end_faceted_bar() {
    let result = run_crossplot(&[
        "--x",
        "category",
        "--y",
        "weight",
        "--plot-type",
        "bar",
        "--agg",
        "mean",
        "--facet-x",
        "category",
    ]);
    assert!(result.is_ok(), "Failed: {:?}", result.err());
    assert!(is_valid_png(&result.unwrap()));
}

#[test]
fn test_end_to_end_filtered_line() {
    let result = run_crossplot(&[
        "--x",
        "displacement",
        "--y",
        "weight",
        "--plot-type",
        "line",
        "--filter",
        "category=A,B",
    ]);
    assert!(result.is_ok(), "Failed: {:?}", result.err());
    assert!(is_valid_png(&result.unwrap()));
}
