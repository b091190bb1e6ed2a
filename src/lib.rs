// Library exports for crossplot

pub mod chart;
pub mod controller;
pub mod data;
pub mod error;
pub mod facet;
pub mod filter;
pub mod grid;
pub mod plot;
pub mod render;

pub use controller::CrossFilter;
pub use data::Dataset;
pub use error::{Error, Result};
pub use grid::Display;
pub use plot::{Aggregation, PlotConfig, PlotType};
