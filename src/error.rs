use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the crossfilter engine.
///
/// Per-chart validation failures are deliberately absent: an invalid chart
/// degrades to an empty figure with a diagnostic title and never aborts a
/// rebuild. Only structural problems surface here.
#[derive(Debug, Error)]
pub enum Error {
    /// Bad configuration (unknown column names, no usable default axes)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Degenerate facet construction (e.g. quantile bins with duplicate edges)
    #[error("Faceting error: {0}")]
    Faceting(String),

    /// The facet cross product exceeded the configured cap
    #[error("Too many facet combinations: {count} exceeds the maximum of {max}")]
    TooManyFacets { count: usize, max: usize },

    /// Underlying dataset problems (ingestion, ragged columns)
    #[error("Data access error: {0}")]
    DataAccess(String),

    /// Rendering backend failure
    #[error("Render error: {0}")]
    Render(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_too_many_facets_display() {
        let err = Error::TooManyFacets {
            count: 250,
            max: 100,
        };
        let msg = err.to_string();
        assert!(msg.contains("250"));
        assert!(msg.contains("100"));
    }

    #[test]
    fn test_config_display() {
        let err = Error::Config("column 'speed' not found".to_string());
        assert!(err.to_string().contains("speed"));
    }
}
