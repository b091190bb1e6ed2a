use crate::error::{Error, Result};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

/// Kind of a dataset column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Discrete,
    Continuous,
    Temporal,
}

/// Typed storage for one column
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Discrete(Vec<String>),
    Continuous(Vec<f64>),
    /// Epoch-based timestamps; behaves numerically for ranges and binning
    Temporal(Vec<i64>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Discrete(v) => v.len(),
            ColumnData::Continuous(v) => v.len(),
            ColumnData::Temporal(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> ColumnKind {
        match self {
            ColumnData::Discrete(_) => ColumnKind::Discrete,
            ColumnData::Continuous(_) => ColumnKind::Continuous,
            ColumnData::Temporal(_) => ColumnKind::Temporal,
        }
    }

    /// Keep only the rows where mask is true
    fn retain(&self, mask: &[bool]) -> ColumnData {
        fn keep<T: Clone>(values: &[T], mask: &[bool]) -> Vec<T> {
            values
                .iter()
                .zip(mask)
                .filter(|(_, &m)| m)
                .map(|(v, _)| v.clone())
                .collect()
        }
        match self {
            ColumnData::Discrete(v) => ColumnData::Discrete(keep(v, mask)),
            ColumnData::Continuous(v) => ColumnData::Continuous(keep(v, mask)),
            ColumnData::Temporal(v) => ColumnData::Temporal(keep(v, mask)),
        }
    }
}

/// Column-oriented tabular dataset
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    names: Vec<String>,
    columns: Vec<ColumnData>,
}

impl Dataset {
    /// Create a dataset from named columns, checking that lengths agree
    pub fn new(columns: Vec<(String, ColumnData)>) -> Result<Self> {
        if let Some(n) = columns.first().map(|(_, c)| c.len()) {
            for (name, col) in &columns {
                if col.len() != n {
                    return Err(Error::DataAccess(format!(
                        "column '{}' has {} rows, expected {}",
                        name,
                        col.len(),
                        n
                    )));
                }
            }
        }
        let (names, columns) = columns.into_iter().unzip();
        Ok(Dataset { names, columns })
    }

    pub fn n_rows(&self) -> usize {
        self.columns.first().map(|c| c.len()).unwrap_or(0)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn column(&self, name: &str) -> Result<&ColumnData> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| &self.columns[i])
            .ok_or_else(|| Error::Config(format!("column '{}' not found", name)))
    }

    pub fn column_kind(&self, name: &str) -> Result<ColumnKind> {
        Ok(self.column(name)?.kind())
    }

    /// New dataset keeping only the rows where mask is true
    pub fn retain(&self, mask: &[bool]) -> Dataset {
        Dataset {
            names: self.names.clone(),
            columns: self.columns.iter().map(|c| c.retain(mask)).collect(),
        }
    }

    /// Sorted unique values of a discrete column
    pub fn sorted_unique(&self, name: &str) -> Result<Vec<String>> {
        match self.column(name)? {
            ColumnData::Discrete(values) => {
                let mut unique: Vec<String> = values.to_vec();
                unique.sort();
                unique.dedup();
                Ok(unique)
            }
            other => Err(Error::Config(format!(
                "column '{}' is {:?}, expected Discrete",
                name,
                other.kind()
            ))),
        }
    }

    /// Values of a continuous or temporal column as f64
    pub fn numeric_values(&self, name: &str) -> Result<Vec<f64>> {
        match self.column(name)? {
            ColumnData::Continuous(values) => Ok(values.clone()),
            ColumnData::Temporal(values) => Ok(values.iter().map(|&v| v as f64).collect()),
            ColumnData::Discrete(_) => Err(Error::Config(format!(
                "column '{}' is Discrete, expected numeric",
                name
            ))),
        }
    }

    /// (min, max) of a numeric column, None when the column is empty
    pub fn numeric_range(&self, name: &str) -> Result<Option<(f64, f64)>> {
        let values = self.numeric_values(name)?;
        if values.is_empty() {
            return Ok(None);
        }
        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        Ok(Some((min, max)))
    }

    /// Read a CSV file with headers, inferring column types.
    ///
    /// A column where every cell parses as f64 becomes Continuous, anything
    /// else Discrete. Temporal columns are constructed programmatically via
    /// `Dataset::new`, never inferred from CSV.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Dataset> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let headers: Vec<String> = csv_reader
            .headers()
            .map_err(|e| Error::DataAccess(format!("failed to read CSV headers: {}", e)))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut raw: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
        for record in csv_reader.records() {
            let record =
                record.map_err(|e| Error::DataAccess(format!("failed to read CSV row: {}", e)))?;
            if record.len() != headers.len() {
                return Err(Error::DataAccess(format!(
                    "CSV row has {} fields, expected {}",
                    record.len(),
                    headers.len()
                )));
            }
            for (i, field) in record.iter().enumerate() {
                raw[i].push(field.trim().to_string());
            }
        }

        let columns = headers
            .into_iter()
            .zip(raw)
            .map(|(name, cells)| {
                let numeric: Option<Vec<f64>> =
                    cells.iter().map(|c| c.parse::<f64>().ok()).collect();
                let data = match numeric {
                    Some(values) if !values.is_empty() => ColumnData::Continuous(values),
                    _ => ColumnData::Discrete(cells),
                };
                (name, data)
            })
            .collect();

        Dataset::new(columns)
    }

    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Dataset> {
        let file = std::fs::File::open(path.as_ref()).map_err(|e| {
            Error::DataAccess(format!("cannot open '{}': {}", path.as_ref().display(), e))
        })?;
        Self::from_csv_reader(file)
    }
}

/// Summary statistics for one column, by kind
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnStats {
    Discrete {
        count: usize,
        unique: usize,
        top: String,
        freq: usize,
    },
    Continuous {
        count: usize,
        mean: f64,
        std: f64,
        min: f64,
        max: f64,
    },
    Temporal {
        count: usize,
        unique: usize,
        first: i64,
        last: i64,
    },
}

/// Immutable per-column metadata, produced once per dataset
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub kind: ColumnKind,
    pub stats: ColumnStats,
}

/// Compute a descriptor for every column of the dataset
pub fn describe_columns(dataset: &Dataset) -> Vec<ColumnDescriptor> {
    dataset
        .names
        .iter()
        .zip(&dataset.columns)
        .map(|(name, column)| ColumnDescriptor {
            name: name.clone(),
            kind: column.kind(),
            stats: describe_column(column),
        })
        .collect()
}

fn describe_column(column: &ColumnData) -> ColumnStats {
    match column {
        ColumnData::Discrete(values) => {
            let mut freqs: HashMap<&str, usize> = HashMap::new();
            for v in values {
                *freqs.entry(v.as_str()).or_default() += 1;
            }
            // Ties broken by value so the descriptor is deterministic
            let (top, freq) = freqs
                .iter()
                .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
                .map(|(v, f)| (v.to_string(), *f))
                .unwrap_or_default();
            ColumnStats::Discrete {
                count: values.len(),
                unique: freqs.len(),
                top,
                freq,
            }
        }
        ColumnData::Continuous(values) => {
            let count = values.len();
            let n = count as f64;
            let mean = if count > 0 {
                values.iter().sum::<f64>() / n
            } else {
                0.0
            };
            let std = if count > 1 {
                (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
            } else {
                0.0
            };
            let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            ColumnStats::Continuous {
                count,
                mean,
                std,
                min: if count > 0 { min } else { 0.0 },
                max: if count > 0 { max } else { 0.0 },
            }
        }
        ColumnData::Temporal(values) => {
            let mut unique = values.clone();
            unique.sort_unstable();
            unique.dedup();
            ColumnStats::Temporal {
                count: values.len(),
                unique: unique.len(),
                first: values.iter().min().copied().unwrap_or(0),
                last: values.iter().max().copied().unwrap_or(0),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_dataset() -> Dataset {
        Dataset::new(vec![
            (
                "category".to_string(),
                ColumnData::Discrete(vec![
                    "A".to_string(),
                    "B".to_string(),
                    "A".to_string(),
                    "C".to_string(),
                ]),
            ),
            (
                "value".to_string(),
                ColumnData::Continuous(vec![1.0, 2.0, 3.0, 4.0]),
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_new_rejects_ragged_columns() {
        let result = Dataset::new(vec![
            ("a".to_string(), ColumnData::Continuous(vec![1.0, 2.0])),
            ("b".to_string(), ColumnData::Continuous(vec![1.0])),
        ]);
        assert!(matches!(result, Err(Error::DataAccess(_))));
    }

    #[test]
    fn test_retain() {
        let ds = make_dataset();
        let filtered = ds.retain(&[true, false, true, false]);
        assert_eq!(filtered.n_rows(), 2);
        assert_eq!(
            filtered.column("category").unwrap(),
            &ColumnData::Discrete(vec!["A".to_string(), "A".to_string()])
        );
        assert_eq!(
            filtered.column("value").unwrap(),
            &ColumnData::Continuous(vec![1.0, 3.0])
        );
    }

    #[test]
    fn test_sorted_unique() {
        let ds = make_dataset();
        assert_eq!(ds.sorted_unique("category").unwrap(), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_numeric_range() {
        let ds = make_dataset();
        assert_eq!(ds.numeric_range("value").unwrap(), Some((1.0, 4.0)));
    }

    #[test]
    fn test_column_not_found() {
        let ds = make_dataset();
        assert!(matches!(ds.column("missing"), Err(Error::Config(_))));
    }

    #[test]
    fn test_from_csv_inference() {
        let csv = "name,score\nalice,1.5\nbob,2.5\n";
        let ds = Dataset::from_csv_reader(csv.as_bytes()).unwrap();
        assert_eq!(ds.column_kind("name").unwrap(), ColumnKind::Discrete);
        assert_eq!(ds.column_kind("score").unwrap(), ColumnKind::Continuous);
        assert_eq!(ds.n_rows(), 2);
    }

    #[test]
    fn test_describe_columns() {
        let ds = make_dataset();
        let descriptors = describe_columns(&ds);
        assert_eq!(descriptors.len(), 2);

        assert_eq!(descriptors[0].kind, ColumnKind::Discrete);
        match &descriptors[0].stats {
            ColumnStats::Discrete {
                count,
                unique,
                top,
                freq,
            } => {
                assert_eq!(*count, 4);
                assert_eq!(*unique, 3);
                assert_eq!(top, "A");
                assert_eq!(*freq, 2);
            }
            other => panic!("expected discrete stats, got {:?}", other),
        }

        assert_eq!(descriptors[1].kind, ColumnKind::Continuous);
        match &descriptors[1].stats {
            ColumnStats::Continuous {
                count,
                mean,
                min,
                max,
                ..
            } => {
                assert_eq!(*count, 4);
                assert!((mean - 2.5).abs() < 1e-9);
                assert_eq!(*min, 1.0);
                assert_eq!(*max, 4.0);
            }
            other => panic!("expected continuous stats, got {:?}", other),
        }
    }

    #[test]
    fn test_describe_temporal() {
        let ds = Dataset::new(vec![(
            "when".to_string(),
            ColumnData::Temporal(vec![30, 10, 20, 10]),
        )])
        .unwrap();
        let descriptors = describe_columns(&ds);
        match &descriptors[0].stats {
            ColumnStats::Temporal {
                count,
                unique,
                first,
                last,
            } => {
                assert_eq!(*count, 4);
                assert_eq!(*unique, 3);
                assert_eq!(*first, 10);
                assert_eq!(*last, 30);
            }
            other => panic!("expected temporal stats, got {:?}", other),
        }
    }
}
