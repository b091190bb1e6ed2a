use crate::data::{ColumnKind, Dataset};
use crate::error::{Error, Result};
use std::fmt;

/// Number of quantile bins used when faceting a numeric column
pub const QUANTILE_BINS: usize = 4;

/// Predicate variant of a facet
#[derive(Debug, Clone, PartialEq)]
pub enum FacetKind {
    /// Exact match on one value of a discrete column
    Discrete { value: String },
    /// Half-open interval: `> low` (when bounded) and `<= high`.
    /// `low` is None only for the first quantile bin, so the bin captures
    /// values at or below the observed minimum.
    Continuous { low: Option<f64>, high: f64 },
}

/// An immutable predicate selecting a subset of a dataset along one column
#[derive(Debug, Clone, PartialEq)]
pub struct Facet {
    pub field: String,
    pub label: String,
    pub kind: FacetKind,
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.field, self.label)
    }
}

impl Facet {
    pub fn discrete(field: &str, value: &str) -> Facet {
        Facet {
            field: field.to_string(),
            label: value.to_string(),
            kind: FacetKind::Discrete {
                value: value.to_string(),
            },
        }
    }

    pub fn continuous(field: &str, label: &str, low: Option<f64>, high: f64) -> Facet {
        Facet {
            field: field.to_string(),
            label: label.to_string(),
            kind: FacetKind::Continuous { low, high },
        }
    }

    /// Filter the dataset to the rows selected by this facet.
    ///
    /// Pure and deterministic: the input is never mutated.
    pub fn filter(&self, dataset: &Dataset) -> Result<Dataset> {
        let mask: Vec<bool> = match &self.kind {
            FacetKind::Discrete { value } => match dataset.column(&self.field)? {
                crate::data::ColumnData::Discrete(values) => {
                    values.iter().map(|v| v == value).collect()
                }
                other => {
                    return Err(Error::Config(format!(
                        "discrete facet on '{}' but column is {:?}",
                        self.field,
                        other.kind()
                    )))
                }
            },
            FacetKind::Continuous { low, high } => dataset
                .numeric_values(&self.field)?
                .iter()
                .map(|&v| low.map_or(true, |lo| v > lo) && v <= *high)
                .collect(),
        };
        Ok(dataset.retain(&mask))
    }
}

/// Build the facet set for one column.
///
/// Discrete columns get one facet per sorted unique value. Continuous and
/// temporal columns are split into `QUANTILE_BINS` quantile bins; the first
/// bin's lower bound is cleared so it accepts the dataset minimum.
pub fn build_facets(dataset: &Dataset, field: &str) -> Result<Vec<Facet>> {
    match dataset.column_kind(field)? {
        ColumnKind::Discrete => Ok(dataset
            .sorted_unique(field)?
            .iter()
            .map(|value| Facet::discrete(field, value))
            .collect()),
        ColumnKind::Continuous | ColumnKind::Temporal => quantile_facets(dataset, field),
    }
}

fn quantile_facets(dataset: &Dataset, field: &str) -> Result<Vec<Facet>> {
    let mut values = dataset.numeric_values(field)?;
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mut distinct = values.clone();
    distinct.dedup();
    if distinct.len() < QUANTILE_BINS {
        return Err(Error::Faceting(format!(
            "column '{}' has {} distinct values, need at least {} for quantile binning",
            field,
            distinct.len(),
            QUANTILE_BINS
        )));
    }

    let edges: Vec<f64> = (0..=QUANTILE_BINS)
        .map(|i| percentile(&values, i as f64 / QUANTILE_BINS as f64))
        .collect();
    if edges.windows(2).any(|w| w[0] >= w[1]) {
        return Err(Error::Faceting(format!(
            "column '{}' produced duplicate quantile bin edges",
            field
        )));
    }

    let facets = (0..QUANTILE_BINS)
        .map(|i| {
            let (lo, hi) = (edges[i], edges[i + 1]);
            if i == 0 {
                // Unbounded below so the observed minimum falls in the bin
                let label = format!("[{:.2}, {:.2}]", lo, hi);
                Facet::continuous(field, &label, None, hi)
            } else {
                let label = format!("({:.2}, {:.2}]", lo, hi);
                Facet::continuous(field, &label, Some(lo), hi)
            }
        })
        .collect();
    Ok(facets)
}

fn percentile(sorted_data: &[f64], p: f64) -> f64 {
    let n = sorted_data.len();
    if n == 0 {
        return 0.0;
    }
    if n == 1 {
        return sorted_data[0];
    }

    let rank = p * (n - 1) as f64;
    let lower_idx = rank.floor() as usize;
    let upper_idx = rank.ceil() as usize;

    if lower_idx == upper_idx {
        sorted_data[lower_idx]
    } else {
        let weight = rank - lower_idx as f64;
        sorted_data[lower_idx] * (1.0 - weight) + sorted_data[upper_idx] * weight
    }
}

/// Cartesian-product fold: every existing combination extended by every new facet
pub fn cross(lists: &[Vec<Facet>], new_facets: &[Facet]) -> Vec<Vec<Facet>> {
    let mut out = Vec::with_capacity(lists.len() * new_facets.len());
    for prefix in lists {
        for facet in new_facets {
            let mut combo = prefix.clone();
            combo.push(facet.clone());
            out.push(combo);
        }
    }
    out
}

/// All facet combinations for the given columns, failing fast when the
/// product would exceed `max`
pub fn cross_columns(dataset: &Dataset, fields: &[String], max: usize) -> Result<Vec<Vec<Facet>>> {
    let mut all: Vec<Vec<Facet>> = vec![vec![]];
    for field in fields {
        let facets = build_facets(dataset, field)?;
        let count = all.len() * facets.len();
        if count > max {
            return Err(Error::TooManyFacets { count, max });
        }
        all = cross(&all, &facets);
    }
    Ok(all)
}

/// Comma-joined string form of a facet combination, used as chart and tab title
pub fn facet_title(facets: &[Facet]) -> String {
    facets
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Apply every facet of a combination in turn
pub fn apply_facets(dataset: &Dataset, facets: &[Facet]) -> Result<Dataset> {
    let mut df = dataset.clone();
    for facet in facets {
        df = facet.filter(&df)?;
    }
    Ok(df)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ColumnData;

    fn make_dataset() -> Dataset {
        Dataset::new(vec![
            (
                "category".to_string(),
                ColumnData::Discrete(vec![
                    "B".to_string(),
                    "A".to_string(),
                    "B".to_string(),
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
    fn test_discrete_facets_partition() {
        let ds = make_dataset();
        let facets = build_facets(&ds, "category").unwrap();
        assert_eq!(facets.len(), 3);
        assert_eq!(facets[0].label, "A");

        // Union of all facet subsets covers the dataset, pairwise disjoint
        let total: usize = facets
            .iter()
            .map(|f| f.filter(&ds).unwrap().n_rows())
            .sum();
        assert_eq!(total, ds.n_rows());
        for facet in &facets {
            let subset = facet.filter(&ds).unwrap();
            for other in &facets {
                if other.label != facet.label {
                    assert_eq!(other.filter(&subset).unwrap().n_rows(), 0);
                }
            }
        }
    }

    #[test]
    fn test_quantile_facets_cover_range() {
        let ds = Dataset::new(vec![(
            "v".to_string(),
            ColumnData::Continuous(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]),
        )])
        .unwrap();
        let facets = build_facets(&ds, "v").unwrap();
        assert_eq!(facets.len(), QUANTILE_BINS);

        // First bin is unbounded below and accepts the minimum
        match &facets[0].kind {
            FacetKind::Continuous { low, .. } => assert!(low.is_none()),
            other => panic!("expected continuous facet, got {:?}", other),
        }
        assert!(facets[0].filter(&ds).unwrap().n_rows() > 0);

        // Bins are contiguous: each bin's high is the next bin's low
        for pair in facets.windows(2) {
            let high = match &pair[0].kind {
                FacetKind::Continuous { high, .. } => *high,
                _ => unreachable!(),
            };
            let low = match &pair[1].kind {
                FacetKind::Continuous { low, .. } => low.unwrap(),
                _ => unreachable!(),
            };
            assert!((high - low).abs() < 1e-9);
        }

        // Bins cover every row exactly once
        let total: usize = facets
            .iter()
            .map(|f| f.filter(&ds).unwrap().n_rows())
            .sum();
        assert_eq!(total, ds.n_rows());
    }

    #[test]
    fn test_quantile_facets_too_few_distinct() {
        let ds = Dataset::new(vec![(
            "v".to_string(),
            ColumnData::Continuous(vec![1.0, 1.0, 2.0, 2.0]),
        )])
        .unwrap();
        assert!(matches!(
            build_facets(&ds, "v"),
            Err(Error::Faceting(_))
        ));
    }

    #[test]
    fn test_quantile_facets_duplicate_edges() {
        // Five distinct values but heavily repeated median collapses an edge
        let ds = Dataset::new(vec![(
            "v".to_string(),
            ColumnData::Continuous(vec![1.0, 5.0, 5.0, 5.0, 5.0, 5.0, 5.0, 7.0, 8.0, 9.0]),
        )])
        .unwrap();
        assert!(matches!(build_facets(&ds, "v"), Err(Error::Faceting(_))));
    }

    #[test]
    fn test_cross_product() {
        let a = vec![Facet::discrete("c1", "x"), Facet::discrete("c1", "y")];
        let b = vec![
            Facet::discrete("c2", "1"),
            Facet::discrete("c2", "2"),
            Facet::discrete("c2", "3"),
        ];
        let seed = vec![vec![]];
        let crossed = cross(&cross(&seed, &a), &b);
        assert_eq!(crossed.len(), 6);

        // Each combination is one A-prefix plus one B-facet, no duplicates
        for combo in &crossed {
            assert_eq!(combo.len(), 2);
            assert_eq!(combo[0].field, "c1");
            assert_eq!(combo[1].field, "c2");
        }
        let titles: Vec<String> = crossed.iter().map(|c| facet_title(c)).collect();
        let mut deduped = titles.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), titles.len());
    }

    #[test]
    fn test_cross_columns_cap() {
        let ds = make_dataset();
        let fields = vec!["category".to_string()];
        let result = cross_columns(&ds, &fields, 2);
        assert!(matches!(
            result,
            Err(Error::TooManyFacets { count: 3, max: 2 })
        ));
    }

    #[test]
    fn test_facet_title() {
        let combo = vec![Facet::discrete("cyl", "4"), Facet::discrete("gear", "5")];
        assert_eq!(facet_title(&combo), "cyl:4,gear:5");
    }

    #[test]
    fn test_temporal_facets() {
        let ds = Dataset::new(vec![(
            "when".to_string(),
            ColumnData::Temporal(vec![10, 20, 30, 40, 50, 60, 70, 80]),
        )])
        .unwrap();
        let facets = build_facets(&ds, "when").unwrap();
        assert_eq!(facets.len(), QUANTILE_BINS);
        let total: usize = facets
            .iter()
            .map(|f| f.filter(&ds).unwrap().n_rows())
            .sum();
        assert_eq!(total, ds.n_rows());
    }
}
