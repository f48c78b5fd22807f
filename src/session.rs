//! Session state: one load and normalization, many filtered views

use crate::chart::{chart_data, transaction_scatter, ChartAttribute, ChartDataset, ScatterDataset};
use crate::data::{load_csv, normalize, NormalizeOptions, RecordSet};
use crate::error::Result;
use crate::filter::{distinct_values, filter, FilterAttribute, Selection};
use crate::summary::{summarize, KpiSummary};
use polars::prelude::DataFrame;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Normalized records cached for the lifetime of a session.
///
/// Cloning a session shares the same normalized set.
#[derive(Debug, Clone)]
pub struct Session {
    records: Arc<RecordSet>,
    source: Option<PathBuf>,
}

impl Session {
    /// Read and normalize a CSV file
    pub fn load<P: AsRef<Path>>(path: P, options: &NormalizeOptions) -> Result<Self> {
        let path = path.as_ref();
        let raw = load_csv(path)?;
        let records = normalize(&raw, options)?;
        info!("Session ready with {} records", records.len());

        Ok(Self {
            records: Arc::new(records),
            source: Some(path.to_path_buf()),
        })
    }

    /// Normalize an already loaded frame
    pub fn from_frame(raw: &DataFrame, options: &NormalizeOptions) -> Result<Self> {
        Ok(Self {
            records: Arc::new(normalize(raw, options)?),
            source: None,
        })
    }

    pub fn records(&self) -> &Arc<RecordSet> {
        &self.records
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Values offered for an attribute before any filtering
    pub fn filter_options(&self, attribute: FilterAttribute) -> Result<Vec<String>> {
        distinct_values(&self.records, attribute)
    }

    /// Apply a selection to the cached records
    pub fn view(&self, selection: &Selection) -> Result<View> {
        Ok(View {
            records: filter(&self.records, selection)?,
            selection: selection.clone(),
        })
    }
}

/// A filtered slice of a session's records
#[derive(Debug, Clone)]
pub struct View {
    records: RecordSet,
    selection: Selection,
}

impl View {
    pub fn records(&self) -> &RecordSet {
        &self.records
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn summary(&self) -> Result<KpiSummary> {
        summarize(&self.records)
    }

    pub fn chart(&self, attribute: ChartAttribute) -> Result<ChartDataset> {
        chart_data(&self.records, attribute)
    }

    pub fn scatter(&self) -> Result<ScatterDataset> {
        transaction_scatter(&self.records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChurnError;
    use polars::prelude::*;

    fn raw_frame() -> DataFrame {
        df!(
            "Attrition_Flag" => &["Attrited Customer", "Existing Customer", "Existing Customer"],
            "Gender" => &["M", "F", "M"],
            "Card_Category" => &["Blue", "Blue", "Gold"]
        )
        .unwrap()
    }

    #[test]
    fn test_views_share_cached_records() {
        let session = Session::from_frame(&raw_frame(), &NormalizeOptions::default()).unwrap();
        let clone = session.clone();
        assert!(Arc::ptr_eq(session.records(), clone.records()));

        let males = session
            .view(&Selection::all().with(FilterAttribute::Gender, ["M"]))
            .unwrap();
        let gold = session
            .view(&Selection::all().with(FilterAttribute::CardCategory, ["Gold"]))
            .unwrap();

        assert_eq!(males.summary().unwrap(), KpiSummary::from_counts(2, 1));
        assert_eq!(gold.summary().unwrap(), KpiSummary::from_counts(1, 0));
        assert_eq!(session.records().len(), 3);
    }

    #[test]
    fn test_filter_options() {
        let session = Session::from_frame(&raw_frame(), &NormalizeOptions::default()).unwrap();
        assert_eq!(
            session.filter_options(FilterAttribute::CardCategory).unwrap(),
            vec!["Blue", "Gold"]
        );
    }

    #[test]
    fn test_filter_options_missing_column() {
        let raw = df!("Attrition_Flag" => &["Existing Customer"], "Gender" => &["F"]).unwrap();
        let session = Session::from_frame(&raw, &NormalizeOptions::default()).unwrap();

        assert_eq!(session.filter_options(FilterAttribute::Gender).unwrap(), vec!["F"]);
        assert!(matches!(
            session.filter_options(FilterAttribute::CardCategory),
            Err(ChurnError::Schema(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let result = Session::load("/nonexistent/churn.csv", &NormalizeOptions::default());
        assert!(matches!(result, Err(ChurnError::MissingSource { .. })));
    }
}
