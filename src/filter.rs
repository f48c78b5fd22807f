//! Conjunctive attribute filtering over normalized records

use crate::data::RecordSet;
use crate::error::{ChurnError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::debug;

/// Categorical attributes a selection may constrain
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterAttribute {
    Gender,
    CardCategory,
}

impl FilterAttribute {
    pub const ALL: [FilterAttribute; 2] = [FilterAttribute::Gender, FilterAttribute::CardCategory];

    /// Column holding this attribute in a normalized record set
    pub fn column(self) -> &'static str {
        match self {
            FilterAttribute::Gender => "gender",
            FilterAttribute::CardCategory => "card_category",
        }
    }
}

impl fmt::Display for FilterAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.column())
    }
}

/// Accepted values per attribute. Attributes without an entry are unconstrained;
/// an entry with an empty set excludes every record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    accepted: BTreeMap<FilterAttribute, BTreeSet<String>>,
}

impl Selection {
    /// The identity selection
    pub fn all() -> Self {
        Self::default()
    }

    /// Set the accepted values for one attribute, replacing any previous set
    pub fn with<I, S>(mut self, attribute: FilterAttribute, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.accepted
            .insert(attribute, values.into_iter().map(Into::into).collect());
        self
    }

    pub fn accepted(&self, attribute: FilterAttribute) -> Option<&BTreeSet<String>> {
        self.accepted.get(&attribute)
    }

    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FilterAttribute, &BTreeSet<String>)> {
        self.accepted.iter().map(|(attr, values)| (*attr, values))
    }
}

/// Keep the records whose value for every selected attribute is accepted.
///
/// Order is preserved and null values never match. An empty result is valid.
/// A selected attribute missing from the frame is a schema error.
pub fn filter(records: &RecordSet, selection: &Selection) -> Result<RecordSet> {
    if selection.is_empty() {
        return Ok(records.clone());
    }

    let mut predicate: Option<Expr> = None;
    for (attribute, accepted) in selection.iter() {
        let matches = accepts(records, attribute, accepted)?;
        predicate = Some(match predicate {
            Some(current) => current.and(matches),
            None => matches,
        });
    }

    let mut lf = records.lazy();
    if let Some(predicate) = predicate {
        lf = lf.filter(predicate);
    }
    let df = lf.collect()?;
    debug!("Filter kept {} of {} records", df.height(), records.len());
    Ok(RecordSet::from_normalized(df))
}

/// Membership test for one attribute, comparing cells by their string form
fn accepts(records: &RecordSet, attribute: FilterAttribute, accepted: &BTreeSet<String>) -> Result<Expr> {
    let name = attribute.column();
    if !records.has_column(name) {
        return Err(ChurnError::Schema(format!("filter column '{}' is missing", attribute)));
    }
    if accepted.is_empty() {
        return Ok(lit(false));
    }

    let values: Vec<&str> = accepted.iter().map(String::as_str).collect();
    Ok(col(name)
        .cast(DataType::String)
        .is_in(lit(Series::new("accepted", values))))
}

/// Distinct non-null values of an attribute in first-appearance order
pub fn distinct_values(records: &RecordSet, attribute: FilterAttribute) -> Result<Vec<String>> {
    let name = attribute.column();
    if !records.has_column(name) {
        return Err(ChurnError::Schema(format!("filter column '{}' is missing", attribute)));
    }

    let unique = records
        .lazy()
        .select([col(name).cast(DataType::String).drop_nulls().unique_stable()])
        .collect()?;
    Ok(unique
        .column(name)?
        .str()?
        .into_no_null_iter()
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{normalize, NormalizeOptions};

    fn sample_records() -> RecordSet {
        let raw = df!(
            "attrition_flag" => &[
                "Attrited Customer",
                "Existing Customer",
                "Existing Customer",
                "Attrited Customer",
                "Existing Customer"
            ],
            "gender" => &["M", "F", "M", "F", "M"],
            "card_category" => &["Blue", "Gold", "Blue", "Silver", "Gold"],
            "customer_id" => &[1i64, 2, 3, 4, 5]
        )
        .unwrap();
        normalize(&raw, &NormalizeOptions::default()).unwrap()
    }

    fn ids(records: &RecordSet) -> Vec<i64> {
        records
            .frame()
            .column("customer_id")
            .unwrap()
            .i64()
            .unwrap()
            .into_no_null_iter()
            .collect()
    }

    #[test]
    fn test_identity_selection() {
        let records = sample_records();
        let filtered = filter(&records, &Selection::all()).unwrap();
        assert_eq!(ids(&filtered), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_single_attribute() {
        let records = sample_records();
        let selection = Selection::all().with(FilterAttribute::Gender, ["M"]);
        let filtered = filter(&records, &selection).unwrap();

        assert_eq!(ids(&filtered), vec![1, 3, 5]);
        assert_eq!(filtered.churn_flags().unwrap(), vec![1, 0, 0]);
    }

    #[test]
    fn test_conjunction_preserves_order() {
        let records = sample_records();
        let selection = Selection::all()
            .with(FilterAttribute::Gender, ["M", "F"])
            .with(FilterAttribute::CardCategory, ["Gold", "Silver"]);
        let filtered = filter(&records, &selection).unwrap();

        assert_eq!(ids(&filtered), vec![2, 4, 5]);
    }

    #[test]
    fn test_empty_accepted_set_excludes_all() {
        let records = sample_records();
        let selection = Selection::all().with(FilterAttribute::CardCategory, Vec::<String>::new());
        let filtered = filter(&records, &selection).unwrap();

        assert!(filtered.is_empty());
        assert!(filtered.has_column("is_churn"));
    }

    #[test]
    fn test_filter_is_idempotent() {
        let records = sample_records();
        let selection = Selection::all()
            .with(FilterAttribute::Gender, ["F"])
            .with(FilterAttribute::CardCategory, ["Gold", "Silver", "Blue"]);

        let once = filter(&records, &selection).unwrap();
        let twice = filter(&once, &selection).unwrap();
        assert!(once.frame().equals_missing(twice.frame()));
    }

    #[test]
    fn test_null_never_matches() {
        let raw = df!(
            "attrition_flag" => &["Existing Customer", "Existing Customer"],
            "gender" => &[Some("M"), None],
            "card_category" => &["Blue", "Blue"]
        )
        .unwrap();
        let records = normalize(&raw, &NormalizeOptions::default()).unwrap();
        let selection = Selection::all().with(FilterAttribute::Gender, ["M", "null", ""]);

        assert_eq!(filter(&records, &selection).unwrap().len(), 1);
    }

    #[test]
    fn test_numeric_column_compared_as_text() {
        let raw = df!(
            "attrition_flag" => &["Existing Customer", "Attrited Customer", "Existing Customer"],
            "gender" => &[1i64, 2, 2]
        )
        .unwrap();
        let records = normalize(&raw, &NormalizeOptions::default()).unwrap();
        let filtered = filter(&records, &Selection::all().with(FilterAttribute::Gender, ["2"])).unwrap();

        assert_eq!(filtered.churn_flags().unwrap(), vec![1, 0]);
        assert_eq!(distinct_values(&records, FilterAttribute::Gender).unwrap(), vec!["1", "2"]);
    }

    #[test]
    fn test_empty_set_wins_over_other_attributes() {
        let records = sample_records();
        let selection = Selection::all()
            .with(FilterAttribute::Gender, ["M", "F"])
            .with(FilterAttribute::CardCategory, Vec::<String>::new());

        let filtered = filter(&records, &selection).unwrap();
        assert!(filtered.is_empty());
        assert_eq!(filtered.frame().width(), records.frame().width());
    }

    #[test]
    fn test_missing_filter_column() {
        let raw = df!("attrition_flag" => &["Existing Customer"]).unwrap();
        let records = normalize(&raw, &NormalizeOptions::default()).unwrap();
        let selection = Selection::all().with(FilterAttribute::Gender, ["M"]);

        assert!(matches!(filter(&records, &selection), Err(ChurnError::Schema(_))));
    }

    #[test]
    fn test_distinct_values_first_appearance() {
        let records = sample_records();
        assert_eq!(
            distinct_values(&records, FilterAttribute::CardCategory).unwrap(),
            vec!["Blue", "Gold", "Silver"]
        );
        assert_eq!(
            distinct_values(&records, FilterAttribute::Gender).unwrap(),
            vec!["M", "F"]
        );
    }
}
