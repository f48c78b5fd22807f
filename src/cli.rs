//! Command-line interface definitions and argument parsing

use crate::chart::ChartAttribute;
use crate::data::{FlagPolicy, NormalizeOptions};
use crate::filter::{FilterAttribute, Selection};
use crate::viz::DEFAULT_BINS;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::str::FromStr;

/// Output format for the dashboard report
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Bank customer churn dashboard: KPIs and churn comparisons for a filtered customer set
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input CSV file
    #[arg(short, long, default_value = "bank_churn_data.csv")]
    pub input: PathBuf,

    /// Accepted gender values, comma separated. Omit to accept all;
    /// pass the flag with no values to accept none
    #[arg(long, value_delimiter = ',', num_args = 0..)]
    pub gender: Option<Vec<String>>,

    /// Accepted card categories, comma separated. Omit to accept all;
    /// pass the flag with no values to accept none
    #[arg(long, value_delimiter = ',', num_args = 0..)]
    pub card_category: Option<Vec<String>>,

    /// Attribute to compare against churn
    /// (education_level, income_category, marital_status, contacts_count_12_mon)
    #[arg(short, long, default_value = "education_level", value_parser = ChartAttribute::from_str)]
    pub chart: ChartAttribute,

    /// Output path for the attribute chart; the scatter goes to <stem>_scatter.png
    #[arg(short, long, default_value = "churn_chart.png")]
    pub output: PathBuf,

    /// Skip PNG rendering
    #[arg(long)]
    pub no_plots: bool,

    /// Report format printed to stdout
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Also write the JSON report to this file
    #[arg(long)]
    pub json_output: Option<PathBuf>,

    /// Print the first N filtered rows
    #[arg(long, default_value = "0")]
    pub show_rows: usize,

    /// Number of histogram bins for numeric attributes
    #[arg(long, default_value_t = DEFAULT_BINS)]
    pub bins: usize,

    /// Reject churn values other than the two known labels (or 0/1)
    #[arg(long)]
    pub strict: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Build the filter selection from the attribute flags
    pub fn selection(&self) -> Selection {
        let mut selection = Selection::all();
        for (attribute, values) in [
            (FilterAttribute::Gender, &self.gender),
            (FilterAttribute::CardCategory, &self.card_category),
        ] {
            if let Some(values) = values {
                let values = values
                    .iter()
                    .map(|v| v.trim())
                    .filter(|v| !v.is_empty())
                    .map(str::to_string);
                selection = selection.with(attribute, values);
            }
        }
        selection
    }

    pub fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions {
            policy: if self.strict {
                FlagPolicy::Strict
            } else {
                FlagPolicy::Lenient
            },
            ..NormalizeOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["churnscope"]).unwrap();
        assert_eq!(args.input, PathBuf::from("bank_churn_data.csv"));
        assert_eq!(args.chart, ChartAttribute::EducationLevel);
        assert_eq!(args.format, OutputFormat::Text);
        assert_eq!(args.bins, DEFAULT_BINS);
        assert!(args.selection().is_empty());
        assert_eq!(args.normalize_options().policy, FlagPolicy::Lenient);
    }

    #[test]
    fn test_selection_from_flags() {
        let args = Args::try_parse_from([
            "churnscope",
            "--gender",
            "M,F",
            "--card-category",
            "Gold",
            "--chart",
            "contacts_count_12_mon",
            "--strict",
        ])
        .unwrap();

        let selection = args.selection();
        assert_eq!(selection.accepted(FilterAttribute::Gender).unwrap().len(), 2);
        assert!(selection
            .accepted(FilterAttribute::CardCategory)
            .unwrap()
            .contains("Gold"));
        assert_eq!(args.chart, ChartAttribute::ContactsCount12Mon);
        assert_eq!(args.normalize_options().policy, FlagPolicy::Strict);
    }

    #[test]
    fn test_flag_without_values_accepts_none() {
        let args = Args::try_parse_from(["churnscope", "--card-category"]).unwrap();
        let selection = args.selection();
        assert!(selection
            .accepted(FilterAttribute::CardCategory)
            .unwrap()
            .is_empty());
        assert!(selection.accepted(FilterAttribute::Gender).is_none());
    }

    #[test]
    fn test_unknown_chart_attribute() {
        assert!(Args::try_parse_from(["churnscope", "--chart", "credit_limit"]).is_err());
    }
}
