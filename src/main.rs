//! churnscope: bank customer churn dashboard CLI
//!
//! Loads and normalizes the customer file once, applies the requested filters,
//! then prints KPIs and writes the comparison charts.

use anyhow::{Context, Result};
use churnscope::report::{build_report, render_json, render_text};
use churnscope::{viz, Args, FilterAttribute, OutputFormat, Session};
use clap::Parser;
use std::time::Instant;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "churnscope=debug" } else { "churnscope=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let start_time = Instant::now();

    let session = Session::load(&args.input, &args.normalize_options())
        .with_context(|| format!("failed to prepare customer data from {}", args.input.display()))?;

    for attribute in FilterAttribute::ALL {
        match session.filter_options(attribute) {
            Ok(values) => debug!("Available {} values: {:?}", attribute, values),
            Err(err) => warn!("No {} filter options: {}", attribute, err),
        }
    }

    let selection = args.selection();
    let view = session.view(&selection).context("failed to apply filters")?;
    info!("{} of {} customers selected", view.records().len(), session.records().len());

    let source = args.input.to_string_lossy();
    let scatter = view.scatter()?;
    let report = build_report(&view, args.chart, &scatter, Some(&source))?;

    match args.format {
        OutputFormat::Text => {
            print!("{}", render_text(&report.summary, &report.chart, &scatter));
        }
        OutputFormat::Json => println!("{}", render_json(&report)?),
    }

    if let Some(path) = &args.json_output {
        std::fs::write(path, render_json(&report)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!("JSON report saved to: {}", path.display());
    }

    if args.show_rows > 0 {
        println!("\n=== Raw Data Explorer ===");
        println!("{}", view.records().frame().head(Some(args.show_rows)));
    }

    if !args.no_plots {
        let written = viz::render_dashboard(&view, args.chart, &args.output, args.bins)
            .context("failed to render charts")?;
        for path in written {
            println!("Chart saved to: {}", path.display());
        }
    }

    debug!("Total processing time: {:.2}s", start_time.elapsed().as_secs_f64());
    Ok(())
}
