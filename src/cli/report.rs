//! `visitlift report` subcommand

use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use chrono::NaiveDate;
use clap::Args;
use tracing::info;

use visitlift::services::{
    spawn_analysis, AnalyticsConfig, AnalyticsOutput, AnalyticsView, CachedClassifier,
    ClassifierCache, PairingAnalyticsEngine,
};
use visitlift::stores::{ExportStore, RestStore, TransactionStore};
use visitlift::types::{AnalyticsQuery, CategoryHeatmap};

/// Heatmap labels are cut to this many characters
const LABEL_WIDTH: usize = 12;

/// Report pairing analytics for a date range
#[derive(Args, Debug)]
pub struct ReportArgs {
    /// First visit date, inclusive (YYYY-MM-DD)
    #[arg(long)]
    pub from: NaiveDate,

    /// Last visit date, inclusive (YYYY-MM-DD)
    #[arg(long)]
    pub to: NaiveDate,

    /// Restrict to one location
    #[arg(long)]
    pub location: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Read JSONL exports from this directory
    #[arg(long, value_name = "DIR", conflicts_with = "url")]
    pub export: Option<PathBuf>,

    /// Query a REST transaction store at this base URL
    #[arg(long)]
    pub url: Option<String>,

    /// Environment variable holding the REST API key
    #[arg(long, value_name = "VAR", requires = "url")]
    pub api_key_env: Option<String>,

    /// Rows per store request
    #[arg(long)]
    pub page_size: Option<usize>,

    /// Number of service pairings to show
    #[arg(long)]
    pub top: Option<usize>,

    /// Config file (default: ~/.visitlift/config.json)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl ReportArgs {
    pub fn run(self) -> anyhow::Result<()> {
        if self.from > self.to {
            bail!("--from {} is after --to {}", self.from, self.to);
        }

        let config = self.resolve_config()?;
        let store = self.open_store(&config)?;
        let classifier = config.classifier()?;

        let mut query = AnalyticsQuery::new(self.from, self.to);
        query.location_id = self.location.clone();

        info!(store = store.name(), from = %self.from, to = %self.to, "starting report");

        let view = Arc::new(AnalyticsView::new());
        let (_, done) = spawn_analysis(Arc::clone(&view), move || {
            let cache = ClassifierCache::new();
            let cached = CachedClassifier::new(&classifier, &cache);
            PairingAnalyticsEngine::new(&*store, &cached)
                .with_config(config)
                .compute(&query)
        });
        done.recv()
            .map_err(|_| anyhow!("analysis worker exited without a result"))?;

        let output = view.snapshot();
        if let Some(error) = &output.error {
            bail!("{}", error);
        }

        if self.json {
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else if output.has_no_data() {
            println!("No bookings found between {} and {}", self.from, self.to);
        } else {
            print!("{}", render_report(&output));
        }
        Ok(())
    }

    /// Config file values with command-line overrides applied
    fn resolve_config(&self) -> anyhow::Result<AnalyticsConfig> {
        let mut config = match &self.config {
            Some(path) => AnalyticsConfig::load_from(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => AnalyticsConfig::load()?,
        };
        if let Some(page_size) = self.page_size {
            config.page_size = page_size;
        }
        if let Some(top) = self.top {
            config.top_pairings = top;
        }
        config.validate()?;
        Ok(config)
    }

    fn open_store(&self, config: &AnalyticsConfig) -> anyhow::Result<Box<dyn TransactionStore>> {
        if let Some(dir) = &self.export {
            return Ok(Box::new(ExportStore::open(dir, config.export_pattern())?));
        }
        if let Some(url) = &self.url {
            let mut rest = config.rest_store_for(url);
            if let Some(var) = &self.api_key_env {
                rest.api_key_env = Some(var.clone());
            }
            return Ok(Box::new(RestStore::new(rest)?));
        }
        match &config.store {
            Some(store) => Ok(store.open()?),
            None => bail!("no transaction store configured; pass --export DIR or --url URL"),
        }
    }
}

/// Plain-text tables for a successful, non-empty report
fn render_report(output: &AnalyticsOutput) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Top service pairings");
    if output.pairings.is_empty() {
        let _ = writeln!(out, "  (no multi-service visits)");
    }
    for (rank, p) in output.pairings.iter().enumerate() {
        let _ = writeln!(
            out,
            "  {:>2}. {} + {}  {} visits ({:.1}%)",
            rank + 1,
            p.service_a,
            p.service_b,
            p.count,
            p.pct_of_multi_visits
        );
    }

    if !output.category_pairings.is_empty() {
        let _ = writeln!(out, "\nCategory pairings");
        for p in &output.category_pairings {
            let _ = writeln!(
                out,
                "  {} + {}  {} visits ({:.1}%)",
                p.category_a, p.category_b, p.count, p.pct_of_multi_visits
            );
        }
        out.push('\n');
        out.push_str(&render_heatmap(&CategoryHeatmap::from_pairings(
            &output.category_pairings,
        )));
    }

    if !output.standalone_rates.is_empty() {
        let _ = writeln!(out, "\nStandalone vs grouped");
        let _ = writeln!(
            out,
            "  {:<16} {:>8} {:>11} {:>9}",
            "Category", "Bookings", "Standalone", "Grouped"
        );
        for r in &output.standalone_rates {
            let _ = writeln!(
                out,
                "  {:<16} {:>8} {:>10.1}% {:>8.1}%",
                r.category, r.total_bookings, r.standalone_rate, r.grouped_rate
            );
        }
    }

    if !output.revenue_lift.is_empty() {
        let _ = writeln!(out, "\nRevenue lift");
        let _ = writeln!(
            out,
            "  {:<16} {:>10} {:>10} {:>10} {:>8}",
            "Category", "Solo avg", "Group avg", "Lift", "Lift %"
        );
        for l in &output.revenue_lift {
            let _ = writeln!(
                out,
                "  {:<16} {:>10.2} {:>10.2} {:>+10.2} {:>7.1}%",
                l.category, l.avg_ticket_solo, l.avg_ticket_grouped, l.lift_dollars, l.lift_pct
            );
        }
    }

    out
}

fn truncate_label(label: &str) -> String {
    label.chars().take(LABEL_WIDTH).collect()
}

/// Count matrix with category labels on both axes
fn render_heatmap(heatmap: &CategoryHeatmap) -> String {
    let mut out = String::new();
    let _ = write!(out, "  {:<w$}", "", w = LABEL_WIDTH);
    for category in &heatmap.categories {
        let _ = write!(out, " {:>w$}", truncate_label(category), w = LABEL_WIDTH);
    }
    out.push('\n');

    for (category, row) in heatmap.categories.iter().zip(&heatmap.counts) {
        let _ = write!(out, "  {:<w$}", truncate_label(category), w = LABEL_WIDTH);
        for count in row {
            let cell = if *count == 0 {
                "-".to_string()
            } else {
                count.to_string()
            };
            let _ = write!(out, " {:>w$}", cell, w = LABEL_WIDTH);
        }
        out.push('\n');
    }
    out
}
