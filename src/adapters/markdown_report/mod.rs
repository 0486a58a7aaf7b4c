//! Markdown summary report.
//!
//! Reads a template (the built-in default or a custom file), resolves every
//! `{{PLACEHOLDER}}` marker with fragments from [`tables`] and writes
//! `summary_report.md` into the output directory.

pub mod default_template;
pub mod tables;

use crate::domain::error::SharpefolioError;
use crate::domain::pipeline::StudyOutcome;
use crate::domain::summary::StudySummary;
use crate::ports::report_port::ReportPort;
use std::fs;
use std::path::Path;
use tracing::info;

pub const REPORT_FILE: &str = "summary_report.md";

/// Context for resolving template placeholders.
pub struct ReportContext<'a> {
    pub outcome: &'a StudyOutcome,
    pub summary: &'a StudySummary,
    pub top_holdings: usize,
}

/// Resolves all `{{PLACEHOLDER}}`s in `template`.
pub fn resolve(template: &str, ctx: &ReportContext) -> String {
    let summary = ctx.summary;
    let mut output = template.to_string();

    output = output.replace(
        "{{YEAR_RANGE}}",
        &format!("{}-{}", summary.first_year, summary.last_year),
    );
    output = output.replace("{{HIGHLIGHTS}}", &tables::render_highlights(summary));
    output = output.replace(
        "{{YEARLY_TABLE}}",
        &tables::render_yearly_table(&ctx.outcome.results),
    );
    output = output.replace("{{TRENDS}}", &tables::render_trends(summary));
    output = output.replace(
        "{{SKIPPED_YEARS}}",
        &tables::render_skipped(&ctx.outcome.skipped),
    );
    output = output.replace(
        "{{TOP_HOLDINGS}}",
        &tables::render_top_holdings(&ctx.outcome.results, ctx.top_holdings),
    );

    output
}

pub struct MarkdownReportAdapter {
    template: String,
    split_year: i32,
    top_holdings: usize,
}

impl MarkdownReportAdapter {
    pub fn new(split_year: i32, top_holdings: usize) -> Self {
        Self {
            template: default_template::template().to_string(),
            split_year,
            top_holdings,
        }
    }

    pub fn with_template_file(mut self, path: &Path) -> Result<Self, SharpefolioError> {
        self.template = fs::read_to_string(path).map_err(|e| SharpefolioError::Report {
            reason: format!("failed to read template {}: {e}", path.display()),
        })?;
        Ok(self)
    }
}

impl ReportPort for MarkdownReportAdapter {
    fn write(&self, outcome: &StudyOutcome, output_dir: &Path) -> Result<(), SharpefolioError> {
        let summary = StudySummary::compute(&outcome.results, self.split_year).ok_or_else(|| {
            SharpefolioError::Report {
                reason: "no yearly results to summarise".into(),
            }
        })?;

        let ctx = ReportContext {
            outcome,
            summary: &summary,
            top_holdings: self.top_holdings,
        };
        let markdown = resolve(&self.template, &ctx);

        let path = output_dir.join(REPORT_FILE);
        fs::create_dir_all(output_dir)
            .and_then(|_| fs::write(&path, markdown))
            .map_err(|e| SharpefolioError::Report {
                reason: format!("failed to write {}: {e}", path.display()),
            })?;

        info!(path = %path.display(), "summary report written");
        Ok(())
    }
}
