//! Built-in Markdown summary template with `{{PLACEHOLDER}}` markers.

pub const DEFAULT_TEMPLATE: &str = "\
# Optimal Portfolio Annual Performance ({{YEAR_RANGE}})

Walk-forward, long-only, capped maximum-Sharpe portfolios. Each year's weights
are fitted only on data before January 1 and held for the calendar year.

## Highlights
{{HIGHLIGHTS}}

## Yearly Metrics
{{YEARLY_TABLE}}

## Trends
{{TRENDS}}

## Skipped Years
{{SKIPPED_YEARS}}

{{TOP_HOLDINGS}}";

pub fn template() -> &'static str {
    DEFAULT_TEMPLATE
}
