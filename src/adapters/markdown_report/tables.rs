//! Markdown fragments for the summary report.

use crate::domain::pipeline::{SkipReason, YearlyPortfolioResult};
use crate::domain::summary::{StudySummary, YearMetrics};
use std::collections::BTreeMap;

pub fn format_pct(value: f64) -> String {
    if value.is_nan() {
        return "-".to_string();
    }
    format!("{:.1}%", value * 100.0)
}

pub fn format_ratio(value: f64) -> String {
    if value.is_nan() {
        return "-".to_string();
    }
    format!("{value:.2}")
}

fn year_label(row: &YearMetrics) -> String {
    row.year.to_string()
}

pub fn render_highlights(summary: &StudySummary) -> String {
    let best = &summary.best_return;
    let worst = &summary.worst_return;
    let calm = &summary.lowest_volatility;
    let deep = &summary.deepest_drawdown;

    let mut out = String::new();
    out.push_str(&format!(
        "- **Best return:** {} at {} annualised, Sharpe ratio {}.\n",
        year_label(best),
        format_pct(best.metrics.annual_return),
        format_ratio(best.metrics.sharpe_ratio)
    ));
    out.push_str(&format!(
        "- **Worst return:** {} at {} annualised.\n",
        year_label(worst),
        format_pct(worst.metrics.annual_return)
    ));
    out.push_str(&format!(
        "- **Lowest volatility:** {} at {}, with a maximum drawdown of {}.\n",
        year_label(calm),
        format_pct(calm.metrics.volatility),
        format_pct(calm.metrics.max_drawdown)
    ));
    out.push_str(&format!(
        "- **Deepest drawdown:** {} at {}.\n",
        year_label(deep),
        format_pct(deep.metrics.max_drawdown)
    ));
    if !summary.fallback_years.is_empty() {
        let years: Vec<String> = summary.fallback_years.iter().map(i32::to_string).collect();
        out.push_str(&format!(
            "- **Equal-weight fallback:** {}.\n",
            years.join(", ")
        ));
    }
    out
}

pub fn render_yearly_table(results: &BTreeMap<i32, YearlyPortfolioResult>) -> String {
    let mut out = String::from(
        "| Year | Annual Return | Volatility | Sharpe Ratio | Max Drawdown | Holdings | Solver |\n\
         | --- | ---: | ---: | ---: | ---: | ---: | --- |\n",
    );
    for r in results.values() {
        out.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} | {} |\n",
            r.year,
            format_pct(r.metrics.annual_return),
            format_pct(r.metrics.volatility),
            format_ratio(r.metrics.sharpe_ratio),
            format_pct(r.metrics.max_drawdown),
            r.holding_count(),
            r.solve_status
        ));
    }
    out
}

pub fn render_trends(summary: &StudySummary) -> String {
    let avg = &summary.average;
    let mut out = format!(
        "- On average: annual return {}, volatility {}, Sharpe ratio {}, maximum drawdown {}.\n",
        format_pct(avg.annual_return),
        format_pct(avg.volatility),
        format_ratio(avg.sharpe_ratio),
        format_pct(avg.max_drawdown)
    );

    match &summary.early {
        Some(early) => out.push_str(&format!(
            "- {} to {}: average return {} with volatility {}.\n",
            summary.first_year,
            summary.split_year,
            format_pct(early.annual_return),
            format_pct(early.volatility)
        )),
        None => out.push_str(&format!(
            "- No results on or before {}.\n",
            summary.split_year
        )),
    }
    match &summary.late {
        Some(late) => out.push_str(&format!(
            "- {} to {}: average return {} with volatility {}.\n",
            summary.split_year + 1,
            summary.last_year,
            format_pct(late.annual_return),
            format_pct(late.volatility)
        )),
        None => out.push_str(&format!("- No results after {}.\n", summary.split_year)),
    }

    let worst = &summary.worst_return;
    out.push_str(&format!(
        "- The weakest year, {}, had volatility {} and Sharpe ratio {}.\n",
        worst.year,
        format_pct(worst.metrics.volatility),
        format_ratio(worst.metrics.sharpe_ratio)
    ));
    let latest = &summary.latest;
    out.push_str(&format!(
        "- The latest year, {}, returned {} with a maximum drawdown of {}.\n",
        latest.year,
        format_pct(latest.metrics.annual_return),
        format_pct(latest.metrics.max_drawdown)
    ));
    out
}

pub fn render_skipped(skipped: &BTreeMap<i32, SkipReason>) -> String {
    if skipped.is_empty() {
        return "None.\n".to_string();
    }
    skipped
        .iter()
        .map(|(year, reason)| format!("- {year}: {reason}\n"))
        .collect()
}

pub fn render_top_holdings(results: &BTreeMap<i32, YearlyPortfolioResult>, n: usize) -> String {
    let mut out = String::new();
    for r in results.values() {
        out.push_str(&format!("## {} Top {} Holdings\n\n", r.year, n));
        let holdings = r.top_holdings(n);
        if holdings.is_empty() {
            out.push_str("- No holdings.\n");
        }
        for h in holdings {
            out.push_str(&format!(
                "- {}. {} ({}): {}\n",
                h.rank,
                h.name,
                h.ticker,
                format_pct(h.weight)
            ));
        }
        out.push('\n');
    }
    out
}
