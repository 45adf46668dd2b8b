use std::fmt::Write;

use chrono::NaiveDate;

use crate::models::{InsightReport, KpiProgress, Metric, MetricSummary, Rollup, Severity};
use crate::numeric::{format_count, format_currency, format_optional_delta, format_rate, percent_delta};

/// One line of the week-over-week table.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricChange {
    pub metric: Metric,
    pub previous: f64,
    pub current: f64,
    pub delta_pct: Option<f64>,
}

pub const SUMMARY_METRICS: [Metric; 8] = [
    Metric::Impressions,
    Metric::Clicks,
    Metric::Conversions,
    Metric::Spend,
    Metric::Ctr,
    Metric::Cvr,
    Metric::Cpc,
    Metric::Er,
];

pub fn summarize_changes(current: &Rollup, previous: &Rollup) -> Vec<MetricChange> {
    SUMMARY_METRICS
        .iter()
        .map(|&metric| {
            let (current, previous) = (metric.value(current), metric.value(previous));
            MetricChange {
                metric,
                previous,
                current,
                delta_pct: percent_delta(current, previous),
            }
        })
        .collect()
}

pub fn format_metric(metric: Metric, value: f64) -> String {
    match metric {
        Metric::Spend | Metric::Revenue | Metric::Cpc | Metric::Cpm | Metric::Cpa | Metric::Cpl => {
            format_currency(value)
        }
        Metric::Ctr | Metric::Cvr | Metric::Er => format_rate(value),
        Metric::Frequency => format!("{value:.2}"),
        Metric::Roas => format!("{value:.2}x"),
        _ => format_count(value),
    }
}

const DASHBOARD_CARDS: [(&str, Metric); 6] = [
    ("Total Impressions", Metric::Impressions),
    ("Total Clicks", Metric::Clicks),
    ("Conversion Rate", Metric::Cvr),
    ("Cost Per Click", Metric::Cpc),
    ("Total Spend", Metric::Spend),
    ("ROAS", Metric::Roas),
];

/// Headline cards for the last 30 days, each with its change against the
/// 30 days before. Empty until a full 30 days exist; the change reads "n/a"
/// until 60 days exist.
pub fn dashboard_summary(insights: &InsightReport) -> Vec<MetricSummary> {
    let Some(cur30) = &insights.cur30 else {
        return Vec::new();
    };

    DASHBOARD_CARDS
        .iter()
        .map(|&(name, metric)| {
            let current = metric.value(cur30);
            let delta = insights
                .prev30
                .as_ref()
                .and_then(|prev30| percent_delta(current, metric.value(prev30)));
            MetricSummary {
                name: name.to_string(),
                value: format_metric(metric, current),
                change: format_optional_delta(delta),
                period: "30d".to_string(),
            }
        })
        .collect()
}

pub fn build_report(
    campaign: &str,
    generated_on: NaiveDate,
    insights: &InsightReport,
    kpis: &[KpiProgress],
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Campaign Performance Report");
    let _ = writeln!(
        output,
        "Generated for {} on {} ({} days of data)",
        campaign, generated_on, insights.available_days
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Week over Week");

    if insights.available_days == 0 {
        let _ = writeln!(output, "No data recorded for this campaign.");
    } else if insights.prev7.days == 0 {
        let _ = writeln!(
            output,
            "No previous week to compare yet ({} days of data).",
            insights.available_days
        );
    } else {
        let _ = writeln!(output, "| Metric | Previous 7d | Last 7d | Change |");
        let _ = writeln!(output, "|---|---|---|---|");
        for change in summarize_changes(&insights.cur7, &insights.prev7) {
            let _ = writeln!(
                output,
                "| {} | {} | {} | {} |",
                change.metric.label(),
                format_metric(change.metric, change.previous),
                format_metric(change.metric, change.current),
                format_optional_delta(change.delta_pct)
            );
        }
    }

    let cards = dashboard_summary(insights);
    if !cards.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Last 30 Days");
        let _ = writeln!(output, "| Metric | Value | Change |");
        let _ = writeln!(output, "|---|---|---|");
        for card in &cards {
            let _ = writeln!(output, "| {} | {} | {} |", card.name, card.value, card.change);
        }
    }

    if !kpis.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## KPI Targets");
        for kpi in kpis {
            let band = kpi.band.map(|b| b.to_string()).unwrap_or_else(|| "n/a".to_string());
            let _ = writeln!(
                output,
                "- {}: {} vs target {} ({:.1}% attained, {})",
                kpi.metric.label(),
                format_metric(kpi.metric, kpi.current),
                format_metric(kpi.metric, kpi.target),
                kpi.attainment_pct,
                band
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Signals");

    if insights.signals.is_empty() {
        let _ = writeln!(output, "No anomalies detected for this window.");
    } else {
        let mut signals = insights.signals.clone();
        signals.sort_by(|a, b| b.severity.cmp(&a.severity));
        for signal in signals.iter() {
            let marker = match signal.severity {
                Severity::High => "🔴",
                Severity::Medium => "🟠",
                Severity::Low => "⚪",
            };
            let _ = writeln!(output, "### {} {} ({})", marker, signal.title, signal.severity);
            let _ = writeln!(output, "{}", signal.description);
            for line in &signal.evidence {
                let _ = writeln!(output, "- {}", line);
            }
            if let Some(recommendation) = &signal.recommendation {
                let _ = writeln!(output, "\n**Recommendation:** {}", recommendation);
            }
            let _ = writeln!(output);
        }
    }

    output
}
