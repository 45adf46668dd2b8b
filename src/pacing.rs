use chrono::{Datelike, NaiveDate};

use crate::config::PacingMode;
use crate::insights::{confidence, Rule, RuleContext, WEEK};
use crate::models::{InsightSignal, Severity, SignalAction};
use crate::numeric::{format_currency, format_delta, percent_delta, safe_ratio};

pub const BUDGET_PACING_ID: &str = "anomaly:budget_pacing";

/// Budget pacing. Exactly one model runs per invocation, picked by
/// `Thresholds::pacing_mode`, and both report under the same id.
pub struct BudgetPacing;

impl Rule for BudgetPacing {
    fn id(&self) -> &'static str {
        BUDGET_PACING_ID
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Option<InsightSignal> {
        let budget = ctx.budget.filter(|b| *b > 0.0)?;
        if ctx.history.len() < WEEK {
            return None;
        }

        match ctx.thresholds.pacing_mode {
            PacingMode::Lifetime => lifetime_pacing(ctx, budget),
            PacingMode::Monthly => monthly_pacing(ctx, budget),
        }
    }
}

fn average_daily_spend(ctx: &RuleContext<'_>) -> f64 {
    safe_ratio(ctx.current.spend, ctx.current.days as f64)
}

fn lifetime_pacing(ctx: &RuleContext<'_>, budget: f64) -> Option<InsightSignal> {
    let t = ctx.thresholds;
    let spent: f64 = ctx.history.iter().map(|fact| fact.spend).sum();
    let utilization = safe_ratio(spent, budget) * 100.0;
    let daily = average_daily_spend(ctx);
    let used_line = format!(
        "Spend to date: {} of {} budget ({:.1}% used)",
        format_currency(spent),
        format_currency(budget),
        utilization
    );
    let history_days = ctx.history.len() as u64;

    if spent > budget {
        let over_pct = (spent - budget) / budget * 100.0;
        let severity = if over_pct >= t.overspend_high_pct {
            Severity::High
        } else {
            Severity::Medium
        };
        return Some(InsightSignal {
            id: BUDGET_PACING_ID.to_string(),
            severity,
            title: "Campaign budget overspent".to_string(),
            description: format!(
                "Spend has passed the budget by {} ({}).",
                format_currency(spent - budget),
                format_delta(over_pct)
            ),
            confidence: Some(confidence(history_days, history_days, t.low_utilization_min_days as u64)),
            evidence: vec![
                used_line,
                format!("Over budget by {} ({})", format_currency(spent - budget), format_delta(over_pct)),
            ],
            recommendation: Some("Pause or cap the campaign, or raise the budget deliberately.".to_string()),
            actions: vec![SignalAction::new("Manage budget", "/campaigns")],
        });
    }

    if utilization >= t.high_utilization_pct {
        let remaining = budget - spent;
        let days_left = (daily > 0.0).then(|| remaining / daily);
        let severity = match days_left {
            Some(days) if days <= t.exhaustion_warning_days => Severity::High,
            _ => Severity::Medium,
        };
        let mut evidence = vec![
            used_line,
            format!("Average daily spend (last {WEEK}d): {}", format_currency(daily)),
        ];
        if let Some(days) = days_left {
            evidence.push(format!("Projected exhaustion in {days:.1} days"));
        }
        return Some(InsightSignal {
            id: BUDGET_PACING_ID.to_string(),
            severity,
            title: "Budget burning fast".to_string(),
            description: match days_left {
                Some(days) => format!(
                    "{utilization:.1}% of the budget is spent; at the current rate the remaining {} lasts about {days:.1} days.",
                    format_currency(remaining)
                ),
                None => format!("{utilization:.1}% of the budget is spent."),
            },
            confidence: Some(confidence(history_days, history_days, t.low_utilization_min_days as u64)),
            evidence,
            recommendation: Some("Decide whether to extend the budget or slow delivery.".to_string()),
            actions: vec![SignalAction::new("Manage budget", "/campaigns")],
        });
    }

    if utilization < t.low_utilization_pct && ctx.history.len() >= t.low_utilization_min_days {
        return Some(InsightSignal {
            id: BUDGET_PACING_ID.to_string(),
            severity: Severity::Medium,
            title: "Budget under-utilized".to_string(),
            description: format!(
                "Only {utilization:.1}% of the budget is spent after {} days of delivery.",
                ctx.history.len()
            ),
            confidence: Some(confidence(history_days, history_days, t.low_utilization_min_days as u64)),
            evidence: vec![
                used_line,
                format!("Average daily spend (last {WEEK}d): {}", format_currency(daily)),
            ],
            recommendation: Some("Check bids, audience size and delivery status.".to_string()),
            actions: vec![SignalAction::new("Review delivery", "/performance")],
        });
    }

    None
}

fn monthly_pacing(ctx: &RuleContext<'_>, budget: f64) -> Option<InsightSignal> {
    let t = ctx.thresholds;
    if ctx.as_of.day() < t.month_min_days {
        return None;
    }

    let daily = average_daily_spend(ctx);
    let month_days = days_in_month(ctx.as_of);
    let projected = daily * month_days as f64;
    let variance = percent_delta(projected, budget)?;
    let evidence = vec![
        format!("Average daily spend (last {WEEK}d): {}", format_currency(daily)),
        format!(
            "Projected month spend: {} vs budget {} ({})",
            format_currency(projected),
            format_currency(budget),
            format_delta(variance)
        ),
        format!("Day {} of {month_days}", ctx.as_of.day()),
    ];
    let window_days = ctx.current.days as u64;

    if variance >= t.over_pacing_pct {
        let severity = if variance >= t.over_pacing_pct * 2.0 {
            Severity::High
        } else {
            Severity::Medium
        };
        return Some(InsightSignal {
            id: BUDGET_PACING_ID.to_string(),
            severity,
            title: "Over-pacing monthly budget".to_string(),
            description: format!(
                "At the current rate this month's spend lands at {}, {} against the {} budget.",
                format_currency(projected),
                format_delta(variance),
                format_currency(budget)
            ),
            confidence: Some(confidence(window_days, window_days, WEEK as u64)),
            evidence,
            recommendation: Some("Lower daily caps to land on budget.".to_string()),
            actions: vec![SignalAction::new("Manage budget", "/campaigns")],
        });
    }

    if variance <= -t.under_pacing_pct {
        return Some(InsightSignal {
            id: BUDGET_PACING_ID.to_string(),
            severity: Severity::Medium,
            title: "Under-pacing monthly budget".to_string(),
            description: format!(
                "At the current rate this month's spend lands at {}, {} against the {} budget.",
                format_currency(projected),
                format_delta(variance),
                format_currency(budget)
            ),
            confidence: Some(confidence(window_days, window_days, WEEK as u64)),
            evidence,
            recommendation: Some("Raise bids or broaden targeting to use the budget.".to_string()),
            actions: vec![SignalAction::new("Review delivery", "/performance")],
        });
    }

    None
}

pub fn days_in_month(date: NaiveDate) -> u32 {
    let (year, month) = (date.year(), date.month());
    let first = NaiveDate::from_ymd_opt(year, month, 1);
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    match (first, next) {
        (Some(first), Some(next)) => (next - first).num_days() as u32,
        _ => 30,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Thresholds;
    use crate::insights::detect_signals;
    use crate::insights::tests::{day, steady_history};
    use crate::models::InsightReport;

    fn pacing(report: &InsightReport) -> Option<&InsightSignal> {
        report.signals.iter().find(|s| s.id == BUDGET_PACING_ID)
    }

    fn monthly() -> Thresholds {
        Thresholds {
            pacing_mode: PacingMode::Monthly,
            ..Thresholds::default()
        }
    }

    #[test]
    fn no_budget_no_pacing() {
        let report = detect_signals(&steady_history(20), &Thresholds::default(), None, None);
        assert!(pacing(&report).is_none());
        let report = detect_signals(&steady_history(20), &Thresholds::default(), Some(0.0), None);
        assert!(pacing(&report).is_none());
    }

    #[test]
    fn overspend_escalates_past_threshold() {
        // 20 days x $300 = $6,000
        let report = detect_signals(&steady_history(20), &Thresholds::default(), Some(5_800.0), None);
        assert_eq!(pacing(&report).unwrap().severity, Severity::Medium);

        let report = detect_signals(&steady_history(20), &Thresholds::default(), Some(5_000.0), None);
        let signal = pacing(&report).unwrap();
        assert_eq!(signal.severity, Severity::High);
        assert_eq!(signal.title, "Campaign budget overspent");
        assert_eq!(signal.evidence[1], "Over budget by $1,000.00 (+20.0%)");
    }

    #[test]
    fn high_burn_projects_exhaustion() {
        let report = detect_signals(&steady_history(20), &Thresholds::default(), Some(7_000.0), None);
        let signal = pacing(&report).unwrap();
        assert_eq!(signal.title, "Budget burning fast");
        assert_eq!(signal.severity, Severity::High);
        assert!(signal.evidence.contains(&"Projected exhaustion in 3.3 days".to_string()));

        // $12,000 spent of $14,500 leaves 8.3 days at $300/day.
        let report = detect_signals(&steady_history(40), &Thresholds::default(), Some(14_500.0), None);
        assert_eq!(pacing(&report).unwrap().severity, Severity::Medium);
    }

    #[test]
    fn low_utilization_after_enough_days() {
        let report = detect_signals(&steady_history(20), &Thresholds::default(), Some(50_000.0), None);
        assert_eq!(pacing(&report).unwrap().title, "Budget under-utilized");

        let report = detect_signals(&steady_history(20), &Thresholds::default(), Some(10_000.0), None);
        assert!(pacing(&report).is_none());
    }

    #[test]
    fn monthly_projection_uses_injected_date() {
        // $300/day over a 31-day March projects $9,300.
        let as_of = Some(day(19));
        let report = detect_signals(&steady_history(20), &monthly(), Some(8_000.0), as_of);
        let signal = pacing(&report).unwrap();
        assert_eq!(signal.title, "Over-pacing monthly budget");
        assert_eq!(signal.severity, Severity::Medium);

        let report = detect_signals(&steady_history(20), &monthly(), Some(12_000.0), as_of);
        assert_eq!(pacing(&report).unwrap().title, "Under-pacing monthly budget");

        let report = detect_signals(&steady_history(20), &monthly(), Some(9_300.0), as_of);
        assert!(pacing(&report).is_none());
    }

    #[test]
    fn monthly_waits_for_minimum_day_of_month() {
        let as_of = NaiveDate::from_ymd_opt(2024, 4, 3);
        let report = detect_signals(&steady_history(20), &monthly(), Some(1_000.0), as_of);
        assert!(pacing(&report).is_none());
    }

    #[test]
    fn only_one_pacing_signal_per_run() {
        let report = detect_signals(&steady_history(20), &monthly(), Some(1_000.0), Some(day(19)));
        let count = report.signals.iter().filter(|s| s.id == BUDGET_PACING_ID).count();
        assert_eq!(count, 1);
    }

    #[test]
    fn month_lengths() {
        assert_eq!(days_in_month(NaiveDate::from_ymd_opt(2024, 2, 10).unwrap()), 29);
        assert_eq!(days_in_month(NaiveDate::from_ymd_opt(2023, 2, 10).unwrap()), 28);
        assert_eq!(days_in_month(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()), 31);
    }
}
