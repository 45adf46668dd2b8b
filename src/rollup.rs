use crate::models::{DailyFact, Rollup};
use crate::numeric::safe_ratio;

/// Sums a window of facts and rebuilds every ratio from the sums.
///
/// Combining windows must go through the raw facts again: averaging
/// already-computed ratios gives a different (wrong) answer.
pub fn rollup(facts: &[DailyFact]) -> Rollup {
    let mut totals = Rollup {
        days: facts.len(),
        ..Rollup::default()
    };

    // Counts saturate rather than wrap; validated facts never get close.
    for fact in facts {
        totals.impressions = totals.impressions.saturating_add(fact.impressions);
        totals.clicks = totals.clicks.saturating_add(fact.clicks);
        totals.conversions = totals.conversions.saturating_add(fact.conversions);
        totals.spend += fact.spend;
        totals.revenue += fact.revenue.unwrap_or(0.0);
        totals.engagements = totals.engagements.saturating_add(fact.engagements.unwrap_or(0));
        totals.reach = totals.reach.saturating_add(fact.reach.unwrap_or(0));
        totals.leads = totals.leads.saturating_add(fact.leads.unwrap_or(0));
    }

    with_ratios(totals)
}

fn with_ratios(mut totals: Rollup) -> Rollup {
    let impressions = totals.impressions as f64;
    let clicks = totals.clicks as f64;
    let conversions = totals.conversions as f64;

    totals.ctr = safe_ratio(clicks, impressions) * 100.0;
    totals.cvr = safe_ratio(conversions, clicks) * 100.0;
    totals.cpc = safe_ratio(totals.spend, clicks);
    totals.cpm = safe_ratio(totals.spend, impressions) * 1000.0;
    totals.cpa = safe_ratio(totals.spend, conversions);
    totals.cpl = safe_ratio(totals.spend, totals.leads as f64);
    totals.er = safe_ratio(totals.engagements as f64, impressions) * 100.0;
    totals.frequency = safe_ratio(impressions, totals.reach as f64);
    totals.roas = safe_ratio(totals.revenue, totals.spend);
    totals
}

/// The last `days` elements of a date-sorted slice.
pub fn trailing_window<T>(sorted: &[T], days: usize) -> &[T] {
    let start = sorted.len().saturating_sub(days);
    &sorted[start..]
}

/// The `days` elements immediately before the trailing window of the same
/// length. Shorter than `days` when history runs out.
pub fn previous_window<T>(sorted: &[T], days: usize) -> &[T] {
    let end = sorted.len().saturating_sub(days);
    let start = end.saturating_sub(days);
    &sorted[start..end]
}

/// Rollups for the trailing window and the equal-length window before it.
pub fn split_windows(sorted: &[DailyFact], days: usize) -> (Rollup, Rollup) {
    (
        rollup(trailing_window(sorted, days)),
        rollup(previous_window(sorted, days)),
    )
}
