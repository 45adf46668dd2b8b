//! Week-over-week anomaly detection over daily campaign facts.
//!
//! The detector compares the trailing seven days against the seven days
//! before them and runs an ordered list of rules. Rules that share an
//! exclusive group suppress each other: the first one to fire wins.

use chrono::NaiveDate;

use crate::config::Thresholds;
use crate::facts::normalize;
use crate::models::{Confidence, DailyFact, InsightReport, InsightSignal, Rollup, Severity, SignalAction};
use crate::numeric::{format_count, format_currency, format_delta, format_rate, percent_delta};
use crate::pacing::BudgetPacing;
use crate::rollup::{rollup, split_windows, trailing_window};

pub const MIN_HISTORY_DAYS: usize = 14;
pub const WEEK: usize = 7;
pub const MONTH: usize = 30;

pub const INSUFFICIENT_HISTORY_ID: &str = "history:insufficient";
pub const LANDING_PAGE_REGRESSION_ID: &str = "anomaly:landing_page_regression:wow";
pub const CVR_DROP_ID: &str = "anomaly:cvr_drop:wow";
pub const CPC_SPIKE_ID: &str = "anomaly:cpc_spike:wow";
pub const ENGAGEMENT_DECAY_ID: &str = "anomaly:engagement_decay:wow";
pub const FREQUENCY_SATURATION_ID: &str = "anomaly:frequency_saturation:wow";
pub const FREQUENCY_RISING_ID: &str = "anomaly:frequency_rising:wow";

/// Everything a rule may look at. Built once per invocation.
pub struct RuleContext<'a> {
    pub current: &'a Rollup,
    pub previous: &'a Rollup,
    /// All valid facts, date-sorted, one per day.
    pub history: &'a [DailyFact],
    pub thresholds: &'a Thresholds,
    pub budget: Option<f64>,
    pub as_of: NaiveDate,
}

pub trait Rule {
    fn id(&self) -> &'static str;

    /// Rules in the same group are mutually exclusive; earlier rules win.
    fn exclusive_group(&self) -> Option<&'static str> {
        None
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Option<InsightSignal>;
}

pub fn default_rules() -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(LandingPageRegression),
        Box::new(ConversionRateDrop),
        Box::new(CpcSpike),
        Box::new(EngagementDecay),
        Box::new(BudgetPacing),
        Box::new(FrequencySaturation),
        Box::new(FrequencyRising),
    ]
}

/// Runs rules in order, skipping any whose exclusive group already fired.
pub fn evaluate_rules(rules: &[Box<dyn Rule>], ctx: &RuleContext<'_>) -> Vec<InsightSignal> {
    let mut fired_groups: Vec<&'static str> = Vec::new();
    let mut signals = Vec::new();

    for rule in rules {
        let group = rule.exclusive_group();
        if group.is_some_and(|g| fired_groups.contains(&g)) {
            continue;
        }
        if let Some(signal) = rule.evaluate(ctx) {
            signals.push(signal);
            if let Some(g) = group {
                fired_groups.push(g);
            }
        }
    }

    signals
}

/// Detects week-over-week anomalies.
///
/// `as_of` is the "today" used by calendar-month pacing; when absent the
/// latest fact date stands in, so output never depends on the system clock.
pub fn detect_signals(
    facts: &[DailyFact],
    thresholds: &Thresholds,
    budget: Option<f64>,
    as_of: Option<NaiveDate>,
) -> InsightReport {
    let (history, _) = normalize(facts.to_vec());
    let available_days = history.len();
    let (cur7, prev7) = split_windows(&history, WEEK);

    let cur30 = (available_days >= MONTH).then(|| rollup(trailing_window(&history, MONTH)));
    let prev30 = (available_days >= 2 * MONTH).then(|| {
        let end = available_days - MONTH;
        rollup(&history[end - MONTH..end])
    });

    let signals = match history.last() {
        None => Vec::new(),
        Some(_) if available_days < MIN_HISTORY_DAYS => vec![insufficient_history(available_days)],
        Some(latest) => {
            let ctx = RuleContext {
                current: &cur7,
                previous: &prev7,
                history: &history,
                thresholds,
                budget,
                as_of: as_of.unwrap_or(latest.date),
            };
            evaluate_rules(&default_rules(), &ctx)
        }
    };

    InsightReport {
        available_days,
        signals,
        cur7,
        prev7,
        cur30,
        prev30,
    }
}

fn insufficient_history(available_days: usize) -> InsightSignal {
    InsightSignal {
        id: INSUFFICIENT_HISTORY_ID.to_string(),
        severity: Severity::Low,
        title: "Not enough history for week-over-week insights".to_string(),
        description: format!(
            "Only {available_days} day(s) of data are available; {MIN_HISTORY_DAYS} are needed to compare two full weeks."
        ),
        confidence: None,
        evidence: vec![format!("Valid days: {available_days} of {MIN_HISTORY_DAYS}")],
        recommendation: Some("Keep syncing daily performance data; insights start after two weeks.".to_string()),
        actions: vec![SignalAction::new("Check integrations", "/integrations")],
    }
}

/// "CVR: 4.20% → 3.10% (-26.2%)"
pub(crate) fn change_line(label: &str, before: &str, after: &str, delta: f64) -> String {
    format!("{label}: {before} → {after} ({})", format_delta(delta))
}

pub(crate) fn confidence(previous: u64, current: u64, gate: u64) -> Confidence {
    if previous >= gate.saturating_mul(2) && current >= gate.saturating_mul(2) {
        Confidence::High
    } else if previous >= gate {
        Confidence::Medium
    } else {
        Confidence::Low
    }
}

/// CVR delta, only when the previous week carries enough clicks and
/// conversions to trust it.
fn reliable_cvr_delta(ctx: &RuleContext<'_>) -> Option<f64> {
    let t = ctx.thresholds;
    let prev = ctx.previous;
    if prev.clicks < t.min_clicks || prev.conversions < t.min_conversions || prev.cvr <= 0.0 {
        return None;
    }
    percent_delta(ctx.current.cvr, prev.cvr)
}

/// CTR delta when CTR held within the stability band on a trusted baseline.
fn stable_ctr_delta(ctx: &RuleContext<'_>) -> Option<f64> {
    let t = ctx.thresholds;
    let prev = ctx.previous;
    if prev.impressions < t.min_impressions || prev.ctr <= 0.0 {
        return None;
    }
    percent_delta(ctx.current.ctr, prev.ctr).filter(|delta| delta.abs() <= t.ctr_stable_band_pct)
}

fn cvr_evidence(ctx: &RuleContext<'_>, delta: f64) -> Vec<String> {
    vec![
        change_line("CVR", &format_rate(ctx.previous.cvr), &format_rate(ctx.current.cvr), delta),
        format!("Clicks (previous 7d): {}", format_count(ctx.previous.clicks as f64)),
        format!("Conversions (previous 7d): {}", format_count(ctx.previous.conversions as f64)),
    ]
}

pub struct LandingPageRegression;

impl Rule for LandingPageRegression {
    fn id(&self) -> &'static str {
        LANDING_PAGE_REGRESSION_ID
    }

    fn exclusive_group(&self) -> Option<&'static str> {
        Some("conversion")
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Option<InsightSignal> {
        let cvr_delta = reliable_cvr_delta(ctx)?;
        let ctr_delta = stable_ctr_delta(ctx)?;
        if cvr_delta > -ctx.thresholds.cvr_drop_pct {
            return None;
        }

        let mut evidence = cvr_evidence(ctx, cvr_delta);
        evidence.insert(
            1,
            change_line("CTR", &format_rate(ctx.previous.ctr), &format_rate(ctx.current.ctr), ctr_delta),
        );

        Some(InsightSignal {
            id: self.id().to_string(),
            severity: Severity::High,
            title: "Landing page conversion regression".to_string(),
            description: format!(
                "Conversion rate fell {} week over week ({} → {}) while click-through rate held steady ({}). Ads are still earning clicks; visitors stop converting after they land.",
                format_delta(cvr_delta),
                format_rate(ctx.previous.cvr),
                format_rate(ctx.current.cvr),
                format_delta(ctr_delta)
            ),
            confidence: Some(confidence(
                ctx.previous.conversions,
                ctx.current.conversions,
                ctx.thresholds.min_conversions,
            )),
            evidence,
            recommendation: Some(
                "Review recent landing page changes, page load time and form errors.".to_string(),
            ),
            actions: vec![
                SignalAction::new("Review landing pages", "/analytics/landing-pages"),
                SignalAction::new("Open campaign performance", "/performance"),
            ],
        })
    }
}

pub struct ConversionRateDrop;

impl Rule for ConversionRateDrop {
    fn id(&self) -> &'static str {
        CVR_DROP_ID
    }

    fn exclusive_group(&self) -> Option<&'static str> {
        Some("conversion")
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Option<InsightSignal> {
        let cvr_delta = reliable_cvr_delta(ctx)?;
        if cvr_delta > -ctx.thresholds.cvr_drop_pct {
            return None;
        }

        Some(InsightSignal {
            id: self.id().to_string(),
            severity: Severity::High,
            title: "Conversion rate dropped".to_string(),
            description: format!(
                "Conversion rate fell {} week over week ({} → {}).",
                format_delta(cvr_delta),
                format_rate(ctx.previous.cvr),
                format_rate(ctx.current.cvr)
            ),
            confidence: Some(confidence(
                ctx.previous.conversions,
                ctx.current.conversions,
                ctx.thresholds.min_conversions,
            )),
            evidence: cvr_evidence(ctx, cvr_delta),
            recommendation: Some(
                "Check audience and creative changes alongside the landing experience.".to_string(),
            ),
            actions: vec![SignalAction::new("Open campaign performance", "/performance")],
        })
    }
}

pub struct CpcSpike;

impl Rule for CpcSpike {
    fn id(&self) -> &'static str {
        CPC_SPIKE_ID
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Option<InsightSignal> {
        let t = ctx.thresholds;
        let prev = ctx.previous;
        if prev.clicks < t.min_clicks || prev.cpc <= 0.0 {
            return None;
        }
        let delta = percent_delta(ctx.current.cpc, prev.cpc)?;
        if delta < t.cpc_spike_pct {
            return None;
        }

        let severity = if delta >= t.cpc_spike_pct * 2.0 {
            Severity::High
        } else {
            Severity::Medium
        };

        Some(InsightSignal {
            id: self.id().to_string(),
            severity,
            title: "Cost per click spiked".to_string(),
            description: format!(
                "Average CPC rose {} week over week ({} → {}).",
                format_delta(delta),
                format_currency(prev.cpc),
                format_currency(ctx.current.cpc)
            ),
            confidence: Some(confidence(prev.clicks, ctx.current.clicks, t.min_clicks)),
            evidence: vec![
                change_line("CPC", &format_currency(prev.cpc), &format_currency(ctx.current.cpc), delta),
                format!(
                    "Spend: {} → {}",
                    format_currency(prev.spend),
                    format_currency(ctx.current.spend)
                ),
                format!(
                    "Clicks: {} → {}",
                    format_count(prev.clicks as f64),
                    format_count(ctx.current.clicks as f64)
                ),
            ],
            recommendation: Some(
                "Check auction competition, bid strategy changes and audience narrowing.".to_string(),
            ),
            actions: vec![
                SignalAction::new("Review bids", "/campaigns"),
                SignalAction::new("Open campaign performance", "/performance"),
            ],
        })
    }
}

pub struct EngagementDecay;

impl Rule for EngagementDecay {
    fn id(&self) -> &'static str {
        ENGAGEMENT_DECAY_ID
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Option<InsightSignal> {
        let t = ctx.thresholds;
        let prev = ctx.previous;
        if prev.impressions < t.min_impressions || prev.er <= 0.0 {
            return None;
        }
        let delta = percent_delta(ctx.current.er, prev.er)?;
        if delta > -t.er_decay_pct {
            return None;
        }

        Some(InsightSignal {
            id: self.id().to_string(),
            severity: Severity::Medium,
            title: "Engagement is decaying".to_string(),
            description: format!(
                "Engagement rate fell {} week over week ({} → {}).",
                format_delta(delta),
                format_rate(prev.er),
                format_rate(ctx.current.er)
            ),
            confidence: Some(confidence(prev.impressions, ctx.current.impressions, t.min_impressions)),
            evidence: vec![
                change_line("Engagement rate", &format_rate(prev.er), &format_rate(ctx.current.er), delta),
                format!(
                    "Engagements: {} → {}",
                    format_count(prev.engagements as f64),
                    format_count(ctx.current.engagements as f64)
                ),
                format!("Impressions (previous 7d): {}", format_count(prev.impressions as f64)),
            ],
            recommendation: Some("Refresh creative and test new ad formats.".to_string()),
            actions: vec![SignalAction::new("Manage creatives", "/campaigns")],
        })
    }
}

/// Frequency change and ER change, when reach is known in both weeks and the
/// previous week carries enough impressions to trust either.
fn frequency_deltas(ctx: &RuleContext<'_>) -> Option<(Option<f64>, Option<f64>)> {
    if ctx.current.reach == 0 || ctx.previous.reach == 0 {
        return None;
    }
    if ctx.previous.impressions < ctx.thresholds.min_impressions {
        return None;
    }
    Some((
        percent_delta(ctx.current.frequency, ctx.previous.frequency),
        percent_delta(ctx.current.er, ctx.previous.er),
    ))
}

fn frequency_line(ctx: &RuleContext<'_>, delta: Option<f64>) -> String {
    let before = format!("{:.2}", ctx.previous.frequency);
    let after = format!("{:.2}", ctx.current.frequency);
    match delta {
        Some(delta) => change_line("Frequency", &before, &after, delta),
        None => format!("Frequency: {before} → {after}"),
    }
}

pub struct FrequencySaturation;

impl Rule for FrequencySaturation {
    fn id(&self) -> &'static str {
        FREQUENCY_SATURATION_ID
    }

    fn exclusive_group(&self) -> Option<&'static str> {
        Some("frequency")
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Option<InsightSignal> {
        let t = ctx.thresholds;
        let (freq_delta, er_delta) = frequency_deltas(ctx)?;
        let er_delta = er_delta?;
        let frequency = ctx.current.frequency;
        if frequency < t.high_frequency || er_delta > -t.frequency_er_decline_pct {
            return None;
        }

        let severity = if frequency >= t.critical_frequency {
            Severity::High
        } else {
            Severity::Medium
        };

        Some(InsightSignal {
            id: self.id().to_string(),
            severity,
            title: "Audience fatigue".to_string(),
            description: format!(
                "People saw the ads {:.1} times on average this week while engagement rate fell {}.",
                frequency,
                format_delta(er_delta)
            ),
            confidence: Some(confidence(
                ctx.previous.impressions,
                ctx.current.impressions,
                t.min_impressions,
            )),
            evidence: vec![
                frequency_line(ctx, freq_delta),
                change_line(
                    "Engagement rate",
                    &format_rate(ctx.previous.er),
                    &format_rate(ctx.current.er),
                    er_delta,
                ),
                format!(
                    "Reach: {} → {}",
                    format_count(ctx.previous.reach as f64),
                    format_count(ctx.current.reach as f64)
                ),
            ],
            recommendation: Some("Broaden targeting or add a frequency cap, and rotate creative.".to_string()),
            actions: vec![
                SignalAction::new("Adjust audience", "/campaigns"),
                SignalAction::new("Manage creatives", "/campaigns"),
            ],
        })
    }
}

pub struct FrequencyRising;

impl Rule for FrequencyRising {
    fn id(&self) -> &'static str {
        FREQUENCY_RISING_ID
    }

    fn exclusive_group(&self) -> Option<&'static str> {
        Some("frequency")
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Option<InsightSignal> {
        let t = ctx.thresholds;
        let (freq_delta, er_delta) = frequency_deltas(ctx)?;
        let freq_delta = freq_delta?;
        if freq_delta < t.frequency_rise_pct {
            return None;
        }
        if er_delta.is_some_and(|delta| delta <= -t.frequency_er_decline_pct) {
            return None;
        }

        Some(InsightSignal {
            id: self.id().to_string(),
            severity: Severity::Low,
            title: "Ad frequency is climbing".to_string(),
            description: format!(
                "Average frequency rose {} week over week; engagement has not dropped yet.",
                format_delta(freq_delta)
            ),
            confidence: Some(confidence(
                ctx.previous.impressions,
                ctx.current.impressions,
                t.min_impressions,
            )),
            evidence: vec![frequency_line(ctx, Some(freq_delta))],
            recommendation: Some("Watch engagement closely and prepare fresh creative.".to_string()),
            actions: vec![SignalAction::new("Adjust audience", "/campaigns")],
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Duration;

    pub(crate) fn day(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap() + Duration::days(offset)
    }

    pub(crate) fn steady_fact(offset: i64) -> DailyFact {
        DailyFact {
            date: day(offset),
            impressions: 10_000,
            clicks: 200,
            conversions: 10,
            spend: 300.0,
            engagements: Some(500),
            reach: Some(5_000),
            leads: None,
            revenue: None,
        }
    }

    pub(crate) fn steady_history(days: i64) -> Vec<DailyFact> {
        (0..days).map(steady_fact).collect()
    }

    fn ids(report: &InsightReport) -> Vec<&str> {
        report.signals.iter().map(|s| s.id.as_str()).collect()
    }

    #[test]
    fn below_two_weeks_only_reports_insufficient_history() {
        let mut facts = steady_history(13);
        for fact in facts.iter_mut().skip(6) {
            fact.conversions = 0;
            fact.spend = 2_000.0;
        }
        let report = detect_signals(&facts, &Thresholds::default(), Some(10.0), None);
        assert_eq!(report.available_days, 13);
        assert_eq!(ids(&report), vec![INSUFFICIENT_HISTORY_ID]);
        assert_eq!(report.signals[0].severity, Severity::Low);
    }

    #[test]
    fn no_facts_no_signals() {
        let report = detect_signals(&[], &Thresholds::default(), None, None);
        assert_eq!(report.available_days, 0);
        assert!(report.signals.is_empty());
    }

    #[test]
    fn steady_campaign_is_quiet() {
        let report = detect_signals(&steady_history(14), &Thresholds::default(), None, None);
        assert!(report.signals.is_empty());
        assert_eq!(report.cur7, report.prev7);
        assert_eq!(report.cur30, None);
    }

    #[test]
    fn landing_page_regression_suppresses_plain_cvr_drop() {
        let mut facts = steady_history(14);
        for fact in facts.iter_mut().skip(7) {
            fact.conversions = 7;
            fact.clicks = 202;
        }
        let report = detect_signals(&facts, &Thresholds::default(), None, None);
        assert_eq!(ids(&report), vec![LANDING_PAGE_REGRESSION_ID]);
        let signal = &report.signals[0];
        assert_eq!(signal.severity, Severity::High);
        assert!(signal.evidence[0].starts_with("CVR: 5.00% → 3.47%"));
        assert!(signal.evidence[1].starts_with("CTR: 2.00% → 2.02% (+1.0%)"));
    }

    #[test]
    fn cvr_drop_with_moving_ctr_is_plain_drop() {
        let mut facts = steady_history(14);
        for fact in facts.iter_mut().skip(7) {
            fact.clicks = 300;
            fact.conversions = 10;
        }
        let report = detect_signals(&facts, &Thresholds::default(), None, None);
        assert!(ids(&report).contains(&CVR_DROP_ID));
        assert!(!ids(&report).contains(&LANDING_PAGE_REGRESSION_ID));
    }

    #[test]
    fn unreliable_baseline_never_fires() {
        let mut facts = steady_history(14);
        for fact in facts.iter_mut().take(7) {
            fact.clicks = 10;
            fact.conversions = 2;
        }
        for fact in facts.iter_mut().skip(7) {
            fact.conversions = 0;
        }
        let report = detect_signals(&facts, &Thresholds::default(), None, None);
        assert!(!ids(&report).contains(&CVR_DROP_ID));
        assert!(!ids(&report).contains(&LANDING_PAGE_REGRESSION_ID));
        assert!(!ids(&report).contains(&CPC_SPIKE_ID));
    }

    #[test]
    fn cpc_spike_escalates_at_double_threshold() {
        let mut facts = steady_history(14);
        for fact in facts.iter_mut().skip(7) {
            fact.spend = 390.0;
        }
        let report = detect_signals(&facts, &Thresholds::default(), None, None);
        let spike = report.signals.iter().find(|s| s.id == CPC_SPIKE_ID).unwrap();
        assert_eq!(spike.severity, Severity::Medium);

        for fact in facts.iter_mut().skip(7) {
            fact.spend = 450.0;
        }
        let report = detect_signals(&facts, &Thresholds::default(), None, None);
        let spike = report.signals.iter().find(|s| s.id == CPC_SPIKE_ID).unwrap();
        assert_eq!(spike.severity, Severity::High);
        assert_eq!(spike.evidence[0], "CPC: $1.50 → $2.25 (+50.0%)");
    }

    #[test]
    fn engagement_decay_fires_on_thirty_percent_drop() {
        let mut facts = steady_history(14);
        for fact in facts.iter_mut().skip(7) {
            fact.engagements = Some(350);
        }
        let report = detect_signals(&facts, &Thresholds::default(), None, None);
        assert_eq!(ids(&report), vec![ENGAGEMENT_DECAY_ID]);
    }

    #[test]
    fn saturation_wins_over_rising_frequency() {
        let mut facts = steady_history(14);
        for fact in facts.iter_mut().skip(7) {
            fact.reach = Some(2_000);
            fact.engagements = Some(420);
        }
        let report = detect_signals(&facts, &Thresholds::default(), None, None);
        assert_eq!(ids(&report), vec![FREQUENCY_SATURATION_ID]);
        assert_eq!(report.signals[0].severity, Severity::High);
    }

    #[test]
    fn rising_frequency_without_decline_is_early_warning() {
        let mut facts = steady_history(14);
        for fact in facts.iter_mut().skip(7) {
            fact.reach = Some(3_500);
        }
        let report = detect_signals(&facts, &Thresholds::default(), None, None);
        assert_eq!(ids(&report), vec![FREQUENCY_RISING_ID]);
        assert_eq!(report.signals[0].severity, Severity::Low);
    }

    #[test]
    fn thin_baseline_skips_frequency_rules() {
        let mut facts = steady_history(14);
        for (index, fact) in facts.iter_mut().enumerate() {
            fact.impressions = 100;
            fact.clicks = 2;
            fact.conversions = 0;
            fact.spend = 3.0;
            fact.reach = Some(if index < 7 { 50 } else { 20 });
            fact.engagements = Some(if index < 7 { 5 } else { 3 });
        }
        let report = detect_signals(&facts, &Thresholds::default(), None, None);
        assert_eq!(report.prev7.impressions, 700);
        assert!(report.signals.is_empty());
    }

    #[test]
    fn missing_reach_skips_frequency_rules() {
        let mut facts = steady_history(14);
        for fact in facts.iter_mut() {
            fact.reach = None;
        }
        let report = detect_signals(&facts, &Thresholds::default(), None, None);
        assert!(report.signals.is_empty());
    }

    #[test]
    fn exclusive_groups_are_first_match_wins() {
        struct Always(&'static str, Option<&'static str>);
        impl Rule for Always {
            fn id(&self) -> &'static str {
                self.0
            }
            fn exclusive_group(&self) -> Option<&'static str> {
                self.1
            }
            fn evaluate(&self, _ctx: &RuleContext<'_>) -> Option<InsightSignal> {
                Some(InsightSignal {
                    id: self.0.to_string(),
                    severity: Severity::Low,
                    title: String::new(),
                    description: String::new(),
                    confidence: None,
                    evidence: vec![],
                    recommendation: None,
                    actions: vec![],
                })
            }
        }

        let rules: Vec<Box<dyn Rule>> = vec![
            Box::new(Always("a:first", Some("g"))),
            Box::new(Always("a:second", Some("g"))),
            Box::new(Always("a:free", None)),
        ];
        let empty = Rollup::default();
        let thresholds = Thresholds::default();
        let ctx = RuleContext {
            current: &empty,
            previous: &empty,
            history: &[],
            thresholds: &thresholds,
            budget: None,
            as_of: day(0),
        };
        let fired: Vec<String> = evaluate_rules(&rules, &ctx).into_iter().map(|s| s.id).collect();
        assert_eq!(fired, vec!["a:first", "a:free"]);
    }

    #[test]
    fn unsorted_duplicated_input_is_normalized() {
        let mut facts = steady_history(14);
        facts.reverse();
        facts.push(DailyFact {
            spend: 9_999.0,
            ..steady_fact(13)
        });
        let report = detect_signals(&facts, &Thresholds::default(), None, None);
        assert_eq!(report.available_days, 14);
        assert_eq!(report.cur7.spend, 2_100.0);
        assert!(report.signals.is_empty());
    }

    #[test]
    fn monthly_rollups_need_thirty_and_sixty_days() {
        let report = detect_signals(&steady_history(45), &Thresholds::default(), None, None);
        assert_eq!(report.cur30.as_ref().map(|r| r.days), Some(30));
        assert!(report.prev30.is_none());

        let report = detect_signals(&steady_history(60), &Thresholds::default(), None, None);
        assert_eq!(report.prev30.as_ref().map(|r| r.days), Some(30));
        assert_eq!(report.prev30.as_ref().map(|r| r.clicks), Some(6_000));
    }

    #[test]
    fn identical_inputs_give_identical_output() {
        let mut facts = steady_history(40);
        for fact in facts.iter_mut().skip(33) {
            fact.conversions = 6;
        }
        let as_of = Some(day(39));
        let first = detect_signals(&facts, &Thresholds::default(), Some(5_000.0), as_of);
        let second = detect_signals(&facts, &Thresholds::default(), Some(5_000.0), as_of);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }
}
