//! Deterministic demo data.
//!
//! Weekly campaign totals are spread across days and then across ads with
//! exact partitioning, so re-summing any level reproduces its parent.

use chrono::{Duration, NaiveDate};

use crate::models::{AdBreakdown, DailyFact};
use crate::partition::{partition, partition_count};

#[derive(Debug, Clone, Copy)]
pub struct WeekTotals {
    pub impressions: u64,
    pub clicks: u64,
    pub conversions: u64,
    pub spend: f64,
    pub engagements: u64,
    pub reach: u64,
    pub leads: u64,
    pub revenue: f64,
}

pub struct SeedCampaign {
    pub name: &'static str,
    pub campaign_type: &'static str,
    pub platform: &'static str,
    pub budget: f64,
    pub ads: &'static [&'static str],
    /// Oldest week first.
    pub weeks: Vec<WeekTotals>,
}

#[derive(Debug, Clone)]
pub struct SimulatedDay {
    pub fact: DailyFact,
    pub ads: Vec<AdBreakdown>,
}

const STEADY_WEEK: WeekTotals = WeekTotals {
    impressions: 70_000,
    clicks: 1_400,
    conversions: 70,
    spend: 2_100.00,
    engagements: 3_500,
    reach: 35_000,
    leads: 210,
    revenue: 8_400.00,
};

pub fn demo_campaigns() -> Vec<SeedCampaign> {
    let brand_weeks = (0..5u64)
        .map(|week| WeekTotals {
            impressions: STEADY_WEEK.impressions + week * 1_500,
            clicks: STEADY_WEEK.clicks + week * 30,
            conversions: STEADY_WEEK.conversions + week,
            spend: STEADY_WEEK.spend + week as f64 * 45.5,
            revenue: STEADY_WEEK.revenue + week as f64 * 120.25,
            ..STEADY_WEEK
        })
        .collect();

    let mut retargeting_weeks = vec![STEADY_WEEK; 4];
    retargeting_weeks.push(WeekTotals {
        clicks: 1_410,
        conversions: 45,
        revenue: 5_400.00,
        ..STEADY_WEEK
    });

    vec![
        SeedCampaign {
            name: "Spring Brand Push",
            campaign_type: "awareness",
            platform: "LinkedIn",
            budget: 15_000.0,
            ads: &["brand-video", "brand-carousel", "brand-static"],
            weeks: brand_weeks,
        },
        SeedCampaign {
            name: "Retargeting Demo Requests",
            campaign_type: "conversions",
            platform: "Google Ads",
            budget: 9_000.0,
            ads: &["rt-search", "rt-display", "rt-youtube"],
            weeks: retargeting_weeks,
        },
    ]
}

/// Expands weekly totals into daily facts ending at `end` (inclusive).
pub fn simulate(campaign: &SeedCampaign, end: NaiveDate) -> Vec<SimulatedDay> {
    let total_days = campaign.weeks.len() * 7;
    let start = end - Duration::days(total_days as i64 - 1);
    let mut days = Vec::with_capacity(total_days);

    for (week_index, week) in campaign.weeks.iter().enumerate() {
        let impressions = partition_count(week.impressions, 7);
        let clicks = partition_count(week.clicks, 7);
        let conversions = partition_count(week.conversions, 7);
        let spend = partition(week.spend, 7, 2);
        let engagements = partition_count(week.engagements, 7);
        let reach = partition_count(week.reach, 7);
        let leads = partition_count(week.leads, 7);
        let revenue = partition(week.revenue, 7, 2);

        for day in 0..7 {
            let date = start + Duration::days((week_index * 7 + day) as i64);
            let fact = DailyFact {
                date,
                impressions: impressions[day],
                clicks: clicks[day],
                conversions: conversions[day],
                spend: spend[day],
                engagements: Some(engagements[day]),
                reach: Some(reach[day]),
                leads: Some(leads[day]),
                revenue: Some(revenue[day]),
            };
            let ads = split_across_ads(&fact, campaign.ads);
            days.push(SimulatedDay { fact, ads });
        }
    }

    days
}

fn split_across_ads(fact: &DailyFact, ads: &[&str]) -> Vec<AdBreakdown> {
    let impressions = partition_count(fact.impressions, ads.len());
    let clicks = partition_count(fact.clicks, ads.len());
    let spend = partition(fact.spend, ads.len(), 2);

    ads.iter()
        .enumerate()
        .map(|(index, ad_key)| AdBreakdown {
            date: fact.date,
            ad_key: ad_key.to_string(),
            impressions: impressions[index],
            clicks: clicks[index],
            spend: spend[index],
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Thresholds;
    use crate::insights::{detect_signals, LANDING_PAGE_REGRESSION_ID};

    fn end() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
    }

    fn cents(value: f64) -> i64 {
        (value * 100.0).round() as i64
    }

    #[test]
    fn daily_rows_reconcile_to_weekly_totals() {
        let campaign = &demo_campaigns()[0];
        let days = simulate(campaign, end());
        assert_eq!(days.len(), 35);
        assert_eq!(days.last().unwrap().fact.date, end());

        for (week, chunk) in campaign.weeks.iter().zip(days.chunks(7)) {
            let spend: i64 = chunk.iter().map(|d| cents(d.fact.spend)).sum();
            let clicks: u64 = chunk.iter().map(|d| d.fact.clicks).sum();
            let revenue: i64 = chunk.iter().filter_map(|d| d.fact.revenue).map(cents).sum();
            assert_eq!(spend, cents(week.spend));
            assert_eq!(revenue, cents(week.revenue));
            assert_eq!(clicks, week.clicks);
        }
    }

    #[test]
    fn ad_rows_reconcile_to_daily_fact() {
        for campaign in demo_campaigns() {
            for day in simulate(&campaign, end()) {
                let spend: i64 = day.ads.iter().map(|a| cents(a.spend)).sum();
                let impressions: u64 = day.ads.iter().map(|a| a.impressions).sum();
                assert_eq!(spend, cents(day.fact.spend));
                assert_eq!(impressions, day.fact.impressions);
                assert_eq!(day.ads.len(), campaign.ads.len());
            }
        }
    }

    #[test]
    fn retargeting_demo_shows_landing_page_regression() {
        let campaign = &demo_campaigns()[1];
        let facts: Vec<DailyFact> = simulate(campaign, end()).into_iter().map(|d| d.fact).collect();
        let report = detect_signals(&facts, &Thresholds::default(), None, Some(end()));
        let ids: Vec<&str> = report.signals.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec![LANDING_PAGE_REGRESSION_ID]);
    }
}
