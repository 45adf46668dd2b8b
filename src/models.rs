use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::numeric::coerce_number;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: Uuid,
    pub name: String,
    /// Objective label such as "conversions" or "awareness".
    #[serde(rename = "type")]
    pub campaign_type: String,
    pub platform: String,
    pub status: CampaignStatus,
    pub budget: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    #[default]
    Active,
    Paused,
    Completed,
    Draft,
}

impl CampaignStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CampaignStatus::Active => "active",
            CampaignStatus::Paused => "paused",
            CampaignStatus::Completed => "completed",
            CampaignStatus::Draft => "draft",
        }
    }
}

impl fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CampaignStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "active" => Ok(CampaignStatus::Active),
            "paused" => Ok(CampaignStatus::Paused),
            "completed" => Ok(CampaignStatus::Completed),
            "draft" => Ok(CampaignStatus::Draft),
            other => Err(format!("unknown campaign status {other:?}")),
        }
    }
}

/// Partial campaign edit; `None` leaves the stored value alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CampaignUpdate {
    pub name: Option<String>,
    pub campaign_type: Option<String>,
    pub platform: Option<String>,
    pub status: Option<CampaignStatus>,
    pub budget: Option<f64>,
}

impl CampaignUpdate {
    pub fn is_empty(&self) -> bool {
        *self == CampaignUpdate::default()
    }
}

/// One day of advertising performance for a single campaign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyFact {
    pub date: NaiveDate,
    pub impressions: u64,
    pub clicks: u64,
    pub conversions: u64,
    pub spend: f64,
    pub engagements: Option<u64>,
    pub reach: Option<u64>,
    pub leads: Option<u64>,
    #[serde(default)]
    pub revenue: Option<f64>,
}

/// A measure as it arrives from a feed: either a plain number or numeric text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumericInput {
    Number(f64),
    Text(String),
}

impl NumericInput {
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            NumericInput::Number(value) => Some(*value).filter(|v| v.is_finite()),
            NumericInput::Text(text) => coerce_number(text),
        }
    }
}

impl From<f64> for NumericInput {
    fn from(value: f64) -> Self {
        NumericInput::Number(value)
    }
}

impl From<&str> for NumericInput {
    fn from(value: &str) -> Self {
        NumericInput::Text(value.to_string())
    }
}

/// Unvalidated fact row as read from CSV or JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawFact {
    pub date: String,
    #[serde(default)]
    pub impressions: Option<NumericInput>,
    #[serde(default)]
    pub clicks: Option<NumericInput>,
    #[serde(default)]
    pub conversions: Option<NumericInput>,
    #[serde(default)]
    pub spend: Option<NumericInput>,
    #[serde(default)]
    pub engagements: Option<NumericInput>,
    #[serde(default)]
    pub reach: Option<NumericInput>,
    #[serde(default)]
    pub leads: Option<NumericInput>,
    #[serde(default)]
    pub revenue: Option<NumericInput>,
}

/// Raw sums over a window plus ratios rebuilt from those sums.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rollup {
    pub days: usize,
    pub impressions: u64,
    pub clicks: u64,
    pub conversions: u64,
    pub spend: f64,
    pub engagements: u64,
    pub reach: u64,
    pub leads: u64,
    pub revenue: f64,
    pub ctr: f64,
    pub cvr: f64,
    pub cpc: f64,
    pub cpm: f64,
    pub cpa: f64,
    pub cpl: f64,
    pub er: f64,
    pub frequency: f64,
    /// Revenue per unit of spend.
    pub roas: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Impressions,
    Clicks,
    Conversions,
    Spend,
    Engagements,
    Reach,
    Leads,
    Revenue,
    Ctr,
    Cvr,
    Cpc,
    Cpm,
    Cpa,
    Cpl,
    Er,
    Frequency,
    Roas,
}

impl Metric {
    pub fn lower_is_better(self) -> bool {
        matches!(
            self,
            Metric::Spend | Metric::Cpc | Metric::Cpm | Metric::Cpa | Metric::Cpl | Metric::Frequency
        )
    }

    pub fn value(self, rollup: &Rollup) -> f64 {
        match self {
            Metric::Impressions => rollup.impressions as f64,
            Metric::Clicks => rollup.clicks as f64,
            Metric::Conversions => rollup.conversions as f64,
            Metric::Spend => rollup.spend,
            Metric::Engagements => rollup.engagements as f64,
            Metric::Reach => rollup.reach as f64,
            Metric::Leads => rollup.leads as f64,
            Metric::Revenue => rollup.revenue,
            Metric::Ctr => rollup.ctr,
            Metric::Cvr => rollup.cvr,
            Metric::Cpc => rollup.cpc,
            Metric::Cpm => rollup.cpm,
            Metric::Cpa => rollup.cpa,
            Metric::Cpl => rollup.cpl,
            Metric::Er => rollup.er,
            Metric::Frequency => rollup.frequency,
            Metric::Roas => rollup.roas,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Metric::Impressions => "Impressions",
            Metric::Clicks => "Clicks",
            Metric::Conversions => "Conversions",
            Metric::Spend => "Spend",
            Metric::Engagements => "Engagements",
            Metric::Reach => "Reach",
            Metric::Leads => "Leads",
            Metric::Revenue => "Revenue",
            Metric::Ctr => "CTR",
            Metric::Cvr => "CVR",
            Metric::Cpc => "CPC",
            Metric::Cpm => "CPM",
            Metric::Cpa => "CPA",
            Metric::Cpl => "CPL",
            Metric::Er => "Engagement rate",
            Metric::Frequency => "Frequency",
            Metric::Roas => "ROAS",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

/// Navigation hint attached to a signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalAction {
    pub label: String,
    pub route: String,
}

impl SignalAction {
    pub fn new(label: &str, route: &str) -> Self {
        Self {
            label: label.to_string(),
            route: route.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightSignal {
    pub id: String,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Confidence>,
    pub evidence: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<SignalAction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightReport {
    pub available_days: usize,
    pub signals: Vec<InsightSignal>,
    pub cur7: Rollup,
    pub prev7: Rollup,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cur30: Option<Rollup>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev30: Option<Rollup>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Band {
    Above,
    Near,
    Below,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BenchmarkRating {
    Excellent,
    Good,
    Average,
    BelowAverage,
    Poor,
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Band::Above => "above",
            Band::Near => "near",
            Band::Below => "below",
        };
        f.write_str(label)
    }
}

impl fmt::Display for BenchmarkRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BenchmarkRating::Excellent => "excellent",
            BenchmarkRating::Good => "good",
            BenchmarkRating::Average => "average",
            BenchmarkRating::BelowAverage => "below_average",
            BenchmarkRating::Poor => "poor",
        };
        f.write_str(label)
    }
}

/// KPI attainment against a target, ready for progress-bar rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiProgress {
    pub metric: Metric,
    pub current: f64,
    pub target: f64,
    pub attainment_pct: f64,
    pub fill_pct: f64,
    pub effective_delta_pct: Option<f64>,
    pub band: Option<Band>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkComparison {
    pub metric: Metric,
    pub current: f64,
    pub benchmark: f64,
    pub variance_pct: Option<f64>,
    pub rating: Option<BenchmarkRating>,
}

/// A dashboard card: a formatted headline value and its change over `period`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub name: String,
    pub value: String,
    pub change: String,
    pub period: String,
}

/// Per-ad share of a campaign day, produced by exact partitioning.
#[derive(Debug, Clone, PartialEq)]
pub struct AdBreakdown {
    pub date: NaiveDate,
    pub ad_key: String,
    pub impressions: u64,
    pub clicks: u64,
    pub spend: f64,
}
