use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Which budget pacing model the detector runs. Only one runs per invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum PacingMode {
    /// Total spend to date against a fixed budget ceiling.
    #[default]
    Lifetime,
    /// Trailing-week daily average projected across the calendar month.
    Monthly,
}

/// Detection cutoffs. Any field missing from an override file keeps its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub min_clicks: u64,
    pub min_impressions: u64,
    pub min_conversions: u64,
    pub cvr_drop_pct: f64,
    pub cpc_spike_pct: f64,
    pub er_decay_pct: f64,
    pub ctr_stable_band_pct: f64,

    pub pacing_mode: PacingMode,
    pub overspend_high_pct: f64,
    pub high_utilization_pct: f64,
    pub exhaustion_warning_days: f64,
    pub low_utilization_pct: f64,
    pub low_utilization_min_days: usize,
    pub month_min_days: u32,
    pub over_pacing_pct: f64,
    pub under_pacing_pct: f64,

    pub high_frequency: f64,
    pub critical_frequency: f64,
    pub frequency_er_decline_pct: f64,
    pub frequency_rise_pct: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_clicks: 100,
            min_impressions: 5000,
            min_conversions: 20,
            cvr_drop_pct: 20.0,
            cpc_spike_pct: 20.0,
            er_decay_pct: 20.0,
            ctr_stable_band_pct: 5.0,

            pacing_mode: PacingMode::Lifetime,
            overspend_high_pct: 10.0,
            high_utilization_pct: 80.0,
            exhaustion_warning_days: 7.0,
            low_utilization_pct: 30.0,
            low_utilization_min_days: 14,
            month_min_days: 5,
            over_pacing_pct: 10.0,
            under_pacing_pct: 20.0,

            high_frequency: 3.0,
            critical_frequency: 5.0,
            frequency_er_decline_pct: 10.0,
            frequency_rise_pct: 25.0,
        }
    }
}

impl Thresholds {
    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        serde_json::from_str(raw).context("invalid thresholds JSON")
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read thresholds from {}", path.display()))?;
        Self::from_json(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documented_defaults() {
        let t = Thresholds::default();
        assert_eq!(t.min_clicks, 100);
        assert_eq!(t.min_impressions, 5000);
        assert_eq!(t.min_conversions, 20);
        assert_eq!(t.cvr_drop_pct, 20.0);
        assert_eq!(t.cpc_spike_pct, 20.0);
        assert_eq!(t.er_decay_pct, 20.0);
        assert_eq!(t.ctr_stable_band_pct, 5.0);
        assert_eq!(t.pacing_mode, PacingMode::Lifetime);
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let t = Thresholds::from_json(r#"{"min_clicks": 50, "pacing_mode": "monthly"}"#).unwrap();
        assert_eq!(t.min_clicks, 50);
        assert_eq!(t.pacing_mode, PacingMode::Monthly);
        assert_eq!(t.min_impressions, 5000);
        assert_eq!(t.cvr_drop_pct, 20.0);
    }

    #[test]
    fn empty_object_is_default() {
        assert_eq!(Thresholds::from_json("{}").unwrap(), Thresholds::default());
    }

    #[test]
    fn rejects_wrong_types() {
        assert!(Thresholds::from_json(r#"{"min_clicks": "many"}"#).is_err());
    }
}
