use crate::models::{Band, BenchmarkComparison, BenchmarkRating, KpiProgress, Metric, Rollup};
use crate::numeric::{percent_delta, safe_ratio};

/// Sign-normalizes a raw delta so that positive always means "improved".
pub fn effective_delta(raw_delta_pct: f64, lower_is_better: bool) -> f64 {
    if lower_is_better {
        -raw_delta_pct
    } else {
        raw_delta_pct
    }
}

/// Three-way band. Exactly `±near_band_pct` still counts as `Near`.
pub fn classify_band(effective_delta_pct: f64, near_band_pct: f64) -> Band {
    if effective_delta_pct > near_band_pct {
        Band::Above
    } else if effective_delta_pct < -near_band_pct {
        Band::Below
    } else {
        Band::Near
    }
}

pub fn classify_rating(variance_pct: f64) -> BenchmarkRating {
    if variance_pct >= 20.0 {
        BenchmarkRating::Excellent
    } else if variance_pct >= 5.0 {
        BenchmarkRating::Good
    } else if variance_pct >= -5.0 {
        BenchmarkRating::Average
    } else if variance_pct >= -20.0 {
        BenchmarkRating::BelowAverage
    } else {
        BenchmarkRating::Poor
    }
}

/// Variance against a benchmark; beating the benchmark is always positive,
/// so a cost below benchmark gives a positive variance.
pub fn benchmark_variance(current: f64, benchmark: f64, lower_is_better: bool) -> Option<f64> {
    percent_delta(current, benchmark).map(|delta| effective_delta(delta, lower_is_better))
}

/// Attainment percentage: how much of the target has been reached, with the
/// ratio inverted for lower-is-better metrics.
pub fn attainment(current: f64, target: f64, lower_is_better: bool) -> f64 {
    if lower_is_better {
        safe_ratio(target, current) * 100.0
    } else {
        safe_ratio(current, target) * 100.0
    }
}

pub fn kpi_progress(metric: Metric, rollup: &Rollup, target: f64, near_band_pct: f64) -> KpiProgress {
    let current = metric.value(rollup);
    let lower_is_better = metric.lower_is_better();
    let attainment_pct = attainment(current, target, lower_is_better);
    let effective_delta_pct =
        percent_delta(current, target).map(|delta| effective_delta(delta, lower_is_better));

    KpiProgress {
        metric,
        current,
        target,
        attainment_pct,
        fill_pct: attainment_pct.clamp(0.0, 100.0),
        effective_delta_pct,
        band: effective_delta_pct.map(|delta| classify_band(delta, near_band_pct)),
    }
}

pub fn compare_to_benchmark(metric: Metric, rollup: &Rollup, benchmark: f64) -> BenchmarkComparison {
    let current = metric.value(rollup);
    let variance_pct = benchmark_variance(current, benchmark, metric.lower_is_better());

    BenchmarkComparison {
        metric,
        current,
        benchmark,
        variance_pct,
        rating: variance_pct.map(classify_rating),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_boundaries_are_inclusive_of_near() {
        assert_eq!(classify_band(10.0, 10.0), Band::Near);
        assert_eq!(classify_band(10.0 + 1e-9, 10.0), Band::Above);
        assert_eq!(classify_band(-10.0, 10.0), Band::Near);
        assert_eq!(classify_band(-10.000001, 10.0), Band::Below);
        assert_eq!(classify_band(0.0, 0.0), Band::Near);
    }

    #[test]
    fn higher_is_better_target_attainment() {
        assert!((attainment(110.0, 100.0, false) - 110.0).abs() < 1e-9);
        let delta = percent_delta(110.0, 100.0).unwrap();
        assert_eq!(classify_band(effective_delta(delta, false), 10.0), Band::Near);
        assert_eq!(classify_band(11.0, 10.0), Band::Above);
    }

    #[test]
    fn lower_is_better_target_attainment() {
        let pct = attainment(0.96, 1.00, true);
        assert!((pct - 104.1667).abs() < 0.001);
        let delta = percent_delta(0.96, 1.00).unwrap();
        assert!(effective_delta(delta, true) > 0.0);
    }

    #[test]
    fn rating_cutoffs() {
        assert_eq!(classify_rating(20.0), BenchmarkRating::Excellent);
        assert_eq!(classify_rating(19.9), BenchmarkRating::Good);
        assert_eq!(classify_rating(5.0), BenchmarkRating::Good);
        assert_eq!(classify_rating(-5.0), BenchmarkRating::Average);
        assert_eq!(classify_rating(-20.0), BenchmarkRating::BelowAverage);
        assert_eq!(classify_rating(-20.1), BenchmarkRating::Poor);
    }

    #[test]
    fn cheaper_than_benchmark_is_positive_variance() {
        let variance = benchmark_variance(2.0, 2.5, true).unwrap();
        assert!((variance - 20.0).abs() < 1e-9);
        assert_eq!(classify_rating(variance), BenchmarkRating::Excellent);
        assert_eq!(benchmark_variance(2.0, 0.0, true), None);
    }

    #[test]
    fn progress_fill_is_clamped_but_attainment_is_not() {
        let rollup = Rollup {
            conversions: 150,
            ..Rollup::default()
        };
        let progress = kpi_progress(Metric::Conversions, &rollup, 100.0, 10.0);
        assert!((progress.attainment_pct - 150.0).abs() < 1e-9);
        assert_eq!(progress.fill_pct, 100.0);
        assert_eq!(progress.band, Some(Band::Above));
    }

    #[test]
    fn zero_target_skips_banding() {
        let rollup = Rollup {
            clicks: 10,
            ..Rollup::default()
        };
        let progress = kpi_progress(Metric::Clicks, &rollup, 0.0, 10.0);
        assert_eq!(progress.effective_delta_pct, None);
        assert_eq!(progress.band, None);
        assert_eq!(progress.attainment_pct, 0.0);
    }
}
