/// Parses numeric-looking text such as `"$1,234.50"`, `" 12 901 "` or `"4.2%"`.
///
/// Returns `None` when nothing numeric remains or the result is not finite;
/// callers decide whether that is an error or a silent zero.
pub fn coerce_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, ',' | '_' | '$' | '€' | '£' | '¥' | '%') && !c.is_whitespace())
        .collect();

    if cleaned.is_empty() {
        return None;
    }

    cleaned.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Percentage change from `previous` to `current`.
///
/// `None` when the baseline is zero or negative: a delta against such a
/// baseline is undefined, not 0% and not infinite.
pub fn percent_delta(current: f64, previous: f64) -> Option<f64> {
    if previous <= 0.0 {
        return None;
    }
    Some((current - previous) / previous * 100.0)
}

pub fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator <= 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

pub fn round_to(value: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    (value * scale).round() / scale
}

/// Grouped integer, e.g. `12,901`.
pub fn format_count(value: f64) -> String {
    let rounded = value.round();
    let sign = if rounded < 0.0 { "-" } else { "" };
    format!("{sign}{}", group_digits(&format!("{:.0}", rounded.abs())))
}

/// Two-decimal currency, e.g. `$17,900.15`.
pub fn format_currency(value: f64) -> String {
    let fixed = format!("{:.2}", round_to(value, 2).abs());
    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let sign = if round_to(value, 2) < 0.0 { "-" } else { "" };
    format!("{sign}${}.{fraction}", group_digits(whole))
}

/// A ratio already scaled to percent, e.g. `51.34%`.
pub fn format_rate(value: f64) -> String {
    format!("{:.2}%", value)
}

/// Signed one-decimal delta, e.g. `+12.5%` or `-20.0%`.
pub fn format_delta(value: f64) -> String {
    let mut rounded = round_to(value, 1);
    if rounded == 0.0 {
        rounded = 0.0;
    }
    format!("{:+.1}%", rounded)
}

pub fn format_optional_delta(value: Option<f64>) -> String {
    value.map(format_delta).unwrap_or_else(|| "n/a".to_string())
}

fn group_digits(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn coerces_formatted_strings() {
        assert_eq!(coerce_number(" 12,901 "), Some(12901.0));
        assert_eq!(coerce_number("$17,900.15"), Some(17900.15));
        assert_eq!(coerce_number("4.2%"), Some(4.2));
        assert_eq!(coerce_number("-3"), Some(-3.0));
    }

    #[test]
    fn rejects_garbage_and_non_finite() {
        assert_eq!(coerce_number(""), None);
        assert_eq!(coerce_number("   "), None);
        assert_eq!(coerce_number("n/a"), None);
        assert_eq!(coerce_number("inf"), None);
        assert_eq!(coerce_number("NaN"), None);
    }

    #[test]
    fn delta_is_undefined_against_non_positive_baseline() {
        assert_eq!(percent_delta(10.0, 0.0), None);
        assert_eq!(percent_delta(10.0, -5.0), None);
        assert_eq!(percent_delta(0.0, 0.0), None);
        assert_eq!(percent_delta(110.0, 100.0), Some(10.0));
        assert_eq!(percent_delta(80.0, 100.0), Some(-20.0));
    }

    #[test]
    fn safe_ratio_zero_denominator_is_zero() {
        assert_eq!(safe_ratio(5.0, 0.0), 0.0);
        assert_eq!(safe_ratio(5.0, -1.0), 0.0);
        assert_eq!(safe_ratio(6.0, 3.0), 2.0);
    }

    #[test]
    fn formats_human_readable_values() {
        assert_eq!(format_count(12901.0), "12,901");
        assert_eq!(format_count(999.0), "999");
        assert_eq!(format_count(1_000_000.0), "1,000,000");
        assert_eq!(format_currency(17900.15), "$17,900.15");
        assert_eq!(format_currency(2.7), "$2.70");
        assert_eq!(format_currency(-1234.5), "-$1,234.50");
        assert_eq!(format_rate(51.3371), "51.34%");
        assert_eq!(format_delta(12.345), "+12.3%");
        assert_eq!(format_delta(-20.0), "-20.0%");
        assert_eq!(format_delta(-0.01), "+0.0%");
        assert_eq!(format_optional_delta(None), "n/a");
    }

    proptest! {
        #[test]
        fn percent_delta_matches_formula(current in 0.0f64..1e9, previous in 0.001f64..1e9) {
            let delta = percent_delta(current, previous).unwrap();
            prop_assert_eq!(delta, (current - previous) / previous * 100.0);
        }

        #[test]
        fn percent_delta_none_iff_baseline_not_positive(current in -1e9f64..1e9, previous in -1e9f64..1e9) {
            prop_assert_eq!(percent_delta(current, previous).is_none(), previous <= 0.0);
        }

        #[test]
        fn safe_ratio_is_zero_for_non_positive_denominator(numerator in -1e12f64..1e12, denominator in -1e6f64..=0.0) {
            prop_assert_eq!(safe_ratio(numerator, denominator), 0.0);
        }
    }
}
