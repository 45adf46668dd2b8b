use std::collections::HashSet;

use chrono::NaiveDate;
use thiserror::Error;

use crate::models::{DailyFact, NumericInput, RawFact};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FactError {
    #[error("invalid date {0:?}, expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("field {field} is not numeric")]
    NotNumeric { field: &'static str },
    #[error("field {field} is negative ({value})")]
    Negative { field: &'static str, value: f64 },
    #[error("field {field} is out of range ({value})")]
    OutOfRange { field: &'static str, value: f64 },
}

/// Counts are stored as BIGINT; anything at or past 2^63 cannot be kept.
const COUNT_LIMIT: f64 = i64::MAX as f64;

/// Facts that survived normalization, date-sorted with one row per date.
#[derive(Debug, Clone, Default)]
pub struct ParsedFacts {
    pub facts: Vec<DailyFact>,
    /// Input index and reason for each row that was excluded.
    pub rejected: Vec<(usize, FactError)>,
    pub duplicate_dates: Vec<NaiveDate>,
}

impl TryFrom<&RawFact> for DailyFact {
    type Error = FactError;

    fn try_from(raw: &RawFact) -> Result<Self, Self::Error> {
        let date = parse_date(&raw.date)?;
        Ok(DailyFact {
            date,
            impressions: count(&raw.impressions, "impressions")?.unwrap_or(0),
            clicks: count(&raw.clicks, "clicks")?.unwrap_or(0),
            conversions: count(&raw.conversions, "conversions")?.unwrap_or(0),
            spend: amount(&raw.spend, "spend")?.unwrap_or(0.0),
            engagements: count(&raw.engagements, "engagements")?,
            reach: count(&raw.reach, "reach")?,
            leads: count(&raw.leads, "leads")?,
            revenue: amount(&raw.revenue, "revenue")?,
        })
    }
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, FactError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| FactError::InvalidDate(raw.to_string()))
}

/// Validates every row, keeping the ones that parse.
pub fn parse_facts(rows: &[RawFact]) -> ParsedFacts {
    let mut facts = Vec::with_capacity(rows.len());
    let mut rejected = Vec::new();

    for (index, row) in rows.iter().enumerate() {
        match DailyFact::try_from(row) {
            Ok(fact) => facts.push(fact),
            Err(err) => rejected.push((index, err)),
        }
    }

    let (facts, duplicate_dates) = normalize(facts);
    ParsedFacts {
        facts,
        rejected,
        duplicate_dates,
    }
}

/// Sorts facts by date (stable, so input order breaks ties) and excludes
/// every row whose date was already seen.
pub fn normalize(mut facts: Vec<DailyFact>) -> (Vec<DailyFact>, Vec<NaiveDate>) {
    facts.sort_by_key(|fact| fact.date);

    let mut seen = HashSet::new();
    let mut duplicates = Vec::new();
    facts.retain(|fact| {
        if seen.insert(fact.date) {
            true
        } else {
            duplicates.push(fact.date);
            false
        }
    });

    (facts, duplicates)
}

fn amount(value: &Option<NumericInput>, field: &'static str) -> Result<Option<f64>, FactError> {
    let Some(input) = value else {
        return Ok(None);
    };
    let parsed = input.to_f64().ok_or(FactError::NotNumeric { field })?;
    if parsed < 0.0 {
        return Err(FactError::Negative {
            field,
            value: parsed,
        });
    }
    Ok(Some(parsed))
}

fn count(value: &Option<NumericInput>, field: &'static str) -> Result<Option<u64>, FactError> {
    let Some(parsed) = amount(value, field)? else {
        return Ok(None);
    };
    let rounded = parsed.round();
    if rounded >= COUNT_LIMIT {
        return Err(FactError::OutOfRange {
            field,
            value: parsed,
        });
    }
    Ok(Some(rounded as u64))
}
