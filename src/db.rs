use anyhow::Context;
use chrono::NaiveDate;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::facts::{parse_facts, ParsedFacts};
use crate::models::{AdBreakdown, Campaign, CampaignStatus, CampaignUpdate, DailyFact, InsightSignal, RawFact};
use crate::seed;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool, end_date: NaiveDate) -> anyhow::Result<()> {
    for campaign in seed::demo_campaigns() {
        let campaign_id = upsert_campaign(
            pool,
            campaign.name,
            campaign.campaign_type,
            campaign.platform,
            Some(campaign.budget),
        )
        .await?;
        let days = seed::simulate(&campaign, end_date);

        let facts: Vec<DailyFact> = days.iter().map(|day| day.fact.clone()).collect();
        let breakdown: Vec<AdBreakdown> = days.into_iter().flat_map(|day| day.ads).collect();

        let fact_rows = upsert_facts(pool, campaign_id, &facts).await?;
        let ad_rows = upsert_ad_breakdown(pool, campaign_id, &breakdown).await?;
        info!(
            campaign = campaign.name,
            fact_rows, ad_rows, "seeded demo campaign"
        );
    }

    Ok(())
}

/// Creates the campaign, or refreshes its type, platform and budget when the
/// name already exists. Status is left as stored.
pub async fn upsert_campaign(
    pool: &PgPool,
    name: &str,
    campaign_type: &str,
    platform: &str,
    budget: Option<f64>,
) -> anyhow::Result<Uuid> {
    let id: Uuid = sqlx::query(
        r#"
        INSERT INTO marketpulse.campaigns (id, name, campaign_type, platform, budget)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (name) DO UPDATE
        SET campaign_type = EXCLUDED.campaign_type,
            platform = EXCLUDED.platform,
            budget = COALESCE(EXCLUDED.budget, marketpulse.campaigns.budget),
            updated_at = NOW()
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(campaign_type)
    .bind(platform)
    .bind(budget)
    .fetch_one(pool)
    .await?
    .get("id");

    Ok(id)
}

pub async fn find_campaign(pool: &PgPool, name: &str) -> anyhow::Result<Campaign> {
    let row = sqlx::query(
        r#"
        SELECT id, name, campaign_type, platform, status, budget
        FROM marketpulse.campaigns
        WHERE name = $1
        "#,
    )
    .bind(name)
    .fetch_optional(pool)
    .await?
    .with_context(|| format!("campaign {name:?} not found"))?;

    campaign_from_row(&row)
}

pub async fn list_campaigns(
    pool: &PgPool,
    status: Option<CampaignStatus>,
) -> anyhow::Result<Vec<Campaign>> {
    let rows = sqlx::query(
        r#"
        SELECT id, name, campaign_type, platform, status, budget
        FROM marketpulse.campaigns
        WHERE ($1::text IS NULL OR status = $1)
        ORDER BY name
        "#,
    )
    .bind(status.map(CampaignStatus::as_str))
    .fetch_all(pool)
    .await?;

    rows.iter().map(campaign_from_row).collect()
}

pub async fn update_campaign(
    pool: &PgPool,
    name: &str,
    update: &CampaignUpdate,
) -> anyhow::Result<Campaign> {
    let row = sqlx::query(
        r#"
        UPDATE marketpulse.campaigns
        SET name = COALESCE($2, name),
            campaign_type = COALESCE($3, campaign_type),
            platform = COALESCE($4, platform),
            status = COALESCE($5, status),
            budget = COALESCE($6, budget),
            updated_at = NOW()
        WHERE name = $1
        RETURNING id, name, campaign_type, platform, status, budget
        "#,
    )
    .bind(name)
    .bind(update.name.as_deref())
    .bind(update.campaign_type.as_deref())
    .bind(update.platform.as_deref())
    .bind(update.status.map(CampaignStatus::as_str))
    .bind(update.budget)
    .fetch_optional(pool)
    .await?
    .with_context(|| format!("campaign {name:?} not found"))?;

    campaign_from_row(&row)
}

/// Removes the campaign with its facts and signals. False when no campaign
/// had that name.
pub async fn delete_campaign(pool: &PgPool, name: &str) -> anyhow::Result<bool> {
    let result = sqlx::query("DELETE FROM marketpulse.campaigns WHERE name = $1")
        .bind(name)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

fn campaign_from_row(row: &PgRow) -> anyhow::Result<Campaign> {
    let status: String = row.get("status");
    Ok(Campaign {
        id: row.get("id"),
        name: row.get("name"),
        campaign_type: row.get("campaign_type"),
        platform: row.get("platform"),
        status: status.parse().map_err(anyhow::Error::msg)?,
        budget: row.get("budget"),
    })
}

pub async fn upsert_facts(
    pool: &PgPool,
    campaign_id: Uuid,
    facts: &[DailyFact],
) -> anyhow::Result<usize> {
    let mut tx = pool.begin().await?;

    for fact in facts {
        sqlx::query(
            r#"
            INSERT INTO marketpulse.daily_facts
            (campaign_id, fact_date, impressions, clicks, conversions, spend, engagements, reach, leads, revenue)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (campaign_id, fact_date) DO UPDATE
            SET impressions = EXCLUDED.impressions,
                clicks = EXCLUDED.clicks,
                conversions = EXCLUDED.conversions,
                spend = EXCLUDED.spend,
                engagements = EXCLUDED.engagements,
                reach = EXCLUDED.reach,
                leads = EXCLUDED.leads,
                revenue = EXCLUDED.revenue
            "#,
        )
        .bind(campaign_id)
        .bind(fact.date)
        .bind(to_db(fact.impressions)?)
        .bind(to_db(fact.clicks)?)
        .bind(to_db(fact.conversions)?)
        .bind(fact.spend)
        .bind(fact.engagements.map(to_db).transpose()?)
        .bind(fact.reach.map(to_db).transpose()?)
        .bind(fact.leads.map(to_db).transpose()?)
        .bind(fact.revenue)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(facts.len())
}

pub async fn upsert_ad_breakdown(
    pool: &PgPool,
    campaign_id: Uuid,
    rows: &[AdBreakdown],
) -> anyhow::Result<usize> {
    let mut tx = pool.begin().await?;

    for row in rows {
        sqlx::query(
            r#"
            INSERT INTO marketpulse.ad_daily_breakdown
            (campaign_id, fact_date, ad_key, impressions, clicks, spend)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (campaign_id, fact_date, ad_key) DO UPDATE
            SET impressions = EXCLUDED.impressions,
                clicks = EXCLUDED.clicks,
                spend = EXCLUDED.spend
            "#,
        )
        .bind(campaign_id)
        .bind(row.date)
        .bind(&row.ad_key)
        .bind(to_db(row.impressions)?)
        .bind(to_db(row.clicks)?)
        .bind(row.spend)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(rows.len())
}

pub async fn fetch_facts(
    pool: &PgPool,
    campaign_id: Uuid,
    since_date: Option<NaiveDate>,
) -> anyhow::Result<Vec<DailyFact>> {
    let rows = sqlx::query(
        r#"
        SELECT fact_date, impressions, clicks, conversions, spend, engagements, reach, leads, revenue
        FROM marketpulse.daily_facts
        WHERE campaign_id = $1 AND ($2::date IS NULL OR fact_date >= $2)
        ORDER BY fact_date
        "#,
    )
    .bind(campaign_id)
    .bind(since_date)
    .fetch_all(pool)
    .await?;

    let mut facts = Vec::with_capacity(rows.len());
    for row in rows {
        facts.push(DailyFact {
            date: row.get("fact_date"),
            impressions: from_db(row.get("impressions"))?,
            clicks: from_db(row.get("clicks"))?,
            conversions: from_db(row.get("conversions"))?,
            spend: row.get("spend"),
            engagements: row.get::<Option<i64>, _>("engagements").map(from_db).transpose()?,
            reach: row.get::<Option<i64>, _>("reach").map(from_db).transpose()?,
            leads: row.get::<Option<i64>, _>("leads").map(from_db).transpose()?,
            revenue: row.get("revenue"),
        });
    }

    debug!(%campaign_id, rows = facts.len(), "fetched daily facts");
    Ok(facts)
}

pub async fn store_signals(
    pool: &PgPool,
    campaign_id: Uuid,
    run_date: NaiveDate,
    signals: &[InsightSignal],
) -> anyhow::Result<usize> {
    let mut stored = 0usize;

    for signal in signals {
        let payload = serde_json::to_string(signal)?;
        let result = sqlx::query(
            r#"
            INSERT INTO marketpulse.insight_signals
            (id, campaign_id, run_date, signal_id, severity, title, payload)
            VALUES ($1, $2, $3, $4, $5, $6, $7::jsonb)
            ON CONFLICT (campaign_id, run_date, signal_id) DO UPDATE
            SET severity = EXCLUDED.severity,
                title = EXCLUDED.title,
                payload = EXCLUDED.payload
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(campaign_id)
        .bind(run_date)
        .bind(&signal.id)
        .bind(signal.severity.to_string())
        .bind(&signal.title)
        .bind(payload)
        .execute(pool)
        .await?;

        stored += result.rows_affected() as usize;
    }

    Ok(stored)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub inserted: usize,
    pub rejected: usize,
    pub duplicates: usize,
}

pub fn read_csv(csv_path: &std::path::Path) -> anyhow::Result<Vec<RawFact>> {
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut rows = Vec::new();

    for (index, result) in reader.deserialize::<RawFact>().enumerate() {
        match result {
            Ok(row) => rows.push(row),
            Err(err) => warn!(row = index + 1, error = %err, "skipping unreadable CSV row"),
        }
    }

    Ok(rows)
}

/// Reads and validates a fact CSV, logging every row that was left out.
pub fn load_csv_facts(csv_path: &std::path::Path) -> anyhow::Result<ParsedFacts> {
    let parsed = parse_facts(&read_csv(csv_path)?);

    for (index, err) in &parsed.rejected {
        warn!(row = index + 1, error = %err, "skipping invalid fact");
    }
    for date in &parsed.duplicate_dates {
        warn!(%date, "skipping duplicate date, first row kept");
    }

    Ok(parsed)
}

pub async fn import_csv(
    pool: &PgPool,
    campaign_id: Uuid,
    csv_path: &std::path::Path,
) -> anyhow::Result<ImportSummary> {
    let parsed = load_csv_facts(csv_path)?;

    let inserted = upsert_facts(pool, campaign_id, &parsed.facts).await?;
    Ok(ImportSummary {
        inserted,
        rejected: parsed.rejected.len(),
        duplicates: parsed.duplicate_dates.len(),
    })
}

fn to_db(value: u64) -> anyhow::Result<i64> {
    i64::try_from(value).context("count exceeds BIGINT range")
}

fn from_db(value: i64) -> anyhow::Result<u64> {
    u64::try_from(value).context("negative count in store")
}
