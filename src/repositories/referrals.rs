use crate::models::referrals::{Referral, ReferralStatus};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::ReferralLedger;

#[derive(sqlx::FromRow)]
struct ReferralRow {
    referrer_user_id: String,
    referred_user_id: String,
    status: String,
    date_created: DateTime<Utc>,
}

impl From<ReferralRow> for Referral {
    fn from(row: ReferralRow) -> Self {
        Referral {
            referrer_user_id: row.referrer_user_id,
            referred_user_id: row.referred_user_id,
            status: ReferralStatus::from(row.status),
            date_created: row.date_created,
        }
    }
}

#[derive(Clone)]
pub struct ReferralRepository {
    conn: PgPool,
}

impl ReferralRepository {
    pub fn new(conn: PgPool) -> Self {
        ReferralRepository { conn }
    }
}

#[async_trait]
impl ReferralLedger for ReferralRepository {
    async fn find_by_referrer(&self, referrer_user_id: &str) -> Result<Vec<Referral>, anyhow::Error> {
        let rows = sqlx::query_as::<_, ReferralRow>(
            r#"
                SELECT referrer_user_id, referred_user_id, status, date_created
                FROM referrals WHERE referrer_user_id = $1
                ORDER BY date_created, id
            "#,
        )
        .bind(referrer_user_id)
        .fetch_all(&self.conn)
        .await?;

        Ok(rows.into_iter().map(Referral::from).collect())
    }

    async fn insert(&self, referral: Referral) -> Result<(), anyhow::Error> {
        sqlx::query(
            r#"
                INSERT INTO referrals (referrer_user_id, referred_user_id, status, date_created)
                VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&referral.referrer_user_id)
        .bind(&referral.referred_user_id)
        .bind(referral.status.as_str())
        .bind(referral.date_created)
        .execute(&self.conn)
        .await?;

        Ok(())
    }
}
