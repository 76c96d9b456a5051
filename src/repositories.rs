use std::sync::Arc;

use async_trait::async_trait;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;

use crate::models::{referrals::Referral, users::UserProfile};
use crate::settings::{Backend, Settings};

pub mod memory;
pub mod referrals;
pub mod users;

/// Store of user profiles.
///
/// Name and referral-code matching are case-insensitive.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_id(&self, user_id: &str) -> Result<Option<UserProfile>, anyhow::Error>;

    async fn find_by_referral_code(
        &self,
        referral_code: &str,
    ) -> Result<Option<UserProfile>, anyhow::Error>;

    async fn exists_by_name(&self, first_name: &str, last_name: &str)
        -> Result<bool, anyhow::Error>;

    async fn insert(&self, user: UserProfile) -> Result<(), anyhow::Error>;
}

/// Store of referral relationships. Records are returned in creation order.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReferralLedger: Send + Sync {
    async fn find_by_referrer(&self, referrer_user_id: &str)
        -> Result<Vec<Referral>, anyhow::Error>;

    async fn insert(&self, referral: Referral) -> Result<(), anyhow::Error>;
}

/// Schema for the postgres backend, embedded from `migrations/`.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

pub type Stores = (Arc<dyn UserDirectory>, Arc<dyn ReferralLedger>);

pub async fn connect(settings: &Settings) -> Result<Stores, anyhow::Error> {
    match settings.storage.backend {
        Backend::Memory => {
            let (directory, ledger) = if settings.storage.seed {
                log::info!("Using seeded in-memory storage.");
                memory::seeded()
            } else {
                log::info!("Using empty in-memory storage.");
                (
                    memory::InMemoryUserDirectory::default(),
                    memory::InMemoryReferralLedger::default(),
                )
            };

            Ok((Arc::new(directory), Arc::new(ledger)))
        }
        Backend::Postgres => {
            let postgres = settings
                .postgres
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("Missing [postgres] settings for postgres storage"))?;

            let conn = PgPoolOptions::new()
                .max_connections(postgres.max_connections)
                .connect(&postgres.url)
                .await?;
            log::info!("Connected to postgres storage.");

            MIGRATOR.run(&conn).await?;
            log::info!("Applied {} postgres migration(s).", MIGRATOR.iter().count());

            Ok((
                Arc::new(users::UserRepository::new(conn.clone())),
                Arc::new(referrals::ReferralRepository::new(conn)),
            ))
        }
    }
}
