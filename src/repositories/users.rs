use crate::models::users;

use async_trait::async_trait;
use sqlx::PgPool;

use super::UserDirectory;

#[derive(Clone)]
pub struct UserRepository {
    conn: PgPool,
}

impl UserRepository {
    pub fn new(conn: PgPool) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl UserDirectory for UserRepository {
    async fn find_by_id(&self, user_id: &str) -> Result<Option<users::UserProfile>, anyhow::Error> {
        let user = sqlx::query_as::<_, users::UserProfile>(
            r#"
                SELECT user_id, first_name, last_name, email, phone_number, referral_code, registration_complete
                FROM users WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.conn)
        .await?;

        Ok(user)
    }

    async fn find_by_referral_code(
        &self,
        referral_code: &str,
    ) -> Result<Option<users::UserProfile>, anyhow::Error> {
        let user = sqlx::query_as::<_, users::UserProfile>(
            r#"
                SELECT user_id, first_name, last_name, email, phone_number, referral_code, registration_complete
                FROM users WHERE LOWER(referral_code) = LOWER($1)
            "#,
        )
        .bind(referral_code)
        .fetch_optional(&self.conn)
        .await?;

        Ok(user)
    }

    async fn exists_by_name(&self, first_name: &str, last_name: &str) -> Result<bool, anyhow::Error> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM users WHERE LOWER(first_name) = LOWER($1) AND LOWER(last_name) = LOWER($2))",
        )
        .bind(first_name)
        .bind(last_name)
        .fetch_one(&self.conn)
        .await?;

        Ok(exists)
    }

    async fn insert(&self, user: users::UserProfile) -> Result<(), anyhow::Error> {
        sqlx::query(
            r#"
                INSERT INTO users
                (user_id, first_name, last_name, email, phone_number, referral_code, registration_complete)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&user.user_id)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.phone_number)
        .bind(&user.referral_code)
        .bind(user.registration_complete)
        .execute(&self.conn)
        .await?;

        Ok(())
    }
}
