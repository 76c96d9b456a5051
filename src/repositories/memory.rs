use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{ReferralLedger, UserDirectory};
use crate::models::{
    referrals::{Referral, ReferralStatus},
    users::UserProfile,
};

#[derive(Clone, Default)]
pub struct InMemoryUserDirectory {
    users: Arc<RwLock<Vec<UserProfile>>>,
}

impl InMemoryUserDirectory {
    pub fn with_users(users: Vec<UserProfile>) -> Self {
        Self {
            users: Arc::new(RwLock::new(users)),
        }
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_by_id(&self, user_id: &str) -> Result<Option<UserProfile>, anyhow::Error> {
        let users = self.users.read().await;
        Ok(users.iter().find(|user| user.user_id == user_id).cloned())
    }

    async fn find_by_referral_code(
        &self,
        referral_code: &str,
    ) -> Result<Option<UserProfile>, anyhow::Error> {
        let users = self.users.read().await;
        Ok(users
            .iter()
            .find(|user| {
                user.referral_code
                    .as_deref()
                    .is_some_and(|code| code.eq_ignore_ascii_case(referral_code))
            })
            .cloned())
    }

    async fn exists_by_name(&self, first_name: &str, last_name: &str) -> Result<bool, anyhow::Error> {
        let first_name = first_name.to_lowercase();
        let last_name = last_name.to_lowercase();

        let users = self.users.read().await;
        Ok(users.iter().any(|user| {
            user.first_name.to_lowercase() == first_name && user.last_name.to_lowercase() == last_name
        }))
    }

    async fn insert(&self, user: UserProfile) -> Result<(), anyhow::Error> {
        self.users.write().await.push(user);
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryReferralLedger {
    referrals: Arc<RwLock<Vec<Referral>>>,
}

impl InMemoryReferralLedger {
    pub fn with_referrals(referrals: Vec<Referral>) -> Self {
        Self {
            referrals: Arc::new(RwLock::new(referrals)),
        }
    }

    pub async fn len(&self) -> usize {
        self.referrals.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.referrals.read().await.is_empty()
    }
}

#[async_trait]
impl ReferralLedger for InMemoryReferralLedger {
    async fn find_by_referrer(&self, referrer_user_id: &str) -> Result<Vec<Referral>, anyhow::Error> {
        let referrals = self.referrals.read().await;
        Ok(referrals
            .iter()
            .filter(|referral| referral.referrer_user_id == referrer_user_id)
            .cloned()
            .collect())
    }

    async fn insert(&self, referral: Referral) -> Result<(), anyhow::Error> {
        self.referrals.write().await.push(referral);
        Ok(())
    }
}

/// Demo data set served when the in-memory backend is seeded.
pub fn seeded() -> (InMemoryUserDirectory, InMemoryReferralLedger) {
    let users = [
        ("user1", "Phil", "Phan", "me@philphan.com", "plp1013", "952-872-1211"),
        ("user2", "Sam", "Kirchmeier", "skirchmeier@livefront.com", "vpeng01", "952-872-1001"),
        ("user3", "Adam", "May", "amay@livefront.com", "direng02", "952-872-1002"),
        ("user4", "Brian", "Yencho", "byencho@livefront.com", "direng03", "952-872-1003"),
        ("user5", "Forrest", "Tracy", "ftracy@livefront.com", "direng04", "952-872-1004"),
        ("user6", "Steve", "Horn", "shorn@livefront.com", "direng05", "952-872-1005"),
        ("user7", "James", "Fishwick", "jfishwick@livefront.com", "dirsol06", "952-872-1006"),
        ("user8", "Collin", "Flynn", "cflynn@livefront.com", "prieng07", "952-872-1007"),
        ("user9", "Sean", "Weiser", "sweiser@livefront.com", "prieng08", "952-872-1008"),
        ("user10", "Adrian", "Missy", "amissy@livefront.com", "solarc09", "952-872-1009"),
        ("user11", "Ameer", "Akashe", "aakashe@livefront.com", "solarc10", "952-872-1010"),
        ("user12", "Sean", "Ephraim", "sephraim@livefront.com", "solarc11", "952-872-1011"),
        ("user13", "Will", "Redington", "wredington@livefront.com", "solarc12", "952-872-1012"),
    ]
    .into_iter()
    .map(|(user_id, first_name, last_name, email, referral_code, phone_number)| UserProfile {
        user_id: user_id.to_string(),
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        email: Some(email.to_string()),
        phone_number: Some(phone_number.to_string()),
        referral_code: Some(referral_code.to_string()),
        registration_complete: true,
    })
    .collect();

    let referrals = vec![
        Referral::pending("user1", "user3"),
        Referral {
            status: ReferralStatus::Accepted,
            ..Referral::pending("user1", "user6")
        },
    ];

    (
        InMemoryUserDirectory::with_users(users),
        InMemoryReferralLedger::with_referrals(referrals),
    )
}
