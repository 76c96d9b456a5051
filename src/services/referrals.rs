use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::oneshot;

use super::{RequestHandler, Service, ServiceError};
use crate::models::referrals::{
    ReferralHistory, ReferralHistoryEntry, ReferralPage, TrackReferral,
};
use crate::repositories::{ReferralLedger, UserDirectory};

pub const EMAIL_SUBJECT: &str = "You're invited to try the Carton Caps app!";

/// Display name used when a referred user can no longer be resolved.
pub const UNKNOWN_REFERRED_USER: &str = "Unknown";

pub enum ReferralRequest {
    GetPage {
        user_id: String,
        response: oneshot::Sender<Result<ReferralPage, ServiceError>>,
    },
    GetHistory {
        user_id: String,
        response: oneshot::Sender<Result<ReferralHistory, ServiceError>>,
    },
    TrackClick {
        click: TrackReferral,
        response: oneshot::Sender<Result<TrackReferral, ServiceError>>,
    },
}

#[derive(Clone)]
pub struct ReferralRequestHandler {
    directory: Arc<dyn UserDirectory>,
    ledger: Arc<dyn ReferralLedger>,
    link_base: Option<String>,
}

impl ReferralRequestHandler {
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        ledger: Arc<dyn ReferralLedger>,
        link_base: Option<String>,
    ) -> Self {
        ReferralRequestHandler {
            directory,
            ledger,
            link_base,
        }
    }

    pub async fn share_page(&self, user_id: &str) -> Result<ReferralPage, ServiceError> {
        log::info!("Fetching referral page for user {user_id}.");

        let user = self
            .directory
            .find_by_id(user_id)
            .await
            .map_err(|e| ServiceError::Repository("Users".to_string(), e.to_string()))?;

        let Some(user) = user else {
            log::warn!("User not found when fetching referral page: {user_id}.");
            return Err(ServiceError::NotFound("User".to_string()));
        };

        let link_base = match self.link_base.as_deref().map(str::trim) {
            Some(base) if !base.is_empty() => base,
            _ => {
                log::error!("referrals.link_base is missing from configuration.");
                return Err(ServiceError::Misconfigured(
                    "Referral link base is not configured".to_string(),
                ));
            }
        };

        let referral_code = match user.referral_code.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => code.to_string(),
            _ => {
                log::error!("User {user_id} is missing a referral code.");
                return Err(ServiceError::Misconfigured(format!(
                    "User {user_id} has no referral code"
                )));
            }
        };

        let full_referral_link = format!("{link_base}?referral_code={referral_code}");
        log::info!("Generated referral link for user {user_id}: {full_referral_link}");

        Ok(ReferralPage {
            email_message: compose_email_message(&full_referral_link),
            text_message: compose_text_message(&full_referral_link, &referral_code),
            email_subject: EMAIL_SUBJECT.to_string(),
            referral_link_base: link_base.to_string(),
            full_referral_link,
            referral_code,
            phone_number: user.phone_number,
            email: user.email,
        })
    }

    pub async fn history(&self, user_id: &str) -> Result<ReferralHistory, ServiceError> {
        log::info!("Fetching referral history for user {user_id}.");

        let referrals = self
            .ledger
            .find_by_referrer(user_id)
            .await
            .map_err(|e| ServiceError::Repository("Referrals".to_string(), e.to_string()))?;

        let mut entries = Vec::with_capacity(referrals.len());
        for referral in referrals {
            let referred = self
                .directory
                .find_by_id(&referral.referred_user_id)
                .await
                .map_err(|e| ServiceError::Repository("Users".to_string(), e.to_string()))?;

            let name = match referred {
                Some(user) => user.display_name(),
                None => UNKNOWN_REFERRED_USER.to_string(),
            };

            entries.push(ReferralHistoryEntry {
                name,
                status: referral.status,
            });
        }

        log::info!("Retrieved {} referral(s) for user {user_id}.", entries.len());
        Ok(ReferralHistory { referrals: entries })
    }

    /// Records a referral link click. Nothing is stored yet; the click is
    /// logged and echoed back.
    pub fn track(&self, click: TrackReferral) -> Result<TrackReferral, ServiceError> {
        if click.referral_code.trim().is_empty() {
            return Err(ServiceError::ValidationFailed(vec![
                "ReferralCode is required".to_string(),
            ]));
        }

        log::info!(
            "Tracking referral click: code={}, method={:?}, device={:?}, ip={:?}, time={}",
            click.referral_code,
            click.method,
            click.device_id,
            click.ip_address,
            click.timestamp
        );

        Ok(click)
    }
}

fn compose_email_message(referral_link: &str) -> String {
    format!(
        "Hey!\n\n\
         Join me in earning cash for our school by using the Carton Caps app. It's an easy way to make a difference. \
         All you have to do is buy Carton Caps participating products (like Cheerios!) and scan your grocery receipt. \
         Carton Caps are worth $0.10 each and they add up fast! Twice a year, our school receives a check to help pay \
         for whatever we need - equipment, supplies or experiences the kids love!\n\n\
         Download the Carton Caps app here: {referral_link}&method=email"
    )
}

fn compose_text_message(referral_link: &str, referral_code: &str) -> String {
    format!(
        "Check out Carton Caps! Use my code {referral_code} to sign up and support schools: {referral_link}&method=sms"
    )
}

#[async_trait]
impl RequestHandler<ReferralRequest> for ReferralRequestHandler {
    async fn handle_request(&self, request: ReferralRequest) {
        match request {
            ReferralRequest::GetPage { user_id, response } => {
                let page = self.share_page(&user_id).await;
                let _ = response.send(page);
            }
            ReferralRequest::GetHistory { user_id, response } => {
                let history = self.history(&user_id).await;
                let _ = response.send(history);
            }
            ReferralRequest::TrackClick { click, response } => {
                let _ = response.send(self.track(click));
            }
        }
    }
}

pub struct ReferralService;

impl ReferralService {
    pub fn new() -> Self {
        ReferralService {}
    }
}

#[async_trait]
impl Service<ReferralRequest, ReferralRequestHandler> for ReferralService {}
