use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::repositories::{ReferralLedger, UserDirectory};
use crate::settings::Settings;

pub mod http;
pub mod referrals;
pub mod registration;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("Misconfigured: {0}")]
    Misconfigured(String),
    #[error("Validation failed: {}", .0.join("; "))]
    ValidationFailed(Vec<String>),
    #[error("Repository error: {0} - {1}")]
    Repository(String, String),
    #[error("Communication error: {0} - {1}")]
    Communication(String, String),
}

#[async_trait]
pub trait RequestHandler<T>: Send + Sync + 'static
where
    T: Send + 'static,
{
    async fn handle_request(&self, request: T);
}

#[async_trait]
pub trait Service<T, H>: Send + Sync + 'static
where
    T: Send + 'static,
    H: RequestHandler<T> + Clone + Send,
{
    async fn run(&mut self, handler: H, receiver: &mut mpsc::Receiver<T>) {
        while let Some(request) = receiver.recv().await {
            let handler = handler.clone();

            tokio::spawn(async move {
                handler.handle_request(request).await;
            });
        }
    }
}

/// Senders for every running service.
#[derive(Clone)]
pub struct ServiceChannels {
    pub registration: mpsc::Sender<registration::RegistrationRequest>,
    pub referrals: mpsc::Sender<referrals::ReferralRequest>,
}

pub fn spawn_services(
    directory: Arc<dyn UserDirectory>,
    ledger: Arc<dyn ReferralLedger>,
    link_base: Option<String>,
) -> ServiceChannels {
    let (registration_tx, mut registration_rx) = mpsc::channel(512);
    let (referral_tx, mut referral_rx) = mpsc::channel(512);

    let mut registration_service = registration::RegistrationService::new();
    let mut referral_service = referrals::ReferralService::new();

    log::info!("Starting registration service.");
    let registration_directory = directory.clone();
    let registration_ledger = ledger.clone();
    tokio::spawn(async move {
        registration_service
            .run(
                registration::RegistrationRequestHandler::new(
                    registration_directory,
                    registration_ledger,
                ),
                &mut registration_rx,
            )
            .await;
    });

    log::info!("Starting referral service.");
    tokio::spawn(async move {
        referral_service
            .run(
                referrals::ReferralRequestHandler::new(directory, ledger, link_base),
                &mut referral_rx,
            )
            .await;
    });

    ServiceChannels {
        registration: registration_tx,
        referrals: referral_tx,
    }
}

pub async fn start_services(
    settings: Settings,
    directory: Arc<dyn UserDirectory>,
    ledger: Arc<dyn ReferralLedger>,
) -> Result<(), anyhow::Error> {
    if settings.referrals.link_base.is_none() {
        log::warn!("referrals.link_base is not set; share page requests will fail.");
    }

    let channels = spawn_services(directory, ledger, settings.referrals.link_base);

    log::info!("Starting HTTP server.");
    http::start_http_server(&settings.server.listen, channels).await
}
