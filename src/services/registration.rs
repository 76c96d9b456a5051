use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::oneshot;
use uuid::Uuid;

use super::{RequestHandler, Service, ServiceError};
use crate::models::{
    referrals::Referral,
    users::{NewRegistration, RegistrationOutcome, UserProfile},
};
use crate::repositories::{ReferralLedger, UserDirectory};

/// Length of issued referral codes. Codes are upper-cased hex taken from a
/// v4 UUID, so the space is 16^6 (~16.7M) codes and collisions are not
/// retried.
pub const REFERRAL_CODE_LEN: usize = 6;

pub enum RegistrationRequest {
    Register {
        registration: NewRegistration,
        response: oneshot::Sender<Result<RegistrationOutcome, ServiceError>>,
    },
}

#[derive(Clone)]
pub struct RegistrationRequestHandler {
    directory: Arc<dyn UserDirectory>,
    ledger: Arc<dyn ReferralLedger>,
}

impl RegistrationRequestHandler {
    pub fn new(directory: Arc<dyn UserDirectory>, ledger: Arc<dyn ReferralLedger>) -> Self {
        RegistrationRequestHandler { directory, ledger }
    }

    /// Registers a new user and links them to the owner of the supplied
    /// referral code, if any. A name that is already taken yields
    /// [`RegistrationOutcome::DuplicateName`] and writes nothing; an unknown
    /// referral code is ignored.
    pub async fn register(
        &self,
        registration: NewRegistration,
    ) -> Result<RegistrationOutcome, ServiceError> {
        let first_name = registration.first_name.trim();
        let last_name = registration.last_name.trim();

        let duplicate = self
            .directory
            .exists_by_name(first_name, last_name)
            .await
            .map_err(|e| ServiceError::Repository("Users".to_string(), e.to_string()))?;

        if duplicate {
            log::info!("Rejected registration for {first_name} {last_name}: name already registered.");
            return Ok(RegistrationOutcome::DuplicateName {
                input: registration,
            });
        }

        let user_id = Uuid::new_v4().hyphenated().to_string();
        let referral_code = new_referral_code();

        let user = UserProfile {
            user_id: user_id.clone(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: Some(registration.email.clone()),
            phone_number: registration.phone_number.clone(),
            referral_code: Some(referral_code.clone()),
            registration_complete: false,
        };

        self.directory
            .insert(user)
            .await
            .map_err(|e| ServiceError::Repository("Users".to_string(), e.to_string()))?;

        let referrer = match registration.inbound_referral_code() {
            Some(code) => self
                .directory
                .find_by_referral_code(code)
                .await
                .map_err(|e| ServiceError::Repository("Users".to_string(), e.to_string()))?,
            None => None,
        };

        let referred_by = match referrer {
            Some(referrer) => {
                self.ledger
                    .insert(Referral::pending(&referrer.user_id, &user_id))
                    .await
                    .map_err(|e| ServiceError::Repository("Referrals".to_string(), e.to_string()))?;

                Some(referrer.display_name())
            }
            None => {
                if let Some(code) = registration.inbound_referral_code() {
                    log::debug!("Ignoring unknown referral code {code} for user {user_id}.");
                }
                None
            }
        };

        log::info!(
            "Registered user {user_id} with referral code {referral_code} (referred: {}).",
            referred_by.is_some()
        );

        Ok(RegistrationOutcome::Registered {
            user_id,
            referral_code,
            was_referred: referred_by.is_some(),
            referred_by,
            input: registration,
        })
    }
}

fn new_referral_code() -> String {
    Uuid::new_v4().simple().to_string()[..REFERRAL_CODE_LEN].to_uppercase()
}

#[async_trait]
impl RequestHandler<RegistrationRequest> for RegistrationRequestHandler {
    async fn handle_request(&self, request: RegistrationRequest) {
        match request {
            RegistrationRequest::Register {
                registration,
                response,
            } => {
                let outcome = self.register(registration).await;
                let _ = response.send(outcome);
            }
        }
    }
}

pub struct RegistrationService;

impl RegistrationService {
    pub fn new() -> Self {
        RegistrationService {}
    }
}

#[async_trait]
impl Service<RegistrationRequest, RegistrationRequestHandler> for RegistrationService {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::referrals::ReferralStatus;
    use crate::repositories::memory::{InMemoryReferralLedger, InMemoryUserDirectory};
    use crate::repositories::{MockReferralLedger, MockUserDirectory};
    use chrono::NaiveDate;

    fn registration(first_name: &str, last_name: &str, referral_code: Option<&str>) -> NewRegistration {
        NewRegistration {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: "new.user@example.com".to_string(),
            phone_number: Some("612-555-0100".to_string()),
            birth_date: NaiveDate::from_ymd_opt(1988, 2, 29),
            zip_code: "55401".to_string(),
            referral_code: referral_code.map(str::to_string),
        }
    }

    fn referrer() -> UserProfile {
        UserProfile {
            user_id: "user1".to_string(),
            first_name: "Phil".to_string(),
            last_name: "Phan".to_string(),
            email: Some("me@philphan.com".to_string()),
            phone_number: None,
            referral_code: Some("PLP1013".to_string()),
            registration_complete: true,
        }
    }

    fn engine(
        directory: &InMemoryUserDirectory,
        ledger: &InMemoryReferralLedger,
    ) -> RegistrationRequestHandler {
        RegistrationRequestHandler::new(Arc::new(directory.clone()), Arc::new(ledger.clone()))
    }

    #[test]
    fn referral_codes_are_short_uppercase_tokens() {
        let code = new_referral_code();

        assert_eq!(code.len(), REFERRAL_CODE_LEN);
        assert!(code
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[tokio::test]
    async fn registers_unreferred_user() {
        let directory = InMemoryUserDirectory::default();
        let ledger = InMemoryReferralLedger::default();
        let input = registration("Jane", "Smith", None);

        let outcome = engine(&directory, &ledger).register(input.clone()).await.unwrap();

        let RegistrationOutcome::Registered {
            user_id,
            referral_code,
            was_referred,
            referred_by,
            input: echoed,
        } = outcome
        else {
            panic!("expected a successful registration");
        };

        assert!(!user_id.is_empty());
        assert_eq!(referral_code.len(), REFERRAL_CODE_LEN);
        assert!(!was_referred);
        assert!(referred_by.is_none());
        assert_eq!(echoed, input);

        let stored = directory.find_by_id(&user_id).await.unwrap().unwrap();
        assert_eq!(stored.referral_code.as_deref(), Some(referral_code.as_str()));
        assert_eq!(stored.email.as_deref(), Some("new.user@example.com"));
        assert!(ledger.is_empty().await);
    }

    #[tokio::test]
    async fn allocates_distinct_identities() {
        let directory = InMemoryUserDirectory::default();
        let ledger = InMemoryReferralLedger::default();
        let engine = engine(&directory, &ledger);

        let first = engine.register(registration("Jane", "Smith", None)).await.unwrap();
        let second = engine.register(registration("Bob", "Jones", None)).await.unwrap();

        match (first, second) {
            (
                RegistrationOutcome::Registered { user_id: a, .. },
                RegistrationOutcome::Registered { user_id: b, .. },
            ) => assert_ne!(a, b),
            other => panic!("unexpected outcomes: {other:?}"),
        }
        assert_eq!(directory.len().await, 2);
    }

    #[tokio::test]
    async fn links_referrer_when_code_matches() {
        let directory = InMemoryUserDirectory::with_users(vec![referrer()]);
        let ledger = InMemoryReferralLedger::default();

        let outcome = engine(&directory, &ledger)
            .register(registration("Jane", "Smith", Some("plp1013")))
            .await
            .unwrap();

        let RegistrationOutcome::Registered {
            user_id,
            was_referred,
            referred_by,
            ..
        } = outcome
        else {
            panic!("expected a successful registration");
        };

        assert!(was_referred);
        assert_eq!(referred_by.as_deref(), Some("Phil Phan"));

        let referrals = ledger.find_by_referrer("user1").await.unwrap();
        assert_eq!(referrals.len(), 1);
        assert_eq!(referrals[0].referred_user_id, user_id);
        assert_eq!(referrals[0].status, ReferralStatus::Pending);
    }

    #[tokio::test]
    async fn ignores_unknown_referral_code() {
        let directory = InMemoryUserDirectory::with_users(vec![referrer()]);
        let ledger = InMemoryReferralLedger::default();

        let outcome = engine(&directory, &ledger)
            .register(registration("Jane", "Smith", Some("ZZZ999")))
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            RegistrationOutcome::Registered {
                was_referred: false,
                referred_by: None,
                ..
            }
        ));
        assert!(ledger.is_empty().await);
        assert_eq!(directory.len().await, 2);
    }

    #[tokio::test]
    async fn duplicate_name_writes_nothing() {
        let mut directory = MockUserDirectory::new();
        directory
            .expect_exists_by_name()
            .withf(|first, last| first == "phil" && last == "PHAN")
            .times(1)
            .returning(|_, _| Ok(true));
        directory.expect_insert().never();
        directory.expect_find_by_referral_code().never();

        let mut ledger = MockReferralLedger::new();
        ledger.expect_insert().never();

        let engine = RegistrationRequestHandler::new(Arc::new(directory), Arc::new(ledger));
        let input = registration("phil", "PHAN", Some("PLP1013"));

        let outcome = engine.register(input.clone()).await.unwrap();

        assert_eq!(outcome, RegistrationOutcome::DuplicateName { input });
    }

    #[tokio::test]
    async fn padded_name_matches_existing_user() {
        let directory = InMemoryUserDirectory::with_users(vec![referrer()]);
        let ledger = InMemoryReferralLedger::default();
        let input = registration("Phil ", " phan", None);

        let outcome = engine(&directory, &ledger).register(input.clone()).await.unwrap();

        assert_eq!(outcome, RegistrationOutcome::DuplicateName { input });
        assert_eq!(directory.len().await, 1);
        assert!(ledger.is_empty().await);
    }

    #[tokio::test]
    async fn stores_trimmed_names() {
        let directory = InMemoryUserDirectory::default();
        let ledger = InMemoryReferralLedger::default();

        let outcome = engine(&directory, &ledger)
            .register(registration("  Jane ", "Smith ", None))
            .await
            .unwrap();

        let RegistrationOutcome::Registered { user_id, .. } = outcome else {
            panic!("expected a successful registration");
        };

        let stored = directory.find_by_id(&user_id).await.unwrap().unwrap();
        assert_eq!(stored.first_name, "Jane");
        assert_eq!(stored.last_name, "Smith");
        assert_eq!(stored.display_name(), "Jane Smith");
    }

    #[tokio::test]
    async fn blank_referral_code_skips_lookup() {
        let mut directory = MockUserDirectory::new();
        directory.expect_exists_by_name().returning(|_, _| Ok(false));
        directory.expect_insert().times(1).returning(|_| Ok(()));
        directory.expect_find_by_referral_code().never();

        let mut ledger = MockReferralLedger::new();
        ledger.expect_insert().never();

        let engine = RegistrationRequestHandler::new(Arc::new(directory), Arc::new(ledger));
        let outcome = engine
            .register(registration("Jane", "Smith", Some("  ")))
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            RegistrationOutcome::Registered {
                was_referred: false,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn storage_failure_propagates() {
        let mut directory = MockUserDirectory::new();
        directory.expect_exists_by_name().returning(|_, _| Ok(false));
        directory
            .expect_insert()
            .returning(|_| Err(anyhow::anyhow!("connection refused")));

        let engine =
            RegistrationRequestHandler::new(Arc::new(directory), Arc::new(MockReferralLedger::new()));
        let result = engine.register(registration("Jane", "Smith", None)).await;

        match result {
            Err(ServiceError::Repository(repository, message)) => {
                assert_eq!(repository, "Users");
                assert!(message.contains("connection refused"));
            }
            other => panic!("expected repository error, got {other:?}"),
        }
    }
}
