use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub referral_code: Option<String>,
    pub registration_complete: bool,
}

impl UserProfile {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Registration form as submitted by the app. Required fields default to empty
/// so that a missing field surfaces as a validation message instead of a
/// deserialization rejection.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewRegistration {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub zip_code: String,
    #[serde(default)]
    pub referral_code: Option<String>,
}

impl NewRegistration {
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.first_name.trim().is_empty() {
            errors.push("FirstName is required".to_string());
        }
        if self.last_name.trim().is_empty() {
            errors.push("LastName is required".to_string());
        }

        if self.email.trim().is_empty() {
            errors.push("Email is required".to_string());
        } else if !is_valid_email(self.email.trim()) {
            errors.push("Email is not a valid email address".to_string());
        }

        if self.birth_date.is_none() {
            errors.push("BirthDate is required".to_string());
        }

        if self.zip_code.trim().is_empty() {
            errors.push("ZipCode is required".to_string());
        } else if !is_valid_zip_code(&self.zip_code) {
            errors.push("Please enter a valid ZIP code (e.g., 12345 or 12345-6789).".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// The inbound referral code, if one was supplied and is not blank.
    pub fn inbound_referral_code(&self) -> Option<&str> {
        self.referral_code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
    }
}

fn is_valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

// 12345, 12345-6789, 123456789, or a single whitespace separator. Checked
// untrimmed: surrounding whitespace is rejected.
fn is_valid_zip_code(zip: &str) -> bool {
    let bytes = zip.as_bytes();
    let digits = |s: &[u8]| s.iter().all(u8::is_ascii_digit);

    match bytes.len() {
        5 | 9 => digits(bytes),
        10 => {
            digits(&bytes[..5])
                && (bytes[5] == b'-' || bytes[5].is_ascii_whitespace())
                && digits(&bytes[6..])
        }
        _ => false,
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistrationOutcome {
    Registered {
        user_id: String,
        referral_code: String,
        was_referred: bool,
        referred_by: Option<String>,
        input: NewRegistration,
    },
    DuplicateName {
        input: NewRegistration,
    },
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResult {
    pub success: bool,
    pub user_id: Option<String>,
    pub referral_code: Option<String>,
    pub was_referred: bool,
    pub referred_by: Option<String>,
    pub input: NewRegistration,
}

impl From<RegistrationOutcome> for RegistrationResult {
    fn from(outcome: RegistrationOutcome) -> Self {
        match outcome {
            RegistrationOutcome::Registered {
                user_id,
                referral_code,
                was_referred,
                referred_by,
                input,
            } => RegistrationResult {
                success: true,
                user_id: Some(user_id),
                referral_code: Some(referral_code),
                was_referred,
                referred_by,
                input,
            },
            RegistrationOutcome::DuplicateName { input } => RegistrationResult {
                success: false,
                user_id: None,
                referral_code: None,
                was_referred: false,
                referred_by: None,
                input,
            },
        }
    }
}
