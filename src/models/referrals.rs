use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a referral. Registration only ever writes `Pending`;
/// other states come from downstream workflows and are kept verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum ReferralStatus {
    Pending,
    Accepted,
    Rejected,
    Other(String),
}

impl ReferralStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ReferralStatus::Pending => "Pending",
            ReferralStatus::Accepted => "Accepted",
            ReferralStatus::Rejected => "Rejected",
            ReferralStatus::Other(status) => status,
        }
    }
}

impl From<String> for ReferralStatus {
    fn from(status: String) -> Self {
        match status.as_str() {
            "Pending" => ReferralStatus::Pending,
            "Accepted" => ReferralStatus::Accepted,
            "Rejected" => ReferralStatus::Rejected,
            _ => ReferralStatus::Other(status),
        }
    }
}

impl From<&str> for ReferralStatus {
    fn from(status: &str) -> Self {
        ReferralStatus::from(status.to_string())
    }
}

impl From<ReferralStatus> for String {
    fn from(status: ReferralStatus) -> Self {
        match status {
            ReferralStatus::Other(status) => status,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ReferralStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Referral {
    pub referrer_user_id: String,
    pub referred_user_id: String,
    pub status: ReferralStatus,
    pub date_created: DateTime<Utc>,
}

impl Referral {
    pub fn pending(referrer_user_id: &str, referred_user_id: &str) -> Self {
        Referral {
            referrer_user_id: referrer_user_id.to_string(),
            referred_user_id: referred_user_id.to_string(),
            status: ReferralStatus::Pending,
            date_created: Utc::now(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReferralPage {
    pub referral_code: String,
    pub referral_link_base: String,
    pub full_referral_link: String,
    pub email_subject: String,
    pub email_message: String,
    pub text_message: String,
    pub phone_number: Option<String>,
    pub email: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct ReferralHistoryEntry {
    pub name: String,
    pub status: ReferralStatus,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ReferralHistory {
    pub referrals: Vec<ReferralHistoryEntry>,
}

/// A click on a shared referral link, reported by the app.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TrackReferral {
    #[serde(default)]
    pub referral_code: String,
    pub method: Option<String>,
    pub device_id: Option<String>,
    pub ip_address: Option<String>,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_status_round_trips_verbatim() {
        let status = ReferralStatus::from("Expired");
        assert_eq!(status, ReferralStatus::Other("Expired".to_string()));
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"Expired\"");
    }

    #[test]
    fn known_statuses_parse() {
        let status: ReferralStatus = serde_json::from_str("\"Accepted\"").unwrap();
        assert_eq!(status, ReferralStatus::Accepted);
        assert_eq!(ReferralStatus::Pending.to_string(), "Pending");
    }

    #[test]
    fn track_request_defaults_timestamp() {
        let click: TrackReferral =
            serde_json::from_str(r#"{"referralCode":"PLP1013","method":"sms"}"#).unwrap();

        assert_eq!(click.referral_code, "PLP1013");
        assert_eq!(click.method.as_deref(), Some("sms"));
        assert!(click.device_id.is_none());
        assert!(click.timestamp <= Utc::now());
    }
}
