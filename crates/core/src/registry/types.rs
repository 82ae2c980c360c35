//! Registry session and invoice types.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How long before expiry a session token is treated as dead.
///
/// A token that expires mid-request is worse than an early refresh.
pub const EXPIRY_SKEW: Duration = Duration::seconds(60);

/// An open registry session.
#[derive(Debug, Clone)]
pub struct RegistrySession {
    /// Session token sent on every authenticated request.
    pub token: String,
    /// Server-reported expiry moment.
    pub valid_until: DateTime<Utc>,
    /// Server-assigned reference number for the session, if any.
    pub reference_number: Option<String>,
    /// When the session was opened.
    pub authenticated_at: DateTime<Utc>,
}

impl RegistrySession {
    /// True while the token is usable, with the expiry skew applied.
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.valid_until > now + EXPIRY_SKEW
    }
}

/// Session status as reported to API clients.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    /// Whether an open session exists.
    pub connected: bool,
    /// Expiry moment of the current session.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<DateTime<Utc>>,
    /// When the current session was opened.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_auth_time: Option<DateTime<Utc>>,
}

impl SessionStatus {
    /// Status for a missing or expired session.
    #[must_use]
    pub const fn disconnected() -> Self {
        Self {
            connected: false,
            valid_until: None,
            last_auth_time: None,
        }
    }
}

/// One invoice header fetched from the registry, normalised to our shape.
///
/// Serialized to API clients on fetch and accepted back verbatim on import,
/// so both directions share this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryInvoice {
    /// Registry-wide unique reference number.
    pub reference_number: String,
    /// Invoice number; falls back to the reference number when the issuer
    /// did not send one.
    pub invoice_number: String,
    /// Issue date.
    #[serde(default)]
    pub issue_date: Option<NaiveDate>,
    /// Counterparty name.
    pub contractor_name: String,
    /// Counterparty tax id.
    #[serde(default)]
    pub contractor_nip: String,
    /// Gross value.
    pub gross_amount: Decimal,
    /// Net value.
    pub net_amount: Decimal,
    /// VAT value, derived as gross minus net when not reported.
    pub vat_amount: Decimal,
    /// ISO currency code.
    pub currency: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(valid_for: Duration) -> RegistrySession {
        let now = Utc::now();
        RegistrySession {
            token: "t".into(),
            valid_until: now + valid_for,
            reference_number: None,
            authenticated_at: now,
        }
    }

    #[test]
    fn test_session_valid_well_before_expiry() {
        let s = session(Duration::hours(1));
        assert!(s.is_valid_at(Utc::now()));
    }

    #[test]
    fn test_session_invalid_inside_skew_window() {
        let s = session(Duration::seconds(30));
        assert!(!s.is_valid_at(Utc::now()));
    }

    #[test]
    fn test_session_invalid_after_expiry() {
        let s = session(Duration::seconds(-10));
        assert!(!s.is_valid_at(Utc::now()));
    }
}
