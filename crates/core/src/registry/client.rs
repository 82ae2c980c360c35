//! Registry HTTP client with in-memory session management.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use bilans_shared::config::RegistryConfig;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::error::RegistryError;
use super::types::{RegistryInvoice, RegistrySession, SessionStatus};

/// Client for the national e-invoice registry.
///
/// One instance is shared across handlers; the session lives behind a
/// read-write lock so concurrent fetches reuse a valid token and only one
/// caller at a time re-authenticates.
pub struct RegistryClient {
    config: RegistryConfig,
    client: Client,
    session: RwLock<Option<RegistrySession>>,
}

impl RegistryClient {
    /// Builds a client from configuration.
    ///
    /// # Errors
    ///
    /// Fails when the HTTP client cannot be built. Missing credentials are
    /// reported later, on first authentication, so a deployment without
    /// registry access still starts.
    pub fn new(config: RegistryConfig) -> Result<Self, RegistryError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| RegistryError::NotConfigured(e.to_string()))?;

        Ok(Self {
            config,
            client,
            session: RwLock::new(None),
        })
    }

    /// Reports the current session state without touching the network.
    pub async fn status(&self) -> SessionStatus {
        let guard = self.session.read().await;
        match guard.as_ref() {
            Some(s) if s.is_valid_at(Utc::now()) => SessionStatus {
                connected: true,
                valid_until: Some(s.valid_until),
                last_auth_time: Some(s.authenticated_at),
            },
            _ => SessionStatus::disconnected(),
        }
    }

    /// Opens a session unless a valid one already exists.
    ///
    /// Returns the resulting status and whether the existing session was
    /// still good.
    ///
    /// # Errors
    ///
    /// Propagates authentication failures.
    pub async fn refresh(&self) -> Result<(SessionStatus, bool), RegistryError> {
        {
            let guard = self.session.read().await;
            if let Some(s) = guard.as_ref() {
                if s.is_valid_at(Utc::now()) {
                    return Ok((
                        SessionStatus {
                            connected: true,
                            valid_until: Some(s.valid_until),
                            last_auth_time: Some(s.authenticated_at),
                        },
                        true,
                    ));
                }
            }
        }

        let session = self.authenticate().await?;
        let status = SessionStatus {
            connected: true,
            valid_until: Some(session.valid_until),
            last_auth_time: Some(session.authenticated_at),
        };
        *self.session.write().await = Some(session);
        Ok((status, false))
    }

    /// Drops the current session.
    pub async fn invalidate(&self) {
        *self.session.write().await = None;
    }

    /// Fetches invoice headers acquired by the registry in the given range.
    ///
    /// Re-authenticates once when the registry rejects the session token.
    ///
    /// # Errors
    ///
    /// Fails on network errors, authentication failure or an unexpected
    /// response body.
    pub async fn fetch_invoices(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<RegistryInvoice>, RegistryError> {
        const UNAUTHORIZED: u16 = 401;

        let token = self.session_token().await?;
        match self.query_invoices(&token, from, to).await {
            Err(RegistryError::Api { status, .. }) if status == UNAUTHORIZED => {
                warn!("registry rejected session token, re-authenticating");
                self.invalidate().await;
                let token = self.session_token().await?;
                self.query_invoices(&token, from, to)
                    .await
                    .map_err(|e| match e {
                        RegistryError::Api { status, .. } if status == UNAUTHORIZED => {
                            RegistryError::AuthRejected
                        }
                        other => other,
                    })
            }
            other => other,
        }
    }

    async fn session_token(&self) -> Result<String, RegistryError> {
        {
            let guard = self.session.read().await;
            if let Some(s) = guard.as_ref() {
                if s.is_valid_at(Utc::now()) {
                    return Ok(s.token.clone());
                }
            }
        }

        debug!("no valid registry session, authenticating");
        let session = self.authenticate().await?;
        let token = session.token.clone();
        *self.session.write().await = Some(session);
        Ok(token)
    }

    /// Runs the challenge handshake and opens a token session.
    async fn authenticate(&self) -> Result<RegistrySession, RegistryError> {
        if self.config.nip.is_empty() || self.config.api_token.is_empty() {
            return Err(RegistryError::NotConfigured(
                "registry NIP or API token missing".to_string(),
            ));
        }

        let challenge: ChallengeResponse = self
            .post_json(
                "/online/Session/AuthorisationChallenge",
                None,
                &json!({
                    "contextIdentifier": {
                        "type": "onip",
                        "identifier": self.config.nip,
                    }
                }),
            )
            .await?;

        let challenge_millis = challenge.timestamp.timestamp_millis();
        let token_material = format!("{}|{challenge_millis}", self.config.api_token);

        let init: InitTokenResponse = self
            .post_json(
                "/online/Session/InitToken",
                None,
                &json!({
                    "context": {
                        "contextIdentifier": {
                            "type": "onip",
                            "identifier": self.config.nip,
                        }
                    },
                    "init": {
                        "identifier": {
                            "type": "onip",
                            "identifier": self.config.nip,
                        },
                        "type": "token",
                        "token": BASE64.encode(token_material),
                        "challenge": challenge.challenge,
                    }
                }),
            )
            .await?;

        let token = init
            .session_token
            .as_ref()
            .map(|t| t.token.clone())
            .ok_or_else(|| {
                RegistryError::InvalidResponse("init response carried no session token".into())
            })?;
        let valid_until = init
            .session_token
            .as_ref()
            .and_then(|t| t.context.as_ref())
            .map(|c| c.context_expiration_moment)
            .ok_or_else(|| {
                RegistryError::InvalidResponse("init response carried no expiry moment".into())
            })?;

        info!(%valid_until, "registry session opened");

        Ok(RegistrySession {
            token,
            valid_until,
            reference_number: init.reference_number,
            authenticated_at: Utc::now(),
        })
    }

    async fn query_invoices(
        &self,
        token: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<RegistryInvoice>, RegistryError> {
        let from_ts = from
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().to_rfc3339())
            .unwrap_or_default();
        let to_ts = to
            .and_hms_opt(23, 59, 59)
            .map(|dt| dt.and_utc().to_rfc3339())
            .unwrap_or_default();

        debug!(%from_ts, %to_ts, "querying registry invoices");

        let path = format!(
            "/online/Query/Invoice/Sync?PageSize={}&PageOffset=0",
            self.config.page_size
        );
        let result: QueryResponse = self
            .post_json(
                &path,
                Some(token),
                &json!({
                    "queryCriteria": {
                        "subjectType": "subject1",
                        "type": "incremental",
                        "acquisitionTimestampThresholdFrom": from_ts,
                        "acquisitionTimestampThresholdTo": to_ts,
                    }
                }),
            )
            .await?;

        Ok(result
            .invoice_header_list
            .into_iter()
            .map(InvoiceHeader::into_invoice)
            .collect())
    }

    async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        token: Option<&str>,
        body: &serde_json::Value,
    ) -> Result<T, RegistryError> {
        let url = format!("{}{path}", self.config.base_url);
        let mut builder = self.client.post(&url).json(body);
        if let Some(token) = token {
            builder = builder.header("SessionToken", token);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| RegistryError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RegistryError::Api {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| RegistryError::InvalidResponse(e.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct ChallengeResponse {
    challenge: String,
    timestamp: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InitTokenResponse {
    #[serde(default)]
    session_token: Option<SessionTokenBody>,
    #[serde(default)]
    reference_number: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionTokenBody {
    token: String,
    #[serde(default)]
    context: Option<SessionContext>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionContext {
    context_expiration_moment: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    #[serde(default)]
    invoice_header_list: Vec<InvoiceHeader>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InvoiceHeader {
    #[serde(default)]
    ksef_reference_number: String,
    #[serde(default)]
    invoice_reference_number: Option<String>,
    #[serde(default)]
    invoicing_date: Option<NaiveDate>,
    #[serde(default)]
    subject_by: Option<SubjectBy>,
    #[serde(default)]
    subject_to: Option<SubjectTo>,
    #[serde(default)]
    invoice_value_gross: Option<Decimal>,
    #[serde(default)]
    invoice_value_net: Option<Decimal>,
    #[serde(default)]
    currency: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubjectBy {
    #[serde(default)]
    issued_by_name: Option<String>,
    #[serde(default)]
    issued_by_identifier: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubjectTo {
    #[serde(default)]
    issued_to_name: Option<String>,
    #[serde(default)]
    issued_to_identifier: Option<String>,
}

impl InvoiceHeader {
    /// Normalises a raw header to our invoice shape.
    ///
    /// Issuer fields win over recipient fields; the reference number stands
    /// in for a missing invoice number.
    fn into_invoice(self) -> RegistryInvoice {
        let contractor_name = self
            .subject_by
            .as_ref()
            .and_then(|s| s.issued_by_name.clone())
            .or_else(|| {
                self.subject_to
                    .as_ref()
                    .and_then(|s| s.issued_to_name.clone())
            })
            .unwrap_or_else(|| "Nieznany".to_string());
        let contractor_nip = self
            .subject_by
            .as_ref()
            .and_then(|s| s.issued_by_identifier.clone())
            .or_else(|| {
                self.subject_to
                    .as_ref()
                    .and_then(|s| s.issued_to_identifier.clone())
            })
            .unwrap_or_default();

        let gross = self.invoice_value_gross.unwrap_or_default();
        let net = self.invoice_value_net.unwrap_or_default();

        RegistryInvoice {
            invoice_number: self
                .invoice_reference_number
                .clone()
                .unwrap_or_else(|| self.ksef_reference_number.clone()),
            reference_number: self.ksef_reference_number,
            issue_date: self.invoicing_date,
            contractor_name,
            contractor_nip,
            gross_amount: gross,
            net_amount: net,
            vat_amount: gross - net,
            currency: self.currency.unwrap_or_else(|| "PLN".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_header_mapping_prefers_issuer_subject() {
        let header: InvoiceHeader = serde_json::from_value(json!({
            "ksefReferenceNumber": "KSEF-1",
            "invoiceReferenceNumber": "FV 1/2026",
            "invoicingDate": "2026-07-01",
            "subjectBy": { "issuedByName": "Acme", "issuedByIdentifier": "527" },
            "subjectTo": { "issuedToName": "Hotel", "issuedToIdentifier": "999" },
            "invoiceValueGross": 1230.00,
            "invoiceValueNet": 1000.00,
            "currency": "PLN"
        }))
        .unwrap();

        let invoice = header.into_invoice();
        assert_eq!(invoice.contractor_name, "Acme");
        assert_eq!(invoice.contractor_nip, "527");
        assert_eq!(invoice.vat_amount, dec!(230.00));
    }

    #[test]
    fn test_header_mapping_falls_back_everywhere() {
        let header: InvoiceHeader = serde_json::from_value(json!({
            "ksefReferenceNumber": "KSEF-2"
        }))
        .unwrap();

        let invoice = header.into_invoice();
        assert_eq!(invoice.invoice_number, "KSEF-2");
        assert_eq!(invoice.reference_number, "KSEF-2");
        assert_eq!(invoice.contractor_name, "Nieznany");
        assert_eq!(invoice.gross_amount, Decimal::ZERO);
        assert_eq!(invoice.currency, "PLN");
    }
}
