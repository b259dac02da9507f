// Blocking client for the two Horizon endpoints this tool consumes.
use reqwest::blocking::Client;
use serde::Deserialize;

use crate::error::BootstrapError;

/// Capability interface over the network: look up an account's sequence
/// number and submit a signed envelope. Stages depend on this trait so they
/// can be exercised against a mock.
pub trait Horizon {
    fn sequence_number(&self, account_id: &str) -> Result<i64, BootstrapError>;
    fn submit(&self, envelope_xdr: &str) -> Result<(), BootstrapError>;
}

pub struct HorizonClient {
    base_url: String,
    client: Client,
}

#[derive(Deserialize)]
struct AccountResponse {
    // Horizon serializes sequence numbers as JSON strings.
    sequence: String,
}

impl HorizonClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }
}

impl Horizon for HorizonClient {
    fn sequence_number(&self, account_id: &str) -> Result<i64, BootstrapError> {
        let url = format!("{}/accounts/{}", self.base_url, account_id);
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| BootstrapError::Horizon(format!("account lookup failed: {e}")))?;
        if !response.status().is_success() {
            return Err(BootstrapError::Horizon(format!(
                "account lookup for {} returned {}",
                account_id,
                response.status()
            )));
        }
        let account: AccountResponse = response
            .json()
            .map_err(|e| BootstrapError::Horizon(format!("bad account response: {e}")))?;
        account
            .sequence
            .parse::<i64>()
            .map_err(|e| BootstrapError::Horizon(format!("bad sequence number: {e}")))
    }

    fn submit(&self, envelope_xdr: &str) -> Result<(), BootstrapError> {
        let url = format!("{}/transactions", self.base_url);
        let response = self
            .client
            .post(&url)
            .form(&[("tx", envelope_xdr)])
            .send()
            .map_err(|e| BootstrapError::Horizon(format!("transaction submission failed: {e}")))?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        // Surface the result codes Horizon attaches to rejections.
        let detail = response
            .json::<serde_json::Value>()
            .ok()
            .and_then(|body| body.get("extras")?.get("result_codes").cloned())
            .map(|codes| codes.to_string())
            .unwrap_or_default();
        Err(BootstrapError::Horizon(format!(
            "transaction rejected with {status}: {detail}"
        )))
    }
}
