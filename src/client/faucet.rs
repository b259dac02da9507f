use reqwest::blocking::Client;

use crate::error::BootstrapError;

/// Capability interface over the account-funding faucet.
pub trait Faucet {
    fn fund(&self, address: &str) -> Result<(), BootstrapError>;
}

pub struct FriendbotClient {
    url: String,
    client: Client,
}

impl FriendbotClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: Client::new(),
        }
    }
}

impl Faucet for FriendbotClient {
    fn fund(&self, address: &str) -> Result<(), BootstrapError> {
        let response = self
            .client
            .get(&self.url)
            .query(&[("addr", address)])
            .send()
            .map_err(|e| BootstrapError::Faucet(format!("could not call friendbot: {e}")))?;
        if response.status().as_u16() != 200 {
            return Err(BootstrapError::Faucet(format!(
                "got unexpected status code {} from friendbot",
                response.status().as_u16()
            )));
        }
        // Body is read so the connection can be reused, content is irrelevant.
        let _ = response.text();
        Ok(())
    }
}
