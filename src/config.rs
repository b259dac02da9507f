use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// 0.1 XLM, well above the network minimum so submissions survive surge
/// pricing on the testnet.
const DEFAULT_BASE_FEE: u32 = 1_000_000;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BootstrapConfig {
    pub horizon_url: String,
    pub friendbot_url: String,
    pub network_passphrase: String,
    pub input_file: String,
    pub base_fee: u32,
    /// Absolute validity window of each submitted transaction, in seconds.
    pub tx_timeout_secs: u64,
    pub home_domain: String,
    /// Account names (as they appear in the input file) whose home domain is
    /// set and which are excluded from the trustline stage.
    pub issuer_accounts: Vec<String>,
    /// Assets every non-issuer account gets a trustline to.
    pub assets: Vec<AssetConfig>,
    pub bridge: BridgeConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AssetConfig {
    pub code: String,
    pub issuer: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BridgeConfig {
    /// Registry name of the account that pays the bridge funding.
    pub funding_account: String,
    /// Code of the configured asset used for funding.
    pub asset_code: String,
    /// Whole tokens paid to each destination.
    pub funding_amount: u64,
    pub destinations: Vec<String>,
    /// Registry name of the bridge account whose signers are upgraded.
    pub signer_account: String,
    pub signers: Vec<String>,
    pub thresholds: ThresholdConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy)]
pub struct ThresholdConfig {
    pub low: u8,
    pub medium: u8,
    pub high: u8,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            horizon_url: "https://horizon-testnet.stellar.org".to_string(),
            friendbot_url: "https://friendbot.stellar.org/".to_string(),
            network_passphrase: "Test SDF Network ; September 2015".to_string(),
            input_file: "testnet_secrets.csv".to_string(),
            base_fee: DEFAULT_BASE_FEE,
            tx_timeout_secs: 60,
            home_domain: "www2.threefold.io".to_string(),
            issuer_accounts: vec![
                "TFT issuer".to_string(),
                "TFTA issuer".to_string(),
                "FreeTFT issuer".to_string(),
            ],
            assets: vec![
                AssetConfig {
                    code: "TFT".to_string(),
                    issuer: "GA47YZA3PKFUZMPLQ3B5F2E3CJIB57TGGU7SPCQT2WAEYKN766PWIMB3"
                        .to_string(),
                },
                AssetConfig {
                    code: "TFTA".to_string(),
                    issuer: "GB55A4RR4G2MIORJTQA4L6FENZU7K4W7ATGY6YOT2CW47M5SZYGYKSCT"
                        .to_string(),
                },
                AssetConfig {
                    code: "FreeTFT".to_string(),
                    issuer: "GBLDUINEFYTF7XEE7YNWA3JQS4K2VD37YU7I2YAE7R5AHZDKQXSS2J6R"
                        .to_string(),
                },
            ],
            bridge: BridgeConfig {
                funding_account: "TFT issuer".to_string(),
                asset_code: "TFT".to_string(),
                funding_amount: 1_000_000,
                destinations: vec![
                    // Devnet and QA net bridges
                    "GDHJP6TF3UXYXTNEZ2P36J5FH7W4BJJQ4AYYAXC66I2Q2AH5B6O6BCFG".to_string(),
                    "GAQH7XXFBRWXT2SBK6AHPOLXDCLXVFAKFSOJIRMRNCDINWKHGI6UYVKM".to_string(),
                ],
                signer_account: "DevnetBridge".to_string(),
                signers: vec![
                    "GDRVBYUUP5NGH5VDMKXP3SOIU4TRNHE2XI372UC24ZL2KLKHE2KQTY2E".to_string(),
                    "GCUCIV7SG4R2Z5M3A3U5EU3PLEJKQJI5M2HDYZUDLDXDVFBJ3REJL6VP".to_string(),
                ],
                thresholds: ThresholdConfig {
                    low: 1,
                    medium: 2,
                    high: 2,
                },
            },
        }
    }
}

impl BootstrapConfig {
    pub fn load_or_default(path: &str) -> Self {
        if std::path::Path::new(path).exists() {
            match std::fs::read_to_string(path) {
                Ok(s) => match toml::from_str(&s) {
                    Ok(c) => {
                        info!("config loaded from {}", path);
                        c
                    }
                    Err(e) => {
                        warn!("error parsing config {}: {}. Using defaults.", path, e);
                        Self::default()
                    }
                },
                Err(e) => {
                    warn!("error reading config {}: {}. Using defaults.", path, e);
                    Self::default()
                }
            }
        } else {
            info!("config file not found at '{}', using testnet defaults", path);
            Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_through_toml() {
        let config = BootstrapConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: BootstrapConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.issuer_accounts, config.issuer_accounts);
        assert_eq!(parsed.assets.len(), 3);
        assert_eq!(parsed.bridge.destinations.len(), 2);
        assert_eq!(parsed.base_fee, DEFAULT_BASE_FEE);
    }

    #[test]
    fn issuer_set_matches_asset_table() {
        let config = BootstrapConfig::default();
        assert_eq!(config.issuer_accounts.len(), config.assets.len());
        assert!(config
            .assets
            .iter()
            .any(|a| a.code == config.bridge.asset_code));
    }
}
