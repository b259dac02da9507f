//! The provisioning pipeline: activation, issuer setup, trustlines, bridge
//! funding and bridge signer setup, strictly in that order.
//!
//! Every stage shares one skeleton: fetch the source account's sequence
//! number, build a typed operation list, wrap it in a transaction with a
//! fixed fee and a bounded validity window, sign, submit, and record the
//! outcome. Per-item failures are recorded and the loop moves on; only a
//! missing mandatory issuer key aborts the run.

use std::fmt;

use tracing::{debug, info, warn};

use crate::config::BootstrapConfig;
use crate::client::{Faucet, Horizon};
use crate::crypto::KeyPair;
use crate::error::BootstrapError;
use crate::registry::AccountRegistry;
use crate::tx::{Asset, Operation, Transaction, STROOPS_PER_UNIT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Activate,
    ConfigureIssuer,
    EstablishTrustlines,
    FundBridges,
    SetupBridgeSigners,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Activate => "activate",
            Stage::ConfigureIssuer => "configure-issuer",
            Stage::EstablishTrustlines => "establish-trustlines",
            Stage::FundBridges => "fund-bridges",
            Stage::SetupBridgeSigners => "setup-bridge-signers",
        };
        f.write_str(name)
    }
}

/// Outcome of one provisioning step for one account.
#[derive(Debug)]
pub struct ItemOutcome {
    pub stage: Stage,
    pub subject: String,
    pub outcome: Result<(), String>,
}

/// Collected outcomes of a full run, in execution order.
#[derive(Debug, Default)]
pub struct RunReport {
    items: Vec<ItemOutcome>,
}

impl RunReport {
    fn record_ok(&mut self, stage: Stage, subject: &str) {
        self.items.push(ItemOutcome {
            stage,
            subject: subject.to_string(),
            outcome: Ok(()),
        });
    }

    fn record_err(&mut self, stage: Stage, subject: &str, error: &BootstrapError) {
        warn!("{} failed for {}: {}", stage, subject, error);
        self.items.push(ItemOutcome {
            stage,
            subject: subject.to_string(),
            outcome: Err(error.to_string()),
        });
    }

    pub fn items(&self) -> &[ItemOutcome] {
        &self.items
    }

    pub fn attempts(&self, stage: Stage) -> usize {
        self.items.iter().filter(|i| i.stage == stage).count()
    }

    pub fn successes(&self) -> usize {
        self.items.iter().filter(|i| i.outcome.is_ok()).count()
    }

    pub fn failures(&self) -> usize {
        self.items.len() - self.successes()
    }

    pub fn log_summary(&self) {
        info!(
            "provisioning finished: {} steps succeeded, {} failed",
            self.successes(),
            self.failures()
        );
        for item in self.items.iter().filter(|i| i.outcome.is_err()) {
            if let Err(reason) = &item.outcome {
                warn!("  {} / {}: {}", item.stage, item.subject, reason);
            }
        }
    }
}

/// Drives the stages against a read-only registry. Network access goes
/// through the `Horizon` and `Faucet` capabilities.
pub struct Provisioner<'a> {
    config: &'a BootstrapConfig,
    horizon: &'a dyn Horizon,
    faucet: &'a dyn Faucet,
}

impl<'a> Provisioner<'a> {
    pub fn new(
        config: &'a BootstrapConfig,
        horizon: &'a dyn Horizon,
        faucet: &'a dyn Faucet,
    ) -> Self {
        Self {
            config,
            horizon,
            faucet,
        }
    }

    pub fn run(
        &self,
        registry: &AccountRegistry,
        skip_activation: bool,
    ) -> Result<RunReport, BootstrapError> {
        let mut report = RunReport::default();
        if skip_activation {
            info!("skipping account activation");
        } else {
            self.activate_accounts(registry, &mut report);
        }
        self.configure_issuers(registry, &mut report)?;
        self.establish_trustlines(registry, &mut report);
        // Bridge funding requires the trustlines above to exist already.
        self.fund_bridges(registry, &mut report);
        self.setup_bridge_signers(registry, &mut report);
        Ok(report)
    }

    /// Ask the faucet to create and fund every account. Re-activating an
    /// existing account fails harmlessly, so errors are recorded and the
    /// run continues.
    fn activate_accounts(&self, registry: &AccountRegistry, report: &mut RunReport) {
        for (name, keypair) in registry.iter() {
            let address = keypair.address();
            info!("activating account {} ({})", name, address);
            match self.faucet.fund(&address) {
                Ok(()) => report.record_ok(Stage::Activate, name),
                Err(e) => report.record_err(Stage::Activate, name, &e),
            }
        }
    }

    /// Set the home domain on every configured issuer account. An issuer
    /// missing from the registry is fatal.
    fn configure_issuers(
        &self,
        registry: &AccountRegistry,
        report: &mut RunReport,
    ) -> Result<(), BootstrapError> {
        for name in &self.config.issuer_accounts {
            let keypair = registry
                .get(name)
                .ok_or_else(|| BootstrapError::MissingIssuer(name.clone()))?;
            info!("setting home domain for {} ({})", name, keypair.address());
            let result = Operation::set_home_domain(&self.config.home_domain)
                .and_then(|op| self.submit_signed(keypair, vec![op]));
            match result {
                Ok(()) => report.record_ok(Stage::ConfigureIssuer, name),
                Err(e) => report.record_err(Stage::ConfigureIssuer, name, &e),
            }
        }
        Ok(())
    }

    /// One transaction per non-issuer account, holding one trust-change
    /// operation per configured asset. A single invalid operation aborts
    /// that account's transaction; partial trustline sets are never
    /// submitted.
    fn establish_trustlines(&self, registry: &AccountRegistry, report: &mut RunReport) {
        for (name, keypair) in registry.iter() {
            if self.config.issuer_accounts.iter().any(|i| i == name) {
                continue;
            }
            info!("adding trustlines for {} ({})", name, keypair.address());
            let result = self
                .config
                .assets
                .iter()
                .map(|a| Asset::new(&a.code, &a.issuer).map(Operation::change_trust))
                .collect::<Result<Vec<_>, _>>()
                .and_then(|ops| self.submit_signed(keypair, ops));
            match result {
                Ok(()) => report.record_ok(Stage::EstablishTrustlines, name),
                Err(e) => report.record_err(Stage::EstablishTrustlines, name, &e),
            }
        }
    }

    /// Pay the configured amount of the primary asset to every bridge
    /// address, signed by the issuer. The bridges must already hold a
    /// trustline for the asset; without one the submission simply fails.
    fn fund_bridges(&self, registry: &AccountRegistry, report: &mut RunReport) {
        let bridge = &self.config.bridge;
        let Some(keypair) = registry.get(&bridge.funding_account) else {
            info!(
                "bridge funding account {:?} not loaded, skipping bridge funding",
                bridge.funding_account
            );
            return;
        };
        if bridge.destinations.is_empty() {
            return;
        }
        info!("funding {} bridge accounts", bridge.destinations.len());
        let result = self
            .funding_asset()
            .and_then(|asset| {
                let amount = i64::try_from(bridge.funding_amount)
                    .ok()
                    .and_then(|v| v.checked_mul(STROOPS_PER_UNIT))
                    .ok_or_else(|| {
                        BootstrapError::TxBuild("funding amount overflows".to_string())
                    })?;
                bridge
                    .destinations
                    .iter()
                    .map(|dest| Operation::payment(dest, asset.clone(), amount))
                    .collect::<Result<Vec<_>, _>>()
            })
            .and_then(|ops| self.submit_signed(keypair, ops));
        match result {
            Ok(()) => report.record_ok(Stage::FundBridges, &bridge.funding_account),
            Err(e) => report.record_err(Stage::FundBridges, &bridge.funding_account, &e),
        }
    }

    /// Add the configured co-signers to the bridge account, then raise its
    /// thresholds so that multiple parties are required. This permanently
    /// changes the account's authorization model.
    fn setup_bridge_signers(&self, registry: &AccountRegistry, report: &mut RunReport) {
        let bridge = &self.config.bridge;
        let Some(keypair) = registry.get(&bridge.signer_account) else {
            info!(
                "bridge account {:?} not loaded, skipping signer setup",
                bridge.signer_account
            );
            return;
        };
        if bridge.signers.is_empty() {
            return;
        }
        info!(
            "adding {} signers to bridge account {}",
            bridge.signers.len(),
            keypair.address()
        );
        let result = bridge
            .signers
            .iter()
            .map(|signer| Operation::add_signer(signer, 1))
            .collect::<Result<Vec<_>, _>>()
            .and_then(|mut ops| {
                let t = bridge.thresholds;
                ops.push(Operation::set_thresholds(t.low, t.medium, t.high));
                self.submit_signed(keypair, ops)
            });
        match result {
            Ok(()) => report.record_ok(Stage::SetupBridgeSigners, &bridge.signer_account),
            Err(e) => report.record_err(Stage::SetupBridgeSigners, &bridge.signer_account, &e),
        }
    }

    fn funding_asset(&self) -> Result<Asset, BootstrapError> {
        let bridge = &self.config.bridge;
        let asset = self
            .config
            .assets
            .iter()
            .find(|a| a.code == bridge.asset_code)
            .ok_or_else(|| BootstrapError::InvalidAsset {
                code: bridge.asset_code.clone(),
                reason: "not present in the configured assets".to_string(),
            })?;
        Asset::new(&asset.code, &asset.issuer)
    }

    /// The shared submission skeleton: fresh sequence number, envelope with
    /// fixed fee and bounded validity, self-signed, submitted.
    fn submit_signed(
        &self,
        source: &KeyPair,
        operations: Vec<Operation>,
    ) -> Result<(), BootstrapError> {
        let address = source.address();
        let sequence = self.horizon.sequence_number(&address)?;
        let tx = Transaction::new(
            &address,
            sequence + 1,
            operations,
            self.config.base_fee,
            self.config.tx_timeout_secs,
        )?;
        let hash = tx.hash(&self.config.network_passphrase);
        let envelope = tx.sign(&self.config.network_passphrase, source);
        self.horizon.submit(&envelope)?;
        debug!("transaction {} accepted for {}", hex::encode(hash), address);
        Ok(())
    }
}
