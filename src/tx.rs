//! Stellar transaction envelopes: typed operations, XDR assembly, signing.
//!
//! Only the three operation kinds this tool submits are modelled. Addresses
//! and asset codes are validated when an operation is constructed, so a
//! built `Transaction` always serializes cleanly.

use std::io::{self, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use sha2::{Digest, Sha256};

use crate::crypto::{AccountId, KeyPair};
use crate::error::BootstrapError;
use crate::xdr::{self, XdrSerialize};

/// Stroops per whole token (7 decimal places).
pub const STROOPS_PER_UNIT: i64 = 10_000_000;

const MAX_OPERATIONS: usize = 100;
const MAX_HOME_DOMAIN_LEN: usize = 32;

const ENVELOPE_TYPE_TX: u32 = 2;
const PRECOND_TIME: u32 = 1;
const MEMO_NONE: u32 = 0;
const OP_PAYMENT: u32 = 1;
const OP_SET_OPTIONS: u32 = 5;
const OP_CHANGE_TRUST: u32 = 6;
const ASSET_TYPE_ALPHANUM4: u32 = 1;
const ASSET_TYPE_ALPHANUM12: u32 = 2;
const KEY_TYPE_ED25519: u32 = 0;

/// An issued asset, identified by code and issuing account.
#[derive(Clone)]
pub struct Asset {
    code: String,
    issuer: AccountId,
}

impl Asset {
    /// Validates the code (1-12 alphanumeric characters) and the issuer
    /// address before the asset can appear in any operation.
    pub fn new(code: &str, issuer: &str) -> Result<Self, BootstrapError> {
        if code.is_empty() || code.len() > 12 {
            return Err(BootstrapError::InvalidAsset {
                code: code.to_string(),
                reason: "code must be 1 to 12 characters".to_string(),
            });
        }
        if !code.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(BootstrapError::InvalidAsset {
                code: code.to_string(),
                reason: "code must be alphanumeric".to_string(),
            });
        }
        let issuer = AccountId::from_address(issuer).map_err(|e| BootstrapError::InvalidAsset {
            code: code.to_string(),
            reason: format!("bad issuer address: {e}"),
        })?;
        Ok(Asset {
            code: code.to_string(),
            issuer,
        })
    }

    pub fn code(&self) -> &str {
        &self.code
    }
}

impl XdrSerialize for Asset {
    fn write_xdr<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        if self.code.len() <= 4 {
            xdr::write_u32(writer, ASSET_TYPE_ALPHANUM4)?;
            xdr::write_opaque_fixed(writer, self.code.as_bytes(), 4)?;
        } else {
            xdr::write_u32(writer, ASSET_TYPE_ALPHANUM12)?;
            xdr::write_opaque_fixed(writer, self.code.as_bytes(), 12)?;
        }
        write_account(writer, self.issuer)
    }
}

#[derive(Clone)]
pub struct SignerEntry {
    key: AccountId,
    weight: u32,
}

#[derive(Clone, Copy)]
pub struct Thresholds {
    pub low: u8,
    pub medium: u8,
    pub high: u8,
}

/// The subset of `SetOptions` fields this tool uses.
#[derive(Clone, Default)]
pub struct SetOptions {
    home_domain: Option<String>,
    signer: Option<SignerEntry>,
    thresholds: Option<Thresholds>,
}

#[derive(Clone)]
pub enum Operation {
    ChangeTrust { line: Asset },
    SetOptions(SetOptions),
    Payment {
        destination: AccountId,
        asset: Asset,
        amount: i64,
    },
}

impl Operation {
    /// Trustline to `line` with the maximum limit.
    pub fn change_trust(line: Asset) -> Self {
        Operation::ChangeTrust { line }
    }

    pub fn payment(destination: &str, asset: Asset, amount: i64) -> Result<Self, BootstrapError> {
        if amount <= 0 {
            return Err(BootstrapError::TxBuild(format!(
                "payment amount must be positive, got {amount}"
            )));
        }
        let destination = AccountId::from_address(destination)?;
        Ok(Operation::Payment {
            destination,
            asset,
            amount,
        })
    }

    pub fn set_home_domain(domain: &str) -> Result<Self, BootstrapError> {
        if domain.len() > MAX_HOME_DOMAIN_LEN {
            return Err(BootstrapError::TxBuild(format!(
                "home domain {domain:?} exceeds {MAX_HOME_DOMAIN_LEN} bytes"
            )));
        }
        Ok(Operation::SetOptions(SetOptions {
            home_domain: Some(domain.to_string()),
            ..Default::default()
        }))
    }

    pub fn add_signer(address: &str, weight: u32) -> Result<Self, BootstrapError> {
        let key = AccountId::from_address(address)?;
        Ok(Operation::SetOptions(SetOptions {
            signer: Some(SignerEntry { key, weight }),
            ..Default::default()
        }))
    }

    pub fn set_thresholds(low: u8, medium: u8, high: u8) -> Self {
        Operation::SetOptions(SetOptions {
            thresholds: Some(Thresholds { low, medium, high }),
            ..Default::default()
        })
    }
}

impl XdrSerialize for Operation {
    fn write_xdr<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        // No per-operation source account override.
        xdr::write_u32(writer, 0)?;
        match self {
            Operation::Payment {
                destination,
                asset,
                amount,
            } => {
                xdr::write_u32(writer, OP_PAYMENT)?;
                write_account(writer, *destination)?;
                asset.write_xdr(writer)?;
                xdr::write_i64(writer, *amount)
            }
            Operation::SetOptions(opts) => {
                xdr::write_u32(writer, OP_SET_OPTIONS)?;
                // inflationDest, clearFlags, setFlags, masterWeight: unused.
                for _ in 0..4 {
                    xdr::write_u32(writer, 0)?;
                }
                for threshold in [
                    opts.thresholds.map(|t| t.low),
                    opts.thresholds.map(|t| t.medium),
                    opts.thresholds.map(|t| t.high),
                ] {
                    write_optional_u32(writer, threshold.map(u32::from))?;
                }
                match &opts.home_domain {
                    Some(domain) => {
                        xdr::write_u32(writer, 1)?;
                        xdr::write_string(writer, domain)?;
                    }
                    None => xdr::write_u32(writer, 0)?,
                }
                match &opts.signer {
                    Some(signer) => {
                        xdr::write_u32(writer, 1)?;
                        write_account(writer, signer.key)?;
                        xdr::write_u32(writer, signer.weight)
                    }
                    None => xdr::write_u32(writer, 0),
                }
            }
            Operation::ChangeTrust { line } => {
                xdr::write_u32(writer, OP_CHANGE_TRUST)?;
                line.write_xdr(writer)?;
                xdr::write_i64(writer, i64::MAX)
            }
        }
    }
}

/// A transaction bound to one source account and one sequence number, with a
/// fixed per-operation fee and an absolute validity window.
pub struct Transaction {
    source: AccountId,
    fee: u32,
    seq: i64,
    time_bounds: (u64, u64),
    operations: Vec<Operation>,
}

impl Transaction {
    /// `seq` is the sequence number this transaction consumes, i.e. the
    /// account's current value plus one.
    pub fn new(
        source_address: &str,
        seq: i64,
        operations: Vec<Operation>,
        base_fee: u32,
        timeout_secs: u64,
    ) -> Result<Self, BootstrapError> {
        if operations.is_empty() {
            return Err(BootstrapError::TxBuild(
                "transaction has no operations".to_string(),
            ));
        }
        if operations.len() > MAX_OPERATIONS {
            return Err(BootstrapError::TxBuild(format!(
                "transaction has {} operations, maximum is {MAX_OPERATIONS}",
                operations.len()
            )));
        }
        let fee = base_fee
            .checked_mul(operations.len() as u32)
            .ok_or_else(|| BootstrapError::TxBuild("fee overflow".to_string()))?;
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Ok(Transaction {
            source: AccountId::from_address(source_address)?,
            fee,
            seq,
            time_bounds: (0, now + timeout_secs),
            operations,
        })
    }

    pub fn fee(&self) -> u32 {
        self.fee
    }

    pub fn operation_count(&self) -> usize {
        self.operations.len()
    }

    /// Network hash of this transaction: sha256 over the signature payload
    /// (network id, envelope type, transaction body).
    pub fn hash(&self, network_passphrase: &str) -> [u8; 32] {
        Sha256::digest(self.signature_payload(network_passphrase)).into()
    }

    /// Sign with the source account's key and return the base64 envelope
    /// blob Horizon accepts.
    pub fn sign(&self, network_passphrase: &str, key: &KeyPair) -> String {
        let signature = key.sign(&self.hash(network_passphrase));

        let mut envelope = Vec::new();
        let w = &mut envelope;
        xdr::write_u32(w, ENVELOPE_TYPE_TX).expect("memory write failed");
        self.write_xdr(w).expect("memory write failed");
        // One decorated signature: public key hint + 64-byte signature.
        xdr::write_u32(w, 1).expect("memory write failed");
        xdr::write_opaque_fixed(w, &key.signature_hint(), 4).expect("memory write failed");
        xdr::write_opaque_var(w, &signature.to_bytes()).expect("memory write failed");

        BASE64.encode(envelope)
    }

    fn signature_payload(&self, network_passphrase: &str) -> Vec<u8> {
        let network_id: [u8; 32] = Sha256::digest(network_passphrase.as_bytes()).into();
        let mut payload = network_id.to_vec();
        xdr::write_u32(&mut payload, ENVELOPE_TYPE_TX).expect("memory write failed");
        self.write_xdr(&mut payload).expect("memory write failed");
        payload
    }
}

impl XdrSerialize for Transaction {
    fn write_xdr<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        write_account(writer, self.source)?;
        xdr::write_u32(writer, self.fee)?;
        xdr::write_i64(writer, self.seq)?;
        xdr::write_u32(writer, PRECOND_TIME)?;
        xdr::write_u64(writer, self.time_bounds.0)?;
        xdr::write_u64(writer, self.time_bounds.1)?;
        xdr::write_u32(writer, MEMO_NONE)?;
        xdr::write_u32(writer, self.operations.len() as u32)?;
        for op in &self.operations {
            op.write_xdr(writer)?;
        }
        // ext: v0
        xdr::write_u32(writer, 0)
    }
}

// AccountID, MuxedAccount and ed25519 SignerKey all encode as the same
// ed25519 union arm.
fn write_account<W: Write>(writer: &mut W, account: AccountId) -> io::Result<()> {
    xdr::write_u32(writer, KEY_TYPE_ED25519)?;
    writer.write_all(&account.0)
}

fn write_optional_u32<W: Write>(writer: &mut W, value: Option<u32>) -> io::Result<()> {
    match value {
        Some(v) => {
            xdr::write_u32(writer, 1)?;
            xdr::write_u32(writer, v)
        }
        None => xdr::write_u32(writer, 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::strkey;
    use ed25519_dalek::{Signature, Verifier, VerifyingKey};

    const PASSPHRASE: &str = "Test SDF Network ; September 2015";

    fn test_keypair(fill: u8) -> KeyPair {
        KeyPair::from_secret(&strkey::encode(18 << 3, &[fill; 32])).unwrap()
    }

    fn test_asset(code: &str) -> Asset {
        Asset::new(code, &test_keypair(11).address()).unwrap()
    }

    #[test]
    fn asset_code_validation() {
        let issuer = test_keypair(11).address();
        assert!(Asset::new("TFT", &issuer).is_ok());
        assert!(Asset::new("FreeTFT", &issuer).is_ok());
        assert!(Asset::new("", &issuer).is_err());
        assert!(Asset::new("WAYTOOLONGCODE", &issuer).is_err());
        assert!(Asset::new("TF-T", &issuer).is_err());
        assert!(Asset::new("TFT", "GNOTANADDRESS").is_err());
    }

    #[test]
    fn asset_type_follows_code_length() {
        let short = test_asset("TFT").to_xdr();
        let long = test_asset("FreeTFT").to_xdr();
        assert_eq!(&short[0..4], &[0, 0, 0, 1]);
        assert_eq!(&short[4..8], b"TFT\0");
        assert_eq!(&long[0..4], &[0, 0, 0, 2]);
        assert_eq!(&long[4..16], b"FreeTFT\0\0\0\0\0");
    }

    #[test]
    fn fee_is_base_fee_times_operation_count() {
        let source = test_keypair(1);
        let ops = vec![
            Operation::change_trust(test_asset("TFT")),
            Operation::change_trust(test_asset("TFTA")),
            Operation::change_trust(test_asset("FreeTFT")),
        ];
        let tx = Transaction::new(&source.address(), 5, ops, 1_000_000, 60).unwrap();
        assert_eq!(tx.fee(), 3_000_000);
        assert_eq!(tx.operation_count(), 3);
    }

    #[test]
    fn rejects_empty_and_oversized_operation_lists() {
        let source = test_keypair(1).address();
        assert!(Transaction::new(&source, 1, vec![], 100, 60).is_err());
        let ops = vec![Operation::change_trust(test_asset("TFT")); 101];
        assert!(Transaction::new(&source, 1, ops, 100, 60).is_err());
    }

    #[test]
    fn payment_amount_must_be_positive() {
        let dest = test_keypair(2).address();
        assert!(Operation::payment(&dest, test_asset("TFT"), 0).is_err());
        assert!(Operation::payment(&dest, test_asset("TFT"), -5).is_err());
        assert!(Operation::payment(&dest, test_asset("TFT"), STROOPS_PER_UNIT).is_ok());
    }

    #[test]
    fn home_domain_must_fit_xdr_string32() {
        assert!(Operation::set_home_domain("www2.threefold.io").is_ok());
        assert!(Operation::set_home_domain(&"d".repeat(33)).is_err());
    }

    #[test]
    fn envelope_layout_and_signature_verify() {
        let source = test_keypair(3);
        let ops = vec![Operation::set_home_domain("www2.threefold.io").unwrap()];
        let tx = Transaction::new(&source.address(), 42, ops, 1_000_000, 60).unwrap();
        let envelope = BASE64.decode(tx.sign(PASSPHRASE, &source)).unwrap();

        // Envelope type, then the transaction body.
        assert_eq!(&envelope[0..4], &[0, 0, 0, 2]);
        // Source account: ed25519 arm + public key.
        assert_eq!(&envelope[4..8], &[0, 0, 0, 0]);
        assert_eq!(&envelope[8..40], &source.public_key_bytes());
        // fee = base fee for a single operation
        assert_eq!(&envelope[40..44], &1_000_000u32.to_be_bytes());
        // sequence number
        assert_eq!(&envelope[44..52], &42i64.to_be_bytes());
        // time preconditions, memo none, operation count
        assert_eq!(&envelope[52..56], &[0, 0, 0, 1]);
        assert_eq!(&envelope[72..76], &[0, 0, 0, 0]);
        assert_eq!(&envelope[76..80], &[0, 0, 0, 1]);

        // Tail: signature count, hint, 64-byte signature.
        let n = envelope.len();
        assert_eq!(&envelope[n - 76..n - 72], &[0, 0, 0, 1]);
        assert_eq!(&envelope[n - 72..n - 68], &source.signature_hint());
        assert_eq!(&envelope[n - 68..n - 64], &[0, 0, 0, 64]);

        let verifying = VerifyingKey::from_bytes(&source.public_key_bytes()).unwrap();
        let sig_bytes: [u8; 64] = envelope[n - 64..].try_into().unwrap();
        let signature = Signature::from_bytes(&sig_bytes);
        assert!(verifying
            .verify(&tx.hash(PASSPHRASE), &signature)
            .is_ok());
    }

    #[test]
    fn change_trust_uses_max_limit() {
        let op = Operation::change_trust(test_asset("TFT"));
        let bytes = op.to_xdr();
        let n = bytes.len();
        assert_eq!(&bytes[n - 8..], &i64::MAX.to_be_bytes());
    }
}
