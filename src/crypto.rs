use std::fmt;

use ed25519_dalek::{Signature, Signer, SigningKey};

use crate::error::BootstrapError;

/// strkey version byte for a `G...` account id.
const VERSION_ACCOUNT_ID: u8 = 6 << 3;
/// strkey version byte for an `S...` secret seed.
const VERSION_SEED: u8 = 18 << 3;

/// A raw ed25519 public key, parsed from a `G...` address.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct AccountId(pub [u8; 32]);

impl AccountId {
    pub fn from_address(address: &str) -> Result<Self, BootstrapError> {
        let payload = strkey::decode(VERSION_ACCOUNT_ID, address)?;
        Ok(AccountId(payload))
    }

    pub fn to_address(self) -> String {
        strkey::encode(VERSION_ACCOUNT_ID, &self.0)
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", self.to_address())
    }
}

/// A signer-capable Ed25519 keypair. Only full keypairs exist in this tool;
/// address-only entries are never stored, so anything holding a `KeyPair`
/// can sign.
pub struct KeyPair {
    signing_key: SigningKey,
}

impl KeyPair {
    /// Parse a keypair from an `S...` secret seed.
    pub fn from_secret(secret: &str) -> Result<Self, BootstrapError> {
        let seed = strkey::decode(VERSION_SEED, secret)?;
        Ok(KeyPair {
            signing_key: SigningKey::from_bytes(&seed),
        })
    }

    /// The `G...` account id derived from the public key.
    pub fn address(&self) -> String {
        strkey::encode(VERSION_ACCOUNT_ID, &self.public_key_bytes())
    }

    pub fn account_id(&self) -> AccountId {
        AccountId(self.public_key_bytes())
    }

    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Sign a message with the private key.
    pub fn sign(&self, message: &[u8]) -> Signature {
        self.signing_key.sign(message)
    }

    /// Last four bytes of the public key, used as the decorated signature hint.
    pub fn signature_hint(&self) -> [u8; 4] {
        let pk = self.public_key_bytes();
        [pk[28], pk[29], pk[30], pk[31]]
    }
}

impl fmt::Debug for KeyPair {
    // Never render the seed.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyPair({})", self.address())
    }
}

/// Stellar strkey codec: base32 over `version byte || payload || crc16`, with
/// the CRC16-XModem checksum appended little-endian.
pub mod strkey {
    use crate::error::BootstrapError;

    const ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

    pub fn encode(version: u8, payload: &[u8; 32]) -> String {
        let mut data = Vec::with_capacity(35);
        data.push(version);
        data.extend_from_slice(payload);
        let checksum = crc16(&data);
        data.extend_from_slice(&checksum.to_le_bytes());
        base32_encode(&data)
    }

    pub fn decode(version: u8, key: &str) -> Result<[u8; 32], BootstrapError> {
        let data = base32_decode(key)?;
        if data.len() != 35 {
            return Err(BootstrapError::InvalidStrkey(format!(
                "decoded length {} is not 35 bytes",
                data.len()
            )));
        }
        if data[0] != version {
            return Err(BootstrapError::InvalidStrkey(format!(
                "unexpected version byte {:#04x}",
                data[0]
            )));
        }
        let declared = u16::from_le_bytes([data[33], data[34]]);
        if crc16(&data[..33]) != declared {
            return Err(BootstrapError::InvalidStrkey(
                "checksum mismatch".to_string(),
            ));
        }
        let mut payload = [0u8; 32];
        payload.copy_from_slice(&data[1..33]);
        Ok(payload)
    }

    /// CRC16-XModem: polynomial 0x1021, initial value 0.
    fn crc16(data: &[u8]) -> u16 {
        let mut crc: u16 = 0;
        for &byte in data {
            crc ^= (byte as u16) << 8;
            for _ in 0..8 {
                if crc & 0x8000 != 0 {
                    crc = (crc << 1) ^ 0x1021;
                } else {
                    crc <<= 1;
                }
            }
        }
        crc
    }

    // 35 input bytes are 280 bits, which packs into exactly 56 characters,
    // so no padding handling is needed on either side.
    fn base32_encode(data: &[u8]) -> String {
        let mut out = String::new();
        let mut buffer: u32 = 0;
        let mut bits = 0;
        for &byte in data {
            buffer = (buffer << 8) | byte as u32;
            bits += 8;
            while bits >= 5 {
                bits -= 5;
                out.push(ALPHABET[((buffer >> bits) & 0x1f) as usize] as char);
            }
        }
        if bits > 0 {
            out.push(ALPHABET[((buffer << (5 - bits)) & 0x1f) as usize] as char);
        }
        out
    }

    fn base32_decode(key: &str) -> Result<Vec<u8>, BootstrapError> {
        let mut out = Vec::new();
        let mut buffer: u32 = 0;
        let mut bits = 0;
        for c in key.bytes() {
            let value = ALPHABET
                .iter()
                .position(|&a| a == c)
                .ok_or_else(|| {
                    BootstrapError::InvalidStrkey(format!("invalid character {:?}", c as char))
                })? as u32;
            buffer = (buffer << 5) | value;
            bits += 5;
            if bits >= 8 {
                bits -= 8;
                out.push((buffer >> bits) as u8);
            }
        }
        Ok(out)
    }
}
