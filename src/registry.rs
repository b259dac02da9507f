use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::crypto::KeyPair;
use crate::error::BootstrapError;

/// One line of the secrets file: `name,address,secret`. Transient, only used
/// while loading.
struct KeyRecord<'a> {
    name: &'a str,
    declared_address: &'a str,
    secret: &'a str,
}

impl<'a> KeyRecord<'a> {
    /// Returns `None` for a line that does not split into exactly three
    /// fields. The first such line terminates parsing.
    fn parse(line: &'a str) -> Option<Self> {
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() != 3 {
            return None;
        }
        Some(KeyRecord {
            name: fields[0],
            declared_address: fields[1],
            secret: fields[2],
        })
    }
}

/// Mapping of account name to signer-capable keypair, built once at startup
/// and read-only afterwards.
pub struct AccountRegistry {
    accounts: BTreeMap<String, KeyPair>,
}

impl AccountRegistry {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, BootstrapError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| BootstrapError::InputFile {
            path: path.display().to_string(),
            source,
        })?;
        Self::load_from_str(&text)
    }

    /// Parse records until the first malformed line (a trailing newline ends
    /// parsing cleanly). Every loaded address is sanity-checked against the
    /// address derived from its secret, and duplicate names are rejected.
    pub fn load_from_str(text: &str) -> Result<Self, BootstrapError> {
        let mut accounts = BTreeMap::new();
        for line in text.split('\n') {
            let Some(record) = KeyRecord::parse(line) else {
                break;
            };
            let keypair = KeyPair::from_secret(record.secret)?;
            let derived = keypair.address();
            if derived != record.declared_address {
                return Err(BootstrapError::AddressMismatch {
                    name: record.name.to_string(),
                    declared: record.declared_address.to_string(),
                    derived,
                });
            }
            debug!("loaded key for {} ({})", record.name, derived);
            if accounts.insert(record.name.to_string(), keypair).is_some() {
                return Err(BootstrapError::DuplicateAccount(record.name.to_string()));
            }
        }
        Ok(AccountRegistry { accounts })
    }

    pub fn get(&self, name: &str) -> Option<&KeyPair> {
        self.accounts.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.accounts.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &KeyPair)> {
        self.accounts.iter()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::strkey;
    use crate::error::BootstrapError;

    fn fixture_pair(fill: u8) -> (String, String) {
        let seed = strkey::encode(18 << 3, &[fill; 32]);
        let address = KeyPair::from_secret(&seed).unwrap().address();
        (address, seed)
    }

    #[test]
    fn loads_well_formed_lines() {
        let (addr_a, seed_a) = fixture_pair(1);
        let (addr_b, seed_b) = fixture_pair(2);
        let input = format!("A,{addr_a},{seed_a}\nB,{addr_b},{seed_b}\n");

        let registry = AccountRegistry::load_from_str(&input).unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("A").unwrap().address(), addr_a);
        assert_eq!(registry.get("B").unwrap().address(), addr_b);
    }

    #[test]
    fn trailing_blank_line_stops_parsing() {
        let (addr, seed) = fixture_pair(3);
        let input = format!("A,{addr},{seed}\n\n");
        let registry = AccountRegistry::load_from_str(&input).unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn malformed_line_terminates_rest_of_file() {
        let (addr_a, seed_a) = fixture_pair(4);
        let (addr_b, seed_b) = fixture_pair(5);
        let input = format!("A,{addr_a},{seed_a}\nnot a record\nB,{addr_b},{seed_b}\n");
        let registry = AccountRegistry::load_from_str(&input).unwrap();
        assert_eq!(registry.len(), 1);
        assert!(!registry.contains("B"));
    }

    #[test]
    fn mismatched_address_is_fatal() {
        let (_, seed) = fixture_pair(6);
        let (other_addr, _) = fixture_pair(7);
        let input = format!("A,{other_addr},{seed}\n");
        let err = AccountRegistry::load_from_str(&input)
            .err()
            .expect("load should fail");
        assert!(matches!(err, BootstrapError::AddressMismatch { .. }));
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let (addr, seed) = fixture_pair(8);
        let input = format!("A,{addr},{seed}\nA,{addr},{seed}\n");
        let err = AccountRegistry::load_from_str(&input)
            .err()
            .expect("load should fail");
        assert!(matches!(err, BootstrapError::DuplicateAccount(name) if name == "A"));
    }

    #[test]
    fn empty_input_loads_empty_registry() {
        let registry = AccountRegistry::load_from_str("").unwrap();
        assert!(registry.is_empty());
    }
}
