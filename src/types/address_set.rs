//! Address sets consulted by the filter pipeline and the resolver

use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;

use alloy_primitives::Address;

use crate::config::constants::routers::WELL_KNOWN_ROUTERS;
use crate::errors::ConfigurationError;
use crate::types::candidate::Candidate;

/// Addresses whose transfers are excluded from a search (known MEV bots,
/// exchange hot wallets, ...)
///
/// Loaded once per run and only read afterwards. [`Address`] equality is
/// byte equality, so entries written in checksummed or lowercase form match
/// the same candidates.
///
/// # Examples
///
/// ```
/// use txfinder::AddressBlockSet;
///
/// let set = AddressBlockSet::parse(
///     "# mev bots\n0x00000000003b3cc22af3ae1eac0440bcee416b40\n",
/// ).unwrap();
/// assert_eq!(set.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressBlockSet {
    addresses: HashSet<Address>,
}

impl AddressBlockSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses either a JSON array of addresses or one address per line.
    ///
    /// In the line format, `#` starts a comment and blank lines are ignored.
    pub fn parse(contents: &str) -> Result<Self, ConfigurationError> {
        let trimmed = contents.trim_start();
        let entries: Vec<String> = if trimmed.starts_with('[') {
            serde_json::from_str(trimmed).map_err(|e| {
                ConfigurationError::blocklist("<inline>", format!("invalid JSON array: {e}"), None)
            })?
        } else {
            contents
                .lines()
                .map(|line| line.split('#').next().unwrap_or_default().trim())
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect()
        };

        let addresses = entries
            .iter()
            .map(|entry| {
                Address::from_str(entry.trim()).map_err(|e| {
                    ConfigurationError::blocklist(
                        "<inline>",
                        format!("invalid address {entry:?}: {e}"),
                        None,
                    )
                })
            })
            .collect::<Result<HashSet<_>, _>>()?;

        Ok(Self { addresses })
    }

    /// Reads and parses a blocklist file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
            ConfigurationError::blocklist(&display, "failed to read file", Some(e))
        })?;
        Self::parse(&contents).map_err(|e| match e {
            ConfigurationError::Blocklist {
                details, source, ..
            } => ConfigurationError::blocklist(display, details, source),
            other => other,
        })
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.addresses.contains(address)
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

impl FromIterator<Address> for AddressBlockSet {
    fn from_iter<I: IntoIterator<Item = Address>>(iter: I) -> Self {
        Self {
            addresses: iter.into_iter().collect(),
        }
    }
}

/// DEX router and aggregator addresses; participation marks a swap context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterSet {
    addresses: HashSet<Address>,
}

impl RouterSet {
    /// The built-in mainnet router list
    pub fn well_known() -> Self {
        WELL_KNOWN_ROUTERS.iter().copied().collect()
    }

    pub fn is_router(&self, address: &Address) -> bool {
        self.addresses.contains(address)
    }

    /// Whether either side of the candidate is a router
    pub fn participates(&self, candidate: &Candidate) -> bool {
        self.is_router(&candidate.from_addr) || self.is_router(&candidate.to_addr)
    }

    /// The router side of a candidate, checking the sender first
    pub fn counterparty(&self, candidate: &Candidate) -> Option<Address> {
        [candidate.from_addr, candidate.to_addr]
            .into_iter()
            .find(|address| self.is_router(address))
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

impl Default for RouterSet {
    fn default() -> Self {
        Self::well_known()
    }
}

impl FromIterator<Address> for RouterSet {
    fn from_iter<I: IntoIterator<Item = Address>>(iter: I) -> Self {
        Self {
            addresses: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;
    use std::io::Write;

    #[test]
    fn parses_lines_with_comments_and_mixed_case() {
        let set = AddressBlockSet::parse(
            "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2 # weth\n\n   # nothing here\n0x7a250d5630b4cf539739df2c5dacab4c659f2488\n",
        )
        .unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.contains(&address!("c02aaa39b223fe8d0a0e5c4f27ead9083c756cc2")));
    }

    #[test]
    fn parses_json_array() {
        let set = AddressBlockSet::parse(r#"["0x7a250d5630b4cf539739df2c5dacab4c659f2488"]"#)
            .unwrap();
        assert!(set.contains(&address!("7a250d5630b4cf539739df2c5dacab4c659f2488")));
    }

    #[test]
    fn rejects_garbage_entries() {
        let err = AddressBlockSet::parse("not-an-address\n").unwrap_err();
        assert!(matches!(err, ConfigurationError::Blocklist { .. }));
    }

    #[tokio::test]
    async fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "0x7a250d5630b4cf539739df2c5dacab4c659f2488").unwrap();
        let set = AddressBlockSet::load(file.path()).await.unwrap();
        assert_eq!(set.len(), 1);
    }

    #[tokio::test]
    async fn missing_file_reports_path() {
        let err = AddressBlockSet::load("/definitely/not/here.txt")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.txt"));
    }

    #[test]
    fn well_known_routers_include_uniswap_v2() {
        let routers = RouterSet::well_known();
        assert!(routers.is_router(&address!("7a250d5630b4cf539739df2c5dacab4c659f2488")));
        assert!(!routers.is_router(&Address::ZERO));
    }
}
