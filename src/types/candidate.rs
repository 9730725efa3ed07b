//! The candidate record and the results produced from it
//!
//! A [`Candidate`] is one normalized transfer-like event. Every candidate
//! source produces the same shape, tagged with its [`SourceKind`], so the
//! filter, resolver and matcher never look at raw API records.

use alloy_primitives::{Address, TxHash};
use bigdecimal::{BigDecimal, Zero};
use serde::{Serialize, Serializer};

use super::window::UnixTimestamp;

/// Where a candidate came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// ERC-20 `Transfer` log of a non-ETH token; value is token-denominated
    TokenTransfer,
    /// Top-level transaction carrying native value
    NativeTransaction,
    /// ERC-20 `Transfer` log of the WETH contract
    WethTransfer,
    /// Transaction sending native value into the WETH contract
    WethDeposit,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SourceKind::TokenTransfer => "token_transfer",
            SourceKind::NativeTransaction => "native_transaction",
            SourceKind::WethTransfer => "weth_transfer",
            SourceKind::WethDeposit => "weth_deposit",
        };
        f.write_str(name)
    }
}

/// ETH-equivalent value of a candidate
///
/// Zero is never `Resolved`: a transaction with zero native value carries no
/// ETH signal and must fall back to log accounting, so [`EthValue::from_amount`]
/// maps it to `Unresolved`.
///
/// # Examples
///
/// ```
/// use bigdecimal::BigDecimal;
/// use txfinder::EthValue;
///
/// assert_eq!(EthValue::from_amount(BigDecimal::from(0)), EthValue::Unresolved);
/// assert!(EthValue::from_amount(BigDecimal::from(2)).is_resolved());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "status", content = "amount", rename_all = "snake_case")]
pub enum EthValue {
    /// Strictly positive ETH amount
    Resolved(BigDecimal),
    /// No ETH-equivalent could be determined (yet)
    #[default]
    Unresolved,
}

impl EthValue {
    /// `Resolved` for strictly positive amounts, `Unresolved` otherwise
    pub fn from_amount(amount: BigDecimal) -> Self {
        if amount > BigDecimal::zero() {
            EthValue::Resolved(amount)
        } else {
            EthValue::Unresolved
        }
    }

    pub fn amount(&self) -> Option<&BigDecimal> {
        match self {
            EthValue::Resolved(amount) => Some(amount),
            EthValue::Unresolved => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, EthValue::Resolved(_))
    }
}

/// A normalized transfer-like record eligible for value-based matching
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub source_kind: SourceKind,
    /// Hash of the enclosing transaction; several candidates may share it
    pub tx_hash: TxHash,
    pub block_number: u64,
    pub timestamp: UnixTimestamp,
    #[serde(serialize_with = "serialize_address")]
    pub from_addr: Address,
    #[serde(serialize_with = "serialize_address")]
    pub to_addr: Address,
    /// Amount in the asset's own unit (USDC for a USDC transfer, ETH for native/WETH)
    pub asset_value: BigDecimal,
    /// Symbol of the asset `asset_value` is denominated in
    pub asset_symbol: String,
    pub eth_value: EthValue,
}

impl Candidate {
    /// Whether either side of the transfer is `address`
    pub fn involves(&self, address: &Address) -> bool {
        self.from_addr == *address || self.to_addr == *address
    }
}

/// A subset of candidates whose ETH values sum to the target within tolerance
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchResult {
    pub total_eth_value: BigDecimal,
    /// Member transactions, in the order they appear in the filtered set
    pub member_tx_hashes: Vec<TxHash>,
    #[serde(serialize_with = "serialize_optional_address")]
    pub group_key: Option<Address>,
}

impl MatchResult {
    pub fn size(&self) -> usize {
        self.member_tx_hashes.len()
    }
}

/// Addresses are reported in lowercase hex, matching how they are compared.
pub(crate) fn serialize_address<S: Serializer>(address: &Address, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(&format_args!("{address:#x}"))
}

fn serialize_optional_address<S: Serializer>(
    address: &Option<Address>,
    s: S,
) -> Result<S::Ok, S::Error> {
    match address {
        Some(address) => serialize_address(address, s),
        None => s.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, B256};
    use std::str::FromStr;

    #[test]
    fn negative_or_zero_amounts_are_unresolved() {
        assert_eq!(EthValue::from_amount(BigDecimal::zero()), EthValue::Unresolved);
        assert_eq!(
            EthValue::from_amount(BigDecimal::from_str("-1").unwrap()),
            EthValue::Unresolved
        );
        assert_eq!(EthValue::default(), EthValue::Unresolved);
    }

    #[test]
    fn candidate_serializes_lowercase_addresses() {
        let candidate = Candidate {
            source_kind: SourceKind::WethTransfer,
            tx_hash: B256::ZERO,
            block_number: 1,
            timestamp: UnixTimestamp(10),
            from_addr: address!("c02aaa39b223fe8d0a0e5c4f27ead9083c756cc2"),
            to_addr: Address::ZERO,
            asset_value: BigDecimal::from(1),
            asset_symbol: "WETH".to_string(),
            eth_value: EthValue::Resolved(BigDecimal::from(1)),
        };
        let json = serde_json::to_value(&candidate).unwrap();
        assert_eq!(json["from_addr"], "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2");
        assert_eq!(json["source_kind"], "weth_transfer");
        assert_eq!(json["eth_value"]["status"], "resolved");
    }
}
