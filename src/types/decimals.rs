//! Token decimal precision type

use serde::{Deserialize, Serialize};

/// ERC-20 token decimal precision
///
/// The number of decimal places used to turn a raw on-chain integer into a
/// human-readable amount. ETH, WETH and most ERC-20 tokens use 18; the major
/// USD stablecoins on mainnet use 6.
///
/// # Examples
///
/// ```
/// use txfinder::TokenDecimals;
///
/// assert_eq!(TokenDecimals::STANDARD.as_u8(), 18);
/// assert_eq!(TokenDecimals::USDC.as_u8(), 6);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenDecimals(u8);

impl TokenDecimals {
    /// Standard decimals for ETH-like assets (18)
    pub const STANDARD: Self = Self(18);

    /// USDC and USDT decimals on mainnet (6)
    pub const USDC: Self = Self(6);

    /// Create a new decimal precision value
    pub const fn new(decimals: u8) -> Self {
        Self(decimals)
    }

    /// Get the inner u8 value
    pub const fn as_u8(&self) -> u8 {
        self.0
    }
}

impl From<u8> for TokenDecimals {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for TokenDecimals {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} decimals", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert_eq!(TokenDecimals::STANDARD.as_u8(), 18);
        assert_eq!(TokenDecimals::from(6u8), TokenDecimals::USDC);
    }

    #[test]
    fn test_display_formatting() {
        assert_eq!(format!("{}", TokenDecimals::USDC), "6 decimals");
    }

    #[test]
    fn test_serialization() {
        let json = serde_json::to_string(&TokenDecimals::USDC).unwrap();
        assert_eq!(json, "6");
        let back: TokenDecimals = serde_json::from_str(&json).unwrap();
        assert_eq!(back, TokenDecimals::USDC);
    }
}
