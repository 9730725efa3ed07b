//! Well-known addresses and constants
//!
//! This module centralizes magic constants and well-known mainnet addresses
//! used throughout the txfinder crate.

use alloy_primitives::{address, Address, B256};
use alloy_sol_types::SolEvent;

use crate::types::decimals::TokenDecimals;

alloy_sol_types::sol! {
    /// ERC-20 transfer event, also emitted by WETH
    event Transfer(address indexed from, address indexed to, uint256 value);
}

/// Full 32-byte topic0 of `Transfer(address,address,uint256)`
pub const TRANSFER_TOPIC: B256 = <Transfer as SolEvent>::SIGNATURE_HASH;

/// Wrapped Ether on Ethereum Mainnet
///
/// Contract: 0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2
pub const WETH: Address = address!("c02aaa39b223fe8d0a0e5c4f27ead9083c756cc2");

/// Well-known stablecoin addresses
pub mod stablecoins {
    use super::*;

    /// Native USDC on Ethereum Mainnet
    ///
    /// Contract: 0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48
    pub const ETH_USDC: Address = address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");

    /// USDT on Ethereum Mainnet
    ///
    /// Contract: 0xdAC17F958D2ee523a2206206994597C13D831ec7
    pub const ETH_USDT: Address = address!("dac17f958d2ee523a2206206994597c13d831ec7");

    /// DAI on Ethereum Mainnet
    ///
    /// Contract: 0x6B175474E89094C44Da98b954EedeAC495271d0F
    pub const ETH_DAI: Address = address!("6b175474e89094c44da98b954eedeac495271d0f");
}

/// Known DEX router and aggregator addresses on mainnet
pub mod routers {
    use super::*;

    pub const WELL_KNOWN_ROUTERS: [Address; 11] = [
        // Uniswap V2 Router
        address!("7a250d5630b4cf539739df2c5dacab4c659f2488"),
        // Uniswap V3 SwapRouter
        address!("e592427a0aece92de3edee1f18e0157c05861564"),
        // Uniswap V3 SwapRouter02
        address!("68b3465833fb72a70ecdf485e0e4c7bd8665fc45"),
        // SushiSwap Router
        address!("d9e1ce17f2641f24ae83637ab66a2cca9c378b9f"),
        // 0x Exchange Proxy
        address!("def1c0ded9bec7f1a1670819833240f027b25eff"),
        // 1inch Aggregation Router v5
        address!("1111111254fb6c44bac0bed2854e76f90643097d"),
        // 1inch Aggregation Router v4
        address!("11111112542d85b3ef69ae05771c2dccff4faa26"),
        // 1inch Aggregation Router v6
        address!("111111125421ca6dc452d289314280a0f8842a65"),
        // CoW Protocol GPv2 Settlement
        address!("9008d19f58aabd9ed0d60971565aa8510560ab41"),
        // Uniswap Universal Router (v1)
        address!("ef1c6e67703c7bd7107eed8303fbe6ec2554bf6b"),
        // Uniswap Universal Router (v1.2)
        address!("3fc91a3afd70395cd496c647d5a6cc9d4b2b7fad"),
    ];
}

/// An ERC-20 asset a swap search can scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenSpec {
    pub symbol: &'static str,
    pub address: Address,
    pub decimals: TokenDecimals,
}

impl TokenSpec {
    /// Whether transfers of this token are already ETH-denominated
    pub fn is_weth(&self) -> bool {
        self.address == WETH
    }
}

/// Symbols accepted by swap searches
pub const TOKEN_REGISTRY: [TokenSpec; 4] = [
    TokenSpec {
        symbol: "USDC",
        address: stablecoins::ETH_USDC,
        decimals: TokenDecimals::USDC,
    },
    TokenSpec {
        symbol: "USDT",
        address: stablecoins::ETH_USDT,
        decimals: TokenDecimals::USDC,
    },
    TokenSpec {
        symbol: "DAI",
        address: stablecoins::ETH_DAI,
        decimals: TokenDecimals::STANDARD,
    },
    TokenSpec {
        symbol: "WETH",
        address: WETH,
        decimals: TokenDecimals::STANDARD,
    },
];

/// Looks up a token by symbol, case-insensitively
pub fn token_by_symbol(symbol: &str) -> Option<TokenSpec> {
    TOKEN_REGISTRY
        .iter()
        .find(|token| token.symbol.eq_ignore_ascii_case(symbol.trim()))
        .copied()
}
