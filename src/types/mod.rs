// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Strong types for type safety across txfinder.
//!
//! This module provides the data model shared by every stage:
//! - Time windows and block ranges
//! - Candidates, their tagged ETH value and match results
//! - Token decimals
//! - Blocklist and router address sets

pub mod address_set;
pub mod candidate;
pub mod decimals;
pub mod window;

// Note: Public types are re-exported from lib.rs, not here
