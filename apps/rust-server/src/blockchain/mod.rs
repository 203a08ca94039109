// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blockchain integration for the confidential token contract.
//!
//! This module provides functionality for:
//! - Reading plain balances, confidential balance handles and conversion records
//! - Submitting conversion, cancellation and token transactions
//! - Waiting for receipts and extracting the `ConversionRequested` event
//! - Loading the signing key

pub mod client;
pub mod signing;
pub mod token;
pub mod transactions;
pub mod types;
pub mod units;

pub use client::{ChainClient, ChainError, ClientConfig, TokenClient};
pub use signing::KeySource;
pub use token::conversion_requested_handle;
pub use transactions::classify_send_error;
pub use types::*;
pub use units::{format_amount, parse_amount, parse_u64_amount};
