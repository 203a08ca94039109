// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! RabbitHole Convert Server - Confidential Token Conversion Service
//!
//! Converts an FHE-encrypted (confidential) token balance into a plain
//! ERC-20 balance through a relayer and the token contract, and recovers
//! conversions that were left locked on chain.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `actions` - Balance reads, transfers, mints
//! - `blockchain` - Token contract client (alloy)
//! - `conversion` - Conversion orchestrator and pending-conversion registry
//! - `events` - In-process change notifications
//! - `relayer` - FHE relayer gateway client
//! - `views` - Cached read models

pub mod actions;
pub mod api;
pub mod blockchain;
pub mod config;
pub mod conversion;
pub mod error;
pub mod events;
pub mod relayer;
pub mod state;
pub mod views;

#[cfg(test)]
pub(crate) mod testing;
