// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Confidential-to-plain conversion.
//!
//! - [`ConversionOrchestrator`] drives a new conversion through its four phases
//! - [`PendingConversionRegistry`] lists conversions left pending on chain and
//!   retries or cancels them

pub mod decrypt;
pub mod error;
pub mod guard;
pub mod orchestrator;
pub mod registry;
pub mod session;

pub use error::{ConversionError, ErrorKind};
pub use orchestrator::{ConversionOrchestrator, ConversionSettings};
pub use registry::{PendingActionResult, PendingConversionRegistry};
pub use session::{ConversionOutcome, ConversionPhase, ConversionSession};
