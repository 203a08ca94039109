// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Conversion session state.

use alloy::primitives::{Bytes, B256};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::blockchain::Handle;

/// Progress of the active conversion.
///
/// | Phase | Step |
/// |-------|------|
/// | `Encrypting` | 1 |
/// | `AwaitingRequestConfirmation` | 2 |
/// | `Decrypting` | 3 |
/// | `AwaitingFinalizeConfirmation` | 4 |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum ConversionPhase {
    Idle,
    Encrypting,
    AwaitingRequestConfirmation,
    Decrypting { attempt: u32 },
    AwaitingFinalizeConfirmation,
    Failed,
    /// Funds are locked in a pending conversion and can be retried or
    /// cancelled from the pending list.
    Recoverable,
}

impl ConversionPhase {
    /// The 1-based step shown in progress displays, if any.
    pub fn step(&self) -> Option<u8> {
        match self {
            ConversionPhase::Encrypting => Some(1),
            ConversionPhase::AwaitingRequestConfirmation => Some(2),
            ConversionPhase::Decrypting { .. } => Some(3),
            ConversionPhase::AwaitingFinalizeConfirmation => Some(4),
            ConversionPhase::Idle | ConversionPhase::Failed | ConversionPhase::Recoverable => None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.step().is_some()
    }
}

/// Snapshot of the active conversion.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ConversionSession {
    pub session_id: Uuid,
    #[serde(flatten)]
    pub phase: ConversionPhase,
    /// 1-4 while running, derived from `phase`.
    pub step: Option<u8>,
    #[schema(value_type = Option<String>)]
    pub request_tx_hash: Option<B256>,
    pub handle: Option<Handle>,
    pub cleartext_amount: Option<u64>,
    #[schema(value_type = Option<String>)]
    pub decryption_proof: Option<Bytes>,
    pub retry_count: u32,
    pub error: Option<String>,
}

impl ConversionSession {
    pub fn idle() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            phase: ConversionPhase::Idle,
            step: None,
            request_tx_hash: None,
            handle: None,
            cleartext_amount: None,
            decryption_proof: None,
            retry_count: 0,
            error: None,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.phase == ConversionPhase::Idle
    }

    pub fn set_phase(&mut self, phase: ConversionPhase) {
        self.step = phase.step();
        self.phase = phase;
    }
}

impl Default for ConversionSession {
    fn default() -> Self {
        Self::idle()
    }
}

/// Result of driving a conversion as far as it can go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConversionOutcome {
    Completed {
        #[schema(value_type = String)]
        request_tx_hash: B256,
        #[schema(value_type = String)]
        finalize_tx_hash: B256,
        amount: u64,
    },
    /// The user declined a signature; nothing changed on chain.
    Cancelled,
    /// Failed before anything was locked on chain.
    Failed { error: String },
    /// Failed after the request was confirmed; funds are locked pending retry or cancel.
    Recoverable {
        #[schema(value_type = String)]
        request_tx_hash: B256,
        /// Unknown when the request receipt could not be read.
        handle: Option<Handle>,
        error: String,
    },
    /// The request was submitted and phases 3-4 are still running.
    InProgress {
        #[schema(value_type = String)]
        request_tx_hash: B256,
    },
}
