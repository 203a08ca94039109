// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Conversion error taxonomy and user-facing messages.

use serde::Serialize;
use utoipa::ToSchema;

use crate::blockchain::ChainError;
use crate::relayer::RelayerError;

/// Hint appended to failures that leave funds locked in a pending conversion.
pub const RECOVERY_HINT: &str = "use Retry or Cancel in the pending conversions list";

const GENERIC_MESSAGE: &str = "Operation failed, please retry";
const MAX_RAW_MESSAGE_LEN: usize = 100;

/// Coarse classification driving retry policy and HTTP status mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UserCancelled,
    ValidationFailed,
    TransientRelayerFailure,
    ChainRevert,
    ChainUnavailable,
    Unrecoverable,
    Busy,
}

#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("Transaction cancelled")]
    UserCancelled,

    #[error("{0}")]
    Validation(String),

    #[error("Relayer failure: {0}")]
    Relayer(#[from] RelayerError),

    #[error("Contract execution failed: {0}")]
    ChainRevert(String),

    #[error("Network error: {0}")]
    ChainUnavailable(String),

    #[error("{0}")]
    Unrecoverable(String),

    #[error("Another conversion operation is already in progress")]
    Busy,
}

impl ConversionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConversionError::UserCancelled => ErrorKind::UserCancelled,
            ConversionError::Validation(_) => ErrorKind::ValidationFailed,
            ConversionError::Relayer(_) => ErrorKind::TransientRelayerFailure,
            ConversionError::ChainRevert(_) => ErrorKind::ChainRevert,
            ConversionError::ChainUnavailable(_) => ErrorKind::ChainUnavailable,
            ConversionError::Unrecoverable(_) => ErrorKind::Unrecoverable,
            ConversionError::Busy => ErrorKind::Busy,
        }
    }

    pub fn is_user_cancelled(&self) -> bool {
        matches!(self, ConversionError::UserCancelled)
    }

    /// Short message suitable for showing to the user.
    pub fn user_message(&self) -> String {
        user_message(&self.to_string())
    }
}

impl From<ChainError> for ConversionError {
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::Rejected(_) => ConversionError::UserCancelled,
            ChainError::Reverted(msg) | ChainError::Contract(msg) | ChainError::TransactionFailed(msg) => {
                ConversionError::ChainRevert(msg)
            }
            ChainError::InsufficientFunds(msg) => {
                ConversionError::ChainRevert(format!("insufficient funds: {msg}"))
            }
            ChainError::Rpc(msg) => ConversionError::ChainUnavailable(msg),
            ChainError::ReceiptTimeout(tx) => {
                ConversionError::ChainUnavailable(format!("timed out waiting for receipt of {tx}"))
            }
            ChainError::EventNotFound => {
                ConversionError::Unrecoverable("conversion event not found in receipt".to_string())
            }
            other @ (ChainError::InvalidRpcUrl(_)
            | ChainError::InvalidAddress(_)
            | ChainError::InvalidAmount(_)
            | ChainError::InvalidHandle(_)
            | ChainError::InvalidPrivateKey(_)
            | ChainError::ChainMismatch { .. }
            | ChainError::Signing(_)) => ConversionError::Validation(other.to_string()),
        }
    }
}

/// Map a raw error string to a short user-facing message.
pub fn user_message(raw: &str) -> String {
    let lower = raw.to_lowercase();

    if lower.contains("user rejected") || lower.contains("user denied") || lower.contains("cancelled") {
        return "Transaction cancelled".to_string();
    }
    if lower.contains("insufficient") {
        return "Insufficient balance".to_string();
    }
    if lower.contains("execution reverted") || lower.contains("contract execution failed") {
        return "Contract execution failed".to_string();
    }
    if lower.contains("network") || lower.contains("timed out") || lower.contains("timeout") {
        return "Network error, please check connection".to_string();
    }
    if lower.contains("gas") {
        return "Gas estimation failed".to_string();
    }
    if raw.chars().count() > MAX_RAW_MESSAGE_LEN {
        return GENERIC_MESSAGE.to_string();
    }
    raw.to_string()
}

/// User message for a failure that left a conversion pending on chain.
pub fn recoverable_message(err: &ConversionError) -> String {
    format!("{}; {}", err.user_message(), RECOVERY_HINT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_errors_map_to_kinds() {
        assert_eq!(
            ConversionError::from(ChainError::Rejected("user rejected".into())).kind(),
            ErrorKind::UserCancelled
        );
        assert_eq!(
            ConversionError::from(ChainError::Reverted("boom".into())).kind(),
            ErrorKind::ChainRevert
        );
        assert_eq!(
            ConversionError::from(ChainError::InsufficientFunds("gas".into())).kind(),
            ErrorKind::ChainRevert
        );
        assert_eq!(
            ConversionError::from(ChainError::Rpc("connection refused".into())).kind(),
            ErrorKind::ChainUnavailable
        );
        assert_eq!(
            ConversionError::from(ChainError::ReceiptTimeout("0x01".into())).kind(),
            ErrorKind::ChainUnavailable
        );
        assert_eq!(
            ConversionError::from(ChainError::InvalidAmount("x".into())).kind(),
            ErrorKind::ValidationFailed
        );
    }

    #[test]
    fn relayer_errors_are_transient() {
        let err = ConversionError::from(RelayerError::Request("reset".into()));
        assert_eq!(err.kind(), ErrorKind::TransientRelayerFailure);
    }

    #[test]
    fn user_messages_are_short() {
        assert_eq!(user_message("User rejected the request."), "Transaction cancelled");
        assert_eq!(user_message("insufficient funds for gas * price"), "Insufficient balance");
        assert_eq!(user_message("execution reverted: not pending"), "Contract execution failed");
        assert_eq!(user_message("network unreachable"), "Network error, please check connection");
        assert_eq!(user_message("cannot estimate gas"), "Gas estimation failed");
        assert_eq!(user_message(&"x".repeat(101)), "Operation failed, please retry");
        assert_eq!(user_message("Amount must be greater than zero"), "Amount must be greater than zero");
    }

    #[test]
    fn recoverable_message_carries_hint() {
        let msg = recoverable_message(&ConversionError::Relayer(RelayerError::Request("x".into())));
        assert!(msg.ends_with(RECOVERY_HINT));
    }
}
