// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Confidential-to-plain conversion driver.
//!
//! A conversion runs in four phases:
//!
//! 1. Encrypt the amount through the relayer.
//! 2. Submit `prepareConvertToPlain` and wait for it to be mined. The
//!    `ConversionRequested` event carries the handle of the locked amount.
//! 3. Publicly decrypt that handle, retrying transient relayer failures.
//! 4. Submit `finalizeConversion` with the plaintext and proof.
//!
//! Failures in phases 1-2 leave nothing on chain and simply fail the
//! session. Once the request is mined the amount is locked, so a failure in
//! phases 3-4 leaves the session `Recoverable` and the conversion in the
//! pending list, where it can be retried or cancelled.
//!
//! A run whose future is dropped mid-phase settles the session on the way
//! out, so an abandoned request never leaves it stuck in a running phase.
//!
//! The conversion handle is claimed in a guard shared with the
//! [`PendingConversionRegistry`](super::PendingConversionRegistry), so the
//! same conversion is never finalized from both sides at once.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Bytes, B256};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::decrypt::resolve_clear_amount;
use super::error::{recoverable_message, ConversionError, RECOVERY_HINT};
use super::guard::InFlight;
use super::session::{ConversionOutcome, ConversionPhase, ConversionSession};
use crate::blockchain::{conversion_requested_handle, parse_u64_amount, ChainClient, Handle};
use crate::events::{NotificationBus, Topic};
use crate::relayer::EncryptionAdapter;

/// Tunables for a conversion run.
#[derive(Debug, Clone)]
pub struct ConversionSettings {
    /// Token decimals used to parse user amounts.
    pub decimals: u8,
    /// Total public-decryption attempts in phase 3.
    pub max_decrypt_attempts: u32,
    /// Delay between phase-3 attempts.
    pub decrypt_retry_delay: Duration,
}

impl Default for ConversionSettings {
    fn default() -> Self {
        Self {
            decimals: 6,
            max_decrypt_attempts: 3,
            decrypt_retry_delay: Duration::from_secs(5),
        }
    }
}

const INTERRUPTED: &str = "Conversion interrupted";

/// Decrypted plaintext and its proof.
struct Decrypted {
    amount: u64,
    proof: Bytes,
}

pub struct ConversionOrchestrator {
    chain: Arc<dyn ChainClient>,
    relayer: Arc<dyn EncryptionAdapter>,
    bus: Arc<NotificationBus>,
    settings: ConversionSettings,
    session: watch::Sender<ConversionSession>,
    in_flight: InFlight<B256>,
    conversions: InFlight<String>,
}

/// Settles the session when dropped while a phase is still running.
struct SettleOnDrop<'a> {
    orchestrator: &'a ConversionOrchestrator,
    armed: bool,
}

impl<'a> SettleOnDrop<'a> {
    fn new(orchestrator: &'a ConversionOrchestrator) -> Self {
        Self {
            orchestrator,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for SettleOnDrop<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.orchestrator.settle_interrupted();
        }
    }
}

impl ConversionOrchestrator {
    /// `conversions` is keyed by normalized handle and must be the guard
    /// given to the pending registry.
    pub fn new(
        chain: Arc<dyn ChainClient>,
        relayer: Arc<dyn EncryptionAdapter>,
        bus: Arc<NotificationBus>,
        settings: ConversionSettings,
        conversions: InFlight<String>,
    ) -> Self {
        let (session, _) = watch::channel(ConversionSession::idle());
        Self {
            chain,
            relayer,
            bus,
            settings,
            session,
            in_flight: InFlight::new(),
            conversions,
        }
    }

    /// Receive every session update.
    pub fn subscribe_progress(&self) -> watch::Receiver<ConversionSession> {
        self.session.subscribe()
    }

    pub fn snapshot(&self) -> ConversionSession {
        self.session.borrow().clone()
    }

    /// Parse a user-entered amount into base units.
    pub fn validate_amount(&self, amount: &str) -> Result<u64, ConversionError> {
        parse_u64_amount(amount, self.settings.decimals).map_err(ConversionError::from)
    }

    /// Claim the session for a new conversion of `amount`.
    ///
    /// Fails with `Busy` while another conversion is running. A finished
    /// `Failed` or `Recoverable` session is replaced.
    pub fn begin(&self, amount: &str) -> Result<u64, ConversionError> {
        let value = self.validate_amount(amount)?;

        let claimed = self.session.send_if_modified(|session| {
            if session.phase.is_running() {
                return false;
            }
            *session = ConversionSession::idle();
            session.set_phase(ConversionPhase::Encrypting);
            true
        });
        if !claimed {
            return Err(ConversionError::Busy);
        }
        Ok(value)
    }

    /// Validate, claim the session and run the whole conversion.
    pub async fn start_conversion(&self, amount: &str) -> Result<ConversionOutcome, ConversionError> {
        let value = self.begin(amount)?;
        Ok(self.run(value).await)
    }

    /// Run a conversion previously claimed with [`Self::begin`].
    pub async fn run(&self, value: u64) -> ConversionOutcome {
        let session_id = self.snapshot().session_id;
        info!(%session_id, amount = value, "Starting confidential-to-plain conversion");
        let settle = SettleOnDrop::new(self);

        let input = match self
            .relayer
            .encrypt_u64(self.chain.token_address(), self.chain.account(), value)
            .await
        {
            Ok(input) => input,
            Err(e) => return self.fail_before_lock(ConversionError::from(e)),
        };

        self.update(|s| s.set_phase(ConversionPhase::AwaitingRequestConfirmation));

        let request_tx_hash = match self.chain.prepare_convert_to_plain(&input).await {
            Ok(hash) => hash,
            Err(e) => return self.fail_before_lock(ConversionError::from(e)),
        };
        self.update(|s| s.request_tx_hash = Some(request_tx_hash));

        settle.disarm();
        match self.handle_request_confirmed(request_tx_hash).await {
            Some(outcome) => outcome,
            None => ConversionOutcome::InProgress { request_tx_hash },
        }
    }

    /// Drive phases 2-4 once the request transaction `tx_hash` is known.
    ///
    /// Returns `None` when `tx_hash` is not the active request or is already
    /// being processed.
    pub async fn handle_request_confirmed(&self, tx_hash: B256) -> Option<ConversionOutcome> {
        let current = self.snapshot();
        if current.request_tx_hash != Some(tx_hash)
            || current.phase != ConversionPhase::AwaitingRequestConfirmation
        {
            debug!(tx_hash = %tx_hash, "Ignoring confirmation for inactive request");
            return None;
        }
        let Some(_guard) = self.in_flight.try_acquire(tx_hash) else {
            debug!(tx_hash = %tx_hash, "Request confirmation already in flight");
            return None;
        };
        let _settle = SettleOnDrop::new(self);

        let receipt = match self.chain.wait_for_receipt(tx_hash).await {
            Ok(receipt) => receipt,
            Err(e) => return Some(self.fail_after_lock(tx_hash, None, ConversionError::from(e))),
        };
        if !receipt.success {
            return Some(self.fail_before_lock(ConversionError::ChainRevert(
                "conversion request transaction reverted".to_string(),
            )));
        }

        let handle = match conversion_requested_handle(&receipt.logs, self.chain.token_address()) {
            Ok(handle) => handle,
            Err(e) => return Some(self.fail_after_lock(tx_hash, None, ConversionError::from(e))),
        };
        info!(tx_hash = %tx_hash, handle = %handle, "Conversion request confirmed");
        self.update(|s| s.handle = Some(handle.clone()));

        let Some(_claim) = self.conversions.try_acquire(handle.normalized()) else {
            return Some(self.fail_after_lock(tx_hash, Some(handle), ConversionError::Busy));
        };

        let decrypted = match self.decrypt_with_retry(&handle).await {
            Ok(decrypted) => decrypted,
            Err(e) => return Some(self.fail_after_lock(tx_hash, Some(handle), e)),
        };

        match self.finalize(&handle, &decrypted).await {
            Ok(finalize_tx_hash) => {
                info!(
                    request = %tx_hash,
                    finalize = %finalize_tx_hash,
                    amount = decrypted.amount,
                    "Conversion finalized"
                );
                self.session.send_replace(ConversionSession::idle());
                self.bus.emit(Topic::BalanceChanged);
                Some(ConversionOutcome::Completed {
                    request_tx_hash: tx_hash,
                    finalize_tx_hash,
                    amount: decrypted.amount,
                })
            }
            Err(e) => Some(self.fail_after_lock(tx_hash, Some(handle), e)),
        }
    }

    /// Clear a finished session. Fails with `Busy` while a conversion runs.
    pub fn dismiss(&self) -> Result<ConversionSession, ConversionError> {
        if self.snapshot().phase.is_running() {
            return Err(ConversionError::Busy);
        }
        self.session.send_replace(ConversionSession::idle());
        Ok(self.snapshot())
    }

    async fn decrypt_with_retry(&self, handle: &Handle) -> Result<Decrypted, ConversionError> {
        let max_attempts = self.settings.max_decrypt_attempts.max(1);
        let mut attempt = 1;

        loop {
            self.update(|s| {
                s.set_phase(ConversionPhase::Decrypting { attempt });
                s.retry_count = attempt - 1;
            });

            match self.decrypt_once(handle).await {
                Ok(decrypted) => return Ok(decrypted),
                Err(ConversionError::Relayer(e)) if attempt < max_attempts => {
                    warn!(
                        handle = %handle,
                        attempt,
                        max_attempts,
                        error = %e,
                        "Public decryption failed, retrying"
                    );
                    tokio::time::sleep(self.settings.decrypt_retry_delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn decrypt_once(&self, handle: &Handle) -> Result<Decrypted, ConversionError> {
        let result = self.relayer.public_decrypt(std::slice::from_ref(handle)).await?;
        let amount = resolve_clear_amount(&result.clear_values, handle)?;
        let proof = result.decryption_proof;

        self.update(|s| {
            s.cleartext_amount = Some(amount);
            s.decryption_proof = Some(proof.clone());
        });
        Ok(Decrypted { amount, proof })
    }

    async fn finalize(&self, handle: &Handle, decrypted: &Decrypted) -> Result<B256, ConversionError> {
        self.update(|s| s.set_phase(ConversionPhase::AwaitingFinalizeConfirmation));

        let tx_hash = self
            .chain
            .finalize_conversion(handle, decrypted.amount, &decrypted.proof)
            .await?;
        let receipt = self.chain.wait_for_receipt(tx_hash).await?;
        if !receipt.success {
            return Err(ConversionError::ChainRevert(
                "finalize transaction reverted".to_string(),
            ));
        }
        Ok(tx_hash)
    }

    /// Phases 1-2: nothing is locked on chain.
    fn fail_before_lock(&self, err: ConversionError) -> ConversionOutcome {
        if err.is_user_cancelled() {
            info!("Conversion cancelled by user");
            self.session.send_replace(ConversionSession::idle());
            return ConversionOutcome::Cancelled;
        }

        warn!(error = %err, kind = ?err.kind(), "Conversion failed before funds were locked");
        let message = err.user_message();
        self.update(|s| {
            s.set_phase(ConversionPhase::Failed);
            s.error = Some(message.clone());
        });
        ConversionOutcome::Failed { error: message }
    }

    /// Phases 3-4: the amount is locked in a pending conversion.
    fn fail_after_lock(
        &self,
        request_tx_hash: B256,
        handle: Option<Handle>,
        err: ConversionError,
    ) -> ConversionOutcome {
        warn!(
            request = %request_tx_hash,
            error = %err,
            kind = ?err.kind(),
            "Conversion left pending"
        );
        let message = recoverable_message(&err);
        self.update(|s| {
            s.set_phase(ConversionPhase::Recoverable);
            s.error = Some(message.clone());
        });
        self.bus.emit(Topic::PendingListChanged);

        ConversionOutcome::Recoverable {
            request_tx_hash,
            handle,
            error: message,
        }
    }

    /// A dropped run left the session mid-phase. Before the request could
    /// have been submitted the session fails; afterwards the amount may be
    /// locked, so it becomes `Recoverable`.
    fn settle_interrupted(&self) {
        let mut left_pending = false;
        let settled = self.session.send_if_modified(|s| {
            if !s.phase.is_running() {
                return false;
            }
            if s.phase == ConversionPhase::Encrypting {
                s.set_phase(ConversionPhase::Failed);
                s.error = Some(INTERRUPTED.to_string());
            } else {
                left_pending = true;
                s.set_phase(ConversionPhase::Recoverable);
                s.error = Some(format!("{INTERRUPTED}; {RECOVERY_HINT}"));
            }
            true
        });
        if settled {
            warn!(left_pending, "Conversion run dropped before completion");
        }
        if left_pending {
            self.bus.emit(Topic::PendingListChanged);
        }
    }

    fn update(&self, modify: impl FnOnce(&mut ConversionSession)) {
        self.session.send_modify(modify);
    }
}
