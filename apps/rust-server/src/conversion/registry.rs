// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Pending conversions: listing, retrying and cancelling.

use std::sync::Arc;

use alloy::primitives::B256;
use serde::Serialize;
use utoipa::ToSchema;

use super::decrypt::resolve_clear_amount;
use super::error::ConversionError;
use super::guard::{InFlight, InFlightGuard};
use crate::blockchain::{ChainClient, ConversionRecord};
use crate::events::{NotificationBus, Topic};
use crate::relayer::EncryptionAdapter;

/// Result of a successful retry or cancel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct PendingActionResult {
    pub conversion_id: u64,
    #[schema(value_type = String)]
    pub tx_hash: B256,
    /// Finalized plaintext amount (retry only).
    pub amount: Option<u64>,
}

pub struct PendingConversionRegistry {
    chain: Arc<dyn ChainClient>,
    relayer: Arc<dyn EncryptionAdapter>,
    bus: Arc<NotificationBus>,
    conversions: InFlight<String>,
}

impl PendingConversionRegistry {
    /// `conversions` is the handle guard shared with the orchestrator.
    pub fn new(
        chain: Arc<dyn ChainClient>,
        relayer: Arc<dyn EncryptionAdapter>,
        bus: Arc<NotificationBus>,
        conversions: InFlight<String>,
    ) -> Self {
        Self {
            chain,
            relayer,
            bus,
            conversions,
        }
    }

    /// Pending conversions of the connected account, newest first.
    ///
    /// Any read failure is logged and yields an empty list.
    pub async fn list(&self) -> Vec<ConversionRecord> {
        let account = self.chain.account();
        let ids = match self.chain.get_user_pending_conversions(account).await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!(account = %account, error = %e, "Failed to list pending conversions");
                return Vec::new();
            }
        };

        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            match self.chain.get_conversion_info(id).await {
                Ok(record) if record.is_pending => records.push(record),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(conversion_id = id, error = %e, "Failed to read conversion info");
                    return Vec::new();
                }
            }
        }

        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        records
    }

    /// Decrypt and finalize a pending conversion (single attempt).
    pub async fn retry(&self, conversion_id: u64) -> Result<PendingActionResult, ConversionError> {
        let record = self.ensure_pending(conversion_id).await?;
        let _claim = self.claim(&record)?;
        let handles = match self.chain.get_conversion_handles(conversion_id).await? {
            handles if handles.is_empty() => vec![record.handle],
            handles => handles,
        };
        let handle = handles[0].clone();

        let decryption = self.relayer.public_decrypt(&handles).await?;
        let amount = resolve_clear_amount(&decryption.clear_values, &handle)?;

        let tx_hash = self
            .chain
            .finalize_conversion(&handle, amount, &decryption.decryption_proof)
            .await?;
        let receipt = self.chain.wait_for_receipt(tx_hash).await?;
        if !receipt.success {
            return Err(ConversionError::ChainRevert(
                "finalize transaction reverted".to_string(),
            ));
        }

        tracing::info!(conversion_id, tx_hash = %tx_hash, amount, "Pending conversion finalized");
        self.bus.emit(Topic::BalanceChanged);
        self.bus.emit(Topic::PendingListChanged);

        Ok(PendingActionResult {
            conversion_id,
            tx_hash,
            amount: Some(amount),
        })
    }

    /// Cancel a pending conversion, returning the locked amount to the
    /// confidential balance.
    pub async fn cancel(&self, conversion_id: u64) -> Result<PendingActionResult, ConversionError> {
        let record = self.ensure_pending(conversion_id).await?;
        let _claim = self.claim(&record)?;

        let tx_hash = self.chain.cancel_conversion(conversion_id).await?;
        let receipt = self.chain.wait_for_receipt(tx_hash).await?;
        if !receipt.success {
            return Err(ConversionError::ChainRevert(
                "cancel transaction reverted".to_string(),
            ));
        }

        tracing::info!(conversion_id, tx_hash = %tx_hash, "Pending conversion cancelled");
        self.bus.emit(Topic::PendingListChanged);

        Ok(PendingActionResult {
            conversion_id,
            tx_hash,
            amount: None,
        })
    }

    fn claim(&self, record: &ConversionRecord) -> Result<InFlightGuard<String>, ConversionError> {
        self.conversions
            .try_acquire(record.handle.normalized())
            .ok_or(ConversionError::Busy)
    }

    async fn ensure_pending(&self, conversion_id: u64) -> Result<ConversionRecord, ConversionError> {
        let record = self.chain.get_conversion_info(conversion_id).await?;
        if !record.is_pending {
            return Err(ConversionError::Validation(format!(
                "Conversion {conversion_id} is not pending"
            )));
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::blockchain::Handle;
    use crate::testing::{MockChain, MockFailure, MockRelayer};

    fn registry() -> (Arc<MockChain>, Arc<MockRelayer>, Arc<NotificationBus>, PendingConversionRegistry) {
        let chain = Arc::new(MockChain::new());
        let relayer = Arc::new(MockRelayer::new());
        let bus = Arc::new(NotificationBus::new());
        let registry =
            PendingConversionRegistry::new(chain.clone(), relayer.clone(), bus.clone(), InFlight::new());
        (chain, relayer, bus, registry)
    }

    fn counter(bus: &NotificationBus, topic: Topic) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        bus.subscribe(topic, move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        count
    }

    #[tokio::test]
    async fn list_filters_and_sorts_newest_first() {
        let (chain, _, _, registry) = registry();
        chain.add_conversion(1, Handle::new("0x01"), true, 100);
        chain.add_conversion(2, Handle::new("0x02"), false, 300);
        chain.add_conversion(3, Handle::new("0x03"), true, 200);

        let ids: Vec<u64> = registry.list().await.into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![3, 1]);
    }

    #[tokio::test]
    async fn list_swallows_read_errors() {
        let (chain, _, _, registry) = registry();
        chain.add_conversion(1, Handle::new("0x01"), true, 100);
        chain.fail_reads();

        assert!(registry.list().await.is_empty());
    }

    #[tokio::test]
    async fn list_is_empty_when_one_record_read_fails() {
        let (chain, _, _, registry) = registry();
        chain.add_conversion(1, Handle::new("0x01"), true, 100);
        chain.add_conversion(2, Handle::new("0x02"), true, 200);
        chain.fail_info_for(2);

        assert!(registry.list().await.is_empty());
    }

    #[tokio::test]
    async fn retry_finalizes_and_notifies() {
        let (chain, relayer, bus, registry) = registry();
        let balance = counter(&bus, Topic::BalanceChanged);
        let pending = counter(&bus, Topic::PendingListChanged);
        let handle = Handle::new("0xAbC1");
        chain.add_conversion(7, handle.clone(), true, 100);
        relayer.set_public_value(42);

        let result = registry.retry(7).await.unwrap();

        assert_eq!(result.amount, Some(42));
        assert_eq!(chain.finalized(), vec![(handle, 42)]);
        assert_eq!(relayer.public_decrypt_calls(), 1);
        assert_eq!(balance.load(Ordering::SeqCst), 1);
        assert_eq!(pending.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retry_is_a_single_attempt() {
        let (chain, relayer, _, registry) = registry();
        chain.add_conversion(7, Handle::new("0x07"), true, 100);
        relayer.fail_public_decrypt_times(1);

        let err = registry.retry(7).await.unwrap_err();
        assert!(matches!(err, ConversionError::Relayer(_)));
        assert_eq!(relayer.public_decrypt_calls(), 1);
        assert!(chain.finalized().is_empty());
    }

    #[tokio::test]
    async fn actions_require_a_pending_conversion() {
        let (chain, _, _, registry) = registry();
        chain.add_conversion(7, Handle::new("0x07"), false, 100);

        assert!(matches!(registry.retry(7).await, Err(ConversionError::Validation(_))));
        assert!(matches!(registry.cancel(7).await, Err(ConversionError::Validation(_))));
        assert!(chain.cancelled().is_empty());
    }

    #[tokio::test]
    async fn cancel_submits_and_notifies_pending_only() {
        let (chain, _, bus, registry) = registry();
        let balance = counter(&bus, Topic::BalanceChanged);
        let pending = counter(&bus, Topic::PendingListChanged);
        chain.add_conversion(9, Handle::new("0x09"), true, 100);

        let result = registry.cancel(9).await.unwrap();

        assert_eq!(result.conversion_id, 9);
        assert_eq!(chain.cancelled(), vec![9]);
        assert_eq!(pending.load(Ordering::SeqCst), 1);
        assert_eq!(balance.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancel_rejection_is_user_cancelled() {
        let (chain, _, _, registry) = registry();
        chain.add_conversion(9, Handle::new("0x09"), true, 100);
        chain.fail_cancel(MockFailure::Rejected);

        let err = registry.cancel(9).await.unwrap_err();
        assert!(err.is_user_cancelled());
    }

    #[tokio::test]
    async fn concurrent_action_on_same_id_is_busy() {
        let (chain, _, _, registry) = registry();
        chain.add_conversion(9, Handle::new("0x09"), true, 100);
        let _held = registry
            .conversions
            .try_acquire(Handle::new("0x09").normalized())
            .unwrap();

        assert!(matches!(registry.cancel(9).await, Err(ConversionError::Busy)));
        assert!(matches!(registry.retry(9).await, Err(ConversionError::Busy)));
    }

    #[tokio::test]
    async fn exhausted_conversion_is_listed_until_cancelled() {
        use crate::conversion::{ConversionOrchestrator, ConversionOutcome, ConversionSettings};
        use std::time::Duration;

        let (chain, relayer, bus, registry) = registry();
        let orchestrator = ConversionOrchestrator::new(
            chain.clone(),
            relayer.clone(),
            bus.clone(),
            ConversionSettings {
                decrypt_retry_delay: Duration::ZERO,
                ..Default::default()
            },
            registry.conversions.clone(),
        );
        relayer.fail_public_decrypt_times(3);

        let outcome = orchestrator.start_conversion("1").await.unwrap();
        assert!(matches!(outcome, ConversionOutcome::Recoverable { .. }));

        let listed = registry.list().await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].handle, chain.conversion_handle());

        registry.cancel(listed[0].id).await.unwrap();
        assert!(registry.list().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn retry_during_automatic_decrypt_is_busy() {
        use crate::conversion::{ConversionOrchestrator, ConversionOutcome, ConversionSettings};
        use std::time::Duration;

        let (chain, relayer, bus, registry) = registry();
        let balance = counter(&bus, Topic::BalanceChanged);
        let orchestrator = ConversionOrchestrator::new(
            chain.clone(),
            relayer.clone(),
            bus.clone(),
            ConversionSettings::default(),
            registry.conversions.clone(),
        );
        relayer.set_public_value(1_000_000);
        relayer.fail_public_decrypt_times(1);

        let (outcome, retried) = tokio::join!(orchestrator.start_conversion("1"), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            let listed: Vec<u64> = registry.list().await.into_iter().map(|r| r.id).collect();
            assert_eq!(listed, vec![1]);
            registry.retry(1).await
        });

        assert!(matches!(outcome.unwrap(), ConversionOutcome::Completed { .. }));
        assert!(matches!(retried, Err(ConversionError::Busy)));
        assert_eq!(chain.finalized().len(), 1);
        assert_eq!(balance.load(Ordering::SeqCst), 1);
    }
}
