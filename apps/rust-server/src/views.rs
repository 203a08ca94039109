// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Read models kept fresh by notification topics.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use utoipa::ToSchema;

use crate::actions::TokenActions;
use crate::blockchain::TokenBalance;
use crate::conversion::ConversionError;
use crate::events::{NotificationBus, SubscriptionId, Topic};

/// Plain balance cache, invalidated on every `balance-changed`.
pub struct PlainBalanceView {
    actions: Arc<TokenActions>,
    bus: Arc<NotificationBus>,
    cache: Arc<Mutex<Option<TokenBalance>>>,
    subscription: SubscriptionId,
}

impl PlainBalanceView {
    pub fn new(actions: Arc<TokenActions>, bus: Arc<NotificationBus>) -> Self {
        let cache: Arc<Mutex<Option<TokenBalance>>> = Arc::new(Mutex::new(None));
        let invalidate = Arc::clone(&cache);
        let subscription = bus.subscribe(Topic::BalanceChanged, move || {
            if let Ok(mut cached) = invalidate.lock() {
                *cached = None;
            }
        });
        Self {
            actions,
            bus,
            cache,
            subscription,
        }
    }

    /// Cached balance, fetched from chain on a miss.
    pub async fn get(&self) -> Result<TokenBalance, ConversionError> {
        if let Some(balance) = self.cached() {
            return Ok(balance);
        }
        let balance = self.actions.plain_balance().await?;
        if let Ok(mut cached) = self.cache.lock() {
            *cached = Some(balance.clone());
        }
        Ok(balance)
    }

    pub fn is_cached(&self) -> bool {
        self.cached().is_some()
    }

    fn cached(&self) -> Option<TokenBalance> {
        self.cache.lock().ok().and_then(|cached| cached.clone())
    }
}

impl Drop for PlainBalanceView {
    fn drop(&mut self) {
        self.bus.unsubscribe(self.subscription);
    }
}

/// Per-topic counts since startup.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct NotificationSnapshot {
    /// Keyed by topic name (`balance-changed`, `pending-list-changed`).
    pub counts: HashMap<String, u64>,
}

/// Counts every notification so clients can poll for changes.
pub struct NotificationCounters {
    counts: Arc<HashMap<Topic, AtomicU64>>,
}

impl NotificationCounters {
    pub fn new(bus: &NotificationBus) -> Self {
        let counts: Arc<HashMap<Topic, AtomicU64>> =
            Arc::new(Topic::ALL.iter().map(|t| (*t, AtomicU64::new(0))).collect());

        for topic in Topic::ALL {
            let counts = Arc::clone(&counts);
            bus.subscribe(topic, move || {
                if let Some(count) = counts.get(&topic) {
                    count.fetch_add(1, Ordering::Relaxed);
                }
            });
        }
        Self { counts }
    }

    pub fn get(&self, topic: Topic) -> u64 {
        self.counts
            .get(&topic)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub fn snapshot(&self) -> NotificationSnapshot {
        NotificationSnapshot {
            counts: Topic::ALL
                .iter()
                .map(|t| (t.as_str().to_string(), self.get(*t)))
                .collect(),
        }
    }
}
