// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Notification Bus
//!
//! In-process publish/subscribe channel used to tell sibling views that
//! on-chain state they display has changed. Events carry no payload:
//! subscribers re-read whatever they need from the chain.
//!
//! ## Topics
//!
//! | Topic | Meaning |
//! |-------|---------|
//! | `balance-changed` | Plain balance views should refetch |
//! | `pending-list-changed` | The pending conversion list should refetch |
//!
//! ## Dispatch
//!
//! Emission is synchronous. Every listener registered when `emit` is called
//! runs exactly once, in registration order. The listener list is
//! snapshotted before dispatch, so subscribing or unsubscribing from inside a
//! listener only takes effect on the next emission.
//!
//! One bus is constructed per process in `main` and shared through `Arc`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use utoipa::ToSchema;

/// Well-known notification topics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Topic {
    BalanceChanged,
    PendingListChanged,
}

impl Topic {
    pub const ALL: [Topic; 2] = [Topic::BalanceChanged, Topic::PendingListChanged];

    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::BalanceChanged => "balance-changed",
            Topic::PendingListChanged => "pending-list-changed",
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle returned by [`NotificationBus::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId {
    topic: Topic,
    id: u64,
}

impl SubscriptionId {
    pub fn topic(&self) -> Topic {
        self.topic
    }
}

type Listener = Arc<dyn Fn() + Send + Sync>;

/// Synchronous, ordered, payload-free publish/subscribe bus.
#[derive(Default)]
pub struct NotificationBus {
    next_id: AtomicU64,
    listeners: Mutex<HashMap<Topic, Vec<(u64, Listener)>>>,
}

impl NotificationBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for `topic`.
    pub fn subscribe<F>(&self, topic: Topic, listener: F) -> SubscriptionId
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        listeners
            .entry(topic)
            .or_default()
            .push((id, Arc::new(listener)));
        SubscriptionId { topic, id }
    }

    /// Remove a listener. Returns `false` if it was already removed.
    pub fn unsubscribe(&self, subscription: SubscriptionId) -> bool {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(entries) = listeners.get_mut(&subscription.topic) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|(id, _)| *id != subscription.id);
        before != entries.len()
    }

    /// Invoke every listener currently registered for `topic`.
    ///
    /// Returns the number of listeners invoked.
    pub fn emit(&self, topic: Topic) -> usize {
        let snapshot: Vec<Listener> = {
            let listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
            match listeners.get(&topic) {
                Some(entries) => entries.iter().map(|(_, l)| Arc::clone(l)).collect(),
                None => return 0,
            }
        };

        tracing::debug!(topic = %topic, listeners = snapshot.len(), "Emitting notification");

        for listener in &snapshot {
            listener();
        }
        snapshot.len()
    }

    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&topic)
            .map(Vec::len)
            .unwrap_or(0)
    }
}
