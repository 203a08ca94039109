// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::actions::TokenActions;
use crate::blockchain::{ChainClient, TokenConfig};
use crate::conversion::guard::InFlight;
use crate::conversion::{ConversionOrchestrator, ConversionSettings, PendingConversionRegistry};
use crate::events::NotificationBus;
use crate::relayer::EncryptionAdapter;
use crate::views::{NotificationCounters, PlainBalanceView};

#[derive(Clone)]
pub struct AppState {
    pub chain: Arc<dyn ChainClient>,
    pub bus: Arc<NotificationBus>,
    pub orchestrator: Arc<ConversionOrchestrator>,
    pub pending: Arc<PendingConversionRegistry>,
    pub actions: Arc<TokenActions>,
    pub plain_balance: Arc<PlainBalanceView>,
    pub notifications: Arc<NotificationCounters>,
}

impl AppState {
    /// Wire every service around one chain client, one relayer and one bus.
    pub fn new(
        chain: Arc<dyn ChainClient>,
        relayer: Arc<dyn EncryptionAdapter>,
        token: TokenConfig,
        settings: ConversionSettings,
    ) -> Self {
        let bus = Arc::new(NotificationBus::new());
        let notifications = Arc::new(NotificationCounters::new(&bus));
        let actions = Arc::new(TokenActions::new(
            chain.clone(),
            relayer.clone(),
            bus.clone(),
            token,
        ));
        let plain_balance = Arc::new(PlainBalanceView::new(actions.clone(), bus.clone()));
        let conversions = InFlight::new();

        Self {
            orchestrator: Arc::new(ConversionOrchestrator::new(
                chain.clone(),
                relayer.clone(),
                bus.clone(),
                settings,
                conversions.clone(),
            )),
            pending: Arc::new(PendingConversionRegistry::new(
                chain.clone(),
                relayer,
                bus.clone(),
                conversions,
            )),
            chain,
            bus,
            actions,
            plain_balance,
            notifications,
        }
    }
}

#[cfg(test)]
impl AppState {
    /// State over fresh in-memory mocks.
    pub(crate) fn mocked() -> (
        Self,
        Arc<crate::testing::MockChain>,
        Arc<crate::testing::MockRelayer>,
    ) {
        let chain = Arc::new(crate::testing::MockChain::new());
        let relayer = Arc::new(crate::testing::MockRelayer::new());
        let state = Self::new(
            chain.clone(),
            relayer.clone(),
            crate::blockchain::RHT_TOKEN,
            ConversionSettings {
                decrypt_retry_delay: std::time::Duration::ZERO,
                ..ConversionSettings::default()
            },
        );
        (state, chain, relayer)
    }
}
