// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `RPC_URL` | EVM JSON-RPC endpoint | Sepolia public node |
//! | `CHAIN_ID` | Expected chain id | `11155111` |
//! | `TOKEN_CONTRACT_ADDRESS` | Confidential token contract | Required |
//! | `TOKEN_DECIMALS` | Token decimals | `6` |
//! | `RELAYER_URL` | FHE relayer gateway base URL | Required |
//! | `WALLET_PRIVATE_KEY_PEM_PATH` | PEM file holding the signing key | One of these two |
//! | `WALLET_PRIVATE_KEY` | Hex signing key | One of these two |
//! | `DECRYPT_MAX_ATTEMPTS` | Public decryption attempts per conversion | `3` |
//! | `DECRYPT_RETRY_DELAY_SECS` | Delay between decryption attempts | `5` |
//! | `RECEIPT_TIMEOUT_SECS` | Receipt wait before giving up | `180` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use alloy::primitives::Address;

use crate::blockchain::{KeySource, RHT_TOKEN, SEPOLIA};

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const RPC_URL_ENV: &str = "RPC_URL";
pub const CHAIN_ID_ENV: &str = "CHAIN_ID";
pub const TOKEN_CONTRACT_ADDRESS_ENV: &str = "TOKEN_CONTRACT_ADDRESS";
pub const TOKEN_DECIMALS_ENV: &str = "TOKEN_DECIMALS";
pub const RELAYER_URL_ENV: &str = "RELAYER_URL";
pub const WALLET_PRIVATE_KEY_PEM_PATH_ENV: &str = "WALLET_PRIVATE_KEY_PEM_PATH";
pub const WALLET_PRIVATE_KEY_ENV: &str = "WALLET_PRIVATE_KEY";
pub const DECRYPT_MAX_ATTEMPTS_ENV: &str = "DECRYPT_MAX_ATTEMPTS";
pub const DECRYPT_RETRY_DELAY_SECS_ENV: &str = "DECRYPT_RETRY_DELAY_SECS";
pub const RECEIPT_TIMEOUT_SECS_ENV: &str = "RECEIPT_TIMEOUT_SECS";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Default `RUST_LOG` filter when the variable is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

/// Interval between receipt polls.
pub const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub rpc_url: String,
    pub chain_id: u64,
    pub token_address: Address,
    pub token_decimals: u8,
    pub relayer_url: String,
    pub key_source: KeySource,
    pub decrypt_max_attempts: u32,
    pub decrypt_retry_delay: Duration,
    pub receipt_timeout: Duration,
    pub log_format: LogFormat,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {0}")]
    Missing(String),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let host = env.or_default(HOST_ENV, "0.0.0.0");
        let port = env.or_default(PORT_ENV, "8080");
        let bind_addr: SocketAddr = format!("{host}:{port}").parse().map_err(|e| ConfigError::Invalid {
            name: PORT_ENV,
            reason: format!("{host}:{port}: {e}"),
        })?;

        let token_address = env.required(TOKEN_CONTRACT_ADDRESS_ENV)?;
        let token_address = Address::from_str(&token_address).map_err(|e| ConfigError::Invalid {
            name: TOKEN_CONTRACT_ADDRESS_ENV,
            reason: e.to_string(),
        })?;

        let relayer_url = env.required(RELAYER_URL_ENV)?;
        url::Url::parse(&relayer_url).map_err(|e| ConfigError::Invalid {
            name: RELAYER_URL_ENV,
            reason: e.to_string(),
        })?;

        let key_source = match (
            env.optional(WALLET_PRIVATE_KEY_PEM_PATH_ENV),
            env.optional(WALLET_PRIVATE_KEY_ENV),
        ) {
            (Some(path), _) => KeySource::PemFile(PathBuf::from(path)),
            (None, Some(hex)) => KeySource::Hex(hex),
            (None, None) => {
                return Err(ConfigError::Missing(format!(
                    "{WALLET_PRIVATE_KEY_PEM_PATH_ENV} or {WALLET_PRIVATE_KEY_ENV}"
                )))
            }
        };

        let log_format = match env.or_default(LOG_FORMAT_ENV, "pretty").to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            "pretty" => LogFormat::Pretty,
            other => {
                return Err(ConfigError::Invalid {
                    name: LOG_FORMAT_ENV,
                    reason: format!("expected json or pretty, got {other}"),
                })
            }
        };

        let decrypt_max_attempts: u32 = env.parsed(DECRYPT_MAX_ATTEMPTS_ENV, 3)?;
        if decrypt_max_attempts == 0 {
            return Err(ConfigError::Invalid {
                name: DECRYPT_MAX_ATTEMPTS_ENV,
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            bind_addr,
            rpc_url: env.or_default(RPC_URL_ENV, SEPOLIA.rpc_url),
            chain_id: env.parsed(CHAIN_ID_ENV, SEPOLIA.chain_id)?,
            token_address,
            token_decimals: env.parsed(TOKEN_DECIMALS_ENV, RHT_TOKEN.decimals)?,
            relayer_url,
            key_source,
            decrypt_max_attempts,
            decrypt_retry_delay: Duration::from_secs(env.parsed(DECRYPT_RETRY_DELAY_SECS_ENV, 5)?),
            receipt_timeout: Duration::from_secs(env.parsed(RECEIPT_TIMEOUT_SECS_ENV, 180)?),
            log_format,
        })
    }
}

struct Env<F>(F);

impl<F: Fn(&str) -> Option<String>> Env<F> {
    fn optional(&self, name: &str) -> Option<String> {
        (self.0)(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, name: &str) -> Result<String, ConfigError> {
        self.optional(name)
            .ok_or_else(|| ConfigError::Missing(name.to_string()))
    }

    fn or_default(&self, name: &str, default: &str) -> String {
        self.optional(name).unwrap_or_else(|| default.to_string())
    }

    fn parsed<T>(&self, name: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.optional(name) {
            Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
                name,
                reason: format!("{raw}: {e}"),
            }),
            None => Ok(default),
        }
    }
}
