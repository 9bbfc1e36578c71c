/********************************************************************************
 * Copyright (c) 2026 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

use crate::control_plane::broker_uri::BrokerUriError;
use crate::transport::broker::ProtocolVersion;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const DEFAULT_KEEP_ALIVE_SECS: u64 = 60;

/// Configuration values that parse but cannot be used.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    InvalidUri(BrokerUriError),
    UnsupportedProtocolVersion(u8),
    SelfHostRequiresUri,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidUri(err) => write!(f, "{err}"),
            ConfigError::UnsupportedProtocolVersion(version) => {
                write!(f, "unsupported MQTT protocol version {version}; expected 3, 4 or 5")
            }
            ConfigError::SelfHostRequiresUri => {
                write!(f, "self_host requires a uri carrying the port to listen on")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConfigError::InvalidUri(err) => Some(err),
            _ => None,
        }
    }
}

/// Configuration of an [`MqttBrokerServer`][crate::MqttBrokerServer].
///
/// Without a `uri` the binding starts in an inert state and exposes nothing.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MqttBrokerServerConfig {
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub protocol_version: Option<u8>,
    #[serde(default)]
    pub keep_alive_secs: Option<u64>,
    #[serde(default)]
    pub self_host: bool,
    #[serde(default)]
    pub self_host_authentication: Option<Vec<Credential>>,
}

impl MqttBrokerServerConfig {
    pub fn with_uri(uri: &str) -> Self {
        Self {
            uri: Some(uri.to_string()),
            ..Default::default()
        }
    }

    pub fn keep_alive_secs(&self) -> u64 {
        self.keep_alive_secs.unwrap_or(DEFAULT_KEEP_ALIVE_SECS)
    }

    /// MQTT 3.1 and 3.1.1 (`3`, `4`) are served by the same client; `5` selects MQTT 5.
    pub fn protocol(&self) -> Result<ProtocolVersion, ConfigError> {
        match self.protocol_version {
            None | Some(3) | Some(4) => Ok(ProtocolVersion::V4),
            Some(5) => Ok(ProtocolVersion::V5),
            Some(other) => Err(ConfigError::UnsupportedProtocolVersion(other)),
        }
    }

    /// Connection credentials, present only when a username is configured.
    pub fn credentials(&self) -> Option<Credential> {
        self.username.as_ref().map(|username| Credential {
            username: username.clone(),
            password: self.password.clone().unwrap_or_default(),
        })
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

impl Credential {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
        }
    }
}
