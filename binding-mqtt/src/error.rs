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

use crate::config::ConfigError;
use crate::transport::broker::BrokerError;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Failures surfaced by [`MqttBrokerServer`][crate::MqttBrokerServer] operations.
///
/// Per-message failures (routing, decoding, invocation) are logged and never reach callers.
#[derive(Debug)]
pub enum BindingError {
    Config(ConfigError),
    SelfHostUnavailable,
    Listen(BrokerError),
    Connect { uri: String, source: BrokerError },
    NotConnected,
    Broker(BrokerError),
}

impl Display for BindingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            BindingError::Config(err) => write!(f, "invalid configuration: {err}"),
            BindingError::SelfHostUnavailable => {
                write!(f, "self-hosting requested but no broker host is available")
            }
            BindingError::Listen(err) => write!(f, "failed to start self-hosted broker: {err}"),
            BindingError::Connect { uri, source } => {
                write!(f, "could not connect to broker at {uri}: {source}")
            }
            BindingError::NotConnected => write!(f, "binding is not connected to a broker"),
            BindingError::Broker(err) => write!(f, "broker operation failed: {err}"),
        }
    }
}

impl Error for BindingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            BindingError::Config(err) => Some(err),
            BindingError::Listen(err) | BindingError::Broker(err) => Some(err),
            BindingError::Connect { source, .. } => Some(source),
            BindingError::SelfHostUnavailable | BindingError::NotConnected => None,
        }
    }
}

impl From<ConfigError> for BindingError {
    fn from(err: ConfigError) -> Self {
        BindingError::Config(err)
    }
}
