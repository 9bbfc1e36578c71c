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

//! Broker client, connector and host abstractions.
//!
//! The binding talks to the broker only through these traits, so the MQTT library can be
//! swapped and tests can substitute in-memory fakes.

use crate::config::Credential;
use crate::control_plane::self_host_auth::SelfHostAuthenticator;
use async_trait::async_trait;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

const CLIENT_ID_PREFIX: &str = "binding-mqtt-";

/// Failures reported by broker clients and hosts.
#[derive(Debug, Clone, PartialEq)]
pub enum BrokerError {
    ConnectionRefused(String),
    Io(String),
    Request(String),
    NotConnected,
    Listen { port: u16, reason: String },
    Unsupported(String),
}

impl Display for BrokerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            BrokerError::ConnectionRefused(reason) => {
                write!(f, "broker refused connection: {reason}")
            }
            BrokerError::Io(reason) => write!(f, "broker i/o failed: {reason}"),
            BrokerError::Request(reason) => write!(f, "broker request failed: {reason}"),
            BrokerError::NotConnected => write!(f, "not connected to a broker"),
            BrokerError::Listen { port, reason } => {
                write!(f, "failed to listen on port {port}: {reason}")
            }
            BrokerError::Unsupported(what) => write!(f, "unsupported: {what}"),
        }
    }
}

impl Error for BrokerError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolVersion {
    /// MQTT 3.1.1
    V4,
    /// MQTT 5, the only version carrying a content-type property.
    V5,
}

/// Everything a [`BrokerConnector`] needs to open a session.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectOptions {
    pub host: String,
    pub port: u16,
    pub tls: bool,
    pub client_id: String,
    pub credentials: Option<Credential>,
    pub protocol: ProtocolVersion,
    pub keep_alive: Duration,
}

impl ConnectOptions {
    /// Generates a unique client identifier for sessions without a configured one.
    pub fn generated_client_id() -> String {
        format!("{CLIENT_ID_PREFIX}{}", Uuid::new_v4().simple())
    }
}

/// A message delivered by the broker on one of the subscribed topics.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub content_type: Option<String>,
}

/// The single callback receiving every message of a session.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn on_message(&self, message: InboundMessage);
}

/// An open broker session.
#[async_trait]
pub trait BrokerClient: Send + Sync {
    async fn publish(&self, topic: &str, payload: Vec<u8>, retain: bool)
        -> Result<(), BrokerError>;

    async fn subscribe(&self, topic: &str) -> Result<(), BrokerError>;

    async fn unsubscribe(&self, topic: &str) -> Result<(), BrokerError>;

    async fn disconnect(&self) -> Result<(), BrokerError>;
}

/// Opens broker sessions; resolves only once the broker acknowledged the connection.
#[async_trait]
pub trait BrokerConnector: Send + Sync {
    async fn connect(
        &self,
        options: &ConnectOptions,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<Arc<dyn BrokerClient>, BrokerError>;
}

/// Starts a broker owned by the binding.
#[async_trait]
pub trait BrokerHost: Send + Sync {
    async fn listen(
        &self,
        port: u16,
        authenticator: Arc<SelfHostAuthenticator>,
    ) -> Result<Box<dyn HostedListener>, BrokerError>;
}

/// The listening socket of a self-hosted broker.
#[async_trait]
pub trait HostedListener: Send + Sync {
    fn local_port(&self) -> u16;

    async fn close(&self) -> Result<(), BrokerError>;
}

#[cfg(test)]
mod tests {
    use super::{BrokerError, ConnectOptions, CLIENT_ID_PREFIX};

    #[test]
    fn generated_client_ids_are_unique_and_prefixed() {
        let first = ConnectOptions::generated_client_id();
        let second = ConnectOptions::generated_client_id();

        assert!(first.starts_with(CLIENT_ID_PREFIX));
        assert_eq!(first.len(), CLIENT_ID_PREFIX.len() + 32);
        assert_ne!(first, second);
    }

    #[test]
    fn listen_error_names_the_port() {
        let err = BrokerError::Listen {
            port: 1883,
            reason: "address in use".to_string(),
        };

        assert_eq!(
            err.to_string(),
            "failed to listen on port 1883: address in use"
        );
    }
}
