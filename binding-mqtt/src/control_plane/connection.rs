//! Broker connection lifecycle: dial-out sessions, self-hosted brokers and topic subscriptions.

use crate::config::{ConfigError, MqttBrokerServerConfig};
use crate::control_plane::broker_uri::BrokerUri;
use crate::control_plane::self_host_auth::SelfHostAuthenticator;
use crate::error::BindingError;
use crate::observability::{events, fields};
use crate::transport::broker::{
    BrokerClient, BrokerConnector, BrokerHost, ConnectOptions, HostedListener, MessageHandler,
    ProtocolVersion,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

const COMPONENT: &str = "connection";
const LOOPBACK_HOST: &str = "127.0.0.1";

/// Observable state of the broker connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No broker URI configured; the binding is inert.
    Unconfigured,
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

/// How a dial-out attempt authenticates, for diagnostics only.
fn attempt_mode(options: &ConnectOptions, configured_client_id: bool) -> &'static str {
    match (&options.credentials, configured_client_id) {
        (None, _) => "anonymous",
        (Some(_), false) => "secured",
        (Some(_), true) => "secured_with_client_id",
    }
}

pub(crate) struct ConnectionManager {
    broker_uri: Option<BrokerUri>,
    self_host: bool,
    configured_client_id: bool,
    authenticator: Arc<SelfHostAuthenticator>,
    options: Option<ConnectOptions>,
    connector: Arc<dyn BrokerConnector>,
    host: Option<Arc<dyn BrokerHost>>,
    state: ConnectionState,
    session: Option<Arc<dyn BrokerClient>>,
    listener: Option<Box<dyn HostedListener>>,
    address: Option<String>,
    port: Option<u16>,
    subscriptions: Mutex<BTreeSet<String>>,
}

impl ConnectionManager {
    pub(crate) fn new(
        config: &MqttBrokerServerConfig,
        connector: Arc<dyn BrokerConnector>,
        host: Option<Arc<dyn BrokerHost>>,
    ) -> Result<Self, BindingError> {
        let protocol = config.protocol()?;
        let broker_uri = config
            .uri
            .as_deref()
            .map(BrokerUri::parse)
            .transpose()
            .map_err(ConfigError::InvalidUri)?;

        if config.self_host && broker_uri.is_none() {
            return Err(ConfigError::SelfHostRequiresUri.into());
        }

        let options = broker_uri.as_ref().map(|uri| ConnectOptions {
            host: uri.host().to_string(),
            port: uri.port(),
            tls: uri.is_tls(),
            client_id: config
                .client_id
                .clone()
                .unwrap_or_else(ConnectOptions::generated_client_id),
            credentials: config.credentials(),
            protocol,
            keep_alive: Duration::from_secs(config.keep_alive_secs()),
        });

        let state = if broker_uri.is_some() {
            ConnectionState::Disconnected
        } else {
            ConnectionState::Unconfigured
        };

        Ok(Self {
            broker_uri,
            self_host: config.self_host,
            configured_client_id: config.client_id.is_some(),
            authenticator: Arc::new(SelfHostAuthenticator::new(
                config.self_host_authentication.clone(),
            )),
            options,
            connector,
            host,
            state,
            session: None,
            listener: None,
            address: None,
            port: None,
            subscriptions: Mutex::new(BTreeSet::new()),
        })
    }

    pub(crate) fn state(&self) -> ConnectionState {
        self.state
    }

    pub(crate) fn broker_uri(&self) -> Option<&BrokerUri> {
        self.broker_uri.as_ref()
    }

    pub(crate) fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    pub(crate) fn port(&self) -> Option<u16> {
        self.port
    }

    /// The open session; `None` until `start` succeeded and after `stop`.
    pub(crate) fn session(&self) -> Option<Arc<dyn BrokerClient>> {
        self.session.clone()
    }

    /// Opens the broker session, or hosts a broker and opens a loopback session to it.
    ///
    /// Without a broker URI this is an inert success. Starting a connected manager is a no-op.
    pub(crate) async fn start(
        &mut self,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<(), BindingError> {
        let (Some(uri), Some(options)) = (self.broker_uri.clone(), self.options.clone()) else {
            warn!(
                event = events::CONNECTION_SKIPPED,
                component = COMPONENT,
                "no broker configured for MQTT binding; skipping"
            );
            return Ok(());
        };
        if self.state == ConnectionState::Connected {
            return Ok(());
        }

        self.state = ConnectionState::Connecting;
        let res = if self.self_host {
            self.start_self_hosted(&uri, options, handler).await
        } else {
            self.start_dial_out(&uri, options, handler).await
        };

        match res {
            Ok(()) => {
                self.state = ConnectionState::Connected;
                info!(
                    event = events::CONNECTION_OK,
                    component = COMPONENT,
                    broker_uri = uri.as_str(),
                    address = self.address.as_deref().unwrap_or(fields::NONE),
                    port = self.port.unwrap_or_default(),
                    self_hosted = self.self_host,
                    "connected to broker"
                );
                Ok(())
            }
            Err(err) => {
                self.state = ConnectionState::Failed;
                error!(
                    event = events::CONNECTION_FAILED,
                    component = COMPONENT,
                    broker_uri = uri.as_str(),
                    err = %err,
                    "could not connect to broker"
                );
                Err(err)
            }
        }
    }

    async fn start_dial_out(
        &mut self,
        uri: &BrokerUri,
        options: ConnectOptions,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<(), BindingError> {
        debug!(
            event = events::CONNECTION_ATTEMPT,
            component = COMPONENT,
            broker_uri = uri.as_str(),
            mode = attempt_mode(&options, self.configured_client_id),
            client_id = options.client_id.as_str(),
            "trying to connect to broker"
        );

        let session = self
            .connector
            .connect(&options, handler)
            .await
            .map_err(|source| BindingError::Connect {
                uri: uri.to_string(),
                source,
            })?;

        self.session = Some(session);
        self.address = Some(uri.host().to_string());
        self.port = Some(uri.port());
        Ok(())
    }

    async fn start_self_hosted(
        &mut self,
        uri: &BrokerUri,
        options: ConnectOptions,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<(), BindingError> {
        let host = self.host.clone().ok_or(BindingError::SelfHostUnavailable)?;
        let listener = host
            .listen(uri.port(), self.authenticator.clone())
            .await
            .map_err(BindingError::Listen)?;
        let local_port = listener.local_port();

        let loopback = ConnectOptions {
            host: LOOPBACK_HOST.to_string(),
            port: local_port,
            tls: false,
            // hosted listeners speak MQTT 3.1.1
            protocol: ProtocolVersion::V4,
            ..options
        };
        debug!(
            event = events::CONNECTION_ATTEMPT,
            component = COMPONENT,
            broker_uri = uri.as_str(),
            mode = attempt_mode(&loopback, self.configured_client_id),
            port = local_port,
            "opening loopback session to self-hosted broker"
        );

        match self.connector.connect(&loopback, handler).await {
            Ok(session) => {
                self.session = Some(session);
                self.listener = Some(listener);
                self.address = Some(uri.host().to_string());
                self.port = Some(local_port);
                Ok(())
            }
            Err(source) => {
                if let Err(err) = listener.close().await {
                    warn!(
                        event = events::SELF_HOST_CLOSED,
                        component = COMPONENT,
                        err = %err,
                        "failed to close self-hosted broker after session failure"
                    );
                }
                Err(BindingError::Connect {
                    uri: format!("mqtt://{LOOPBACK_HOST}:{local_port}"),
                    source,
                })
            }
        }
    }

    /// Subscribes the session to `topic` and tracks it for `stop`.
    pub(crate) async fn subscribe(&self, topic: &str) -> Result<(), BindingError> {
        let session = self.session.as_ref().ok_or(BindingError::NotConnected)?;
        session
            .subscribe(topic)
            .await
            .map_err(BindingError::Broker)?;
        self.subscriptions.lock().await.insert(topic.to_string());
        Ok(())
    }

    pub(crate) async fn unsubscribe(&self, topic: &str) -> Result<(), BindingError> {
        self.subscriptions.lock().await.remove(topic);
        let session = self.session.as_ref().ok_or(BindingError::NotConnected)?;
        session
            .unsubscribe(topic)
            .await
            .map_err(BindingError::Broker)
    }

    pub(crate) async fn subscriptions(&self) -> Vec<String> {
        self.subscriptions.lock().await.iter().cloned().collect()
    }

    /// Unsubscribes every tracked topic, disconnects, and closes a hosted broker.
    ///
    /// Unsubscribe and disconnect failures are logged; only a failure to close the hosted
    /// listener is returned.
    pub(crate) async fn stop(&mut self) -> Result<(), BindingError> {
        if self.state == ConnectionState::Unconfigured {
            return Ok(());
        }

        let topics: Vec<String> = std::mem::take(&mut *self.subscriptions.lock().await)
            .into_iter()
            .collect();

        if let Some(session) = self.session.take() {
            for topic in &topics {
                if let Err(err) = session.unsubscribe(topic).await {
                    warn!(
                        event = events::TOPIC_UNSUBSCRIBE_FAILED,
                        component = COMPONENT,
                        topic = topic.as_str(),
                        err = %err,
                        "failed to unsubscribe topic on stop"
                    );
                }
            }
            if let Err(err) = session.disconnect().await {
                warn!(
                    event = events::CONNECTION_CLOSED,
                    component = COMPONENT,
                    err = %err,
                    "broker disconnect reported an error"
                );
            }
        }

        let close_res = match self.listener.take() {
            Some(listener) => listener.close().await.map_err(BindingError::Broker),
            None => Ok(()),
        };

        self.state = ConnectionState::Disconnected;
        info!(
            event = events::CONNECTION_CLOSED,
            component = COMPONENT,
            broker_uri = self.broker_uri.as_ref().map(BrokerUri::as_str).unwrap_or(fields::NONE),
            unsubscribed = topics.len(),
            "broker connection closed"
        );
        close_res
    }
}
