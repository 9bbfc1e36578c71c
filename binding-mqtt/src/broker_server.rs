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

use crate::codec::{ContentCodec, JsonCodec};
use crate::config::MqttBrokerServerConfig;
use crate::control_plane::broker_uri::BrokerUri;
use crate::control_plane::connection::{ConnectionManager, ConnectionState};
use crate::data_plane::form_binder::FormBinder;
use crate::data_plane::inbound_router::InboundRouter;
use crate::data_plane::outbound_bridge::OutboundBridge;
use crate::error::BindingError;
use crate::observability::{events, fields};
use crate::resource::ExposedResource;
use crate::routing::topic_namespace::TopicNamespace;
use crate::transport::broker::{BrokerConnector, BrokerHost, MessageHandler};
use crate::transport::rumqtt_client::RumqttConnector;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const COMPONENT: &str = "broker_server";

/// MQTT protocol binding server.
///
/// Exposes resources as topic trees on a broker: property and event values are published,
/// action and property-write topics are subscribed and routed back into the resource.
///
/// ```
/// use binding_mqtt::{ConnectionState, MqttBrokerServer, MqttBrokerServerConfig};
///
/// let server = MqttBrokerServer::new(MqttBrokerServerConfig::with_uri("broker.local")).unwrap();
///
/// assert_eq!(server.broker_uri().unwrap().as_str(), "mqtt://broker.local");
/// assert_eq!(server.connection_state(), ConnectionState::Disconnected);
/// assert_eq!(server.port(), None);
/// ```
pub struct MqttBrokerServer {
    connection: ConnectionManager,
    namespace: Arc<TopicNamespace>,
    outbound: OutboundBridge,
    router: Arc<InboundRouter>,
    /// Inbound topics subscribed per exposed name; locked across all of expose and destroy.
    inbound: Mutex<HashMap<String, Vec<String>>>,
}

impl MqttBrokerServer {
    /// Builds a server with the JSON codec, the `rumqttc` connector and, when the
    /// `embedded-broker` feature is enabled, the `rumqttd` broker host.
    pub fn new(config: MqttBrokerServerConfig) -> Result<Self, BindingError> {
        MqttBrokerServerBuilder::new(config).build()
    }

    pub fn builder(config: MqttBrokerServerConfig) -> MqttBrokerServerBuilder {
        MqttBrokerServerBuilder::new(config)
    }

    /// Connects to the configured broker, or hosts one when `self_host` is set.
    ///
    /// Without a broker URI this succeeds and leaves the server inert.
    pub async fn start(&mut self) -> Result<(), BindingError> {
        let handler: Arc<dyn MessageHandler> = self.router.clone();
        self.connection.start(handler).await
    }

    /// Cancels every value tap, forgets every exposed resource and closes the connection.
    pub async fn stop(&mut self) -> Result<(), BindingError> {
        self.inbound.lock().await.clear();
        let cancelled = self.outbound.detach_all().await;
        let released = self.namespace.clear().await;
        debug!(
            event = events::RESOURCE_DESTROY_OK,
            component = COMPONENT,
            released = released.len(),
            cancelled,
            "released all exposed resources"
        );
        self.connection.stop().await
    }

    /// Exposes `resource` under a unique name and returns that name.
    ///
    /// Returns `None` without touching the resource while no broker session is open.
    pub async fn expose(&self, resource: Arc<dyn ExposedResource>) -> Option<String> {
        let (Some(uri), Some(client)) = (self.connection.broker_uri(), self.connection.session())
        else {
            debug!(
                event = events::RESOURCE_EXPOSE_SKIPPED,
                component = COMPONENT,
                reason = fields::REASON_NOT_CONNECTED,
                "no broker session; skipping expose"
            );
            return None;
        };

        let mut inbound = self.inbound.lock().await;
        let title = resource.description().title;
        let name = self.namespace.assign_name(&title, resource.clone()).await;

        let summary = FormBinder::new(uri.as_str(), &self.connection, &self.outbound, client.clone())
            .bind(&name, &resource)
            .await;
        self.outbound
            .publish_snapshot(&name, &resource, &client)
            .await;
        let subscriptions = summary.subscribed.len();
        inbound.insert(name.clone(), summary.subscribed);

        info!(
            event = events::RESOURCE_EXPOSED,
            component = COMPONENT,
            resource = name.as_str(),
            title = title.as_str(),
            forms = summary.forms,
            subscriptions,
            taps = summary.taps,
            "exposed resource"
        );
        Some(name)
    }

    /// Stops exposing every entry bound to the resource with id `resource_id`.
    ///
    /// Cancels the resource's value taps and unsubscribes the inbound topics subscribed when it
    /// was exposed. Returns whether anything was exposed under that id.
    pub async fn destroy(&self, resource_id: &str) -> bool {
        let mut inbound = self.inbound.lock().await;
        let released = self.namespace.release(resource_id).await;
        if released.is_empty() {
            info!(
                event = events::RESOURCE_DESTROY_NOT_FOUND,
                component = COMPONENT,
                resource_id,
                "no exposed resource with this id"
            );
            return false;
        }

        for (name, _resource) in released {
            let cancelled = self.outbound.detach(&name).await;
            for topic in inbound.remove(&name).unwrap_or_default() {
                if let Err(err) = self.connection.unsubscribe(&topic).await {
                    warn!(
                        event = events::TOPIC_UNSUBSCRIBE_FAILED,
                        component = COMPONENT,
                        resource = name.as_str(),
                        topic = topic.as_str(),
                        err = %err,
                        "failed to unsubscribe inbound topic"
                    );
                }
            }
            info!(
                event = events::RESOURCE_DESTROY_OK,
                component = COMPONENT,
                resource = name.as_str(),
                resource_id,
                cancelled,
                "destroyed exposed resource"
            );
        }
        true
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn broker_uri(&self) -> Option<&BrokerUri> {
        self.connection.broker_uri()
    }

    /// Host of the connected (or hosted) broker; `None` until started.
    pub fn address(&self) -> Option<&str> {
        self.connection.address()
    }

    /// Port of the connected broker, or the bound port of a hosted one; `None` until started.
    pub fn port(&self) -> Option<u16> {
        self.connection.port()
    }

    pub async fn exposed_count(&self) -> usize {
        self.namespace.len().await
    }

    /// Topics the session is currently subscribed to, sorted.
    pub async fn subscriptions(&self) -> Vec<String> {
        self.connection.subscriptions().await
    }
}

/// Builder for [`MqttBrokerServer`] with replaceable collaborators.
pub struct MqttBrokerServerBuilder {
    config: MqttBrokerServerConfig,
    codec: Option<Arc<dyn ContentCodec>>,
    connector: Option<Arc<dyn BrokerConnector>>,
    host: Option<Arc<dyn BrokerHost>>,
}

impl MqttBrokerServerBuilder {
    pub fn new(config: MqttBrokerServerConfig) -> Self {
        Self {
            config,
            codec: None,
            connector: None,
            host: None,
        }
    }

    pub fn codec(mut self, codec: Arc<dyn ContentCodec>) -> Self {
        self.codec = Some(codec);
        self
    }

    pub fn connector(mut self, connector: Arc<dyn BrokerConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    pub fn broker_host(mut self, host: Arc<dyn BrokerHost>) -> Self {
        self.host = Some(host);
        self
    }

    pub fn build(self) -> Result<MqttBrokerServer, BindingError> {
        let codec = self.codec.unwrap_or_else(|| Arc::new(JsonCodec));
        let connector = self
            .connector
            .unwrap_or_else(|| Arc::new(RumqttConnector::default()));
        let host = self.host.or_else(default_host);

        let connection = ConnectionManager::new(&self.config, connector, host)?;
        let namespace = Arc::new(TopicNamespace::new());
        let router = Arc::new(InboundRouter::new(namespace.clone(), codec.clone()));

        Ok(MqttBrokerServer {
            connection,
            namespace,
            outbound: OutboundBridge::new(codec),
            router,
            inbound: Mutex::new(HashMap::new()),
        })
    }
}

#[cfg(feature = "embedded-broker")]
fn default_host() -> Option<Arc<dyn BrokerHost>> {
    Some(Arc::new(crate::transport::embedded_broker::RumqttdHost))
}

#[cfg(not(feature = "embedded-broker"))]
fn default_host() -> Option<Arc<dyn BrokerHost>> {
    None
}
