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

//! [`BrokerConnector`] backed by `rumqttc`, for MQTT 3.1.1 and MQTT 5 sessions.

use crate::observability::events;
use crate::transport::broker::{
    BrokerClient, BrokerConnector, BrokerError, ConnectOptions, InboundMessage, MessageHandler,
    ProtocolVersion,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const COMPONENT: &str = "rumqtt_client";
const DEFAULT_REQUEST_CAPACITY: usize = 64;
const RECONNECT_DELAY: Duration = Duration::from_secs(1);
const PUMP_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Opens sessions with `rumqttc`, choosing the protocol from [`ConnectOptions::protocol`].
#[derive(Debug, Clone)]
pub struct RumqttConnector {
    request_capacity: usize,
}

impl RumqttConnector {
    /// `request_capacity` bounds the queue of publish/subscribe requests awaiting the event loop.
    pub fn new(request_capacity: usize) -> Self {
        Self {
            request_capacity: request_capacity.max(1),
        }
    }
}

impl Default for RumqttConnector {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_CAPACITY)
    }
}

#[async_trait]
impl BrokerConnector for RumqttConnector {
    async fn connect(
        &self,
        options: &ConnectOptions,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<Arc<dyn BrokerClient>, BrokerError> {
        match options.protocol {
            ProtocolVersion::V4 => v4::connect(options, handler, self.request_capacity).await,
            ProtocolVersion::V5 => v5::connect(options, handler, self.request_capacity).await,
        }
    }
}

/// Background task forwarding incoming publishes to the message handler.
struct EventPump {
    closing: Arc<AtomicBool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl EventPump {
    fn new(closing: Arc<AtomicBool>, task: JoinHandle<()>) -> Self {
        Self {
            closing,
            task: Mutex::new(Some(task)),
        }
    }

    fn mark_closing(&self) {
        self.closing.store(true, Ordering::Release);
    }

    async fn stop(&self) {
        self.mark_closing();
        let Some(mut task) = self.task.lock().await.take() else {
            return;
        };
        if tokio::time::timeout(PUMP_DRAIN_TIMEOUT, &mut task)
            .await
            .is_err()
        {
            task.abort();
        }
    }
}

fn log_connection_lost(err: &dyn std::fmt::Display) {
    warn!(
        event = events::CONNECTION_LOST,
        component = COMPONENT,
        err = %err,
        "broker event loop failed; reconnecting"
    );
}

fn log_delivery(topic: &str, payload_len: usize) {
    debug!(
        event = events::INBOUND_RECEIVE,
        component = COMPONENT,
        topic,
        payload_len,
        "broker delivered message"
    );
}

mod v4 {
    use super::*;
    use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS, Transport};

    pub(super) async fn connect(
        options: &ConnectOptions,
        handler: Arc<dyn MessageHandler>,
        request_capacity: usize,
    ) -> Result<Arc<dyn BrokerClient>, BrokerError> {
        let mut mqtt_options = MqttOptions::new(&options.client_id, &options.host, options.port);
        mqtt_options.set_keep_alive(options.keep_alive);
        if let Some(credentials) = &options.credentials {
            mqtt_options.set_credentials(&credentials.username, &credentials.password);
        }
        if options.tls {
            mqtt_options.set_transport(Transport::tls_with_default_config());
        }

        let (client, mut eventloop) = AsyncClient::new(mqtt_options, request_capacity);
        await_connack(&mut eventloop).await?;

        let closing = Arc::new(AtomicBool::new(false));
        let task = tokio::spawn(pump(eventloop, handler, closing.clone()));

        Ok(Arc::new(RumqttClient {
            client,
            pump: EventPump::new(closing, task),
        }))
    }

    async fn await_connack(eventloop: &mut EventLoop) -> Result<(), BrokerError> {
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => return Ok(()),
                Ok(_) => continue,
                Err(rumqttc::ConnectionError::ConnectionRefused(code)) => {
                    return Err(BrokerError::ConnectionRefused(format!("{code:?}")))
                }
                Err(err) => return Err(BrokerError::Io(err.to_string())),
            }
        }
    }

    async fn pump(
        mut eventloop: EventLoop,
        handler: Arc<dyn MessageHandler>,
        closing: Arc<AtomicBool>,
    ) {
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    log_delivery(&publish.topic, publish.payload.len());
                    handler
                        .on_message(InboundMessage {
                            topic: publish.topic,
                            payload: publish.payload.to_vec(),
                            content_type: None,
                        })
                        .await;
                }
                Ok(_) => {}
                Err(err) => {
                    if closing.load(Ordering::Acquire) {
                        break;
                    }
                    log_connection_lost(&err);
                    tokio::time::sleep(RECONNECT_DELAY).await;
                }
            }
        }
    }

    struct RumqttClient {
        client: AsyncClient,
        pump: EventPump,
    }

    #[async_trait]
    impl BrokerClient for RumqttClient {
        async fn publish(
            &self,
            topic: &str,
            payload: Vec<u8>,
            retain: bool,
        ) -> Result<(), BrokerError> {
            self.client
                .publish(topic, QoS::AtMostOnce, retain, payload)
                .await
                .map_err(|e| BrokerError::Request(e.to_string()))
        }

        async fn subscribe(&self, topic: &str) -> Result<(), BrokerError> {
            self.client
                .subscribe(topic, QoS::AtMostOnce)
                .await
                .map_err(|e| BrokerError::Request(e.to_string()))
        }

        async fn unsubscribe(&self, topic: &str) -> Result<(), BrokerError> {
            self.client
                .unsubscribe(topic)
                .await
                .map_err(|e| BrokerError::Request(e.to_string()))
        }

        async fn disconnect(&self) -> Result<(), BrokerError> {
            self.pump.mark_closing();
            let res = self
                .client
                .disconnect()
                .await
                .map_err(|e| BrokerError::Request(e.to_string()));
            self.pump.stop().await;
            res
        }
    }
}

mod v5 {
    use super::*;
    use rumqttc::v5::mqttbytes::v5::Packet;
    use rumqttc::v5::mqttbytes::QoS;
    use rumqttc::v5::{AsyncClient, ConnectionError, Event, EventLoop, MqttOptions};
    use rumqttc::Transport;

    pub(super) async fn connect(
        options: &ConnectOptions,
        handler: Arc<dyn MessageHandler>,
        request_capacity: usize,
    ) -> Result<Arc<dyn BrokerClient>, BrokerError> {
        let mut mqtt_options = MqttOptions::new(&options.client_id, &options.host, options.port);
        mqtt_options.set_keep_alive(options.keep_alive);
        if let Some(credentials) = &options.credentials {
            mqtt_options.set_credentials(&credentials.username, &credentials.password);
        }
        if options.tls {
            mqtt_options.set_transport(Transport::tls_with_default_config());
        }

        let (client, mut eventloop) = AsyncClient::new(mqtt_options, request_capacity);
        await_connack(&mut eventloop).await?;

        let closing = Arc::new(AtomicBool::new(false));
        let task = tokio::spawn(pump(eventloop, handler, closing.clone()));

        Ok(Arc::new(RumqttClient {
            client,
            pump: EventPump::new(closing, task),
        }))
    }

    async fn await_connack(eventloop: &mut EventLoop) -> Result<(), BrokerError> {
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => return Ok(()),
                Ok(_) => continue,
                Err(ConnectionError::ConnectionRefused(code)) => {
                    return Err(BrokerError::ConnectionRefused(format!("{code:?}")))
                }
                Err(err) => return Err(BrokerError::Io(err.to_string())),
            }
        }
    }

    async fn pump(
        mut eventloop: EventLoop,
        handler: Arc<dyn MessageHandler>,
        closing: Arc<AtomicBool>,
    ) {
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    let topic = String::from_utf8_lossy(&publish.topic).into_owned();
                    log_delivery(&topic, publish.payload.len());
                    let content_type = publish
                        .properties
                        .as_ref()
                        .and_then(|properties| properties.content_type.clone());
                    handler
                        .on_message(InboundMessage {
                            topic,
                            payload: publish.payload.to_vec(),
                            content_type,
                        })
                        .await;
                }
                Ok(_) => {}
                Err(err) => {
                    if closing.load(Ordering::Acquire) {
                        break;
                    }
                    log_connection_lost(&err);
                    tokio::time::sleep(RECONNECT_DELAY).await;
                }
            }
        }
    }

    struct RumqttClient {
        client: AsyncClient,
        pump: EventPump,
    }

    #[async_trait]
    impl BrokerClient for RumqttClient {
        async fn publish(
            &self,
            topic: &str,
            payload: Vec<u8>,
            retain: bool,
        ) -> Result<(), BrokerError> {
            self.client
                .publish(topic, QoS::AtMostOnce, retain, payload)
                .await
                .map_err(|e| BrokerError::Request(e.to_string()))
        }

        async fn subscribe(&self, topic: &str) -> Result<(), BrokerError> {
            self.client
                .subscribe(topic, QoS::AtMostOnce)
                .await
                .map_err(|e| BrokerError::Request(e.to_string()))
        }

        async fn unsubscribe(&self, topic: &str) -> Result<(), BrokerError> {
            self.client
                .unsubscribe(topic)
                .await
                .map_err(|e| BrokerError::Request(e.to_string()))
        }

        async fn disconnect(&self) -> Result<(), BrokerError> {
            self.pump.mark_closing();
            let res = self
                .client
                .disconnect()
                .await
                .map_err(|e| BrokerError::Request(e.to_string()));
            self.pump.stop().await;
            res
        }
    }
}
