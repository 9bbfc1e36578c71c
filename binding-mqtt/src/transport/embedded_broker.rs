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

//! Self-hosted broker backed by `rumqttd`.
//!
//! `rumqttd` serves on an internal loopback port and cannot be shut down once started. The
//! public port is a proxy front door owned by this module: closing it stops accepting and
//! drops every proxied connection, which makes the hosted broker unreachable.

use crate::control_plane::self_host_auth::SelfHostAuthenticator;
use crate::observability::events;
use crate::runtime::worker_runtime::{spawn_named_worker, WorkerHandle};
use crate::transport::broker::{BrokerError, BrokerHost, HostedListener};
use async_trait::async_trait;
use serde_json::json;
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::copy_bidirectional;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

const COMPONENT: &str = "embedded_broker";
const BROKER_THREAD_NAME: &str = "binding-mqtt-broker";
const LISTENER_NAME: &str = "v4-1";
const MAX_CONNECTIONS: usize = 1024;
const MAX_PAYLOAD_SIZE: usize = 256 * 1024;
const READY_POLL_INTERVAL: Duration = Duration::from_millis(20);
const READY_TIMEOUT: Duration = Duration::from_secs(5);
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Hosts an MQTT 3.1.1 broker in-process.
#[derive(Debug, Clone, Default)]
pub struct RumqttdHost;

impl RumqttdHost {
    fn free_loopback_port() -> Result<u16, BrokerError> {
        let probe = std::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
            .map_err(|e| BrokerError::Io(e.to_string()))?;
        let port = probe
            .local_addr()
            .map_err(|e| BrokerError::Io(e.to_string()))?
            .port();
        Ok(port)
    }

    fn broker_config(
        internal: SocketAddr,
        authenticator: &Arc<SelfHostAuthenticator>,
    ) -> Result<rumqttd::Config, BrokerError> {
        let mut config: rumqttd::Config = serde_json::from_value(json!({
            "id": 0,
            "router": {
                "max_connections": MAX_CONNECTIONS,
                "max_outgoing_packet_count": 200,
                "max_segment_size": 104_857_600,
                "max_segment_count": 10,
            },
            "v4": {
                LISTENER_NAME: {
                    "name": LISTENER_NAME,
                    "listen": internal.to_string(),
                    "next_connection_delay_ms": 1,
                    "connections": {
                        "connection_timeout_ms": 60_000,
                        "max_payload_size": MAX_PAYLOAD_SIZE,
                        "max_inflight_count": 100,
                        "dynamic_filters": true,
                    },
                },
            },
        }))
        .map_err(|e| BrokerError::Unsupported(format!("rumqttd configuration: {e}")))?;

        if authenticator.requires_credentials() {
            let settings = config
                .v4
                .as_mut()
                .and_then(|servers| servers.get_mut(LISTENER_NAME))
                .ok_or_else(|| {
                    BrokerError::Unsupported("rumqttd listener settings missing".to_string())
                })?;
            let authenticator = authenticator.clone();
            settings.connections.external_auth = Some(Arc::new(
                move |_client_id: String, username: String, password: String| {
                    // rumqttd reports an absent username as an empty one
                    let username = (!username.is_empty()).then_some(username);
                    authenticator.authenticate(username.as_deref(), password.as_bytes())
                },
            ));
        }

        Ok(config)
    }

    /// Waits until the broker thread accepts connections on its internal port.
    async fn await_ready(internal: SocketAddr, worker: &WorkerHandle) -> Result<(), BrokerError> {
        let not_ready = |reason: &str| BrokerError::Listen {
            port: internal.port(),
            reason: reason.to_string(),
        };
        let probe = async {
            while TcpStream::connect(internal).await.is_err() {
                if worker.is_finished() {
                    return Err(not_ready("hosted broker thread exited during startup"));
                }
                tokio::time::sleep(READY_POLL_INTERVAL).await;
            }
            Ok(())
        };
        tokio::time::timeout(READY_TIMEOUT, probe)
            .await
            .map_err(|_| not_ready("hosted broker did not come up"))?
    }
}

#[async_trait]
impl BrokerHost for RumqttdHost {
    async fn listen(
        &self,
        port: u16,
        authenticator: Arc<SelfHostAuthenticator>,
    ) -> Result<Box<dyn HostedListener>, BrokerError> {
        let front_door = TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
            .await
            .map_err(|e| BrokerError::Listen {
                port,
                reason: e.to_string(),
            })?;
        let local_port = front_door
            .local_addr()
            .map_err(|e| BrokerError::Io(e.to_string()))?
            .port();

        let internal = SocketAddr::from((Ipv4Addr::LOCALHOST, Self::free_loopback_port()?));
        let config = Self::broker_config(internal, &authenticator)?;

        let worker = spawn_named_worker(BROKER_THREAD_NAME, move || {
            let mut broker = rumqttd::Broker::new(config);
            if let Err(err) = broker.start() {
                warn!(
                    event = events::SELF_HOST_CLOSED,
                    component = COMPONENT,
                    err = %err,
                    "hosted broker stopped"
                );
            }
        })
        .map_err(|e| BrokerError::Io(e.to_string()))?;
        Self::await_ready(internal, &worker).await?;

        let accept_task = tokio::spawn(accept_loop(front_door, internal));

        info!(
            event = events::SELF_HOST_LISTENING,
            component = COMPONENT,
            port = local_port,
            internal = %internal,
            worker_thread = worker.thread_name(),
            authenticated = authenticator.requires_credentials(),
            "self-hosted broker listening"
        );

        Ok(Box::new(ProxyListener {
            local_port,
            accept_task: Mutex::new(Some(accept_task)),
        }))
    }
}

async fn accept_loop(front_door: TcpListener, internal: SocketAddr) {
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            accepted = front_door.accept() => match accepted {
                Ok((inbound, peer)) => {
                    debug!(component = COMPONENT, peer = %peer, "accepted broker client");
                    connections.spawn(proxy(inbound, internal));
                }
                Err(err) => back_off_after_accept_error(&err).await,
            },
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
        }
    }
}

/// Logs a failed accept and pauses before the next one.
async fn back_off_after_accept_error(err: &io::Error) {
    warn!(
        event = events::SELF_HOST_PROXY_FAILED,
        component = COMPONENT,
        err = %err,
        "failed to accept broker client"
    );
    tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
}

async fn proxy(mut inbound: TcpStream, internal: SocketAddr) {
    let res = match TcpStream::connect(internal).await {
        Ok(mut outbound) => copy_bidirectional(&mut inbound, &mut outbound)
            .await
            .map(|_| ()),
        Err(err) => Err(err),
    };

    if let Err(err) = res {
        debug!(
            event = events::SELF_HOST_PROXY_FAILED,
            component = COMPONENT,
            err = %err,
            "proxied broker connection ended with error"
        );
    }
}

struct ProxyListener {
    local_port: u16,
    accept_task: Mutex<Option<JoinHandle<()>>>,
}

#[async_trait]
impl HostedListener for ProxyListener {
    fn local_port(&self) -> u16 {
        self.local_port
    }

    async fn close(&self) -> Result<(), BrokerError> {
        if let Some(task) = self.accept_task.lock().await.take() {
            // aborting drops the listener and the JoinSet, closing every proxied connection
            task.abort();
            info!(
                event = events::SELF_HOST_CLOSED,
                component = COMPONENT,
                port = self.local_port,
                "self-hosted broker closed"
            );
        }
        Ok(())
    }
}
