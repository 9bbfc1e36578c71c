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

//! Outbound bridge: publishes affordance value changes and retained resource snapshots.

use crate::codec::{ContentCodec, DEFAULT_CONTENT_TYPE};
use crate::observability::events;
use crate::resource::{
    AffordanceRef, DataSchema, ExposedResource, ObservationHandle, ResourceError, ValueListener,
};
use crate::routing::topic;
use crate::transport::broker::BrokerClient;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const COMPONENT: &str = "outbound_bridge";

/// Listener for one observed property or subscribed event of one exposed resource.
///
/// The first encode failure cancels the tap for good; later changes are ignored.
pub(crate) struct AffordanceTap {
    resource: String,
    affordance: AffordanceRef,
    topic: String,
    schema: Option<DataSchema>,
    codec: Arc<dyn ContentCodec>,
    client: Arc<dyn BrokerClient>,
    handle: Mutex<Option<Box<dyn ObservationHandle>>>,
    cancelled: AtomicBool,
}

impl AffordanceTap {
    fn new(
        resource: &str,
        affordance: AffordanceRef,
        topic: String,
        schema: Option<DataSchema>,
        codec: Arc<dyn ContentCodec>,
        client: Arc<dyn BrokerClient>,
    ) -> Self {
        Self {
            resource: resource.to_string(),
            affordance,
            topic,
            schema,
            codec,
            client,
            handle: Mutex::new(None),
            cancelled: AtomicBool::new(false),
        }
    }

    pub(crate) fn topic(&self) -> &str {
        &self.topic
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Stores the runtime's observation handle; cancels it at once if the tap already failed.
    async fn install(&self, handle: Box<dyn ObservationHandle>) {
        let mut slot = self.handle.lock().await;
        if self.is_cancelled() {
            handle.cancel();
        } else {
            *slot = Some(handle);
        }
    }

    pub(crate) async fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        if let Some(handle) = self.handle.lock().await.take() {
            handle.cancel();
            debug!(
                event = events::OUTBOUND_TAP_CANCELLED,
                component = COMPONENT,
                resource = self.resource.as_str(),
                affordance = %self.affordance,
                "cancelled affordance observation"
            );
        }
    }

    async fn encode(&self, value: &Value) -> Result<Vec<u8>, crate::codec::CodecError> {
        let content =
            self.codec
                .value_to_content(value, self.schema.as_ref(), DEFAULT_CONTENT_TYPE)?;
        content.read_fully().await
    }
}

#[async_trait]
impl ValueListener for AffordanceTap {
    async fn on_change(&self, value: Value) {
        if self.is_cancelled() {
            return;
        }

        let payload = match self.encode(&value).await {
            Ok(payload) => payload,
            Err(err) => {
                warn!(
                    event = events::OUTBOUND_ENCODE_FAILED,
                    component = COMPONENT,
                    resource = self.resource.as_str(),
                    affordance = %self.affordance,
                    err = %err,
                    "cannot process data for affordance; cancelling observation"
                );
                self.cancel().await;
                return;
            }
        };

        debug!(
            event = events::OUTBOUND_PUBLISH_ATTEMPT,
            component = COMPONENT,
            resource = self.resource.as_str(),
            affordance = %self.affordance,
            topic = self.topic.as_str(),
            payload_len = payload.len(),
            "publishing affordance value"
        );

        if let Err(err) = self.client.publish(&self.topic, payload, false).await {
            warn!(
                event = events::OUTBOUND_PUBLISH_FAILED,
                component = COMPONENT,
                topic = self.topic.as_str(),
                err = %err,
                "failed to publish affordance value"
            );
        }
    }
}

/// Owner of every live tap, keyed by assigned resource name.
pub(crate) struct OutboundBridge {
    codec: Arc<dyn ContentCodec>,
    taps: Mutex<HashMap<String, Vec<Arc<AffordanceTap>>>>,
}

impl OutboundBridge {
    pub(crate) fn new(codec: Arc<dyn ContentCodec>) -> Self {
        Self {
            codec,
            taps: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) async fn observe_property(
        &self,
        name: &str,
        resource: &Arc<dyn ExposedResource>,
        property: &str,
        schema: Option<DataSchema>,
        client: Arc<dyn BrokerClient>,
    ) -> bool {
        let tap = Arc::new(AffordanceTap::new(
            name,
            AffordanceRef::Property(property.to_string()),
            topic::property_topic(name, property),
            schema,
            self.codec.clone(),
            client,
        ));
        let registration = resource.observe_property(property, tap.clone());
        self.attach(name, tap, registration).await
    }

    pub(crate) async fn subscribe_event(
        &self,
        name: &str,
        resource: &Arc<dyn ExposedResource>,
        event: &str,
        schema: Option<DataSchema>,
        client: Arc<dyn BrokerClient>,
    ) -> bool {
        let tap = Arc::new(AffordanceTap::new(
            name,
            AffordanceRef::Event(event.to_string()),
            topic::event_topic(name, event),
            schema,
            self.codec.clone(),
            client,
        ));
        let registration = resource.subscribe_event(event, tap.clone());
        self.attach(name, tap, registration).await
    }

    async fn attach(
        &self,
        name: &str,
        tap: Arc<AffordanceTap>,
        registration: Result<Box<dyn ObservationHandle>, ResourceError>,
    ) -> bool {
        match registration {
            Ok(handle) => {
                tap.install(handle).await;
                debug!(
                    event = events::OUTBOUND_TAP_ATTACHED,
                    component = COMPONENT,
                    resource = name,
                    affordance = %tap.affordance,
                    topic = tap.topic(),
                    "attached outbound tap"
                );
                self.taps
                    .lock()
                    .await
                    .entry(name.to_string())
                    .or_default()
                    .push(tap);
                true
            }
            Err(err) => {
                warn!(
                    event = events::OUTBOUND_TAP_ATTACH_FAILED,
                    component = COMPONENT,
                    resource = name,
                    affordance = %tap.affordance,
                    err = %err,
                    "resource runtime refused observation"
                );
                false
            }
        }
    }

    /// Cancels every tap of the named resource; returns how many were live.
    pub(crate) async fn detach(&self, name: &str) -> usize {
        let removed = self.taps.lock().await.remove(name).unwrap_or_default();
        Self::cancel_all(removed).await
    }

    pub(crate) async fn detach_all(&self) -> usize {
        let removed: Vec<Arc<AffordanceTap>> = self
            .taps
            .lock()
            .await
            .drain()
            .flat_map(|(_, taps)| taps)
            .collect();
        Self::cancel_all(removed).await
    }

    async fn cancel_all(taps: Vec<Arc<AffordanceTap>>) -> usize {
        let mut live = 0;
        for tap in taps {
            if !tap.is_cancelled() {
                live += 1;
            }
            tap.cancel().await;
        }
        live
    }

    #[cfg(test)]
    pub(crate) async fn tap_count(&self, name: &str) -> usize {
        self.taps.lock().await.get(name).map_or(0, Vec::len)
    }

    /// Publishes the full resource description, retained, on the bare resource topic.
    pub(crate) async fn publish_snapshot(
        &self,
        name: &str,
        resource: &Arc<dyn ExposedResource>,
        client: &Arc<dyn BrokerClient>,
    ) -> bool {
        let snapshot_topic = topic::resource_topic(name);
        let res = match serde_json::to_vec(&resource.description()) {
            Ok(payload) => client
                .publish(&snapshot_topic, payload, true)
                .await
                .map_err(|e| e.to_string()),
            Err(err) => Err(err.to_string()),
        };

        match res {
            Ok(()) => {
                info!(
                    event = events::OUTBOUND_SNAPSHOT_PUBLISHED,
                    component = COMPONENT,
                    resource = name,
                    topic = snapshot_topic.as_str(),
                    "published retained resource snapshot"
                );
                true
            }
            Err(err) => {
                warn!(
                    event = events::OUTBOUND_SNAPSHOT_FAILED,
                    component = COMPONENT,
                    resource = name,
                    topic = snapshot_topic.as_str(),
                    err = err.as_str(),
                    "failed to publish resource snapshot"
                );
                false
            }
        }
    }
}
