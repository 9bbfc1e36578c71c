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

//! Inbound router: the single message handler of a broker session.
//!
//! Every failure here is logged and the message dropped; nothing propagates to the session.

use crate::codec::ContentCodec;
use crate::observability::{events, fields};
use crate::resource::{DataSchema, ExposedResource};
use crate::routing::topic::TopicRoute;
use crate::routing::topic_namespace::TopicNamespace;
use crate::transport::broker::{InboundMessage, MessageHandler};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn, Level};

const COMPONENT: &str = "inbound_router";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum DropReason {
    InvalidTopic,
    UnknownResource,
    UnknownAffordance,
    ReadOnly,
    Undecodable,
}

/// Result of routing one message. Dispatches run detached; only tests join the handle.
#[derive(Debug)]
#[cfg_attr(not(test), allow(dead_code))]
pub(crate) enum RouteOutcome {
    Invoked(JoinHandle<()>),
    Written(JoinHandle<()>),
    Dropped(DropReason),
}

pub(crate) struct InboundRouter {
    namespace: Arc<TopicNamespace>,
    codec: Arc<dyn ContentCodec>,
}

impl InboundRouter {
    pub(crate) fn new(namespace: Arc<TopicNamespace>, codec: Arc<dyn ContentCodec>) -> Self {
        Self { namespace, codec }
    }

    pub(crate) async fn route(&self, message: InboundMessage) -> RouteOutcome {
        if tracing::enabled!(Level::DEBUG) {
            debug!(
                event = events::INBOUND_RECEIVE,
                component = COMPONENT,
                topic = message.topic.as_str(),
                content_type = %fields::format_optional(message.content_type.as_deref()),
                payload = %fields::format_payload_preview(&message.payload),
                "received message"
            );
        }

        let Some(route) = TopicRoute::parse(&message.topic) else {
            warn!(
                event = events::INBOUND_DROP_INVALID_TOPIC,
                component = COMPONENT,
                topic = message.topic.as_str(),
                reason = fields::REASON_UNKNOWN_SHAPE,
                "received message for invalid topic"
            );
            return RouteOutcome::Dropped(DropReason::InvalidTopic);
        };

        let Some(resource) = self.namespace.lookup(route.resource()).await else {
            warn!(
                event = events::INBOUND_DROP_UNKNOWN_RESOURCE,
                component = COMPONENT,
                topic = message.topic.as_str(),
                resource = route.resource(),
                "received message for unknown resource"
            );
            return RouteOutcome::Dropped(DropReason::UnknownResource);
        };

        match route {
            TopicRoute::InvokeAction { action, .. } => {
                self.invoke_action(resource, action, message)
            }
            TopicRoute::WriteProperty { property, .. } => {
                self.write_property(resource, property, message)
            }
        }
    }

    fn invoke_action(
        &self,
        resource: Arc<dyn ExposedResource>,
        action: String,
        message: InboundMessage,
    ) -> RouteOutcome {
        let description = resource.description();
        let Some(affordance) = description.actions.get(&action) else {
            warn!(
                event = events::INBOUND_DROP_UNKNOWN_AFFORDANCE,
                component = COMPONENT,
                topic = message.topic.as_str(),
                affordance = action.as_str(),
                "received message for unknown action"
            );
            return RouteOutcome::Dropped(DropReason::UnknownAffordance);
        };

        let input = self.action_input(&message, affordance.input.as_ref());
        let topic = message.topic;
        let handle = tokio::spawn(async move {
            match resource.invoke_action(&action, Some(input)).await {
                Ok(Some(output)) if !output.is_null() => {
                    warn!(
                        event = events::INBOUND_OUTPUT_DISCARDED,
                        component = COMPONENT,
                        topic = topic.as_str(),
                        affordance = action.as_str(),
                        "cannot return action output over MQTT"
                    );
                }
                Ok(_) => {
                    debug!(
                        event = events::INBOUND_INVOKE_OK,
                        component = COMPONENT,
                        topic = topic.as_str(),
                        affordance = action.as_str(),
                        "invoked action"
                    );
                }
                Err(err) => {
                    error!(
                        event = events::INBOUND_INVOKE_FAILED,
                        component = COMPONENT,
                        topic = topic.as_str(),
                        affordance = action.as_str(),
                        err = %err,
                        "error invoking action"
                    );
                }
            }
        });
        RouteOutcome::Invoked(handle)
    }

    /// Decodes action input, falling back to the raw payload text when decoding fails.
    fn action_input(&self, message: &InboundMessage, schema: Option<&DataSchema>) -> Value {
        let decoded = match message.content_type.as_deref() {
            Some(content_type) => self
                .codec
                .content_to_value(content_type, &message.payload, schema)
                .map_err(|e| e.to_string()),
            None => serde_json::from_slice(&message.payload).map_err(|e| e.to_string()),
        };

        decoded.unwrap_or_else(|err| {
            warn!(
                event = events::INBOUND_DECODE_FALLBACK,
                component = COMPONENT,
                topic = message.topic.as_str(),
                content_type = %fields::format_optional(message.content_type.as_deref()),
                err = err.as_str(),
                "payload does not decode; relaying raw (string) payload"
            );
            Value::String(String::from_utf8_lossy(&message.payload).into_owned())
        })
    }

    fn write_property(
        &self,
        resource: Arc<dyn ExposedResource>,
        property: String,
        message: InboundMessage,
    ) -> RouteOutcome {
        let description = resource.description();
        let Some(affordance) = description.properties.get(&property) else {
            warn!(
                event = events::INBOUND_DROP_UNKNOWN_AFFORDANCE,
                component = COMPONENT,
                topic = message.topic.as_str(),
                affordance = property.as_str(),
                "received message for unknown property"
            );
            return RouteOutcome::Dropped(DropReason::UnknownAffordance);
        };

        if affordance.read_only {
            warn!(
                event = events::INBOUND_DROP_READ_ONLY,
                component = COMPONENT,
                topic = message.topic.as_str(),
                affordance = property.as_str(),
                "received message for read-only property"
            );
            return RouteOutcome::Dropped(DropReason::ReadOnly);
        }

        let decoded = match message.content_type.as_deref() {
            Some(content_type) => self
                .codec
                .content_to_value(content_type, &message.payload, Some(&affordance.schema))
                .map_err(|e| e.to_string()),
            None => serde_json::from_slice(&message.payload).map_err(|e| e.to_string()),
        };
        let value = match decoded {
            Ok(value) => value,
            Err(err) => {
                warn!(
                    event = events::INBOUND_DROP_UNDECODABLE,
                    component = COMPONENT,
                    topic = message.topic.as_str(),
                    affordance = property.as_str(),
                    err = err.as_str(),
                    "property write payload does not decode; dropping"
                );
                return RouteOutcome::Dropped(DropReason::Undecodable);
            }
        };

        let topic = message.topic;
        let handle = tokio::spawn(async move {
            match resource.write_property(&property, value).await {
                Ok(()) => {
                    debug!(
                        event = events::INBOUND_WRITE_OK,
                        component = COMPONENT,
                        topic = topic.as_str(),
                        affordance = property.as_str(),
                        "wrote property"
                    );
                }
                Err(err) => {
                    error!(
                        event = events::INBOUND_WRITE_FAILED,
                        component = COMPONENT,
                        topic = topic.as_str(),
                        affordance = property.as_str(),
                        err = %err,
                        "error writing property"
                    );
                }
            }
        });
        RouteOutcome::Written(handle)
    }
}

#[async_trait]
impl MessageHandler for InboundRouter {
    async fn on_message(&self, message: InboundMessage) {
        let _ = self.route(message).await;
    }
}

#[cfg(test)]
mod tests {
    use super::{DropReason, InboundRouter, RouteOutcome};
    use crate::codec::JsonCodec;
    use crate::resource::{
        ActionAffordance, AffordanceRef, DataSchema, ExposedResource, Form, ObservationHandle,
        PropertyAffordance, ResourceDescription, ResourceError, ValueListener,
    };
    use crate::routing::topic_namespace::TopicNamespace;
    use crate::transport::broker::InboundMessage;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct RecordingResource {
        invocations: Mutex<Vec<(String, Option<Value>)>>,
        writes: Mutex<Vec<(String, Value)>>,
        fail: bool,
    }

    #[async_trait]
    impl ExposedResource for RecordingResource {
        fn id(&self) -> Option<String> {
            Some("urn:dev:lamp".to_string())
        }

        fn description(&self) -> ResourceDescription {
            let mut description = ResourceDescription {
                id: self.id(),
                title: "Lamp".to_string(),
                ..Default::default()
            };
            description
                .actions
                .insert("toggle".to_string(), ActionAffordance::default());
            description.actions.insert(
                "dim".to_string(),
                ActionAffordance {
                    input: Some(DataSchema::of_type("integer")),
                    ..Default::default()
                },
            );
            description.properties.insert(
                "on".to_string(),
                PropertyAffordance {
                    schema: DataSchema::of_type("boolean"),
                    ..Default::default()
                },
            );
            description.properties.insert(
                "status".to_string(),
                PropertyAffordance {
                    read_only: true,
                    ..Default::default()
                },
            );
            description
        }

        fn add_form(&self, _affordance: &AffordanceRef, _form: Form) -> Result<(), ResourceError> {
            Ok(())
        }

        fn observe_property(
            &self,
            name: &str,
            _listener: Arc<dyn ValueListener>,
        ) -> Result<Box<dyn ObservationHandle>, ResourceError> {
            Err(ResourceError::NotObservable(name.to_string()))
        }

        fn subscribe_event(
            &self,
            name: &str,
            _listener: Arc<dyn ValueListener>,
        ) -> Result<Box<dyn ObservationHandle>, ResourceError> {
            Err(ResourceError::NotFound(AffordanceRef::Event(name.to_string())))
        }

        async fn invoke_action(
            &self,
            name: &str,
            input: Option<Value>,
        ) -> Result<Option<Value>, ResourceError> {
            self.invocations
                .lock()
                .unwrap()
                .push((name.to_string(), input));
            if self.fail {
                return Err(ResourceError::Failed("boom".to_string()));
            }
            Ok(Some(json!("ignored output")))
        }

        async fn write_property(&self, name: &str, value: Value) -> Result<(), ResourceError> {
            self.writes.lock().unwrap().push((name.to_string(), value));
            if self.fail {
                return Err(ResourceError::Failed("boom".to_string()));
            }
            Ok(())
        }
    }

    async fn router_with(resource: Arc<RecordingResource>) -> InboundRouter {
        let namespace = Arc::new(TopicNamespace::new());
        namespace.assign_name("Lamp", resource).await;
        InboundRouter::new(namespace, Arc::new(JsonCodec))
    }

    fn message(topic: &str, payload: &[u8]) -> InboundMessage {
        InboundMessage {
            topic: topic.to_string(),
            payload: payload.to_vec(),
            content_type: None,
        }
    }

    async fn settle(outcome: RouteOutcome) -> Option<DropReason> {
        match outcome {
            RouteOutcome::Invoked(handle) | RouteOutcome::Written(handle) => {
                handle.await.unwrap();
                None
            }
            RouteOutcome::Dropped(reason) => Some(reason),
        }
    }

    #[tokio::test]
    async fn action_with_json_payload_is_invoked_with_parsed_value() {
        let resource = Arc::new(RecordingResource::default());
        let router = router_with(resource.clone()).await;

        let dropped = settle(router.route(message("Lamp/actions/toggle", b"true")).await).await;

        assert_eq!(dropped, None);
        assert_eq!(
            resource.invocations.lock().unwrap().clone(),
            vec![("toggle".to_string(), Some(json!(true)))]
        );
    }

    #[tokio::test]
    async fn action_with_non_json_payload_gets_raw_text() {
        let resource = Arc::new(RecordingResource::default());
        let router = router_with(resource.clone()).await;

        settle(router.route(message("Lamp/actions/toggle", b"on please")).await).await;
        settle(router.route(message("Lamp/actions/toggle", b"")).await).await;

        assert_eq!(
            resource.invocations.lock().unwrap().clone(),
            vec![
                ("toggle".to_string(), Some(json!("on please"))),
                ("toggle".to_string(), Some(json!(""))),
            ]
        );
    }

    #[tokio::test]
    async fn content_type_selects_codec_decoding() {
        let resource = Arc::new(RecordingResource::default());
        let router = router_with(resource.clone()).await;
        let mut typed = message("Lamp/actions/dim", b"40");
        typed.content_type = Some("text/plain".to_string());

        settle(router.route(typed).await).await;

        // text/plain yields a string, which the integer input schema rejects: raw text is used
        assert_eq!(
            resource.invocations.lock().unwrap().clone(),
            vec![("dim".to_string(), Some(json!("40")))]
        );
    }

    #[tokio::test]
    async fn json_content_type_is_decoded_against_input_schema() {
        let resource = Arc::new(RecordingResource::default());
        let router = router_with(resource.clone()).await;
        let mut typed = message("Lamp/actions/dim", b"40");
        typed.content_type = Some("application/json".to_string());

        settle(router.route(typed).await).await;

        assert_eq!(
            resource.invocations.lock().unwrap().clone(),
            vec![("dim".to_string(), Some(json!(40)))]
        );
    }

    #[tokio::test]
    async fn leading_separator_routes_like_plain_topic() {
        let resource = Arc::new(RecordingResource::default());
        let router = router_with(resource.clone()).await;

        let dropped = settle(router.route(message("/Lamp/actions/toggle", b"1")).await).await;

        assert_eq!(dropped, None);
        assert_eq!(resource.invocations.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn property_write_is_parsed_as_json() {
        let resource = Arc::new(RecordingResource::default());
        let router = router_with(resource.clone()).await;

        let dropped = settle(
            router
                .route(message("Lamp/properties/on/writeproperty", b"false"))
                .await,
        )
        .await;

        assert_eq!(dropped, None);
        assert_eq!(
            resource.writes.lock().unwrap().clone(),
            vec![("on".to_string(), json!(false))]
        );
    }

    #[tokio::test]
    async fn read_only_property_is_never_written() {
        let resource = Arc::new(RecordingResource::default());
        let router = router_with(resource.clone()).await;

        let dropped = settle(
            router
                .route(message("Lamp/properties/status/writeproperty", b"\"x\""))
                .await,
        )
        .await;

        assert_eq!(dropped, Some(DropReason::ReadOnly));
        assert!(resource.writes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn undecodable_write_is_dropped() {
        let resource = Arc::new(RecordingResource::default());
        let router = router_with(resource.clone()).await;

        let dropped = settle(
            router
                .route(message("Lamp/properties/on/writeproperty", b"not json"))
                .await,
        )
        .await;

        assert_eq!(dropped, Some(DropReason::Undecodable));
        assert!(resource.writes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unroutable_messages_are_dropped_without_calls() {
        let resource = Arc::new(RecordingResource::default());
        let router = router_with(resource.clone()).await;

        let cases = [
            ("Fan/actions/toggle", DropReason::UnknownResource),
            ("Lamp/actions/explode", DropReason::UnknownAffordance),
            ("Lamp/properties/missing/writeproperty", DropReason::UnknownAffordance),
            ("Lamp/properties/on", DropReason::InvalidTopic),
            ("Lamp/events/overheat", DropReason::InvalidTopic),
            ("Lamp", DropReason::InvalidTopic),
        ];
        for (topic, expected) in cases {
            let dropped = settle(router.route(message(topic, b"1")).await).await;
            assert_eq!(dropped, Some(expected), "topic {topic}");
        }

        assert!(resource.invocations.lock().unwrap().is_empty());
        assert!(resource.writes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn runtime_failures_are_contained() {
        let resource = Arc::new(RecordingResource {
            fail: true,
            ..Default::default()
        });
        let router = router_with(resource.clone()).await;

        assert_eq!(
            settle(router.route(message("Lamp/actions/toggle", b"1")).await).await,
            None
        );
        assert_eq!(
            settle(
                router
                    .route(message("Lamp/properties/on/writeproperty", b"true"))
                    .await
            )
            .await,
            None
        );
        assert_eq!(resource.invocations.lock().unwrap().len(), 1);
        assert_eq!(resource.writes.lock().unwrap().len(), 1);
    }
}
