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

//! # binding-mqtt
//!
//! `binding-mqtt` is the MQTT protocol binding of a device-abstraction runtime. It maps the
//! affordances of exposed resources (properties, actions, events) onto broker topics and maps
//! inbound topic traffic back onto action invocations and property writes.
//!
//! Typical usage is API-first and centered on [`MqttBrokerServer`]: build it from a
//! [`MqttBrokerServerConfig`], `start` it, then `expose` and `destroy` resources provided by the
//! resource runtime through the [`ExposedResource`] trait.
//!
//! ## Topic layout
//!
//! | Topic | Direction | Purpose |
//! |---|---|---|
//! | `<name>` | outbound, retained | full resource description |
//! | `<name>/properties/<p>` | outbound | property value changes |
//! | `<name>/properties/<p>/writeproperty` | inbound | property writes |
//! | `<name>/actions/<a>` | inbound | action invocations |
//! | `<name>/events/<e>` | outbound | event data |
//!
//! Every segment is percent-encoded on its own. `<name>` is the resource title, made unique
//! among exposed resources (`Lamp`, `Lamp_2`, `Lamp_3`, ...).
//!
//! ## Dial-out and self-hosted modes
//!
//! ```no_run
//! use binding_mqtt::{Credential, MqttBrokerServer, MqttBrokerServerConfig};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! // Connect out to an existing broker.
//! let mut config = MqttBrokerServerConfig::with_uri("mqtt://broker.example.org:1883");
//! config.username = Some("binding".to_string());
//! config.password = Some("secret".to_string());
//! let mut server = MqttBrokerServer::new(config).unwrap();
//! server.start().await.unwrap();
//! server.stop().await.unwrap();
//!
//! // Host a broker on port 1884 that only admits one user.
//! let mut config = MqttBrokerServerConfig::with_uri("mqtt://0.0.0.0:1884");
//! config.self_host = true;
//! config.self_host_authentication = Some(vec![Credential::new("device", "pass")]);
//! let mut hosted = MqttBrokerServer::new(config).unwrap();
//! hosted.start().await.unwrap();
//! assert_eq!(hosted.port(), Some(1884));
//! hosted.stop().await.unwrap();
//! # });
//! ```
//!
//! ## Internal architecture map
//!
//! - API facade: [`MqttBrokerServer`] and its builder
//! - Control plane: broker URI resolution, connection state machine, self-host authentication
//! - Routing: topic encoding, inbound route parsing and the topic namespace registry
//! - Data plane: form binding, outbound value taps and the inbound message router
//! - Transport: broker client/host seams with `rumqttc` and `rumqttd` adapters
//! - Runtime: named OS threads for the embedded broker
//!
//! ## Observability model
//!
//! The crate uses `tracing` for logs/events. Library code emits events and does not
//! initialize a global subscriber. Binaries and tests are responsible for one-time
//! `tracing_subscriber` initialization at process boundaries.

mod broker_server;
pub use broker_server::{MqttBrokerServer, MqttBrokerServerBuilder};

mod codec;
pub use codec::{
    CodecError, Content, ContentCodec, JsonCodec, DEFAULT_CONTENT_TYPE, TEXT_CONTENT_TYPE,
};

mod config;
pub use config::{ConfigError, Credential, MqttBrokerServerConfig, DEFAULT_KEEP_ALIVE_SECS};

mod control_plane;
pub use control_plane::broker_uri::{BrokerUri, BrokerUriError};
pub use control_plane::connection::ConnectionState;
pub use control_plane::self_host_auth::SelfHostAuthenticator;

mod data_plane;

mod error;
pub use error::BindingError;

#[doc(hidden)]
pub mod observability;

mod resource;
pub use resource::{
    ActionAffordance, AffordanceRef, DataSchema, EventAffordance, ExposedResource, Form,
    ObservationHandle, Operation, PropertyAffordance, ResourceDescription, ResourceError,
    ValueListener,
};

mod routing;
mod runtime;

pub mod transport;
