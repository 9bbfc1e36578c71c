//! Control-plane layer.
//!
//! Owns broker URI resolution, the connection state machine and self-hosted broker
//! authentication. Publishing and subscribing are only legal once this layer reports a
//! connected session.
//!
//! ```
//! use binding_mqtt::{ConnectionState, MqttBrokerServer, MqttBrokerServerConfig};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let mut server = MqttBrokerServer::new(MqttBrokerServerConfig::default()).unwrap();
//!
//! // No broker URI: starting and stopping are inert successes.
//! server.start().await.unwrap();
//! assert_eq!(server.connection_state(), ConnectionState::Unconfigured);
//! server.stop().await.unwrap();
//! # });
//! ```

pub mod broker_uri;
pub(crate) mod connection;
pub mod self_host_auth;
