//! Routing layer.
//!
//! Owns the topic namespace (unique resource names) and the topic wire format: how
//! resource and affordance names are encoded into topics, and how inbound topics are
//! parsed back into action or property-write routes.
//!
//! ```
//! use binding_mqtt::{MqttBrokerServer, MqttBrokerServerConfig};
//!
//! // Without a broker URI the binding is inert and the namespace stays empty.
//! let server = MqttBrokerServer::new(MqttBrokerServerConfig::default()).unwrap();
//! assert_eq!(server.port(), None);
//! ```

pub(crate) mod topic;
pub(crate) mod topic_namespace;
