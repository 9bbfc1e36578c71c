//! Data-plane layer.
//!
//! Owns form binding, outbound value taps and the inbound message router. This layer turns
//! an exposed resource's affordances into topics, publishes their value changes and dispatches
//! inbound topic traffic back onto action invocations and property writes.
//!
//! ```
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use binding_mqtt::{
//!     AffordanceRef, ExposedResource, Form, MqttBrokerServer, MqttBrokerServerConfig,
//!     ObservationHandle, ResourceDescription, ResourceError, ValueListener,
//! };
//! use serde_json::Value;
//!
//! # struct Lamp;
//! #
//! # #[async_trait]
//! # impl ExposedResource for Lamp {
//! #     fn id(&self) -> Option<String> { Some("urn:dev:lamp".to_string()) }
//! #     fn description(&self) -> ResourceDescription {
//! #         ResourceDescription { title: "Lamp".to_string(), ..Default::default() }
//! #     }
//! #     fn add_form(&self, _affordance: &AffordanceRef, _form: Form) -> Result<(), ResourceError> {
//! #         Ok(())
//! #     }
//! #     fn observe_property(
//! #         &self,
//! #         name: &str,
//! #         _listener: Arc<dyn ValueListener>,
//! #     ) -> Result<Box<dyn ObservationHandle>, ResourceError> {
//! #         Err(ResourceError::NotObservable(name.to_string()))
//! #     }
//! #     fn subscribe_event(
//! #         &self,
//! #         name: &str,
//! #         _listener: Arc<dyn ValueListener>,
//! #     ) -> Result<Box<dyn ObservationHandle>, ResourceError> {
//! #         Err(ResourceError::NotFound(AffordanceRef::Event(name.to_string())))
//! #     }
//! #     async fn invoke_action(
//! #         &self,
//! #         _name: &str,
//! #         _input: Option<Value>,
//! #     ) -> Result<Option<Value>, ResourceError> {
//! #         Ok(None)
//! #     }
//! #     async fn write_property(&self, _name: &str, _value: Value) -> Result<(), ResourceError> {
//! #         Ok(())
//! #     }
//! # }
//! #
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let mut server = MqttBrokerServer::new(MqttBrokerServerConfig::default()).unwrap();
//! server.start().await.unwrap();
//!
//! // Without an open broker session exposing is a logged no-op.
//! assert_eq!(server.expose(Arc::new(Lamp)).await, None);
//! assert!(!server.destroy("urn:dev:lamp").await);
//! # });
//! ```

pub(crate) mod form_binder;
pub(crate) mod inbound_router;
pub(crate) mod outbound_bridge;
