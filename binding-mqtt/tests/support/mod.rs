#![allow(dead_code)]

use async_trait::async_trait;
use binding_mqtt::transport::broker::{
    BrokerClient, BrokerConnector, BrokerError, ConnectOptions, InboundMessage, MessageHandler,
};
use binding_mqtt::{
    ActionAffordance, AffordanceRef, DataSchema, EventAffordance, ExposedResource, Form,
    MqttBrokerServer, MqttBrokerServerConfig, ObservationHandle, PropertyAffordance,
    ResourceDescription, ResourceError, ValueListener,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

pub(crate) const BROKER_URI: &str = "mqtt://broker.test:1883";

pub(crate) fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Polls `condition` until it holds or `timeout` elapses.
pub(crate) async fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Published {
    pub(crate) topic: String,
    pub(crate) payload: Vec<u8>,
    pub(crate) retain: bool,
}

#[derive(Default)]
pub(crate) struct RecordingClient {
    pub(crate) published: Mutex<Vec<Published>>,
    pub(crate) subscribed: Mutex<Vec<String>>,
    pub(crate) unsubscribed: Mutex<Vec<String>>,
    pub(crate) disconnected: AtomicBool,
}

impl RecordingClient {
    pub(crate) fn published_on(&self, topic: &str) -> Vec<Published> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.topic == topic)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl BrokerClient for RecordingClient {
    async fn publish(&self, topic: &str, payload: Vec<u8>, retain: bool) -> Result<(), BrokerError> {
        self.published.lock().unwrap().push(Published {
            topic: topic.to_string(),
            payload,
            retain,
        });
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<(), BrokerError> {
        self.subscribed.lock().unwrap().push(topic.to_string());
        Ok(())
    }

    async fn unsubscribe(&self, topic: &str) -> Result<(), BrokerError> {
        self.unsubscribed.lock().unwrap().push(topic.to_string());
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), BrokerError> {
        self.disconnected.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Connector handing out one [`RecordingClient`] and keeping the session's message handler,
/// so tests can deliver messages as if the broker did.
#[derive(Default)]
pub(crate) struct RecordingConnector {
    pub(crate) client: Arc<RecordingClient>,
    handler: Mutex<Option<Arc<dyn MessageHandler>>>,
}

impl RecordingConnector {
    pub(crate) async fn deliver(&self, topic: &str, payload: &[u8]) {
        self.deliver_typed(topic, payload, None).await;
    }

    pub(crate) async fn deliver_typed(&self, topic: &str, payload: &[u8], content_type: Option<&str>) {
        let handler = self
            .handler
            .lock()
            .unwrap()
            .clone()
            .expect("no session was opened");
        handler
            .on_message(InboundMessage {
                topic: topic.to_string(),
                payload: payload.to_vec(),
                content_type: content_type.map(str::to_string),
            })
            .await;
    }
}

#[async_trait]
impl BrokerConnector for RecordingConnector {
    async fn connect(
        &self,
        _options: &ConnectOptions,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<Arc<dyn BrokerClient>, BrokerError> {
        *self.handler.lock().unwrap() = Some(handler);
        Ok(self.client.clone())
    }
}

/// Starts a dial-out server against a [`RecordingConnector`].
pub(crate) async fn started_server() -> (MqttBrokerServer, Arc<RecordingConnector>) {
    init_logging();
    let connector = Arc::new(RecordingConnector::default());
    let mut server = MqttBrokerServer::builder(MqttBrokerServerConfig::with_uri(BROKER_URI))
        .connector(connector.clone())
        .build()
        .expect("valid configuration");
    server.start().await.expect("recording connector never fails");
    (server, connector)
}

struct FlagHandle {
    cancelled: Arc<AtomicBool>,
    delay: Option<Duration>,
}

impl ObservationHandle for FlagHandle {
    fn cancel(&self) {
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

struct Observer {
    listener: Arc<dyn ValueListener>,
    cancelled: Arc<AtomicBool>,
}

/// Resource runtime stand-in keeping its description, observers and received calls in memory.
pub(crate) struct InMemoryResource {
    id: String,
    description: Mutex<ResourceDescription>,
    observers: Mutex<HashMap<String, Vec<Observer>>>,
    cancel_delay: Option<Duration>,
    pub(crate) invocations: Mutex<Vec<(String, Option<Value>)>>,
    pub(crate) writes: Mutex<Vec<(String, Value)>>,
}

impl InMemoryResource {
    pub(crate) fn new(id: &str, title: &str) -> Self {
        Self {
            id: id.to_string(),
            description: Mutex::new(ResourceDescription {
                id: Some(id.to_string()),
                title: title.to_string(),
                ..Default::default()
            }),
            observers: Mutex::new(HashMap::new()),
            cancel_delay: None,
            invocations: Mutex::new(Vec::new()),
            writes: Mutex::new(Vec::new()),
        }
    }

    /// A lamp with a writable `on`, a read-only `status`, a `toggle` action and an
    /// `overheat` event.
    pub(crate) fn lamp(id: &str) -> Self {
        Self::new(id, "Lamp")
            .with_property(
                "on",
                PropertyAffordance {
                    observable: true,
                    schema: DataSchema::of_type("boolean"),
                    ..Default::default()
                },
            )
            .with_property(
                "status",
                PropertyAffordance {
                    read_only: true,
                    schema: DataSchema::of_type("string"),
                    ..Default::default()
                },
            )
            .with_action("toggle", ActionAffordance::default())
            .with_event(
                "overheat",
                EventAffordance {
                    data: Some(DataSchema::of_type("number")),
                    ..Default::default()
                },
            )
    }

    pub(crate) fn with_property(self, name: &str, property: PropertyAffordance) -> Self {
        self.description
            .lock()
            .unwrap()
            .properties
            .insert(name.to_string(), property);
        self
    }

    pub(crate) fn with_action(self, name: &str, action: ActionAffordance) -> Self {
        self.description
            .lock()
            .unwrap()
            .actions
            .insert(name.to_string(), action);
        self
    }

    pub(crate) fn with_event(self, name: &str, event: EventAffordance) -> Self {
        self.description
            .lock()
            .unwrap()
            .events
            .insert(name.to_string(), event);
        self
    }

    /// Makes every observation handle block for `delay` when cancelled.
    pub(crate) fn with_cancel_delay(mut self, delay: Duration) -> Self {
        self.cancel_delay = Some(delay);
        self
    }

    /// Adds an action after the resource was exposed, as a runtime reconfiguring it would.
    pub(crate) fn add_action(&self, name: &str, action: ActionAffordance) {
        self.description
            .lock()
            .unwrap()
            .actions
            .insert(name.to_string(), action);
    }

    pub(crate) fn remove_action(&self, name: &str) {
        self.description.lock().unwrap().actions.remove(name);
    }

    /// Reports a value change of a property or event to every live observer.
    pub(crate) async fn emit(&self, name: &str, value: Value) {
        let listeners: Vec<Arc<dyn ValueListener>> = self
            .observers
            .lock()
            .unwrap()
            .get(name)
            .map(|observers| {
                observers
                    .iter()
                    .filter(|o| !o.cancelled.load(Ordering::SeqCst))
                    .map(|o| o.listener.clone())
                    .collect()
            })
            .unwrap_or_default();
        for listener in listeners {
            listener.on_change(value.clone()).await;
        }
    }

    pub(crate) fn live_observers(&self) -> usize {
        self.observers
            .lock()
            .unwrap()
            .values()
            .flatten()
            .filter(|o| !o.cancelled.load(Ordering::SeqCst))
            .count()
    }

    pub(crate) fn hrefs(&self, affordance: &str) -> Vec<String> {
        let description = self.description.lock().unwrap();
        let forms: &[Form] = if let Some(p) = description.properties.get(affordance) {
            &p.forms
        } else if let Some(a) = description.actions.get(affordance) {
            &a.forms
        } else if let Some(e) = description.events.get(affordance) {
            &e.forms
        } else {
            &[]
        };
        forms.iter().map(|f| f.href.clone()).collect()
    }

    fn observe(
        &self,
        name: &str,
        listener: Arc<dyn ValueListener>,
    ) -> Result<Box<dyn ObservationHandle>, ResourceError> {
        let cancelled = Arc::new(AtomicBool::new(false));
        self.observers
            .lock()
            .unwrap()
            .entry(name.to_string())
            .or_default()
            .push(Observer {
                listener,
                cancelled: cancelled.clone(),
            });
        Ok(Box::new(FlagHandle {
            cancelled,
            delay: self.cancel_delay,
        }))
    }
}

#[async_trait]
impl ExposedResource for InMemoryResource {
    fn id(&self) -> Option<String> {
        Some(self.id.clone())
    }

    fn description(&self) -> ResourceDescription {
        self.description.lock().unwrap().clone()
    }

    fn add_form(&self, affordance: &AffordanceRef, form: Form) -> Result<(), ResourceError> {
        if self.description.lock().unwrap().push_form(affordance, form) {
            Ok(())
        } else {
            Err(ResourceError::NotFound(affordance.clone()))
        }
    }

    fn observe_property(
        &self,
        name: &str,
        listener: Arc<dyn ValueListener>,
    ) -> Result<Box<dyn ObservationHandle>, ResourceError> {
        if !self.description.lock().unwrap().properties.contains_key(name) {
            return Err(ResourceError::NotFound(AffordanceRef::Property(
                name.to_string(),
            )));
        }
        self.observe(name, listener)
    }

    fn subscribe_event(
        &self,
        name: &str,
        listener: Arc<dyn ValueListener>,
    ) -> Result<Box<dyn ObservationHandle>, ResourceError> {
        if !self.description.lock().unwrap().events.contains_key(name) {
            return Err(ResourceError::NotFound(AffordanceRef::Event(name.to_string())));
        }
        self.observe(name, listener)
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
        Ok(None)
    }

    async fn write_property(&self, name: &str, value: Value) -> Result<(), ResourceError> {
        self.writes.lock().unwrap().push((name.to_string(), value));
        Ok(())
    }
}
