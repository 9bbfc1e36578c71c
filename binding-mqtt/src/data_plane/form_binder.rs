//! Form binder: derives the forms and topics of each affordance and wires them up.

use crate::codec::DEFAULT_CONTENT_TYPE;
use crate::control_plane::connection::ConnectionManager;
use crate::data_plane::outbound_bridge::OutboundBridge;
use crate::observability::events;
use crate::resource::{
    AffordanceRef, DataSchema, ExposedResource, Form, Operation, ResourceDescription,
};
use crate::routing::topic;
use crate::transport::broker::BrokerClient;
use std::sync::Arc;
use tracing::{debug, warn};

const COMPONENT: &str = "form_binder";

/// What must happen on the broker side for a planned form to work.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum FormWiring {
    /// Publish property changes on the form's topic.
    ObserveProperty { schema: DataSchema },
    /// Subscribe the session to the form's topic so inbound messages arrive.
    SubscribeInbound,
    /// Publish event data on the form's topic.
    SubscribeEvent { schema: Option<DataSchema> },
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct PlannedForm {
    pub(crate) affordance: AffordanceRef,
    pub(crate) topic: String,
    pub(crate) form: Form,
    pub(crate) wiring: FormWiring,
}

/// Computes every form of `description` as exposed under `name`.
///
/// Properties that are not write-only get a read/observe form and properties that are not
/// read-only get a write form; actions get an invoke form and events a subscribe form.
pub(crate) fn plan_forms(
    broker_uri: &str,
    name: &str,
    description: &ResourceDescription,
) -> Vec<PlannedForm> {
    let mut planned = Vec::new();
    let mut push = |affordance: AffordanceRef, topic: String, ops: &[Operation], wiring| {
        let form = Form::new(topic::href(broker_uri, &topic), DEFAULT_CONTENT_TYPE, ops);
        planned.push(PlannedForm {
            affordance,
            topic,
            form,
            wiring,
        });
    };

    for (property_name, property) in &description.properties {
        if !property.write_only {
            push(
                AffordanceRef::Property(property_name.clone()),
                topic::property_topic(name, property_name),
                &[
                    Operation::ReadProperty,
                    Operation::ObserveProperty,
                    Operation::UnobserveProperty,
                ],
                FormWiring::ObserveProperty {
                    schema: property.schema.clone(),
                },
            );
        }
        if !property.read_only {
            push(
                AffordanceRef::Property(property_name.clone()),
                topic::write_property_topic(name, property_name),
                &[Operation::WriteProperty],
                FormWiring::SubscribeInbound,
            );
        }
    }

    for action_name in description.actions.keys() {
        push(
            AffordanceRef::Action(action_name.clone()),
            topic::action_topic(name, action_name),
            &[Operation::InvokeAction],
            FormWiring::SubscribeInbound,
        );
    }

    for (event_name, event) in &description.events {
        push(
            AffordanceRef::Event(event_name.clone()),
            topic::event_topic(name, event_name),
            &[Operation::SubscribeEvent, Operation::UnsubscribeEvent],
            FormWiring::SubscribeEvent {
                schema: event.data.clone(),
            },
        );
    }

    planned
}

/// Outcome of one binding pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct BindSummary {
    pub(crate) forms: usize,
    pub(crate) taps: usize,
    /// Inbound topics the session is now subscribed to, in binding order.
    pub(crate) subscribed: Vec<String>,
}

/// Attaches planned forms to a resource and performs their wiring.
pub(crate) struct FormBinder<'a> {
    broker_uri: &'a str,
    connection: &'a ConnectionManager,
    outbound: &'a OutboundBridge,
    client: Arc<dyn BrokerClient>,
}

impl<'a> FormBinder<'a> {
    pub(crate) fn new(
        broker_uri: &'a str,
        connection: &'a ConnectionManager,
        outbound: &'a OutboundBridge,
        client: Arc<dyn BrokerClient>,
    ) -> Self {
        Self {
            broker_uri,
            connection,
            outbound,
            client,
        }
    }

    /// Failures for single affordances are logged and skipped; the rest are still bound.
    pub(crate) async fn bind(
        &self,
        name: &str,
        resource: &Arc<dyn ExposedResource>,
    ) -> BindSummary {
        let description = resource.description();
        let mut summary = BindSummary::default();

        for planned in plan_forms(self.broker_uri, name, &description) {
            let href = planned.form.href.clone();
            match resource.add_form(&planned.affordance, planned.form) {
                Ok(()) => {
                    summary.forms += 1;
                    debug!(
                        event = events::FORM_ASSIGNED,
                        component = COMPONENT,
                        resource = name,
                        affordance = %planned.affordance,
                        href = href.as_str(),
                        "assigned form"
                    );
                }
                Err(err) => {
                    warn!(
                        event = events::FORM_ATTACH_FAILED,
                        component = COMPONENT,
                        resource = name,
                        affordance = %planned.affordance,
                        err = %err,
                        "resource rejected form"
                    );
                }
            }

            match planned.wiring {
                FormWiring::ObserveProperty { schema } => {
                    let attached = self
                        .outbound
                        .observe_property(
                            name,
                            resource,
                            planned.affordance.name(),
                            Some(schema),
                            self.client.clone(),
                        )
                        .await;
                    summary.taps += usize::from(attached);
                }
                FormWiring::SubscribeEvent { schema } => {
                    let attached = self
                        .outbound
                        .subscribe_event(
                            name,
                            resource,
                            planned.affordance.name(),
                            schema,
                            self.client.clone(),
                        )
                        .await;
                    summary.taps += usize::from(attached);
                }
                FormWiring::SubscribeInbound => {
                    match self.connection.subscribe(&planned.topic).await {
                        Ok(()) => summary.subscribed.push(planned.topic),
                        Err(err) => {
                            warn!(
                                event = events::TOPIC_SUBSCRIBE_FAILED,
                                component = COMPONENT,
                                resource = name,
                                topic = planned.topic.as_str(),
                                err = %err,
                                "failed to subscribe inbound topic"
                            );
                        }
                    }
                }
            }
        }

        summary
    }
}
