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

//! Contract with the resource runtime that owns exposed resources.
//!
//! The binding never stores affordance values. It reads the [`ResourceDescription`] of an
//! [`ExposedResource`], attaches [`Form`]s to its affordances, registers [`ValueListener`]s
//! for observable properties and events, and calls back into the resource for action
//! invocations and property writes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Schema of an interaction value, opaque to the binding apart from its `type`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DataSchema {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DataSchema {
    pub fn of_type(data_type: &str) -> Self {
        Self {
            data_type: Some(data_type.to_string()),
            extra: Map::new(),
        }
    }
}

/// Operation tags recorded on a [`Form`].
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    ReadProperty,
    WriteProperty,
    ObserveProperty,
    UnobserveProperty,
    InvokeAction,
    SubscribeEvent,
    UnsubscribeEvent,
}

/// Binding descriptor: where an affordance is reachable and which operations it supports.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Form {
    pub href: String,
    #[serde(rename = "contentType")]
    pub content_type: String,
    pub op: Vec<Operation>,
}

impl Form {
    pub fn new(href: impl Into<String>, content_type: &str, op: &[Operation]) -> Self {
        Self {
            href: href.into(),
            content_type: content_type.to_string(),
            op: op.to_vec(),
        }
    }

    pub fn supports(&self, operation: Operation) -> bool {
        self.op.contains(&operation)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyAffordance {
    #[serde(default)]
    pub read_only: bool,
    #[serde(default)]
    pub write_only: bool,
    #[serde(default)]
    pub observable: bool,
    #[serde(flatten)]
    pub schema: DataSchema,
    #[serde(default)]
    pub forms: Vec<Form>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionAffordance {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<DataSchema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<DataSchema>,
    #[serde(default)]
    pub forms: Vec<Form>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EventAffordance {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<DataSchema>,
    #[serde(default)]
    pub forms: Vec<Form>,
}

/// Description of an exposed resource; also the body of the retained snapshot message.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceDescription {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyAffordance>,
    #[serde(default)]
    pub actions: BTreeMap<String, ActionAffordance>,
    #[serde(default)]
    pub events: BTreeMap<String, EventAffordance>,
}

impl ResourceDescription {
    /// Appends a form to the named affordance; returns `false` when it does not exist.
    pub fn push_form(&mut self, affordance: &AffordanceRef, form: Form) -> bool {
        let forms = match affordance {
            AffordanceRef::Property(name) => self.properties.get_mut(name).map(|p| &mut p.forms),
            AffordanceRef::Action(name) => self.actions.get_mut(name).map(|a| &mut a.forms),
            AffordanceRef::Event(name) => self.events.get_mut(name).map(|e| &mut e.forms),
        };
        match forms {
            Some(forms) => {
                forms.push(form);
                true
            }
            None => false,
        }
    }
}

/// Names one affordance of a resource.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum AffordanceRef {
    Property(String),
    Action(String),
    Event(String),
}

impl AffordanceRef {
    pub fn name(&self) -> &str {
        match self {
            AffordanceRef::Property(name)
            | AffordanceRef::Action(name)
            | AffordanceRef::Event(name) => name,
        }
    }
}

impl Display for AffordanceRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AffordanceRef::Property(name) => write!(f, "property '{name}'"),
            AffordanceRef::Action(name) => write!(f, "action '{name}'"),
            AffordanceRef::Event(name) => write!(f, "event '{name}'"),
        }
    }
}

/// Failures reported by the resource runtime.
#[derive(Clone, Debug, PartialEq)]
pub enum ResourceError {
    NotFound(AffordanceRef),
    NotObservable(String),
    InvalidInput(String),
    Failed(String),
}

impl Display for ResourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceError::NotFound(affordance) => write!(f, "{affordance} not found"),
            ResourceError::NotObservable(name) => write!(f, "property '{name}' is not observable"),
            ResourceError::InvalidInput(reason) => write!(f, "invalid input: {reason}"),
            ResourceError::Failed(reason) => write!(f, "{reason}"),
        }
    }
}

impl Error for ResourceError {}

/// Receives value changes of one observed property or subscribed event.
#[async_trait]
pub trait ValueListener: Send + Sync {
    async fn on_change(&self, value: Value);
}

/// Handle returned by the resource runtime for an observation or event subscription.
///
/// Cancelling must be idempotent.
pub trait ObservationHandle: Send + Sync {
    fn cancel(&self);
}

/// A resource exposed by the resource runtime.
#[async_trait]
pub trait ExposedResource: Send + Sync {
    /// Identity used by `destroy`.
    fn id(&self) -> Option<String>;

    /// Current description, including all forms attached so far.
    fn description(&self) -> ResourceDescription;

    fn add_form(&self, affordance: &AffordanceRef, form: Form) -> Result<(), ResourceError>;

    fn observe_property(
        &self,
        name: &str,
        listener: Arc<dyn ValueListener>,
    ) -> Result<Box<dyn ObservationHandle>, ResourceError>;

    fn subscribe_event(
        &self,
        name: &str,
        listener: Arc<dyn ValueListener>,
    ) -> Result<Box<dyn ObservationHandle>, ResourceError>;

    async fn invoke_action(
        &self,
        name: &str,
        input: Option<Value>,
    ) -> Result<Option<Value>, ResourceError>;

    async fn write_property(&self, name: &str, value: Value) -> Result<(), ResourceError>;
}

#[cfg(test)]
mod tests {
    use super::{AffordanceRef, Form, Operation, PropertyAffordance, ResourceDescription};
    use serde_json::json;

    #[test]
    fn operations_serialize_as_lowercase_tags() {
        let form = Form::new(
            "mqtt://broker/Lamp/properties/on",
            "application/json",
            &[Operation::ReadProperty, Operation::ObserveProperty],
        );

        assert_eq!(
            serde_json::to_value(&form).unwrap(),
            json!({
                "href": "mqtt://broker/Lamp/properties/on",
                "contentType": "application/json",
                "op": ["readproperty", "observeproperty"],
            })
        );
    }

    #[test]
    fn push_form_reports_missing_affordance() {
        let mut description = ResourceDescription {
            title: "Lamp".to_string(),
            ..Default::default()
        };
        description
            .properties
            .insert("on".to_string(), PropertyAffordance::default());
        let form = Form::new("href", "application/json", &[Operation::WriteProperty]);

        assert!(description.push_form(&AffordanceRef::Property("on".to_string()), form.clone()));
        assert!(!description.push_form(&AffordanceRef::Action("toggle".to_string()), form));
        assert_eq!(description.properties["on"].forms.len(), 1);
    }

    #[test]
    fn property_flags_use_camel_case() {
        let property: PropertyAffordance =
            serde_json::from_value(json!({"readOnly": true, "type": "boolean"})).unwrap();

        assert!(property.read_only);
        assert!(!property.write_only);
        assert_eq!(property.schema.data_type.as_deref(), Some("boolean"));
    }
}
