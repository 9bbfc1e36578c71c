//! Topic-namespace registry: unique resource names and the resources they address.

use crate::observability::events;
use crate::resource::ExposedResource;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

const COMPONENT: &str = "topic_namespace";

/// Owner of the name -> resource mapping for one binding instance.
///
/// Names are stored decoded; topics carry their percent-encoded form.
pub(crate) struct TopicNamespace {
    entries: Mutex<HashMap<String, Arc<dyn ExposedResource>>>,
}

impl TopicNamespace {
    pub(crate) fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Registers `resource` under `title`, or under the next free derived name on collision.
    pub(crate) async fn assign_name(
        &self,
        title: &str,
        resource: Arc<dyn ExposedResource>,
    ) -> String {
        let mut entries = self.entries.lock().await;

        let mut name = title.to_string();
        while entries.contains_key(&name) {
            name = next_candidate(&name);
        }

        if name == title {
            debug!(
                event = events::NAME_ASSIGNED,
                component = COMPONENT,
                resource = title,
                "assigned resource name"
            );
        } else {
            debug!(
                event = events::NAME_COLLISION_RESOLVED,
                component = COMPONENT,
                resource = title,
                assigned = name.as_str(),
                "resource name taken; assigned derived name"
            );
        }

        entries.insert(name.clone(), resource);
        name
    }

    pub(crate) async fn lookup(&self, name: &str) -> Option<Arc<dyn ExposedResource>> {
        let entries = self.entries.lock().await;
        entries.get(name).cloned()
    }

    /// Removes every entry bound to a resource with identity `resource_id`.
    pub(crate) async fn release(
        &self,
        resource_id: &str,
    ) -> Vec<(String, Arc<dyn ExposedResource>)> {
        let mut entries = self.entries.lock().await;
        let names: Vec<String> = entries
            .iter()
            .filter(|(_, resource)| resource.id().as_deref() == Some(resource_id))
            .map(|(name, _)| name.clone())
            .collect();

        names
            .into_iter()
            .filter_map(|name| entries.remove(&name).map(|resource| (name, resource)))
            .collect()
    }

    pub(crate) async fn clear(&self) -> Vec<String> {
        let mut entries = self.entries.lock().await;
        entries.drain().map(|(name, _)| name).collect()
    }

    pub(crate) async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

/// One collision step: bump a trailing `_<digits>` run, otherwise append `_2`.
///
/// The run is read as a decimal number, so leading zeros are dropped (`Lamp_007` -> `Lamp_8`).
pub(crate) fn next_candidate(name: &str) -> String {
    let digits_len = name
        .bytes()
        .rev()
        .take_while(|b| b.is_ascii_digit())
        .count();
    let (head, digits) = name.split_at(name.len() - digits_len);

    // `.+_[0-9]+` requires at least one character before the separator
    let has_suffix = digits_len > 0 && head.len() > 1 && head.ends_with('_');
    if has_suffix {
        format!("{head}{}", increment_decimal(digits))
    } else {
        format!("{name}_2")
    }
}

fn increment_decimal(digits: &str) -> String {
    let trimmed = digits.trim_start_matches('0');
    let mut out: Vec<u8> = trimmed.bytes().collect();

    let mut carry = true;
    for digit in out.iter_mut().rev() {
        if !carry {
            break;
        }
        if *digit == b'9' {
            *digit = b'0';
        } else {
            *digit += 1;
            carry = false;
        }
    }
    if carry {
        out.insert(0, b'1');
    }

    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::{next_candidate, TopicNamespace};
    use crate::resource::{
        AffordanceRef, ExposedResource, Form, ObservationHandle, ResourceDescription,
        ResourceError, ValueListener,
    };
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::Arc;

    struct NamedResource {
        id: Option<String>,
        title: String,
    }

    impl NamedResource {
        fn new(id: &str, title: &str) -> Arc<dyn ExposedResource> {
            Arc::new(Self {
                id: Some(id.to_string()),
                title: title.to_string(),
            })
        }
    }

    #[async_trait]
    impl ExposedResource for NamedResource {
        fn id(&self) -> Option<String> {
            self.id.clone()
        }

        fn description(&self) -> ResourceDescription {
            ResourceDescription {
                id: self.id.clone(),
                title: self.title.clone(),
                ..Default::default()
            }
        }

        fn add_form(&self, affordance: &AffordanceRef, _form: Form) -> Result<(), ResourceError> {
            Err(ResourceError::NotFound(affordance.clone()))
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
            _input: Option<Value>,
        ) -> Result<Option<Value>, ResourceError> {
            Err(ResourceError::NotFound(AffordanceRef::Action(name.to_string())))
        }

        async fn write_property(&self, name: &str, _value: Value) -> Result<(), ResourceError> {
            Err(ResourceError::NotFound(AffordanceRef::Property(
                name.to_string(),
            )))
        }
    }

    #[test]
    fn next_candidate_appends_suffix_without_trailing_digits() {
        assert_eq!(next_candidate("Lamp"), "Lamp_2");
        assert_eq!(next_candidate("Lamp2"), "Lamp2_2");
        assert_eq!(next_candidate("Lamp_"), "Lamp__2");
        assert_eq!(next_candidate("_5"), "_5_2");
    }

    #[test]
    fn next_candidate_increments_trailing_digit_run() {
        assert_eq!(next_candidate("Lamp_2"), "Lamp_3");
        assert_eq!(next_candidate("Lamp_9"), "Lamp_10");
        assert_eq!(next_candidate("Lamp_007"), "Lamp_8");
        assert_eq!(next_candidate("a_b_99"), "a_b_100");
        assert_eq!(next_candidate("x_0"), "x_1");
        assert_eq!(
            next_candidate("big_99999999999999999999999"),
            "big_100000000000000000000000"
        );
    }

    #[tokio::test]
    async fn unused_title_is_returned_unchanged() {
        let namespace = TopicNamespace::new();

        let name = namespace
            .assign_name("Lamp", NamedResource::new("urn:lamp:1", "Lamp"))
            .await;

        assert_eq!(name, "Lamp");
        assert!(namespace.lookup("Lamp").await.is_some());
    }

    #[tokio::test]
    async fn colliding_titles_never_overwrite_live_entries() {
        let namespace = TopicNamespace::new();

        let first = namespace
            .assign_name("Lamp", NamedResource::new("urn:lamp:1", "Lamp"))
            .await;
        let second = namespace
            .assign_name("Lamp", NamedResource::new("urn:lamp:2", "Lamp"))
            .await;
        let third = namespace
            .assign_name("Lamp", NamedResource::new("urn:lamp:3", "Lamp"))
            .await;

        assert_eq!(
            (first.as_str(), second.as_str(), third.as_str()),
            ("Lamp", "Lamp_2", "Lamp_3")
        );
        assert_eq!(namespace.len().await, 3);
        let second_id = namespace.lookup("Lamp_2").await.and_then(|r| r.id());
        assert_eq!(second_id.as_deref(), Some("urn:lamp:2"));
    }

    #[tokio::test]
    async fn release_removes_every_entry_of_the_resource() {
        let namespace = TopicNamespace::new();
        let lamp = NamedResource::new("urn:lamp:1", "Lamp");
        namespace.assign_name("Lamp", lamp.clone()).await;
        namespace.assign_name("Lamp", lamp).await;
        namespace
            .assign_name("Fan", NamedResource::new("urn:fan:1", "Fan"))
            .await;

        let mut released: Vec<String> = namespace
            .release("urn:lamp:1")
            .await
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        released.sort();

        assert_eq!(released, vec!["Lamp".to_string(), "Lamp_2".to_string()]);
        assert!(namespace.release("urn:lamp:1").await.is_empty());
        assert_eq!(namespace.len().await, 1);
    }

    #[tokio::test]
    async fn release_ignores_resources_without_identity() {
        let namespace = TopicNamespace::new();
        let anonymous: Arc<dyn ExposedResource> = Arc::new(NamedResource {
            id: None,
            title: "Anon".to_string(),
        });
        namespace.assign_name("Anon", anonymous).await;

        assert!(namespace.release("").await.is_empty());
        assert_eq!(namespace.clear().await, vec!["Anon".to_string()]);
        assert_eq!(namespace.len().await, 0);
    }
}
