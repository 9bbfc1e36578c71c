//! Topic construction and inbound topic parsing.
//!
//! Wire format, with every segment percent-encoded on its own:
//!
//! | topic | direction |
//! |---|---|
//! | `<name>` | retained resource snapshot |
//! | `<name>/properties/<property>` | outbound value changes |
//! | `<name>/properties/<property>/writeproperty` | inbound writes |
//! | `<name>/actions/<action>` | inbound invocations |
//! | `<name>/events/<event>` | outbound event data |

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::borrow::Cow;

pub(crate) const PROPERTIES_SEGMENT: &str = "properties";
pub(crate) const ACTIONS_SEGMENT: &str = "actions";
pub(crate) const EVENTS_SEGMENT: &str = "events";
pub(crate) const WRITE_PROPERTY_SEGMENT: &str = "writeproperty";

/// Characters left verbatim by URI component encoding.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

pub(crate) fn encode_segment(segment: &str) -> Cow<'_, str> {
    utf8_percent_encode(segment, COMPONENT).into()
}

/// Decodes one topic segment; segments that are not valid UTF-8 once decoded are kept as-is.
pub(crate) fn decode_segment(segment: &str) -> Cow<'_, str> {
    percent_decode_str(segment)
        .decode_utf8()
        .unwrap_or(Cow::Borrowed(segment))
}

pub(crate) fn resource_topic(name: &str) -> String {
    encode_segment(name).into_owned()
}

pub(crate) fn property_topic(name: &str, property: &str) -> String {
    format!(
        "{}/{PROPERTIES_SEGMENT}/{}",
        encode_segment(name),
        encode_segment(property)
    )
}

pub(crate) fn write_property_topic(name: &str, property: &str) -> String {
    format!(
        "{}/{WRITE_PROPERTY_SEGMENT}",
        property_topic(name, property)
    )
}

pub(crate) fn action_topic(name: &str, action: &str) -> String {
    format!(
        "{}/{ACTIONS_SEGMENT}/{}",
        encode_segment(name),
        encode_segment(action)
    )
}

pub(crate) fn event_topic(name: &str, event: &str) -> String {
    format!(
        "{}/{EVENTS_SEGMENT}/{}",
        encode_segment(name),
        encode_segment(event)
    )
}

/// Joins the broker URI and a topic into a form href.
pub(crate) fn href(broker_uri: &str, topic: &str) -> String {
    format!("{}/{topic}", broker_uri.trim_end_matches('/'))
}

/// Semantic meaning of an inbound topic, with decoded names.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum TopicRoute {
    InvokeAction { resource: String, action: String },
    WriteProperty { resource: String, property: String },
}

impl TopicRoute {
    /// Parses an inbound topic. A single leading `/` is ignored.
    pub(crate) fn parse(topic: &str) -> Option<Self> {
        let topic = topic.strip_prefix('/').unwrap_or(topic);
        let segments: Vec<&str> = topic.split('/').collect();

        match segments.as_slice() {
            [name, ACTIONS_SEGMENT, action] if !name.is_empty() && !action.is_empty() => {
                Some(TopicRoute::InvokeAction {
                    resource: decode_segment(name).into_owned(),
                    action: decode_segment(action).into_owned(),
                })
            }
            [name, PROPERTIES_SEGMENT, property, WRITE_PROPERTY_SEGMENT]
                if !name.is_empty() && !property.is_empty() =>
            {
                Some(TopicRoute::WriteProperty {
                    resource: decode_segment(name).into_owned(),
                    property: decode_segment(property).into_owned(),
                })
            }
            _ => None,
        }
    }

    pub(crate) fn resource(&self) -> &str {
        match self {
            TopicRoute::InvokeAction { resource, .. }
            | TopicRoute::WriteProperty { resource, .. } => resource,
        }
    }
}
