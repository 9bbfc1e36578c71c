//! Canonical structured event names used across `binding-mqtt`.

// Namespace and exposure events.
pub const NAME_ASSIGNED: &str = "name_assigned";
pub const NAME_COLLISION_RESOLVED: &str = "name_collision_resolved";
pub const RESOURCE_EXPOSE_SKIPPED: &str = "resource_expose_skipped";
pub const RESOURCE_EXPOSED: &str = "resource_exposed";
pub const RESOURCE_DESTROY_OK: &str = "resource_destroy_ok";
pub const RESOURCE_DESTROY_NOT_FOUND: &str = "resource_destroy_not_found";
pub const FORM_ASSIGNED: &str = "form_assigned";
pub const FORM_ATTACH_FAILED: &str = "form_attach_failed";
pub const TOPIC_SUBSCRIBE_FAILED: &str = "topic_subscribe_failed";
pub const TOPIC_UNSUBSCRIBE_FAILED: &str = "topic_unsubscribe_failed";

// Outbound bridge events.
pub const OUTBOUND_TAP_ATTACHED: &str = "outbound_tap_attached";
pub const OUTBOUND_TAP_ATTACH_FAILED: &str = "outbound_tap_attach_failed";
pub const OUTBOUND_TAP_CANCELLED: &str = "outbound_tap_cancelled";
pub const OUTBOUND_ENCODE_FAILED: &str = "outbound_encode_failed";
pub const OUTBOUND_PUBLISH_ATTEMPT: &str = "outbound_publish_attempt";
pub const OUTBOUND_PUBLISH_FAILED: &str = "outbound_publish_failed";
pub const OUTBOUND_SNAPSHOT_PUBLISHED: &str = "outbound_snapshot_published";
pub const OUTBOUND_SNAPSHOT_FAILED: &str = "outbound_snapshot_failed";

// Inbound router events.
pub const INBOUND_RECEIVE: &str = "inbound_receive";
pub const INBOUND_DROP_INVALID_TOPIC: &str = "inbound_drop_invalid_topic";
pub const INBOUND_DROP_UNKNOWN_RESOURCE: &str = "inbound_drop_unknown_resource";
pub const INBOUND_DROP_UNKNOWN_AFFORDANCE: &str = "inbound_drop_unknown_affordance";
pub const INBOUND_DROP_READ_ONLY: &str = "inbound_drop_read_only";
pub const INBOUND_DROP_UNDECODABLE: &str = "inbound_drop_undecodable";
pub const INBOUND_DECODE_FALLBACK: &str = "inbound_decode_fallback";
pub const INBOUND_INVOKE_OK: &str = "inbound_invoke_ok";
pub const INBOUND_INVOKE_FAILED: &str = "inbound_invoke_failed";
pub const INBOUND_OUTPUT_DISCARDED: &str = "inbound_output_discarded";
pub const INBOUND_WRITE_OK: &str = "inbound_write_ok";
pub const INBOUND_WRITE_FAILED: &str = "inbound_write_failed";

// Connection lifecycle events.
pub const CONNECTION_SKIPPED: &str = "connection_skipped";
pub const CONNECTION_ATTEMPT: &str = "connection_attempt";
pub const CONNECTION_OK: &str = "connection_ok";
pub const CONNECTION_FAILED: &str = "connection_failed";
pub const CONNECTION_LOST: &str = "connection_lost";
pub const CONNECTION_CLOSED: &str = "connection_closed";
pub const SELF_HOST_LISTENING: &str = "self_host_listening";
pub const SELF_HOST_CLOSED: &str = "self_host_closed";
pub const SELF_HOST_PROXY_FAILED: &str = "self_host_proxy_failed";
pub const SELF_HOST_AUTH_DENIED: &str = "self_host_auth_denied";

// Runtime events.
pub const RUNTIME_SPAWN_OK: &str = "runtime_spawn_ok";
pub const RUNTIME_SPAWN_FAILED: &str = "runtime_spawn_failed";
pub const RUNTIME_EXITED: &str = "runtime_exited";
