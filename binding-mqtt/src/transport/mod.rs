//! Broker transport layer.
//!
//! [`broker`] defines the seams the binding is written against. [`rumqtt_client`] implements
//! them with `rumqttc`, and `embedded_broker` (feature `embedded-broker`) hosts a `rumqttd`
//! broker for self-hosted mode.

pub mod broker;
#[cfg(feature = "embedded-broker")]
pub mod embedded_broker;
pub mod rumqtt_client;
