//! Structured logging vocabulary.
//!
//! Library code emits `tracing` events tagged with an `event` name from [`events`] and a
//! `component` tag, and never installs a global subscriber.

pub mod events;
pub mod fields;
