//! Runtime integration layer.
//!
//! Keeps OS-thread boundaries in one place. The embedded broker runs its own blocking
//! event loops and is started on a dedicated named thread from here.

#[cfg_attr(not(feature = "embedded-broker"), allow(dead_code))]
pub(crate) mod worker_runtime;
