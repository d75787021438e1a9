//! Runtime module — process lifecycle: boot and the event watch loop.

pub mod boot;
pub mod watch;
