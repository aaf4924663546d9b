//! Core types and sync wiring for the renovasjon waste collection bridge.

/// Credential holder for the upstream login token.
pub mod credential;
/// Home Assistant discovery topics and payloads.
pub mod discovery;
/// Domain models and identifiers shared by the daemon and the finder.
pub mod model;
/// Bundle of upstream ports handed to the binaries.
pub mod plugin;
/// Traits describing the upstream and bus interfaces.
pub mod ports;
/// Next-collection derivation from raw pickup events.
pub mod resolver;
/// Periodic synchronization of sensors onto the bus.
pub mod scheduler;
/// Mapping from category names to bus-safe sensor identifiers.
pub mod slug;

#[cfg(test)]
mod fakes;

pub use credential::*;
pub use discovery::*;
pub use model::*;
pub use plugin::*;
pub use ports::*;
pub use resolver::*;
pub use scheduler::*;
pub use slug::*;
