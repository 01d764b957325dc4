//! # lumen-core
//!
//! Session tracking, state store and broadcast logic for Lumen.
//!
//! This crate provides the engine that keeps every connected client's view
//! of the shared actuator consistent:
//!
//! - **Registry** - The set of live sessions
//! - **State** - Single-writer actuator value with a version counter
//! - **Broadcaster** - Delivery to one session or to all of them
//! - **Dispatcher** - Command to effect mapping for inbound frames
//! - **Presence** - Greeting, join and leave notices
//! - **Actor** - A task owning the hub, for multi-threaded runtimes
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Transport  │────▶│  Hub actor  │────▶│ Broadcaster │────▶ outboxes
//! └─────────────┘     └─────────────┘     └─────────────┘
//!                            │
//!                            ▼
//!                     ┌─────────────┐
//!                     │ State store │────▶ actuator, display
//!                     └─────────────┘
//! ```

pub mod actor;
pub mod broadcaster;
pub mod dispatcher;
pub mod hub;
pub mod presence;
pub mod registry;
pub mod state;

pub use actor::{HubConfig, HubError, HubHandle, HubStatus};
pub use broadcaster::{Broadcaster, ChannelOutbound, Outbound, OutboundError};
pub use dispatcher::Dispatched;
pub use hub::{CoreError, Hub};
pub use registry::ConnectionRegistry;
pub use state::{Actuator, ActuatorState, StateObserver, StateStore};
