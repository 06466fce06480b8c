//! Subscription-driven dispatch engine.
//!
//! On every scheduler tick the engine loads the active subscriptions,
//! pulls each one's unseen content items, delivers them oldest-first over
//! the transport, and durably advances per-subscription progress after
//! every confirmed send. Delivery is at-least-once: a crash between a send
//! and its commit re-sends exactly that item on restart.

pub mod dispatcher;
pub mod registry;
pub mod reporter;
pub mod scheduler;
pub mod settings;
pub mod source;
pub mod stats;
