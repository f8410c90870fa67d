//! Collaborative markup core for portal attachments.
//!
//! A [`ReviewSession`] ties together the drawing engine ([`canvas`]), the tool
//! state machine ([`tools`]), persistence against the markup service
//! ([`adapter`]), adaptive background sync ([`poller`]) and the merged activity
//! feed ([`timeline`]).

pub mod adapter;
pub mod canvas;
pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod geometry;
pub mod poller;
pub mod shell;
pub mod state;
pub mod timeline;
pub mod tools;

#[cfg(test)]
mod testing;

pub use adapter::{ClearReport, MarkupAdapter, PinOutcome};
pub use client::{HttpMarkupApi, MarkupApi};
pub use config::ReviewConfig;
pub use error::{Result, ReviewError};
pub use events::{Notice, NoticeLevel, ViewerEvent};
pub use poller::{Interaction, PollMode, PollPolicy, PollStatus, Visibility};
pub use shell::{Layout, ReviewSession};
pub use tools::{Action, Tool};
