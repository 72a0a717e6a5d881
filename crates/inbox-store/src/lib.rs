//! inbox-store: Conversation and message state for the inbox
//!
//! This crate owns conversations, their ordered messages, read tracking,
//! the message selection and the active conversation. All mutation goes
//! through [`Command`]s applied by the [`Store`].

pub mod error;
pub mod persistence;
pub mod state;
pub mod store;
pub mod types;
mod views;

pub use error::{Error, Result};
pub use persistence::{FileSlot, PersistedState, Persister, StateSlot};
pub use state::{Command, InboxState};
pub use store::{Store, Subscriber};
pub use types::*;
