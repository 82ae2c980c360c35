//! National e-invoice registry client.
//!
//! Sessions are short-lived server-issued tokens obtained from a challenge
//! handshake; the client keeps one in memory and transparently re-opens it
//! when it is about to expire.

mod client;
mod error;
mod types;

pub use client::RegistryClient;
pub use error::RegistryError;
pub use types::{RegistryInvoice, RegistrySession, SessionStatus};
