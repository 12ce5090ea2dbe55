//! Shop Chat - streaming chat client for the shop assistant backend
//!
//! A session controller that sends one query at a time over a Server-Sent
//! Events stream, applies `context` chunks to the growing assistant turn,
//! and reports `error` frames and transport failures.

pub mod cart;
pub mod config;
pub mod conversation;
pub mod frame;
pub mod identity;
pub mod session;
pub mod state_machine;
pub mod status;
pub mod transport;

pub use config::ClientConfig;
pub use session::{ChatSession, SessionUpdate, StreamTimeouts};
pub use transport::{ChatTransport, HttpTransport};
