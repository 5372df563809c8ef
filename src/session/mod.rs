//! Release upload sessions: allocation, commit and processing status.
//!
//! A [`ReleaseUploadSession`] is the client-side view of one server-side
//! upload slot. [`ReleaseSessionManager`] performs the calls that move it
//! along the [`SessionState`] graph; the chunk bytes themselves are sent by
//! [`crate::upload::ChunkUploader`].

mod error;
mod manager;
mod state;

pub use error::SessionError;
pub use manager::ReleaseSessionManager;
pub use state::{ReleaseUploadSession, SessionState};
