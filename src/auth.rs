//! Credential models and the session that owns them.

pub mod secret;
pub mod session;

pub use secret::*;
pub use session::*;
