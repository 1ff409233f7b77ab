//! Business logic services
//!
//! Services encapsulate business logic and coordinate between
//! repositories and the auth layer.

pub mod notes;
pub mod user;

pub use notes::NoteService;
pub use user::{AuthDeps, AuthSession, UserService};
