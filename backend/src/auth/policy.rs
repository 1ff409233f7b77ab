//! Authorization rules for note operations
//!
//! Reading and searching are public. Creating requires an identity, and the
//! identity becomes the note's author.

use super::session::{AuthRejection, ResolvedIdentity};
use uuid::Uuid;

/// Operations on the note resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteAction {
    Read,
    Search,
    Create,
}

impl NoteAction {
    pub fn requires_identity(self) -> bool {
        matches!(self, NoteAction::Create)
    }
}

/// Outcome of a successful authorization check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Anonymous,
    Authenticated { user_id: Uuid },
}

/// Decide whether `caller` may perform `action`
pub fn authorize(action: NoteAction, caller: Option<&ResolvedIdentity>) -> Result<Access, AuthRejection> {
    match caller {
        Some(identity) => Ok(Access::Authenticated {
            user_id: identity.user_id,
        }),
        None if action.requires_identity() => Err(AuthRejection::MissingToken),
        None => Ok(Access::Anonymous),
    }
}

/// Author id for a note about to be created by `caller`
pub fn author_for_create(caller: Option<&ResolvedIdentity>) -> Result<Uuid, AuthRejection> {
    match authorize(NoteAction::Create, caller)? {
        Access::Authenticated { user_id } => Ok(user_id),
        Access::Anonymous => Err(AuthRejection::MissingToken),
    }
}
