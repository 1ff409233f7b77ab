//! Authentication module
//!
//! Stateless JWT sessions with argon2 password hashing, the request guard
//! that resolves them, and the note authorization policy.

mod clock;
mod cookie;
mod jwt;
mod middleware;
mod password;
pub mod policy;
mod session;

pub use clock::{Clock, FixedClock, SystemClock};
pub use cookie::{clear_session_cookie, cookie_value, session_cookie};
pub use jwt::{Claims, JwtService, TokenError};
pub use middleware::{AuthUser, MaybeAuthUser};
pub use password::{HashingError, PasswordService};
pub use session::{AuthRejection, RequestContext, ResolveError, ResolvedIdentity, SessionResolver};
