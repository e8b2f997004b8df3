//! Session-token verification for the authentication boundary

mod session_token;

pub use session_token::{SessionClaims, SessionTokenService};
