// handlers/auth/mod.rs - session lifecycle handlers
//
// The backend authenticates; the gateway turns its token into HttpOnly
// cookies and reports on the current session.

pub mod login;
pub mod logout;
pub mod session;

pub use login::login_post;
pub use logout::logout_post;
pub use session::session_get;
