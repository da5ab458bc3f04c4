pub mod response;
pub mod route_guard;
pub mod security_headers;
pub mod session;

pub use response::{ApiResponse, ApiResult};
pub use route_guard::{route_guard, Access, RouteRule, PROTECTED_ROUTES};
pub use security_headers::security_headers;
pub use session::SessionUser;
