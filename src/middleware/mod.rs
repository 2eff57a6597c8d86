pub mod auth;
pub mod extract;
pub mod rate_limit;
pub mod response;
pub mod sanitize;

pub use auth::{admin_only, protect, AuthUser};
pub use extract::{IdPath, JsonBody, ListParams};
pub use rate_limit::{rate_limit_middleware, RateLimitState};
pub use response::{ApiResponse, ApiResult, TokenResponse};
pub use sanitize::sanitize_json_body;
