pub mod auth;
pub mod response;

pub use auth::{jwt_auth_middleware, require_admin, CurrentUser};
pub use response::{ApiJson, ApiPath, ApiQuery, ApiResponse, ApiResult};
