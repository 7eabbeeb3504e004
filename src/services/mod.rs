pub mod auth_service;
pub mod tenant_service;
pub mod user_service;

pub use auth_service::{AuthService, LoginRequest, LoginResponse};
pub use tenant_service::{TenantSelector, TenantService};
pub use user_service::{CreateUserRequest, UpdateUserRequest, UserService};
