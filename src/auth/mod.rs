pub mod password;
pub mod policy;
pub mod principal;
pub mod tenant_context;
pub mod token;

pub use policy::{any_of_roles, authenticated, require_authenticated, self_or_role, AccessDecision};
pub use principal::{Principal, Role};
pub use tenant_context::TenantContext;
pub use token::{Claims, TokenCodec, TokenError};
