use std::sync::Arc;

use crate::auth::TokenCodec;
use crate::database::{TenantStore, UserStore};

/// Shared handles cloned into every request
#[derive(Clone)]
pub struct AppState {
    pub tokens: Arc<TokenCodec>,
    pub tenants: Arc<dyn TenantStore>,
    pub users: Arc<dyn UserStore>,
    pub bcrypt_cost: u32,
}

impl AppState {
    pub fn new(tokens: TokenCodec, tenants: Arc<dyn TenantStore>, users: Arc<dyn UserStore>, bcrypt_cost: u32) -> Self {
        Self {
            tokens: Arc::new(tokens),
            tenants,
            users,
            bcrypt_cost,
        }
    }
}
