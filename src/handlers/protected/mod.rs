// handlers/protected/mod.rs - Routes that need a verified bearer token
//
// The router wraps all of these in `require_authenticated`, so a request
// without a principal gets 401 before any handler runs. Finer role and
// ownership checks live in the handlers.

pub mod me;
pub mod users;

pub use me::me;
pub use users::{create_user, deactivate_user, get_user, list_users, update_user};
