// handlers/public/mod.rs - Routes reachable without a token
//
// These must never answer 401 merely because no credentials were sent.

pub mod health;
pub mod login;

pub use health::{health, root};
pub use login::login;
