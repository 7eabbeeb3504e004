pub mod auth;
pub mod json;

pub use auth::authenticate_request;
pub use json::ValidJson;
