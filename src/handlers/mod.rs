// handlers/mod.rs - Two-tier handler layout
//
// Public (no token needed) and Protected (bearer token required).
pub mod protected;
pub mod public;
