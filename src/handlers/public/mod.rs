// handlers/public/mod.rs - Public handlers (no authentication)
//
// Token acquisition and the read-only category list.

pub mod auth;
pub mod categories;
