// handlers/protected/mod.rs - Protected handlers (JWT authentication required)
//
// Security Level: bearer token for any active account
// Route Prefix: /api/v1/*
// Middleware: jwt_auth_middleware injects CurrentUser

pub mod documents;
pub mod forms;
pub mod me;
pub mod profile;
