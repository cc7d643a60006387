// handlers/admin/mod.rs - Admin handlers (JWT + admin role)
//
// Security Level: bearer token for an active account with role = admin
// Route Prefix: /api/v1/admin/*
// Middleware: jwt_auth_middleware, then require_admin

use serde::Deserialize;

pub mod activities;
pub mod categories;
pub mod clients;
pub mod customers;
pub mod documents;
pub mod forms;
pub mod users;

#[derive(Debug, Default, Deserialize)]
pub struct CompletedFilter {
    pub completed: Option<bool>,
}
