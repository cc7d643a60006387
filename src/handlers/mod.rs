// handlers/mod.rs - 3-Tier Handler Architecture
//
// Public (no auth) → Protected (JWT auth) → Admin (JWT auth + admin role)

pub mod admin; // Tier 3: /api/v1/admin/*
pub mod protected; // Tier 2: /api/v1/* with a bearer token
pub mod public; // Tier 1: registration, login, categories
