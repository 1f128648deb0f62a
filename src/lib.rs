//! Storefront checkout and order lifecycle service.
//!
//! A stateless HTTP/JSON API over PostgreSQL covering carts, pricing
//! summaries, checkout, and the post-order lifecycle (status transitions,
//! returns, replacements, refunds). The money-facing invariants live in
//! `domain`; `store` wraps the database; `service` orchestrates the two.

pub mod domain;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod routes;
pub mod service;
pub mod state;
pub mod store;
