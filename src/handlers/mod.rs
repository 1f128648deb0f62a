//! HTTP handlers: thin request/response adapters over the services.

pub mod cart;
pub mod checkout;
pub mod negotiation;
pub mod orders;
pub mod returns;
