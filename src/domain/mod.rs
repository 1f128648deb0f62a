//! Pure checkout domain: pricing, shipping, discounts, lifecycle state.
//!
//! Nothing in here touches the database; the store layer feeds these
//! functions and persists what they return.

pub mod address;
pub mod cart;
pub mod discount;
pub mod money;
pub mod negotiation;
pub mod pricing;
pub mod shipping;
pub mod status;

pub use address::Address;
pub use cart::CartLine;
pub use pricing::{PricedLine, TaxRate, Totals};
pub use status::{NegotiationStatus, OrderStatus, ReplacementStatus, ReturnStatus};
