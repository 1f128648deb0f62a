//! Orchestration over the domain and store layers.

pub mod cart;
pub mod checkout;
pub mod lifecycle;
pub mod negotiation;
pub mod notify;
pub mod summary;

pub use cart::CartService;
pub use checkout::{CheckoutService, CreateOrderCmd};
pub use lifecycle::LifecycleService;
pub use negotiation::NegotiationService;
pub use notify::Notifier;
pub use summary::{AddressInput, SummaryService};
