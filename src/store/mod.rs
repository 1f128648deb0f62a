//! sqlx repositories, one per collaborator interface of the checkout core.

pub mod address;
pub mod cart;
pub mod catalog;
pub mod lifecycle;
pub mod negotiation;
pub mod notification;
pub mod order;
pub mod rules;
pub mod summary;

pub use address::AddressStore;
pub use cart::{CartRecord, CartStore};
pub use catalog::CatalogStore;
pub use lifecycle::{
    RefundRecord, RefundStore, ReplacementRecord, ReplacementStore, RequestItem, ReturnRecord,
    ReturnStore,
};
pub use negotiation::{NegotiationRecord, NegotiationStore};
pub use notification::{DeliveryStatus, NotificationStore};
pub use order::{HistoryStore, NewOrder, OrderRecord, OrderStore};
pub use rules::{CouponStore, ShippingStore};
pub use summary::{SummaryRecord, SummaryStore};
