//! Database Models

// Parties
pub mod resident;
pub mod store;

// Menu Domain
pub mod listing;

// Orders
pub mod order;
pub mod payment;

// Re-exports
pub use resident::{Resident, ResidentCreate, ResidentStatus};
pub use store::{MerchantStore, MerchantStoreCreate};
pub use listing::{Menu, MenuCreate, MenuListing, MenuListingCreate, ResolvedListing};
pub use order::{
    LineItemRequest, Order, OrderAccessView, OrderDetail, OrderFilter, OrderLine, OrderLineDetail,
    OrderStatus,
};
pub use payment::{Payment, PaymentMethod, PaymentStatus};
