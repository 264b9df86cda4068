//! Aggregates module
pub mod cart;
pub mod order;
pub mod product;

pub use cart::{Cart, CartError, CartItem};
pub use order::{Order, OrderError, OrderItem, OrderStatus, OrderTotals, PaymentMethod, PaymentStatus, ShippingAddress};
pub use product::{Product, Review};
