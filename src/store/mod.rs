//! Storage boundary.
//!
//! The checkout workflow and the HTTP layer receive these store handles
//! as explicit parameters; nothing in the crate reaches for an ambient
//! connection.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::aggregates::{Cart, Order, OrderStatus, Product};
use crate::domain::value_objects::Category;

pub use memory::{MemoryCartStore, MemoryCatalogStore, MemoryOrderStore, MemoryUserStore};
pub use postgres::{PgCartStore, PgCatalogStore, PgOrderStore, PgUserStore};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("corrupt stored record: {0}")]
    Corrupt(String),
}

/// Sort key whitelist for catalog listings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortField {
    Name,
    Price,
    Stars,
    CreatedAt,
}

impl SortField {
    pub fn column(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Price => "price",
            Self::Stars => "stars",
            Self::CreatedAt => "created_at",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProductSort {
    pub field: SortField,
    pub descending: bool,
}

impl Default for ProductSort {
    /// Newest first, matching the storefront's default listing.
    fn default() -> Self {
        Self { field: SortField::CreatedAt, descending: true }
    }
}

/// Catalog listing filters; only active products are ever returned.
#[derive(Clone, Debug, Default)]
pub struct ProductQuery {
    pub category: Option<Category>,
    /// Case-insensitive substring match.
    pub subcategory: Option<String>,
    /// Free-text search over name, title, and description.
    pub search: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub sort: ProductSort,
    /// 1-based.
    pub page: u32,
    pub limit: u32,
}

impl ProductQuery {
    pub fn offset(&self) -> u32 {
        self.page.saturating_sub(1) * self.limit
    }
}

#[derive(Clone, Debug)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub total: i64,
}

#[derive(Clone, Debug)]
pub struct OrderPage {
    pub orders: Vec<Order>,
    pub total: i64,
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn insert(&self, product: &Product) -> Result<(), StoreError>;

    /// Full replace; returns false when the product does not exist.
    async fn update(&self, product: &Product) -> Result<bool, StoreError>;

    /// Resolves inactive products too; checkout validation and
    /// cancellation restore both need to see them.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Product>, StoreError>;

    async fn list(&self, query: &ProductQuery) -> Result<ProductPage, StoreError>;

    /// Atomic conditional decrement: applies only while `stock >=
    /// quantity` still holds, and reports whether it did. Two concurrent
    /// checkouts cannot both take the last unit.
    async fn decrement_stock(&self, id: Uuid, quantity: u32) -> Result<bool, StoreError>;

    /// Relative increment; returns false when the product is gone.
    async fn increment_stock(&self, id: Uuid, quantity: u32) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait CartStore: Send + Sync {
    async fn find_by_user(&self, user: Uuid) -> Result<Option<Cart>, StoreError>;

    /// Upsert, full replace. The cart's derived totals are persisted as
    /// written by the aggregate.
    async fn save(&self, cart: &Cart) -> Result<(), StoreError>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert(&self, order: &Order) -> Result<(), StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, StoreError>;

    /// Newest first, optional status filter, 1-based page.
    async fn list_by_user(
        &self,
        user: Uuid,
        status: Option<OrderStatus>,
        page: u32,
        limit: u32,
    ) -> Result<OrderPage, StoreError>;

    /// Full replace.
    async fn update(&self, order: &Order) -> Result<(), StoreError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Appends an order id to the user's back-reference list. A missing
    /// user row is a no-op, mirroring the underlying update semantics.
    async fn append_order(&self, user: Uuid, order: Uuid) -> Result<(), StoreError>;
}
