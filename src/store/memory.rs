//! In-memory store implementations.
//!
//! Used by the workflow tests; behaviorally aligned with the PostgreSQL
//! implementations, including the conditional stock decrement.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::aggregates::{Cart, Order, OrderStatus, Product};
use crate::store::{
    CartStore, CatalogStore, OrderPage, OrderStore, ProductPage, ProductQuery, SortField,
    StoreError, UserStore,
};

#[derive(Clone, Default)]
pub struct MemoryCatalogStore {
    products: Arc<RwLock<HashMap<Uuid, Product>>>,
}

impl MemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalogStore {
    async fn insert(&self, product: &Product) -> Result<(), StoreError> {
        self.products.write().await.insert(product.id, product.clone());
        Ok(())
    }

    async fn update(&self, product: &Product) -> Result<bool, StoreError> {
        let mut products = self.products.write().await;
        if !products.contains_key(&product.id) {
            return Ok(false);
        }
        products.insert(product.id, product.clone());
        Ok(true)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Product>, StoreError> {
        Ok(self.products.read().await.get(&id).cloned())
    }

    async fn list(&self, query: &ProductQuery) -> Result<ProductPage, StoreError> {
        let products = self.products.read().await;
        let mut matches: Vec<Product> = products
            .values()
            .filter(|p| p.is_active)
            .filter(|p| query.category.map_or(true, |c| p.category == c))
            .filter(|p| {
                query.subcategory.as_deref().map_or(true, |s| {
                    p.subcategory
                        .as_deref()
                        .is_some_and(|sub| sub.to_lowercase().contains(&s.to_lowercase()))
                })
            })
            .filter(|p| {
                query.search.as_deref().map_or(true, |s| {
                    let needle = s.to_lowercase();
                    p.name.to_lowercase().contains(&needle)
                        || p.title.to_lowercase().contains(&needle)
                        || p.description.to_lowercase().contains(&needle)
                })
            })
            .filter(|p| query.min_price.map_or(true, |min| p.price >= min))
            .filter(|p| query.max_price.map_or(true, |max| p.price <= max))
            .cloned()
            .collect();

        matches.sort_by(|a, b| {
            let ordering = match query.sort.field {
                SortField::Name => a.name.cmp(&b.name),
                SortField::Price => a.price.cmp(&b.price),
                SortField::Stars => a.stars.cmp(&b.stars),
                SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            };
            if query.sort.descending { ordering.reverse() } else { ordering }
        });

        let total = matches.len() as i64;
        let products = matches
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.limit as usize)
            .collect();
        Ok(ProductPage { products, total })
    }

    async fn decrement_stock(&self, id: Uuid, quantity: u32) -> Result<bool, StoreError> {
        let mut products = self.products.write().await;
        match products.get_mut(&id) {
            Some(p) if p.stock >= quantity as i32 => {
                p.stock -= quantity as i32;
                p.touch();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn increment_stock(&self, id: Uuid, quantity: u32) -> Result<bool, StoreError> {
        let mut products = self.products.write().await;
        match products.get_mut(&id) {
            Some(p) => {
                p.stock += quantity as i32;
                p.touch();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[derive(Clone, Default)]
pub struct MemoryCartStore {
    carts: Arc<RwLock<HashMap<Uuid, Cart>>>,
}

impl MemoryCartStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CartStore for MemoryCartStore {
    async fn find_by_user(&self, user: Uuid) -> Result<Option<Cart>, StoreError> {
        Ok(self.carts.read().await.get(&user).cloned())
    }

    async fn save(&self, cart: &Cart) -> Result<(), StoreError> {
        self.carts.write().await.insert(cart.user, cart.clone());
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct MemoryOrderStore {
    orders: Arc<RwLock<HashMap<Uuid, Order>>>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn insert(&self, order: &Order) -> Result<(), StoreError> {
        self.orders.write().await.insert(order.id, order.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
        Ok(self.orders.read().await.get(&id).cloned())
    }

    async fn list_by_user(
        &self,
        user: Uuid,
        status: Option<OrderStatus>,
        page: u32,
        limit: u32,
    ) -> Result<OrderPage, StoreError> {
        let orders = self.orders.read().await;
        let mut matches: Vec<Order> = orders
            .values()
            .filter(|o| o.user == user)
            .filter(|o| status.map_or(true, |s| o.order_status == s))
            .cloned()
            .collect();
        matches.sort_by(|a, b| match b.created_at.cmp(&a.created_at) {
            Ordering::Equal => b.id.cmp(&a.id),
            other => other,
        });

        let total = matches.len() as i64;
        let offset = page.saturating_sub(1) * limit;
        let orders = matches
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok(OrderPage { orders, total })
    }

    async fn update(&self, order: &Order) -> Result<(), StoreError> {
        self.orders.write().await.insert(order.id, order.clone());
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct MemoryUserStore {
    orders: Arc<RwLock<HashMap<Uuid, Vec<Uuid>>>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Order ids appended for a user, in append order.
    pub async fn orders_for(&self, user: Uuid) -> Vec<Uuid> {
        self.orders.read().await.get(&user).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn append_order(&self, user: Uuid, order: Uuid) -> Result<(), StoreError> {
        self.orders.write().await.entry(user).or_default().push(order);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::Category;
    use crate::store::ProductSort;
    use rust_decimal::Decimal;

    fn product(name: &str, price: i64, stock: i32) -> Product {
        Product::new(name, name, "test", Decimal::from(price), Category::Seeds, "https://img/p.jpg", stock)
    }

    #[tokio::test]
    async fn test_listing_hides_inactive_products() {
        let store = MemoryCatalogStore::new();
        let mut hidden = product("hidden", 10, 1);
        hidden.deactivate();
        store.insert(&hidden).await.unwrap();
        store.insert(&product("visible", 10, 1)).await.unwrap();

        let page = store
            .list(&ProductQuery { page: 1, limit: 10, ..Default::default() })
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.products[0].name, "visible");

        // But fetch-by-id still resolves the inactive one.
        assert!(store.find_by_id(hidden.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_price_sort_and_filters() {
        let store = MemoryCatalogStore::new();
        store.insert(&product("a", 30, 1)).await.unwrap();
        store.insert(&product("b", 10, 1)).await.unwrap();
        store.insert(&product("c", 20, 1)).await.unwrap();

        let page = store
            .list(&ProductQuery {
                sort: ProductSort { field: SortField::Price, descending: false },
                min_price: Some(Decimal::from(15)),
                page: 1,
                limit: 10,
                ..Default::default()
            })
            .await
            .unwrap();
        let names: Vec<&str> = page.products.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["c", "a"]);
    }

    #[tokio::test]
    async fn test_conditional_decrement_refuses_oversell() {
        let store = MemoryCatalogStore::new();
        let p = product("seed", 10, 3);
        store.insert(&p).await.unwrap();

        assert!(store.decrement_stock(p.id, 3).await.unwrap());
        assert!(!store.decrement_stock(p.id, 1).await.unwrap());
        assert_eq!(store.find_by_id(p.id).await.unwrap().unwrap().stock, 0);
    }
}
