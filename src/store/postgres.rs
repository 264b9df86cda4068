//! PostgreSQL store implementations.
//!
//! Item collections are embedded jsonb documents owned by their parent
//! row, so cart and order saves are single-row full replaces.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgPool;
use sqlx::types::Json;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::domain::aggregates::{Cart, CartItem, Order, OrderItem, OrderStatus, Product, Review, ShippingAddress};
use crate::store::{
    CartStore, CatalogStore, OrderPage, OrderStore, ProductPage, ProductQuery, StoreError,
    UserStore,
};

#[derive(Debug, Clone, sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    title: String,
    description: String,
    price: Decimal,
    original_price: Option<Decimal>,
    discount: i32,
    category: String,
    subcategory: Option<String>,
    image: String,
    images: Vec<String>,
    stars: Decimal,
    reviews: Json<Vec<Review>>,
    stock: i32,
    is_active: bool,
    tags: Vec<String>,
    manufacturer: Option<String>,
    sku: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = StoreError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let category = row.category.parse().map_err(|e| StoreError::Corrupt(format!("{e}")))?;
        Ok(Product {
            id: row.id,
            name: row.name,
            title: row.title,
            description: row.description,
            price: row.price,
            original_price: row.original_price,
            discount: row.discount.max(0) as u32,
            category,
            subcategory: row.subcategory,
            image: row.image,
            images: row.images,
            stars: row.stars,
            reviews: row.reviews.0,
            stock: row.stock,
            is_active: row.is_active,
            tags: row.tags,
            manufacturer: row.manufacturer,
            sku: row.sku,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn push_product_filters<'a>(qb: &mut QueryBuilder<'a, Postgres>, query: &'a ProductQuery) {
    qb.push(" WHERE is_active = TRUE");
    if let Some(category) = query.category {
        qb.push(" AND category = ").push_bind(category.as_str());
    }
    if let Some(sub) = &query.subcategory {
        qb.push(" AND subcategory ILIKE ").push_bind(format!("%{sub}%"));
    }
    if let Some(search) = &query.search {
        let pattern = format!("%{search}%");
        qb.push(" AND (name ILIKE ").push_bind(pattern.clone());
        qb.push(" OR title ILIKE ").push_bind(pattern.clone());
        qb.push(" OR description ILIKE ").push_bind(pattern);
        qb.push(")");
    }
    if let Some(min) = query.min_price {
        qb.push(" AND price >= ").push_bind(min);
    }
    if let Some(max) = query.max_price {
        qb.push(" AND price <= ").push_bind(max);
    }
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn insert(&self, product: &Product) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO products (id, name, title, description, price, original_price, discount, category, subcategory, image, images, stars, reviews, stock, is_active, tags, manufacturer, sku, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)",
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.title)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.original_price)
        .bind(product.discount as i32)
        .bind(product.category.as_str())
        .bind(&product.subcategory)
        .bind(&product.image)
        .bind(&product.images)
        .bind(product.stars)
        .bind(Json(&product.reviews))
        .bind(product.stock)
        .bind(product.is_active)
        .bind(&product.tags)
        .bind(&product.manufacturer)
        .bind(&product.sku)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update(&self, product: &Product) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE products SET name = $2, title = $3, description = $4, price = $5, original_price = $6, discount = $7, category = $8, subcategory = $9, image = $10, images = $11, stars = $12, reviews = $13, stock = $14, is_active = $15, tags = $16, manufacturer = $17, sku = $18, updated_at = $19 \
             WHERE id = $1",
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.title)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.original_price)
        .bind(product.discount as i32)
        .bind(product.category.as_str())
        .bind(&product.subcategory)
        .bind(&product.image)
        .bind(&product.images)
        .bind(product.stars)
        .bind(Json(&product.reviews))
        .bind(product.stock)
        .bind(product.is_active)
        .bind(&product.tags)
        .bind(&product.manufacturer)
        .bind(&product.sku)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query_as::<_, ProductRow>("SELECT * FROM products WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Product::try_from).transpose()
    }

    async fn list(&self, query: &ProductQuery) -> Result<ProductPage, StoreError> {
        let mut qb = QueryBuilder::new("SELECT * FROM products");
        push_product_filters(&mut qb, query);
        let direction = if query.sort.descending { "DESC" } else { "ASC" };
        qb.push(format!(" ORDER BY {} {}", query.sort.field.column(), direction));
        qb.push(" LIMIT ").push_bind(query.limit as i64);
        qb.push(" OFFSET ").push_bind(query.offset() as i64);
        let rows: Vec<ProductRow> = qb.build_query_as().fetch_all(&self.pool).await?;

        let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM products");
        push_product_filters(&mut count_qb, query);
        let total: (i64,) = count_qb.build_query_as().fetch_one(&self.pool).await?;

        let products = rows
            .into_iter()
            .map(Product::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ProductPage { products, total: total.0 })
    }

    async fn decrement_stock(&self, id: Uuid, quantity: u32) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE products SET stock = stock - $2, updated_at = NOW() WHERE id = $1 AND stock >= $2",
        )
        .bind(id)
        .bind(quantity as i32)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn increment_stock(&self, id: Uuid, quantity: u32) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE products SET stock = stock + $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(quantity as i32)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct CartRow {
    id: Uuid,
    user_id: Uuid,
    items: Json<Vec<CartItem>>,
    total_items: i32,
    total_price: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CartRow> for Cart {
    fn from(row: CartRow) -> Self {
        Cart {
            id: row.id,
            user: row.user_id,
            items: row.items.0,
            total_items: row.total_items.max(0) as u32,
            total_price: row.total_price,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Clone)]
pub struct PgCartStore {
    pool: PgPool,
}

impl PgCartStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CartStore for PgCartStore {
    async fn find_by_user(&self, user: Uuid) -> Result<Option<Cart>, StoreError> {
        let row = sqlx::query_as::<_, CartRow>("SELECT * FROM carts WHERE user_id = $1")
            .bind(user)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Cart::from))
    }

    async fn save(&self, cart: &Cart) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO carts (id, user_id, items, total_items, total_price, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (user_id) DO UPDATE SET items = EXCLUDED.items, total_items = EXCLUDED.total_items, total_price = EXCLUDED.total_price, updated_at = EXCLUDED.updated_at",
        )
        .bind(cart.id)
        .bind(cart.user)
        .bind(Json(&cart.items))
        .bind(cart.total_items as i32)
        .bind(cart.total_price)
        .bind(cart.created_at)
        .bind(cart.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    user_id: Uuid,
    order_number: String,
    items: Json<Vec<OrderItem>>,
    total_items: i32,
    subtotal: Decimal,
    tax: Decimal,
    shipping: Decimal,
    discount: Decimal,
    total_amount: Decimal,
    shipping_address: Json<ShippingAddress>,
    payment_method: String,
    payment_status: String,
    order_status: String,
    tracking_number: Option<String>,
    estimated_delivery: DateTime<Utc>,
    delivered_at: Option<DateTime<Utc>>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let corrupt = |e: crate::domain::value_objects::ParseEnumError| StoreError::Corrupt(format!("{e}"));
        Ok(Order {
            id: row.id,
            user: row.user_id,
            order_number: row.order_number.into(),
            items: row.items.0,
            total_items: row.total_items.max(0) as u32,
            subtotal: row.subtotal,
            tax: row.tax,
            shipping: row.shipping,
            discount: row.discount,
            total_amount: row.total_amount,
            shipping_address: row.shipping_address.0,
            payment_method: row.payment_method.parse().map_err(corrupt)?,
            payment_status: row.payment_status.parse().map_err(corrupt)?,
            order_status: row.order_status.parse().map_err(corrupt)?,
            tracking_number: row.tracking_number,
            estimated_delivery: row.estimated_delivery,
            delivered_at: row.delivered_at,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn insert(&self, order: &Order) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO orders (id, user_id, order_number, items, total_items, subtotal, tax, shipping, discount, total_amount, shipping_address, payment_method, payment_status, order_status, tracking_number, estimated_delivery, delivered_at, notes, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)",
        )
        .bind(order.id)
        .bind(order.user)
        .bind(order.order_number.as_str())
        .bind(Json(&order.items))
        .bind(order.total_items as i32)
        .bind(order.subtotal)
        .bind(order.tax)
        .bind(order.shipping)
        .bind(order.discount)
        .bind(order.total_amount)
        .bind(Json(&order.shipping_address))
        .bind(order.payment_method.as_str())
        .bind(order.payment_status.as_str())
        .bind(order.order_status.as_str())
        .bind(&order.tracking_number)
        .bind(order.estimated_delivery)
        .bind(order.delivered_at)
        .bind(&order.notes)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Order::try_from).transpose()
    }

    async fn list_by_user(
        &self,
        user: Uuid,
        status: Option<OrderStatus>,
        page: u32,
        limit: u32,
    ) -> Result<OrderPage, StoreError> {
        let mut qb = QueryBuilder::new("SELECT * FROM orders WHERE user_id = ");
        qb.push_bind(user);
        if let Some(status) = status {
            qb.push(" AND order_status = ").push_bind(status.as_str());
        }
        qb.push(" ORDER BY created_at DESC");
        qb.push(" LIMIT ").push_bind(limit as i64);
        qb.push(" OFFSET ").push_bind((page.saturating_sub(1) * limit) as i64);
        let rows: Vec<OrderRow> = qb.build_query_as().fetch_all(&self.pool).await?;

        let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM orders WHERE user_id = ");
        count_qb.push_bind(user);
        if let Some(status) = status {
            count_qb.push(" AND order_status = ").push_bind(status.as_str());
        }
        let total: (i64,) = count_qb.build_query_as().fetch_one(&self.pool).await?;

        let orders = rows
            .into_iter()
            .map(Order::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(OrderPage { orders, total: total.0 })
    }

    async fn update(&self, order: &Order) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE orders SET payment_status = $2, order_status = $3, tracking_number = $4, delivered_at = $5, notes = $6, updated_at = $7 WHERE id = $1",
        )
        .bind(order.id)
        .bind(order.payment_status.as_str())
        .bind(order.order_status.as_str())
        .bind(&order.tracking_number)
        .bind(order.delivered_at)
        .bind(&order.notes)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn append_order(&self, user: Uuid, order: Uuid) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE users SET order_ids = array_append(order_ids, $2), updated_at = NOW() WHERE id = $1",
        )
        .bind(user)
        .bind(order)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
