//! Checkout workflow: converts a validated cart into an order.
//!
//! Store handles are injected at construction; the workflow has no
//! ambient state. Stock is taken with atomic conditional decrements and
//! compensated on failure, so the order is only persisted once every
//! line's stock was actually secured.

use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::aggregates::{Order, OrderError, OrderItem, OrderTotals, PaymentMethod, ShippingAddress};
use crate::domain::value_objects::Identity;
use crate::store::{CartStore, CatalogStore, OrderStore, StoreError, UserStore};

/// GST percentage applied to the cart subtotal.
const TAX_RATE_PERCENT: i64 = 18;
/// Subtotals strictly above this ship free; at or below it a flat fee
/// applies.
const FREE_SHIPPING_ABOVE: i64 = 500;
const FLAT_SHIPPING_FEE: i64 = 50;

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Cart is empty")]
    EmptyCart,
    #[error("One or more products in your cart no longer exist")]
    ProductGone,
    #[error("Product {name} is no longer available")]
    ProductUnavailable { name: String },
    #[error("Insufficient stock for {name}. Available: {available}, Requested: {requested}")]
    InsufficientStock { name: String, available: i32, requested: u32 },
    #[error("Order not found")]
    NotFound,
    #[error("Not authorized to access this order")]
    Forbidden,
    #[error(transparent)]
    Order(#[from] OrderError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Checkout command: everything the caller supplies beyond the cart
/// itself.
#[derive(Clone, Debug)]
pub struct PlaceOrder {
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
}

/// Totals for a checkout. Tax is rounded to two decimal places away from
/// zero; the subtotal is the cart's add-time pricing, not live catalog
/// prices.
pub fn compute_totals(subtotal: Decimal) -> OrderTotals {
    let tax = (subtotal * Decimal::new(TAX_RATE_PERCENT, 2))
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let shipping = if subtotal > Decimal::from(FREE_SHIPPING_ABOVE) {
        Decimal::ZERO
    } else {
        Decimal::from(FLAT_SHIPPING_FEE)
    };
    let discount = Decimal::ZERO;
    OrderTotals {
        subtotal,
        tax,
        shipping,
        discount,
        total_amount: subtotal + tax + shipping - discount,
    }
}

#[derive(Clone)]
pub struct CheckoutService<C, R, O, U> {
    catalog: C,
    carts: R,
    orders: O,
    users: U,
}

impl<C, R, O, U> CheckoutService<C, R, O, U>
where
    C: CatalogStore,
    R: CartStore,
    O: OrderStore,
    U: UserStore,
{
    pub fn new(catalog: C, carts: R, orders: O, users: U) -> Self {
        Self { catalog, carts, orders, users }
    }

    /// Runs the full checkout: validate → totals → take stock → persist
    /// order → append user reference → clear cart.
    ///
    /// Validation failures abort before anything is written. A stock
    /// line that cannot be taken re-increments the lines already taken
    /// and fails the whole checkout.
    pub async fn place_order(&self, user: Uuid, command: PlaceOrder) -> Result<Order, CheckoutError> {
        let mut cart = self
            .carts
            .find_by_user(user)
            .await?
            .ok_or(CheckoutError::EmptyCart)?;
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let mut products = Vec::with_capacity(cart.items.len());
        for item in &cart.items {
            let product = self
                .catalog
                .find_by_id(item.product)
                .await?
                .ok_or(CheckoutError::ProductGone)?;
            if !product.is_active {
                return Err(CheckoutError::ProductUnavailable { name: product.name });
            }
            if !product.has_stock(item.quantity) {
                return Err(CheckoutError::InsufficientStock {
                    name: product.name,
                    available: product.stock,
                    requested: item.quantity,
                });
            }
            products.push(product);
        }

        let totals = compute_totals(cart.total_price);
        let items: Vec<OrderItem> = cart
            .items
            .iter()
            .zip(&products)
            .map(|(item, product)| OrderItem {
                product: product.id,
                name: product.name.clone(),
                image: product.image.clone(),
                price: item.price,
                quantity: item.quantity,
                size: item.size.clone(),
            })
            .collect();

        let mut taken: Vec<(Uuid, u32)> = Vec::with_capacity(items.len());
        for item in &items {
            let took = match self.catalog.decrement_stock(item.product, item.quantity).await {
                Ok(took) => took,
                Err(err) => {
                    self.restore_stock(&taken).await;
                    return Err(err.into());
                }
            };
            if !took {
                let available = self
                    .catalog
                    .find_by_id(item.product)
                    .await
                    .ok()
                    .flatten()
                    .map(|p| p.stock)
                    .unwrap_or(0);
                self.restore_stock(&taken).await;
                return Err(CheckoutError::InsufficientStock {
                    name: item.name.clone(),
                    available,
                    requested: item.quantity,
                });
            }
            taken.push((item.product, item.quantity));
        }

        let order = Order::create(
            user,
            items,
            totals,
            command.shipping_address,
            command.payment_method,
            command.notes,
        )?;
        if let Err(err) = self.orders.insert(&order).await {
            self.restore_stock(&taken).await;
            return Err(err.into());
        }

        self.users.append_order(user, order.id).await?;
        cart.clear();
        self.carts.save(&cart).await?;
        Ok(order)
    }

    /// Cancels an order on behalf of its owner or an administrator and
    /// restores the stock it had taken.
    pub async fn cancel_order(&self, requester: Identity, order_id: Uuid) -> Result<Order, CheckoutError> {
        let mut order = self
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or(CheckoutError::NotFound)?;
        if order.user != requester.id && !requester.role.is_admin() {
            return Err(CheckoutError::Forbidden);
        }
        order.cancel()?;
        self.orders.update(&order).await?;

        let restore: Vec<(Uuid, u32)> = order.items.iter().map(|i| (i.product, i.quantity)).collect();
        self.restore_stock(&restore).await;
        Ok(order)
    }

    /// Best-effort relative increments. A product deleted from the
    /// catalog since the order was placed is skipped and logged.
    async fn restore_stock(&self, taken: &[(Uuid, u32)]) {
        for (product, quantity) in taken {
            match self.catalog.increment_stock(*product, *quantity).await {
                Ok(true) => {}
                Ok(false) => {
                    tracing::warn!(%product, quantity, "product missing during stock restore, skipped");
                }
                Err(err) => {
                    tracing::error!(%product, quantity, error = %err, "failed to restore stock");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{Cart, OrderStatus, Product};
    use crate::domain::value_objects::Category;
    use crate::store::{MemoryCartStore, MemoryCatalogStore, MemoryOrderStore, MemoryUserStore};
    use chrono::Duration;

    type TestService =
        CheckoutService<MemoryCatalogStore, MemoryCartStore, MemoryOrderStore, MemoryUserStore>;

    struct Fixture {
        service: TestService,
        catalog: MemoryCatalogStore,
        carts: MemoryCartStore,
        orders: MemoryOrderStore,
        users: MemoryUserStore,
    }

    fn fixture() -> Fixture {
        let catalog = MemoryCatalogStore::new();
        let carts = MemoryCartStore::new();
        let orders = MemoryOrderStore::new();
        let users = MemoryUserStore::new();
        let service =
            CheckoutService::new(catalog.clone(), carts.clone(), orders.clone(), users.clone());
        Fixture { service, catalog, carts, orders, users }
    }

    fn product(name: &str, price: i64, stock: i32) -> Product {
        Product::new(
            name,
            name,
            "test product",
            Decimal::from(price),
            Category::Fertilizer,
            "https://img/p.jpg",
            stock,
        )
    }

    fn command() -> PlaceOrder {
        PlaceOrder {
            shipping_address: ShippingAddress {
                name: "Asha Patel".into(),
                street: "12 Mandi Road".into(),
                city: "Nashik".into(),
                state: "Maharashtra".into(),
                zip_code: "422001".into(),
                country: "India".into(),
                phone: "9876543210".into(),
            },
            payment_method: PaymentMethod::CashOnDelivery,
            notes: None,
        }
    }

    #[test]
    fn test_totals_above_free_shipping_threshold() {
        let totals = compute_totals(Decimal::from(600));
        assert_eq!(totals.tax, Decimal::from(108));
        assert_eq!(totals.shipping, Decimal::ZERO);
        assert_eq!(totals.total_amount, Decimal::from(708));
    }

    #[test]
    fn test_totals_with_flat_shipping() {
        let totals = compute_totals(Decimal::from(400));
        assert_eq!(totals.tax, Decimal::from(72));
        assert_eq!(totals.shipping, Decimal::from(50));
        assert_eq!(totals.total_amount, Decimal::from(522));
    }

    #[test]
    fn test_totals_threshold_is_exclusive() {
        // Exactly 500 still pays shipping.
        let totals = compute_totals(Decimal::from(500));
        assert_eq!(totals.shipping, Decimal::from(50));
        assert_eq!(totals.total_amount, Decimal::from(640));
    }

    #[test]
    fn test_tax_rounds_to_two_decimals() {
        let totals = compute_totals(Decimal::new(33333, 2)); // 333.33
        assert_eq!(totals.tax, Decimal::new(6000, 2)); // 59.9994 -> 60.00
    }

    #[tokio::test]
    async fn test_checkout_fails_on_missing_cart() {
        let f = fixture();
        let err = f.service.place_order(Uuid::now_v7(), command()).await.unwrap_err();
        assert!(matches!(err, CheckoutError::EmptyCart));
    }

    #[tokio::test]
    async fn test_checkout_rejects_insufficient_stock_without_persisting() {
        let f = fixture();
        let p = product("Urea", 300, 3);
        f.catalog.insert(&p).await.unwrap();

        let user = Uuid::now_v7();
        let mut cart = Cart::new(user);
        cart.add_item(p.id, 5, "", p.price);
        f.carts.save(&cart).await.unwrap();

        let err = f.service.place_order(user, command()).await.unwrap_err();
        match err {
            CheckoutError::InsufficientStock { name, available, requested } => {
                assert_eq!(name, "Urea");
                assert_eq!(available, 3);
                assert_eq!(requested, 5);
            }
            other => panic!("unexpected error: {other}"),
        }

        // No order, no stock movement, cart untouched.
        assert_eq!(f.orders.list_by_user(user, None, 1, 10).await.unwrap().total, 0);
        assert_eq!(f.catalog.find_by_id(p.id).await.unwrap().unwrap().stock, 3);
        assert_eq!(f.carts.find_by_user(user).await.unwrap().unwrap().total_items, 5);
    }

    #[tokio::test]
    async fn test_checkout_rejects_inactive_product_by_name() {
        let f = fixture();
        let mut p = product("Neem oil", 450, 10);
        p.deactivate();
        f.catalog.insert(&p).await.unwrap();

        let user = Uuid::now_v7();
        let mut cart = Cart::new(user);
        cart.add_item(p.id, 1, "", p.price);
        f.carts.save(&cart).await.unwrap();

        let err = f.service.place_order(user, command()).await.unwrap_err();
        assert_eq!(err.to_string(), "Product Neem oil is no longer available");
    }

    #[tokio::test]
    async fn test_checkout_rejects_vanished_product() {
        let f = fixture();
        let user = Uuid::now_v7();
        let mut cart = Cart::new(user);
        cart.add_item(Uuid::now_v7(), 1, "", Decimal::from(10));
        f.carts.save(&cart).await.unwrap();

        let err = f.service.place_order(user, command()).await.unwrap_err();
        assert!(matches!(err, CheckoutError::ProductGone));
    }

    #[tokio::test]
    async fn test_successful_checkout_invariants() {
        let f = fixture();
        let p = product("DAP", 300, 10);
        f.catalog.insert(&p).await.unwrap();

        let user = Uuid::now_v7();
        let mut cart = Cart::new(user);
        cart.add_item(p.id, 2, "", p.price);
        f.carts.save(&cart).await.unwrap();

        let order = f.service.place_order(user, command()).await.unwrap();

        assert_eq!(order.order_status, OrderStatus::Pending);
        assert_eq!(order.total_items, 2);
        assert_eq!(order.subtotal, Decimal::from(600));
        assert_eq!(order.tax, Decimal::from(108));
        assert_eq!(order.shipping, Decimal::ZERO);
        assert_eq!(order.total_amount, Decimal::from(708));
        assert_eq!(order.estimated_delivery, order.created_at + Duration::days(7));
        assert!(order.order_number.as_str().starts_with("ORD-"));

        // Frozen line item copies the catalog identity at checkout time.
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].name, "DAP");
        assert_eq!(order.items[0].image, "https://img/p.jpg");

        // Stock decremented, cart cleared, order persisted and
        // referenced from the user.
        assert_eq!(f.catalog.find_by_id(p.id).await.unwrap().unwrap().stock, 8);
        let cart = f.carts.find_by_user(user).await.unwrap().unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.total_items, 0);
        assert_eq!(cart.total_price, Decimal::ZERO);
        assert!(f.orders.find_by_id(order.id).await.unwrap().is_some());
        assert_eq!(f.users.orders_for(user).await, vec![order.id]);
    }

    #[tokio::test]
    async fn test_frozen_items_keep_add_time_price() {
        let f = fixture();
        let mut p = product("Sprayer", 400, 5);
        f.catalog.insert(&p).await.unwrap();

        let user = Uuid::now_v7();
        let mut cart = Cart::new(user);
        cart.add_item(p.id, 1, "", p.price);
        f.carts.save(&cart).await.unwrap();

        // Price rises after the item was staged; checkout keeps the
        // add-time price.
        p.price = Decimal::from(999);
        f.catalog.update(&p).await.unwrap();

        let order = f.service.place_order(user, command()).await.unwrap();
        assert_eq!(order.items[0].price, Decimal::from(400));
        assert_eq!(order.subtotal, Decimal::from(400));
    }

    #[tokio::test]
    async fn test_partial_stock_take_is_rolled_back() {
        let f = fixture();
        // One product staged under two sizes; each line passes per-line
        // validation against stock 3, but both together need 4.
        let p = product("Gloves", 100, 3);
        f.catalog.insert(&p).await.unwrap();

        let user = Uuid::now_v7();
        let mut cart = Cart::new(user);
        cart.add_item(p.id, 2, "small", p.price);
        cart.add_item(p.id, 2, "large", p.price);
        f.carts.save(&cart).await.unwrap();

        let err = f.service.place_order(user, command()).await.unwrap_err();
        assert!(matches!(err, CheckoutError::InsufficientStock { .. }));

        // The first line's decrement was compensated.
        assert_eq!(f.catalog.find_by_id(p.id).await.unwrap().unwrap().stock, 3);
        assert_eq!(f.orders.list_by_user(user, None, 1, 10).await.unwrap().total, 0);
        assert_eq!(f.carts.find_by_user(user).await.unwrap().unwrap().total_items, 4);
    }

    #[tokio::test]
    async fn test_cancel_restores_stock() {
        let f = fixture();
        let p = product("Compost", 200, 5);
        f.catalog.insert(&p).await.unwrap();

        let user = Uuid::now_v7();
        let mut cart = Cart::new(user);
        cart.add_item(p.id, 4, "", p.price);
        f.carts.save(&cart).await.unwrap();

        let order = f.service.place_order(user, command()).await.unwrap();
        assert_eq!(f.catalog.find_by_id(p.id).await.unwrap().unwrap().stock, 1);

        let cancelled = f.service.cancel_order(Identity::user(user), order.id).await.unwrap();
        assert_eq!(cancelled.order_status, OrderStatus::Cancelled);
        assert_eq!(f.catalog.find_by_id(p.id).await.unwrap().unwrap().stock, 5);
        assert_eq!(
            f.orders.find_by_id(order.id).await.unwrap().unwrap().order_status,
            OrderStatus::Cancelled
        );
    }

    #[tokio::test]
    async fn test_cancel_blocked_after_shipping() {
        let f = fixture();
        let p = product("Seeds", 50, 10);
        f.catalog.insert(&p).await.unwrap();

        let user = Uuid::now_v7();
        let mut cart = Cart::new(user);
        cart.add_item(p.id, 1, "", p.price);
        f.carts.save(&cart).await.unwrap();

        let mut order = f.service.place_order(user, command()).await.unwrap();
        order.order_status = OrderStatus::Shipped;
        f.orders.update(&order).await.unwrap();

        let err = f.service.cancel_order(Identity::user(user), order.id).await.unwrap_err();
        assert!(matches!(err, CheckoutError::Order(OrderError::CannotCancel { .. })));

        // Neither the order nor the stock moved.
        assert_eq!(
            f.orders.find_by_id(order.id).await.unwrap().unwrap().order_status,
            OrderStatus::Shipped
        );
        assert_eq!(f.catalog.find_by_id(p.id).await.unwrap().unwrap().stock, 9);
    }

    #[tokio::test]
    async fn test_cancel_requires_owner_or_admin() {
        let f = fixture();
        let p = product("Mulch", 80, 10);
        f.catalog.insert(&p).await.unwrap();

        let owner = Uuid::now_v7();
        let mut cart = Cart::new(owner);
        cart.add_item(p.id, 1, "", p.price);
        f.carts.save(&cart).await.unwrap();
        let order = f.service.place_order(owner, command()).await.unwrap();

        let stranger = Identity::user(Uuid::now_v7());
        let err = f.service.cancel_order(stranger, order.id).await.unwrap_err();
        assert!(matches!(err, CheckoutError::Forbidden));

        let admin = Identity::admin(Uuid::now_v7());
        let cancelled = f.service.cancel_order(admin, order.id).await.unwrap();
        assert_eq!(cancelled.order_status, OrderStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_cancel_missing_order() {
        let f = fixture();
        let err = f
            .service
            .cancel_order(Identity::user(Uuid::now_v7()), Uuid::now_v7())
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::NotFound));
    }
}
