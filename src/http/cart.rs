//! Cart endpoints. All routes act on the authenticated user's own cart,
//! which is created lazily on first access.

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::aggregates::Cart;
use crate::error::ApiError;
use crate::http::auth::AuthUser;
use crate::http::products::ProductBrief;
use crate::http::AppState;
use crate::store::{CartStore, CatalogStore};

/// Cart payload with each line's product reference populated the way the
/// storefront expects; a vanished product serializes as null.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub id: Uuid,
    pub user: Uuid,
    pub items: Vec<CartItemView>,
    pub total_items: u32,
    pub total_price: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemView {
    pub product: Option<ProductBrief>,
    pub quantity: u32,
    pub size: String,
    pub price: Decimal,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub cart: CartView,
}

async fn view(state: &AppState, cart: &Cart) -> Result<CartView, ApiError> {
    let mut items = Vec::with_capacity(cart.items.len());
    for item in &cart.items {
        let product = state
            .catalog
            .find_by_id(item.product)
            .await?
            .as_ref()
            .map(ProductBrief::from);
        items.push(CartItemView {
            product,
            quantity: item.quantity,
            size: item.size.clone(),
            price: item.price,
            added_at: item.added_at,
        });
    }
    Ok(CartView {
        id: cart.id,
        user: cart.user,
        items,
        total_items: cart.total_items,
        total_price: cart.total_price,
        created_at: cart.created_at,
        updated_at: cart.updated_at,
    })
}

async fn respond(state: &AppState, cart: &Cart, message: &str) -> Result<Json<CartResponse>, ApiError> {
    Ok(Json(CartResponse {
        success: true,
        message: Some(message.to_string()),
        cart: view(state, cart).await?,
    }))
}

pub async fn get(State(state): State<AppState>, user: AuthUser) -> Result<Json<CartResponse>, ApiError> {
    let cart = match state.carts.find_by_user(user.id).await? {
        Some(cart) => cart,
        None => {
            let cart = Cart::new(user.id);
            state.carts.save(&cart).await?;
            cart
        }
    };
    Ok(Json(CartResponse { success: true, message: None, cart: view(&state, &cart).await? }))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be a positive integer"))]
    pub quantity: Option<u32>,
    pub size: Option<String>,
}

pub async fn add(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<AddToCartRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    req.validate()?;
    let quantity = req.quantity.unwrap_or(1);
    let size = req.size.as_deref().unwrap_or("").trim().to_string();

    let product = state
        .catalog
        .find_by_id(req.product_id)
        .await?
        .filter(|p| p.is_active)
        .ok_or_else(|| ApiError::NotFound("Product not found".to_string()))?;
    if !product.has_stock(quantity) {
        return Err(ApiError::BadRequest("Insufficient stock available".to_string()));
    }

    let mut cart = match state.carts.find_by_user(user.id).await? {
        Some(cart) => cart,
        None => Cart::new(user.id),
    };
    cart.add_item(product.id, quantity, &size, product.price);
    state.carts.save(&cart).await?;
    respond(&state, &cart, "Item added to cart successfully").await
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCartRequest {
    pub product_id: Uuid,
    pub quantity: u32,
    pub size: Option<String>,
}

pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<UpdateCartRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    let size = req.size.as_deref().unwrap_or("").trim().to_string();

    let mut cart = state
        .carts
        .find_by_user(user.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Cart not found".to_string()))?;

    if req.quantity == 0 {
        cart.remove_item(req.product_id, &size);
    } else {
        let product = state
            .catalog
            .find_by_id(req.product_id)
            .await?
            .filter(|p| p.is_active)
            .ok_or_else(|| ApiError::NotFound("Product not found".to_string()))?;
        if !product.has_stock(req.quantity) {
            return Err(ApiError::BadRequest("Insufficient stock available".to_string()));
        }
        cart.update_item_quantity(req.product_id, req.quantity, &size)?;
    }

    state.carts.save(&cart).await?;
    respond(&state, &cart, "Cart updated successfully").await
}

#[derive(Debug, Deserialize)]
pub struct RemoveParams {
    pub size: Option<String>,
}

pub async fn remove(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<Uuid>,
    Query(params): Query<RemoveParams>,
) -> Result<Json<CartResponse>, ApiError> {
    let size = params.size.as_deref().unwrap_or("").trim().to_string();

    let mut cart = state
        .carts
        .find_by_user(user.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Cart not found".to_string()))?;
    cart.remove_item(product_id, &size);
    state.carts.save(&cart).await?;
    respond(&state, &cart, "Item removed from cart successfully").await
}

pub async fn clear(State(state): State<AppState>, user: AuthUser) -> Result<Json<CartResponse>, ApiError> {
    let mut cart = state
        .carts
        .find_by_user(user.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Cart not found".to_string()))?;
    cart.clear();
    state.carts.save(&cart).await?;
    respond(&state, &cart, "Cart cleared successfully").await
}
