//! Order endpoints: checkout, history, detail, cancellation.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::checkout::PlaceOrder;
use crate::domain::aggregates::{Order, OrderStatus, PaymentMethod, ShippingAddress};
use crate::domain::events::OrderEvent;
use crate::error::{ApiError, FieldError};
use crate::http::auth::AuthUser;
use crate::http::{publish_order_event, AppState};
use crate::store::OrderStore;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddressRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Street is required"))]
    pub street: String,
    #[validate(length(min = 1, message = "City is required"))]
    pub city: String,
    #[validate(length(min = 1, message = "State is required"))]
    pub state: String,
    #[validate(length(min = 1, message = "Zip code is required"))]
    pub zip_code: String,
    pub country: Option<String>,
    #[validate(length(min = 1, message = "Phone is required"))]
    pub phone: String,
}

impl From<ShippingAddressRequest> for ShippingAddress {
    fn from(req: ShippingAddressRequest) -> Self {
        Self {
            name: req.name,
            street: req.street,
            city: req.city,
            state: req.state,
            zip_code: req.zip_code,
            country: req.country.unwrap_or_else(|| "India".to_string()),
            phone: req.phone,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[validate]
    pub shipping_address: ShippingAddressRequest,
    pub payment_method: PaymentMethod,
    #[validate(length(max = 500, message = "Notes cannot be more than 500 characters"))]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub order: Order,
}

pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    req.validate()?;

    let command = PlaceOrder {
        shipping_address: req.shipping_address.into(),
        payment_method: req.payment_method,
        notes: req.notes,
    };
    let order = state.checkout.place_order(user.id, command).await?;

    publish_order_event(
        &state.nats,
        &OrderEvent::Created {
            order_id: order.id,
            user: order.user,
            order_number: order.order_number.to_string(),
            total_amount: order.total_amount,
        },
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(OrderResponse {
            success: true,
            message: Some("Order created successfully".to_string()),
            order,
        }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderListResponse {
    pub success: bool,
    pub count: usize,
    pub total: i64,
    pub total_pages: i64,
    pub current_page: u32,
    pub orders: Vec<Order>,
}

pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<ListParams>,
) -> Result<Json<OrderListResponse>, ApiError> {
    let mut errors: Vec<FieldError> = Vec::new();
    let page = params.page.unwrap_or(1);
    if page < 1 {
        errors.push(FieldError {
            field: "page".to_string(),
            message: "Page must be a positive integer".to_string(),
        });
    }
    let limit = params.limit.unwrap_or(10);
    if !(1..=50).contains(&limit) {
        errors.push(FieldError {
            field: "limit".to_string(),
            message: "Limit must be between 1 and 50".to_string(),
        });
    }
    let status = match params.status.as_deref() {
        None => None,
        Some(value) => match value.parse::<OrderStatus>() {
            Ok(status) => Some(status),
            Err(_) => {
                errors.push(FieldError {
                    field: "status".to_string(),
                    message: "Invalid order status".to_string(),
                });
                None
            }
        },
    };
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let page_result = state.orders.list_by_user(user.id, status, page, limit).await?;
    let total_pages = (page_result.total + limit as i64 - 1) / limit as i64;
    Ok(Json(OrderListResponse {
        success: true,
        count: page_result.orders.len(),
        total: page_result.total,
        total_pages,
        current_page: page,
        orders: page_result.orders,
    }))
}

pub async fn get(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state
        .orders
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Order not found".to_string()))?;
    if order.user != user.id && !user.role.is_admin() {
        return Err(ApiError::Forbidden("Not authorized to access this order".to_string()));
    }
    Ok(Json(OrderResponse { success: true, message: None, order }))
}

pub async fn cancel(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state.checkout.cancel_order(user.identity(), id).await?;

    publish_order_event(
        &state.nats,
        &OrderEvent::Cancelled {
            order_id: order.id,
            user: order.user,
            order_number: order.order_number.to_string(),
        },
    )
    .await;

    Ok(Json(OrderResponse {
        success: true,
        message: Some("Order cancelled successfully".to_string()),
        order,
    }))
}
