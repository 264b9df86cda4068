//! Catalog endpoints: public listing/detail, admin mutations.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::domain::aggregates::Product;
use crate::domain::value_objects::Category;
use crate::error::{ApiError, FieldError};
use crate::http::auth::AuthUser;
use crate::http::AppState;
use crate::store::{CatalogStore, ProductQuery, ProductSort, SortField};

/// Product projection used where the source system populates a product
/// reference: enough to render a line, nothing more.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductBrief {
    pub id: Uuid,
    pub name: String,
    pub title: String,
    pub image: String,
    pub price: Decimal,
    pub stock: i32,
    pub is_active: bool,
}

impl From<&Product> for ProductBrief {
    fn from(p: &Product) -> Self {
        Self {
            id: p.id,
            name: p.name.clone(),
            title: p.title.clone(),
            image: p.image.clone(),
            price: p.price,
            stock: p.stock,
            is_active: p.is_active,
        }
    }
}

/// Listing payload; reviews are excluded for response size.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub id: Uuid,
    pub name: String,
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub original_price: Option<Decimal>,
    pub discount: u32,
    pub category: Category,
    pub subcategory: Option<String>,
    pub image: String,
    pub images: Vec<String>,
    pub stars: Decimal,
    pub stock: i32,
    pub is_active: bool,
    pub tags: Vec<String>,
    pub manufacturer: Option<String>,
    pub sku: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Product> for ProductSummary {
    fn from(p: Product) -> Self {
        Self {
            id: p.id,
            name: p.name,
            title: p.title,
            description: p.description,
            price: p.price,
            original_price: p.original_price,
            discount: p.discount,
            category: p.category,
            subcategory: p.subcategory,
            image: p.image,
            images: p.images,
            stars: p.stars,
            stock: p.stock,
            is_active: p.is_active,
            tags: p.tags,
            manufacturer: p.manufacturer,
            sku: p.sku,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub sort: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub search: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
}

fn parse_sort(value: &str) -> Option<ProductSort> {
    let (descending, field) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value),
    };
    let field = match field {
        "name" => SortField::Name,
        "price" => SortField::Price,
        "stars" => SortField::Stars,
        "createdAt" => SortField::CreatedAt,
        _ => return None,
    };
    Some(ProductSort { field, descending })
}

impl ListParams {
    fn into_query(self) -> Result<ProductQuery, ApiError> {
        let mut errors: Vec<FieldError> = Vec::new();
        let mut push = |field: &str, message: &str| {
            errors.push(FieldError { field: field.to_string(), message: message.to_string() });
        };

        let page = self.page.unwrap_or(1);
        if page < 1 {
            push("page", "Page must be a positive integer");
        }
        let limit = self.limit.unwrap_or(12);
        if !(1..=100).contains(&limit) {
            push("limit", "Limit must be between 1 and 100");
        }
        let sort = match self.sort.as_deref() {
            None => ProductSort::default(),
            Some(value) => match parse_sort(value) {
                Some(sort) => sort,
                None => {
                    push("sort", "Invalid sort field");
                    ProductSort::default()
                }
            },
        };
        let category = match self.category.as_deref() {
            None => None,
            Some(value) => match value.parse::<Category>() {
                Ok(category) => Some(category),
                Err(_) => {
                    push("category", "Invalid category");
                    None
                }
            },
        };
        let min_price = match self.min_price.map(Decimal::try_from).transpose() {
            Ok(price) => price,
            Err(_) => {
                push("minPrice", "Minimum price must be non-negative");
                None
            }
        };
        if min_price.is_some_and(|p| p < Decimal::ZERO) {
            push("minPrice", "Minimum price must be non-negative");
        }
        let max_price = match self.max_price.map(Decimal::try_from).transpose() {
            Ok(price) => price,
            Err(_) => {
                push("maxPrice", "Maximum price must be non-negative");
                None
            }
        };
        if max_price.is_some_and(|p| p < Decimal::ZERO) {
            push("maxPrice", "Maximum price must be non-negative");
        }

        if !errors.is_empty() {
            return Err(ApiError::Validation(errors));
        }
        Ok(ProductQuery {
            category,
            subcategory: self.subcategory,
            search: self.search,
            min_price,
            max_price,
            sort,
            page,
            limit,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductListResponse {
    pub success: bool,
    pub count: usize,
    pub total: i64,
    pub total_pages: i64,
    pub current_page: u32,
    pub products: Vec<ProductSummary>,
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ProductListResponse>, ApiError> {
    let query = params.into_query()?;
    let page = state.catalog.list(&query).await?;
    let total_pages = (page.total + query.limit as i64 - 1) / query.limit as i64;
    let products: Vec<ProductSummary> = page.products.into_iter().map(Into::into).collect();
    Ok(Json(ProductListResponse {
        success: true,
        count: products.len(),
        total: page.total,
        total_pages,
        current_page: query.page,
        products,
    }))
}

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub product: Product,
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product = state
        .catalog
        .find_by_id(id)
        .await?
        .filter(|p| p.is_active)
        .ok_or_else(|| ApiError::NotFound("Product not found".to_string()))?;
    Ok(Json(ProductResponse { success: true, message: None, product }))
}

fn validate_non_negative(price: &Decimal) -> Result<(), ValidationError> {
    if price.is_sign_negative() {
        let mut err = ValidationError::new("min");
        err.message = Some("Price must be a positive number".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 100, message = "Name is required and must be less than 100 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 150, message = "Title is required and must be less than 150 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 1000, message = "Description is required and must be less than 1000 characters"))]
    pub description: String,
    #[validate(custom = "validate_non_negative")]
    pub price: Decimal,
    pub original_price: Option<Decimal>,
    #[validate(range(min = 0, max = 100, message = "Discount must be between 0 and 100"))]
    pub discount: Option<u32>,
    pub category: Category,
    pub subcategory: Option<String>,
    #[validate(url(message = "Image must be a valid URL"))]
    pub image: String,
    pub images: Option<Vec<String>>,
    #[validate(range(min = 0, message = "Stock must be a non-negative integer"))]
    pub stock: i32,
    pub tags: Option<Vec<String>>,
    pub manufacturer: Option<String>,
    pub sku: Option<String>,
}

pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ProductResponse>), ApiError> {
    user.require_admin()?;
    req.validate()?;

    let mut product = Product::new(
        req.name,
        req.title,
        req.description,
        req.price,
        req.category,
        req.image,
        req.stock,
    );
    product.original_price = req.original_price;
    product.discount = req.discount.unwrap_or(0);
    product.subcategory = req.subcategory;
    product.images = req.images.unwrap_or_default();
    product.tags = req.tags.unwrap_or_default();
    product.manufacturer = req.manufacturer;
    product.sku = req.sku;

    state.catalog.insert(&product).await?;
    Ok((
        StatusCode::CREATED,
        Json(ProductResponse {
            success: true,
            message: Some("Product created successfully".to_string()),
            product,
        }),
    ))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be less than 100 characters"))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 150, message = "Title must be less than 150 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 1000, message = "Description must be less than 1000 characters"))]
    pub description: Option<String>,
    #[validate(custom = "validate_non_negative")]
    pub price: Option<Decimal>,
    pub original_price: Option<Decimal>,
    #[validate(range(min = 0, max = 100, message = "Discount must be between 0 and 100"))]
    pub discount: Option<u32>,
    pub category: Option<Category>,
    pub subcategory: Option<String>,
    #[validate(url(message = "Image must be a valid URL"))]
    pub image: Option<String>,
    pub images: Option<Vec<String>>,
    #[validate(range(min = 0, message = "Stock must be a non-negative integer"))]
    pub stock: Option<i32>,
    pub tags: Option<Vec<String>>,
    pub manufacturer: Option<String>,
    pub sku: Option<String>,
    pub is_active: Option<bool>,
}

pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateProductRequest>,
) -> Result<Json<ProductResponse>, ApiError> {
    user.require_admin()?;
    req.validate()?;

    let mut product = state
        .catalog
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found".to_string()))?;

    if let Some(name) = req.name {
        product.name = name;
    }
    if let Some(title) = req.title {
        product.title = title;
    }
    if let Some(description) = req.description {
        product.description = description;
    }
    if let Some(price) = req.price {
        product.price = price;
    }
    if req.original_price.is_some() {
        product.original_price = req.original_price;
    }
    if let Some(discount) = req.discount {
        product.discount = discount;
    }
    if let Some(category) = req.category {
        product.category = category;
    }
    if req.subcategory.is_some() {
        product.subcategory = req.subcategory;
    }
    if let Some(image) = req.image {
        product.image = image;
    }
    if let Some(images) = req.images {
        product.images = images;
    }
    if let Some(stock) = req.stock {
        product.stock = stock;
    }
    if let Some(tags) = req.tags {
        product.tags = tags;
    }
    if req.manufacturer.is_some() {
        product.manufacturer = req.manufacturer;
    }
    if req.sku.is_some() {
        product.sku = req.sku;
    }
    if let Some(is_active) = req.is_active {
        product.is_active = is_active;
    }
    product.touch();

    if !state.catalog.update(&product).await? {
        return Err(ApiError::NotFound("Product not found".to_string()));
    }
    Ok(Json(ProductResponse {
        success: true,
        message: Some("Product updated successfully".to_string()),
        product,
    }))
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

pub async fn remove(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    user.require_admin()?;

    let mut product = state
        .catalog
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found".to_string()))?;
    product.deactivate();
    state.catalog.update(&product).await?;
    Ok(Json(MessageResponse {
        success: true,
        message: "Product deleted successfully".to_string(),
    }))
}
