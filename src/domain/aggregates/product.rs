//! Product catalog entity.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::Category;

/// A customer review embedded in the product record.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub user: Uuid,
    /// 1 to 5 inclusive.
    pub rating: u8,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

/// Catalog product. `is_active = false` is a soft delete: the product
/// disappears from listings and cart additions but stays reachable by id
/// so historical checkouts and cancellations still resolve it.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub original_price: Option<Decimal>,
    /// Percentage, 0 to 100.
    pub discount: u32,
    pub category: Category,
    pub subcategory: Option<String>,
    pub image: String,
    pub images: Vec<String>,
    /// Derived mean review rating, one decimal place.
    pub stars: Decimal,
    pub reviews: Vec<Review>,
    pub stock: i32,
    pub is_active: bool,
    pub tags: Vec<String>,
    pub manufacturer: Option<String>,
    pub sku: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn new(name: impl Into<String>, title: impl Into<String>, description: impl Into<String>, price: Decimal, category: Category, image: impl Into<String>, stock: i32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            title: title.into(),
            description: description.into(),
            price,
            original_price: None,
            discount: 0,
            category,
            subcategory: None,
            image: image.into(),
            images: vec![],
            stars: Decimal::ZERO,
            reviews: vec![],
            stock,
            is_active: true,
            tags: vec![],
            manufacturer: None,
            sku: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_stock(&self, quantity: u32) -> bool {
        self.stock >= quantity as i32
    }

    /// Soft delete.
    pub fn deactivate(&mut self) {
        self.is_active = false;
        self.touch();
    }

    pub fn add_review(&mut self, review: Review) {
        self.reviews.push(review);
        self.recalculate_rating();
        self.touch();
    }

    /// Mean of review ratings rounded to one decimal place; zero with no
    /// reviews.
    pub fn recalculate_rating(&mut self) -> Decimal {
        self.stars = if self.reviews.is_empty() {
            Decimal::ZERO
        } else {
            let total: u32 = self.reviews.iter().map(|r| u32::from(r.rating)).sum();
            (Decimal::from(total) / Decimal::from(self.reviews.len() as u32))
                .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
        };
        self.stars
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review(rating: u8) -> Review {
        Review { user: Uuid::now_v7(), rating, comment: "ok".into(), created_at: Utc::now() }
    }

    #[test]
    fn test_rating_is_mean_to_one_decimal() {
        let mut p = Product::new("Urea", "Urea 45kg", "Nitrogen fertilizer", Decimal::from(300), Category::Fertilizer, "https://img/urea.jpg", 10);
        assert_eq!(p.stars, Decimal::ZERO);
        p.add_review(review(4));
        p.add_review(review(5));
        p.add_review(review(4));
        // mean 13/3 = 4.333... -> 4.3
        assert_eq!(p.stars, Decimal::new(43, 1));
    }

    #[test]
    fn test_stock_check() {
        let p = Product::new("Hoe", "Hand hoe", "Steel hand hoe", Decimal::from(120), Category::Tools, "https://img/hoe.jpg", 3);
        assert!(p.has_stock(3));
        assert!(!p.has_stock(4));
    }

    #[test]
    fn test_deactivate_is_soft() {
        let mut p = Product::new("Neem oil", "Neem oil 1L", "Organic pesticide", Decimal::from(450), Category::Organic, "https://img/neem.jpg", 8);
        p.deactivate();
        assert!(!p.is_active);
        assert_eq!(p.stock, 8);
    }
}
