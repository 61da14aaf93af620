//! Menu Item Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Menu item entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct MenuItem {
    pub id: i64,
    pub venue_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub category: Option<String>,
    pub is_available: bool,
    pub display_order: i32,
    /// Position on the printed PDF menu (set by menu import)
    pub pdf_page: Option<i32>,
    pub pdf_x: Option<f64>,
    pub pdf_y: Option<f64>,
    pub pdf_width: Option<f64>,
    pub pdf_height: Option<f64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create menu item payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct MenuItemCreate {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    pub price: Decimal,
    #[validate(length(max = 100))]
    pub category: Option<String>,
    pub is_available: Option<bool>,
    pub display_order: Option<i32>,
}

/// Update menu item payload
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct MenuItemUpdate {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    pub price: Option<Decimal>,
    #[validate(length(max = 100))]
    pub category: Option<String>,
    pub is_available: Option<bool>,
    pub display_order: Option<i32>,
}

/// Customer-facing menu of one venue (available items only)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicMenu {
    pub venue_id: i64,
    pub name: String,
    pub currency: String,
    pub items: Vec<MenuItem>,
}

/// Extract menu items from a page image (data URL or https URL)
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MenuExtractRequest {
    #[validate(length(min = 1))]
    pub image_url: String,
}

/// Pair extracted items with PDF text blocks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuMatchRequest {
    pub items: Vec<crate::menu_import::ScrapedItem>,
    pub blocks: Vec<crate::menu_import::TextBlock>,
    pub threshold: Option<f64>,
    /// Insert or update menu items (by name) with the matched positions
    #[serde(default)]
    pub save: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuMatchResponse {
    pub matched: Vec<crate::menu_import::MatchedItem>,
    pub matched_count: usize,
    pub saved_count: usize,
}
