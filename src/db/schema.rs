use serde::{Deserialize, Serialize};
use surrealdb::sql::Datetime;

use crate::types::{OrderId, ProductId, ReviewId, Role, UserId};

/// Persisted account (table: `user`).
///
/// Field names are camelCase both in the store and on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    /// Stable identifier, also carried in session tokens.
    pub user_id: UserId,
    /// Display name.
    pub name: String,
    /// Unique, lower-cased email.
    pub email: String,
    /// bcrypt hash of the password. Never serialized into responses;
    /// handlers answer with [`UserProfile`] instead.
    #[serde(rename = "password")]
    pub password_hash: String,
    /// Account role.
    #[serde(default)]
    pub role: Role,
    /// When this record was first created.
    pub created_at: Option<Datetime>,
    /// When this record was last updated.
    pub updated_at: Option<Datetime>,
}

/// Payload used when inserting a new account.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCreate {
    pub user_id: UserId,
    pub name: String,
    pub email: String,
    #[serde(rename = "password")]
    pub password_hash: String,
    pub role: Role,
}

/// Public view of an account, without the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<&UserRecord> for UserProfile {
    fn from(user: &UserRecord) -> Self {
        Self {
            user_id: user.user_id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Office,
    Kitchen,
    Bedroom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Company {
    Ikea,
    Liddy,
    Marcos,
}

/// Persisted catalog product (table: `product`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    pub product_id: ProductId,
    pub name: String,
    /// Price in minor currency units.
    pub price: u64,
    pub description: String,
    pub image: String,
    pub category: Category,
    pub company: Company,
    pub colors: Vec<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub free_shipping: bool,
    pub inventory: u64,
    /// Mean review rating, one decimal place.
    #[serde(default)]
    pub average_rating: f64,
    #[serde(default)]
    pub num_of_reviews: u64,
    /// Account that created the product.
    pub user_id: UserId,
    pub created_at: Option<Datetime>,
    pub updated_at: Option<Datetime>,
}

/// Payload used when inserting a new product.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductCreate {
    pub product_id: ProductId,
    pub name: String,
    pub price: u64,
    pub description: String,
    pub image: String,
    pub category: Category,
    pub company: Company,
    pub colors: Vec<String>,
    pub featured: bool,
    pub free_shipping: bool,
    pub inventory: u64,
    pub average_rating: f64,
    pub num_of_reviews: u64,
    pub user_id: UserId,
}

/// Partial product update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<Company>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub free_shipping: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inventory: Option<u64>,
}

/// Persisted product review (table: `review`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRecord {
    pub review_id: ReviewId,
    pub rating: u8,
    pub title: String,
    pub comment: String,
    /// Author; the owner checked by the ownership gate.
    pub user_id: UserId,
    pub product_id: ProductId,
    pub created_at: Option<Datetime>,
    pub updated_at: Option<Datetime>,
}

/// Product fields shown alongside a review in listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewedProduct {
    pub name: String,
    pub company: Company,
    pub price: u64,
}

/// Author fields shown alongside a review in listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewAuthor {
    pub name: String,
}

/// A review with its product and author filled in.
///
/// `product` or `user` is `None` when the referenced row is gone.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewListing {
    pub review_id: ReviewId,
    pub rating: u8,
    pub title: String,
    pub comment: String,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub created_at: Option<Datetime>,
    pub updated_at: Option<Datetime>,
    #[serde(default)]
    pub product: Option<ReviewedProduct>,
    #[serde(default)]
    pub user: Option<ReviewAuthor>,
}

/// Payload used when inserting a new review.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewCreate {
    pub review_id: ReviewId,
    pub rating: u8,
    pub title: String,
    pub comment: String,
    pub user_id: UserId,
    pub product_id: ProductId,
}

/// Partial review update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Failed,
    Paid,
    Delivered,
    Cancelled,
}

/// A single line of an order, priced from the catalog at order time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub name: String,
    pub image: String,
    pub price: u64,
    pub amount: u64,
    pub product_id: ProductId,
}

/// Persisted order (table: `orders`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    pub order_id: OrderId,
    pub tax: u64,
    pub shipping_fee: u64,
    pub subtotal: u64,
    pub total: u64,
    pub cart_items: Vec<CartItem>,
    #[serde(default)]
    pub status: OrderStatus,
    /// Customer; the owner checked by the ownership gate.
    pub user_id: UserId,
    pub client_secret: String,
    pub payment_intent_id: Option<String>,
    pub created_at: Option<Datetime>,
    pub updated_at: Option<Datetime>,
}

/// Payload used when inserting a new order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreate {
    pub order_id: OrderId,
    pub tax: u64,
    pub shipping_fee: u64,
    pub subtotal: u64,
    pub total: u64,
    pub cart_items: Vec<CartItem>,
    pub status: OrderStatus,
    pub user_id: UserId,
    pub client_secret: String,
}
