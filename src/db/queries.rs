// Query helpers for the catalog, reviews, and orders.
//
// Every lookup goes through the public identifier fields (`productId`,
// `reviewId`, `orderId`) rather than SurrealDB record ids.

use crate::db::schema::*;
use crate::error::{ApiError, ApiResult};
use crate::types::{OrderId, ProductId, ReviewId, UserId};
use surrealdb::{Surreal, engine::any::Any};
use tracing::debug;

pub struct QueryBuilder;

impl QueryBuilder {
    pub async fn create_product(db: &Surreal<Any>, data: &ProductCreate) -> ApiResult<ProductRecord> {
        let mut res = db
            .query("CREATE product CONTENT $data")
            .bind(("data", data.clone()))
            .await?;

        let created: Vec<ProductRecord> = res.take(0)?;
        created
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::Internal("failed to create product record".to_string()))
    }

    pub async fn list_products(db: &Surreal<Any>) -> ApiResult<Vec<ProductRecord>> {
        let mut res = db
            .query("SELECT * FROM product ORDER BY createdAt ASC")
            .await?;

        let products: Vec<ProductRecord> = res.take(0)?;
        Ok(products)
    }

    pub async fn find_product(db: &Surreal<Any>, product_id: &ProductId) -> ApiResult<Option<ProductRecord>> {
        let mut res = db
            .query(
                r#"
                SELECT * FROM product
                WHERE productId = $product_id
                LIMIT 1
                "#,
            )
            .bind(("product_id", product_id.clone()))
            .await?;

        let products: Vec<ProductRecord> = res.take(0)?;
        Ok(products.into_iter().next())
    }

    /// Apply a partial update. Returns `None` when the product does not exist.
    pub async fn update_product(
        db: &Surreal<Any>,
        product_id: &ProductId,
        patch: &ProductUpdate,
    ) -> ApiResult<Option<ProductRecord>> {
        let mut res = db
            .query(
                r#"
                UPDATE product MERGE $patch
                WHERE productId = $product_id
                RETURN AFTER
                "#,
            )
            .bind(("patch", patch.clone()))
            .bind(("product_id", product_id.clone()))
            .await?;

        let updated: Vec<ProductRecord> = res.take(0)?;
        Ok(updated.into_iter().next())
    }

    /// Delete a product together with all of its reviews.
    ///
    /// Returns `false` when there was no such product.
    pub async fn delete_product(db: &Surreal<Any>, product_id: &ProductId) -> ApiResult<bool> {
        let mut res = db
            .query(
                r#"
                DELETE review WHERE productId = $product_id;
                DELETE product WHERE productId = $product_id RETURN BEFORE;
                "#,
            )
            .bind(("product_id", product_id.clone()))
            .await?;

        let deleted: Vec<ProductRecord> = res.take(1)?;
        debug!(product_id = %product_id, found = !deleted.is_empty(), "Deleted product");
        Ok(!deleted.is_empty())
    }

    pub async fn create_review(db: &Surreal<Any>, data: &ReviewCreate) -> ApiResult<ReviewRecord> {
        let mut res = db
            .query("CREATE review CONTENT $data")
            .bind(("data", data.clone()))
            .await?;

        let created: Vec<ReviewRecord> = res.take(0)?;
        created
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::Internal("failed to create review record".to_string()))
    }

    /// All reviews, each with its product summary and author name.
    pub async fn list_reviews(db: &Surreal<Any>) -> ApiResult<Vec<ReviewListing>> {
        let mut res = db
            .query(
                r#"
                SELECT *,
                    (SELECT name, company, price FROM product
                        WHERE productId = $parent.productId LIMIT 1)[0] AS product,
                    (SELECT name FROM user
                        WHERE userId = $parent.userId LIMIT 1)[0] AS user
                FROM review
                ORDER BY createdAt ASC
                "#,
            )
            .await?;

        let reviews: Vec<ReviewListing> = res.take(0)?;
        Ok(reviews)
    }

    pub async fn list_reviews_for_product(
        db: &Surreal<Any>,
        product_id: &ProductId,
    ) -> ApiResult<Vec<ReviewRecord>> {
        let mut res = db
            .query(
                r#"
                SELECT * FROM review
                WHERE productId = $product_id
                ORDER BY createdAt ASC
                "#,
            )
            .bind(("product_id", product_id.clone()))
            .await?;

        let reviews: Vec<ReviewRecord> = res.take(0)?;
        Ok(reviews)
    }

    pub async fn find_review(db: &Surreal<Any>, review_id: &ReviewId) -> ApiResult<Option<ReviewRecord>> {
        let mut res = db
            .query("SELECT * FROM review WHERE reviewId = $review_id LIMIT 1")
            .bind(("review_id", review_id.clone()))
            .await?;

        let reviews: Vec<ReviewRecord> = res.take(0)?;
        Ok(reviews.into_iter().next())
    }

    pub async fn find_review_by_product_and_user(
        db: &Surreal<Any>,
        product_id: &ProductId,
        user_id: &UserId,
    ) -> ApiResult<Option<ReviewRecord>> {
        let mut res = db
            .query(
                r#"
                SELECT * FROM review
                WHERE productId = $product_id
                  AND userId = $user_id
                LIMIT 1
                "#,
            )
            .bind(("product_id", product_id.clone()))
            .bind(("user_id", user_id.clone()))
            .await?;

        let reviews: Vec<ReviewRecord> = res.take(0)?;
        Ok(reviews.into_iter().next())
    }

    pub async fn update_review(
        db: &Surreal<Any>,
        review_id: &ReviewId,
        patch: &ReviewUpdate,
    ) -> ApiResult<Option<ReviewRecord>> {
        let mut res = db
            .query(
                r#"
                UPDATE review MERGE $patch
                WHERE reviewId = $review_id
                RETURN AFTER
                "#,
            )
            .bind(("patch", patch.clone()))
            .bind(("review_id", review_id.clone()))
            .await?;

        let updated: Vec<ReviewRecord> = res.take(0)?;
        Ok(updated.into_iter().next())
    }

    pub async fn delete_review(db: &Surreal<Any>, review_id: &ReviewId) -> ApiResult<bool> {
        let mut res = db
            .query("DELETE review WHERE reviewId = $review_id RETURN BEFORE")
            .bind(("review_id", review_id.clone()))
            .await?;

        let deleted: Vec<ReviewRecord> = res.take(0)?;
        Ok(!deleted.is_empty())
    }

    /// Recompute `averageRating` and `numOfReviews` from the product's
    /// current reviews and store them on the product.
    pub async fn refresh_product_rating(
        db: &Surreal<Any>,
        product_id: &ProductId,
    ) -> ApiResult<(f64, u64)> {
        let mut res = db
            .query("SELECT VALUE rating FROM review WHERE productId = $product_id")
            .bind(("product_id", product_id.clone()))
            .await?;

        let ratings: Vec<u64> = res.take(0)?;
        let average = average_rating(&ratings);
        let count = ratings.len() as u64;

        db.query(
            r#"
            UPDATE product SET
                averageRating = $average,
                numOfReviews = $count
            WHERE productId = $product_id
            "#,
        )
        .bind(("average", average))
        .bind(("count", count))
        .bind(("product_id", product_id.clone()))
        .await?
        .check()?;

        debug!(product_id = %product_id, average, count, "Refreshed product rating");
        Ok((average, count))
    }

    pub async fn create_order(db: &Surreal<Any>, data: &OrderCreate) -> ApiResult<OrderRecord> {
        let mut res = db
            .query("CREATE orders CONTENT $data")
            .bind(("data", data.clone()))
            .await?;

        let created: Vec<OrderRecord> = res.take(0)?;
        created
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::Internal("failed to create order record".to_string()))
    }

    pub async fn list_orders(db: &Surreal<Any>) -> ApiResult<Vec<OrderRecord>> {
        let mut res = db
            .query("SELECT * FROM orders ORDER BY createdAt ASC")
            .await?;

        let orders: Vec<OrderRecord> = res.take(0)?;
        Ok(orders)
    }

    pub async fn list_orders_for_user(db: &Surreal<Any>, user_id: &UserId) -> ApiResult<Vec<OrderRecord>> {
        let mut res = db
            .query(
                r#"
                SELECT * FROM orders
                WHERE userId = $user_id
                ORDER BY createdAt ASC
                "#,
            )
            .bind(("user_id", user_id.clone()))
            .await?;

        let orders: Vec<OrderRecord> = res.take(0)?;
        Ok(orders)
    }

    pub async fn find_order(db: &Surreal<Any>, order_id: &OrderId) -> ApiResult<Option<OrderRecord>> {
        let mut res = db
            .query("SELECT * FROM orders WHERE orderId = $order_id LIMIT 1")
            .bind(("order_id", order_id.clone()))
            .await?;

        let orders: Vec<OrderRecord> = res.take(0)?;
        Ok(orders.into_iter().next())
    }

    /// Record the payment intent and move the order to `paid`.
    pub async fn mark_order_paid(
        db: &Surreal<Any>,
        order_id: &OrderId,
        payment_intent_id: &str,
    ) -> ApiResult<Option<OrderRecord>> {
        let mut res = db
            .query(
                r#"
                UPDATE orders SET
                    paymentIntentId = $payment_intent_id,
                    status = $status
                WHERE orderId = $order_id
                RETURN AFTER
                "#,
            )
            .bind(("payment_intent_id", payment_intent_id.to_string()))
            .bind(("status", OrderStatus::Paid))
            .bind(("order_id", order_id.clone()))
            .await?;

        let updated: Vec<OrderRecord> = res.take(0)?;
        Ok(updated.into_iter().next())
    }
}

/// Mean of `ratings` rounded to one decimal place; `0.0` when empty.
pub fn average_rating(ratings: &[u64]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }

    let mean = ratings.iter().sum::<u64>() as f64 / ratings.len() as f64;
    (mean * 10.0).round() / 10.0
}
