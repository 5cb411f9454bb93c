// Review endpoints. Any write refreshes the product's rating summary.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, post},
};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use super::{AppState, JsonBody, authenticated};
use crate::auth::{UserContext, check_permission};
use crate::db::{QueryBuilder, ReviewCreate, ReviewRecord, ReviewUpdate};
use crate::error::{ApiError, ApiResult};
use crate::types::{ProductId, ReviewId};

const MAX_TITLE_LENGTH: usize = 100;

pub(super) fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(get_all_reviews).merge(authenticated(state, post(create_review))),
        )
        .route(
            "/{id}",
            get(get_single_review)
                .merge(authenticated(state, patch(update_review).delete(delete_review))),
        )
}

#[derive(Debug, Deserialize)]
struct CreateReviewRequest {
    product: ProductId,
    rating: u8,
    #[serde(default)]
    title: String,
    #[serde(default)]
    comment: String,
}

fn validate_rating(rating: u8) -> ApiResult<u8> {
    if !(1..=5).contains(&rating) {
        return Err(ApiError::BadRequest(
            "Rating must be between 1 and 5".to_string(),
        ));
    }
    Ok(rating)
}

fn validate_title(title: &str) -> ApiResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ApiError::BadRequest("Please provide review title".to_string()));
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(ApiError::BadRequest(
            "Title cannot be more than 100 characters".to_string(),
        ));
    }
    Ok(title.to_string())
}

fn validate_comment(comment: &str) -> ApiResult<String> {
    if comment.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Please provide review description".to_string(),
        ));
    }
    Ok(comment.to_string())
}

async fn load_review(state: &AppState, id: &str) -> ApiResult<ReviewRecord> {
    QueryBuilder::find_review(&state.db, &ReviewId::new(id))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No review with id : {}", id)))
}

async fn create_review(
    State(state): State<AppState>,
    context: UserContext,
    JsonBody(body): JsonBody<CreateReviewRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let data = ReviewCreate {
        review_id: ReviewId::generate(),
        rating: validate_rating(body.rating)?,
        title: validate_title(&body.title)?,
        comment: validate_comment(&body.comment)?,
        user_id: context.user_id().clone(),
        product_id: body.product,
    };

    if QueryBuilder::find_product(&state.db, &data.product_id).await?.is_none() {
        return Err(ApiError::NotFound(format!(
            "There's no product with such id: {}",
            data.product_id
        )));
    }

    let already_submitted =
        QueryBuilder::find_review_by_product_and_user(&state.db, &data.product_id, &data.user_id)
            .await?;
    if already_submitted.is_some() {
        return Err(ApiError::BadRequest(
            "You already submitted a review for this product".to_string(),
        ));
    }

    let review = QueryBuilder::create_review(&state.db, &data).await?;
    QueryBuilder::refresh_product_rating(&state.db, &review.product_id).await?;
    info!(review_id = %review.review_id, product_id = %review.product_id, "Review created");

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "status": "success",
            "review": review,
        })),
    ))
}

async fn get_all_reviews(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let reviews = QueryBuilder::list_reviews(&state.db).await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "count": reviews.len(),
        "reviews": reviews,
    })))
}

async fn get_single_review(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let review = load_review(&state, &id).await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "review": review,
    })))
}

async fn update_review(
    State(state): State<AppState>,
    context: UserContext,
    Path(id): Path<String>,
    JsonBody(changes): JsonBody<ReviewUpdate>,
) -> ApiResult<Json<Value>> {
    let review = load_review(&state, &id).await?;
    check_permission(&context, &review.user_id)?;

    let changes = ReviewUpdate {
        rating: changes.rating.map(validate_rating).transpose()?,
        title: changes.title.as_deref().map(validate_title).transpose()?,
        comment: changes.comment.as_deref().map(validate_comment).transpose()?,
    };

    let updated = QueryBuilder::update_review(&state.db, &review.review_id, &changes)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No review with id : {}", id)))?;
    QueryBuilder::refresh_product_rating(&state.db, &updated.product_id).await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "review": updated,
    })))
}

async fn delete_review(
    State(state): State<AppState>,
    context: UserContext,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let review = load_review(&state, &id).await?;
    check_permission(&context, &review.user_id)?;

    QueryBuilder::delete_review(&state.db, &review.review_id).await?;
    QueryBuilder::refresh_product_rating(&state.db, &review.product_id).await?;
    info!(review_id = %review.review_id, "Review deleted");

    Ok(Json(serde_json::json!({
        "status": "success",
        "message": "Review successfully deleted",
    })))
}
