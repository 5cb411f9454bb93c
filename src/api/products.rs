// Catalog endpoints. Reads are public, writes are admin-only.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, post},
};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use super::{AppState, JsonBody, admin_only};
use crate::auth::UserContext;
use crate::db::{Category, Company, ProductCreate, ProductUpdate, QueryBuilder};
use crate::error::{ApiError, ApiResult};
use crate::types::ProductId;

const DEFAULT_IMAGE: &str = "/uploads/example.jpeg";
const DEFAULT_COLOR: &str = "#222";
const DEFAULT_INVENTORY: u64 = 15;
const MAX_NAME_LENGTH: usize = 100;
const MAX_DESCRIPTION_LENGTH: usize = 1000;

pub(super) fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(get_all_products).merge(admin_only(state, post(create_product))),
        )
        .route(
            "/{id}",
            get(get_single_product)
                .merge(admin_only(state, patch(update_product).delete(delete_product))),
        )
        .route("/{id}/reviews", get(get_single_product_reviews))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateProductRequest {
    name: String,
    price: u64,
    description: String,
    image: Option<String>,
    category: Category,
    company: Company,
    colors: Option<Vec<String>>,
    #[serde(default)]
    featured: bool,
    #[serde(default)]
    free_shipping: bool,
    inventory: Option<u64>,
}

fn validate_name(name: &str) -> ApiResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("Please provide product name".to_string()));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ApiError::BadRequest(
            "Name cannot be more than 100 characters".to_string(),
        ));
    }
    Ok(name.to_string())
}

fn validate_description(description: &str) -> ApiResult<String> {
    if description.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Please provide product description".to_string(),
        ));
    }
    if description.chars().count() > MAX_DESCRIPTION_LENGTH {
        return Err(ApiError::BadRequest(
            "Description cannot be more than 1000 characters".to_string(),
        ));
    }
    Ok(description.to_string())
}

fn product_not_found(id: &str) -> ApiError {
    ApiError::NotFound(format!("There's no product with this id: {}", id))
}

async fn create_product(
    State(state): State<AppState>,
    context: UserContext,
    JsonBody(body): JsonBody<CreateProductRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let data = ProductCreate {
        product_id: ProductId::generate(),
        name: validate_name(&body.name)?,
        price: body.price,
        description: validate_description(&body.description)?,
        image: body.image.unwrap_or_else(|| DEFAULT_IMAGE.to_string()),
        category: body.category,
        company: body.company,
        colors: body
            .colors
            .filter(|colors| !colors.is_empty())
            .unwrap_or_else(|| vec![DEFAULT_COLOR.to_string()]),
        featured: body.featured,
        free_shipping: body.free_shipping,
        inventory: body.inventory.unwrap_or(DEFAULT_INVENTORY),
        average_rating: 0.0,
        num_of_reviews: 0,
        user_id: context.user_id().clone(),
    };

    let product = QueryBuilder::create_product(&state.db, &data).await?;
    info!(product_id = %product.product_id, "Product created");

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "status": "success",
            "product": product,
        })),
    ))
}

async fn get_all_products(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let products = QueryBuilder::list_products(&state.db).await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "count": products.len(),
        "products": products,
    })))
}

async fn get_single_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let product = QueryBuilder::find_product(&state.db, &ProductId::new(id.as_str()))
        .await?
        .ok_or_else(|| product_not_found(&id))?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "product": product,
    })))
}

async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(mut changes): JsonBody<ProductUpdate>,
) -> ApiResult<Json<Value>> {
    changes.name = changes.name.as_deref().map(validate_name).transpose()?;
    changes.description = changes
        .description
        .as_deref()
        .map(validate_description)
        .transpose()?;

    let product = QueryBuilder::update_product(&state.db, &ProductId::new(id.as_str()), &changes)
        .await?
        .ok_or_else(|| product_not_found(&id))?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "product": product,
    })))
}

async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let product_id = ProductId::new(id.as_str());
    if !QueryBuilder::delete_product(&state.db, &product_id).await? {
        return Err(product_not_found(&id));
    }
    info!(product_id = %product_id, "Product deleted");

    Ok(Json(serde_json::json!({
        "status": "success",
        "message": "Product was successfully deleted!",
    })))
}

async fn get_single_product_reviews(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let product_id = ProductId::new(id.as_str());
    if QueryBuilder::find_product(&state.db, &product_id).await?.is_none() {
        return Err(product_not_found(&id));
    }

    let reviews = QueryBuilder::list_reviews_for_product(&state.db, &product_id).await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "count": reviews.len(),
        "reviews": reviews,
    })))
}
