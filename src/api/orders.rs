// Order endpoints. Every route requires a session.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use super::{AppState, JsonBody, admin_only, authenticated};
use crate::auth::{UserContext, check_permission};
use crate::db::{CartItem, OrderCreate, OrderRecord, OrderStatus, QueryBuilder};
use crate::error::{ApiError, ApiResult};
use crate::types::{OrderId, ProductId};

pub(super) fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            admin_only(state, get(get_all_orders)).merge(authenticated(state, post(create_order))),
        )
        .route(
            "/showAllMyOrders",
            authenticated(state, get(get_current_user_orders)),
        )
        .route(
            "/{id}",
            authenticated(state, get(get_single_order).patch(update_order)),
        )
}

#[derive(Debug, Deserialize)]
struct OrderItemRequest {
    product: ProductId,
    amount: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateOrderRequest {
    #[serde(default)]
    items: Vec<OrderItemRequest>,
    tax: Option<u64>,
    shipping_fee: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateOrderRequest {
    #[serde(default)]
    payment_intent_id: String,
}

/// Stand-in for a payment provider's client secret.
fn client_secret() -> String {
    format!("cs_{}", Uuid::new_v4().simple())
}

fn amount_overflow() -> ApiError {
    ApiError::BadRequest("Order total is too large".to_string())
}

async fn load_order(state: &AppState, id: &str) -> ApiResult<OrderRecord> {
    QueryBuilder::find_order(&state.db, &OrderId::new(id))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No order with id : {}", id)))
}

async fn create_order(
    State(state): State<AppState>,
    context: UserContext,
    JsonBody(body): JsonBody<CreateOrderRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    if body.items.is_empty() {
        return Err(ApiError::BadRequest("No cart items provided".to_string()));
    }
    let (Some(tax), Some(shipping_fee)) = (body.tax, body.shipping_fee) else {
        return Err(ApiError::BadRequest(
            "Please provide tax and shipping fee".to_string(),
        ));
    };

    let mut cart_items = Vec::with_capacity(body.items.len());
    let mut subtotal: u64 = 0;

    // Prices always come from the catalog
    for item in body.items {
        if item.amount == 0 {
            return Err(ApiError::BadRequest(
                "Item amount must be at least 1".to_string(),
            ));
        }

        let product = QueryBuilder::find_product(&state.db, &item.product)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("No product with id : {}", item.product)))?;

        let line_total = product
            .price
            .checked_mul(item.amount)
            .ok_or_else(amount_overflow)?;
        subtotal = subtotal.checked_add(line_total).ok_or_else(amount_overflow)?;

        cart_items.push(CartItem {
            name: product.name,
            image: product.image,
            price: product.price,
            amount: item.amount,
            product_id: product.product_id,
        });
    }

    let total = subtotal
        .checked_add(tax)
        .and_then(|sum| sum.checked_add(shipping_fee))
        .ok_or_else(amount_overflow)?;

    let data = OrderCreate {
        order_id: OrderId::generate(),
        tax,
        shipping_fee,
        subtotal,
        total,
        cart_items,
        status: OrderStatus::Pending,
        user_id: context.user_id().clone(),
        client_secret: client_secret(),
    };

    let order = QueryBuilder::create_order(&state.db, &data).await?;
    info!(order_id = %order.order_id, user_id = %order.user_id, total, "Order created");

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "status": "success",
            "clientSecret": order.client_secret,
            "order": order,
        })),
    ))
}

async fn get_all_orders(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let orders = QueryBuilder::list_orders(&state.db).await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "count": orders.len(),
        "orders": orders,
    })))
}

async fn get_current_user_orders(
    State(state): State<AppState>,
    context: UserContext,
) -> ApiResult<Json<Value>> {
    let orders = QueryBuilder::list_orders_for_user(&state.db, context.user_id()).await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "count": orders.len(),
        "orders": orders,
    })))
}

async fn get_single_order(
    State(state): State<AppState>,
    context: UserContext,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let order = load_order(&state, &id).await?;
    check_permission(&context, &order.user_id)?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "order": order,
    })))
}

async fn update_order(
    State(state): State<AppState>,
    context: UserContext,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<UpdateOrderRequest>,
) -> ApiResult<Json<Value>> {
    if body.payment_intent_id.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Please provide payment intent id".to_string(),
        ));
    }

    let order = load_order(&state, &id).await?;
    check_permission(&context, &order.user_id)?;

    let order = QueryBuilder::mark_order_paid(&state.db, &order.order_id, body.payment_intent_id.trim())
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No order with id : {}", id)))?;
    info!(order_id = %order.order_id, "Order paid");

    Ok(Json(serde_json::json!({
        "status": "success",
        "order": order,
    })))
}
