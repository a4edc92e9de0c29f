//! Order workflow endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use domain::{
    ConfirmOrder, CreateOrder, DeleteOrder, EditOrder, OrderDetails, OrderLineDetails,
    OrderSummary, SubmitMode,
};
use serde::{Deserialize, Serialize};
use store::{BookId, CustomerId, LineItem, OrderId, OrderItemId, OrderQuery, OrderStatus, Store};

use crate::auth::Identity;
use crate::error::ApiError;
use crate::state::AppState;

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct LineItemRequest {
    pub book_id: BookId,
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub items: Vec<LineItemRequest>,
    #[serde(default)]
    pub mode: SubmitMode,
    /// Only used by admins placing an order for a customer.
    pub customer_id: Option<CustomerId>,
}

#[derive(Debug, Deserialize)]
pub struct EditOrderRequest {
    pub items: Vec<LineItemRequest>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryParams {
    pub customer_id: Option<CustomerId>,
    pub status: Option<OrderStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl From<HistoryParams> for OrderQuery {
    fn from(params: HistoryParams) -> Self {
        OrderQuery {
            customer_id: params.customer_id,
            status: params.status,
            from_timestamp: params.from,
            to_timestamp: params.to,
            limit: params.limit,
            offset: params.offset,
        }
    }
}

fn lines(items: Vec<LineItemRequest>) -> Vec<LineItem> {
    items
        .into_iter()
        .map(|item| LineItem::new(item.book_id, item.quantity))
        .collect()
}

// -- Response types --

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub created_at: DateTime<Utc>,
    pub status: OrderStatus,
    pub items: Vec<OrderItemResponse>,
    pub total_cents: i64,
    pub total: String,
}

#[derive(Debug, Serialize)]
pub struct OrderItemResponse {
    pub id: OrderItemId,
    pub book_id: BookId,
    pub title: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

impl From<OrderLineDetails> for OrderItemResponse {
    fn from(line: OrderLineDetails) -> Self {
        Self {
            id: line.item_id,
            book_id: line.book_id,
            title: line.title,
            quantity: line.quantity,
            unit_price_cents: line.unit_price.cents(),
            line_total_cents: line.line_total.cents(),
        }
    }
}

impl From<OrderDetails> for OrderResponse {
    fn from(details: OrderDetails) -> Self {
        Self {
            id: details.id,
            customer_id: details.customer_id,
            created_at: details.created_at,
            status: details.status,
            items: details.lines.into_iter().map(Into::into).collect(),
            total_cents: details.total.cents(),
            total: details.total.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OrderSummaryResponse {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub created_at: DateTime<Utc>,
    pub status: OrderStatus,
    pub line_count: usize,
    pub total_cents: i64,
}

impl From<OrderSummary> for OrderSummaryResponse {
    fn from(summary: OrderSummary) -> Self {
        Self {
            id: summary.id,
            customer_id: summary.customer_id,
            created_at: summary.created_at,
            status: summary.status,
            line_count: summary.line_count,
            total_cents: summary.total.cents(),
        }
    }
}

// -- Handlers --

/// POST /orders: create an order, saving it or confirming it straight away.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(caller): Identity,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let cmd = CreateOrder {
        customer_id: req.customer_id,
        lines: lines(req.items),
        mode: req.mode,
    };
    let details = state.orders.create_order(&caller, cmd).await?;
    Ok((StatusCode::CREATED, Json(details.into())))
}

/// GET /orders: the caller's order history, newest first.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(caller): Identity,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<OrderSummaryResponse>>, ApiError> {
    let summaries = state.orders.order_history(&caller, params.into()).await?;
    Ok(Json(summaries.into_iter().map(Into::into).collect()))
}

/// GET /orders/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(caller): Identity,
    Path(id): Path<i64>,
) -> Result<Json<OrderResponse>, ApiError> {
    let details = state.orders.get_order(&caller, OrderId::new(id)).await?;
    Ok(Json(details.into()))
}

/// PUT /orders/{id}: replace the lines of a saved order.
#[tracing::instrument(skip(state, req))]
pub async fn update<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(caller): Identity,
    Path(id): Path<i64>,
    Json(req): Json<EditOrderRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let cmd = EditOrder::new(OrderId::new(id), lines(req.items));
    let details = state.orders.edit_order(&caller, cmd).await?;
    Ok(Json(details.into()))
}

/// POST /orders/{id}/confirm
#[tracing::instrument(skip(state))]
pub async fn confirm<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(caller): Identity,
    Path(id): Path<i64>,
) -> Result<Json<OrderResponse>, ApiError> {
    let details = state
        .orders
        .confirm_order(&caller, ConfirmOrder::new(OrderId::new(id)))
        .await?;
    Ok(Json(details.into()))
}

/// DELETE /orders/{id}: confirmed orders return their stock first.
#[tracing::instrument(skip(state))]
pub async fn delete<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(caller): Identity,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state
        .orders
        .delete_order(&caller, DeleteOrder::new(OrderId::new(id)))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
