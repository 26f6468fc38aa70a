//! `/purchase-vouchers` handlers.

use std::sync::Arc;

use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde_json::json;

use kosh_core::VoucherId;
use kosh_vouchers::VoucherType;

use crate::app::dto::{self, VoucherRequest};
use crate::app::errors;
use crate::app::routes::common::{self, ListParams, ScopeParams};
use crate::app::services::AppServices;

const KIND: VoucherType = VoucherType::Purchase;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create).get(list))
        .route("/:id", get(fetch).put(update).delete(remove))
}

async fn create(
    Extension(services): Extension<Arc<AppServices>>,
    Query(params): Query<ScopeParams>,
    Json(req): Json<VoucherRequest>,
) -> Response {
    let scope = match common::resolve_scope(&params, Some(&req)) {
        Ok(scope) => scope,
        Err(resp) => return resp,
    };
    let draft = req.without_sales_extras().into_draft();
    match services.post_voucher(&scope, KIND, draft).await {
        Ok(created) => {
            (StatusCode::CREATED, Json(dto::created_json(&created))).into_response()
        }
        Err(err) => err.into_response(),
    }
}

async fn list(
    Extension(services): Extension<Arc<AppServices>>,
    Query(params): Query<ListParams>,
) -> Response {
    let scope = match common::resolve_scope(&params.scope(), None) {
        Ok(scope) => scope,
        Err(resp) => return resp,
    };
    match services.list_vouchers(&scope, KIND, params.filter()).await {
        Ok(headers) => {
            let data: Vec<_> = headers.iter().map(dto::header_json).collect();
            Json(json!({ "success": true, "data": data })).into_response()
        }
        Err(err) => err.into_response(),
    }
}

async fn fetch(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<i64>,
    Query(params): Query<ScopeParams>,
) -> Response {
    let scope = match common::resolve_scope(&params, None) {
        Ok(scope) => scope,
        Err(resp) => return resp,
    };
    match services.get_voucher(&scope, KIND, VoucherId::new(id)).await {
        Ok(Some(voucher)) => {
            Json(json!({ "success": true, "data": dto::voucher_json(&voucher) })).into_response()
        }
        Ok(None) => errors::envelope(StatusCode::NOT_FOUND, "voucher not found"),
        Err(err) => err.into_response(),
    }
}

async fn update(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<i64>,
    Query(params): Query<ScopeParams>,
    Json(req): Json<VoucherRequest>,
) -> Response {
    let scope = match common::resolve_scope(&params, Some(&req)) {
        Ok(scope) => scope,
        Err(resp) => return resp,
    };
    let draft = req.without_sales_extras().into_draft();
    match services.update_voucher(&scope, KIND, VoucherId::new(id), draft).await {
        Ok(()) => Json(json!({ "success": true })).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn remove(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<i64>,
    Query(params): Query<ScopeParams>,
) -> Response {
    let scope = match common::resolve_scope(&params, None) {
        Ok(scope) => scope,
        Err(resp) => return resp,
    };
    match services.delete_voucher(&scope, KIND, VoucherId::new(id)).await {
        Ok(()) => Json(json!({ "success": true })).into_response(),
        Err(err) => err.into_response(),
    }
}
