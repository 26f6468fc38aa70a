//! HTTP routes, one module per voucher family.

use axum::Router;

pub mod common;
pub mod purchase_vouchers;
pub mod sales_vouchers;
pub mod system;

pub fn router() -> Router {
    Router::new()
        .nest("/purchase-vouchers", purchase_vouchers::router())
        .nest("/sales-vouchers", sales_vouchers::router())
}
