//! Server-rendered pages.
//!
//! Route table:
//!
//! | Path                      | Handler                         |
//! |---------------------------|---------------------------------|
//! | `/`                       | [`redirects::root`]             |
//! | `/flights`                | [`redirects::flights`]          |
//! | `/flights/new`            | [`redirects::new_flight`]       |
//! | `/login`                  | [`login::page`]                 |
//! | `/dashboard`              | [`dashboard::overview`]         |
//! | `/dashboard/flights`      | [`flights::list`]               |
//! | `/dashboard/flights/new`  | [`flights::new_form`] / [`flights::create`] |
//!
//! Everything under `/dashboard` sits behind the error boundary.

pub mod dashboard;
pub mod error_boundary;
pub mod flights;
pub mod login;
pub mod redirects;
pub mod views;

use axum::{routing::get, Router};
use tower_http::catch_panic::CatchPanicLayer;

use crate::AppState;

pub fn routes() -> Router<AppState> {
    let dashboard = Router::new()
        .route("/dashboard", get(dashboard::overview))
        .route("/dashboard/flights", get(flights::list))
        .route(
            "/dashboard/flights/new",
            get(flights::new_form).post(flights::create),
        )
        .layer(CatchPanicLayer::custom(error_boundary::handle_panic));

    Router::new()
        .route("/", get(redirects::root))
        .route("/flights", get(redirects::flights))
        .route("/flights/new", get(redirects::new_flight))
        .route("/login", get(login::page))
        .merge(dashboard)
}
