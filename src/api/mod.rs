//! HTTP API routes

pub mod ai;
pub mod analytics;
pub mod auth;
pub mod cart;
pub mod categories;
pub mod coupons;
pub mod discounts;
pub mod health;
pub mod images;
pub mod messages;
pub mod orders;
pub mod payments;
pub mod products;
pub mod reviews;
pub mod users;

use axum::routing::{delete, get, patch, post, put};
use axum::{Router, middleware};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::auth::jwt::{admin_middleware, auth_middleware};
use crate::auth::rate_limit::{signin_rate_limit, signup_rate_limit};
use crate::error::{AppError, ErrorCode};
use crate::state::AppState;

pub type ApiResult<T> = Result<axum::Json<T>, AppError>;

/// Every method the routers below register; preflight must admit them all.
const CORS_METHODS: [http::Method; 5] = [
    http::Method::GET,
    http::Method::POST,
    http::Method::PUT,
    http::Method::PATCH,
    http::Method::DELETE,
];

/// Funnel unexpected errors into a logged InternalError
pub fn internal<E: std::fmt::Display>(e: E) -> AppError {
    tracing::error!("Internal error: {e}");
    AppError::new(ErrorCode::InternalError)
}

/// Create the combined router
pub fn create_router(state: AppState) -> Router {
    let signin_limited = Router::new()
        .route("/auth/signin", post(auth::signin))
        .route("/auth/forgot-password", post(auth::forgot_password))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            signin_rate_limit,
        ));

    let signup_limited = Router::new()
        .route("/auth/signup", post(auth::signup))
        .route("/auth/resend-code", post(auth::resend_code))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            signup_rate_limit,
        ));

    let public = Router::new()
        .route("/auth/verify-email", post(auth::verify_email))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/signout", post(auth::signout))
        .route("/auth/reset-password", post(auth::reset_password))
        .route("/category/all", get(categories::list))
        .route("/category/{id}", get(categories::get))
        .route("/product/all", get(products::list))
        .route("/product/{id}", get(products::get))
        .route("/product/images/{key}", get(images::presigned_url))
        .route("/review/{id}", get(reviews::list_for_product))
        .route("/message/send", post(messages::create))
        .route("/order/webhook", post(orders::webhook));

    let authed = Router::new()
        .route(
            "/user/me",
            get(users::me)
                .patch(users::update_me)
                .delete(users::delete_account),
        )
        .route("/user/change-password", patch(users::change_password))
        .route("/cart", get(cart::get))
        .route("/cart/add", post(cart::add))
        .route("/cart/update", put(cart::update))
        .route("/cart/remove/{product_id}", delete(cart::remove))
        .route("/cart/clear", delete(cart::clear))
        .route("/discount/apply", post(discounts::apply))
        .route("/coupon/apply", post(coupons::apply))
        .route("/order/cash/{cart_id}", post(orders::create_cash))
        .route("/order/checkout/{cart_id}", post(orders::create_checkout))
        .route("/order/confirm", get(orders::confirm))
        .route("/order/mine", get(orders::list_mine))
        .route("/order/{id}", get(orders::get))
        .route("/payment/mine", get(payments::list_mine))
        .route("/payment/{id}", get(payments::get))
        .route(
            "/review/{id}",
            post(reviews::create)
                .patch(reviews::update)
                .delete(reviews::delete),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let admin = Router::new()
        .route("/category/add", post(categories::create))
        .route(
            "/category/{id}",
            patch(categories::update).delete(categories::delete),
        )
        .route("/product/add", post(products::create))
        .route(
            "/product/{id}",
            patch(products::update).delete(products::delete),
        )
        .route("/product/images", post(images::upload))
        .route("/ai/description", post(ai::description))
        .route("/ai/seo", post(ai::seo))
        .route("/ai/marketing-plan", post(ai::marketing_plan))
        .route("/discount/all", get(discounts::list))
        .route("/discount/add", post(discounts::create))
        .route(
            "/discount/{id}",
            patch(discounts::update).delete(discounts::delete),
        )
        .route("/coupon/all", get(coupons::list))
        .route("/coupon/add", post(coupons::create))
        .route(
            "/coupon/{id}",
            patch(coupons::update).delete(coupons::delete),
        )
        .route("/order/all", get(orders::list_all))
        .route("/order/{id}/status", patch(orders::update_status))
        .route("/payment/refund/{id}", post(payments::refund))
        .route("/message/all", get(messages::list))
        .route(
            "/message/{id}",
            get(messages::get).delete(messages::delete),
        )
        .route("/message/{id}/response", post(messages::respond))
        .route("/analytics/overview", get(analytics::overview))
        .route("/analytics/sales", get(analytics::sales))
        .route("/analytics/top-products", get(analytics::top_products))
        .route("/analytics/products", get(analytics::products))
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::exact(
            state
                .frontend_origin
                .parse()
                .unwrap_or_else(|_| http::HeaderValue::from_static("https://neststore.app")),
        ))
        .allow_methods(CORS_METHODS)
        .allow_headers([http::header::AUTHORIZATION, http::header::CONTENT_TYPE])
        .allow_credentials(true);

    Router::new()
        .route("/health", get(health::health_check))
        .merge(signin_limited)
        .merge(signup_limited)
        .merge(public)
        .merge(authed)
        .merge(admin)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(std::time::Duration::from_secs(30)))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cors_covers_every_registered_method() {
        // /cart/update is PUT; the rest of the API uses the other four.
        for method in [
            http::Method::GET,
            http::Method::POST,
            http::Method::PUT,
            http::Method::PATCH,
            http::Method::DELETE,
        ] {
            assert!(CORS_METHODS.contains(&method), "missing {method}");
        }
    }
}
