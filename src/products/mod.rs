// Product catalog: public reads, administrator-only writes

pub mod handlers;
pub mod models;


use axum::{
    routing::{get, post, put},
    Router,
};

use crate::{
    auth::{with_role, AuthState, Role},
    AppState,
};

pub use models::{CreateProduct, Product, UpdateProduct};

/// Routes under /api/products
pub fn router(auth: &AuthState) -> Router<AppState> {
    let public: Router<AppState> = Router::new()
        .route("/api/products", get(handlers::list_products))
        .route("/api/products/:id", get(handlers::get_product));

    let admin: Router<AppState> = with_role(
        Router::new()
            .route("/api/products", post(handlers::create_product))
            .route(
                "/api/products/:id",
                put(handlers::update_product).delete(handlers::delete_product),
            ),
        auth,
        Role::Admin,
    );

    public.merge(admin)
}
