pub mod cars;
pub mod customers;
pub mod health;
pub mod users;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::{
    auth::{auth_middleware, AuthService},
    db::DbPool,
    services::{CarService, CustomerService, UserService},
    AppState,
};

/// Services used by the HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub cars: Arc<CarService>,
    pub customers: Arc<CustomerService>,
    pub users: Arc<UserService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, auth_service: Arc<AuthService>) -> Self {
        Self {
            cars: Arc::new(CarService::new(db_pool.clone())),
            customers: Arc::new(CustomerService::new(db_pool.clone())),
            users: Arc::new(UserService::new(db_pool, auth_service)),
        }
    }
}

/// Resource routes. Everything except login and health requires a bearer token.
pub fn api_routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .nest("/cars", cars::car_routes())
        .nest("/customers", customers::customer_routes())
        .nest("/users", users::user_routes())
        .route_layer(axum::middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        .route("/users/login", post(users::login))
        .route("/health", get(health::health_check))
        .merge(protected)
}
