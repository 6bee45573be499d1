use axum::{
    extract::{Extension, Json, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    auth::AuthUser,
    errors::ServiceError,
    services::{CarView, Includes},
    validation::{validate_at, CarCandidate, Clock},
    AppState,
};

/// Optional relation expansion for car reads
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct IncludeQuery {
    /// Comma-separated subset of `customer`, `created_user`, `updated_user`
    #[param(example = "customer,created_user")]
    pub include: Option<String>,
}

impl IncludeQuery {
    fn includes(&self) -> Includes {
        Includes::parse(self.include.as_deref())
    }
}

#[utoipa::path(
    post,
    path = "/cars",
    request_body = CarCandidate,
    responses(
        (status = 201, description = "Car created; empty body", headers(
            ("location" = String, description = "Path of the new car")
        )),
        (status = 400, description = "One or more fields failed validation", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "cars"
)]
pub async fn create_car(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(candidate): Json<CarCandidate>,
) -> Result<impl IntoResponse, ServiceError> {
    let input = validate_at(&candidate, state.clock.now())?;
    let id = state.services.cars.create(input, &user).await?;
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/cars/{id}"))],
    ))
}

#[utoipa::path(
    get,
    path = "/cars",
    params(IncludeQuery),
    responses(
        (status = 200, description = "All cars ordered by brand, model and id", body = [CarView]),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "cars"
)]
pub async fn list_cars(
    State(state): State<AppState>,
    Query(query): Query<IncludeQuery>,
) -> Result<Json<Vec<CarView>>, ServiceError> {
    Ok(Json(state.services.cars.list(query.includes()).await?))
}

#[utoipa::path(
    get,
    path = "/cars/{id}",
    params(
        ("id" = i32, Path, description = "Car ID"),
        IncludeQuery
    ),
    responses(
        (status = 200, description = "Car fetched", body = CarView),
        (status = 404, description = "Car not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "cars"
)]
pub async fn get_car(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(query): Query<IncludeQuery>,
) -> Result<Json<CarView>, ServiceError> {
    Ok(Json(state.services.cars.get(id, query.includes()).await?))
}

#[utoipa::path(
    put,
    path = "/cars/{id}",
    params(("id" = i32, Path, description = "Car ID")),
    request_body = CarCandidate,
    responses(
        (status = 204, description = "Car replaced"),
        (status = 400, description = "One or more fields failed validation", body = crate::errors::ErrorResponse),
        (status = 404, description = "Car not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "cars"
)]
pub async fn update_car(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i32>,
    Json(candidate): Json<CarCandidate>,
) -> Result<StatusCode, ServiceError> {
    let input = validate_at(&candidate, state.clock.now())?;
    state.services.cars.update(id, input, &user).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/cars/{id}",
    params(("id" = i32, Path, description = "Car ID")),
    responses(
        (status = 204, description = "Car deleted"),
        (status = 404, description = "Car not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "cars"
)]
pub async fn delete_car(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ServiceError> {
    state.services.cars.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn car_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_cars).post(create_car))
        .route("/:id", get(get_car).put(update_car).delete(delete_car))
}
