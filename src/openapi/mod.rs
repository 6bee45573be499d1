use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Dealership API",
        version = "0.1.0",
        description = r#"
Cars, customers and staff users of a vehicle dealership.

Every endpoint except `POST /users/login` and `GET /health` requires a bearer token:

```
Authorization: Bearer <token>
```

Writes that fail validation answer `400` with one entry per failing field in
`validationErrors`.
        "#
    ),
    paths(
        crate::handlers::cars::create_car,
        crate::handlers::cars::list_cars,
        crate::handlers::cars::get_car,
        crate::handlers::cars::update_car,
        crate::handlers::cars::delete_car,
        crate::handlers::customers::create_customer,
        crate::handlers::customers::list_customers,
        crate::handlers::customers::get_customer,
        crate::handlers::customers::update_customer,
        crate::handlers::customers::delete_customer,
        crate::handlers::users::login,
        crate::handlers::users::me,
        crate::handlers::users::create_user,
        crate::handlers::users::list_users,
        crate::handlers::users::get_user,
        crate::handlers::users::update_user,
        crate::handlers::users::delete_user,
        crate::handlers::health::health_check,
    ),
    components(
        schemas(
            crate::validation::CarCandidate,
            crate::validation::Color,
            crate::validation::Violation,
            crate::entities::car::Model,
            crate::entities::customer::Model,
            crate::entities::user::UserSummary,
            crate::services::CarView,
            crate::services::CustomerInput,
            crate::services::UserInput,
            crate::services::LoginRequest,
            crate::services::LoginResponse,
            crate::errors::ErrorResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "cars", description = "Car inventory"),
        (name = "customers", description = "Customers"),
        (name = "users", description = "Staff accounts and login"),
        (name = "health", description = "Liveness")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())
}
