use std::sync::Arc;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    Set, Unchanged,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    auth::{hash_password, verify_password, AuthService, AuthUser},
    db::DbPool,
    entities::user::{self, UserSummary},
    errors::ServiceError,
};

const DUPLICATE_USER: &str = "Username or e-mail already registered";

/// Body accepted when creating or replacing a user
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UserInput {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Full name must have between 1 and 100 characters."
    ))]
    pub fullname: String,
    #[validate(length(
        min = 3,
        max = 20,
        message = "Username must have between 3 and 20 characters."
    ))]
    pub username: String,
    #[validate(email(message = "Invalid e-mail address."), length(max = 100))]
    pub email: String,
    /// Required on create; on update an absent password keeps the current one
    #[serde(default)]
    #[validate(length(min = 6, max = 200, message = "Password must have at least 6 characters."))]
    pub password: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserSummary,
}

/// Service for managing users and credentials
#[derive(Clone)]
pub struct UserService {
    db: Arc<DbPool>,
    auth: Arc<AuthService>,
}

impl UserService {
    pub fn new(db: Arc<DbPool>, auth: Arc<AuthService>) -> Self {
        Self { db, auth }
    }

    /// Checks credentials and issues a bearer token.
    ///
    /// Unknown users and wrong passwords are indistinguishable to the caller.
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse, ServiceError> {
        let found = user::Entity::find()
            .filter(user::Column::Username.eq(request.username.trim()))
            .one(&*self.db)
            .await?;

        let Some(found) = found else {
            warn!("login for unknown user");
            return Err(invalid_credentials());
        };
        if !verify_password(&request.password, &found.password)? {
            warn!(user_id = found.id, "login with wrong password");
            return Err(invalid_credentials());
        }

        let token = self.auth.issue_token(&found)?;
        info!(user_id = found.id, "user logged in");
        Ok(LoginResponse {
            token,
            user: found.into(),
        })
    }

    #[instrument(skip(self, input))]
    pub async fn create(&self, input: UserInput) -> Result<UserSummary, ServiceError> {
        let input = validated(input)?;
        let Some(password) = input.password.as_deref() else {
            return Err(crate::validation::ValidationFailure::single(
                "password",
                "required",
                "Password is required.",
            )
            .into());
        };

        let active = user::ActiveModel {
            fullname: Set(input.fullname),
            username: Set(input.username),
            email: Set(input.email),
            password: Set(hash_password(password)?),
            is_admin: Set(input.is_admin),
            ..Default::default()
        };
        let created = active
            .insert(&*self.db)
            .await
            .map_err(|e| ServiceError::from_write(e, DUPLICATE_USER))?;

        info!(user_id = created.id, "user created");
        Ok(created.into())
    }

    /// All users ordered by full name, then id.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<UserSummary>, ServiceError> {
        Ok(user::Entity::find()
            .order_by_asc(user::Column::Fullname)
            .order_by_asc(user::Column::Id)
            .all(&*self.db)
            .await?
            .into_iter()
            .map(UserSummary::from)
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i32) -> Result<UserSummary, ServiceError> {
        user::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .map(UserSummary::from)
            .ok_or_else(|| ServiceError::not_found("User", id))
    }

    /// The stored account behind a token subject, if it still exists.
    pub async fn resolve_actor(&self, id: i32) -> Result<Option<AuthUser>, ServiceError> {
        Ok(user::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .map(|found| AuthUser {
                id: found.id,
                is_admin: found.is_admin,
            }))
    }

    #[instrument(skip(self, input))]
    pub async fn update(&self, id: i32, input: UserInput) -> Result<(), ServiceError> {
        let input = validated(input)?;
        let mut active = user::ActiveModel {
            id: Unchanged(id),
            fullname: Set(input.fullname),
            username: Set(input.username),
            email: Set(input.email),
            is_admin: Set(input.is_admin),
            ..Default::default()
        };
        if let Some(password) = input.password.as_deref() {
            active.password = Set(hash_password(password)?);
        }

        match active.update(&*self.db).await {
            Ok(_) => {
                info!(user_id = id, "user updated");
                Ok(())
            }
            Err(DbErr::RecordNotUpdated) | Err(DbErr::RecordNotFound(_)) => {
                Err(ServiceError::not_found("User", id))
            }
            Err(e) => Err(ServiceError::from_write(e, DUPLICATE_USER)),
        }
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<(), ServiceError> {
        let result = user::Entity::delete_by_id(id).exec(&*self.db).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::not_found("User", id));
        }
        info!(user_id = id, "user deleted");
        Ok(())
    }

    /// Creates the first administrator when no user exists yet.
    ///
    /// Returns whether a user was created.
    #[instrument(skip(self, password))]
    pub async fn seed_admin(&self, username: &str, password: &str) -> Result<bool, ServiceError> {
        if user::Entity::find().count(&*self.db).await? > 0 {
            return Ok(false);
        }

        self.create(UserInput {
            fullname: "Administrator".to_string(),
            username: username.to_string(),
            email: format!("{username}@localhost.localdomain"),
            password: Some(password.to_string()),
            is_admin: true,
        })
        .await?;
        info!(username, "seeded administrator account");
        Ok(true)
    }
}

fn invalid_credentials() -> ServiceError {
    ServiceError::Unauthorized("Invalid username or password".to_string())
}

fn validated(mut input: UserInput) -> Result<UserInput, ServiceError> {
    input.fullname = input.fullname.trim().to_string();
    input.username = input.username.trim().to_string();
    input.email = input.email.trim().to_string();
    input.validate()?;
    Ok(input)
}
