use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    Set, Unchanged,
};
use serde::Serialize;
use tracing::{error, info, instrument};
use utoipa::ToSchema;

use crate::{
    auth::AuthUser,
    db::DbPool,
    entities::{
        car, customer,
        user::{self, UserSummary},
    },
    errors::ServiceError,
    validation::{CarField, CarInput, ValidationFailure},
};

/// Related entities a caller may ask to have expanded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Includes {
    pub customer: bool,
    pub created_user: bool,
    pub updated_user: bool,
}

impl Includes {
    /// Parses a comma-separated include list; unknown names are ignored.
    pub fn parse(raw: Option<&str>) -> Self {
        let mut includes = Self::default();
        for name in raw.unwrap_or_default().split(',').map(str::trim) {
            match name {
                "customer" => includes.customer = true,
                "created_user" => includes.created_user = true,
                "updated_user" => includes.updated_user = true,
                _ => {}
            }
        }
        includes
    }

    fn any_user(&self) -> bool {
        self.created_user || self.updated_user
    }
}

/// A car plus the relations requested through [`Includes`].
///
/// An expansion that was not requested is omitted from the JSON; a requested
/// one with no related row is `null`.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct CarView {
    #[serde(flatten)]
    pub car: car::Model,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<customer::Model>)]
    pub customer: Option<Option<customer::Model>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<UserSummary>)]
    pub created_user: Option<Option<UserSummary>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<UserSummary>)]
    pub updated_user: Option<Option<UserSummary>>,
}

/// Persistence gateway for cars
#[derive(Clone)]
pub struct CarService {
    db: Arc<DbPool>,
}

impl CarService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Inserts an accepted car, attributing it to `actor`. Returns the new id.
    #[instrument(skip(self, input), fields(actor = actor.id))]
    pub async fn create(&self, input: CarInput, actor: &AuthUser) -> Result<i32, ServiceError> {
        self.ensure_customer_exists(input.customer_id).await?;

        let active = car::ActiveModel {
            brand: Set(input.brand),
            car_model: Set(input.model),
            color: Set(input.color.to_string()),
            year_manufacture: Set(input.year_manufacture),
            imported: Set(input.imported),
            plates: Set(input.plates),
            selling_date: Set(input.selling_date),
            selling_price: Set(input.selling_price),
            customer_id: Set(input.customer_id),
            created_user_id: Set(Some(actor.id)),
            updated_user_id: Set(Some(actor.id)),
            ..Default::default()
        };

        let created = active.insert(&*self.db).await.map_err(|e| {
            error!(error = %e, "failed to insert car");
            ServiceError::DatabaseError(e)
        })?;

        info!(car_id = created.id, "car created");
        Ok(created.id)
    }

    /// All cars ordered by brand, model and id.
    #[instrument(skip(self))]
    pub async fn list(&self, includes: Includes) -> Result<Vec<CarView>, ServiceError> {
        let cars = car::Entity::find()
            .order_by_asc(car::Column::Brand)
            .order_by_asc(car::Column::CarModel)
            .order_by_asc(car::Column::Id)
            .all(&*self.db)
            .await?;

        self.expand(cars, includes).await
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i32, includes: Includes) -> Result<CarView, ServiceError> {
        let car = car::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Car", id))?;

        let mut views = self.expand(vec![car], includes).await?;
        views
            .pop()
            .ok_or_else(|| ServiceError::not_found("Car", id))
    }

    /// Replaces every client-settable field of car `id`.
    ///
    /// `created_user_id` and `created_at` keep their original values.
    #[instrument(skip(self, input), fields(actor = actor.id))]
    pub async fn update(
        &self,
        id: i32,
        input: CarInput,
        actor: &AuthUser,
    ) -> Result<(), ServiceError> {
        self.ensure_customer_exists(input.customer_id).await?;

        let active = car::ActiveModel {
            id: Unchanged(id),
            brand: Set(input.brand),
            car_model: Set(input.model),
            color: Set(input.color.to_string()),
            year_manufacture: Set(input.year_manufacture),
            imported: Set(input.imported),
            plates: Set(input.plates),
            selling_date: Set(input.selling_date),
            selling_price: Set(input.selling_price),
            customer_id: Set(input.customer_id),
            updated_user_id: Set(Some(actor.id)),
            ..Default::default()
        };

        match active.update(&*self.db).await {
            Ok(_) => {
                info!(car_id = id, "car updated");
                Ok(())
            }
            Err(DbErr::RecordNotUpdated) | Err(DbErr::RecordNotFound(_)) => {
                Err(ServiceError::not_found("Car", id))
            }
            Err(e) => {
                error!(car_id = id, error = %e, "failed to update car");
                Err(ServiceError::DatabaseError(e))
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<(), ServiceError> {
        let result = car::Entity::delete_by_id(id)
            .exec(&*self.db)
            .await
            .map_err(|e| {
                error!(car_id = id, error = %e, "failed to delete car");
                ServiceError::DatabaseError(e)
            })?;

        if result.rows_affected == 0 {
            return Err(ServiceError::not_found("Car", id));
        }

        info!(car_id = id, "car deleted");
        Ok(())
    }

    async fn ensure_customer_exists(&self, customer_id: Option<i32>) -> Result<(), ServiceError> {
        let Some(customer_id) = customer_id else {
            return Ok(());
        };

        let found = customer::Entity::find_by_id(customer_id)
            .count(&*self.db)
            .await?;
        if found == 0 {
            return Err(ValidationFailure::single(
                CarField::CustomerId.as_ref(),
                "not_found",
                format!("Customer {customer_id} does not exist."),
            )
            .into());
        }
        Ok(())
    }

    async fn expand(
        &self,
        cars: Vec<car::Model>,
        includes: Includes,
    ) -> Result<Vec<CarView>, ServiceError> {
        let customers = if includes.customer {
            let ids: HashSet<i32> = cars.iter().filter_map(|c| c.customer_id).collect();
            customer::Entity::find()
                .filter(customer::Column::Id.is_in(ids))
                .all(&*self.db)
                .await?
                .into_iter()
                .map(|c| (c.id, c))
                .collect()
        } else {
            HashMap::new()
        };

        let users: HashMap<i32, UserSummary> = if includes.any_user() {
            let ids: HashSet<i32> = cars
                .iter()
                .flat_map(|c| [c.created_user_id, c.updated_user_id])
                .flatten()
                .collect();
            user::Entity::find()
                .filter(user::Column::Id.is_in(ids))
                .all(&*self.db)
                .await?
                .into_iter()
                .map(|u| (u.id, UserSummary::from(u)))
                .collect()
        } else {
            HashMap::new()
        };

        let lookup_user = |id: Option<i32>| id.and_then(|id| users.get(&id).cloned());

        Ok(cars
            .into_iter()
            .map(|car| CarView {
                customer: includes
                    .customer
                    .then(|| car.customer_id.and_then(|id| customers.get(&id).cloned())),
                created_user: includes
                    .created_user
                    .then(|| lookup_user(car.created_user_id)),
                updated_user: includes
                    .updated_user
                    .then(|| lookup_user(car.updated_user_id)),
                car,
            })
            .collect())
    }
}
