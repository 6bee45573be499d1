use std::borrow::Cow;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{ActiveModelTrait, DbErr, EntityTrait, QueryOrder, Set, Unchanged};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::{db::DbPool, entities::customer, errors::ServiceError};

static IDENT_DOCUMENT_FORMAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9]{3}\.[0-9]{3}\.[0-9]{3}-[0-9]{2}$")
        .expect("document pattern is a valid regex")
});

/// Body accepted by create and update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
pub struct CustomerInput {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Name must have between 1 and 100 characters."
    ))]
    pub name: String,
    #[validate(custom = "validate_ident_document")]
    #[schema(example = "123.456.789-00")]
    pub ident_document: String,
    #[serde(default)]
    #[validate(custom = "validate_birth_date")]
    pub birth_date: Option<NaiveDate>,
    #[validate(length(
        min = 1,
        max = 40,
        message = "Street name must have between 1 and 40 characters."
    ))]
    pub street_name: String,
    #[validate(length(
        min = 1,
        max = 10,
        message = "House number must have between 1 and 10 characters."
    ))]
    pub house_number: String,
    #[serde(default)]
    #[validate(length(max = 20, message = "Complements must have at most 20 characters."))]
    pub complements: Option<String>,
    #[validate(length(
        min = 1,
        max = 25,
        message = "District must have between 1 and 25 characters."
    ))]
    pub district: String,
    #[validate(length(
        min = 1,
        max = 40,
        message = "Municipality must have between 1 and 40 characters."
    ))]
    pub municipality: String,
    #[validate(length(equal = 2, message = "State must have exactly 2 characters."))]
    pub state: String,
    #[validate(length(min = 8, max = 20, message = "Phone must have between 8 and 20 characters."))]
    pub phone: String,
    #[validate(email(message = "Invalid e-mail address."), length(max = 100))]
    pub email: String,
}

impl CustomerInput {
    /// Trims every text field; empty optional text becomes absent.
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            ident_document: self.ident_document.trim().to_string(),
            birth_date: self.birth_date,
            street_name: self.street_name.trim().to_string(),
            house_number: self.house_number.trim().to_string(),
            complements: self
                .complements
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
            district: self.district.trim().to_string(),
            municipality: self.municipality.trim().to_string(),
            state: self.state.trim().to_uppercase(),
            phone: self.phone.trim().to_string(),
            email: self.email.trim().to_string(),
        }
    }
}

fn validate_ident_document(document: &str) -> Result<(), ValidationError> {
    if IDENT_DOCUMENT_FORMAT.is_match(document) {
        Ok(())
    } else {
        let mut err = ValidationError::new("format");
        err.message = Some(Cow::from(
            "Identity document must follow the 000.000.000-00 format.",
        ));
        Err(err)
    }
}

fn validate_birth_date(date: &NaiveDate) -> Result<(), ValidationError> {
    if *date > Utc::now().date_naive() {
        let mut err = ValidationError::new("max");
        err.message = Some(Cow::from("Birth date cannot be in the future."));
        return Err(err);
    }
    Ok(())
}

/// Service for managing customers
#[derive(Clone)]
pub struct CustomerService {
    db: Arc<DbPool>,
}

impl CustomerService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, input))]
    pub async fn create(&self, input: CustomerInput) -> Result<i32, ServiceError> {
        let input = validated(input)?;
        let active = customer::ActiveModel {
            name: Set(input.name),
            ident_document: Set(input.ident_document),
            birth_date: Set(input.birth_date),
            street_name: Set(input.street_name),
            house_number: Set(input.house_number),
            complements: Set(input.complements),
            district: Set(input.district),
            municipality: Set(input.municipality),
            state: Set(input.state),
            phone: Set(input.phone),
            email: Set(input.email),
            ..Default::default()
        };

        let created = active
            .insert(&*self.db)
            .await
            .map_err(|e| ServiceError::from_write(e, "Identity document already registered"))?;

        info!(customer_id = created.id, "customer created");
        Ok(created.id)
    }

    /// All customers ordered by name, then id.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<customer::Model>, ServiceError> {
        Ok(customer::Entity::find()
            .order_by_asc(customer::Column::Name)
            .order_by_asc(customer::Column::Id)
            .all(&*self.db)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i32) -> Result<customer::Model, ServiceError> {
        customer::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Customer", id))
    }

    #[instrument(skip(self, input))]
    pub async fn update(&self, id: i32, input: CustomerInput) -> Result<(), ServiceError> {
        let input = validated(input)?;
        let active = customer::ActiveModel {
            id: Unchanged(id),
            name: Set(input.name),
            ident_document: Set(input.ident_document),
            birth_date: Set(input.birth_date),
            street_name: Set(input.street_name),
            house_number: Set(input.house_number),
            complements: Set(input.complements),
            district: Set(input.district),
            municipality: Set(input.municipality),
            state: Set(input.state),
            phone: Set(input.phone),
            email: Set(input.email),
            ..Default::default()
        };

        match active.update(&*self.db).await {
            Ok(_) => {
                info!(customer_id = id, "customer updated");
                Ok(())
            }
            Err(DbErr::RecordNotUpdated) | Err(DbErr::RecordNotFound(_)) => {
                Err(ServiceError::not_found("Customer", id))
            }
            Err(e) => Err(ServiceError::from_write(
                e,
                "Identity document already registered",
            )),
        }
    }

    /// Cars that referenced the customer keep existing with no customer.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<(), ServiceError> {
        let result = customer::Entity::delete_by_id(id)
            .exec(&*self.db)
            .await
            .map_err(|e| {
                error!(customer_id = id, error = %e, "failed to delete customer");
                ServiceError::DatabaseError(e)
            })?;

        if result.rows_affected == 0 {
            return Err(ServiceError::not_found("Customer", id));
        }
        info!(customer_id = id, "customer deleted");
        Ok(())
    }
}

fn validated(input: CustomerInput) -> Result<CustomerInput, ServiceError> {
    let input = input.normalized();
    input.validate()?;
    Ok(input)
}
