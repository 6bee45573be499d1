use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use serde_json::Value;
use strum::IntoEnumIterator;
use tracing::{debug, instrument, warn};

use super::Notice;
use crate::{
    client::{CarApi, ClientError},
    entities::{car, customer},
    validation::{
        car::MIN_YEAR_MANUFACTURE, validate_at, CarCandidate, CarField, Clock, Color,
        SystemClock, ValidationFailure, Violation,
    },
};

const SAVED: &str = "Item saved successfully.";
const INVALID_FIELDS: &str = "There are fields with invalid values. Please check.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormState {
    Loading,
    Ready,
    Editing,
    Validating,
    Submitting,
    Saved,
    ValidationFailed,
    SubmitFailed,
}

/// What a call to [`CarForm::submit`] ended in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Carries the new id on create, when the server reported one.
    Saved(Option<i32>),
    /// Field errors were populated; nothing was persisted.
    Rejected,
    /// The request failed for a reason other than validation.
    Failed,
}

/// Editable text of every car field, as typed.
///
/// `imported` is not here: the checkbox keeps its own state and is copied in
/// on submit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CarDraft {
    pub brand: String,
    pub model: String,
    pub color: String,
    pub year_manufacture: String,
    pub plates: String,
    /// `YYYY-MM-DD`
    pub selling_date: String,
    pub selling_price: String,
    pub customer_id: String,
}

impl CarDraft {
    fn field_mut(&mut self, field: CarField) -> Option<&mut String> {
        Some(match field {
            CarField::Brand => &mut self.brand,
            CarField::Model => &mut self.model,
            CarField::Color => &mut self.color,
            CarField::YearManufacture => &mut self.year_manufacture,
            CarField::Plates => &mut self.plates,
            CarField::SellingDate => &mut self.selling_date,
            CarField::SellingPrice => &mut self.selling_price,
            CarField::CustomerId => &mut self.customer_id,
            CarField::Imported => return None,
        })
    }

    fn from_model(car: &car::Model) -> Self {
        Self {
            brand: car.brand.clone(),
            model: car.car_model.clone(),
            color: car.color.clone(),
            year_manufacture: car.year_manufacture.to_string(),
            plates: car.plates.clone(),
            selling_date: car
                .selling_date
                .map(|d| d.date_naive().to_string())
                .unwrap_or_default(),
            selling_price: car.selling_price.map(|p| p.to_string()).unwrap_or_default(),
            customer_id: car.customer_id.map(|id| id.to_string()).unwrap_or_default(),
        }
    }

    /// Empty optional fields become absent; numeric text becomes a JSON number
    /// so the shared rules see the same types the server would.
    fn to_candidate(&self, imported: bool) -> CarCandidate {
        CarCandidate {
            brand: Some(Value::from(self.brand.as_str())),
            model: Some(Value::from(self.model.as_str())),
            color: present(&self.color).map(Value::from),
            year_manufacture: present(&self.year_manufacture).map(integer_or_text),
            imported: Some(Value::Bool(imported)),
            plates: Some(Value::from(self.plates.as_str())),
            selling_date: present(&self.selling_date).map(Value::from),
            selling_price: present(&self.selling_price).map(Value::from),
            customer_id: present(&self.customer_id).map(integer_or_text),
        }
    }
}

fn present(raw: &str) -> Option<&str> {
    let raw = raw.trim();
    (!raw.is_empty()).then_some(raw)
}

fn integer_or_text(raw: &str) -> Value {
    raw.parse::<i64>()
        .map(Value::from)
        .unwrap_or_else(|_| Value::from(raw))
}

/// Create/edit controller for one car.
pub struct CarForm<A: CarApi> {
    api: A,
    clock: Arc<dyn Clock>,
    car_id: Option<i32>,
    state: FormState,
    draft: CarDraft,
    imported: bool,
    customers: Vec<customer::Model>,
    errors: HashMap<CarField, String>,
    modified: bool,
    notice: Option<Notice>,
}

impl<A: CarApi> CarForm<A> {
    /// `car_id` is `Some` when editing an existing car.
    pub fn new(api: A, car_id: Option<i32>) -> Self {
        Self::with_clock(api, car_id, Arc::new(SystemClock))
    }

    pub fn with_clock(api: A, car_id: Option<i32>, clock: Arc<dyn Clock>) -> Self {
        Self {
            api,
            clock,
            car_id,
            state: FormState::Loading,
            draft: CarDraft::default(),
            imported: false,
            customers: Vec::new(),
            errors: HashMap::new(),
            modified: false,
            notice: None,
        }
    }

    pub fn state(&self) -> FormState {
        self.state
    }

    pub fn draft(&self) -> &CarDraft {
        &self.draft
    }

    pub fn imported(&self) -> bool {
        self.imported
    }

    pub fn customers(&self) -> &[customer::Model] {
        &self.customers
    }

    pub fn errors(&self) -> &HashMap<CarField, String> {
        &self.errors
    }

    pub fn error(&self, field: CarField) -> Option<&str> {
        self.errors.get(&field).map(String::as_str)
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn take_notice(&mut self) -> Option<Notice> {
        self.notice.take()
    }

    /// Leaving with unsaved changes should be confirmed first.
    pub fn needs_leave_confirmation(&self) -> bool {
        self.modified && self.state != FormState::Saved
    }

    pub fn colors(&self) -> Vec<Color> {
        Color::iter().collect()
    }

    /// Selectable years, newest first.
    pub fn year_options(&self) -> Vec<i32> {
        let oldest = MIN_YEAR_MANUFACTURE as i32;
        (oldest..=self.clock.now().year()).rev().collect()
    }

    fn transition(&mut self, next: FormState) {
        debug!(from = ?self.state, to = ?next, "car form transition");
        self.state = next;
    }

    /// Fetches the customer list and, when editing, the car itself.
    #[instrument(skip(self), fields(car_id = ?self.car_id))]
    pub async fn load(&mut self) -> Result<(), ClientError> {
        self.transition(FormState::Loading);
        match self.fetch().await {
            Ok((customers, car)) => {
                self.customers = customers;
                if let Some(car) = car {
                    self.draft = CarDraft::from_model(&car);
                    self.imported = car.imported;
                }
                self.modified = false;
                self.transition(FormState::Ready);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "failed to load car form");
                self.notice = Some(Notice::error(e.to_string()));
                self.transition(FormState::Ready);
                Err(e)
            }
        }
    }

    async fn fetch(&self) -> Result<(Vec<customer::Model>, Option<car::Model>), ClientError> {
        let customers = self.api.list_customers().await?;
        let car = match self.car_id {
            Some(id) => Some(self.api.get_car(id).await?),
            None => None,
        };
        Ok((customers, car))
    }

    /// Replaces the text of `field`. The imported checkbox goes through
    /// [`CarForm::set_imported`] instead.
    pub fn set_field(&mut self, field: CarField, value: impl Into<String>) {
        if field == CarField::Imported {
            return;
        }
        if let Some(slot) = self.draft.field_mut(field) {
            *slot = value.into();
        }
        self.touch();
    }

    pub fn set_selling_date(&mut self, date: Option<NaiveDate>) {
        self.draft.selling_date = date.map(|d| d.to_string()).unwrap_or_default();
        self.touch();
    }

    pub fn set_imported(&mut self, imported: bool) {
        self.imported = imported;
        self.touch();
    }

    pub fn clear_customer(&mut self) {
        self.draft.customer_id.clear();
        self.touch();
    }

    fn touch(&mut self) {
        self.modified = true;
        if self.state != FormState::Editing {
            self.transition(FormState::Editing);
        }
    }

    /// Validates locally and, only if the draft is accepted, sends it.
    #[instrument(skip(self), fields(car_id = ?self.car_id))]
    pub async fn submit(&mut self) -> SubmitOutcome {
        self.transition(FormState::Validating);

        let input = match self.check_draft() {
            Ok(input) => input,
            Err(failure) => return self.reject(failure.violations()),
        };

        self.transition(FormState::Submitting);
        let result = match self.car_id {
            Some(id) => self.api.update_car(id, &input).await.map(|_| None),
            None => self.api.create_car(&input).await,
        };

        match result {
            Ok(new_id) => {
                self.errors.clear();
                self.modified = false;
                self.notice = Some(Notice::success(SAVED));
                self.transition(FormState::Saved);
                SubmitOutcome::Saved(new_id)
            }
            Err(ClientError::Validation(violations)) => self.reject(&violations),
            Err(e) => {
                warn!(error = %e, "car submit failed");
                self.transition(FormState::SubmitFailed);
                self.errors.clear();
                self.notice = Some(Notice::error(e.to_string()));
                self.transition(FormState::Editing);
                SubmitOutcome::Failed
            }
        }
    }

    /// The shared car rules, plus the customer being mandatory in the form.
    fn check_draft(&self) -> Result<crate::validation::CarInput, ValidationFailure> {
        let candidate = self.draft.to_candidate(self.imported);
        let result = validate_at(&candidate, self.clock.now());

        if present(&self.draft.customer_id).is_some() {
            return result;
        }
        let missing_customer = Violation::new(
            CarField::CustomerId.as_ref(),
            "required",
            "Customer is required.",
        );
        let mut violations = match result {
            Ok(_) => Vec::new(),
            Err(failure) => failure.into_violations(),
        };
        violations.push(missing_customer);
        Err(ValidationFailure::from_violations(violations))
    }

    fn reject(&mut self, violations: &[Violation]) -> SubmitOutcome {
        self.transition(FormState::ValidationFailed);
        self.errors.clear();
        for violation in violations {
            match CarField::from_str(&violation.field) {
                Ok(field) => {
                    self.errors
                        .entry(field)
                        .or_insert_with(|| violation.message.clone());
                }
                Err(_) => debug!(field = %violation.field, "violation on unknown field"),
            }
        }
        self.notice = Some(Notice::error(INVALID_FIELDS));
        self.transition(FormState::Editing);
        SubmitOutcome::Rejected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockCarApi;
    use crate::form::NoticeKind;
    use crate::validation::FixedClock;
    use chrono::{TimeZone, Utc};
    use reqwest::StatusCode;
    use rust_decimal_macros::dec;

    fn clock() -> Arc<dyn Clock> {
        Arc::new(FixedClock(Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()))
    }

    fn customer(id: i32) -> customer::Model {
        let now = Utc::now();
        customer::Model {
            id,
            name: "Ana Lima".into(),
            ident_document: "123.456.789-00".into(),
            birth_date: None,
            street_name: "Rua das Flores".into(),
            house_number: "100".into(),
            complements: None,
            district: "Centro".into(),
            municipality: "Franca".into(),
            state: "SP".into(),
            phone: "(16) 99999-0000".into(),
            email: "ana@example.com".into(),
            created_at: now,
            updated_at: now,
        }
    }

    fn stored_car() -> car::Model {
        let sold = Utc.with_ymd_and_hms(2024, 3, 10, 15, 30, 0).unwrap();
        car::Model {
            id: 9,
            brand: "VW".into(),
            car_model: "GOL".into(),
            color: "PRATA".into(),
            year_manufacture: 2018,
            imported: true,
            plates: "BRA-2E19".into(),
            selling_date: Some(sold),
            selling_price: Some(dec!(38500.00)),
            customer_id: Some(1),
            created_user_id: Some(1),
            updated_user_id: Some(1),
            created_at: sold,
            updated_at: sold,
        }
    }

    fn fill(form: &mut CarForm<MockCarApi>) {
        form.set_field(CarField::Brand, " FIAT ");
        form.set_field(CarField::Model, "UNO");
        form.set_field(CarField::Color, "AZUL");
        form.set_field(CarField::YearManufacture, "2015");
        form.set_field(CarField::Plates, "ABC-1234");
        form.set_field(CarField::CustomerId, "1");
    }

    #[tokio::test]
    async fn loading_for_edit_maps_the_stored_car_into_the_draft() {
        let mut api = MockCarApi::new();
        api.expect_list_customers()
            .times(1)
            .returning(|| Ok(vec![customer(1)]));
        api.expect_get_car()
            .withf(|id| *id == 9)
            .times(1)
            .returning(|_| Ok(stored_car()));

        let mut form = CarForm::with_clock(api, Some(9), clock());
        assert_eq!(form.state(), FormState::Loading);
        form.load().await.unwrap();

        assert_eq!(form.state(), FormState::Ready);
        assert_eq!(form.customers().len(), 1);
        assert_eq!(form.draft().selling_date, "2024-03-10");
        assert_eq!(form.draft().selling_price, "38500.00");
        assert!(form.imported());
        assert!(!form.needs_leave_confirmation());
    }

    #[tokio::test]
    async fn load_failure_becomes_a_notice() {
        let mut api = MockCarApi::new();
        api.expect_list_customers()
            .returning(|| Err(ClientError::Unauthorized("token expired".into())));

        let mut form = CarForm::with_clock(api, None, clock());
        assert!(form.load().await.is_err());
        assert_eq!(form.notice().map(|n| n.kind), Some(NoticeKind::Error));
    }

    #[tokio::test]
    async fn local_rejection_never_reaches_the_network() {
        let mut api = MockCarApi::new();
        api.expect_create_car().never();
        api.expect_update_car().never();

        let mut form = CarForm::with_clock(api, None, clock());
        fill(&mut form);
        form.set_field(CarField::Plates, "ABC1234");
        form.clear_customer();

        assert_eq!(form.submit().await, SubmitOutcome::Rejected);
        assert_eq!(form.state(), FormState::Editing);
        assert!(form.error(CarField::Plates).is_some());
        assert_eq!(form.error(CarField::CustomerId), Some("Customer is required."));
        assert!(form.error(CarField::Brand).is_none());
        assert!(form.needs_leave_confirmation());
    }

    #[tokio::test]
    async fn empty_optional_fields_are_sent_as_absent() {
        let mut api = MockCarApi::new();
        api.expect_create_car()
            .withf(|input| {
                input.brand == "FIAT"
                    && !input.imported
                    && input.selling_price.is_none()
                    && input.selling_date.is_none()
                    && input.customer_id == Some(1)
            })
            .times(1)
            .returning(|_| Ok(Some(42)));

        let mut form = CarForm::with_clock(api, None, clock());
        fill(&mut form);
        form.set_field(CarField::SellingPrice, "");
        assert!(form.is_modified());

        assert_eq!(form.submit().await, SubmitOutcome::Saved(Some(42)));
        assert_eq!(form.state(), FormState::Saved);
        assert!(!form.needs_leave_confirmation());
        assert_eq!(form.take_notice().map(|n| n.kind), Some(NoticeKind::Success));
    }

    #[tokio::test]
    async fn imported_toggle_is_synchronised_on_submit() {
        let mut api = MockCarApi::new();
        api.expect_update_car()
            .withf(|id, input| *id == 9 && input.imported)
            .times(1)
            .returning(|_, _| Ok(()));

        let mut form = CarForm::with_clock(api, Some(9), clock());
        fill(&mut form);
        form.set_imported(true);
        assert_eq!(form.submit().await, SubmitOutcome::Saved(None));
    }

    #[tokio::test]
    async fn server_violations_become_field_errors() {
        let mut api = MockCarApi::new();
        api.expect_create_car().times(1).returning(|_| {
            Err(ClientError::Validation(vec![Violation::new(
                "customer_id",
                "not_found",
                "Customer 1 does not exist.",
            )]))
        });

        let mut form = CarForm::with_clock(api, None, clock());
        fill(&mut form);
        assert_eq!(form.submit().await, SubmitOutcome::Rejected);
        assert_eq!(
            form.error(CarField::CustomerId),
            Some("Customer 1 does not exist.")
        );
    }

    #[tokio::test]
    async fn server_failures_leave_no_field_errors() {
        let mut api = MockCarApi::new();
        api.expect_update_car().times(1).returning(|_, _| {
            Err(ClientError::Status {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: "Internal server error".into(),
            })
        });

        let mut form = CarForm::with_clock(api, Some(3), clock());
        fill(&mut form);
        assert_eq!(form.submit().await, SubmitOutcome::Failed);
        assert_eq!(form.state(), FormState::Editing);
        assert!(form.errors().is_empty());
        assert_eq!(form.notice().map(|n| n.kind), Some(NoticeKind::Error));
    }

    #[test]
    fn year_options_run_from_now_back_to_1960() {
        let form = CarForm::with_clock(MockCarApi::new(), None, clock());
        let years = form.year_options();
        assert_eq!(years.first(), Some(&2025));
        assert_eq!(years.last(), Some(&1960));
        assert_eq!(form.colors().len(), 14);
    }
}
