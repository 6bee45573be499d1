use std::borrow::Cow;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{AsRefStr, Display, EnumIter, EnumString};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use super::{Clock, Color, SystemClock, ValidationFailure, Violation};

pub const MIN_YEAR_MANUFACTURE: i64 = 1960;
pub const PLATES_LENGTH: usize = 8;
pub const MIN_SELLING_PRICE: Decimal = dec!(1000);
pub const MAX_SELLING_PRICE: Decimal = dec!(5000000);
const PRICE_SCALE: u32 = 2;

/// Old `AAA-9999` plates and the Mercosul `AAA-9A99` variant.
static PLATES_FORMAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Z]{3}-[0-9][0-9A-J][0-9]{2}$").expect("plates pattern is a valid regex")
});

/// The day the shop opened; no car was sold before it.
static SHOP_OPENING: Lazy<DateTime<Utc>> = Lazy::new(|| {
    Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0)
        .single()
        .expect("2020-01-01 is a valid date")
});

/// Client-settable fields of a car, in the order violations are reported.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
    EnumString,
    EnumIter,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CarField {
    Brand,
    Model,
    Color,
    YearManufacture,
    Imported,
    Plates,
    SellingDate,
    SellingPrice,
    CustomerId,
}

/// A car record as received, before any type coercion.
///
/// Every field is kept as raw JSON so that a wrong type becomes a violation on
/// that field instead of failing the whole body. `null` counts as absent.
/// Actor columns (`created_user_id`, `updated_user_id`) are not part of the
/// candidate; unknown keys in the body are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct CarCandidate {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, example = "FIAT")]
    pub brand: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, example = "UNO")]
    pub model: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Color>)]
    pub color: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<i32>, example = 2015)]
    pub year_manufacture: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<bool>)]
    pub imported: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, example = "ABC-1234")]
    pub plates: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub selling_date: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<f64>, example = 45000)]
    pub selling_price: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<i32>)]
    pub customer_id: Option<Value>,
}

/// A candidate that passed every rule: strings trimmed, types coerced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CarInput {
    pub brand: String,
    pub model: String,
    pub color: Color,
    pub year_manufacture: i32,
    pub imported: bool,
    pub plates: String,
    pub selling_date: Option<DateTime<Utc>>,
    pub selling_price: Option<Decimal>,
    pub customer_id: Option<i32>,
}

impl From<&CarInput> for CarCandidate {
    fn from(input: &CarInput) -> Self {
        Self {
            brand: Some(Value::from(input.brand.clone())),
            model: Some(Value::from(input.model.clone())),
            color: Some(Value::from(input.color.to_string())),
            year_manufacture: Some(Value::from(input.year_manufacture)),
            imported: Some(Value::from(input.imported)),
            plates: Some(Value::from(input.plates.clone())),
            selling_date: input.selling_date.map(|d| Value::from(d.to_rfc3339())),
            selling_price: input.selling_price.map(|p| Value::from(p.to_string())),
            customer_id: input.customer_id.map(Value::from),
        }
    }
}

/// Length and format rules, applied to the already-trimmed text fields.
#[derive(Debug, Validate)]
struct TextFields {
    #[validate(length(
        min = 1,
        max = 25,
        message = "Brand must have between 1 and 25 characters."
    ))]
    brand: Option<String>,
    #[validate(length(
        min = 1,
        max = 25,
        message = "Model must have between 1 and 25 characters."
    ))]
    model: Option<String>,
    #[validate(custom = "validate_plates")]
    plates: Option<String>,
}

fn validate_plates(plates: &String) -> Result<(), ValidationError> {
    if plates.chars().count() != PLATES_LENGTH {
        let mut err = ValidationError::new("length");
        err.message = Some(Cow::from("Plates must have exactly 8 characters."));
        return Err(err);
    }
    if !PLATES_FORMAT.is_match(plates) {
        let mut err = ValidationError::new("format");
        err.message = Some(Cow::from(
            "Plates must follow the AAA-9999 or AAA-9A99 format.",
        ));
        return Err(err);
    }
    Ok(())
}

/// Validates against the system clock.
pub fn validate(candidate: &CarCandidate) -> Result<CarInput, ValidationFailure> {
    validate_at(candidate, SystemClock.now())
}

/// Validates with `now` as the upper bound for the year and selling date rules.
pub fn validate_at(
    candidate: &CarCandidate,
    now: DateTime<Utc>,
) -> Result<CarInput, ValidationFailure> {
    let mut sink = Vec::new();

    let brand = text(&mut sink, CarField::Brand, candidate.brand.as_ref(), true);
    let model = text(&mut sink, CarField::Model, candidate.model.as_ref(), true);
    let plates = text(&mut sink, CarField::Plates, candidate.plates.as_ref(), false);

    let text_fields = TextFields {
        brand: brand.clone(),
        model: model.clone(),
        plates: plates.clone(),
    };
    if let Err(errors) = text_fields.validate() {
        sink.extend(ValidationFailure::from(errors).into_violations());
    }

    let color = color(&mut sink, candidate.color.as_ref());
    let year_manufacture = year_manufacture(&mut sink, candidate.year_manufacture.as_ref(), now);
    let imported = imported(&mut sink, candidate.imported.as_ref());
    let selling_date = selling_date(&mut sink, candidate.selling_date.as_ref(), now);
    let selling_price = selling_price(&mut sink, candidate.selling_price.as_ref());
    let customer_id = customer_id(&mut sink, candidate.customer_id.as_ref());

    match (
        brand,
        model,
        color,
        year_manufacture,
        imported,
        plates,
        selling_date,
        selling_price,
        customer_id,
    ) {
        (
            Some(brand),
            Some(model),
            Some(color),
            Some(year_manufacture),
            Some(imported),
            Some(plates),
            Some(selling_date),
            Some(selling_price),
            Some(customer_id),
        ) if sink.is_empty() => Ok(CarInput {
            brand,
            model,
            color,
            year_manufacture,
            imported,
            plates,
            selling_date,
            selling_price,
            customer_id,
        }),
        _ => {
            sink.sort_by_key(|v| CarField::from_str(&v.field).ok());
            Err(ValidationFailure::from_violations(sink))
        }
    }
}

fn violation(sink: &mut Vec<Violation>, field: CarField, code: &str, message: &str) {
    sink.push(Violation::new(field.as_ref(), code, message));
}

fn label(field: CarField) -> &'static str {
    match field {
        CarField::Brand => "Brand",
        CarField::Model => "Model",
        CarField::Color => "Color",
        CarField::YearManufacture => "Year of manufacture",
        CarField::Imported => "The imported field",
        CarField::Plates => "Plates",
        CarField::SellingDate => "Selling date",
        CarField::SellingPrice => "Selling price",
        CarField::CustomerId => "Customer",
    }
}

fn required(sink: &mut Vec<Violation>, field: CarField) {
    violation(sink, field, "required", &format!("{} is required.", label(field)));
}

fn text(
    sink: &mut Vec<Violation>,
    field: CarField,
    value: Option<&Value>,
    trim: bool,
) -> Option<String> {
    match value {
        None => {
            required(sink, field);
            None
        }
        Some(Value::String(s)) if trim => Some(s.trim().to_string()),
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            violation(
                sink,
                field,
                "invalid_type",
                &format!("{} must be text.", label(field)),
            );
            None
        }
    }
}

fn color(sink: &mut Vec<Violation>, value: Option<&Value>) -> Option<Color> {
    match value {
        None => {
            required(sink, CarField::Color);
            None
        }
        Some(value) => {
            let parsed = value.as_str().map(Color::from_str);
            if let Some(Ok(color)) = parsed {
                return Some(color);
            }
            violation(sink, CarField::Color, "invalid_choice", "Invalid color.");
            None
        }
    }
}

fn year_manufacture(
    sink: &mut Vec<Violation>,
    value: Option<&Value>,
    now: DateTime<Utc>,
) -> Option<i32> {
    let field = CarField::YearManufacture;
    let year = match value {
        None => {
            required(sink, field);
            return None;
        }
        Some(Value::Number(n)) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < 1e15)
                .map(|f| f as i64)
        }),
        Some(_) => None,
    };
    let Some(year) = year else {
        violation(
            sink,
            field,
            "invalid_type",
            "Year of manufacture must be an integer.",
        );
        return None;
    };

    if year < MIN_YEAR_MANUFACTURE {
        violation(
            sink,
            field,
            "min",
            "Year of manufacture cannot be earlier than 1960.",
        );
        return None;
    }
    if year > i64::from(now.year()) {
        violation(
            sink,
            field,
            "max",
            "Year of manufacture cannot be later than the current year.",
        );
        return None;
    }
    i32::try_from(year).ok()
}

fn imported(sink: &mut Vec<Violation>, value: Option<&Value>) -> Option<bool> {
    match value {
        None => {
            required(sink, CarField::Imported);
            None
        }
        Some(Value::Bool(b)) => Some(*b),
        Some(_) => {
            violation(
                sink,
                CarField::Imported,
                "invalid_type",
                "The imported field must be true or false.",
            );
            None
        }
    }
}

/// Accepts RFC 3339 timestamps, `YYYY-MM-DD`, naive `YYYY-MM-DDTHH:MM:SS`
/// and epoch milliseconds.
pub fn coerce_date(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            DateTime::parse_from_rfc3339(s)
                .map(|d| d.with_timezone(&Utc))
                .ok()
                .or_else(|| {
                    NaiveDate::parse_from_str(s, "%Y-%m-%d")
                        .ok()
                        .and_then(|d| d.and_hms_opt(0, 0, 0))
                        .map(|d| d.and_utc())
                })
                .or_else(|| {
                    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                        .ok()
                        .map(|d| d.and_utc())
                })
        }
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

fn selling_date(
    sink: &mut Vec<Violation>,
    value: Option<&Value>,
    now: DateTime<Utc>,
) -> Option<Option<DateTime<Utc>>> {
    let field = CarField::SellingDate;
    let Some(value) = value else {
        return Some(None);
    };
    let Some(date) = coerce_date(value) else {
        violation(sink, field, "invalid_type", "Selling date is not a valid date.");
        return None;
    };

    if date < *SHOP_OPENING {
        violation(
            sink,
            field,
            "min",
            "Selling date cannot be earlier than 2020-01-01.",
        );
        return None;
    }
    if date > now {
        violation(sink, field, "max", "Selling date cannot be in the future.");
        return None;
    }
    Some(Some(date))
}

/// Accepts JSON numbers and numeric strings.
pub fn coerce_decimal(value: &Value) -> Option<Decimal> {
    let raw = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&raw)
        .or_else(|_| Decimal::from_scientific(&raw))
        .ok()
}

fn selling_price(sink: &mut Vec<Violation>, value: Option<&Value>) -> Option<Option<Decimal>> {
    let field = CarField::SellingPrice;
    let Some(value) = value else {
        return Some(None);
    };
    let Some(price) = coerce_decimal(value) else {
        violation(sink, field, "invalid_type", "Selling price must be a number.");
        return None;
    };

    if price < MIN_SELLING_PRICE {
        violation(
            sink,
            field,
            "min",
            "Selling price cannot be lower than 1,000.00.",
        );
        return None;
    }
    if price > MAX_SELLING_PRICE {
        violation(
            sink,
            field,
            "max",
            "Selling price cannot be higher than 5,000,000.00.",
        );
        return None;
    }
    // Stored as DECIMAL(12,2)
    Some(Some(price.round_dp_with_strategy(
        PRICE_SCALE,
        RoundingStrategy::MidpointAwayFromZero,
    )))
}

fn customer_id(sink: &mut Vec<Violation>, value: Option<&Value>) -> Option<Option<i32>> {
    let Some(value) = value else {
        return Some(None);
    };
    match value
        .as_i64()
        .filter(|id| *id > 0)
        .and_then(|id| i32::try_from(id).ok())
    {
        Some(id) => Some(Some(id)),
        None => {
            violation(
                sink,
                CarField::CustomerId,
                "invalid_type",
                "Customer must be a positive integer identifier.",
            );
            None
        }
    }
}
