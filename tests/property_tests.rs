//! Property-based tests for the car validation rules.
//!
//! "Now" is pinned to 2025-06-15 so the rolling year and date bounds are stable.

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use dealership_api::validation::{validate_at, CarCandidate, CarField, Color};
use std::str::FromStr;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
}

fn valid_body() -> Value {
    json!({
        "brand": "FIAT",
        "model": "UNO",
        "color": "AZUL",
        "year_manufacture": 2015,
        "imported": false,
        "plates": "ABC-1234"
    })
}

fn candidate_with(field: &str, value: Value) -> CarCandidate {
    let mut body = valid_body();
    body[field] = value;
    serde_json::from_value(body).unwrap()
}

fn violated(candidate: &CarCandidate) -> Vec<String> {
    match validate_at(candidate, now()) {
        Ok(_) => Vec::new(),
        Err(failure) => failure
            .violations()
            .iter()
            .map(|v| v.field.clone())
            .collect(),
    }
}

fn field(f: CarField) -> String {
    f.to_string()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn unknown_colors_only_affect_the_color_field(color in "[A-Za-z ]{0,12}") {
        prop_assume!(Color::from_str(&color).is_err());
        let fields = violated(&candidate_with("color", json!(color)));
        prop_assert_eq!(fields, vec![field(CarField::Color)]);
    }

    #[test]
    fn years_inside_the_range_are_accepted(year in 1960i64..=2025) {
        prop_assert!(violated(&candidate_with("year_manufacture", json!(year))).is_empty());
    }

    #[test]
    fn years_outside_the_range_are_rejected(
        year in prop_oneof![i64::from(i32::MIN)..1960i64, 2026i64..=i64::from(i32::MAX)]
    ) {
        let fields = violated(&candidate_with("year_manufacture", json!(year)));
        prop_assert_eq!(fields, vec![field(CarField::YearManufacture)]);
    }

    #[test]
    fn plates_of_the_wrong_length_are_rejected(plates in "\\PC{0,7}|\\PC{9,16}") {
        prop_assume!(plates.chars().count() != 8);
        let result = validate_at(&candidate_with("plates", json!(plates)), now());
        let failure = result.unwrap_err();
        prop_assert_eq!(failure.violations().len(), 1);
        prop_assert_eq!(&failure.violations()[0].field, "plates");
        prop_assert_eq!(&failure.violations()[0].code, "length");
    }

    #[test]
    fn well_formed_plates_are_accepted(plates in "[A-Z]{3}-[0-9][0-9A-J][0-9]{2}") {
        prop_assert!(violated(&candidate_with("plates", json!(plates))).is_empty());
    }

    #[test]
    fn prices_in_range_are_accepted(cents in 100_000i64..=500_000_000) {
        let price = Decimal::new(cents, 2);
        let candidate = candidate_with("selling_price", json!(price.to_string()));
        let accepted = validate_at(&candidate, now());
        prop_assert_eq!(accepted.unwrap().selling_price, Some(price));
    }

    #[test]
    fn prices_out_of_range_are_rejected(
        cents in prop_oneof![-1_000_000i64..100_000, 500_000_001i64..1_000_000_000]
    ) {
        let price = Decimal::new(cents, 2);
        let fields = violated(&candidate_with("selling_price", json!(price.to_string())));
        prop_assert_eq!(fields, vec![field(CarField::SellingPrice)]);
    }

    #[test]
    fn selling_dates_up_to_now_are_accepted(minutes in 0i64..(5 * 366 * 24 * 60)) {
        let date = now() - Duration::minutes(minutes);
        prop_assume!(date >= Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap());
        let candidate = candidate_with("selling_date", json!(date.to_rfc3339()));
        prop_assert!(violated(&candidate).is_empty());
    }

    #[test]
    fn future_selling_dates_are_rejected(minutes in 1i64..(366 * 24 * 60)) {
        let date = now() + Duration::minutes(minutes);
        let fields = violated(&candidate_with("selling_date", json!(date.to_rfc3339())));
        prop_assert_eq!(fields, vec![field(CarField::SellingDate)]);
    }

    #[test]
    fn accepted_records_validate_again_to_themselves(
        brand in "[A-Z]{1,10}",
        padding in " {0,3}",
        year in 1960i32..=2025,
        imported: bool,
    ) {
        let candidate = CarCandidate {
            brand: Some(json!(format!("{padding}{brand}{padding}"))),
            year_manufacture: Some(json!(year)),
            imported: Some(json!(imported)),
            ..candidate_with("brand", json!("x"))
        };
        let first = validate_at(&candidate, now()).unwrap();
        prop_assert_eq!(&first.brand, &brand);
        let second = validate_at(&CarCandidate::from(&first), now()).unwrap();
        prop_assert_eq!(first, second);
    }
}

#[test]
fn selling_price_boundaries() {
    for (price, ok) in [(999, false), (1000, true), (5_000_000, true), (5_000_001, false)] {
        let accepted = violated(&candidate_with("selling_price", json!(price))).is_empty();
        assert_eq!(accepted, ok, "price {price}");
    }
    assert!(violated(&serde_json::from_value(valid_body()).unwrap()).is_empty());
}

#[test]
fn selling_date_boundaries() {
    assert_eq!(
        violated(&candidate_with("selling_date", json!("2019-12-31"))),
        vec!["selling_date"]
    );
    assert!(violated(&candidate_with("selling_date", json!("2020-01-01"))).is_empty());
    assert_eq!(
        violated(&candidate_with("selling_date", json!("2025-06-16"))),
        vec!["selling_date"]
    );
}
