use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use utoipa::ToSchema;

/// Closed set of car colors accepted by the dealership.
///
/// Matching is exact and case-sensitive: `"AZUL"` parses, `"Azul"` does not.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Color {
    Amarelo,
    Azul,
    Bege,
    Branco,
    Cinza,
    Dourado,
    Laranja,
    Marrom,
    Prata,
    Preto,
    Rosa,
    Roxo,
    Verde,
    Vermelho,
}
