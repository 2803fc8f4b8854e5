use crate::errors::{EstateError, Result};
use crate::taxonomy::StoredType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;
use serde_with::{formats::PreferMany, serde_as, OneOrMany};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

pub type ListingId = String; // ULID string

pub const SALE_SEARCH_ROUTE: &str = "/sale/search";
pub const RENT_SEARCH_ROUTE: &str = "/rent/search";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaleOrRent {
    Sale,
    Rent,
}

impl SaleOrRent {
    pub fn as_str(self) -> &'static str {
        match self {
            SaleOrRent::Sale => "sale",
            SaleOrRent::Rent => "rent",
        }
    }

    pub fn from_route(route: &str) -> Option<Self> {
        match route.trim() {
            SALE_SEARCH_ROUTE => Some(SaleOrRent::Sale),
            RENT_SEARCH_ROUTE => Some(SaleOrRent::Rent),
            _ => None,
        }
    }
}

impl fmt::Display for SaleOrRent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SaleOrRent {
    type Err = EstateError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "sale" => Ok(SaleOrRent::Sale),
            "rent" => Ok(SaleOrRent::Rent),
            other => Err(EstateError::Invalid(format!("unknown deal type: {other}"))),
        }
    }
}

/// Raw search-form filter. Decoding is lenient: set filters take a string or a
/// list, numeric bounds take numbers or numeric strings, and values that do not
/// parse decode as unset.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterRequest {
    pub property_type_group: Option<String>,
    pub base_route: Option<String>,
    #[serde(deserialize_with = "lenient_deal")]
    pub sale_or_rent: Option<SaleOrRent>,
    pub city: Option<String>,
    #[serde_as(as = "OneOrMany<_, PreferMany>")]
    pub neighborhoods: Vec<String>,

    #[serde(deserialize_with = "lenient_bound")]
    pub area_from: Option<f64>,
    #[serde(deserialize_with = "lenient_bound")]
    pub area_to: Option<f64>,
    #[serde(deserialize_with = "lenient_bound")]
    pub price_from: Option<f64>,
    #[serde(deserialize_with = "lenient_bound")]
    pub price_to: Option<f64>,
    #[serde(deserialize_with = "lenient_bound")]
    pub price_per_sqm_from: Option<f64>,
    #[serde(deserialize_with = "lenient_bound")]
    pub price_per_sqm_to: Option<f64>,
    #[serde(deserialize_with = "lenient_bound")]
    pub floor_from: Option<f64>,
    #[serde(deserialize_with = "lenient_bound")]
    pub floor_to: Option<f64>,
    #[serde(deserialize_with = "lenient_bound")]
    pub year_from: Option<f64>,
    #[serde(deserialize_with = "lenient_bound")]
    pub year_to: Option<f64>,
    #[serde(deserialize_with = "lenient_bound")]
    pub bed_base_from: Option<f64>,
    #[serde(deserialize_with = "lenient_bound")]
    pub bed_base_to: Option<f64>,
    #[serde(deserialize_with = "lenient_flag")]
    pub is_bed_base_not_provided: bool,

    #[serde_as(as = "OneOrMany<_, PreferMany>")]
    pub apartment_subtypes: Vec<String>,
    #[serde_as(as = "OneOrMany<_, PreferMany>")]
    pub house_types: Vec<String>,
    // garage or hotel kind, depending on the group
    #[serde_as(as = "OneOrMany<_, PreferMany>")]
    pub property_types: Vec<String>,
    #[serde_as(as = "OneOrMany<_, PreferMany>")]
    pub location_types: Vec<String>,
    #[serde_as(as = "OneOrMany<_, PreferMany>")]
    pub selected_construction_types: Vec<String>,
    #[serde_as(as = "OneOrMany<_, PreferMany>")]
    pub selected_completion_statuses: Vec<String>,
    #[serde_as(as = "OneOrMany<_, PreferMany>")]
    pub selected_features: Vec<String>,
    #[serde_as(as = "OneOrMany<_, PreferMany>")]
    pub selected_categories: Vec<String>,
    #[serde_as(as = "OneOrMany<_, PreferMany>")]
    pub selected_electricity: Vec<String>,
    #[serde_as(as = "OneOrMany<_, PreferMany>")]
    pub selected_water: Vec<String>,
    #[serde_as(as = "OneOrMany<_, PreferMany>")]
    pub selected_furnishing: Vec<String>,
}

impl FilterRequest {
    /// Deal type targeted by the request; an explicit `saleOrRent` wins over
    /// the route it was submitted from.
    pub fn deal(&self) -> Option<SaleOrRent> {
        self.sale_or_rent.or_else(|| {
            self.base_route
                .as_deref()
                .and_then(SaleOrRent::from_route)
        })
    }
}

fn lenient_bound<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<JsonValue>::deserialize(deserializer)?;
    Ok(match raw {
        Some(JsonValue::Number(n)) => n.as_f64(),
        Some(JsonValue::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite()))
}

fn lenient_flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<JsonValue>::deserialize(deserializer)?;
    Ok(match raw {
        Some(JsonValue::Bool(b)) => b,
        Some(JsonValue::String(s)) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    })
}

fn lenient_deal<'de, D>(deserializer: D) -> std::result::Result<Option<SaleOrRent>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<JsonValue>::deserialize(deserializer)?;
    Ok(match raw {
        Some(JsonValue::String(s)) => s.parse().ok(),
        _ => None,
    })
}

/// A catalog listing. `attributes` holds every filterable column other than
/// `type` and `sale_or_rent`, keyed by column name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Listing {
    pub id: ListingId,
    pub r#type: StoredType,
    pub sale_or_rent: SaleOrRent,
    #[serde(default)]
    pub attributes: JsonValue,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewListing {
    pub r#type: StoredType,
    pub sale_or_rent: SaleOrRent,
    #[serde(default)]
    pub attributes: JsonValue,
    #[serde(default)]
    pub id: Option<ListingId>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Listing {
    pub fn new(req: NewListing) -> Result<Self> {
        let attributes = match req.attributes {
            JsonValue::Null => JsonValue::Object(Default::default()),
            JsonValue::Object(map) => JsonValue::Object(map),
            _ => return Err(EstateError::Invalid("attributes must be an object".into())),
        };
        let id = req.id.unwrap_or_else(|| Ulid::new().to_string());
        Ok(Self {
            id,
            r#type: req.r#type,
            sale_or_rent: req.sale_or_rent,
            attributes,
            created_at: req.created_at.unwrap_or_else(Utc::now),
        })
    }
}
