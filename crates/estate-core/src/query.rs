use crate::util::blake3_hex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Listing columns a plan can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Type,
    SaleOrRent,
    City,
    Neighborhood,
    Area,
    Price,
    PricePerSqm,
    Floor,
    YearBuilt,
    BedBase,
    Subtype,
    HouseType,
    PropertyType,
    LocationType,
    ConstructionType,
    CompletionDegree,
    HotelCategory,
    AgriculturalCategory,
    Electricity,
    Water,
    Furniture,
    Features,
    CreatedAt,
}

impl Column {
    pub fn as_str(self) -> &'static str {
        match self {
            Column::Type => "type",
            Column::SaleOrRent => "sale_or_rent",
            Column::City => "city",
            Column::Neighborhood => "neighborhood",
            Column::Area => "area",
            Column::Price => "price",
            Column::PricePerSqm => "price_per_sqm",
            Column::Floor => "floor",
            Column::YearBuilt => "year_built",
            Column::BedBase => "bed_base",
            Column::Subtype => "subtype",
            Column::HouseType => "house_type",
            Column::PropertyType => "property_type",
            Column::LocationType => "location_type",
            Column::ConstructionType => "construction_type",
            Column::CompletionDegree => "completion_degree",
            Column::HotelCategory => "hotel_category",
            Column::AgriculturalCategory => "agricultural_category",
            Column::Electricity => "electricity",
            Column::Water => "water",
            Column::Furniture => "furniture",
            Column::Features => "features",
            Column::CreatedAt => "created_at",
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predicate {
    Equals {
        field: Column,
        value: String,
    },
    In {
        field: Column,
        values: Vec<String>,
    },
    /// Inclusive on both ends; a missing bound is open.
    Range {
        field: Column,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        to: Option<f64>,
    },
    /// The stored array must hold every one of `values`.
    ArrayContains {
        field: Column,
        values: Vec<String>,
    },
    IsNull {
        field: Column,
    },
    Or {
        clauses: Vec<Predicate>,
    },
}

impl Predicate {
    pub fn equals(field: Column, value: impl Into<String>) -> Self {
        Predicate::Equals {
            field,
            value: value.into(),
        }
    }

    pub fn is_in<I, S>(field: Column, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Predicate::In {
            field,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_null(field: Column) -> Self {
        Predicate::IsNull { field }
    }

    /// Column the predicate constrains. `Or` reports the column its clauses
    /// share, or `None` when they differ.
    pub fn column(&self) -> Option<Column> {
        match self {
            Predicate::Equals { field, .. }
            | Predicate::In { field, .. }
            | Predicate::Range { field, .. }
            | Predicate::ArrayContains { field, .. }
            | Predicate::IsNull { field } => Some(*field),
            Predicate::Or { clauses } => {
                let mut cols = clauses.iter().map(Predicate::column);
                let first = cols.next().flatten()?;
                cols.all(|c| c == Some(first)).then_some(first)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: Column,
    pub direction: Direction,
}

impl OrderBy {
    pub const MOST_RECENT_FIRST: OrderBy = OrderBy {
        field: Column::CreatedAt,
        direction: Direction::Desc,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Nothing left after trimming and removing `all`.
    Empty,
    NonPositiveBound,
    RentalListing,
    NotApplicable,
    UnknownGroup,
    NoRecognizedTokens,
    SentinelPrecedence,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            SkipReason::Empty => "empty",
            SkipReason::NonPositiveBound => "non_positive_bound",
            SkipReason::RentalListing => "rental_listing",
            SkipReason::NotApplicable => "not_applicable",
            SkipReason::UnknownGroup => "unknown_group",
            SkipReason::NoRecognizedTokens => "no_recognized_tokens",
            SkipReason::SentinelPrecedence => "sentinel_precedence",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Applied,
    Skipped { reason: SkipReason },
    Dropped { token: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub filter: Column,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Ordered conjunction of predicates plus the compiler's diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryPlan {
    predicates: Vec<Predicate>,
    order: OrderBy,
    #[serde(default)]
    diagnostics: Vec<Diagnostic>,
}

impl QueryPlan {
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn order(&self) -> OrderBy {
        self.order
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn on(&self, column: Column) -> impl Iterator<Item = &Predicate> {
        self.predicates
            .iter()
            .filter(move |p| p.column() == Some(column))
    }

    pub fn skipped(&self) -> impl Iterator<Item = (Column, SkipReason)> + '_ {
        self.diagnostics.iter().filter_map(|d| match d.outcome {
            Outcome::Skipped { reason } => Some((d.filter, reason)),
            _ => None,
        })
    }

    /// Stable hash of the predicates and ordering; diagnostics excluded.
    pub fn fingerprint(&self) -> String {
        let body = serde_json::to_vec(&(&self.predicates, &self.order)).unwrap_or_default();
        blake3_hex(&body)
    }
}

/// Append-only accumulator; the only way to produce a [`QueryPlan`].
#[derive(Debug, Default)]
pub(crate) struct PlanBuilder {
    predicates: Vec<Predicate>,
    diagnostics: Vec<Diagnostic>,
}

impl PlanBuilder {
    pub(crate) fn push(&mut self, predicate: Predicate) {
        self.predicates.push(predicate);
    }

    pub(crate) fn contains(&self, predicate: &Predicate) -> bool {
        self.predicates.contains(predicate)
    }

    pub(crate) fn applied(&mut self, filter: Column) {
        self.diagnostics.push(Diagnostic {
            filter,
            outcome: Outcome::Applied,
        });
    }

    pub(crate) fn skipped(&mut self, filter: Column, reason: SkipReason) {
        tracing::debug!(filter = %filter, reason = reason.as_str(), "filter skipped");
        self.diagnostics.push(Diagnostic {
            filter,
            outcome: Outcome::Skipped { reason },
        });
    }

    pub(crate) fn dropped(&mut self, filter: Column, token: &str) {
        tracing::debug!(filter = %filter, token, "unrecognized filter token dropped");
        self.diagnostics.push(Diagnostic {
            filter,
            outcome: Outcome::Dropped {
                token: token.to_string(),
            },
        });
    }

    pub(crate) fn finish(self) -> QueryPlan {
        QueryPlan {
            predicates: self.predicates,
            order: OrderBy::MOST_RECENT_FIRST,
            diagnostics: self.diagnostics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn predicates_serialize_with_kind_tag() {
        let p = Predicate::Or {
            clauses: vec![
                Predicate::is_in(Column::HotelCategory, ["luxury"]),
                Predicate::is_null(Column::HotelCategory),
            ],
        };
        assert_eq!(
            serde_json::to_value(&p).unwrap(),
            json!({"kind":"or","clauses":[
                {"kind":"in","field":"hotel_category","values":["luxury"]},
                {"kind":"is_null","field":"hotel_category"}
            ]})
        );
        let r = Predicate::Range {
            field: Column::Price,
            from: Some(100.0),
            to: None,
        };
        assert_eq!(
            serde_json::to_value(&r).unwrap(),
            json!({"kind":"range","field":"price","from":100.0})
        );
    }

    #[test]
    fn or_column_is_shared_column_only() {
        let same = Predicate::Or {
            clauses: vec![
                Predicate::is_in(Column::Water, ["none"]),
                Predicate::is_null(Column::Water),
            ],
        };
        assert_eq!(same.column(), Some(Column::Water));
        let mixed = Predicate::Or {
            clauses: vec![
                Predicate::is_null(Column::Water),
                Predicate::is_null(Column::Electricity),
            ],
        };
        assert_eq!(mixed.column(), None);
        assert_eq!(Predicate::Or { clauses: vec![] }.column(), None);
    }

    #[test]
    fn fingerprint_ignores_diagnostics() {
        let mut a = PlanBuilder::default();
        a.push(Predicate::equals(Column::City, "Sofia"));
        a.applied(Column::City);
        let mut b = PlanBuilder::default();
        b.push(Predicate::equals(Column::City, "Sofia"));
        let (a, b) = (a.finish(), b.finish());
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
        assert_eq!(a.order(), OrderBy::MOST_RECENT_FIRST);
    }

    #[test]
    fn diagnostics_flatten_outcome() {
        let d = Diagnostic {
            filter: Column::PricePerSqm,
            outcome: Outcome::Skipped {
                reason: SkipReason::RentalListing,
            },
        };
        assert_eq!(
            serde_json::to_value(&d).unwrap(),
            json!({"filter":"price_per_sqm","outcome":"skipped","reason":"rental_listing"})
        );
    }
}
