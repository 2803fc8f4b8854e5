//! Filter compiler.
//!
//! Turns a [`FilterRequest`] and a property type group into a [`QueryPlan`].
//! Steps run in a fixed order:
//!
//! 1. type narrowing and deal type
//! 2. city / neighborhood passthroughs
//! 3. numeric ranges (non-positive bounds are unset; no price-per-area on rentals)
//! 4. furnishing remap
//! 5. categorical set filters, normalized and expanded to every stored form
//! 6. categories with the "uncategorized" sentinel
//! 7. the bed-base "not provided" sentinel
//! 8. required features
//!
//! Compilation never fails. Unknown groups, unrecognized tokens and empty
//! selections only remove predicates, so an ambiguous filter broadens the
//! result set instead of emptying it.

use crate::model::{FilterRequest, SaleOrRent};
use crate::normalize::{expand_for_storage_match, normalize};
use crate::query::{Column, PlanBuilder, Predicate, QueryPlan, SkipReason};
use crate::taxonomy::{
    field_options_for, furnishing_stored_value, CategoricalField, PropertyTypeGroup, StoredType,
    CATEGORY_NULL_SENTINELS,
};
use crate::util::{meaningful_tokens, push_unique};
use tracing::debug;

/// Compiles `req` for the group named `group`. An unknown group only drops
/// the type predicate.
pub fn compile(group: &str, req: &FilterRequest) -> QueryPlan {
    let parsed = match group.parse::<PropertyTypeGroup>() {
        Ok(g) => Some(g),
        Err(e) => {
            debug!(error = %e, "compiling without type narrowing");
            None
        }
    };
    compile_for(parsed, req)
}

pub fn compile_for(group: Option<PropertyTypeGroup>, req: &FilterRequest) -> QueryPlan {
    let mut compiler = Compiler {
        group,
        req,
        deal: req.deal(),
        pinned: None,
        plan: PlanBuilder::default(),
    };
    compiler.narrow_type();
    compiler.passthroughs();
    compiler.ranges();
    compiler.furnishing();
    compiler.set_filters();
    compiler.categories();
    compiler.bed_base_sentinel();
    compiler.features();
    let plan = compiler.plan.finish();
    debug!(
        group = group.map(PropertyTypeGroup::as_str).unwrap_or("unknown"),
        predicates = plan.len(),
        skipped = plan.skipped().count(),
        "filter plan compiled"
    );
    plan
}

/// Inputs whose meaning depends on the group.
struct GroupInputs {
    // field fed by `propertyTypes`
    property_types: Option<CategoricalField>,
    // field fed by `selectedCategories`
    categories: Option<CategoricalField>,
}

impl GroupInputs {
    fn for_group(group: Option<PropertyTypeGroup>) -> Self {
        use CategoricalField::*;
        let (property_types, categories) = match group {
            Some(PropertyTypeGroup::GaragesParking) => (Some(GarageType), None),
            Some(PropertyTypeGroup::HotelsMotels) => (Some(HotelType), Some(HotelCategory)),
            Some(PropertyTypeGroup::AgriculturalLand) => (None, Some(AgriculturalCategory)),
            Some(
                PropertyTypeGroup::Apartments
                | PropertyTypeGroup::HousesVillas
                | PropertyTypeGroup::Offices
                | PropertyTypeGroup::Shops
                | PropertyTypeGroup::BuildingPlots
                | PropertyTypeGroup::WarehousesIndustrial
                | PropertyTypeGroup::Restaurants,
            ) => (None, None),
            // both keys are ambiguous without a group
            None => (None, None),
        };
        Self {
            property_types,
            categories,
        }
    }
}

struct Compiler<'a> {
    group: Option<PropertyTypeGroup>,
    req: &'a FilterRequest,
    deal: Option<SaleOrRent>,
    pinned: Option<&'static [StoredType]>,
    plan: PlanBuilder,
}

impl<'a> Compiler<'a> {
    fn narrow_type(&mut self) {
        match self.group {
            Some(group) => {
                let types = group.stored_types();
                self.plan
                    .push(Predicate::is_in(Column::Type, types.iter().map(|t| t.as_str())));
                self.plan.applied(Column::Type);
                self.pinned = Some(types);
            }
            None => self.plan.skipped(Column::Type, SkipReason::UnknownGroup),
        }
        if let Some(deal) = self.deal {
            self.plan
                .push(Predicate::equals(Column::SaleOrRent, deal.as_str()));
            self.plan.applied(Column::SaleOrRent);
        }
    }

    fn passthroughs(&mut self) {
        if let Some(raw) = self.req.city.as_deref() {
            let city = raw.trim();
            if city.is_empty() {
                self.plan.skipped(Column::City, SkipReason::Empty);
            } else {
                self.plan.push(Predicate::equals(Column::City, city));
                self.plan.applied(Column::City);
            }
        }

        if !self.req.neighborhoods.is_empty() {
            let mut values = Vec::new();
            for n in meaningful_tokens(&self.req.neighborhoods) {
                push_unique(&mut values, n);
            }
            if values.is_empty() {
                self.plan.skipped(Column::Neighborhood, SkipReason::Empty);
            } else {
                self.plan.push(Predicate::In {
                    field: Column::Neighborhood,
                    values,
                });
                self.plan.applied(Column::Neighborhood);
            }
        }
    }

    fn ranges(&mut self) {
        let r = self.req;
        let bounds = [
            (Column::Area, r.area_from, r.area_to),
            (Column::Price, r.price_from, r.price_to),
            (Column::PricePerSqm, r.price_per_sqm_from, r.price_per_sqm_to),
            (Column::Floor, r.floor_from, r.floor_to),
            (Column::YearBuilt, r.year_from, r.year_to),
            (Column::BedBase, r.bed_base_from, r.bed_base_to),
        ];
        for (column, from, to) in bounds {
            let supplied = from.is_some() || to.is_some();
            // rentals of several subtypes store no area, hence no price per area
            if column == Column::PricePerSqm && self.deal == Some(SaleOrRent::Rent) {
                if supplied {
                    self.plan.skipped(column, SkipReason::RentalListing);
                }
                continue;
            }
            if column == Column::BedBase && r.is_bed_base_not_provided {
                if supplied {
                    self.plan.skipped(column, SkipReason::SentinelPrecedence);
                }
                continue;
            }
            if !supplied {
                continue;
            }
            let (from, to) = (positive(from), positive(to));
            if from.is_none() && to.is_none() {
                self.plan.skipped(column, SkipReason::NonPositiveBound);
                continue;
            }
            self.plan.push(Predicate::Range {
                field: column,
                from,
                to,
            });
            self.plan.applied(column);
        }
    }

    fn furnishing(&mut self) {
        let req = self.req;
        let raw = &req.selected_furnishing;
        if raw.is_empty() {
            return;
        }
        let column = CategoricalField::Furniture.column();
        let tokens = meaningful_tokens(raw);
        if tokens.is_empty() {
            self.plan.skipped(column, SkipReason::Empty);
            return;
        }
        if self.scope(CategoricalField::Furniture).is_empty() {
            self.plan.skipped(column, SkipReason::NotApplicable);
            return;
        }
        let mut values = Vec::new();
        for token in tokens {
            match furnishing_stored_value(token) {
                Some(stored) => push_unique(&mut values, stored),
                None => self.plan.dropped(column, token),
            }
        }
        if values.is_empty() {
            self.plan.skipped(column, SkipReason::NoRecognizedTokens);
            return;
        }
        self.plan.push(Predicate::In {
            field: column,
            values,
        });
        self.plan.applied(column);
    }

    fn set_filters(&mut self) {
        let r = self.req;
        let inputs = GroupInputs::for_group(self.group);
        if !r.property_types.is_empty() && inputs.property_types.is_none() {
            self.plan
                .skipped(Column::PropertyType, SkipReason::NotApplicable);
        }
        let mut fields: Vec<(CategoricalField, &'a [String])> = vec![
            (CategoricalField::Subtype, &r.apartment_subtypes[..]),
            (CategoricalField::HouseType, &r.house_types[..]),
        ];
        if let Some(field) = inputs.property_types {
            fields.push((field, &r.property_types[..]));
        }
        fields.extend([
            (CategoricalField::RestaurantLocationType, &r.location_types[..]),
            (CategoricalField::ConstructionType, &r.selected_construction_types[..]),
            (CategoricalField::CompletionDegree, &r.selected_completion_statuses[..]),
            (CategoricalField::Electricity, &r.selected_electricity[..]),
            (CategoricalField::Water, &r.selected_water[..]),
        ]);
        for (field, raw) in fields {
            self.set_filter(field, raw);
        }
    }

    fn set_filter(&mut self, field: CategoricalField, raw: &[String]) {
        if raw.is_empty() {
            return;
        }
        let column = field.column();
        let tokens = meaningful_tokens(raw);
        if tokens.is_empty() {
            self.plan.skipped(column, SkipReason::Empty);
            return;
        }
        let scope = self.scope(field);
        if scope.is_empty() {
            self.plan.skipped(column, SkipReason::NotApplicable);
            return;
        }
        let ids = self.canonical_ids(field, &tokens);
        if ids.is_empty() {
            self.plan.skipped(column, SkipReason::NoRecognizedTokens);
            return;
        }
        self.guard(&scope);
        let mut values = Vec::new();
        for id in ids {
            for raw in expand_for_storage_match(field, id) {
                push_unique(&mut values, raw);
            }
        }
        self.plan.push(Predicate::In {
            field: column,
            values,
        });
        self.plan.applied(column);
    }

    fn categories(&mut self) {
        let req = self.req;
        let raw = &req.selected_categories;
        if raw.is_empty() {
            return;
        }
        let Some(field) = GroupInputs::for_group(self.group).categories else {
            debug!(count = raw.len(), "category selection ignored for this group");
            return;
        };
        let column = field.column();
        let tokens = meaningful_tokens(raw);
        let (sentinels, real): (Vec<&str>, Vec<&str>) = tokens
            .into_iter()
            .partition(|t| is_null_sentinel(t));
        let ids = self.canonical_ids(field, &real);
        let scope = self.scope(field);
        if scope.is_empty() {
            self.plan.skipped(column, SkipReason::NotApplicable);
            return;
        }

        let values: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
        let predicate = match (values.is_empty(), sentinels.is_empty()) {
            (false, true) => Predicate::In {
                field: column,
                values,
            },
            (true, false) => Predicate::is_null(column),
            // one disjunction; ANDing the two would match nothing
            (false, false) => Predicate::Or {
                clauses: vec![
                    Predicate::In {
                        field: column,
                        values,
                    },
                    Predicate::is_null(column),
                ],
            },
            (true, true) => {
                let reason = if real.is_empty() {
                    SkipReason::Empty
                } else {
                    SkipReason::NoRecognizedTokens
                };
                self.plan.skipped(column, reason);
                return;
            }
        };
        self.guard(&scope);
        self.plan.push(predicate);
        self.plan.applied(column);
    }

    fn bed_base_sentinel(&mut self) {
        if self.req.is_bed_base_not_provided {
            self.plan.push(Predicate::is_null(Column::BedBase));
            self.plan.applied(Column::BedBase);
        }
    }

    fn features(&mut self) {
        let req = self.req;
        let raw = &req.selected_features;
        if raw.is_empty() {
            return;
        }
        let mut values = Vec::new();
        for f in meaningful_tokens(raw) {
            push_unique(&mut values, f);
        }
        if values.is_empty() {
            self.plan.skipped(Column::Features, SkipReason::Empty);
            return;
        }
        self.plan.push(Predicate::ArrayContains {
            field: Column::Features,
            values,
        });
        self.plan.applied(Column::Features);
    }

    /// Stored types in reach of this request that record `field`.
    fn scope(&self, field: CategoricalField) -> Vec<StoredType> {
        let candidates = match self.group {
            Some(group) => group.stored_types(),
            None => field.applies_to(),
        };
        candidates
            .iter()
            .copied()
            .filter(|t| !field_options_for(*t, field).is_empty())
            .collect()
    }

    /// Pins `type` to `scope` when step 1 pinned something wider, so a column
    /// shared by several stored types only matches the intended one. Without a
    /// known group nothing is pinned and no guard is added.
    fn guard(&mut self, scope: &[StoredType]) {
        let Some(pinned) = self.pinned else {
            return;
        };
        if scope.len() >= pinned.len() {
            return;
        }
        let guard = Predicate::is_in(Column::Type, scope.iter().map(|t| t.as_str()));
        if !self.plan.contains(&guard) {
            self.plan.push(guard);
        }
    }

    fn canonical_ids(&mut self, field: CategoricalField, tokens: &[&str]) -> Vec<&'static str> {
        let mut ids: Vec<&'static str> = Vec::new();
        for token in tokens {
            match normalize(field, token) {
                Some(id) if !ids.contains(&id) => ids.push(id),
                Some(_) => {}
                None => self.plan.dropped(field.column(), token),
            }
        }
        ids
    }
}

fn positive(bound: Option<f64>) -> Option<f64> {
    bound.filter(|v| v.is_finite() && *v > 0.0)
}

fn is_null_sentinel(token: &str) -> bool {
    CATEGORY_NULL_SENTINELS
        .iter()
        .any(|s| s.eq_ignore_ascii_case(token))
}
