use estate_core::normalize::expand_for_storage_match;
use estate_core::{
    compile, CategoricalField, Column, FilterRequest, Predicate, PropertyTypeGroup, SkipReason,
};
use serde_json::json;

fn request(value: serde_json::Value) -> FilterRequest {
    serde_json::from_value(value).expect("filter payload")
}

#[test]
fn apartments_with_subtypes_and_non_positive_bounds() {
    let req = request(json!({
        "apartmentSubtypes": ["studio", "one-bedroom"],
        "areaFrom": 0,
        "priceFrom": -5
    }));
    let plan = compile("apartments", &req);

    let mut expected_subtypes: Vec<String> = Vec::new();
    for id in ["studio", "one-bedroom"] {
        for v in expand_for_storage_match(CategoricalField::Subtype, id) {
            expected_subtypes.push(v.to_string());
        }
    }
    assert_eq!(
        plan.predicates(),
        &[
            Predicate::is_in(Column::Type, ["apartment"]),
            Predicate::In {
                field: Column::Subtype,
                values: expected_subtypes,
            },
        ]
    );
    assert_eq!(plan.on(Column::Area).count(), 0);
    assert_eq!(plan.on(Column::Price).count(), 0);
    let skipped: Vec<_> = plan.skipped().collect();
    assert!(skipped.contains(&(Column::Area, SkipReason::NonPositiveBound)));
    assert!(skipped.contains(&(Column::Price, SkipReason::NonPositiveBound)));
}

#[test]
fn houses_without_filters_only_narrow_type() {
    let plan = compile("houses-villas", &FilterRequest::default());
    assert_eq!(
        plan.predicates(),
        &[Predicate::is_in(Column::Type, ["house", "villa"])]
    );
}

#[test]
fn rental_hotels_never_filter_price_per_area() {
    let req = request(json!({
        "baseRoute": "/rent/search",
        "pricePerSqmFrom": 50
    }));
    let plan = compile("hotels-motels", &req);
    assert_eq!(
        plan.predicates(),
        &[
            Predicate::is_in(Column::Type, ["hotel"]),
            Predicate::equals(Column::SaleOrRent, "rent"),
        ]
    );
    assert!(plan
        .skipped()
        .any(|s| s == (Column::PricePerSqm, SkipReason::RentalListing)));
}

#[test]
fn rentals_drop_price_per_area_for_every_group() {
    let req = request(json!({
        "saleOrRent": "rent",
        "pricePerSqmFrom": 10,
        "pricePerSqmTo": 30
    }));
    for group in PropertyTypeGroup::ALL {
        let plan = compile(group.as_str(), &req);
        assert!(
            !plan
                .predicates()
                .iter()
                .any(|p| matches!(p, Predicate::Range { field: Column::PricePerSqm, .. })),
            "{group}"
        );
    }
}

#[test]
fn hotel_category_sentinel_alone_is_null_check() {
    let req = request(json!({ "selectedCategories": ["uncategorized"] }));
    let plan = compile("hotels-motels", &req);
    assert_eq!(
        plan.on(Column::HotelCategory).collect::<Vec<_>>(),
        vec![&Predicate::is_null(Column::HotelCategory)]
    );
}

#[test]
fn hotel_category_with_sentinel_is_one_disjunction() {
    let req = request(json!({ "selectedCategories": ["luxury", "uncategorized"] }));
    let plan = compile("hotels-motels", &req);
    let on_category: Vec<_> = plan.on(Column::HotelCategory).collect();
    assert_eq!(
        on_category,
        vec![&Predicate::Or {
            clauses: vec![
                Predicate::is_in(Column::HotelCategory, ["luxury"]),
                Predicate::is_null(Column::HotelCategory),
            ],
        }]
    );
    // no stray conjunct on the same column
    assert_eq!(
        plan.predicates()
            .iter()
            .filter(|p| matches!(p, Predicate::IsNull { .. } | Predicate::In { field: Column::HotelCategory, .. }))
            .count(),
        0
    );
}

#[test]
fn hotel_category_real_tokens_only() {
    let req = request(json!({ "selectedCategories": ["four-star", "5 звезди", "all"] }));
    let plan = compile("hotels-motels", &req);
    assert_eq!(
        plan.on(Column::HotelCategory).collect::<Vec<_>>(),
        vec![&Predicate::is_in(Column::HotelCategory, ["four-star", "five-star"])]
    );
}

#[test]
fn bed_base_sentinel_wins_over_bounds() {
    let req = request(json!({
        "isBedBaseNotProvided": true,
        "bedBaseFrom": 20,
        "bedBaseTo": 80
    }));
    let plan = compile("hotels-motels", &req);
    assert_eq!(
        plan.on(Column::BedBase).collect::<Vec<_>>(),
        vec![&Predicate::is_null(Column::BedBase)]
    );
    assert!(plan
        .skipped()
        .any(|s| s == (Column::BedBase, SkipReason::SentinelPrecedence)));
}

#[test]
fn bed_base_range_without_sentinel() {
    let req = request(json!({ "bedBaseFrom": "20", "bedBaseTo": 0 }));
    let plan = compile("hotels-motels", &req);
    assert_eq!(
        plan.on(Column::BedBase).collect::<Vec<_>>(),
        vec![&Predicate::Range {
            field: Column::BedBase,
            from: Some(20.0),
            to: None,
        }]
    );
}

#[test]
fn emptied_set_filters_never_reach_the_plan() {
    let req = request(json!({
        "apartmentSubtypes": ["all"],
        "houseTypes": [""],
        "propertyTypes": ["all", " "],
        "locationTypes": "all",
        "selectedConstructionTypes": [],
        "selectedCompletionStatuses": ["all"],
        "selectedFurnishing": ["all"],
        "selectedFeatures": [" "],
        "selectedCategories": ["all"]
    }));
    for group in PropertyTypeGroup::ALL {
        let plan = compile(group.as_str(), &req);
        assert_eq!(plan.len(), 1, "{group}: {:?}", plan.predicates());
    }
}

#[test]
fn compile_never_fails_on_garbage() {
    let req = request(json!({
        "city": "",
        "areaFrom": "abc",
        "priceTo": "1e400",
        "apartmentSubtypes": ["???"],
        "selectedCategories": ["nope"],
        "selectedFurnishing": ["velvet"],
        "isBedBaseNotProvided": "maybe",
        "saleOrRent": 7
    }));
    for group in ["", "apartments", "hotels-motels", "../etc", "APARTMENTS"] {
        let plan = compile(group, &req);
        assert!(plan.len() <= 1, "{group}: {:?}", plan.predicates());
    }
}

#[test]
fn restaurant_locations_normalize_labels() {
    let req = request(json!({
        "saleOrRent": "sale",
        "locationTypes": ["Търговски център"],
        "selectedConstructionTypes": "monolithic"
    }));
    let plan = compile("restaurants", &req);
    assert_eq!(
        plan.predicates(),
        &[
            Predicate::is_in(Column::Type, ["restaurant"]),
            Predicate::equals(Column::SaleOrRent, "sale"),
            Predicate::is_in(
                Column::LocationType,
                ["shopping-center", "Търговски център"]
            ),
            Predicate::is_in(Column::ConstructionType, ["monolithic", "Монолит"]),
        ]
    );
}

#[test]
fn plan_serializes_for_the_executor() {
    let req = request(json!({ "houseTypes": ["villa"], "selectedFeatures": ["pool"] }));
    let plan = compile("houses-villas", &req);
    let value = serde_json::to_value(&plan).unwrap();
    assert_eq!(value["order"], json!({"field":"created_at","direction":"desc"}));
    assert_eq!(value["predicates"][1]["kind"], "in");
    assert_eq!(value["predicates"][2]["kind"], "array_contains");
    let back: estate_core::QueryPlan = serde_json::from_value(value).unwrap();
    assert_eq!(back, plan);
}
