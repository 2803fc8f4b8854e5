//! Static property taxonomy.
//!
//! Every user-facing [`PropertyTypeGroup`] resolves to a fixed set of
//! [`StoredType`]s, and every [`CategoricalField`] carries its ordered option
//! list together with the legacy labels older listings were written with.
//! Adding a property type means extending the tables in this module and
//! nothing else.

use crate::errors::{EstateError, Result};
use crate::query::Column;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Selection meaning "do not filter"; never a stored value.
pub const ALL_SENTINEL: &str = "all";

/// Category selections that match listings with no category at all.
pub const CATEGORY_NULL_SENTINELS: &[&str] = &["uncategorized", "unspecified"];

/// Numeric selection that matches listings where the value was never entered.
pub const NOT_PROVIDED_SENTINEL: &str = "not-provided";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoredType {
    Apartment,
    House,
    Villa,
    Office,
    Shop,
    Land,
    Agricultural,
    Warehouse,
    Industrial,
    Garage,
    Parking,
    Hotel,
    Restaurant,
}

impl StoredType {
    pub const ALL: [StoredType; 13] = [
        StoredType::Apartment,
        StoredType::House,
        StoredType::Villa,
        StoredType::Office,
        StoredType::Shop,
        StoredType::Land,
        StoredType::Agricultural,
        StoredType::Warehouse,
        StoredType::Industrial,
        StoredType::Garage,
        StoredType::Parking,
        StoredType::Hotel,
        StoredType::Restaurant,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StoredType::Apartment => "apartment",
            StoredType::House => "house",
            StoredType::Villa => "villa",
            StoredType::Office => "office",
            StoredType::Shop => "shop",
            StoredType::Land => "land",
            StoredType::Agricultural => "agricultural",
            StoredType::Warehouse => "warehouse",
            StoredType::Industrial => "industrial",
            StoredType::Garage => "garage",
            StoredType::Parking => "parking",
            StoredType::Hotel => "hotel",
            StoredType::Restaurant => "restaurant",
        }
    }
}

impl fmt::Display for StoredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoredType {
    type Err = EstateError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        StoredType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| EstateError::Invalid(format!("unknown property type: {s}")))
    }
}

/// User-facing selector that may span several stored types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PropertyTypeGroup {
    Apartments,
    HousesVillas,
    Offices,
    Shops,
    BuildingPlots,
    AgriculturalLand,
    WarehousesIndustrial,
    GaragesParking,
    HotelsMotels,
    Restaurants,
}

impl PropertyTypeGroup {
    pub const ALL: [PropertyTypeGroup; 10] = [
        PropertyTypeGroup::Apartments,
        PropertyTypeGroup::HousesVillas,
        PropertyTypeGroup::Offices,
        PropertyTypeGroup::Shops,
        PropertyTypeGroup::BuildingPlots,
        PropertyTypeGroup::AgriculturalLand,
        PropertyTypeGroup::WarehousesIndustrial,
        PropertyTypeGroup::GaragesParking,
        PropertyTypeGroup::HotelsMotels,
        PropertyTypeGroup::Restaurants,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PropertyTypeGroup::Apartments => "apartments",
            PropertyTypeGroup::HousesVillas => "houses-villas",
            PropertyTypeGroup::Offices => "offices",
            PropertyTypeGroup::Shops => "shops",
            PropertyTypeGroup::BuildingPlots => "building-plots",
            PropertyTypeGroup::AgriculturalLand => "agricultural-land",
            PropertyTypeGroup::WarehousesIndustrial => "warehouses-industrial",
            PropertyTypeGroup::GaragesParking => "garages-parking",
            PropertyTypeGroup::HotelsMotels => "hotels-motels",
            PropertyTypeGroup::Restaurants => "restaurants",
        }
    }

    /// Non-empty, fixed set of stored types behind this group.
    pub fn stored_types(self) -> &'static [StoredType] {
        use StoredType::*;
        match self {
            PropertyTypeGroup::Apartments => &[Apartment],
            PropertyTypeGroup::HousesVillas => &[House, Villa],
            PropertyTypeGroup::Offices => &[Office],
            PropertyTypeGroup::Shops => &[Shop],
            PropertyTypeGroup::BuildingPlots => &[Land],
            PropertyTypeGroup::AgriculturalLand => &[Agricultural],
            PropertyTypeGroup::WarehousesIndustrial => &[Warehouse, Industrial],
            PropertyTypeGroup::GaragesParking => &[Garage, Parking],
            PropertyTypeGroup::HotelsMotels => &[Hotel],
            PropertyTypeGroup::Restaurants => &[Restaurant],
        }
    }
}

impl fmt::Display for PropertyTypeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropertyTypeGroup {
    type Err = EstateError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        PropertyTypeGroup::ALL
            .into_iter()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| EstateError::UnknownGroup(s.to_string()))
    }
}

/// Resolves a group name to its stored types.
pub fn stored_types_for_group(group: &str) -> Result<&'static [StoredType]> {
    group.parse::<PropertyTypeGroup>().map(PropertyTypeGroup::stored_types)
}

/// One enumerated value of a categorical field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldOption {
    pub id: &'static str,
    pub legacy_labels: &'static [&'static str],
}

const fn opt(id: &'static str, legacy_labels: &'static [&'static str]) -> FieldOption {
    FieldOption { id, legacy_labels }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoricalField {
    Subtype,
    HouseType,
    GarageType,
    HotelType,
    RestaurantLocationType,
    ConstructionType,
    CompletionDegree,
    HotelCategory,
    AgriculturalCategory,
    Electricity,
    Water,
    Furniture,
}

impl CategoricalField {
    pub const ALL: [CategoricalField; 12] = [
        CategoricalField::Subtype,
        CategoricalField::HouseType,
        CategoricalField::GarageType,
        CategoricalField::HotelType,
        CategoricalField::RestaurantLocationType,
        CategoricalField::ConstructionType,
        CategoricalField::CompletionDegree,
        CategoricalField::HotelCategory,
        CategoricalField::AgriculturalCategory,
        CategoricalField::Electricity,
        CategoricalField::Water,
        CategoricalField::Furniture,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CategoricalField::Subtype => "subtype",
            CategoricalField::HouseType => "house_type",
            CategoricalField::GarageType => "garage_type",
            CategoricalField::HotelType => "hotel_type",
            CategoricalField::RestaurantLocationType => "restaurant_location_type",
            CategoricalField::ConstructionType => "construction_type",
            CategoricalField::CompletionDegree => "completion_degree",
            CategoricalField::HotelCategory => "hotel_category",
            CategoricalField::AgriculturalCategory => "agricultural_category",
            CategoricalField::Electricity => "electricity",
            CategoricalField::Water => "water",
            CategoricalField::Furniture => "furniture",
        }
    }

    /// Storage column holding the field. Garage and hotel kinds share one.
    pub fn column(self) -> Column {
        match self {
            CategoricalField::Subtype => Column::Subtype,
            CategoricalField::HouseType => Column::HouseType,
            CategoricalField::GarageType | CategoricalField::HotelType => Column::PropertyType,
            CategoricalField::RestaurantLocationType => Column::LocationType,
            CategoricalField::ConstructionType => Column::ConstructionType,
            CategoricalField::CompletionDegree => Column::CompletionDegree,
            CategoricalField::HotelCategory => Column::HotelCategory,
            CategoricalField::AgriculturalCategory => Column::AgriculturalCategory,
            CategoricalField::Electricity => Column::Electricity,
            CategoricalField::Water => Column::Water,
            CategoricalField::Furniture => Column::Furniture,
        }
    }

    /// Stored types on which the field is recorded.
    pub fn applies_to(self) -> &'static [StoredType] {
        use StoredType::*;
        match self {
            CategoricalField::Subtype => &[Apartment],
            CategoricalField::HouseType => &[House, Villa],
            CategoricalField::GarageType => &[Garage],
            CategoricalField::HotelType => &[Hotel],
            CategoricalField::RestaurantLocationType => &[Restaurant],
            CategoricalField::ConstructionType => &[
                Apartment, House, Villa, Office, Shop, Warehouse, Industrial, Garage, Hotel,
                Restaurant,
            ],
            CategoricalField::CompletionDegree => {
                &[Apartment, House, Villa, Office, Shop, Warehouse, Industrial, Hotel]
            }
            CategoricalField::HotelCategory => &[Hotel],
            CategoricalField::AgriculturalCategory => &[Agricultural],
            CategoricalField::Electricity | CategoricalField::Water => &[Land, Agricultural],
            CategoricalField::Furniture => &[Apartment, House, Villa, Office, Hotel],
        }
    }

    pub fn applies(self, stored: StoredType) -> bool {
        self.applies_to().contains(&stored)
    }

    pub fn options(self) -> &'static [FieldOption] {
        match self {
            CategoricalField::Subtype => SUBTYPE_OPTIONS,
            CategoricalField::HouseType => HOUSE_TYPE_OPTIONS,
            CategoricalField::GarageType => GARAGE_TYPE_OPTIONS,
            CategoricalField::HotelType => HOTEL_TYPE_OPTIONS,
            CategoricalField::RestaurantLocationType => RESTAURANT_LOCATION_OPTIONS,
            CategoricalField::ConstructionType => CONSTRUCTION_TYPE_OPTIONS,
            CategoricalField::CompletionDegree => COMPLETION_DEGREE_OPTIONS,
            CategoricalField::HotelCategory => HOTEL_CATEGORY_OPTIONS,
            CategoricalField::AgriculturalCategory => AGRICULTURAL_CATEGORY_OPTIONS,
            CategoricalField::Electricity => ELECTRICITY_OPTIONS,
            CategoricalField::Water => WATER_OPTIONS,
            CategoricalField::Furniture => FURNITURE_OPTIONS,
        }
    }
}

impl fmt::Display for CategoricalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CategoricalField {
    type Err = EstateError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        CategoricalField::ALL
            .into_iter()
            .find(|f| f.name() == s)
            .ok_or_else(|| EstateError::Invalid(format!("unknown categorical field: {s}")))
    }
}

/// Options of `field` valid for `stored`; empty when the field is not recorded
/// for that type, which callers treat as "not applicable".
pub fn field_options_for(stored: StoredType, field: CategoricalField) -> &'static [FieldOption] {
    if field.applies(stored) {
        field.options()
    } else {
        &[]
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupEntry {
    pub id: &'static str,
    pub stored_types: &'static [StoredType],
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldEntry {
    pub name: &'static str,
    pub column: Column,
    pub applies_to: &'static [StoredType],
    pub options: &'static [FieldOption],
}

/// Serializable view of the whole taxonomy, as served to search forms.
#[derive(Debug, Clone, Serialize)]
pub struct Registry {
    pub groups: Vec<GroupEntry>,
    pub fields: Vec<FieldEntry>,
}

pub fn registry() -> Registry {
    Registry {
        groups: PropertyTypeGroup::ALL
            .iter()
            .map(|g| GroupEntry {
                id: g.as_str(),
                stored_types: g.stored_types(),
            })
            .collect(),
        fields: CategoricalField::ALL
            .iter()
            .map(|f| FieldEntry {
                name: f.name(),
                column: f.column(),
                applies_to: f.applies_to(),
                options: f.options(),
            })
            .collect(),
    }
}

/// Search-form furnishing tokens and the values stored for them.
pub const FURNISHING_MAP: [(&str, &str); 3] = [
    ("furnished", "full"),
    ("partially-furnished", "partial"),
    ("unfurnished", "none"),
];

pub fn furnishing_stored_value(token: &str) -> Option<&'static str> {
    FURNISHING_MAP
        .iter()
        .find(|(input, _)| *input == token)
        .map(|(_, stored)| *stored)
}

static SUBTYPE_OPTIONS: &[FieldOption] = &[
    opt("studio", &["Студио", "Едностаен"]),
    opt("one-bedroom", &["Двустаен"]),
    opt("two-bedroom", &["Тристаен"]),
    opt("three-bedroom", &["Четиристаен"]),
    opt("multi-bedroom", &["Многостаен"]),
    opt("maisonette", &["Мезонет"]),
    opt("penthouse", &["Пентхаус"]),
    opt("attic", &["Ателие", "Таванско помещение"]),
];

static HOUSE_TYPE_OPTIONS: &[FieldOption] = &[
    opt("single-family", &["Еднофамилна къща", "Къща"]),
    opt("house-floor", &["Етаж от къща"]),
    opt("twin-house", &["Къща близнак"]),
    opt("villa", &["Вила"]),
    opt("bungalow", &["Бунгало"]),
];

static GARAGE_TYPE_OPTIONS: &[FieldOption] = &[
    opt("single-garage", &["Гараж"]),
    opt("double-garage", &["Двоен гараж"]),
    opt("underground", &["Подземен гараж"]),
    opt("carport", &["Навес"]),
];

static HOTEL_TYPE_OPTIONS: &[FieldOption] = &[
    opt("hotel", &["Хотел"]),
    opt("family-hotel", &["Семеен хотел"]),
    opt("motel", &["Мотел"]),
    opt("guest-house", &["Къща за гости"]),
    opt("hostel", &["Хостел"]),
    opt("holiday-complex", &["Ваканционен комплекс"]),
];

static RESTAURANT_LOCATION_OPTIONS: &[FieldOption] = &[
    opt("ground-floor", &["Партер"]),
    opt("standalone-building", &["Самостоятелна сграда"]),
    opt("shopping-center", &["Търговски център"]),
    opt("hotel-complex", &["В хотелски комплекс"]),
    opt("beachfront", &["Първа линия"]),
];

static CONSTRUCTION_TYPE_OPTIONS: &[FieldOption] = &[
    opt("brick", &["Тухла"]),
    opt("panel", &["Панел"]),
    opt("epk", &["ЕПК"]),
    opt("pk", &["ПК"]),
    opt("beam", &["Гредоред"]),
    opt("monolithic", &["Монолит"]),
    opt("steel-frame", &["Метална конструкция"]),
];

static COMPLETION_DEGREE_OPTIONS: &[FieldOption] = &[
    opt("completed", &["Завършен", "Въведен в експлоатация"]),
    opt("under-construction", &["В строеж"]),
    opt("rough-construction", &["Груб строеж"]),
    opt("project", &["Проект", "На зелено"]),
];

static HOTEL_CATEGORY_OPTIONS: &[FieldOption] = &[
    opt("one-star", &["1 звезда"]),
    opt("two-star", &["2 звезди"]),
    opt("three-star", &["3 звезди"]),
    opt("four-star", &["4 звезди"]),
    opt("five-star", &["5 звезди"]),
    opt("luxury", &["Лукс"]),
];

static AGRICULTURAL_CATEGORY_OPTIONS: &[FieldOption] = &[
    opt("category-1", &["I категория"]),
    opt("category-2", &["II категория"]),
    opt("category-3", &["III категория"]),
    opt("category-4", &["IV категория"]),
    opt("category-5", &["V категория"]),
    opt("category-6", &["VI категория"]),
    opt("category-7", &["VII категория"]),
    opt("category-8", &["VIII категория"]),
    opt("category-9", &["IX категория"]),
    opt("category-10", &["X категория"]),
];

static ELECTRICITY_OPTIONS: &[FieldOption] = &[
    opt("available", &["Има ток", "Ток: да"]),
    opt("nearby", &["Ток в близост"]),
    opt("none", &["Няма ток", "Ток: не"]),
];

static WATER_OPTIONS: &[FieldOption] = &[
    opt("available", &["Има вода", "Вода: да"]),
    opt("nearby", &["Вода в близост"]),
    opt("none", &["Няма вода", "Вода: не"]),
];

static FURNITURE_OPTIONS: &[FieldOption] = &[
    opt("full", &["Обзаведен", "Напълно обзаведен"]),
    opt("partial", &["Частично обзаведен"]),
    opt("none", &["Необзаведен", "Без обзавеждане"]),
];
