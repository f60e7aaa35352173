//! Filter for event searches. Paging comes from an embedded `BaseQuery`.

use autonet_abi::*;

#[derive(Debug, Default)]
pub struct BaseQuery {
    pub max_rows: i32,
    pub current_index: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Gender {
    #[default]
    Unspecified,
    Female,
    Male,
}

opaque_property!(Gender);

#[derive(Debug, Default)]
pub struct EventFilterQuery {
    pub base: BaseQuery,
    /// Company the filter is running for.
    pub company_id: Option<i32>,
    /// Used in a contains search.
    pub name: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub is_registerable: Option<bool>,
    pub category_id: Option<i32>,
    pub member_id: Option<i32>,
    pub availability: Option<bool>,
    pub event_gender_restriction: Vec<Gender>,
}

impl ExportedType for EventFilterQuery {
    const NAME: &'static str = "EventFilterQuery";
    const FULL_NAME: &'static str = "queries::EventFilterQuery";
    const KIND: TypeKind = TypeKind::Class;

    fn properties() -> Vec<PropertySpec<Self>> {
        vec![
            property!("CompanyId" => company_id),
            property!("Name" => name),
            property!("StartDate" => start_date),
            property!("EndDate" => end_date),
            property!("IsRegisterable" => is_registerable),
            property!("CategoryId" => category_id),
            property!("MemberId" => member_id),
            property!("Availability" => availability),
            property!("EventGenderRestriction" => event_gender_restriction),
            property!(inherited "MaxRows" => base.max_rows),
            property!(inherited "CurrentIndex" => base.current_index),
        ]
    }

    fn construct() -> Option<Self> {
        Some(Self::default())
    }
}

impl ExportedType for Gender {
    const NAME: &'static str = "Gender";
    const FULL_NAME: &'static str = "queries::Gender";
    const KIND: TypeKind = TypeKind::Enum;

    fn properties() -> Vec<PropertySpec<Self>> {
        Vec::new()
    }

    fn construct() -> Option<Self> {
        Some(Self::default())
    }
}

export_types! {
    unit: "event_filter_query",
    types: [EventFilterQuery, Gender],
}
