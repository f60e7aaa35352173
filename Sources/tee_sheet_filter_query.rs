//! Filter for a specific tee sheet. A plain container.

use autonet_abi::*;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimeOfDay {
    #[default]
    Any,
    Morning,
    Afternoon,
    Twilight,
}

/// Flags: `NotSet` is the default when nothing was chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryType(pub u32);

impl QueryType {
    pub const NOT_SET: QueryType = QueryType(0);
    pub const RCN: QueryType = QueryType(1);
    pub const GLOBAL: QueryType = QueryType(2);
    pub const PUBLIC: QueryType = QueryType(4);
    pub const CLUB: QueryType = QueryType(8);
    pub const GROUP: QueryType = QueryType(16);
}

opaque_property!(TimeOfDay, QueryType);

/// A starting slot on the sheet.
#[derive(Debug, Clone, Copy, Default)]
pub struct TeeTimeSlot {
    pub hour: u8,
    pub minute: u8,
    pub spots: u8,
}

impl ExportedType for TeeTimeSlot {
    const NAME: &'static str = "TeeTimeSlot";
    const FULL_NAME: &'static str = "queries::TeeTimeSlot";
    const KIND: TypeKind = TypeKind::Struct;

    fn properties() -> Vec<PropertySpec<Self>> {
        vec![
            property!("Hour" => hour),
            property!("Minute" => minute),
            property!("Spots" => spots),
        ]
    }

    fn construct() -> Option<Self> {
        Some(Self { hour: 7, minute: 0, spots: 4 })
    }
}

#[derive(Debug, Default)]
pub struct TeeSheetFilterQuery {
    pub date: String,
    pub time_of_day: TimeOfDay,
    /// Course ids.
    pub courses: Vec<i32>,
    /// Only available tee times.
    pub available: bool,
    pub company_id: i32,
    pub city_id: i32,
    pub state_id: i32,
    pub country_id: i32,
    pub query_type: QueryType,
    /// Mobile searches only.
    pub number_players: i32,
    pub green_fee: f64,
}

impl ExportedType for TeeSheetFilterQuery {
    const NAME: &'static str = "TeeSheetFilterQuery";
    const FULL_NAME: &'static str = "queries::TeeSheetFilterQuery";
    const KIND: TypeKind = TypeKind::Class;

    fn properties() -> Vec<PropertySpec<Self>> {
        vec![
            property!("Date" => date),
            property!("TimeOfDay" => time_of_day),
            property!("Courses" => courses),
            property!("Available" => available),
            property!("CompanyId" => company_id),
            property!("CityId" => city_id),
            property!("StateId" => state_id),
            property!("CountryId" => country_id),
            property!("QueryType" => query_type),
            property!("NumberPlayers" => number_players),
            property!("GreenFee" => green_fee),
        ]
    }

    fn construct() -> Option<Self> {
        Some(Self::default())
    }
}

impl ExportedType for TimeOfDay {
    const NAME: &'static str = "TimeOfDay";
    const FULL_NAME: &'static str = "queries::TimeOfDay";
    const KIND: TypeKind = TypeKind::Enum;

    fn properties() -> Vec<PropertySpec<Self>> {
        Vec::new()
    }

    fn construct() -> Option<Self> {
        Some(Self::default())
    }
}

export_types! {
    unit: "tee_sheet_filter_query",
    types: [TeeSheetFilterQuery, TeeTimeSlot, TimeOfDay],
}
