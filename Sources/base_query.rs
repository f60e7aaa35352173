//! Paging fields shared by the filter queries.

use autonet_abi::*;

#[derive(Debug, Default)]
pub struct BaseQuery {
    /// Maximum rows to return (for paging).
    pub max_rows: i32,
    /// Current record to start from (for paging).
    pub current_index: i32,
}

impl ExportedType for BaseQuery {
    const NAME: &'static str = "BaseQuery";
    const FULL_NAME: &'static str = "queries::BaseQuery";
    const KIND: TypeKind = TypeKind::Class;

    fn properties() -> Vec<PropertySpec<Self>> {
        vec![
            property!("MaxRows" => max_rows),
            property!("CurrentIndex" => current_index),
        ]
    }

    fn construct() -> Option<Self> {
        Some(Self::default())
    }
}

export_types! {
    unit: "base_query",
    types: [BaseQuery],
}
