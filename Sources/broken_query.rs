//! Does not compile: `max_rows` is assigned a string. Its build failure is
//! reported in `broken_query.error.txt` and the other units load regardless.

use autonet_abi::*;

#[derive(Debug, Default)]
pub struct BrokenQuery {
    pub max_rows: i32,
}

impl ExportedType for BrokenQuery {
    const NAME: &'static str = "BrokenQuery";
    const FULL_NAME: &'static str = "queries::BrokenQuery";
    const KIND: TypeKind = TypeKind::Class;

    fn properties() -> Vec<PropertySpec<Self>> {
        vec![property!("MaxRows" => max_rows)]
    }

    fn construct() -> Option<Self> {
        Some(Self { max_rows: "ten" })
    }
}

export_types! {
    unit: "broken_query",
    types: [BrokenQuery],
}
