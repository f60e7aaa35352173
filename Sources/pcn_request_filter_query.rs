use autonet_abi::*;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RequestStatus {
    #[default]
    Unknown,
    InitialRequest,
    Pending,
    Rejected,
    Approved,
}

opaque_property!(RequestStatus);

#[derive(Debug)]
pub struct PcnRequestFilterQuery {
    pub id: String,
    pub from_date: Option<String>,
    pub to_date: Option<String>,
    /// Club being requested.
    pub requested_pcn_club: Option<i32>,
    /// Club the requesting member belongs to.
    pub member_pcn_club: Option<i32>,
    pub status: RequestStatus,
    pub member_number: Option<String>,
}

impl Default for PcnRequestFilterQuery {
    fn default() -> Self {
        Self {
            id: "1F48F456-706B-44D5-8539-1BCD87DD4469".to_string(),
            from_date: None,
            to_date: None,
            requested_pcn_club: None,
            member_pcn_club: None,
            status: RequestStatus::default(),
            member_number: None,
        }
    }
}

impl ExportedType for PcnRequestFilterQuery {
    const NAME: &'static str = "PcnRequestFilterQuery";
    const FULL_NAME: &'static str = "global::PcnRequestFilterQuery";
    const KIND: TypeKind = TypeKind::Class;

    fn properties() -> Vec<PropertySpec<Self>> {
        vec![
            property!("ID" => id),
            property!("FromDate" => from_date),
            property!("ToDate" => to_date),
            property!("RequestedPCNClub" => requested_pcn_club),
            property!("MemberPCNClub" => member_pcn_club),
            property!("Status" => status),
            property!("MemberNumber" => member_number),
        ]
    }

    fn construct() -> Option<Self> {
        Some(Self::default())
    }
}

export_types! {
    unit: "pcn_request_filter_query",
    types: [PcnRequestFilterQuery],
}
