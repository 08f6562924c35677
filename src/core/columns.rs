use indexmap::IndexMap;
use serde::Serialize;

/// Filter tag consumed by the grid frontend.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum FilterType {
    #[serde(rename = "datetime")]
    Datetime,
    #[serde(rename = "reading")]
    Reading,
}

/// Metadata describing one output column.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ColumnDef {
    pub field: String,
    #[serde(rename = "displayName", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(rename = "_filter_type")]
    pub filter_type: FilterType,
}

/// Insertion-ordered column-definition accumulator, keyed by field name.
///
/// Registration is idempotent: re-registering a key overwrites in place and
/// keeps the original position, so emission order is first-registration order.
#[derive(Debug, Default)]
pub(crate) struct ColumnDefs(IndexMap<String, ColumnDef>);

impl ColumnDefs {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register(&mut self, key: impl Into<String>, def: ColumnDef) {
        self.0.insert(key.into(), def);
    }

    pub(crate) fn into_vec(self) -> Vec<ColumnDef> {
        self.0.into_values().collect()
    }
}
