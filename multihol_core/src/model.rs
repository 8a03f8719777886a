//! Catalog records as exchanged with the catalog service
//!
//! Only the fields the migration reads or writes are typed. Everything else
//! is kept in `extra` maps so that an item sent back with PUT or POST carries
//! the complete record it was fetched with.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Code/description pair used by the catalog for enumerated fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeDesc {
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub desc: Option<String>,
}

impl CodeDesc {
    pub fn new(value: impl Into<String>, desc: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            desc: Some(desc.into()),
        }
    }

    /// A descriptor with an empty code and no description
    pub fn cleared() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

/// Link between an item and the holding it currently belongs to
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HoldingData {
    #[serde(default)]
    pub holding_id: String,
    #[serde(default)]
    pub call_number: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Physical copy attributes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemData {
    #[serde(default)]
    pub barcode: String,
    #[serde(default)]
    pub library: CodeDesc,
    #[serde(default)]
    pub location: CodeDesc,
    #[serde(default)]
    pub alternative_call_number: String,
    #[serde(default)]
    pub alternative_call_number_type: CodeDesc,
    #[serde(default)]
    pub policy: CodeDesc,
    #[serde(default)]
    pub physical_material_type: CodeDesc,
    /// Purchase order line reference, empty when the item has none
    #[serde(default)]
    pub po_line: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One physical item record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Absolute URL of the item resource
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub holding_data: HoldingData,
    #[serde(default)]
    pub item_data: ItemData,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Item {
    pub fn barcode(&self) -> &str {
        &self.item_data.barcode
    }

    pub fn library(&self) -> &str {
        &self.item_data.library.value
    }

    pub fn location(&self) -> &str {
        &self.item_data.location.value
    }

    pub fn call_number(&self) -> &str {
        &self.holding_data.call_number
    }

    pub fn holding_id(&self) -> &str {
        &self.holding_data.holding_id
    }

    pub fn alternative_call_number(&self) -> &str {
        &self.item_data.alternative_call_number
    }

    pub fn has_order_line(&self) -> bool {
        !self.item_data.po_line.is_empty()
    }
}

/// One page of the paginated item listing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemPage {
    /// The service omits the array entirely when a page is empty
    #[serde(default, rename = "item")]
    pub items: Vec<Item>,
    #[serde(default)]
    pub total_record_count: usize,
}
