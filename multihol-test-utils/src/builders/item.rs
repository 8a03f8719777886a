//! Builders for items, holding records and remote errors

use multihol_core::model::{CodeDesc, Item};

const BASE_URL: &str = "https://api.example.org/almaws/v1";

/// Bib record used when none is given
pub const TEST_BIB_ID: &str = "990006489880203339";

/// Builder for [`Item`] records
///
/// Defaults describe a depot item of holding `22100000000003339` with
/// a book material type and a loan policy, ready to be matched against
/// `BDEPO / DHB40`.
pub struct ItemBuilder {
    item: Item,
    bib_id: String,
}

impl ItemBuilder {
    pub fn new(barcode: &str) -> Self {
        let mut item = Item::default();
        item.item_data.barcode = barcode.to_string();
        item.item_data.library = CodeDesc::new("BDEPO", "Depot");
        item.item_data.location = CodeDesc::new("DHB40", "Magazin");
        item.item_data.policy = CodeDesc::new("07", "Lesesaal");
        item.item_data.physical_material_type = CodeDesc::new("BOOK", "Book");
        item.holding_data.holding_id = "22100000000003339".to_string();
        item.holding_data.call_number = "II 140137, 219".to_string();

        Self {
            item,
            bib_id: TEST_BIB_ID.to_string(),
        }
    }

    pub fn bib_id(mut self, bib_id: &str) -> Self {
        self.bib_id = bib_id.to_string();
        self
    }

    pub fn library(mut self, code: &str) -> Self {
        self.item.item_data.library = CodeDesc::new(code, code);
        self
    }

    pub fn location(mut self, code: &str) -> Self {
        self.item.item_data.location = CodeDesc::new(code, code);
        self
    }

    pub fn holding(mut self, holding_id: &str, call_number: &str) -> Self {
        self.item.holding_data.holding_id = holding_id.to_string();
        self.item.holding_data.call_number = call_number.to_string();
        self
    }

    pub fn alternative_call_number(mut self, value: &str) -> Self {
        self.item.item_data.alternative_call_number = value.to_string();
        self
    }

    pub fn order_line(mut self, po_line: &str) -> Self {
        self.item.item_data.po_line = po_line.to_string();
        self
    }

    /// Add an uninterpreted item_data field
    pub fn extra(mut self, key: &str, value: serde_json::Value) -> Self {
        self.item.item_data.extra.insert(key.to_string(), value);
        self
    }

    pub fn build(mut self) -> Item {
        self.item.link = format!(
            "{BASE_URL}/bibs/{}/holdings/{}/items/23{}",
            self.bib_id, self.item.holding_data.holding_id, self.item.item_data.barcode
        );
        self.item
    }
}

/// MARCXML holding record with a single 852 field
pub fn holding_marcxml(library: &str, location: &str, call_number: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<holding>
  <holding_id>22312549980003339</holding_id>
  <record>
    <leader>00000nx  a2200000zi 4500</leader>
    <controlfield tag="001">22312549980003339</controlfield>
    <datafield ind1="0" ind2=" " tag="852">
      <subfield code="b">{library}</subfield>
      <subfield code="c">{location}</subfield>
      <subfield code="h">{call_number}</subfield>
    </datafield>
  </record>
</holding>"#
    )
}

/// Remote errors carrying the default failure codes
pub mod errors {
    use multihol_core::catalog::CatalogError;

    pub fn policy_blocked() -> CatalogError {
        CatalogError::api(400, "401877", "Item cannot be deleted: active order line")
    }

    pub fn barcode_conflict() -> CatalogError {
        CatalogError::api(400, "401873", "Barcode already exists")
    }

    pub fn order_line_invalid() -> CatalogError {
        CatalogError::api(400, "401871", "PO line not found")
    }

    pub fn unexpected() -> CatalogError {
        CatalogError::api(500, "", "Internal server error")
    }
}
