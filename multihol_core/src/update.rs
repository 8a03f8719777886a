//! Item metadata rewritten before an item is moved
//!
//! The old shelf mark is kept as (part of) the alternative call number so
//! that the item can still be found under it after the move.

use crate::call_number::{HISTORY_SEPARATOR, normalize};
use crate::model::{CodeDesc, Item};

/// Alternative call number type assigned to carried-over shelf marks
pub const OTHER_SCHEME_CODE: &str = "8";
pub const OTHER_SCHEME_DESC: &str = "Other scheme";

/// Material type of every relocated item
pub const BOUND_ISSUE_CODE: &str = "ISSBD";
pub const BOUND_ISSUE_DESC: &str = "Bound Issue";

/// Prepare `item` for relocation and return it for chaining.
///
/// `holding_call_number` is the call number of the holding the item is
/// leaving. The alternative call number only ever grows by one entry: an
/// existing history or an alternative that already contains the holding
/// call number is left alone, which makes repeated calls idempotent. The
/// loan policy is always cleared and the material type set to bound issue.
pub fn update_for_move<'a>(item: &'a mut Item, holding_call_number: &str) -> &'a mut Item {
    let data = &mut item.item_data;
    let alternative = normalize(&data.alternative_call_number);
    let holding = normalize(holding_call_number);

    if alternative.trim().is_empty() {
        data.alternative_call_number = holding;
        data.alternative_call_number_type = CodeDesc::new(OTHER_SCHEME_CODE, OTHER_SCHEME_DESC);
    } else if alternative.contains(HISTORY_SEPARATOR) || alternative.contains(holding.as_str()) {
        log::debug!(
            "Item {} keeps alternative call number {:?}",
            data.barcode,
            data.alternative_call_number
        );
    } else {
        data.alternative_call_number = format!("{alternative}{HISTORY_SEPARATOR}{holding}");
    }

    data.policy = CodeDesc::cleared();
    data.physical_material_type = CodeDesc::new(BOUND_ISSUE_CODE, BOUND_ISSUE_DESC);

    item
}
