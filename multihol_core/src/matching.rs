//! Decide whether an item belongs on the target holding's shelf

use crate::call_number::{self, history_tail};
use crate::descriptor::HoldingDescriptor;
use crate::model::Item;

/// The individual checks behind a match decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchReport {
    pub library: bool,
    pub location: bool,
    pub call_number: bool,
    /// Prefix found in the last entry of the alternative call number
    pub alternative_call_number: bool,
}

impl MatchReport {
    pub fn evaluate(item: &Item, descriptor: &HoldingDescriptor) -> Self {
        let alternative = item.alternative_call_number();

        Self {
            library: item.library() == descriptor.library,
            location: item.location() == descriptor.location,
            call_number: call_number::has_prefix(
                item.call_number(),
                &descriptor.call_number_prefix,
            ),
            alternative_call_number: !alternative.trim().is_empty()
                && call_number::has_prefix(
                    history_tail(alternative),
                    &descriptor.call_number_prefix,
                ),
        }
    }

    pub fn is_match(&self) -> bool {
        self.library && self.location && (self.call_number || self.alternative_call_number)
    }
}

/// Whether `item` is shelved where `descriptor` says the target holding is.
///
/// Library and location must be equal; the call number prefix may be found
/// either in the holding call number or in the most recent entry of the
/// alternative call number, which is where items moved earlier keep it.
pub fn matches(item: &Item, descriptor: &HoldingDescriptor) -> bool {
    MatchReport::evaluate(item, descriptor).is_match()
}
