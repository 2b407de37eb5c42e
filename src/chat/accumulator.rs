// Message list accumulation
// Pages are appended exactly as they arrive: no sorting, no dedup by id.

use crate::models::Message;

/// Append one fetched page to the current list.
///
/// The result is `current` followed by `incoming` in their original order.
/// Calling this twice with the same page duplicates its messages, so callers
/// must apply each page once.
pub fn append_page(mut current: Vec<Message>, incoming: &[Message]) -> Vec<Message> {
    current.extend_from_slice(incoming);
    current
}
