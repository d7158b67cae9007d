//! Budgeter: caps the merged paper list before synthesis.

/// Papers handed to synthesis when no other budget is configured
pub const DEFAULT_BUDGET: usize = 5;

/// Keep the first `max_total` items, preserving order.
///
/// Lists already within budget are returned unchanged.
pub fn truncate<T>(mut items: Vec<T>, max_total: usize) -> Vec<T> {
    items.truncate(max_total);
    items
}
