use crate::models::{ListingItem, WaitingRequest};

/// Select the single waiting request to act on for a newly available unit,
/// or none.
///
/// `queue` must already be in the repository's exposed order (priority
/// descending, enqueue time ascending); the scan stops at the first request
/// whose filter accepts the item, so ordering takes precedence over filter
/// specificity.
pub fn select_request<'a>(
    item: &ListingItem,
    queue: &'a [WaitingRequest],
) -> Option<&'a WaitingRequest> {
    queue.iter().find(|request| filter_accepts(request, item))
}

/// Residence names are free text on both sides, with inconsistent
/// abbreviation direction, so the substring test runs both ways. Low
/// precision, high recall on purpose.
fn filter_accepts(request: &WaitingRequest, item: &ListingItem) -> bool {
    if request.is_wildcard() {
        return true;
    }
    let filter = request.residence_filter.to_lowercase();
    let label = item.label.to_lowercase();
    label.contains(&filter) || filter.contains(&label)
}
