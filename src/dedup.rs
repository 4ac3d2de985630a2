use crate::models::ImageRecord;
use std::collections::HashSet;

/// Keeps the first record seen for every content hash, preserving input order.
pub fn deduplicate(records: Vec<ImageRecord>) -> Vec<ImageRecord> {
    let mut seen = HashSet::with_capacity(records.len());
    records
        .into_iter()
        .filter(|record| seen.insert(record.content_hash.clone()))
        .collect()
}
