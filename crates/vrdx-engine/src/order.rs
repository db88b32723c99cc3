//! ID allocation and list ordering.

use crate::error::MutationError;
use crate::record::{DecisionId, DecisionRecord};

/// `1 + max(existing IDs)`, or 1 for an empty block.
pub fn next_id(records: &[DecisionRecord]) -> Result<DecisionId, MutationError> {
    match records.iter().map(|r| r.id).max() {
        None => DecisionId::new(1).ok_or(MutationError::IdsExhausted),
        Some(max) => max.checked_next().ok_or(MutationError::IdsExhausted),
    }
}

/// Highest ID first.
pub fn sort_descending(records: &mut [DecisionRecord]) {
    records.sort_by(|a, b| b.id.cmp(&a.id));
}

pub fn is_descending(records: &[DecisionRecord]) -> bool {
    records.windows(2).all(|pair| pair[0].id > pair[1].id)
}

/// List position of `id`.
pub fn position_of(records: &[DecisionRecord], id: DecisionId) -> Option<usize> {
    records.iter().position(|r| r.id == id)
}

/// Move the record at `from` so that it ends up at index `to`.
pub fn move_within(
    records: &mut Vec<DecisionRecord>,
    from: usize,
    to: usize,
) -> Result<(), MutationError> {
    let len = records.len();
    for index in [from, to] {
        if index >= len {
            return Err(MutationError::IndexOutOfRange { index, len });
        }
    }
    let record = records.remove(from);
    records.insert(to, record);
    Ok(())
}
