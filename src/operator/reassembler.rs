use super::grouper::ShardGroup;
use crate::core::{DbError, Result};

/// Scatters per-group codes back into request order.
///
/// Every index below `len` must be written by exactly one group member.
pub fn reassemble(len: usize, groups: &[ShardGroup], outcomes: &[Vec<i64>]) -> Result<Vec<i64>> {
    if groups.len() != outcomes.len() {
        return Err(DbError::Consistency(format!(
            "{} groups but {} outcomes",
            groups.len(),
            outcomes.len()
        )));
    }

    let mut slots: Vec<Option<i64>> = vec![None; len];
    for (group, codes) in groups.iter().zip(outcomes) {
        if group.member_indices.len() != codes.len() {
            return Err(DbError::Consistency(format!(
                "group on '{}' has {} members but {} codes",
                group.database,
                group.member_indices.len(),
                codes.len()
            )));
        }
        for (index, code) in group.member_indices.iter().zip(codes) {
            let slot = slots.get_mut(*index).ok_or_else(|| {
                DbError::Consistency(format!("index {} is outside a batch of {}", index, len))
            })?;
            if slot.replace(*code).is_some() {
                return Err(DbError::Consistency(format!("index {} written twice", index)));
            }
        }
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| {
            slot.ok_or_else(|| DbError::Consistency(format!("index {} left unwritten", index)))
        })
        .collect()
}
