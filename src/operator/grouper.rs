use super::binder::RowBinding;
use crate::core::Value;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Rows sharing one database and one rendered statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShardGroup {
    pub database: String,
    #[serde(serialize_with = "serialize_sql")]
    pub sql: Arc<str>,
    #[serde(skip)]
    pub rows: Vec<Vec<Value>>,
    pub member_indices: Vec<usize>,
}

fn serialize_sql<S: serde::Serializer>(sql: &Arc<str>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(sql)
}

impl ShardGroup {
    fn new(database: String, sql: Arc<str>) -> Self {
        Self {
            database,
            sql,
            rows: Vec::new(),
            member_indices: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.member_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.member_indices.is_empty()
    }
}

/// Stable partition of bindings by `(database, sql)`.
///
/// Groups come out in the order their key was first seen and members keep
/// their relative input order.
pub fn group(bindings: Vec<RowBinding>) -> Vec<ShardGroup> {
    let mut positions: HashMap<(String, Arc<str>), usize> = HashMap::new();
    let mut groups: Vec<ShardGroup> = Vec::new();

    for binding in bindings {
        let RowBinding {
            original_index,
            shard_key,
            sql,
            values,
        } = binding;

        let position = *positions
            .entry((shard_key.database.clone(), Arc::clone(&sql)))
            .or_insert_with(|| {
                groups.push(ShardGroup::new(shard_key.database, sql));
                groups.len() - 1
            });

        let group = &mut groups[position];
        group.rows.push(values);
        group.member_indices.push(original_index);
    }

    groups
}
