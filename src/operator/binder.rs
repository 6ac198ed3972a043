use crate::core::{DbError, Result, Value};
use crate::record::{Accessor, FieldAccessors};
use crate::sharding::ShardKey;
use crate::template::SqlTemplate;
use std::sync::Arc;

/// One record after shard resolution and binding.
#[derive(Debug, Clone, PartialEq)]
pub struct RowBinding {
    pub original_index: usize,
    pub shard_key: ShardKey,
    pub sql: Arc<str>,
    pub values: Vec<Value>,
}

struct BoundField<R> {
    path: String,
    accessor: Accessor<R>,
}

/// Extracts positional values from records in template order.
///
/// Every field reference of the template is resolved to an accessor when the
/// binder is built, so binding a row is a table walk plus function calls.
pub struct RowBinder<R> {
    template: SqlTemplate,
    fields: Vec<BoundField<R>>,
}

impl<R> RowBinder<R> {
    pub fn new(template: SqlTemplate, accessors: &FieldAccessors<R>) -> Result<Self> {
        let fields = template
            .fields()
            .iter()
            .map(|path| {
                Ok(BoundField {
                    path: path.clone(),
                    accessor: accessors.resolve(path)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { template, fields })
    }

    pub fn template(&self) -> &SqlTemplate {
        &self.template
    }

    pub fn values(&self, record: &R) -> Result<Vec<Value>> {
        self.fields
            .iter()
            .map(|field| {
                (field.accessor)(record).ok_or_else(|| {
                    DbError::Binding(format!("record has no field '{}'", field.path))
                })
            })
            .collect()
    }

    pub fn render(&self, table: &str) -> String {
        self.template.render(table)
    }

    /// Rendered statement text and positional values of one record.
    pub fn bind(&self, record: &R, table: &str) -> Result<(String, Vec<Value>)> {
        let values = self.values(record)?;
        Ok((self.render(table), values))
    }
}
