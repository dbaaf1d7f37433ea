//! An explicit collection of schema descriptors.

use std::sync::Arc;

use indexmap::IndexMap;
use oxide_rowset_core::{Error, Result, Schema};

use crate::resultset::ResultSet;

/// The descriptors a process works with, keyed by name.
///
/// Relationships name their target descriptor; the catalog is where those
/// names are resolved, so descriptors may refer to each other in cycles.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    schemas: IndexMap<String, Arc<Schema>>,
}

impl Catalog {
    /// Creates a catalog and checks every relationship against it.
    pub fn new(schemas: impl IntoIterator<Item = Schema>) -> Result<Self> {
        let mut catalog = Self::default();
        for schema in schemas {
            let name = schema.name().to_string();
            if catalog.schemas.insert(name.clone(), Arc::new(schema)).is_some() {
                return Err(Error::InvalidSchema(format!(
                    "`{name}` is registered twice"
                )));
            }
        }
        catalog.validate()?;
        Ok(catalog)
    }

    fn validate(&self) -> Result<()> {
        for schema in self.schemas.values() {
            for (name, rel) in schema.relationships() {
                let target = self.schemas.get(&rel.target).ok_or_else(|| {
                    Error::InvalidSchema(format!(
                        "relationship `{}.{name}` targets unknown schema `{}`",
                        schema.name(),
                        rel.target
                    ))
                })?;
                if let Some(missing) = rel
                    .foreign_columns
                    .iter()
                    .find(|c| !target.has_column(c))
                {
                    return Err(Error::InvalidSchema(format!(
                        "relationship `{}.{name}` references unknown column `{}.{missing}`",
                        schema.name(),
                        rel.target
                    )));
                }
            }
        }
        Ok(())
    }

    /// Returns a descriptor by name.
    pub fn schema(&self, name: &str) -> Result<&Arc<Schema>> {
        self.schemas
            .get(name)
            .ok_or_else(|| Error::UnknownSchema(name.to_string()))
    }

    /// Returns the unfiltered result set over a descriptor.
    pub fn resultset(&self, name: &str) -> Result<ResultSet> {
        self.schema(name).map(|schema| ResultSet::new(Arc::clone(schema)))
    }

    /// Iterates over the registered descriptors.
    pub fn schemas(&self) -> impl Iterator<Item = &Arc<Schema>> {
        self.schemas.values()
    }
}
