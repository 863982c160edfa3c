//! Storage schema description consumed by the model builder.
//!
//! A [`SchemaDef`] is either written by hand or produced by a storage
//! adapter's introspection, then extended with the relations the storage
//! catalog cannot express (many-to-many through join tables).

use heck::ToUpperCamelCase;
use serde::{Deserialize, Serialize};

use super::{Column, Relation};

/// A table and its columns.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    pub columns: Vec<Column>,
}

impl TableDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: None,
            columns: Vec::new(),
        }
    }

    #[must_use]
    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// Overrides the derived protocol type name.
    #[must_use]
    pub fn type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    /// Protocol type name: explicit, or the singular UpperCamelCase table name.
    pub fn resolved_type_name(&self) -> String {
        self.type_name
            .clone()
            .unwrap_or_else(|| singular(&self.name).to_upper_camel_case())
    }
}

/// Tables plus declared relations.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDef {
    pub tables: Vec<TableDef>,
    #[serde(default)]
    pub relations: Vec<Relation>,
}

impl SchemaDef {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_table(mut self, table: TableDef) -> Self {
        self.tables.push(table);
        self
    }

    /// Adds a relation, replacing any existing relation with the same source
    /// and name.
    #[must_use]
    pub fn with_relation(mut self, relation: Relation) -> Self {
        self.relations
            .retain(|r| !(r.source == relation.source && r.name == relation.name));
        self.relations.push(relation);
        self
    }

    pub fn table(&self, name: &str) -> Option<&TableDef> {
        self.tables.iter().find(|t| t.name == name)
    }
}

fn singular(name: &str) -> String {
    if let Some(stem) = name.strip_suffix("ies") {
        format!("{stem}y")
    } else if name.ends_with("ss") {
        name.to_string()
    } else if let Some(stem) = name.strip_suffix('s') {
        stem.to_string()
    } else {
        name.to_string()
    }
}
