//! Operation generator: root fields per entity and their handlers.

mod args;
mod mutation;
mod plan;
mod query;

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

pub use args::{Argument, ArgumentKind, QueryArgs, operation_arguments};

use crate::error::{GeneratorError, Result};
use crate::gql_profile_scope;
use crate::model::{Cardinality, ColumnType, Model, SchemaDef};
use crate::operation::Operation;
use crate::policy::GeneratorOptions;
use crate::selection::ResolveInfo;
use crate::storage::Storage;

/// A root field, e.g. `findManyPost`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationField {
    pub name: String,
    pub model: String,
    pub type_name: String,
    pub operation: Operation,
    pub arguments: Vec<Argument>,
    pub returns: Returns,
}

/// Result shape of a root field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Returns {
    /// List of the entity type
    List,
    /// The entity type or `null`
    Nullable,
    /// The entity type
    Object,
    /// Non-null integer
    Int,
}

impl Returns {
    fn of(operation: Operation) -> Self {
        match operation {
            Operation::FindMany
            | Operation::CreateMany
            | Operation::Update
            | Operation::Delete => Returns::List,
            Operation::FindFirst => Returns::Nullable,
            Operation::CreateOne => Returns::Object,
            Operation::Count => Returns::Int,
        }
    }
}

/// A field of an entity's object type.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectField {
    pub name: String,
    pub kind: FieldKind,
    pub nullable: bool,
    pub arguments: Vec<Argument>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum FieldKind {
    Scalar { column_type: ColumnType },
    Object { type_name: String, list: bool },
    /// `<relation>Count`
    Count,
}

/// The generated API: a built model plus the root field table.
///
/// Immutable once built; requests only borrow it.
pub struct Generator<C> {
    model: Model<C>,
    roots: BTreeMap<String, (String, Operation)>,
}

impl<C> Generator<C> {
    pub fn new(schema: SchemaDef, options: GeneratorOptions<C>) -> Result<Self> {
        Ok(Self::from_model(Model::build(schema, options)?))
    }

    pub fn from_model(model: Model<C>) -> Self {
        let roots = model
            .entities()
            .flat_map(|entity| {
                entity.operations().iter().map(|operation| {
                    (
                        root_name(*operation, entity.type_name()),
                        (entity.name().to_string(), *operation),
                    )
                })
            })
            .collect();
        Self { model, roots }
    }

    #[inline]
    pub fn model(&self) -> &Model<C> {
        &self.model
    }

    /// Every root field, grouped by model, operations in generation order.
    pub fn operation_fields(&self) -> Vec<OperationField> {
        self.model
            .entities()
            .flat_map(|entity| {
                entity.operations().iter().map(|operation| OperationField {
                    name: root_name(*operation, entity.type_name()),
                    model: entity.name().to_string(),
                    type_name: entity.type_name().to_string(),
                    operation: *operation,
                    arguments: operation_arguments(*operation),
                    returns: Returns::of(*operation),
                })
            })
            .collect()
    }

    /// Fields of `model`'s object type: exposed columns, then readable
    /// relations, then `<relation>Count` fields.
    pub fn object_fields(&self, model: &str) -> Result<Vec<ObjectField>> {
        let entity = self.model.entity(model)?;
        let mut fields: Vec<ObjectField> = entity
            .exposed_columns()
            .map(|column| ObjectField {
                name: column.name.clone(),
                kind: FieldKind::Scalar {
                    column_type: column.column_type,
                },
                nullable: column.is_nullable(),
                arguments: Vec::new(),
            })
            .collect();

        for relation in entity.relations() {
            if !entity.exposes(&relation.name) || !self.model.relation_readable(relation) {
                continue;
            }
            let target = self.model.entity(&relation.target)?;
            let (list, operation) = match relation.cardinality {
                Cardinality::One => (false, Operation::FindFirst),
                Cardinality::Many => (true, Operation::FindMany),
            };
            fields.push(ObjectField {
                name: relation.name.clone(),
                kind: FieldKind::Object {
                    type_name: target.type_name().to_string(),
                    list,
                },
                nullable: !list,
                arguments: operation_arguments(operation),
            });
        }

        for relation in entity.relations() {
            let name = format!("{}Count", relation.name);
            if !entity.exposes(&name) || !self.model.relation_countable(relation) {
                continue;
            }
            fields.push(ObjectField {
                name,
                kind: FieldKind::Count,
                nullable: false,
                arguments: operation_arguments(Operation::Count),
            });
        }
        Ok(fields)
    }

    /// Resolves the root field named by `info.field` and runs its handler.
    pub fn execute(&self, storage: &dyn Storage, ctx: &C, info: &ResolveInfo) -> Result<Value> {
        let (model, operation) = self
            .roots
            .get(&info.field.name)
            .ok_or_else(|| GeneratorError::UnknownOperation(info.field.name.clone()))?;
        self.execute_operation(storage, ctx, model, *operation, info)
    }

    /// Runs `operation` on `model` for the root field in `info`.
    pub fn execute_operation(
        &self,
        storage: &dyn Storage,
        ctx: &C,
        model: &str,
        operation: Operation,
        info: &ResolveInfo,
    ) -> Result<Value> {
        gql_profile_scope!("generator", "execute");
        let entity = self.model.entity(model)?;
        if !entity.enables(operation) {
            return Err(GeneratorError::OperationNotEnabled {
                model: model.to_string(),
                operation,
            });
        }

        match operation {
            Operation::FindMany => self.find_many(storage, entity, ctx, info),
            Operation::FindFirst => self.find_first(storage, entity, ctx, info),
            Operation::Count => self.count(storage, entity, ctx, info),
            Operation::CreateOne => self.create_one(storage, entity, ctx, info),
            Operation::CreateMany => self.create_many(storage, entity, ctx, info),
            Operation::Update => self.update(storage, entity, ctx, info),
            Operation::Delete => self.delete(storage, entity, ctx, info),
        }
    }
}

impl<C> std::fmt::Debug for Generator<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Generator")
            .field("model", &self.model)
            .field("roots", &self.roots)
            .finish()
    }
}

fn root_name(operation: Operation, type_name: &str) -> String {
    format!("{}{type_name}", operation.as_str())
}
