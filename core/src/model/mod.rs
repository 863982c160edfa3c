//! Relation/CRUD model: entities, columns, relations and enabled operations.

mod column;
mod entity;
mod relation;
mod schema;

use std::collections::BTreeMap;

pub use column::{Column, ColumnType};
pub use entity::Entity;
pub use relation::{Cardinality, Relation, Through};
pub use schema::{SchemaDef, TableDef};

use crate::error::{GeneratorError, Result};
use crate::operation::{Operation, OperationSelection};
use crate::policy::{GeneratorOptions, ModelParams};

/// Every modeled entity, keyed by table name. Immutable once built.
pub struct Model<C> {
    entities: BTreeMap<String, Entity<C>>,
}

impl<C> Model<C> {
    /// Builds the model from a schema description, evaluating the build-time
    /// callbacks (`fields`, `operations`, `input_fields`) once per table.
    ///
    /// Relations are validated against the whole schema; relations whose
    /// target table is not modeled are dropped.
    pub fn build(schema: SchemaDef, options: GeneratorOptions<C>) -> Result<Self> {
        for relation in &schema.relations {
            validate_relation(&schema, relation)?;
        }

        let modeled: Vec<&TableDef> = schema
            .tables
            .iter()
            .filter(|table| options.is_modeled(&table.name))
            .collect();

        let mut entities = BTreeMap::new();
        for table in &modeled {
            let policy = options.options_for(&table.name);
            let params = ModelParams {
                model_name: &table.name,
            };

            let operations = policy
                .operations
                .as_ref()
                .and_then(|f| f(&params))
                .unwrap_or_default();
            let operations = OperationSelection::resolve(&operations);

            let relations: Vec<Relation> = schema
                .relations
                .iter()
                .filter(|r| r.source == table.name)
                .filter(|r| modeled.iter().any(|t| t.name == r.target))
                .cloned()
                .collect();

            if let Some(clash) = relations
                .iter()
                .find(|r| table.columns.iter().any(|c| c.name == r.name))
            {
                return Err(GeneratorError::Schema(format!(
                    "relation `{}` on `{}` has the same name as a column",
                    clash.name, table.name
                )));
            }

            let entity = Entity {
                name: table.name.clone(),
                type_name: table.resolved_type_name(),
                columns: table.columns.clone(),
                relations,
                operations,
                fields: policy.fields.as_ref().and_then(|f| f(&params)),
                input_fields: policy.input_fields.as_ref().and_then(|f| f(&params)),
                policy,
            };
            entities.insert(table.name.clone(), entity);
        }

        Ok(Self { entities })
    }

    pub fn entity(&self, name: &str) -> Result<&Entity<C>> {
        self.entities
            .get(name)
            .ok_or_else(|| GeneratorError::UnknownModel(name.to_string()))
    }

    /// Looks an entity up by its protocol type name (`Post`).
    pub fn entity_by_type(&self, type_name: &str) -> Option<&Entity<C>> {
        self.entities.values().find(|e| e.type_name() == type_name)
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity<C>> {
        self.entities.values()
    }

    /// Whether `relation` is exposed as a field: its target must enable the
    /// read operation matching the relation's cardinality.
    pub fn relation_readable(&self, relation: &Relation) -> bool {
        let operation = match relation.cardinality {
            Cardinality::One => Operation::FindFirst,
            Cardinality::Many => Operation::FindMany,
        };
        self.entity(&relation.target)
            .is_ok_and(|target| target.enables(operation))
    }

    /// Whether `relation` gets a `<relation>Count` field.
    pub fn relation_countable(&self, relation: &Relation) -> bool {
        relation.cardinality == Cardinality::Many
            && self
                .entity(&relation.target)
                .is_ok_and(|target| target.enables(Operation::Count))
    }
}

impl<C> std::fmt::Debug for Model<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.entities.iter()).finish()
    }
}

fn validate_relation(schema: &SchemaDef, relation: &Relation) -> Result<()> {
    let fail = |message: String| -> Result<()> {
        Err(GeneratorError::Schema(format!(
            "relation `{}` on `{}`: {message}",
            relation.name, relation.source
        )))
    };

    let Some(source) = schema.table(&relation.source) else {
        return fail(format!("unknown table `{}`", relation.source));
    };
    let Some(target) = schema.table(&relation.target) else {
        return fail(format!("unknown table `{}`", relation.target));
    };

    if relation.source_columns.is_empty()
        || relation.source_columns.len() != relation.target_columns.len()
    {
        return fail("join key lists must be non-empty and of equal length".into());
    }
    if let Some(column) = missing_column(source, &relation.source_columns) {
        return fail(format!("unknown column `{}.{column}`", source.name));
    }
    if let Some(column) = missing_column(target, &relation.target_columns) {
        return fail(format!("unknown column `{}.{column}`", target.name));
    }

    if let Some(through) = &relation.through {
        let Some(join) = schema.table(&through.table) else {
            return fail(format!("unknown join table `{}`", through.table));
        };
        if through.source_columns.len() != relation.source_columns.len()
            || through.target_columns.len() != relation.target_columns.len()
        {
            return fail("join table key lists must match the relation keys".into());
        }
        let join_columns = through.source_columns.iter().chain(&through.target_columns);
        for column in join_columns {
            if join.columns.iter().all(|c| &c.name != column) {
                return fail(format!("unknown column `{}.{column}`", join.name));
            }
        }
    }

    Ok(())
}

fn missing_column<'a>(table: &TableDef, columns: &'a [String]) -> Option<&'a str> {
    columns
        .iter()
        .find(|name| table.columns.iter().all(|c| &c.name != *name))
        .map(String::as_str)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::operation::OperationGroup;
    use crate::policy::{IncludeExclude, ModelOptions};

    /// users, posts, categories and the `post_categories` join table.
    pub(crate) fn blog_schema() -> SchemaDef {
        SchemaDef::new()
            .with_table(
                TableDef::new("users")
                    .column(Column::new("id", ColumnType::Integer).primary_key())
                    .column(Column::new("name", ColumnType::Text).not_null())
                    .column(Column::new("email", ColumnType::Text)),
            )
            .with_table(
                TableDef::new("posts")
                    .column(Column::new("id", ColumnType::Integer).primary_key())
                    .column(Column::new("title", ColumnType::Text).not_null())
                    .column(Column::new("body", ColumnType::Text))
                    .column(
                        Column::new("published", ColumnType::Boolean)
                            .not_null()
                            .has_default(),
                    )
                    .column(Column::new("author_id", ColumnType::Integer)),
            )
            .with_table(
                TableDef::new("categories")
                    .column(Column::new("id", ColumnType::Text).primary_key())
                    .column(Column::new("name", ColumnType::Text).not_null()),
            )
            .with_table(
                TableDef::new("post_categories")
                    .column(Column::new("post_id", ColumnType::Integer).not_null())
                    .column(Column::new("category_id", ColumnType::Text).not_null()),
            )
            .with_relation(
                Relation::one("author", "posts", "users")
                    .from(["author_id"])
                    .to(["id"]),
            )
            .with_relation(
                Relation::many("posts", "users", "posts")
                    .from(["id"])
                    .to(["author_id"]),
            )
            .with_relation(
                Relation::many("categories", "posts", "categories")
                    .from(["id"])
                    .to(["id"])
                    .through("post_categories", ["post_id"], ["category_id"]),
            )
            .with_relation(
                Relation::many("posts", "categories", "posts")
                    .from(["id"])
                    .to(["id"])
                    .through("post_categories", ["category_id"], ["post_id"]),
            )
    }

    pub(crate) fn blog_options<C>() -> GeneratorOptions<C> {
        GeneratorOptions::new().use_models(IncludeExclude::exclude(["post_categories"]))
    }

    pub(crate) fn blog_model() -> Model<()> {
        match Model::build(blog_schema(), blog_options()) {
            Ok(model) => model,
            Err(err) => panic!("fixture schema is invalid: {err}"),
        }
    }

    #[test]
    fn builds_entities_and_relations() {
        let model = blog_model();
        assert!(model.entity("post_categories").is_err());

        let posts = model.entity("posts").unwrap();
        assert_eq!(posts.type_name(), "Post");
        assert_eq!(posts.operations(), Operation::ALL);
        assert_eq!(
            posts.relations().iter().map(|r| r.name.as_str()).collect::<Vec<_>>(),
            vec!["author", "categories"]
        );
        assert!(posts.relation("categories").unwrap().is_many_to_many());
        assert_eq!(model.entity_by_type("Category").unwrap().name(), "categories");
    }

    #[test]
    fn relations_to_unmodeled_tables_are_dropped() {
        let options =
            GeneratorOptions::<()>::new().use_models(IncludeExclude::include(["posts", "post_categories"]));
        let model = Model::build(blog_schema(), options).unwrap();
        assert!(model.entity("posts").unwrap().relations().is_empty());
    }

    #[test]
    fn operations_and_fields_are_evaluated_at_build_time() {
        let options = blog_options::<()>().model(
            "users",
            ModelOptions::new()
                .operations(|_| Some(OperationSelection::include([OperationGroup::Query])))
                .fields(|_| Some(IncludeExclude::exclude(["email"])))
                .input_fields(|_| Some(IncludeExclude::include(["name"]))),
        );
        let model = Model::build(blog_schema(), options).unwrap();
        let users = model.entity("users").unwrap();

        assert!(users.enables(Operation::Count));
        assert!(!users.enables(Operation::CreateOne));
        assert!(!users.exposes("email"));
        assert!(users.exposes("name"));
        assert!(users.accepts_input("name"));
        assert!(!users.accepts_input("id"));

        // users no longer enables findFirst, so posts.author is not readable
        let posts = model.entity("posts").unwrap();
        assert!(!model.relation_readable(posts.relation("author").unwrap()));
        assert!(model.relation_countable(posts.relation("categories").unwrap()));
    }

    #[test]
    fn invalid_relations_are_schema_errors() {
        let schema = blog_schema().with_relation(
            Relation::one("author", "posts", "users")
                .from(["writer_id"])
                .to(["id"]),
        );
        assert!(matches!(
            Model::build(schema, GeneratorOptions::<()>::new()),
            Err(GeneratorError::Schema(_))
        ));

        let schema = blog_schema().with_relation(
            Relation::many("tags", "posts", "tags").from(["id"]).to(["id"]),
        );
        assert!(matches!(
            Model::build(schema, GeneratorOptions::<()>::new()),
            Err(GeneratorError::Schema(_))
        ));

        let schema = blog_schema().with_relation(
            Relation::many("categories", "posts", "categories")
                .from(["id"])
                .to(["id"])
                .through("post_categories", ["post_id", "x"], ["category_id"]),
        );
        assert!(matches!(
            Model::build(schema, GeneratorOptions::<()>::new()),
            Err(GeneratorError::Schema(_))
        ));
    }
}
