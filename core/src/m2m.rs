//! Replace-set writes for relations mediated by a join table.

use serde_json::Value;

use crate::error::{GeneratorError, Result};
use crate::model::{Entity, Relation};
use crate::plan::{DeletePlan, InsertPlan};
use crate::predicate::Predicate;
use crate::storage::Storage;
use crate::Row;

/// A `{ relation: { set: [...] } }` mutation input entry.
#[derive(Clone, Debug, PartialEq)]
pub struct RelationSet<'a> {
    pub relation: &'a Relation,
    /// Target key values of every element in the new set; `None` when the
    /// directive carries no `set`.
    pub set: Option<Vec<Row>>,
}

impl<'a> RelationSet<'a> {
    /// Parses the directive for input key `key`, which must name a
    /// many-to-many relation of `entity`.
    pub fn parse<C>(entity: &'a Entity<C>, key: &str, value: &Value) -> Result<Self> {
        let relation = entity
            .relation(key)
            .ok_or_else(|| GeneratorError::unknown_field(entity.name(), key))?;
        if !relation.is_many_to_many() {
            return Err(GeneratorError::InvalidArgument(format!(
                "`{key}` on {} is not a many-to-many relation and cannot be set",
                entity.name()
            )));
        }

        let Value::Object(directive) = value else {
            return Err(GeneratorError::InvalidArgument(format!(
                "`{key}` expects {{ set: [...] }}, got {value}"
            )));
        };
        let set = match directive.get("set") {
            None | Some(Value::Null) => None,
            Some(Value::Array(elements)) => Some(
                elements
                    .iter()
                    .map(|element| target_keys(relation, element))
                    .collect::<Result<Vec<_>>>()?,
            ),
            Some(other) => {
                return Err(GeneratorError::InvalidArgument(format!(
                    "`{key}.set` expects a list, got {other}"
                )));
            }
        };
        Ok(Self { relation, set })
    }
}

fn target_keys(relation: &Relation, element: &Value) -> Result<Row> {
    let Value::Object(element) = element else {
        return Err(GeneratorError::InvalidArgument(format!(
            "`{}.set` elements must be objects, got {element}",
            relation.name
        )));
    };
    let mut keys = Row::new();
    for column in &relation.target_columns {
        let value = element.get(column).ok_or_else(|| {
            GeneratorError::InvalidArgument(format!(
                "`{}.set` element is missing key `{column}`",
                relation.name
            ))
        })?;
        keys.insert(column.clone(), value.clone());
    }
    Ok(keys)
}

/// Replaces the join rows of `parent` for `relation` with exactly `set`.
///
/// The delete of the existing join rows and the insert of the new ones run
/// in one transaction.
pub fn replace_relation_set(
    storage: &dyn Storage,
    relation: &Relation,
    parent: &Row,
    set: &[Row],
) -> Result<()> {
    let Some(through) = &relation.through else {
        return Err(GeneratorError::InvalidArgument(format!(
            "relation `{}` has no join table",
            relation.name
        )));
    };

    let mut parent_keys = Vec::with_capacity(through.source_columns.len());
    for (source, join) in relation.source_through_pairs() {
        let value = parent.get(source).ok_or_else(|| {
            GeneratorError::Mapping(format!(
                "parent row of `{}` lacks join key `{source}`",
                relation.name
            ))
        })?;
        parent_keys.push((join, value));
    }

    let delete = DeletePlan {
        table: through.table.clone(),
        filter: Predicate::key_match(parent_keys.iter().map(|(c, v)| (*c, *v))),
        returning: None,
    };

    let mut rows = Vec::with_capacity(set.len());
    for element in set {
        let mut row = Row::new();
        for (join, value) in &parent_keys {
            row.insert(join.to_string(), (*value).clone());
        }
        for (target, join) in relation.target_through_pairs() {
            let value = element.get(target).ok_or_else(|| {
                GeneratorError::InvalidArgument(format!(
                    "`{}.set` element is missing key `{target}`",
                    relation.name
                ))
            })?;
            row.insert(join.to_string(), value.clone());
        }
        rows.push(row);
    }
    let insert = InsertPlan {
        table: through.table.clone(),
        rows,
        returning: None,
    };

    storage.transaction(&mut |tx| {
        tx.delete(&delete)?;
        if !insert.rows.is_empty() {
            tx.insert(&insert)?;
        }
        Ok(())
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::model::tests::blog_model;
    use crate::plan::{CountQuery, MutationOutput, SelectPlan, UpdatePlan};
    use crate::predicate::eq;
    use serde_json::json;

    /// Records every statement; selects return canned rows.
    #[derive(Default)]
    pub(crate) struct Recorder {
        pub(crate) log: RefCell<Vec<String>>,
        pub(crate) selects: RefCell<Vec<SelectPlan>>,
        pub(crate) updates: RefCell<Vec<UpdatePlan>>,
        pub(crate) deletes: RefCell<Vec<DeletePlan>>,
        pub(crate) inserts: RefCell<Vec<InsertPlan>>,
        pub(crate) rows: Vec<Row>,
    }

    impl Storage for Recorder {
        fn select(&self, plan: &SelectPlan) -> Result<Vec<Row>> {
            self.log.borrow_mut().push(format!("select {}", plan.table));
            self.selects.borrow_mut().push(plan.clone());
            Ok(self.rows.clone())
        }

        fn count(&self, query: &CountQuery) -> Result<u64> {
            self.log.borrow_mut().push(format!("count {}", query.table));
            Ok(self.rows.len() as u64)
        }

        fn insert(&self, plan: &InsertPlan) -> Result<MutationOutput> {
            self.log.borrow_mut().push(format!("insert {}", plan.table));
            self.inserts.borrow_mut().push(plan.clone());
            Ok(MutationOutput {
                affected: plan.rows.len(),
                rows: plan.returning.as_ref().map(|_| plan.rows.clone()).unwrap_or_default(),
            })
        }

        fn update(&self, plan: &UpdatePlan) -> Result<MutationOutput> {
            self.log.borrow_mut().push(format!("update {}", plan.table));
            self.updates.borrow_mut().push(plan.clone());
            Ok(MutationOutput {
                affected: self.rows.len(),
                rows: self.rows.clone(),
            })
        }

        fn delete(&self, plan: &DeletePlan) -> Result<MutationOutput> {
            self.log.borrow_mut().push(format!("delete {}", plan.table));
            self.deletes.borrow_mut().push(plan.clone());
            Ok(MutationOutput {
                affected: self.rows.len(),
                rows: Vec::new(),
            })
        }

        fn transaction(&self, f: &mut dyn FnMut(&dyn Storage) -> Result<()>) -> Result<()> {
            self.log.borrow_mut().push("begin".into());
            let result = f(self);
            let end = if result.is_ok() { "commit" } else { "rollback" };
            self.log.borrow_mut().push(end.into());
            result
        }
    }

    pub(crate) fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn parses_set_directive() {
        let model = blog_model();
        let posts = model.entity("posts").unwrap();
        let set = RelationSet::parse(
            posts,
            "categories",
            &json!({ "set": [{ "id": "c1", "name": "ignored" }, { "id": "c2" }] }),
        )
        .unwrap();
        assert_eq!(set.relation.name, "categories");
        assert_eq!(
            set.set,
            Some(vec![row(json!({ "id": "c1" })), row(json!({ "id": "c2" }))])
        );

        let err = RelationSet::parse(posts, "author", &json!({ "set": [] })).unwrap_err();
        assert!(matches!(err, GeneratorError::InvalidArgument(_)));
        let err = RelationSet::parse(posts, "tags", &json!({ "set": [] })).unwrap_err();
        assert!(matches!(err, GeneratorError::UnknownField { .. }));
    }

    #[test]
    fn deletes_then_inserts_in_one_transaction() {
        let model = blog_model();
        let relation = model.entity("posts").unwrap().relation("categories").unwrap();
        let storage = Recorder::default();
        let parent = row(json!({ "id": 7, "title": "x" }));
        let set = [row(json!({ "id": "c1" })), row(json!({ "id": "c2" }))];

        replace_relation_set(&storage, relation, &parent, &set).unwrap();

        assert_eq!(
            *storage.log.borrow(),
            vec!["begin", "delete post_categories", "insert post_categories", "commit"]
        );
        assert_eq!(storage.deletes.borrow()[0].filter, Some(eq("post_id", 7)));
        assert_eq!(
            storage.inserts.borrow()[0].rows,
            vec![
                row(json!({ "post_id": 7, "category_id": "c1" })),
                row(json!({ "post_id": 7, "category_id": "c2" })),
            ]
        );
    }

    #[test]
    fn empty_set_only_clears() {
        let model = blog_model();
        let relation = model.entity("posts").unwrap().relation("categories").unwrap();
        let storage = Recorder::default();
        replace_relation_set(&storage, relation, &row(json!({ "id": 1 })), &[]).unwrap();
        assert_eq!(
            *storage.log.borrow(),
            vec!["begin", "delete post_categories", "commit"]
        );
    }

    #[test]
    fn parent_without_join_key_fails_before_writing() {
        let model = blog_model();
        let relation = model.entity("posts").unwrap().relation("categories").unwrap();
        let storage = Recorder::default();
        let err = replace_relation_set(&storage, relation, &row(json!({ "title": "x" })), &[])
            .unwrap_err();
        assert!(matches!(err, GeneratorError::Mapping(_)));
        assert!(storage.log.borrow().is_empty());
    }
}
