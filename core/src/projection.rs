//! Projection of a raw selection into the fields to fetch.

use std::collections::HashMap;

use hashbrown::HashSet;
use serde_json::{Map, Value};

use crate::error::{GeneratorError, Result};
use crate::gql_profile_function;
use crate::selection::{FieldNode, ResolveInfo, Selection};

/// How a field is selected.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldSelection {
    /// Scalar field, fetch the column. Count fields carry a `where` argument.
    Leaf { arguments: Map<String, Value> },
    /// Relation (or other object) field with its own arguments and fields
    Nested {
        arguments: Map<String, Value>,
        tree: FieldTree,
    },
}

impl FieldSelection {
    pub fn arguments(&self) -> &Map<String, Value> {
        match self {
            FieldSelection::Leaf { arguments } | FieldSelection::Nested { arguments, .. } => {
                arguments
            }
        }
    }

    pub fn tree(&self) -> Option<&FieldTree> {
        match self {
            FieldSelection::Leaf { .. } => None,
            FieldSelection::Nested { tree, .. } => Some(tree),
        }
    }
}

/// Normalized selection: field name to leaf or nested tree, in selection
/// order, with fragments expanded and meta fields dropped.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldTree {
    fields: Vec<(String, FieldSelection)>,
}

impl FieldTree {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&FieldSelection> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, s)| s)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldSelection)> {
        self.fields.iter().map(|(n, s)| (n.as_str(), s))
    }

    /// `{ field: true | { ... } }`, the field tree as a plain value.
    pub fn to_value(&self) -> Value {
        let map = self
            .fields
            .iter()
            .map(|(name, selection)| {
                let value = match selection {
                    FieldSelection::Leaf { .. } => Value::Bool(true),
                    FieldSelection::Nested { tree, .. } => tree.to_value(),
                };
                (name.clone(), value)
            })
            .collect();
        Value::Object(map)
    }

    fn insert(&mut self, name: &str, selection: FieldSelection) {
        let Some(slot) = self.fields.iter_mut().find(|(n, _)| n == name) else {
            self.fields.push((name.to_string(), selection));
            return;
        };
        match (&mut slot.1, selection) {
            (
                FieldSelection::Nested { arguments, tree },
                FieldSelection::Nested {
                    arguments: more_arguments,
                    tree: more,
                },
            ) => {
                if arguments.is_empty() {
                    *arguments = more_arguments;
                }
                for (name, selection) in more.fields {
                    tree.insert(&name, selection);
                }
            }
            (existing @ FieldSelection::Leaf { .. }, nested @ FieldSelection::Nested { .. }) => {
                *existing = nested;
            }
            (
                FieldSelection::Leaf { arguments },
                FieldSelection::Leaf {
                    arguments: more_arguments,
                },
            ) => {
                if arguments.is_empty() {
                    *arguments = more_arguments;
                }
            }
            (FieldSelection::Nested { .. }, FieldSelection::Leaf { .. }) => {}
        }
    }
}

/// Projects the root field's selection set.
pub fn project(info: &ResolveInfo) -> Result<FieldTree> {
    gql_profile_function!();
    project_field(&info.field, &info.fragments)
}

/// Projects the selection set below `field`.
pub fn project_field(
    field: &FieldNode,
    fragments: &HashMap<String, Vec<Selection>>,
) -> Result<FieldTree> {
    let mut projector = Projector {
        fragments,
        active: HashSet::new(),
    };
    projector.tree(&field.selections)
}

struct Projector<'a> {
    fragments: &'a HashMap<String, Vec<Selection>>,
    active: HashSet<&'a str>,
}

impl<'a> Projector<'a> {
    fn tree(&mut self, selections: &'a [Selection]) -> Result<FieldTree> {
        let mut tree = FieldTree::new();
        self.collect(selections, &mut tree)?;
        Ok(tree)
    }

    fn collect(&mut self, selections: &'a [Selection], tree: &mut FieldTree) -> Result<()> {
        for selection in selections {
            match selection {
                Selection::Field(field) if field.name.starts_with("__") => {}
                Selection::Field(field) if field.is_leaf() => {
                    let leaf = FieldSelection::Leaf {
                        arguments: field.arguments.clone(),
                    };
                    tree.insert(&field.name, leaf);
                }
                Selection::Field(field) => {
                    let nested = FieldSelection::Nested {
                        arguments: field.arguments.clone(),
                        tree: self.tree(&field.selections)?,
                    };
                    tree.insert(&field.name, nested);
                }
                Selection::InlineFragment(inner) => self.collect(inner, tree)?,
                Selection::FragmentSpread(name) => {
                    let fragments = self.fragments;
                    let (name, inner) = fragments
                        .get_key_value(name.as_str())
                        .ok_or_else(|| GeneratorError::UnknownFragment(name.clone()))?;
                    if !self.active.insert(name.as_str()) {
                        return Err(GeneratorError::FragmentCycle(name.clone()));
                    }
                    self.collect(inner, tree)?;
                    self.active.remove(name.as_str());
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn leaves_and_nested_fields() {
        let info = ResolveInfo::new(
            FieldNode::new("findManyPost")
                .fields(["id", "title", "__typename"])
                .select(FieldNode::new("author").arg("limit", 1).fields(["name"])),
        );
        let tree = project(&info).unwrap();
        assert_eq!(
            tree.to_value(),
            json!({ "id": true, "title": true, "author": { "name": true } })
        );
        let Some(FieldSelection::Nested { arguments, .. }) = tree.get("author") else {
            panic!("author should be nested");
        };
        assert_eq!(arguments.get("limit"), Some(&json!(1)));
    }

    #[test]
    fn fragments_expand_and_merge() {
        let info = ResolveInfo::new(
            FieldNode::new("findManyPost")
                .spread("Base")
                .select(FieldNode::new("author").fields(["email"])),
        )
        .fragment(
            "Base",
            vec![
                Selection::Field(FieldNode::new("id")),
                Selection::Field(FieldNode::new("author").fields(["name"])),
                Selection::InlineFragment(vec![Selection::Field(FieldNode::new("title"))]),
            ],
        );
        let tree = project(&info).unwrap();
        assert_eq!(
            tree.to_value(),
            json!({ "id": true, "author": { "name": true, "email": true }, "title": true })
        );
    }

    #[test]
    fn meta_only_selection_is_empty() {
        let info = ResolveInfo::new(FieldNode::new("createOnePost").fields(["__typename"]));
        assert!(project(&info).unwrap().is_empty());
    }

    #[test]
    fn fragment_cycle_is_detected() {
        let info = ResolveInfo::new(FieldNode::new("findManyPost").spread("A"))
            .fragment(
                "A",
                vec![Selection::Field(FieldNode::new("author").spread("A"))],
            );
        assert!(matches!(project(&info), Err(GeneratorError::FragmentCycle(_))));
    }
}
