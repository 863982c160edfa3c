//! Raw protocol selection handed over by the protocol layer.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One entry of a selection set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Selection {
    Field(FieldNode),
    /// `...Name`, resolved through [`ResolveInfo::fragments`]
    FragmentSpread(String),
    /// `... { ... }` or `... on Type { ... }`
    InlineFragment(Vec<Selection>),
}

/// A selected field with its arguments and nested selection set.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldNode {
    pub name: String,
    pub arguments: Map<String, Value>,
    pub selections: Vec<Selection>,
}

impl FieldNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn arg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(name.into(), value.into());
        self
    }

    /// Selects a nested field.
    #[must_use]
    pub fn select(mut self, field: FieldNode) -> Self {
        self.selections.push(Selection::Field(field));
        self
    }

    /// Selects several leaf fields.
    #[must_use]
    pub fn fields<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selections
            .extend(names.into_iter().map(|name| Selection::Field(FieldNode::new(name))));
        self
    }

    #[must_use]
    pub fn spread(mut self, fragment: impl Into<String>) -> Self {
        self.selections.push(Selection::FragmentSpread(fragment.into()));
        self
    }

    #[must_use]
    pub fn inline(mut self, selections: Vec<Selection>) -> Self {
        self.selections.push(Selection::InlineFragment(selections));
        self
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.selections.is_empty()
    }
}

/// Per-request resolve information: the root field being resolved plus the
/// document's named fragments.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveInfo {
    pub field: FieldNode,
    pub fragments: HashMap<String, Vec<Selection>>,
}

impl ResolveInfo {
    pub fn new(field: FieldNode) -> Self {
        Self {
            field,
            fragments: HashMap::new(),
        }
    }

    #[must_use]
    pub fn fragment(mut self, name: impl Into<String>, selections: Vec<Selection>) -> Self {
        self.fragments.insert(name.into(), selections);
        self
    }
}
