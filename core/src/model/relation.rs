//! Relation descriptors, including join-table mediated many-to-many.

use serde::{Deserialize, Serialize};

/// Relation cardinality.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    /// At most one target row; loaded with `LIMIT 1`
    One,
    /// Any number of target rows; loaded as an array
    Many,
}

/// Join table of a many-to-many relation.
///
/// `source_columns[i]` in the join table holds the value of the owning
/// relation's `source_columns[i]`; `target_columns[i]` holds the value of the
/// relation's `target_columns[i]`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Through {
    pub table: String,
    pub source_columns: Vec<String>,
    pub target_columns: Vec<String>,
}

/// A relation from one table to another.
///
/// Without [`Through`] the join is `target.target_columns[i] =
/// source.source_columns[i]`. With it, both sides join the through table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relation {
    pub name: String,
    pub source: String,
    pub target: String,
    pub cardinality: Cardinality,
    pub source_columns: Vec<String>,
    pub target_columns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub through: Option<Through>,
}

impl Relation {
    /// Declares a `one` relation named `name` on `source` pointing at `target`.
    pub fn one(
        name: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self::new(name, source, target, Cardinality::One)
    }

    /// Declares a `many` relation named `name` on `source` pointing at `target`.
    pub fn many(
        name: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self::new(name, source, target, Cardinality::Many)
    }

    fn new(
        name: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
        cardinality: Cardinality,
    ) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            target: target.into(),
            cardinality,
            source_columns: Vec::new(),
            target_columns: Vec::new(),
            through: None,
        }
    }

    /// Source-side join columns (`from` in drizzle relations).
    #[must_use]
    pub fn from<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.source_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Target-side join columns (`to` in drizzle relations).
    #[must_use]
    pub fn to<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Routes the relation through a join table.
    #[must_use]
    pub fn through<I, J, S, T>(mut self, table: impl Into<String>, source: I, target: J) -> Self
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        self.through = Some(Through {
            table: table.into(),
            source_columns: source.into_iter().map(Into::into).collect(),
            target_columns: target.into_iter().map(Into::into).collect(),
        });
        self
    }

    #[inline]
    pub fn is_many_to_many(&self) -> bool {
        self.through.is_some()
    }

    /// Pairs of `(source column, through column)` for a many-to-many relation.
    pub fn source_through_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.through.iter().flat_map(|through| {
            self.source_columns
                .iter()
                .zip(&through.source_columns)
                .map(|(s, t)| (s.as_str(), t.as_str()))
        })
    }

    /// Pairs of `(target column, through column)` for a many-to-many relation.
    pub fn target_through_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.through.iter().flat_map(|through| {
            self.target_columns
                .iter()
                .zip(&through.target_columns)
                .map(|(s, t)| (s.as_str(), t.as_str()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn through_pairs_line_up() {
        let relation = Relation::many("categories", "posts", "categories")
            .from(["id"])
            .to(["id"])
            .through("post_categories", ["post_id"], ["category_id"]);

        assert!(relation.is_many_to_many());
        assert_eq!(
            relation.source_through_pairs().collect::<Vec<_>>(),
            vec![("id", "post_id")]
        );
        assert_eq!(
            relation.target_through_pairs().collect::<Vec<_>>(),
            vec![("id", "category_id")]
        );
    }

    #[test]
    fn plain_relation_has_no_through_pairs() {
        let relation = Relation::one("author", "posts", "users")
            .from(["author_id"])
            .to(["id"]);
        assert_eq!(relation.source_through_pairs().count(), 0);
    }
}
