//! Statement rendering for select, count and write plans.
//!
//! Relations are loaded in the same statement as their parent rows: each
//! relation field is a correlated subquery producing JSON (`json_object`
//! for `one`, `json_group_array` over a limited subquery for `many`), so a
//! whole selection tree costs one round trip.

use std::borrow::Cow;

use drizzle_graphql_core::model::{Cardinality, Column, ColumnType};
use drizzle_graphql_core::plan::{CountPlan, RelationPlan};
use drizzle_graphql_core::sort::OrderBy;
use drizzle_graphql_core::{CountQuery, DeletePlan, InsertPlan, Row, SelectPlan, UpdatePlan};

#[cfg(feature = "profiling")]
use drizzle_graphql_core::gql_profile_scope;

use crate::conditions::{Aliases, condition, relation_join};
use crate::sql::{SQL, Token};
use crate::values::SQLiteValue;

/// Alias of the statement's root table.
pub const ROOT_ALIAS: &str = "t0";

/// Bound parameters per statement; SQLite's default `SQLITE_MAX_VARIABLE_NUMBER`.
const MAX_PARAMS: usize = 32766;

fn column<'a>(alias: &str, name: &'a str) -> SQL<'a> {
    SQL::qualified(Cow::Owned(alias.to_string()), name)
}

fn text_literal<'a>(text: &str) -> SQL<'a> {
    SQL::raw(format!("'{}'", text.replace('\'', "''")))
}

/// `SELECT` for `plan`. Result columns are the plan's columns, then one JSON
/// column per relation, then one integer per count, in plan order.
pub fn select(plan: &SelectPlan) -> SQL<'_> {
    #[cfg(feature = "profiling")]
    gql_profile_scope!("sqlite", "render_select");
    let mut aliases = Aliases::new();

    let mut items: Vec<SQL<'_>> = plan
        .columns
        .iter()
        .map(|c| column(ROOT_ALIAS, &c.name))
        .collect();
    for relation in &plan.relations {
        items.push(
            relation_subquery(relation, ROOT_ALIAS, &mut aliases)
                .parens()
                .alias(relation.field.as_str()),
        );
    }
    for count in &plan.counts {
        items.push(
            count_subquery(count, ROOT_ALIAS, &mut aliases)
                .parens()
                .alias(count.field.as_str()),
        );
    }

    SQL::token(Token::SELECT)
        .append(select_list(items))
        .push(Token::FROM)
        .append(SQL::ident(plan.table.as_str()).alias(ROOT_ALIAS))
        .append(clauses(plan, ROOT_ALIAS, None, &mut aliases))
}

fn select_list(items: Vec<SQL<'_>>) -> SQL<'_> {
    if items.is_empty() {
        SQL::raw("1")
    } else {
        SQL::join(items, Token::COMMA)
    }
}

/// `WHERE`, `ORDER BY`, `LIMIT` and `OFFSET` of `plan` against `alias`.
fn clauses<'a>(
    plan: &'a SelectPlan,
    alias: &str,
    join: Option<SQL<'a>>,
    aliases: &mut Aliases,
) -> SQL<'a> {
    let mut sql = SQL::empty();

    let conditions: Vec<SQL<'a>> = join
        .into_iter()
        .chain(plan.filter.as_ref().map(|f| condition(f, alias, aliases)))
        .collect();
    if !conditions.is_empty() {
        sql = sql
            .push(Token::WHERE)
            .append(SQL::join(conditions, Token::AND));
    }

    if !plan.order_by.is_empty() {
        let terms = plan.order_by.iter().map(|(name, order)| {
            column(alias, name).push(match order {
                OrderBy::Asc => Token::ASC,
                OrderBy::Desc => Token::DESC,
            })
        });
        sql = sql
            .push(Token::ORDER)
            .push(Token::BY)
            .append(SQL::join(terms, Token::COMMA));
    }

    match (plan.limit, plan.offset) {
        (Some(limit), offset) => {
            sql = sql.push(Token::LIMIT).append(SQL::number(limit));
            if let Some(offset) = offset {
                sql = sql.push(Token::OFFSET).append(SQL::number(offset));
            }
        }
        // SQLite needs a LIMIT before OFFSET; -1 is unbounded
        (None, Some(offset)) => {
            sql = sql
                .push(Token::LIMIT)
                .append(SQL::raw("-1"))
                .push(Token::OFFSET)
                .append(SQL::number(offset));
        }
        (None, None) => {}
    }
    sql
}

/// Subquery producing the JSON of one relation field of the row aliased
/// `parent`.
fn relation_subquery<'a>(
    relation: &'a RelationPlan,
    parent: &str,
    aliases: &mut Aliases,
) -> SQL<'a> {
    let target = aliases.next('t');
    let select = &relation.select;
    let join = relation_join(&relation.relation, parent, &target, aliases);
    let object = json_object(select, &target, aliases);
    let source = SQL::ident(relation.relation.target.as_str()).alias(target.clone());

    match relation.relation.cardinality {
        Cardinality::One => SQL::token(Token::SELECT)
            .append(object)
            .push(Token::FROM)
            .append(source)
            .append(clauses(select, &target, Some(join), aliases)),
        Cardinality::Many => {
            // filter, order and limit in an inner query, aggregate outside it
            let inner = SQL::token(Token::SELECT)
                .append(select_list(
                    needed_columns(select)
                        .into_iter()
                        .map(|name| column(&target, name))
                        .collect(),
                ))
                .push(Token::FROM)
                .append(source)
                .append(clauses(select, &target, Some(join), aliases));
            SQL::token(Token::SELECT)
                .append(SQL::func("json_group_array", object))
                .push(Token::FROM)
                .append(inner.parens().alias(target))
        }
    }
}

/// Columns the aggregated rows must carry: the selected ones plus the join
/// columns nested relations and counts correlate on.
fn needed_columns(select: &SelectPlan) -> Vec<&str> {
    let mut names: Vec<&str> = Vec::new();
    let nested = select
        .relations
        .iter()
        .map(|r| &r.relation)
        .chain(select.counts.iter().map(|c| &c.relation));
    let wanted = select
        .columns
        .iter()
        .map(|c| c.name.as_str())
        .chain(nested.flat_map(|r| r.source_columns.iter().map(String::as_str)));
    for name in wanted {
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

/// `json_object('col', value, ...)` for one row of `select` aliased `alias`.
fn json_object<'a>(select: &'a SelectPlan, alias: &str, aliases: &mut Aliases) -> SQL<'a> {
    let mut pairs: Vec<SQL<'a>> = Vec::new();
    for c in &select.columns {
        let value = column(alias, &c.name);
        let value = match c.column_type {
            ColumnType::Json | ColumnType::Array => SQL::func("json", value),
            ColumnType::Blob => SQL::func("hex", value),
            _ => value,
        };
        pairs.push(text_literal(&c.name).push(Token::COMMA).append(value));
    }
    for relation in &select.relations {
        let nested = relation_subquery(relation, alias, aliases).parens();
        pairs.push(
            text_literal(&relation.field)
                .push(Token::COMMA)
                .append(SQL::func("json", nested)),
        );
    }
    for count in &select.counts {
        pairs.push(
            text_literal(&count.field)
                .push(Token::COMMA)
                .append(count_subquery(count, alias, aliases).parens()),
        );
    }
    SQL::func("json_object", SQL::join(pairs, Token::COMMA))
}

fn count_subquery<'a>(count: &'a CountPlan, parent: &str, aliases: &mut Aliases) -> SQL<'a> {
    let target = aliases.next('t');
    let mut sql = SQL::token(Token::SELECT)
        .append(SQL::func("count", SQL::raw("*")))
        .push(Token::FROM)
        .append(SQL::ident(count.relation.target.as_str()).alias(target.clone()))
        .push(Token::WHERE)
        .append(relation_join(&count.relation, parent, &target, aliases));
    if let Some(filter) = &count.filter {
        sql = sql
            .push(Token::AND)
            .append(condition(filter, &target, aliases));
    }
    sql
}

/// `SELECT count(*)` for a root count query.
pub fn count(query: &CountQuery) -> SQL<'_> {
    let mut aliases = Aliases::new();
    let mut sql = SQL::token(Token::SELECT)
        .append(SQL::func("count", SQL::raw("*")))
        .push(Token::FROM)
        .append(SQL::ident(query.table.as_str()).alias(ROOT_ALIAS));
    if let Some(filter) = &query.filter {
        sql = sql
            .push(Token::WHERE)
            .append(condition(filter, ROOT_ALIAS, &mut aliases));
    }
    sql
}

fn returning<'a>(columns: Option<&'a [Column]>) -> SQL<'a> {
    match columns {
        None => SQL::empty(),
        Some([]) => SQL::token(Token::RETURNING).append(SQL::raw("1")),
        Some(columns) => SQL::token(Token::RETURNING).append(SQL::join(
            columns.iter().map(|c| SQL::ident(c.name.as_str())),
            Token::COMMA,
        )),
    }
}

/// `INSERT` statements for `plan`.
///
/// Consecutive rows with the same keys share one multi-row `VALUES`
/// statement; a row without keys inserts `DEFAULT VALUES`.
pub fn insert(plan: &InsertPlan) -> Vec<SQL<'_>> {
    #[cfg(feature = "profiling")]
    gql_profile_scope!("sqlite", "render_insert");
    let mut statements = Vec::new();
    for group in same_keys(&plan.rows) {
        let keys: Vec<&String> = group[0].keys().collect();
        if keys.is_empty() {
            for _ in group {
                statements.push(
                    SQL::token(Token::INSERT)
                        .push(Token::INTO)
                        .append(SQL::ident(plan.table.as_str()))
                        .push(Token::DEFAULT)
                        .push(Token::VALUES)
                        .append(returning(plan.returning.as_deref())),
                );
            }
            continue;
        }

        for chunk in group.chunks((MAX_PARAMS / keys.len()).max(1)) {
            let tuples = chunk.iter().map(|row| {
                SQL::join(
                    row.values().map(|v| SQL::param(SQLiteValue::from(v))),
                    Token::COMMA,
                )
                .parens()
            });
            statements.push(
                SQL::token(Token::INSERT)
                    .push(Token::INTO)
                    .append(SQL::ident(plan.table.as_str()))
                    .append(
                        SQL::join(keys.iter().map(|k| SQL::ident(k.as_str())), Token::COMMA)
                            .parens(),
                    )
                    .push(Token::VALUES)
                    .append(SQL::join(tuples, Token::COMMA))
                    .append(returning(plan.returning.as_deref())),
            );
        }
    }
    statements
}

/// Splits rows into runs whose key sequences are identical.
fn same_keys(rows: &[Row]) -> Vec<&[Row]> {
    let mut groups = Vec::new();
    let mut start = 0;
    for i in 1..=rows.len() {
        let boundary = i == rows.len() || !rows[i].keys().eq(rows[start].keys());
        if boundary {
            groups.push(&rows[start..i]);
            start = i;
        }
    }
    groups
}

/// `UPDATE`, with the filter qualified by the table name itself.
pub fn update(plan: &UpdatePlan) -> SQL<'_> {
    let mut aliases = Aliases::new();
    let assignments = plan.values.iter().map(|(key, value)| {
        SQL::ident(key.as_str())
            .push(Token::EQ)
            .append(SQL::param(SQLiteValue::from(value)))
    });
    let mut sql = SQL::token(Token::UPDATE)
        .append(SQL::ident(plan.table.as_str()))
        .push(Token::SET)
        .append(SQL::join(assignments, Token::COMMA));
    if let Some(filter) = &plan.filter {
        sql = sql
            .push(Token::WHERE)
            .append(condition(filter, &plan.table, &mut aliases));
    }
    sql.append(returning(plan.returning.as_deref()))
}

pub fn delete(plan: &DeletePlan) -> SQL<'_> {
    let mut aliases = Aliases::new();
    let mut sql = SQL::token(Token::DELETE)
        .push(Token::FROM)
        .append(SQL::ident(plan.table.as_str()));
    if let Some(filter) = &plan.filter {
        sql = sql
            .push(Token::WHERE)
            .append(condition(filter, &plan.table, &mut aliases));
    }
    sql.append(returning(plan.returning.as_deref()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use drizzle_graphql_core::predicate::eq;
    use drizzle_graphql_core::{Relation, Sort};
    use serde_json::json;

    fn text(name: &str) -> Column {
        Column::new(name, ColumnType::Text)
    }

    fn row(value: serde_json::Value) -> Row {
        match value {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn root_select_with_clauses() {
        let mut plan = SelectPlan::new("posts");
        plan.columns = vec![Column::new("id", ColumnType::Integer), text("title")];
        plan.filter = Some(eq("published", true));
        plan.order_by = Sort::new().desc("id");
        plan.limit = Some(5);
        plan.offset = Some(10);
        let sql = select(&plan);
        assert_eq!(
            sql.sql(),
            concat!(
                r#"SELECT "t0"."id", "t0"."title" FROM "posts" AS "t0""#,
                r#" WHERE "t0"."published" = ? ORDER BY "t0"."id" DESC LIMIT 5 OFFSET 10"#
            )
        );
        assert_eq!(sql.params().collect::<Vec<_>>(), vec![&SQLiteValue::Integer(1)]);
    }

    #[test]
    fn offset_without_limit() {
        let mut plan = SelectPlan::new("posts");
        plan.offset = Some(3);
        assert_eq!(
            select(&plan).sql(),
            r#"SELECT 1 FROM "posts" AS "t0" LIMIT -1 OFFSET 3"#
        );
    }

    #[test]
    fn relations_and_counts_as_subqueries() {
        let mut author = SelectPlan::new("users");
        author.columns = vec![text("name")];
        author.limit = Some(1);
        let mut categories = SelectPlan::new("categories");
        categories.columns = vec![text("name")];
        categories.limit = Some(2);

        let mut plan = SelectPlan::new("posts");
        plan.columns = vec![text("title")];
        plan.relations = vec![
            RelationPlan {
                field: "author".into(),
                relation: Relation::one("author", "posts", "users")
                    .from(["author_id"])
                    .to(["id"]),
                select: author,
            },
            RelationPlan {
                field: "categories".into(),
                relation: Relation::many("categories", "posts", "categories")
                    .from(["id"])
                    .to(["id"])
                    .through("post_categories", ["post_id"], ["category_id"]),
                select: categories,
            },
        ];
        plan.counts = vec![CountPlan {
            field: "commentsCount".into(),
            relation: Relation::many("comments", "posts", "comments")
                .from(["id"])
                .to(["post_id"]),
            filter: None,
        }];

        assert_eq!(
            select(&plan).sql(),
            concat!(
                r#"SELECT "t0"."title","#,
                r#" (SELECT json_object('name', "t1"."name") FROM "users" AS "t1""#,
                r#" WHERE "t1"."id" = "t0"."author_id" LIMIT 1) AS "author","#,
                r#" (SELECT json_group_array(json_object('name', "t2"."name"))"#,
                r#" FROM (SELECT "t2"."name" FROM "categories" AS "t2""#,
                r#" WHERE EXISTS (SELECT 1 FROM "post_categories" AS "j3""#,
                r#" WHERE "j3"."category_id" = "t2"."id" AND "j3"."post_id" = "t0"."id") LIMIT 2) AS "t2") AS "categories","#,
                r#" (SELECT count(*) FROM "comments" AS "t4" WHERE "t4"."post_id" = "t0"."id") AS "commentsCount""#,
                r#" FROM "posts" AS "t0""#
            )
        );
    }

    #[test]
    fn nested_many_carries_join_columns() {
        let mut comments = SelectPlan::new("comments");
        comments.columns = vec![text("body")];
        let mut posts = SelectPlan::new("posts");
        posts.columns = vec![text("title")];
        posts.relations = vec![RelationPlan {
            field: "comments".into(),
            relation: Relation::many("comments", "posts", "comments")
                .from(["id"])
                .to(["post_id"]),
            select: comments,
        }];
        assert_eq!(needed_columns(&posts), vec!["title", "id"]);
    }

    #[test]
    fn insert_groups_rows_by_keys() {
        let plan = InsertPlan {
            table: "posts".into(),
            rows: vec![
                row(json!({"title": "a", "published": true})),
                row(json!({"title": "b", "published": false})),
                row(json!({"title": "c"})),
                row(json!({})),
            ],
            returning: Some(vec![Column::new("id", ColumnType::Integer)]),
        };
        let sql: Vec<String> = insert(&plan).iter().map(SQL::sql).collect();
        assert_eq!(
            sql,
            vec![
                r#"INSERT INTO "posts" ("title", "published") VALUES (?, ?), (?, ?) RETURNING "id""#,
                r#"INSERT INTO "posts" ("title") VALUES (?) RETURNING "id""#,
                r#"INSERT INTO "posts" DEFAULT VALUES RETURNING "id""#,
            ]
        );
    }

    #[test]
    fn update_and_delete_qualify_with_table() {
        let plan = UpdatePlan {
            table: "posts".into(),
            values: row(json!({"title": "b"})),
            filter: Some(eq("id", 1)),
            returning: None,
        };
        assert_eq!(
            update(&plan).sql(),
            r#"UPDATE "posts" SET "title" = ? WHERE "posts"."id" = ?"#
        );

        let plan = DeletePlan {
            table: "posts".into(),
            filter: Some(eq("id", 1)),
            returning: Some(vec![text("title")]),
        };
        assert_eq!(
            delete(&plan).sql(),
            r#"DELETE FROM "posts" WHERE "posts"."id" = ? RETURNING "title""#
        );
    }

    #[test]
    fn count_query() {
        let query = CountQuery {
            table: "posts".into(),
            filter: Some(eq("published", true)),
        };
        assert_eq!(
            count(&query).sql(),
            r#"SELECT count(*) FROM "posts" AS "t0" WHERE "t0"."published" = ?"#
        );
    }
}
