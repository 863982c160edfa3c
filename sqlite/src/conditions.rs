//! Rendering of compiled predicates into SQLite conditions.
//!
//! Column names in a [`Predicate`] are relative to one table; rendering
//! qualifies them with the alias that table has in the statement.

use std::borrow::Cow;

use drizzle_graphql_core::predicate::{ArrayOp, CompareOp, LikeOp};
use drizzle_graphql_core::{Predicate, Relation};

use crate::sql::{SQL, Token};
use crate::values::SQLiteValue;

/// Hands out unique table aliases within one statement.
#[derive(Debug, Default)]
pub struct Aliases {
    next: usize,
}

impl Aliases {
    /// Starts after `t0`, which is reserved for the statement's root table.
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn next(&mut self, prefix: char) -> String {
        let alias = format!("{prefix}{}", self.next);
        self.next += 1;
        alias
    }
}

fn always<'a>() -> SQL<'a> {
    SQL::raw("1 = 1")
}

fn never<'a>() -> SQL<'a> {
    SQL::raw("0 = 1")
}

fn column<'a>(alias: &str, name: &'a str) -> SQL<'a> {
    SQL::qualified(Cow::Owned(alias.to_string()), name)
}

/// Renders `predicate` against the table aliased `alias`.
pub fn condition<'a>(predicate: &'a Predicate, alias: &str, aliases: &mut Aliases) -> SQL<'a> {
    match predicate {
        Predicate::Compare {
            column: name,
            op,
            value,
        } => {
            let left = column(alias, name);
            match (op, value.is_null()) {
                (CompareOp::Eq, true) => left.push(Token::IS).push(Token::NULL),
                (CompareOp::Ne, true) => left.push(Token::IS).push(Token::NOT).push(Token::NULL),
                _ => {
                    let token = match op {
                        CompareOp::Eq => Token::EQ,
                        CompareOp::Ne => Token::NE,
                        CompareOp::Gt => Token::GT,
                        CompareOp::Gte => Token::GE,
                        CompareOp::Lt => Token::LT,
                        CompareOp::Lte => Token::LE,
                    };
                    left.push(token).append(SQL::param(SQLiteValue::from(value)))
                }
            }
        }
        Predicate::Like {
            column: name,
            op,
            pattern,
        } => {
            let pattern = SQL::param(SQLiteValue::from(pattern));
            let (left, right, negated) = match op {
                LikeOp::Like => (column(alias, name), pattern, false),
                LikeOp::NotLike => (column(alias, name), pattern, true),
                LikeOp::ILike => (
                    SQL::func("lower", column(alias, name)),
                    SQL::func("lower", pattern),
                    false,
                ),
                LikeOp::NotILike => (
                    SQL::func("lower", column(alias, name)),
                    SQL::func("lower", pattern),
                    true,
                ),
            };
            let left = if negated { left.push(Token::NOT) } else { left };
            left.push(Token::LIKE).append(right)
        }
        Predicate::IsNull {
            column: name,
            negated,
        } => {
            let sql = column(alias, name).push(Token::IS);
            let sql = if *negated { sql.push(Token::NOT) } else { sql };
            sql.push(Token::NULL)
        }
        Predicate::In {
            column: name,
            values,
            negated,
        } => {
            // empty lists match nothing, or everything when negated
            if values.is_empty() {
                return if *negated { always() } else { never() };
            }
            let list = SQL::join(
                values.iter().map(|v| SQL::param(SQLiteValue::from(v))),
                Token::COMMA,
            );
            let sql = column(alias, name);
            let sql = if *negated { sql.push(Token::NOT) } else { sql };
            sql.push(Token::IN).append(list.parens())
        }
        Predicate::Array {
            column: name,
            op,
            values,
        } => array_condition(alias, name, *op, values),
        Predicate::And(parts) => {
            if parts.is_empty() {
                return always();
            }
            SQL::join(
                parts.iter().map(|p| condition(p, alias, aliases)),
                Token::AND,
            )
            .parens()
        }
        Predicate::Or(parts) => {
            if parts.is_empty() {
                return never();
            }
            SQL::join(
                parts.iter().map(|p| condition(p, alias, aliases)),
                Token::OR,
            )
            .parens()
        }
        Predicate::Not(inner) => SQL::token(Token::NOT).append(condition(inner, alias, aliases).parens()),
        Predicate::Related { relation, filter } => {
            let target = aliases.next('t');
            let mut body = SQL::token(Token::SELECT)
                .append(SQL::raw("1"))
                .push(Token::FROM)
                .append(SQL::ident(relation.target.as_str()).alias(target.clone()))
                .push(Token::WHERE)
                .append(relation_join(relation, alias, &target, aliases));
            if let Some(filter) = filter {
                body = body
                    .push(Token::AND)
                    .append(condition(filter, &target, aliases));
            }
            SQL::token(Token::EXISTS).append(body.parens())
        }
    }
}

/// Join condition between the parent row aliased `parent` and the target
/// row aliased `target`. Many-to-many relations go through an `EXISTS` over
/// the join table, so a target row matches once however many join rows
/// point at it.
pub fn relation_join<'a>(
    relation: &'a Relation,
    parent: &str,
    target: &str,
    aliases: &mut Aliases,
) -> SQL<'a> {
    let Some(through) = &relation.through else {
        return SQL::join(
            relation
                .source_columns
                .iter()
                .zip(&relation.target_columns)
                .map(|(source, target_column)| {
                    column(target, target_column)
                        .push(Token::EQ)
                        .append(column(parent, source))
                }),
            Token::AND,
        );
    };

    let join = aliases.next('j');
    let target_side = relation
        .target_through_pairs()
        .map(|(target_column, join_column)| {
            column(&join, join_column)
                .push(Token::EQ)
                .append(column(target, target_column))
        });
    let source_side = relation
        .source_through_pairs()
        .map(|(source, join_column)| {
            column(&join, join_column)
                .push(Token::EQ)
                .append(column(parent, source))
        });
    let body = SQL::token(Token::SELECT)
        .append(SQL::raw("1"))
        .push(Token::FROM)
        .append(SQL::ident(through.table.as_str()).alias(join.clone()))
        .push(Token::WHERE)
        .append(SQL::join(target_side.chain(source_side), Token::AND));
    SQL::token(Token::EXISTS).append(body.parens())
}

fn array_condition<'a>(alias: &str, name: &'a str, op: ArrayOp, values: &'a [serde_json::Value]) -> SQL<'a> {
    let member = |value: &'a serde_json::Value| {
        let body = SQL::token(Token::SELECT)
            .append(SQL::raw("1"))
            .push(Token::FROM)
            .append(SQL::func("json_each", column(alias, name)))
            .push(Token::WHERE)
            .append(SQL::raw("value"))
            .push(Token::EQ)
            .append(SQL::param(SQLiteValue::from(value)));
        SQL::token(Token::EXISTS).append(body.parens())
    };

    match op {
        ArrayOp::Contains if values.is_empty() => always(),
        ArrayOp::Contains => SQL::join(values.iter().map(member), Token::AND).parens(),
        ArrayOp::Overlaps if values.is_empty() => never(),
        ArrayOp::Overlaps => SQL::join(values.iter().map(member), Token::OR).parens(),
        ArrayOp::Contained => {
            let mut body = SQL::token(Token::SELECT)
                .append(SQL::raw("1"))
                .push(Token::FROM)
                .append(SQL::func("json_each", column(alias, name)));
            if !values.is_empty() {
                let list = SQL::join(
                    values.iter().map(|v| SQL::param(SQLiteValue::from(v))),
                    Token::COMMA,
                );
                body = body
                    .push(Token::WHERE)
                    .append(SQL::raw("value"))
                    .push(Token::NOT)
                    .push(Token::IN)
                    .append(list.parens());
            }
            SQL::token(Token::NOT)
                .push(Token::EXISTS)
                .append(body.parens())
        }
    }
}
