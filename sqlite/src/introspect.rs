//! Schema introspection through `sqlite_master` and the `PRAGMA` table functions.

use drizzle_graphql_core::model::{Column, ColumnType, Relation, SchemaDef, TableDef};
use drizzle_graphql_core::Result;
use rusqlite::Connection;

/// A foreign key of `table`, columns in declaration order.
#[derive(Debug)]
struct ForeignKey {
    table: String,
    referenced: String,
    from: Vec<String>,
    /// `None` entries reference the primary key of `referenced`
    to: Vec<Option<String>>,
}

/// Builds a [`SchemaDef`] from the catalog of `conn`.
///
/// Every foreign key yields a `one` relation on the referencing table, named
/// after its column without the `_id` suffix (or after the referenced table
/// for composite keys), and a `many` relation on the referenced table named
/// after the referencing table. A generated name that collides with a column
/// or an earlier relation of the same table is skipped.
pub fn introspect(conn: &Connection) -> Result<SchemaDef> {
    let mut schema = SchemaDef::new();
    for name in table_names(conn)? {
        schema = schema.with_table(table(conn, &name)?);
    }

    let mut foreign_keys = Vec::new();
    for table in &schema.tables {
        foreign_keys.extend(self::foreign_keys(conn, &table.name)?);
    }

    for fk in foreign_keys {
        let Some(referenced) = schema.table(&fk.referenced) else {
            continue;
        };
        let primary_key: Vec<&str> = referenced
            .columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name.as_str())
            .collect();
        let Some(to) = fk
            .to
            .iter()
            .enumerate()
            .map(|(i, column)| column.as_deref().or(primary_key.get(i).copied()))
            .collect::<Option<Vec<&str>>>()
        else {
            continue;
        };
        let to: Vec<String> = to.into_iter().map(str::to_string).collect();

        let one_name = match fk.from.as_slice() {
            [column] => column
                .strip_suffix("_id")
                .filter(|stem| !stem.is_empty())
                .unwrap_or(&fk.referenced)
                .to_string(),
            _ => fk.referenced.clone(),
        };
        if is_free(&schema, &fk.table, &one_name) {
            schema = schema.with_relation(
                Relation::one(one_name, &fk.table, &fk.referenced)
                    .from(fk.from.iter().cloned())
                    .to(to.iter().cloned()),
            );
        }
        if is_free(&schema, &fk.referenced, &fk.table) {
            schema = schema.with_relation(
                Relation::many(&fk.table, &fk.referenced, &fk.table)
                    .from(to)
                    .to(fk.from),
            );
        }
    }
    Ok(schema)
}

fn is_free(schema: &SchemaDef, table: &str, name: &str) -> bool {
    let column_clash = schema
        .table(table)
        .is_some_and(|t| t.columns.iter().any(|c| c.name == name));
    let relation_clash = schema
        .relations
        .iter()
        .any(|r| r.source == table && r.name == name);
    !column_clash && !relation_clash
}

fn table_names(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )?;
    let names = stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(names)
}

fn table(conn: &Connection, name: &str) -> Result<TableDef> {
    let mut stmt = conn.prepare(
        r#"SELECT name, type, "notnull", dflt_value IS NOT NULL, pk FROM pragma_table_info(?1) ORDER BY cid"#,
    )?;
    let rows = stmt
        .query_map([name], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, bool>(2)?,
                row.get::<_, bool>(3)?,
                row.get::<_, i64>(4)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let primary_keys = rows.iter().filter(|row| row.4 > 0).count();
    let mut table = TableDef::new(name);
    for (column_name, sql_type, not_null, has_default, pk) in rows {
        let column_type = ColumnType::from_sql_type(&sql_type);
        let mut column = Column::new(column_name, column_type);
        if not_null {
            column = column.not_null();
        }
        if pk > 0 {
            column = column.primary_key();
        }
        // an INTEGER PRIMARY KEY aliases the rowid and is assigned on insert
        let rowid = pk > 0 && primary_keys == 1 && sql_type.eq_ignore_ascii_case("INTEGER");
        if has_default || rowid {
            column = column.has_default();
        }
        table = table.column(column);
    }
    Ok(table)
}

fn foreign_keys(conn: &Connection, table: &str) -> Result<Vec<ForeignKey>> {
    let mut stmt = conn.prepare(
        r#"SELECT id, "table", "from", "to" FROM pragma_foreign_key_list(?1) ORDER BY id, seq"#,
    )?;
    let rows = stmt
        .query_map([table], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut keys: Vec<(i64, ForeignKey)> = Vec::new();
    for (id, referenced, from, to) in rows {
        match keys.last_mut() {
            Some((last, fk)) if *last == id => {
                fk.from.push(from);
                fk.to.push(to);
            }
            _ => keys.push((
                id,
                ForeignKey {
                    table: table.to_string(),
                    referenced,
                    from: vec![from],
                    to: vec![to],
                },
            )),
        }
    }
    Ok(keys.into_iter().map(|(_, fk)| fk).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use drizzle_graphql_core::model::Cardinality;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
            CREATE TABLE posts (
                id INTEGER PRIMARY KEY,
                title TEXT NOT NULL,
                published BOOLEAN NOT NULL DEFAULT 0,
                meta JSON,
                author_id INTEGER NOT NULL REFERENCES users(id)
            );
            CREATE TABLE notes (id INTEGER PRIMARY KEY, owner INTEGER REFERENCES users);
            "#,
        )
        .unwrap();
        conn
    }

    #[test]
    fn reads_tables_and_columns() {
        let schema = introspect(&conn()).unwrap();
        let names: Vec<_> = schema.tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["notes", "posts", "users"]);

        let posts = schema.table("posts").unwrap();
        let id = &posts.columns[0];
        assert!(id.primary_key && id.has_default);
        let published = &posts.columns[2];
        assert_eq!(published.column_type, ColumnType::Boolean);
        assert!(published.not_null && published.has_default);
        assert_eq!(posts.columns[3].column_type, ColumnType::Json);
    }

    #[test]
    fn infers_relations_from_foreign_keys() {
        let schema = introspect(&conn()).unwrap();
        let author = schema
            .relations
            .iter()
            .find(|r| r.source == "posts" && r.name == "author")
            .unwrap();
        assert_eq!(author.cardinality, Cardinality::One);
        assert_eq!(author.source_columns, vec!["author_id"]);
        assert_eq!(author.target_columns, vec!["id"]);

        let posts = schema
            .relations
            .iter()
            .find(|r| r.source == "users" && r.name == "posts")
            .unwrap();
        assert_eq!(posts.cardinality, Cardinality::Many);
        assert_eq!(posts.source_columns, vec!["id"]);
        assert_eq!(posts.target_columns, vec!["author_id"]);

        // without an `_id` suffix the relation is named after the referenced table
        assert!(!schema
            .relations
            .iter()
            .any(|r| r.source == "notes" && r.name == "owner"));
        let users = schema
            .relations
            .iter()
            .find(|r| r.source == "notes" && r.name == "users")
            .unwrap();
        assert_eq!(users.target_columns, vec!["id"]);
    }
}
