#![cfg(feature = "rusqlite")]
#![allow(dead_code)]

use drizzle_graphql::prelude::*;
use serde_json::Value;

/// Request context handed to every policy callback.
#[derive(Debug, Clone, Default)]
pub struct Ctx {
    pub user_id: i64,
    pub admin: bool,
}

pub fn admin() -> Ctx {
    Ctx {
        user_id: 1,
        admin: true,
    }
}

pub fn reader() -> Ctx {
    Ctx {
        user_id: 2,
        admin: false,
    }
}

const SCHEMA: &str = r#"
CREATE TABLE users (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    email TEXT
);
CREATE TABLE posts (
    id INTEGER PRIMARY KEY,
    title TEXT NOT NULL,
    body TEXT,
    published BOOLEAN NOT NULL DEFAULT 0,
    author_id INTEGER NOT NULL REFERENCES users(id)
);
CREATE TABLE categories (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL
);
CREATE TABLE post_categories (
    post_id INTEGER NOT NULL REFERENCES posts(id),
    category_id INTEGER NOT NULL REFERENCES categories(id),
    PRIMARY KEY (post_id, category_id)
);
"#;

/// In-memory database with 2 users, 12 posts (every third unpublished,
/// authors alternating) and 3 categories.
pub fn setup_db() -> SQLiteStorage {
    let storage = SQLiteStorage::open_in_memory().expect("Failed to create in-memory database");
    let conn = storage.conn();
    conn.execute_batch(SCHEMA).expect("Failed to create tables");

    conn.execute_batch(
        "INSERT INTO users (id, name, email) VALUES (1, 'Alice', 'alice@example.com'), (2, 'Bob', NULL);
         INSERT INTO categories (id, name) VALUES (1, 'rust'), (2, 'sql'), (3, 'graphql');",
    )
    .expect("Failed to seed users and categories");

    for id in 1..=12_i64 {
        conn.execute(
            "INSERT INTO posts (id, title, body, published, author_id) VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                id,
                format!("Post {id}"),
                format!("Body of post {id}"),
                id % 3 != 0,
                if id % 2 == 1 { 1 } else { 2 },
            ],
        )
        .expect("Failed to insert post");
    }

    conn.execute_batch(
        "INSERT INTO post_categories (post_id, category_id) VALUES (1, 1), (1, 2), (1, 3), (2, 1), (3, 3);",
    )
    .expect("Failed to seed post_categories");
    storage
}

/// Introspected schema plus the many-to-many relations through
/// `post_categories`.
pub fn schema(storage: &SQLiteStorage) -> SchemaDef {
    storage
        .introspect()
        .expect("Failed to introspect")
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

pub fn options() -> GeneratorOptions<Ctx> {
    GeneratorOptions::new().use_models(IncludeExclude::exclude(["post_categories"]))
}

pub fn generator(storage: &SQLiteStorage, options: GeneratorOptions<Ctx>) -> Generator<Ctx> {
    Generator::new(schema(storage), options).expect("Failed to build generator")
}

pub fn run(
    generator: &Generator<Ctx>,
    storage: &SQLiteStorage,
    ctx: &Ctx,
    field: FieldNode,
) -> drizzle_graphql::Result<Value> {
    generator.execute(storage, ctx, &ResolveInfo::new(field))
}

/// Single integer from a raw query, for checking storage state directly.
pub fn scalar(storage: &SQLiteStorage, sql: &str) -> i64 {
    storage
        .conn()
        .query_row(sql, [], |row| row.get(0))
        .expect("Failed to run scalar query")
}

/// `post_categories` pairs of one post, ordered by category.
pub fn categories_of(storage: &SQLiteStorage, post_id: i64) -> Vec<i64> {
    let mut stmt = storage
        .conn()
        .prepare("SELECT category_id FROM post_categories WHERE post_id = ?1 ORDER BY category_id")
        .expect("Failed to prepare");
    stmt.query_map([post_id], |row| row.get(0))
        .expect("Failed to query")
        .collect::<rusqlite::Result<_>>()
        .expect("Failed to read rows")
}
