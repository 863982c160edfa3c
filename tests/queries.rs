#![cfg(feature = "rusqlite")]

mod common;

use common::{admin, generator, options, run, setup_db};
use drizzle_graphql::prelude::*;
use serde_json::json;

#[test]
fn find_many_with_where_order_and_limit() {
    let db = setup_db();
    let generator = generator(&db, options());

    let result = run(
        &generator,
        &db,
        &admin(),
        FieldNode::new("findManyPost")
            .arg("where", json!({ "author_id": 1, "id": { "lte": 7 } }))
            .arg("orderBy", json!({ "id": "desc" }))
            .arg("limit", 3)
            .fields(["id", "title", "published"]),
    )
    .expect("Failed to find posts");

    assert_eq!(
        result,
        json!([
            { "id": 7, "title": "Post 7", "published": true },
            { "id": 5, "title": "Post 5", "published": true },
            { "id": 3, "title": "Post 3", "published": false },
        ])
    );
}

#[test]
fn offset_pages_through_rows() {
    let db = setup_db();
    let generator = generator(&db, options());

    let page = run(
        &generator,
        &db,
        &admin(),
        FieldNode::new("findManyPost")
            .arg("orderBy", json!([{ "id": "asc" }]))
            .arg("offset", 10)
            .fields(["id"]),
    )
    .expect("Failed to page posts");
    assert_eq!(page, json!([{ "id": 11 }, { "id": 12 }]));
}

#[test]
fn find_first_returns_object_or_null() {
    let db = setup_db();
    let generator = generator(&db, options());

    let first = run(
        &generator,
        &db,
        &admin(),
        FieldNode::new("findFirstUser")
            .arg("where", json!({ "name": { "ilike": "BOB" } }))
            .fields(["id", "name", "email"]),
    )
    .expect("Failed to find user");
    assert_eq!(first, json!({ "id": 2, "name": "Bob", "email": null }));

    let missing = run(
        &generator,
        &db,
        &admin(),
        FieldNode::new("findFirstUser")
            .arg("where", json!({ "id": 99 }))
            .fields(["id"]),
    )
    .expect("Failed to find user");
    assert_eq!(missing, json!(null));
}

#[test]
fn count_applies_filter() {
    let db = setup_db();
    let generator = generator(&db, options());

    let all = run(&generator, &db, &admin(), FieldNode::new("countPost"))
        .expect("Failed to count posts");
    assert_eq!(all, json!(12));

    let unpublished = run(
        &generator,
        &db,
        &admin(),
        FieldNode::new("countPost").arg("where", json!({ "published": false })),
    )
    .expect("Failed to count posts");
    assert_eq!(unpublished, json!(4));
}

#[test]
fn null_filters_match_missing_values() {
    let db = setup_db();
    let generator = generator(&db, options());

    let without_email = run(
        &generator,
        &db,
        &admin(),
        FieldNode::new("findManyUser")
            .arg("where", json!({ "email": null }))
            .fields(["name"]),
    )
    .expect("Failed to find users");
    assert_eq!(without_email, json!([{ "name": "Bob" }]));

    let with_email = run(
        &generator,
        &db,
        &admin(),
        FieldNode::new("findManyUser")
            .arg("where", json!({ "email": { "ne": null } }))
            .fields(["name"]),
    )
    .expect("Failed to find users");
    assert_eq!(with_email, json!([{ "name": "Alice" }]));

    let err = run(
        &generator,
        &db,
        &admin(),
        FieldNode::new("findManyUser").arg("where", json!({ "email": { "like": null } })),
    )
    .unwrap_err();
    assert!(matches!(err, GeneratorError::InvalidArgument(_)));
}

#[test]
fn logical_filters() {
    let db = setup_db();
    let generator = generator(&db, options());

    let result = run(
        &generator,
        &db,
        &admin(),
        FieldNode::new("findManyPost")
            .arg(
                "where",
                json!({
                    "OR": [{ "id": { "in": [1, 2] } }, { "title": { "like": "Post 1_" } }],
                    "NOT": { "id": 11 }
                }),
            )
            .arg("orderBy", json!({ "id": "asc" }))
            .fields(["id"]),
    )
    .expect("Failed to filter posts");
    assert_eq!(result, json!([{ "id": 1 }, { "id": 2 }, { "id": 10 }, { "id": 12 }]));
}

#[test]
fn nested_relations_and_counts() {
    let db = setup_db();
    let generator = generator(&db, options());

    let result = run(
        &generator,
        &db,
        &admin(),
        FieldNode::new("findManyPost")
            .arg("where", json!({ "id": { "in": [1, 2] } }))
            .arg("orderBy", json!({ "id": "asc" }))
            .fields(["id", "categoriesCount"])
            .select(FieldNode::new("author").fields(["name"]))
            .select(
                FieldNode::new("categories")
                    .arg("orderBy", json!({ "name": "desc" }))
                    .fields(["name"]),
            ),
    )
    .expect("Failed to load nested posts");

    assert_eq!(
        result,
        json!([
            {
                "id": 1,
                "categoriesCount": 3,
                "author": { "name": "Alice" },
                "categories": [{ "name": "sql" }, { "name": "rust" }, { "name": "graphql" }],
            },
            {
                "id": 2,
                "categoriesCount": 1,
                "author": { "name": "Bob" },
                "categories": [{ "name": "rust" }],
            },
        ])
    );
}

#[test]
fn nested_many_relation_takes_arguments() {
    let db = setup_db();
    let generator = generator(&db, options());

    let result = run(
        &generator,
        &db,
        &admin(),
        FieldNode::new("findFirstUser")
            .arg("where", json!({ "id": 1 }))
            .fields(["name"])
            .select(
                FieldNode::new("posts")
                    .arg("where", json!({ "published": false }))
                    .arg("orderBy", json!({ "id": "asc" }))
                    .arg("limit", 2)
                    .fields(["id"]),
            )
            .select(
                FieldNode::new("postsCount").arg("where", json!({ "published": true })),
            ),
    )
    .expect("Failed to load user posts");

    assert_eq!(
        result,
        json!({
            "name": "Alice",
            "posts": [{ "id": 3 }, { "id": 9 }],
            "postsCount": 4,
        })
    );
}

#[test]
fn relation_filters_use_related_rows() {
    let db = setup_db();
    let generator = generator(&db, options());

    let by_category = run(
        &generator,
        &db,
        &admin(),
        FieldNode::new("findManyPost")
            .arg("where", json!({ "categories": { "name": "rust" } }))
            .arg("orderBy", json!({ "id": "asc" }))
            .fields(["id"]),
    )
    .expect("Failed to filter by category");
    assert_eq!(by_category, json!([{ "id": 1 }, { "id": 2 }]));

    let by_author = run(
        &generator,
        &db,
        &admin(),
        FieldNode::new("countPost").arg("where", json!({ "author": { "name": "Bob" } })),
    )
    .expect("Failed to filter by author");
    assert_eq!(by_author, json!(6));
}

#[test]
fn fragments_expand_into_the_selection() {
    let db = setup_db();
    let generator = generator(&db, options());

    let info = ResolveInfo::new(
        FieldNode::new("findFirstCategory")
            .arg("where", json!({ "id": 3 }))
            .spread("CategoryFields"),
    )
    .fragment(
        "CategoryFields",
        vec![
            Selection::Field(FieldNode::new("name")),
            Selection::Field(
                FieldNode::new("posts")
                    .arg("orderBy", json!({ "id": "asc" }))
                    .fields(["title"]),
            ),
        ],
    );
    let result = generator
        .execute(&db, &admin(), &info)
        .expect("Failed to resolve fragment");
    assert_eq!(result, json!({
            "name": "graphql",
            "posts": [{ "title": "Post 1" }, { "title": "Post 3" }],
        }));
}

#[test]
fn unknown_fields_are_rejected() {
    let db = setup_db();
    let generator = generator(&db, options());

    let err = run(
        &generator,
        &db,
        &admin(),
        FieldNode::new("findManyPost").fields(["id", "missing"]),
    )
    .unwrap_err();
    assert!(matches!(err, GeneratorError::UnknownField { ref field, .. } if field == "missing"));

    let err = run(
        &generator,
        &db,
        &admin(),
        FieldNode::new("findManyPost")
            .arg("where", json!({ "title": { "startsWith": "P" } }))
            .fields(["id"]),
    )
    .unwrap_err();
    assert!(matches!(err, GeneratorError::UnknownOperator { .. }));

    let err = run(&generator, &db, &admin(), FieldNode::new("findManyPostCategory")).unwrap_err();
    assert!(matches!(err, GeneratorError::UnknownOperation(_)));
}
