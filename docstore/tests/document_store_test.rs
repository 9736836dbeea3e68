//! Integration tests for [`docstore::DocumentStore`].
//!
//! Covers insert/get/update/patch/delete, listing order and paging, conditional
//! writes under concurrency, and the typed [`docstore::Collection`] handle, using a
//! file-backed SQLite database in a temporary directory.

use chrono::{DateTime, Utc};
use docstore::{
    DocStoreError, DocumentStore, Direction, FieldPatch, ListQuery, Predicate, Repository,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tempfile::TempDir;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct User {
    id: String,
    name: String,
    #[serde(default)]
    age: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    created_at: DateTime<Utc>,
}

impl User {
    fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            age: 0,
            email: None,
            tags: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

async fn open_store(dir: &TempDir) -> DocumentStore {
    let path = dir.path().join("docs.db");
    DocumentStore::new(path.to_str().unwrap())
        .await
        .expect("Failed to create store")
}

fn names(users: &[User]) -> Vec<&str> {
    users.iter().map(|u| u.name.as_str()).collect()
}

/// **Test: The users scenario end to end.**
///
/// **Setup:** Insert `{id: "u1", name: "Alice"}` into `users`.
/// **Action:** get, patch name to Bob, get, delete, get.
/// **Expected:** Alice, then Bob, then NotFound.
#[tokio::test]
async fn test_users_scenario() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    store
        .insert("users", &json!({"id": "u1", "name": "Alice"}))
        .await
        .expect("Failed to insert");

    let user: Value = store.get_by_id("users", "u1").await.unwrap();
    assert_eq!(user, json!({"id": "u1", "name": "Alice"}));

    store
        .patch_fields("users", "u1", &FieldPatch::new().set("$.name", "Bob"))
        .await
        .expect("Failed to patch");
    let user: Value = store.get_by_id("users", "u1").await.unwrap();
    assert_eq!(user, json!({"id": "u1", "name": "Bob"}));

    store.delete("users", "u1").await.expect("Failed to delete");
    let result = store.get_by_id::<Value>("users", "u1").await;
    assert!(matches!(result, Err(DocStoreError::NotFound { .. })));
}

/// **Test: Insert then get by a freshly generated id returns an equal message.**
#[tokio::test]
async fn test_insert_then_get_by_id_round_trips() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    let id = Uuid::new_v4().to_string();
    let mut user = User::new(&id, "Carol");
    user.age = 41;
    user.email = Some("carol@example.com".to_string());
    user.tags = vec!["admin".to_string(), "ops".to_string()];

    store.insert("users", &user).await.unwrap();
    let stored: User = store.get_by_id("users", id.as_str()).await.unwrap();

    assert_eq!(stored, user);
}

/// **Test: Get on an id that was never stored.**
///
/// **Expected:** the NotFound sentinel, not a database or codec error.
#[tokio::test]
async fn test_get_by_id_missing_is_not_found() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    let err = store
        .get_by_id::<User>("users", "non-existent-id")
        .await
        .unwrap_err();

    assert!(err.is_not_found());
}

/// **Test: Ids are compared with their JSON type.**
#[tokio::test]
async fn test_numeric_ids() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    store
        .insert("counters", &json!({"id": 42, "value": 1}))
        .await
        .unwrap();

    let found: Value = store.get_by_id("counters", 42).await.unwrap();
    assert_eq!(found["value"], 1);

    let missing = store.get_by_id::<Value>("counters", "42").await;
    assert!(missing.unwrap_err().is_not_found());
}

/// **Test: Get with a multi-term predicate.**
#[tokio::test]
async fn test_get_with_predicate() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    let mut a = User::new("a", "Alice");
    a.age = 30;
    let mut b = User::new("b", "Alice");
    b.age = 31;
    store.insert("users", &a).await.unwrap();
    store.insert("users", &b).await.unwrap();

    let found: User = store
        .get(
            "users",
            &Predicate::new().eq("$.name", "Alice").eq("$.age", 31),
        )
        .await
        .unwrap();
    assert_eq!(found.id, "b");

    let first: User = store
        .get("users", &Predicate::new().eq("$.name", "Alice"))
        .await
        .unwrap();
    assert_eq!(first.id, "a");

    let empty = store.get::<User>("users", &Predicate::new()).await;
    assert!(matches!(empty, Err(DocStoreError::InvalidInput(_))));
}

/// **Test: Update replaces the full payload instead of merging.**
#[tokio::test]
async fn test_update_replaces_payload() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    let mut original = User::new("u1", "Alice");
    original.email = Some("alice@example.com".to_string());
    original.tags = vec!["a".to_string()];
    store.insert("users", &original).await.unwrap();

    let replacement = User::new("u1", "Alicia");
    let affected = store.update("users", "u1", &replacement).await.unwrap();

    assert_eq!(affected, 1);
    let stored: User = store.get_by_id("users", "u1").await.unwrap();
    assert_eq!(stored, replacement);
    assert!(stored.email.is_none());
    assert!(stored.tags.is_empty());
}

/// **Test: Update of a missing id affects nothing and is not an error.**
#[tokio::test]
async fn test_update_missing_id_is_ok() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    let affected = store
        .update("users", "ghost", &User::new("ghost", "Nobody"))
        .await
        .unwrap();

    assert_eq!(affected, 0);
    assert_eq!(store.count("users", &Predicate::new()).await.unwrap(), 0);
}

/// **Test: Patch touches only the named paths.**
///
/// **Setup:** Stored user with age, email and tags.
/// **Action:** Patch `$.name`, an array and a path the type does not declare.
/// **Expected:** Named paths change with their JSON types; everything else is unchanged.
#[tokio::test]
async fn test_patch_fields_only_touches_named_paths() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    let mut user = User::new("u1", "Alice");
    user.age = 30;
    user.email = Some("alice@example.com".to_string());
    store.insert("users", &user).await.unwrap();

    let patch = FieldPatch::new()
        .set("$.name", "Bob")
        .set("$.tags", json!(["x", "y"]))
        .set("$.nickname", "Bobby");
    let affected = store.patch_fields("users", "u1", &patch).await.unwrap();
    assert_eq!(affected, 1);

    let raw: Value = store.get_by_id("users", "u1").await.unwrap();
    assert_eq!(raw["nickname"], "Bobby");
    assert_eq!(raw["tags"], json!(["x", "y"]));

    let patched: User = store.get_by_id("users", "u1").await.unwrap();
    assert_eq!(patched.name, "Bob");
    assert_eq!(patched.age, 30);
    assert_eq!(patched.email, user.email);
    assert_eq!(patched.created_at, user.created_at);
}

/// **Test: Patched scalar types stay queryable with typed predicates.**
#[tokio::test]
async fn test_patch_preserves_value_types() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    store
        .insert(
            "flags",
            &json!({"id": "f1", "enabled": false, "level": 1, "limits": {"max": 3, "min": 0}}),
        )
        .await
        .unwrap();

    store
        .patch_fields(
            "flags",
            "f1",
            &FieldPatch::new()
                .set("$.enabled", true)
                .set("$.level", 2.5)
                .set("$.limits.max", 5),
        )
        .await
        .unwrap();

    let raw: Value = store.get_by_id("flags", "f1").await.unwrap();
    assert_eq!(
        raw,
        json!({"id": "f1", "enabled": true, "level": 2.5, "limits": {"max": 5, "min": 0}})
    );
    let found: Value = store
        .get("flags", &Predicate::new().eq("$.enabled", true))
        .await
        .unwrap();
    assert_eq!(found["id"], "f1");
}

/// **Test: An empty patch is a no-op.**
#[tokio::test]
async fn test_empty_patch_is_noop() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    store.insert("users", &User::new("u1", "Alice")).await.unwrap();

    let affected = store
        .patch_fields("users", "u1", &FieldPatch::new())
        .await
        .unwrap();

    assert_eq!(affected, 0);
}

/// **Test: Delete removes every document sharing an id.**
#[tokio::test]
async fn test_delete_removes_duplicates() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    store.insert("users", &User::new("dup", "first")).await.unwrap();
    store.insert("users", &User::new("dup", "second")).await.unwrap();
    store.insert("users", &User::new("other", "third")).await.unwrap();

    let first: User = store.get_by_id("users", "dup").await.unwrap();
    assert_eq!(first.name, "first");

    let deleted = store.delete("users", "dup").await.unwrap();

    assert_eq!(deleted, 2);
    assert!(store
        .get_by_id::<User>("users", "dup")
        .await
        .unwrap_err()
        .is_not_found());
    assert_eq!(store.count("users", &Predicate::new()).await.unwrap(), 1);
}

/// **Test: List without options returns documents in insertion order; ordering,
/// filters and paging apply when given.**
#[tokio::test]
async fn test_list_order_filter_and_paging() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    for (id, name, age) in [("1", "carol", 30), ("2", "alice", 25), ("3", "bob", 30)] {
        let mut user = User::new(id, name);
        user.age = age;
        store.insert("users", &user).await.unwrap();
    }

    let all: Vec<User> = store.list("users", &ListQuery::new()).await.unwrap();
    assert_eq!(names(&all), vec!["carol", "alice", "bob"]);

    let by_name: Vec<User> = store
        .list("users", &ListQuery::new().order_by("$.name", Direction::Asc))
        .await
        .unwrap();
    assert_eq!(names(&by_name), vec!["alice", "bob", "carol"]);

    let page: Vec<User> = store
        .list(
            "users",
            &ListQuery::new()
                .order_by("$.name", Direction::Desc)
                .limit(2)
                .offset(1),
        )
        .await
        .unwrap();
    assert_eq!(names(&page), vec!["bob", "alice"]);

    let thirty: Vec<User> = store
        .list(
            "users",
            &ListQuery::new().filter(Predicate::new().eq("$.age", 30)),
        )
        .await
        .unwrap();
    assert_eq!(names(&thirty), vec!["carol", "bob"]);

    let skipped: Vec<User> = store
        .list("users", &ListQuery::new().offset(2))
        .await
        .unwrap();
    assert_eq!(names(&skipped), vec!["bob"]);
}

/// **Test: Listing an empty or fresh collection.**
#[tokio::test]
async fn test_list_empty_collection() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    let users: Vec<User> = store.list("users", &ListQuery::new()).await.unwrap();

    assert!(users.is_empty());
}

/// **Test: Raw clause tails are appended as given.**
#[tokio::test]
async fn test_list_raw_clauses() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    for name in ["carol", "alice", "bob"] {
        store.insert("users", &User::new(name, name)).await.unwrap();
    }

    let users: Vec<User> = store
        .list_raw(
            "users",
            &["ORDER BY json_extract(data, '$.name') DESC", "LIMIT 2"],
        )
        .await
        .unwrap();
    assert_eq!(names(&users), vec!["carol", "bob"]);

    let all: Vec<User> = store.list_raw("users", &[]).await.unwrap();
    assert_eq!(all.len(), 3);
}

/// **Test: insert_if_not_exist inserts once and then leaves the document alone.**
#[tokio::test]
async fn test_insert_if_not_exist() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    let inserted = store
        .insert_if_not_exist("users", "u1", &User::new("u1", "Alice"))
        .await
        .unwrap();
    let again = store
        .insert_if_not_exist("users", "u1", &User::new("u1", "Impostor"))
        .await
        .unwrap();

    assert!(inserted);
    assert!(!again);
    let stored: User = store.get_by_id("users", "u1").await.unwrap();
    assert_eq!(stored.name, "Alice");
}

/// **Test: upsert inserts a new id and replaces an existing one.**
#[tokio::test]
async fn test_upsert_inserts_then_updates() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    store
        .upsert("users", "u1", &User::new("u1", "Alice"))
        .await
        .unwrap();
    store
        .upsert("users", "u1", &User::new("u1", "Alicia"))
        .await
        .unwrap();

    let stored: User = store.get_by_id("users", "u1").await.unwrap();
    assert_eq!(stored.name, "Alicia");
    assert_eq!(store.count("users", &Predicate::by_id("u1")).await.unwrap(), 1);
}

/// **Test: Concurrent upserts of the same new id.**
///
/// **Setup:** 8 tasks upsert id "race" at the same time.
/// **Expected:** exactly one stored document.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_upserts_store_one_document() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    store.ensure_collection("users").await.unwrap();

    let mut handles = Vec::new();
    for i in 0..8 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store
                .upsert("users", "race", &User::new("race", &format!("writer{}", i)))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().expect("Upsert failed");
    }

    assert_eq!(
        store.count("users", &Predicate::by_id("race")).await.unwrap(),
        1
    );
}

/// **Test: Concurrent insert_if_not_exist calls insert exactly once.**
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_insert_if_not_exist_inserts_once() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    store.ensure_collection("users").await.unwrap();

    let mut handles = Vec::new();
    for i in 0..8 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store
                .insert_if_not_exist("users", "race", &User::new("race", &format!("writer{}", i)))
                .await
        }));
    }
    let mut inserted = 0;
    for handle in handles {
        if handle.await.unwrap().expect("Insert failed") {
            inserted += 1;
        }
    }

    assert_eq!(inserted, 1);
    assert_eq!(
        store.count("users", &Predicate::by_id("race")).await.unwrap(),
        1
    );
}

/// **Test: Collections are independent tables created on first use.**
#[tokio::test]
async fn test_collections_are_isolated() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    store.insert("users", &User::new("x", "user")).await.unwrap();
    store.insert("admins", &User::new("x", "admin")).await.unwrap();

    let user: User = store.get_by_id("users", "x").await.unwrap();
    let admin: User = store.get_by_id("admins", "x").await.unwrap();
    assert_eq!(user.name, "user");
    assert_eq!(admin.name, "admin");
}

/// **Test: Documents survive reopening the database.**
#[tokio::test]
async fn test_documents_persist_across_stores() {
    let dir = TempDir::new().unwrap();
    {
        let store = open_store(&dir).await;
        store.insert("users", &User::new("u1", "Alice")).await.unwrap();
        store.pool().close().await;
    }

    let reopened = open_store(&dir).await;
    let user: User = reopened.get_by_id("users", "u1").await.unwrap();

    assert_eq!(user.name, "Alice");
}

/// **Test: The typed collection handle through the Repository trait.**
#[tokio::test]
async fn test_collection_repository() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    let users = store.collection::<User>("users");

    users.save(&User::new("u1", "Alice")).await.unwrap();
    users.save(&User::new("u2", "Bob")).await.unwrap();

    assert_eq!(users.name(), "users");
    assert_eq!(
        users.find_by_id("u1").await.unwrap().map(|u| u.name),
        Some("Alice".to_string())
    );
    assert!(users.find_by_id("missing").await.unwrap().is_none());
    assert_eq!(names(&users.find_all().await.unwrap()), vec!["Alice", "Bob"]);

    users
        .patch("u2", &FieldPatch::new().set("$.age", 7))
        .await
        .unwrap();
    let bob = users
        .find(&Predicate::new().eq("$.age", 7))
        .await
        .unwrap()
        .expect("Bob should match");
    assert_eq!(bob.id, "u2");

    assert!(users.delete("u1").await.unwrap());
    assert!(!users.delete("u1").await.unwrap());
    assert_eq!(users.find_all().await.unwrap().len(), 1);
}
