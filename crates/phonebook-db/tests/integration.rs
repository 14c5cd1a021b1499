//! Integration tests for phonebook-db
//!
//! Tests repository operations with a real SQLite in-memory database

use phonebook_db::{
    connect, migrate, ListFilter, NewPhone, NewUser, PhoneRepository, PhoneStore, PhoneUpdate,
    RepositoryError, UserRepository, UserStore, UserUpdate,
};
use sea_orm::ConnectionTrait;
use uuid::Uuid;

/// Helper to create a test database
async fn setup_test_db() -> sea_orm::DatabaseConnection {
    let db = connect("sqlite::memory:")
        .await
        .expect("Failed to connect to in-memory database");

    migrate(&db).await.expect("Failed to run migrations");

    db
}

fn new_user(login: &str, name: &str) -> NewUser {
    NewUser {
        name: name.to_string(),
        login: login.to_string(),
        password_hash: "$argon2id$v=19$m=1024,t=1,p=1$c2FsdHNhbHQ$aGFzaA".to_string(),
        age: 30,
    }
}

fn new_phone(user_id: Uuid, number: &str) -> NewPhone {
    NewPhone {
        user_id,
        phone: number.to_string(),
        description: "mobile".to_string(),
        is_fax: false,
    }
}

#[tokio::test]
async fn test_database_connection() {
    let db = connect("sqlite::memory:").await.expect("Failed to connect");

    let backend = db.get_database_backend();
    assert!(matches!(backend, sea_orm::DatabaseBackend::Sqlite));
}

#[tokio::test]
async fn test_migrations_run_successfully() {
    let db = connect("sqlite::memory:").await.expect("Failed to connect");

    let result = migrate(&db).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_create_and_fetch_user() {
    let db = setup_test_db().await;
    let users = UserStore::new(db);

    let id = users
        .create(new_user("alice1", "Alice"))
        .await
        .expect("Failed to create user");

    let by_id = users.get_by_id(id).await.expect("Failed to fetch by id");
    assert_eq!(by_id.id, id);
    assert_eq!(by_id.login, "alice1");
    assert_eq!(by_id.name, "Alice");
    assert_eq!(by_id.age, 30);
    assert_eq!(by_id.created_at, by_id.updated_at);

    let by_login = users
        .get_by_login("alice1")
        .await
        .expect("Failed to fetch by login");
    assert_eq!(by_login, by_id);
}

#[tokio::test]
async fn test_login_lookup_is_case_sensitive() {
    let db = setup_test_db().await;
    let users = UserStore::new(db);

    users.create(new_user("alice1", "Alice")).await.unwrap();

    let result = users.get_by_login("ALICE1").await;
    assert!(matches!(result, Err(RepositoryError::NotFound)));
}

#[tokio::test]
async fn test_missing_user_is_not_found() {
    let db = setup_test_db().await;
    let users = UserStore::new(db);

    assert!(matches!(
        users.get_by_id(Uuid::new_v4()).await,
        Err(RepositoryError::NotFound)
    ));
    assert!(matches!(
        users.get_by_login("nobody").await,
        Err(RepositoryError::NotFound)
    ));
}

#[tokio::test]
async fn test_duplicate_login_is_conflict() {
    let db = setup_test_db().await;
    let users = UserStore::new(db);

    users.create(new_user("alice1", "Alice")).await.unwrap();

    let result = users.create(new_user("alice1", "Other Alice")).await;
    assert!(
        matches!(result, Err(RepositoryError::Conflict(_))),
        "expected conflict, got {:?}",
        result
    );
}

#[tokio::test]
async fn test_update_user() {
    let db = setup_test_db().await;
    let users = UserStore::new(db);

    let id = users.create(new_user("alice1", "Alice")).await.unwrap();
    let before = users.get_by_id(id).await.unwrap();

    let affected = users
        .update(UserUpdate {
            id,
            name: "Alice B".to_string(),
            login: "alice2".to_string(),
            password_hash: "new-hash".to_string(),
            age: 31,
        })
        .await
        .unwrap();
    assert_eq!(affected, 1);

    let after = users.get_by_id(id).await.unwrap();
    assert_eq!(after.name, "Alice B");
    assert_eq!(after.login, "alice2");
    assert_eq!(after.password_hash, "new-hash");
    assert_eq!(after.age, 31);
    assert_eq!(after.created_at, before.created_at);
    assert!(after.updated_at >= before.updated_at);
}

#[tokio::test]
async fn test_update_missing_user_affects_nothing() {
    let db = setup_test_db().await;
    let users = UserStore::new(db);

    let affected = users
        .update(UserUpdate {
            id: Uuid::new_v4(),
            name: "Ghost".to_string(),
            login: "ghost1".to_string(),
            password_hash: "hash".to_string(),
            age: 1,
        })
        .await
        .unwrap();
    assert_eq!(affected, 0);
}

#[tokio::test]
async fn test_update_to_taken_login_is_conflict() {
    let db = setup_test_db().await;
    let users = UserStore::new(db);

    users.create(new_user("alice1", "Alice")).await.unwrap();
    let bob = users.create(new_user("bobbob", "Bob")).await.unwrap();

    let result = users
        .update(UserUpdate {
            id: bob,
            name: "Bob".to_string(),
            login: "alice1".to_string(),
            password_hash: "hash".to_string(),
            age: 40,
        })
        .await;
    assert!(matches!(result, Err(RepositoryError::Conflict(_))));
}

#[tokio::test]
async fn test_list_users_with_search_and_owner() {
    let db = setup_test_db().await;
    let users = UserStore::new(db);

    let alice = users.create(new_user("alice1", "Alice")).await.unwrap();
    users.create(new_user("alina1", "Alina")).await.unwrap();
    users.create(new_user("bobbob", "Bob")).await.unwrap();

    let all = users
        .get_list(ListFilter {
            offset: 0,
            limit: 10,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(all.count, 3);
    assert_eq!(all.items.len(), 3);

    let searched = users
        .get_list(ListFilter {
            offset: 0,
            limit: 10,
            search: Some("Ali".to_string()),
            owner: None,
        })
        .await
        .unwrap();
    assert_eq!(searched.count, 2);

    let own = users
        .get_list(ListFilter {
            offset: 0,
            limit: 10,
            search: None,
            owner: Some(alice),
        })
        .await
        .unwrap();
    assert_eq!(own.count, 1);
    assert_eq!(own.items[0].id, alice);
}

#[tokio::test]
async fn test_search_treats_wildcards_literally() {
    let db = setup_test_db().await;
    let users = UserStore::new(db.clone());
    let phones = PhoneStore::new(db);

    users.create(new_user("alice1", "100% Alice")).await.unwrap();
    users.create(new_user("bobbob", "Bob_B")).await.unwrap();
    let carol = users.create(new_user("carol1", "Carol")).await.unwrap();

    let search = |term: &str| ListFilter {
        offset: 0,
        limit: 10,
        search: Some(term.to_string()),
        owner: None,
    };

    let percent = users.get_list(search("%")).await.unwrap();
    assert_eq!(percent.count, 1);
    assert_eq!(percent.items[0].name, "100% Alice");

    let underscore = users.get_list(search("_")).await.unwrap();
    assert_eq!(underscore.count, 1);
    assert_eq!(underscore.items[0].name, "Bob_B");

    phones.create(new_phone(carol, "+998901")).await.unwrap();
    let none = phones
        .get_list(ListFilter {
            owner: Some(carol),
            ..search("9_8")
        })
        .await
        .unwrap();
    assert_eq!(none.count, 0);
}

#[tokio::test]
async fn test_delete_user() {
    let db = setup_test_db().await;
    let users = UserStore::new(db);

    let id = users.create(new_user("alice1", "Alice")).await.unwrap();

    assert_eq!(users.delete(id).await.unwrap(), 1);
    assert_eq!(users.delete(id).await.unwrap(), 0);
    assert!(matches!(
        users.get_by_id(id).await,
        Err(RepositoryError::NotFound)
    ));
}

#[tokio::test]
async fn test_phone_crud() {
    let db = setup_test_db().await;
    let users = UserStore::new(db.clone());
    let phones = PhoneStore::new(db);

    let owner = users.create(new_user("alice1", "Alice")).await.unwrap();

    let id = phones
        .create(new_phone(owner, "998901234567"))
        .await
        .expect("Failed to create phone");

    let created = phones.get_by_id(id).await.unwrap();
    assert_eq!(created.user_id, owner);
    assert_eq!(created.phone, "998901234567");
    assert_eq!(created.description, "mobile");
    assert!(!created.is_fax);

    let affected = phones
        .update(PhoneUpdate {
            id,
            user_id: owner,
            phone: "998907654321".to_string(),
            description: "office fax".to_string(),
            is_fax: true,
        })
        .await
        .unwrap();
    assert_eq!(affected, 1);

    let updated = phones.get_by_id(id).await.unwrap();
    assert_eq!(updated.phone, "998907654321");
    assert_eq!(updated.description, "office fax");
    assert!(updated.is_fax);

    assert_eq!(phones.delete(id, owner).await.unwrap(), 1);
    assert!(matches!(
        phones.get_by_id(id).await,
        Err(RepositoryError::NotFound)
    ));
}

#[tokio::test]
async fn test_phone_writes_scoped_to_owner() {
    let db = setup_test_db().await;
    let users = UserStore::new(db.clone());
    let phones = PhoneStore::new(db);

    let alice = users.create(new_user("alice1", "Alice")).await.unwrap();
    let bob = users.create(new_user("bobbob", "Bob")).await.unwrap();
    let id = phones.create(new_phone(alice, "111111")).await.unwrap();

    let affected = phones
        .update(PhoneUpdate {
            id,
            user_id: bob,
            phone: "222222".to_string(),
            description: String::new(),
            is_fax: false,
        })
        .await
        .unwrap();
    assert_eq!(affected, 0);

    assert_eq!(phones.delete(id, bob).await.unwrap(), 0);
    assert_eq!(phones.get_by_id(id).await.unwrap().phone, "111111");
}

#[tokio::test]
async fn test_phone_for_missing_user_is_missing_reference() {
    let db = setup_test_db().await;
    let phones = PhoneStore::new(db);

    let result = phones.create(new_phone(Uuid::new_v4(), "111111")).await;

    assert!(matches!(
        result,
        Err(RepositoryError::MissingReference(_))
    ));
}

#[tokio::test]
async fn test_list_phones_paginates_per_owner() {
    let db = setup_test_db().await;
    let users = UserStore::new(db.clone());
    let phones = PhoneStore::new(db);

    let alice = users.create(new_user("alice1", "Alice")).await.unwrap();
    let bob = users.create(new_user("bobbob", "Bob")).await.unwrap();

    for i in 0..5 {
        phones
            .create(new_phone(alice, &format!("55500{}", i)))
            .await
            .unwrap();
    }
    phones.create(new_phone(bob, "777000")).await.unwrap();

    let first = phones
        .get_list(ListFilter {
            offset: 0,
            limit: 2,
            search: None,
            owner: Some(alice),
        })
        .await
        .unwrap();
    assert_eq!(first.count, 5);
    assert_eq!(first.items.len(), 2);
    assert!(first.items.iter().all(|p| p.user_id == alice));

    let last = phones
        .get_list(ListFilter {
            offset: 4,
            limit: 2,
            search: None,
            owner: Some(alice),
        })
        .await
        .unwrap();
    assert_eq!(last.count, 5);
    assert_eq!(last.items.len(), 1);

    let searched = phones
        .get_list(ListFilter {
            offset: 0,
            limit: 10,
            search: Some("5550".to_string()),
            owner: Some(bob),
        })
        .await
        .unwrap();
    assert_eq!(searched.count, 0);
    assert!(searched.items.is_empty());
}

#[tokio::test]
async fn test_deleting_user_cascades_to_phones() {
    let db = setup_test_db().await;
    let users = UserStore::new(db.clone());
    let phones = PhoneStore::new(db);

    let alice = users.create(new_user("alice1", "Alice")).await.unwrap();
    let phone_id = phones.create(new_phone(alice, "123456")).await.unwrap();

    users.delete(alice).await.unwrap();

    assert!(matches!(
        phones.get_by_id(phone_id).await,
        Err(RepositoryError::NotFound)
    ));
}
