//! Integration tests for the session repository and the PostgreSQL store.
//!
//! Exercises the `sessions` table against a real database:
//! - Fingerprint matching (NULL-equals-NULL, newest wins, liveness)
//! - Expiry bumps and vanished rows
//! - Expiry sweeps, global and per user
//! - Deactivation and logout deletes
//! - Token uniqueness

use assert_matches::assert_matches;
use chrono::{Duration, SubsecRound, Utc};
use sqlx::PgPool;
use warden_core::client::ClientInfo;
use warden_core::session::generate_session_token;
use warden_core::types::{DbId, Timestamp};
use warden_db::models::session::{CreateSession, Session};
use warden_db::models::user::CreateUser;
use warden_db::repositories::{SessionRepo, UserRepo};
use warden_db::store::{PgSessionStore, SessionStore, StoreError};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Current time at the database's microsecond precision.
fn now() -> Timestamp {
    Utc::now().trunc_subsecs(6)
}

async fn new_user(pool: &PgPool, username: &str) -> DbId {
    let input = CreateUser {
        username: username.to_string(),
        email: format!("{username}@test.com"),
        password_hash: "not-a-real-hash".to_string(),
    };
    UserRepo::create(pool, &input).await.unwrap().id
}

fn macos_chrome() -> ClientInfo {
    ClientInfo {
        ip_address: Some("10.0.0.1".into()),
        user_agent: Some("ua-mac".into()),
        device_type: Some("desktop".into()),
        browser: Some("Chrome".into()),
        os: Some("macOS".into()),
    }
}

fn windows() -> ClientInfo {
    ClientInfo {
        os: Some("Windows".into()),
        ..ClientInfo::default()
    }
}

async fn insert(
    pool: &PgPool,
    user_id: DbId,
    client: ClientInfo,
    expires_at: Timestamp,
) -> Session {
    let input = CreateSession {
        token: generate_session_token(),
        user_id,
        client,
        expires_at,
    };
    SessionRepo::create(pool, &input).await.unwrap()
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_sets_server_side_timestamps(pool: PgPool) {
    let user_id = new_user(&pool, "creator").await;
    let before = now() - Duration::seconds(5);

    let session = insert(&pool, user_id, macos_chrome(), now() + Duration::days(1)).await;

    assert!(session.is_active);
    assert_eq!(session.user_id, user_id);
    assert!(session.created_at >= before);
    assert_eq!(session.created_at, session.last_activity);
    assert_eq!(session.fingerprint(), macos_chrome());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn duplicate_token_is_reported_as_collision(pool: PgPool) {
    let user_id = new_user(&pool, "collider").await;
    let store = PgSessionStore::new(pool.clone());
    let input = CreateSession {
        token: "fixed-token".to_string(),
        user_id,
        client: ClientInfo::default(),
        expires_at: now() + Duration::days(1),
    };

    store.create(&input).await.unwrap();
    let second = store.create(&input).await;

    assert_matches!(second, Err(StoreError::DuplicateToken));
}

// ---------------------------------------------------------------------------
// Fingerprint matching
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn find_live_match_treats_null_as_equal(pool: PgPool) {
    let user_id = new_user(&pool, "nulls").await;
    let now = now();
    let created = insert(&pool, user_id, windows(), now + Duration::days(1)).await;

    let found = SessionRepo::find_live_match(&pool, user_id, &windows(), now)
        .await
        .unwrap()
        .expect("matching session");
    assert_eq!(found.id, created.id);

    let none = SessionRepo::find_live_match(&pool, user_id, &macos_chrome(), now)
        .await
        .unwrap();
    assert!(none.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn find_live_match_ignores_other_users_and_dead_rows(pool: PgPool) {
    let alice = new_user(&pool, "alice").await;
    let bob = new_user(&pool, "bob").await;
    let now = now();

    insert(&pool, bob, macos_chrome(), now + Duration::days(1)).await;
    insert(&pool, alice, macos_chrome(), now).await;

    let found = SessionRepo::find_live_match(&pool, alice, &macos_chrome(), now)
        .await
        .unwrap();
    assert!(found.is_none(), "expired and foreign sessions must not match");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn find_live_match_prefers_newest(pool: PgPool) {
    let user_id = new_user(&pool, "dupes").await;
    let now = now();
    insert(&pool, user_id, macos_chrome(), now + Duration::days(1)).await;
    let newest = insert(&pool, user_id, macos_chrome(), now + Duration::days(1)).await;

    let found = SessionRepo::find_live_match(&pool, user_id, &macos_chrome(), now)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, newest.id);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn find_live_by_token_requires_live_row(pool: PgPool) {
    let user_id = new_user(&pool, "bearer").await;
    let now = now();
    let live = insert(&pool, user_id, windows(), now + Duration::hours(1)).await;
    let dead = insert(&pool, user_id, windows(), now - Duration::hours(1)).await;

    let found = SessionRepo::find_live_by_token(&pool, &live.token, now)
        .await
        .unwrap();
    assert_eq!(found.map(|s| s.id), Some(live.id));

    let expired = SessionRepo::find_live_by_token(&pool, &dead.token, now)
        .await
        .unwrap();
    assert!(expired.is_none());
}

// ---------------------------------------------------------------------------
// Expiry bump
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn bump_expiry_extends_but_never_shortens(pool: PgPool) {
    let user_id = new_user(&pool, "bumper").await;
    let now = now();
    let session = insert(&pool, user_id, windows(), now + Duration::days(2)).await;
    let store = PgSessionStore::new(pool.clone());

    let later = now + Duration::days(3);
    let bumped = store.bump_expiry(session.id, later, now).await.unwrap();
    assert_eq!(bumped.expires_at, later);
    assert_eq!(bumped.token, session.token);

    let earlier = now + Duration::days(1);
    let unchanged = store.bump_expiry(session.id, earlier, now).await.unwrap();
    assert_eq!(unchanged.expires_at, later);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn bump_expiry_on_vanished_row_is_not_found(pool: PgPool) {
    let user_id = new_user(&pool, "vanish").await;
    let now = now();
    let session = insert(&pool, user_id, windows(), now + Duration::days(1)).await;
    let store = PgSessionStore::new(pool.clone());

    SessionRepo::delete_by_user_and_token(&pool, user_id, &session.token)
        .await
        .unwrap();

    let result = store.bump_expiry(session.id, now + Duration::days(2), now).await;
    assert_matches!(result, Err(StoreError::NotFound { id }) if id == session.id);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn bump_expiry_skips_deactivated_row(pool: PgPool) {
    let user_id = new_user(&pool, "inactive").await;
    let now = now();
    let session = insert(&pool, user_id, windows(), now + Duration::days(1)).await;
    let store = PgSessionStore::new(pool.clone());

    SessionRepo::deactivate_all(&pool, user_id, now).await.unwrap();

    let result = store.bump_expiry(session.id, now + Duration::days(2), now).await;
    assert_matches!(result, Err(StoreError::NotFound { .. }));
}

// ---------------------------------------------------------------------------
// Expiry sweeps
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn delete_expired_removes_exactly_the_expired_set(pool: PgPool) {
    let alice = new_user(&pool, "sweep_a").await;
    let bob = new_user(&pool, "sweep_b").await;
    let now = now();

    insert(&pool, alice, windows(), now - Duration::days(1)).await;
    insert(&pool, bob, windows(), now - Duration::minutes(1)).await;
    insert(&pool, bob, macos_chrome(), now).await;
    let keep_a = insert(&pool, alice, macos_chrome(), now + Duration::minutes(1)).await;
    let keep_b = insert(&pool, bob, windows(), now + Duration::days(1)).await;

    let deleted = SessionRepo::delete_expired(&pool, now).await.unwrap();
    assert_eq!(deleted, 3);

    let mut remaining: Vec<DbId> = SessionRepo::list_for_user(&pool, alice)
        .await
        .unwrap()
        .into_iter()
        .chain(SessionRepo::list_for_user(&pool, bob).await.unwrap())
        .map(|s| s.id)
        .collect();
    remaining.sort();
    assert_eq!(remaining, vec![keep_a.id, keep_b.id]);

    let again = SessionRepo::delete_expired(&pool, now).await.unwrap();
    assert_eq!(again, 0, "zero matches is not an error");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn delete_expired_for_user_is_scoped(pool: PgPool) {
    let alice = new_user(&pool, "scoped_a").await;
    let bob = new_user(&pool, "scoped_b").await;
    let now = now();

    insert(&pool, alice, windows(), now - Duration::hours(1)).await;
    insert(&pool, bob, windows(), now - Duration::hours(1)).await;

    let deleted = SessionRepo::delete_expired_for_user(&pool, alice, now)
        .await
        .unwrap();
    assert_eq!(deleted, 1);
    assert_eq!(SessionRepo::list_for_user(&pool, bob).await.unwrap().len(), 1);
}

// ---------------------------------------------------------------------------
// Deactivation and logout
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn deactivate_all_is_scoped_and_idempotent(pool: PgPool) {
    let alice = new_user(&pool, "deact_a").await;
    let bob = new_user(&pool, "deact_b").await;
    let now = now();

    insert(&pool, alice, windows(), now + Duration::days(1)).await;
    insert(&pool, alice, macos_chrome(), now + Duration::days(1)).await;
    let bobs = insert(&pool, bob, windows(), now + Duration::days(1)).await;

    let count = SessionRepo::deactivate_all(&pool, alice, now).await.unwrap();
    assert_eq!(count, 2);

    for session in SessionRepo::list_for_user(&pool, alice).await.unwrap() {
        assert!(!session.is_active);
        assert!(session.expires_at <= now);
        assert!(!session.is_live(now));
    }

    let bob_sessions = SessionRepo::list_for_user(&pool, bob).await.unwrap();
    assert_eq!(bob_sessions.len(), 1);
    assert!(bob_sessions[0].is_active);
    assert_eq!(bob_sessions[0].expires_at, bobs.expires_at);

    let again = SessionRepo::deactivate_all(&pool, alice, now).await.unwrap();
    assert_eq!(again, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn delete_by_user_and_token_requires_both(pool: PgPool) {
    let alice = new_user(&pool, "logout_a").await;
    let bob = new_user(&pool, "logout_b").await;
    let now = now();
    let session = insert(&pool, alice, windows(), now + Duration::days(1)).await;
    let other = insert(&pool, alice, macos_chrome(), now + Duration::days(1)).await;

    assert_eq!(
        SessionRepo::delete_by_user_and_token(&pool, bob, &session.token)
            .await
            .unwrap(),
        0,
        "wrong user"
    );
    assert_eq!(
        SessionRepo::delete_by_user_and_token(&pool, alice, "no-such-token")
            .await
            .unwrap(),
        0,
        "wrong token"
    );
    assert_eq!(
        SessionRepo::delete_by_user_and_token(&pool, alice, &session.token)
            .await
            .unwrap(),
        1
    );
    assert_eq!(
        SessionRepo::delete_by_user_and_token(&pool, alice, &session.token)
            .await
            .unwrap(),
        0,
        "already deleted"
    );

    let remaining = SessionRepo::list_for_user(&pool, alice).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, other.id);
}
