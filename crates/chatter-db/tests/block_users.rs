mod common;

use chatter_db::{BlockUserStore, DatastoreError, Filter, InsertPolicy, UserStore};
use chatter_types::models::BlockUser;

use common::{NOW, count, ctx, exec, provider, user};

fn blocks(actor: &str, targets: &[&str]) -> Vec<BlockUser> {
    targets.iter().map(|t| BlockUser::new(actor, *t, NOW)).collect()
}

#[test]
fn test_dedupe_insert_twice_keeps_one_row_per_pair() {
    let (_dir, p) = provider();
    let ctx = ctx();

    let set = blocks("alice", &["bob", "carol"]);
    p.insert_block_users(&ctx, &set, InsertPolicy::DedupeOnInsert).unwrap();
    p.insert_block_users(&ctx, &set, InsertPolicy::DedupeOnInsert).unwrap();

    assert_eq!(count(&p, "SELECT COUNT(*) AS n FROM block_user"), 2);
    assert_eq!(p.select_block_user_ids(&ctx, "alice").unwrap(), vec!["bob", "carol"]);
}

#[test]
fn test_dedupe_skips_duplicates_within_one_batch() {
    let (_dir, p) = provider();
    let ctx = ctx();

    let set = blocks("alice", &["bob", "bob", "carol"]);
    p.insert_block_users(&ctx, &set, InsertPolicy::default()).unwrap();
    assert_eq!(count(&p, "SELECT COUNT(*) AS n FROM block_user"), 2);
}

#[test]
fn test_clean_then_insert_replaces_the_actor_set() {
    let (_dir, p) = provider();
    let ctx = ctx();

    p.insert_block_users(&ctx, &blocks("alice", &["bob", "carol"]), InsertPolicy::DedupeOnInsert)
        .unwrap();
    p.insert_block_users(&ctx, &blocks("dave", &["bob"]), InsertPolicy::DedupeOnInsert)
        .unwrap();

    p.insert_block_users(&ctx, &blocks("alice", &["erin"]), InsertPolicy::CleanThenInsert)
        .unwrap();

    assert_eq!(p.select_block_user_ids(&ctx, "alice").unwrap(), vec!["erin"]);
    // other actors are untouched
    assert_eq!(p.select_block_user_ids(&ctx, "dave").unwrap(), vec!["bob"]);
}

#[test]
fn test_plain_insert_of_existing_pair_is_a_constraint_violation() {
    let (_dir, p) = provider();
    let ctx = ctx();

    p.insert_block_users(&ctx, &blocks("alice", &["bob"]), InsertPolicy::DedupeOnInsert)
        .unwrap();

    let err = chatter_db::with_transaction(&ctx, &p, "raw insert", |tx| {
        let stmt = chatter_db::Statement::new(
            "INSERT INTO block_user (user_id, block_user_id, created) VALUES (?, ?, ?)",
        )
        .bind("alice")
        .bind("bob")
        .bind(NOW);
        chatter_db::Executor::execute_raw(tx, &stmt.sql, &stmt.params)
            .map_err(|e| DatastoreError::statement("inserting block user", e))
    })
    .unwrap_err();
    assert!(err.is_constraint_violation());
}

#[test]
fn test_select_block_and_blocked_users() {
    let (_dir, p) = provider();
    let ctx = ctx();
    for id in ["alice", "bob", "carol"] {
        p.insert_user(&ctx, &user(id)).unwrap();
    }
    p.insert_block_users(&ctx, &blocks("alice", &["bob", "carol"]), InsertPolicy::DedupeOnInsert)
        .unwrap();
    p.insert_block_users(&ctx, &blocks("carol", &["bob"]), InsertPolicy::DedupeOnInsert)
        .unwrap();

    let blocked_by_alice = p.select_block_users(&ctx, "alice").unwrap();
    let ids: Vec<_> = blocked_by_alice.iter().map(|u| u.user_id.as_str()).collect();
    assert_eq!(ids, vec!["bob", "carol"]);
    assert_eq!(blocked_by_alice[0].name, "BOB");

    let blocking_bob = p.select_blocked_users(&ctx, "bob").unwrap();
    let ids: Vec<_> = blocking_bob.iter().map(|u| u.user_id.as_str()).collect();
    assert_eq!(ids, vec!["alice", "carol"]);
    assert_eq!(p.select_blocked_user_ids(&ctx, "bob").unwrap(), vec!["alice", "carol"]);

    assert!(p.select_block_user(&ctx, "alice", "bob").unwrap().is_some());
    assert!(p.select_block_user(&ctx, "bob", "alice").unwrap().is_none());
}

#[test]
fn test_delete_requires_a_filter_and_issues_nothing_without_one() {
    let (_dir, p) = provider();
    let ctx = ctx();
    p.insert_block_users(&ctx, &blocks("alice", &["bob"]), InsertPolicy::DedupeOnInsert)
        .unwrap();

    let err = p.delete_block_users(&ctx, &[]).unwrap_err();
    assert!(matches!(err, DatastoreError::Validation(_)));

    let err = p
        .delete_block_users(
            &ctx,
            &[
                Filter::by_ids("user_id", Vec::<String>::new()),
                Filter::by_ids("block_user_id", Vec::<String>::new()),
            ],
        )
        .unwrap_err();
    assert!(matches!(err, DatastoreError::Validation(_)));

    assert_eq!(count(&p, "SELECT COUNT(*) AS n FROM block_user"), 1);
}

#[test]
fn test_delete_by_actor_and_target_removes_rows_matching_either() {
    let (_dir, p) = provider();
    let ctx = ctx();
    p.insert_block_users(&ctx, &blocks("alice", &["bob", "carol"]), InsertPolicy::DedupeOnInsert)
        .unwrap();
    p.insert_block_users(&ctx, &blocks("dave", &["bob"]), InsertPolicy::DedupeOnInsert)
        .unwrap();
    p.insert_block_users(&ctx, &blocks("erin", &["frank"]), InsertPolicy::DedupeOnInsert)
        .unwrap();

    p.delete_block_users(
        &ctx,
        &[
            Filter::by_ids("user_id", ["alice"]),
            Filter::by_ids("block_user_id", ["bob"]),
        ],
    )
    .unwrap();

    assert!(p.select_block_user_ids(&ctx, "alice").unwrap().is_empty());
    assert!(p.select_block_user_ids(&ctx, "dave").unwrap().is_empty());
    assert_eq!(p.select_block_user_ids(&ctx, "erin").unwrap(), vec!["frank"]);
}

#[test]
fn test_failed_second_delete_rolls_back_the_first() {
    let (_dir, p) = provider();
    let ctx = ctx();
    p.insert_block_users(&ctx, &blocks("alice", &["bob", "carol"]), InsertPolicy::DedupeOnInsert)
        .unwrap();
    p.insert_block_users(&ctx, &blocks("dave", &["zed"]), InsertPolicy::DedupeOnInsert)
        .unwrap();
    exec(
        &p,
        "CREATE TRIGGER fail_zed BEFORE DELETE ON block_user WHEN OLD.block_user_id = 'zed' \
         BEGIN SELECT RAISE(ABORT, 'boom'); END",
    );

    let result = p.delete_block_users(
        &ctx,
        &[
            Filter::by_ids("user_id", ["alice"]),
            Filter::by_ids("block_user_id", ["zed"]),
        ],
    );
    assert!(result.is_err());

    // the actor statement ran first and must not have been committed
    assert_eq!(p.select_block_user_ids(&ctx, "alice").unwrap(), vec!["bob", "carol"]);
    assert_eq!(count(&p, "SELECT COUNT(*) AS n FROM block_user"), 3);
}

#[test]
fn test_failed_first_delete_skips_the_second() {
    let (_dir, p) = provider();
    let ctx = ctx();
    p.insert_block_users(&ctx, &blocks("alice", &["bob"]), InsertPolicy::DedupeOnInsert)
        .unwrap();
    p.insert_block_users(&ctx, &blocks("dave", &["carol"]), InsertPolicy::DedupeOnInsert)
        .unwrap();
    exec(
        &p,
        "CREATE TRIGGER fail_alice BEFORE DELETE ON block_user WHEN OLD.user_id = 'alice' \
         BEGIN SELECT RAISE(ABORT, 'boom'); END",
    );

    assert!(p
        .delete_block_users(
            &ctx,
            &[
                Filter::by_ids("user_id", ["alice"]),
                Filter::by_ids("block_user_id", ["carol"]),
            ],
        )
        .is_err());
    assert_eq!(p.select_block_user_ids(&ctx, "dave").unwrap(), vec!["carol"]);
}

#[test]
fn test_delete_blocks_of_user_removes_only_the_named_pairs() {
    let (_dir, p) = provider();
    let ctx = ctx();
    let rows = vec![
        BlockUser::new("alice", "carol", 100),
        BlockUser::new("alice", "bob", 200),
        BlockUser::new("alice", "dave", 300),
        BlockUser::new("erin", "dave", 400),
    ];
    p.insert_block_users(&ctx, &rows, InsertPolicy::DedupeOnInsert).unwrap();

    p.delete_blocks_of_user(&ctx, "alice", &["dave".to_string()]).unwrap();

    assert_eq!(p.select_block_user_ids(&ctx, "alice").unwrap(), vec!["carol", "bob"]);
    assert_eq!(p.select_block_user_ids(&ctx, "erin").unwrap(), vec!["dave"]);
    let kept = p.select_block_user(&ctx, "alice", "carol").unwrap().unwrap();
    assert_eq!(kept.created, 100);

    // nothing to remove is a no-op
    p.delete_blocks_of_user(&ctx, "alice", &[]).unwrap();
    assert_eq!(count(&p, "SELECT COUNT(*) AS n FROM block_user"), 3);
}

#[test]
fn test_blocks_on_soft_deleted_users_are_hidden_from_mini_user_listings() {
    let (_dir, p) = provider();
    let ctx = ctx();
    for id in ["alice", "bob", "carol"] {
        p.insert_user(&ctx, &user(id)).unwrap();
    }
    p.insert_block_users(&ctx, &blocks("alice", &["bob", "carol"]), InsertPolicy::DedupeOnInsert)
        .unwrap();

    p.update_user_deleted(&ctx, "bob").unwrap();

    let ids: Vec<_> = p
        .select_block_users(&ctx, "alice")
        .unwrap()
        .into_iter()
        .map(|u| u.user_id)
        .collect();
    assert_eq!(ids, vec!["carol"]);
    assert_eq!(p.select_block_user_ids(&ctx, "alice").unwrap(), vec!["bob", "carol"]);
}
