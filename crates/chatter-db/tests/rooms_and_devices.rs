mod common;

use chatter_db::{
    DatastoreError, DeviceStore, Direction, Filter, InsertPolicy, RoomStore, RoomUserStore,
    SubscriptionStore, UserStore,
};
use chatter_types::models::{Device, RoomType, RoomUser, Subscription};

use common::{NOW, count, ctx, provider, room, user};

#[test]
fn test_device_round_trip_and_update() {
    let (_dir, p) = provider();
    let ctx = ctx();

    let mut device = Device {
        user_id: "u1".into(),
        platform: 1,
        token: "abc".into(),
        notification_device_id: String::new(),
    };
    p.insert_device(&ctx, &device).unwrap();

    let stored = p.select_device(&ctx, "u1", 1).unwrap().unwrap();
    assert_eq!(stored.token, "abc");
    assert!(p.select_device(&ctx, "u1", 2).unwrap().is_none());

    device.token = "def".into();
    p.update_device(&ctx, &device).unwrap();
    let stored = p.select_device(&ctx, "u1", 1).unwrap().unwrap();
    assert_eq!(stored.token, "def");
    assert_eq!(
        p.select_devices(&ctx, &[Filter::by_equality("token", "abc")]).unwrap().len(),
        0
    );

    p.delete_device(&ctx, "u1", 1).unwrap();
    assert!(p.select_device(&ctx, "u1", 1).unwrap().is_none());
}

#[test]
fn test_select_devices_composes_filters() {
    let (_dir, p) = provider();
    let ctx = ctx();
    for (user_id, platform) in [("u1", 1), ("u1", 2), ("u2", 1), ("u3", 2)] {
        p.insert_device(
            &ctx,
            &Device {
                user_id: user_id.into(),
                platform,
                token: format!("{}-{}", user_id, platform),
                notification_device_id: String::new(),
            },
        )
        .unwrap();
    }

    let devices = p
        .select_devices(
            &ctx,
            &[
                Filter::by_ids("user_id", ["u1", "u2"]),
                Filter::by_equality("platform", 1),
                Filter::ordering("user_id", Direction::Asc),
            ],
        )
        .unwrap();
    let tokens: Vec<_> = devices.iter().map(|d| d.token.as_str()).collect();
    assert_eq!(tokens, vec!["u1-1", "u2-1"]);

    // an empty id list is skipped rather than matching nothing
    let all = p
        .select_devices(&ctx, &[Filter::by_ids("user_id", Vec::<String>::new())])
        .unwrap();
    assert_eq!(all.len(), 4);

    let page = p
        .select_devices(
            &ctx,
            &[Filter::ordering("token", Direction::Asc), Filter::paging(2, 1)],
        )
        .unwrap();
    let tokens: Vec<_> = page.iter().map(|d| d.token.as_str()).collect();
    assert_eq!(tokens, vec!["u1-2", "u2-1"]);

    assert!(matches!(
        p.select_devices(&ctx, &[Filter::by_equality("secret", "x")]),
        Err(DatastoreError::Validation(_))
    ));
}

#[test]
fn test_duplicate_device_is_a_constraint_violation() {
    let (_dir, p) = provider();
    let ctx = ctx();
    let device = Device {
        user_id: "u1".into(),
        platform: 1,
        token: "abc".into(),
        notification_device_id: String::new(),
    };
    p.insert_device(&ctx, &device).unwrap();
    assert!(p.insert_device(&ctx, &device).unwrap_err().is_constraint_violation());
}

#[test]
fn test_room_insert_select_and_count() {
    let (_dir, p) = provider();
    let ctx = ctx();
    for id in ["alice", "bob"] {
        p.insert_user(&ctx, &user(id)).unwrap();
    }

    let mut r1 = room("r1", "alice", RoomType::Public);
    r1.name = "general".into();
    p.insert_room(
        &ctx,
        &r1,
        &[RoomUser::new("r1", "alice", NOW), RoomUser::new("r1", "bob", NOW)],
    )
    .unwrap();
    p.insert_room(&ctx, &room("r2", "bob", RoomType::Private), &[]).unwrap();
    p.insert_room(&ctx, &room("r3", "bob", RoomType::Private), &[]).unwrap();
    p.update_room_deleted(&ctx, "r3").unwrap();

    let stored = p.select_room(&ctx, "r1").unwrap().unwrap();
    assert_eq!(stored.name, "general");
    assert_eq!(stored.room_type, RoomType::Public);
    assert!(p.select_room(&ctx, "r3").unwrap().is_none());

    let filters = [
        Filter::ordering("room_id", Direction::Asc),
        Filter::paging(1, 1),
    ];
    let page = p.select_rooms(&ctx, &filters).unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].room_id, "r2");
    assert_eq!(p.select_count_rooms(&ctx, &filters).unwrap(), 2);
    assert_eq!(
        p.select_count_rooms(&ctx, &[Filter::by_equality("user_id", "bob")]).unwrap(),
        1
    );

    let members = p.select_users_for_room(&ctx, "r1").unwrap();
    let ids: Vec<_> = members.iter().map(|u| u.user_id.as_str()).collect();
    assert_eq!(ids, vec!["alice", "bob"]);
    assert_eq!(members[0].display, Some(true));
}

#[test]
fn test_duplicate_room_rolls_back_its_members() {
    let (_dir, p) = provider();
    let ctx = ctx();
    p.insert_room(&ctx, &room("r1", "alice", RoomType::Public), &[]).unwrap();

    let err = p
        .insert_room(
            &ctx,
            &room("r1", "bob", RoomType::Public),
            &[RoomUser::new("r1", "bob", NOW)],
        )
        .unwrap_err();
    assert!(err.is_constraint_violation());
    assert_eq!(count(&p, "SELECT COUNT(*) AS n FROM room_user"), 0);
}

#[test]
fn test_update_room() {
    let (_dir, p) = provider();
    let ctx = ctx();
    p.insert_room(&ctx, &room("r1", "alice", RoomType::Public), &[]).unwrap();

    let mut r1 = p.select_room(&ctx, "r1").unwrap().unwrap();
    r1.last_message = "hi".into();
    r1.message_count = 1;
    r1.meta_data = serde_json::json!({"topic": "rust"});
    p.update_room(&ctx, &r1).unwrap();

    let stored = p.select_room(&ctx, "r1").unwrap().unwrap();
    assert_eq!(stored.last_message, "hi");
    assert_eq!(stored.message_count, 1);
    assert_eq!(stored.meta_data["topic"], "rust");
}

#[test]
fn test_room_deletion_cascades() {
    let (_dir, p) = provider();
    let ctx = ctx();
    p.insert_room(
        &ctx,
        &room("r1", "alice", RoomType::Public),
        &[RoomUser::new("r1", "alice", NOW), RoomUser::new("r1", "bob", NOW)],
    )
    .unwrap();
    p.insert_subscription(
        &ctx,
        &Subscription {
            room_id: "r1".into(),
            user_id: "bob".into(),
            platform: 2,
            notification_subscription_id: "n1".into(),
            created: NOW,
            deleted: 0,
        },
    )
    .unwrap();

    p.update_room_deleted(&ctx, "r1").unwrap();

    assert!(p.select_user_ids_of_room_user(&ctx, "r1").unwrap().is_empty());
    assert!(p.select_subscription(&ctx, "r1", "bob", 2).unwrap().is_none());
    let deleted = p.select_deleted_subscriptions_by_room_id(&ctx, "r1").unwrap();
    assert_eq!(deleted.len(), 1);
    assert_eq!(
        p.select_deleted_subscriptions_by_user_id_and_platform(&ctx, "bob", 2)
            .unwrap()
            .len(),
        1
    );

    p.delete_subscription(&ctx, &deleted[0]).unwrap();
    assert!(p.select_deleted_subscriptions_by_room_id(&ctx, "r1").unwrap().is_empty());
}

#[test]
fn test_room_users_clean_then_insert_replaces_membership() {
    let (_dir, p) = provider();
    let ctx = ctx();
    p.insert_room_users(
        &ctx,
        &[RoomUser::new("r1", "alice", NOW), RoomUser::new("r1", "bob", NOW)],
        InsertPolicy::DedupeOnInsert,
    )
    .unwrap();
    p.insert_room_users(&ctx, &[RoomUser::new("r2", "alice", NOW)], InsertPolicy::DedupeOnInsert)
        .unwrap();

    p.insert_room_users(
        &ctx,
        &[RoomUser::new("r1", "carol", NOW)],
        InsertPolicy::CleanThenInsert,
    )
    .unwrap();

    assert_eq!(p.select_user_ids_of_room_user(&ctx, "r1").unwrap(), vec!["carol"]);
    assert_eq!(p.select_user_ids_of_room_user(&ctx, "r2").unwrap(), vec!["alice"]);
}

#[test]
fn test_room_users_filters_and_delete() {
    let (_dir, p) = provider();
    let ctx = ctx();
    let rows = [
        RoomUser::new("r1", "alice", NOW),
        RoomUser::new("r1", "bob", NOW),
        RoomUser::new("r2", "alice", NOW),
    ];
    p.insert_room_users(&ctx, &rows, InsertPolicy::DedupeOnInsert).unwrap();
    p.insert_room_users(&ctx, &rows, InsertPolicy::DedupeOnInsert).unwrap();
    assert_eq!(count(&p, "SELECT COUNT(*) AS n FROM room_user"), 3);

    let alice = p
        .select_room_users(&ctx, &[Filter::by_equality("user_id", "alice")])
        .unwrap();
    assert_eq!(alice.len(), 2);

    assert!(matches!(
        p.delete_room_users(&ctx, &[]),
        Err(DatastoreError::Validation(_))
    ));
    p.delete_room_users(
        &ctx,
        &[Filter::by_equality("room_id", "r1"), Filter::by_ids("user_id", ["bob"])],
    )
    .unwrap();
    assert_eq!(p.select_user_ids_of_room_user(&ctx, "r1").unwrap(), vec!["alice"]);
}

#[test]
fn test_one_on_one_lookup() {
    let (_dir, p) = provider();
    let ctx = ctx();
    p.insert_room(
        &ctx,
        &room("group", "alice", RoomType::Private),
        &[RoomUser::new("group", "alice", NOW), RoomUser::new("group", "bob", NOW)],
    )
    .unwrap();
    assert!(p.select_room_user_of_one_on_one(&ctx, "alice", "bob").unwrap().is_none());

    p.insert_room(
        &ctx,
        &room("dm", "alice", RoomType::OneOnOne),
        &[RoomUser::new("dm", "alice", NOW), RoomUser::new("dm", "bob", NOW)],
    )
    .unwrap();
    let ru = p.select_room_user_of_one_on_one(&ctx, "alice", "bob").unwrap().unwrap();
    assert_eq!(ru.room_id, "dm");
    assert_eq!(ru.user_id, "bob");
}
