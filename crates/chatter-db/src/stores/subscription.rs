use chatter_types::models::Subscription;

use crate::connection::{Connector, execute, fetch_all, fetch_optional, master, replica};
use crate::context::Context;
use crate::error::Result;
use crate::filter::Statement;
use crate::schema::TABLE_SUBSCRIPTION;

const COLUMNS: &str = "room_id, user_id, platform, notification_subscription_id, created, deleted";

pub trait SubscriptionStore {
    fn insert_subscription(&self, ctx: &Context, subscription: &Subscription) -> Result<Subscription>;

    /// The live subscription for `(room_id, user_id, platform)`.
    fn select_subscription(
        &self,
        ctx: &Context,
        room_id: &str,
        user_id: &str,
        platform: i32,
    ) -> Result<Option<Subscription>>;

    fn select_deleted_subscriptions_by_room_id(&self, ctx: &Context, room_id: &str) -> Result<Vec<Subscription>>;

    fn select_deleted_subscriptions_by_user_id(&self, ctx: &Context, user_id: &str) -> Result<Vec<Subscription>>;

    fn select_deleted_subscriptions_by_user_id_and_platform(
        &self,
        ctx: &Context,
        user_id: &str,
        platform: i32,
    ) -> Result<Vec<Subscription>>;

    /// Hard delete, once the notification side has unsubscribed.
    fn delete_subscription(&self, ctx: &Context, subscription: &Subscription) -> Result<()>;
}

impl<C: Connector + ?Sized> SubscriptionStore for C {
    #[tracing::instrument(skip(self, ctx), err)]
    fn insert_subscription(&self, ctx: &Context, subscription: &Subscription) -> Result<Subscription> {
        let stmt = Statement::new(format!(
            "INSERT INTO {} ({}) VALUES (?, ?, ?, ?, ?, ?)",
            TABLE_SUBSCRIPTION, COLUMNS
        ))
        .bind(&subscription.room_id)
        .bind(&subscription.user_id)
        .bind(subscription.platform)
        .bind(&subscription.notification_subscription_id)
        .bind(subscription.created)
        .bind(subscription.deleted);
        execute(
            ctx,
            &mut master(ctx, self)?,
            "An error occurred while inserting subscription",
            &stmt,
        )?;
        Ok(subscription.clone())
    }

    #[tracing::instrument(skip(self, ctx), err)]
    fn select_subscription(
        &self,
        ctx: &Context,
        room_id: &str,
        user_id: &str,
        platform: i32,
    ) -> Result<Option<Subscription>> {
        let stmt = Statement::new(format!(
            "SELECT {} FROM {} WHERE room_id = ? AND user_id = ? AND platform = ? AND deleted = 0",
            COLUMNS, TABLE_SUBSCRIPTION
        ))
        .bind(room_id)
        .bind(user_id)
        .bind(platform);
        fetch_optional(
            ctx,
            &mut replica(ctx, self)?,
            "An error occurred while getting subscription",
            &stmt,
        )
    }

    #[tracing::instrument(skip(self, ctx), err)]
    fn select_deleted_subscriptions_by_room_id(&self, ctx: &Context, room_id: &str) -> Result<Vec<Subscription>> {
        let stmt = Statement::new(format!(
            "SELECT {} FROM {} WHERE room_id = ? AND deleted != 0",
            COLUMNS, TABLE_SUBSCRIPTION
        ))
        .bind(room_id);
        fetch_all(
            ctx,
            &mut replica(ctx, self)?,
            "An error occurred while getting deleted subscriptions",
            &stmt,
        )
    }

    #[tracing::instrument(skip(self, ctx), err)]
    fn select_deleted_subscriptions_by_user_id(&self, ctx: &Context, user_id: &str) -> Result<Vec<Subscription>> {
        let stmt = Statement::new(format!(
            "SELECT {} FROM {} WHERE user_id = ? AND deleted != 0",
            COLUMNS, TABLE_SUBSCRIPTION
        ))
        .bind(user_id);
        fetch_all(
            ctx,
            &mut replica(ctx, self)?,
            "An error occurred while getting deleted subscriptions",
            &stmt,
        )
    }

    #[tracing::instrument(skip(self, ctx), err)]
    fn select_deleted_subscriptions_by_user_id_and_platform(
        &self,
        ctx: &Context,
        user_id: &str,
        platform: i32,
    ) -> Result<Vec<Subscription>> {
        let stmt = Statement::new(format!(
            "SELECT {} FROM {} WHERE user_id = ? AND platform = ? AND deleted != 0",
            COLUMNS, TABLE_SUBSCRIPTION
        ))
        .bind(user_id)
        .bind(platform);
        fetch_all(
            ctx,
            &mut replica(ctx, self)?,
            "An error occurred while getting deleted subscriptions",
            &stmt,
        )
    }

    #[tracing::instrument(skip(self, ctx), err)]
    fn delete_subscription(&self, ctx: &Context, subscription: &Subscription) -> Result<()> {
        let stmt = Statement::new(format!(
            "DELETE FROM {} WHERE room_id = ? AND user_id = ? AND platform = ?",
            TABLE_SUBSCRIPTION
        ))
        .bind(&subscription.room_id)
        .bind(&subscription.user_id)
        .bind(subscription.platform);
        execute(
            ctx,
            &mut master(ctx, self)?,
            "An error occurred while deleting subscription",
            &stmt,
        )?;
        Ok(())
    }
}
