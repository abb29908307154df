use chatter_types::models::Device;

use crate::connection::{Connector, Executor, execute, fetch_all, fetch_optional, master, replica};
use crate::context::Context;
use crate::error::{DatastoreError, Result};
use crate::filter::{Filter, QueryBuilder, Statement};
use crate::schema::TABLE_DEVICE;
use crate::tx::with_transaction;

const COLUMNS: &str = "user_id, platform, token, notification_device_id";
const FIELDS: &[&str] = &["user_id", "platform", "token", "notification_device_id"];

pub trait DeviceStore {
    fn insert_device(&self, ctx: &Context, device: &Device) -> Result<Device>;

    fn select_device(&self, ctx: &Context, user_id: &str, platform: i32) -> Result<Option<Device>>;

    fn select_devices(&self, ctx: &Context, filters: &[Filter]) -> Result<Vec<Device>>;

    /// Replaces the token and notification id of the `(user_id, platform)` row.
    fn update_device(&self, ctx: &Context, device: &Device) -> Result<()>;

    fn delete_device(&self, ctx: &Context, user_id: &str, platform: i32) -> Result<()>;
}

impl<C: Connector + ?Sized> DeviceStore for C {
    #[tracing::instrument(skip(self, ctx), err)]
    fn insert_device(&self, ctx: &Context, device: &Device) -> Result<Device> {
        insert_device_in(ctx, &mut master(ctx, self)?, device)?;
        Ok(device.clone())
    }

    #[tracing::instrument(skip(self, ctx), err)]
    fn select_device(&self, ctx: &Context, user_id: &str, platform: i32) -> Result<Option<Device>> {
        let stmt = Statement::new(format!(
            "SELECT {} FROM {} WHERE user_id = ? AND platform = ?",
            COLUMNS, TABLE_DEVICE
        ))
        .bind(user_id)
        .bind(platform);
        fetch_optional(ctx, &mut replica(ctx, self)?, "An error occurred while getting device", &stmt)
    }

    #[tracing::instrument(skip(self, ctx), err)]
    fn select_devices(&self, ctx: &Context, filters: &[Filter]) -> Result<Vec<Device>> {
        let stmt = QueryBuilder::select(format!("SELECT {} FROM {}", COLUMNS, TABLE_DEVICE), FIELDS)
            .apply(filters)?
            .build()?;
        fetch_all(ctx, &mut replica(ctx, self)?, "An error occurred while getting devices", &stmt)
    }

    #[tracing::instrument(skip(self, ctx), err)]
    fn update_device(&self, ctx: &Context, device: &Device) -> Result<()> {
        let stmt = Statement::new(format!(
            "UPDATE {} SET token = ?, notification_device_id = ? WHERE user_id = ? AND platform = ?",
            TABLE_DEVICE
        ))
        .bind(&device.token)
        .bind(&device.notification_device_id)
        .bind(&device.user_id)
        .bind(device.platform);
        with_transaction(ctx, self, "updating device", |tx| {
            execute(ctx, tx, "An error occurred while updating device", &stmt)?;
            Ok(())
        })
    }

    #[tracing::instrument(skip(self, ctx), err)]
    fn delete_device(&self, ctx: &Context, user_id: &str, platform: i32) -> Result<()> {
        if user_id.is_empty() {
            return Err(DatastoreError::validation("a device is deleted by user id and platform"));
        }
        let stmt = Statement::new(format!(
            "DELETE FROM {} WHERE user_id = ? AND platform = ?",
            TABLE_DEVICE
        ))
        .bind(user_id)
        .bind(platform);
        with_transaction(ctx, self, "deleting device", |tx| {
            execute(ctx, tx, "An error occurred while deleting device", &stmt)?;
            Ok(())
        })
    }
}

pub(crate) fn insert_device_in<E: Executor + ?Sized>(
    ctx: &Context,
    ex: &mut E,
    device: &Device,
) -> Result<()> {
    let stmt = Statement::new(format!(
        "INSERT INTO {} ({}) VALUES (?, ?, ?, ?)",
        TABLE_DEVICE, COLUMNS
    ))
    .bind(&device.user_id)
    .bind(device.platform)
    .bind(&device.token)
    .bind(&device.notification_device_id);
    execute(ctx, ex, "An error occurred while inserting device", &stmt)?;
    Ok(())
}

pub(crate) fn select_devices_of_user_in<E: Executor + ?Sized>(
    ctx: &Context,
    ex: &mut E,
    user_id: &str,
) -> Result<Vec<Device>> {
    let stmt = Statement::new(format!(
        "SELECT {} FROM {} WHERE user_id = ? ORDER BY platform",
        COLUMNS, TABLE_DEVICE
    ))
    .bind(user_id);
    fetch_all(ctx, ex, "An error occurred while getting devices", &stmt)
}
