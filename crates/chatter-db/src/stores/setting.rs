use chatter_types::models::Setting;
use chatter_types::unix_now;

use crate::connection::{Connector, execute, fetch_optional, master, replica};
use crate::context::Context;
use crate::error::Result;
use crate::filter::Statement;
use crate::schema::TABLE_SETTING;

pub trait SettingStore {
    /// Appends a setting row; the returned copy carries the assigned id.
    fn insert_setting(&self, ctx: &Context, setting: &Setting) -> Result<Setting>;

    /// The current setting, or `None` when every row has expired.
    fn select_latest_setting(&self, ctx: &Context) -> Result<Option<Setting>> {
        self.select_latest_setting_at(ctx, unix_now())
    }

    /// Newest row by `created` among those with `expired = 0 OR expired > now`.
    fn select_latest_setting_at(&self, ctx: &Context, now: i64) -> Result<Option<Setting>>;
}

impl<C: Connector + ?Sized> SettingStore for C {
    #[tracing::instrument(skip(self, ctx), err)]
    fn insert_setting(&self, ctx: &Context, setting: &Setting) -> Result<Setting> {
        let stmt = Statement::new(format!(
            "INSERT INTO {} (content, expired, created) VALUES (?, ?, ?)",
            TABLE_SETTING
        ))
        .bind(&setting.values)
        .bind(setting.expired)
        .bind(setting.created);
        let res = execute(ctx, &mut master(ctx, self)?, "An error occurred while inserting setting", &stmt)?;
        Ok(Setting {
            id: res.last_insert_id,
            ..setting.clone()
        })
    }

    #[tracing::instrument(skip(self, ctx), err)]
    fn select_latest_setting_at(&self, ctx: &Context, now: i64) -> Result<Option<Setting>> {
        let stmt = Statement::new(format!(
            "SELECT id, content, expired, created FROM {} \
             WHERE expired = 0 OR expired > ? \
             ORDER BY created DESC, id DESC LIMIT 1",
            TABLE_SETTING
        ))
        .bind(now);
        fetch_optional(ctx, &mut replica(ctx, self)?, "An error occurred while getting setting", &stmt)
    }
}
