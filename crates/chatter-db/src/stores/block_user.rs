use std::collections::HashSet;

use chatter_types::models::{BlockUser, MiniUser};

use crate::connection::{Connector, Executor, execute, fetch_all, fetch_optional, fetch_strings, replica};
use crate::context::Context;
use crate::error::{DatastoreError, Result};
use crate::filter::{Filter, QueryBuilder, Statement, in_placeholders};
use crate::schema::{TABLE_BLOCK_USER, TABLE_USER};
use crate::stores::InsertPolicy;
use crate::tx::with_transaction;

const DELETE_FIELDS: &[&str] = &["user_id", "block_user_id"];

pub trait BlockUserStore {
    /// Inserts blocks under `policy`. Clean-then-insert first removes every
    /// outbound block of each actor present in `block_users`.
    fn insert_block_users(
        &self,
        ctx: &Context,
        block_users: &[BlockUser],
        policy: InsertPolicy,
    ) -> Result<()>;

    /// Users that `user_id` blocks.
    fn select_block_users(&self, ctx: &Context, user_id: &str) -> Result<Vec<MiniUser>>;

    fn select_block_user_ids(&self, ctx: &Context, user_id: &str) -> Result<Vec<String>>;

    /// Users that block `user_id`.
    fn select_blocked_users(&self, ctx: &Context, user_id: &str) -> Result<Vec<MiniUser>>;

    fn select_blocked_user_ids(&self, ctx: &Context, user_id: &str) -> Result<Vec<String>>;

    fn select_block_user(
        &self,
        ctx: &Context,
        user_id: &str,
        block_user_id: &str,
    ) -> Result<Option<BlockUser>>;

    /// Accepts id-list filters on `user_id` and `block_user_id` only. Each
    /// non-empty one runs as its own DELETE; both share one transaction.
    fn delete_block_users(&self, ctx: &Context, filters: &[Filter]) -> Result<()>;

    /// Removes only the pairs `(user_id, t)` for each `t` in
    /// `block_user_ids`; other rows keep their `created`.
    fn delete_blocks_of_user(
        &self,
        ctx: &Context,
        user_id: &str,
        block_user_ids: &[String],
    ) -> Result<()>;
}

impl<C: Connector + ?Sized> BlockUserStore for C {
    #[tracing::instrument(skip_all, fields(count = block_users.len(), policy = ?policy), err)]
    fn insert_block_users(
        &self,
        ctx: &Context,
        block_users: &[BlockUser],
        policy: InsertPolicy,
    ) -> Result<()> {
        if block_users.is_empty() {
            return Ok(());
        }
        with_transaction(ctx, self, "inserting block users", |tx| {
            insert_block_users_in(ctx, tx, block_users, policy)
        })
    }

    #[tracing::instrument(skip(self, ctx), err)]
    fn select_block_users(&self, ctx: &Context, user_id: &str) -> Result<Vec<MiniUser>> {
        let stmt = Statement::new(mini_user_join("bu.block_user_id", "bu.user_id")).bind(user_id);
        fetch_all(ctx, &mut replica(ctx, self)?, "An error occurred while getting block users", &stmt)
    }

    #[tracing::instrument(skip(self, ctx), err)]
    fn select_block_user_ids(&self, ctx: &Context, user_id: &str) -> Result<Vec<String>> {
        select_block_user_ids_in(ctx, &mut replica(ctx, self)?, user_id)
    }

    #[tracing::instrument(skip(self, ctx), err)]
    fn select_blocked_users(&self, ctx: &Context, user_id: &str) -> Result<Vec<MiniUser>> {
        let stmt = Statement::new(mini_user_join("bu.user_id", "bu.block_user_id")).bind(user_id);
        fetch_all(ctx, &mut replica(ctx, self)?, "An error occurred while getting blocked users", &stmt)
    }

    #[tracing::instrument(skip(self, ctx), err)]
    fn select_blocked_user_ids(&self, ctx: &Context, user_id: &str) -> Result<Vec<String>> {
        let stmt = Statement::new(format!(
            "SELECT user_id FROM {} WHERE block_user_id = ? ORDER BY created, user_id",
            TABLE_BLOCK_USER
        ))
        .bind(user_id);
        fetch_strings(
            ctx,
            &mut replica(ctx, self)?,
            "An error occurred while getting blocked user ids",
            "user_id",
            &stmt,
        )
    }

    #[tracing::instrument(skip(self, ctx), err)]
    fn select_block_user(
        &self,
        ctx: &Context,
        user_id: &str,
        block_user_id: &str,
    ) -> Result<Option<BlockUser>> {
        select_block_user_in(ctx, &mut replica(ctx, self)?, user_id, block_user_id)
    }

    #[tracing::instrument(skip(self, ctx), err)]
    fn delete_block_users(&self, ctx: &Context, filters: &[Filter]) -> Result<()> {
        let statements = delete_block_users_statements(filters)?;
        with_transaction(ctx, self, "deleting block users", |tx| {
            for stmt in &statements {
                execute(ctx, tx, "An error occurred while deleting block users", stmt)?;
            }
            Ok(())
        })
    }

    #[tracing::instrument(skip(self, ctx), err)]
    fn delete_blocks_of_user(
        &self,
        ctx: &Context,
        user_id: &str,
        block_user_ids: &[String],
    ) -> Result<()> {
        if block_user_ids.is_empty() {
            return Ok(());
        }
        let mut stmt = Statement::new(format!(
            "DELETE FROM {} WHERE user_id = ? AND block_user_id IN ({})",
            TABLE_BLOCK_USER,
            in_placeholders(block_user_ids.len())
        ))
        .bind(user_id);
        for id in block_user_ids {
            stmt = stmt.bind(id);
        }
        with_transaction(ctx, self, "deleting block users of a user", |tx| {
            execute(ctx, tx, "An error occurred while deleting block users", &stmt)?;
            Ok(())
        })
    }
}

/// Mini users on the far side of a block: `far` joins to the user table,
/// `near` is matched against the bound id.
fn mini_user_join(far: &str, near: &str) -> String {
    format!(
        "SELECT u.user_id AS user_id, u.name AS name, u.picture_url AS picture_url, \
         u.information_url AS information_url, u.meta_data AS meta_data, \
         u.can_block AS can_block, u.last_accessed AS last_accessed, \
         u.created AS created, u.modified AS modified \
         FROM {} AS bu JOIN {} AS u ON {} = u.user_id \
         WHERE {} = ? AND u.deleted = 0 \
         ORDER BY bu.created, u.user_id",
        TABLE_BLOCK_USER, TABLE_USER, far, near
    )
}

pub(crate) fn select_block_user_ids_in<E: Executor + ?Sized>(
    ctx: &Context,
    ex: &mut E,
    user_id: &str,
) -> Result<Vec<String>> {
    let stmt = Statement::new(format!(
        "SELECT block_user_id FROM {} WHERE user_id = ? ORDER BY created, block_user_id",
        TABLE_BLOCK_USER
    ))
    .bind(user_id);
    fetch_strings(
        ctx,
        ex,
        "An error occurred while getting block user ids",
        "block_user_id",
        &stmt,
    )
}

fn select_block_user_in<E: Executor + ?Sized>(
    ctx: &Context,
    ex: &mut E,
    user_id: &str,
    block_user_id: &str,
) -> Result<Option<BlockUser>> {
    let stmt = Statement::new(format!(
        "SELECT user_id, block_user_id, created FROM {} WHERE user_id = ? AND block_user_id = ?",
        TABLE_BLOCK_USER
    ))
    .bind(user_id)
    .bind(block_user_id);
    fetch_optional(ctx, ex, "An error occurred while getting block user", &stmt)
}

/// Validates the filters and renders one DELETE per non-empty id list.
/// Nothing is executed when validation fails.
fn delete_block_users_statements(filters: &[Filter]) -> Result<Vec<Statement>> {
    let mut statements = Vec::new();
    for filter in filters {
        if !matches!(filter, Filter::ByIds { .. }) {
            return Err(DatastoreError::validation(
                "block users can only be deleted by user ids or block user ids",
            ));
        }
        if filter.is_noop() {
            continue;
        }
        statements.push(
            QueryBuilder::delete(TABLE_BLOCK_USER, DELETE_FIELDS)
                .apply(std::slice::from_ref(filter))?
                .build()?,
        );
    }

    if statements.is_empty() {
        return Err(DatastoreError::validation(
            "An error occurred while deleting block users. Be sure to specify either user ids or block user ids",
        ));
    }
    Ok(statements)
}

pub(crate) fn delete_outbound_blocks_in<E: Executor + ?Sized>(
    ctx: &Context,
    ex: &mut E,
    user_ids: &[&str],
) -> Result<()> {
    if user_ids.is_empty() {
        return Ok(());
    }
    let mut stmt = Statement::new(format!(
        "DELETE FROM {} WHERE user_id IN ({})",
        TABLE_BLOCK_USER,
        in_placeholders(user_ids.len())
    ));
    for id in user_ids {
        stmt = stmt.bind(*id);
    }
    execute(ctx, ex, "An error occurred while deleting block users", &stmt)?;
    Ok(())
}

pub(crate) fn insert_block_users_in<E: Executor + ?Sized>(
    ctx: &Context,
    ex: &mut E,
    block_users: &[BlockUser],
    policy: InsertPolicy,
) -> Result<()> {
    if policy == InsertPolicy::CleanThenInsert {
        let mut actors: Vec<&str> = block_users.iter().map(|bu| bu.user_id.as_str()).collect();
        actors.sort_unstable();
        actors.dedup();
        delete_outbound_blocks_in(ctx, ex, &actors)?;
    }

    let insert = format!(
        "INSERT INTO {} (user_id, block_user_id, created) VALUES (?, ?, ?)",
        TABLE_BLOCK_USER
    );
    let mut seen = HashSet::new();
    for bu in block_users {
        if !seen.insert((bu.user_id.as_str(), bu.block_user_id.as_str())) {
            continue;
        }
        if policy == InsertPolicy::DedupeOnInsert
            && select_block_user_in(ctx, ex, &bu.user_id, &bu.block_user_id)?.is_some()
        {
            continue;
        }
        let stmt = Statement::new(insert.as_str())
            .bind(&bu.user_id)
            .bind(&bu.block_user_id)
            .bind(bu.created);
        execute(ctx, ex, "An error occurred while inserting block users", &stmt)?;
    }
    Ok(())
}
