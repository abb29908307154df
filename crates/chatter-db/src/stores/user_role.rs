use std::collections::HashSet;

use chatter_types::models::UserRole;

use crate::connection::{Connector, Executor, execute, fetch_all, fetch_optional, fetch_rows, fetch_strings, replica};
use crate::context::Context;
use crate::error::Result;
use crate::filter::{Filter, QueryBuilder, Statement};
use crate::schema::TABLE_USER_ROLE;
use crate::tx::with_transaction;

const FIELDS: &[&str] = &["user_id", "role_id"];

pub trait UserRoleStore {
    /// Dedupe-on-insert: existing assignments are skipped.
    fn insert_user_roles(&self, ctx: &Context, user_roles: &[UserRole]) -> Result<()>;

    fn select_user_roles(&self, ctx: &Context, filters: &[Filter]) -> Result<Vec<UserRole>>;

    fn select_role_ids_of_user_role(&self, ctx: &Context, user_id: &str) -> Result<Vec<i32>>;

    fn select_user_ids_of_user_role(&self, ctx: &Context, role_id: i32) -> Result<Vec<String>>;

    fn delete_user_roles(&self, ctx: &Context, filters: &[Filter]) -> Result<()>;
}

impl<C: Connector + ?Sized> UserRoleStore for C {
    #[tracing::instrument(skip_all, fields(count = user_roles.len()), err)]
    fn insert_user_roles(&self, ctx: &Context, user_roles: &[UserRole]) -> Result<()> {
        if user_roles.is_empty() {
            return Ok(());
        }
        with_transaction(ctx, self, "inserting user roles", |tx| {
            insert_user_roles_in(ctx, tx, user_roles)
        })
    }

    #[tracing::instrument(skip(self, ctx), err)]
    fn select_user_roles(&self, ctx: &Context, filters: &[Filter]) -> Result<Vec<UserRole>> {
        let stmt = QueryBuilder::select(format!("SELECT user_id, role_id FROM {}", TABLE_USER_ROLE), FIELDS)
            .apply(filters)?
            .build()?;
        fetch_all(ctx, &mut replica(ctx, self)?, "An error occurred while getting user roles", &stmt)
    }

    #[tracing::instrument(skip(self, ctx), err)]
    fn select_role_ids_of_user_role(&self, ctx: &Context, user_id: &str) -> Result<Vec<i32>> {
        select_role_ids_in(ctx, &mut replica(ctx, self)?, user_id)
    }

    #[tracing::instrument(skip(self, ctx), err)]
    fn select_user_ids_of_user_role(&self, ctx: &Context, role_id: i32) -> Result<Vec<String>> {
        let stmt = Statement::new(format!(
            "SELECT user_id FROM {} WHERE role_id = ? ORDER BY user_id",
            TABLE_USER_ROLE
        ))
        .bind(role_id);
        fetch_strings(
            ctx,
            &mut replica(ctx, self)?,
            "An error occurred while getting user ids of role",
            "user_id",
            &stmt,
        )
    }

    #[tracing::instrument(skip(self, ctx), err)]
    fn delete_user_roles(&self, ctx: &Context, filters: &[Filter]) -> Result<()> {
        let stmt = QueryBuilder::delete(TABLE_USER_ROLE, FIELDS).apply(filters)?.build()?;
        with_transaction(ctx, self, "deleting user roles", |tx| {
            execute(ctx, tx, "An error occurred while deleting user roles", &stmt)?;
            Ok(())
        })
    }
}

pub(crate) fn select_role_ids_in<E: Executor + ?Sized>(
    ctx: &Context,
    ex: &mut E,
    user_id: &str,
) -> Result<Vec<i32>> {
    let stmt = Statement::new(format!(
        "SELECT role_id FROM {} WHERE user_id = ? ORDER BY role_id",
        TABLE_USER_ROLE
    ))
    .bind(user_id);
    fetch_rows(ctx, ex, "An error occurred while getting role ids", &stmt)?
        .iter()
        .map(|row| row.int32("role_id"))
        .collect()
}

pub(crate) fn insert_user_roles_in<E: Executor + ?Sized>(
    ctx: &Context,
    ex: &mut E,
    user_roles: &[UserRole],
) -> Result<()> {
    let exists = format!(
        "SELECT user_id, role_id FROM {} WHERE user_id = ? AND role_id = ?",
        TABLE_USER_ROLE
    );
    let insert = format!("INSERT INTO {} (user_id, role_id) VALUES (?, ?)", TABLE_USER_ROLE);

    let mut seen = HashSet::new();
    for ur in user_roles {
        if !seen.insert((ur.user_id.as_str(), ur.role_id)) {
            continue;
        }
        let stmt = Statement::new(exists.as_str()).bind(&ur.user_id).bind(ur.role_id);
        let existing: Option<UserRole> =
            fetch_optional(ctx, ex, "An error occurred while getting user role", &stmt)?;
        if existing.is_some() {
            continue;
        }
        let stmt = Statement::new(insert.as_str()).bind(&ur.user_id).bind(ur.role_id);
        execute(ctx, ex, "An error occurred while inserting user roles", &stmt)?;
    }
    Ok(())
}
