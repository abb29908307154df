//! Query option composition.
//!
//! Callers describe optional filtering as an ordered list of [`Filter`]
//! directives. [`QueryBuilder`] renders them into one parameterized statement:
//! conditions are ANDed in call order, orderings are appended in call order,
//! and the last paging directive wins. An id-list directive with no ids is
//! skipped rather than rendered as an invalid `IN ()`.

use crate::error::{DatastoreError, Result};
use crate::value::Value;

/// A SQL string with its positional `?` parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        self.params.push(value.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    fn as_sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    ByIds {
        field: &'static str,
        values: Vec<String>,
    },
    ByEquality {
        field: &'static str,
        value: Value,
    },
    Paging {
        limit: i64,
        offset: i64,
    },
    Ordering {
        field: &'static str,
        direction: Direction,
    },
}

impl Filter {
    pub fn by_ids<I, S>(field: &'static str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Filter::ByIds {
            field,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn by_equality(field: &'static str, value: impl Into<Value>) -> Self {
        Filter::ByEquality {
            field,
            value: value.into(),
        }
    }

    pub fn paging(limit: i64, offset: i64) -> Self {
        Filter::Paging { limit, offset }
    }

    pub fn ordering(field: &'static str, direction: Direction) -> Self {
        Filter::Ordering { field, direction }
    }

    fn field(&self) -> Option<&'static str> {
        match self {
            Filter::ByIds { field, .. }
            | Filter::ByEquality { field, .. }
            | Filter::Ordering { field, .. } => Some(*field),
            Filter::Paging { .. } => None,
        }
    }

    /// True when the directive contributes nothing (an empty id list).
    pub fn is_noop(&self) -> bool {
        matches!(self, Filter::ByIds { values, .. } if values.is_empty())
    }
}

/// `?, ?, ?` for an `IN (...)` operand of `n` values.
pub fn in_placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Select,
    Delete,
}

#[derive(Debug)]
pub struct QueryBuilder {
    mode: Mode,
    head: String,
    allowed: &'static [&'static str],
    conditions: Vec<String>,
    params: Vec<Value>,
    filtered: bool,
    orders: Vec<String>,
    paging: Option<(i64, i64)>,
}

impl QueryBuilder {
    /// `head` is everything up to the WHERE clause, e.g. `SELECT ... FROM device`.
    /// Only fields in `allowed` may be named by directives.
    pub fn select(head: impl Into<String>, allowed: &'static [&'static str]) -> Self {
        Self::new(Mode::Select, head.into(), allowed)
    }

    /// A delete must end up with at least one caller-supplied condition.
    pub fn delete(table: &str, allowed: &'static [&'static str]) -> Self {
        Self::new(Mode::Delete, format!("DELETE FROM {}", table), allowed)
    }

    fn new(mode: Mode, head: String, allowed: &'static [&'static str]) -> Self {
        Self {
            mode,
            head,
            allowed,
            conditions: Vec::new(),
            params: Vec::new(),
            filtered: false,
            orders: Vec::new(),
            paging: None,
        }
    }

    /// Fixed condition owned by the operation (e.g. `deleted = 0`).
    pub fn condition<I>(mut self, sql: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        self.conditions.push(sql.into());
        self.params.extend(params);
        self
    }

    pub fn apply(mut self, filters: &[Filter]) -> Result<Self> {
        for filter in filters {
            if let Some(field) = filter.field() {
                if !self.allowed.contains(&field) {
                    return Err(DatastoreError::validation(format!(
                        "{} is not a filterable field here",
                        field
                    )));
                }
            }

            match filter {
                Filter::ByIds { values, .. } if values.is_empty() => {}
                Filter::ByIds { field, values } => {
                    self.conditions
                        .push(format!("{} IN ({})", field, in_placeholders(values.len())));
                    self.params.extend(values.iter().cloned().map(Value::Text));
                    self.filtered = true;
                }
                Filter::ByEquality { field, value } => {
                    self.conditions.push(format!("{} = ?", field));
                    self.params.push(value.clone());
                    self.filtered = true;
                }
                Filter::Paging { limit, offset } => {
                    if self.mode == Mode::Delete {
                        return Err(DatastoreError::validation("paging does not apply to a delete"));
                    }
                    if *limit < 0 || *offset < 0 {
                        return Err(DatastoreError::validation("limit and offset must not be negative"));
                    }
                    self.paging = Some((*limit, *offset));
                }
                Filter::Ordering { field, direction } => {
                    if self.mode == Mode::Delete {
                        return Err(DatastoreError::validation("ordering does not apply to a delete"));
                    }
                    self.orders.push(format!("{} {}", field, direction.as_sql()));
                }
            }
        }
        Ok(self)
    }

    pub fn build(self) -> Result<Statement> {
        if self.mode == Mode::Delete && !self.filtered {
            return Err(DatastoreError::validation(
                "a delete needs at least one filter; refusing to delete every row",
            ));
        }

        let mut sql = self.head;
        let mut params = self.params;
        if !self.conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.conditions.join(" AND "));
        }
        if !self.orders.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.orders.join(", "));
        }
        if let Some((limit, offset)) = self.paging {
            sql.push_str(" LIMIT ? OFFSET ?");
            params.push(Value::Integer(limit));
            params.push(Value::Integer(offset));
        }
        Ok(Statement { sql, params })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIELDS: &[&str] = &["user_id", "platform", "token", "created"];

    #[test]
    fn test_directives_compose_in_call_order() {
        let stmt = QueryBuilder::select("SELECT * FROM device", FIELDS)
            .apply(&[
                Filter::by_ids("user_id", ["u1", "u2"]),
                Filter::by_equality("platform", 1),
                Filter::ordering("created", Direction::Desc),
                Filter::ordering("token", Direction::Asc),
                Filter::paging(10, 20),
            ])
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(
            stmt.sql,
            "SELECT * FROM device WHERE user_id IN (?, ?) AND platform = ? \
             ORDER BY created DESC, token ASC LIMIT ? OFFSET ?"
        );
        assert_eq!(
            stmt.params,
            vec![
                Value::Text("u1".into()),
                Value::Text("u2".into()),
                Value::Integer(1),
                Value::Integer(10),
                Value::Integer(20),
            ]
        );
    }

    #[test]
    fn test_empty_id_list_is_skipped() {
        let stmt = QueryBuilder::select("SELECT * FROM device", FIELDS)
            .apply(&[Filter::by_ids("user_id", Vec::<String>::new())])
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(stmt.sql, "SELECT * FROM device");
        assert!(stmt.params.is_empty());
    }

    #[test]
    fn test_fixed_conditions_come_first() {
        let stmt = QueryBuilder::select("SELECT * FROM user", &["user_id"])
            .condition("deleted = 0", [])
            .apply(&[Filter::by_equality("user_id", "u1")])
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(stmt.sql, "SELECT * FROM user WHERE deleted = 0 AND user_id = ?");
    }

    #[test]
    fn test_last_paging_wins() {
        let stmt = QueryBuilder::select("SELECT * FROM device", FIELDS)
            .apply(&[Filter::paging(5, 0), Filter::paging(50, 100)])
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(stmt.params, vec![Value::Integer(50), Value::Integer(100)]);
    }

    #[test]
    fn test_filterless_delete_is_rejected() {
        let err = QueryBuilder::delete("device", FIELDS).build().unwrap_err();
        assert!(matches!(err, DatastoreError::Validation(_)));

        // empty id lists don't count as a filter either
        let err = QueryBuilder::delete("device", FIELDS)
            .apply(&[Filter::by_ids("user_id", Vec::<String>::new())])
            .unwrap()
            .build()
            .unwrap_err();
        assert!(matches!(err, DatastoreError::Validation(_)));
    }

    #[test]
    fn test_delete_rejects_paging_and_unknown_fields() {
        assert!(QueryBuilder::delete("device", FIELDS)
            .apply(&[Filter::paging(1, 0)])
            .is_err());
        assert!(QueryBuilder::select("SELECT * FROM device", FIELDS)
            .apply(&[Filter::by_equality("password", "x")])
            .is_err());
    }

    #[test]
    fn test_in_placeholders() {
        assert_eq!(in_placeholders(1), "?");
        assert_eq!(in_placeholders(3), "?, ?, ?");
    }
}
