pub mod api;
pub mod models;

/// Current time as unix seconds, the unit every timestamp column uses.
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}
