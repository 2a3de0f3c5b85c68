/// Queue-store table holding job records.
pub const JOBS_TABLE: &str = "jobs";

/// Queue-store table holding the script inventory.
pub const SCRIPTS_TABLE: &str = "scripts";

/// Queue-store table holding interactive notebook sessions.
pub const SESSIONS_TABLE: &str = "jupyter_sessions";

/// Queue-store table mapping host accounts to user identities.
pub const USERS_TABLE: &str = "users";
