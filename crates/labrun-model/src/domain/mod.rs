mod record_id;
pub use record_id::RecordId;

mod job_status;
pub use job_status::JobStatus;

mod session_status;
pub use session_status::SessionStatus;

mod job;
pub use job::Job;

mod script;
pub use script::Script;

mod session;
pub use session::Session;

mod args;
pub use args::JobArgs;

mod constants;
pub use constants::{JOBS_TABLE, SCRIPTS_TABLE, SESSIONS_TABLE, USERS_TABLE};
