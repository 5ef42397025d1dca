// Models module - Database entity representations

pub mod admin;
pub mod pass_log;
pub mod revoked_pass;
pub mod student;

pub use admin::Admin;
pub use pass_log::{PassAction, PassLog};
pub use revoked_pass::RevokedPass;
pub use student::Student;
