// ==============
// crates/backend-lib/src/metrics.rs

//! Central place for metric keys
pub const AUTH_REGISTER: &str = "auth.register";
pub const AUTH_LOGIN_SUCCESS: &str = "auth.login.success";
pub const AUTH_LOGIN_FAILURE: &str = "auth.login.failure";
pub const AUTH_RESET_REQUESTED: &str = "auth.reset.requested";
pub const AUTH_RESET_COMPLETED: &str = "auth.reset.completed";
pub const AUTH_REJECTED: &str = "auth.middleware.rejected";
pub const MAIL_SENT: &str = "mail.sent";
pub const MAIL_FAILED: &str = "mail.failed";
pub const SWEEP_FAILED_ITEMS: &str = "sweep.failed_items";
