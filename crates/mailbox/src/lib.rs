pub mod api;
pub mod extract;
pub mod monitor;
pub mod service;

pub use api::{ApiError, HttpMailboxApi, MailMessage, MailboxApi};
pub use extract::extract_verification_code;
pub use monitor::MonitorRegistry;
pub use service::{MailApiService, MailboxError, MailboxProvisioner, VerificationCodeService};
