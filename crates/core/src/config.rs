use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub signup: SignupConfig,
    pub browser: BrowserConfig,
    pub identity: IdentityConfig,
    /// Mailbox-provisioning REST API. When absent, addresses are synthesized
    /// locally from `identity.email_domains`.
    pub mail_api: Option<MailApiConfig>,
    #[serde(default)]
    pub verification: VerificationConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    pub store: StoreConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SignupConfig {
    /// Entry point of the signup flow.
    pub url: String,
    #[serde(default = "default_type_delay_ms")]
    pub type_delay_ms: u64,
    #[serde(default = "default_element_wait")]
    pub element_wait_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BrowserConfig {
    pub headless: bool,
    #[serde(default = "default_window_width")]
    pub window_width: u32,
    #[serde(default = "default_window_height")]
    pub window_height: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IdentityConfig {
    /// Domains for locally synthesized throwaway addresses, chosen uniformly.
    pub email_domains: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MailApiConfig {
    pub server_url: String,
    pub admin_email: String,
    pub admin_password: String,
    /// Domain for addresses provisioned through the API.
    pub email_domain: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct VerificationConfig {
    #[serde(default = "default_max_wait")]
    pub max_wait_seconds: u64,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_seconds: u64,
    /// The monitor window compares the server-reported receipt time against
    /// the local monitor start. The two clocks are assumed synchronized; where
    /// the API server's clock lags, widen the window backwards by this many
    /// seconds. The comparison itself stays strictly-greater.
    #[serde(default)]
    pub clock_skew_tolerance_seconds: u64,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            max_wait_seconds: default_max_wait(),
            poll_interval_seconds: default_poll_interval(),
            max_attempts: default_max_attempts(),
            retry_backoff_seconds: default_retry_backoff(),
            clock_skew_tolerance_seconds: 0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct BatchConfig {
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    #[serde(default = "default_slot_stagger")]
    pub slot_stagger_seconds: u64,
    #[serde(default = "default_inter_batch_pause")]
    pub inter_batch_pause_seconds: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            slot_stagger_seconds: default_slot_stagger(),
            inter_batch_pause_seconds: default_inter_batch_pause(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    pub accounts_file: String,
}

fn default_type_delay_ms() -> u64 { 100 }
fn default_element_wait() -> u64 { 15 }
fn default_window_width() -> u32 { 1920 }
fn default_window_height() -> u32 { 1080 }
fn default_max_wait() -> u64 { 120 }
fn default_poll_interval() -> u64 { 5 }
fn default_max_attempts() -> u32 { 3 }
fn default_retry_backoff() -> u64 { 30 }
fn default_max_concurrent() -> usize { 4 }
fn default_slot_stagger() -> u64 { 3 }
fn default_inter_batch_pause() -> u64 { 10 }
