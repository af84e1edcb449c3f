use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use accountmint_core::config::VerificationConfig;

use crate::api::{ApiError, MailMessage, MailboxApi};
use crate::extract::extract_verification_code;
use crate::monitor::MonitorRegistry;

/// Tokens are issued without an expiry in the response; the service assumes
/// one hour and re-authenticates transparently on 401 in the meantime.
const TOKEN_TTL: Duration = Duration::from_secs(3600);

#[derive(Error, Debug)]
pub enum MailboxError {
    #[error("network error: {0}")]
    Network(String),

    #[error("mailbox api error: {0}")]
    Api(String),

    #[error("no eligible message within {0:?}")]
    Timeout(Duration),

    #[error("monitoring cancelled for {0}")]
    Cancelled(String),

    #[error("verification code not received after {attempts} attempts: {last}")]
    VerificationTimeout { attempts: u32, last: String },
}

impl From<ApiError> for MailboxError {
    fn from(error: ApiError) -> Self {
        match error {
            // A 401 that survives the single transparent re-auth surfaces as
            // a transport-level failure.
            ApiError::Unauthorized => MailboxError::Network("authentication rejected".to_string()),
            ApiError::Network(message) => MailboxError::Network(message),
            ApiError::Rejected(message) => MailboxError::Api(message),
        }
    }
}

/// Retrieval of single-use verification codes for a mailbox. The IMAP-backed
/// reader implements this same contract in the desktop shell.
#[async_trait]
pub trait VerificationCodeService: Send + Sync {
    /// Block until a code newer than `monitor_start` (default: call time)
    /// arrives, retrying per the configured outer retry policy.
    async fn retrieve_code(
        &self,
        mailbox: &str,
        max_wait: Duration,
        monitor_start: Option<DateTime<Utc>>,
    ) -> Result<String, MailboxError>;

    /// Cancel active polling for `mailbox`. Idempotent, never errors.
    fn stop_monitoring(&self, mailbox: &str);

    /// Cancel all active polling. Idempotent, never errors.
    fn stop_all(&self);
}

/// Provisioning of fresh throwaway addresses through the mailbox API.
#[async_trait]
pub trait MailboxProvisioner: Send + Sync {
    async fn create_address(&self) -> Result<String, MailboxError>;
}

struct CachedToken {
    token: String,
    expires_at: Instant,
}

/// Mailbox-API backed implementation: token cache with single 401 recovery,
/// fixed-interval polling inside a bounded outer retry loop, and a monitor
/// registry enforcing one active poll per mailbox.
pub struct MailApiService {
    api: Arc<dyn MailboxApi>,
    config: VerificationConfig,
    email_domain: String,
    token: RwLock<Option<CachedToken>>,
    refresh_lock: Mutex<()>,
    monitors: MonitorRegistry,
}

impl MailApiService {
    pub fn new(api: Arc<dyn MailboxApi>, config: VerificationConfig, email_domain: String) -> Self {
        Self {
            api,
            config,
            email_domain,
            token: RwLock::new(None),
            refresh_lock: Mutex::new(()),
            monitors: MonitorRegistry::new(),
        }
    }

    /// Acquire a token, validating the configured admin credentials.
    pub async fn test_connection(&self) -> Result<(), MailboxError> {
        self.ensure_token().await?;
        Ok(())
    }

    async fn ensure_token(&self) -> Result<String, MailboxError> {
        if let Some(cached) = self.token.read().await.as_ref() {
            if cached.expires_at > Instant::now() {
                return Ok(cached.token.clone());
            }
        }
        self.refresh_token(None).await
    }

    /// Fetch a new token. `stale` is the token the caller saw rejected;
    /// concurrent refreshes collapse because whoever wins the lock replaces
    /// the cache and later entrants see a token that is no longer `stale`.
    async fn refresh_token(&self, stale: Option<&str>) -> Result<String, MailboxError> {
        let _guard = self.refresh_lock.lock().await;

        if let Some(cached) = self.token.read().await.as_ref() {
            if cached.expires_at > Instant::now() && stale != Some(cached.token.as_str()) {
                return Ok(cached.token.clone());
            }
        }

        let token = self.api.generate_token().await?;
        info!("mailbox api token acquired");
        *self.token.write().await = Some(CachedToken {
            token: token.clone(),
            expires_at: Instant::now() + TOKEN_TTL,
        });
        Ok(token)
    }

    async fn list_messages(&self, mailbox: &str) -> Result<Vec<MailMessage>, MailboxError> {
        let token = self.ensure_token().await?;
        match self.api.list_messages(&token, mailbox).await {
            Err(ApiError::Unauthorized) => {
                debug!("token rejected, re-authenticating once");
                let token = self.refresh_token(Some(&token)).await?;
                Ok(self.api.list_messages(&token, mailbox).await?)
            }
            other => Ok(other?),
        }
    }

    /// One poll tick: list the mailbox and extract a code from any message
    /// received strictly after the monitor window opened.
    async fn check_once(
        &self,
        mailbox: &str,
        window_start: DateTime<Utc>,
    ) -> Result<Option<String>, MailboxError> {
        let messages = self.list_messages(mailbox).await?;
        let cutoff =
            window_start - chrono::Duration::seconds(self.config.clock_skew_tolerance_seconds as i64);

        for message in &messages {
            let Some(received) = message.received_at() else {
                continue;
            };
            if received <= cutoff {
                continue;
            }
            debug!(
                mailbox,
                subject = message.subject.as_deref().unwrap_or("<none>"),
                %received,
                "checking new message"
            );
            if let Some(text) = message.text.as_deref() {
                if let Some(code) = extract_verification_code(text) {
                    return Ok(Some(code));
                }
            }
            if let Some(html) = message.content.as_deref() {
                if let Some(code) = extract_verification_code(html) {
                    return Ok(Some(code));
                }
            }
        }

        Ok(None)
    }

    /// One bounded attempt: poll every `poll_interval` until a code arrives,
    /// the window is cancelled, or `max_wait` (measured from now) elapses.
    /// Transport errors on a tick are logged and polling continues.
    async fn poll_once(
        &self,
        mailbox: &str,
        window_start: DateTime<Utc>,
        max_wait: Duration,
    ) -> Result<String, MailboxError> {
        let cancel = self.monitors.begin(mailbox, window_start);
        let poll_interval = Duration::from_secs(self.config.poll_interval_seconds);
        let deadline = Instant::now() + max_wait;

        let result = loop {
            if cancel.load(Ordering::SeqCst) {
                break Err(MailboxError::Cancelled(mailbox.to_string()));
            }
            match self.check_once(mailbox, window_start).await {
                Ok(Some(code)) => break Ok(code),
                Ok(None) => {}
                Err(error) => warn!(mailbox, %error, "mailbox poll failed, continuing"),
            }
            if Instant::now() + poll_interval > deadline {
                break Err(MailboxError::Timeout(max_wait));
            }
            tokio::time::sleep(poll_interval).await;
        };

        self.monitors.finish(mailbox, &cancel);
        result
    }
}

#[async_trait]
impl VerificationCodeService for MailApiService {
    async fn retrieve_code(
        &self,
        mailbox: &str,
        max_wait: Duration,
        monitor_start: Option<DateTime<Utc>>,
    ) -> Result<String, MailboxError> {
        let window_start = monitor_start.unwrap_or_else(Utc::now);
        let backoff = Duration::from_secs(self.config.retry_backoff_seconds);
        let mut last_error = None;

        for attempt in 1..=self.config.max_attempts {
            info!(
                mailbox,
                attempt,
                max_attempts = self.config.max_attempts,
                "waiting for verification code"
            );
            match self.poll_once(mailbox, window_start, max_wait).await {
                Ok(code) => {
                    info!(mailbox, "verification code received");
                    return Ok(code);
                }
                // An explicit stop ends the retrieval; the remaining retry
                // budget is not consumed.
                Err(MailboxError::Cancelled(email)) => {
                    return Err(MailboxError::Cancelled(email));
                }
                Err(error) => {
                    warn!(mailbox, attempt, %error, "code retrieval attempt failed");
                    last_error = Some(error);
                    if attempt < self.config.max_attempts {
                        tokio::time::sleep(backoff).await;
                    }
                }
            }
        }

        Err(MailboxError::VerificationTimeout {
            attempts: self.config.max_attempts,
            last: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no attempts made".to_string()),
        })
    }

    fn stop_monitoring(&self, mailbox: &str) {
        self.monitors.stop(mailbox);
    }

    fn stop_all(&self) {
        self.monitors.stop_all();
    }
}

#[async_trait]
impl MailboxProvisioner for MailApiService {
    /// Provision a fresh address: 12 random lowercase alphanumerics at the
    /// configured domain, registered through `account/add`.
    async fn create_address(&self) -> Result<String, MailboxError> {
        let email = format!("{}@{}", random_local_part(12), self.email_domain);

        let token = self.ensure_token().await?;
        let account_id = match self.api.create_address(&token, &email).await {
            Err(ApiError::Unauthorized) => {
                debug!("token rejected, re-authenticating once");
                let token = self.refresh_token(Some(&token)).await?;
                self.api.create_address(&token, &email).await?
            }
            other => other?,
        };

        info!(email = %email, account_id = %account_id, "mailbox created");
        Ok(email)
    }
}

fn random_local_part(length: usize) -> String {
    use rand::Rng;

    let chars = "abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| {
            let index = rng.gen_range(0..chars.len());
            chars.as_bytes()[index] as char
        })
        .collect()
}
