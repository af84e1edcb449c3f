use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use accountmint_browser::{BrowserProvider, DriverError, Locator, PageDriver};
use accountmint_core::{AccountRecord, LogSink, SessionError, SessionResult};
use accountmint_mailbox::{MailboxError, MailboxProvisioner, VerificationCodeService};
use accountmint_store::CredentialStore;

use crate::challenge::ChallengeWaiter;
use crate::identity::IdentityGenerator;
use crate::state::{SessionState, SessionTrace};

const PASSWORD_CSS: &str = r#"input[type="password"]"#;
const CODE_INPUT_CSS: &str = r#"input[type="text"], input[name="code"]"#;
const SUBMIT_CSS: &str = r#"button[type="submit"]"#;
const CONTINUE_LABELS: [&str; 3] = ["Continue", "Next", "继续"];

/// Settle pauses between steps; the signup pages re-render after each
/// transition and react badly to immediate input.
const SETTLE_SHORT: Duration = Duration::from_secs(1);
const SETTLE_SUBMIT: Duration = Duration::from_secs(3);
const SETTLE_CHALLENGE: Duration = Duration::from_secs(2);
const SETTLE_OUTCOME: Duration = Duration::from_secs(5);

const POST_CHALLENGE_CLICK_ATTEMPTS: usize = 10;
const POST_CHALLENGE_CLICK_INTERVAL: Duration = Duration::from_secs(3);

fn first_name_input() -> Locator {
    Locator::css(r#"input[name="firstName"], input[placeholder*="First"], input[placeholder*="first"]"#)
}

fn last_name_input() -> Locator {
    Locator::css(r#"input[name="lastName"], input[placeholder*="Last"], input[placeholder*="last"]"#)
}

fn email_input() -> Locator {
    Locator::css(r#"input[type="email"], input[name="email"]"#)
}

fn terms_checkbox() -> Locator {
    Locator::css(r#"input[type="checkbox"]"#)
}

/// Submit strategies in preference order: the structural control first, then
/// a text-content search across interactive elements.
fn submit_locators() -> [Locator; 2] {
    [Locator::css(SUBMIT_CSS), Locator::text(CONTINUE_LABELS)]
}

fn browser_error(error: DriverError) -> SessionError {
    SessionError::Network(error.to_string())
}

fn verification_error(error: MailboxError) -> SessionError {
    match error {
        MailboxError::VerificationTimeout { attempts, last } => {
            SessionError::VerificationTimeout { attempts, last }
        }
        other => SessionError::Network(other.to_string()),
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub signup_url: String,
    pub type_delay: Duration,
    pub element_wait: Duration,
    pub code_max_wait: Duration,
}

/// Everything a session needs from the outside world. Cloned per attempt.
#[derive(Clone)]
pub struct SessionDeps {
    pub config: SessionConfig,
    pub browser: Arc<dyn BrowserProvider>,
    pub codes: Arc<dyn VerificationCodeService>,
    pub provisioner: Option<Arc<dyn MailboxProvisioner>>,
    pub identity: Arc<IdentityGenerator>,
    pub store: Arc<CredentialStore>,
}

/// One end-to-end signup attempt. Owns a fresh browser for its lifetime and
/// converts every failure into a `SessionResult` at the boundary.
pub struct RegistrationSession {
    deps: SessionDeps,
    challenge: ChallengeWaiter,
    log: LogSink,
}

impl RegistrationSession {
    pub fn new(deps: SessionDeps, log: LogSink) -> Self {
        Self {
            deps,
            challenge: ChallengeWaiter::default(),
            log,
        }
    }

    pub async fn run(&self) -> SessionResult {
        (self.log)("connecting browser".to_string());
        let page = match self.deps.browser.open().await {
            Ok(page) => page,
            Err(error) => {
                warn!(%error, "browser launch failed");
                return SessionResult::failed(
                    accountmint_core::ErrorKind::Network,
                    format!("init: {}", error),
                );
            }
        };

        let mut trace = SessionTrace::new();
        let outcome = self.execute(page.as_ref(), &mut trace).await;

        // The browser is released whatever happened above.
        page.close().await;

        match outcome {
            Ok(record) => {
                (self.log)(format!("account created: {}", record.email));
                SessionResult::ok(record)
            }
            Err(error) => {
                let failed_in = trace.current();
                trace.set(SessionState::Failed);
                warn!(state = %failed_in, %error, "registration failed");
                (self.log)(format!("registration failed during {}: {}", failed_in, error));
                SessionResult::failed(error.kind(), format!("{}: {}", failed_in, error))
            }
        }
    }

    async fn execute(
        &self,
        page: &dyn PageDriver,
        trace: &mut SessionTrace,
    ) -> Result<AccountRecord, SessionError> {
        let config = &self.deps.config;

        trace.set(SessionState::ObtainMailbox);
        let email = match &self.deps.provisioner {
            Some(provisioner) => provisioner
                .create_address()
                .await
                .map_err(verification_error)?,
            None => self.deps.identity.next_address(),
        };
        // Site convention: the password is the mailbox address.
        let password = email.clone();
        let (first_name, last_name) = self.deps.identity.random_name();
        (self.log)(format!("mailbox: {}", email));
        (self.log)(format!("name: {} {}", first_name, last_name));

        page.navigate(&config.signup_url)
            .await
            .map_err(browser_error)?;

        trace.set(SessionState::FillBasicInfo);
        if !page
            .wait_for(&Locator::css("input"), config.element_wait)
            .await
            .map_err(browser_error)?
        {
            return Err(SessionError::ElementNotFound("signup form".to_string()));
        }
        tokio::time::sleep(SETTLE_SHORT).await;

        let delay = config.type_delay;
        // Name fields are optional on some revisions of the form.
        if !page
            .type_text(&first_name_input(), &first_name, false, delay)
            .await
            .map_err(browser_error)?
        {
            debug!("first-name input not present, skipping");
        }
        if !page
            .type_text(&last_name_input(), &last_name, false, delay)
            .await
            .map_err(browser_error)?
        {
            debug!("last-name input not present, skipping");
        }
        page.type_text(&email_input(), &email, true, delay)
            .await
            .map_err(browser_error)?;

        if page.checked(&terms_checkbox()).await.map_err(browser_error)? == Some(false) {
            page.click(&terms_checkbox()).await.map_err(browser_error)?;
        }
        tokio::time::sleep(SETTLE_SHORT).await;

        trace.set(SessionState::SubmitBasicInfo);
        self.submit_step(page, "basic info").await?;
        tokio::time::sleep(SETTLE_SUBMIT).await;

        trace.set(SessionState::FillPassword);
        let password_first = Locator::nth(PASSWORD_CSS, 0);
        if !page
            .wait_for(&password_first, config.element_wait)
            .await
            .map_err(browser_error)?
        {
            return Err(SessionError::ElementNotFound("password form".to_string()));
        }
        tokio::time::sleep(SETTLE_SHORT).await;

        // Some revisions carry the email over, some present it empty again.
        if let Some(value) = page.value(&email_input()).await.map_err(browser_error)? {
            if value.is_empty() {
                page.type_text(&email_input(), &email, false, delay)
                    .await
                    .map_err(browser_error)?;
            }
        }

        page.type_text(&password_first, &password, false, delay)
            .await
            .map_err(browser_error)?;
        if page.count(PASSWORD_CSS).await.map_err(browser_error)? >= 2 {
            page.type_text(&Locator::nth(PASSWORD_CSS, 1), &password, false, delay)
                .await
                .map_err(browser_error)?;
        }
        tokio::time::sleep(SETTLE_SHORT).await;

        trace.set(SessionState::SubmitPassword);
        self.submit_step(page, "password").await?;
        tokio::time::sleep(SETTLE_SUBMIT).await;

        trace.set(SessionState::AwaitChallenge);
        (self.log)("waiting for challenge to clear".to_string());
        if self.challenge.await_ready(page).await {
            (self.log)("challenge cleared".to_string());
        } else {
            // Soft by design: the check may have passed invisibly.
            (self.log)("challenge wait timed out, proceeding".to_string());
        }
        tokio::time::sleep(SETTLE_CHALLENGE).await;

        trace.set(SessionState::SubmitPostChallenge);
        self.submit_post_challenge(page).await?;
        tokio::time::sleep(SETTLE_SUBMIT).await;

        trace.set(SessionState::AwaitCode);
        if !page
            .wait_for(&Locator::css(CODE_INPUT_CSS), config.element_wait)
            .await
            .map_err(browser_error)?
        {
            return Err(SessionError::ElementNotFound("code input".to_string()));
        }
        (self.log)("waiting for verification code".to_string());
        let code = self
            .deps
            .codes
            .retrieve_code(&email, config.code_max_wait, None)
            .await
            .map_err(verification_error)?;
        (self.log)("verification code received".to_string());

        trace.set(SessionState::SubmitCode);
        let boxes = page.count(CODE_INPUT_CSS).await.map_err(browser_error)?;
        if boxes >= 6 {
            // Six single-character boxes, one digit each.
            for (index, digit) in code.chars().take(6).enumerate() {
                page.type_text(
                    &Locator::nth(CODE_INPUT_CSS, index),
                    &digit.to_string(),
                    false,
                    delay,
                )
                .await
                .map_err(browser_error)?;
            }
        } else {
            page.type_text(&Locator::css(CODE_INPUT_CSS), &code, false, delay)
                .await
                .map_err(browser_error)?;
        }
        tokio::time::sleep(SETTLE_SHORT).await;

        if !page
            .click(&Locator::css(SUBMIT_CSS))
            .await
            .map_err(browser_error)?
        {
            debug!("create-account control missing, page may submit on its own");
        }
        tokio::time::sleep(SETTLE_OUTCOME).await;

        trace.set(SessionState::VerifyOutcome);
        let url = page.current_url().await.map_err(browser_error)?;
        // Heuristic: any landing page other than login/signup means we are in.
        if url.contains("/login") || url.contains("/signup") {
            return Err(SessionError::UnknownOutcome(url));
        }
        info!(%url, "registration accepted");

        let record = AccountRecord::new(email, password, first_name, last_name);
        self.deps
            .store
            .append(&record)
            .await
            .map_err(|e| SessionError::Network(format!("credential store: {}", e)))?;

        trace.set(SessionState::Done);
        Ok(record)
    }

    /// Try each submit strategy once; exhaustion is fatal for the step.
    async fn submit_step(&self, page: &dyn PageDriver, step: &str) -> Result<(), SessionError> {
        for locator in submit_locators() {
            if page.click(&locator).await.map_err(browser_error)? {
                debug!(step, strategy = %locator.describe(), "submitted");
                return Ok(());
            }
        }
        Err(SessionError::ElementNotFound(format!(
            "{} continue control",
            step
        )))
    }

    /// After the challenge the continue control can take a while to become
    /// clickable, or the page may advance on its own; retry for a while, then
    /// proceed either way.
    async fn submit_post_challenge(&self, page: &dyn PageDriver) -> Result<(), SessionError> {
        for attempt in 0..POST_CHALLENGE_CLICK_ATTEMPTS {
            for locator in submit_locators() {
                if page.click(&locator).await.map_err(browser_error)? {
                    debug!(attempt, strategy = %locator.describe(), "post-challenge continue clicked");
                    return Ok(());
                }
            }
            tokio::time::sleep(POST_CHALLENGE_CLICK_INTERVAL).await;
        }
        (self.log)("continue control not found after challenge, page may have advanced".to_string());
        Ok(())
    }
}

/// Production `SessionRunner`: builds one `RegistrationSession` per attempt.
pub struct LiveSessionRunner {
    deps: SessionDeps,
}

impl LiveSessionRunner {
    pub fn new(deps: SessionDeps) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl crate::batch::SessionRunner for LiveSessionRunner {
    async fn run_session(&self, _attempt: usize, log: LogSink) -> SessionResult {
        RegistrationSession::new(self.deps.clone(), log).run().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{FakeBrowser, FakeCodes, FakePage, FakeProvisioner};
    use accountmint_core::{null_log, ErrorKind};

    fn config() -> SessionConfig {
        SessionConfig {
            signup_url: "https://example.com/account/register".to_string(),
            type_delay: Duration::from_millis(0),
            element_wait: Duration::from_secs(15),
            code_max_wait: Duration::from_secs(120),
        }
    }

    fn deps(
        page: Arc<FakePage>,
        codes: Arc<dyn VerificationCodeService>,
        store: Arc<CredentialStore>,
    ) -> SessionDeps {
        SessionDeps {
            config: config(),
            browser: Arc::new(FakeBrowser::new(page)),
            codes,
            provisioner: None,
            identity: Arc::new(IdentityGenerator::new(vec!["mail.example.com".to_string()])),
            store,
        }
    }

    fn temp_store(dir: &tempfile::TempDir) -> Arc<CredentialStore> {
        Arc::new(CredentialStore::new(dir.path().join("accounts.json")))
    }

    #[tokio::test(start_paused = true)]
    async fn successful_session_persists_one_record() {
        let dir = tempfile::tempdir().unwrap();
        let page = Arc::new(FakePage::happy_path());
        let store = temp_store(&dir);
        let session = RegistrationSession::new(
            deps(page.clone(), Arc::new(FakeCodes::returning("482931")), store.clone()),
            null_log(),
        );

        let result = session.run().await;

        assert!(result.success, "detail: {:?}", result.detail);
        let record = result.record.unwrap();
        assert_eq!(record.password, record.email, "site convention");
        assert!(record.email.ends_with("@mail.example.com"));

        let saved = store.load().await.unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].email, record.email);

        assert!(page.closed.load(std::sync::atomic::Ordering::SeqCst));
        assert_eq!(
            page.visited.lock().unwrap().as_slice(),
            ["https://example.com/account/register"]
        );
        assert!(page.typed_into("code").iter().any(|t| t == "482931"));
    }

    #[tokio::test(start_paused = true)]
    async fn six_code_boxes_get_one_digit_each() {
        let dir = tempfile::tempdir().unwrap();
        let page = Arc::new(FakePage::happy_path());
        page.set_count(CODE_INPUT_CSS, 6);
        let session = RegistrationSession::new(
            deps(page.clone(), Arc::new(FakeCodes::returning("482931")), temp_store(&dir)),
            null_log(),
        );

        let result = session.run().await;
        assert!(result.success);

        let digits: Vec<String> = page
            .typed_into("code")
            .into_iter()
            .filter(|t| t.len() == 1)
            .collect();
        assert_eq!(digits.join(""), "482931");
    }

    #[tokio::test(start_paused = true)]
    async fn missing_continue_control_is_element_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let page = Arc::new(FakePage::happy_path());
        page.fail_all_clicks();
        let store = temp_store(&dir);
        let session = RegistrationSession::new(
            deps(page.clone(), Arc::new(FakeCodes::returning("482931")), store.clone()),
            null_log(),
        );

        let result = session.run().await;

        assert!(!result.success);
        assert_eq!(result.error, Some(ErrorKind::ElementNotFound));
        assert!(result.detail.unwrap().contains("submit-basic-info"));
        assert!(store.load().await.unwrap().is_empty());
        assert!(
            page.closed.load(std::sync::atomic::Ordering::SeqCst),
            "browser released on failure too"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn still_unauthenticated_url_is_unknown_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let page = Arc::new(FakePage::happy_path());
        page.set_final_url("https://example.com/account/signup");
        let store = temp_store(&dir);
        let session = RegistrationSession::new(
            deps(page.clone(), Arc::new(FakeCodes::returning("482931")), store.clone()),
            null_log(),
        );

        let result = session.run().await;

        assert!(!result.success);
        assert_eq!(result.error, Some(ErrorKind::UnknownOutcome));
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn code_timeout_fails_the_session() {
        let dir = tempfile::tempdir().unwrap();
        let page = Arc::new(FakePage::happy_path());
        let session = RegistrationSession::new(
            deps(page.clone(), Arc::new(FakeCodes::timing_out()), temp_store(&dir)),
            null_log(),
        );

        let result = session.run().await;

        assert!(!result.success);
        assert_eq!(result.error, Some(ErrorKind::VerificationTimeout));
        assert!(result.detail.unwrap().contains("await-code"));
    }

    #[tokio::test(start_paused = true)]
    async fn provisioned_mailbox_takes_precedence_over_local_synthesis() {
        let dir = tempfile::tempdir().unwrap();
        let page = Arc::new(FakePage::happy_path());
        let mut deps = deps(
            page.clone(),
            Arc::new(FakeCodes::returning("482931")),
            temp_store(&dir),
        );
        deps.provisioner = Some(Arc::new(FakeProvisioner {
            address: "k3j2h1g0fxyz@api.example.com".to_string(),
        }));
        let session = RegistrationSession::new(deps, null_log());

        let result = session.run().await;
        assert!(result.success);
        assert_eq!(result.record.unwrap().email, "k3j2h1g0fxyz@api.example.com");
    }
}
