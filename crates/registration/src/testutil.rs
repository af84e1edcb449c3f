//! Scripted stand-ins for the browser page, code service, and mailbox
//! provisioner used across this crate's tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use accountmint_browser::{BrowserProvider, DriverError, Locator, PageDriver};
use accountmint_mailbox::{MailboxError, MailboxProvisioner, VerificationCodeService};

use crate::challenge::{CHALLENGE_FRAME, SUCCESS_MARKERS};

/// A page whose answers are scripted per selector. Defaults describe a signup
/// flow that goes right: every form control exists, the challenge frame is
/// absent, the continue control is usable, and the final URL is signed in.
pub struct FakePage {
    missing: Mutex<HashSet<String>>,
    frame_answers: Mutex<VecDeque<bool>>,
    frame_default: AtomicBool,
    continue_answers: Mutex<VecDeque<bool>>,
    continue_default: AtomicBool,
    success_marker: AtomicBool,
    counts: Mutex<HashMap<String, usize>>,
    values: Mutex<HashMap<String, String>>,
    checkbox_checked: AtomicBool,
    fail_all_clicks: AtomicBool,
    pub visited: Mutex<Vec<String>>,
    pub typed: Mutex<Vec<(String, String)>>,
    pub clicks: Mutex<Vec<String>>,
    final_url: Mutex<String>,
    pub closed: AtomicBool,
}

impl FakePage {
    pub fn happy_path() -> Self {
        Self {
            missing: Mutex::new(HashSet::new()),
            frame_answers: Mutex::new(VecDeque::new()),
            frame_default: AtomicBool::new(false),
            continue_answers: Mutex::new(VecDeque::new()),
            continue_default: AtomicBool::new(true),
            success_marker: AtomicBool::new(false),
            counts: Mutex::new(HashMap::new()),
            values: Mutex::new(HashMap::new()),
            checkbox_checked: AtomicBool::new(false),
            fail_all_clicks: AtomicBool::new(false),
            visited: Mutex::new(Vec::new()),
            typed: Mutex::new(Vec::new()),
            clicks: Mutex::new(Vec::new()),
            final_url: Mutex::new("https://example.com/account/home".to_string()),
            closed: AtomicBool::new(false),
        }
    }

    pub fn script_frame(&self, answers: impl IntoIterator<Item = bool>) {
        self.frame_answers.lock().unwrap().extend(answers);
    }

    pub fn set_frame_default(&self, present: bool) {
        self.frame_default.store(present, Ordering::SeqCst);
    }

    pub fn script_continue(&self, answers: impl IntoIterator<Item = bool>) {
        self.continue_answers.lock().unwrap().extend(answers);
    }

    pub fn set_continue_ready(&self, ready: bool) {
        self.continue_default.store(ready, Ordering::SeqCst);
    }

    pub fn set_success_marker(&self, present: bool) {
        self.success_marker.store(present, Ordering::SeqCst);
    }

    pub fn set_missing(&self, css: &str) {
        self.missing.lock().unwrap().insert(css.to_string());
    }

    pub fn set_count(&self, css: &str, count: usize) {
        self.counts.lock().unwrap().insert(css.to_string(), count);
    }

    pub fn set_final_url(&self, url: &str) {
        *self.final_url.lock().unwrap() = url.to_string();
    }

    pub fn fail_all_clicks(&self) {
        self.fail_all_clicks.store(true, Ordering::SeqCst);
    }

    pub fn typed_into(&self, fragment: &str) -> Vec<String> {
        self.typed
            .lock()
            .unwrap()
            .iter()
            .filter(|(locator, _)| locator.contains(fragment))
            .map(|(_, text)| text.clone())
            .collect()
    }

    fn exists_css(&self, css: &str) -> bool {
        if css == CHALLENGE_FRAME {
            if let Some(answer) = self.frame_answers.lock().unwrap().pop_front() {
                return answer;
            }
            return self.frame_default.load(Ordering::SeqCst);
        }
        if css == SUCCESS_MARKERS {
            return self.success_marker.load(Ordering::SeqCst);
        }
        !self.missing.lock().unwrap().contains(css)
    }

    fn locator_exists(&self, locator: &Locator) -> bool {
        match locator {
            Locator::Css(css) => self.exists_css(css),
            Locator::Nth { css, index } => {
                let count = *self.counts.lock().unwrap().get(css).unwrap_or(&1);
                self.exists_css(css) && *index < count
            }
            Locator::Text { .. } => true,
        }
    }
}

#[async_trait]
impl PageDriver for FakePage {
    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        self.visited.lock().unwrap().push(url.to_string());
        Ok(())
    }

    async fn wait_for(&self, locator: &Locator, _timeout: Duration) -> Result<bool, DriverError> {
        Ok(self.locator_exists(locator))
    }

    async fn exists(&self, locator: &Locator) -> Result<bool, DriverError> {
        Ok(self.locator_exists(locator))
    }

    async fn count(&self, css: &str) -> Result<usize, DriverError> {
        if !self.exists_css(css) {
            return Ok(0);
        }
        Ok(*self.counts.lock().unwrap().get(css).unwrap_or(&1))
    }

    async fn clickable(&self, locator: &Locator) -> Result<bool, DriverError> {
        match locator {
            Locator::Text { .. } => {
                if let Some(answer) = self.continue_answers.lock().unwrap().pop_front() {
                    return Ok(answer);
                }
                Ok(self.continue_default.load(Ordering::SeqCst))
            }
            other => Ok(self.locator_exists(other)),
        }
    }

    async fn click(&self, locator: &Locator) -> Result<bool, DriverError> {
        if self.fail_all_clicks.load(Ordering::SeqCst) {
            return Ok(false);
        }
        if !self.locator_exists(locator) {
            return Ok(false);
        }
        self.clicks.lock().unwrap().push(locator.describe());
        Ok(true)
    }

    async fn type_text(
        &self,
        locator: &Locator,
        text: &str,
        _clear_first: bool,
        _per_char_delay: Duration,
    ) -> Result<bool, DriverError> {
        if !self.locator_exists(locator) {
            return Ok(false);
        }
        self.typed
            .lock()
            .unwrap()
            .push((locator.describe(), text.to_string()));
        Ok(true)
    }

    async fn value(&self, locator: &Locator) -> Result<Option<String>, DriverError> {
        if !self.locator_exists(locator) {
            return Ok(None);
        }
        let key = locator.describe();
        Ok(Some(
            self.values
                .lock()
                .unwrap()
                .get(&key)
                .cloned()
                .unwrap_or_default(),
        ))
    }

    async fn checked(&self, locator: &Locator) -> Result<Option<bool>, DriverError> {
        if !self.locator_exists(locator) {
            return Ok(None);
        }
        Ok(Some(self.checkbox_checked.load(Ordering::SeqCst)))
    }

    async fn eval_bool(&self, _script: &str) -> Result<bool, DriverError> {
        Ok(false)
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        Ok(self.final_url.lock().unwrap().clone())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Hands out clones of one shared fake page so tests can inspect it after the
/// session releases its copy.
pub struct FakeBrowser {
    pub page: Arc<FakePage>,
}

impl FakeBrowser {
    pub fn new(page: Arc<FakePage>) -> Self {
        Self { page }
    }
}

#[async_trait]
impl BrowserProvider for FakeBrowser {
    async fn open(&self) -> Result<Box<dyn PageDriver>, DriverError> {
        Ok(Box::new(self.page.clone()))
    }
}

/// Code service answering from a canned script.
pub struct FakeCodes {
    pub code: Mutex<Result<String, String>>,
}

impl FakeCodes {
    pub fn returning(code: &str) -> Self {
        Self {
            code: Mutex::new(Ok(code.to_string())),
        }
    }

    pub fn timing_out() -> Self {
        Self {
            code: Mutex::new(Err("mailbox stayed empty".to_string())),
        }
    }
}

#[async_trait]
impl VerificationCodeService for FakeCodes {
    async fn retrieve_code(
        &self,
        _mailbox: &str,
        _max_wait: Duration,
        _monitor_start: Option<DateTime<Utc>>,
    ) -> Result<String, MailboxError> {
        match &*self.code.lock().unwrap() {
            Ok(code) => Ok(code.clone()),
            Err(last) => Err(MailboxError::VerificationTimeout {
                attempts: 3,
                last: last.clone(),
            }),
        }
    }

    fn stop_monitoring(&self, _mailbox: &str) {}

    fn stop_all(&self) {}
}

/// Provisioner returning a fixed address, standing in for the mailbox API.
pub struct FakeProvisioner {
    pub address: String,
}

#[async_trait]
impl MailboxProvisioner for FakeProvisioner {
    async fn create_address(&self) -> Result<String, MailboxError> {
        Ok(self.address.clone())
    }
}
