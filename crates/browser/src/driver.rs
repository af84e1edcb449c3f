use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::locator::Locator;

#[derive(Error, Debug)]
pub enum DriverError {
    #[error("browser error: {0}")]
    Browser(String),

    #[error("javascript evaluation failed: {0}")]
    Eval(String),
}

/// Browser control capability consumed by registration sessions. The
/// production implementation drives a headless Chrome tab; tests substitute
/// scripted fakes.
#[async_trait]
pub trait PageDriver: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<(), DriverError>;

    /// Poll until `locator` matches or `timeout` elapses; `false` on timeout.
    async fn wait_for(&self, locator: &Locator, timeout: Duration) -> Result<bool, DriverError>;

    async fn exists(&self, locator: &Locator) -> Result<bool, DriverError>;

    /// Number of elements matching a CSS selector.
    async fn count(&self, css: &str) -> Result<usize, DriverError>;

    /// Whether the first match is visible and enabled.
    async fn clickable(&self, locator: &Locator) -> Result<bool, DriverError>;

    /// Click the first visible, enabled match; `false` when nothing matched.
    async fn click(&self, locator: &Locator) -> Result<bool, DriverError>;

    /// Focus the first match and type with a per-character delay; `false`
    /// when nothing matched.
    async fn type_text(
        &self,
        locator: &Locator,
        text: &str,
        clear_first: bool,
        per_char_delay: Duration,
    ) -> Result<bool, DriverError>;

    /// Current value of the first matching input, `None` when nothing
    /// matched.
    async fn value(&self, locator: &Locator) -> Result<Option<String>, DriverError>;

    /// Checked state of the first matching checkbox, `None` when nothing
    /// matched.
    async fn checked(&self, locator: &Locator) -> Result<Option<bool>, DriverError>;

    /// Evaluate an arbitrary page-level boolean predicate.
    async fn eval_bool(&self, script: &str) -> Result<bool, DriverError>;

    async fn current_url(&self) -> Result<String, DriverError>;

    /// Release the underlying browser instance. Idempotent.
    async fn close(&self);
}

/// Forward the page capability through a shared handle so an `Arc`-wrapped
/// driver satisfies `PageDriver` itself. Every method delegates to the inner
/// value; no behavior is added.
#[async_trait]
impl<T: PageDriver + ?Sized> PageDriver for std::sync::Arc<T> {
    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        (**self).navigate(url).await
    }

    async fn wait_for(&self, locator: &Locator, timeout: Duration) -> Result<bool, DriverError> {
        (**self).wait_for(locator, timeout).await
    }

    async fn exists(&self, locator: &Locator) -> Result<bool, DriverError> {
        (**self).exists(locator).await
    }

    async fn count(&self, css: &str) -> Result<usize, DriverError> {
        (**self).count(css).await
    }

    async fn clickable(&self, locator: &Locator) -> Result<bool, DriverError> {
        (**self).clickable(locator).await
    }

    async fn click(&self, locator: &Locator) -> Result<bool, DriverError> {
        (**self).click(locator).await
    }

    async fn type_text(
        &self,
        locator: &Locator,
        text: &str,
        clear_first: bool,
        per_char_delay: Duration,
    ) -> Result<bool, DriverError> {
        (**self)
            .type_text(locator, text, clear_first, per_char_delay)
            .await
    }

    async fn value(&self, locator: &Locator) -> Result<Option<String>, DriverError> {
        (**self).value(locator).await
    }

    async fn checked(&self, locator: &Locator) -> Result<Option<bool>, DriverError> {
        (**self).checked(locator).await
    }

    async fn eval_bool(&self, script: &str) -> Result<bool, DriverError> {
        (**self).eval_bool(script).await
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        (**self).current_url().await
    }

    async fn close(&self) {
        (**self).close().await
    }
}

/// Factory for fresh browser instances, one per registration session.
#[async_trait]
pub trait BrowserProvider: Send + Sync {
    async fn open(&self) -> Result<Box<dyn PageDriver>, DriverError>;
}
