use std::ffi::OsString;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use async_trait::async_trait;
use headless_chrome::{Browser, Tab};
use tracing::{debug, info};

use accountmint_core::config::BrowserConfig;

use crate::driver::{BrowserProvider, DriverError, PageDriver};
use crate::locator::Locator;

fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

/// JavaScript expression evaluating to the first element the locator matches,
/// or null.
fn find_expr(locator: &Locator) -> String {
    match locator {
        Locator::Css(css) => format!("document.querySelector({})", js_string(css)),
        Locator::Nth { css, index } => format!(
            "(document.querySelectorAll({})[{}] || null)",
            js_string(css),
            index
        ),
        Locator::Text { labels } => {
            let lowered: Vec<String> = labels.iter().map(|l| l.to_lowercase()).collect();
            let labels_json =
                serde_json::to_string(&lowered).unwrap_or_else(|_| "[]".to_string());
            format!(
                r#"(() => {{
                    const labels = {labels_json};
                    const nodes = Array.from(document.querySelectorAll(
                        'button, a[role="button"], div[role="button"], [type="submit"]'));
                    return nodes.find(el => {{
                        const text = (el.textContent || '').trim().toLowerCase();
                        return labels.some(l => text.includes(l));
                    }}) || null;
                }})()"#
            )
        }
    }
}

/// One headless Chrome tab driven entirely through `Runtime.evaluate`, the
/// one channel the signup flow is known to tolerate.
pub struct ChromePage {
    browser: StdMutex<Option<Browser>>,
    tab: Arc<Tab>,
}

impl ChromePage {
    fn eval_value(&self, script: &str) -> Result<Option<serde_json::Value>, DriverError> {
        let result = self
            .tab
            .evaluate(script, false)
            .map_err(|e| DriverError::Eval(e.to_string()))?;
        Ok(result.value)
    }
}

#[async_trait]
impl PageDriver for ChromePage {
    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        info!(url, "navigating");
        self.tab
            .navigate_to(url)
            .map_err(|e| DriverError::Browser(e.to_string()))?;
        self.tab
            .wait_until_navigated()
            .map_err(|e| DriverError::Browser(e.to_string()))?;
        // Let late scripts finish rendering the form.
        tokio::time::sleep(Duration::from_secs(2)).await;
        Ok(())
    }

    async fn wait_for(&self, locator: &Locator, timeout: Duration) -> Result<bool, DriverError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.exists(locator).await? {
                return Ok(true);
            }
            if tokio::time::Instant::now() >= deadline {
                debug!(locator = %locator.describe(), "wait_for timed out");
                return Ok(false);
            }
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
    }

    async fn exists(&self, locator: &Locator) -> Result<bool, DriverError> {
        let script = format!("(() => {{ return {} !== null; }})()", find_expr(locator));
        Ok(self
            .eval_value(&script)?
            .and_then(|v| v.as_bool())
            .unwrap_or(false))
    }

    async fn count(&self, css: &str) -> Result<usize, DriverError> {
        let script = format!("document.querySelectorAll({}).length", js_string(css));
        Ok(self
            .eval_value(&script)?
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as usize)
    }

    async fn clickable(&self, locator: &Locator) -> Result<bool, DriverError> {
        let script = format!(
            r#"(() => {{
                const el = {};
                if (!el) return false;
                const rect = el.getBoundingClientRect();
                const visible = rect.width > 0 && rect.height > 0;
                const disabled = el.disabled === true || el.getAttribute('disabled') !== null;
                return visible && !disabled;
            }})()"#,
            find_expr(locator)
        );
        Ok(self
            .eval_value(&script)?
            .and_then(|v| v.as_bool())
            .unwrap_or(false))
    }

    async fn click(&self, locator: &Locator) -> Result<bool, DriverError> {
        let script = format!(
            r#"(() => {{
                const el = {};
                if (!el) return false;
                const rect = el.getBoundingClientRect();
                const visible = rect.width > 0 && rect.height > 0;
                const disabled = el.disabled === true || el.getAttribute('disabled') !== null;
                if (!visible || disabled) return false;
                el.click();
                return true;
            }})()"#,
            find_expr(locator)
        );
        let clicked = self
            .eval_value(&script)?
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        if clicked {
            debug!(locator = %locator.describe(), "clicked");
        }
        Ok(clicked)
    }

    async fn type_text(
        &self,
        locator: &Locator,
        text: &str,
        clear_first: bool,
        per_char_delay: Duration,
    ) -> Result<bool, DriverError> {
        let found = find_expr(locator);

        let focus = format!(
            r#"(() => {{
                const el = {found};
                if (!el) return false;
                el.focus();
                {clear}
                return true;
            }})()"#,
            clear = if clear_first {
                "el.value = ''; el.dispatchEvent(new Event('input', { bubbles: true }));"
            } else {
                ""
            }
        );
        if !self
            .eval_value(&focus)?
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
        {
            return Ok(false);
        }

        for ch in text.chars() {
            let script = format!(
                r#"(() => {{
                    const el = {found};
                    if (!el) return false;
                    el.value = el.value + {ch};
                    el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                    return true;
                }})()"#,
                ch = js_string(&ch.to_string())
            );
            self.eval_value(&script)?;
            tokio::time::sleep(per_char_delay).await;
        }

        let change = format!(
            r#"(() => {{
                const el = {found};
                if (el) el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                return true;
            }})()"#
        );
        self.eval_value(&change)?;
        Ok(true)
    }

    async fn value(&self, locator: &Locator) -> Result<Option<String>, DriverError> {
        let script = format!(
            r#"(() => {{
                const el = {};
                return el ? String(el.value ?? '') : null;
            }})()"#,
            find_expr(locator)
        );
        Ok(self
            .eval_value(&script)?
            .and_then(|v| v.as_str().map(String::from)))
    }

    async fn checked(&self, locator: &Locator) -> Result<Option<bool>, DriverError> {
        let script = format!(
            r#"(() => {{
                const el = {};
                return el ? el.checked === true : null;
            }})()"#,
            find_expr(locator)
        );
        Ok(self.eval_value(&script)?.and_then(|v| v.as_bool()))
    }

    async fn eval_bool(&self, script: &str) -> Result<bool, DriverError> {
        Ok(self
            .eval_value(script)?
            .and_then(|v| v.as_bool())
            .unwrap_or(false))
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        self.eval_value("window.location.href")?
            .and_then(|v| v.as_str().map(String::from))
            .ok_or_else(|| DriverError::Eval("location.href unavailable".to_string()))
    }

    async fn close(&self) {
        if let Some(browser) = self.browser.lock().unwrap().take() {
            drop(browser);
            debug!("browser instance released");
        }
    }
}

/// Launches one fresh Chrome per session, so a wedged signup can never leak
/// state into the next attempt.
pub struct ChromeLauncher {
    config: BrowserConfig,
}

impl ChromeLauncher {
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl BrowserProvider for ChromeLauncher {
    async fn open(&self) -> Result<Box<dyn PageDriver>, DriverError> {
        let mut extra_args: Vec<OsString> = Vec::new();

        // Required for running in Docker containers
        extra_args.push(OsString::from("--no-sandbox"));
        extra_args.push(OsString::from("--disable-dev-shm-usage"));
        extra_args.push(OsString::from("--disable-gpu"));
        extra_args.push(OsString::from("--disable-blink-features=AutomationControlled"));

        let mut builder = headless_chrome::LaunchOptionsBuilder::default();
        builder
            .headless(self.config.headless)
            .window_size(Some((self.config.window_width, self.config.window_height)))
            .args(extra_args.iter().map(|a| a.as_ref()).collect());

        // Use CHROME_PATH env var if set (for Docker/custom installs)
        if let Ok(chrome_path) = std::env::var("CHROME_PATH") {
            builder.path(Some(std::path::PathBuf::from(chrome_path)));
        }

        let launch_options = builder
            .build()
            .map_err(|e| DriverError::Browser(e.to_string()))?;

        let browser = Browser::new(launch_options).map_err(|e| DriverError::Browser(e.to_string()))?;
        let tab = browser
            .new_tab()
            .map_err(|e| DriverError::Browser(e.to_string()))?;

        info!("browser launched");
        Ok(Box::new(ChromePage {
            browser: StdMutex::new(Some(browser)),
            tab,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn css_find_expr_escapes_quotes() {
        let expr = find_expr(&Locator::css(r#"input[name="email"]"#));
        assert_eq!(expr, r#"document.querySelector("input[name=\"email\"]")"#);
    }

    #[test]
    fn nth_find_expr_indexes_the_node_list() {
        let expr = find_expr(&Locator::nth("input[type=password]", 1));
        assert!(expr.contains("querySelectorAll(\"input[type=password]\")[1]"));
    }

    #[test]
    fn text_find_expr_lowercases_labels() {
        let expr = find_expr(&Locator::text(["Continue", "Next"]));
        assert!(expr.contains(r#"["continue","next"]"#));
        assert!(expr.contains("a[role=\\\"button\\\"]") || expr.contains(r#"a[role="button"]"#));
    }
}
