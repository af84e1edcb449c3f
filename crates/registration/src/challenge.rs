use std::time::Duration;

use tracing::{debug, info, warn};

use accountmint_browser::{DriverError, Locator, PageDriver};

/// The anti-automation widget renders inside this iframe while a check is in
/// progress.
pub const CHALLENGE_FRAME: &str = r#"iframe[src*="challenges.cloudflare.com"]"#;

/// Markers the page exposes once the check has passed.
pub const SUCCESS_MARKERS: &str =
    r#"input[type="checkbox"][aria-checked="true"], .cf-turnstile.success"#;

const CONTINUE_LABELS: [&str; 3] = ["Continue", "Next", "继续"];

/// Polls a page until the anti-automation challenge clears. Never fails: on
/// exhaustion the caller proceeds optimistically with `false`.
pub struct ChallengeWaiter {
    max_attempts: usize,
    poll_interval: Duration,
}

impl Default for ChallengeWaiter {
    fn default() -> Self {
        Self {
            max_attempts: 60,
            poll_interval: Duration::from_secs(1),
        }
    }
}

impl ChallengeWaiter {
    pub fn new(max_attempts: usize, poll_interval: Duration) -> Self {
        Self {
            max_attempts,
            poll_interval,
        }
    }

    /// Ready as soon as the continue control is usable after the challenge
    /// frame is confirmed absent, or a success marker shows up at any point.
    /// A frame that disappears and reappears is a re-challenge; tolerated,
    /// not treated as failure.
    pub async fn await_ready(&self, page: &dyn PageDriver) -> bool {
        let frame = Locator::css(CHALLENGE_FRAME);
        let continue_control = Locator::text(CONTINUE_LABELS);
        let success = Locator::css(SUCCESS_MARKERS);

        let mut last_present: Option<bool> = None;
        let mut disappearances = 0u32;

        for attempt in 0..self.max_attempts {
            match self
                .poll(page, &frame, &continue_control, &success, &mut last_present, &mut disappearances)
                .await
            {
                Ok(true) => return true,
                Ok(false) => {}
                // A flaky poll is just another tick; keep waiting.
                Err(error) => debug!(%error, "challenge poll failed, continuing"),
            }

            if attempt > 0 && attempt % 5 == 0 {
                info!(
                    attempt,
                    max_attempts = self.max_attempts,
                    "still waiting for challenge"
                );
            }
            tokio::time::sleep(self.poll_interval).await;
        }

        warn!(
            max_attempts = self.max_attempts,
            "challenge never signalled ready, proceeding optimistically"
        );
        false
    }

    async fn poll(
        &self,
        page: &dyn PageDriver,
        frame: &Locator,
        continue_control: &Locator,
        success: &Locator,
        last_present: &mut Option<bool>,
        disappearances: &mut u32,
    ) -> Result<bool, DriverError> {
        let present = page.exists(frame).await?;
        match (*last_present, present) {
            (Some(true), false) => {
                *disappearances += 1;
                info!(count = *disappearances, "challenge frame disappeared");
            }
            (Some(false), true) => {
                info!("challenge frame reappeared, likely re-challenge");
            }
            _ => {}
        }
        *last_present = Some(present);

        if !present && page.clickable(continue_control).await? {
            info!("continue control ready, challenge cleared");
            return Ok(true);
        }

        if page.exists(success).await? {
            info!("challenge success marker present");
            return Ok(true);
        }

        Ok(false)
    }
}
