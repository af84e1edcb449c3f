use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::info;

use accountmint_browser::ChromeLauncher;
use accountmint_core::config::AppConfig;
use accountmint_core::{LogSink, Progress, ProgressSink};
use accountmint_mailbox::{
    HttpMailboxApi, MailApiService, MailboxProvisioner, VerificationCodeService,
};
use accountmint_registration::{
    BatchScheduler, IdentityGenerator, LiveSessionRunner, SessionConfig, SessionDeps,
};
use accountmint_store::CredentialStore;

/// Register `count` accounts under the configured concurrency cap.
pub async fn run(
    config: AppConfig,
    count: usize,
    concurrency: Option<usize>,
    visible: bool,
) -> Result<()> {
    if count == 0 {
        bail!("count must be at least 1");
    }

    let mut batch_config = config.batch.clone();
    if let Some(cap) = concurrency {
        batch_config.max_concurrent = cap.max(1);
    }
    let mut browser_config = config.browser.clone();
    if visible {
        browser_config.headless = false;
    }

    let Some(mail_config) = config.mail_api.clone() else {
        bail!("[mail_api] must be configured to retrieve verification codes");
    };

    let api = Arc::new(HttpMailboxApi::new(mail_config.clone()).context("mailbox api client")?);
    let service = Arc::new(MailApiService::new(
        api,
        config.verification.clone(),
        mail_config.email_domain.clone(),
    ));
    let codes: Arc<dyn VerificationCodeService> = service.clone();
    let provisioner: Option<Arc<dyn MailboxProvisioner>> = Some(service);

    let deps = SessionDeps {
        config: SessionConfig {
            signup_url: config.signup.url.clone(),
            type_delay: Duration::from_millis(config.signup.type_delay_ms),
            element_wait: Duration::from_secs(config.signup.element_wait_seconds),
            code_max_wait: Duration::from_secs(config.verification.max_wait_seconds),
        },
        browser: Arc::new(ChromeLauncher::new(browser_config)),
        codes,
        provisioner,
        identity: Arc::new(IdentityGenerator::new(config.identity.email_domains.clone())),
        store: Arc::new(CredentialStore::new(&config.store.accounts_file)),
    };

    let scheduler = BatchScheduler::new(Arc::new(LiveSessionRunner::new(deps)), batch_config);

    let on_progress: ProgressSink = Arc::new(|Progress { current, total }| {
        info!(current, total, "session completed");
    });
    let on_log: LogSink = Arc::new(|line| info!("{}", line));

    let report = scheduler.run(count, on_progress, on_log).await;

    println!("\n╔══════════════════════════════════════════════╗");
    println!("║         Batch Registration Summary           ║");
    println!("╠══════════════════════════════════════════════╣");
    println!("║ Requested:            {:>20}   ║", report.len());
    println!("║ Succeeded:            {:>20}   ║", report.successes());
    println!("║ Failed:               {:>20}   ║", report.failures());
    println!("╚══════════════════════════════════════════════╝\n");

    for (index, result) in report.results.iter().enumerate() {
        if let Some(record) = &result.record {
            println!("  ✓ {}", record.email);
        } else {
            println!(
                "  ✗ attempt {}: {}",
                index + 1,
                result.detail.as_deref().unwrap_or("unknown failure")
            );
        }
    }

    Ok(())
}
