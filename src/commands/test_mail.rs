use std::sync::Arc;

use anyhow::{bail, Context, Result};

use accountmint_core::config::AppConfig;
use accountmint_mailbox::{HttpMailboxApi, MailApiService};

/// Check mailbox API connectivity by acquiring a token with the configured
/// admin credentials.
pub async fn run(config: AppConfig) -> Result<()> {
    let Some(mail_config) = config.mail_api else {
        bail!("[mail_api] is not configured");
    };

    let api = Arc::new(HttpMailboxApi::new(mail_config.clone()).context("mailbox api client")?);
    let service = MailApiService::new(
        api,
        config.verification,
        mail_config.email_domain.clone(),
    );

    match service.test_connection().await {
        Ok(()) => {
            println!("Mailbox API: connected ({})", mail_config.server_url);
            Ok(())
        }
        Err(e) => {
            println!("Mailbox API: ERROR - {}", e);
            Ok(())
        }
    }
}
