use anyhow::Result;

use accountmint_core::config::AppConfig;
use accountmint_store::CredentialStore;

/// Print the stored credential list.
pub async fn run(config: AppConfig) -> Result<()> {
    let store = CredentialStore::new(&config.store.accounts_file);
    let records = store.load().await?;

    if records.is_empty() {
        println!("No accounts stored yet ({}).", config.store.accounts_file);
        return Ok(());
    }

    println!("{} account(s) in {}:\n", records.len(), config.store.accounts_file);
    for record in &records {
        println!(
            "  {}  {} {}  created {}",
            record.email,
            record.first_name,
            record.last_name,
            record.created_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }

    Ok(())
}
