//! API key management commands

use crate::terminal;
use anyhow::{Context, Result};
use colored::Colorize;
use dialoguer::Password;
use multihol_core::security::{
    API_KEY_ENV, Credential, CredentialStore, SERVICE, SecureString, create_credential_store,
    resolve_api_key,
};
use std::io::BufRead;

async fn open_store() -> Result<Box<dyn CredentialStore>> {
    create_credential_store()
        .await
        .context("Failed to open credential store")
}

/// Store an API key for `account`.
///
/// The key is prompted for without echo; without a terminal it is read as
/// the first line of stdin.
pub async fn set_key(account: &str) -> Result<()> {
    let key = if terminal::can_prompt() {
        Password::new()
            .with_prompt(format!("API key for {account}"))
            .interact()
            .context("Failed to read API key")?
    } else {
        let mut line = String::new();
        std::io::stdin()
            .lock()
            .read_line(&mut line)
            .context("Failed to read API key from stdin")?;
        line
    };

    let key = SecureString::new(key).trimmed();
    if key.is_empty() {
        anyhow::bail!("API key must not be empty");
    }

    open_store()
        .await?
        .store(&Credential::new(SERVICE, account, key))
        .await
        .context("Failed to store API key")?;

    eprintln!("{}", format!("✓ API key stored for {account}").green());
    Ok(())
}

/// Remove the API key of `account`
pub async fn remove(account: &str) -> Result<()> {
    let store = open_store().await?;

    if !store
        .exists(SERVICE, account)
        .await
        .context("Failed to query credential store")?
    {
        eprintln!("No API key stored for {account}.");
        return Ok(());
    }

    store
        .delete(SERVICE, account)
        .await
        .context("Failed to delete API key")?;
    eprintln!("{}", format!("✓ Removed API key for {account}").green());
    Ok(())
}

/// Show stored accounts and which key a run would use
pub async fn status(account: &str) -> Result<()> {
    let store = open_store().await?;
    let accounts = store
        .list_accounts(SERVICE)
        .await
        .context("Failed to list accounts")?;

    if accounts.is_empty() {
        println!("No stored API keys.");
    } else {
        println!("Stored API keys ({}):", store.name());
        for stored in &accounts {
            let marker = if stored == account { " (active)" } else { "" };
            println!("  • {stored}{marker}");
        }
    }

    if std::env::var(API_KEY_ENV).is_ok_and(|v| !v.trim().is_empty()) {
        println!("{} is set and overrides the stored key.", API_KEY_ENV.yellow());
    } else if resolve_api_key(store.as_ref(), account).await.is_err() {
        println!(
            "{}",
            format!("No usable key for {account}. Use 'multihol auth set-key'.").yellow()
        );
    }

    Ok(())
}

/// Resolve the key a migration runs with
pub async fn api_key(account: &str) -> Result<SecureString> {
    let store = open_store().await?;
    resolve_api_key(store.as_ref(), account).await.with_context(|| {
        format!("No API key for {account}. Run 'multihol auth set-key' or set {API_KEY_ENV}.")
    })
}
