use super::encrypt::display_path;
use super::{write_document, DocumentArgs, KeyArgs};
use age::secrecy::ExposeSecret;
use anyhow::{Context, Result};
use keycloak::settings::Settings;
use keycloak::store::Store;
use std::io::{self, Write};
use std::path::Path;

/// Decrypt a subtree and write the document back (or to stdout)
pub fn decrypt(
    document: &DocumentArgs,
    key: &KeyArgs,
    output: Option<&Path>,
    to_stdout: bool,
    settings: &Settings,
) -> Result<()> {
    let path = document.path(settings);
    let store = decrypted_store(document, key, &path, settings)?;

    if to_stdout {
        io::stdout().write_all(&store.to_bytes()?)?;
        return Ok(());
    }

    let output = output.unwrap_or(document.file.as_path());
    write_document(store.as_ref(), output)?;

    println!(
        "Decrypted '{}' in {}",
        display_path(&path),
        output.display()
    );
    Ok(())
}

/// Print a decrypted subtree as JSON without touching the file
pub fn show(document: &DocumentArgs, key: &KeyArgs, settings: &Settings) -> Result<()> {
    let path = document.path(settings);
    let store = decrypted_store(document, key, &path, settings)?;

    let subtree = store.subtree(&path)?;
    println!("{}", serde_json::to_string_pretty(&subtree)?);
    Ok(())
}

fn decrypted_store(
    document: &DocumentArgs,
    key: &KeyArgs,
    path: &[&str],
    settings: &Settings,
) -> Result<Box<dyn Store>> {
    let identity = key
        .source(settings)
        .load()
        .context("failed to load private key")?;
    let mut store = document.open(settings)?;

    store
        .decrypt_subtree(identity.expose_secret(), path)
        .with_context(|| format!("failed to decrypt subtree '{}'", display_path(path)))?;
    Ok(store)
}
