use super::{write_document, DocumentArgs};
use anyhow::{Context, Result};
use keycloak::settings::Settings;
use keycloak::store::Store;
use std::path::Path;

/// Encrypt a subtree for a recipient and write the document back
pub fn encrypt(
    document: &DocumentArgs,
    recipient: &str,
    output: Option<&Path>,
    settings: &Settings,
) -> Result<()> {
    let mut store = document.open(settings)?;
    let path = document.path(settings);

    store
        .encrypt_subtree(recipient, &path)
        .with_context(|| format!("failed to encrypt subtree '{}'", display_path(&path)))?;

    let output = output.unwrap_or(document.file.as_path());
    write_document(store.as_ref(), output)?;

    println!(
        "Encrypted '{}' in {}",
        display_path(&path),
        output.display()
    );
    Ok(())
}

pub(super) fn display_path(path: &[&str]) -> String {
    if path.is_empty() {
        "<root>".to_string()
    } else {
        path.join(".")
    }
}
