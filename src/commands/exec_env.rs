use super::{DocumentArgs, KeyArgs};
use age::secrecy::ExposeSecret;
use anyhow::{Context, Result};
use keycloak::env::{prepare_command, secrets_to_env};
use keycloak::settings::Settings;
use keycloak::store::Store;
use tracing::debug;

/// Start a child process with the decrypted subtree in its environment.
///
/// A missing secrets file is not an error: the command runs with the
/// current environment only. Returns the child's exit code.
pub fn exec_env(
    document: &DocumentArgs,
    key: &KeyArgs,
    command: &[String],
    settings: &Settings,
) -> Result<i32> {
    let identity = key
        .source(settings)
        .load()
        .context("failed to load private key")?;

    let secrets = if document.file.exists() {
        let path = document.path(settings);
        let mut store = document.open(settings)?;
        store
            .decrypt_subtree(identity.expose_secret(), &path)
            .with_context(|| format!("failed to decrypt subtree '{}'", path.join(".")))?;
        secrets_to_env(&store.subtree(&path)?)?
    } else {
        debug!(file = %document.file.display(), "secrets file not found, running without secrets");
        Vec::new()
    };
    drop(identity);

    debug!(count = secrets.len(), "starting child process");
    let status = prepare_command(command, &secrets)
        .status()
        .with_context(|| format!("failed to run '{}'", command.join(" ")))?;

    Ok(status.code().unwrap_or(1))
}
