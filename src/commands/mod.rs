pub mod decrypt;
pub mod encrypt;
pub mod exec_env;
pub mod keygen;

pub use decrypt::{decrypt, show};
pub use encrypt::encrypt;
pub use exec_env::exec_env;
pub use keygen::keygen;

use anyhow::{Context, Result};
use keycloak::keys::KeySource;
use keycloak::path::split_path;
use keycloak::settings::Settings;
use keycloak::store::{open_store_with_format, Format, Store};
use std::path::{Path, PathBuf};

/// Options shared by every command that reads a document.
pub struct DocumentArgs {
    pub file: PathBuf,
    pub json_path: Option<String>,
    pub format: Option<Format>,
}

impl DocumentArgs {
    pub fn open(&self, settings: &Settings) -> Result<Box<dyn Store>> {
        let format = match self.format {
            Some(format) => format,
            None => Format::from_path(&self.file)?,
        };
        let mut store = open_store_with_format(&self.file, format)
            .with_context(|| format!("failed to read {}", self.file.display()))?;
        store.set_mac_label(settings.mac_label());
        Ok(store)
    }

    /// Dotted subtree path: the flag if given, otherwise the configured one.
    pub fn path<'a>(&'a self, settings: &'a Settings) -> Vec<&'a str> {
        split_path(self.json_path.as_deref().unwrap_or(settings.path.as_str()))
    }
}

/// Options shared by every command that needs the private key.
pub struct KeyArgs {
    pub key: Option<PathBuf>,
    pub delete_private_key_after_use: bool,
}

impl KeyArgs {
    pub fn source(&self, settings: &Settings) -> KeySource {
        let mut source = KeySource::new()
            .with_env_var(settings.key_env.as_str())
            .scrub_after_use(self.delete_private_key_after_use || settings.delete_key_after_use);
        if let Some(key_file) = self.key.as_ref().or(settings.key_file.as_ref()) {
            source = source.with_key_file(key_file);
        }
        source
    }
}

fn write_document(store: &dyn Store, output: &Path) -> Result<()> {
    store
        .write_to(output)
        .with_context(|| format!("failed to write {}", output.display()))
}
