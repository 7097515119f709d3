//! # Document Stores
//!
//! Format-specific load/serialize wrappers around the tree engine. JSON is
//! the native model; YAML is normalized to the same value model on load,
//! handled by the JSON store, and written back as YAML.
//!
//! Numbers are parsed with full f64 round-trip precision.

use crate::envelope::{Opener, Sealer};
use crate::error::{KeycloakError, Result};
use crate::keys::create_private;
use crate::mac::MacLabel;
use crate::path::{resolve, resolve_mut};
use crate::tree;

use serde_json::{Map, Value};
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
}

impl Format {
    /// Pick the format from a file extension: `.json`, `.yaml` or `.yml`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let extension = path
            .as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();
        extension.parse()
    }
}

impl FromStr for Format {
    type Err = KeycloakError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Format::Json),
            "yaml" | "yml" => Ok(Format::Yaml),
            other => Err(KeycloakError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Json => f.write_str("json"),
            Format::Yaml => f.write_str("yaml"),
        }
    }
}

/// Uniform operations over an encrypted document, whatever its format.
pub trait Store {
    /// Encrypt the subtree at `path` for `recipient`.
    fn encrypt_subtree(&mut self, recipient: &str, path: &[&str]) -> Result<()>;

    /// Decrypt the subtree at `path` with `identity`.
    fn decrypt_subtree(&mut self, identity: &str, path: &[&str]) -> Result<()>;

    /// Copy of the object at `path`.
    fn subtree(&self, path: &[&str]) -> Result<Map<String, Value>>;

    /// Serialize the whole document.
    fn to_bytes(&self) -> Result<Vec<u8>>;

    /// Label used for the integrity MAC of subsequent operations.
    fn set_mac_label(&mut self, label: MacLabel);

    /// Write the document to `path`, readable by the owner only. The
    /// permissions are set before any bytes are written.
    fn write_to(&self, path: &Path) -> Result<()> {
        let bytes = self.to_bytes()?;
        let mut file = create_private(path)?;
        file.write_all(&bytes)?;
        Ok(())
    }
}

/// Parse JSON bytes into the document model.
pub fn parse(bytes: &[u8]) -> Result<Value> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Serialize the document model as pretty-printed JSON.
pub fn serialize(value: &Value) -> Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec_pretty(value)?;
    bytes.push(b'\n');
    Ok(bytes)
}

pub struct JsonStore {
    root: Value,
    mac_label: MacLabel,
}

impl JsonStore {
    pub fn new(root: Value) -> Self {
        Self {
            root,
            mac_label: MacLabel::default(),
        }
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        parse(bytes).map(Self::new)
    }

    pub fn root(&self) -> &Value {
        &self.root
    }
}

impl Store for JsonStore {
    fn encrypt_subtree(&mut self, recipient: &str, path: &[&str]) -> Result<()> {
        let sealer = Sealer::for_recipient(recipient)?;
        let subtree = resolve_mut(&mut self.root, path)?;
        tree::encrypt_subtree_with_label(subtree, &sealer, &self.mac_label)?;
        debug!(path = %path.join("."), "subtree encrypted");
        Ok(())
    }

    fn decrypt_subtree(&mut self, identity: &str, path: &[&str]) -> Result<()> {
        let opener = Opener::from_identity(identity)?;
        let subtree = resolve_mut(&mut self.root, path)?;
        tree::decrypt_subtree_with_label(subtree, &opener, &self.mac_label)?;
        debug!(path = %path.join("."), "subtree decrypted");
        Ok(())
    }

    fn subtree(&self, path: &[&str]) -> Result<Map<String, Value>> {
        resolve(&self.root, path)?
            .as_object()
            .cloned()
            .ok_or_else(|| KeycloakError::InvalidSubtree("subtree root must be an object".into()))
    }

    fn to_bytes(&self) -> Result<Vec<u8>> {
        serialize(&self.root)
    }

    fn set_mac_label(&mut self, label: MacLabel) {
        self.mac_label = label;
    }
}

/// YAML pass-through: all behaviour is the JSON store's.
pub struct YamlStore {
    inner: JsonStore,
}

impl YamlStore {
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let root: Value = serde_yaml::from_slice(bytes)?;
        Ok(Self {
            inner: JsonStore::new(root),
        })
    }

    pub fn root(&self) -> &Value {
        self.inner.root()
    }
}

impl Store for YamlStore {
    fn encrypt_subtree(&mut self, recipient: &str, path: &[&str]) -> Result<()> {
        self.inner.encrypt_subtree(recipient, path)
    }

    fn decrypt_subtree(&mut self, identity: &str, path: &[&str]) -> Result<()> {
        self.inner.decrypt_subtree(identity, path)
    }

    fn subtree(&self, path: &[&str]) -> Result<Map<String, Value>> {
        self.inner.subtree(path)
    }

    fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_yaml::to_string(self.inner.root())?.into_bytes())
    }

    fn set_mac_label(&mut self, label: MacLabel) {
        self.inner.set_mac_label(label);
    }
}

/// Parse `bytes` as a document of the given format.
pub fn load(bytes: &[u8], format: Format) -> Result<Box<dyn Store>> {
    Ok(match format {
        Format::Json => Box::new(JsonStore::from_slice(bytes)?),
        Format::Yaml => Box::new(YamlStore::from_slice(bytes)?),
    })
}

/// Open a document, choosing the format from its extension.
pub fn open_store(path: impl AsRef<Path>) -> Result<Box<dyn Store>> {
    let format = Format::from_path(path.as_ref())?;
    open_store_with_format(path, format)
}

pub fn open_store_with_format(path: impl AsRef<Path>, format: Format) -> Result<Box<dyn Store>> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    debug!(path = %path.display(), %format, "opened document");
    load(&bytes, format)
}
