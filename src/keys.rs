//! # Key Management
//!
//! Locates the private key used to decrypt documents and generates new
//! X25519 identities.
//!
//! ## Lookup order
//!
//! 1. An explicit key file (flag or configuration)
//! 2. The default key file, `<config dir>/keycloak/keys.txt`
//! 3. An environment variable, `AGE_KEY` unless configured otherwise
//!
//! A key file that exists is authoritative: if it holds no usable key the
//! lookup fails rather than falling through to the environment.
//!
//! ## Key file format
//!
//! The first line starting with `AGE-SECRET-KEY-1` is the identity; comment
//! lines such as `# public key: age1...` are ignored. With the `ssh`
//! feature, a file that is an OpenSSH private key is used as a whole.
//!
//! ## Scrubbing
//!
//! [`KeySource::scrub_after_use`] deletes whichever key file was read and blanks
//! the environment variable once the key has been read. This is best effort
//! cleanup: copies in shell history, backups or swapped memory are the
//! caller's responsibility.

use crate::envelope::AGE_SECRET_KEY_PREFIX;
#[cfg(feature = "ssh")]
use crate::envelope::OPENSSH_PRIVATE_KEY_HEADER;
use crate::error::{KeycloakError, Result};

use age::secrecy::{ExposeSecret, SecretString};
use std::env;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable consulted when no key file is available.
pub const DEFAULT_KEY_ENV: &str = "AGE_KEY";

/// A freshly generated identity and its public recipient.
pub struct GeneratedIdentity {
    pub identity: SecretString,
    pub recipient: String,
}

/// Generate a new X25519 identity.
pub fn generate_identity() -> GeneratedIdentity {
    let identity = age::x25519::Identity::generate();
    GeneratedIdentity {
        recipient: identity.to_public().to_string(),
        identity: identity.to_string(),
    }
}

/// Write a generated identity in the usual age key file layout, readable by
/// the owner only.
pub fn write_identity_file(path: impl AsRef<Path>, generated: &GeneratedIdentity) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut file = create_private(path)?;
    writeln!(file, "# public key: {}", generated.recipient)?;
    writeln!(file, "{}", generated.identity.expose_secret())?;
    Ok(())
}

/// Create or truncate `path` with owner-only permissions in place before
/// anything is written to it.
pub(crate) fn create_private(path: &Path) -> Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let file = options.open(path)?;

    // mode() only applies to new files
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }

    Ok(file)
}

/// Extract the private key from the contents of a key file.
pub fn parse_key_file(contents: &str) -> Result<SecretString> {
    #[cfg(feature = "ssh")]
    if contents.trim_start().starts_with(OPENSSH_PRIVATE_KEY_HEADER) {
        return Ok(SecretString::new(contents.trim().into()));
    }

    contents
        .lines()
        .find(|line| line.starts_with(AGE_SECRET_KEY_PREFIX))
        .map(|line| SecretString::new(line.trim().into()))
        .ok_or_else(|| KeycloakError::KeyNotFound("did not find a suitable private key".into()))
}

/// Where to look for the private key, and what to clean up afterwards.
#[derive(Debug, Clone)]
pub struct KeySource {
    key_file: Option<PathBuf>,
    default_file: Option<PathBuf>,
    env_var: String,
    scrub: bool,
}

impl Default for KeySource {
    fn default() -> Self {
        Self {
            key_file: None,
            default_file: Self::default_key_path(),
            env_var: DEFAULT_KEY_ENV.to_string(),
            scrub: false,
        }
    }
}

impl KeySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// `<config dir>/keycloak/keys.txt`, if the platform has a config dir.
    pub fn default_key_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("keycloak").join("keys.txt"))
    }

    pub fn with_key_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.key_file = Some(path.into());
        self
    }

    pub fn with_default_file(mut self, path: Option<PathBuf>) -> Self {
        self.default_file = path;
        self
    }

    pub fn with_env_var(mut self, name: impl Into<String>) -> Self {
        self.env_var = name.into();
        self
    }

    pub fn scrub_after_use(mut self, scrub: bool) -> Self {
        self.scrub = scrub;
        self
    }

    /// Find the private key. When scrubbing is enabled the key file that
    /// was read (if any) is deleted and the environment variable cleared,
    /// whether or not the lookup succeeded.
    pub fn load(&self) -> Result<SecretString> {
        let (key, consulted) = self.lookup();
        if self.scrub {
            self.scrub(consulted);
        }
        key
    }

    /// The key, plus the file it came from when one was read.
    fn lookup(&self) -> (Result<SecretString>, Option<&Path>) {
        for path in self.key_file.iter().chain(self.default_file.iter()) {
            match fs::read_to_string(path) {
                Ok(contents) => {
                    debug!(path = %path.display(), "reading private key from file");
                    return (parse_key_file(&contents), Some(path.as_path()));
                }
                Err(err) => {
                    debug!(path = %path.display(), error = %err, "key file not readable");
                }
            }
        }

        let key = match env::var(&self.env_var) {
            Ok(value) if !value.trim().is_empty() => {
                debug!(var = %self.env_var, "reading private key from environment");
                Ok(SecretString::new(value.trim().into()))
            }
            _ => Err(KeycloakError::KeyNotFound("cannot find age key".into())),
        };
        (key, None)
    }

    fn scrub(&self, consulted: Option<&Path>) {
        if let Some(path) = consulted {
            match fs::remove_file(path) {
                Ok(()) => debug!(path = %path.display(), "deleted private key file"),
                Err(err) => warn!(path = %path.display(), error = %err, "could not delete private key file"),
            }
        }
        env::set_var(&self.env_var, "");
    }
}
