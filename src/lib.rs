//! # keycloak
//!
//! Selective encryption of JSON and YAML documents, so a configuration tree
//! can live in version control while chosen subtrees stay unreadable without
//! a private key.
//!
//! ## Features
//!
//! - **Subtree Encryption**: Only the leaves under a chosen path are encrypted; the rest of the document stays plain
//! - **Hybrid Encryption**: A fresh AES-256-GCM key per leaf, wrapped for the recipient with age (X25519)
//! - **Tamper Detection**: One HMAC over every plaintext leaf, stored encrypted next to the subtree
//! - **Type Fidelity**: Strings stay strings, numbers keep their exact 64-bit float value
//! - **JSON and YAML**: YAML is normalized to the JSON model and written back as YAML
//! - **exec-env**: Decrypt a subtree straight into a child process environment
//!
//! ## Quick Start
//!
//! ```bash
//! # Generate a key pair
//! keycloak keygen -o ~/.config/keycloak/keys.txt
//! # Public key: age1...
//!
//! # Encrypt the `secrets` subtree
//! keycloak encrypt -f creds.yaml -r age1...
//!
//! # Run a program with the secrets in its environment
//! keycloak exec-env -f creds.yaml -- ./run-server.sh
//! ```
//!
//! ## How It Works
//!
//! Given a document such as
//!
//! ```text
//! { "name": "api", "secrets": { "dbPassword": "hunter2", "port": 5432 } }
//! ```
//!
//! encrypting the subtree at `secrets` replaces every leaf beneath it with a
//! base64 string and adds one reserved key, `__mac__`:
//!
//! ```text
//! { "name": "api",
//!   "secrets": { "__mac__": "...", "dbPassword": "AFlX...", "port": "AVF3..." } }
//! ```
//!
//! ### Data Flow
//!
//! **Encryption (per leaf):**
//! ```text
//! leaf → tag || payload → AES-256-GCM (fresh key) → key || sealed → age → tag || envelope → base64
//! ```
//!
//! **Integrity:**
//! ```text
//! HMAC-SHA-512/256(label, payload₁ || payload₂ || ...) → age → base64 → __mac__
//! ```
//!
//! Leaves are visited depth first with object keys in sorted order, so
//! independent runs always agree on the MAC.
//!
//! ## Module Overview
//!
//! - [`crypto`] - AES-256-GCM seal/open under one-shot keys
//! - [`envelope`] - Hybrid envelope bound to an age recipient or identity
//! - [`codec`] - Typed leaf encoding and encrypted-leaf framing
//! - [`mac`] - Integrity accumulator
//! - [`tree`] - Subtree encryption and decryption with MAC handling
//! - [`path`] - Path resolution inside a document
//! - [`store`] - JSON/YAML document stores
//! - [`keys`] - Private key lookup and identity generation
//! - [`env`] - Environment projection for `exec-env`
//! - [`settings`] - `.keycloak.toml` configuration
//! - [`error`] - Error types and unified error handling
//!
//! ## Commands
//!
//! - `encrypt -f FILE -r RECIPIENT [-p PATH]` - Encrypt a subtree
//! - `decrypt -f FILE [-k KEY] [-p PATH]` - Decrypt a subtree in place
//! - `show -f FILE [-k KEY] [-p PATH]` - Print a decrypted subtree without writing
//! - `exec-env -f FILE [-k KEY] [-p PATH] [-d] -- COMMAND` - Run a command with secrets in its environment
//! - `keygen [-o FILE]` - Generate an X25519 identity
//!
//! ## Security Considerations
//!
//! **Protected against:**
//! - Reading secrets from the repository without the private key
//! - Modifying, swapping, adding or removing encrypted leaves
//!
//! **Not protected against:**
//! - Leaking key names and document structure (only values are encrypted)
//! - Anyone holding the public key re-encrypting a subtree from scratch
//! - Copies of the private key outside the key file (history, swap)
//!
//! The MAC is keyed with a fixed label, not a secret. Its job is to bind the
//! leaves together; confidentiality comes from the envelope.
//!
//! ## Library Usage
//!
//! ```no_run
//! use keycloak::store::{open_store, Store};
//!
//! # fn main() -> keycloak::Result<()> {
//! let mut store = open_store("creds.json")?;
//! store.encrypt_subtree("age1...", &["secrets"])?;
//! store.write_to(std::path::Path::new("creds.json"))?;
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod crypto;
pub mod env;
pub mod envelope;
pub mod error;
pub mod keys;
pub mod mac;
pub mod path;
pub mod settings;
pub mod store;
pub mod tree;

// Re-export commonly used types
pub use envelope::{LeafDecryptor, LeafEncryptor, Opener, Sealer};
pub use error::{KeycloakError, Result};
pub use mac::MacLabel;
pub use store::{open_store, Format, Store};
