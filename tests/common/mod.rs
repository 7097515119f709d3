use assert_cmd::{cargo::cargo_bin_cmd, Command};
use keycloak::keys::{generate_identity, write_identity_file, GeneratedIdentity};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A scratch directory with its own identity, isolated from the user's
/// real key file and environment.
pub struct Workspace {
    pub dir: TempDir,
    pub identity: GeneratedIdentity,
    pub key_path: PathBuf,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let identity = generate_identity();
        let key_path = dir.path().join("keys.txt");
        write_identity_file(&key_path, &identity).expect("failed to write key file");
        Self {
            dir,
            identity,
            key_path,
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn recipient(&self) -> &str {
        &self.identity.recipient
    }

    /// Write `contents` to `name` inside the workspace.
    #[allow(dead_code)]
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, contents).expect("failed to write file");
        path
    }

    #[allow(dead_code)]
    pub fn read(&self, name: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(name)).expect("failed to read file")
    }

    /// The keycloak binary, run inside the workspace with no ambient key
    /// or settings.
    #[allow(dead_code)]
    pub fn cmd(&self) -> Command {
        let mut cmd = cargo_bin_cmd!("keycloak");
        cmd.current_dir(self.path())
            .env("HOME", self.path())
            .env("XDG_CONFIG_HOME", self.path().join(".config"))
            .env_remove("AGE_KEY")
            .env_remove("RUST_LOG");
        for var in [
            "KEYCLOAK_KEY_FILE",
            "KEYCLOAK_KEY_ENV",
            "KEYCLOAK_PATH",
            "KEYCLOAK_MAC_LABEL",
            "KEYCLOAK_DELETE_KEY_AFTER_USE",
        ] {
            cmd.env_remove(var);
        }
        cmd
    }
}
