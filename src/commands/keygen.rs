use anyhow::{bail, Context, Result};
use age::secrecy::ExposeSecret;
use keycloak::keys::{generate_identity, write_identity_file};
use std::path::Path;

/// Generate a new X25519 identity
pub fn keygen(output: Option<&Path>, force: bool) -> Result<()> {
    let generated = generate_identity();

    match output {
        Some(path) => {
            if path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
            write_identity_file(path, &generated)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Identity written to {}", path.display());
            println!("Public key: {}", generated.recipient);
        }
        None => {
            println!("# public key: {}", generated.recipient);
            println!("{}", generated.identity.expose_secret());
        }
    }

    Ok(())
}
