mod commands;

use clap::{Args, Parser, Subcommand};
use commands::{DocumentArgs, KeyArgs};
use keycloak::settings::{load_settings, Settings};
use keycloak::store::Format;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "keycloak")]
#[command(version)]
#[command(about = "Keep secrets in git: encrypt selected subtrees of JSON and YAML files", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct DocumentOpts {
    /// The secrets file to read
    #[arg(short, long)]
    file: PathBuf,

    /// Dotted path to the subtree (defaults to the configured path, "secrets")
    #[arg(short = 'p', long)]
    json_path: Option<String>,

    /// Document format (defaults to the file extension)
    #[arg(long)]
    format: Option<Format>,
}

impl From<DocumentOpts> for DocumentArgs {
    fn from(opts: DocumentOpts) -> Self {
        Self {
            file: opts.file,
            json_path: opts.json_path,
            format: opts.format,
        }
    }
}

#[derive(Args)]
struct KeyOpts {
    /// The private key file to read
    #[arg(short, long)]
    key: Option<PathBuf>,

    /// Delete the private key file and clear the key variable after use
    #[arg(short, long)]
    delete_private_key_after_use: bool,
}

impl From<KeyOpts> for KeyArgs {
    fn from(opts: KeyOpts) -> Self {
        Self {
            key: opts.key,
            delete_private_key_after_use: opts.delete_private_key_after_use,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt a subtree for a recipient
    Encrypt {
        #[command(flatten)]
        document: DocumentOpts,

        /// Recipient public key (age1... or an SSH public key)
        #[arg(short, long)]
        recipient: String,

        /// Write to this file instead of overwriting the input
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Decrypt a subtree in place
    Decrypt {
        #[command(flatten)]
        document: DocumentOpts,

        #[command(flatten)]
        key: KeyOpts,

        /// Write to this file instead of overwriting the input
        #[arg(short, long, conflicts_with = "stdout")]
        output: Option<PathBuf>,

        /// Print the decrypted document instead of writing it
        #[arg(long)]
        stdout: bool,
    },

    /// Print a decrypted subtree without modifying the file
    Show {
        #[command(flatten)]
        document: DocumentOpts,

        #[command(flatten)]
        key: KeyOpts,
    },

    /// Start a child process with secrets in the environment
    ExecEnv {
        #[command(flatten)]
        document: DocumentOpts,

        #[command(flatten)]
        key: KeyOpts,

        /// Command to run through /bin/sh -c
        #[arg(trailing_var_arg = true, required = true)]
        command: Vec<String>,
    },

    /// Generate a new X25519 identity
    Keygen {
        /// Write the identity to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<u8> {
    let settings: Settings = load_settings(Path::new("."))?;

    match cli.command {
        Commands::Encrypt {
            document,
            recipient,
            output,
        } => commands::encrypt(&document.into(), &recipient, output.as_deref(), &settings)?,
        Commands::Decrypt {
            document,
            key,
            output,
            stdout,
        } => commands::decrypt(
            &document.into(),
            &key.into(),
            output.as_deref(),
            stdout,
            &settings,
        )?,
        Commands::Show { document, key } => {
            commands::show(&document.into(), &key.into(), &settings)?
        }
        Commands::ExecEnv {
            document,
            key,
            command,
        } => {
            let code = commands::exec_env(&document.into(), &key.into(), &command, &settings)?;
            return Ok(u8::try_from(code).unwrap_or(1));
        }
        Commands::Keygen { output, force } => commands::keygen(output.as_deref(), force)?,
    }

    Ok(0)
}
