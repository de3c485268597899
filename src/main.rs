use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand, ValueEnum};
use quick_mailer_core::worker::{check_domain_in_background, send_in_background};
use quick_mailer_core::{
    ConfigManager, DomainValidator, MissingMxPolicy, OutgoingMessage, SettingsStore,
    SmtpDispatcher, VaultBackend,
};
use secrecy::SecretString;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Settings file (non-secret fields only).
    #[arg(long, env = "QUICK_MAILER_SETTINGS")]
    settings: Option<PathBuf>,

    /// Where the app password is kept.
    #[arg(long, value_enum, default_value_t = VaultKind::Os, env = "QUICK_MAILER_VAULT")]
    vault: VaultKind,

    /// Vault file for `--vault encrypted-file`.
    #[arg(long, env = "QUICK_MAILER_VAULT_FILE")]
    vault_file: Option<PathBuf>,

    /// Passphrase for `--vault encrypted-file`.
    #[arg(long, env = "QUICK_MAILER_VAULT_PASSPHRASE", hide_env_values = true)]
    vault_passphrase: Option<String>,

    /// Accept a recipient domain without MX if it has an A record.
    #[arg(long)]
    a_record_fallback: bool,

    /// Enable debug logging (RUST_LOG takes precedence).
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum VaultKind {
    Os,
    EncryptedFile,
    Memory,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the stored account settings.
    Show,
    /// Store the account settings and app password.
    Configure(ConfigureArgs),
    /// Check whether an address's domain looks able to receive mail.
    CheckDomain { address: String },
    /// Send one plain-text message.
    Send(SendArgs),
}

#[derive(Args, Debug)]
struct ConfigureArgs {
    #[arg(long)]
    email: String,
    /// Must be supplied on every save; it is never read back for display.
    #[arg(long, env = "QUICK_MAILER_APP_PASSWORD", hide_env_values = true)]
    app_password: String,
    /// Defaults to the currently stored server.
    #[arg(long)]
    server: Option<String>,
    /// Defaults to the currently stored port.
    #[arg(long)]
    port: Option<u16>,
    /// Defaults to the currently stored flag.
    #[arg(long)]
    check_domain: Option<bool>,
}

#[derive(Args, Debug)]
struct SendArgs {
    #[arg(long)]
    to: String,
    #[arg(long)]
    subject: String,
    #[arg(long, conflicts_with = "body_file", required_unless_present = "body_file")]
    body: Option<String>,
    #[arg(long)]
    body_file: Option<PathBuf>,
    /// Send even if the recipient domain check fails.
    #[arg(long)]
    skip_domain_check: bool,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "quick_mailer_core={0},quick_mailer={0},config={0},vault={0},domain_check={0},smtp_dispatch={0}",
            default_level
        ))
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .init();
}

fn default_vault_file() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("quick-mailer"))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vault.json")
}

fn vault_backend(cli: &Cli) -> anyhow::Result<VaultBackend> {
    Ok(match cli.vault {
        VaultKind::Os => VaultBackend::Os,
        VaultKind::Memory => VaultBackend::Memory,
        VaultKind::EncryptedFile => {
            let Some(ref passphrase) = cli.vault_passphrase else {
                bail!("--vault encrypted-file needs --vault-passphrase or QUICK_MAILER_VAULT_PASSPHRASE");
            };
            VaultBackend::EncryptedFile {
                path: cli.vault_file.clone().unwrap_or_else(default_vault_file),
                passphrase: SecretString::new(passphrase.clone()),
            }
        }
    })
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let missing_mx = if cli.a_record_fallback {
        MissingMxPolicy::FallBackToA
    } else {
        MissingMxPolicy::Reject
    };
    // Built and dropped outside the async runtime: the blocking resolver owns
    // a runtime of its own.
    let validator = Arc::new(DomainValidator::system(missing_mx));
    let settings = SettingsStore::new(
        cli.settings
            .clone()
            .unwrap_or_else(SettingsStore::default_path),
    );
    let mut manager = ConfigManager::new(
        settings,
        vault_backend(&cli)?.open(),
        validator.is_available(),
    );

    manager.load().context("Could not load configuration")?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Could not start runtime")?;
    runtime.block_on(run(cli.command, &mut manager, validator.clone()))
}

async fn run(
    command: Command,
    manager: &mut ConfigManager,
    validator: Arc<DomainValidator>,
) -> anyhow::Result<()> {
    match command {
        Command::Show => {
            let config = manager.config();
            println!("settings file:          {}", manager.settings_path().display());
            println!("state:                  {}", manager.state());
            println!("email:                  {}", config.email);
            println!("smtp server:            {}:{}", config.smtp_server, config.smtp_port);
            println!("check recipient domain: {}", config.check_recipient_domain);
            println!("dns available:          {}", validator.is_available());
        }
        Command::Configure(args) => {
            let current = manager.config().clone();
            manager
                .save(
                    &args.email,
                    SecretString::new(args.app_password),
                    args.server.as_deref().unwrap_or(&current.smtp_server),
                    args.port.unwrap_or(current.smtp_port),
                    args.check_domain.unwrap_or(current.check_recipient_domain),
                )
                .context("Could not save configuration")?;
            println!("Configuration saved for {}", manager.config().email);
        }
        Command::CheckDomain { address } => {
            if !validator.is_available() {
                println!("DNS resolution unavailable; check skipped");
            }
            if check_domain_in_background(validator.clone(), address.clone()).await {
                println!("{}: domain looks valid", address);
            } else {
                bail!("{}: domain check failed", address);
            }
        }
        Command::Send(args) => {
            let body = match (args.body, args.body_file) {
                (Some(body), _) => body,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("Could not read {}", path.display()))?,
                (None, None) => bail!("A message body is required"),
            };

            let config = manager.config().clone();
            if config.check_recipient_domain
                && !args.skip_domain_check
                && !check_domain_in_background(validator.clone(), args.to.clone()).await
            {
                bail!(
                    "Recipient domain for '{}' failed the DNS check; use --skip-domain-check to send anyway",
                    args.to
                );
            }

            let dispatcher = Arc::new(SmtpDispatcher::default());
            let receipt = send_in_background(
                dispatcher,
                config,
                OutgoingMessage::new(args.to, args.subject, body),
            )
            .await
            .context("Could not send email")?;
            println!("Email {}", receipt);
        }
    }

    Ok(())
}
