//! CLI entry point for `smsgate`.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};

use smsgate::api::{self, AppState};
use smsgate::auth::Credentials;
use smsgate::calls::{CallLog, EventTracker};
use smsgate::catalog::MessageCatalog;
use smsgate::config::{self, Config};
use smsgate::driver::{self, simulated::SimulatedModem};
use smsgate::error::GateError;
use smsgate::gate::ModemGate;
use smsgate::model::message::SmsRecord;
use smsgate::outbox::{Outbox, SendRequest};

#[derive(Parser)]
#[command(name = "smsgate", version, about = "HTTP gateway for a GSM modem")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// SIM PIN, entered when the SIM asks for one
    #[arg(long, env = "PIN", global = true, hide_env_values = true)]
    pin: Option<String>,

    /// Configuration file (defaults to $SMSGATE_CONFIG or the user config dir)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Listen port
    #[arg(long, env = "PORT", global = true)]
    port: Option<u16>,

    /// Listen address
    #[arg(long, global = true)]
    host: Option<String>,

    /// Serve HTTPS using the configured certificate and key
    #[arg(
        long,
        env = "SSL",
        global = true,
        action = clap::ArgAction::SetTrue,
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    ssl: bool,
}

impl Cli {
    /// Fold command-line and environment overrides into `config`.
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(pin) = &self.pin {
            config.modem.pin = Some(pin.clone());
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        config.server.tls |= self.ssl;
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API (the default)
    Serve,
    /// List stored messages
    List {
        #[arg(long)]
        json: bool,
    },
    /// Send a message to one or more comma-separated numbers
    Send {
        number: String,
        text: String,
        /// Service centre number (defaults to the one stored on the SIM)
        #[arg(long)]
        smsc: Option<String>,
    },
    /// Show the missed-call log
    Calls {
        /// Remove and print the oldest entry instead
        #[arg(long)]
        pop: bool,
    },
    /// Print the effective configuration as TOML
    Config {
        /// Save it to the config file location instead
        #[arg(long)]
        write: bool,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => config::load_config_from(path),
        None => config::load_config(),
    };
    let mut config = loaded.clone();
    cli.apply_overrides(&mut config);

    let log_level = match cli.verbose {
        0 => config.general.log_level.clone(),
        1 => "info".to_string(),
        2 => "debug".to_string(),
        _ => "trace".to_string(),
    };
    setup_logging(&log_level, &config);

    match cli.command {
        None | Some(Commands::Serve) => cmd_serve(config),
        Some(Commands::List { json }) => cmd_list(&config, json),
        Some(Commands::Send { number, text, smsc }) => cmd_send(&config, number, text, smsc),
        Some(Commands::Calls { pop }) => cmd_calls(&config, pop),
        Some(Commands::Config { write }) => cmd_config(&config, &loaded, write),
        Some(Commands::Completions { shell }) => cmd_completions(shell),
        Some(Commands::Manpage) => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_file = config::log_file_path(config);
    let log_dir = log_file.parent().map(PathBuf::from).unwrap_or_default();
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_name = log_file.file_name().unwrap_or_default();
        let file_appender = tracing_appender::rolling::never(&log_dir, file_name);
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Bring up the modem and wrap it in the gate.
///
/// Exits the process when the SIM needs a PIN that was not supplied.
fn open_modem(config: &Config) -> anyhow::Result<Arc<ModemGate>> {
    let mut modem = match &config.modem.seed_file {
        Some(path) => SimulatedModem::from_seed_file(path)?,
        None => SimulatedModem::new(),
    };
    match driver::unlock(&mut modem, config.modem.pin.as_deref()) {
        Ok(()) => {}
        Err(GateError::Security(msg)) => {
            tracing::error!(error = %msg, "Modem initialization failed");
            eprintln!("{msg}");
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    }
    tracing::debug!("Modem initialized");
    Ok(Arc::new(ModemGate::with_wait(
        modem,
        config.modem.gate_timeout(),
    )))
}

fn cmd_serve(config: Config) -> anyhow::Result<()> {
    let credentials = Credentials::load(&config.files.credentials)
        .context("Cannot start without a credentials file")?;
    let gate = open_modem(&config)?;

    let calls = Arc::new(CallLog::open(&config.files.missed_calls)?);
    EventTracker::new(Arc::clone(&calls)).register(&gate)?;

    let state = AppState::new(gate, config.modem.folder, credentials, calls);
    let app = api::router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}", config.server.host))?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run_server(addr, app, &config))
}

async fn run_server(addr: SocketAddr, app: axum::Router, config: &Config) -> anyhow::Result<()> {
    if config.server.tls {
        return serve_tls(addr, app, config).await;
    }
    tracing::info!(%addr, "Listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Cannot bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

#[cfg(feature = "tls")]
async fn serve_tls(addr: SocketAddr, app: axum::Router, config: &Config) -> anyhow::Result<()> {
    let tls = axum_server::tls_rustls::RustlsConfig::from_pem_file(
        &config.server.cert_path,
        &config.server.key_path,
    )
    .await
    .with_context(|| {
        format!(
            "Failed to load certificate {} / key {}",
            config.server.cert_path.display(),
            config.server.key_path.display()
        )
    })?;
    tracing::info!(%addr, "Listening (TLS)");
    axum_server::bind_rustls(addr, tls)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}

#[cfg(not(feature = "tls"))]
async fn serve_tls(_addr: SocketAddr, _app: axum::Router, _config: &Config) -> anyhow::Result<()> {
    anyhow::bail!("TLS requested but smsgate was built without the `tls` feature")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Cannot listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

/// Print the catalog as a table or JSON.
fn cmd_list(config: &Config, json: bool) -> anyhow::Result<()> {
    let gate = open_modem(config)?;
    let catalog = MessageCatalog::new(gate, config.modem.folder);
    let messages = catalog.list()?;

    if json {
        let records: Vec<SmsRecord> = messages.iter().map(SmsRecord::from).collect();
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    println!();
    println!("  {} message(s)", messages.len());
    println!();
    if messages.is_empty() {
        return Ok(());
    }
    println!(
        "  {:<4} {:<19} {:<18} {:<8} {}",
        "#", "Date", "Number", "State", "Text"
    );
    println!("  {}", "-".repeat(90));
    for (i, msg) in messages.iter().enumerate() {
        let text: String = msg.text.chars().take(40).collect();
        println!(
            "  {:<4} {:<19} {:<18} {:<8} {}",
            i,
            msg.date.format("%Y-%m-%d %H:%M:%S"),
            msg.number,
            msg.state.as_str(),
            text.replace('\n', " ")
        );
    }
    println!();
    Ok(())
}

fn cmd_send(
    config: &Config,
    number: String,
    text: String,
    smsc: Option<String>,
) -> anyhow::Result<()> {
    let gate = open_modem(config)?;
    let outcomes = Outbox::new(gate).send(&SendRequest {
        text: Some(text),
        number: Some(number),
        smsc,
    })?;
    for outcome in &outcomes {
        match (&outcome.reference, &outcome.error) {
            (Some(reference), _) => println!(
                "  {:<18} part {:<3} sent (ref {reference})",
                outcome.number, outcome.part
            ),
            (None, Some(error)) => println!(
                "  {:<18} part {:<3} FAILED: {error}",
                outcome.number, outcome.part
            ),
            (None, None) => {}
        }
    }
    if outcomes.iter().any(|o| !o.is_sent()) {
        anyhow::bail!("Some segments could not be sent");
    }
    Ok(())
}

fn cmd_calls(config: &Config, pop: bool) -> anyhow::Result<()> {
    let log = CallLog::open(&config.files.missed_calls)?;
    if pop {
        match log.pop_front()? {
            Some(call) => println!("{call}"),
            None => anyhow::bail!("No missed calls to remove"),
        }
        return Ok(());
    }
    for call in log.records() {
        println!("{call}");
    }
    Ok(())
}

/// Print the effective configuration, or save it.
///
/// A PIN given on the command line or in `PIN` is never written to disk;
/// the saved file keeps whatever PIN it was loaded with.
fn cmd_config(config: &Config, loaded: &Config, write: bool) -> anyhow::Result<()> {
    if write {
        let mut saved = config.clone();
        saved.modem.pin = loaded.modem.pin.clone();
        let path = config::save_config(&saved)?;
        println!("  Wrote {}", path.display());
    } else {
        print!("{}", toml::to_string_pretty(&config.redacted())?);
    }
    Ok(())
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "smsgate", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}
