//! `vcalc-server`: serve vector-product requests over TCP.
//!
//! ```text
//! vcalc-server [OPTIONS]
//!
//! Options:
//!   -p, --port <PORT>          Listen port [default: 33333]
//!   -c, --credentials <PATH>   Credential database [default: vcalc.conf]
//!   -l, --log [<PATH>]         Also write logs to this file [default: vcalc.log]
//!   -s, --settings <PATH>      TOML settings file
//!       --print-config         Print the effective settings and exit
//! ```
//!
//! Settings are layered: built-in defaults, then the settings file, then
//! `VCALC_*` environment variables, then command-line flags.

use anyhow::{bail, Context};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use vcalc::config::DEFAULT_LOG_FILE;
use vcalc::protocol::events::TracingSink;
use vcalc::utils::logging::init_logging;
use vcalc::utils::metrics::Metrics;
use vcalc::{CredentialDb, Server, SessionContext, Settings};

/// Authenticated vector-product calculation server.
#[derive(Debug, Parser)]
#[command(name = "vcalc-server", version, about)]
struct Args {
    /// Listen port (1024-65535, or 0 for an ephemeral port)
    #[arg(short, long)]
    port: Option<u16>,

    /// Path to the `login:secret` credential database
    #[arg(short, long, value_name = "PATH")]
    credentials: Option<String>,

    /// Append logs to this file in addition to the console
    #[arg(short, long, value_name = "PATH", num_args = 0..=1, default_missing_value = DEFAULT_LOG_FILE)]
    log: Option<String>,

    /// TOML settings file
    #[arg(short, long, value_name = "PATH")]
    settings: Option<PathBuf>,

    /// Print the effective settings as TOML and exit
    #[arg(long)]
    print_config: bool,
}

impl Args {
    fn resolve(&self) -> anyhow::Result<Settings> {
        let mut settings = match &self.settings {
            Some(path) => Settings::from_file(path)
                .with_context(|| format!("loading settings from {}", path.display()))?,
            None => Settings::default(),
        };
        settings.apply_env();

        if let Some(port) = self.port {
            settings.server.set_port(port);
        }
        if let Some(path) = &self.credentials {
            settings.auth.credentials_path = path.clone();
        }
        if let Some(path) = &self.log {
            settings.logging.log_to_file = true;
            settings.logging.log_file_path = Some(path.clone());
        }

        Ok(settings)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let settings = args.resolve()?;

    if args.print_config {
        print!("{}", toml::to_string_pretty(&settings)?);
        return Ok(());
    }

    let problems = settings.validate();
    if !problems.is_empty() {
        bail!("invalid configuration:\n  - {}", problems.join("\n  - "));
    }

    init_logging(&settings.logging)?;
    info!(version = env!("CARGO_PKG_VERSION"), "vcalc-server starting");

    let store = CredentialDb::load(&settings.auth.credentials_path)
        .with_context(|| format!("loading credentials from {}", settings.auth.credentials_path))?;

    let metrics = Arc::new(Metrics::new());
    let sink = Arc::new((TracingSink, metrics.clone()));
    let ctx = SessionContext::new(
        Arc::new(store),
        sink,
        settings.auth.accepted_login.as_str(),
    );

    Server::bind(&settings.server.address, ctx)
        .await?
        .with_metrics(metrics)
        .run()
        .await?;

    info!("vcalc-server stopped");
    Ok(())
}
