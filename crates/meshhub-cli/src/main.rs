//! meshhub - render service mesh applications from a catalog

use clap::{ArgAction, Args, Parser, Subcommand};
use meshhub_fetch::config::GITHUB_TOKEN_ENV;
use meshhub_fetch::{FetchConfig, Fetcher};
use meshhub_render::{HELM_BIN_ENV, ManifestRenderer, StaticDependencyValidator};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod display;
mod error;
mod exit_codes;
mod selection;

use error::{CliError, Result};
use selection::{CatalogArgs, SelectionArgs};

#[derive(Parser)]
#[command(name = "meshhub")]
#[command(version)]
#[command(about = "Render service mesh applications from a meshhub catalog", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    settings: Settings,

    /// More logging (-v info, -vv debug, -vvv trace); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

/// Retrieval settings shared by every command
#[derive(Args, Debug)]
struct Settings {
    /// GitHub API token for chart and overlay downloads
    #[arg(long, env = GITHUB_TOKEN_ENV, hide_env_values = true, global = true)]
    github_token: Option<String>,

    /// Helm executable used to render charts
    #[arg(long, env = HELM_BIN_ENV, default_value = "helm", global = true)]
    helm_bin: String,

    /// HTTP timeout in seconds
    #[arg(long, env = "MESHHUB_HTTP_TIMEOUT", default_value_t = 60, global = true)]
    http_timeout: u64,
}

impl Settings {
    fn fetcher(&self) -> Result<Fetcher> {
        let config = FetchConfig::default()
            .with_github_token(self.github_token.clone())
            .with_timeout(Duration::from_secs(self.http_timeout));
        Fetcher::new(config).map_err(|e| CliError::Other {
            message: e.to_string(),
        })
    }

    fn renderer(&self, fetcher: Fetcher) -> ManifestRenderer {
        ManifestRenderer::with_helm(fetcher, self.helm_bin.clone())
            .with_dependency_validator(Arc::new(StaticDependencyValidator))
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Render the manifest of an application install
    Render {
        #[command(flatten)]
        selection: SelectionArgs,

        /// Write the manifest to a file instead of stdout
        #[arg(short, long)]
        manifest_file: Option<PathBuf>,

        /// Save the resolved install spec for later `render -i`
        #[arg(long)]
        save_install_spec: Option<PathBuf>,
    },

    /// Check layer and parameter selections without rendering
    Validate {
        #[command(flatten)]
        selection: SelectionArgs,
    },

    /// List the applications of a catalog
    List {
        #[command(flatten)]
        catalog: CatalogArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

async fn run(cli: Cli, cancel: CancellationToken) -> Result<()> {
    let fetcher = cli.settings.fetcher()?;
    match cli.command {
        Commands::Render {
            selection,
            manifest_file,
            save_install_spec,
        } => {
            let renderer = cli.settings.renderer(fetcher.clone());
            commands::render::run(
                &renderer,
                &fetcher,
                &selection,
                manifest_file.as_deref(),
                save_install_spec.as_deref(),
                &cancel,
            )
            .await
        }
        Commands::Validate { selection } => {
            let renderer = cli.settings.renderer(fetcher.clone());
            commands::validate::run(&renderer, &fetcher, &selection, &cancel).await
        }
        Commands::List { catalog, json } => {
            commands::list::run(&catalog, &fetcher, json, &cancel).await
        }
    }
}

#[tokio::main]
async fn main() {
    miette::set_panic_hook();
    // Keep long messages (paths, chart URIs) on one line
    let _ = miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(false)
                .wrap_lines(false)
                .build(),
        )
    }));

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling");
            on_interrupt.cancel();
        }
    });

    if let Err(err) = run(cli, cancel).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}
