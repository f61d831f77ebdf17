//! Nutra: pluggable test and build pipeline orchestrator.
//!
//! Command-line entry point: reads the configuration file named by
//! `--config`, then runs it through the orchestrator with the built-in
//! plugins.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

use nutra_core::config::logging::LoggingConfig;
use nutra_core::config::settings::Settings;
use nutra_core::config::{ConfigInput, FileConfigSource};
use nutra_plugin::Orchestrator;
use nutra_plugin::builtin::builtin_resolver;
use nutra_plugin::registry::PluginResolver;

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "nutra", version, about = "Pluggable test and build pipeline orchestrator")]
struct Cli {
    /// Path to the run configuration (`.json` or `.toml`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Directory searched for dynamic plugin libraries.
    #[cfg(feature = "dynamic")]
    #[arg(long, value_name = "DIR")]
    plugin_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match Settings::load() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to load settings: {e}");
            return ExitCode::FAILURE;
        }
    };
    init_logging(&settings.logging);

    let requested = cli.config.clone().unwrap_or_default();
    let source = match FileConfigSource::open(&requested) {
        Ok(source) => source,
        Err(e) => {
            eprintln!(
                "\nPlease provide a valid configuration file.\n\
                 Value received did not lead to a valid configuration: \"{}\"\n\
                 Did you pass a config parameter? --config \"path/to/nutra.config.json\"\n\
                 Actual error: {}\n",
                requested.display(),
                e.source
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| e.message.clone())
            );
            return ExitCode::FAILURE;
        }
    };

    let orchestrator = Orchestrator::new(resolver(&cli));
    match orchestrator.run(ConfigInput::producer(source)).await {
        Ok(summary) => {
            tracing::info!(
                files = summary.files,
                plugins = summary.plugins,
                "Nutra run complete"
            );
            ExitCode::SUCCESS
        }
        // already reported by the run's error policy
        Err(_) => ExitCode::FAILURE,
    }
}

/// Built-in plugins, backed by the plugin directory when one is given.
#[cfg(feature = "dynamic")]
fn resolver(cli: &Cli) -> Arc<dyn PluginResolver> {
    use nutra_plugin::loader::DynamicResolver;
    use nutra_plugin::registry::FallbackResolver;

    let builtins: Arc<dyn PluginResolver> = Arc::new(builtin_resolver());
    match &cli.plugin_dir {
        Some(dir) => Arc::new(FallbackResolver::new(
            builtins,
            Arc::new(DynamicResolver::new(dir)),
        )),
        None => builtins,
    }
}

/// Built-in plugins.
#[cfg(not(feature = "dynamic"))]
fn resolver(_cli: &Cli) -> Arc<dyn PluginResolver> {
    Arc::new(builtin_resolver())
}

/// Initialize tracing/logging
fn init_logging(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    match logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}
