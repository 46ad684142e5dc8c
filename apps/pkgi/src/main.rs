//! pkgi - privileged package installer
//!
//! Command line front end for the install orchestrator: it wires the host
//! collaborators, drives one request to a terminal stage and renders the
//! outcome.

mod cli;
mod display;
mod error;
mod events;
mod logging;

use crate::cli::{Cli, Commands, GlobalArgs};
use crate::display::{CommandReport, OutputRenderer};
use crate::error::CliError;
use crate::events::EventHandler;
use clap::Parser;
use pkgi_config::Config;
use pkgi_events::{EventEmitter, EventReceiver, EventSender};
use pkgi_install::{
    ArchiveContext, FsContentResolver, Host, InstallConfig, InstallContext, Installer,
    ShellRegistry, UnavailableBroker,
};
use pkgi_platform::{ElevatedShell, Platform};
use pkgi_types::{InstallStage, SourceRequest};
use std::path::Path;
use std::process;
use std::sync::Arc;
use tokio::select;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json_mode = cli.global.json;

    let config = load_config(&cli.global).await;
    let log_dir = config
        .as_ref()
        .map_or_else(|_| Config::default().log_dir(), Config::log_dir);
    init_tracing(json_mode, cli.global.debug, &log_dir);

    let result = match config {
        Ok(config) => run(cli, config).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(failed) if failed => process::exit(1),
        Ok(_) => {}
        Err(e) => {
            error!("Application error: {}", e);
            if !json_mode {
                eprintln!("Error: {e}");
            }
            process::exit(1);
        }
    }
}

/// Load configuration: file (or defaults), then environment overrides
async fn load_config(global: &GlobalArgs) -> Result<Config, CliError> {
    let mut config = Config::load_or_default(global.config.as_deref()).await?;
    config.merge_env()?;
    Ok(config)
}

/// Main application logic; returns whether the command failed
async fn run(cli: Cli, config: Config) -> Result<bool, CliError> {
    info!("Starting pkgi v{}", env!("CARGO_PKG_VERSION"));

    let (event_sender, event_receiver) = pkgi_events::channel();
    let installer = build_installer(&config, event_sender.clone());

    let renderer = OutputRenderer::new(cli.global.json);
    let mut event_handler = EventHandler::new(cli.global.json, cli.global.debug);

    let report = execute_command_with_events(
        cli.command,
        installer,
        event_sender,
        event_receiver,
        &mut event_handler,
    )
    .await?;

    renderer.render_report(&report)?;
    info!(failed = report.is_failure(), "Command completed");
    Ok(report.is_failure())
}

/// Wire the host collaborators into an orchestrator
fn build_installer(config: &Config, events: EventSender) -> Installer {
    let platform = Platform::current();
    let shell = Arc::new(ElevatedShell::new(
        platform.process(),
        config.shell.su_binary.clone(),
        config.shell.probe_timeout(),
    ));
    let registry = Arc::new(ShellRegistry::new(
        Arc::clone(&shell),
        platform.create_context(Some(events.clone())),
    ));
    let host = Host {
        broker: Arc::new(UnavailableBroker),
        registry,
        shell,
        content: Arc::new(FsContentResolver::new()),
    };
    Installer::new(InstallConfig::from(config), host, Some(events))
}

/// Execute command with concurrent event handling
async fn execute_command_with_events(
    command: Commands,
    installer: Installer,
    events: EventSender,
    mut event_receiver: EventReceiver,
    event_handler: &mut EventHandler,
) -> Result<CommandReport, CliError> {
    let operation = command.name();
    events.emit_operation_started(operation);
    let mut command_future = Box::pin(execute_command(command, installer));

    loop {
        select! {
            result = &mut command_future => {
                match &result {
                    Ok(report) => events.emit_operation_completed(operation, !report.is_failure()),
                    Err(e) => events.emit_operation_failed(operation, e.to_string()),
                }
                while let Ok(event) = event_receiver.try_recv() {
                    event_handler.handle_event(event);
                }
                event_handler.finish();
                return result;
            }

            event = event_receiver.recv() => {
                if let Some(event) = event {
                    event_handler.handle_event(event);
                }
            }
        }
    }
}

/// Execute the specified command
async fn execute_command(
    command: Commands,
    installer: Installer,
) -> Result<CommandReport, CliError> {
    match command {
        Commands::Install {
            source,
            store_installer,
            no_commit,
            remove_split,
        } => {
            let request = source_request(&source)?;
            let ctx = InstallContext::new()
                .with_set_installer(store_installer)
                .with_commit(!no_commit)
                .with_remove_split(remove_split);
            install(&installer, request, ctx).await
        }
        Commands::Archive { package, uninstall } => {
            let ctx = ArchiveContext::new().with_also_uninstall(uninstall);
            archive(&installer, &package, ctx).await
        }
        Commands::Enable { package } => toggle(&installer, package, true).await,
        Commands::Disable { package } => toggle(&installer, package, false).await,
        Commands::Probe => {
            installer.precheck(SourceRequest::default()).await;
            let backend = installer.backend();
            Ok(CommandReport::Probe {
                backend: backend.map(|b| b.to_string()),
                uid: backend.map(|b| b.uid()),
            })
        }
    }
}

async fn install(
    installer: &Installer,
    request: SourceRequest,
    ctx: InstallContext,
) -> Result<CommandReport, CliError> {
    if !installer.precheck(request).await {
        return Ok(CommandReport::Stage {
            stage: installer.current_stage(),
        });
    }

    let mut watcher = installer.subscribe();
    let ctx = match installer.parse_source().await {
        InstallStage::UserAction { full_mode, .. } => ctx.with_full_mode(full_mode),
        stage => return Ok(CommandReport::Stage { stage: Some(stage) }),
    };

    installer.install(ctx).await;
    let stage = watcher.wait_terminal().await;
    Ok(CommandReport::Stage { stage })
}

async fn archive(
    installer: &Installer,
    package: &str,
    ctx: ArchiveContext,
) -> Result<CommandReport, CliError> {
    if !installer
        .precheck(SourceRequest::from_package_name(package))
        .await
    {
        return Ok(CommandReport::Stage {
            stage: installer.current_stage(),
        });
    }

    let existing = installer.package_info(package).await?;
    installer.archive_package(existing, ctx).await;
    Ok(CommandReport::Stage {
        stage: installer.current_stage(),
    })
}

async fn toggle(
    installer: &Installer,
    package: String,
    enabled: bool,
) -> Result<CommandReport, CliError> {
    if !installer
        .precheck(SourceRequest::from_package_name(package.clone()))
        .await
    {
        return Ok(CommandReport::Stage {
            stage: installer.current_stage(),
        });
    }
    installer.set_package_enabled(&package, enabled).await?;
    Ok(CommandReport::Toggled { package, enabled })
}

/// Turn the `install` argument into a request
///
/// URIs pass through, existing paths become `file://` locators and anything
/// shaped like a package id is looked up by name.
fn source_request(source: &str) -> Result<SourceRequest, CliError> {
    if source.contains("://") || source.starts_with("package:") {
        return Ok(SourceRequest::from_locator(source));
    }

    let path = Path::new(source);
    if path.exists() {
        let absolute = std::path::absolute(path)?;
        return Ok(SourceRequest::from_path(&absolute));
    }

    let looks_like_package = source.contains('.')
        && source
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_');
    if looks_like_package {
        Ok(SourceRequest::from_package_name(source))
    } else {
        Err(CliError::InvalidArguments(format!(
            "'{source}' is neither a file, a URI nor a package id"
        )))
    }
}

/// Initialize tracing/logging
fn init_tracing(json_mode: bool, debug_enabled_flag: bool, log_dir: &Path) {
    let debug_enabled = std::env::var("RUST_LOG").is_ok() || debug_enabled_flag;

    if debug_enabled {
        // Structured JSON logs to file in both output modes
        if let Err(e) = std::fs::create_dir_all(log_dir) {
            if !json_mode {
                eprintln!("Warning: Failed to create log directory: {e}");
            }
        }

        let log_file = log_dir.join(format!(
            "pkgi-{}.log",
            chrono::Utc::now().format("%Y%m%d-%H%M%S")
        ));

        match std::fs::File::create(&log_file) {
            Ok(file) => {
                tracing_subscriber::fmt()
                    .json()
                    .with_writer(file)
                    .with_env_filter(
                        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(
                            |_| tracing_subscriber::EnvFilter::new("info,pkgi=debug"),
                        ),
                    )
                    .init();

                if !json_mode {
                    eprintln!("Debug logging enabled: {}", log_file.display());
                }
                return;
            }
            Err(e) if !json_mode => {
                eprintln!("Warning: Failed to create log file: {e}");
            }
            Err(_) => {}
        }
    }

    if json_mode {
        // Keep stdout and stderr free of log lines
        tracing_subscriber::fmt()
            .with_writer(std::io::sink)
            .with_env_filter("off")
            .init();
    } else {
        tracing_subscriber::fmt()
            .compact()
            .with_writer(std::io::stderr)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn,pkgi=warn")),
            )
            .init();
    }
}
