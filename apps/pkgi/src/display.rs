//! Output rendering and formatting

use console::Style;
use pkgi_types::{AbortReason, InstallStage, LaunchRef, PackageDescriptor};
use serde::Serialize;
use std::io;

/// Final outcome of a command
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CommandReport {
    /// Terminal (or action-pending) stage of an install or archive
    Stage { stage: Option<InstallStage> },
    Probe { backend: Option<String>, uid: Option<u32> },
    Toggled { package: String, enabled: bool },
}

impl CommandReport {
    /// Whether the command should exit non-zero
    pub fn is_failure(&self) -> bool {
        match self {
            CommandReport::Stage { stage } => !matches!(
                stage,
                Some(
                    InstallStage::Success { .. }
                        | InstallStage::PackageAction { .. }
                        | InstallStage::Aborted {
                            reason: AbortReason::UserClosed,
                            ..
                        }
                )
            ),
            CommandReport::Probe { backend, .. } => backend.is_none(),
            CommandReport::Toggled { .. } => false,
        }
    }
}

/// Output renderer for CLI results
#[derive(Clone)]
pub struct OutputRenderer {
    json_output: bool,
    ok: Style,
    bad: Style,
    dim: Style,
}

impl OutputRenderer {
    pub fn new(json_output: bool) -> Self {
        Self {
            json_output,
            ok: Style::new().green().bold(),
            bad: Style::new().red().bold(),
            dim: Style::new().dim(),
        }
    }

    /// Render command result
    pub fn render_report(&self, report: &CommandReport) -> io::Result<()> {
        if self.json_output {
            let json = serde_json::to_string_pretty(report).map_err(io::Error::other)?;
            println!("{json}");
            return Ok(());
        }

        match report {
            CommandReport::Stage { stage: Some(stage) } => self.render_stage(stage),
            CommandReport::Stage { stage: None } => {
                println!("{} no result was reported", self.bad.apply_to("[ERROR]"));
            }
            CommandReport::Probe {
                backend: Some(backend),
                uid,
            } => {
                let uid = uid.map_or_else(|| "-".to_string(), |uid| uid.to_string());
                println!("{} backend: {backend} (uid {uid})", self.ok.apply_to("[OK]"));
            }
            CommandReport::Probe { backend: None, .. } => {
                println!("{} no privileged backend available", self.bad.apply_to("[ERROR]"));
            }
            CommandReport::Toggled { package, enabled } => {
                let verb = if *enabled { "Enabled" } else { "Disabled" };
                println!("{} {verb} {package}", self.ok.apply_to("[OK]"));
            }
        }
        Ok(())
    }

    fn render_stage(&self, stage: &InstallStage) {
        match stage {
            InstallStage::Success {
                descriptor,
                launch,
                archive_path,
            } => {
                match archive_path {
                    Some(path) => println!(
                        "{} Archived {}: {path}",
                        self.ok.apply_to("[OK]"),
                        describe(descriptor)
                    ),
                    None => println!(
                        "{} Installed {}",
                        self.ok.apply_to("[OK]"),
                        describe(descriptor)
                    ),
                }
                if let Some(launch) = launch {
                    println!("  {} {}", self.dim.apply_to("open:"), describe_launch(launch));
                }
            }
            InstallStage::Failed {
                descriptor,
                legacy_status,
                status,
                message,
            } => {
                println!(
                    "{} Install of {} failed (status {status}, legacy {legacy_status})",
                    self.bad.apply_to("[ERROR]"),
                    describe(descriptor)
                );
                if let Some(message) = message {
                    println!("  {message}");
                }
            }
            InstallStage::Aborted {
                reason: AbortReason::UserClosed,
                ..
            } => {
                println!("Session staged; left uncommitted.");
            }
            InstallStage::Aborted { reason, recovery } => {
                println!(
                    "{} Aborted: {}",
                    self.bad.apply_to("[ERROR]"),
                    reason.as_str()
                );
                if let Some(recovery) = recovery {
                    println!("  {} {}", self.dim.apply_to("try:"), describe_launch(recovery));
                }
            }
            InstallStage::PackageAction {
                descriptor,
                existing,
            } => {
                println!(
                    "{} is already installed (version {})",
                    describe(descriptor),
                    existing.version_code
                );
                if let Some(installer) = &existing.installer {
                    println!("  {} {installer}", self.dim.apply_to("installer:"));
                }
            }
            other => println!("Stopped at stage {}", other.name()),
        }
    }
}

fn describe(descriptor: &PackageDescriptor) -> String {
    let mut text = match &descriptor.label {
        Some(label) => format!("{label} ({})", descriptor.package_id),
        None => descriptor.package_id.clone(),
    };
    if let Some(split) = &descriptor.split_name {
        text.push_str(&format!(" [split {split}]"));
    }
    text
}

fn describe_launch(launch: &LaunchRef) -> String {
    match launch {
        LaunchRef::Activity { package, component } => format!("{package}/{component}"),
        LaunchRef::View { path, mime } => format!("{} ({mime})", path.display()),
        LaunchRef::Url { url } => url.clone(),
    }
}
