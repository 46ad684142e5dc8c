//! Event handling and progress display

use console::{Style, Term};
use pkgi_events::{AppEvent, GeneralEvent, InstallEvent, PROGRESS_COMMITTING};

const BAR_WIDTH: usize = 30;

/// Event handler for progress display and user feedback
pub struct EventHandler {
    term: Term,
    /// Suppress all terminal output (JSON mode)
    quiet: bool,
    debug_enabled: bool,
    /// A progress line is on screen and must be cleared before other output
    bar_visible: bool,
    warn: Style,
    dim: Style,
}

impl EventHandler {
    pub fn new(quiet: bool, debug_enabled: bool) -> Self {
        Self {
            term: Term::stderr(),
            quiet,
            debug_enabled,
            bar_visible: false,
            warn: Style::new().yellow(),
            dim: Style::new().dim(),
        }
    }

    /// Handle incoming event
    pub fn handle_event(&mut self, event: AppEvent) {
        crate::logging::log_event_with_tracing(&event);
        if self.quiet {
            return;
        }

        match event {
            AppEvent::Install(InstallEvent::ProgressUpdated { value }) => {
                self.show_progress(value);
            }
            AppEvent::Install(InstallEvent::BackendSelected { backend, uid }) => {
                self.show_status(&format!("Using {backend} (uid {uid})"));
            }
            AppEvent::Install(InstallEvent::SessionCreated {
                session_id,
                package,
            }) => {
                self.show_status(&format!("Staging {package} in session {session_id}"));
            }
            AppEvent::Install(InstallEvent::SessionReused {
                session_id,
                package,
            }) => {
                self.show_status(&format!("Adding to session {session_id} for {package}"));
            }
            AppEvent::Install(InstallEvent::CommitRequested { session_id }) => {
                self.show_status(&format!("Committing session {session_id}"));
            }
            AppEvent::Install(InstallEvent::ArchiveWritten { path, entries }) => {
                self.show_status(&format!(
                    "Wrote {entries} payloads to {}",
                    path.display()
                ));
            }
            AppEvent::Install(InstallEvent::StepSkipped { step, failure }) => {
                let line = self
                    .warn
                    .apply_to(format!("Skipped {step}: {}", failure.message))
                    .to_string();
                self.show_status(&line);
            }
            AppEvent::General(GeneralEvent::Warning { message, package }) => {
                let line = match package {
                    Some(package) => format!("Warning: {package}: {message}"),
                    None => format!("Warning: {message}"),
                };
                let line = self.warn.apply_to(line).to_string();
                self.show_status(&line);
            }
            AppEvent::General(GeneralEvent::Note { message }) if self.debug_enabled => {
                let line = self.dim.apply_to(message).to_string();
                self.show_status(&line);
            }
            _ => {}
        }
    }

    fn show_progress(&mut self, value: u8) {
        if value >= PROGRESS_COMMITTING {
            self.clear_bar();
            return;
        }
        let filled = usize::from(value.min(100)) * BAR_WIDTH / 100;
        let line = format!(
            "[{}{}] {value:>3}%",
            "#".repeat(filled),
            " ".repeat(BAR_WIDTH - filled)
        );
        let _ = self.term.clear_line();
        let _ = self.term.write_str(&line);
        self.bar_visible = true;
    }

    fn clear_bar(&mut self) {
        if self.bar_visible {
            let _ = self.term.clear_line();
            self.bar_visible = false;
        }
    }

    fn show_status(&mut self, message: &str) {
        self.clear_bar();
        let _ = self.term.write_line(message);
    }

    /// Leave the terminal on a clean line
    pub fn finish(&mut self) {
        self.clear_bar();
    }
}
