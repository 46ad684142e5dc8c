//! Install orchestrator
//!
//! One [`Installer`] drives one request at a time through
//! `precheck → parse_source → install | archive_package`, publishing every
//! transition on its [`StageEmitter`].

use pkgi_errors::{Error, InstallError, PlatformError};
use pkgi_events::{AppEvent, EventEmitter, EventSender, InstallEvent, StageEmitter, StageWatcher};
use pkgi_platform::{ElevatedShell, PlatformContext};
use pkgi_types::{
    AbortReason, EnabledState, ExistingPackageInfo, InstallStage, LaunchRef, PackageDescriptor,
    SessionId, SourceLocator, SourceRequest, INVALID_SESSION_ID,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::backend::{select_backend, PrivilegeBackend};
use crate::broker::{PackageBroker, PackageRegistry, KNOWN_PACKAGES_FLAG};
use crate::content::ContentResolver;
use crate::shell::quote;
use crate::{InstallConfig, InstallContext};

/// Host collaborators the orchestrator talks to
#[derive(Clone)]
pub struct Host {
    pub broker: Arc<dyn PackageBroker>,
    /// Registry used when the broker is not the bound backend
    pub registry: Arc<dyn PackageRegistry>,
    pub shell: Arc<ElevatedShell>,
    pub content: Arc<dyn ContentResolver>,
}

/// Per-request mutable state
#[derive(Debug)]
pub(crate) struct InstallState {
    pub(crate) request: SourceRequest,
    /// Payload bound by `parse_source`, which may differ from the request
    pub(crate) source: Option<SourceLocator>,
    pub(crate) backend: Option<PrivilegeBackend>,
    pub(crate) descriptor: Option<PackageDescriptor>,
    pub(crate) session_id: SessionId,
    /// Uid the source came from, used when the request carries none
    pub(crate) calling_uid: Option<u32>,
}

impl Default for InstallState {
    fn default() -> Self {
        Self {
            request: SourceRequest::default(),
            source: None,
            backend: None,
            descriptor: None,
            session_id: INVALID_SESSION_ID,
            calling_uid: None,
        }
    }
}

/// Package install orchestrator
#[derive(Clone)]
pub struct Installer {
    pub(crate) config: Arc<InstallConfig>,
    pub(crate) host: Host,
    pub(crate) emitter: StageEmitter,
    pub(crate) platform: PlatformContext,
    state: Arc<Mutex<InstallState>>,
    known_packages: Arc<OnceCell<u32>>,
}

impl std::fmt::Debug for Installer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Installer")
            .field("config", &self.config)
            .field("state", &*self.state())
            .finish_non_exhaustive()
    }
}

impl EventEmitter for Installer {
    fn event_sender(&self) -> Option<&EventSender> {
        self.emitter.event_sender()
    }
}

impl Installer {
    #[must_use]
    pub fn new(config: InstallConfig, host: Host, events: Option<EventSender>) -> Self {
        Self {
            config: Arc::new(config),
            host,
            emitter: StageEmitter::new(events.clone()),
            platform: PlatformContext::new(events),
            state: Arc::new(Mutex::new(InstallState::default())),
            known_packages: Arc::new(OnceCell::new()),
        }
    }

    /// Watch stage and progress updates
    #[must_use]
    pub fn subscribe(&self) -> StageWatcher {
        self.emitter.subscribe()
    }

    /// The latest published stage
    #[must_use]
    pub fn current_stage(&self) -> Option<InstallStage> {
        self.emitter.current()
    }

    /// Backend bound by the last successful precheck
    #[must_use]
    pub fn backend(&self) -> Option<PrivilegeBackend> {
        self.state().backend
    }

    /// Descriptor of the package the current request resolved to
    #[must_use]
    pub fn descriptor(&self) -> Option<PackageDescriptor> {
        self.state().descriptor.clone()
    }

    /// Id of the staged session bound to this request, if any
    #[must_use]
    pub fn session_id(&self) -> Option<SessionId> {
        let id = self.state().session_id;
        (id != INVALID_SESSION_ID).then_some(id)
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, InstallState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn set_descriptor(&self, descriptor: PackageDescriptor) {
        self.state().descriptor = Some(descriptor);
    }

    pub(crate) fn set_session_id(&self, session_id: SessionId) {
        self.state().session_id = session_id;
    }

    pub(crate) fn request(&self) -> SourceRequest {
        self.state().request.clone()
    }

    /// Openable payload `install` reads from, if any
    pub(crate) fn source(&self) -> Option<SourceLocator> {
        self.state().source.clone()
    }

    /// Registry reads go through the bound backend
    pub(crate) fn registry(&self) -> Arc<dyn PackageRegistry> {
        match self.backend() {
            Some(PrivilegeBackend::Broker { .. }) => {
                Arc::clone(&self.host.broker) as Arc<dyn PackageRegistry>
            }
            _ => Arc::clone(&self.host.registry),
        }
    }

    /// Registry match flag for known-but-uninstalled packages, resolved once
    pub(crate) async fn known_packages_flag(&self) -> u32 {
        let registry = self.registry();
        *self
            .known_packages
            .get_or_init(|| async move {
                let flag = registry.query_flag(KNOWN_PACKAGES_FLAG).await.unwrap_or(0);
                debug!(flag, "resolved known-packages match flag");
                flag
            })
            .await
    }

    /// Pick the privilege backend for `request`
    ///
    /// Publishes `Parse` and returns `true` when a backend is bound. With
    /// neither backend usable, publishes `Aborted(NoPrivilege)` carrying a
    /// way to get the broker and returns `false`.
    pub async fn precheck(&self, mut request: SourceRequest) -> bool {
        self.emitter.reset();
        request.normalize();
        *self.state() = InstallState {
            calling_uid: request.originating_uid,
            request,
            ..InstallState::default()
        };

        let Some(backend) =
            select_backend(self.host.broker.as_ref(), &self.host.shell, &self.platform).await
        else {
            warn!("no privileged backend available");
            let recovery = self.recovery_ref().await;
            self.emitter.publish(InstallStage::Aborted {
                reason: AbortReason::NoPrivilege,
                recovery: Some(recovery),
            });
            return false;
        };

        info!(backend = %backend, uid = backend.uid(), "privilege backend bound");
        self.state().backend = Some(backend);
        self.emit(AppEvent::Install(InstallEvent::BackendSelected {
            backend: backend.name().to_string(),
            uid: backend.uid(),
        }));

        if let PrivilegeBackend::Broker { .. } = backend {
            if let Err(e) = self.host.broker.disable_verifier().await {
                debug!(error = %e, "could not disable install verification");
            }
        }
        self.known_packages_flag().await;

        self.emitter.publish(InstallStage::Parse);
        true
    }

    /// Broker manager if installed, otherwise where to download the broker
    async fn recovery_ref(&self) -> LaunchRef {
        match self.host.registry.launch_ref(&self.config.broker_manager).await {
            Some(launch) => launch,
            None => LaunchRef::Url {
                url: self.config.broker_download_url.clone(),
            },
        }
    }

    /// Resolve the bound request and publish the resulting stage
    pub async fn parse_source(&self) -> InstallStage {
        let stage = self.resolve_request().await;
        self.emitter.publish(stage.clone());
        stage
    }

    async fn resolve_request(&self) -> InstallStage {
        if self.backend().is_none() {
            return InstallStage::aborted(AbortReason::NoPrivilege);
        }
        let request = self.request();
        debug!(request = ?request, "resolving install source");

        match request.classified() {
            Some(SourceLocator::Package(name) | SourceLocator::Market(Some(name))) => {
                self.resolve_by_name(&name).await
            }
            Some(locator @ (SourceLocator::Content(_) | SourceLocator::File(_))) => {
                self.resolve_by_content(locator).await
            }
            None => match request.package_name {
                Some(name) => self.resolve_by_name(&name).await,
                None => InstallStage::aborted(AbortReason::InvalidInfo),
            },
            Some(other) => {
                warn!(locator = ?other, "unsupported install source");
                InstallStage::aborted(AbortReason::InvalidInfo)
            }
        }
    }

    /// Install the resolved package
    ///
    /// With the broker, a committed install returns once the commit has been
    /// requested; the terminal stage follows when the backend reports back.
    pub async fn install(&self, ctx: InstallContext) {
        let Some(backend) = self.backend() else {
            self.emitter
                .publish(InstallStage::aborted(AbortReason::NoPrivilege));
            return;
        };
        let Some(descriptor) = self.descriptor() else {
            self.emitter
                .publish(InstallStage::aborted(AbortReason::InvalidInfo));
            return;
        };

        self.emitter.publish(InstallStage::Installing {
            descriptor: descriptor.clone(),
        });

        // Name-resolved packages with no payload to open are enabled in place
        let Some(locator) = self.source() else {
            self.install_existing(descriptor).await;
            return;
        };

        if backend.is_shell() {
            self.shell_install(descriptor, &ctx).await;
        } else {
            self.staged_install(descriptor, locator, &ctx).await;
        }
    }

    /// Abandon the bound staged session, if any
    ///
    /// Safe to call repeatedly; permission errors from the broker are
    /// ignored.
    pub async fn cleanup_install(&self) {
        let session_id = std::mem::replace(&mut self.state().session_id, INVALID_SESSION_ID);
        if session_id <= 0 {
            return;
        }
        match self.host.broker.abandon_session(session_id).await {
            Ok(()) => debug!(session_id, "abandoned staged session"),
            Err(Error::Broker(pkgi_errors::BrokerError::PermissionDenied { .. })) => {
                debug!(session_id, "not allowed to abandon session");
            }
            Err(e) => warn!(session_id, error = %e, "failed to abandon session"),
        }
        self.emit(AppEvent::Install(InstallEvent::SessionAbandoned { session_id }));
    }

    /// Enable or disable a package for the current user
    ///
    /// # Errors
    ///
    /// Returns an error if no backend is bound or the backend rejects the
    /// change.
    pub async fn set_package_enabled(&self, package: &str, enabled: bool) -> Result<(), Error> {
        let state = if enabled {
            EnabledState::Enabled
        } else {
            EnabledState::DisabledUser
        };
        match self.backend() {
            Some(PrivilegeBackend::Broker { .. }) => {
                self.host.broker.set_enabled(package, state).await
            }
            Some(PrivilegeBackend::ElevatedShell) => {
                let verb = if enabled { "enable" } else { "disable-user" };
                let command = format!("pm {verb} {}", quote(package));
                let output = self.host.shell.run(&self.platform, &command).await?;
                if output.success() {
                    Ok(())
                } else {
                    Err(PlatformError::UnexpectedOutput {
                        command,
                        message: output.stderr_lossy().trim().to_string(),
                    }
                    .into())
                }
            }
            None => Err(InstallError::NoPrivilege.into()),
        }
    }

    /// Snapshot of an installed package through the bound backend
    ///
    /// # Errors
    ///
    /// Returns the registry's error, `NotFound` for unknown packages.
    pub async fn package_info(&self, package: &str) -> Result<ExistingPackageInfo, Error> {
        let flags = self.known_packages_flag().await;
        self.registry().package_info(package, flags).await
    }
}
