//! In-memory host doubles and end-to-end orchestrator scenarios

use async_trait::async_trait;
use pkgi_errors::{BrokerError, Error};
use pkgi_platform::{CommandOutput, ElevatedShell, PlatformCommand, PlatformContext, ProcessOperations};
use pkgi_types::{
    DeleteFlags, EnabledState, ExistingPackageInfo, HostCapabilities, InstallReason, InstallStatus,
    LaunchRef, SessionId, SessionInfo, SessionParams,
};
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::broker::{PackageBroker, PackageRegistry, StagedSession};
use crate::content::FsContentResolver;
use crate::status::StatusSender;
use crate::{Host, InstallConfig, Installer};

type Slots = Arc<Mutex<Vec<(String, Vec<u8>)>>>;

fn not_found(package: &str) -> Error {
    BrokerError::NotFound {
        package: package.to_string(),
    }
    .into()
}

/// Registry record for an installed package whose payloads live in `dir`
pub(crate) fn installed_in(dir: &Path, package: &str, version_code: i64) -> ExistingPackageInfo {
    let base = dir.join("base.apk");
    std::fs::write(&base, b"installed base payload").unwrap();
    ExistingPackageInfo {
        package_id: package.to_string(),
        version_code,
        label: Some("Example".to_string()),
        base_path: Some(base),
        installed: true,
        uid: 1_010_057,
        ..ExistingPackageInfo::default()
    }
}

#[derive(Default)]
pub(crate) struct FakeRegistry {
    pub(crate) packages: Mutex<HashMap<String, ExistingPackageInfo>>,
    pub(crate) sessions: Mutex<Vec<SessionInfo>>,
    pub(crate) known_flag: Option<u32>,
    pub(crate) flag_queries: Mutex<u32>,
    pub(crate) installers: Mutex<HashMap<String, String>>,
}

impl FakeRegistry {
    pub(crate) fn with_package(self, info: ExistingPackageInfo) -> Self {
        self.add(info);
        self
    }

    pub(crate) fn add(&self, info: ExistingPackageInfo) {
        self.packages
            .lock()
            .unwrap()
            .insert(info.package_id.clone(), info);
    }

    pub(crate) fn get(&self, package: &str) -> Option<ExistingPackageInfo> {
        self.packages.lock().unwrap().get(package).cloned()
    }

    fn mark_installed(&self, package: &str) {
        let mut packages = self.packages.lock().unwrap();
        let entry = packages
            .entry(package.to_string())
            .or_insert_with(|| ExistingPackageInfo {
                package_id: package.to_string(),
                ..ExistingPackageInfo::default()
            });
        entry.installed = true;
        entry.label = Some("Installed Label".to_string());
    }
}

#[async_trait]
impl PackageRegistry for FakeRegistry {
    async fn package_info(&self, package: &str, _flags: u32) -> Result<ExistingPackageInfo, Error> {
        self.get(package).ok_or_else(|| not_found(package))
    }

    async fn query_flag(&self, _name: &str) -> Option<u32> {
        *self.flag_queries.lock().unwrap() += 1;
        self.known_flag
    }

    async fn installer_of(&self, package: &str) -> Result<Option<String>, Error> {
        Ok(self.installers.lock().unwrap().get(package).cloned())
    }

    async fn launch_ref(&self, package: &str) -> Option<LaunchRef> {
        self.get(package).map(|_| LaunchRef::Activity {
            package: package.to_string(),
            component: ".Main".to_string(),
        })
    }

    async fn is_system_package(&self, _package: &str) -> bool {
        false
    }

    async fn all_sessions(&self) -> Result<Vec<SessionInfo>, Error> {
        Ok(self.sessions.lock().unwrap().clone())
    }

    async fn session_info(&self, session_id: SessionId) -> Result<Option<SessionInfo>, Error> {
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.session_id == session_id)
            .cloned())
    }

    async fn install_existing(&self, package: &str, _reason: InstallReason) -> Result<(), Error> {
        if self.get(package).is_none() {
            return Err(not_found(package));
        }
        self.mark_installed(package);
        Ok(())
    }

    async fn provider_uid(&self, _authority: &str) -> Option<u32> {
        None
    }
}

struct SlotWriter {
    slots: Slots,
    index: usize,
}

impl Write for SlotWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.slots.lock().unwrap()[self.index].1.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct FakeSession {
    slots: Slots,
    removed: Arc<Mutex<Vec<String>>>,
    fail_write: bool,
}

impl StagedSession for FakeSession {
    fn open_write(&mut self, name: &str, _size: u64) -> Result<Box<dyn Write + Send + '_>, Error> {
        if self.fail_write {
            return Err(BrokerError::Remote {
                message: "write rejected".to_string(),
            }
            .into());
        }
        let mut slots = self.slots.lock().unwrap();
        slots.push((name.to_string(), Vec::new()));
        Ok(Box::new(SlotWriter {
            slots: Arc::clone(&self.slots),
            index: slots.len() - 1,
        }))
    }

    fn remove_split(&mut self, split_name: &str) -> Result<(), Error> {
        self.removed.lock().unwrap().push(split_name.to_string());
        Ok(())
    }
}

pub(crate) struct FakeBroker {
    pub(crate) registry: Arc<FakeRegistry>,
    pub(crate) running: bool,
    pub(crate) uid: u32,
    pub(crate) caps: HostCapabilities,
    pub(crate) fail_create: bool,
    pub(crate) fail_write: bool,
    /// The commit request itself is rejected
    pub(crate) fail_commit: bool,
    pub(crate) commit_status: InstallStatus,
    /// Whether a successful commit makes the package visible to the registry
    pub(crate) register_on_commit: bool,
    /// `None` makes the native archive call report "not found"
    pub(crate) archive_status: Option<InstallStatus>,
    pub(crate) uninstall_status: InstallStatus,
    next_session: AtomicI32,
    pub(crate) created: Mutex<Vec<(SessionId, SessionParams)>>,
    pub(crate) session_packages: Mutex<HashMap<SessionId, String>>,
    pub(crate) slots: Slots,
    pub(crate) removed_splits: Arc<Mutex<Vec<String>>>,
    pub(crate) abandoned: Mutex<Vec<SessionId>>,
    pub(crate) committed: Mutex<Vec<SessionId>>,
    pub(crate) archived: Mutex<Vec<String>>,
    pub(crate) uninstalled: Mutex<Vec<(String, DeleteFlags)>>,
    pub(crate) cache_cleared: Mutex<Vec<(String, u32)>>,
    pub(crate) enabled: Mutex<Vec<(String, EnabledState)>>,
    pub(crate) verifier_disabled: Mutex<bool>,
}

impl FakeBroker {
    pub(crate) fn new(registry: FakeRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            running: true,
            uid: 2000,
            caps: HostCapabilities::default(),
            fail_create: false,
            fail_write: false,
            fail_commit: false,
            commit_status: InstallStatus::success(),
            register_on_commit: true,
            archive_status: None,
            uninstall_status: InstallStatus::success(),
            next_session: AtomicI32::new(100),
            created: Mutex::new(Vec::new()),
            session_packages: Mutex::new(HashMap::new()),
            slots: Arc::new(Mutex::new(Vec::new())),
            removed_splits: Arc::new(Mutex::new(Vec::new())),
            abandoned: Mutex::new(Vec::new()),
            committed: Mutex::new(Vec::new()),
            archived: Mutex::new(Vec::new()),
            uninstalled: Mutex::new(Vec::new()),
            cache_cleared: Mutex::new(Vec::new()),
            enabled: Mutex::new(Vec::new()),
            verifier_disabled: Mutex::new(false),
        }
    }

    pub(crate) fn stopped() -> Self {
        Self {
            running: false,
            ..Self::new(FakeRegistry::default())
        }
    }

    pub(crate) fn slot_names(&self) -> Vec<String> {
        self.slots
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }
}

#[async_trait]
impl PackageRegistry for FakeBroker {
    async fn package_info(&self, package: &str, flags: u32) -> Result<ExistingPackageInfo, Error> {
        self.registry.package_info(package, flags).await
    }

    async fn query_flag(&self, name: &str) -> Option<u32> {
        self.registry.query_flag(name).await
    }

    async fn installer_of(&self, package: &str) -> Result<Option<String>, Error> {
        self.registry.installer_of(package).await
    }

    async fn launch_ref(&self, package: &str) -> Option<LaunchRef> {
        self.registry.launch_ref(package).await
    }

    async fn is_system_package(&self, package: &str) -> bool {
        self.registry.is_system_package(package).await
    }

    async fn all_sessions(&self) -> Result<Vec<SessionInfo>, Error> {
        self.registry.all_sessions().await
    }

    async fn session_info(&self, session_id: SessionId) -> Result<Option<SessionInfo>, Error> {
        self.registry.session_info(session_id).await
    }

    async fn install_existing(&self, package: &str, reason: InstallReason) -> Result<(), Error> {
        self.registry.install_existing(package, reason).await
    }

    async fn provider_uid(&self, authority: &str) -> Option<u32> {
        self.registry.provider_uid(authority).await
    }
}

#[async_trait]
impl PackageBroker for FakeBroker {
    async fn ping(&self) -> bool {
        self.running
    }

    async fn uid(&self) -> u32 {
        self.uid
    }

    async fn check_self_permission(&self) -> bool {
        true
    }

    async fn check_remote_permission(&self, _permission: &str) -> bool {
        true
    }

    fn capabilities(&self) -> HostCapabilities {
        self.caps
    }

    async fn disable_verifier(&self) -> Result<(), Error> {
        *self.verifier_disabled.lock().unwrap() = true;
        Ok(())
    }

    async fn create_session(&self, params: SessionParams) -> Result<SessionId, Error> {
        if self.fail_create {
            return Err(BrokerError::Remote {
                message: "session limit reached".to_string(),
            }
            .into());
        }
        let id = self.next_session.fetch_add(1, Ordering::SeqCst);
        if let Some(package) = &params.app_package_name {
            self.session_packages
                .lock()
                .unwrap()
                .insert(id, package.clone());
        }
        self.created.lock().unwrap().push((id, params));
        Ok(id)
    }

    async fn open_session(&self, _session_id: SessionId) -> Result<Box<dyn StagedSession>, Error> {
        Ok(Box::new(FakeSession {
            slots: Arc::clone(&self.slots),
            removed: Arc::clone(&self.removed_splits),
            fail_write: self.fail_write,
        }))
    }

    async fn commit_session(&self, session_id: SessionId, result: StatusSender) -> Result<(), Error> {
        if self.fail_commit {
            return Err(BrokerError::Remote {
                message: "session sealed".to_string(),
            }
            .into());
        }
        self.committed.lock().unwrap().push(session_id);
        if self.register_on_commit && self.commit_status.is_success() {
            let package = self.session_packages.lock().unwrap().get(&session_id).cloned();
            if let Some(package) = package {
                self.registry.mark_installed(&package);
            }
        }
        result.send(self.commit_status.clone());
        Ok(())
    }

    async fn abandon_session(&self, session_id: SessionId) -> Result<(), Error> {
        self.abandoned.lock().unwrap().push(session_id);
        Ok(())
    }

    async fn request_archive(&self, package: &str, result: StatusSender) -> Result<(), Error> {
        let Some(status) = self.archive_status.clone() else {
            return Err(not_found(package));
        };
        self.archived.lock().unwrap().push(package.to_string());
        result.send(status);
        Ok(())
    }

    async fn uninstall(
        &self,
        package: &str,
        _version_code: i64,
        flags: DeleteFlags,
        result: StatusSender,
    ) -> Result<(), Error> {
        self.uninstalled
            .lock()
            .unwrap()
            .push((package.to_string(), flags));
        result.send(self.uninstall_status.clone());
        Ok(())
    }

    async fn delete_cache(&self, package: &str, user_id: u32) -> Result<(), Error> {
        self.cache_cleared
            .lock()
            .unwrap()
            .push((package.to_string(), user_id));
        Ok(())
    }

    async fn set_enabled(&self, package: &str, state: EnabledState) -> Result<(), Error> {
        self.enabled.lock().unwrap().push((package.to_string(), state));
        Ok(())
    }
}

/// Process double answering `su -c <line>` by line prefix
#[derive(Default)]
pub(crate) struct ScriptedProcess {
    rules: Vec<(String, CommandOutput)>,
    calls: Mutex<Vec<String>>,
}

pub(crate) fn output(exit_code: i32, stdout: &str) -> CommandOutput {
    CommandOutput {
        exit_code: Some(exit_code),
        stdout: stdout.as_bytes().to_vec(),
        stderr: Vec::new(),
    }
}

impl ScriptedProcess {
    /// A shell whose `id` probe reports root
    pub(crate) fn rooted() -> Self {
        Self::default().on("id", output(0, "uid=0(root) gid=0(root)"))
    }

    pub(crate) fn on(mut self, prefix: &str, output: CommandOutput) -> Self {
        self.rules.push((prefix.to_string(), output));
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProcessOperations for ScriptedProcess {
    async fn execute_command(
        &self,
        _ctx: &PlatformContext,
        cmd: PlatformCommand,
    ) -> Result<CommandOutput, Error> {
        let line = cmd.get_args().last().cloned().unwrap_or_default();
        self.calls.lock().unwrap().push(line.clone());
        Ok(self
            .rules
            .iter()
            .find(|(prefix, _)| line.starts_with(prefix.as_str()))
            .map_or_else(|| output(1, ""), |(_, out)| out.clone()))
    }
}

pub(crate) struct Harness {
    pub(crate) installer: Installer,
    pub(crate) broker: Arc<FakeBroker>,
    pub(crate) registry: Arc<FakeRegistry>,
    pub(crate) process: Arc<ScriptedProcess>,
    pub(crate) scratch: tempfile::TempDir,
}

impl Harness {
    /// Broker-backed orchestrator
    pub(crate) fn broker(broker: FakeBroker) -> Self {
        let broker = Arc::new(broker);
        let registry = Arc::clone(&broker.registry);
        Self::build(broker, registry, ScriptedProcess::default())
    }

    /// Shell-backed orchestrator over `registry`
    pub(crate) fn shell(registry: FakeRegistry, process: ScriptedProcess) -> Self {
        Self::build(Arc::new(FakeBroker::stopped()), Arc::new(registry), process)
    }

    fn build(broker: Arc<FakeBroker>, registry: Arc<FakeRegistry>, process: ScriptedProcess) -> Self {
        let scratch = tempfile::tempdir().unwrap();
        let process = Arc::new(process);
        let shell = Arc::new(ElevatedShell::new(
            Arc::clone(&process) as Arc<dyn ProcessOperations>,
            "su",
            Duration::from_secs(2),
        ));
        let host = Host {
            broker: Arc::clone(&broker) as Arc<dyn PackageBroker>,
            registry: Arc::clone(&registry) as Arc<dyn PackageRegistry>,
            shell,
            content: Arc::new(FsContentResolver::new()),
        };
        let config = InstallConfig::default()
            .with_cache_dir(scratch.path().join("cache"))
            .with_archive_dir(scratch.path().join("archives"))
            .with_settle_delay(Duration::ZERO)
            .with_verify(3, Duration::from_millis(1));
        let installer = Installer::new(config, host, None);
        Self {
            installer,
            broker,
            registry,
            process,
            scratch,
        }
    }

    /// Write a source file into the scratch directory
    pub(crate) fn source(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.scratch.path().join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    pub(crate) fn cache_dir(&self) -> PathBuf {
        self.installer.config.shell_cache_dir()
    }
}

mod scenarios {
    use super::*;
    use crate::manifest::fixture;
    use crate::{ArchiveContext, InstallContext, PrivilegeBackend};
    use pkgi_errors::InstallError;
    use pkgi_events::{AppEvent, InstallEvent, PROGRESS_COMMITTING};
    use pkgi_types::{AbortReason, InstallStage, SessionMode, SourceLocator, SourceRequest};

    async fn terminal(installer: &Installer) -> InstallStage {
        installer.subscribe().wait_terminal().await.unwrap()
    }

    #[tokio::test]
    async fn single_payload_installs_to_success() {
        let h = Harness::broker(FakeBroker::new(FakeRegistry::default()));
        let path = h.source("app.apk", &fixture::payload("com.example.app", 3, None));

        assert!(h.installer.precheck(SourceRequest::from_path(&path)).await);
        assert_eq!(h.installer.backend(), Some(PrivilegeBackend::Broker { uid: 2000 }));
        assert!(*h.broker.verifier_disabled.lock().unwrap());

        match h.installer.parse_source().await {
            InstallStage::UserAction {
                descriptor,
                existing,
                full_mode,
                skip_create,
            } => {
                assert_eq!(descriptor.package_id, "com.example.app");
                assert!(existing.is_none());
                assert!(full_mode);
                assert!(!skip_create);
                assert_eq!(descriptor.label.as_deref(), Some("app.apk"));
            }
            other => panic!("unexpected stage {other:?}"),
        }

        h.installer.install(InstallContext::new()).await;
        match terminal(&h.installer).await {
            InstallStage::Success {
                descriptor,
                launch,
                archive_path,
            } => {
                assert_eq!(descriptor.label.as_deref(), Some("Installed Label"));
                assert!(matches!(launch, Some(LaunchRef::Activity { .. })));
                assert!(archive_path.is_none());
            }
            other => panic!("unexpected stage {other:?}"),
        }

        assert_eq!(h.broker.slot_names(), vec!["base.apk"]);
        let created = h.broker.created.lock().unwrap();
        let (id, params) = &created[0];
        assert_eq!(params.mode, SessionMode::Full);
        assert_eq!(params.installer_package.as_deref(), Some("io.github.pkgi"));
        assert_eq!(params.install_reason, InstallReason::User);
        assert_eq!(*h.broker.committed.lock().unwrap(), vec![*id]);
        assert_eq!(h.installer.session_id(), None);
    }

    #[tokio::test]
    async fn split_for_installed_base_is_incremental() {
        let dir = tempfile::tempdir().unwrap();
        let registry =
            FakeRegistry::default().with_package(installed_in(dir.path(), "com.example.app", 5));
        let h = Harness::broker(FakeBroker::new(registry));
        let path = h.source(
            "split.apk",
            &fixture::payload("com.example.app", 5, Some("config.xxhdpi")),
        );

        assert!(h.installer.precheck(SourceRequest::from_path(&path)).await);
        match h.installer.parse_source().await {
            InstallStage::UserAction {
                descriptor,
                full_mode,
                skip_create,
                existing,
            } => {
                assert!(descriptor.is_split());
                assert!(!full_mode);
                assert!(!skip_create);
                assert_eq!(descriptor.label.as_deref(), Some("Example"));
                assert!(existing.is_some());
            }
            other => panic!("unexpected stage {other:?}"),
        }

        h.installer
            .install(InstallContext::new().with_full_mode(false))
            .await;
        assert!(matches!(terminal(&h.installer).await, InstallStage::Success { .. }));
        assert_eq!(h.broker.slots.lock().unwrap().len(), 1);
        let created = h.broker.created.lock().unwrap();
        assert_eq!(created[0].1.mode, SessionMode::InheritExisting);
        assert_eq!(created[0].1.app_label.as_deref(), Some("Example"));
    }

    #[tokio::test]
    async fn split_without_base_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let registry =
            FakeRegistry::default().with_package(installed_in(dir.path(), "com.example.app", 4));
        let h = Harness::broker(FakeBroker::new(registry));
        let path = h.source(
            "split.apk",
            &fixture::payload("com.example.app", 5, Some("config.en")),
        );

        assert!(h.installer.precheck(SourceRequest::from_path(&path)).await);
        let stage = h.installer.parse_source().await;
        assert_eq!(stage.abort_reason(), Some(AbortReason::SplitWithoutBase));
        assert_eq!(h.installer.current_stage(), Some(stage));
    }

    #[tokio::test]
    async fn split_reuses_attributed_session() {
        let h = Harness::broker(FakeBroker::new(FakeRegistry::default()));
        h.registry.sessions.lock().unwrap().push(SessionInfo {
            session_id: 42,
            app_package_name: Some("com.example.app".into()),
            active: true,
            mode: SessionMode::Full,
            installer_uid: Some(2000),
            install_reason: InstallReason::User,
            install_flags: pkgi_types::InstallFlags::empty(),
            app_label: Some("From Session".into()),
            app_icon: None,
        });
        h.broker
            .session_packages
            .lock()
            .unwrap()
            .insert(42, "com.example.app".into());
        let path = h.source(
            "split.apk",
            &fixture::payload("com.example.app", 5, Some("config.en")),
        );

        assert!(h.installer.precheck(SourceRequest::from_path(&path)).await);
        match h.installer.parse_source().await {
            InstallStage::UserAction {
                descriptor,
                full_mode,
                skip_create,
                ..
            } => {
                assert!(full_mode);
                assert!(skip_create);
                assert_eq!(descriptor.label.as_deref(), Some("From Session"));
            }
            other => panic!("unexpected stage {other:?}"),
        }
        assert_eq!(h.installer.session_id(), Some(42));

        h.installer.install(InstallContext::new()).await;
        assert!(matches!(terminal(&h.installer).await, InstallStage::Success { .. }));
        assert!(h.broker.created.lock().unwrap().is_empty());
        assert_eq!(*h.broker.committed.lock().unwrap(), vec![42]);
    }

    #[tokio::test]
    async fn installed_package_by_name_offers_package_action() {
        let dir = tempfile::tempdir().unwrap();
        let registry =
            FakeRegistry::default().with_package(installed_in(dir.path(), "com.example.app", 7));
        let h = Harness::broker(FakeBroker::new(registry));

        assert!(
            h.installer
                .precheck(SourceRequest::from_locator("package:com.example.app"))
                .await
        );
        assert!(matches!(
            h.installer.parse_source().await,
            InstallStage::PackageAction { .. }
        ));
    }

    #[tokio::test]
    async fn missing_package_by_name_is_not_found() {
        let h = Harness::broker(FakeBroker::new(FakeRegistry::default()));
        assert!(
            h.installer
                .precheck(SourceRequest::from_package_name("com.example.missing"))
                .await
        );
        assert_eq!(
            h.installer.parse_source().await.abort_reason(),
            Some(AbortReason::NotFound)
        );
    }

    #[tokio::test]
    async fn unrecognized_request_is_invalid_info() {
        let h = Harness::broker(FakeBroker::new(FakeRegistry::default()));
        for request in [
            SourceRequest::default(),
            SourceRequest::from_locator("https://example.com/app.apk"),
            SourceRequest::from_locator("market://details"),
        ] {
            assert!(h.installer.precheck(request).await);
            assert_eq!(
                h.installer.parse_source().await.abort_reason(),
                Some(AbortReason::InvalidInfo)
            );
        }
    }

    #[tokio::test]
    async fn unreadable_payload_is_parse_error() {
        let h = Harness::broker(FakeBroker::new(FakeRegistry::default()));
        let path = h.source("junk.apk", b"definitely not a zip");
        assert!(h.installer.precheck(SourceRequest::from_path(&path)).await);
        assert_eq!(
            h.installer.parse_source().await.abort_reason(),
            Some(AbortReason::ParseError)
        );
    }

    #[tokio::test]
    async fn no_backend_aborts_with_recovery() {
        let h = Harness::shell(FakeRegistry::default(), ScriptedProcess::default());
        assert!(!h.installer.precheck(SourceRequest::from_package_name("com.x")).await);
        match h.installer.current_stage() {
            Some(InstallStage::Aborted {
                reason: AbortReason::NoPrivilege,
                recovery: Some(LaunchRef::Url { url }),
            }) => assert!(url.starts_with("https://")),
            other => panic!("unexpected stage {other:?}"),
        }
        assert_eq!(h.installer.backend(), None);
        assert_eq!(
            h.installer.parse_source().await.abort_reason(),
            Some(AbortReason::NoPrivilege)
        );
    }

    #[tokio::test]
    async fn recovery_prefers_installed_broker_manager() {
        let registry = FakeRegistry::default().with_package(ExistingPackageInfo {
            package_id: "moe.shizuku.privileged.api".into(),
            installed: true,
            ..ExistingPackageInfo::default()
        });
        let h = Harness::shell(registry, ScriptedProcess::default());
        assert!(!h.installer.precheck(SourceRequest::default()).await);
        assert!(matches!(
            h.installer.current_stage(),
            Some(InstallStage::Aborted {
                recovery: Some(LaunchRef::Activity { .. }),
                ..
            })
        ));
    }

    #[tokio::test]
    async fn staged_progress_is_monotonic_and_ends_committing() {
        let broker = FakeBroker::new(FakeRegistry::default());
        let (tx, mut rx) = pkgi_events::channel();
        let h = Harness::broker(broker);
        let installer = Installer::new(
            (*h.installer.config).clone(),
            h.installer.host.clone(),
            Some(tx),
        );
        let path = h.source("app.apk", &fixture::payload("com.example.app", 1, None));

        assert!(installer.precheck(SourceRequest::from_path(&path)).await);
        installer.parse_source().await;
        installer.install(InstallContext::new()).await;
        terminal(&installer).await;

        let mut progress = Vec::new();
        let mut committed_after = None;
        while let Ok(event) = rx.try_recv() {
            match event {
                AppEvent::Install(InstallEvent::ProgressUpdated { value }) => progress.push(value),
                AppEvent::Install(InstallEvent::CommitRequested { .. }) => {
                    committed_after = progress.last().copied();
                }
                _ => {}
            }
        }
        assert!(progress.windows(2).all(|w| w[0] <= w[1]), "{progress:?}");
        assert_eq!(committed_after, Some(PROGRESS_COMMITTING));
    }

    #[tokio::test]
    async fn uncommitted_session_stays_until_cleanup() {
        let h = Harness::broker(FakeBroker::new(FakeRegistry::default()));
        let path = h.source("app.apk", &fixture::payload("com.example.app", 1, None));
        assert!(h.installer.precheck(SourceRequest::from_path(&path)).await);
        h.installer.parse_source().await;

        h.installer
            .install(InstallContext::new().with_commit(false))
            .await;
        assert_eq!(
            h.installer.current_stage().and_then(|s| s.abort_reason()),
            Some(AbortReason::UserClosed)
        );
        let id = h.installer.session_id().unwrap();
        assert!(h.broker.committed.lock().unwrap().is_empty());

        h.installer.cleanup_install().await;
        h.installer.cleanup_install().await;
        assert_eq!(*h.broker.abandoned.lock().unwrap(), vec![id]);
        assert_eq!(h.installer.session_id(), None);
    }

    #[tokio::test]
    async fn create_failure_aborts() {
        let h = Harness::broker(FakeBroker {
            fail_create: true,
            ..FakeBroker::new(FakeRegistry::default())
        });
        let path = h.source("app.apk", &fixture::payload("com.example.app", 1, None));
        assert!(h.installer.precheck(SourceRequest::from_path(&path)).await);
        h.installer.parse_source().await;
        h.installer.install(InstallContext::new()).await;
        assert_eq!(
            h.installer.current_stage().and_then(|s| s.abort_reason()),
            Some(AbortReason::CreateError)
        );
    }

    #[tokio::test]
    async fn write_failure_abandons_session() {
        let h = Harness::broker(FakeBroker {
            fail_write: true,
            ..FakeBroker::new(FakeRegistry::default())
        });
        let path = h.source("app.apk", &fixture::payload("com.example.app", 1, None));
        assert!(h.installer.precheck(SourceRequest::from_path(&path)).await);
        h.installer.parse_source().await;
        h.installer.install(InstallContext::new()).await;

        assert_eq!(
            h.installer.current_stage().and_then(|s| s.abort_reason()),
            Some(AbortReason::WriteError)
        );
        assert_eq!(h.broker.abandoned.lock().unwrap().len(), 1);
        assert_eq!(h.installer.session_id(), None);
    }

    #[tokio::test]
    async fn rejected_commit_passes_codes_through() {
        let h = Harness::broker(FakeBroker {
            commit_status: InstallStatus {
                status: 4,
                legacy_status: -7,
                message: Some("INSTALL_FAILED_UPDATE_INCOMPATIBLE".into()),
            },
            ..FakeBroker::new(FakeRegistry::default())
        });
        let path = h.source("app.apk", &fixture::payload("com.example.app", 1, None));
        assert!(h.installer.precheck(SourceRequest::from_path(&path)).await);
        h.installer.parse_source().await;
        h.installer.install(InstallContext::new()).await;

        match terminal(&h.installer).await {
            InstallStage::Failed {
                legacy_status,
                status,
                message,
                ..
            } => {
                assert_eq!((legacy_status, status), (-7, 4));
                assert_eq!(message.as_deref(), Some("INSTALL_FAILED_UPDATE_INCOMPATIBLE"));
            }
            other => panic!("unexpected stage {other:?}"),
        }
    }

    #[tokio::test]
    async fn remove_split_marks_session() {
        let dir = tempfile::tempdir().unwrap();
        let registry =
            FakeRegistry::default().with_package(installed_in(dir.path(), "com.example.app", 5));
        let h = Harness::broker(FakeBroker::new(registry));
        let path = h.source(
            "split.apk",
            &fixture::payload("com.example.app", 5, Some("config.en")),
        );
        assert!(h.installer.precheck(SourceRequest::from_path(&path)).await);
        h.installer.parse_source().await;
        h.installer
            .install(InstallContext::new().with_full_mode(false).with_remove_split(true))
            .await;

        assert!(matches!(terminal(&h.installer).await, InstallStage::Success { .. }));
        assert_eq!(*h.broker.removed_splits.lock().unwrap(), vec!["config.en"]);
        assert!(h.broker.slots.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn store_attribution_falls_back_when_store_is_not_system() {
        let h = Harness::broker(FakeBroker {
            caps: HostCapabilities {
                package_source: true,
                bypass_low_target_block: true,
                ..HostCapabilities::default()
            },
            ..FakeBroker::new(FakeRegistry::default())
        });
        let path = h.source("app.apk", &fixture::payload("com.example.app", 1, None));
        assert!(h.installer.precheck(SourceRequest::from_path(&path)).await);
        h.installer.parse_source().await;
        h.installer
            .install(InstallContext::new().with_set_installer(true))
            .await;
        terminal(&h.installer).await;

        let created = h.broker.created.lock().unwrap();
        let params = &created[0].1;
        assert_eq!(
            params.installer_package.as_deref(),
            Some(h.installer.config.fallback_installer.as_str())
        );
        assert_eq!(params.package_source, pkgi_types::PackageSource::Store);
        assert!(params
            .install_flags
            .contains(pkgi_types::InstallFlags::BYPASS_LOW_TARGET_SDK_BLOCK));
    }

    #[tokio::test]
    async fn known_package_without_payload_installs_existing() {
        let registry = FakeRegistry {
            known_flag: Some(0x0040_0000),
            ..FakeRegistry::default()
        }
        .with_package(ExistingPackageInfo {
            package_id: "com.example.app".into(),
            version_code: 3,
            installed: false,
            ..ExistingPackageInfo::default()
        });
        let h = Harness::broker(FakeBroker::new(registry));

        assert!(
            h.installer
                .precheck(SourceRequest::from_locator("package:com.example.app"))
                .await
        );
        assert!(matches!(
            h.installer.parse_source().await,
            InstallStage::UserAction { full_mode: true, .. }
        ));
        h.installer.install(InstallContext::new()).await;

        assert!(matches!(terminal(&h.installer).await, InstallStage::Success { .. }));
        assert!(h.registry.get("com.example.app").unwrap().installed);
        assert_eq!(*h.registry.flag_queries.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn missing_payload_with_archive_installs_from_archive() {
        let h = Harness::broker(FakeBroker::new(FakeRegistry::default()));
        let archives = h.installer.config.archive_dir.clone();
        std::fs::create_dir_all(&archives).unwrap();
        std::fs::write(
            archives.join("com.example.app-3.zip"),
            fixture::bundle(&[("base.apk", fixture::payload("com.example.app", 3, None))]),
        )
        .unwrap();
        h.registry.add(ExistingPackageInfo {
            package_id: "com.example.app".into(),
            version_code: 3,
            base_path: Some(PathBuf::from("/nonexistent/base.apk")),
            installed: true,
            ..ExistingPackageInfo::default()
        });

        assert!(
            h.installer
                .precheck(SourceRequest::from_locator("package:com.example.app"))
                .await
        );
        match h.installer.parse_source().await {
            InstallStage::UserAction { descriptor, .. } => assert!(descriptor.is_bundle),
            other => panic!("unexpected stage {other:?}"),
        }
        assert!(matches!(
            h.installer.source(),
            Some(SourceLocator::File(path)) if path.ends_with("com.example.app-3.zip")
        ));
        assert_eq!(
            h.installer.request().locator.as_deref(),
            Some("package:com.example.app")
        );
        h.installer.install(InstallContext::new()).await;
        assert!(matches!(terminal(&h.installer).await, InstallStage::Success { .. }));
        assert_eq!(h.broker.slot_names(), vec!["base.apk"]);
    }

    #[tokio::test(start_paused = true)]
    async fn verifier_gives_up_after_bound_but_still_succeeds() {
        let h = Harness::broker(FakeBroker::new(FakeRegistry::default()));
        let installer = Installer::new(
            (*h.installer.config)
                .clone()
                .with_verify(20, Duration::from_millis(150)),
            h.installer.host.clone(),
            None,
        );
        assert!(installer.precheck(SourceRequest::default()).await);

        let started = tokio::time::Instant::now();
        let info = installer
            .verify_and_finish(pkgi_types::PackageDescriptor::new("com.example.ghost", 1))
            .await;
        assert!(info.is_none());
        assert_eq!(started.elapsed(), Duration::from_millis(3000));
        assert!(matches!(
            installer.current_stage(),
            Some(InstallStage::Success { launch: None, .. })
        ));
    }

    #[tokio::test]
    async fn shell_installs_single_file() {
        let process = ScriptedProcess::rooted().on("pm install", output(0, "Success\n"));
        let h = Harness::shell(FakeRegistry::default(), process);
        let path = h.source("app.apk", &fixture::payload("com.example.app", 2, None));

        assert!(h.installer.precheck(SourceRequest::from_path(&path)).await);
        assert_eq!(h.installer.backend(), Some(PrivilegeBackend::ElevatedShell));
        h.installer.parse_source().await;
        h.installer
            .install(InstallContext::new().with_set_installer(true))
            .await;

        assert!(matches!(
            h.installer.current_stage(),
            Some(InstallStage::Success { .. })
        ));
        let expected = format!(
            "pm install -r -d -t --installer 'com.android.vending' '{}'",
            path.display()
        );
        assert_eq!(h.process.calls(), vec!["id".to_string(), expected]);
    }

    #[tokio::test]
    async fn shell_failure_line_becomes_message() {
        let process = ScriptedProcess::rooted().on(
            "pm install",
            output(1, "Performing Streamed Install\nFailure [INSTALL_FAILED_INVALID_APK]\n"),
        );
        let h = Harness::shell(FakeRegistry::default(), process);
        let path = h.source("app.apk", &fixture::payload("com.example.app", 2, None));
        assert!(h.installer.precheck(SourceRequest::from_path(&path)).await);
        h.installer.parse_source().await;
        h.installer.install(InstallContext::new()).await;

        match h.installer.current_stage() {
            Some(InstallStage::Failed {
                legacy_status,
                message,
                ..
            }) => {
                assert_eq!(legacy_status, pkgi_types::stage::INSTALL_FAILED_INTERNAL_ERROR);
                assert_eq!(message.as_deref(), Some("Failure [INSTALL_FAILED_INVALID_APK]"));
            }
            other => panic!("unexpected stage {other:?}"),
        }
    }

    #[tokio::test]
    async fn shell_bundle_extracts_and_clears_cache() {
        let process = ScriptedProcess::rooted().on("pm install-multiple", output(0, "Success"));
        let h = Harness::shell(FakeRegistry::default(), process);
        let path = h.source(
            "bundle.zip",
            &fixture::bundle(&[
                ("base.apk", fixture::payload("com.example.app", 2, None)),
                ("split_config.en.apk", fixture::payload("com.example.app", 2, Some("config.en"))),
            ]),
        );
        assert!(h.installer.precheck(SourceRequest::from_path(&path)).await);
        h.installer.parse_source().await;
        h.installer.install(InstallContext::new()).await;

        assert!(matches!(
            h.installer.current_stage(),
            Some(InstallStage::Success { .. })
        ));
        let calls = h.process.calls();
        let command = calls.last().unwrap();
        assert!(command.starts_with("pm install-multiple -r -d -t "));
        assert!(command.contains("base.apk"));
        assert!(command.contains("split_config.en.apk"));
        assert_eq!(std::fs::read_dir(h.cache_dir()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn shell_split_joins_installed_payloads() {
        let dir = tempfile::tempdir().unwrap();
        let mut existing = installed_in(dir.path(), "com.example.app", 5);
        existing.split_paths = vec![dir.path().join("split_config.de.apk")];
        let registry = FakeRegistry::default().with_package(existing);
        let process = ScriptedProcess::rooted().on("pm install-multiple", output(0, "Success"));
        let h = Harness::shell(registry, process);
        let path = h.source(
            "split_config.en.apk",
            &fixture::payload("com.example.app", 5, Some("config.en")),
        );

        assert!(h.installer.precheck(SourceRequest::from_path(&path)).await);
        h.installer.parse_source().await;
        h.installer.install(InstallContext::new()).await;

        let calls = h.process.calls();
        let command = calls.last().unwrap();
        let base = dir.path().join("base.apk");
        assert!(command.contains(&format!("'{}'", base.display())));
        assert!(command.contains("split_config.de.apk"));
        assert!(command.ends_with(&format!("'{}'", path.display())));
    }

    #[tokio::test]
    async fn shell_missing_source_fails() {
        let process = ScriptedProcess::rooted();
        let h = Harness::shell(FakeRegistry::default(), process);
        let path = h.source("app.apk", &fixture::payload("com.example.app", 2, None));
        assert!(h.installer.precheck(SourceRequest::from_path(&path)).await);
        h.installer.parse_source().await;
        std::fs::remove_file(&path).unwrap();
        h.installer.install(InstallContext::new()).await;

        match h.installer.current_stage() {
            Some(InstallStage::Failed { message, .. }) => {
                assert_eq!(message.as_deref(), Some("Source APK not found"));
            }
            other => panic!("unexpected stage {other:?}"),
        }
    }

    #[tokio::test]
    async fn commit_error_abandons_session_before_failing() {
        let broker = FakeBroker {
            fail_commit: true,
            ..FakeBroker::new(FakeRegistry::default())
        };
        let (tx, mut rx) = pkgi_events::channel();
        let h = Harness::broker(broker);
        let installer = Installer::new(
            (*h.installer.config).clone(),
            h.installer.host.clone(),
            Some(tx),
        );
        let path = h.source("app.apk", &fixture::payload("com.example.app", 1, None));
        assert!(installer.precheck(SourceRequest::from_path(&path)).await);
        installer.parse_source().await;
        installer.install(InstallContext::new()).await;

        match installer.current_stage() {
            Some(InstallStage::Failed {
                legacy_status,
                message,
                ..
            }) => {
                assert_eq!(legacy_status, pkgi_types::stage::INSTALL_FAILED_INTERNAL_ERROR);
                assert!(message.unwrap_or_default().contains("session sealed"));
            }
            other => panic!("unexpected stage {other:?}"),
        }
        let created = h.broker.created.lock().unwrap()[0].0;
        assert_eq!(*h.broker.committed.lock().unwrap(), Vec::<SessionId>::new());
        assert_eq!(*h.broker.abandoned.lock().unwrap(), vec![created]);
        assert_eq!(installer.session_id(), None);

        let mut abandoned_at = None;
        let mut failed_at = None;
        let mut index = 0;
        while let Ok(event) = rx.try_recv() {
            match event {
                AppEvent::Install(InstallEvent::SessionAbandoned { session_id }) => {
                    assert_eq!(session_id, created);
                    abandoned_at = Some(index);
                }
                AppEvent::Install(InstallEvent::StageChanged { stage, .. }) if stage == "failed" => {
                    failed_at = Some(index);
                }
                _ => {}
            }
            index += 1;
        }
        assert!(abandoned_at.unwrap() < failed_at.unwrap());
    }

    #[tokio::test]
    async fn market_link_resolves_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let registry =
            FakeRegistry::default().with_package(installed_in(dir.path(), "com.example.app", 7));
        let h = Harness::broker(FakeBroker::new(registry));

        assert!(
            h.installer
                .precheck(SourceRequest::from_locator(
                    "market://details?id=com.example.app"
                ))
                .await
        );
        match h.installer.parse_source().await {
            InstallStage::PackageAction {
                descriptor,
                existing,
            } => {
                assert_eq!(descriptor.package_id, "com.example.app");
                assert_eq!(existing.version_code, 7);
            }
            other => panic!("unexpected stage {other:?}"),
        }
        assert_eq!(h.installer.source(), None);

        assert!(
            h.installer
                .precheck(SourceRequest::from_locator(
                    "market://details?id=com.example.missing"
                ))
                .await
        );
        assert_eq!(
            h.installer.parse_source().await.abort_reason(),
            Some(AbortReason::NotFound)
        );
    }

    #[tokio::test]
    async fn shell_known_package_installs_existing() {
        let registry = FakeRegistry::default().with_package(ExistingPackageInfo {
            package_id: "com.example.app".into(),
            version_code: 3,
            installed: false,
            ..ExistingPackageInfo::default()
        });
        let h = Harness::shell(registry, ScriptedProcess::rooted());

        assert!(
            h.installer
                .precheck(SourceRequest::from_locator("package:com.example.app"))
                .await
        );
        assert_eq!(h.installer.backend(), Some(PrivilegeBackend::ElevatedShell));
        assert!(matches!(
            h.installer.parse_source().await,
            InstallStage::UserAction { .. }
        ));
        h.installer.install(InstallContext::new()).await;

        assert!(matches!(
            h.installer.current_stage(),
            Some(InstallStage::Success { .. })
        ));
        assert!(h.registry.get("com.example.app").unwrap().installed);
        assert!(!h.process.calls().iter().any(|call| call.starts_with("pm install ")));
    }

    #[tokio::test]
    async fn shell_remove_split_reinstalls_remaining_payloads() {
        let dir = tempfile::tempdir().unwrap();
        let mut existing = installed_in(dir.path(), "com.example.app", 5);
        existing.split_paths = vec![
            dir.path().join("split_config.en.apk"),
            dir.path().join("split_config.de.apk"),
        ];
        let registry = FakeRegistry::default().with_package(existing);
        let process = ScriptedProcess::rooted().on("pm install-multiple", output(0, "Success"));
        let h = Harness::shell(registry, process);
        let path = h.source(
            "incoming.apk",
            &fixture::payload("com.example.app", 5, Some("config.en")),
        );

        assert!(h.installer.precheck(SourceRequest::from_path(&path)).await);
        h.installer.parse_source().await;
        h.installer
            .install(InstallContext::new().with_full_mode(false).with_remove_split(true))
            .await;

        assert!(matches!(
            h.installer.current_stage(),
            Some(InstallStage::Success { .. })
        ));
        let calls = h.process.calls();
        let command = calls.last().unwrap();
        let base = dir.path().join("base.apk");
        assert!(command.starts_with("pm install-multiple -r -d -t "));
        assert!(command.contains(&format!("'{}'", base.display())));
        assert!(command.contains("split_config.de.apk"));
        assert!(!command.contains("split_config.en.apk"));
        assert!(!command.contains("incoming.apk"));
    }

    #[tokio::test]
    async fn archive_then_uninstall_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let existing = installed_in(dir.path(), "com.example.app", 7);
        let h = Harness::broker(FakeBroker::new(
            FakeRegistry::default().with_package(existing.clone()),
        ));
        assert!(h.installer.precheck(SourceRequest::default()).await);

        h.installer
            .archive_package(existing, ArchiveContext::new().with_also_uninstall(true))
            .await;

        match h.installer.current_stage() {
            Some(InstallStage::Success {
                launch: Some(LaunchRef::View { path, mime }),
                archive_path: Some(archive_path),
                ..
            }) => {
                assert_eq!(mime, "application/zip");
                assert_eq!(archive_path, path.display().to_string());
                assert!(path.ends_with("com.example.app-7.zip"));
            }
            other => panic!("unexpected stage {other:?}"),
        }
        assert_eq!(
            *h.broker.uninstalled.lock().unwrap(),
            vec![("com.example.app".to_string(), DeleteFlags::KEEP_DATA)]
        );
        assert_eq!(
            *h.broker.cache_cleared.lock().unwrap(),
            vec![("com.example.app".to_string(), 10)]
        );
    }

    #[tokio::test]
    async fn archive_prefers_native_call() {
        let dir = tempfile::tempdir().unwrap();
        let existing = installed_in(dir.path(), "com.example.app", 7);
        let h = Harness::broker(FakeBroker {
            caps: HostCapabilities {
                native_archive: true,
                ..HostCapabilities::default()
            },
            archive_status: Some(InstallStatus::success()),
            ..FakeBroker::new(FakeRegistry::default())
        });
        assert!(h.installer.precheck(SourceRequest::default()).await);
        h.installer
            .archive_package(existing, ArchiveContext::new().with_also_uninstall(true))
            .await;

        assert_eq!(*h.broker.archived.lock().unwrap(), vec!["com.example.app"]);
        assert!(h.broker.uninstalled.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_uninstall_is_appended_to_archive_path() {
        let dir = tempfile::tempdir().unwrap();
        let existing = installed_in(dir.path(), "com.example.app", 7);
        let h = Harness::broker(FakeBroker {
            uninstall_status: InstallStatus::internal_error("DELETE_FAILED_INTERNAL_ERROR"),
            ..FakeBroker::new(FakeRegistry::default())
        });
        assert!(h.installer.precheck(SourceRequest::default()).await);
        h.installer
            .archive_package(existing, ArchiveContext::new().with_also_uninstall(true))
            .await;

        match h.installer.current_stage() {
            Some(InstallStage::Success {
                archive_path: Some(archive_path),
                ..
            }) => assert!(archive_path.ends_with(".zip\n\nDELETE_FAILED_INTERNAL_ERROR")),
            other => panic!("unexpected stage {other:?}"),
        }
    }

    #[tokio::test]
    async fn archive_write_failure_aborts() {
        let h = Harness::broker(FakeBroker::new(FakeRegistry::default()));
        let existing = ExistingPackageInfo {
            package_id: "com.example.app".into(),
            version_code: 1,
            base_path: Some(PathBuf::from("/nonexistent/base.apk")),
            ..ExistingPackageInfo::default()
        };
        h.installer
            .archive_package(existing, ArchiveContext::new())
            .await;
        assert_eq!(
            h.installer.current_stage().and_then(|s| s.abort_reason()),
            Some(AbortReason::WriteError)
        );
    }

    #[tokio::test]
    async fn shell_archive_uninstalls_with_pm() {
        let dir = tempfile::tempdir().unwrap();
        let existing = installed_in(dir.path(), "com.example.app", 7);
        let process = ScriptedProcess::rooted().on("pm uninstall", output(0, "Success"));
        let h = Harness::shell(FakeRegistry::default(), process);
        assert!(h.installer.precheck(SourceRequest::default()).await);
        h.installer
            .archive_package(existing, ArchiveContext::new().with_also_uninstall(true))
            .await;

        assert!(h
            .process
            .calls()
            .contains(&"pm uninstall -k 'com.example.app'".to_string()));
        assert!(matches!(
            h.installer.current_stage(),
            Some(InstallStage::Success { archive_path: Some(p), .. }) if !p.contains("\n\n")
        ));
    }

    #[tokio::test]
    async fn enable_and_disable_through_backend() {
        let h = Harness::broker(FakeBroker::new(FakeRegistry::default()));
        assert!(matches!(
            h.installer.set_package_enabled("com.example.app", false).await,
            Err(Error::Install(InstallError::NoPrivilege))
        ));

        assert!(h.installer.precheck(SourceRequest::default()).await);
        h.installer
            .set_package_enabled("com.example.app", false)
            .await
            .unwrap();
        assert_eq!(
            *h.broker.enabled.lock().unwrap(),
            vec![("com.example.app".to_string(), EnabledState::DisabledUser)]
        );

        let process = ScriptedProcess::rooted()
            .on("pm enable", output(0, "Package com.example.app new state: enabled"))
            .on("pm disable-user", output(1, ""));
        let h = Harness::shell(FakeRegistry::default(), process);
        assert!(h.installer.precheck(SourceRequest::default()).await);
        h.installer
            .set_package_enabled("com.example.app", true)
            .await
            .unwrap();
        assert!(h
            .installer
            .set_package_enabled("com.example.app", false)
            .await
            .is_err());
    }
}
