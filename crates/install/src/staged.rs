//! Staged install driver
//!
//! create session → write payloads → commit, with the commit outcome
//! delivered asynchronously through a one-shot status channel.

use pkgi_errors::{Error, InstallError};
use pkgi_events::{AppEvent, EventEmitter, InstallEvent, PROGRESS_COMMITTING};
use pkgi_types::{
    AbortReason, InstallFlags, InstallReason, InstallStage, InstallStatus, PackageDescriptor,
    PackageSource, SessionId, SessionMode, SessionParams, SourceLocator,
};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::broker::PackageBroker;
use crate::payload::{stage_bundle, stage_single};
use crate::status::status_channel;
use crate::{InstallContext, Installer};

impl Installer {
    pub(crate) async fn staged_install(
        &self,
        descriptor: PackageDescriptor,
        locator: SourceLocator,
        ctx: &InstallContext,
    ) {
        let broker = Arc::clone(&self.host.broker);

        let session_id = match self.session_id() {
            Some(id) => id,
            None => {
                let params = self.session_params(broker.as_ref(), &descriptor, ctx).await;
                match broker.create_session(params).await {
                    Ok(id) => {
                        self.set_session_id(id);
                        self.emit(AppEvent::Install(InstallEvent::SessionCreated {
                            session_id: id,
                            package: descriptor.package_id.clone(),
                        }));
                        id
                    }
                    Err(e) => {
                        warn!(package = %descriptor.package_id, error = %e, "failed to create staging session");
                        self.emitter
                            .publish(InstallStage::aborted(AbortReason::CreateError));
                        return;
                    }
                }
            }
        };

        self.emitter.set_progress(0);
        if let Err(e) = self
            .write_session(broker.as_ref(), session_id, &descriptor, locator, ctx.remove_split)
            .await
        {
            warn!(session_id, error = %e, "could not stage payload");
            self.cleanup_install().await;
            self.emitter
                .publish(InstallStage::aborted(AbortReason::WriteError));
            return;
        }

        if !ctx.commit {
            debug!(session_id, "leaving session staged");
            self.emitter
                .publish(InstallStage::aborted(AbortReason::UserClosed));
            return;
        }

        self.emitter.set_progress(PROGRESS_COMMITTING);
        self.commit(broker, session_id, descriptor).await;
    }

    /// Session parameters for a new staged session
    pub(crate) async fn session_params(
        &self,
        broker: &dyn PackageBroker,
        descriptor: &PackageDescriptor,
        ctx: &InstallContext,
    ) -> SessionParams {
        let caps = broker.capabilities();
        let mut params = SessionParams::new(SessionMode::from_full(ctx.full_mode));

        if ctx.set_installer {
            let store = &self.config.store_installer;
            let installer = if broker.is_system_package(store).await {
                store.clone()
            } else {
                self.config.fallback_installer.clone()
            };
            params.installer_package = Some(installer);
            if caps.package_source {
                params.package_source = PackageSource::Store;
            }
        } else {
            let (request, calling_uid) = {
                let state = self.state();
                (state.request.clone(), state.calling_uid)
            };
            if caps.package_source {
                params.package_source = if request.referrer.is_some() {
                    PackageSource::DownloadedFile
                } else {
                    PackageSource::LocalFile
                };
            }
            params.referrer = request.referrer;
            params.originating_uri = request.originating_uri;
            params.originating_uid = request.originating_uid.or(calling_uid);
            params.installer_package = Some(self.config.self_package.clone());
        }

        params.install_reason = InstallReason::User;
        params.app_package_name = Some(descriptor.package_id.clone());
        if descriptor.is_multi_part() {
            params.app_label.clone_from(&descriptor.label);
            params.app_icon.clone_from(&descriptor.icon);
        }

        params.install_flags = InstallFlags::ALLOW_TEST
            | InstallFlags::REPLACE_EXISTING
            | InstallFlags::REQUEST_DOWNGRADE
            | InstallFlags::FULL_APP;
        if caps.bypass_low_target_block {
            params.install_flags |= InstallFlags::BYPASS_LOW_TARGET_SDK_BLOCK;
        }
        if caps.request_update_ownership {
            params.install_flags |= InstallFlags::REQUEST_UPDATE_OWNERSHIP;
        }
        params
    }

    async fn write_session(
        &self,
        broker: &dyn PackageBroker,
        session_id: SessionId,
        descriptor: &PackageDescriptor,
        locator: SourceLocator,
        remove_split: bool,
    ) -> Result<(), Error> {
        let mut session = broker.open_session(session_id).await?;

        if remove_split {
            let split = descriptor
                .split_name
                .clone()
                .ok_or_else(|| InstallError::StagingFailed {
                    message: format!("{} has no split to remove", descriptor.package_id),
                })?;
            return tokio::task::spawn_blocking(move || session.remove_split(&split))
                .await
                .map_err(|e| InstallError::TaskError {
                    message: e.to_string(),
                })?;
        }

        let content = Arc::clone(&self.host.content);
        let emitter = self.emitter.clone();
        let bundle = descriptor.is_bundle;
        let staged = tokio::task::spawn_blocking(move || {
            let file = content.open(&locator)?;
            let report = |percent: u8| emitter.set_progress(percent);
            if bundle {
                stage_bundle(file, session.as_mut(), report)
            } else {
                stage_single(file, session.as_mut(), report)
            }
        })
        .await
        .map_err(|e| InstallError::TaskError {
            message: e.to_string(),
        })??;

        for (name, bytes) in staged {
            self.emit(AppEvent::Install(InstallEvent::PayloadStaged { name, bytes }));
        }
        Ok(())
    }

    /// Request the commit and hand the outcome to a background task
    async fn commit(
        &self,
        broker: Arc<dyn PackageBroker>,
        session_id: SessionId,
        descriptor: PackageDescriptor,
    ) {
        let (tx, rx) = status_channel();
        self.emit(AppEvent::Install(InstallEvent::CommitRequested { session_id }));

        if let Err(e) = broker.commit_session(session_id, tx).await {
            warn!(session_id, error = %e, "failed to commit staged session");
            self.cleanup_install().await;
            self.emitter.publish(InstallStage::failed(
                descriptor,
                InstallStatus::internal_error(e.to_string()),
            ));
            return;
        }

        // The session now belongs to the registry
        self.set_session_id(pkgi_types::INVALID_SESSION_ID);

        let installer = self.clone();
        tokio::spawn(async move {
            let status = rx.recv().await;
            installer.finish_with_status(descriptor, status).await;
        });
    }

    /// Map a backend status onto the terminal stage
    pub(crate) async fn finish_with_status(
        &self,
        descriptor: PackageDescriptor,
        status: InstallStatus,
    ) {
        if status.is_success() {
            self.verify_and_finish(descriptor).await;
        } else {
            self.emitter.publish(InstallStage::failed(descriptor, status));
        }
    }

    /// Make a known package available without staging (install-existing)
    pub(crate) async fn install_existing(&self, descriptor: PackageDescriptor) {
        self.emitter.set_progress(PROGRESS_COMMITTING);
        match self
            .registry()
            .install_existing(&descriptor.package_id, InstallReason::User)
            .await
        {
            Ok(()) => {
                self.verify_and_finish(descriptor).await;
            }
            Err(e) => {
                warn!(package = %descriptor.package_id, error = %e, "install-existing failed");
                self.emitter.publish(InstallStage::failed(
                    descriptor,
                    InstallStatus::internal_error(e.to_string()),
                ));
            }
        }
    }
}
