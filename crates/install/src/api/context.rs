/// Options for [`Installer::install`](crate::Installer::install)
#[derive(Clone, Debug)]
pub struct InstallContext {
    /// Record the store (or shell) identity as installer
    pub set_installer: bool,
    /// Commit after staging; otherwise the session stays staged
    pub commit: bool,
    /// Replace the whole package instead of inheriting existing parts
    pub full_mode: bool,
    /// Remove the resolved split instead of writing payloads
    pub remove_split: bool,
}

context_builder! {
    InstallContext {
        set_installer: bool = false,
        commit: bool = true,
        full_mode: bool = true,
        remove_split: bool = false,
    }
}

/// Options for [`Installer::archive_package`](crate::Installer::archive_package)
#[derive(Clone, Debug)]
pub struct ArchiveContext {
    /// Uninstall (keeping data) once the archive is written
    pub also_uninstall: bool,
}

context_builder! {
    ArchiveContext {
        also_uninstall: bool = false,
    }
}
