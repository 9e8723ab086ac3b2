//! Upload session: select an archive, validate it, preview it, install it

use crate::archive::{ArchiveError, ArchiveStructure, ArchiveValidator, SelectedArchive};
use crate::installer::{InstallResult, PluginInstaller};
use crate::notify::{keys, Notification, Notifier};
use crate::utils::{describe_error, UNKNOWN_ERROR};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Identifies one archive selection; only the latest selection may complete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionTicket(u64);

/// Where the session is in the upload flow
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UploadState {
    #[default]
    Idle,
    Validating {
        selected: SelectedArchive,
    },
    Validated {
        selected: SelectedArchive,
        structure: ArchiveStructure,
    },
    Invalid {
        selected: SelectedArchive,
        error: String,
    },
}

#[derive(Debug, Default)]
struct SessionInner {
    next_ticket: u64,
    latest: Option<u64>,
    state: UploadState,
    is_installing: bool,
}

/// Clears `is_installing` when the install finishes or its future is dropped
struct InstallingGuard<'a> {
    session: &'a UploadSession,
}

impl Drop for InstallingGuard<'_> {
    fn drop(&mut self) {
        self.session.lock().is_installing = false;
    }
}

/// State of one upload dialog
#[derive(Debug, Default)]
pub struct UploadSession {
    inner: Mutex<SessionInner>,
}

impl UploadSession {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start validating a newly selected archive, superseding any earlier selection
    pub fn begin_selection(&self, selected: SelectedArchive) -> SelectionTicket {
        let mut inner = self.lock();
        inner.next_ticket += 1;
        let ticket = inner.next_ticket;
        inner.latest = Some(ticket);

        debug!("Validating {} (selection {})", selected.file_name, ticket);
        inner.state = UploadState::Validating { selected };
        SelectionTicket(ticket)
    }

    /// Store a validation result. Returns `false` and discards the result when
    /// a newer selection has been made or the session was reset.
    pub fn complete_selection(
        &self,
        ticket: SelectionTicket,
        result: Result<ArchiveStructure, ArchiveError>,
    ) -> bool {
        let mut inner = self.lock();
        if inner.latest != Some(ticket.0) {
            debug!("Discarding stale validation result for selection {}", ticket.0);
            return false;
        }

        let selected = match std::mem::take(&mut inner.state) {
            UploadState::Validating { selected } => selected,
            other => {
                inner.state = other;
                return false;
            }
        };

        inner.state = match result {
            Ok(structure) => UploadState::Validated {
                selected,
                structure,
            },
            Err(e) => {
                warn!("Plugin archive {} is invalid: {}", selected.file_name, e);
                UploadState::Invalid {
                    selected,
                    error: describe_error(&e),
                }
            }
        };
        true
    }

    /// Select and validate in one step
    pub async fn select(
        &self,
        validator: &ArchiveValidator,
        selected: SelectedArchive,
    ) -> Result<ArchiveStructure, String> {
        let bytes = selected.bytes.clone();
        let ticket = self.begin_selection(selected);
        let result = validator.validate(bytes).await;
        let outcome = match &result {
            Ok(structure) => Ok(structure.clone()),
            Err(e) => Err(describe_error(e)),
        };
        self.complete_selection(ticket, result);
        outcome
    }

    pub fn state(&self) -> UploadState {
        self.lock().state.clone()
    }

    /// Structure of the validated archive, for preview
    pub fn preview(&self) -> Option<ArchiveStructure> {
        match &self.lock().state {
            UploadState::Validated { structure, .. } => Some(structure.clone()),
            _ => None,
        }
    }

    /// Inline validation error, if the selected archive is invalid
    pub fn validation_error(&self) -> Option<String> {
        match &self.lock().state {
            UploadState::Invalid { error, .. } => Some(error.clone()),
            _ => None,
        }
    }

    pub fn is_installing(&self) -> bool {
        self.lock().is_installing
    }

    /// A validated archive is ready and no install is running
    pub fn can_install(&self) -> bool {
        let inner = self.lock();
        !inner.is_installing && matches!(inner.state, UploadState::Validated { .. })
    }

    /// Install the validated archive.
    ///
    /// Returns `None` when nothing can be installed. On success the session
    /// resets; on failure it keeps the archive so the install can be retried.
    pub async fn install(
        &self,
        installer: &PluginInstaller,
        notifier: &dyn Notifier,
    ) -> Option<InstallResult> {
        let (selected, structure) = {
            let mut inner = self.lock();
            if inner.is_installing {
                debug!("Install already running");
                return None;
            }
            let UploadState::Validated {
                selected,
                structure,
            } = &inner.state
            else {
                return None;
            };
            let pair = (selected.clone(), structure.clone());
            inner.is_installing = true;
            pair
        };

        let guard = InstallingGuard { session: self };
        let result = installer.install(Some(&selected), Some(&structure)).await;
        drop(guard);

        let result = result?;
        if result.success {
            let message = format!(
                "Plugin uploaded successfully! ({} components) - You can now install it from the plugin list.",
                result.installed_components.join(", ")
            );
            info!("{}", message);
            notifier.notify(Notification::success(keys::PLUGIN_UPLOADED).with_detail(message));
            self.reset();
        } else {
            let error = result.error.clone().unwrap_or_else(|| UNKNOWN_ERROR.to_string());
            notifier.notify(Notification::error(keys::UPLOAD_FAILED).with_detail(error));
        }

        Some(result)
    }

    /// Clear the selection and any pending validation
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.latest = None;
        inner.state = UploadState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::inspect_archive;
    use crate::installer::PluginFileService;
    use crate::notify::NotificationLevel;
    use crate::testing::{ArchiveBuilder, FailingCatalog, RecordingNotifier};
    use async_trait::async_trait;
    use plugin_catalog::{
        CatalogResult, FileCatalog, InstalledPluginRecord, PluginCatalog, PluginUpdate,
    };
    use std::sync::Arc;
    use tempfile::TempDir;
    use tokio::sync::Notify;

    /// Catalog whose record creation never completes
    #[derive(Default)]
    struct StallingCatalog {
        stalled: Notify,
    }

    #[async_trait]
    impl PluginCatalog for StallingCatalog {
        async fn get_all_plugins(&self) -> CatalogResult<Vec<InstalledPluginRecord>> {
            Ok(Vec::new())
        }

        async fn create_plugin(&self, _plugin_id: &str) -> CatalogResult<InstalledPluginRecord> {
            self.stalled.notify_one();
            std::future::pending().await
        }

        async fn update_plugin(
            &self,
            _id: &str,
            _update: PluginUpdate,
        ) -> CatalogResult<InstalledPluginRecord> {
            std::future::pending().await
        }

        async fn delete_plugin(&self, _id: &str) -> CatalogResult<()> {
            std::future::pending().await
        }
    }

    fn archive(plugin_id: &str) -> SelectedArchive {
        let bytes = ArchiveBuilder::new()
            .admin_plugin(plugin_id)
            .build()
            .unwrap();
        SelectedArchive::new(format!("{plugin_id}.zip"), bytes)
    }

    fn installer(
        temp_dir: &TempDir,
        catalog: Arc<dyn plugin_catalog::PluginCatalog>,
    ) -> PluginInstaller {
        let files = Arc::new(PluginFileService::new(
            temp_dir.path().join("admin"),
            temp_dir.path().join("api"),
        ));
        PluginInstaller::new(files, catalog)
    }

    #[test]
    fn test_stale_validation_is_discarded() {
        let session = UploadSession::new();
        let first = archive("FirstPlugin");
        let second = archive("SecondPlugin");

        let first_ticket = session.begin_selection(first.clone());
        let second_ticket = session.begin_selection(second.clone());

        assert!(session.complete_selection(second_ticket, inspect_archive(&second.bytes)));
        assert!(!session.complete_selection(first_ticket, inspect_archive(&first.bytes)));

        let preview = session.preview().unwrap();
        assert_eq!(preview.plugin_id(), Some("SecondPlugin"));
    }

    #[test]
    fn test_result_after_reset_is_discarded() {
        let session = UploadSession::new();
        let selected = archive("TestPlugin");

        let ticket = session.begin_selection(selected.clone());
        session.reset();

        assert!(!session.complete_selection(ticket, inspect_archive(&selected.bytes)));
        assert_eq!(session.state(), UploadState::Idle);
    }

    #[tokio::test]
    async fn test_invalid_archive_disables_install() {
        let session = UploadSession::new();
        let err = session
            .select(
                &ArchiveValidator::new(),
                SelectedArchive::new("broken.zip", b"not a zip".to_vec()),
            )
            .await
            .unwrap_err();

        assert!(err.starts_with("Failed to read plugin archive"));
        assert_eq!(session.validation_error(), Some(err));
        assert!(!session.can_install());
    }

    #[tokio::test]
    async fn test_install_success_notifies_and_resets() {
        let temp_dir = TempDir::new().unwrap();
        let installer = installer(&temp_dir, Arc::new(FileCatalog::in_memory()));
        let notifier = RecordingNotifier::new();
        let session = UploadSession::new();

        session
            .select(&ArchiveValidator::new(), archive("TestPlugin"))
            .await
            .unwrap();
        assert!(session.can_install());

        let result = session.install(&installer, &notifier).await.unwrap();

        assert!(result.success);
        assert_eq!(session.state(), UploadState::Idle);
        let notifications = notifier.notifications();
        assert_eq!(notifications[0].key, keys::PLUGIN_UPLOADED);
        assert_eq!(
            notifications[0].detail.as_deref(),
            Some("Plugin uploaded successfully! (Admin Dashboard Components components) - You can now install it from the plugin list.")
        );
    }

    #[tokio::test]
    async fn test_install_failure_keeps_selection() {
        let temp_dir = TempDir::new().unwrap();
        let catalog = Arc::new(FailingCatalog::new("service offline"));
        catalog.set_failing(true);
        let installer = installer(&temp_dir, catalog);
        let notifier = RecordingNotifier::new();
        let session = UploadSession::new();

        session
            .select(&ArchiveValidator::new(), archive("TestPlugin"))
            .await
            .unwrap();
        let result = session.install(&installer, &notifier).await.unwrap();

        assert!(!result.success);
        assert!(session.can_install());
        let notifications = notifier.notifications();
        assert_eq!(notifications[0].level, NotificationLevel::Error);
        assert_eq!(notifications[0].key, keys::UPLOAD_FAILED);
    }

    #[tokio::test]
    async fn test_install_without_validated_archive() {
        let temp_dir = TempDir::new().unwrap();
        let installer = installer(&temp_dir, Arc::new(FileCatalog::in_memory()));
        let notifier = RecordingNotifier::new();

        assert!(UploadSession::new()
            .install(&installer, &notifier)
            .await
            .is_none());
        assert!(notifier.notifications().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_install_clears_installing_flag() {
        let temp_dir = TempDir::new().unwrap();
        let catalog = Arc::new(StallingCatalog::default());
        let installer = installer(&temp_dir, catalog.clone());
        let notifier = RecordingNotifier::new();
        let session = UploadSession::new();

        session
            .select(&ArchiveValidator::new(), archive("TestPlugin"))
            .await
            .unwrap();

        tokio::select! {
            _ = session.install(&installer, &notifier) => panic!("install should stall"),
            _ = catalog.stalled.notified() => {}
        }

        assert!(!session.is_installing());
        assert!(session.can_install());
        assert!(notifier.notifications().is_empty());
    }
}
