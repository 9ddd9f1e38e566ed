//! Query and mutation surface used by the console views.
//!
//! Reads go through the [`QueryClient`] under stable keys; every mutation
//! invalidates the keys whose data it changed so pollers refetch at once.

use std::future::Future;
use std::sync::Arc;

use tracing::info;
use urbackup_api_models::{
    BackupFilesResponse, BackupId, BackupType, BackupsClientsResponse, ClientBackupsResponse,
    ClientId, PieGraphResponse, ProgressResponse, StartBackupResponse, StatusResponse,
    UsageGraphResponse, UsageGraphScale, UsageResponse, UsersResponse,
};

use crate::api::UrBackupServer;
use crate::error::ApiResult;
use crate::query::{QueryClient, QueryKey, QueryOptions, QueryWatch};

/// Server handle paired with the shared query cache.
#[derive(Debug, Clone)]
pub struct Console {
    server: Arc<UrBackupServer>,
    queries: QueryClient,
}

impl Console {
    /// Console over `server` with an empty cache.
    #[must_use]
    pub fn new(server: UrBackupServer) -> Self {
        Self {
            server: Arc::new(server),
            queries: QueryClient::new(),
        }
    }

    /// Underlying server handle.
    #[must_use]
    pub fn server(&self) -> &UrBackupServer {
        &self.server
    }

    /// Shared query cache.
    #[must_use]
    pub const fn queries(&self) -> &QueryClient {
        &self.queries
    }

    async fn query<T, F, Fut>(&self, key: QueryKey, call: F) -> ApiResult<T>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn(Arc<UrBackupServer>) -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        let server = Arc::clone(&self.server);
        self.queries
            .fetch(&key, || call(Arc::clone(&server)))
            .await
    }

    fn watch<T, F, Fut>(&self, key: QueryKey, options: QueryOptions, call: F) -> QueryWatch<T>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn(Arc<UrBackupServer>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ApiResult<T>> + Send + 'static,
    {
        let server = Arc::clone(&self.server);
        self.queries
            .watch(key, options, move || call(Arc::clone(&server)))
    }

    fn invalidate(&self, keys: &[QueryKey]) {
        for key in keys {
            self.queries.invalidate(key);
        }
    }

    /// Client status overview (`["status"]`).
    ///
    /// # Errors
    ///
    /// Propagates server errors.
    pub async fn status(&self) -> ApiResult<StatusResponse> {
        self.query(QueryKey::status(), |server| async move { server.status().await })
            .await
    }

    /// Poll the status overview.
    #[must_use]
    pub fn watch_status(&self, options: QueryOptions) -> QueryWatch<StatusResponse> {
        self.watch(QueryKey::status(), options, |server| async move {
            server.status().await
        })
    }

    /// Running processes and recent activities (`["progress"]`).
    ///
    /// # Errors
    ///
    /// Propagates server errors.
    pub async fn progress(&self) -> ApiResult<ProgressResponse> {
        self.query(QueryKey::progress(), |server| async move {
            server.progress(true).await
        })
        .await
    }

    /// Poll running processes and recent activities.
    #[must_use]
    pub fn watch_progress(&self, options: QueryOptions) -> QueryWatch<ProgressResponse> {
        self.watch(QueryKey::progress(), options, |server| async move {
            server.progress(true).await
        })
    }

    /// Clients with browsable backups (`["backups"]`).
    ///
    /// # Errors
    ///
    /// Propagates server errors.
    pub async fn backups_clients(&self) -> ApiResult<BackupsClientsResponse> {
        self.query(QueryKey::backups_clients(), |server| async move {
            server.backups_clients().await
        })
        .await
    }

    /// Stored backups of one client (`["backups", clientid]`).
    ///
    /// # Errors
    ///
    /// Propagates server errors.
    pub async fn client_backups(&self, clientid: ClientId) -> ApiResult<ClientBackupsResponse> {
        self.query(QueryKey::client_backups(clientid), move |server| async move {
            server.client_backups(clientid).await
        })
        .await
    }

    /// Poll the backups of one client.
    #[must_use]
    pub fn watch_client_backups(
        &self,
        clientid: ClientId,
        options: QueryOptions,
    ) -> QueryWatch<ClientBackupsResponse> {
        self.watch(
            QueryKey::client_backups(clientid),
            options,
            move |server| async move { server.client_backups(clientid).await },
        )
    }

    /// Directory listing inside a backup.
    ///
    /// # Errors
    ///
    /// Propagates server errors.
    pub async fn files(
        &self,
        clientid: ClientId,
        backupid: BackupId,
        path: &str,
    ) -> ApiResult<BackupFilesResponse> {
        let path = path.to_string();
        self.query(
            QueryKey::backup_files(clientid, backupid, &path),
            move |server| {
                let path = path.clone();
                async move { server.files(clientid, backupid, &path).await }
            },
        )
        .await
    }

    /// Users visible to the session (`["users"]`).
    ///
    /// # Errors
    ///
    /// Propagates server errors.
    pub async fn users(&self) -> ApiResult<UsersResponse> {
        self.query(QueryKey::users(), |server| async move { server.users().await })
            .await
    }

    /// Storage used per client (`["storage-usage"]`).
    ///
    /// # Errors
    ///
    /// Propagates server errors.
    pub async fn usage(&self) -> ApiResult<UsageResponse> {
        self.query(QueryKey::storage_usage(), |server| async move {
            server.usage().await
        })
        .await
    }

    /// Storage allocation chart (`["client-storage-usage"]`).
    ///
    /// # Errors
    ///
    /// Propagates server errors.
    pub async fn piegraph(&self) -> ApiResult<PieGraphResponse> {
        self.query(QueryKey::client_storage_usage(), |server| async move {
            server.piegraph().await
        })
        .await
    }

    /// Storage usage history (`["usage-graph", scale, clientid?]`).
    ///
    /// # Errors
    ///
    /// Propagates server errors.
    pub async fn usagegraph(
        &self,
        scale: UsageGraphScale,
        clientid: Option<ClientId>,
    ) -> ApiResult<UsageGraphResponse> {
        self.query(
            QueryKey::usage_graph(scale.as_str(), clientid),
            move |server| async move { server.usagegraph(scale, clientid).await },
        )
        .await
    }

    /// Start backups, then refresh `["status"]`.
    ///
    /// # Errors
    ///
    /// Propagates server errors; nothing is invalidated on failure.
    pub async fn start_backup(
        &self,
        ids: &[ClientId],
        backup_type: BackupType,
    ) -> ApiResult<StartBackupResponse> {
        let response = self.server.start_backup(ids, backup_type).await?;
        info!(clients = ids.len(), start_type = backup_type.as_str(), "backup start requested");
        self.invalidate(&[QueryKey::status()]);
        Ok(response)
    }

    /// Schedule clients for removal, then refresh `["status"]`.
    ///
    /// # Errors
    ///
    /// Propagates server errors.
    pub async fn remove_clients(&self, ids: &[ClientId]) -> ApiResult<StatusResponse> {
        let response = self.server.remove_clients(ids).await?;
        self.invalidate(&[QueryKey::status()]);
        Ok(response)
    }

    /// Cancel scheduled removals, then refresh `["status"]`.
    ///
    /// # Errors
    ///
    /// Propagates server errors.
    pub async fn stop_remove_clients(&self, ids: &[ClientId]) -> ApiResult<StatusResponse> {
        let response = self.server.stop_remove_clients(ids).await?;
        self.invalidate(&[QueryKey::status()]);
        Ok(response)
    }

    /// Stop a running process, then refresh `["progress"]`.
    ///
    /// # Errors
    ///
    /// Propagates server errors.
    pub async fn stop_process(
        &self,
        clientid: ClientId,
        process_id: i64,
    ) -> ApiResult<ProgressResponse> {
        let response = self.server.stop_process(clientid, process_id, true).await?;
        self.invalidate(&[QueryKey::progress()]);
        Ok(response)
    }

    /// Archive a backup, then refresh `["backups", clientid]`.
    ///
    /// # Errors
    ///
    /// Propagates server errors.
    pub async fn archive_backup(
        &self,
        clientid: ClientId,
        backupid: BackupId,
    ) -> ApiResult<ClientBackupsResponse> {
        let response = self.server.archive_backup(clientid, backupid).await?;
        self.invalidate(&[QueryKey::client_backups(clientid)]);
        Ok(response)
    }

    /// Unarchive a backup, then refresh `["backups", clientid]`.
    ///
    /// # Errors
    ///
    /// Propagates server errors.
    pub async fn unarchive_backup(
        &self,
        clientid: ClientId,
        backupid: BackupId,
    ) -> ApiResult<ClientBackupsResponse> {
        let response = self.server.unarchive_backup(clientid, backupid).await?;
        self.invalidate(&[QueryKey::client_backups(clientid)]);
        Ok(response)
    }

    /// Queue a backup for deletion, then refresh `["backups", clientid]`.
    ///
    /// # Errors
    ///
    /// Propagates server errors.
    pub async fn delete_backup(
        &self,
        clientid: ClientId,
        backupid: BackupId,
    ) -> ApiResult<ClientBackupsResponse> {
        let response = self.server.delete_backup(clientid, backupid).await?;
        self.invalidate(&[QueryKey::client_backups(clientid)]);
        Ok(response)
    }

    /// Cancel a queued deletion, then refresh `["backups", clientid]`.
    ///
    /// # Errors
    ///
    /// Propagates server errors.
    pub async fn stop_delete_backup(
        &self,
        clientid: ClientId,
        backupid: BackupId,
    ) -> ApiResult<ClientBackupsResponse> {
        let response = self.server.stop_delete_backup(clientid, backupid).await?;
        self.invalidate(&[QueryKey::client_backups(clientid)]);
        Ok(response)
    }

    /// Delete a backup immediately, then refresh `["backups", clientid]`.
    ///
    /// # Errors
    ///
    /// Propagates server errors.
    pub async fn delete_backup_now(
        &self,
        clientid: ClientId,
        backupid: BackupId,
    ) -> ApiResult<ClientBackupsResponse> {
        let response = self.server.delete_backup_now(clientid, backupid).await?;
        self.invalidate(&[QueryKey::client_backups(clientid)]);
        Ok(response)
    }

    /// Recalculate storage statistics, then refresh every statistics view.
    ///
    /// # Errors
    ///
    /// Propagates server errors.
    pub async fn recalculate_usage(&self) -> ApiResult<UsageResponse> {
        let response = self.server.recalculate_usage().await?;
        info!("storage statistics recalculation requested");
        self.invalidate(&[
            QueryKey::storage_usage(),
            QueryKey::client_storage_usage(),
            QueryKey::usage_graph_all(),
        ]);
        Ok(response)
    }
}
