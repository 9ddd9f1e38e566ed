//! HTTP client for the UrBackup server JSON API.
//!
//! # Design
//! - Every call is a form-encoded `POST <server>/x?a=<action>`; the session
//!   token rides along as `ses` once one is held.
//! - `error == 1` means the session expired and is checked before anything
//!   else looks at the body.
//! - Payloads are decoded into the typed DTOs; a missing required field is a
//!   [`ApiError::ResponseParse`], never a panic.
//! - The session lives behind a lock so one server handle can be shared by
//!   pollers and mutations at the same time.

use std::sync::{PoisonError, RwLock};

use futures_util::StreamExt;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, instrument, warn};
use url::Url;
use urbackup_api_models::{
    BackupFilesResponse, BackupId, BackupType, BackupsClientsResponse, ClientBackupsResponse,
    ClientId, LoginResponse, OsType, PieGraphResponse, ProgressResponse, SaltResponse,
    StartBackupResponse, StatusResponse, UsageGraphResponse, UsageGraphScale, UsageResponse,
    UsersResponse,
};

use crate::auth::password_hash;
use crate::config::ClientConfig;
use crate::error::{ApiError, ApiResult};

const ENDPOINT: &str = "x";
const SESSION_PARAM: &str = "ses";

/// Form parameters for one action.
pub type Params = Vec<(&'static str, String)>;

/// Handle to one UrBackup server.
#[derive(Debug)]
pub struct UrBackupServer {
    http: Client,
    endpoint: Url,
    session: RwLock<String>,
}

impl UrBackupServer {
    /// Build a server handle from connection settings and a stored session.
    ///
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be constructed or the
    /// endpoint URL cannot be derived.
    pub fn new(config: &ClientConfig, session: impl Into<String>) -> ApiResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|source| ApiError::Transport {
                action: "client",
                source,
            })?;
        Self::with_client(http, &config.server_url, session)
    }

    /// Build a server handle around an existing HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidUrl`] when the endpoint cannot be derived.
    pub fn with_client(
        http: Client,
        server_url: &Url,
        session: impl Into<String>,
    ) -> ApiResult<Self> {
        let endpoint = server_url
            .join(ENDPOINT)
            .map_err(|source| ApiError::InvalidUrl { source })?;
        Ok(Self {
            http,
            endpoint,
            session: RwLock::new(session.into()),
        })
    }

    /// Current session token, empty when none is held.
    #[must_use]
    pub fn session(&self) -> String {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the session token.
    pub fn set_session(&self, session: impl Into<String>) {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = session.into();
    }

    /// Generic call: post `params` to `action` and return the raw JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::SessionNotFound`] when the server reports
    /// `error == 1`, plus transport, status and decode failures.
    #[instrument(level = "debug", skip(self, params))]
    pub async fn fetch_data(&self, action: &'static str, params: Params) -> ApiResult<Value> {
        let mut form = params;
        let session = self.session();
        if !session.is_empty() {
            form.push((SESSION_PARAM, session));
        }

        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("a", action);

        let response = self
            .http
            .post(url)
            .form(&form)
            .send()
            .await
            .map_err(|source| ApiError::Transport { action, source })?;

        let status = response.status();
        if !status.is_success() {
            warn!(action, status = status.as_u16(), "server returned error status");
            return Err(ApiError::HttpStatus {
                action,
                status: status.as_u16(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|source| ApiError::Transport { action, source })?;
        let body: Value = serde_json::from_slice(&bytes).map_err(|err| ApiError::ResponseParse {
            action,
            detail: err.to_string(),
        })?;

        if error_code(&body) == Some(1) {
            debug!(action, "session not found");
            return Err(ApiError::SessionNotFound);
        }

        Ok(body)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        action: &'static str,
        params: Params,
    ) -> ApiResult<T> {
        let body = self.fetch_data(action, params).await?;
        decode(action, body)
    }

    async fn call_backups<T: DeserializeOwned>(&self, params: Params) -> ApiResult<T> {
        const ACTION: &str = "backups";
        let body = self.fetch_data(ACTION, params).await?;
        if let Some(err) = body.get("err").and_then(Value::as_str) {
            return Err(if err == "access_denied" {
                ApiError::BackupsAccessDenied
            } else {
                ApiError::BackupsAccess {
                    message: err.to_string(),
                }
            });
        }
        decode(ACTION, body)
    }

    /// Fetch the salt challenge for `username`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::UsernameNotFound`] for `error == 0` and
    /// [`ApiError::PasswordWrong`] for `error == 2`.
    pub async fn fetch_salt(&self, username: &str) -> ApiResult<SaltResponse> {
        let body = self
            .fetch_data("salt", vec![("username", username.to_string())])
            .await?;
        match error_code(&body) {
            Some(0) => Err(ApiError::UsernameNotFound),
            Some(2) => Err(ApiError::PasswordWrong),
            _ => decode("salt", body),
        }
    }

    /// Drop the held session and probe the server without credentials.
    ///
    /// Adopts the returned session when the server hands one out.
    ///
    /// # Errors
    ///
    /// Propagates transport and decode failures.
    pub async fn anonymous_login(&self) -> ApiResult<LoginResponse> {
        self.set_session(String::new());
        let response: LoginResponse = self.call("login", Vec::new()).await?;
        if let Some(session) = &response.session {
            self.set_session(session.clone());
        }
        Ok(response)
    }

    /// Log in with a local or directory account.
    ///
    /// # Errors
    ///
    /// Returns the credential errors described on [`ApiError`].
    #[instrument(level = "debug", skip(self, password))]
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        ldap: bool,
    ) -> ApiResult<LoginResponse> {
        let mut response = if ldap {
            let response: LoginResponse = self
                .call(
                    "login",
                    vec![
                        ("username", username.to_string()),
                        ("password", password.to_string()),
                        ("plainpw", "1".to_string()),
                    ],
                )
                .await?;
            if response.error == Some(2) {
                return Err(ApiError::UsernameOrPasswordWrong);
            }
            if let Some(session) = response.session.as_ref().filter(|value| !value.is_empty()) {
                self.set_session(session.clone());
            }
            response
        } else {
            let salt = self.fetch_salt(username).await?;
            if let Some(session) = salt.ses.as_ref().filter(|value| !value.is_empty()) {
                self.set_session(session.clone());
            }
            let hash = password_hash(&salt.salt, &salt.rnd, password, salt.pbkdf2_rounds);
            let response: LoginResponse = self
                .call(
                    "login",
                    vec![("username", username.to_string()), ("password", hash)],
                )
                .await?;
            if !response.is_success() && response.error == Some(2) {
                return Err(ApiError::UsernameOrPasswordWrong);
            }
            response
        };

        let held = self.session();
        if response.session.as_deref().is_none_or(str::is_empty) && !held.is_empty() {
            response.session = Some(held);
        }
        Ok(response)
    }

    /// Client status overview.
    ///
    /// # Errors
    ///
    /// Propagates request and decode failures.
    pub async fn status(&self) -> ApiResult<StatusResponse> {
        self.call("status", Vec::new()).await
    }

    /// Schedule clients for removal.
    ///
    /// # Errors
    ///
    /// Propagates request and decode failures.
    pub async fn remove_clients(&self, ids: &[ClientId]) -> ApiResult<StatusResponse> {
        self.call("status", vec![("remove_client", join_ids(ids))])
            .await
    }

    /// Cancel a scheduled client removal.
    ///
    /// # Errors
    ///
    /// Propagates request and decode failures.
    pub async fn stop_remove_clients(&self, ids: &[ClientId]) -> ApiResult<StatusResponse> {
        self.call(
            "status",
            vec![
                ("remove_client", join_ids(ids)),
                ("stop_remove_client", "true".to_string()),
            ],
        )
        .await
    }

    /// Queue a backup of `backup_type` on every listed client.
    ///
    /// # Errors
    ///
    /// Propagates request and decode failures.
    pub async fn start_backup(
        &self,
        ids: &[ClientId],
        backup_type: BackupType,
    ) -> ApiResult<StartBackupResponse> {
        self.call(
            "start_backup",
            vec![
                ("start_client", join_ids(ids)),
                ("start_type", backup_type.as_str().to_string()),
            ],
        )
        .await
    }

    /// Running processes, plus recent activities when requested.
    ///
    /// # Errors
    ///
    /// Propagates request and decode failures.
    pub async fn progress(&self, with_lastacts: bool) -> ApiResult<ProgressResponse> {
        self.call("progress", vec![("with_lastacts", flag(with_lastacts))])
            .await
    }

    /// Stop one process and return the refreshed progress.
    ///
    /// # Errors
    ///
    /// Propagates request and decode failures.
    pub async fn stop_process(
        &self,
        clientid: ClientId,
        process_id: i64,
        with_lastacts: bool,
    ) -> ApiResult<ProgressResponse> {
        self.call(
            "progress",
            vec![
                ("with_lastacts", flag(with_lastacts)),
                ("stop_clientid", clientid.to_string()),
                ("stop_id", process_id.to_string()),
            ],
        )
        .await
    }

    /// Clients with browsable backups.
    ///
    /// # Errors
    ///
    /// Returns the backups access errors plus request and decode failures.
    pub async fn backups_clients(&self) -> ApiResult<BackupsClientsResponse> {
        self.call_backups(Vec::new()).await
    }

    /// Stored backups of one client.
    ///
    /// # Errors
    ///
    /// Returns the backups access errors plus request and decode failures.
    pub async fn client_backups(&self, clientid: ClientId) -> ApiResult<ClientBackupsResponse> {
        self.call_backups(backups_params(clientid, Vec::new()))
            .await
    }

    /// Exempt a backup from automatic deletion.
    ///
    /// # Errors
    ///
    /// Returns the backups access errors plus request and decode failures.
    pub async fn archive_backup(
        &self,
        clientid: ClientId,
        backupid: BackupId,
    ) -> ApiResult<ClientBackupsResponse> {
        self.backup_verb(clientid, "archive", backupid).await
    }

    /// Return a backup to automatic deletion.
    ///
    /// # Errors
    ///
    /// Returns the backups access errors plus request and decode failures.
    pub async fn unarchive_backup(
        &self,
        clientid: ClientId,
        backupid: BackupId,
    ) -> ApiResult<ClientBackupsResponse> {
        self.backup_verb(clientid, "unarchive", backupid).await
    }

    /// Queue a backup for deletion during the next cleanup.
    ///
    /// # Errors
    ///
    /// Returns the backups access errors plus request and decode failures.
    pub async fn delete_backup(
        &self,
        clientid: ClientId,
        backupid: BackupId,
    ) -> ApiResult<ClientBackupsResponse> {
        self.backup_verb(clientid, "delete", backupid).await
    }

    /// Cancel a queued deletion.
    ///
    /// # Errors
    ///
    /// Returns the backups access errors plus request and decode failures.
    pub async fn stop_delete_backup(
        &self,
        clientid: ClientId,
        backupid: BackupId,
    ) -> ApiResult<ClientBackupsResponse> {
        self.backup_verb(clientid, "stop_delete", backupid).await
    }

    /// Delete a backup immediately.
    ///
    /// # Errors
    ///
    /// Returns the backups access errors plus request and decode failures.
    pub async fn delete_backup_now(
        &self,
        clientid: ClientId,
        backupid: BackupId,
    ) -> ApiResult<ClientBackupsResponse> {
        self.backup_verb(clientid, "delete_now", backupid).await
    }

    async fn backup_verb(
        &self,
        clientid: ClientId,
        verb: &'static str,
        backupid: BackupId,
    ) -> ApiResult<ClientBackupsResponse> {
        debug!(clientid, backupid, verb, "backup mutation");
        self.call_backups(backups_params(clientid, vec![(verb, backupid.to_string())]))
            .await
    }

    /// List a directory inside a file backup.
    ///
    /// # Errors
    ///
    /// Returns the backups access errors plus request and decode failures.
    pub async fn files(
        &self,
        clientid: ClientId,
        backupid: BackupId,
        path: &str,
    ) -> ApiResult<BackupFilesResponse> {
        self.call_backups(vec![
            ("sa", "files".to_string()),
            ("clientid", clientid.to_string()),
            ("backupid", backupid.to_string()),
            ("path", path.to_string()),
        ])
        .await
    }

    /// Mount an image backup so it can be browsed like a file backup.
    ///
    /// # Errors
    ///
    /// Returns the backups access errors plus request and decode failures.
    pub async fn mount_image(
        &self,
        clientid: ClientId,
        backupid: BackupId,
    ) -> ApiResult<BackupFilesResponse> {
        self.call_backups(vec![
            ("sa", "mount".to_string()),
            ("clientid", clientid.to_string()),
            ("backupid", backupid.to_string()),
        ])
        .await
    }

    /// Users visible to the current session.
    ///
    /// # Errors
    ///
    /// Propagates request and decode failures.
    pub async fn users(&self) -> ApiResult<UsersResponse> {
        self.call("settings", vec![("sa", "listusers".to_string())])
            .await
    }

    /// Storage used per client.
    ///
    /// # Errors
    ///
    /// Propagates request and decode failures.
    pub async fn usage(&self) -> ApiResult<UsageResponse> {
        self.call("usage", Vec::new()).await
    }

    /// Ask the server to recalculate storage statistics.
    ///
    /// # Errors
    ///
    /// Propagates request and decode failures.
    pub async fn recalculate_usage(&self) -> ApiResult<UsageResponse> {
        self.call("usage", vec![("recalculate", "true".to_string())])
            .await
    }

    /// Storage allocation per client.
    ///
    /// # Errors
    ///
    /// Propagates request and decode failures.
    pub async fn piegraph(&self) -> ApiResult<PieGraphResponse> {
        self.call("piegraph", Vec::new()).await
    }

    /// Storage usage history, optionally limited to one client.
    ///
    /// # Errors
    ///
    /// Propagates request and decode failures.
    pub async fn usagegraph(
        &self,
        scale: UsageGraphScale,
        clientid: Option<ClientId>,
    ) -> ApiResult<UsageGraphResponse> {
        let mut params = vec![("scale", scale.as_str().to_string())];
        if let Some(id) = clientid {
            params.push(("clientid", id.to_string()));
        }
        self.call("usagegraph", params).await
    }

    /// Link to the client installer preconfigured for `clientid`.
    #[must_use]
    pub fn download_client_url(
        &self,
        clientid: ClientId,
        authkey: Option<&str>,
        os: OsType,
    ) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("a", "download_client");
            pairs.append_pair(SESSION_PARAM, &self.session());
            pairs.append_pair("clientid", &clientid.to_string());
            pairs.append_pair("os", os.as_str());
            if let Some(key) = authkey {
                pairs.append_pair("authkey", key);
            }
        }
        url
    }

    /// Link to a single file inside a backup.
    #[must_use]
    pub fn file_download_url(&self, clientid: ClientId, backupid: BackupId, path: &str) -> Url {
        self.backup_download_url("filesdl", clientid, backupid, path)
    }

    /// Link to a ZIP archive of a directory inside a backup.
    #[must_use]
    pub fn zip_download_url(&self, clientid: ClientId, backupid: BackupId, path: &str) -> Url {
        self.backup_download_url("zipdl", clientid, backupid, path)
    }

    fn backup_download_url(
        &self,
        sub_action: &str,
        clientid: ClientId,
        backupid: BackupId,
        path: &str,
    ) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("a", "backups")
            .append_pair("sa", sub_action)
            .append_pair("clientid", &clientid.to_string())
            .append_pair("backupid", &backupid.to_string())
            .append_pair("path", path)
            .append_pair(SESSION_PARAM, &self.session());
        url
    }

    /// Stream a download link into `writer`, returning the bytes written.
    ///
    /// # Errors
    ///
    /// Returns transport or status errors for the request and
    /// [`ApiError::Download`] when writing fails.
    pub async fn download_to<W>(&self, url: Url, writer: &mut W) -> ApiResult<u64>
    where
        W: AsyncWrite + Unpin + Send,
    {
        const ACTION: &str = "download";
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                action: ACTION,
                source,
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::HttpStatus {
                action: ACTION,
                status: status.as_u16(),
            });
        }

        let mut written = 0_u64;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|source| ApiError::Transport {
                action: ACTION,
                source,
            })?;
            writer
                .write_all(&chunk)
                .await
                .map_err(|source| ApiError::Download {
                    operation: "write",
                    source,
                })?;
            written += chunk.len() as u64;
        }
        writer.flush().await.map_err(|source| ApiError::Download {
            operation: "flush",
            source,
        })?;
        debug!(bytes = written, "download finished");
        Ok(written)
    }
}

fn decode<T: DeserializeOwned>(action: &'static str, body: Value) -> ApiResult<T> {
    serde_json::from_value(body).map_err(|err| ApiError::ResponseParse {
        action,
        detail: err.to_string(),
    })
}

fn error_code(body: &Value) -> Option<i64> {
    body.get("error").and_then(Value::as_i64)
}

fn backups_params(clientid: ClientId, mut extra: Params) -> Params {
    let mut params = vec![
        ("sa", "backups".to_string()),
        ("clientid", clientid.to_string()),
    ];
    params.append(&mut extra);
    params
}

fn join_ids(ids: &[ClientId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

fn flag(value: bool) -> String {
    if value { "1" } else { "0" }.to_string()
}
