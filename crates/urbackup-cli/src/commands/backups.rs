use std::path::{Path, PathBuf};

use urbackup_client::table::backup_breadcrumbs;

use crate::cli::{
    BackupRefArgs, ClientArgs, FileDownloadArgs, FilesArgs, OutputFormat, ZipDownloadArgs,
};
use crate::client::{AppContext, CliError, CliResult};
use crate::commands::download_to_file;
use crate::output::{render_backup_clients, render_backup_files, render_client_backups};

/// Mutations available on a single stored backup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BackupVerb {
    Archive,
    Unarchive,
    Delete,
    StopDelete,
    DeleteNow,
}

impl BackupVerb {
    const fn done_message(self) -> &'static str {
        match self {
            Self::Archive => "archived",
            Self::Unarchive => "unarchived",
            Self::Delete => "queued for deletion",
            Self::StopDelete => "no longer queued for deletion",
            Self::DeleteNow => "deleted",
        }
    }
}

pub(crate) async fn handle_backup_clients(ctx: &AppContext, format: OutputFormat) -> CliResult<()> {
    let response = ctx.console.backups_clients().await?;
    render_backup_clients(&response, format)
}

pub(crate) async fn handle_backup_list(
    ctx: &AppContext,
    args: ClientArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let response = ctx.console.client_backups(args.clientid).await?;
    render_client_backups(&response, format)
}

pub(crate) async fn handle_backup_files(
    ctx: &AppContext,
    args: FilesArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let response = ctx
        .console
        .files(args.clientid, args.backupid, &args.path)
        .await?;
    let crumbs = backup_breadcrumbs(
        Some(response.clientname.as_str()),
        Some(response.backuptime),
        &response.path,
    );
    render_backup_files(&response, &crumbs, format)
}

pub(crate) async fn handle_backup_verb(
    ctx: &AppContext,
    args: BackupRefArgs,
    verb: BackupVerb,
) -> CliResult<()> {
    let (clientid, backupid) = (args.clientid, args.backupid);
    let console = &ctx.console;
    match verb {
        BackupVerb::Archive => console.archive_backup(clientid, backupid).await?,
        BackupVerb::Unarchive => console.unarchive_backup(clientid, backupid).await?,
        BackupVerb::Delete => console.delete_backup(clientid, backupid).await?,
        BackupVerb::StopDelete => console.stop_delete_backup(clientid, backupid).await?,
        BackupVerb::DeleteNow => console.delete_backup_now(clientid, backupid).await?,
    };
    println!(
        "Backup {backupid} of client {clientid} {}",
        verb.done_message()
    );
    Ok(())
}

pub(crate) async fn handle_backup_mount(
    ctx: &AppContext,
    args: BackupRefArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let response = ctx
        .server()
        .mount_image(args.clientid, args.backupid)
        .await?;
    let crumbs = backup_breadcrumbs(
        Some(response.clientname.as_str()),
        Some(response.backuptime),
        &response.path,
    );
    render_backup_files(&response, &crumbs, format)
}

pub(crate) async fn handle_backup_download(
    ctx: &AppContext,
    args: FileDownloadArgs,
) -> CliResult<()> {
    let url = ctx
        .server()
        .file_download_url(args.clientid, args.backupid, &args.path);
    if args.print_url {
        println!("{url}");
        return Ok(());
    }

    let dest = match args.dest {
        Some(dest) => dest,
        None => file_name_of(&args.path)?,
    };
    download_to_file(ctx, url, &dest).await
}

pub(crate) async fn handle_zip_download(ctx: &AppContext, args: ZipDownloadArgs) -> CliResult<()> {
    let url = ctx
        .server()
        .zip_download_url(args.clientid, args.backupid, &args.path);
    if args.print_url {
        println!("{url}");
        return Ok(());
    }

    let dest = args
        .dest
        .unwrap_or_else(|| PathBuf::from(format!("backup-{}.zip", args.backupid)));
    download_to_file(ctx, url, &dest).await
}

fn file_name_of(path: &str) -> CliResult<PathBuf> {
    Path::new(path)
        .file_name()
        .map(PathBuf::from)
        .ok_or_else(|| {
            CliError::validation(format!(
                "cannot derive a file name from '{path}'; pass --dest"
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::context_with;
    use httpmock::prelude::*;
    use serde_json::json;
    use urbackup_client::QueryKey;

    fn backups_body() -> serde_json::Value {
        json!({"clientname": "laptop", "clientid": 1, "backups": [
            {"id": 9, "backuptime": 1_700_000_000, "incremental": 1, "size_bytes": 4096}
        ]})
    }

    #[tokio::test]
    async fn backup_list_renders_client_backups() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/x")
                .query_param("a", "backups")
                .form_urlencoded_tuple("sa", "backups")
                .form_urlencoded_tuple("clientid", "1");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(backups_body());
        });

        let (ctx, _dir) = context_with(&server, "abc");
        handle_backup_list(&ctx, ClientArgs { clientid: 1 }, OutputFormat::Table)
            .await
            .expect("list should succeed");
        mock.assert();
    }

    #[tokio::test]
    async fn access_denied_is_an_operational_failure() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/x").query_param("a", "backups");
            then.status(200).json_body(json!({"err": "access_denied"}));
        });

        let (ctx, _dir) = context_with(&server, "abc");
        let err = handle_backup_clients(&ctx, OutputFormat::Json)
            .await
            .expect_err("access denied");
        assert_eq!(err.exit_code(), 3);
        assert_eq!(err.display_message(), "backup access denied");
    }

    #[tokio::test]
    async fn archive_posts_verb_and_invalidates_listing() {
        let server = MockServer::start_async().await;
        let mut listing = server.mock(|when, then| {
            when.method(POST).path("/x").query_param("a", "backups");
            then.status(200).json_body(backups_body());
        });

        let (ctx, _dir) = context_with(&server, "abc");
        ctx.console.client_backups(1).await.expect("prime cache");
        listing.delete();

        let archive = server.mock(|when, then| {
            when.method(POST)
                .path("/x")
                .query_param("a", "backups")
                .form_urlencoded_tuple("archive", "9");
            then.status(200).json_body(backups_body());
        });
        let args = BackupRefArgs {
            clientid: 1,
            backupid: 9,
        };
        handle_backup_verb(&ctx, args, BackupVerb::Archive)
            .await
            .expect("archive should succeed");

        assert!(ctx.console.queries().is_stale(&QueryKey::client_backups(1)));
        archive.assert();
    }

    #[tokio::test]
    async fn files_are_listed_with_breadcrumbs() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/x")
                .query_param("a", "backups")
                .form_urlencoded_tuple("sa", "files")
                .form_urlencoded_tuple("path", "/home");
            then.status(200).json_body(json!({
                "clientname": "laptop", "clientid": 1, "backupid": 9,
                "backuptime": 0, "path": "/home",
                "files": [{"name": "user", "dir": true}]
            }));
        });

        let (ctx, _dir) = context_with(&server, "abc");
        let args = FilesArgs {
            clientid: 1,
            backupid: 9,
            path: "/home".to_string(),
        };
        handle_backup_files(&ctx, args, OutputFormat::Table)
            .await
            .expect("files should succeed");
        mock.assert();
    }

    #[tokio::test]
    async fn file_download_uses_file_name_of_path() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/x")
                .query_param("a", "backups")
                .query_param("sa", "filesdl")
                .query_param("path", "/etc/hosts");
            then.status(200).body("hosts");
        });

        let (ctx, dir) = context_with(&server, "abc");
        let dest = dir.path().join("hosts");
        let args = FileDownloadArgs {
            clientid: 1,
            backupid: 9,
            path: "/etc/hosts".to_string(),
            dest: Some(dest.clone()),
            print_url: false,
        };
        handle_backup_download(&ctx, args)
            .await
            .expect("download should succeed");

        mock.assert();
        assert_eq!(std::fs::read_to_string(dest).expect("read"), "hosts");
    }

    #[test]
    fn file_name_requires_a_final_component() {
        assert_eq!(
            file_name_of("/etc/hosts").expect("name"),
            PathBuf::from("hosts")
        );
        assert!(file_name_of("/").is_err());
    }
}
