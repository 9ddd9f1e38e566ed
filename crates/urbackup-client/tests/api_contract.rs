//! Wire contract of the server client against a mocked web interface.

use std::time::Duration;

use anyhow::Result;
use httpmock::prelude::*;
use serde_json::json;
use urbackup_api_models::{BackupType, UsageGraphScale};
use urbackup_client::config::parse_server_url;
use urbackup_client::format::graph_year;
use urbackup_client::{ApiError, AppState, ClientConfig, Console, Page, QueryKey, UrBackupServer};

fn server_for(mock: &MockServer, session: &str) -> Result<UrBackupServer> {
    let config = ClientConfig::new(&mock.base_url())?.with_timeout(Duration::from_secs(5));
    Ok(UrBackupServer::new(&config, session)?)
}

fn status_body() -> serde_json::Value {
    json!({
        "status": [
            {"id": 1, "name": "laptop", "lastbackup": 1_700_000_000, "online": true,
             "processes": [{"action": 1, "pcdone": 30}]},
            {"id": 2, "name": "old-server", "delete_pending": "1"}
        ],
        "no_images": false,
        "no_file_backups": false
    })
}

#[tokio::test]
async fn status_posts_session_and_decodes_rows() -> Result<()> {
    let mock = MockServer::start_async().await;
    let status = mock.mock(|when, then| {
        when.method(POST)
            .path("/x")
            .query_param("a", "status")
            .form_urlencoded_tuple("ses", "abc");
        then.status(200).json_body(status_body());
    });

    let server = server_for(&mock, "abc")?;
    let response = server.status().await?;

    status.assert();
    assert_eq!(response.status.len(), 2);
    assert!(response.status[1].is_delete_pending());
    assert_eq!(response.status[0].file_backup_processes().count(), 1);
    Ok(())
}

#[tokio::test]
async fn error_code_one_means_session_not_found() -> Result<()> {
    let mock = MockServer::start_async().await;
    mock.mock(|when, then| {
        when.method(POST).path("/x").query_param("a", "progress");
        then.status(200).json_body(json!({"error": 1, "progress": []}));
    });

    let server = server_for(&mock, "expired")?;
    let err = server.progress(true).await.expect_err("session expired");
    assert!(matches!(err, ApiError::SessionNotFound));
    assert!(err.requires_login());
    Ok(())
}

#[tokio::test]
async fn local_login_hashes_password_and_adopts_salt_session() -> Result<()> {
    let mock = MockServer::start_async().await;
    let salt = mock.mock(|when, then| {
        when.method(POST)
            .path("/x")
            .query_param("a", "salt")
            .form_urlencoded_tuple("username", "admin");
        then.status(200).json_body(json!({
            "salt": "abc",
            "rnd": "rnd123",
            "pbkdf2_rounds": 10_000,
            "ses": "salt-session"
        }));
    });
    let login = mock.mock(|when, then| {
        when.method(POST)
            .path("/x")
            .query_param("a", "login")
            .form_urlencoded_tuple("username", "admin")
            .form_urlencoded_tuple("password", "6bcd5535fd617316ca2617bffc2178e1")
            .form_urlencoded_tuple("ses", "salt-session");
        then.status(200)
            .json_body(json!({"success": true, "status": "all", "api_version": 2}));
    });

    let server = server_for(&mock, "")?;
    let response = server.login("admin", "secret", false).await?;

    salt.assert();
    login.assert();
    assert!(response.is_success());
    assert_eq!(response.session.as_deref(), Some("salt-session"));
    assert_eq!(server.session(), "salt-session");
    Ok(())
}

#[tokio::test]
async fn salt_errors_map_to_credential_failures() -> Result<()> {
    let mock = MockServer::start_async().await;
    mock.mock(|when, then| {
        when.method(POST)
            .path("/x")
            .query_param("a", "salt")
            .form_urlencoded_tuple("username", "ghost");
        then.status(200).json_body(json!({"error": 0}));
    });
    mock.mock(|when, then| {
        when.method(POST)
            .path("/x")
            .query_param("a", "salt")
            .form_urlencoded_tuple("username", "locked");
        then.status(200).json_body(json!({"error": 2}));
    });

    let server = server_for(&mock, "")?;
    assert!(matches!(
        server.login("ghost", "pw", false).await,
        Err(ApiError::UsernameNotFound)
    ));
    assert!(matches!(
        server.login("locked", "pw", false).await,
        Err(ApiError::PasswordWrong)
    ));
    Ok(())
}

#[tokio::test]
async fn rejected_login_reports_wrong_credentials() -> Result<()> {
    let mock = MockServer::start_async().await;
    mock.mock(|when, then| {
        when.method(POST).path("/x").query_param("a", "salt");
        then.status(200)
            .json_body(json!({"salt": "s", "rnd": "r", "pbkdf2_rounds": 0}));
    });
    mock.mock(|when, then| {
        when.method(POST).path("/x").query_param("a", "login");
        then.status(200).json_body(json!({"success": false, "error": 2}));
    });

    let server = server_for(&mock, "")?;
    let err = server
        .login("admin", "wrong", false)
        .await
        .expect_err("rejected");
    assert!(matches!(err, ApiError::UsernameOrPasswordWrong));
    Ok(())
}

#[tokio::test]
async fn ldap_login_sends_plain_password() -> Result<()> {
    let mock = MockServer::start_async().await;
    let login = mock.mock(|when, then| {
        when.method(POST)
            .path("/x")
            .query_param("a", "login")
            .form_urlencoded_tuple("username", "jdoe")
            .form_urlencoded_tuple("password", "plain")
            .form_urlencoded_tuple("plainpw", "1");
        then.status(200)
            .json_body(json!({"success": true, "session": "ldap-session"}));
    });

    let server = server_for(&mock, "")?;
    let response = server.login("jdoe", "plain", true).await?;

    login.assert();
    assert_eq!(response.session.as_deref(), Some("ldap-session"));
    assert_eq!(server.session(), "ldap-session");
    Ok(())
}

#[tokio::test]
async fn anonymous_login_adopts_returned_session() -> Result<()> {
    let mock = MockServer::start_async().await;
    mock.mock(|when, then| {
        when.method(POST).path("/x").query_param("a", "login");
        then.status(200)
            .json_body(json!({"success": true, "session": "anon"}));
    });

    let server = server_for(&mock, "stale")?;
    let response = server.anonymous_login().await?;
    assert!(response.is_success());
    assert_eq!(server.session(), "anon");
    Ok(())
}

#[tokio::test]
async fn backups_errors_are_classified() -> Result<()> {
    let mock = MockServer::start_async().await;
    mock.mock(|when, then| {
        when.method(POST)
            .path("/x")
            .query_param("a", "backups")
            .form_urlencoded_tuple("clientid", "1");
        then.status(200).json_body(json!({"err": "access_denied"}));
    });
    mock.mock(|when, then| {
        when.method(POST)
            .path("/x")
            .query_param("a", "backups")
            .form_urlencoded_tuple("clientid", "2");
        then.status(200).json_body(json!({"err": "client_not_found"}));
    });

    let server = server_for(&mock, "s")?;
    assert!(matches!(
        server.client_backups(1).await,
        Err(ApiError::BackupsAccessDenied)
    ));
    match server.client_backups(2).await {
        Err(ApiError::BackupsAccess { message }) => assert_eq!(message, "client_not_found"),
        other => panic!("unexpected result: {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn malformed_payload_is_a_parse_error() -> Result<()> {
    let mock = MockServer::start_async().await;
    mock.mock(|when, then| {
        when.method(POST).path("/x").query_param("a", "status");
        then.status(200).json_body(json!({"no_images": true}));
    });

    let server = server_for(&mock, "s")?;
    match server.status().await {
        Err(ApiError::ResponseParse { action, .. }) => assert_eq!(action, "status"),
        other => panic!("unexpected result: {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn server_errors_are_retryable_status_failures() -> Result<()> {
    let mock = MockServer::start_async().await;
    mock.mock(|when, then| {
        when.method(POST).path("/x").query_param("a", "usage");
        then.status(502);
    });

    let server = server_for(&mock, "s")?;
    let err = server.usage().await.expect_err("bad gateway");
    assert!(matches!(
        err,
        ApiError::HttpStatus {
            action: "usage",
            status: 502
        }
    ));
    assert!(err.is_retryable());
    Ok(())
}

#[tokio::test]
async fn start_backup_joins_client_ids() -> Result<()> {
    let mock = MockServer::start_async().await;
    let start = mock.mock(|when, then| {
        when.method(POST)
            .path("/x")
            .query_param("a", "start_backup")
            .form_urlencoded_tuple("start_client", "1,2")
            .form_urlencoded_tuple("start_type", "full_image");
        then.status(200).json_body(json!({"result": [
            {"start_type": "full_image", "clientid": 1, "start_ok": true},
            {"start_type": "full_image", "clientid": 2, "start_ok": false}
        ]}));
    });

    let server = server_for(&mock, "s")?;
    let response = server.start_backup(&[1, 2], BackupType::FullImage).await?;
    start.assert();
    assert!(response.result[0].start_ok);
    assert!(!response.result[1].start_ok);
    Ok(())
}

#[tokio::test]
async fn stop_process_sends_identifiers() -> Result<()> {
    let mock = MockServer::start_async().await;
    let stop = mock.mock(|when, then| {
        when.method(POST)
            .path("/x")
            .query_param("a", "progress")
            .form_urlencoded_tuple("stop_clientid", "4")
            .form_urlencoded_tuple("stop_id", "17")
            .form_urlencoded_tuple("with_lastacts", "1");
        then.status(200).json_body(json!({"progress": [], "lastacts": []}));
    });

    let server = server_for(&mock, "s")?;
    let response = server.stop_process(4, 17, true).await?;
    stop.assert();
    assert_eq!(response.lastacts.map(|acts| acts.len()), Some(0));
    Ok(())
}

#[tokio::test]
async fn yearly_usage_graph_labels_are_monotonic_years() -> Result<()> {
    let mock = MockServer::start_async().await;
    let graph = mock.mock(|when, then| {
        when.method(POST)
            .path("/x")
            .query_param("a", "usagegraph")
            .form_urlencoded_tuple("scale", "y")
            .form_urlencoded_tuple("clientid", "3");
        then.status(200).json_body(json!({"data": [
            {"xlabel": "2021", "data": 10.0},
            {"xlabel": "2022-01", "data": 12.5},
            {"xlabel": "2022-12-31", "data": 14.0},
            {"xlabel": "2024-03-01T00:00:00Z", "data": 20.0}
        ]}));
    });

    let server = server_for(&mock, "s")?;
    let response = server.usagegraph(UsageGraphScale::Year, Some(3)).await?;
    graph.assert();

    let years: Vec<i32> = response
        .data
        .iter()
        .map(|point| graph_year(&point.xlabel).parse())
        .collect::<Result<_, _>>()?;
    assert_eq!(years, [2021, 2022, 2022, 2024]);
    assert!(years.windows(2).all(|pair| pair[0] <= pair[1]));
    Ok(())
}

#[tokio::test]
async fn download_streams_body_to_writer() -> Result<()> {
    let mock = MockServer::start_async().await;
    let download = mock.mock(|when, then| {
        when.method(GET)
            .path("/x")
            .query_param("a", "backups")
            .query_param("sa", "filesdl")
            .query_param("path", "/etc/hosts")
            .query_param("ses", "s");
        then.status(200).body("127.0.0.1 localhost\n");
    });

    let server = server_for(&mock, "s")?;
    let url = server.file_download_url(1, 2, "/etc/hosts");
    let mut sink = Vec::new();
    let written = server.download_to(url, &mut sink).await?;

    download.assert();
    assert_eq!(written, 20);
    assert_eq!(sink, b"127.0.0.1 localhost\n");
    Ok(())
}

#[tokio::test]
async fn concurrent_console_queries_share_one_request() -> Result<()> {
    let mock = MockServer::start_async().await;
    let status = mock.mock(|when, then| {
        when.method(POST).path("/x").query_param("a", "status");
        then.status(200)
            .delay(Duration::from_millis(50))
            .json_body(status_body());
    });

    let console = Console::new(server_for(&mock, "s")?);
    let (first, second) = tokio::join!(console.status(), console.status());

    assert_eq!(first?.status.len(), 2);
    assert_eq!(second?.status.len(), 2);
    status.assert_calls(1);
    Ok(())
}

#[tokio::test]
async fn backup_mutations_invalidate_only_that_client() -> Result<()> {
    let mock = MockServer::start_async().await;
    let listing = json!({"clientname": "laptop", "clientid": 1, "backups": [
        {"id": 9, "backuptime": 1_700_000_000, "archived": 0}
    ]});
    let other = json!({"clientname": "desktop", "clientid": 2, "backups": []});
    mock.mock(move |when, then| {
        when.method(POST)
            .path("/x")
            .query_param("a", "backups")
            .form_urlencoded_tuple("clientid", "1");
        then.status(200).json_body(listing);
    });
    mock.mock(move |when, then| {
        when.method(POST)
            .path("/x")
            .query_param("a", "backups")
            .form_urlencoded_tuple("clientid", "2");
        then.status(200).json_body(other);
    });

    let console = Console::new(server_for(&mock, "s")?);
    console.client_backups(1).await?;
    console.client_backups(2).await?;

    console.archive_backup(1, 9).await?;

    let queries = console.queries();
    assert!(queries.is_stale(&QueryKey::client_backups(1)));
    assert!(!queries.is_stale(&QueryKey::client_backups(2)));
    Ok(())
}

#[tokio::test]
async fn recalculate_usage_invalidates_statistics() -> Result<()> {
    let mock = MockServer::start_async().await;
    mock.mock(|when, then| {
        when.method(POST).path("/x").query_param("a", "usage");
        then.status(200).json_body(json!({"usage": []}));
    });
    mock.mock(|when, then| {
        when.method(POST).path("/x").query_param("a", "piegraph");
        then.status(200).json_body(json!({"data": []}));
    });
    mock.mock(|when, then| {
        when.method(POST).path("/x").query_param("a", "usagegraph");
        then.status(200).json_body(json!({"data": []}));
    });
    mock.mock(|when, then| {
        when.method(POST).path("/x").query_param("a", "status");
        then.status(200).json_body(status_body());
    });

    let console = Console::new(server_for(&mock, "s")?);
    console.usage().await?;
    console.piegraph().await?;
    console.usagegraph(UsageGraphScale::Day, None).await?;
    console.status().await?;

    console.recalculate_usage().await?;

    let queries = console.queries();
    assert!(queries.is_stale(&QueryKey::client_storage_usage()));
    assert!(queries.is_stale(&QueryKey::storage_usage()));
    assert!(queries.is_stale(&QueryKey::usage_graph("d", None)));
    assert!(!queries.is_stale(&QueryKey::status()));
    Ok(())
}

#[tokio::test]
async fn entering_a_page_redirects_to_login_when_session_expired() -> Result<()> {
    let mock = MockServer::start_async().await;
    mock.mock(|when, then| {
        when.method(POST).path("/x").query_param("a", "status");
        then.status(200).json_body(json!({"error": 1}));
    });

    let server = server_for(&mock, "expired")?;
    let mut state = AppState::default();
    assert_eq!(state.enter(Page::Backups, &server).await, Page::Login);
    assert!(!state.logged_in);
    assert_eq!(state.page_after_login, Page::Backups);
    assert_eq!(state.complete_login(), Page::Backups);
    Ok(())
}

#[tokio::test]
async fn probe_failures_other_than_session_count_as_logged_in() -> Result<()> {
    let mock = MockServer::start_async().await;
    mock.mock(|when, then| {
        when.method(POST).path("/x").query_param("a", "status");
        then.status(500);
    });

    let server = server_for(&mock, "s")?;
    let mut state = AppState::default();
    assert_eq!(state.enter(Page::Activities, &server).await, Page::Activities);
    assert!(state.logged_in);
    assert!(state.startup_complete);
    Ok(())
}

#[test]
fn server_url_without_slash_keeps_its_path() -> Result<()> {
    let base = parse_server_url("http://backup.local/urbackup")?;
    let server = UrBackupServer::with_client(reqwest::Client::new(), &base, "")?;
    let url = server.zip_download_url(1, 2, "/");
    assert!(url.as_str().starts_with("http://backup.local/urbackup/x?"));
    Ok(())
}
