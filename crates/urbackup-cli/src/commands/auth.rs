use std::io::{self, BufRead, IsTerminal};

use anyhow::anyhow;
use tracing::info;

use crate::cli::LoginArgs;
use crate::client::{AppContext, CliError, CliResult};

pub(crate) async fn handle_login(ctx: &AppContext, args: LoginArgs) -> CliResult<()> {
    let server = ctx.server();
    let probe = server.anonymous_login().await?;

    let username = args
        .username
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty());
    let Some(username) = username else {
        if probe.is_success() {
            ctx.persist_session()?;
            println!("Logged in without credentials");
            return Ok(());
        }
        return Err(CliError::validation(
            "the server requires a login; pass --username",
        ));
    };

    let password = resolve_password(&args)?;
    let ldap = args.ldap || probe.ldap_enabled.unwrap_or(false);
    let response = server.login(username, &password, ldap).await?;
    if !response.is_success() {
        return Err(CliError::failure(anyhow!(
            "the server did not accept the login"
        )));
    }

    ctx.persist_session()?;
    info!(username, ldap, "logged in");
    println!("Logged in as {username}");
    Ok(())
}

pub(crate) fn handle_logout(ctx: &AppContext) -> CliResult<()> {
    ctx.sessions.clear()?;
    println!("Logged out");
    Ok(())
}

pub(crate) fn resolve_password(args: &LoginArgs) -> CliResult<String> {
    if let Some(value) = &args.password {
        return non_empty(value);
    }

    if args.password_stdin {
        return read_password_line(&mut io::stdin().lock());
    }

    if io::stdin().is_terminal() {
        let pass = rpassword::prompt_password("Password: ").map_err(|err| {
            CliError::failure(anyhow!("failed to read password from terminal: {err}"))
        })?;
        non_empty(&pass)
    } else {
        Err(CliError::validation(
            "password required; supply --password or --password-stdin when running non-interactively",
        ))
    }
}

pub(crate) fn read_password_line(reader: &mut impl BufRead) -> CliResult<String> {
    let mut line = String::new();
    reader
        .read_line(&mut line)
        .map_err(|err| CliError::failure(anyhow!("failed to read password from stdin: {err}")))?;
    non_empty(line.trim_end_matches(['\r', '\n']))
}

fn non_empty(value: &str) -> CliResult<String> {
    if value.is_empty() {
        Err(CliError::validation("password cannot be empty"))
    } else {
        Ok(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::context_with;
    use httpmock::prelude::*;
    use serde_json::json;

    #[test]
    fn password_flag_wins_and_must_not_be_empty() {
        let args = LoginArgs {
            password: Some(" pw ".to_string()),
            ..LoginArgs::default()
        };
        assert_eq!(resolve_password(&args).expect("password"), " pw ");

        let empty = LoginArgs {
            password: Some(String::new()),
            ..LoginArgs::default()
        };
        assert_eq!(resolve_password(&empty).expect_err("empty").exit_code(), 2);
    }

    #[test]
    fn stdin_password_drops_line_ending() {
        let mut input = io::Cursor::new("s3cret\r\nignored\n");
        assert_eq!(read_password_line(&mut input).expect("password"), "s3cret");
        let mut blank = io::Cursor::new("\n");
        assert!(read_password_line(&mut blank).is_err());
    }

    #[tokio::test]
    async fn anonymous_access_is_persisted() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST).path("/x").query_param("a", "login").body("");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"success": true, "session": "anon"}));
        });

        let (ctx, _dir) = context_with(&server, "");
        handle_login(&ctx, LoginArgs::default())
            .await
            .expect("anonymous login should succeed");

        mock.assert();
        assert_eq!(ctx.sessions.load().expect("session"), "anon");
    }

    #[tokio::test]
    async fn credentials_are_required_when_anonymous_access_is_refused() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/x").query_param("a", "login");
            then.status(200).json_body(json!({"success": false}));
        });

        let (ctx, _dir) = context_with(&server, "");
        let err = handle_login(&ctx, LoginArgs::default())
            .await
            .expect_err("username required");
        assert_eq!(err.exit_code(), 2);
        assert_eq!(ctx.sessions.load().expect("session"), "");
    }

    #[tokio::test]
    async fn local_login_persists_salt_session() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/x").query_param("a", "login").body("");
            then.status(200).json_body(json!({"success": false}));
        });
        server.mock(|when, then| {
            when.method(POST)
                .path("/x")
                .query_param("a", "salt")
                .form_urlencoded_tuple("username", "admin");
            then.status(200).json_body(json!({
                "salt": "s4lt", "rnd": "r4nd", "pbkdf2_rounds": 1000, "ses": "ses-1"
            }));
        });
        let login = server.mock(|when, then| {
            when.method(POST)
                .path("/x")
                .query_param("a", "login")
                .form_urlencoded_tuple("username", "admin")
                .form_urlencoded_tuple("password", "7a87147a1bbdf8c5b5a071b523bf6689")
                .form_urlencoded_tuple("ses", "ses-1");
            then.status(200).json_body(json!({"success": true}));
        });

        let (ctx, _dir) = context_with(&server, "");
        let args = LoginArgs {
            username: Some("admin".to_string()),
            password: Some("admin".to_string()),
            ..LoginArgs::default()
        };
        handle_login(&ctx, args).await.expect("login should succeed");

        login.assert();
        assert_eq!(ctx.sessions.load().expect("session"), "ses-1");
    }

    #[tokio::test]
    async fn server_ldap_flag_selects_plain_password_login() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/x").query_param("a", "login").body("");
            then.status(200)
                .json_body(json!({"success": false, "ldap_enabled": true}));
        });
        let salt = server.mock(|when, then| {
            when.method(POST).path("/x").query_param("a", "salt");
            then.status(200).json_body(json!({"error": 0}));
        });
        let login = server.mock(|when, then| {
            when.method(POST)
                .path("/x")
                .query_param("a", "login")
                .form_urlencoded_tuple("username", "carol")
                .form_urlencoded_tuple("password", "hunter2")
                .form_urlencoded_tuple("plainpw", "1");
            then.status(200)
                .json_body(json!({"success": true, "session": "ldap-ses"}));
        });

        let (ctx, _dir) = context_with(&server, "");
        let args = LoginArgs {
            username: Some("carol".to_string()),
            password: Some("hunter2".to_string()),
            ..LoginArgs::default()
        };
        handle_login(&ctx, args)
            .await
            .expect("directory login should succeed");

        login.assert();
        salt.assert_calls(0);
        assert_eq!(ctx.sessions.load().expect("session"), "ldap-ses");
    }

    #[tokio::test]
    async fn logout_clears_session_file() {
        let server = MockServer::start_async().await;
        let (ctx, _dir) = context_with(&server, "");
        ctx.sessions.save("old").expect("save");
        handle_logout(&ctx).expect("logout");
        assert_eq!(ctx.sessions.load().expect("session"), "");
        handle_logout(&ctx).expect("repeated logout");
    }
}
