//! Command handlers grouped by console page.

pub(crate) mod activities;
pub(crate) mod auth;
pub(crate) mod backups;
pub(crate) mod statistics;
pub(crate) mod status;
pub(crate) mod watch;

use std::path::Path;

use anyhow::anyhow;
use tracing::info;
use url::Url;

use crate::client::{AppContext, CliError, CliResult};

/// Stream `url` into `dest`, removing the partial file when the transfer fails.
pub(crate) async fn download_to_file(ctx: &AppContext, url: Url, dest: &Path) -> CliResult<()> {
    let mut file = tokio::fs::File::create(dest).await.map_err(|err| {
        CliError::failure(anyhow!("failed to create '{}': {err}", dest.display()))
    })?;

    match ctx.server().download_to(url, &mut file).await {
        Ok(bytes) => {
            info!(path = %dest.display(), bytes, "download saved");
            println!("Saved {bytes} bytes to {}", dest.display());
            Ok(())
        }
        Err(err) => {
            drop(file);
            let _ = tokio::fs::remove_file(dest).await;
            Err(err.into())
        }
    }
}
