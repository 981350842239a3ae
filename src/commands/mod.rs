//! Subcommand implementations.
//!
//! Every command takes the metastore as a `MetastoreApi` trait object and
//! writes its report to a caller-supplied writer.

pub mod cluster;
pub mod mount;
pub mod output;
pub mod service;

use anyhow::{Context, Result};

use crate::metastore::MetastoreApi;
use crate::mount::MountTable;
use crate::ui::create_spinner;

/// Bold table headers only when colored output is enabled
pub(crate) fn styled_headers() -> bool {
    colored::control::SHOULD_COLORIZE.should_colorize()
}

/// Fetch a fresh mount table snapshot
pub(crate) async fn fetch_mounts(api: &dyn MetastoreApi) -> Result<MountTable> {
    let spinner = create_spinner("Fetching mount table...");
    let result = api.list_mounts().await;
    spinner.finish_and_clear();
    result.context("Failed to list mount entries")
}
