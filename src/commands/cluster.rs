use anyhow::{Context, Result};
use std::io::Write;

use super::output::{Table, ignore_broken_pipe};
use super::styled_headers;
use crate::metastore::MetastoreApi;
use crate::ui::create_spinner;

/// `cluster list`: one row per mounted cluster
pub async fn list(api: &dyn MetastoreApi, out: &mut dyn Write) -> Result<()> {
    let spinner = create_spinner("Fetching cluster metadata...");
    let clusters = api.list_clusters().await;
    spinner.finish_and_clear();
    let clusters = clusters.context("Failed to list cluster infos")?;

    let mut table = Table::new(["FS Scheme", "FS Authority", "Trash FS Path", "State"])
        .styled(styled_headers());
    for info in &clusters {
        table.push_row([
            info.identifier.fs_scheme.clone(),
            info.identifier.fs_authority.clone(),
            info.trash_fs_path(),
            info.state.clone(),
        ]);
    }

    ignore_broken_pipe(table.render(out))?;
    Ok(())
}
