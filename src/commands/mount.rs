use anyhow::{Context, Result};
use chrono::Utc;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::output::{SEPARATOR, Table, ignore_broken_pipe, write_line};
use super::{fetch_mounts, styled_headers};
use crate::metastore::MetastoreApi;
use crate::mount::{Direction, MatchMode, PathResolver, Resolution};

/// File name prefix of mount table dumps; the unix timestamp is appended
pub const DUMP_FILE_PREFIX: &str = "mounts.dump";

/// Options for `mount list`
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Only show entries whose target cluster has this id
    pub filter_cluster_id: Option<String>,
    /// Add replica path and replica cluster columns
    pub with_replica_path: bool,
}

/// Options for `mount resolve`
#[derive(Debug, Clone, Copy)]
pub struct ResolveOptions {
    pub direction: Direction,
    pub mode: MatchMode,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        ResolveOptions {
            direction: Direction::Forward,
            mode: MatchMode::Prefix,
        }
    }
}

/// `mount list`
pub async fn list(api: &dyn MetastoreApi, opts: &ListOptions, out: &mut dyn Write) -> Result<()> {
    let mounts = fetch_mounts(api).await?;

    let mut headers = vec!["QBFS URI", "Target FS Path", "Target FS ClusterID"];
    if opts.with_replica_path {
        headers.extend(["Replica FS Path", "Replica FS ClusterID"]);
    }
    let mut table = Table::new(headers).styled(styled_headers());

    let filter = opts.filter_cluster_id.as_deref().unwrap_or("");
    for entry in mounts.filter_by_cluster(filter) {
        let mut row = vec![
            entry.virtual_path.clone(),
            entry.target_path.clone(),
            entry.target_cluster_id.clone(),
        ];
        if opts.with_replica_path {
            row.push(entry.replica_path.clone());
            row.push(entry.replica_cluster_id.clone());
        }
        table.push_row(row);
    }

    write_line!(out, "{SEPARATOR}");
    write_line!(out, "Mount entry size: {}", table.len());
    ignore_broken_pipe(table.render(out))?;
    Ok(())
}

/// `mount dump`: write the mount table as JSON to `<dir>/mounts.dump.<unix-seconds>`
///
/// Returns the path of the written file.
pub async fn dump(
    api: &dyn MetastoreApi,
    output_dir: Option<&Path>,
    out: &mut dyn Write,
) -> Result<PathBuf> {
    let dir = match output_dir {
        Some(dir) => dir.to_path_buf(),
        None => std::env::current_dir().context("Failed to determine current directory")?,
    };

    let mounts = fetch_mounts(api).await?;
    let json = serde_json::to_vec(mounts.entries()).context("Failed to serialize mount table")?;

    let filename = dir.join(format!("{DUMP_FILE_PREFIX}.{}", Utc::now().timestamp()));
    ignore_broken_pipe(writeln!(out, "{SEPARATOR}"))?;
    tokio::fs::write(&filename, &json)
        .await
        .with_context(|| format!("Fail to dump mounts to {}", filename.display()))?;

    tracing::info!(
        entries = mounts.len(),
        file = %filename.display(),
        "Dumped mount table"
    );
    ignore_broken_pipe(writeln!(
        out,
        "SUCCEED: dump mount tables to {}",
        filename.display()
    ))?;
    Ok(filename)
}

/// `mount resolve`: resolve each path against one fetched snapshot
///
/// Every path is resolved and reported even when some fail; the outcomes are
/// returned so the caller can decide the exit status.
pub async fn resolve(
    api: &dyn MetastoreApi,
    paths: &[String],
    opts: ResolveOptions,
    out: &mut dyn Write,
) -> Result<Vec<Resolution>> {
    let mounts = fetch_mounts(api).await?;
    let resolutions = PathResolver::new(&mounts)
        .with_mode(opts.mode)
        .resolve_all(paths, opts.direction);

    for r in resolutions.iter().filter(|r| !r.is_resolved()) {
        if let Err(e) = &r.outcome {
            tracing::debug!(query = %r.query, kind = e.kind(), "Path not resolved");
        }
    }

    render_resolutions(&resolutions, out)?;
    Ok(resolutions)
}

fn render_resolutions(resolutions: &[Resolution], out: &mut dyn Write) -> Result<()> {
    let mut table = Table::new(["Query Path", "Resolved Path", "State"]).styled(styled_headers());
    for r in resolutions {
        match &r.outcome {
            Ok(path) => table.push_row([r.query.clone(), path.clone(), "OK".to_string()]),
            Err(e) => table.push_row([r.query.clone(), e.to_string(), e.kind().to_uppercase()]),
        }
    }

    let resolved = resolutions.iter().filter(|r| r.is_resolved()).count();
    ignore_broken_pipe(table.render(out))?;
    write_line!(out, "{SEPARATOR}");
    write_line!(out, "Resolved: {resolved}/{}", resolutions.len());
    Ok(())
}

/// `mount add` / `mount remove`: mount mutation is not offered by this tool
pub fn unsupported(out: &mut dyn Write) -> Result<()> {
    write_line!(out, "Not supported yet.");
    Ok(())
}
