use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use crate::commands::{self, mount::ListOptions, mount::ResolveOptions};
use crate::config::{ConnectionConfig, ConnectionFlags};
use crate::metastore::{MetastoreApi, RouterClient};
use crate::mount::{Direction, MatchMode};

pub const LOGO: &str = r"
 ██████╗ ██████╗ ███████╗███████╗
██╔═══██╗██╔══██╗██╔════╝██╔════╝
██║   ██║██████╔╝█████╗  ███████╗
██║▄▄ ██║██╔══██╗██╔══╝  ╚════██║
╚██████╔╝██████╔╝██║     ███████║
 ╚══▀▀═╝ ╚═════╝ ╚═╝     ╚══════╝
";

#[derive(Parser, Debug)]
#[command(name = "qbfs-tool", version, about = "QBFS router metastore client", long_about = None)]
#[command(before_help = LOGO)]
pub struct Cli {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Log debug output to stderr (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// Router metastore API prefix, e.g. http://router:8080/api
    #[arg(short = 'u', long = "server_url", env = "QBFS_SERVER_URL", global = true)]
    pub server_url: Option<String>,

    /// Router access token
    #[arg(
        short = 't',
        long = "server_token",
        env = "QBFS_SERVER_TOKEN",
        hide_env_values = true,
        global = true
    )]
    pub server_token: Option<String>,

    /// YAML file with ServerUrl / ServerToken, overrides the flags
    #[arg(short = 'p', long = "conf_path", global = true)]
    pub conf_path: Option<PathBuf>,
}

impl From<&ConnectionArgs> for ConnectionFlags {
    fn from(args: &ConnectionArgs) -> Self {
        ConnectionFlags {
            server_url: args.server_url.clone(),
            server_token: args.server_token.clone(),
            conf_path: args.conf_path.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Options for the router-server service
    #[command(visible_alias = "s")]
    Service {
        #[command(subcommand)]
        cmd: ServiceCmd,
    },
    /// Options for clusters
    #[command(visible_alias = "c")]
    Cluster {
        #[command(subcommand)]
        cmd: ClusterCmd,
    },
    /// Options for mount entries
    #[command(visible_alias = "m")]
    Mount {
        #[command(subcommand)]
        cmd: MountCmd,
    },
}

#[derive(Subcommand, Debug)]
pub enum ServiceCmd {
    /// Show the router-server service state
    State {
        /// Calls made against each API
        #[arg(
            short = 'n',
            long = "check-number",
            default_value_t = commands::service::DEFAULT_CHECK_NUMBER,
            value_parser = clap::value_parser!(u32).range(1..)
        )]
        check_number: u32,
    },
}

#[derive(Subcommand, Debug)]
pub enum ClusterCmd {
    /// List cluster info
    List,
}

#[derive(Subcommand, Debug)]
pub enum MountCmd {
    /// Add a new mount entry (not supported)
    Add,
    /// Remove a mount entry (not supported)
    Remove,
    /// Dump the mount table to a local file
    Dump {
        /// Directory to write mounts.dump.<timestamp> into (default: current directory)
        #[arg(short = 'o', long = "output-file-path")]
        output_file_path: Option<PathBuf>,
    },
    /// List all mount entries
    List {
        /// Also show replica path and replica cluster
        #[arg(short = 'r', long = "with-replica-path")]
        with_replica_path: bool,

        /// Only show entries targeting this cluster id
        #[arg(short = 'c', long = "filter-cluster-id")]
        filter_cluster_id: Option<String>,
    },
    /// Resolve qbfs:// URIs to physical paths, or physical paths back with --reverse
    Resolve {
        /// Paths to resolve
        #[arg(required = true)]
        paths: Vec<String>,

        /// Map physical paths back to qbfs:// URIs
        #[arg(short = 'r', long)]
        reverse: bool,

        /// Only match mount points on path segment boundaries
        #[arg(short = 's', long)]
        segment_match: bool,
    },
}

impl Cli {
    /// Build a metastore client from the merged connection settings
    fn connect(&self) -> Result<Arc<dyn MetastoreApi>> {
        let config = ConnectionConfig::load(&ConnectionFlags::from(&self.connection))
            .context("Failed to load connection settings")?;
        tracing::debug!(server = %config.server_url, "Using router metastore");
        let client = RouterClient::new(&config).context("Failed to create metastore client")?;
        Ok(Arc::new(client))
    }

    /// Run the selected command, writing its report to `out`
    pub async fn run(self, out: &mut dyn Write) -> Result<()> {
        match &self.command {
            Command::Service {
                cmd: ServiceCmd::State { check_number },
            } => {
                let api = self.connect()?;
                commands::service::state(api, *check_number, out).await?;
                Ok(())
            }
            Command::Cluster {
                cmd: ClusterCmd::List,
            } => {
                let api = self.connect()?;
                commands::cluster::list(api.as_ref(), out).await
            }
            Command::Mount { cmd } => run_mount(cmd, || self.connect(), out).await,
        }
    }
}

/// Run a mount subcommand; `connect` is only called by subcommands that talk to the router
pub(crate) async fn run_mount<F>(cmd: &MountCmd, connect: F, out: &mut dyn Write) -> Result<()>
where
    F: FnOnce() -> Result<Arc<dyn MetastoreApi>>,
{
    match cmd {
        MountCmd::Add | MountCmd::Remove => commands::mount::unsupported(out),
        MountCmd::Dump { output_file_path } => {
            let api = connect()?;
            commands::mount::dump(api.as_ref(), output_file_path.as_deref(), out).await?;
            Ok(())
        }
        MountCmd::List {
            with_replica_path,
            filter_cluster_id,
        } => {
            let api = connect()?;
            let opts = ListOptions {
                filter_cluster_id: filter_cluster_id.clone(),
                with_replica_path: *with_replica_path,
            };
            commands::mount::list(api.as_ref(), &opts, out).await
        }
        MountCmd::Resolve {
            paths,
            reverse,
            segment_match,
        } => {
            let api = connect()?;
            let opts = ResolveOptions {
                direction: if *reverse {
                    Direction::Reverse
                } else {
                    Direction::Forward
                },
                mode: if *segment_match {
                    MatchMode::Segment
                } else {
                    MatchMode::Prefix
                },
            };
            let resolutions = commands::mount::resolve(api.as_ref(), paths, opts, out).await?;
            let failed = resolutions.iter().filter(|r| !r.is_resolved()).count();
            if failed > 0 {
                bail!("{failed} of {} paths could not be resolved", resolutions.len());
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metastore::MetastoreError;
    use crate::mount::{ClusterInfo, MountEntry, MountTable};
    use async_trait::async_trait;
    use clap::CommandFactory;

    struct StaticMetastore;

    #[async_trait]
    impl MetastoreApi for StaticMetastore {
        async fn list_mounts(&self) -> Result<MountTable, MetastoreError> {
            Ok(MountTable::new(vec![
                MountEntry::new("c1/a", "hdfs://cluster-1/system", "cluster-1"),
                MountEntry::new("c2/b", "hdfs://cluster-2/system", "cluster-2"),
            ]))
        }

        async fn list_clusters(&self) -> Result<Vec<ClusterInfo>, MetastoreError> {
            Ok(Vec::new())
        }
    }

    fn static_api() -> Result<Arc<dyn MetastoreApi>> {
        Ok(Arc::new(StaticMetastore))
    }

    fn mount_cmd(args: &[&str]) -> MountCmd {
        let argv = ["qbfs-tool", "mount"].iter().chain(args).copied();
        match Cli::try_parse_from(argv).unwrap().command {
            Command::Mount { cmd } => cmd,
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_aliases_and_flags() {
        let cli = Cli::try_parse_from([
            "qbfs-tool", "-u", "http://router", "-t", "tok", "m", "list", "-r", "-c", "cluster-1",
        ])
        .unwrap();

        assert_eq!(cli.connection.server_url.as_deref(), Some("http://router"));
        assert_eq!(cli.connection.server_token.as_deref(), Some("tok"));
        match cli.command {
            Command::Mount {
                cmd:
                    MountCmd::List {
                        with_replica_path,
                        filter_cluster_id,
                    },
            } => {
                assert!(with_replica_path);
                assert_eq!(filter_cluster_id.as_deref(), Some("cluster-1"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_check_number_defaults_and_bounds() {
        let cli = Cli::try_parse_from(["qbfs-tool", "service", "state"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Service {
                cmd: ServiceCmd::State { check_number: 5 }
            }
        ));

        assert!(Cli::try_parse_from(["qbfs-tool", "s", "state", "-n", "0"]).is_err());
    }

    #[test]
    fn test_resolve_requires_a_path() {
        assert!(Cli::try_parse_from(["qbfs-tool", "mount", "resolve"]).is_err());

        let cli = Cli::try_parse_from([
            "qbfs-tool",
            "mount",
            "resolve",
            "--reverse",
            "hdfs://cluster-1/system/a",
            "hdfs://cluster-1/log/b",
        ])
        .unwrap();
        match cli.command {
            Command::Mount {
                cmd: MountCmd::Resolve { paths, reverse, segment_match },
            } => {
                assert_eq!(paths.len(), 2);
                assert!(reverse);
                assert!(!segment_match);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_resolve_fails_after_printing_every_row() {
        let cmd = mount_cmd(&["resolve", "qbfs://c1/a/x", "qbfs://c4/x", "qbfs://c2/b/y"]);
        let mut out = Vec::new();

        let err = run_mount(&cmd, static_api, &mut out).await.unwrap_err();
        assert_eq!(err.to_string(), "1 of 3 paths could not be resolved");

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("hdfs://cluster-1/system/x"));
        assert!(text.contains("qbfs://c4/x"));
        assert!(text.contains("NOT FOUND"));
        assert!(text.contains("hdfs://cluster-2/system/y"));
        assert!(text.trim_end().ends_with("Resolved: 2/3"));
    }

    #[tokio::test]
    async fn test_resolve_succeeds_when_every_path_resolves() {
        let cmd = mount_cmd(&["resolve", "-r", "hdfs://cluster-2/system/y"]);
        let mut out = Vec::new();

        run_mount(&cmd, static_api, &mut out).await.unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("qbfs://c2/b/y"));
        assert!(text.contains("Resolved: 1/1"));
    }

    #[tokio::test]
    async fn test_mount_connection_failure_is_reported() {
        let cmd = mount_cmd(&["list"]);
        let mut out = Vec::new();

        let err = run_mount(&cmd, || bail!("no router configured"), &mut out)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "no router configured");
        assert!(out.is_empty());
    }

    #[test]
    fn test_conf_path_flag() {
        let cli =
            Cli::try_parse_from(["qbfs-tool", "--conf_path", "/etc/qbfs.yaml", "cluster", "list"])
                .unwrap();
        assert_eq!(
            cli.connection.conf_path.as_deref(),
            Some(std::path::Path::new("/etc/qbfs.yaml"))
        );
        assert!(Cli::try_parse_from(["qbfs-tool", "-p", "x.yaml", "c", "list"]).is_ok());
    }

    #[tokio::test]
    async fn test_add_and_remove_need_no_connection() {
        for sub in ["add", "remove"] {
            let cli = Cli::try_parse_from(["qbfs-tool", "mount", sub]).unwrap();
            let mut out = Vec::new();
            cli.run(&mut out).await.unwrap();
            assert_eq!(String::from_utf8(out).unwrap(), "Not supported yet.\n");
        }
    }
}
