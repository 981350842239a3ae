use serde::{Deserialize, Serialize};

use super::entry::null_default;

/// Scheme and authority identifying a physical filesystem cluster
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterIdentifier {
    #[serde(
        rename = "FsAuthority",
        alias = "fsAuthority",
        default,
        deserialize_with = "null_default"
    )]
    pub fs_authority: String,

    #[serde(
        rename = "FsScheme",
        alias = "fsScheme",
        default,
        deserialize_with = "null_default"
    )]
    pub fs_scheme: String,
}

/// Cluster metadata as reported by the router metastore
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterInfo {
    #[serde(rename = "clusterIdentifier", default)]
    pub identifier: ClusterIdentifier,

    #[serde(rename = "trashPrefix", default, deserialize_with = "null_default")]
    pub trash_prefix: String,

    #[serde(default, deserialize_with = "null_default")]
    pub state: String,
}

impl ClusterInfo {
    /// Fully qualified trash location, e.g. `hdfs://cluster-1/user/.Trash`
    pub fn trash_fs_path(&self) -> String {
        format!(
            "{}://{}{}",
            self.identifier.fs_scheme, self.identifier.fs_authority, self.trash_prefix
        )
    }
}
