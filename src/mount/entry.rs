use serde::{Deserialize, Deserializer, Serialize};

/// Treat a JSON `null` the same as a missing field.
///
/// The router serializes unset strings and lists as `null`, which plain serde
/// would refuse for `String` / `Vec` targets.
pub(crate) fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One entry of the router mount table
///
/// Field names on the wire follow the router's JSON shape, so a dumped
/// table can be read back by the router tooling unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountEntry {
    /// Mount point in the virtual namespace, without scheme (e.g. `c1/a`)
    #[serde(rename = "path", default, deserialize_with = "null_default")]
    pub virtual_path: String,

    #[serde(default)]
    pub attributes: i64,

    #[serde(rename = "targetClusterID", default, deserialize_with = "null_default")]
    pub target_cluster_id: String,

    /// Physical path this mount resolves to (e.g. `hdfs://cluster-1/system`)
    #[serde(rename = "targetFsPath", default, deserialize_with = "null_default")]
    pub target_path: String,

    #[serde(
        rename = "TargetFsConfig",
        alias = "targetFsConfig",
        default,
        deserialize_with = "null_default"
    )]
    pub target_fs_config: String,

    #[serde(rename = "replicaFsPath", default, deserialize_with = "null_default")]
    pub replica_path: String,

    #[serde(rename = "replicaClusterID", default, deserialize_with = "null_default")]
    pub replica_cluster_id: String,

    #[serde(
        rename = "ReplicaFsConfig",
        alias = "replicaFsConfig",
        default,
        deserialize_with = "null_default"
    )]
    pub replica_fs_config: String,

    #[serde(rename = "switchMode", default)]
    pub switch_mode: u8,
}

impl MountEntry {
    /// Create an entry carrying only the fields path resolution looks at
    pub fn new(
        virtual_path: impl Into<String>,
        target_path: impl Into<String>,
        target_cluster_id: impl Into<String>,
    ) -> Self {
        MountEntry {
            virtual_path: virtual_path.into(),
            target_path: target_path.into(),
            target_cluster_id: target_cluster_id.into(),
            ..Default::default()
        }
    }

    /// Mount point with surrounding whitespace removed, as used for matching
    pub fn mount_point(&self) -> &str {
        self.virtual_path.trim()
    }
}

/// Snapshot of the mount table fetched for a single command invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountTable {
    entries: Vec<MountEntry>,
}

impl MountTable {
    pub fn new(entries: Vec<MountEntry>) -> Self {
        MountTable { entries }
    }

    pub fn entries(&self) -> &[MountEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MountEntry> {
        self.entries.iter()
    }

    /// Entries owned by the given cluster; an empty id keeps everything
    pub fn filter_by_cluster<'a>(
        &'a self,
        cluster_id: &'a str,
    ) -> impl Iterator<Item = &'a MountEntry> + 'a {
        self.entries
            .iter()
            .filter(move |e| cluster_id.is_empty() || e.target_cluster_id == cluster_id)
    }

    pub fn into_entries(self) -> Vec<MountEntry> {
        self.entries
    }
}

impl From<Vec<MountEntry>> for MountTable {
    fn from(entries: Vec<MountEntry>) -> Self {
        MountTable::new(entries)
    }
}

impl<'a> IntoIterator for &'a MountTable {
    type Item = &'a MountEntry;
    type IntoIter = std::slice::Iter<'a, MountEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
