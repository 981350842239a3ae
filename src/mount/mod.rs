pub mod cluster;
pub mod entry;
pub mod resolver;

pub use cluster::{ClusterIdentifier, ClusterInfo};
pub use entry::{MountEntry, MountTable};
pub use resolver::{
    Direction, MatchMode, PathResolver, Resolution, ResolutionQuery, ResolveError,
    VIRTUAL_SCHEME,
};
