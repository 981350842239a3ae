//! Longest-prefix path resolution against a mount table.
//!
//! Forward resolution maps a `qbfs://` URI onto the physical path of the most
//! specific mount; reverse resolution maps a physical path back onto the
//! virtual namespace. Both are pure functions of the table snapshot.

use percent_encoding::percent_decode_str;
use reqwest::Url;
use std::cmp::Ordering;
use thiserror::Error;

use super::{MountEntry, MountTable};

/// URI scheme identifying the virtual namespace
pub const VIRTUAL_SCHEME: &str = "qbfs";

/// Failure to resolve a single query
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// The query could not be parsed as a `scheme://authority/path` URI
    #[error("malformed path '{path}': {reason}")]
    MalformedInput { path: String, reason: String },

    /// The query parsed but is not in the virtual namespace
    #[error("unsupported scheme '{scheme}' in '{path}', expected qbfs://")]
    WrongScheme { path: String, scheme: String },

    /// No mount prefix covers the query
    #[error("no mount entry matches '{path}'")]
    NotFound { path: String },
}

impl ResolveError {
    /// Short label for the failure kind
    pub fn kind(&self) -> &'static str {
        match self {
            ResolveError::MalformedInput { .. } => "malformed",
            ResolveError::WrongScheme { .. } => "wrong scheme",
            ResolveError::NotFound { .. } => "not found",
        }
    }
}

/// Which way a query is resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// `qbfs://` URI to physical path
    Forward,
    /// Physical path to `qbfs://` URI
    Reverse,
}

impl Direction {
    /// The side of the mount entry the query is matched against
    fn prefix_of(self, entry: &MountEntry) -> &str {
        match self {
            Direction::Forward => entry.mount_point(),
            Direction::Reverse => &entry.target_path,
        }
    }

    /// The side of the mount entry the query is rewritten to
    fn counterpart_of(self, entry: &MountEntry) -> &str {
        match self {
            Direction::Forward => &entry.target_path,
            Direction::Reverse => entry.mount_point(),
        }
    }
}

/// How a mount prefix has to line up with the query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// Raw string prefix, as the router matches: `c1/a` covers `c1/ab`
    #[default]
    Prefix,
    /// The prefix has to end on a path segment boundary
    Segment,
}

impl MatchMode {
    fn accepts(self, prefix: &str, remainder: &str) -> bool {
        match self {
            MatchMode::Prefix => true,
            MatchMode::Segment => {
                prefix.is_empty()
                    || remainder.is_empty()
                    || remainder.starts_with('/')
                    || prefix.ends_with('/')
            }
        }
    }
}

/// A path to resolve together with its direction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionQuery {
    pub path: String,
    pub direction: Direction,
}

impl ResolutionQuery {
    pub fn forward(path: impl Into<String>) -> Self {
        ResolutionQuery {
            path: path.into(),
            direction: Direction::Forward,
        }
    }

    pub fn reverse(path: impl Into<String>) -> Self {
        ResolutionQuery {
            path: path.into(),
            direction: Direction::Reverse,
        }
    }
}

/// Outcome of one query in a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub query: String,
    pub outcome: Result<String, ResolveError>,
}

impl Resolution {
    pub fn is_resolved(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Extract the matchable part of a `qbfs://` URI: authority followed by path
///
/// The candidate is taken from the raw input, so dot segments and trailing
/// characters survive untouched. Query string, fragment and userinfo are
/// dropped, percent escapes are decoded. Leading whitespace and control
/// characters make the input malformed.
pub fn virtual_candidate(uri: &str) -> Result<String, ResolveError> {
    let malformed = |reason: &str| ResolveError::MalformedInput {
        path: uri.to_string(),
        reason: reason.to_string(),
    };

    if uri.starts_with(|c: char| c.is_whitespace()) {
        return Err(malformed("leading whitespace"));
    }
    if uri.chars().any(|c| c.is_ascii_control()) {
        return Err(malformed("invalid control character"));
    }

    // Only the scheme and the presence of an authority are taken from the parser
    let url = Url::parse(uri).map_err(|e| malformed(&e.to_string()))?;

    if url.scheme() != VIRTUAL_SCHEME {
        return Err(ResolveError::WrongScheme {
            path: uri.to_string(),
            scheme: url.scheme().to_string(),
        });
    }
    if !url.has_authority() {
        return Err(malformed("missing '//' authority section"));
    }

    let (_, rest) = uri
        .split_once("://")
        .ok_or_else(|| malformed("missing '//' authority section"))?;
    let rest = rest.split(['?', '#']).next().unwrap_or_default();
    let (authority, path) = match rest.find('/') {
        Some(idx) => rest.split_at(idx),
        None => (rest, ""),
    };
    let host = authority.rsplit('@').next().unwrap_or_default();

    let decode = |part: &str| {
        if !has_valid_escapes(part) {
            return Err(malformed("invalid percent escape"));
        }
        percent_decode_str(part)
            .decode_utf8()
            .map(|s| s.into_owned())
            .map_err(|e| malformed(&e.to_string()))
    };

    let mut candidate = decode(host)?;
    candidate.push_str(&decode(path)?);
    Ok(candidate)
}

/// Every `%` is followed by two hex digits
fn has_valid_escapes(part: &str) -> bool {
    let bytes = part.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes.get(i + 1..i + 3);
            if !hex.is_some_and(|h| h.iter().all(u8::is_ascii_hexdigit)) {
                return false;
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    true
}

/// Resolves paths against one mount table snapshot
#[derive(Debug, Clone, Copy)]
pub struct PathResolver<'a> {
    table: &'a MountTable,
    mode: MatchMode,
}

impl<'a> PathResolver<'a> {
    pub fn new(table: &'a MountTable) -> Self {
        PathResolver {
            table,
            mode: MatchMode::default(),
        }
    }

    pub fn with_mode(mut self, mode: MatchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    /// Resolve a single path in the given direction
    pub fn resolve(&self, path: &str, direction: Direction) -> Result<String, ResolveError> {
        match direction {
            Direction::Forward => self.forward(path),
            Direction::Reverse => self.reverse(path),
        }
    }

    pub fn resolve_query(&self, query: &ResolutionQuery) -> Result<String, ResolveError> {
        self.resolve(&query.path, query.direction)
    }

    /// Map a `qbfs://` URI to the physical path of its longest matching mount
    pub fn forward(&self, uri: &str) -> Result<String, ResolveError> {
        let candidate = virtual_candidate(uri)?;
        let (entry, remainder) = self
            .longest_match(&candidate, Direction::Forward)
            .ok_or_else(|| ResolveError::NotFound {
                path: uri.to_string(),
            })?;

        Ok(format!("{}{}", entry.target_path, remainder))
    }

    /// Map a physical path back to a `qbfs://` URI
    pub fn reverse(&self, path: &str) -> Result<String, ResolveError> {
        let (entry, remainder) = self
            .longest_match(path, Direction::Reverse)
            .ok_or_else(|| ResolveError::NotFound {
                path: path.to_string(),
            })?;

        Ok(format!(
            "{VIRTUAL_SCHEME}://{}{}",
            entry.mount_point(),
            remainder
        ))
    }

    /// Resolve every path independently; one failure does not stop the rest
    pub fn resolve_all<I, S>(&self, paths: I, direction: Direction) -> Vec<Resolution>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        paths
            .into_iter()
            .map(|p| {
                let query = p.as_ref();
                Resolution {
                    query: query.to_string(),
                    outcome: self.resolve(query, direction),
                }
            })
            .collect()
    }

    /// Most specific eligible entry and the unmatched tail of `candidate`
    ///
    /// Equal-length prefixes are settled by the lexicographically smallest
    /// counterpart path, so the answer does not depend on table order.
    fn longest_match<'c>(
        &self,
        candidate: &'c str,
        direction: Direction,
    ) -> Option<(&'a MountEntry, &'c str)> {
        let entry = self
            .table
            .iter()
            .filter(|e| {
                let prefix = direction.prefix_of(e);
                candidate
                    .strip_prefix(prefix)
                    .is_some_and(|rest| self.mode.accepts(prefix, rest))
            })
            .max_by(|a, b| compare_specificity(a, b, direction))?;

        let remainder = &candidate[direction.prefix_of(entry).len()..];
        Some((entry, remainder))
    }
}

fn compare_specificity(a: &MountEntry, b: &MountEntry, direction: Direction) -> Ordering {
    let (pa, pb) = (direction.prefix_of(a), direction.prefix_of(b));
    pa.len()
        .cmp(&pb.len())
        .then_with(|| direction.counterpart_of(b).cmp(direction.counterpart_of(a)))
}
