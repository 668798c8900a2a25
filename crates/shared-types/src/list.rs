//! # List Model & Directory Collapsing
//!
//! `list(P)` surfaces the immediate children of a path prefix: stored URIs
//! directly under `P/` appear as leaves, and deeper URIs are collapsed into
//! synthesized directory entries. The collapsing, filtering, sorting, and
//! pagination logic lives here so every backend produces byte-identical
//! pages from the same stored set.

use crate::uri::Uri;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default page size when the caller does not specify one.
pub const DEFAULT_LIMIT: usize = 100;

/// Sort key for list results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    #[default]
    Name,
    Ts,
}

/// Sort direction for list results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Options accepted by the `list` operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListOptions {
    /// 1-based page number.
    pub page: usize,
    /// Page size.
    pub limit: usize,
    /// Substring filter applied to the full child URI.
    pub pattern: Option<String>,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_LIMIT,
            pattern: None,
            sort_by: SortBy::Name,
            sort_order: SortOrder::Asc,
        }
    }
}

/// Whether a listed child is a record or a synthesized directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListItemKind {
    Leaf,
    Directory,
}

/// One child of a listed prefix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListItem {
    pub uri: Uri,
    pub kind: ListItemKind,
}

/// Pagination envelope of a list result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageInfo {
    pub page: usize,
    pub limit: usize,
    /// Total matching children across all pages.
    pub total: usize,
}

/// One page of list results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListPage {
    pub items: Vec<ListItem>,
    pub page: PageInfo,
}

impl ListPage {
    /// The empty page, used for unlistable targets.
    pub fn empty(opts: &ListOptions) -> Self {
        Self {
            items: Vec::new(),
            page: PageInfo {
                page: opts.page,
                limit: opts.limit,
                total: 0,
            },
        }
    }
}

struct ChildEntry {
    /// ts of the record stored exactly at the child URI, if any.
    leaf_ts: Option<u64>,
    /// Max ts among the child and everything beneath it.
    max_ts: u64,
}

/// Collapse stored `(uri, ts)` pairs under `base` into one list page.
///
/// A stored URI participates when `base + "/"` is a strict prefix of it.
/// The first remaining path segment names the child: a leaf when a record
/// sits exactly there, a directory when only deeper records exist. Name
/// sort is lexicographic on the child URI; ts sort uses the record ts for
/// leaves and the newest descendant ts for directories; ties break by URI
/// ascending.
pub fn collapse_prefix<I>(base: &Uri, stored: I, opts: &ListOptions) -> ListPage
where
    I: IntoIterator<Item = (String, u64)>,
{
    let prefix = format!("{}/", base.as_str().trim_end_matches('/'));

    let mut children: BTreeMap<String, ChildEntry> = BTreeMap::new();
    for (uri, ts) in stored {
        let Some(remainder) = uri.strip_prefix(&prefix) else {
            continue;
        };
        if remainder.is_empty() {
            continue;
        }
        let segment_end = remainder.find('/').unwrap_or(remainder.len());
        let child_uri = format!("{}{}", prefix, &remainder[..segment_end]);
        let is_exact = segment_end == remainder.len();
        let entry = children.entry(child_uri).or_insert(ChildEntry {
            leaf_ts: None,
            max_ts: 0,
        });
        if is_exact {
            entry.leaf_ts = Some(ts);
        }
        entry.max_ts = entry.max_ts.max(ts);
    }

    let mut rows: Vec<(String, ListItemKind, u64)> = children
        .into_iter()
        .filter(|(uri, _)| match &opts.pattern {
            Some(pattern) => uri.contains(pattern.as_str()),
            None => true,
        })
        .map(|(uri, entry)| {
            let kind = match entry.leaf_ts {
                Some(_) => ListItemKind::Leaf,
                None => ListItemKind::Directory,
            };
            let ts = entry.leaf_ts.unwrap_or(entry.max_ts);
            (uri, kind, ts)
        })
        .collect();

    match (opts.sort_by, opts.sort_order) {
        // BTreeMap iteration is already name-ascending.
        (SortBy::Name, SortOrder::Asc) => {}
        (SortBy::Name, SortOrder::Desc) => rows.reverse(),
        (SortBy::Ts, SortOrder::Asc) => rows.sort_by(|a, b| a.2.cmp(&b.2).then(a.0.cmp(&b.0))),
        (SortBy::Ts, SortOrder::Desc) => rows.sort_by(|a, b| b.2.cmp(&a.2).then(a.0.cmp(&b.0))),
    }

    let total = rows.len();
    let page = opts.page.max(1);
    let start = (page - 1).saturating_mul(opts.limit).min(total);
    let end = start.saturating_add(opts.limit).min(total);
    let items = rows[start..end]
        .iter()
        .map(|(uri, kind, _)| ListItem {
            uri: Uri::parse(uri).expect("child uris derive from parsed uris"),
            kind: *kind,
        })
        .collect();

    ListPage {
        items,
        page: PageInfo {
            page,
            limit: opts.limit,
            total,
        },
    }
}
