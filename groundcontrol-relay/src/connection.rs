//! Relay-style cursor connections over an ordered slice.
//!
//! Cursors are item ids rather than offsets, so a cursor handed out earlier
//! still points at the same item after the underlying collection grows.

use serde::{Deserialize, Serialize};

use crate::error::PaginationError;

/// Window arguments: `first`/`after` page forward, `last`/`before` page backward.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionArgs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last: Option<i64>,
}

impl ConnectionArgs {
    pub fn first(mut self, first: i64) -> Self {
        self.first = Some(first);
        self
    }

    pub fn last(mut self, last: i64) -> Self {
        self.last = Some(last);
        self
    }

    pub fn after(mut self, cursor: impl Into<String>) -> Self {
        self.after = Some(cursor.into());
        self
    }

    pub fn before(mut self, cursor: impl Into<String>) -> Self {
        self.before = Some(cursor.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge<T> {
    pub cursor: String,
    pub node: T,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub start_cursor: Option<String>,
    pub end_cursor: Option<String>,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection<T> {
    pub edges: Vec<Edge<T>>,
    pub page_info: PageInfo,
}

impl<T> Connection<T> {
    /// The nodes in edge order.
    pub fn nodes(&self) -> impl Iterator<Item = &T> {
        self.edges.iter().map(|edge| &edge.node)
    }

    pub fn map<U, F>(self, mut f: F) -> Connection<U>
    where
        F: FnMut(T) -> U,
    {
        Connection {
            edges: self
                .edges
                .into_iter()
                .map(|edge| Edge {
                    cursor: edge.cursor,
                    node: f(edge.node),
                })
                .collect(),
            page_info: self.page_info,
        }
    }
}

/// An empty cursor is treated the same as no cursor.
fn cursor_of(cursor: &Option<String>) -> Option<&str> {
    cursor.as_deref().filter(|c| !c.is_empty())
}

fn offset_of<T, F>(data: &[T], cursor: Option<&str>, get_id: &F) -> Option<isize>
where
    F: Fn(&T) -> &str,
{
    let cursor = cursor?;
    data.iter()
        .position(|item| get_id(item) == cursor)
        .map(|idx| idx as isize)
}

fn non_negative(value: Option<i64>, argument: &'static str) -> Result<Option<isize>, PaginationError> {
    match value {
        None => Ok(None),
        Some(v) if v < 0 => Err(PaginationError::InvalidArgument { argument }),
        Some(v) => Ok(Some(isize::try_from(v).unwrap_or(isize::MAX))),
    }
}

/// Build a connection over `data`, using `get_id` as the cursor of each item.
///
/// Cursors that no longer match any item fall back to the start (for `after`)
/// or the end (for `before`) of the collection. Negative `first` or `last`
/// fail with [`PaginationError::InvalidArgument`].
pub fn paginate<T, F>(
    data: &[T],
    args: &ConnectionArgs,
    get_id: F,
) -> Result<Connection<T>, PaginationError>
where
    T: Clone,
    F: Fn(&T) -> &str,
{
    let first = non_negative(args.first, "first")?;
    let last = non_negative(args.last, "last")?;

    let len = data.len() as isize;
    let after = cursor_of(&args.after);
    let before = cursor_of(&args.before);

    let after_offset = offset_of(data, after, &get_id).unwrap_or(-1);
    let before_offset = offset_of(data, before, &get_id).unwrap_or(len);

    let mut start = after_offset.max(-1) + 1;
    let mut end = before_offset.min(len);

    if let Some(first) = first {
        end = end.min(start.saturating_add(first));
    }
    if let Some(last) = last {
        start = start.max(end.saturating_sub(last));
    }

    let lo = start.clamp(0, len) as usize;
    let hi = (end.clamp(0, len) as usize).max(lo);

    let edges: Vec<Edge<T>> = data[lo..hi]
        .iter()
        .map(|item| Edge {
            cursor: get_id(item).to_owned(),
            node: item.clone(),
        })
        .collect();

    let lower_bound = if after.is_some() { after_offset + 1 } else { 0 };
    let upper_bound = if before.is_some() { before_offset } else { len };

    let page_info = PageInfo {
        start_cursor: edges.first().map(|edge| edge.cursor.clone()),
        end_cursor: edges.last().map(|edge| edge.cursor.clone()),
        has_next_page: first.is_some() && end < upper_bound,
        has_previous_page: last.is_some() && start > lower_bound,
    };

    Ok(Connection { edges, page_info })
}
