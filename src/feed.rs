use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeedLike {
    pub created_by_id: String,
}

/// One chatter-style post. The server returns a flat list; `like_count`,
/// `is_liked` and `replies` are derived locally by `build_threaded_feed` and
/// rebuilt from scratch on every refetch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeedItem {
    pub id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub created_by_id: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub created_utc: f64,
    #[serde(default)]
    pub likes: Vec<FeedLike>,
    #[serde(default, skip_serializing)]
    pub like_count: usize,
    #[serde(default, skip_serializing)]
    pub is_liked: bool,
    #[serde(default, skip_serializing)]
    pub replies: Vec<FeedItem>,
}

/// Reconstructs the reply forest from a flat feed response.
///
/// Two passes: the first derives the like facets and indexes every item by
/// id, the second links each item under its parent when that parent is in
/// the same batch (and is not the feed's own record), otherwise promotes it
/// to a root. Roots and every replies list keep the relative order of the
/// input; nothing is re-sorted. Items whose parent is absent from the batch
/// become roots rather than being dropped.
pub fn build_threaded_feed(flat: Vec<FeedItem>, viewer_id: &str, root_id: &str) -> Vec<FeedItem> {
    let mut items: Vec<Option<FeedItem>> = Vec::with_capacity(flat.len());
    let mut index: HashMap<String, usize> = HashMap::with_capacity(flat.len());

    for (pos, mut item) in flat.into_iter().enumerate() {
        item.like_count = item.likes.len();
        item.is_liked = item.likes.iter().any(|like| like.created_by_id == viewer_id);
        item.replies.clear();
        index.insert(item.id.clone(), pos);
        items.push(Some(item));
    }

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); items.len()];
    let mut root_positions: Vec<usize> = Vec::new();

    for pos in 0..items.len() {
        let parent_id = items[pos]
            .as_ref()
            .and_then(|item| item.parent_id.clone())
            .filter(|parent| parent != root_id);
        match parent_id.as_deref().and_then(|parent| index.get(parent)) {
            // A self-referential parent id would otherwise make the item
            // unreachable from the roots; promote it instead.
            Some(&parent_pos) if parent_pos != pos => children[parent_pos].push(pos),
            _ => root_positions.push(pos),
        }
    }

    let mut roots = Vec::with_capacity(root_positions.len());
    for pos in root_positions {
        if let Some(item) = assemble(pos, &mut items, &children) {
            roots.push(item);
        }
    }
    roots
}

fn assemble(
    pos: usize,
    items: &mut Vec<Option<FeedItem>>,
    children: &[Vec<usize>],
) -> Option<FeedItem> {
    let mut item = items[pos].take()?;
    for &child in &children[pos] {
        if let Some(reply) = assemble(child, items, children) {
            item.replies.push(reply);
        }
    }
    Some(item)
}

/// Depth-first flattening of a threaded forest for line-oriented rendering.
pub fn flatten_feed(items: &[FeedItem]) -> Vec<(usize, &FeedItem)> {
    let mut out = Vec::new();
    for item in items {
        push_flat(item, 0, &mut out);
    }
    out
}

fn push_flat<'a>(item: &'a FeedItem, depth: usize, out: &mut Vec<(usize, &'a FeedItem)>) {
    out.push((depth, item));
    for reply in &item.replies {
        push_flat(reply, depth + 1, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, parent_id: Option<&str>) -> FeedItem {
        FeedItem {
            id: id.to_string(),
            parent_id: parent_id.map(str::to_string),
            created_by_id: "creator".to_string(),
            author: "Creator".to_string(),
            body: String::new(),
            created_utc: 0.0,
            likes: Vec::new(),
            like_count: 0,
            is_liked: false,
            replies: Vec::new(),
        }
    }

    fn ids(items: &[FeedItem]) -> Vec<&str> {
        items.iter().map(|item| item.id.as_str()).collect()
    }

    #[test]
    fn links_replies_and_promotes_orphans() {
        let flat = vec![item("1", None), item("2", Some("1")), item("3", Some("99"))];
        let roots = build_threaded_feed(flat, "viewer", "record");
        assert_eq!(ids(&roots), vec!["1", "3"]);
        assert_eq!(ids(&roots[0].replies), vec!["2"]);
        assert!(roots[1].replies.is_empty());
    }

    #[test]
    fn parent_equal_to_record_id_is_a_root() {
        let flat = vec![item("1", Some("record")), item("2", Some("1"))];
        let roots = build_threaded_feed(flat, "viewer", "record");
        assert_eq!(ids(&roots), vec!["1"]);
        assert_eq!(ids(&roots[0].replies), vec!["2"]);
    }

    #[test]
    fn preserves_input_order_regardless_of_arrival() {
        // The reply arrives before its parent; pass one indexes everything
        // before pass two links.
        let flat = vec![item("2", Some("1")), item("1", None)];
        let roots = build_threaded_feed(flat, "viewer", "record");
        assert_eq!(ids(&roots), vec!["1"]);
        assert_eq!(ids(&roots[0].replies), vec!["2"]);
    }

    #[test]
    fn nests_three_level_chains() {
        let flat = vec![
            item("a", None),
            item("b", Some("a")),
            item("c", Some("b")),
        ];
        let roots = build_threaded_feed(flat, "viewer", "record");
        assert_eq!(ids(&roots), vec!["a"]);
        assert_eq!(ids(&roots[0].replies), vec!["b"]);
        assert_eq!(ids(&roots[0].replies[0].replies), vec!["c"]);
    }

    #[test]
    fn sibling_replies_keep_relative_order() {
        let flat = vec![
            item("root", None),
            item("r3", Some("root")),
            item("r1", Some("root")),
            item("r2", Some("root")),
        ];
        let roots = build_threaded_feed(flat, "viewer", "record");
        assert_eq!(ids(&roots[0].replies), vec!["r3", "r1", "r2"]);
    }

    #[test]
    fn self_parented_item_is_promoted() {
        let flat = vec![item("loop", Some("loop")), item("other", None)];
        let roots = build_threaded_feed(flat, "viewer", "record");
        assert_eq!(ids(&roots), vec!["loop", "other"]);
    }

    #[test]
    fn derives_like_facets_per_item() {
        let mut liked = item("1", None);
        liked.likes = vec![
            FeedLike {
                created_by_id: "someone".to_string(),
            },
            FeedLike {
                created_by_id: "viewer".to_string(),
            },
        ];
        let mut unliked = item("2", None);
        unliked.likes = vec![FeedLike {
            created_by_id: "someone".to_string(),
        }];

        let roots = build_threaded_feed(vec![liked, unliked, item("3", None)], "viewer", "record");
        assert_eq!(roots[0].like_count, 2);
        assert!(roots[0].is_liked);
        assert_eq!(roots[1].like_count, 1);
        assert!(!roots[1].is_liked);
        assert_eq!(roots[2].like_count, 0);
        assert!(!roots[2].is_liked);
    }

    #[test]
    fn flatten_walks_depth_first() {
        let flat = vec![
            item("a", None),
            item("b", Some("a")),
            item("c", None),
            item("d", Some("b")),
        ];
        let roots = build_threaded_feed(flat, "viewer", "record");
        let flattened: Vec<(usize, &str)> = flatten_feed(&roots)
            .into_iter()
            .map(|(depth, item)| (depth, item.id.as_str()))
            .collect();
        assert_eq!(
            flattened,
            vec![(0, "a"), (1, "b"), (2, "d"), (0, "c")]
        );
    }
}
