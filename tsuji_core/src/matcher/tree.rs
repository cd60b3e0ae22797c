//! The packed tree engine: a breadth-first-packed trie over path
//! segments, walked recursively with backtracking.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::debug_trace;
use crate::endpoint::RouteMatch;
use crate::matcher::Matcher;
use crate::router::RouteEntry;
use crate::template::matcher::split_path;
use crate::values::RouteValues;

/// What a packed node matches: one literal segment, any single segment,
/// or the whole remaining residue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Literal,
    Parameter,
    CatchAll,
}

impl NodeKind {
    // sibling ordering: literals first, catch-all last
    fn rank(self) -> u8 {
        match self {
            NodeKind::Literal => 0,
            NodeKind::Parameter => 1,
            NodeKind::CatchAll => 2,
        }
    }
}

/// One node of the packed tree. Children hang off `first_child` and chain
/// through `next_sibling`; `-1` means absent. `value` is the literal text
/// for `Literal` nodes and empty otherwise. `matches` lists the entries
/// terminating here, most specific first.
#[derive(Debug)]
pub struct PackedEntry {
    pub kind: NodeKind,
    pub value: String,
    pub first_child: i32,
    pub next_sibling: i32,
    pub matches: Vec<usize>,
}

// builder-side node with owned children; flattened after insertion
struct BuildNode {
    kind: NodeKind,
    value: String,
    children: Vec<BuildNode>,
    matches: Vec<usize>,
}

impl BuildNode {
    fn new(kind: NodeKind, value: String) -> Self {
        BuildNode { kind, value, children: Vec::new(), matches: Vec::new() }
    }

    fn child_mut(&mut self, kind: NodeKind, value: &str) -> &mut BuildNode {
        let found = self.children.iter().position(|c| {
            c.kind == kind && (kind != NodeKind::Literal || c.value.eq_ignore_ascii_case(value))
        });
        let idx = match found {
            Some(idx) => idx,
            None => {
                let node = BuildNode::new(kind, value.to_string());
                let at = self
                    .children
                    .iter()
                    .position(|c| c.kind.rank() > kind.rank())
                    .unwrap_or(self.children.len());
                self.children.insert(at, node);
                at
            }
        };
        &mut self.children[idx]
    }

    fn attach(&mut self, entry: usize) {
        if !self.matches.contains(&entry) {
            self.matches.push(entry);
        }
    }
}

/// The packed tree matcher.
///
/// Built once from precedence-sorted entries; immutable afterwards. Each
/// template is inserted once per admissible segment count so elidable
/// suffixes terminate at interior nodes too.
#[derive(Debug)]
pub struct TreeMatcher {
    entries: Vec<Arc<RouteEntry>>,
    packed: Vec<PackedEntry>,
    root_matches: Vec<usize>,
}

impl TreeMatcher {
    /// `entries` must be sorted most-specific-first; match lists inherit
    /// that order.
    pub(crate) fn build(entries: Vec<Arc<RouteEntry>>) -> Self {
        let mut root = BuildNode::new(NodeKind::Literal, String::new());

        for (idx, entry) in entries.iter().enumerate() {
            let template = entry.matcher().template();
            let segments = template.segments();
            let required = entry.matcher().required_segments();

            for count in required..=segments.len() {
                let mut node = &mut root;
                for segment in &segments[..count] {
                    let (kind, value) = if let Some(lit) = segment.single_literal() {
                        (NodeKind::Literal, lit)
                    } else if segment.is_catch_all() {
                        (NodeKind::CatchAll, "")
                    } else {
                        (NodeKind::Parameter, "")
                    };
                    node = node.child_mut(kind, value);
                }
                node.attach(idx);
            }
        }

        let root_matches = root.matches;
        let packed = flatten(root.children);
        TreeMatcher { entries, packed, root_matches }
    }

    pub fn packed(&self) -> &[PackedEntry] {
        &self.packed
    }

    fn try_list(&self, matches: &[usize], path: &str, values: &mut RouteValues) -> Option<usize> {
        for &m in matches {
            if self.entries[m].try_candidate(path, values) {
                return Some(m);
            }
        }
        None
    }

    // Walk one sibling chain; first success wins, failures backtrack.
    fn walk_chain(
        &self,
        first: i32,
        segs: &[&str],
        depth: usize,
        path: &str,
        values: &mut RouteValues,
    ) -> Option<usize> {
        let mut at = first;
        while at >= 0 {
            let node = at as usize;
            if let Some(winner) = self.walk_node(node, segs, depth, path, values) {
                return Some(winner);
            }
            at = self.packed[node].next_sibling;
        }
        None
    }

    fn walk_node(
        &self,
        node: usize,
        segs: &[&str],
        depth: usize,
        path: &str,
        values: &mut RouteValues,
    ) -> Option<usize> {
        let entry = &self.packed[node];
        let seg = segs[depth];
        match entry.kind {
            NodeKind::Literal => {
                if !entry.value.eq_ignore_ascii_case(seg) {
                    return None;
                }
            }
            NodeKind::Parameter => {
                if seg.is_empty() {
                    return None;
                }
            }
            NodeKind::CatchAll => {
                // the residue is consumed wholesale; candidates decide
                return self.try_list(&entry.matches, path, values);
            }
        }

        if depth + 1 == segs.len() {
            self.try_list(&entry.matches, path, values)
        } else {
            self.walk_chain(entry.first_child, segs, depth + 1, path, values)
        }
    }
}

impl Matcher for TreeMatcher {
    fn matches(&self, path: &str) -> Option<RouteMatch> {
        if !path.starts_with('/') {
            return None;
        }
        let segs = split_path(path);
        let mut values = RouteValues::new();
        let winner = if segs.is_empty() {
            self.try_list(&self.root_matches, path, &mut values)
        } else {
            self.walk_chain(if self.packed.is_empty() { -1 } else { 0 }, &segs, 0, path, &mut values)
        };
        debug_trace!("tree match '{}' -> {:?}", path, winner);
        winner.map(|idx| RouteMatch {
            endpoint: Arc::clone(self.entries[idx].endpoint()),
            values,
        })
    }
}

// Flatten the builder tree breadth-first. Siblings land contiguously and
// chain through `next_sibling`; each parent records its `first_child`.
fn flatten(top: Vec<BuildNode>) -> Vec<PackedEntry> {
    let mut packed: Vec<PackedEntry> = Vec::new();
    let mut queue: VecDeque<(usize, Vec<BuildNode>)> = VecDeque::new();

    append_siblings(top, &mut packed, &mut queue);
    while let Some((parent, children)) = queue.pop_front() {
        let first = append_siblings(children, &mut packed, &mut queue);
        packed[parent].first_child = first;
    }
    packed
}

fn append_siblings(
    nodes: Vec<BuildNode>,
    packed: &mut Vec<PackedEntry>,
    queue: &mut VecDeque<(usize, Vec<BuildNode>)>,
) -> i32 {
    if nodes.is_empty() {
        return -1;
    }
    let start = packed.len();
    let count = nodes.len();
    for (i, node) in nodes.into_iter().enumerate() {
        let next_sibling = if i + 1 < count { (start + i + 1) as i32 } else { -1 };
        packed.push(PackedEntry {
            kind: node.kind,
            value: node.value,
            first_child: -1,
            next_sibling,
            matches: node.matches,
        });
        queue.push_back((start + i, node.children));
    }
    start as i32
}

#[cfg(test)]
mod tests {
    use super::NodeKind;
    use crate::matcher::Matcher;
    use crate::router::{RouteDef, RouteSet};
    use crate::values::RouteValue;

    fn set(templates: &[&str]) -> RouteSet {
        let mut routes = RouteSet::new();
        for t in templates {
            routes.add(RouteDef::new(*t)).unwrap();
        }
        routes
    }

    #[test]
    fn packed_layout_links_siblings() {
        // precedence puts the one-segment "b" ahead of the "a/…" pair
        let matcher = set(&["a/x", "a/y", "b"]).build_tree().unwrap();
        let packed = matcher.packed();
        assert_eq!(packed[0].value, "b");
        assert_eq!(packed[0].next_sibling, 1);
        assert_eq!(packed[0].first_child, -1);
        assert_eq!(packed[1].value, "a");
        assert_eq!(packed[1].next_sibling, -1);
        // children of "a" are contiguous and chained
        let first = packed[1].first_child as usize;
        assert_eq!(packed[first].value, "x");
        assert_eq!(packed[first].next_sibling as usize, first + 1);
        assert_eq!(packed[first + 1].value, "y");
        assert_eq!(packed[first + 1].next_sibling, -1);
        assert_eq!(packed[first].first_child, -1);
    }

    #[test]
    fn literal_children_come_before_parameters() {
        let matcher = set(&["{x}/p", "a/q"]).build_tree().unwrap();
        let packed = matcher.packed();
        assert_eq!(packed[0].kind, NodeKind::Literal);
        assert_eq!(packed[0].value, "a");
        assert_eq!(packed[1].kind, NodeKind::Parameter);
    }

    #[test]
    fn backtracks_to_less_specific_siblings() {
        let matcher = set(&["a/special", "{x}/{y}"]).build_tree().unwrap();
        // "a" matches the literal child but "other" kills that branch;
        // the walk falls back to the parameter branch
        let m = matcher.matches("/a/other").unwrap();
        assert_eq!(m.endpoint.template_text, "{x}/{y}");
        assert_eq!(m.values.get("x"), Some(&RouteValue::Str("a".into())));
    }

    #[test]
    fn constraint_failure_backtracks_cleanly() {
        let matcher = set(&["shop/{id:int}", "shop/{slug}"]).build_tree().unwrap();
        let m = matcher.matches("/shop/42").unwrap();
        assert_eq!(m.endpoint.template_text, "shop/{id:int}");

        let m = matcher.matches("/shop/sale").unwrap();
        assert_eq!(m.endpoint.template_text, "shop/{slug}");
        assert!(!m.values.contains("id"));
    }

    #[test]
    fn catch_all_is_the_last_resort() {
        let matcher = set(&["docs/{page}", "docs/{*rest}"]).build_tree().unwrap();
        let m = matcher.matches("/docs/intro").unwrap();
        assert_eq!(m.endpoint.template_text, "docs/{page}");

        let m = matcher.matches("/docs/guide/part/2").unwrap();
        assert_eq!(m.endpoint.template_text, "docs/{*rest}");
        assert_eq!(m.values.get("rest"), Some(&RouteValue::Str("guide/part/2".into())));

        let m = matcher.matches("/docs").unwrap();
        assert_eq!(m.endpoint.template_text, "docs/{*rest}");
    }

    #[test]
    fn zero_segment_path_hits_root_matches() {
        let mut routes = RouteSet::new();
        routes
            .add(RouteDef::new("{controller=Home}/{action=Index}"))
            .unwrap();
        let matcher = routes.build_tree().unwrap();
        let m = matcher.matches("/").unwrap();
        assert_eq!(m.values.get("controller"), Some(&RouteValue::Str("Home".into())));
        assert_eq!(m.values.get("action"), Some(&RouteValue::Str("Index".into())));
    }

    #[test]
    fn complex_segments_are_supported_here() {
        let matcher = set(&["page-{num}"]).build_tree().unwrap();
        let m = matcher.matches("/page-7").unwrap();
        assert_eq!(m.values.get("num"), Some(&RouteValue::Str("7".into())));
    }

    #[test]
    fn no_match_is_clean() {
        let matcher = set(&["a/b"]).build_tree().unwrap();
        assert!(matcher.matches("/a").is_none());
        assert!(matcher.matches("/a/b/c").is_none());
        assert!(matcher.matches("no-leading-slash").is_none());
    }
}
