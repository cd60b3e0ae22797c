//! The DFA engine: states connected by jump tables keyed on literal
//! segment text, built by overlaying parameter branches onto literal
//! branches.

use std::collections::VecDeque;
use std::sync::Arc;

use fnv::FnvHashMap;

use crate::debug_trace;
use crate::endpoint::RouteMatch;
use crate::matcher::Matcher;
use crate::router::RouteEntry;
use crate::values::RouteValues;

/// Per-state transition table. `entries` map literal segment text to a
/// destination state; `exit` is taken when no literal matches.
#[derive(Debug)]
pub struct JumpTable {
    pub entries: Vec<(String, usize)>,
    pub exit: usize,
}

impl JumpTable {
    /// First equal-length, case-insensitive match wins; otherwise `exit`.
    pub fn lookup(&self, segment: &str) -> usize {
        for (text, destination) in &self.entries {
            if text.len() == segment.len() && text.eq_ignore_ascii_case(segment) {
                return *destination;
            }
        }
        self.exit
    }
}

/// One DFA state. `matches` lists candidate entries most specific first;
/// a state with an empty list is not accepting.
#[derive(Debug)]
pub struct State {
    pub matches: Vec<usize>,
    pub transitions: JumpTable,
}

// Builder node. Nodes live in an arena and refer to each other by index,
// so the parameter-overlay copy below is an explicit clone of owned
// values rather than a shared reference.
#[derive(Default)]
struct BuildNode {
    literals: Vec<(String, usize)>,
    param: Option<usize>,
    catch_all: Option<usize>,
    matches: Vec<usize>,
}

#[derive(Default)]
struct Arena {
    nodes: Vec<BuildNode>,
}

impl Arena {
    fn new_node(&mut self) -> usize {
        self.nodes.push(BuildNode::default());
        self.nodes.len() - 1
    }

    fn literal_child(&mut self, parent: usize, text: &str) -> usize {
        let found = self.nodes[parent]
            .literals
            .iter()
            .find(|(t, _)| t.len() == text.len() && t.eq_ignore_ascii_case(text))
            .map(|(_, idx)| *idx);
        match found {
            Some(idx) => idx,
            None => {
                let idx = self.new_node();
                self.nodes[parent].literals.push((text.to_string(), idx));
                idx
            }
        }
    }

    fn param_child(&mut self, parent: usize) -> usize {
        match self.nodes[parent].param {
            Some(idx) => idx,
            None => {
                let idx = self.new_node();
                self.nodes[parent].param = Some(idx);
                idx
            }
        }
    }

    fn catch_all_child(&mut self, parent: usize) -> usize {
        match self.nodes[parent].catch_all {
            Some(idx) => idx,
            None => {
                let idx = self.new_node();
                self.nodes[parent].catch_all = Some(idx);
                idx
            }
        }
    }

    fn attach(&mut self, node: usize, entry: usize) {
        if !self.nodes[node].matches.contains(&entry) {
            self.nodes[node].matches.push(entry);
        }
    }

    // Copy everything under `src` into `dst`: matches, literal children,
    // parameter and catch-all subtrees, recursively. Missing nodes under
    // `dst` are freshly allocated, so the subtrees stay independent:
    // later growth on either side does not leak to the other.
    fn overlay(&mut self, src: usize, dst: usize) {
        if src == dst {
            return;
        }
        let src_matches = self.nodes[src].matches.clone();
        for entry in src_matches {
            self.attach(dst, entry);
        }
        let src_literals = self.nodes[src].literals.clone();
        for (text, src_child) in src_literals {
            let dst_child = self.literal_child(dst, &text);
            self.overlay(src_child, dst_child);
        }
        if let Some(src_param) = self.nodes[src].param {
            let dst_param = self.param_child(dst);
            self.overlay(src_param, dst_param);
        }
        if let Some(src_ca) = self.nodes[src].catch_all {
            let dst_ca = self.catch_all_child(dst);
            self.overlay(src_ca, dst_ca);
        }
    }
}

/// The DFA matcher: one state-table lookup per path segment.
#[derive(Debug)]
pub struct DfaMatcher {
    entries: Vec<Arc<RouteEntry>>,
    states: Vec<State>,
}

impl DfaMatcher {
    /// `entries` must be sorted most-specific-first and free of complex
    /// segments (the route set enforces both).
    pub(crate) fn build(entries: Vec<Arc<RouteEntry>>) -> Self {
        let mut arena = Arena::default();
        let root = arena.new_node();

        // Pass 1: the literal skeleton. Parameters descend through the
        // parameter child; every admissible segment count terminates.
        for (idx, entry) in entries.iter().enumerate() {
            let segments = entry.matcher().template().segments().to_vec();
            let required = entry.matcher().required_segments();
            let mut cur = root;
            for (i, segment) in segments.iter().enumerate() {
                if i >= required {
                    arena.attach(cur, idx);
                }
                cur = if let Some(lit) = segment.single_literal() {
                    arena.literal_child(cur, lit)
                } else if segment.is_catch_all() {
                    arena.catch_all_child(cur)
                } else {
                    arena.param_child(cur)
                };
            }
            arena.attach(cur, idx);
        }

        // Pass 2: the parameter overlay. A literal part copies any
        // sibling parameter subtree into its own branch; a parameter part
        // widens the working set to every single-segment child.
        for (idx, entry) in entries.iter().enumerate() {
            let segments = entry.matcher().template().segments().to_vec();
            let required = entry.matcher().required_segments();
            let mut parents = vec![root];
            for (i, segment) in segments.iter().enumerate() {
                if i >= required {
                    for &p in &parents {
                        arena.attach(p, idx);
                    }
                }
                if let Some(lit) = segment.single_literal() {
                    let mut next = Vec::with_capacity(parents.len());
                    for &p in &parents {
                        let child = arena.literal_child(p, lit);
                        if let Some(star) = arena.nodes[p].param {
                            arena.overlay(star, child);
                        }
                        next.push(child);
                    }
                    parents = next;
                } else if segment.is_catch_all() {
                    parents = parents.iter().map(|&p| arena.catch_all_child(p)).collect();
                } else {
                    // every child that consumes exactly one segment;
                    // catch-alls consume the rest and are not unioned
                    let mut next = Vec::new();
                    for &p in &parents {
                        for (_, child) in &arena.nodes[p].literals {
                            if !next.contains(child) {
                                next.push(*child);
                            }
                        }
                        if let Some(star) = arena.nodes[p].param {
                            if !next.contains(&star) {
                                next.push(star);
                            }
                        }
                    }
                    parents = next;
                }
            }
            for &p in &parents {
                arena.attach(p, idx);
            }
        }

        let states = emit_states(&arena, root);
        DfaMatcher { entries, states }
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    fn find(&self, path: &str, values: &mut RouteValues) -> Option<usize> {
        let bytes = path.as_bytes();
        let mut current = 0usize;
        let mut start = 1usize;
        let mut i = 1usize;
        while i < bytes.len() {
            if bytes[i] == b'/' {
                current = self.states[current].transitions.lookup(&path[start..i]);
                start = i + 1;
            }
            i += 1;
        }
        if start < bytes.len() {
            current = self.states[current].transitions.lookup(&path[start..]);
        }

        let state = &self.states[current];
        debug_trace!("dfa match '{}' ended in state {} ({} candidates)", path, current, state.matches.len());
        for &m in &state.matches {
            if self.entries[m].try_candidate(path, values) {
                return Some(m);
            }
        }
        None
    }
}

impl Matcher for DfaMatcher {
    fn matches(&self, path: &str) -> Option<RouteMatch> {
        if !path.starts_with('/') {
            return None;
        }
        let mut values = RouteValues::new();
        self.find(path, &mut values).map(|idx| RouteMatch {
            endpoint: Arc::clone(self.entries[idx].endpoint()),
            values,
        })
    }
}

// Lower the builder arena to the state array. States are numbered
// breadth-first from the root; one trailing sink state absorbs non-
// matching paths. Catch-all terminals self-loop so any residue depth
// stays accepting, and their entries are folded into every state of the
// subtree they dominate.
fn emit_states(arena: &Arena, root: usize) -> Vec<State> {
    let mut order: Vec<usize> = Vec::new();
    let mut index: FnvHashMap<usize, usize> = FnvHashMap::default();
    let mut queue = VecDeque::new();
    queue.push_back(root);
    index.insert(root, 0);
    while let Some(node) = queue.pop_front() {
        order.push(node);
        let b = &arena.nodes[node];
        for (_, child) in &b.literals {
            if !index.contains_key(child) {
                index.insert(*child, index.len());
                queue.push_back(*child);
            }
        }
        if let Some(p) = b.param {
            if !index.contains_key(&p) {
                index.insert(p, index.len());
                queue.push_back(p);
            }
        }
        if let Some(c) = b.catch_all {
            if !index.contains_key(&c) {
                index.insert(c, index.len());
                queue.push_back(c);
            }
        }
    }

    let sink = order.len();
    let mut states: Vec<Option<State>> = (0..=sink).map(|_| None).collect();
    fill_state(arena, root, &index, None, &[], &mut states);
    states[sink] = Some(State {
        matches: Vec::new(),
        transitions: JumpTable { entries: Vec::new(), exit: sink },
    });

    states
        .into_iter()
        .map(|s| s.expect("every reachable node is emitted"))
        .collect()
}

fn fill_state(
    arena: &Arena,
    node: usize,
    index: &FnvHashMap<usize, usize>,
    inherited_exit: Option<usize>,
    inherited_matches: &[usize],
    states: &mut Vec<Option<State>>,
) {
    let b = &arena.nodes[node];
    let this = index[&node];
    let sink = states.len() - 1;

    let own_catch_all = b.catch_all.map(|c| index[&c]);
    let is_catch_all_terminal = b.literals.is_empty() && b.param.is_none() && b.catch_all.is_none()
        && inherited_exit == Some(this);

    // candidate list: everything terminating here plus every catch-all
    // that dominates this state; ascending entry index is precedence order
    let mut matches = b.matches.clone();
    for &m in inherited_matches {
        if !matches.contains(&m) {
            matches.push(m);
        }
    }
    matches.sort_unstable();

    let exit = if let Some(p) = b.param {
        index[&p]
    } else if let Some(ca) = own_catch_all {
        ca
    } else if is_catch_all_terminal {
        this
    } else {
        inherited_exit.unwrap_or(sink)
    };

    let transitions = JumpTable {
        entries: b.literals.iter().map(|(t, c)| (t.clone(), index[c])).collect(),
        exit,
    };
    states[this] = Some(State { matches, transitions });

    // descendants inherit the nearest dominating catch-all
    let (child_exit, child_matches): (Option<usize>, Vec<usize>) = if let Some(ca) = b.catch_all {
        let mut folded = inherited_matches.to_vec();
        for &m in &arena.nodes[ca].matches {
            if !folded.contains(&m) {
                folded.push(m);
            }
        }
        (Some(index[&ca]), folded)
    } else {
        (inherited_exit, inherited_matches.to_vec())
    };

    for (_, child) in &b.literals {
        fill_state(arena, *child, index, child_exit, &child_matches, states);
    }
    if let Some(p) = b.param {
        fill_state(arena, p, index, child_exit, &child_matches, states);
    }
    if let Some(ca) = b.catch_all {
        // the catch-all terminal loops on itself
        fill_state(arena, ca, index, Some(index[&ca]), inherited_matches, states);
    }
}
