//! The instruction engine: the route set lowered to a flat opcode stream
//! interpreted against a pre-tokenised path. Functionally equivalent to
//! the DFA; the execution model is a linear program instead of a state
//! walk.

use std::sync::Arc;

use crate::debug_trace;
use crate::endpoint::RouteMatch;
use crate::matcher::Matcher;
use crate::router::RouteEntry;
use crate::values::RouteValues;

/// One opcode of the lowered program.
///
/// `Pop` only exists while a branch block is being lowered; closing the
/// block rewrites every `Pop` to a `Jump` past the block end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// Record entry `n` as the current result and fall through.
    Accept(usize),
    /// Consult jump table `n` and continue at the destination.
    Branch(usize),
    /// Continue at program counter `n`.
    Jump(usize),
    /// Placeholder; never present in a finished program.
    Pop,
}

/// A branch's jump table. The table knows which segment depth it
/// inspects and computes the segment bounds from the offset array.
#[derive(Debug)]
pub struct BranchTable {
    pub depth: usize,
    pub entries: Vec<(String, usize)>,
    pub exit: usize,
}

impl BranchTable {
    fn lookup(&self, segments: &PathSegments<'_>) -> usize {
        let Some(segment) = segments.get(self.depth) else {
            return self.exit;
        };
        for (text, pc) in &self.entries {
            if text.len() == segment.len() && text.eq_ignore_ascii_case(segment) {
                return *pc;
            }
        }
        self.exit
    }
}

const INLINE_SEGMENTS: usize = 32;

// Slash offsets of a tokenised path. The first 32 segment spans live on
// the stack; deeper paths spill the remainder to the heap on demand, so
// nothing is truncated or rejected.
struct PathSegments<'a> {
    path: &'a str,
    inline: [(u32, u32); INLINE_SEGMENTS],
    len: usize,
    spill: Vec<(u32, u32)>,
}

impl<'a> PathSegments<'a> {
    // `path` must start with '/'. A single trailing empty residue
    // (trailing slash) is not recorded.
    fn tokenize(path: &'a str) -> Self {
        let mut segments = PathSegments {
            path,
            inline: [(0, 0); INLINE_SEGMENTS],
            len: 0,
            spill: Vec::new(),
        };
        let bytes = path.as_bytes();
        let mut start = 1usize;
        let mut i = 1usize;
        while i < bytes.len() {
            if bytes[i] == b'/' {
                segments.push(start as u32, i as u32);
                start = i + 1;
            }
            i += 1;
        }
        if start < bytes.len() {
            segments.push(start as u32, bytes.len() as u32);
        }
        segments
    }

    fn push(&mut self, start: u32, end: u32) {
        if self.len < INLINE_SEGMENTS {
            self.inline[self.len] = (start, end);
        } else {
            self.spill.push((start, end));
        }
        self.len += 1;
    }

    fn get(&self, depth: usize) -> Option<&'a str> {
        if depth >= self.len {
            return None;
        }
        let (start, end) = if depth < INLINE_SEGMENTS {
            self.inline[depth]
        } else {
            self.spill[depth - INLINE_SEGMENTS]
        };
        Some(&self.path[start as usize..end as usize])
    }
}

// builder trie; one node per shared template prefix
#[derive(Default)]
struct TrieNode {
    literals: Vec<(String, TrieNode)>,
    param: Option<Box<TrieNode>>,
    catch_all: Option<Box<TrieNode>>,
    matches: Vec<usize>,
}

impl TrieNode {
    fn literal_child(&mut self, text: &str) -> &mut TrieNode {
        let found = self
            .literals
            .iter()
            .position(|(t, _)| t.len() == text.len() && t.eq_ignore_ascii_case(text));
        let idx = match found {
            Some(idx) => idx,
            None => {
                self.literals.push((text.to_string(), TrieNode::default()));
                self.literals.len() - 1
            }
        };
        &mut self.literals[idx].1
    }

    fn attach(&mut self, entry: usize) {
        if !self.matches.contains(&entry) {
            self.matches.push(entry);
        }
    }
}

// the typed node tree the trie lowers through
enum BuildNode {
    Sequence(Vec<BuildNode>),
    Branch { depth: usize, children: Vec<(String, BuildNode)> },
    Parameter(Box<BuildNode>),
    Accept(usize),
}

/// The instruction matcher.
#[derive(Debug)]
pub struct ProgramMatcher {
    entries: Vec<Arc<RouteEntry>>,
    instructions: Vec<Instruction>,
    tables: Vec<BranchTable>,
}

impl ProgramMatcher {
    /// `entries` must be sorted most-specific-first and free of complex
    /// segments (the route set enforces both).
    pub(crate) fn build(entries: Vec<Arc<RouteEntry>>) -> Self {
        let mut root = TrieNode::default();
        for (idx, entry) in entries.iter().enumerate() {
            let segments = entry.matcher().template().segments();
            let required = entry.matcher().required_segments();
            let mut cur = &mut root;
            for (i, segment) in segments.iter().enumerate() {
                if i >= required {
                    cur.attach(idx);
                }
                cur = if let Some(lit) = segment.single_literal() {
                    cur.literal_child(lit)
                } else if segment.is_catch_all() {
                    &mut **cur.catch_all.get_or_insert_with(Default::default)
                } else {
                    &mut **cur.param.get_or_insert_with(Default::default)
                };
            }
            cur.attach(idx);
        }

        let tree = to_build_node(&root, 0);
        let mut instructions = Vec::new();
        let mut tables = Vec::new();
        lower(&tree, &mut instructions, &mut tables);

        ProgramMatcher { entries, instructions, tables }
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn tables(&self) -> &[BranchTable] {
        &self.tables
    }

    fn find(&self, path: &str, values: &mut RouteValues) -> Option<usize> {
        let segments = PathSegments::tokenize(path);
        let mut accepts: Vec<usize> = Vec::new();
        let mut pc = 0usize;
        while pc < self.instructions.len() {
            match self.instructions[pc] {
                Instruction::Accept(entry) => {
                    accepts.push(entry);
                    pc += 1;
                }
                Instruction::Branch(table) => {
                    pc = self.tables[table].lookup(&segments);
                }
                Instruction::Jump(target) => {
                    pc = target;
                }
                Instruction::Pop => {
                    pc += 1;
                }
            }
        }

        debug_trace!("program match '{}' recorded {} accepts", path, accepts.len());
        // entry index is precedence rank, so the sorted accept set is the
        // same candidate order the other engines use; constraint failures
        // fall through to the next candidate
        accepts.sort_unstable();
        accepts.dedup();
        for &m in &accepts {
            if self.entries[m].try_candidate(path, values) {
                return Some(m);
            }
        }
        None
    }
}

impl Matcher for ProgramMatcher {
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

// Within one node accepts are emitted least-specific-first, so a later
// accept in the stream supersedes an earlier one. Catch-all subtrees
// emit nothing of their own: a catch-all entry is attached to the node
// that owns it and its accept is depth-independent by construction.
fn to_build_node(trie: &TrieNode, depth: usize) -> BuildNode {
    let mut sequence = Vec::new();
    for &m in trie.matches.iter().rev() {
        sequence.push(BuildNode::Accept(m));
    }
    if let Some(param) = &trie.param {
        sequence.push(BuildNode::Parameter(Box::new(to_build_node(param, depth + 1))));
    }
    if !trie.literals.is_empty() {
        let children = trie
            .literals
            .iter()
            .map(|(text, child)| (text.clone(), to_build_node(child, depth + 1)))
            .collect();
        sequence.push(BuildNode::Branch { depth, children });
    }
    BuildNode::Sequence(sequence)
}

fn lower(node: &BuildNode, instructions: &mut Vec<Instruction>, tables: &mut Vec<BranchTable>) {
    match node {
        BuildNode::Sequence(children) => {
            for child in children {
                lower(child, instructions, tables);
            }
        }
        BuildNode::Accept(entry) => {
            instructions.push(Instruction::Accept(*entry));
        }
        BuildNode::Parameter(inner) => {
            // no instruction of its own; the subtree guards itself
            lower(inner, instructions, tables);
        }
        BuildNode::Branch { depth, children } => {
            let table_idx = tables.len();
            tables.push(BranchTable { depth: *depth, entries: Vec::new(), exit: 0 });
            instructions.push(Instruction::Branch(table_idx));
            let block_start = instructions.len();
            for (text, child) in children {
                tables[table_idx].entries.push((text.clone(), instructions.len()));
                lower(child, instructions, tables);
                instructions.push(Instruction::Pop);
            }
            let end_pc = instructions.len();
            for pc in block_start..end_pc {
                if instructions[pc] == Instruction::Pop {
                    instructions[pc] = Instruction::Jump(end_pc);
                }
            }
            tables[table_idx].exit = end_pc;
        }
    }
}
