//! Segment trie over compiled path patterns.
//!
//! Literal segments are stored in a map per node; `{var}` and `*` share a
//! single "any segment" child since they match the same inputs. A lookup
//! walks at most one literal branch and one any-branch per segment, so its
//! cost depends on path depth rather than on the number of routes.

use std::collections::HashMap;

use crate::routing::pattern::{next_segment, PathPattern, Segment};

#[derive(Debug, Default)]
struct Node {
    literals: HashMap<String, Node>,
    any: Option<Box<Node>>,
    /// Routes whose pattern ends exactly at this node.
    exact: Vec<usize>,
    /// Routes whose pattern ends with `**` at this node.
    catch_all: Vec<usize>,
}

/// Maps path patterns to route indices.
#[derive(Debug, Default)]
pub struct SegmentTrie {
    root: Node,
}

impl SegmentTrie {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register route `index` under `pattern`.
    pub fn insert(&mut self, pattern: &PathPattern, index: usize) {
        let mut node = &mut self.root;
        for segment in pattern.segments() {
            node = match segment {
                Segment::Literal(s) => node.literals.entry(s.clone()).or_default(),
                Segment::Param(_) | Segment::Wildcard => node.any.get_or_insert_with(Default::default),
            };
        }
        if pattern.is_prefix() {
            node.catch_all.push(index);
        } else {
            node.exact.push(index);
        }
    }

    /// Call `visit` for every route whose pattern matches `path`.
    ///
    /// The second argument is the unmatched remainder for `**` routes
    /// (a suffix of `path`, possibly empty) and `None` for exact routes.
    pub fn visit<'p, F>(&self, path: &'p str, visit: &mut F)
    where
        F: FnMut(usize, Option<&'p str>),
    {
        walk(&self.root, path, visit);
    }
}

fn walk<'p, F>(node: &Node, rest: &'p str, visit: &mut F)
where
    F: FnMut(usize, Option<&'p str>),
{
    for &index in &node.catch_all {
        visit(index, Some(rest));
    }

    let Some((segment, tail)) = next_segment(rest) else {
        for &index in &node.exact {
            visit(index, None);
        }
        return;
    };

    if let Some(child) = node.literals.get(segment) {
        walk(child, tail, visit);
    }
    if let Some(child) = &node.any {
        walk(child, tail, visit);
    }
}
