//! Small helpers around tree-sitter queries and literal text.

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;
use streaming_iterator::StreamingIterator;
use tree_sitter::{Language, Node, Query, QueryCursor};

use super::ParsedFile;

lazy_static! {
    static ref STRING_LITERAL: Regex =
        Regex::new(r#""((?:[^"\\]|\\.)*)"|'((?:[^'\\]|\\.)*)'|`([^`]*)`"#).unwrap();
}

/// Named captures of one query match.
pub struct Captures<'t> {
    nodes: Vec<(String, Node<'t>)>,
}

impl<'t> Captures<'t> {
    /// First node captured under `name`.
    pub fn get(&self, name: &str) -> Option<Node<'t>> {
        self.nodes
            .iter()
            .find(|(capture, _)| capture == name)
            .map(|(_, node)| *node)
    }
}

/// Run `query_source` against `root` and collect every match.
///
/// Matches are returned in document order; matches capturing exactly the
/// same nodes are reported once.
pub fn run_query<'t>(
    parsed: &'t ParsedFile,
    grammar: &Language,
    query_source: &str,
    root: Node<'t>,
) -> anyhow::Result<Vec<Captures<'t>>> {
    let query = Query::new(grammar, query_source)?;
    let names = query.capture_names();
    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(&query, root, &parsed.source[..]);

    let mut results = Vec::new();
    let mut seen = HashSet::new();

    while let Some(m) = matches.next() {
        let mut nodes = Vec::with_capacity(m.captures.len());
        for capture in m.captures {
            let name = names[capture.index as usize];
            nodes.push((name.to_string(), capture.node));
        }
        let key: Vec<(String, usize, usize)> = nodes
            .iter()
            .map(|(name, n)| (name.clone(), n.start_byte(), n.end_byte()))
            .collect();
        if !seen.insert(key) {
            continue;
        }
        results.push(Captures { nodes });
    }

    results.sort_by_key(|c| {
        c.nodes
            .iter()
            .map(|(_, n)| n.start_byte())
            .min()
            .unwrap_or(0)
    });
    Ok(results)
}

/// Every quoted string inside `text`, unescaped only of its quotes.
///
/// Handles `"a"`, `'a'`, `` `a` `` and array forms like `{"a", "b"}`.
pub fn string_literals(text: &str) -> Vec<String> {
    STRING_LITERAL
        .captures_iter(text)
        .filter_map(|caps| {
            caps.get(1)
                .or_else(|| caps.get(2))
                .or_else(|| caps.get(3))
                .map(|m| m.as_str().to_string())
        })
        .collect()
}

/// First quoted string inside `text`.
pub fn first_string_literal(text: &str) -> Option<String> {
    string_literals(text).into_iter().next()
}

/// Named children of `node` with the given kind.
pub fn children_of_kind<'t>(node: Node<'t>, kind: &str) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|n| n.kind() == kind)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_literals() {
        assert_eq!(string_literals(r#""/orders""#), vec!["/orders"]);
        assert_eq!(
            string_literals(r#"{"orders", 'payments'}"#),
            vec!["orders", "payments"]
        );
        assert_eq!(string_literals("`/tpl`"), vec!["/tpl"]);
        assert!(string_literals("RequestMethod.POST").is_empty());
        assert_eq!(first_string_literal(r#"value = "/a", x = "/b""#), Some("/a".to_string()));
    }
}
