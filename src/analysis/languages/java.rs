//! Java front end: grammar plus annotation and declaration helpers.

use std::path::Path;

use tree_sitter::{Language, Node};

use crate::analysis::query::{children_of_kind, run_query, string_literals};
use crate::analysis::{LanguageAnalyzer, ParsedFile};

/// Tree-sitter query for package declaration.
const PACKAGE_QUERY: &str = r#"
(package_declaration
  [(scoped_identifier) (identifier)] @package_name
)
"#;

/// Class declarations at any nesting depth.
const CLASS_QUERY: &str = r#"
(class_declaration
  name: (identifier) @class_name
) @class
"#;

/// A Java annotation with its raw argument text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    /// Simple name without package (e.g. "GetMapping").
    pub name: String,
    /// `(key, value)` pairs; positional values use key "value".
    pub arguments: Vec<(String, String)>,
}

impl Annotation {
    /// Raw text of an argument by key.
    pub fn argument(&self, key: &str) -> Option<&str> {
        self.arguments
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// String values of the first present key among `keys`.
    pub fn strings(&self, keys: &[&str]) -> Vec<String> {
        keys.iter()
            .find_map(|k| self.argument(k))
            .map(string_literals)
            .unwrap_or_default()
    }
}

/// A class declaration together with its fully qualified name.
pub struct JavaClass<'t> {
    pub node: Node<'t>,
    pub name: String,
    pub qualified_name: String,
}

pub struct JavaAnalyzer {
    language: Language,
}

impl JavaAnalyzer {
    pub fn new() -> Self {
        Self {
            language: tree_sitter_java::LANGUAGE.into(),
        }
    }

    pub fn package_name(&self, parsed: &ParsedFile) -> Option<String> {
        let matches = run_query(
            parsed,
            &self.language,
            PACKAGE_QUERY,
            parsed.tree.root_node(),
        )
        .ok()?;
        matches
            .first()
            .and_then(|m| m.get("package_name"))
            .map(|n| parsed.node_text(n).to_string())
    }

    /// All classes in the file, outermost first.
    pub fn classes<'t>(&self, parsed: &'t ParsedFile) -> anyhow::Result<Vec<JavaClass<'t>>> {
        let package = self.package_name(parsed);
        let matches = run_query(parsed, &self.language, CLASS_QUERY, parsed.tree.root_node())?;

        Ok(matches
            .iter()
            .filter_map(|m| {
                let node = m.get("class")?;
                let name = parsed.node_text(m.get("class_name")?).to_string();
                let qualified_name = match &package {
                    Some(pkg) => format!("{}.{}", pkg, name),
                    None => name.clone(),
                };
                Some(JavaClass {
                    node,
                    name,
                    qualified_name,
                })
            })
            .collect())
    }
}

impl Default for JavaAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageAnalyzer for JavaAnalyzer {
    fn language_id(&self) -> &'static str {
        "java"
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["java"]
    }

    fn grammar(&self, _path: &Path) -> Language {
        self.language.clone()
    }
}

/// Annotations attached to a declaration through its `modifiers` child.
pub fn annotations(parsed: &ParsedFile, decl: Node) -> Vec<Annotation> {
    let Some(modifiers) = children_of_kind(decl, "modifiers").into_iter().next() else {
        return Vec::new();
    };

    let mut cursor = modifiers.walk();
    modifiers
        .named_children(&mut cursor)
        .filter(|n| matches!(n.kind(), "annotation" | "marker_annotation"))
        .filter_map(|n| {
            let name_node = n.child_by_field_name("name")?;
            let full = parsed.node_text(name_node);
            let name = full.rsplit('.').next().unwrap_or(full).to_string();
            let arguments = n
                .child_by_field_name("arguments")
                .map(|args| annotation_arguments(parsed, args))
                .unwrap_or_default();
            Some(Annotation { name, arguments })
        })
        .collect()
}

fn annotation_arguments(parsed: &ParsedFile, args: Node) -> Vec<(String, String)> {
    let mut cursor = args.walk();
    args.named_children(&mut cursor)
        .filter(|n| !matches!(n.kind(), "line_comment" | "block_comment"))
        .map(|n| {
            if n.kind() == "element_value_pair" {
                let key = n
                    .child_by_field_name("key")
                    .map(|k| parsed.node_text(k).to_string())
                    .unwrap_or_default();
                let value = n
                    .child_by_field_name("value")
                    .map(|v| parsed.node_text(v).to_string())
                    .unwrap_or_default();
                (key, value)
            } else {
                ("value".to_string(), parsed.node_text(n).to_string())
            }
        })
        .collect()
}

/// Find an annotation by simple name.
pub fn find_annotation<'a>(annotations: &'a [Annotation], name: &str) -> Option<&'a Annotation> {
    annotations.iter().find(|a| a.name == name)
}

/// Direct member declarations of a class body with the given kind.
pub fn members<'t>(class: Node<'t>, kind: &str) -> Vec<Node<'t>> {
    class
        .child_by_field_name("body")
        .map(|body| children_of_kind(body, kind))
        .unwrap_or_default()
}

/// Whether a declaration carries a bare keyword modifier such as `static`.
pub fn has_modifier(parsed: &ParsedFile, decl: Node, keyword: &str) -> bool {
    children_of_kind(decl, "modifiers")
        .into_iter()
        .next()
        .map(|m| {
            let mut cursor = m.walk();
            let found = m
                .children(&mut cursor)
                .any(|c| !c.is_named() && parsed.node_text(c) == keyword);
            found
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_java(source: &str) -> (JavaAnalyzer, ParsedFile) {
        let analyzer = JavaAnalyzer::new();
        let parsed = analyzer
            .parse(Path::new("Test.java"), source.as_bytes())
            .unwrap();
        (analyzer, parsed)
    }

    #[test]
    fn test_classes_are_qualified_by_package() {
        let (analyzer, parsed) = parse_java(
            r#"
package com.example.orders;

public class OrderController {
    static class Inner {}
}
"#,
        );
        assert!(parsed.is_clean());
        let classes = analyzer.classes(&parsed).unwrap();
        let names: Vec<_> = classes.iter().map(|c| c.qualified_name.as_str()).collect();
        assert_eq!(
            names,
            vec!["com.example.orders.OrderController", "com.example.orders.Inner"]
        );
    }

    #[test]
    fn test_annotations_with_arguments() {
        let (analyzer, parsed) = parse_java(
            r#"
@RestController
@RequestMapping(value = "/api", produces = "application/json")
public class C {}
"#,
        );
        let classes = analyzer.classes(&parsed).unwrap();
        let anns = annotations(&parsed, classes[0].node);
        assert_eq!(anns.len(), 2);
        assert_eq!(anns[0].name, "RestController");
        let mapping = find_annotation(&anns, "RequestMapping").unwrap();
        assert_eq!(mapping.strings(&["value", "path"]), vec!["/api"]);
    }

    #[test]
    fn test_broken_source_is_not_clean() {
        let (_, parsed) = parse_java("class Broken {");
        assert!(!parsed.is_clean());
    }

    #[test]
    fn test_has_modifier() {
        let (analyzer, parsed) = parse_java(
            "class A { private static final int X = 1; private String name; }",
        );
        let classes = analyzer.classes(&parsed).unwrap();
        let fields = members(classes[0].node, "field_declaration");
        assert_eq!(fields.len(), 2);
        assert!(has_modifier(&parsed, fields[0], "static"));
        assert!(!has_modifier(&parsed, fields[1], "static"));
    }
}
