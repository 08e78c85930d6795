//! Configuration Specification Tree
//!
//! The hierarchy of valid sections and settings of a workflow configuration,
//! loaded from an embedded TOML resource.

use std::collections::HashMap;

/// Name of the canonical entry file, and of the tree's root
pub const ROOT_NAME: &str = "flow.cylc";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Section,
    Setting,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpecNode {
    pub name: String,
    pub kind: NodeKind,
    pub description: Option<String>,
    pub children: Vec<SpecNode>,
}

impl SpecNode {
    fn section(name: impl Into<String>, children: Vec<SpecNode>) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::Section,
            description: None,
            children,
        }
    }

    /// Placeholder nodes stand for user-chosen names, e.g. `<namespace>`
    pub fn is_placeholder(&self) -> bool {
        self.name.contains('<') || self.name.contains('>')
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpecTree {
    root: SpecNode,
}

impl SpecTree {
    /// Parse a tree: tables are sections, string values are settings
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        let table: toml::Table = toml::from_str(text)?;
        Ok(Self {
            root: SpecNode::section(ROOT_NAME, nodes_from_table(table)),
        })
    }

    /// The built-in workflow configuration tree
    pub fn embedded() -> Self {
        let embedded_toml = include_str!("../../resources/spec/workflow.toml");

        match Self::from_toml(embedded_toml) {
            Ok(tree) => tree,
            Err(e) => {
                log::warn!(
                    "Failed to parse embedded workflow spec: {}. Using minimal fallback.",
                    e
                );
                Self::minimal()
            }
        }
    }

    /// Top level sections only
    pub fn minimal() -> Self {
        let sections = ["meta", "scheduler", "task parameters", "scheduling", "runtime"]
            .into_iter()
            .map(|name| SpecNode::section(name, Vec::new()))
            .collect();
        Self {
            root: SpecNode::section(ROOT_NAME, sections),
        }
    }

    pub fn root(&self) -> &SpecNode {
        &self.root
    }

    /// Render the flattened textual tree, one node per line
    ///
    /// ```text
    /// flow.cylc
    ///   [meta]
    ///     title
    ///   [scheduler]
    ///     [[events]]
    /// ```
    pub fn tree(&self) -> String {
        let mut out = String::new();
        render(&self.root, 0, &mut out);
        out
    }

    /// Setting descriptions by name; the first occurrence wins
    pub fn descriptions(&self) -> HashMap<&str, &str> {
        let mut map = HashMap::new();
        collect_descriptions(&self.root, &mut map);
        map
    }
}

fn nodes_from_table(table: toml::Table) -> Vec<SpecNode> {
    table
        .into_iter()
        .map(|(name, value)| match value {
            toml::Value::Table(children) => SpecNode::section(name, nodes_from_table(children)),
            toml::Value::String(description) => SpecNode {
                name,
                kind: NodeKind::Setting,
                description: Some(description),
                children: Vec::new(),
            },
            _ => SpecNode {
                name,
                kind: NodeKind::Setting,
                description: None,
                children: Vec::new(),
            },
        })
        .collect()
}

fn render(node: &SpecNode, depth: usize, out: &mut String) {
    out.push_str(&"  ".repeat(depth));
    match node.kind {
        NodeKind::Section if depth > 0 => {
            out.push_str(&"[".repeat(depth));
            out.push_str(&node.name);
            out.push_str(&"]".repeat(depth));
        }
        _ => out.push_str(&node.name),
    }
    out.push('\n');

    for child in &node.children {
        render(child, depth + 1, out);
    }
}

fn collect_descriptions<'a>(node: &'a SpecNode, map: &mut HashMap<&'a str, &'a str>) {
    if let Some(description) = &node.description {
        map.entry(node.name.as_str()).or_insert(description.as_str());
    }
    for child in &node.children {
        collect_descriptions(child, map);
    }
}
