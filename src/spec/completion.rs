//! Completion Provider
//!
//! Completion labels are a pure function of the specification tree: the
//! requesting document's content never changes them.

use std::collections::BTreeMap;

use tower_lsp::lsp_types::{CompletionItem, CompletionItemKind, CompletionList, Documentation};

use crate::spec::tree::{SpecTree, ROOT_NAME};

/// Always offered ahead of the configuration keys
pub const STRUCTURAL_TOKENS: [&str; 3] = ["\"", "[", "]"];

#[derive(Debug, Clone)]
pub struct CompletionProvider {
    items: Vec<CompletionItem>,
}

impl CompletionProvider {
    pub fn new(spec: &SpecTree) -> Self {
        let descriptions = spec.descriptions();

        let structural = STRUCTURAL_TOKENS.iter().map(|token| CompletionItem {
            label: token.to_string(),
            kind: Some(CompletionItemKind::OPERATOR),
            ..Default::default()
        });

        let keys = key_labels(&spec.tree())
            .into_iter()
            .map(|(label, is_section)| {
                let documentation = descriptions
                    .get(label.as_str())
                    .filter(|_| !is_section)
                    .map(|text| Documentation::String(text.to_string()));
                CompletionItem {
                    kind: Some(if is_section {
                        CompletionItemKind::MODULE
                    } else {
                        CompletionItemKind::PROPERTY
                    }),
                    detail: Some(if is_section { "section" } else { "setting" }.to_string()),
                    documentation,
                    label,
                    ..Default::default()
                }
            });

        Self {
            items: structural.chain(keys).collect(),
        }
    }

    pub fn labels(&self) -> Vec<String> {
        self.items.iter().map(|item| item.label.clone()).collect()
    }

    pub fn completion_list(&self) -> CompletionList {
        CompletionList {
            is_incomplete: false,
            items: self.items.clone(),
        }
    }
}

/// Deduplicated key labels from a flattened tree, mapped to whether any
/// occurrence is a section. Placeholders and the root file are excluded.
pub fn key_labels(tree: &str) -> BTreeMap<String, bool> {
    let mut labels = BTreeMap::new();

    for line in tree.lines() {
        if line.contains('<') || line.contains('>') {
            continue;
        }
        let label = line.trim_matches(|c| c == ' ' || c == '[' || c == ']');
        if label.is_empty() || label == ROOT_NAME {
            continue;
        }
        let is_section = line.trim_start().starts_with('[');
        *labels.entry(label.to_string()).or_insert(false) |= is_section;
    }

    labels
}
