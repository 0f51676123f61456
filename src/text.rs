//! Plain-text extraction from a parsed tree.

use crate::node::{Node, Parameters};
use phf::phf_set;
use regex::Regex;
use std::sync::LazyLock;

/// Templates whose text is their first positional parameter.
static FIRST_POSITIONAL: phf::Set<&str> = phf_set! { "iast", "korean", "ipa" };

/// Templates whose text is their second positional parameter.
static SECOND_POSITIONAL: phf::Set<&str> = phf_set! { "audio", "audio-nohelp", "lang" };

static BLANK_LINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s*\n").unwrap());

/// Options for [`ast_to_text`].
#[derive(Default)]
pub struct TextOptions<'a> {
    /// Maps a heading's level and extracted text to replacement text.
    pub heading_callback: Option<&'a dyn Fn(u8, &str) -> String>,
}

/// Collapses a parsed tree into plain text.
pub fn ast_to_text(ast: &[Node], options: &TextOptions<'_>) -> String {
    let mut out = String::new();
    for node in ast {
        node_text(node, &mut out, options);
    }
    BLANK_LINES.replace_all(&out, "\n\n").into_owned()
}

fn collect(nodes: &[Node], options: &TextOptions<'_>) -> String {
    let mut out = String::new();
    for node in nodes {
        node_text(node, &mut out, options);
    }
    out
}

fn node_text(node: &Node, out: &mut String, options: &TextOptions<'_>) {
    match node {
        Node::Plaintext(text) => out.push_str(text),
        Node::Comment { .. } => {}
        Node::LineBreak => out.push('\n'),
        Node::Heading { level, content } => {
            let text = collect(content, options);
            match options.heading_callback {
                Some(callback) => out.push_str(&callback(*level, &text)),
                None => out.push_str(&text),
            }
            out.push_str("\n\n");
        }
        Node::UnorderedList { items } | Node::OrderedList { items } | Node::Indent { items } => {
            for item in items {
                out.push_str(&collect(&item.content, options));
                out.push('\n');
            }
        }
        Node::Gallery { items, .. } => {
            for item in items {
                node_text(item, out, options);
                out.push('\n');
            }
        }
        Node::Description { title, content } => {
            for n in title {
                node_text(n, out, options);
            }
            out.push('\n');
            if !content.is_empty() {
                for n in content {
                    node_text(n, out, options);
                }
                out.push('\n');
            }
        }
        Node::Table { content, .. } => {
            for r in content {
                node_text(r, out, options);
            }
        }
        Node::TableRow { content, .. } => {
            for c in content {
                node_text(c, out, options);
            }
            out.push('\n');
        }
        Node::TableCell { content, .. } => {
            for n in content {
                node_text(n, out, options);
            }
            out.push('\t');
        }
        Node::Template {
            name,
            parameters,
            positional_parameters,
        } => {
            out.push_str(&template_text(
                name,
                parameters,
                positional_parameters,
                options,
            ));
        }
        Node::Italics { content }
        | Node::Bold { content }
        | Node::BoldItalics { content }
        | Node::Link { content, .. }
        | Node::ExternalLink { content, .. }
        | Node::Preformatted { content }
        | Node::HorizontalRule { content }
        | Node::Tag { content, .. }
        | Node::Ref { content, .. }
        | Node::Nowiki { content, .. }
        | Node::Pre { content, .. }
        | Node::Code { content, .. }
        | Node::Source { content, .. }
        | Node::SyntaxHighlight { content, .. }
        | Node::Math { content, .. } => {
            for n in content {
                node_text(n, out, options);
            }
        }
    }
}

/// The small allowlist of templates that contribute text.
fn template_text(
    name: &str,
    parameters: &Parameters,
    positional: &[Vec<Node>],
    options: &TextOptions<'_>,
) -> String {
    if name == "zh" || name == "lang-zh" {
        for key in ["c", "t", "s", "p"] {
            if let Some(value) = parameters.get(key) {
                return collect(value, options);
            }
        }
        return String::new();
    }
    if name.starts_with("lang-")
        || name.starts_with("ipa-")
        || name.starts_with("ipac-")
        || FIRST_POSITIONAL.contains(name)
    {
        return positional
            .first()
            .map(|value| collect(value, options))
            .unwrap_or_default();
    }
    if name == "bibleverse" {
        return positional
            .iter()
            .map(|value| collect(value, options))
            .collect::<Vec<_>>()
            .join(" ");
    }
    if SECOND_POSITIONAL.contains(name) && positional.len() >= 2 {
        return collect(&positional[1], options);
    }
    String::new()
}
