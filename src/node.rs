//! AST node shapes and the list-building contracts.

use indexmap::IndexMap;
use serde::Serialize;

/// Named template or link parameters, in source order.
pub type Parameters = IndexMap<String, Vec<Node>>;

/// Tag or table attributes, in source order.
pub type Attributes = IndexMap<String, AttributeValue>;

/// The value of a tag or table attribute: a string, or `true` for a bare
/// boolean attribute.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// A quoted or bare textual value.
    Text(String),
    /// A bare attribute with no value; always `true`.
    Flag(bool),
}

/// One item of a list-like node (`unorderedList`, `orderedList`, `indent`).
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListItem {
    /// Nesting depth, counted from the run of markers starting the line.
    pub level: usize,
    /// The item content.
    pub content: Vec<Node>,
}

/// A node of the parsed document.
///
/// Plain text is a bare string; every other variant is tagged with its
/// `type`. Optional fields are omitted from the serialized form when absent,
/// and `parameters`/`positionalParameters` are omitted when empty.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Node {
    Italics {
        content: Vec<Node>,
    },
    Bold {
        content: Vec<Node>,
    },
    BoldItalics {
        content: Vec<Node>,
    },

    /// An internal link, `[[Page#Anchor|label]]`.
    Link {
        to: String,
        content: Vec<Node>,
        #[serde(skip_serializing_if = "Option::is_none")]
        anchor: Option<String>,
        #[serde(skip_serializing_if = "Parameters::is_empty")]
        parameters: Parameters,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        positional_parameters: Vec<Vec<Node>>,
        /// Set for colon-prefixed links: render as a link, not as a
        /// category or language membership.
        #[serde(skip_serializing_if = "is_false")]
        plain: bool,
    },

    /// An external link, `[uri label]`.
    ExternalLink {
        uri: String,
        content: Vec<Node>,
    },

    /// A template transclusion, `{{name|...}}`.
    Template {
        name: String,
        #[serde(skip_serializing_if = "Parameters::is_empty")]
        parameters: Parameters,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        positional_parameters: Vec<Vec<Node>>,
    },

    Heading {
        /// Outline level, 1 through 6.
        level: u8,
        content: Vec<Node>,
    },

    UnorderedList {
        items: Vec<ListItem>,
    },
    OrderedList {
        items: Vec<ListItem>,
    },
    Indent {
        items: Vec<ListItem>,
    },

    /// A definition list line, `;title:content`.
    Description {
        title: Vec<Node>,
        content: Vec<Node>,
    },

    /// Space-indented verbatim block.
    Preformatted {
        content: Vec<Node>,
    },

    HorizontalRule {
        content: Vec<Node>,
    },

    /// `<br>` in any of its spellings. Its markup content is discarded.
    LineBreak,

    /// An HTML comment. The content is always a list of strings.
    Comment {
        content: Vec<Node>,
    },

    Table {
        attributes: Attributes,
        caption: Vec<Node>,
        content: Vec<Node>,
    },
    #[serde(rename = "table-row")]
    TableRow {
        attributes: Attributes,
        content: Vec<Node>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        comments: Vec<Node>,
    },
    #[serde(rename = "table-cell")]
    TableCell {
        header: bool,
        attributes: Attributes,
        content: Vec<Node>,
    },

    /// A generic HTML-like tag with parsed content.
    Tag {
        name: String,
        attributes: Attributes,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        content: Vec<Node>,
        #[serde(skip_serializing_if = "is_false")]
        self_closing: bool,
    },

    Ref {
        content: Vec<Node>,
        attributes: Attributes,
    },
    Nowiki {
        content: Vec<Node>,
        attributes: Attributes,
    },
    Pre {
        content: Vec<Node>,
        attributes: Attributes,
    },
    Code {
        content: Vec<Node>,
        attributes: Attributes,
    },
    Source {
        content: Vec<Node>,
        attributes: Attributes,
    },
    #[serde(rename = "syntaxhighlight")]
    SyntaxHighlight {
        content: Vec<Node>,
        attributes: Attributes,
    },
    Math {
        content: Vec<Node>,
        attributes: Attributes,
    },

    /// `<gallery>`; each item is a `link` node.
    Gallery {
        attributes: Attributes,
        items: Vec<Node>,
    },

    /// A run of plain text. Adjacent runs are always coalesced.
    #[serde(untagged)]
    Plaintext(String),
}

fn is_false(value: &bool) -> bool {
    !value
}

/// The production type of a grammar table entry, used for `allow`/`disallow`
/// filtering during dispatch.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum NodeKind {
    Link,
    ExternalLink,
    BoldItalics,
    Bold,
    Italics,
    Template,
    TemplatePreformatted,
    UnorderedList,
    OrderedList,
    Indent,
    Description,
    Heading,
    Entity,
    MagicWord,
    Preformatted,
    Comment,
    LineBreak,
    HorizontalRule,
    Source,
    Math,
    Ref,
    Nowiki,
    Pre,
    SyntaxHighlight,
    Code,
    Gallery,
    Tag,
    Table,
}

/// Appends a node to `content`, concatenating adjacent plain text and
/// dropping empty strings.
pub(crate) fn append(content: &mut Vec<Node>, node: Node) {
    match node {
        Node::Plaintext(text) => append_text(content, &text),
        other => content.push(other),
    }
}

/// Appends plain text to `content` under the coalescing contract.
pub(crate) fn append_text(content: &mut Vec<Node>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Node::Plaintext(last)) = content.last_mut() {
        last.push_str(text);
    } else {
        content.push(Node::Plaintext(text.to_owned()));
    }
}

/// Strips leading whitespace from the first element and trailing whitespace
/// from the last, removing either entirely if it becomes empty.
pub(crate) fn trim(content: &mut Vec<Node>) {
    if let Some(Node::Plaintext(first)) = content.first_mut() {
        let trimmed = first.trim_start();
        if trimmed.len() != first.len() {
            *first = trimmed.to_owned();
        }
        if first.is_empty() {
            content.remove(0);
        }
    }
    if let Some(Node::Plaintext(last)) = content.last_mut() {
        let trimmed = last.trim_end();
        if trimmed.len() != last.len() {
            *last = trimmed.to_owned();
        }
        if last.is_empty() {
            content.pop();
        }
    }
}

/// Concatenates the text of a pure-plaintext node list. Returns `None` if
/// any element is not plain text.
pub(crate) fn text_of(nodes: &[Node]) -> Option<String> {
    let mut out = String::new();
    for node in nodes {
        match node {
            Node::Plaintext(text) => out.push_str(text),
            _ => return None,
        }
    }
    Some(out)
}
