//! HTML-like tag productions: comments, special content tags, the generic
//! tag fallback, and attribute-list parsing (shared with tables).
//!
//! Opening tags require a tag-name boundary after the name. Closing tags
//! are lenient: `</name   >` is accepted, and a missing close tag ends at
//! the end of the stream or at an outer terminator (`]]`, `}}`, `\n|`,
//! `\n!`) instead of being an error. A second opening tag of the same name
//! before the close therefore becomes a child of the first, not a sibling.

use crate::{
    engine::{Engine, NextOptions},
    error::Error,
    node::{self, AttributeValue, Attributes, Node, NodeKind, Parameters},
};

/// Pre-condition for `<br`/`<hr`: the two-letter name ends at a tag-name
/// boundary.
pub(super) fn void_boundary(e: &Engine<'_>) -> bool {
    matches!(
        e.lower_rest().as_bytes().get(3),
        Some(b' ' | b'\t' | b'>' | b'/')
    )
}

/// `<!--` has been consumed; an unterminated comment runs to the end of the
/// stream. The content is trimmed of surrounding whitespace and dashes.
pub(super) fn comment(e: &mut Engine<'_>) -> Result<Option<Vec<Node>>, Error> {
    let (raw, consumed) = {
        let rest = e.rest();
        match rest.find("-->") {
            Some(position) => (rest[..position].to_owned(), position + "-->".len()),
            None => (rest.to_owned(), rest.len()),
        }
    };
    e.advance_len(consumed);
    let trimmed = raw.trim_matches(|c: char| c.is_whitespace() || c == '-');
    let content = if trimmed.is_empty() {
        Vec::new()
    } else {
        vec![Node::Plaintext(trimmed.to_owned())]
    };
    Ok(Some(vec![Node::Comment { content }]))
}

/// Where an attribute list appears; this decides its terminators and
/// whether quoted values may span newlines.
#[derive(Clone, Copy, Eq, PartialEq)]
pub(super) enum AttrContext {
    /// Inside `<tag ...>`: ends at `>` or `/`; quotes may span lines.
    Tag,
    /// A table or row attribute line: ends at the newline.
    Line,
    /// A cell prefix: ends at `|` or the newline.
    Cell,
}

fn is_attr_boundary(c: char) -> bool {
    matches!(
        c,
        ' ' | '\t' | '\n' | '=' | '"' | '\'' | '>' | '/' | '|' | '<'
    )
}

/// Parses whitespace-separated `name` / `name=value` attributes up to the
/// context's terminator. Bare names become `true`.
pub(super) fn parse_attributes(e: &mut Engine<'_>, ctx: AttrContext) -> Attributes {
    let mut attributes = Attributes::new();
    loop {
        e.eat_whitespace(ctx == AttrContext::Tag);
        let Some(c) = e.current_char() else { break };
        match c {
            '\n' => break,
            '>' | '/' if ctx == AttrContext::Tag => break,
            '|' if ctx == AttrContext::Cell => break,
            _ => {}
        }
        let name: String = e
            .rest()
            .chars()
            .take_while(|&c| !is_attr_boundary(c))
            .collect();
        if name.is_empty() {
            // Stray delimiter.
            e.advance_len(c.len_utf8());
            continue;
        }
        e.advance(&name);
        if e.eat_opt("=") {
            e.eat_whitespace(false);
            let value = read_value(e, ctx);
            attributes.insert(name, AttributeValue::Text(value));
        } else {
            attributes.insert(name, AttributeValue::Flag(true));
        }
    }
    attributes
}

fn read_value(e: &mut Engine<'_>, ctx: AttrContext) -> String {
    match e.current_char() {
        Some(quote) if quote == '"' || quote == '\'' => {
            e.advance_len(1);
            let rest = e.rest();
            let end = rest
                .char_indices()
                .find(|&(_, c)| c == quote || (ctx != AttrContext::Tag && c == '\n'))
                .map(|(position, _)| position)
                .unwrap_or(rest.len());
            let value = rest[..end].to_owned();
            e.advance_len(end);
            // An unbalanced quote ends at the newline or end of stream,
            // leaving the terminator in place.
            if e.current_char() == Some(quote) {
                e.advance_len(1);
            }
            value
        }
        _ => {
            let value: String = e
                .rest()
                .chars()
                .take_while(|&c| !is_attr_boundary(c))
                .collect();
            e.advance(&value);
            value
        }
    }
}

struct OpenTag {
    name: String,
    attributes: Attributes,
    self_closing: bool,
}

/// Parses `<name attrs>` / `<name attrs/>` from the cursor. Returns `None`
/// when this is not an opening tag; the dispatcher rewinds.
fn parse_open(e: &mut Engine<'_>) -> Option<OpenTag> {
    if !e.eat_opt("<") {
        return None;
    }
    let name: String = e
        .lower_rest()
        .chars()
        .take_while(|&c| c.is_ascii_alphabetic() || c == '-')
        .collect();
    if name.is_empty() {
        return None;
    }
    e.advance_len(name.len());
    match e.current_char() {
        Some(' ' | '\t' | '>' | '/') => {}
        _ => return None,
    }
    let attributes = parse_attributes(e, AttrContext::Tag);
    if e.eat_opt("/") {
        e.eat_whitespace(true);
        if !e.eat_opt(">") {
            return None;
        }
        return Some(OpenTag {
            name,
            attributes,
            self_closing: true,
        });
    }
    if !e.eat_opt(">") {
        return None;
    }
    Some(OpenTag {
        name,
        attributes,
        self_closing: false,
    })
}

/// Parses tag content up to the close tag or an implicit terminator.
fn parse_content(
    e: &mut Engine<'_>,
    name: &str,
    allow: Option<&[NodeKind]>,
    disallow: &[NodeKind],
    trim_content: bool,
) -> Result<Option<Vec<Node>>, Error> {
    let close = format!("</{name}");
    let end_before = [close.as_str(), "]]", "}}", "\n|", "\n!"];
    let opts = NextOptions {
        end_before: &end_before,
        end_at_eos: true,
        allow,
        disallow,
        ..NextOptions::default()
    };
    let Some(mut content) = e.next(&opts)? else {
        return Ok(None);
    };
    if e.starts_with(&close) {
        let mark = e.mark();
        e.advance_len(close.len());
        e.eat_whitespace(false);
        if !e.eat_opt(">") {
            // A longer tag name shares this prefix; close implicitly.
            e.reset(mark);
        }
    }
    if trim_content {
        node::trim(&mut content);
    }
    Ok(Some(content))
}

type Build = fn(Vec<Node>, Attributes) -> Node;

fn named(
    e: &mut Engine<'_>,
    name: &str,
    allow: Option<&[NodeKind]>,
    disallow: &[NodeKind],
    trim_content: bool,
    build: Build,
) -> Result<Option<Vec<Node>>, Error> {
    let Some(open) = parse_open(e) else {
        return Ok(None);
    };
    if open.name != name {
        return Ok(None);
    }
    if open.self_closing {
        return Ok(Some(vec![build(Vec::new(), open.attributes)]));
    }
    let Some(content) = parse_content(e, name, allow, disallow, trim_content)? else {
        return Ok(None);
    };
    Ok(Some(vec![build(content, open.attributes)]))
}

pub(super) fn source(e: &mut Engine<'_>) -> Result<Option<Vec<Node>>, Error> {
    named(e, "source", Some(&[]), &[], false, |content, attributes| {
        Node::Source { content, attributes }
    })
}

pub(super) fn syntaxhighlight(e: &mut Engine<'_>) -> Result<Option<Vec<Node>>, Error> {
    named(
        e,
        "syntaxhighlight",
        Some(&[]),
        &[],
        false,
        |content, attributes| Node::SyntaxHighlight { content, attributes },
    )
}

pub(super) fn pre(e: &mut Engine<'_>) -> Result<Option<Vec<Node>>, Error> {
    named(e, "pre", Some(&[]), &[], false, |content, attributes| {
        Node::Pre { content, attributes }
    })
}

pub(super) fn code(e: &mut Engine<'_>) -> Result<Option<Vec<Node>>, Error> {
    named(e, "code", Some(&[]), &[], true, |content, attributes| {
        Node::Code { content, attributes }
    })
}

pub(super) fn math(e: &mut Engine<'_>) -> Result<Option<Vec<Node>>, Error> {
    named(
        e,
        "math",
        Some(&[]),
        &[NodeKind::Template, NodeKind::TemplatePreformatted],
        false,
        |content, attributes| Node::Math { content, attributes },
    )
}

pub(super) fn ref_tag(e: &mut Engine<'_>) -> Result<Option<Vec<Node>>, Error> {
    named(e, "ref", None, &[], true, |content, attributes| Node::Ref {
        content,
        attributes,
    })
}

/// `<nowiki/>` with no content collapses to nothing at all.
pub(super) fn nowiki(e: &mut Engine<'_>) -> Result<Option<Vec<Node>>, Error> {
    let Some(open) = parse_open(e) else {
        return Ok(None);
    };
    if open.name != "nowiki" {
        return Ok(None);
    }
    if open.self_closing {
        return Ok(Some(Vec::new()));
    }
    let Some(content) = parse_content(e, "nowiki", Some(&[]), &[], false)? else {
        return Ok(None);
    };
    Ok(Some(vec![Node::Nowiki {
        content,
        attributes: open.attributes,
    }]))
}

/// `<gallery>` content is one `target[|caption]` entry per line; blank and
/// bare-`|` lines are skipped.
pub(super) fn gallery(e: &mut Engine<'_>) -> Result<Option<Vec<Node>>, Error> {
    let Some(open) = parse_open(e) else {
        return Ok(None);
    };
    if open.name != "gallery" {
        return Ok(None);
    }
    let mut items = Vec::new();
    if !open.self_closing {
        let Some(content) = parse_content(e, "gallery", Some(&[]), &[], false)? else {
            return Ok(None);
        };
        let text = node::text_of(&content).unwrap_or_default();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line == "|" {
                continue;
            }
            let (target, caption) = match line.split_once('|') {
                Some((target, caption)) => (target.trim(), Some(caption.trim())),
                None => (line, None),
            };
            if target.is_empty() {
                continue;
            }
            let label = caption.filter(|caption| !caption.is_empty()).unwrap_or(target);
            items.push(Node::Link {
                to: target.to_owned(),
                content: vec![Node::Plaintext(label.to_owned())],
                anchor: None,
                parameters: Parameters::new(),
                positional_parameters: vec![],
                plain: false,
            });
        }
    }
    Ok(Some(vec![Node::Gallery {
        attributes: open.attributes,
        items,
    }]))
}

/// The catch-all tag production.
pub(super) fn tag(e: &mut Engine<'_>) -> Result<Option<Vec<Node>>, Error> {
    let Some(open) = parse_open(e) else {
        return Ok(None);
    };
    if open.self_closing {
        return Ok(Some(vec![Node::Tag {
            name: open.name,
            attributes: open.attributes,
            content: Vec::new(),
            self_closing: true,
        }]));
    }
    let Some(content) = parse_content(e, &open.name, None, &[], true)? else {
        return Ok(None);
    };
    Ok(Some(vec![Node::Tag {
        name: open.name,
        attributes: open.attributes,
        content,
        self_closing: false,
    }]))
}
