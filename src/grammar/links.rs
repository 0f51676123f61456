//! Internal (`[[...]]`) and external (`[uri ...]`) link productions, plus
//! the `key=value` / positional segment machinery shared with templates.

use crate::{
    engine::{self, Engine, NextOptions},
    error::Error,
    node::{self, Node, NodeKind, Parameters},
};
use regex::Regex;
use std::sync::LazyLock;

/// Protocols which may introduce an external link.
const PROTOCOLS: &[&str] = &[
    "http://", "https://", "ftp://", "ftps://", "sftp://", "git://", "svn://", "irc://", "ircs://",
    "//", "mailto:", "magnet:", "tel:", "urn:", "xmpp:", "geo:",
];

static SCHEME: LazyLock<Regex> = LazyLock::new(|| {
    let mut pattern = String::from("^(?:");
    for (index, protocol) in PROTOCOLS.iter().enumerate() {
        if index != 0 {
            pattern.push('|');
        }
        pattern += &regex::escape(protocol);
    }
    pattern.push(')');
    Regex::new(&pattern).unwrap()
});

/// Post-condition for `[`: a URI-like scheme follows the bracket.
pub(super) fn uri_follows(engine: &Engine<'_>) -> bool {
    engine.starts_with_regex(&SCHEME)
}

pub(super) fn external_link(e: &mut Engine<'_>) -> Result<Option<Vec<Node>>, Error> {
    let uri: String = e
        .rest()
        .chars()
        .take_while(|&c| !matches!(c, ' ' | '\t' | '\n' | ']'))
        .collect();
    e.advance(&uri);
    e.eat_whitespace(false);
    let opts = NextOptions {
        end: &["]"],
        backtrack_on: Some(engine::eol),
        ..NextOptions::default()
    };
    let Some(mut content) = e.next(&opts)? else {
        return Ok(None);
    };
    node::trim(&mut content);
    Ok(Some(vec![Node::ExternalLink { uri, content }]))
}

pub(super) fn link(e: &mut Engine<'_>) -> Result<Option<Vec<Node>>, Error> {
    let page_opts = NextOptions {
        end_before: &["|", "]]"],
        backtrack_on: Some(engine::eol),
        allow: Some(&[NodeKind::Entity]),
        ..NextOptions::default()
    };
    let Some(page) = e.next(&page_opts)? else {
        return Ok(None);
    };
    let Some(page_text) = node::text_of(&page) else {
        return Ok(None);
    };
    let page_text = page_text.trim();

    // A leading colon marks a plain link to a category or similar page
    // rather than a membership declaration.
    let (page_text, plain) = match page_text.strip_prefix(':') {
        Some(stripped) => (stripped, true),
        None => (page_text, false),
    };
    if page_text.is_empty() {
        return Ok(None);
    }

    let (to, anchor) = match page_text.split_once('#') {
        Some((to, anchor)) => (to.to_owned(), Some(anchor.to_owned())),
        None => (page_text.to_owned(), None),
    };

    let mut parameters = Parameters::new();
    let mut positional: Vec<Vec<Node>> = Vec::new();
    let mut last_positional: Option<Vec<Node>> = None;
    loop {
        if e.eat_opt("]]") {
            break;
        }
        if !e.eat_opt("|") {
            return Ok(None);
        }
        match segment(e, &["|", "{{", "]]", "<"], &["|", "]]"], None)? {
            None => return Ok(None),
            Some(Segment::Named(key, value)) => {
                assign(key, value, &mut parameters, &mut positional);
            }
            Some(Segment::Positional(value)) => {
                if !value.is_empty() {
                    positional.push(value.clone());
                }
                last_positional = Some(value);
            }
        }
    }

    let mut content = match last_positional {
        Some(value) if !value.is_empty() => value,
        // Pipe trick: an empty trailing segment takes its label from the
        // namespace-stripped page name.
        Some(_) => {
            let display = to
                .split_once(':')
                .map(|(_, rest)| rest)
                .filter(|rest| !rest.is_empty())
                .unwrap_or(to.as_str());
            vec![Node::Plaintext(display.to_owned())]
        }
        None => vec![Node::Plaintext(to.clone())],
    };

    // Link trail: word characters directly after `]]` join the label.
    let trail: String = e
        .rest()
        .chars()
        .take_while(|&c| c.is_alphanumeric() || c == '_')
        .collect();
    if !trail.is_empty() {
        e.advance(&trail);
        node::append_text(&mut content, &trail);
    }

    Ok(Some(vec![Node::Link {
        to,
        content,
        anchor,
        parameters,
        positional_parameters: positional,
        plain,
    }]))
}

/// One `|`-separated parameter segment.
pub(super) enum Segment {
    Named(String, Vec<Node>),
    Positional(Vec<Node>),
}

/// Parses a parameter segment, preferring `key=value` when a plain-text run
/// up to `=` yields a non-empty key.
pub(super) fn segment(
    e: &mut Engine<'_>,
    key_stoppers: &[&str],
    terminators: &[&str],
    value_allow: Option<&[NodeKind]>,
) -> Result<Option<Segment>, Error> {
    let mark = e.mark();
    let key_opts = NextOptions {
        end: &["="],
        backtrack: key_stoppers,
        backtrack_on: Some(engine::eol),
        allow: Some(&[]),
        ..NextOptions::default()
    };
    let key = e
        .next(&key_opts)?
        .and_then(|nodes| node::text_of(&nodes))
        .map(|key| key.trim().to_lowercase())
        .filter(|key| !key.is_empty());
    let value_opts = NextOptions {
        end_before: terminators,
        allow: value_allow,
        ..NextOptions::default()
    };
    if let Some(key) = key {
        let Some(mut value) = e.next(&value_opts)? else {
            return Ok(None);
        };
        node::trim(&mut value);
        return Ok(Some(Segment::Named(key, value)));
    }
    e.reset(mark);
    let Some(mut value) = e.next(&value_opts)? else {
        return Ok(None);
    };
    node::trim(&mut value);
    Ok(Some(Segment::Positional(value)))
}

/// Stores a named segment; keys that parse as integers fill the positional
/// list at `key - 1`, leaving holes as empty lists.
pub(super) fn assign(
    key: String,
    value: Vec<Node>,
    parameters: &mut Parameters,
    positional: &mut Vec<Vec<Node>>,
) {
    if let Ok(index) = key.parse::<usize>() {
        if index >= 1 {
            if positional.len() < index {
                positional.resize_with(index, Vec::new);
            }
            positional[index - 1] = value;
            return;
        }
    }
    parameters.insert(key, value);
}
