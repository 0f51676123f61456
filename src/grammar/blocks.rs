//! Line-anchored block productions: lists, indents, description lines,
//! headings, preformatted blocks, and horizontal rules.

use crate::{
    engine::{self, Engine, NextOptions},
    error::Error,
    node::{self, ListItem, Node, NodeKind},
};

fn line_to_end() -> NextOptions<'static> {
    NextOptions {
        end: &["\n"],
        end_at_eos: true,
        ..NextOptions::default()
    }
}

pub(super) fn unordered_list(e: &mut Engine<'_>) -> Result<Option<Vec<Node>>, Error> {
    Ok(list(e, '*', "*")?.map(|items| vec![Node::UnorderedList { items }]))
}

pub(super) fn ordered_list(e: &mut Engine<'_>) -> Result<Option<Vec<Node>>, Error> {
    Ok(list(e, '#', "#")?.map(|items| vec![Node::OrderedList { items }]))
}

pub(super) fn indent(e: &mut Engine<'_>) -> Result<Option<Vec<Node>>, Error> {
    Ok(list(e, ':', ":")?.map(|items| vec![Node::Indent { items }]))
}

/// Accumulates marker-prefixed lines into list items until a line does not
/// start with the marker.
fn list(
    e: &mut Engine<'_>,
    marker: char,
    marker_str: &str,
) -> Result<Option<Vec<ListItem>>, Error> {
    let mut items = Vec::new();
    while e.is_start_of_line() && e.starts_with(marker_str) {
        let level = e.eat_count(marker);
        let mut content = Vec::new();
        // `*:` nests an indent as the first element of the item.
        if marker != ':' && e.starts_with(":") {
            match embedded_indent(e)? {
                Some(nested) => content.push(nested),
                None => return Ok(None),
            }
        }
        let Some(rest) = e.next(&line_to_end())? else {
            return Ok(None);
        };
        for n in rest {
            node::append(&mut content, n);
        }
        node::trim(&mut content);
        items.push(ListItem { level, content });
    }
    if items.is_empty() {
        Ok(None)
    } else {
        Ok(Some(items))
    }
}

fn embedded_indent(e: &mut Engine<'_>) -> Result<Option<Node>, Error> {
    let level = e.eat_count(':');
    let opts = NextOptions {
        end_before: &["\n"],
        end_at_eos: true,
        ..NextOptions::default()
    };
    let Some(mut content) = e.next(&opts)? else {
        return Ok(None);
    };
    node::trim(&mut content);
    Ok(Some(Node::Indent {
        items: vec![ListItem { level, content }],
    }))
}

/// `;title:content` definition line.
pub(super) fn description(e: &mut Engine<'_>) -> Result<Option<Vec<Node>>, Error> {
    let title_opts = NextOptions {
        end_before: &[":", "\n"],
        end_at_eos: true,
        ..NextOptions::default()
    };
    let Some(mut title) = e.next(&title_opts)? else {
        return Ok(None);
    };
    node::trim(&mut title);
    let mut content = Vec::new();
    if e.eat_opt(":") {
        let Some(mut parsed) = e.next(&line_to_end())? else {
            return Ok(None);
        };
        node::trim(&mut parsed);
        content = parsed;
    } else {
        e.eat_opt("\n");
    }
    Ok(Some(vec![Node::Description { title, content }]))
}

/// `=`-delimited heading. The closing run must match the opening run and
/// nothing but whitespace may follow it on the line; otherwise the line
/// stays plain text.
pub(super) fn heading(e: &mut Engine<'_>) -> Result<Option<Vec<Node>>, Error> {
    let level = e.eat_count('=');
    if level > 6 {
        return Ok(None);
    }
    let content_opts = NextOptions {
        end_before: &["="],
        backtrack_on: Some(engine::eol),
        ..NextOptions::default()
    };
    let Some(mut content) = e.next(&content_opts)? else {
        return Ok(None);
    };
    if e.eat_count('=') != level {
        return Ok(None);
    }
    e.eat_whitespace(false);
    if !e.is_end_of_line() {
        return Ok(None);
    }
    e.eat_opt("\n");
    node::trim(&mut content);
    Ok(Some(vec![Node::Heading {
        level: level as u8,
        content,
    }]))
}

/// Space-indented lines accumulate into one preformatted block. Lines are
/// parsed with a narrow grammar, falling back to raw text when that parse
/// backtracks.
pub(super) fn preformatted(e: &mut Engine<'_>) -> Result<Option<Vec<Node>>, Error> {
    let rich = NextOptions {
        end: &["\n"],
        end_at_eos: true,
        allow: Some(&[
            NodeKind::LineBreak,
            NodeKind::TemplatePreformatted,
            NodeKind::Comment,
            NodeKind::Link,
            NodeKind::Bold,
            NodeKind::Italics,
        ]),
        ..NextOptions::default()
    };
    let raw = NextOptions {
        end: &["\n"],
        end_at_eos: true,
        allow: Some(&[]),
        ..NextOptions::default()
    };
    let mut content = Vec::new();
    while e.is_start_of_line() && e.starts_with(" ") {
        e.eat(" ")?;
        let line = match e.next(&rich)? {
            Some(line) => line,
            None => e.next(&raw)?.unwrap_or_default(),
        };
        for n in line {
            node::append(&mut content, n);
        }
        node::append_text(&mut content, "\n");
    }
    if content.is_empty() {
        return Ok(None);
    }
    Ok(Some(vec![Node::Preformatted { content }]))
}

/// `----` plus any trailing run of dashes.
pub(super) fn horizontal_rule(e: &mut Engine<'_>) -> Result<Option<Vec<Node>>, Error> {
    e.eat_count('-');
    Ok(Some(vec![Node::HorizontalRule {
        content: Vec::new(),
    }]))
}
