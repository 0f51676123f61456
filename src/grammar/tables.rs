//! The `{| ... |}` table production.
//!
//! A table is a line-oriented structure: an attribute line, one optional
//! `|+` caption, `|-` row separators with their own attribute lines, and
//! `|` / `!` cell lines where `||` / `!!` continue cells on the same line.
//! The first cells may appear before any `|-`, forming an implicit row.
//! The closing `|}` is mandatory; without it the whole construct stays
//! plain text.

use super::tags::{self, AttrContext};
use crate::{
    engine::{Engine, NextOptions},
    error::Error,
    node::{self, AttributeValue, Attributes, Node},
};

struct Row {
    attributes: Attributes,
    cells: Vec<Node>,
    comments: Vec<Node>,
}

impl Row {
    fn new(attributes: Attributes, comments: Vec<Node>) -> Self {
        Self {
            attributes,
            cells: Vec::new(),
            comments,
        }
    }

    fn is_empty(&self) -> bool {
        self.cells.is_empty() && self.attributes.is_empty() && self.comments.is_empty()
    }

    fn into_node(self) -> Node {
        Node::TableRow {
            attributes: self.attributes,
            content: self.cells,
            comments: self.comments,
        }
    }
}

/// Predicate: the next line begins with blanks and a cell or row marker or
/// a comment, which ends the current cell. Cell content starts mid-line,
/// but a nested production (a list, a multi-line template) may leave the
/// cursor at a line start, so both positions are recognized.
fn cell_line_boundary(e: &Engine<'_>) -> bool {
    let bytes = e.lower_rest().as_bytes();
    let mut index = 0;
    if !e.is_start_of_line() {
        if bytes.first() != Some(&b'\n') {
            return false;
        }
        index = 1;
    }
    while matches!(bytes.get(index), Some(b' ' | b'\t')) {
        index += 1;
    }
    matches!(bytes.get(index), Some(b'|' | b'!')) || bytes[index..].starts_with(b"<!--")
}

pub(super) fn table(e: &mut Engine<'_>) -> Result<Option<Vec<Node>>, Error> {
    let attributes = tags::parse_attributes(e, AttrContext::Line);
    e.eat_opt("\n");

    let mut caption: Vec<Node> = Vec::new();
    let mut rows: Vec<Node> = Vec::new();
    let mut pending_comments: Vec<Node> = Vec::new();
    let mut current: Option<Row> = None;

    let flush = |rows: &mut Vec<Node>, row: Option<Row>| {
        if let Some(row) = row {
            if !row.is_empty() {
                rows.push(row.into_node());
            }
        }
    };

    loop {
        if e.at_eos() {
            return Ok(None);
        }
        e.eat_whitespace(false);
        if e.eat_opt("\n") {
            continue;
        }
        if e.eat_opt("|}") {
            break;
        }
        if e.starts_with("|-") {
            e.advance_len(2);
            e.eat_count('-');
            flush(&mut rows, current.take());
            current = Some(Row::new(
                tags::parse_attributes(e, AttrContext::Line),
                std::mem::take(&mut pending_comments),
            ));
            continue;
        }
        if e.eat_opt("|+") {
            // `|+ attributes | caption`; the attribute prefix is discarded.
            let _ = cell_attributes(e);
            let line = e.next(&NextOptions {
                end: &["\n"],
                end_at_eos: true,
                ..NextOptions::default()
            })?;
            let mut line = line.unwrap_or_default();
            node::trim(&mut line);
            if caption.is_empty() {
                caption = line;
            }
            continue;
        }
        if e.starts_with("<!--") {
            e.advance_len("<!--".len());
            if let Some(nodes) = tags::comment(e)? {
                match current.as_mut() {
                    // Directly under a `|-` line, the comment belongs to
                    // the row being built.
                    Some(row) if row.cells.is_empty() => row.comments.extend(nodes),
                    _ => pending_comments.extend(nodes),
                }
            }
            continue;
        }
        if e.starts_with("|") || e.starts_with("!") {
            let row = current.get_or_insert_with(|| {
                Row::new(Attributes::new(), std::mem::take(&mut pending_comments))
            });
            cells(e, row)?;
            continue;
        }
        // Content outside any cell; skip it.
        if let Some(c) = e.current_char() {
            e.advance_len(c.len_utf8());
        }
    }

    flush(&mut rows, current.take());
    Ok(Some(vec![Node::Table {
        attributes,
        caption,
        content: rows,
    }]))
}

/// Parses the cells of one line. `||` keeps the line's kind, `!!` forces a
/// header cell.
fn cells(e: &mut Engine<'_>, row: &mut Row) -> Result<(), Error> {
    let line_header = e.starts_with("!");
    let mut header = line_header;
    e.advance_len(1);
    // A doubled marker at the start of the line is the same as a single one.
    let _ = e.eat_opt(if line_header { "!" } else { "|" });
    loop {
        let attributes = cell_attributes(e);
        let opts = NextOptions {
            end_before: &["||", "!!"],
            end_on: Some(cell_line_boundary),
            end_at_eos: true,
            ..NextOptions::default()
        };
        let mut content = e.next(&opts)?.unwrap_or_default();
        node::trim(&mut content);
        row.cells.push(Node::TableCell {
            header,
            attributes,
            content,
        });
        if e.eat_opt("||") {
            header = line_header;
        } else if e.eat_opt("!!") {
            header = true;
        } else {
            break;
        }
    }
    Ok(())
}

/// Probes for an `attributes|` prefix; restored to empty when the single
/// `|` is missing, a `||` separator is found instead, or the probed region
/// was really wiki markup (a link or template whose `|` is its own).
fn cell_attributes(e: &mut Engine<'_>) -> Attributes {
    let mark = e.mark();
    let attributes = tags::parse_attributes(e, AttrContext::Cell);
    let markup = attributes.iter().any(|(name, value)| {
        name.contains(['[', '{'])
            || matches!(value, AttributeValue::Text(text) if text.contains(['[', '{']))
    });
    if attributes.is_empty() || markup || e.starts_with("||") || !e.eat_opt("|") {
        e.reset(mark);
        return Attributes::new();
    }
    attributes
}

#[cfg(test)]
mod tests {
    use crate::{parse, AttributeValue, Attributes, Node};

    fn text(s: &str) -> Node {
        Node::Plaintext(s.to_owned())
    }

    fn attrs(entries: &[(&str, &str)]) -> Attributes {
        entries
            .iter()
            .map(|(name, value)| ((*name).to_owned(), AttributeValue::Text((*value).to_owned())))
            .collect()
    }

    fn cell(header: bool, content: &str) -> Node {
        Node::TableCell {
            header,
            attributes: Attributes::new(),
            content: vec![text(content)],
        }
    }

    fn row(cells: Vec<Node>) -> Node {
        Node::TableRow {
            attributes: Attributes::new(),
            content: cells,
            comments: vec![],
        }
    }

    #[test]
    fn rows_and_cells() {
        assert_eq!(
            parse("{| class=\"wikitable\"\n|-\n!a!!b\n|-\n|1||2\n|}").unwrap(),
            vec![Node::Table {
                attributes: attrs(&[("class", "wikitable")]),
                caption: vec![],
                content: vec![
                    row(vec![cell(true, "a"), cell(true, "b")]),
                    row(vec![cell(false, "1"), cell(false, "2")]),
                ],
            }]
        );
    }

    #[test]
    fn implicit_first_row() {
        assert_eq!(
            parse("{|\n|Orange\n|Apple\n|}").unwrap(),
            vec![Node::Table {
                attributes: Attributes::new(),
                caption: vec![],
                content: vec![row(vec![cell(false, "Orange"), cell(false, "Apple")])],
            }]
        );
    }

    #[test]
    fn multiline_cell_content() {
        assert_eq!(
            parse("{|\n|B\nC||d\n|}").unwrap(),
            vec![Node::Table {
                attributes: Attributes::new(),
                caption: vec![],
                content: vec![row(vec![cell(false, "B\nC"), cell(false, "d")])],
            }]
        );
    }

    #[test]
    fn caption_is_trimmed() {
        assert_eq!(
            parse("{|\n|+ Caption text\n|x\n|}").unwrap(),
            vec![Node::Table {
                attributes: Attributes::new(),
                caption: vec![text("Caption text")],
                content: vec![row(vec![cell(false, "x")])],
            }]
        );
    }

    #[test]
    fn cell_attribute_prefix() {
        let ast = parse("{|\n| style=\"text-align:right;\" | 12,333.00\n|}").unwrap();
        let Node::Table { content, .. } = &ast[0] else {
            panic!("not a table: {ast:?}");
        };
        let Node::TableRow { content, .. } = &content[0] else {
            panic!("not a row");
        };
        assert_eq!(
            content[0],
            Node::TableCell {
                header: false,
                attributes: attrs(&[("style", "text-align:right;")]),
                content: vec![text("12,333.00")],
            }
        );
    }

    #[test]
    fn double_pipe_aborts_the_attribute_probe() {
        // `1` must stay cell content, not become an attribute.
        assert_eq!(
            parse("{|\n|1||2\n|}").unwrap(),
            vec![Node::Table {
                attributes: Attributes::new(),
                caption: vec![],
                content: vec![row(vec![cell(false, "1"), cell(false, "2")])],
            }]
        );
    }

    #[test]
    fn row_attributes() {
        let ast = parse("{|\n|- class=\"odd\"\n|x\n|}").unwrap();
        let Node::Table { content, .. } = &ast[0] else {
            panic!("not a table: {ast:?}");
        };
        assert_eq!(
            content[0],
            Node::TableRow {
                attributes: attrs(&[("class", "odd")]),
                content: vec![cell(false, "x")],
                comments: vec![],
            }
        );
    }

    #[test]
    fn comments_attach_to_the_following_row() {
        let ast = parse("{|\n|a\n<!-- note -->\n|-\n|b\n|}").unwrap();
        let Node::Table { content, .. } = &ast[0] else {
            panic!("not a table: {ast:?}");
        };
        assert_eq!(content.len(), 2);
        let Node::TableRow { comments, .. } = &content[1] else {
            panic!("not a row");
        };
        assert_eq!(
            comments,
            &vec![Node::Comment { content: vec![text("note")] }]
        );
    }

    #[test]
    fn unterminated_table_stays_plaintext() {
        assert_eq!(
            parse("{| class=\"wikitable\"\n| Orange\n|-").unwrap(),
            vec![text("{| class=\"wikitable\"\n| Orange\n|-")]
        );
    }

    #[test]
    fn a_link_pipe_is_not_an_attribute_separator() {
        let ast = parse("{|\n| [[a|b]] more\n|}").unwrap();
        let Node::Table { content, .. } = &ast[0] else {
            panic!("not a table: {ast:?}");
        };
        let Node::TableRow { content: cells, .. } = &content[0] else {
            panic!("not a row");
        };
        let Node::TableCell {
            attributes,
            content,
            ..
        } = &cells[0]
        else {
            panic!("not a cell");
        };
        assert!(attributes.is_empty());
        assert!(
            matches!(&content[0], Node::Link { to, .. } if to == "a"),
            "got {content:?}"
        );
        assert_eq!(content[1], text(" more"));
    }

    #[test]
    fn a_list_inside_a_cell_does_not_swallow_the_table_end() {
        let ast = parse("{|\n|\n* a\n* b\n|}").unwrap();
        let Node::Table { content, .. } = &ast[0] else {
            panic!("not a table: {ast:?}");
        };
        let Node::TableRow { content: cells, .. } = &content[0] else {
            panic!("not a row");
        };
        let Node::TableCell { content, .. } = &cells[0] else {
            panic!("not a cell");
        };
        assert!(
            matches!(&content[0], Node::UnorderedList { items } if items.len() == 2),
            "got {content:?}"
        );
    }

    #[test]
    fn markup_inside_cells() {
        let ast = parse("{|\n|''x''\n|}").unwrap();
        let Node::Table { content, .. } = &ast[0] else {
            panic!("not a table: {ast:?}");
        };
        let Node::TableRow { content, .. } = &content[0] else {
            panic!("not a row");
        };
        assert_eq!(
            content[0],
            Node::TableCell {
                header: false,
                attributes: Attributes::new(),
                content: vec![Node::Italics { content: vec![text("x")] }],
            }
        );
    }
}
