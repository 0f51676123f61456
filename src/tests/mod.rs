//! End-to-end parser scenarios and tree invariants.

use crate::{ast_to_text, parse, Error, ListItem, Node, Options, Parameters, Parser, TextOptions};

fn text(s: &str) -> Node {
    Node::Plaintext(s.to_owned())
}

fn italics(content: Vec<Node>) -> Node {
    Node::Italics { content }
}

fn bold_italics(content: Vec<Node>) -> Node {
    Node::BoldItalics { content }
}

fn template(name: &str) -> Node {
    Node::Template {
        name: name.to_owned(),
        parameters: Parameters::new(),
        positional_parameters: vec![],
    }
}

fn link(to: &str, label: &str, plain: bool) -> Node {
    Node::Link {
        to: to.to_owned(),
        content: vec![text(label)],
        anchor: None,
        parameters: Parameters::new(),
        positional_parameters: vec![],
        plain,
    }
}

#[track_caller]
fn assert_tree(input: &str, expected: &[Node]) {
    let ast = parse(input).unwrap_or_else(|error| panic!("parse of {input:?} failed: {error}"));
    assert_eq!(ast, expected, "wikitext: {input:?}");
}

#[test]
fn italics_with_an_unclosed_tail() {
    assert_tree(
        "Some ''italic text'' ''test",
        &[
            text("Some "),
            italics(vec![text("italic text")]),
            text(" ''test"),
        ],
    );
}

#[test]
fn five_quotes_bind_before_three_and_two() {
    assert_tree(
        "Some '''''bold italic text''''' test",
        &[
            text("Some "),
            bold_italics(vec![text("bold italic text")]),
            text(" test"),
        ],
    );
}

#[test]
fn category_links_colon_prefixes_and_the_pipe_trick() {
    assert_tree(
        "[[Category:X]][[:Category:Y]][[:Категория:Z|]]",
        &[
            link("Category:X", "Category:X", false),
            link("Category:Y", "Category:Y", true),
            link("Категория:Z", "Z", true),
        ],
    );
}

#[test]
fn numeric_template_keys_fill_positional_slots() {
    let ast = parse("{{t|2=b|a=1|1=a}}").unwrap();
    let Node::Template {
        name,
        parameters,
        positional_parameters,
    } = &ast[0]
    else {
        panic!("not a template: {ast:?}");
    };
    assert_eq!(name, "t");
    assert_eq!(parameters.len(), 1);
    assert_eq!(parameters.get("a"), Some(&vec![text("1")]));
    assert_eq!(
        positional_parameters,
        &vec![vec![text("a")], vec![text("b")]]
    );
}

#[test]
fn preformatted_blocks_and_templates_inside_them() {
    assert_tree(
        " a\n b\nc\n some{{a}}\n",
        &[
            Node::Preformatted {
                content: vec![text("a\nb\n")],
            },
            text("c\n"),
            Node::Preformatted {
                content: vec![text("some"), template("a"), text("\n")],
            },
        ],
    );
}

#[test]
fn table_with_header_and_data_rows() {
    let ast = parse("{| class=\"wikitable\"\n|-\n!a!!b\n|-\n|1||2\n|}").unwrap();
    let Node::Table {
        attributes,
        caption,
        content,
    } = &ast[0]
    else {
        panic!("not a table: {ast:?}");
    };
    assert_eq!(
        attributes.get("class"),
        Some(&crate::AttributeValue::Text("wikitable".to_owned()))
    );
    assert!(caption.is_empty());
    assert_eq!(content.len(), 2);
    for (row, expected) in content.iter().zip([
        (true, ["a", "b"]),
        (false, ["1", "2"]),
    ]) {
        let Node::TableRow { content: cells, .. } = row else {
            panic!("not a row: {row:?}");
        };
        assert_eq!(cells.len(), 2);
        for (cell, label) in cells.iter().zip(expected.1) {
            let Node::TableCell {
                header, content, ..
            } = cell
            else {
                panic!("not a cell: {cell:?}");
            };
            assert_eq!(*header, expected.0);
            assert_eq!(content, &vec![text(label)]);
        }
    }
}

#[test]
fn unclosed_tags_inherit_into_the_previous_tag() {
    let ast = parse("<ul><li>a<li><li>b</li>").unwrap();
    assert_eq!(ast.len(), 1);
    let Node::Tag { name, content, .. } = &ast[0] else {
        panic!("not a tag: {ast:?}");
    };
    assert_eq!(name, "ul");
    // li > (a, li > (li > b))
    let Node::Tag { content: li1, .. } = &content[0] else {
        panic!("expected li: {content:?}");
    };
    assert_eq!(li1[0], text("a"));
    let Node::Tag { content: li2, .. } = &li1[1] else {
        panic!("expected nested li: {li1:?}");
    };
    let Node::Tag { content: li3, .. } = &li2[0] else {
        panic!("expected innermost li: {li2:?}");
    };
    assert_eq!(li3, &vec![text("b")]);
}

#[test]
fn horizontal_rules_need_a_line_start() {
    assert_tree(
        "a\n----\nb",
        &[
            text("a\n"),
            Node::HorizontalRule { content: vec![] },
            text("\nb"),
        ],
    );
    assert_tree("a<------------b", &[text("a<------------b")]);
}

#[test]
fn numeric_entities_coalesce_with_surrounding_text() {
    assert_tree("&#1059; &#x5000;", &[text("У 倀")]);
}

#[test]
fn nbsp_keeps_string_coalescence() {
    assert_tree("a&nbsp;b", &[text("a\u{00a0}b")]);
    assert_tree(
        "''x&nbsp;y__TOC__z''",
        &[italics(vec![text("x\u{00a0}yz")])],
    );
}

#[test]
fn multibyte_text_does_not_shift_constructs() {
    assert_tree(
        "日本語の '''太字''' を含む",
        &[
            text("日本語の "),
            Node::Bold {
                content: vec![text("太字")],
            },
            text(" を含む"),
        ],
    );
}

#[test]
fn parsing_is_deterministic() {
    let input = "== H ==\n* a [[b|c]]\n{{t|x=1|y}}\n{| class=\"z\"\n|1||2\n|}\n";
    let first = parse(input).unwrap();
    let second = parse(input).unwrap();
    assert_eq!(first, second);
}

#[test]
fn the_backtracking_budget_is_fatal_when_exhausted() {
    let parser = Parser::new(Options {
        backtracking_limit: 1,
        ..Options::default()
    });
    let error = parser.parse("''never closed").unwrap_err();
    assert!(matches!(
        error,
        Error::BacktrackingLimitExceeded { limit: 1, .. }
    ));
    // The same input parses fine within the default budget.
    assert!(parse("''never closed").is_ok());
}

#[test]
fn faults_carry_the_context_stack() {
    let parser = Parser::new(Options {
        backtracking_limit: 1,
        ..Options::default()
    });
    let error = parser.parse("x''never closed").unwrap_err();
    let context = error.context();
    assert!(!context.is_empty());
    assert!(context[0].excerpt.starts_with("''never"));
}

#[test]
fn plain_text_extraction_is_stable_under_reparsing() {
    for input in ["hello world", "two\n\nparagraphs here", "tabs\tand spaces"] {
        let once = ast_to_text(&parse(input).unwrap(), &TextOptions::default());
        let twice = ast_to_text(&parse(&once).unwrap(), &TextOptions::default());
        assert_eq!(once, twice, "input: {input:?}");
    }
}

#[test]
fn a_realistic_fragment_parses_into_structure() {
    let input = "== Overview ==\nThe '''quick''' fox, see [[Vulpes#Species|species]].<ref name=\"a\">[https://example.org Example]</ref>\n\n* item one\n* item two\n";
    let ast = parse(input).unwrap();
    assert!(matches!(ast[0], Node::Heading { level: 2, .. }));
    let kinds: Vec<bool> = ast
        .iter()
        .map(|node| matches!(node, Node::Plaintext(_)))
        .collect();
    // No two adjacent plaintext fragments anywhere at the top level.
    assert!(!kinds.windows(2).any(|pair| pair == [true, true]));
    assert!(ast
        .iter()
        .any(|node| matches!(node, Node::UnorderedList { items } if items.len() == 2)));
}

#[test]
fn list_items_may_carry_inline_markup() {
    assert_tree(
        "* plain\n* ''styled'' tail\n",
        &[Node::UnorderedList {
            items: vec![
                ListItem {
                    level: 1,
                    content: vec![text("plain")],
                },
                ListItem {
                    level: 1,
                    content: vec![italics(vec![text("styled")]), text(" tail")],
                },
            ],
        }],
    );
}
