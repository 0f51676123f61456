//! The wiki grammar: an ordered table of production descriptors plus ad-hoc
//! production functions for the structures that cannot be expressed purely
//! declaratively.
//!
//! Declaration order matters; the dispatcher picks the first entry whose
//! start prefix matches at the cursor.

use crate::{
    engine::{self, NextOptions, Predicate, ProductionFn},
    node::{Node, NodeKind},
};
use std::sync::LazyLock;

mod blocks;
mod entities;
mod links;
mod tables;
mod tags;
mod templates;

/// The body of a grammar table entry.
pub(crate) enum ProductionBody {
    /// Run [`crate::engine::Engine::next`] with these options and wrap the
    /// result into a node of the entry's kind.
    Next(NextOptions<'static>),
    /// Invoke an ad-hoc production function.
    Func(ProductionFn),
    /// Return this literal as plain text (entity aliases, magic words).
    Replace(&'static str),
    /// Recurse into a sub-table; on miss, rewind and skip the entry.
    Group(Vec<Production>),
}

/// Placeholder body for constructors that replace it.
fn no_match(_: &mut crate::engine::Engine<'_>) -> Result<Option<Vec<Node>>, crate::error::Error> {
    Ok(None)
}

/// One entry of the grammar table.
pub(crate) struct Production {
    pub kind: NodeKind,
    /// Pre-lowercased start prefix matched against the lowercase view.
    pub start: &'static str,
    /// Leave the start token in place for the production to re-read.
    pub keep_start: bool,
    /// Checked before the start token is consumed.
    pub pre: Option<Predicate>,
    /// Checked after the start token is consumed; rewinds on failure.
    pub post: Option<Predicate>,
    pub body: ProductionBody,
    /// Applied to the produced nodes; returning `None` is a programming
    /// error.
    pub post_process: Option<fn(Vec<Node>) -> Option<Vec<Node>>>,
}

impl Production {
    fn func(kind: NodeKind, start: &'static str, func: ProductionFn) -> Self {
        Self {
            kind,
            start,
            keep_start: false,
            pre: None,
            post: None,
            body: ProductionBody::Func(func),
            post_process: None,
        }
    }

    fn next(kind: NodeKind, start: &'static str, opts: NextOptions<'static>) -> Self {
        Self {
            body: ProductionBody::Next(opts),
            ..Self::func(kind, start, no_match)
        }
    }

    fn replace(kind: NodeKind, start: &'static str, literal: &'static str) -> Self {
        Self {
            body: ProductionBody::Replace(literal),
            ..Self::func(kind, start, no_match)
        }
    }

    fn group(start: &'static str, entries: Vec<Production>) -> Self {
        Self {
            body: ProductionBody::Group(entries),
            ..Self::func(NodeKind::Tag, start, no_match)
        }
    }

    fn keep_start(mut self) -> Self {
        self.keep_start = true;
        self
    }

    fn pre(mut self, pre: Predicate) -> Self {
        self.pre = Some(pre);
        self
    }

    fn post(mut self, post: Predicate) -> Self {
        self.post = Some(post);
        self
    }

    /// `templatePreformatted` parses identically to `template`; the result
    /// is normalized back to a plain `template` node.
    fn post_process_as_template(mut self) -> Self {
        self.post_process = Some(|nodes| {
            nodes
                .iter()
                .all(|node| matches!(node, Node::Template { .. }))
                .then_some(nodes)
        });
        self
    }

    /// Whether this entry survives the `allow`/`disallow` filters.
    pub fn allowed(&self, allow: Option<&[NodeKind]>, disallow: &[NodeKind]) -> bool {
        allow.map_or(true, |allow| allow.contains(&self.kind)) && !disallow.contains(&self.kind)
    }
}

/// Wraps a declarative production's node list into its typed node.
pub(crate) fn wrap(kind: NodeKind, content: Vec<Node>) -> Node {
    match kind {
        NodeKind::BoldItalics => Node::BoldItalics { content },
        NodeKind::Bold => Node::Bold { content },
        NodeKind::Italics => Node::Italics { content },
        // The markup between `<br`/`<hr` and `>` is discarded.
        NodeKind::LineBreak => Node::LineBreak,
        NodeKind::HorizontalRule => Node::HorizontalRule { content: Vec::new() },
        _ => panic!("no declarative wrapper for {kind:?}"),
    }
}

static TABLE: LazyLock<Vec<Production>> = LazyLock::new(|| {
    vec![
        Production::func(NodeKind::Link, "[[", links::link),
        Production::func(NodeKind::ExternalLink, "[", links::external_link)
            .post(links::uri_follows),
        Production::next(
            NodeKind::BoldItalics,
            "'''''",
            NextOptions {
                end: &["'''''"],
                backtrack: &["]]"],
                backtrack_on: Some(engine::eol),
                ..NextOptions::default()
            },
        ),
        Production::next(
            NodeKind::Bold,
            "'''",
            NextOptions {
                end: &["'''"],
                backtrack: &["]]"],
                backtrack_on: Some(engine::eol),
                ..NextOptions::default()
            },
        ),
        Production::next(
            NodeKind::Italics,
            "''",
            NextOptions {
                end: &["''"],
                not_end: &["'''"],
                disallow: &[NodeKind::Preformatted],
                ..NextOptions::default()
            },
        ),
        Production::func(NodeKind::Template, "{{", templates::template),
        Production::func(NodeKind::TemplatePreformatted, "{{", templates::template)
            .post_process_as_template(),
        Production::func(NodeKind::UnorderedList, "*", blocks::unordered_list)
            .keep_start()
            .pre(engine::sol),
        Production::func(NodeKind::OrderedList, "#", blocks::ordered_list)
            .keep_start()
            .pre(engine::sol),
        Production::func(NodeKind::Indent, ":", blocks::indent)
            .keep_start()
            .pre(engine::sol),
        Production::func(NodeKind::Description, ";", blocks::description).pre(engine::sol),
        Production::func(NodeKind::Heading, "=", blocks::heading)
            .keep_start()
            .pre(engine::sol),
        Production::group(
            "&",
            vec![
                Production::replace(NodeKind::Entity, "nbsp;", "\u{00a0}"),
                Production::replace(NodeKind::Entity, "lt;", "<"),
                Production::replace(NodeKind::Entity, "gt;", ">"),
                Production::replace(NodeKind::Entity, "mdash;", "\u{2014}"),
                Production::replace(NodeKind::Entity, "ndash;", "\u{2013}"),
                Production::replace(NodeKind::Entity, "minus;", "\u{2212}"),
                Production::replace(NodeKind::Entity, "thinsp;", "\u{2009}"),
                Production::func(NodeKind::Entity, "#", entities::numeric),
            ],
        ),
        Production::replace(NodeKind::MagicWord, "__toc__", ""),
        Production::replace(NodeKind::MagicWord, "__notoc__", ""),
        Production::func(NodeKind::Preformatted, " ", blocks::preformatted)
            .keep_start()
            .pre(engine::sol),
        // The tag entries re-read the `<` themselves.
        Production::group(
            "<",
            vec![
                Production::func(NodeKind::Comment, "<!--", tags::comment),
                Production::next(
                    NodeKind::LineBreak,
                    "<br",
                    NextOptions {
                        end: &[">"],
                        backtrack_on: Some(engine::eol),
                        allow: Some(&[]),
                        ..NextOptions::default()
                    },
                )
                .pre(tags::void_boundary),
                Production::next(
                    NodeKind::HorizontalRule,
                    "<hr",
                    NextOptions {
                        end: &[">"],
                        backtrack_on: Some(engine::eol),
                        allow: Some(&[]),
                        ..NextOptions::default()
                    },
                )
                .pre(tags::void_boundary),
                Production::func(NodeKind::Source, "<source", tags::source).keep_start(),
                Production::func(NodeKind::Math, "<math", tags::math).keep_start(),
                Production::func(NodeKind::Ref, "<ref", tags::ref_tag).keep_start(),
                Production::func(NodeKind::Nowiki, "<nowiki", tags::nowiki).keep_start(),
                Production::func(NodeKind::Pre, "<pre", tags::pre).keep_start(),
                Production::func(
                    NodeKind::SyntaxHighlight,
                    "<syntaxhighlight",
                    tags::syntaxhighlight,
                )
                .keep_start(),
                Production::func(NodeKind::Code, "<code", tags::code).keep_start(),
                Production::func(NodeKind::Gallery, "<gallery", tags::gallery).keep_start(),
                Production::func(NodeKind::Tag, "<", tags::tag).keep_start(),
            ],
        )
        .keep_start(),
        Production::func(NodeKind::Table, "{|", tables::table),
        Production::func(NodeKind::HorizontalRule, "----", blocks::horizontal_rule)
            .pre(engine::sol),
    ]
});

/// The grammar table, in declaration order.
pub(crate) fn table() -> &'static [Production] {
    &TABLE
}
