//! The `{{...}}` template production.

use super::links::{self, Segment};
use crate::{
    engine::{Engine, NextOptions},
    error::Error,
    node::{self, Node, NodeKind, Parameters},
};

pub(super) fn template(e: &mut Engine<'_>) -> Result<Option<Vec<Node>>, Error> {
    let name_opts = NextOptions {
        end_before: &["|", "}}"],
        allow: Some(&[NodeKind::Comment, NodeKind::Template]),
        ..NextOptions::default()
    };
    let Some(name_nodes) = e.next(&name_opts)? else {
        return Ok(None);
    };
    // Comments inside the name are dropped; anything else non-textual
    // (e.g. a nested template) makes this not a template invocation.
    let name_nodes: Vec<Node> = name_nodes
        .into_iter()
        .filter(|n| !matches!(n, Node::Comment { .. }))
        .collect();
    let Some(name) = node::text_of(&name_nodes) else {
        return Ok(None);
    };
    let name = name.trim().to_lowercase();
    if name.is_empty() {
        return Ok(None);
    }

    // `{{code}}` arguments are verbatim.
    let value_allow: Option<&[NodeKind]> = if name == "code" { Some(&[]) } else { None };

    let mut parameters = Parameters::new();
    let mut positional: Vec<Vec<Node>> = Vec::new();
    loop {
        if e.eat_opt("}}") {
            break;
        }
        if !e.eat_opt("|") {
            return Ok(None);
        }
        match links::segment(e, &["|", "{{", "}}", "<"], &["|", "}}"], value_allow)? {
            None => return Ok(None),
            Some(Segment::Named(key, value)) => {
                links::assign(key, value, &mut parameters, &mut positional);
            }
            Some(Segment::Positional(value)) => positional.push(value),
        }
    }

    Ok(Some(vec![Node::Template {
        name,
        parameters,
        positional_parameters: positional,
    }]))
}
