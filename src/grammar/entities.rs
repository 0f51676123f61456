//! Numeric HTML entities. The named aliases are declarative table entries.

use crate::{engine::Engine, error::Error, node::Node};

/// Parses `&#NNNN;` or `&#xHHHH;`; the cursor is just past `&#`.
pub(super) fn numeric(e: &mut Engine<'_>) -> Result<Option<Vec<Node>>, Error> {
    let hex = e.eat_opt("x");
    let radix = if hex { 16 } else { 10 };
    let digits: String = e.rest().chars().take_while(|c| c.is_digit(radix)).collect();
    if digits.is_empty() {
        return Ok(None);
    }
    e.advance(&digits);
    if !e.eat_opt(";") {
        return Ok(None);
    }
    let Some(value) = u32::from_str_radix(&digits, radix).ok().and_then(char::from_u32) else {
        return Ok(None);
    };
    Ok(Some(vec![Node::Plaintext(value.to_string())]))
}
