//! A recursive, backtracking, context-sensitive parser for MediaWiki-style
//! wiki markup, producing a structured abstract syntax tree.
//!
//! The parse is driven by an ordered, declarative grammar table; a global
//! backtracking budget bounds the cost of the highly ambiguous syntax. The
//! resulting tree interleaves plain-text fragments with tagged structural
//! nodes and is suitable for rendering, indexing, or plain-text extraction
//! via [`ast_to_text`].
//!
//! ```
//! let ast = wikitext_ast::parse("Some ''italic'' text").unwrap();
//! assert_eq!(ast.len(), 3);
//! ```

mod engine;
mod error;
mod grammar;
mod node;
mod text;
#[cfg(test)]
mod tests;

pub use error::{ContextFrame, Error};
pub use node::{AttributeValue, Attributes, ListItem, Node, Parameters};
pub use text::{ast_to_text, TextOptions};

/// Parser configuration.
#[derive(Clone, Debug)]
pub struct Options {
    /// Upper bound on backtrack events across one parse. Exceeding it
    /// raises [`Error::BacktrackingLimitExceeded`], which is fatal for the
    /// parse and not retryable.
    pub backtracking_limit: usize,
    /// Emit a human-readable backtracking trace through the `log` facade.
    pub debug: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            backtracking_limit: 50_000,
            debug: false,
        }
    }
}

/// A wikitext parser bound to a set of options.
///
/// Each call to [`Parser::parse`] owns its cursor and backtracking state
/// exclusively, so one `Parser` may serve any number of sequential or
/// parallel parses.
#[derive(Clone, Debug, Default)]
pub struct Parser {
    options: Options,
}

impl Parser {
    pub fn new(options: Options) -> Self {
        Self { options }
    }

    /// Parses `input` into a list of nodes. The returned tree owns its
    /// strings; `input` may be released afterwards.
    pub fn parse(&self, input: &str) -> Result<Vec<Node>, Error> {
        let mut engine = engine::Engine::new(input, &self.options);
        let result = engine.parse();
        if self.options.debug {
            if let Err(error) = &result {
                log::debug!("parse failed: {error}");
            }
        }
        result
    }
}

/// Parses `input` with default [`Options`].
pub fn parse(input: &str) -> Result<Vec<Node>, Error> {
    Parser::default().parse(input)
}
