//! The backtracking parse engine.
//!
//! The engine keeps a cursor over the input, a parallel ASCII-lowercased
//! view for case-insensitive prefix matching, a global backtracking budget,
//! and a stack of in-progress production positions used to annotate faults.
//! Its two operations are [`Engine::next`], which assembles a node list from
//! the cursor outward until an end condition fires, and [`Engine::node`],
//! which dispatches the first matching production from the grammar table.

use crate::{
    error::{ContextFrame, Error},
    grammar::{self, Production, ProductionBody},
    node::{append, append_text, Node, NodeKind},
    Options,
};
use memchr::memchr_iter;
use regex::Regex;

/// How much following source to capture per context frame on a fault.
const EXCERPT_CHARS: usize = 100;

/// A position within the input.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct Cursor {
    /// Byte offset, always on a `char` boundary.
    pub offset: usize,
    /// 1-based line number, incremented per consumed newline.
    pub line: usize,
}

/// A predicate over the current engine position.
pub(crate) type Predicate = fn(&Engine<'_>) -> bool;

/// An ad-hoc production body.
pub(crate) type ProductionFn = fn(&mut Engine<'_>) -> Result<Option<Vec<Node>>, Error>;

/// End and failure conditions for a single [`Engine::next`] invocation.
///
/// If none of `end_at_eos`, `end`, `end_before`, `end_before_regex`,
/// `end_on`, or `backtrack` is set, `next` returns an empty list without
/// consuming anything.
#[derive(Clone, Copy, Default)]
pub(crate) struct NextOptions<'o> {
    /// Succeed when the cursor reaches the end of the input.
    pub end_at_eos: bool,
    /// Terminators which are consumed on success.
    pub end: &'o [&'o str],
    /// Inhibits `end` when one of these also matches at the cursor.
    pub not_end: &'o [&'o str],
    /// Terminators which are left in place on success.
    pub end_before: &'o [&'o str],
    /// Regex form of `end_before`; the pattern must be anchored.
    pub end_before_regex: Option<&'o Regex>,
    /// Predicate form of `end_before`.
    pub end_on: Option<Predicate>,
    /// Prefixes which fail the whole invocation.
    pub backtrack: &'o [&'o str],
    /// A failure predicate pushed onto the shared stack for the duration of
    /// the invocation; any active predicate fails the innermost `next`.
    pub backtrack_on: Option<Predicate>,
    /// Whitelist of productions accepted from the grammar table.
    pub allow: Option<&'o [NodeKind]>,
    /// Blacklist of productions.
    pub disallow: &'o [NodeKind],
}

impl NextOptions<'_> {
    fn terminates(&self) -> bool {
        self.end_at_eos
            || !self.end.is_empty()
            || !self.end_before.is_empty()
            || self.end_before_regex.is_some()
            || self.end_on.is_some()
            || !self.backtrack.is_empty()
    }
}

/// Predicate: the cursor is at the end of a line.
pub(crate) fn eol(engine: &Engine<'_>) -> bool {
    engine.is_end_of_line()
}

/// Predicate: the cursor is at the start of a line.
pub(crate) fn sol(engine: &Engine<'_>) -> bool {
    engine.is_start_of_line()
}

/// Parse state bound to one input. Not reused across parses.
pub(crate) struct Engine<'a> {
    input: &'a str,
    /// ASCII-lowercased copy of `input`; per-`char` folding keeps byte
    /// offsets aligned one-to-one with the original.
    lower: String,
    cursor: Cursor,
    backtracks: usize,
    limit: usize,
    debug: bool,
    /// Positions pushed during descent, snapshotted into faults.
    positions: Vec<Cursor>,
    /// Active `backtrack_on` predicates.
    predicates: Vec<Predicate>,
}

impl<'a> Engine<'a> {
    pub fn new(input: &'a str, options: &Options) -> Self {
        Self {
            input,
            lower: input.chars().map(|c| c.to_ascii_lowercase()).collect(),
            cursor: Cursor { offset: 0, line: 1 },
            backtracks: 0,
            limit: options.backtracking_limit,
            debug: options.debug,
            positions: Vec::new(),
            predicates: Vec::new(),
        }
    }

    /// Parses the whole input.
    pub fn parse(&mut self) -> Result<Vec<Node>, Error> {
        let top = NextOptions {
            end_at_eos: true,
            ..NextOptions::default()
        };
        match self.next(&top)? {
            Some(nodes) => Ok(nodes),
            // The top-level invocation has no failure conditions.
            None => unreachable!("top-level next() cannot backtrack"),
        }
    }

    //
    // Cursor primitives
    //

    /// The unconsumed input.
    pub fn rest(&self) -> &'a str {
        &self.input[self.cursor.offset..]
    }

    /// The unconsumed input, lowercased.
    pub fn lower_rest(&self) -> &str {
        &self.lower[self.cursor.offset..]
    }

    pub fn at_eos(&self) -> bool {
        self.cursor.offset >= self.input.len()
    }

    pub fn current_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// Saves the cursor for a later [`Engine::reset`].
    pub fn mark(&self) -> Cursor {
        self.cursor
    }

    /// Restores a previously saved cursor.
    pub fn reset(&mut self, cursor: Cursor) {
        self.cursor = cursor;
    }

    pub fn line(&self) -> usize {
        self.cursor.line
    }

    /// Case-insensitive prefix match. `prefix` must already be lowercased.
    pub fn starts_with(&self, prefix: &str) -> bool {
        self.lower_rest().starts_with(prefix)
    }

    pub fn starts_with_any(&self, prefixes: &[&str]) -> bool {
        prefixes.iter().any(|prefix| self.starts_with(prefix))
    }

    /// Anchored regex match at the cursor against the lowercase view. The
    /// pattern must begin with `^`.
    pub fn starts_with_regex(&self, re: &Regex) -> bool {
        re.is_match(self.lower_rest())
    }

    /// Consumes `prefix`, raising [`Error::ParseFailure`] if absent.
    pub fn eat(&mut self, prefix: &str) -> Result<(), Error> {
        if self.eat_opt(prefix) {
            Ok(())
        } else {
            Err(Error::ParseFailure {
                expected: prefix.to_owned(),
                line: self.cursor.line,
                context: self.context_stack(),
            })
        }
    }

    /// Consumes `prefix` if present; returns whether it did.
    pub fn eat_opt(&mut self, prefix: &str) -> bool {
        if self.starts_with(prefix) {
            self.advance_len(prefix.len());
            true
        } else {
            false
        }
    }

    /// Advances past `s`, which must equal the input at the cursor.
    pub fn advance(&mut self, s: &str) {
        self.advance_len(s.len());
    }

    /// Advances `len` bytes, counting consumed newlines. `len` must land on
    /// a `char` boundary.
    pub fn advance_len(&mut self, len: usize) {
        let consumed = &self.input[self.cursor.offset..self.cursor.offset + len];
        self.cursor.line += memchr_iter(b'\n', consumed.as_bytes()).count();
        self.cursor.offset += len;
    }

    /// Greedily consumes `ch`, returning how many were eaten.
    pub fn eat_count(&mut self, ch: char) -> usize {
        let count = self.rest().chars().take_while(|&c| c == ch).count();
        self.advance_len(count * ch.len_utf8());
        count
    }

    /// Consumes spaces, tabs, and optionally newlines.
    pub fn eat_whitespace(&mut self, newline_allowed: bool) {
        while let Some(c) = self.current_char() {
            match c {
                ' ' | '\t' => self.advance_len(1),
                '\n' if newline_allowed => self.advance_len(1),
                _ => break,
            }
        }
    }

    pub fn is_start_of_line(&self) -> bool {
        self.cursor.offset == 0 || self.input.as_bytes()[self.cursor.offset - 1] == b'\n'
    }

    pub fn is_end_of_line(&self) -> bool {
        self.at_eos() || self.input.as_bytes()[self.cursor.offset] == b'\n'
    }

    //
    // Backtracking
    //

    /// Records one backtrack event against the global budget.
    pub fn note_backtrack(&mut self) -> Result<(), Error> {
        self.backtracks += 1;
        if self.debug {
            log::debug!(
                "backtrack #{} at line {} offset {}: {:?}",
                self.backtracks,
                self.cursor.line,
                self.cursor.offset,
                self.excerpt(self.cursor.offset, 30),
            );
        }
        if self.backtracks > self.limit {
            Err(Error::BacktrackingLimitExceeded {
                limit: self.limit,
                line: self.cursor.line,
                context: self.context_stack(),
            })
        } else {
            Ok(())
        }
    }

    /// Total backtrack events so far.
    pub fn backtracks(&self) -> usize {
        self.backtracks
    }

    fn excerpt(&self, offset: usize, chars: usize) -> String {
        self.input[offset..].chars().take(chars).collect()
    }

    fn context_stack(&self) -> Vec<ContextFrame> {
        self.positions
            .iter()
            .map(|cursor| ContextFrame {
                offset: cursor.offset,
                line: cursor.line,
                excerpt: self.excerpt(cursor.offset, EXCERPT_CHARS),
            })
            .collect()
    }

    //
    // The engine loop
    //

    /// Consumes a contiguous region of input into a node list until an end
    /// condition from `opts` fires. Returns `None` when the invocation
    /// backtracked; the cursor is then restored to its position at entry.
    pub fn next(&mut self, opts: &NextOptions<'_>) -> Result<Option<Vec<Node>>, Error> {
        if !opts.terminates() {
            return Ok(Some(Vec::new()));
        }
        let origin = self.cursor;
        let pushed = if let Some(predicate) = opts.backtrack_on {
            self.predicates.push(predicate);
            true
        } else {
            false
        };
        let result = self.next_loop(opts, origin);
        if pushed {
            self.predicates.pop();
        }
        result
    }

    fn next_loop(
        &mut self,
        opts: &NextOptions<'_>,
        origin: Cursor,
    ) -> Result<Option<Vec<Node>>, Error> {
        let mut content = Vec::new();
        let mut chunk = String::new();
        loop {
            let eos = self.at_eos();
            if eos && opts.end_at_eos {
                break;
            }
            let failed = (eos && !opts.end_at_eos)
                || self.predicates.iter().any(|predicate| predicate(self))
                || opts.backtrack.iter().any(|prefix| self.starts_with(prefix));
            if failed {
                self.note_backtrack()?;
                self.reset(origin);
                return Ok(None);
            }
            if let Some(end) = opts.end.iter().find(|end| self.starts_with(end)) {
                if !opts.not_end.iter().any(|not| self.starts_with(not)) {
                    self.advance_len(end.len());
                    break;
                }
            }
            if opts.end_before.iter().any(|end| self.starts_with(end))
                || opts
                    .end_before_regex
                    .is_some_and(|re| self.starts_with_regex(re))
                || opts.end_on.is_some_and(|predicate| predicate(self))
            {
                break;
            }
            self.positions.push(self.cursor);
            let produced = self.node(opts.allow, opts.disallow);
            self.positions.pop();
            match produced? {
                Some(nodes) => {
                    if !chunk.is_empty() {
                        append_text(&mut content, &chunk);
                        chunk.clear();
                    }
                    for node in nodes {
                        append(&mut content, node);
                    }
                }
                None => {
                    // A miss leaves the cursor in place; take one unit as
                    // plain text.
                    let ch = self
                        .current_char()
                        .expect("cursor at end of stream after production miss");
                    chunk.push(ch);
                    self.advance_len(ch.len_utf8());
                }
            }
        }
        if !chunk.is_empty() {
            append_text(&mut content, &chunk);
        }
        Ok(Some(content))
    }

    //
    // Dispatch
    //

    /// Picks the first production from the grammar table matching at the
    /// cursor, subject to `allow`/`disallow`.
    pub fn node(
        &mut self,
        allow: Option<&[NodeKind]>,
        disallow: &[NodeKind],
    ) -> Result<Option<Vec<Node>>, Error> {
        self.dispatch(grammar::table(), allow, disallow)
    }

    fn dispatch(
        &mut self,
        table: &[Production],
        allow: Option<&[NodeKind]>,
        disallow: &[NodeKind],
    ) -> Result<Option<Vec<Node>>, Error> {
        for production in table {
            if !self.starts_with(production.start) {
                continue;
            }
            // Groups are filtered per sub-entry.
            if !matches!(production.body, ProductionBody::Group(_))
                && !production.allowed(allow, disallow)
            {
                continue;
            }
            if production.pre.is_some_and(|pre| !pre(self)) {
                continue;
            }
            let entry = self.cursor;
            if !production.keep_start {
                self.advance_len(production.start.len());
            }
            if production.post.is_some_and(|post| !post(self)) {
                self.reset(entry);
                continue;
            }
            let produced = match &production.body {
                ProductionBody::Group(entries) => match self.dispatch(entries, allow, disallow)? {
                    Some(nodes) => nodes,
                    None => {
                        self.reset(entry);
                        continue;
                    }
                },
                ProductionBody::Replace(literal) => vec![Node::Plaintext((*literal).to_owned())],
                ProductionBody::Func(func) => match func(self)? {
                    Some(nodes) => nodes,
                    None => {
                        self.note_backtrack()?;
                        self.reset(entry);
                        continue;
                    }
                },
                ProductionBody::Next(opts) => match self.next(opts)? {
                    Some(list) => vec![grammar::wrap(production.kind, list)],
                    None => {
                        self.note_backtrack()?;
                        self.reset(entry);
                        continue;
                    }
                },
            };
            let produced = match production.post_process {
                Some(post_process) => {
                    post_process(produced).expect("post-processor returned no match")
                }
                None => produced,
            };
            if self.debug {
                log::trace!(
                    "{:?} produced {} node(s) at line {} offset {}",
                    production.kind,
                    produced.len(),
                    entry.line,
                    entry.offset,
                );
            }
            return Ok(Some(produced));
        }
        Ok(None)
    }
}
