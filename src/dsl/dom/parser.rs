//! # Article Markup Parsing
//!
//! Turns one decoded DSL line into a [`Node`] tree. The parser walks the
//! line one character at a time and keeps open tags on an explicit stack.
//! The stack owns the nodes still open; a node is attached to its parent
//! when it closes, so the finished tree has no shared or back references.
//!
//! ## Markup handled
//! - `\x` escapes `x`; `[[`/`]]` are literal brackets inside `[t]`
//! - `[name attrs]` opens, `[/name]` closes; crossing tags are repaired by
//!   closing and reopening the tags in between
//! - `[br]` closes itself; `[m]`/`[mN]` margins replace each other and wrap
//!   whatever is currently open
//! - `<<target>>` becomes a `ref` tag
//! - `@` first on a line starts a sub-entry: one `@` tag per variant of the
//!   rest of the line
//! - `{{comment}}` is skipped
//!
//! Malformed markup never fails the parse: it is repaired and logged.

use std::convert::Infallible;

use log::{debug, warn};

use super::node::{MEDIA_TAG, Node, TRANSCRIPTION_TAG, TagNode};
use crate::dsl::headword;

const LINE_BREAK_TAG: &str = "br";
const MARGIN_TAG: &str = "m";
const LINK_TAG: &str = "ref";
const SUB_ENTRY_TAG: &str = "@";
/// Deepest nesting of open tags; tags opened beyond it are dropped.
const MAX_TAG_DEPTH: usize = 128;
const NO_BREAK_SPACE: char = '\u{A0}';

/// Signals that the input ran out. Unwinds the parse through `?`.
#[derive(Debug)]
struct EndOfText;

type Step<T = ()> = std::result::Result<T, EndOfText>;

/// The parsed tree of one article line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleDom {
    /// Implicit top-level container; always a tag with an empty name.
    pub root: Node,
}

impl ArticleDom {
    /// Parses `text`. `dictionary_name` and `headword` only appear in diagnostics.
    pub fn parse(text: &str, dictionary_name: &str, headword: &str) -> Self {
        Self {
            root: Node::Tag(parse_tree(text, dictionary_name, headword, true)),
        }
    }

    /// Top-level nodes of the article.
    pub fn children(&self) -> &[Node] {
        self.root.children()
    }

    pub fn render_as_text(&self, strip_transcription: bool) -> String {
        self.root.render_as_text(strip_transcription)
    }
}

fn parse_tree(text: &str, dictionary_name: &str, headword: &str, sub_entries: bool) -> TagNode {
    let mut parser = Parser::new(text, dictionary_name, headword, sub_entries);
    let Err(EndOfText) = parser.parse_all();
    parser.finish()
}

fn is_dsl_whitespace(ch: char) -> bool {
    ch == ' ' || ch == '\t'
}

/// `m`, or `m` followed by a single digit.
fn is_margin_tag(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next() == Some('m')
        && match (chars.next(), chars.next()) {
            (None, _) => true,
            (Some(digit), None) => digit.is_ascii_digit(),
            _ => false,
        }
}

/// Whether a closing `[/name]` closes the open tag `open`. `[/m]` closes any margin.
fn closes(open: &str, name: &str) -> bool {
    open == name || (name == MARGIN_TAG && is_margin_tag(open))
}

struct Parser<'a> {
    chars: Vec<char>,
    pos: usize,
    line_start: usize,
    ch: char,
    escaped: bool,
    /// Depth of open `[t]` tags.
    transcription_count: u32,
    /// Depth of open `[s]` tags.
    media_count: u32,
    /// Off when parsing a sub-entry target, so `@` cannot recurse.
    sub_entries: bool,

    root: TagNode,
    stack: Vec<TagNode>,
    text: String,

    dictionary_name: &'a str,
    headword: &'a str,
}

impl<'a> Parser<'a> {
    fn new(text: &str, dictionary_name: &'a str, headword: &'a str, sub_entries: bool) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
            line_start: 0,
            ch: '\0',
            escaped: false,
            transcription_count: 0,
            media_count: 0,
            sub_entries,
            root: TagNode::default(),
            stack: Vec::new(),
            text: String::new(),
            dictionary_name,
            headword,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    /// Inside `[s]`, backslashes are part of file names unless they escape brackets.
    fn backslash_escapes(&self) -> bool {
        self.media_count == 0 || matches!(self.peek(), Some('[' | ']' | '\\'))
    }

    fn next_char(&mut self) -> Step {
        let ch = self.peek().ok_or(EndOfText)?;
        self.pos += 1;
        self.ch = ch;
        self.escaped = false;

        match ch {
            '\\' if self.backslash_escapes() => {
                self.ch = self.peek().ok_or(EndOfText)?;
                self.pos += 1;
                self.escaped = true;
            }
            '[' | ']' if self.transcription_count > 0 && self.peek() == Some(ch) => {
                self.pos += 1;
                self.escaped = true;
            }
            '\n' | '\r' => self.line_start = self.pos,
            _ => {}
        }
        Ok(())
    }

    /// Runs until the input is exhausted, which is the only way it returns.
    fn parse_all(&mut self) -> Step<Infallible> {
        loop {
            self.next_char()?;

            if !self.escaped {
                match self.ch {
                    '[' => {
                        self.parse_tag()?;
                        continue;
                    }
                    '<' if self.peek() == Some('<') => {
                        self.parse_link()?;
                        continue;
                    }
                    '{' if self.peek() == Some('{') => {
                        self.skip_comment()?;
                        continue;
                    }
                    '@' if self.sub_entries && self.at_sign_first_in_line() => {
                        self.parse_sub_entry()?;
                        continue;
                    }
                    _ => {}
                }
            }

            let ch = if self.escaped && self.ch == ' ' && self.media_count == 0 {
                NO_BREAK_SPACE
            } else {
                self.ch
            };
            self.text.push(ch);
        }
    }

    fn parse_tag(&mut self) -> Step {
        let tag_start = self.pos - 1;
        let mut name = String::new();
        let mut attrs = String::new();
        let mut closing = false;

        if let Err(eot) = self.scan_tag(&mut name, &mut attrs, &mut closing) {
            warn!(
                "DSL: Unfinished tag \"{}\" with attributes \"{}\" found in \"{}\", article \"{}\", column {}",
                name,
                attrs,
                self.dictionary_name,
                self.headword,
                tag_start - self.line_start
            );
            return Err(eot);
        }

        self.flush_text();

        if name == TRANSCRIPTION_TAG {
            self.transcription_count = Self::adjust(self.transcription_count, closing);
        }
        if name == MEDIA_TAG {
            self.media_count = Self::adjust(self.media_count, closing);
        }

        if closing {
            self.close_tag(&name, true);
        } else {
            if is_margin_tag(&name) {
                self.close_tag(MARGIN_TAG, false);
            }
            let self_closing = name == LINE_BREAK_TAG;
            if self.open_tag(name, attrs) && self_closing {
                self.close_tag(LINE_BREAK_TAG, true);
            }
        }
        Ok(())
    }

    fn adjust(count: u32, closing: bool) -> u32 {
        if closing { count.saturating_sub(1) } else { count + 1 }
    }

    /// Reads `[ /name attrs]` after the opening bracket, leaving `]` consumed.
    fn scan_tag(&mut self, name: &mut String, attrs: &mut String, closing: &mut bool) -> Step {
        loop {
            self.next_char()?;
            if !is_dsl_whitespace(self.ch) {
                break;
            }
        }

        if !self.escaped && self.ch == '/' {
            *closing = true;
            self.next_char()?;
        }

        while self.escaped || (self.ch != ']' && !is_dsl_whitespace(self.ch)) {
            name.push(self.ch);
            self.next_char()?;
        }

        while !self.escaped && is_dsl_whitespace(self.ch) {
            self.next_char()?;
        }

        while self.escaped || self.ch != ']' {
            attrs.push(self.ch);
            self.next_char()?;
        }
        Ok(())
    }

    /// Reads `<<target>>` after the first `<` and attaches a `ref` tag.
    fn parse_link(&mut self) -> Step {
        self.next_char()?;
        loop {
            self.next_char()?;
            if !is_dsl_whitespace(self.ch) {
                break;
            }
        }

        // Escapes are kept so the target is parsed with its own markup intact.
        let mut target = String::new();
        loop {
            if self.escaped {
                target.push('\\');
                target.push(self.ch);
            } else if self.ch == '>' {
                self.next_char()?;
                if !self.escaped && self.ch == '>' {
                    break;
                }
                target.push('>');
                if self.escaped {
                    target.push('\\');
                }
                target.push(self.ch);
            } else {
                target.push(self.ch);
            }
            self.next_char()?;
        }

        self.flush_text();

        let target = headword::process_unsorted_parts(target.trim(), true);
        let link = parse_tree(&target, self.dictionary_name, self.headword, self.sub_entries);
        self.top().children.push(Node::tag(LINK_TAG, "", link.children));
        Ok(())
    }

    /// Whether the `@` just read is the first non-blank character of its line.
    fn at_sign_first_in_line(&self) -> bool {
        self.chars[self.line_start..self.pos - 1]
            .iter()
            .all(|&ch| is_dsl_whitespace(ch))
    }

    /// Reads the rest of the line after `@` and adds one `@` tag per variant of it.
    fn parse_sub_entry(&mut self) -> Step {
        let mut target = String::new();
        let mut end = Ok(());
        loop {
            if let Err(eot) = self.next_char() {
                end = Err(eot);
                break;
            }
            if !self.escaped && self.ch == '\n' {
                break;
            }
            if self.escaped {
                target.push('\\');
            } else if self.ch == '\r' {
                continue;
            }
            target.push(self.ch);
        }

        self.flush_text();

        let target = headword::process_unsorted_parts(target.trim(), true);
        for variant in headword::expand_optional_parts(&target) {
            let variant = variant.trim();
            if variant.is_empty() {
                continue;
            }
            let entry = parse_tree(variant, self.dictionary_name, self.headword, false);
            self.top().children.push(Node::tag(SUB_ENTRY_TAG, "", entry.children));
        }
        end
    }

    /// Skips `{{...}}` after the first `{`.
    fn skip_comment(&mut self) -> Step {
        self.next_char()?;
        loop {
            self.next_char()?;
            if !self.escaped && self.ch == '}' {
                self.next_char()?;
                if !self.escaped && self.ch == '}' {
                    return Ok(());
                }
            }
        }
    }

    fn top(&mut self) -> &mut TagNode {
        self.stack.last_mut().unwrap_or(&mut self.root)
    }

    fn flush_text(&mut self) {
        if !self.text.is_empty() {
            let text = std::mem::take(&mut self.text);
            self.top().children.push(Node::Text(text));
        }
    }

    /// Attaches a closed node to the current top. Empty tags are dropped, except `[br]`.
    fn attach(&mut self, node: TagNode) {
        if node.children.is_empty() && node.name != LINE_BREAK_TAG {
            return;
        }
        self.top().children.push(Node::Tag(node));
    }

    fn reopen(&mut self, closed: Vec<(String, String)>) {
        for (name, attrs) in closed.into_iter().rev() {
            self.stack.push(TagNode::new(name, attrs));
        }
    }

    /// Pushes a new open tag. Returns false if it was dropped for nesting too deep.
    fn open_tag(&mut self, name: String, attrs: String) -> bool {
        if self.stack.len() >= MAX_TAG_DEPTH {
            warn!(
                "Tag \"{}\" nested deeper than {} levels dropped in \"{}\", article \"{}\"",
                name, MAX_TAG_DEPTH, self.dictionary_name, self.headword
            );
            return false;
        }

        // A margin wraps everything: close all open tags, open it, reopen them inside.
        let mut closed = Vec::new();
        if is_margin_tag(&name) {
            while let Some(node) = self.stack.pop() {
                closed.push((node.name.clone(), node.attrs.clone()));
                self.attach(node);
            }
        }

        self.stack.push(TagNode::new(name, attrs));
        self.reopen(closed);
        true
    }

    /// Closes the innermost open tag matching `name`.
    ///
    /// Tags opened after it are closed as well and reopened afterwards. A
    /// closing tag with no open counterpart is ignored.
    fn close_tag(&mut self, name: &str, warn: bool) {
        let Some(index) = self.stack.iter().rposition(|open| closes(&open.name, name)) else {
            if warn {
                warn!(
                    "No corresponding opening tag for closing tag \"{}\" found in \"{}\", article \"{}\", column {}",
                    name,
                    self.dictionary_name,
                    self.headword,
                    self.pos.saturating_sub(self.line_start)
                );
            }
            return;
        };

        let mut closed = Vec::new();
        while let Some(node) = self.stack.pop() {
            let found = self.stack.len() == index;
            if !found {
                closed.push((node.name.clone(), node.attrs.clone()));
            }
            self.attach(node);
            if found {
                break;
            }
        }
        self.reopen(closed);
    }

    /// Flushes pending text and closes every tag still open.
    fn finish(mut self) -> TagNode {
        self.flush_text();

        let unclosed: Vec<&str> = self
            .stack
            .iter()
            .map(|open| open.name.as_str())
            .filter(|name| !is_margin_tag(name))
            .collect();
        if !unclosed.is_empty() {
            debug!(
                "{} tag(s) closed at end of line in \"{}\", article \"{}\": {:?}",
                unclosed.len(),
                self.dictionary_name,
                self.headword,
                unclosed
            );
        }

        while let Some(node) = self.stack.pop() {
            self.attach(node);
        }
        self.root
    }
}
