//! The document parser: a single-pass character scanner that carves
//! input text into a tree of [`Frame`]s, executing each one (via
//! [`crate::interpreter`]) the moment its closing delimiter is read.
//!
//! mash's grammar is simple enough — three-character delimiters and an
//! `include` directive — that one character-at-a-time scan does both
//! tokenizing and tree-building at once; there is no intermediate
//! token stream.

use std::fs;
use std::path::PathBuf;

use crate::context::Context;
use crate::error::{MashError, ParseError};
use crate::error::Origin;
use crate::frame::{Frame, FrameHandle};
use crate::interpreter;

const OPEN: &str = "[[[";
const CLOSE: &str = "]]]";
const INCLUDE_KEYWORD: &str = "include";

/// Parse `source` (from `file_name`) into a root frame, executing
/// every nested frame along the way. `import_search_dirs` is also the
/// search path for `[[[ include ... ]]]` directives.
pub fn run_document(source: &str, file_name: &str, ctx: &mut Context, import_search_dirs: &[PathBuf]) -> Result<FrameHandle, MashError> {
    let mut parser = Parser::new(source, file_name.to_string(), ctx, import_search_dirs);
    parser.parse_root()
}

struct Parser<'a> {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    file_name: String,
    ctx: &'a mut Context,
    import_search_dirs: &'a [PathBuf],
}

impl<'a> Parser<'a> {
    fn new(source: &str, file_name: String, ctx: &'a mut Context, import_search_dirs: &'a [PathBuf]) -> Self {
        Parser { chars: source.chars().collect(), pos: 0, line: 1, file_name, ctx, import_search_dirs }
    }

    fn parse_root(&mut self) -> Result<FrameHandle, MashError> {
        let root = Frame::new_root(self.file_name.clone());
        self.parse_body(&root, None)?;
        Ok(root)
    }

    /// Scan literal text and nested frames into `frame`'s `contents`.
    /// `closing_origin` is `Some` when called for a child frame body
    /// (so EOF is reported as an unclosed frame); `None` at the root,
    /// where EOF is success and a stray `]]]` is a parse error.
    fn parse_body(&mut self, frame: &FrameHandle, closing_origin: Option<Origin>) -> Result<(), MashError> {
        loop {
            match self.peek() {
                None => {
                    return match closing_origin {
                        Some(origin) => Err(ParseError::UnclosedFrame { origin }.into()),
                        None => Ok(()),
                    };
                }
                Some('[') if self.starts_with(OPEN) => {
                    if let Some(name) = self.try_consume_include()? {
                        self.inline_include(frame, &name)?;
                    } else {
                        self.consume(OPEN);
                        let child_origin = Origin::new(self.file_name.clone(), self.line);
                        let child = Frame::new_child(frame, self.file_name.clone(), self.line);
                        self.parse_body(&child, Some(child_origin))?;
                    }
                }
                Some(']') if self.starts_with(CLOSE) => {
                    match closing_origin {
                        Some(_) => {
                            self.consume(CLOSE);
                            interpreter::execute_frame(frame, self.ctx)?;
                            return Ok(());
                        }
                        None => {
                            return Err(ParseError::StrayClose { origin: Origin::new(self.file_name.clone(), self.line) }.into());
                        }
                    }
                }
                Some(ch) => {
                    self.bump();
                    frame.borrow_mut().contents.push(ch);
                }
            }
        }
    }

    /// At an already-confirmed `[[[`, look ahead for `include
    /// <name>`. On a match, consumes through the matching `]]]` and
    /// returns the included name; on a non-match, restores position
    /// and returns `None` so the caller treats it as a normal open
    /// delimiter.
    fn try_consume_include(&mut self) -> Result<Option<String>, MashError> {
        let (saved_pos, saved_line) = (self.pos, self.line);
        self.consume(OPEN);
        self.skip_whitespace();
        if !self.starts_with(INCLUDE_KEYWORD) {
            self.pos = saved_pos;
            self.line = saved_line;
            return Ok(None);
        }
        self.consume(INCLUDE_KEYWORD);
        if !self.peek().is_some_and(|c| c.is_whitespace()) {
            self.pos = saved_pos;
            self.line = saved_line;
            return Ok(None);
        }
        self.skip_whitespace();
        let name = self.read_token();
        self.skip_whitespace();
        if name.is_empty() || !self.starts_with(CLOSE) {
            self.pos = saved_pos;
            self.line = saved_line;
            return Ok(None);
        }
        self.consume(CLOSE);
        Ok(Some(name))
    }

    /// Recursively parse (and execute) the named file, then splice its
    /// rendered root contents into `frame`'s `contents` as if pasted
    /// in place.
    fn inline_include(&mut self, frame: &FrameHandle, name: &str) -> Result<(), MashError> {
        let hit = self.import_search_dirs.iter().map(|dir| dir.join(name)).find(|p| p.is_file());
        let Some(hit) = hit else {
            return Err(ParseError::IncludeNotFound {
                origin: Origin::new(self.file_name.clone(), self.line),
                name: name.to_string(),
                searched: self.import_search_dirs.to_vec(),
            }
            .into());
        };
        let contents = fs::read_to_string(&hit).map_err(|source| ParseError::Io { path: hit.clone(), source })?;
        let included_file_name = hit.to_string_lossy().into_owned();

        let included_root = {
            let mut nested = Parser::new(&contents, included_file_name, self.ctx, self.import_search_dirs);
            nested.parse_root()?
        };
        frame.borrow_mut().contents.push_str(&included_root.borrow().contents);
        Ok(())
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn starts_with(&self, needle: &str) -> bool {
        let needle_chars: Vec<char> = needle.chars().collect();
        if self.pos + needle_chars.len() > self.chars.len() {
            return false;
        }
        self.chars[self.pos..self.pos + needle_chars.len()] == needle_chars[..]
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        if ch == '\n' {
            self.line += 1;
        }
        Some(ch)
    }

    fn consume(&mut self, needle: &str) {
        for _ in needle.chars() {
            self.bump();
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|c| c.is_whitespace()) {
            self.bump();
        }
    }

    fn read_token(&mut self) -> String {
        let mut token = String::new();
        while let Some(c) = self.peek() {
            if c.is_whitespace() || c == ']' {
                break;
            }
            token.push(c);
            self.bump();
        }
        token
    }
}
