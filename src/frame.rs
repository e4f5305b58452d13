//! The frame tree: the data model the parser builds and the
//! interpreter walks.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Command/text separator recognized inside a frame's raw contents.
pub const SEPARATOR: &str = "|||";

/// A node in the tree parsed from the input document.
///
/// Frames are always held behind [`FrameHandle`] so that the parser,
/// the interpreter, and scripts running inside a frame's own
/// execution can all observe and mutate the same node — in
/// particular so a child's `push` can append to its still-open
/// parent's `contents`.
#[derive(Debug)]
pub struct Frame {
    pub parent: Option<Weak<RefCell<Frame>>>,
    pub file_name: String,
    pub start_line: usize,
    /// Raw, unsplit material between this frame's delimiters.
    pub contents: String,
    /// Set once the frame has executed; `None` beforehand.
    pub commands: Option<String>,
    /// Set once the frame has executed; `None` beforehand.
    pub text: Option<String>,
}

/// Shared, mutable handle to a [`Frame`]. Cheap to clone; every clone
/// refers to the same node.
pub type FrameHandle = Rc<RefCell<Frame>>;

impl Frame {
    pub fn new_root(file_name: impl Into<String>) -> FrameHandle {
        Rc::new(RefCell::new(Frame {
            parent: None,
            file_name: file_name.into(),
            start_line: 1,
            contents: String::new(),
            commands: None,
            text: None,
        }))
    }

    pub fn new_child(parent: &FrameHandle, file_name: impl Into<String>, start_line: usize) -> FrameHandle {
        Rc::new(RefCell::new(Frame {
            parent: Some(Rc::downgrade(parent)),
            file_name: file_name.into(),
            start_line,
            contents: String::new(),
            commands: None,
            text: None,
        }))
    }

    pub fn parent_handle(&self) -> Option<FrameHandle> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    /// Append text to the parent's `contents`, or do nothing for the
    /// root frame (there is nothing above it to push into).
    pub fn push_to_parent(&self, text: &str) {
        if let Some(parent) = self.parent_handle() {
            parent.borrow_mut().contents.push_str(text);
        }
    }

    /// Split `contents` into `commands`/`text` at the first occurrence
    /// of [`SEPARATOR`], unindent the command block, and pad it with
    /// blank lines so runtime errors report the author's source line.
    /// Idempotent: safe to call once per execution.
    pub fn split_and_normalize(&mut self) {
        let (raw_commands, text) = match self.contents.find(SEPARATOR) {
            Some(idx) => {
                let (cmds, rest) = self.contents.split_at(idx);
                (cmds.to_string(), rest[SEPARATOR.len()..].to_string())
            }
            None => (self.contents.clone(), String::new()),
        };

        let unindented = unindent(&raw_commands);
        let padding = "\n".repeat(self.start_line.saturating_sub(1));
        self.commands = Some(format!("{}{}", padding, unindented));
        self.text = Some(text);
    }

    /// Current text, after `split_and_normalize` has run. Empty
    /// before that point.
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    pub fn set_text(&mut self, text: String) {
        self.text = Some(text);
    }

    /// Current (unindented, padded) commands, after
    /// `split_and_normalize` has run.
    pub fn commands(&self) -> &str {
        self.commands.as_deref().unwrap_or("")
    }

    pub fn set_commands(&mut self, commands: String) {
        self.commands = Some(commands);
    }
}

/// Compute the whitespace prefix shared by the first non-blank line
/// and strip it from the start of every line. Reused by the
/// `unindent()` host operation on frame text.
pub fn unindent(s: &str) -> String {
    let prefix = s
        .lines()
        .find(|line| !line.trim().is_empty())
        .map(|line| {
            let stripped = line.trim_start();
            &line[..line.len() - stripped.len()]
        })
        .unwrap_or("");

    if prefix.is_empty() {
        return s.to_string();
    }

    s.lines()
        .map(|line| line.strip_prefix(prefix).unwrap_or(line.trim_start()))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_finds_separator() {
        let root = Frame::new_root("doc");
        root.borrow_mut().contents = "  print(1) ||| hello".to_string();
        root.borrow_mut().split_and_normalize();
        let f = root.borrow();
        assert_eq!(f.commands(), "print(1)");
        assert_eq!(f.text(), " hello");
    }

    #[test]
    fn split_without_separator_is_all_commands() {
        let root = Frame::new_root("doc");
        root.borrow_mut().contents = "print(1)".to_string();
        root.borrow_mut().split_and_normalize();
        let f = root.borrow();
        assert_eq!(f.commands(), "print(1)");
        assert_eq!(f.text(), "");
    }

    #[test]
    fn start_line_pads_commands_with_blank_lines() {
        let child = Frame::new_child(&Frame::new_root("doc"), "doc", 5);
        child.borrow_mut().contents = "bad(".to_string();
        child.borrow_mut().split_and_normalize();
        let f = child.borrow();
        assert_eq!(f.commands().matches('\n').count(), 4);
    }

    #[test]
    fn push_appends_to_parent_contents() {
        let parent = Frame::new_root("doc");
        parent.borrow_mut().contents = "A".to_string();
        let child = Frame::new_child(&parent, "doc", 1);
        child.borrow().push_to_parent("B");
        parent.borrow_mut().contents.push('C');
        assert_eq!(parent.borrow().contents, "ABC");
    }

    #[test]
    fn push_on_root_is_a_no_op() {
        let root = Frame::new_root("doc");
        root.borrow().push_to_parent("ignored");
        assert_eq!(root.borrow().contents, "");
    }

    #[test]
    fn unindent_strips_common_spaces() {
        let input = "    a\n    b\n      c";
        assert_eq!(unindent(input), "a\nb\n  c");
    }

    #[test]
    fn unindent_strips_common_tabs() {
        let input = "\t\ta\n\t\tb";
        assert_eq!(unindent(input), "a\nb");
    }

    #[test]
    fn unindent_no_prefix_is_unchanged() {
        assert_eq!(unindent("a\nb"), "a\nb");
    }

    #[test]
    fn unindent_blank_lines_dont_set_the_prefix() {
        let input = "\n    a\n    b";
        assert_eq!(unindent(input), "\na\nb");
    }
}
