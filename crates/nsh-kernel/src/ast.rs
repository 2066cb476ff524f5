//! Syntax tree for shell command lines.
//!
//! The parser produces a [`Script`]; the shell expands and runs it. Words
//! keep their quoting structure so expansion knows which parts may be split
//! into fields or globbed.

/// A whole command line: and-or lists separated by `;` or newlines.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Script {
    pub items: Vec<AndOr>,
}

/// Pipelines joined by `&&` / `||`, evaluated left to right.
#[derive(Debug, Clone, PartialEq)]
pub struct AndOr {
    pub first: Pipeline,
    pub rest: Vec<(LogicalOp, Pipeline)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    /// `&&`: run the right side only if the left succeeded.
    And,
    /// `||`: run the right side only if the left failed.
    Or,
}

/// Commands joined by `|`.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    pub stages: Vec<Command>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Simple(SimpleCommand),
    /// `{ ...; }` run in the current session.
    Group(Group),
}

/// `NAME=value... word... redirect...`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SimpleCommand {
    pub assignments: Vec<Assignment>,
    pub words: Vec<Word>,
    pub redirects: Vec<Redirect>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub body: Script,
    pub redirects: Vec<Redirect>,
}

/// `NAME=value` in front of (or instead of) a command.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub name: String,
    pub value: Word,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectKind {
    /// `>`
    Truncate,
    /// `>>`
    Append,
    /// `<`
    Input,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Redirect {
    File { kind: RedirectKind, target: Word },
    /// Here-document body, already in word form.
    HereDoc(Word),
}

/// One shell word, made of adjacent parts.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Word {
    pub parts: Vec<WordPart>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WordPart {
    /// Unquoted text. Eligible for globbing.
    Literal(String),
    /// Single-quoted or backslash-escaped text. Taken verbatim.
    Quoted(String),
    /// `"..."`: expansions happen, splitting and globbing do not.
    DoubleQuoted(Vec<WordPart>),
    /// `$NAME`, `${NAME}`, `$?`
    Var(String),
    /// `$(...)` or `` `...` ``
    CommandSubst(Box<Script>),
    /// Leading `~`
    Tilde,
}

impl Word {
    pub fn literal(text: impl Into<String>) -> Self {
        Self {
            parts: vec![WordPart::Literal(text.into())],
        }
    }

    /// True if any part was quoted; such words are never globbed.
    pub fn has_quoting(&self) -> bool {
        self.parts
            .iter()
            .any(|p| matches!(p, WordPart::Quoted(_) | WordPart::DoubleQuoted(_)))
    }

    /// The text of a word made only of unquoted literals.
    pub fn as_literal(&self) -> Option<String> {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                WordPart::Literal(s) => out.push_str(s),
                _ => return None,
            }
        }
        Some(out)
    }
}

impl Script {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
