//! Word expansion: tilde, variables, command substitution, field
//! splitting and pathname globbing, in that order.

use crate::ast::{Script, Word, WordPart};
use crate::glob;
use crate::vfs::VfsResult;

use super::shell::{BoxFuture, Shell};

/// Accumulates the fields one word expands to.
#[derive(Default)]
struct Fields {
    done: Vec<String>,
    current: String,
    /// `current` is a field even when empty (it held quotes).
    open: bool,
}

impl Fields {
    fn push(&mut self, text: &str) {
        self.current.push_str(text);
        self.open = true;
    }

    fn finish(&mut self) {
        if self.open {
            self.done.push(std::mem::take(&mut self.current));
            self.open = false;
        }
    }

    /// Append an unquoted expansion result, splitting it on whitespace.
    fn push_split(&mut self, value: &str) {
        let words: Vec<&str> = value.split_whitespace().collect();
        if value.starts_with(char::is_whitespace) {
            self.finish();
        }
        for (i, w) in words.iter().enumerate() {
            if i > 0 {
                self.finish();
            }
            self.push(w);
        }
        if !words.is_empty() && value.ends_with(char::is_whitespace) {
            self.finish();
        }
    }

    fn into_fields(mut self) -> Vec<String> {
        self.finish();
        self.done
    }
}

impl Shell {
    /// Expand a word into zero or more fields.
    pub(crate) async fn expand_word(&mut self, word: &Word) -> VfsResult<Vec<String>> {
        let mut fields = Fields::default();
        for part in &word.parts {
            match part {
                WordPart::Literal(s) | WordPart::Quoted(s) => fields.push(s),
                WordPart::Tilde => {
                    let home = self.home();
                    fields.push(&home);
                }
                WordPart::DoubleQuoted(inner) => {
                    let text = self.expand_quoted(inner).await?;
                    fields.push(&text);
                }
                WordPart::Var(name) => {
                    let value = self.lookup(name);
                    fields.push_split(&value);
                }
                WordPart::CommandSubst(script) => {
                    let value = self.substitute(script).await;
                    fields.push_split(&value);
                }
            }
        }

        let fields = fields.into_fields();
        if word.has_quoting() {
            return Ok(fields);
        }
        let mut out = Vec::with_capacity(fields.len());
        for field in fields {
            if glob::has_glob_chars(&field) {
                out.extend(glob::expand(&self.ns, &self.cx, self.session.cwd(), &field).await?);
            } else {
                out.push(field);
            }
        }
        Ok(out)
    }

    /// Expand a word to one string: no splitting, no globbing.
    ///
    /// Used for assignment values and here-document bodies.
    pub(crate) async fn expand_joined(&mut self, word: &Word) -> VfsResult<String> {
        self.expand_quoted(&word.parts).await
    }

    fn expand_quoted<'a>(&'a mut self, parts: &'a [WordPart]) -> BoxFuture<'a, VfsResult<String>> {
        Box::pin(async move {
            let mut out = String::new();
            for part in parts {
                match part {
                    WordPart::Literal(s) | WordPart::Quoted(s) => out.push_str(s),
                    WordPart::Tilde => out.push_str(&self.home()),
                    WordPart::Var(name) => out.push_str(&self.lookup(name)),
                    WordPart::CommandSubst(script) => out.push_str(&self.substitute(script).await),
                    WordPart::DoubleQuoted(inner) => out.push_str(&self.expand_quoted(inner).await?),
                }
            }
            Ok(out)
        })
    }

    fn home(&self) -> String {
        self.session.var("HOME").unwrap_or("/").to_string()
    }

    /// Value of `$name`; unset variables expand to nothing.
    fn lookup(&self, name: &str) -> String {
        if name == "?" {
            return self.session.last_code().to_string();
        }
        self.session.var(name).unwrap_or_default().to_string()
    }

    /// Run `script` as a subshell and capture its combined output.
    ///
    /// Directory and variable changes inside do not survive; one trailing
    /// newline is removed.
    async fn substitute(&mut self, script: &Script) -> String {
        let saved = self.session.save();
        let result = self.run_script(script, None).await;
        self.session.restore(saved);
        self.session.set_last_code(result.code);

        let mut text = result.combined();
        if text.ends_with('\n') {
            text.pop();
        }
        text
    }
}
