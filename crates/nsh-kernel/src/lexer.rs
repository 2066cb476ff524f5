//! Lexer for shell command lines.
//!
//! Operators are recognized by logos. A word is scanned by hand once its
//! first character is seen, because quotes, `$( )` and backticks can nest
//! and carry blanks and operators inside them. Word text is kept raw (quotes
//! included); the parser splits it into parts. `{` and `}` always come out
//! as their own tokens; the parser decides whether they open a group.
//!
//! Here-document bodies are not tokens of their own: after each newline the
//! lexer reads the bodies of any here-documents opened on that line and
//! stores them in the pending [`HereDoc`] tokens.

use std::fmt;
use std::ops::Range;

use logos::{Lexer, Logos};
use thiserror::Error;

/// Lexer failure.
#[derive(Debug, Clone, PartialEq, Eq, Default, Error)]
pub enum LexError {
    #[default]
    #[error("unexpected character")]
    InvalidToken,

    #[error("unterminated single quote")]
    UnterminatedSingleQuote,

    #[error("unterminated double quote")]
    UnterminatedDoubleQuote,

    #[error("unterminated backquote")]
    UnterminatedBacktick,

    #[error("unterminated command substitution")]
    UnterminatedSubstitution,

    #[error("unterminated ${{...}}")]
    UnterminatedBrace,

    #[error("here-document delimited by end of input (wanted `{0}`)")]
    UnterminatedHereDoc(String),
}

impl LexError {
    /// True when more input could complete the line.
    pub fn is_incomplete(&self) -> bool {
        !matches!(self, LexError::InvalidToken)
    }
}

/// A here-document opened with `<<DELIM` or `<<-DELIM`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HereDoc {
    pub delim: String,
    /// `<<-`: strip leading tabs from body lines and the delimiter line.
    pub strip_tabs: bool,
    /// A quoted delimiter suppresses expansion in the body.
    pub quoted: bool,
    pub body: String,
}

#[derive(Logos, Debug, Clone, PartialEq, Eq)]
#[logos(error = LexError)]
#[logos(skip(r"[ \t\r]+|\\\n|#[^\n]*", allow_greedy = true))]
pub enum Token {
    #[token("&&")]
    AndAnd,

    #[token("||")]
    OrOr,

    #[token("|")]
    Pipe,

    #[token(";")]
    Semi,

    #[token("\n")]
    Newline,

    #[token(">>")]
    GtGt,

    #[token(">")]
    Gt,

    #[token("<")]
    Lt,

    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[regex(r#"<<-?[ \t]*('[^'\n]*'|"[^"\n]*"|[A-Za-z0-9_.\-]+)"#, lex_heredoc)]
    HereDoc(HereDoc),

    #[regex(r"[^ \t\r\n|&;<>(){}#]", lex_word)]
    Word(String),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::AndAnd => f.write_str("&&"),
            Token::OrOr => f.write_str("||"),
            Token::Pipe => f.write_str("|"),
            Token::Semi => f.write_str(";"),
            Token::Newline => f.write_str("newline"),
            Token::GtGt => f.write_str(">>"),
            Token::Gt => f.write_str(">"),
            Token::Lt => f.write_str("<"),
            Token::LBrace => f.write_str("{"),
            Token::RBrace => f.write_str("}"),
            Token::HereDoc(doc) => write!(f, "<<{}", doc.delim),
            Token::Word(w) => write!(f, "`{w}`"),
        }
    }
}

/// A token (or error) with its byte range in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub token: T,
    pub span: Range<usize>,
}

fn lex_heredoc(lex: &mut Lexer<Token>) -> HereDoc {
    let raw = &lex.slice()[2..];
    let (strip_tabs, rest) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw),
    };
    let word = rest.trim_start_matches([' ', '\t']);
    let quoted = word.starts_with('\'') || word.starts_with('"');
    let delim = if quoted {
        word[1..word.len() - 1].to_string()
    } else {
        word.to_string()
    };
    HereDoc {
        delim,
        strip_tabs,
        quoted,
        body: String::new(),
    }
}

fn lex_word(lex: &mut Lexer<Token>) -> Result<String, LexError> {
    let start = lex.span().start;
    let end = scan_word(lex.source(), start)?;
    lex.bump(end - lex.span().end);
    Ok(lex.source()[start..end].to_string())
}

fn is_word_break(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n' | '|' | '&' | ';' | '<' | '>' | '(' | ')')
}

/// Byte offset just past the char at `i`.
pub(crate) fn next_char(src: &str, i: usize) -> usize {
    src[i..].chars().next().map_or(i + 1, |c| i + c.len_utf8())
}

/// Skip a backslash escape at `i`. A trailing backslash stands alone.
pub(crate) fn skip_escape(src: &str, i: usize) -> usize {
    if i + 1 < src.len() {
        next_char(src, i + 1)
    } else {
        i + 1
    }
}

/// End of the word starting at `start`.
fn scan_word(src: &str, start: usize) -> Result<usize, LexError> {
    let bytes = src.as_bytes();
    let mut i = start;
    while i < src.len() {
        match bytes[i] {
            b'\\' => i = skip_escape(src, i),
            b'\'' => i = scan_single(src, i + 1)?,
            b'"' => i = scan_double(src, i + 1)?,
            b'`' => i = scan_backtick(src, i + 1)?,
            b'$' => i = scan_dollar(src, i)?,
            _ => {
                let c = src[i..].chars().next().unwrap_or(' ');
                if is_word_break(c) {
                    break;
                }
                i += c.len_utf8();
            }
        }
    }
    Ok(i)
}

/// `i` is just past the opening quote; returns just past the closing one.
pub(crate) fn scan_single(src: &str, i: usize) -> Result<usize, LexError> {
    src[i..]
        .find('\'')
        .map(|pos| i + pos + 1)
        .ok_or(LexError::UnterminatedSingleQuote)
}

pub(crate) fn scan_double(src: &str, mut i: usize) -> Result<usize, LexError> {
    let bytes = src.as_bytes();
    while i < src.len() {
        match bytes[i] {
            b'\\' => i = skip_escape(src, i),
            b'"' => return Ok(i + 1),
            b'`' => i = scan_backtick(src, i + 1)?,
            b'$' => i = scan_dollar(src, i)?,
            _ => i = next_char(src, i),
        }
    }
    Err(LexError::UnterminatedDoubleQuote)
}

pub(crate) fn scan_backtick(src: &str, mut i: usize) -> Result<usize, LexError> {
    let bytes = src.as_bytes();
    while i < src.len() {
        match bytes[i] {
            b'\\' => i = skip_escape(src, i),
            b'`' => return Ok(i + 1),
            _ => i = next_char(src, i),
        }
    }
    Err(LexError::UnterminatedBacktick)
}

/// `i` points at `$`.
pub(crate) fn scan_dollar(src: &str, i: usize) -> Result<usize, LexError> {
    match src.as_bytes().get(i + 1) {
        Some(b'(') => scan_paren(src, i + 2),
        Some(b'{') => src[i + 2..]
            .find('}')
            .map(|pos| i + 2 + pos + 1)
            .ok_or(LexError::UnterminatedBrace),
        _ => Ok(i + 1),
    }
}

/// `i` is just past `$(`; returns just past the matching `)`.
pub(crate) fn scan_paren(src: &str, mut i: usize) -> Result<usize, LexError> {
    let bytes = src.as_bytes();
    let mut depth = 1usize;
    while i < src.len() {
        match bytes[i] {
            b'\\' => i = skip_escape(src, i),
            b'\'' => i = scan_single(src, i + 1)?,
            b'"' => i = scan_double(src, i + 1)?,
            b'`' => i = scan_backtick(src, i + 1)?,
            b'(' => {
                depth += 1;
                i += 1;
            }
            b')' => {
                depth -= 1;
                i += 1;
                if depth == 0 {
                    return Ok(i);
                }
            }
            _ => i = next_char(src, i),
        }
    }
    Err(LexError::UnterminatedSubstitution)
}

/// Read here-document bodies from `rest`, in order.
///
/// Returns the bytes consumed.
fn read_heredoc_bodies(rest: &str, docs: &mut [&mut HereDoc]) -> Result<usize, LexError> {
    let mut consumed = 0;
    let mut lines = rest.split_inclusive('\n');
    for doc in docs.iter_mut() {
        let mut body = String::new();
        let mut closed = false;
        for line in lines.by_ref() {
            consumed += line.len();
            let mut content = line.strip_suffix('\n').unwrap_or(line);
            content = content.strip_suffix('\r').unwrap_or(content);
            if doc.strip_tabs {
                content = content.trim_start_matches('\t');
            }
            if content == doc.delim {
                closed = true;
                break;
            }
            if doc.strip_tabs {
                body.push_str(line.trim_start_matches('\t'));
            } else {
                body.push_str(line);
            }
        }
        if !closed {
            return Err(LexError::UnterminatedHereDoc(doc.delim.clone()));
        }
        doc.body = body;
    }
    Ok(consumed)
}

/// Tokenize a command line (or several, newline-separated).
pub fn tokenize(source: &str) -> Result<Vec<Spanned<Token>>, Vec<Spanned<LexError>>> {
    let mut lex = Token::lexer(source);
    let mut tokens: Vec<Spanned<Token>> = Vec::new();
    let mut errors = Vec::new();
    let mut pending: Vec<usize> = Vec::new();

    while let Some(result) = lex.next() {
        let span = lex.span();
        match result {
            Ok(Token::Newline) => {
                tokens.push(Spanned {
                    token: Token::Newline,
                    span,
                });
                if pending.is_empty() {
                    continue;
                }
                let mut docs: Vec<&mut HereDoc> = tokens
                    .iter_mut()
                    .enumerate()
                    .filter(|(idx, _)| pending.contains(idx))
                    .filter_map(|(_, t)| match &mut t.token {
                        Token::HereDoc(doc) => Some(doc),
                        _ => None,
                    })
                    .collect();
                match read_heredoc_bodies(lex.remainder(), &mut docs) {
                    Ok(consumed) => lex.bump(consumed),
                    Err(e) => {
                        errors.push(Spanned {
                            token: e,
                            span: source.len()..source.len(),
                        });
                        lex.bump(lex.remainder().len());
                    }
                }
                pending.clear();
            }
            Ok(token) => {
                if matches!(token, Token::HereDoc(_)) {
                    pending.push(tokens.len());
                }
                tokens.push(Spanned { token, span });
            }
            Err(e) => errors.push(Spanned { token: e, span }),
        }
    }

    if let Some(&idx) = pending.first() {
        if let Token::HereDoc(doc) = &tokens[idx].token {
            errors.push(Spanned {
                token: LexError::UnterminatedHereDoc(doc.delim.clone()),
                span: source.len()..source.len(),
            });
        }
    }

    if errors.is_empty() {
        Ok(tokens)
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    fn word(s: &str) -> Token {
        Token::Word(s.to_string())
    }

    fn first_error(source: &str) -> LexError {
        tokenize(source).unwrap_err().remove(0).token
    }

    #[test]
    fn operators_and_words() {
        assert_eq!(
            kinds("a|b && c || d; e > f >> g < h"),
            vec![
                word("a"),
                Token::Pipe,
                word("b"),
                Token::AndAnd,
                word("c"),
                Token::OrOr,
                word("d"),
                Token::Semi,
                word("e"),
                Token::Gt,
                word("f"),
                Token::GtGt,
                word("g"),
                Token::Lt,
                word("h"),
            ]
        );
    }

    #[test]
    fn quotes_keep_blanks_and_operators() {
        assert_eq!(
            kinds(r#"echo 'a | b' "c; $(d e)" x"y z""#),
            vec![word("echo"), word("'a | b'"), word(r#""c; $(d e)""#), word(r#"x"y z""#)]
        );
    }

    #[test]
    fn substitution_nests() {
        assert_eq!(
            kinds("echo $(cat $(ls) | wc) `pwd`"),
            vec![word("echo"), word("$(cat $(ls) | wc)"), word("`pwd`")]
        );
    }

    #[test]
    fn comments_and_continuations() {
        assert_eq!(
            kinds("echo a \\\n b # trailing"),
            vec![word("echo"), word("a"), word("b")]
        );
        assert_eq!(kinds("echo a#b"), vec![word("echo"), word("a#b")]);
    }

    #[test]
    fn braces() {
        assert_eq!(
            kinds("{ echo ${HOME}; }"),
            vec![Token::LBrace, word("echo"), word("${HOME}"), Token::Semi, Token::RBrace]
        );
    }

    #[test]
    fn heredoc_body_is_captured() {
        let tokens = kinds("cat <<EOF > out\nline 1\nline 2\nEOF\necho done");
        let Token::HereDoc(doc) = &tokens[1] else {
            panic!("expected heredoc, got {:?}", tokens[1]);
        };
        assert_eq!(doc.delim, "EOF");
        assert_eq!(doc.body, "line 1\nline 2\n");
        assert!(!doc.quoted);
        assert_eq!(&tokens[4..], &[Token::Newline, word("echo"), word("done")]);
    }

    #[test]
    fn heredoc_strip_tabs_and_quoted() {
        let tokens = kinds("cat <<-'END'\n\tkeep $X\n\tEND\n");
        let Token::HereDoc(doc) = &tokens[1] else {
            panic!("expected heredoc");
        };
        assert!(doc.quoted);
        assert!(doc.strip_tabs);
        assert_eq!(doc.body, "keep $X\n");
    }

    #[test]
    fn two_heredocs_on_one_line() {
        let tokens = kinds("a <<A; b <<B\none\nA\ntwo\nB\n");
        let bodies: Vec<&str> = tokens
            .iter()
            .filter_map(|t| match t {
                Token::HereDoc(doc) => Some(doc.body.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(bodies, vec!["one\n", "two\n"]);
    }

    #[test]
    fn unterminated_inputs() {
        assert_eq!(first_error("echo 'abc"), LexError::UnterminatedSingleQuote);
        assert_eq!(first_error("echo \"abc"), LexError::UnterminatedDoubleQuote);
        assert_eq!(first_error("echo $(ls"), LexError::UnterminatedSubstitution);
        assert_eq!(first_error("echo `ls"), LexError::UnterminatedBacktick);
        assert_eq!(first_error("echo ${X"), LexError::UnterminatedBrace);
        assert_eq!(
            first_error("cat <<EOF\nbody\n"),
            LexError::UnterminatedHereDoc("EOF".into())
        );
        assert_eq!(
            first_error("cat <<EOF"),
            LexError::UnterminatedHereDoc("EOF".into())
        );
        assert!(first_error("echo 'x").is_incomplete());
    }

    #[test]
    fn parens_are_invalid_outside_words() {
        assert_eq!(first_error("echo (a)"), LexError::InvalidToken);
    }
}
