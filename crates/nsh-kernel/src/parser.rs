//! Parser for shell command lines.
//!
//! Transforms the token stream from the lexer into a [`Script`]. Word tokens
//! arrive as raw text and are split into [`WordPart`]s here; command
//! substitutions are parsed eagerly, so a malformed `$(...)` rejects the
//! whole line before anything runs.

use crate::ast::{
    AndOr, Assignment, Command, Group, LogicalOp, Pipeline, Redirect, RedirectKind, Script,
    SimpleCommand, Word, WordPart,
};
use crate::lexer::{self, HereDoc, Token};
use chumsky::{input::ValueInput, prelude::*};

/// Span type used throughout the parser.
pub type Span = SimpleSpan;

/// Parse error with location and context.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub span: Span,
    pub message: String,
    /// More input could complete the line (open quote, trailing `|`, ...).
    pub incomplete: bool,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at {}..{}", self.message, self.span.start, self.span.end)
    }
}

impl std::error::Error for ParseError {}

/// Parse a command line into a Script AST.
pub fn parse(source: &str) -> Result<Script, Vec<ParseError>> {
    let tokens = lexer::tokenize(source).map_err(|errs| {
        errs.into_iter()
            .map(|e| ParseError {
                span: (e.span.start..e.span.end).into(),
                incomplete: e.token.is_incomplete(),
                message: e.token.to_string(),
            })
            .collect::<Vec<_>>()
    })?;

    let tokens: Vec<(Token, Span)> = tokens
        .into_iter()
        .map(|spanned| (spanned.token, (spanned.span.start..spanned.span.end).into()))
        .collect();

    let end_span: Span = (source.len()..source.len()).into();

    let parser = script_parser();
    let result = parser.parse(tokens.as_slice().map(end_span, |(t, s)| (t, s)));

    result.into_result().map_err(|errs| {
        errs.into_iter()
            .map(|e| ParseError {
                span: *e.span(),
                incomplete: e.found().is_none(),
                message: e.to_string(),
            })
            .collect()
    })
}

// ═══════════════════════════════════════════════════════════════════════════
// Words
// ═══════════════════════════════════════════════════════════════════════════

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// True for a valid variable name.
pub fn is_name(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next().is_some_and(is_name_start) && chars.all(is_name_char)
}

fn flush(parts: &mut Vec<WordPart>, text: &mut String) {
    if !text.is_empty() {
        parts.push(WordPart::Literal(std::mem::take(text)));
    }
}

fn nested_script(source: &str) -> Result<Box<Script>, String> {
    parse(source).map(Box::new).map_err(|errs| {
        let msgs: Vec<String> = errs.iter().map(|e| e.message.clone()).collect();
        format!("in command substitution: {}", msgs.join("; "))
    })
}

/// Inside backquotes, `\` only escapes `` ` ``, `$` and `\`.
fn unescape_backtick(inner: &str) -> String {
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(&next) = chars.peek() {
                if matches!(next, '`' | '$' | '\\') {
                    out.push(next);
                    chars.next();
                    continue;
                }
            }
        }
        out.push(c);
    }
    out
}

/// Parse a `$...` form at `i`. Returns the part and the index just past it.
fn parse_dollar(raw: &str, i: usize) -> Result<(WordPart, usize), String> {
    let rest = &raw[i + 1..];
    if rest.starts_with('(') {
        let end = lexer::scan_dollar(raw, i).map_err(|e| e.to_string())?;
        let script = nested_script(&raw[i + 2..end - 1])?;
        return Ok((WordPart::CommandSubst(script), end));
    }
    if let Some(braced) = rest.strip_prefix('{') {
        let close = braced.find('}').ok_or("unterminated ${...}")?;
        let name = &braced[..close];
        if name != "?" && !is_name(name) {
            return Err(format!("bad substitution: ${{{name}}}"));
        }
        return Ok((WordPart::Var(name.to_string()), i + 3 + close));
    }
    if rest.starts_with('?') {
        return Ok((WordPart::Var("?".into()), i + 2));
    }
    let len = rest.find(|c: char| !is_name_char(c)).unwrap_or(rest.len());
    if len == 0 || !rest.starts_with(is_name_start) {
        return Ok((WordPart::Literal("$".into()), i + 1));
    }
    Ok((WordPart::Var(rest[..len].to_string()), i + 1 + len))
}

/// Split the inside of `"..."` (or an unquoted here-document body) into parts.
///
/// In a here-document `\"` is not an escape.
fn parse_double(inner: &str, heredoc: bool) -> Result<Vec<WordPart>, String> {
    let mut parts = Vec::new();
    let mut text = String::new();
    let mut i = 0;
    while i < inner.len() {
        let c = inner[i..].chars().next().unwrap_or_default();
        match c {
            '\\' => {
                let next = inner[i + 1..].chars().next();
                match next {
                    Some('\n') => i += 2,
                    Some(n @ ('$' | '`' | '\\')) => {
                        text.push(n);
                        i += 2;
                    }
                    Some('"') if !heredoc => {
                        text.push('"');
                        i += 2;
                    }
                    _ => {
                        text.push('\\');
                        i += 1;
                    }
                }
            }
            '$' => {
                let (part, end) = parse_dollar(inner, i)?;
                match part {
                    WordPart::Literal(s) => text.push_str(&s),
                    part => {
                        flush(&mut parts, &mut text);
                        parts.push(part);
                    }
                }
                i = end;
            }
            '`' => {
                let end = lexer::scan_backtick(inner, i + 1).map_err(|e| e.to_string())?;
                flush(&mut parts, &mut text);
                let script = nested_script(&unescape_backtick(&inner[i + 1..end - 1]))?;
                parts.push(WordPart::CommandSubst(script));
                i = end;
            }
            c => {
                text.push(c);
                i += c.len_utf8();
            }
        }
    }
    flush(&mut parts, &mut text);
    Ok(parts)
}

/// Split a raw word token into parts.
pub fn parse_word(raw: &str) -> Result<Word, String> {
    let mut parts = Vec::new();
    let mut text = String::new();
    let mut i = 0;

    if raw == "~" || raw.starts_with("~/") {
        parts.push(WordPart::Tilde);
        i = 1;
    }

    while i < raw.len() {
        let c = raw[i..].chars().next().unwrap_or_default();
        match c {
            '\\' => {
                flush(&mut parts, &mut text);
                match raw[i + 1..].chars().next() {
                    Some('\n') => i += 2,
                    Some(next) => {
                        parts.push(WordPart::Quoted(next.to_string()));
                        i += 1 + next.len_utf8();
                    }
                    None => {
                        text.push('\\');
                        i += 1;
                    }
                }
            }
            '\'' => {
                let end = lexer::scan_single(raw, i + 1).map_err(|e| e.to_string())?;
                flush(&mut parts, &mut text);
                parts.push(WordPart::Quoted(raw[i + 1..end - 1].to_string()));
                i = end;
            }
            '"' => {
                let end = lexer::scan_double(raw, i + 1).map_err(|e| e.to_string())?;
                flush(&mut parts, &mut text);
                parts.push(WordPart::DoubleQuoted(parse_double(&raw[i + 1..end - 1], false)?));
                i = end;
            }
            '`' => {
                let end = lexer::scan_backtick(raw, i + 1).map_err(|e| e.to_string())?;
                flush(&mut parts, &mut text);
                let script = nested_script(&unescape_backtick(&raw[i + 1..end - 1]))?;
                parts.push(WordPart::CommandSubst(script));
                i = end;
            }
            '$' => {
                let (part, end) = parse_dollar(raw, i)?;
                match part {
                    WordPart::Literal(s) => text.push_str(&s),
                    part => {
                        flush(&mut parts, &mut text);
                        parts.push(part);
                    }
                }
                i = end;
            }
            c => {
                text.push(c);
                i += c.len_utf8();
            }
        }
    }
    flush(&mut parts, &mut text);
    Ok(Word { parts })
}

/// A here-document body as a word: literal when the delimiter was quoted.
fn heredoc_word(doc: &HereDoc) -> Result<Word, String> {
    let part = if doc.quoted {
        WordPart::Quoted(doc.body.clone())
    } else {
        WordPart::DoubleQuoted(parse_double(&doc.body, true)?)
    };
    Ok(Word { parts: vec![part] })
}

/// `NAME=value` as the leading literal of a word.
fn as_assignment(word: &Word) -> Option<Assignment> {
    let WordPart::Literal(first) = word.parts.first()? else {
        return None;
    };
    let (name, value) = first.split_once('=')?;
    if !is_name(name) {
        return None;
    }
    let mut parts = Vec::with_capacity(word.parts.len());
    if value == "~" || value.starts_with("~/") {
        parts.push(WordPart::Tilde);
        if value.len() > 1 {
            parts.push(WordPart::Literal(value[1..].to_string()));
        }
    } else if !value.is_empty() {
        parts.push(WordPart::Literal(value.to_string()));
    }
    parts.extend(word.parts[1..].iter().cloned());
    Some(Assignment {
        name: name.to_string(),
        value: Word { parts },
    })
}

enum Item {
    Word(Word),
    Redirect(Redirect),
}

fn build_simple(items: Vec<Item>) -> SimpleCommand {
    let mut cmd = SimpleCommand::default();
    for item in items {
        match item {
            Item::Redirect(r) => cmd.redirects.push(r),
            Item::Word(w) => {
                if cmd.words.is_empty() {
                    if let Some(assignment) = as_assignment(&w) {
                        cmd.assignments.push(assignment);
                        continue;
                    }
                }
                cmd.words.push(w);
            }
        }
    }
    cmd
}

// ═══════════════════════════════════════════════════════════════════════════
// Parser Combinators - generic over input type
// ═══════════════════════════════════════════════════════════════════════════

/// Word token, split into parts.
fn word_parser<'tokens, I>(
) -> impl Parser<'tokens, I, Word, extra::Err<Rich<'tokens, Token, Span>>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
{
    select! { Token::Word(raw) => raw }
        .try_map(|raw, span| parse_word(&raw).map_err(|msg| Rich::custom(span, msg)))
        .labelled("word")
}

/// Redirect: `> file`, `>> file`, `< file`, `<<DELIM`
fn redirect_parser<'tokens, I>(
) -> impl Parser<'tokens, I, Redirect, extra::Err<Rich<'tokens, Token, Span>>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
{
    let kind = select! {
        Token::GtGt => RedirectKind::Append,
        Token::Gt => RedirectKind::Truncate,
        Token::Lt => RedirectKind::Input,
    };
    let file = kind
        .then(word_parser())
        .map(|(kind, target)| Redirect::File { kind, target });
    let heredoc = select! { Token::HereDoc(doc) => doc }
        .try_map(|doc, span| heredoc_word(&doc).map(Redirect::HereDoc).map_err(|msg| Rich::custom(span, msg)));

    choice((file, heredoc)).labelled("redirect").boxed()
}

/// Whole script: and-or lists separated by `;` / newlines.
fn script_parser<'tokens, I>(
) -> impl Parser<'tokens, I, Script, extra::Err<Rich<'tokens, Token, Span>>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
{
    recursive(|script| {
        let newlines = just(Token::Newline).repeated();
        let separator = choice((just(Token::Semi), just(Token::Newline)));

        // Braces are reserved only where a command starts.
        let brace_word = select! { Token::LBrace => "{", Token::RBrace => "}" }
            .map(|brace: &str| Word { parts: vec![WordPart::Literal(brace.to_string())] });
        let head = choice((
            word_parser().map(Item::Word),
            redirect_parser().map(Item::Redirect),
        ));
        let tail = choice((
            word_parser().map(Item::Word),
            brace_word.map(Item::Word),
            redirect_parser().map(Item::Redirect),
        ));
        let simple = head
            .then(tail.repeated().collect::<Vec<_>>())
            .map(|(first, mut rest)| {
                rest.insert(0, first);
                build_simple(rest)
            })
            .labelled("command");

        let group = just(Token::LBrace)
            .ignore_then(script)
            .then_ignore(just(Token::RBrace))
            .then(redirect_parser().repeated().collect::<Vec<_>>())
            .map(|(body, redirects)| Group { body, redirects })
            .labelled("command group");

        let command = choice((group.map(Command::Group), simple.map(Command::Simple))).boxed();

        let pipeline = command
            .separated_by(just(Token::Pipe).then(newlines.clone()))
            .at_least(1)
            .collect::<Vec<_>>()
            .map(|stages| Pipeline { stages })
            .labelled("pipeline")
            .boxed();

        let logical_op = select! {
            Token::AndAnd => LogicalOp::And,
            Token::OrOr => LogicalOp::Or,
        };

        let and_or = pipeline
            .clone()
            .then(
                logical_op
                    .then_ignore(newlines)
                    .then(pipeline)
                    .repeated()
                    .collect::<Vec<_>>(),
            )
            .map(|(first, rest)| AndOr { first, rest })
            .boxed();

        separator
            .clone()
            .repeated()
            .ignore_then(
                and_or
                    .separated_by(separator.repeated().at_least(1))
                    .allow_trailing()
                    .collect::<Vec<_>>(),
            )
            .map(|items| Script { items })
            .boxed()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simple(script: &Script, item: usize, stage: usize) -> &SimpleCommand {
        match &script.items[item].first.stages[stage] {
            Command::Simple(cmd) => cmd,
            other => panic!("expected simple command, got {other:?}"),
        }
    }

    fn lit(s: &str) -> WordPart {
        WordPart::Literal(s.into())
    }

    #[test]
    fn simple_command() {
        let script = parse("echo hello world").unwrap();
        let cmd = simple(&script, 0, 0);
        assert_eq!(
            cmd.words,
            vec![Word::literal("echo"), Word::literal("hello"), Word::literal("world")]
        );
    }

    #[test]
    fn pipeline_and_logic() {
        let script = parse("a | b && c || d; e").unwrap();
        assert_eq!(script.items.len(), 2);
        let first = &script.items[0];
        assert_eq!(first.first.stages.len(), 2);
        let ops: Vec<LogicalOp> = first.rest.iter().map(|(op, _)| *op).collect();
        assert_eq!(ops, vec![LogicalOp::And, LogicalOp::Or]);
    }

    #[test]
    fn newlines_after_operators() {
        let script = parse("a |\n b &&\n c\n\nd\n").unwrap();
        assert_eq!(script.items.len(), 2);
        assert_eq!(script.items[0].rest.len(), 1);
    }

    #[test]
    fn redirects_anywhere() {
        let script = parse("> out echo hi >> log < in").unwrap();
        let cmd = simple(&script, 0, 0);
        assert_eq!(cmd.words.len(), 2);
        let kinds: Vec<RedirectKind> = cmd
            .redirects
            .iter()
            .map(|r| match r {
                Redirect::File { kind, .. } => *kind,
                Redirect::HereDoc(_) => panic!("unexpected heredoc"),
            })
            .collect();
        assert_eq!(kinds, vec![RedirectKind::Truncate, RedirectKind::Append, RedirectKind::Input]);
    }

    #[test]
    fn group_with_redirect() {
        let script = parse("{ echo a; echo b; } > out").unwrap();
        let Command::Group(group) = &script.items[0].first.stages[0] else {
            panic!("expected group");
        };
        assert_eq!(group.body.items.len(), 2);
        assert_eq!(group.redirects.len(), 1);
    }

    #[test]
    fn braces_are_plain_words_after_the_command_name() {
        let script = parse("echo { }").unwrap();
        let cmd = simple(&script, 0, 0);
        assert_eq!(cmd.words.len(), 3);
        assert_eq!(cmd.words[1].parts, vec![lit("{")]);
        assert_eq!(cmd.words[2].parts, vec![lit("}")]);

        // Without the `;` the closing brace is an argument to `echo`.
        assert!(parse("{ echo a }").unwrap_err()[0].incomplete);
    }

    #[test]
    fn word_parts() {
        let word = parse_word(r#"pre'sq $x'"dq $HOME ${U}"\*$?~"#).unwrap();
        assert_eq!(
            word.parts,
            vec![
                lit("pre"),
                WordPart::Quoted("sq $x".into()),
                WordPart::DoubleQuoted(vec![
                    lit("dq "),
                    WordPart::Var("HOME".into()),
                    lit(" "),
                    WordPart::Var("U".into()),
                ]),
                WordPart::Quoted("*".into()),
                WordPart::Var("?".into()),
                lit("~"),
            ]
        );
    }

    #[test]
    fn tilde_only_leading() {
        assert_eq!(parse_word("~/x").unwrap().parts, vec![WordPart::Tilde, lit("/x")]);
        assert_eq!(parse_word("~").unwrap().parts, vec![WordPart::Tilde]);
        assert_eq!(parse_word("~bob").unwrap().parts, vec![lit("~bob")]);
    }

    #[test]
    fn lone_dollar_is_literal() {
        assert_eq!(parse_word("a$").unwrap(), Word::literal("a$"));
        assert_eq!(parse_word("$1").unwrap(), Word::literal("$1"));
    }

    #[test]
    fn command_substitution_nested() {
        let word = parse_word("$(echo $(pwd))").unwrap();
        let WordPart::CommandSubst(inner) = &word.parts[0] else {
            panic!("expected substitution");
        };
        let cmd = simple(inner, 0, 0);
        assert!(matches!(cmd.words[1].parts[0], WordPart::CommandSubst(_)));

        let backtick = parse_word("`echo hi`").unwrap();
        assert!(matches!(backtick.parts[0], WordPart::CommandSubst(_)));
    }

    #[test]
    fn assignments() {
        let script = parse("A=1 B=~/x env").unwrap();
        let cmd = simple(&script, 0, 0);
        assert_eq!(cmd.assignments.len(), 2);
        assert_eq!(cmd.assignments[0].name, "A");
        assert_eq!(cmd.assignments[1].value.parts, vec![WordPart::Tilde, lit("/x")]);
        assert_eq!(cmd.words, vec![Word::literal("env")]);

        let only = parse("X=").unwrap();
        let cmd = simple(&only, 0, 0);
        assert!(cmd.words.is_empty());
        assert!(cmd.assignments[0].value.parts.is_empty());

        let not_first = parse("echo A=1").unwrap();
        assert!(simple(&not_first, 0, 0).assignments.is_empty());
    }

    #[test]
    fn heredoc_redirect() {
        let script = parse("cat <<EOF\nhello $USER\nEOF\n").unwrap();
        let cmd = simple(&script, 0, 0);
        let Redirect::HereDoc(word) = &cmd.redirects[0] else {
            panic!("expected heredoc");
        };
        assert_eq!(
            word.parts,
            vec![WordPart::DoubleQuoted(vec![
                lit("hello "),
                WordPart::Var("USER".into()),
                lit("\n"),
            ])]
        );

        let quoted = parse("cat <<'EOF'\n$USER\nEOF").unwrap();
        let Redirect::HereDoc(word) = &simple(&quoted, 0, 0).redirects[0] else {
            panic!("expected heredoc");
        };
        assert_eq!(word.parts, vec![WordPart::Quoted("$USER\n".into())]);
    }

    #[test]
    fn empty_and_comment_lines() {
        assert!(parse("").unwrap().is_empty());
        assert!(parse("  # nothing here").unwrap().is_empty());
        assert_eq!(parse(";echo a;").unwrap().items.len(), 1);
    }

    #[test]
    fn syntax_errors() {
        for bad in ["a | | b", "| a", "a &&", "echo 'x", "{ echo a", "echo ${a-b}", "echo $(echo 'x)"] {
            assert!(parse(bad).is_err(), "should reject {bad:?}");
        }
    }

    #[test]
    fn incomplete_detection() {
        assert!(parse("echo 'x").unwrap_err()[0].incomplete);
        assert!(parse("a |").unwrap_err()[0].incomplete);
        assert!(parse("cat <<EOF\nx").unwrap_err()[0].incomplete);
        assert!(!parse("a | | b").unwrap_err()[0].incomplete);
    }
}
