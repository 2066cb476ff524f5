//! The executor: runs a parsed line against the namespace.
//!
//! Everything is buffered. A pipeline stage runs to completion and its
//! stdout becomes the next stage's stdin; stderr from every stage is kept
//! and returned alongside the last stage's stdout.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::ast::{AndOr, Command, Group, LogicalOp, Pipeline, Redirect, RedirectKind, Script, SimpleCommand};
use crate::cx::Cx;
use crate::parser::{self, ParseError};
use crate::vfs::{path, ExecRequest, Namespace, Perm, VfsError, WriteMode};

use super::builtins;
use super::result::ExecResult;
use super::session::Session;

/// Exit code reported once the shell's context has been cancelled.
pub const CANCELLED_CODE: i64 = 130;
pub const NOT_FOUND_CODE: i64 = 127;
pub const NOT_EXECUTABLE_CODE: i64 = 126;

#[derive(Debug, Error)]
pub enum ShellError {
    /// The line did not parse; nothing ran.
    #[error("syntax error: {}", join_errors(.0))]
    Syntax(Vec<ParseError>),
}

impl ShellError {
    /// True if more input could turn the line into a valid one.
    pub fn is_incomplete(&self) -> bool {
        match self {
            ShellError::Syntax(errors) => !errors.is_empty() && errors.iter().all(|e| e.incomplete),
        }
    }
}

fn join_errors(errors: &[ParseError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

pub(crate) type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Output redirect collected before a command runs.
struct OutTarget {
    path: String,
    mode: WriteMode,
}

/// One interactive shell over a namespace.
pub struct Shell {
    pub(crate) ns: Arc<Namespace>,
    pub(crate) session: Session,
    pub(crate) cx: Cx,
}

impl Shell {
    pub fn new(ns: Arc<Namespace>, session: Session) -> Self {
        Self {
            ns,
            session,
            cx: Cx::new(),
        }
    }

    pub fn with_cx(mut self, cx: Cx) -> Self {
        self.cx = cx;
        self
    }

    pub fn namespace(&self) -> &Arc<Namespace> {
        &self.ns
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn cx(&self) -> &Cx {
        &self.cx
    }

    /// Replace the cancellation context, e.g. after an interrupted line.
    pub fn set_cx(&mut self, cx: Cx) {
        self.cx = cx;
    }

    /// Parse and run one line to completion.
    ///
    /// A line that fails to parse runs nothing and returns
    /// [`ShellError::Syntax`]. Command failures are reported through the
    /// result's exit code and stderr, never as `Err`.
    pub async fn execute(&mut self, line: &str) -> Result<ExecResult, ShellError> {
        if line.trim().is_empty() {
            return Ok(ExecResult::default());
        }
        self.session.push_history(line.trim_end_matches('\n'));

        let script = match parser::parse(line) {
            Ok(script) => script,
            Err(errors) => {
                self.session.set_last_code(2);
                return Err(ShellError::Syntax(errors));
            }
        };

        let result = self.run_script(&script, None).await;
        self.session.set_last_code(result.code);
        self.session.notify(line, &result);
        Ok(result)
    }

    pub(crate) fn run_script<'a>(
        &'a mut self,
        script: &'a Script,
        stdin: Option<String>,
    ) -> BoxFuture<'a, ExecResult> {
        Box::pin(async move {
            let mut stdin = stdin;
            let mut total = ExecResult::default();
            for item in &script.items {
                if self.cx.is_cancelled() {
                    total.code = CANCELLED_CODE;
                    total.err.push_str("nsh: interrupted\n");
                    break;
                }
                let result = self.run_and_or(item, stdin.take()).await;
                total.out.push_str(&result.out);
                total.err.push_str(&result.err);
                total.code = result.code;
            }
            total
        })
    }

    async fn run_and_or(&mut self, list: &AndOr, stdin: Option<String>) -> ExecResult {
        let mut total = self.run_pipeline(&list.first, stdin).await;
        self.session.set_last_code(total.code);

        for (op, pipeline) in &list.rest {
            let run = match op {
                LogicalOp::And => total.code == 0,
                LogicalOp::Or => total.code != 0,
            };
            if !run {
                continue;
            }
            let result = self.run_pipeline(pipeline, None).await;
            self.session.set_last_code(result.code);
            total.out.push_str(&result.out);
            total.err.push_str(&result.err);
            total.code = result.code;
        }
        total
    }

    async fn run_pipeline(&mut self, pipeline: &Pipeline, stdin: Option<String>) -> ExecResult {
        let mut input = stdin;
        let mut err = String::new();
        let last = pipeline.stages.len().saturating_sub(1);

        for (i, stage) in pipeline.stages.iter().enumerate() {
            if self.cx.is_cancelled() {
                err.push_str("nsh: interrupted\n");
                return ExecResult::from_output(CANCELLED_CODE, "", err);
            }
            let result = self.run_command(stage, input.take()).await;
            err.push_str(&result.err);
            if i == last {
                return ExecResult::from_output(result.code, result.out, err);
            }
            input = Some(result.out);
        }
        ExecResult::from_output(0, "", err)
    }

    async fn run_command(&mut self, command: &Command, stdin: Option<String>) -> ExecResult {
        match command {
            Command::Simple(simple) => self.run_simple(simple, stdin).await,
            Command::Group(group) => self.run_group(group, stdin).await,
        }
    }

    async fn run_group(&mut self, group: &Group, stdin: Option<String>) -> ExecResult {
        let (stdin, targets) = match self.prepare_redirects(&group.redirects, stdin).await {
            Ok(prepared) => prepared,
            Err(failure) => return failure,
        };
        let result = self.run_script(&group.body, stdin).await;
        self.finish_redirects(targets, result).await
    }

    async fn run_simple(&mut self, command: &SimpleCommand, stdin: Option<String>) -> ExecResult {
        let mut argv = Vec::new();
        for word in &command.words {
            match self.expand_word(word).await {
                Ok(fields) => argv.extend(fields),
                Err(e) => return ExecResult::failure(1, format!("nsh: {e}\n")),
            }
        }

        let mut overlay = HashMap::new();
        for assignment in &command.assignments {
            match self.expand_joined(&assignment.value).await {
                Ok(value) => {
                    overlay.insert(assignment.name.clone(), value);
                }
                Err(e) => return ExecResult::failure(1, format!("nsh: {e}\n")),
            }
        }

        let (stdin, targets) = match self.prepare_redirects(&command.redirects, stdin).await {
            Ok(prepared) => prepared,
            Err(failure) => return failure,
        };

        let Some(name) = argv.first().cloned() else {
            for (name, value) in overlay {
                self.session.set_var(name, value);
            }
            return self.finish_redirects(targets, ExecResult::default()).await;
        };

        let mut env = self.session.vars().clone();
        env.extend(overlay);

        debug!(command = %name, args = ?&argv[1..], cwd = %self.session.cwd(), "dispatch");
        let result = if builtins::is_builtin(&name) {
            self.run_builtin(&name, &argv[1..], &env).await
        } else {
            self.run_external(&name, argv[1..].to_vec(), stdin, env).await
        };
        self.finish_redirects(targets, result).await
    }

    async fn run_external(
        &mut self,
        name: &str,
        args: Vec<String>,
        stdin: Option<String>,
        env: HashMap<String, String>,
    ) -> ExecResult {
        let target = match self.find_command(name).await {
            Ok(target) => target,
            Err(failure) => return failure,
        };
        let req = ExecRequest::new(args)
            .stdin(stdin.unwrap_or_default())
            .cwd(self.session.cwd())
            .env(env);
        match self.ns.exec(&self.cx, &target, req).await {
            Ok(output) => output.into(),
            Err(VfsError::Cancelled) => ExecResult::failure(CANCELLED_CODE, format!("{name}: interrupted\n")),
            Err(e) => ExecResult::failure(1, format!("{name}: {e}\n")),
        }
    }

    /// Locate an executable entry for `name`.
    ///
    /// Names containing `/` are taken relative to the working directory;
    /// anything else is searched for in each `PATH` directory in order.
    async fn find_command(&self, name: &str) -> Result<String, ExecResult> {
        if name.contains('/') {
            let full = path::join(self.session.cwd(), name);
            return match self.ns.stat(&self.cx, &full).await {
                Ok(entry) if !entry.is_dir && entry.perm.allows(Perm::EXEC) => Ok(full),
                Ok(_) => Err(ExecResult::failure(
                    NOT_EXECUTABLE_CODE,
                    format!("{name}: permission denied\n"),
                )),
                Err(_) => Err(not_found(name)),
            };
        }

        let search = self.session.var("PATH").unwrap_or_default().to_string();
        for dir in search.split(':').filter(|d| !d.is_empty()) {
            let dir = path::join(self.session.cwd(), dir);
            let candidate = path::join(&dir, name);
            if let Ok(entry) = self.ns.stat(&self.cx, &candidate).await {
                if !entry.is_dir && entry.perm.allows(Perm::EXEC) {
                    return Ok(candidate);
                }
            }
        }
        Err(not_found(name))
    }

    /// Resolve stdin and output targets for a command's redirects.
    ///
    /// Input redirects and here-documents replace piped stdin; the last one
    /// wins. Failures come back as the command's result.
    async fn prepare_redirects(
        &mut self,
        redirects: &[Redirect],
        stdin: Option<String>,
    ) -> Result<(Option<String>, Vec<OutTarget>), ExecResult> {
        let mut stdin = stdin;
        let mut targets = Vec::new();
        for redirect in redirects {
            match redirect {
                Redirect::HereDoc(body) => {
                    let text = self
                        .expand_joined(body)
                        .await
                        .map_err(|e| ExecResult::failure(1, format!("nsh: {e}\n")))?;
                    stdin = Some(text);
                }
                Redirect::File { kind, target } => {
                    let mut fields = self
                        .expand_word(target)
                        .await
                        .map_err(|e| ExecResult::failure(1, format!("nsh: {e}\n")))?;
                    if fields.len() != 1 {
                        return Err(ExecResult::failure(1, "nsh: ambiguous redirect\n"));
                    }
                    let raw = fields.remove(0);
                    let full = path::join(self.session.cwd(), &raw);
                    match kind {
                        RedirectKind::Input => {
                            let data = self
                                .ns
                                .open(&self.cx, &full)
                                .await
                                .map_err(|e| ExecResult::failure(1, format!("nsh: {e}\n")))?;
                            stdin = Some(String::from_utf8_lossy(&data).into_owned());
                        }
                        RedirectKind::Truncate => targets.push(OutTarget {
                            path: full,
                            mode: WriteMode::Truncate,
                        }),
                        RedirectKind::Append => targets.push(OutTarget {
                            path: full,
                            mode: WriteMode::Append,
                        }),
                    }
                }
            }
        }
        Ok((stdin, targets))
    }

    /// Deliver stdout to output redirects.
    ///
    /// Every target is created; only the last receives the output.
    async fn finish_redirects(&mut self, targets: Vec<OutTarget>, mut result: ExecResult) -> ExecResult {
        let count = targets.len();
        for (i, target) in targets.into_iter().enumerate() {
            let data = if i + 1 == count {
                std::mem::take(&mut result.out)
            } else {
                String::new()
            };
            if let Err(e) = self.ns.write(&self.cx, &target.path, data.as_bytes(), target.mode).await {
                result.err.push_str(&format!("nsh: {e}\n"));
                if result.code == 0 {
                    result.code = 1;
                }
            }
        }
        result
    }
}

fn not_found(name: &str) -> ExecResult {
    ExecResult::failure(NOT_FOUND_CODE, format!("{name}: command not found\n"))
}
