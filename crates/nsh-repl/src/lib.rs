//! nsh REPL — interactive front end for the nsh kernel.
//!
//! - Runs each line through a [`Shell`] over the standard kernel layout
//! - Lines left open (quote, trailing `|`, pending here-document) continue
//!   on the next prompt
//! - Meta-commands: `/help`, `/quit`, `/ast`, `/result`

use std::future::Future;

use anyhow::{Context, Result};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use tokio::runtime::Runtime;
use tracing::debug;

use nsh_kernel::interpreter::ExecResult;
use nsh_kernel::parser::parse;
use nsh_kernel::{Cx, Kernel, KernelConfig, Shell, ShellError};

/// Words handled by the REPL itself. Anything else starting with `/` is an
/// absolute command path and goes to the shell.
const META_COMMANDS: &[&str] = &["/help", "/h", "/?", "/quit", "/q", "/exit", "/ast", "/result", "/$?"];

fn is_meta_command(line: &str) -> bool {
    line.split_whitespace()
        .next()
        .is_some_and(|word| META_COMMANDS.contains(&word))
}

/// REPL state: one kernel, one shell, and any unfinished input.
pub struct Repl {
    kernel: Kernel,
    shell: Shell,
    runtime: Runtime,
    pending: String,
    show_ast: bool,
    last: ExecResult,
    quit: bool,
}

impl Repl {
    /// A REPL over a memory-only kernel.
    pub fn new() -> Result<Self> {
        Self::with_config(KernelConfig::transient())
    }

    pub fn with_config(config: KernelConfig) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to create tokio runtime")?;
        let kernel = Kernel::new(config).context("Failed to create kernel")?;
        let mut shell = kernel.shell();
        shell.session_mut().set_on_exec(Box::new(|line, result| {
            debug!(line, code = result.code, "line finished");
        }));
        Ok(Self {
            kernel,
            shell,
            runtime,
            pending: String::new(),
            show_ast: false,
            last: ExecResult::default(),
            quit: false,
        })
    }

    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    pub fn shell(&self) -> &Shell {
        &self.shell
    }

    /// True while an incomplete line is buffered.
    pub fn needs_more(&self) -> bool {
        !self.pending.is_empty()
    }

    /// True once `/quit` has been entered.
    pub fn should_quit(&self) -> bool {
        self.quit
    }

    /// Exit code of the last line that ran.
    pub fn last_code(&self) -> i64 {
        self.last.code
    }

    pub fn prompt(&self) -> String {
        if self.needs_more() {
            "> ".to_string()
        } else {
            format!("{}:{}$ ", self.kernel.name(), self.shell.session().cwd())
        }
    }

    /// Drop any buffered continuation lines.
    pub fn cancel_pending(&mut self) {
        self.pending.clear();
    }

    /// Process a single line of input.
    ///
    /// Returns the text to show, or `None` when there is nothing to print
    /// (including when the line was buffered for continuation).
    pub fn process_line(&mut self, line: &str) -> Result<Option<String>> {
        let trimmed = line.trim();

        if self.pending.is_empty() && is_meta_command(trimmed) {
            return self.handle_meta_command(trimmed);
        }

        if !self.pending.is_empty() {
            self.pending.push('\n');
        }
        self.pending.push_str(line);
        let source = std::mem::take(&mut self.pending);

        if source.trim().is_empty() {
            return Ok(None);
        }

        if self.show_ast {
            return match parse(&source) {
                Ok(script) => Ok(Some(format!("{script:#?}\n"))),
                Err(errors) if errors.iter().all(|e| e.incomplete) => {
                    self.pending = source;
                    Ok(None)
                }
                Err(errors) => Ok(Some(format_errors(&ShellError::Syntax(errors)))),
            };
        }

        let shell = &mut self.shell;
        let outcome = self
            .runtime
            .block_on(execute_interruptible(shell, &source, ctrl_c()));
        match outcome {
            Ok(result) => {
                let text = result.combined();
                self.last = result;
                Ok(if text.is_empty() { None } else { Some(text) })
            }
            Err(e) if e.is_incomplete() => {
                self.pending = source;
                Ok(None)
            }
            Err(e) => {
                self.last = ExecResult::failure(2, format_errors(&e));
                Ok(Some(format_errors(&e)))
            }
        }
    }

    /// Handle a line whose first word is in [`META_COMMANDS`].
    fn handle_meta_command(&mut self, cmd: &str) -> Result<Option<String>> {
        let command = cmd.split_whitespace().next().unwrap_or("");

        match command {
            "/quit" | "/q" | "/exit" => {
                self.quit = true;
                Ok(None)
            }
            "/help" | "/h" | "/?" => Ok(Some(HELP_TEXT.to_string())),
            "/ast" => {
                self.show_ast = !self.show_ast;
                Ok(Some(format!("AST mode: {}\n", if self.show_ast { "ON" } else { "OFF" })))
            }
            "/result" | "/$?" => Ok(Some(format_result(&self.last))),
            _ => Ok(None),
        }
    }
}

/// Run `line` on a fresh context that is cancelled once `interrupt` fires.
///
/// The line keeps running after cancellation until the shell notices, so
/// partial output and the 130 status still come back.
async fn execute_interruptible<F>(shell: &mut Shell, line: &str, interrupt: F) -> Result<ExecResult, ShellError>
where
    F: Future<Output = ()>,
{
    let cx = Cx::new();
    shell.set_cx(cx.clone());
    let run = shell.execute(line);
    tokio::pin!(run, interrupt);
    tokio::select! {
        biased;
        () = &mut interrupt => {
            debug!("interrupt received, cancelling line");
            cx.cancel();
            run.await
        }
        outcome = &mut run => outcome,
    }
}

/// Resolves on Ctrl-C. Never resolves if the handler cannot be installed.
async fn ctrl_c() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

fn format_errors(err: &ShellError) -> String {
    match err {
        ShellError::Syntax(errors) => {
            let mut msg = String::from("syntax error:\n");
            for e in errors {
                msg.push_str(&format!("  {e}\n"));
            }
            msg
        }
    }
}

/// Format an ExecResult for `/result`.
fn format_result(result: &ExecResult) -> String {
    let status = if result.ok() { "✓" } else { "✗" };
    let mut output = format!("{status} code={}", result.code);
    if !result.out.is_empty() {
        output.push_str(&format!(" out={:?}", result.out));
    }
    if !result.err.is_empty() {
        output.push_str(&format!(" err={:?}", result.err));
    }
    output.push('\n');
    output
}

const HELP_TEXT: &str = r#"nsh — one namespace, many backends

Meta-commands:
  /help, /h, /?     Show this help
  /quit, /q, /exit  Exit the REPL
  /ast              Toggle parse-tree display instead of running
  /result, /$?      Show the last result

Builtins:
  cd [DIR|-]  pwd  echo [-n]  env  export  unset  history

Utilities (in /bin):
  cat head tail ls stat mkdir rm mv cp touch wc grep true false
  search mount umount mounts

Syntax:
  a | b             Pipeline
  a && b, a || b    Run b on success / failure of a
  a; b              Sequence
  { a; b; } > f     Group, redirected as one
  > f, >> f, < f    Redirects
  <<EOF ... EOF     Here-document
  $VAR ${VAR} $?    Variables
  $(cmd) `cmd`      Command substitution
  *.txt ?.log [ab]* Globs

Examples:
  mount memory /scratch
  echo hello > /scratch/greeting
  cat /scratch/greeting | wc -c
"#;

/// Run one command line non-interactively; returns its exit code.
pub fn run_command(config: KernelConfig, line: &str) -> Result<i64> {
    let mut repl = Repl::with_config(config)?;
    let shell = &mut repl.shell;
    match repl.runtime.block_on(execute_interruptible(shell, line, ctrl_c())) {
        Ok(result) => {
            print!("{}", result.out);
            eprint!("{}", result.err);
            Ok(result.code)
        }
        Err(e) => {
            eprint!("{}", format_errors(&e));
            Ok(2)
        }
    }
}

fn history_path() -> Option<std::path::PathBuf> {
    directories::ProjectDirs::from("", "", "nsh").map(|dirs| dirs.data_dir().join("history.txt"))
}

/// Run the REPL.
pub fn run(config: KernelConfig) -> Result<()> {
    println!("nsh v{}", env!("CARGO_PKG_VERSION"));
    println!("Type /help for commands, /quit to exit.\n");

    let mut rl: Editor<(), DefaultHistory> = Editor::new().context("Failed to create editor")?;

    let history = history_path();
    if let Some(ref path) = history {
        let _ = rl.load_history(path);
    }

    let mut repl = Repl::with_config(config)?;

    loop {
        match rl.readline(&repl.prompt()) {
            Ok(line) => {
                let _ = rl.add_history_entry(line.as_str());
                match repl.process_line(&line) {
                    Ok(Some(output)) => print!("{output}"),
                    Ok(None) => {}
                    Err(e) => eprintln!("Error: {e}"),
                }
                if repl.should_quit() {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => {
                repl.cancel_pending();
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("^D");
                break;
            }
            Err(err) => {
                eprintln!("Error: {err}");
                break;
            }
        }
    }

    if let Some(ref path) = history {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let _ = rl.save_history(path);
    }

    Ok(())
}
