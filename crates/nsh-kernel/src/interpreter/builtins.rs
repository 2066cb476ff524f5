//! Shell-local builtins. These change session state, so they cannot live
//! behind the namespace like the `/bin` utilities.

use std::collections::HashMap;
use std::fmt::Write as _;

use crate::parser::is_name;
use crate::vfs::path;

use super::result::ExecResult;
use super::shell::Shell;

const BUILTINS: &[&str] = &["cd", "pwd", "echo", "env", "export", "unset", "history"];

pub fn is_builtin(name: &str) -> bool {
    BUILTINS.contains(&name)
}

/// Names of all shell builtins.
pub fn names() -> &'static [&'static str] {
    BUILTINS
}

impl Shell {
    /// Run a builtin. `env` is the session environment plus any
    /// per-command assignments.
    pub(crate) async fn run_builtin(
        &mut self,
        name: &str,
        args: &[String],
        env: &HashMap<String, String>,
    ) -> ExecResult {
        match name {
            "cd" => self.builtin_cd(args).await,
            "pwd" => ExecResult::success(format!("{}\n", self.session.cwd())),
            "echo" => echo(args),
            "env" => env_listing(env),
            "export" => self.builtin_export(args),
            "unset" => self.builtin_unset(args),
            "history" => self.builtin_history(),
            _ => ExecResult::failure(1, format!("{name}: not a builtin\n")),
        }
    }

    async fn builtin_cd(&mut self, args: &[String]) -> ExecResult {
        if args.len() > 1 {
            return ExecResult::failure(1, "cd: too many arguments\n");
        }
        let mut announce = false;
        let target = match args.first().map(String::as_str) {
            None => match self.session.var("HOME") {
                Some(home) => home.to_string(),
                None => return ExecResult::failure(1, "cd: HOME not set\n"),
            },
            Some("-") => match self.session.var("OLDPWD") {
                Some(old) => {
                    announce = true;
                    old.to_string()
                }
                None => return ExecResult::failure(1, "cd: OLDPWD not set\n"),
            },
            Some(dir) => dir.to_string(),
        };

        let full = path::join(self.session.cwd(), &target);
        match self.ns.stat(&self.cx, &full).await {
            Ok(entry) if entry.is_dir => {}
            Ok(_) => return ExecResult::failure(1, format!("cd: {target}: not a directory\n")),
            Err(e) => return ExecResult::failure(1, format!("cd: {e}\n")),
        }

        let old = self.session.cwd().to_string();
        self.session.set_var("OLDPWD", old);
        self.session.set_cwd(full.clone());
        if announce {
            ExecResult::success(format!("{full}\n"))
        } else {
            ExecResult::success("")
        }
    }

    fn builtin_export(&mut self, args: &[String]) -> ExecResult {
        if args.is_empty() {
            let mut out = String::new();
            for (k, v) in self.session.sorted_vars() {
                let _ = writeln!(out, "export {k}={v}");
            }
            return ExecResult::success(out);
        }

        let mut err = String::new();
        for arg in args {
            let (name, value) = match arg.split_once('=') {
                Some((name, value)) => (name, Some(value)),
                None => (arg.as_str(), None),
            };
            if !is_name(name) {
                let _ = writeln!(err, "export: `{arg}': not a valid identifier");
                continue;
            }
            match value {
                Some(value) => self.session.set_var(name, value),
                None if self.session.var(name).is_none() => self.session.set_var(name, ""),
                None => {}
            }
        }
        if err.is_empty() {
            ExecResult::success("")
        } else {
            ExecResult::failure(1, err)
        }
    }

    fn builtin_unset(&mut self, args: &[String]) -> ExecResult {
        for name in args {
            self.session.unset_var(name);
        }
        ExecResult::success("")
    }

    fn builtin_history(&self) -> ExecResult {
        let mut out = String::new();
        for (i, line) in self.session.history().iter().enumerate() {
            let _ = writeln!(out, "{:>5}  {line}", i + 1);
        }
        ExecResult::success(out)
    }
}

fn echo(args: &[String]) -> ExecResult {
    let (newline, words) = match args.first().map(String::as_str) {
        Some("-n") => (false, &args[1..]),
        _ => (true, args),
    };
    let mut out = words.join(" ");
    if newline {
        out.push('\n');
    }
    ExecResult::success(out)
}

fn env_listing(env: &HashMap<String, String>) -> ExecResult {
    let mut pairs: Vec<_> = env.iter().collect();
    pairs.sort_unstable();
    let mut out = String::new();
    for (k, v) in pairs {
        let _ = writeln!(out, "{k}={v}");
    }
    ExecResult::success(out)
}
