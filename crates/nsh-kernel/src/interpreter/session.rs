//! Per-shell state: working directory, variables, history, `$?`.
//!
//! A session belongs to exactly one [`Shell`](super::Shell). Two shells over
//! the same namespace never see each other's session.

use std::collections::HashMap;
use std::fmt;

use super::result::ExecResult;

/// Observer called after every top-level line with the line and its result.
pub type PostExecHook = Box<dyn Fn(&str, &ExecResult) + Send + Sync>;

pub struct Session {
    cwd: String,
    vars: HashMap<String, String>,
    history: Vec<String>,
    last_code: i64,
    on_exec: Option<PostExecHook>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new("/")
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("cwd", &self.cwd)
            .field("vars", &self.vars.len())
            .field("history", &self.history.len())
            .field("last_code", &self.last_code)
            .field("on_exec", &self.on_exec.is_some())
            .finish()
    }
}

impl Session {
    pub fn new(cwd: impl Into<String>) -> Self {
        let cwd = cwd.into();
        let mut vars = HashMap::new();
        vars.insert("PWD".to_string(), cwd.clone());
        Self {
            cwd,
            vars,
            history: Vec::new(),
            last_code: 0,
            on_exec: None,
        }
    }

    pub fn cwd(&self) -> &str {
        &self.cwd
    }

    /// Change directory without validation; `cd` does the checking.
    pub fn set_cwd(&mut self, cwd: impl Into<String>) {
        let cwd = cwd.into();
        self.vars.insert("PWD".to_string(), cwd.clone());
        self.cwd = cwd;
    }

    pub fn var(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn set_var(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    pub fn unset_var(&mut self, name: &str) -> Option<String> {
        self.vars.remove(name)
    }

    pub fn vars(&self) -> &HashMap<String, String> {
        &self.vars
    }

    /// Variables as `(name, value)` pairs sorted by name.
    pub fn sorted_vars(&self) -> Vec<(&str, &str)> {
        let mut pairs: Vec<(&str, &str)> = self
            .vars
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        pairs.sort_unstable();
        pairs
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn push_history(&mut self, line: impl Into<String>) {
        self.history.push(line.into());
    }

    /// Exit code of the most recent pipeline (`$?`).
    pub fn last_code(&self) -> i64 {
        self.last_code
    }

    pub fn set_last_code(&mut self, code: i64) {
        self.last_code = code;
    }

    pub fn set_on_exec(&mut self, hook: PostExecHook) {
        self.on_exec = Some(hook);
    }

    pub fn clear_on_exec(&mut self) {
        self.on_exec = None;
    }

    pub(crate) fn notify(&self, line: &str, result: &ExecResult) {
        if let Some(hook) = &self.on_exec {
            hook(line, result);
        }
    }

    /// Snapshot of the state a subshell may change.
    pub(crate) fn save(&self) -> (String, HashMap<String, String>) {
        (self.cwd.clone(), self.vars.clone())
    }

    pub(crate) fn restore(&mut self, saved: (String, HashMap<String, String>)) {
        self.cwd = saved.0;
        self.vars = saved.1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn cwd_tracks_pwd() {
        let mut s = Session::new("/home");
        assert_eq!(s.var("PWD"), Some("/home"));
        s.set_cwd("/tmp");
        assert_eq!(s.cwd(), "/tmp");
        assert_eq!(s.var("PWD"), Some("/tmp"));
    }

    #[test]
    fn vars_sorted() {
        let mut s = Session::new("/");
        s.set_var("B", "2");
        s.set_var("A", "1");
        let names: Vec<&str> = s.sorted_vars().into_iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["A", "B", "PWD"]);
        assert_eq!(s.unset_var("A").as_deref(), Some("1"));
        assert_eq!(s.var("A"), None);
    }

    #[test]
    fn save_and_restore() {
        let mut s = Session::new("/");
        let saved = s.save();
        s.set_cwd("/x");
        s.set_var("K", "v");
        s.restore(saved);
        assert_eq!(s.cwd(), "/");
        assert_eq!(s.var("K"), None);
    }

    #[test]
    fn hook_sees_line_and_result() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let mut s = Session::new("/");
        s.set_on_exec(Box::new(move |line, result| {
            sink.lock().unwrap().push((line.to_string(), result.code));
        }));
        s.notify("true", &ExecResult::success(""));
        assert_eq!(*seen.lock().unwrap(), vec![("true".to_string(), 0)]);
    }
}
