//! ExecResult — the outcome of every command, pipeline and line.
//!
//! The shell keeps stdout and stderr apart while a line runs; callers that
//! only want "what the user would see" use [`ExecResult::combined`].

use crate::vfs::ExecOutput;

/// The result of executing a command or pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExecResult {
    /// Exit code. 0 means success.
    pub code: i64,
    /// Standard output.
    pub out: String,
    /// Standard error.
    pub err: String,
}

impl ExecResult {
    /// Create a successful result with output.
    pub fn success(out: impl Into<String>) -> Self {
        Self {
            code: 0,
            out: out.into(),
            err: String::new(),
        }
    }

    /// Create a failed result with an error message.
    pub fn failure(code: i64, err: impl Into<String>) -> Self {
        Self {
            code,
            out: String::new(),
            err: err.into(),
        }
    }

    /// Create a result from raw output streams.
    pub fn from_output(code: i64, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            code,
            out: stdout.into(),
            err: stderr.into(),
        }
    }

    /// True if the command succeeded (exit code 0).
    pub fn ok(&self) -> bool {
        self.code == 0
    }

    /// Stdout followed by stderr.
    pub fn combined(&self) -> String {
        let mut all = String::with_capacity(self.out.len() + self.err.len());
        all.push_str(&self.out);
        all.push_str(&self.err);
        all
    }
}

impl From<ExecOutput> for ExecResult {
    fn from(output: ExecOutput) -> Self {
        Self {
            code: output.code,
            out: String::from_utf8_lossy(&output.stdout).into_owned(),
            err: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

impl From<ExecResult> for ExecOutput {
    fn from(result: ExecResult) -> Self {
        Self {
            code: result.code,
            stdout: result.out.into_bytes(),
            stderr: result.err.into_bytes(),
        }
    }
}
