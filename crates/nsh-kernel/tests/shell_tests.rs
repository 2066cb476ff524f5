//! End-to-end shell tests over a standard kernel.

use nsh_kernel::{ExecResult, Kernel, KernelConfig, Shell};
use rstest::rstest;

async fn shell() -> Shell {
    let kernel = Kernel::new(KernelConfig::transient().with_home("/home/x")).unwrap();
    let mut sh = kernel.shell();
    sh.execute("mkdir -p /home/x /work").await.unwrap();
    sh.execute("echo one > /work/three.txt; echo two >> /work/three.txt; echo three >> /work/three.txt")
        .await
        .unwrap();
    sh.execute("touch /work/a.txt /work/b.txt /work/c.log").await.unwrap();
    sh
}

/// Run a line and check stdout and exit code.
async fn run_eval_test(script: &str, expected_stdout: &str, expected_exit: i64) -> ExecResult {
    let mut sh = shell().await;
    let result = sh.execute(script).await.unwrap();
    assert_eq!(result.out, expected_stdout, "stdout of {script:?} (stderr: {:?})", result.err);
    assert_eq!(result.code, expected_exit, "exit code of {script:?}");
    result
}

// =============================================================================
// ECHO & BASIC OUTPUT
// =============================================================================

#[rstest]
#[case::words("echo hello world", "hello world\n")]
#[case::quoted(r#"echo "hello   world""#, "hello   world\n")]
#[case::single("echo 'a $HOME b'", "a $HOME b\n")]
#[case::empty(r#"echo """#, "\n")]
#[case::no_newline("echo -n x", "x")]
#[case::comment("echo a # ignored", "a\n")]
#[case::continuation("echo a \\\n b", "a b\n")]
#[case::braces("echo { x }", "{ x }\n")]
#[tokio::test]
async fn eval_echo(#[case] script: &str, #[case] stdout: &str) {
    run_eval_test(script, stdout, 0).await;
}

// =============================================================================
// VARIABLES
// =============================================================================

#[rstest]
#[case::home("echo $HOME", "/home/x\n")]
#[case::braced("echo ${HOME}/docs", "/home/x/docs\n")]
#[case::tilde("echo ~/docs", "/home/x/docs\n")]
#[case::assign("X=hello; echo $X", "hello\n")]
#[case::interpolated(r#"NAME=world; echo "hello $NAME!""#, "hello world!\n")]
#[case::unset("echo [$NOPE]", "[]\n")]
#[case::status_fail("false; echo $?", "1\n")]
#[case::status_ok("true; echo ${?}", "0\n")]
#[case::export("export Y=2; echo $Y", "2\n")]
#[tokio::test]
async fn eval_variables(#[case] script: &str, #[case] stdout: &str) {
    run_eval_test(script, stdout, 0).await;
}

// =============================================================================
// PIPELINES & LOGICAL LISTS
// =============================================================================

#[rstest]
#[case::head("cat /work/three.txt | head -n 2", "one\ntwo\n", 0)]
#[case::tail("cat /work/three.txt | tail -n 1", "three\n", 0)]
#[case::chain("cat /work/three.txt | grep t | wc -l", "2\n", 0)]
#[case::and_both("echo a && echo b", "a\nb\n", 0)]
#[case::and_short("false && echo b", "", 1)]
#[case::or_fallback("nonexistent || echo fallback", "fallback\n", 0)]
#[case::or_skipped("true || echo never", "", 0)]
#[case::mixed("false && echo x || echo y", "y\n", 0)]
#[case::last_stage_code("echo hi | false", "", 1)]
#[case::sequence("echo a; echo b", "a\nb\n", 0)]
#[case::group("{ echo a; echo b; } | wc -l", "2\n", 0)]
#[tokio::test]
async fn eval_pipelines(#[case] script: &str, #[case] stdout: &str, #[case] exit: i64) {
    run_eval_test(script, stdout, exit).await;
}

// =============================================================================
// COMMAND SUBSTITUTION
// =============================================================================

#[rstest]
#[case::dollar("echo $(echo inner)", "inner\n")]
#[case::backtick("echo `echo inner`", "inner\n")]
#[case::nested("echo $(echo $(echo deep))", "deep\n")]
#[case::in_quotes(r#"echo "got: $(echo x)""#, "got: x\n")]
#[case::split("echo $(cat /work/three.txt)", "one two three\n")]
#[case::kept_in_quotes(r#"echo "$(cat /work/three.txt)""#, "one\ntwo\nthree\n")]
#[case::subshell("echo $(cd /work; pwd); pwd", "/work\n/\n")]
#[tokio::test]
async fn eval_substitution(#[case] script: &str, #[case] stdout: &str) {
    run_eval_test(script, stdout, 0).await;
}

// =============================================================================
// GLOBS
// =============================================================================

#[rstest]
#[case::star("cd /work; echo *.txt", "a.txt b.txt three.txt\n")]
#[case::question("cd /work; echo ?.log", "c.log\n")]
#[case::class("cd /work; echo [ab].txt", "a.txt b.txt\n")]
#[case::prefix("echo /work/*.log", "/work/c.log\n")]
#[case::no_match("echo /work/*.md", "/work/*.md\n")]
#[case::reversed_range("cd /work; echo [z-a]", "[z-a]\n")]
#[case::quoted("echo '/work/*.txt'", "/work/*.txt\n")]
#[case::double_quoted(r#"echo "/work/*.txt""#, "/work/*.txt\n")]
#[tokio::test]
async fn eval_globs(#[case] script: &str, #[case] stdout: &str) {
    run_eval_test(script, stdout, 0).await;
}

// =============================================================================
// REDIRECTS & HERE-DOCUMENTS
// =============================================================================

#[tokio::test]
async fn heredoc_write_then_read() {
    let mut sh = shell().await;
    let r = sh
        .execute("cat > /work/doc.txt <<EOF\nfirst line\n  indented $HOME\nEOF\n")
        .await
        .unwrap();
    assert_eq!(r.code, 0, "{}", r.err);
    let r = sh.execute("cat /work/doc.txt").await.unwrap();
    assert_eq!(r.out, "first line\n  indented /home/x\n");
}

#[tokio::test]
async fn quoted_heredoc_is_literal() {
    let mut sh = shell().await;
    let r = sh.execute("cat <<'EOF'\n$HOME `x`\nEOF\n").await.unwrap();
    assert_eq!(r.out, "$HOME `x`\n");
}

#[tokio::test]
async fn redirect_append_and_input() {
    let mut sh = shell().await;
    sh.execute("echo a > /tmp/log; echo b >> /tmp/log").await.unwrap();
    let r = sh.execute("wc -l < /tmp/log").await.unwrap();
    assert_eq!(r.out, "2\n");
}

#[tokio::test]
async fn redirect_into_read_only_entry_fails() {
    let mut sh = shell().await;
    let r = sh.execute("echo x > /bin/cat").await.unwrap();
    assert_ne!(r.code, 0);
    assert!(!r.err.is_empty());
}

// =============================================================================
// ERRORS
// =============================================================================

#[rstest]
#[case::unterminated_single("echo 'oops")]
#[case::unterminated_double("echo \"oops")]
#[case::unterminated_heredoc("cat <<EOF\nbody\n")]
#[case::empty_segment("echo a | | echo b")]
#[case::leading_pipe("| echo a")]
#[case::dangling_and("echo a &&")]
#[tokio::test]
async fn malformed_lines_run_nothing(#[case] script: &str) {
    let mut sh = shell().await;
    let line = format!("echo side > /tmp/effect; {script}");
    assert!(sh.execute(&line).await.is_err());
    let r = sh.execute("cat /tmp/effect").await.unwrap();
    assert_ne!(r.code, 0, "no command of a malformed line may run");
}

#[tokio::test]
async fn unknown_command_reports_not_found() {
    let mut sh = shell().await;
    let r = sh.execute("frobnicate").await.unwrap();
    assert_eq!(r.code, 127);
    assert_eq!(r.err, "frobnicate: command not found\n");
}

#[tokio::test]
async fn failing_utility_keeps_session_alive() {
    let mut sh = shell().await;
    let r = sh.execute("cat /missing; echo still here").await.unwrap();
    assert_eq!(r.out, "still here\n");
    assert!(r.err.starts_with("cat: "));
    assert_eq!(r.code, 0);
}

// =============================================================================
// UTILITIES THROUGH THE SHELL
// =============================================================================

#[tokio::test]
async fn mount_and_use_new_backend() {
    let mut sh = shell().await;
    let r = sh.execute("mount memory /scratch").await.unwrap();
    assert_eq!(r.code, 0, "{}", r.err);
    sh.execute("echo data > /scratch/f").await.unwrap();
    let r = sh.execute("mounts").await.unwrap();
    assert!(r.out.contains("/scratch"));
    let r = sh.execute("umount /scratch; cat /scratch/f").await.unwrap();
    assert_ne!(r.code, 0);
}

#[tokio::test]
async fn copy_across_backends_rename_refused() {
    let mut sh = shell().await;
    let r = sh.execute("cp /work/three.txt /tmp/copy.txt && cat /tmp/copy.txt").await.unwrap();
    assert_eq!(r.out, "one\ntwo\nthree\n");
    let r = sh.execute("mv /work/a.txt /tmp/a.txt").await.unwrap();
    assert_ne!(r.code, 0);
    assert!(r.err.contains("not supported"));
}

#[tokio::test]
async fn path_lookup_follows_path_variable() {
    let mut sh = shell().await;
    sh.execute("PATH=/nowhere").await.unwrap();
    assert_eq!(sh.execute("cat /work/a.txt").await.unwrap().code, 127);
    assert_eq!(sh.execute("/bin/cat /work/a.txt").await.unwrap().code, 0);
    sh.execute("PATH=/nowhere:/bin").await.unwrap();
    assert_eq!(sh.execute("cat /work/a.txt").await.unwrap().code, 0);
}
