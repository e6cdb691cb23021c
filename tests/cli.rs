use std::fs;
use std::path::PathBuf;
use std::process::Command;

fn fable() -> Command {
    Command::new(env!("CARGO_BIN_EXE_fable"))
}

fn write_script(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("fable-cli-{}-{}", std::process::id(), name));
    fs::write(&path, contents).expect("failed to write test script");
    path
}

#[test]
fn version_flag_works() {
    let output = fable().arg("--version").output().expect("failed to run binary");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("fable"));
}

#[test]
fn runs_a_script_file() {
    let script = write_script("hello.fb", "println(\"hello\");\n");
    let output = fable().arg(&script).output().expect("failed to run binary");
    let _ = fs::remove_file(&script);

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "hello\n");
}

#[test]
fn missing_file_exits_64() {
    let output = fable()
        .arg("/no/such/fable-script.fb")
        .output()
        .expect("failed to run binary");
    assert_eq!(output.status.code(), Some(64));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not recognized as a regular file"));
}

#[test]
fn compile_errors_exit_65() {
    let script = write_script("broken.fb", "x = ;\n");
    let output = fable().arg(&script).output().expect("failed to run binary");
    let _ = fs::remove_file(&script);

    assert_eq!(output.status.code(), Some(65));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("[ERROR | Line 1]: Expected an expression."));
}

#[test]
fn runtime_errors_report_but_exit_0() {
    let script = write_script("runtime.fb", "print(1 / 0);\n");
    let output = fable().arg(&script).output().expect("failed to run binary");
    let _ = fs::remove_file(&script);

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("[RUNTIME ERROR | Line 1]: Cannot divide by 0!"));
}

#[test]
fn warnings_do_not_change_the_exit_code() {
    let script = write_script("warn.fb", "{ unused = 1; }\nprintln(\"ok\");\n");
    let output = fable().arg(&script).output().expect("failed to run binary");
    let _ = fs::remove_file(&script);

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "ok\n");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("[WARNING | Line 1]: Unused local variable 'unused'."));
}

#[test]
fn repl_echoes_a_bare_expression() {
    use std::io::Write;
    use std::process::Stdio;

    let mut child = fable()
        .arg("--color")
        .arg("never")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to start repl");
    child
        .stdin
        .as_mut()
        .expect("stdin available")
        .write_all(b"1 + 2\n")
        .expect("failed to write to repl");
    let output = child.wait_with_output().expect("failed to wait for repl");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains('3'));
}

#[test]
fn generates_shell_completions() {
    let output = fable()
        .args(["complete", "bash"])
        .output()
        .expect("failed to run binary");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("fable"));
}
