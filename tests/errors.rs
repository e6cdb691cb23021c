mod common;

use common::{run, run_diagnostics};

#[test]
fn two_broken_statements_give_two_diagnostics() {
    let diagnostics = run_diagnostics("x = ;\ny = ;\n");
    assert_eq!(
        diagnostics,
        vec![
            "[ERROR | Line 1]: Expected an expression.",
            "[ERROR | Line 2]: Expected an expression.",
        ]
    );
}

#[test]
fn parse_errors_skip_execution_entirely() {
    let result = run("print(\"side effect\");\nx = ;\n");
    assert_eq!(result.output, "");
    assert_eq!(result.diagnostics, vec!["[ERROR | Line 2]: Expected an expression."]);
}

#[test]
fn missing_semicolon_is_reported() {
    let diagnostics = run_diagnostics("x = 1");
    assert_eq!(diagnostics, vec!["[ERROR | Line 1]: Expected a ';' after expression."]);
}

#[test]
fn unterminated_string_is_reported() {
    let diagnostics = run_diagnostics("x = \"oops;\n");
    assert_eq!(
        diagnostics[0],
        "[ERROR | Line 2]: Unterminated String. Expected a \"."
    );
}

#[test]
fn stray_character_is_reported_with_the_character() {
    let diagnostics = run_diagnostics("x = 1 @ 2;");
    assert!(diagnostics.contains(&"[ERROR | Line 1]: Unexpected character: @".to_string()));
}

#[test]
fn invalid_assignment_target_recovers() {
    let result = run("1 + 2 = 3; print(\"next\");");
    assert_eq!(result.output, "");
    assert_eq!(result.diagnostics, vec!["[ERROR | Line 1]: Invalid assignment target."]);
}

#[test]
fn argument_cap_is_reported() {
    let mut args: Vec<String> = Vec::new();
    for i in 0..128 {
        args.push(i.to_string());
    }
    let source = format!("fn f() {{ }} f({});", args.join(", "));
    let diagnostics = run_diagnostics(&source);
    assert!(diagnostics.contains(&"[ERROR | Line 1]: Can't have more than 127 arguments.".to_string()));
}

#[test]
fn error_inside_a_block_does_not_cascade_past_the_brace() {
    let diagnostics = run_diagnostics("{\n    x = ;\n}\nprint(1);");
    assert_eq!(diagnostics, vec!["[ERROR | Line 2]: Expected an expression."]);
}

#[test]
fn runtime_errors_report_the_operator_line() {
    let diagnostics = run_diagnostics("x = 1;\ny = 0;\nprint(x /\n    y);");
    assert_eq!(diagnostics, vec!["[RUNTIME ERROR | Line 3]: Cannot divide by 0!"]);
}
