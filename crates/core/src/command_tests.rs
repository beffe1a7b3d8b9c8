// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn base() -> CommandSpecBuilder {
    CommandSpec::builder("/tmp/sbx/run-1").with_commands(["echo", "hi"])
}

#[test]
fn build_requires_commands() {
    let err = CommandSpec::builder("/tmp/w").build().unwrap_err();
    assert_eq!(err, CommandError::EmptyCommands);
}

#[test]
fn program_and_args_split_commands() {
    let spec = base().build().unwrap();
    assert_eq!(spec.program(), "echo");
    assert_eq!(spec.args(), ["hi".to_string()]);
}

#[test]
fn with_commands_replaces_previous_list() {
    let spec = base().with_commands(["true"]).build().unwrap();
    assert_eq!(spec.commands(), ["true".to_string()]);
}

#[test]
fn later_environment_overrides_earlier() {
    let spec = base()
        .with_environment([("A", "runner"), ("B", "runner")])
        .with_environment([("B", "task")])
        .with_env("C", "direct")
        .build()
        .unwrap();

    assert_eq!(spec.env().get("A").map(String::as_str), Some("runner"));
    assert_eq!(spec.env().get("B").map(String::as_str), Some("task"));
    assert_eq!(spec.env().get("C").map(String::as_str), Some("direct"));
}

#[test]
fn later_input_file_overrides_earlier() {
    let spec = base()
        .with_input_file("main.sh", InputSource::inline("one"))
        .with_input_files([("main.sh", InputSource::inline("two"))])
        .build()
        .unwrap();
    assert_eq!(spec.input_files().len(), 1);
    assert_eq!(spec.input_files()["main.sh"], InputSource::inline("two"));
}

#[test]
fn duplicate_output_keeps_required_flag() {
    let spec = base()
        .with_output(OutputDecl::required("out.txt"))
        .with_output_files([OutputDecl::optional("out.txt"), OutputDecl::optional("*.csv")])
        .build()
        .unwrap();
    assert_eq!(
        spec.output_files(),
        [OutputDecl::required("out.txt"), OutputDecl::optional("*.csv")]
    );
}

#[yare::parameterized(
    absolute      = { "/etc/passwd" },
    parent        = { "../secret" },
    nested_escape = { "a/../../b" },
    only_dot      = { "." },
    blank         = { "  " },
)]
fn input_paths_outside_working_dir_are_rejected(name: &str) {
    let result = base().with_input_file(name, InputSource::inline("x")).build();
    assert!(result.is_err(), "{name} should be rejected");
}

#[test]
fn output_patterns_are_checked_too() {
    let err = base().with_output(OutputDecl::optional("../*.log")).build().unwrap_err();
    assert!(matches!(err, CommandError::EscapesWorkingDir { .. }));
}

#[yare::parameterized(
    plain     = { "out.txt",        "/w/out.txt" },
    nested    = { "dir/out.txt",    "/w/dir/out.txt" },
    cur_dir   = { "./out.txt",      "/w/out.txt" },
    climb_in  = { "a/../b.txt",     "/w/b.txt" },
)]
fn resolve_within_stays_inside(name: &str, expected: &str) {
    assert_eq!(resolve_within(Path::new("/w"), name).unwrap(), PathBuf::from(expected));
}

#[test]
fn to_builder_preserves_fields() {
    let spec = base().with_env("K", "V").build().unwrap();
    let copy = spec.to_builder().build().unwrap();
    assert_eq!(spec, copy);
}

#[test]
fn glob_detection() {
    assert!(OutputDecl::optional("reports/*.xml").is_glob());
    assert!(!OutputDecl::optional("report.xml").is_glob());
}
