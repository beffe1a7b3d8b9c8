// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use sbx_adapters::{ContainerCall, FakeBehavior, FakeContainerClient, FakeLogSink, FakeMetricSink, LocalFileStore};
use sbx_core::{FinalState, RunState, Stream};
use tempfile::TempDir;

struct Harness {
    root: TempDir,
    store: TempDir,
    sink: FakeLogSink,
}

fn harness() -> Harness {
    Harness { root: TempDir::new().unwrap(), store: TempDir::new().unwrap(), sink: FakeLogSink::new() }
}

impl Harness {
    fn ctx(&self) -> RunContext {
        RunContext::new(RunId::from_string("run-task"), Arc::new(LocalFileStore::new(self.store.path())))
            .with_log_sink(Arc::new(self.sink.clone()))
            .work_root(self.root.path())
    }

    fn stdout(&self) -> Vec<String> {
        self.sink.messages(Stream::StdOut)
    }
}

#[tokio::test]
async fn shell_script_runs_with_fail_fast() {
    let h = harness();
    let task = ScriptTask::new(ScriptCommands::shell(["echo first", "false", "echo unreachable"]));
    let result = task.run(&h.ctx()).await.unwrap();

    assert_eq!(result.exit_code(), 1);
    assert_eq!(result.run_state(), RunState::Failed);
    assert_eq!(h.stdout(), vec!["first"]);
}

#[tokio::test]
async fn before_commands_run_first() {
    let h = harness();
    let script = ScriptCommands::shell(["echo main"]).with_before_commands(["echo setup"]);
    ScriptTask::new(script).run(&h.ctx()).await.unwrap();
    assert_eq!(h.stdout(), vec!["setup", "main"]);
}

#[tokio::test]
async fn placeholders_and_working_dir_env_are_available() {
    let h = harness();
    let task = ScriptTask::new(ScriptCommands::shell([
        "echo {{ runId }}",
        "echo {{ greeting }}",
        "test \"$WORKING_DIR\" = \"{{ workingDir }}\" && echo same-dir",
        "echo \"$TARGET\"",
    ]))
    .env("TARGET", "to-{{ greeting }}");
    let ctx = h.ctx().with_var("greeting", "hello");
    task.run(&ctx).await.unwrap();

    assert_eq!(h.stdout(), vec!["run-task", "hello", "same-dir", "to-hello"]);
}

#[tokio::test]
async fn task_env_overrides_base_env() {
    let h = harness();
    let base = BTreeMap::from([
        ("SHARED".to_string(), "base".to_string()),
        ("ONLY_BASE".to_string(), "kept".to_string()),
    ]);
    let task = ScriptTask::new(ScriptCommands::shell(["echo \"$SHARED $ONLY_BASE\""])).env("SHARED", "task");
    task.run(&h.ctx().with_base_env(base)).await.unwrap();

    assert_eq!(h.stdout(), vec!["task kept"]);
}

#[tokio::test]
async fn working_dir_is_removed_unless_kept() {
    let h = harness();
    ScriptTask::new(ScriptCommands::shell(["true"])).run(&h.ctx()).await.unwrap();
    assert_eq!(std::fs::read_dir(h.root.path()).unwrap().count(), 0);

    ScriptTask::new(ScriptCommands::shell(["touch marker"]))
        .keep_working_dir(true)
        .run(&h.ctx())
        .await
        .unwrap();
    let kept: Vec<_> = std::fs::read_dir(h.root.path()).unwrap().map(|e| e.unwrap().path()).collect();
    assert_eq!(kept.len(), 1);
    assert!(kept[0].join("marker").is_file());
}

#[tokio::test]
async fn inputs_and_outputs_flow_through_the_store() {
    let h = harness();
    let task = ScriptTask::new(ScriptCommands::shell(["tr a-z A-Z < in.txt > out.txt"]))
        .input_file("in.txt", InputSource::inline("shout"))
        .output(OutputDecl::required("out.txt"));
    let result = task.run(&h.ctx()).await.unwrap();

    let key = &result.output_files()["out.txt"];
    assert_eq!(std::fs::read_to_string(h.store.path().join(key)).unwrap(), "SHOUT");
}

#[tokio::test]
async fn metrics_reach_the_metric_sink() {
    let h = harness();
    let metrics = FakeMetricSink::new();
    let task = ScriptTask::new(ScriptCommands::shell([
        r#"echo '::{"metrics":[{"name":"rows","value":12,"type":"counter","tags":{"table":"users"}}]}::'"#,
    ]));
    let result = task.run(&h.ctx().with_metric_sink(Arc::new(metrics.clone()))).await.unwrap();

    assert_eq!(metrics.metrics(), result.metrics().to_vec());
    assert_eq!(result.metrics()[0].tags.get("table").map(String::as_str), Some("users"));
}

#[tokio::test]
async fn stderr_is_a_warning_by_default() {
    let h = harness();
    let result = ScriptTask::new(ScriptCommands::shell(["echo careful >&2"])).run(&h.ctx()).await.unwrap();
    assert_eq!(result.final_state(), Some(FinalState::Warning));

    let result = ScriptTask::new(ScriptCommands::shell(["echo careful >&2"]))
        .warning_on_stderr(false)
        .run(&h.ctx())
        .await
        .unwrap();
    assert_eq!(result.final_state(), None);
}

#[test]
fn container_options_require_container_runner() {
    let task = ScriptTask::new(ScriptCommands::shell(["true"])).container(ContainerOptions::default());
    let err = task.validate().unwrap_err();
    assert!(matches!(err, RunError::Configuration(_)), "{err}");

    let task = task.runner(RunnerKind::Container);
    assert!(task.validate().is_ok());
}

#[yare::parameterized(
    no_commands   = { ScriptTask::new(ScriptCommands::shell(Vec::<String>::new())) },
    blank_lines   = { ScriptTask::new(ScriptCommands::shell(["", "   "])) },
    zero_timeout  = { ScriptTask::new(ScriptCommands::shell(["true"])).timeout(Duration::ZERO) },
)]
fn invalid_tasks_are_configuration_errors(task: ScriptTask) {
    assert!(matches!(task.validate(), Err(RunError::Configuration(_))));
}

#[tokio::test]
async fn container_runner_without_client_is_configuration_error() {
    let h = harness();
    let err = ScriptTask::new(ScriptCommands::shell(["true"]))
        .runner(RunnerKind::Container)
        .run(&h.ctx())
        .await
        .unwrap_err();
    assert!(matches!(err, RunError::Configuration(_)), "{err}");
}

#[tokio::test]
async fn container_image_falls_back_in_order() {
    let h = harness();
    let client = FakeContainerClient::new().with_behavior(FakeBehavior::exits(0));
    let ctx = h.ctx().with_container_client(Arc::new(client.clone())).default_image("configured:1");

    let base = ScriptTask::new(ScriptCommands::shell(["true"])).runner(RunnerKind::Container);
    base.clone().run(&ctx).await.unwrap();
    base.clone().default_image("plugin:2").run(&ctx).await.unwrap();
    base.container(ContainerOptions::default().image("explicit:3"))
        .default_image("plugin:2")
        .run(&ctx)
        .await
        .unwrap();

    let images: Vec<String> = client
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            ContainerCall::Create(spec) => Some(spec.image),
            _ => None,
        })
        .collect();
    assert_eq!(images, vec!["configured:1", "plugin:2", "explicit:3"]);
}

#[tokio::test]
async fn container_sees_mount_path_as_working_dir() {
    let h = harness();
    let client = FakeContainerClient::new().with_image("alpine:3.20");
    let ctx = h.ctx().with_container_client(Arc::new(client.clone()));
    ScriptTask::new(ScriptCommands::shell(["cd {{ workingDir }}"]))
        .runner(RunnerKind::Container)
        .container(ContainerOptions::default().image("alpine:3.20"))
        .run(&ctx)
        .await
        .unwrap();

    let spec = client.created_spec().unwrap();
    assert_eq!(spec.env.get(WORKING_DIR_ENV).map(String::as_str), Some(crate::runner::DEFAULT_MOUNT_PATH));
    assert_eq!(spec.cmd, vec!["/bin/sh", "-c", "set -e\ncd /sbx/work"]);
}
