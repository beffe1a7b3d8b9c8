// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use sbx_adapters::LocalFileStore;
use tempfile::TempDir;

fn spec_in(dir: &Path) -> sbx_core::CommandSpecBuilder {
    CommandSpec::builder(dir).with_commands(["true"])
}

#[tokio::test]
async fn inline_and_file_inputs_are_materialized() {
    let work = TempDir::new().unwrap();
    let host = TempDir::new().unwrap();
    let host_file = host.path().join("data.csv");
    std::fs::write(&host_file, "a,b\n").unwrap();

    let spec = spec_in(work.path())
        .with_input_file("main.sh", InputSource::inline("echo hi"))
        .with_input_file("nested/data.csv", InputSource::file(&host_file))
        .build()
        .unwrap();
    let staged = stage_inputs(&spec).await.unwrap();

    assert_eq!(staged.len(), 2);
    assert_eq!(std::fs::read_to_string(work.path().join("main.sh")).unwrap(), "echo hi");
    assert_eq!(std::fs::read_to_string(work.path().join("nested/data.csv")).unwrap(), "a,b\n");
}

#[tokio::test]
async fn missing_host_file_is_a_staging_error() {
    let work = TempDir::new().unwrap();
    let spec = spec_in(work.path())
        .with_input_file("x", InputSource::file("/definitely/not/here"))
        .build()
        .unwrap();
    let err = stage_inputs(&spec).await.unwrap_err();
    assert!(matches!(err, StagingError::Input { ref name, .. } if name == "x"));
}

#[tokio::test]
async fn runs_with_identical_specs_do_not_share_files() {
    let a = TempDir::new().unwrap();
    let b = TempDir::new().unwrap();
    let spec_a = spec_in(a.path()).with_input_file("in.txt", InputSource::inline("A")).build().unwrap();
    let spec_b = spec_in(b.path()).with_input_file("in.txt", InputSource::inline("B")).build().unwrap();

    stage_inputs(&spec_a).await.unwrap();
    stage_inputs(&spec_b).await.unwrap();

    assert_eq!(std::fs::read_to_string(a.path().join("in.txt")).unwrap(), "A");
    assert_eq!(std::fs::read_to_string(b.path().join("in.txt")).unwrap(), "B");
}

#[tokio::test]
async fn collects_named_and_glob_outputs() {
    let work = TempDir::new().unwrap();
    let store_dir = TempDir::new().unwrap();
    std::fs::create_dir_all(work.path().join("reports")).unwrap();
    std::fs::write(work.path().join("result.json"), "{}").unwrap();
    std::fs::write(work.path().join("reports/a.xml"), "<a/>").unwrap();
    std::fs::write(work.path().join("reports/b.xml"), "<b/>").unwrap();
    std::fs::write(work.path().join("reports/skip.txt"), "").unwrap();

    let spec = spec_in(work.path())
        .with_output(OutputDecl::required("result.json"))
        .with_output(OutputDecl::optional("reports/*.xml"))
        .build()
        .unwrap();
    let store = LocalFileStore::new(store_dir.path());
    let run_id = RunId::from("run-1");
    let collected = collect_outputs(&spec, &run_id, &store).await.unwrap();

    assert!(collected.missing.is_empty());
    assert_eq!(
        collected.files.keys().cloned().collect::<Vec<_>>(),
        vec!["reports/a.xml", "reports/b.xml", "result.json"]
    );
    assert_eq!(collected.files["result.json"], "run-1/result.json");
    let stored = store.get(&collected.files["reports/b.xml"]).await.unwrap();
    assert_eq!(std::fs::read_to_string(stored).unwrap(), "<b/>");
}

#[tokio::test]
async fn absent_optional_output_is_tolerated_required_is_reported() {
    let work = TempDir::new().unwrap();
    let store_dir = TempDir::new().unwrap();
    let spec = spec_in(work.path())
        .with_output(OutputDecl::optional("maybe.txt"))
        .with_output(OutputDecl::required("must.txt"))
        .with_output(OutputDecl::required("*.log"))
        .build()
        .unwrap();

    let collected =
        collect_outputs(&spec, &RunId::from("run-1"), &LocalFileStore::new(store_dir.path())).await.unwrap();
    assert!(collected.files.is_empty());
    assert_eq!(collected.missing, vec!["must.txt", "*.log"]);
}

#[test]
fn relative_names_use_forward_slashes() {
    assert_eq!(relative_name(Path::new("/w"), Path::new("/w/a/b.txt")), "a/b.txt");
}

#[cfg(unix)]
#[tokio::test]
async fn symlinks_out_of_the_working_directory_are_not_collected() {
    use std::os::unix::fs::symlink;

    let work = TempDir::new().unwrap();
    let outside = TempDir::new().unwrap();
    let store_dir = TempDir::new().unwrap();
    let secret = outside.path().join("secret.txt");
    std::fs::write(&secret, "HOST SECRET").unwrap();
    symlink(&secret, work.path().join("result.txt")).unwrap();
    symlink(&secret, work.path().join("a.log")).unwrap();
    symlink(outside.path(), work.path().join("linked")).unwrap();
    std::fs::write(work.path().join("b.log"), "real").unwrap();

    let spec = spec_in(work.path())
        .with_output(OutputDecl::required("result.txt"))
        .with_output(OutputDecl::optional("*.log"))
        .with_output(OutputDecl::optional("linked/secret.txt"))
        .with_output(OutputDecl::optional("linked/*.txt"))
        .build()
        .unwrap();
    let collected =
        collect_outputs(&spec, &RunId::from("run-1"), &LocalFileStore::new(store_dir.path())).await.unwrap();

    assert_eq!(collected.files.keys().cloned().collect::<Vec<_>>(), vec!["b.log"]);
    assert_eq!(collected.missing, vec!["result.txt"]);
}
