mod helpers;

use camino::Utf8PathBuf;
use cloudconfig_lxd::CloudConfigError;
use cloudconfig_lxd::configurer::Configurer;
use cloudconfig_lxd::document::{Command, load_document, load_documents};
use cloudconfig_lxd::ostype::OsType;
use tempfile::tempdir;

use crate::helpers::{RecordingTarget, exec, write_document};

#[test]
fn test_load_document_from_file() {
    let dir = tempdir().expect("failed to create temp dir");
    let path = write_document(
        &dir,
        "web.yaml",
        r#"#cloud-config
packages: [nginx]
runcmd:
  - [rc-service, nginx, start]
"#,
    );

    let config = load_document(&path).expect("document should load");

    assert_eq!(config.packages, vec!["nginx"]);
    assert_eq!(config.commands, vec![Command::args(["rc-service", "nginx", "start"])]);
}

#[test]
fn test_load_missing_file_names_path() {
    let path = Utf8PathBuf::from("/non/existent/user-data.yaml");
    let err = load_document(&path).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("/non/existent/user-data.yaml"), "got: {}", msg);
    assert!(msg.contains("not found"), "got: {}", msg);
}

#[test]
fn test_load_documents_keeps_order() {
    let dir = tempdir().expect("failed to create temp dir");
    let first = write_document(&dir, "1.yaml", "#cloud-config\npackages: [a]\n");
    let second = write_document(&dir, "2.yaml", "#cloud-config\npackages: [b]\n");

    let documents = load_documents(&[second.clone(), first.clone()]).unwrap();

    assert_eq!(documents[0].name, second.as_str());
    assert_eq!(documents[0].config.packages, vec!["b"]);
    assert_eq!(documents[1].name, first.as_str());
}

#[test]
fn test_missing_marker_rejected_without_remote_calls() {
    let dir = tempdir().expect("failed to create temp dir");
    let path = write_document(&dir, "plain.yaml", "packages: [curl]\n");
    let target = RecordingTarget::new();
    let mut configurer = Configurer::new(&target).with_os(Some(OsType::Alpine));

    let err = configurer.apply_documents(&[path.clone()]).unwrap_err();

    let msg = format!("{:#}", err);
    assert!(msg.contains(path.as_str()), "expected path in error, got: {}", msg);
    assert!(msg.contains("#cloud-config"), "expected marker in error, got: {}", msg);
    assert!(target.calls().is_empty());
}

#[test]
fn test_later_parse_failure_prevents_earlier_documents() {
    let dir = tempdir().expect("failed to create temp dir");
    let good = write_document(&dir, "good.yaml", "#cloud-config\npackages: [curl]\n");
    let also_good = write_document(&dir, "also-good.yaml", "#cloud-config\nruncmd: [date]\n");
    let bad = write_document(&dir, "bad.yaml", "#cloud-config\nwrite_files: [\n");
    let target = RecordingTarget::new();
    let mut configurer = Configurer::new(&target).with_os(Some(OsType::Alpine));

    let err = configurer
        .apply_documents(&[good, also_good, bad.clone()])
        .unwrap_err();

    match err.downcast_ref::<CloudConfigError>() {
        Some(CloudConfigError::Parse { document, .. }) => assert_eq!(document, bad.as_str()),
        other => panic!("expected Parse error, got {:?}", other),
    }
    assert!(target.calls().is_empty(), "no document may be applied");
}

#[test]
fn test_invalid_permissions_fail_batch_before_remote_calls() {
    let dir = tempdir().expect("failed to create temp dir");
    let good = write_document(&dir, "good.yaml", "#cloud-config\nruncmd: [date]\n");
    let bad = write_document(
        &dir,
        "perm.yaml",
        "#cloud-config\nwrite_files:\n  - path: /etc/x\n    permissions: abc\n",
    );
    let target = RecordingTarget::new();
    let mut configurer = Configurer::new(&target);

    let err = configurer.apply_documents(&[good, bad.clone()]).unwrap_err();

    assert!(format!("{:#}", err).contains(bad.as_str()));
    assert!(target.calls().is_empty());
}

#[test]
fn test_documents_applied_in_given_order() {
    let dir = tempdir().expect("failed to create temp dir");
    let first = write_document(&dir, "1.yaml", "#cloud-config\nruncmd:\n  - [echo, one]\n");
    let second = write_document(&dir, "2.yaml", "#cloud-config\nruncmd:\n  - [echo, two]\n");
    let target = RecordingTarget::new();
    let mut configurer = Configurer::new(&target);

    configurer.apply_documents(&[first, second]).unwrap();

    assert_eq!(target.calls(), vec![exec(&["echo", "one"]), exec(&["echo", "two"])]);
}

#[test]
fn test_application_failure_stops_batch_and_names_document() {
    let dir = tempdir().expect("failed to create temp dir");
    let first = write_document(&dir, "1.yaml", "#cloud-config\nruncmd:\n  - [false]\n");
    let second = write_document(&dir, "2.yaml", "#cloud-config\nruncmd:\n  - [echo, two]\n");
    let target = RecordingTarget::new().failing_program("false");
    let mut configurer = Configurer::new(&target);

    let err = configurer.apply_documents(&[first.clone(), second]).unwrap_err();

    let msg = format!("{:#}", err);
    assert!(msg.starts_with(first.as_str()), "expected document prefix, got: {}", msg);
    assert_eq!(target.calls(), vec![exec(&["false"])]);
}

#[test]
fn test_directory_cache_spans_documents() {
    let dir = tempdir().expect("failed to create temp dir");
    let first = write_document(
        &dir,
        "1.yaml",
        "#cloud-config\nwrite_files:\n  - path: /opt/app/etc/a\n    content: a\n",
    );
    let second = write_document(
        &dir,
        "2.yaml",
        "#cloud-config\nwrite_files:\n  - path: /opt/app/b\n    content: b\n",
    );
    let target = RecordingTarget::new();
    let mut configurer = Configurer::new(&target);

    configurer.apply_documents(&[first, second]).unwrap();

    assert_eq!(target.mkdir_count(), 1);
}
