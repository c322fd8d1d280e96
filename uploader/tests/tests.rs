//! End-to-end runs of the `uploader` binary: offline dry-runs and full
//! sync passes against a mock WebDAV server.

use predicates::prelude::*;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

fn uploader(workdir: &std::path::Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::cargo_bin("uploader").unwrap();
    cmd.current_dir(workdir);
    cmd.env_remove("MAILRU_EMAIL");
    cmd.env_remove("MAILRU_APP_PASSWORD");
    cmd
}

fn setup_source(root: &std::path::Path) -> std::path::PathBuf {
    // p
    // |- notes.txt
    // |- photo.jpg
    // |- album
    //    |- shot.jpg
    // |- .git            (excluded by default)
    //    |- HEAD
    let source = root.join("p");
    std::fs::create_dir(&source).unwrap();
    std::fs::write(source.join("notes.txt"), "some notes").unwrap();
    std::fs::write(source.join("photo.jpg"), "jpeg bytes").unwrap();
    let album = source.join("album");
    std::fs::create_dir(&album).unwrap();
    std::fs::write(album.join("shot.jpg"), "more jpeg bytes").unwrap();
    let git = source.join(".git");
    std::fs::create_dir(&git).unwrap();
    std::fs::write(git.join("HEAD"), "ref: refs/heads/main").unwrap();
    source
}

#[test]
fn dry_run_reports_planned_actions_and_writes_a_log() {
    let dir = tempfile::tempdir().unwrap();
    let source = setup_source(dir.path());

    uploader(dir.path())
        .args(["--dry-run", "--source"])
        .arg(&source)
        .assert()
        .success()
        .stdout(predicate::str::contains("dry-run: would upload notes.txt"))
        .stdout(predicate::str::contains("dry-run: would delete local photo.jpg"))
        .stdout(predicate::str::contains("remote checks are disabled"));

    // nothing was touched locally
    assert!(source.join("photo.jpg").exists());
    assert!(source.join("album").join("shot.jpg").exists());

    // one log file per day under logs/
    let logs: Vec<_> = std::fs::read_dir(dir.path().join("logs"))
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(logs.len(), 1);
    assert!(is_daily_log_name(&logs[0]), "unexpected log file name: {:?}", logs[0]);
}

// YYYY-MM-DD.log
fn is_daily_log_name(name: &str) -> bool {
    let bytes = name.as_bytes();
    name.len() == 14
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && name.ends_with(".log")
        && name[..10]
            .chars()
            .enumerate()
            .all(|(i, c)| matches!(i, 4 | 7) || c.is_ascii_digit())
}

#[tokio::test(flavor = "multi_thread")]
async fn sync_uploads_and_removes_jpgs() {
    let dir = tempfile::tempdir().unwrap();
    let source = setup_source(dir.path());

    let server = MockServer::start().await;
    Mock::given(method("PROPFIND"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("MKCOL"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    let workdir = dir.path().to_path_buf();
    let source_arg = source.clone();
    let base_url = server.uri();
    tokio::task::spawn_blocking(move || {
        uploader(&workdir)
            .args(["--email", "user@example.com", "--app-password", "secret"])
            .args(["--threads", "4"])
            .args(["--base-url", &base_url])
            .arg("--source")
            .arg(&source_arg)
            .assert()
            .success()
            .stdout(predicate::str::contains("uploaded notes.txt"))
            .stdout(predicate::str::contains("files uploaded: 3"))
            .stdout(predicate::str::contains("files deleted (jpg): 2"));
    })
    .await
    .unwrap();

    // jpgs are gone, everything else stays
    assert!(!source.join("photo.jpg").exists());
    assert!(!source.join("album").join("shot.jpg").exists());
    assert!(source.join("notes.txt").exists());
    assert!(source.join(".git").join("HEAD").exists());

    // the excluded .git tree generated no remote traffic
    let requests = server.received_requests().await.unwrap();
    assert!(requests.iter().all(|request| !request.url.path().contains(".git")));
}

#[tokio::test(flavor = "multi_thread")]
async fn failing_uploads_exit_nonzero_and_keep_files() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("p");
    std::fs::create_dir(&source).unwrap();
    std::fs::write(source.join("photo.jpg"), "jpeg bytes").unwrap();

    let server = MockServer::start().await;
    Mock::given(method("PROPFIND"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("MKCOL"))
        .respond_with(ResponseTemplate::new(405))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(507))
        .mount(&server)
        .await;

    let workdir = dir.path().to_path_buf();
    let source_arg = source.clone();
    let base_url = server.uri();
    tokio::task::spawn_blocking(move || {
        uploader(&workdir)
            .args(["--email", "user@example.com", "--app-password", "secret"])
            .args(["--base-url", &base_url])
            .arg("--source")
            .arg(&source_arg)
            .assert()
            .failure()
            .code(1)
            .stderr(predicate::str::contains("PUT failed"));
    })
    .await
    .unwrap();

    assert!(source.join("photo.jpg").exists());
}
