use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn wsl_bin() -> &'static str {
    env!("CARGO_BIN_EXE_wsl")
}

fn test_temp_dir(tag: &str) -> PathBuf {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before epoch")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("wsl-cli-{tag}-{}-{ts}", std::process::id()));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn run_with_stdin(args: &[&str], stdin: &str) -> Output {
    let mut child = Command::new(wsl_bin())
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn wsl");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(stdin.as_bytes())
        .expect("write stdin");
    child.wait_with_output().expect("wait for wsl")
}

#[test]
fn cli_converts_named_file() {
    let dir = test_temp_dir("file");
    let path = dir.join("doc.xml");
    fs::write(&path, r#"<Root xmlns="urn:x"><ItemOne attrValue="5"/></Root>"#).expect("write xml");

    let output = Command::new(wsl_bin())
        .arg(&path)
        .stdin(Stdio::null())
        .output()
        .expect("run wsl");

    assert!(output.status.success());
    assert_eq!(
        String::from_utf8(output.stdout).unwrap(),
        " root ( wslns=\"urn:x\" ) {\n  item-one [ attr-value=\"5\" ]\n}"
    );
    fs::remove_dir_all(dir).ok();
}

#[test]
fn cli_converts_piped_stdin() {
    let output = run_with_stdin(&[], "<A/><B/>");

    assert!(output.status.success());
    assert_eq!(String::from_utf8(output.stdout).unwrap(), "a\nb\n");
}

#[test]
fn cli_missing_file_reports_missing_document() {
    let dir = test_temp_dir("missing");
    let path = dir.join("absent.xml");

    let output = Command::new(wsl_bin())
        .arg(&path)
        .stdin(Stdio::null())
        .output()
        .expect("run wsl");

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(String::from_utf8(output.stdout).unwrap(), "Missing document\n");
    fs::remove_dir_all(dir).ok();
}

#[test]
fn cli_parse_error_fails_without_output() {
    let output = run_with_stdin(&[], "<a><b></a>");

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("Error:"), "stderr: {stderr}");
}

#[test]
fn cli_crlf_in_attribute_value_becomes_space() {
    let dir = test_temp_dir("crlf");
    let path = dir.join("doc.xml");
    fs::write(&path, "<a v=\"x\r\ny\"/>").expect("write xml");

    let output = Command::new(wsl_bin())
        .arg(&path)
        .stdin(Stdio::null())
        .output()
        .expect("run wsl");

    assert!(output.status.success());
    assert_eq!(String::from_utf8(output.stdout).unwrap(), " a [ v=\"x y\" ]");
    fs::remove_dir_all(dir).ok();
}
