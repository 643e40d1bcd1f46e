//! CLI integration tests
use predicates::prelude::*;
use tempfile::TempDir;

fn cmd() -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("readcast");
    cmd.env_remove("GEMINI_API_KEY").env_remove("READCAST_DOWNLOAD_DIR");
    cmd
}

fn get_fixture_path(name: &str) -> String {
    format!("../../tests/fixtures/{}", name)
}

#[test]
fn test_cli_summarize_text_file() {
    cmd()
        .args(["summarize", &get_fixture_path("tom_tat_noi_dung.txt")])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Tóm tắt nội dung:"))
        .stdout(predicate::str::contains("- Chính phủ vừa công bố"))
        .stdout(predicate::str::contains("- Điều quan trọng"));
}

#[test]
fn test_cli_summarize_html_page() {
    cmd()
        .args(["summarize", &get_fixture_path("podcast_article.html")])
        .assert()
        .success()
        .stdout(predicate::str::contains("- Chính phủ vừa công bố"))
        .stdout(predicate::str::contains("Trang chủ").not());
}

#[test]
fn test_cli_summarize_stdin() {
    let text = std::fs::read_to_string(get_fixture_path("tom_tat_noi_dung.txt")).unwrap();
    cmd()
        .args(["summarize", "-"])
        .write_stdin(text)
        .assert()
        .success()
        .stdout(predicate::str::contains("Tóm tắt nội dung:"));
}

#[test]
fn test_cli_summarize_sentence_count() {
    let output = cmd()
        .args(["summarize", "-n", "3", &get_fixture_path("tom_tat_noi_dung.txt")])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout.lines().filter(|l| l.starts_with("- ")).count(), 3);
}

#[test]
fn test_cli_summarize_english_markers() {
    cmd()
        .args(["summarize", "--english-markers", &get_fixture_path("english_article.txt")])
        .assert()
        .success()
        .stdout(predicate::str::contains("- Importantly"));
}

#[test]
fn test_cli_summarize_json() {
    let output = cmd()
        .args(["summarize", "-f", "json", &get_fixture_path("podcast_article.html")])
        .output()
        .unwrap();

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["backend"], "local");
    assert_eq!(json["title"], "Tóm tắt nội dung - Podcast Thời sự");
    assert!(json["summary"].as_str().unwrap().starts_with("Tóm tắt nội dung:"));
}

#[test]
fn test_cli_summarize_output_file() {
    let tmp = TempDir::new().unwrap();
    let output = tmp.path().join("summary.txt");

    cmd()
        .args(["summarize", "-o", output.to_str().unwrap()])
        .arg(get_fixture_path("tom_tat_noi_dung.txt"))
        .assert()
        .success();

    assert!(std::fs::read_to_string(output).unwrap().contains("Tóm tắt nội dung:"));
}

#[test]
fn test_cli_summarize_empty_page() {
    cmd()
        .args(["summarize", &get_fixture_path("empty_page.html")])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No article text found"));
}

#[test]
fn test_cli_summarize_blank_input() {
    cmd().args(["summarize", "-"]).write_stdin("   \n").assert().failure();
}

#[test]
fn test_cli_invalid_file() {
    cmd().args(["summarize", "nonexistent.html"]).assert().failure();
}

#[test]
fn test_cli_invalid_format() {
    cmd()
        .args(["summarize", "-f", "markdown", &get_fixture_path("tom_tat_noi_dung.txt")])
        .assert()
        .failure();
}

#[test]
fn test_cli_media() {
    cmd()
        .args(["media", &get_fixture_path("podcast_article.html")])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("m4a\thttps://cdn.podcast.example.vn/2025/01/ban-tin-giao-thong.m4a"))
        .stdout(predicate::str::contains("hls\t"))
        .stdout(predicate::str::contains("mp3\thttps://cdn.podcast.example.vn/2025/01/ban-tin-giao-thong.mp3?v=2&src=web"));
}

#[test]
fn test_cli_media_json() {
    let output = cmd()
        .args(["media", "-f", "json", &get_fixture_path("podcast_article.html")])
        .output()
        .unwrap();

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let entries = json.as_array().unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[1]["kind"], "hls");
}

#[test]
fn test_cli_media_none_found() {
    cmd()
        .args(["media", &get_fixture_path("empty_page.html")])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No media found"));
}

#[test]
fn test_cli_articles_sample() {
    cmd().arg("articles").assert().success().stdout(predicate::str::contains("[1]"));
}

#[test]
fn test_cli_articles_catalog_json() {
    let output = cmd()
        .args(["articles", "-f", "json", "--catalog", &get_fixture_path("catalog.json")])
        .output()
        .unwrap();

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json.as_array().unwrap().len(), 2);
    assert_eq!(json[0]["articleUrl"], "https://podcast.example.vn/ban-tin-giao-thong-101.html");
}

#[test]
fn test_cli_articles_single() {
    cmd()
        .args(["articles", "--catalog", &get_fixture_path("catalog.json"), "--id", "102"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Thị trường chứng khoán tuần qua biến động mạnh với thanh khoản tăng cao."));
}

#[test]
fn test_cli_articles_unknown_id() {
    cmd()
        .args(["articles", "--catalog", &get_fixture_path("catalog.json"), "--id", "999"])
        .assert()
        .failure();
}

#[test]
fn test_cli_download_existing_file() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("audio_7.mp3"), b"ID3").unwrap();

    cmd()
        .args(["download", "https://cdn.example.vn/7.mp3", "--id", "7", "--dir"])
        .arg(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("audio_7.mp3"));
}

#[test]
fn test_cli_download_invalid_url() {
    let tmp = TempDir::new().unwrap();

    cmd()
        .args(["download", "not a url", "--id", "7", "--dir"])
        .arg(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Download failed"));

    assert!(!tmp.path().join("audio_7.mp3").exists());
}

#[test]
fn test_cli_verbose() {
    cmd()
        .args(["-v", "summarize", &get_fixture_path("tom_tat_noi_dung.txt")])
        .assert()
        .success()
        .stderr(predicate::str::contains("Readcast"));
}

#[test]
fn test_cli_logs_command_events() {
    cmd()
        .env_remove("READCAST_LOG")
        .args(["-v", "media", &get_fixture_path("podcast_article.html")])
        .assert()
        .success()
        .stderr(predicate::str::contains("media scan complete"));
}
