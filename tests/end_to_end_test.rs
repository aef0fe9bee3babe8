use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn run_command(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_slides-creator"))
        .current_dir(dir)
        .env_remove("GOOGLE_SLIDES_CREDENTIALS")
        .env_remove("SLIDES_OUTPUT_DIR")
        .env("SPEAKERDECK_CREDENTIALS", dir.join("no-such-credentials.json"))
        .env("SLIDES_HTTP_TIMEOUT_MS", "500")
        .args(args)
        .output()
        .expect("Failed to execute command")
}

fn write_article(dir: &Path, name: &str) -> String {
    let code: Vec<String> = (1..=30).map(|i| format!("print({})", i)).collect();
    let content = format!(
        "# Async Patterns\n\n## Why Async Matters\n\nWaiting on the network wastes threads. Async lets one thread juggle many requests.\n\n## Example\n\n```python\n{}\n```\n\n## Conclusion\n\n- Use async for IO\n- Avoid blocking calls\n",
        code.join("\n")
    );
    let path = dir.join(name);
    fs::write(&path, content).expect("Failed to write article");
    path.to_string_lossy().into_owned()
}

#[test]
fn test_dry_run_prints_outline_and_writes_nothing() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let article = write_article(temp_dir.path(), "article.md");

    let output = run_command(temp_dir.path(), &["convert", &article, "--dry-run"]);
    assert!(output.status.success(), "Command failed: {:?}", output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Async Patterns (5 slides)"), "stdout: {}", stdout);
    assert!(stdout.contains("Example (continued)"));
    assert!(stdout.contains("Key Takeaways"));
    assert!(!temp_dir.path().join("presentations").exists());
}

#[test]
fn test_convert_writes_presentation_directory() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let article = write_article(temp_dir.path(), "article.md");

    let output = run_command(temp_dir.path(), &["convert", &article, "--output", "pptx"]);
    assert!(output.status.success(), "Command failed: {:?}", output);

    let deck_dir = temp_dir.path().join("presentations").join("async-patterns");
    for name in [
        "async-patterns.pptx",
        "speaker_notes.txt",
        "metadata.json",
        "article_snapshot.md",
        "plan_cache.json",
    ] {
        assert!(deck_dir.join(name).exists(), "missing {}", name);
    }

    let notes = fs::read_to_string(deck_dir.join("speaker_notes.txt")).unwrap();
    assert!(notes.starts_with("Async Patterns\nSpeaker Notes\n"));
    assert!(notes.contains("Slide 3: Example\n"));

    let metadata: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(deck_dir.join("metadata.json")).unwrap()).unwrap();
    assert_eq!(metadata["slideCount"], 5);
    assert_eq!(metadata["outputs"][0]["backend"], "pptx");
    assert_eq!(metadata["outputs"][0]["status"], "ok");
    assert_eq!(metadata["theme"]["maxCodeLinesPerSlide"], 18);

    let snapshot = fs::read_to_string(deck_dir.join("article_snapshot.md")).unwrap();
    assert_eq!(snapshot, fs::read_to_string(&article).unwrap());
}

#[test]
fn test_second_run_reuses_cached_plan() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let article = write_article(temp_dir.path(), "article.md");
    let out = temp_dir.path().join("out");
    let out = out.to_str().unwrap();

    let first = run_command(temp_dir.path(), &["convert", &article, "--output-dir", out]);
    assert!(first.status.success(), "Command failed: {:?}", first);
    assert!(!String::from_utf8_lossy(&first.stdout).contains("Reused cached slide plan"));

    let second = run_command(temp_dir.path(), &["convert", &article, "--output-dir", out]);
    assert!(second.status.success(), "Command failed: {:?}", second);
    assert!(String::from_utf8_lossy(&second.stdout).contains("Reused cached slide plan"));

    let forced = run_command(
        temp_dir.path(),
        &["convert", &article, "--output-dir", out, "--force-regenerate"],
    );
    assert!(forced.status.success(), "Command failed: {:?}", forced);
    assert!(!String::from_utf8_lossy(&forced.stdout).contains("Reused cached slide plan"));
}

#[test]
fn test_parse_error_exits_with_one() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("broken.md");
    fs::write(&path, "# One\n\n## Part\n\ntext\n\n# Two\n").unwrap();

    let output = run_command(temp_dir.path(), &["convert", path.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("line 7"), "stderr: {}", stderr);
}

#[test]
fn test_missing_file_exits_with_one() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let output = run_command(temp_dir.path(), &["convert", "does-not-exist.md"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_planning_error_exits_with_two() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let article = write_article(temp_dir.path(), "article.md");

    let output = run_command(
        temp_dir.path(),
        &["convert", &article, "--max-words-per-slide", "0"],
    );
    assert_eq!(output.status.code(), Some(2));

    let path = temp_dir.path().join("intro_only.md");
    fs::write(&path, "# Lonely\n\nJust an introduction.\n").unwrap();
    let output = run_command(temp_dir.path(), &["convert", path.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_failed_backends_exit_with_three_and_keep_pptx() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let article = write_article(temp_dir.path(), "article.md");

    let output = run_command(temp_dir.path(), &["convert", &article, "--output", "all"]);
    assert_eq!(output.status.code(), Some(3), "output: {:?}", output);

    let deck_dir = temp_dir.path().join("presentations").join("async-patterns");
    assert!(deck_dir.join("async-patterns.pptx").exists());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("google-slides: FAILED"), "stderr: {}", stderr);
    assert!(stderr.contains("speaker-deck: FAILED"), "stderr: {}", stderr);

    let metadata: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(deck_dir.join("metadata.json")).unwrap()).unwrap();
    let statuses: Vec<&str> = metadata["outputs"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["status"].as_str().unwrap())
        .collect();
    assert_eq!(statuses, vec!["ok", "error", "error"]);
}

#[test]
fn test_no_speaker_notes_flag() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let article = write_article(temp_dir.path(), "article.md");

    let output = run_command(temp_dir.path(), &["convert", &article, "--no-speaker-notes"]);
    assert!(output.status.success(), "Command failed: {:?}", output);

    let deck_dir = temp_dir.path().join("presentations").join("async-patterns");
    assert!(!deck_dir.join("speaker_notes.txt").exists());
    assert!(deck_dir.join("async-patterns.pptx").exists());
}
