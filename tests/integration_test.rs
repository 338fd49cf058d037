use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Helper to get the promptcode binary for testing
fn promptcode_cmd() -> Command {
    Command::new(env!("CARGO_BIN_EXE_promptcode"))
}

/// Helper to create a temp file with content
fn create_test_file(dir: &Path, path: &str, content: &str) {
    let file_path = dir.join(path);
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(file_path, content).unwrap();
}

/// A small TypeScript project used by most tests
fn ts_project() -> TempDir {
    let temp = TempDir::new().unwrap();
    create_test_file(temp.path(), "package.json", "{\"name\": \"demo\"}\n");
    create_test_file(temp.path(), "README.md", "# Demo\n");
    create_test_file(temp.path(), "src/index.ts", "export * from './utils';\n");
    create_test_file(temp.path(), "src/app.css", "body { margin: 0; }\n");
    create_test_file(temp.path(), "src/utils/a.ts", "export const a = 1;\n");
    create_test_file(temp.path(), "src/utils/b.ts", "export const b = 2;\n");
    create_test_file(temp.path(), "src/utils/c.ts", "export const c = 3;\n");
    temp
}

fn run_preset(root: &Path, args: &[&str]) -> assert_cmd::assert::Assert {
    promptcode_cmd()
        .arg("preset")
        .args(args)
        .arg("--root")
        .arg(root)
        .assert()
}

// ============================================================================
// Basic Functionality Tests
// ============================================================================

#[test]
fn test_help_command() {
    promptcode_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Build AI prompts"));
}

#[test]
fn test_version_command() {
    promptcode_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("promptcode"));
}

#[test]
fn test_generate_everything() {
    let temp = ts_project();

    promptcode_cmd()
        .arg("generate")
        .arg(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("<file_tree>"))
        .stdout(predicate::str::contains("<file path=\"src/utils/a.ts\">"))
        .stdout(predicate::str::contains("export const a = 1;"))
        .stdout(predicate::str::contains("<file path=\"package.json\">"))
        .stdout(predicate::str::contains("Matched files: 7"))
        .stdout(predicate::str::contains("Estimated tokens:"));
}

#[test]
fn test_missing_root_fails() {
    let temp = TempDir::new().unwrap();

    promptcode_cmd()
        .arg("generate")
        .arg(temp.path().join("does-not-exist"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("root directory not found"));
}

// ============================================================================
// Pattern Filter Tests
// ============================================================================

#[test]
fn test_include_filter() {
    let temp = ts_project();

    promptcode_cmd()
        .arg("generate")
        .arg(temp.path())
        .args(["--include", "src/**/*.ts"])
        .assert()
        .success()
        .stdout(predicate::str::contains("<file path=\"src/index.ts\">"))
        .stdout(predicate::str::contains("<file path=\"src/utils/c.ts\">"))
        .stdout(predicate::str::contains("app.css").not())
        .stdout(predicate::str::contains("package.json").not());
}

#[test]
fn test_exclude_filter() {
    let temp = ts_project();

    promptcode_cmd()
        .arg("generate")
        .arg(temp.path())
        .args(["--include", "src/**", "--exclude", "src/utils"])
        .assert()
        .success()
        .stdout(predicate::str::contains("<file path=\"src/index.ts\">"))
        .stdout(predicate::str::contains("<file path=\"src/app.css\">"))
        .stdout(predicate::str::contains("src/utils/a.ts").not());
}

#[test]
fn test_star_does_not_cross_directories() {
    let temp = ts_project();

    promptcode_cmd()
        .arg("generate")
        .arg(temp.path())
        .args(["--include", "src/*.ts", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("src/index.ts"))
        .stdout(predicate::str::contains("src/utils/a.ts").not());
}

#[test]
fn test_patterns_file_with_invalid_line() {
    let temp = ts_project();
    let patterns = TempDir::new().unwrap();
    create_test_file(patterns.path(), "select.txt", "# docs\nsrc/[broken\nREADME.md\n");

    promptcode_cmd()
        .arg("generate")
        .arg(temp.path())
        .arg("--patterns")
        .arg(patterns.path().join("select.txt"))
        .assert()
        .success()
        .stdout(predicate::str::contains("<file path=\"README.md\">"))
        .stdout(predicate::str::contains("src/index.ts").not())
        .stderr(predicate::str::contains("line 2: invalid pattern `src/[broken`"));
}

#[test]
fn test_only_invalid_includes_select_nothing() {
    let temp = ts_project();
    create_test_file(temp.path(), ".promptcode/presets/typo.patterns", "src/[oops\n");

    promptcode_cmd()
        .arg("generate")
        .arg(temp.path())
        .args(["--preset", "typo"])
        .assert()
        .code(3)
        .stdout(predicate::str::contains("<file path=").not())
        .stderr(predicate::str::contains("every include pattern was invalid"));
}

#[test]
fn test_absolute_pattern_rejected() {
    let temp = ts_project();

    promptcode_cmd()
        .arg("generate")
        .arg(temp.path())
        .args(["--include", "/etc/passwd", "--include", "README.md"])
        .assert()
        .success()
        .stdout(predicate::str::contains("<file path=\"README.md\">"))
        .stderr(predicate::str::contains("absolute paths are not allowed"));
}

// ============================================================================
// Gitignore, Hidden and Binary File Tests
// ============================================================================

#[test]
fn test_gitignore_respected() {
    let temp = ts_project();
    create_test_file(temp.path(), ".gitignore", "secret.txt\nlogs/\n");
    create_test_file(temp.path(), "secret.txt", "PASSWORD=hunter2\n");
    create_test_file(temp.path(), "logs/run.log", "started\n");

    promptcode_cmd()
        .arg("generate")
        .arg(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("hunter2").not())
        .stdout(predicate::str::contains("run.log").not());
}

#[test]
fn test_no_gitignore_flag() {
    let temp = ts_project();
    create_test_file(temp.path(), ".gitignore", "secret.txt\n");
    create_test_file(temp.path(), "secret.txt", "PASSWORD=hunter2\n");

    promptcode_cmd()
        .arg("generate")
        .arg(temp.path())
        .arg("--no-gitignore")
        .assert()
        .success()
        .stdout(predicate::str::contains("hunter2"));
}

#[test]
fn test_literal_path_reaches_gitignored_file() {
    let temp = ts_project();
    create_test_file(temp.path(), ".gitignore", "secret.txt\n");
    create_test_file(temp.path(), "secret.txt", "PASSWORD=hunter2\n");

    promptcode_cmd()
        .arg("generate")
        .arg(temp.path())
        .args(["--include", "secret.txt"])
        .assert()
        .success()
        .stdout(predicate::str::contains("hunter2"));
}

#[test]
fn test_hidden_files() {
    let temp = ts_project();
    create_test_file(temp.path(), ".env", "API_KEY=abc123\n");

    promptcode_cmd()
        .arg("generate")
        .arg(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("abc123").not());

    promptcode_cmd()
        .arg("generate")
        .arg(temp.path())
        .arg("--hidden")
        .assert()
        .success()
        .stdout(predicate::str::contains("abc123"));
}

#[test]
fn test_binary_files_skipped() {
    let temp = ts_project();
    create_test_file(temp.path(), "assets/logo.png", "not really a png");

    promptcode_cmd()
        .arg("generate")
        .arg(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("<file path=\"assets/logo.png\">").not())
        .stdout(predicate::str::contains("1 binary"))
        .stderr(predicate::str::contains("Skipping assets/logo.png: binary"));
}

#[test]
fn test_large_files_skipped() {
    let temp = ts_project();
    create_test_file(temp.path(), "big.txt", &"x".repeat(4096));

    promptcode_cmd()
        .arg("generate")
        .arg(temp.path())
        .args(["--max-size", "1024"])
        .assert()
        .success()
        .stdout(predicate::str::contains("<file path=\"big.txt\">").not())
        .stdout(predicate::str::contains("1 too large"));
}

#[cfg(unix)]
#[test]
fn test_symlink_outside_root_not_followed() {
    let temp = ts_project();
    let outside = TempDir::new().unwrap();
    create_test_file(outside.path(), "leak.txt", "outside the root\n");
    std::os::unix::fs::symlink(outside.path(), temp.path().join("linked")).unwrap();

    promptcode_cmd()
        .arg("generate")
        .arg(temp.path())
        .arg("--follow-symlinks")
        .assert()
        .success()
        .stdout(predicate::str::contains("outside the root").not());
}

// ============================================================================
// Output Mode Tests
// ============================================================================

#[test]
fn test_dry_run_mode() {
    let temp = ts_project();

    promptcode_cmd()
        .arg("generate")
        .arg(temp.path())
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(predicate::str::contains("src/utils/b.ts"))
        .stdout(predicate::str::contains("<file path=").not())
        .stdout(predicate::str::contains("<summary>"));
}

#[test]
fn test_stats_mode() {
    let temp = ts_project();

    promptcode_cmd()
        .arg("generate")
        .arg(temp.path())
        .arg("--stats")
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Matched files: 7"))
        .stderr(predicate::str::contains("Included: 7"));
}

#[test]
fn test_output_to_file() {
    let temp = ts_project();
    let out_dir = TempDir::new().unwrap();
    let out_file = out_dir.path().join("prompt.txt");

    promptcode_cmd()
        .arg("generate")
        .arg(temp.path())
        .arg("-o")
        .arg(&out_file)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let written = fs::read_to_string(&out_file).unwrap();
    assert!(written.contains("<file path=\"src/index.ts\">"));
    assert!(written.contains("</summary>"));
}

#[test]
fn test_instructions_block() {
    let temp = ts_project();

    promptcode_cmd()
        .arg("generate")
        .arg(temp.path())
        .args(["--include", "README.md", "--instructions", "Review the docs"])
        .assert()
        .success()
        .stdout(predicate::str::contains("<instructions>\nReview the docs\n</instructions>"));
}

#[test]
fn test_instructions_file() {
    let temp = ts_project();
    let notes = TempDir::new().unwrap();
    create_test_file(notes.path(), "ask.md", "Find the bug.\n");

    promptcode_cmd()
        .arg("generate")
        .arg(temp.path())
        .args(["--include", "README.md", "--instructions-file"])
        .arg(notes.path().join("ask.md"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Find the bug."));
}

#[test]
fn test_xml_escaping_in_paths() {
    let temp = TempDir::new().unwrap();
    create_test_file(temp.path(), "a&b.txt", "amp\n");

    promptcode_cmd()
        .arg("generate")
        .arg(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("<file path=\"a&amp;b.txt\">"));
}

// ============================================================================
// Exit Code Tests
// ============================================================================

#[test]
fn test_no_files_matched_exit_code() {
    let temp = ts_project();

    promptcode_cmd()
        .arg("generate")
        .arg(temp.path())
        .args(["--include", "**/*.nothing"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("No files matched the criteria"));
}

#[test]
fn test_conflicting_sources_rejected() {
    let temp = ts_project();

    promptcode_cmd()
        .arg("generate")
        .arg(temp.path())
        .args(["--preset", "any", "--include", "*.md"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

// ============================================================================
// Preset Tests
// ============================================================================

#[test]
fn test_preset_create_default_template() {
    let temp = ts_project();

    run_preset(temp.path(), &["create", "starter"])
        .success()
        .stdout(predicate::str::contains("Created preset 'starter'"));

    assert!(temp
        .path()
        .join(".promptcode/presets/starter.patterns")
        .is_file());

    run_preset(temp.path(), &["show", "starter"])
        .success()
        .stdout(predicate::str::contains("!node_modules/**"));
}

#[test]
fn test_preset_create_from_files() {
    let temp = ts_project();

    run_preset(
        temp.path(),
        &[
            "create",
            "utils",
            "--from-files",
            "src/index.ts",
            "src/utils/a.ts",
            "src/utils/b.ts",
            "src/utils/c.ts",
        ],
    )
    .success();

    run_preset(temp.path(), &["show", "utils"])
        .success()
        .stdout(predicate::str::contains("src/utils/**\nsrc/index.ts\n"));

    run_preset(temp.path(), &["files", "utils"])
        .success()
        .stdout("src/index.ts\nsrc/utils/a.ts\nsrc/utils/b.ts\nsrc/utils/c.ts\n");
}

#[test]
fn test_preset_create_from_glob() {
    let temp = ts_project();

    run_preset(temp.path(), &["create", "ts", "--from-files", "src/**/*.ts"]).success();

    run_preset(temp.path(), &["files", "ts"])
        .success()
        .stdout("src/index.ts\nsrc/utils/a.ts\nsrc/utils/b.ts\nsrc/utils/c.ts\n");
}

#[test]
fn test_preset_create_rejects_paths_outside_root() {
    let temp = ts_project();

    run_preset(temp.path(), &["create", "outside", "--from-files", "../outside.rs"])
        .failure()
        .stderr(predicate::str::contains("None of the selected paths are inside"));

    assert!(!temp
        .path()
        .join(".promptcode/presets/outside.patterns")
        .exists());
}

#[test]
fn test_preset_create_from_absolute_paths_with_default_root() {
    let temp = ts_project();
    let root = dunce::canonicalize(temp.path()).unwrap();

    promptcode_cmd()
        .current_dir(&root)
        .args(["preset", "create", "abs", "--from-files"])
        .arg(root.join("src/index.ts"))
        .arg(root.join("README.md"))
        .assert()
        .success();

    promptcode_cmd()
        .current_dir(&root)
        .args(["preset", "files", "abs"])
        .assert()
        .success()
        .stdout("README.md\nsrc/index.ts\n");
}

#[test]
fn test_preset_create_refuses_overwrite() {
    let temp = ts_project();

    run_preset(temp.path(), &["create", "dup"]).success();
    run_preset(temp.path(), &["create", "dup"])
        .failure()
        .stderr(predicate::str::contains("already exists"));
    run_preset(temp.path(), &["create", "dup", "--force"]).success();
}

#[test]
fn test_preset_optimize() {
    let temp = ts_project();
    create_test_file(
        temp.path(),
        ".promptcode/presets/verbose.patterns",
        "src/utils/a.ts\nsrc/utils/b.ts\nsrc/utils/c.ts\nREADME.md\n",
    );

    run_preset(temp.path(), &["optimize", "verbose"])
        .success()
        .stdout("src/utils/**\nREADME.md\n")
        .stderr(predicate::str::contains("4 file(s) selected before and after"));

    // Without --write the preset is untouched
    run_preset(temp.path(), &["show", "verbose"])
        .success()
        .stdout(predicate::str::contains("src/utils/a.ts"));

    run_preset(temp.path(), &["optimize", "verbose", "--write"]).success();
    run_preset(temp.path(), &["show", "verbose"])
        .success()
        .stdout(predicate::str::contains("src/utils/a.ts").not())
        .stdout(predicate::str::contains("src/utils/**"));
}

#[test]
fn test_preset_list() {
    let temp = ts_project();

    run_preset(temp.path(), &["list"])
        .success()
        .stderr(predicate::str::contains("No presets found"));

    run_preset(temp.path(), &["create", "beta"]).success();
    run_preset(temp.path(), &["create", "alpha"]).success();

    run_preset(temp.path(), &["list"])
        .success()
        .stdout("alpha\nbeta\n");
}

#[test]
fn test_preset_not_found() {
    let temp = ts_project();

    run_preset(temp.path(), &["show", "missing"])
        .failure()
        .stderr(predicate::str::contains("preset 'missing' not found"));
}

#[test]
fn test_generate_from_preset() {
    let temp = ts_project();
    create_test_file(
        temp.path(),
        ".promptcode/presets/docs.patterns",
        "# docs only\n*.md\npackage.json\n",
    );

    promptcode_cmd()
        .arg("generate")
        .arg(temp.path())
        .args(["--preset", "docs"])
        .assert()
        .success()
        .stdout(predicate::str::contains("<file path=\"README.md\">"))
        .stdout(predicate::str::contains("<file path=\"package.json\">"))
        .stdout(predicate::str::contains("src/index.ts").not());
}

#[test]
fn test_generate_from_preset_with_exclude() {
    let temp = ts_project();
    create_test_file(temp.path(), ".promptcode/presets/src.patterns", "src/**\n");

    promptcode_cmd()
        .arg("generate")
        .arg(temp.path())
        .args(["--preset", "src", "--exclude", "**/*.css", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("src/index.ts"))
        .stdout(predicate::str::contains("app.css").not());
}
