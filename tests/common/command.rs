use crate::common::redirect_temp_dir;
use assert_cmd::Command;
use assert_fs::TempDir;
use rstest::fixture;
use std::path::Path;

const AUTHOR_NAME: &str = "Ada Lovelace";
const AUTHOR_EMAIL: &str = "ada@example.com";

#[fixture]
pub fn repository_dir() -> TempDir {
    redirect_temp_dir();
    TempDir::new().expect("Failed to create temp dir")
}

/// A repository created by git itself
#[fixture]
pub fn git_repository_dir(repository_dir: TempDir) -> TempDir {
    git(repository_dir.path(), &["init", "--quiet", "--initial-branch=master"]);
    repository_dir
}

pub fn run_bit_command(dir: &Path, args: &[&str]) -> Command {
    let mut bit_cmd = Command::cargo_bin("bit-odb").expect("Failed to find bit-odb binary");
    bit_cmd
        .current_dir(dir)
        .env_remove("GIT_DIR")
        .env("RUST_LOG", "off")
        .args(args);
    bit_cmd
}

pub fn git_command(dir: &Path, args: &[&str]) -> Command {
    let mut git_cmd = Command::new("git");
    git_cmd
        .current_dir(dir)
        .env_remove("GIT_DIR")
        .env("GIT_AUTHOR_NAME", AUTHOR_NAME)
        .env("GIT_AUTHOR_EMAIL", AUTHOR_EMAIL)
        .env("GIT_AUTHOR_DATE", "1700000000 +0200")
        .env("GIT_COMMITTER_NAME", AUTHOR_NAME)
        .env("GIT_COMMITTER_EMAIL", AUTHOR_EMAIL)
        .env("GIT_COMMITTER_DATE", "1700000000 +0200")
        .args(["-c", "commit.gpgsign=false", "-c", "tag.gpgsign=false"])
        .args(args);
    git_cmd
}

/// Run git, failing the test on a non-zero exit, and return its trimmed stdout
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = git_command(dir, args)
        .output()
        .expect("Failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );

    String::from_utf8_lossy(&output.stdout).trim_end().to_string()
}

/// Raw stdout of a successful git invocation
pub fn git_bytes(dir: &Path, args: &[&str]) -> Vec<u8> {
    let output = git_command(dir, args)
        .output()
        .expect("Failed to run git");
    assert!(output.status.success(), "git {args:?} failed");

    output.stdout
}

/// Raw stdout of a successful bit-odb invocation
pub fn bit_bytes(dir: &Path, args: &[&str]) -> Vec<u8> {
    let output = run_bit_command(dir, args)
        .output()
        .expect("Failed to run bit-odb");
    assert!(
        output.status.success(),
        "bit-odb {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );

    output.stdout
}

/// Commit `content` as `file_name` on the current branch
pub fn git_commit_file(dir: &Path, file_name: &str, content: &str, message: &str) -> String {
    std::fs::write(dir.join(file_name), content).expect("Failed to write file");
    git(dir, &["add", file_name]);
    git(dir, &["commit", "--quiet", "-m", message]);
    git(dir, &["rev-parse", "HEAD"])
}

/// A history whose blobs are near-copies of each other, so repacking deltifies them
pub fn build_history(dir: &Path, commits: usize) -> Vec<String> {
    let mut lines = (0..200)
        .map(|line| format!("line {line} of a file that changes a little in every commit"))
        .collect::<Vec<_>>();

    (0..commits)
        .map(|commit| {
            let len = lines.len();
            lines[commit * 7 % len] = format!("edited in commit {commit}");
            git_commit_file(dir, "notes.txt", &lines.join("\n"), &format!("commit {commit}"))
        })
        .collect()
}
