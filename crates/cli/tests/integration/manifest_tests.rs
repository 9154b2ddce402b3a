use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn manifest_lists_inputs_and_skips_ignored() {
  let env = TestEnv::new();

  env
    .cmd()
    .arg("--config")
    .arg(&env.config_path)
    .arg("--manifest")
    .assert()
    .success()
    .stdout(predicate::str::contains("buildsomething.cmd"))
    .stdout(predicate::str::contains("subdir/testfile.txt"))
    .stdout(predicate::str::contains("ignored.txt").not());
}

#[test]
fn verbose_manifest_shows_total() {
  let env = TestEnv::new();

  env
    .cmd()
    .arg("--config")
    .arg(&env.config_path)
    .args(["--manifest", "-v"])
    .assert()
    .success()
    .stdout(predicate::str::is_match(r"(?m)^Total: [0-9a-f]{20}$").unwrap());
}

#[test]
fn manifest_is_stable_across_runs() {
  let env = TestEnv::new();
  let run = || {
    env
      .cmd()
      .arg("--config")
      .arg(&env.config_path)
      .args(["--manifest", "-v"])
      .output()
      .unwrap()
      .stdout
  };

  assert_eq!(run(), run());
}

#[test]
fn manifest_json_lists_files() {
  let env = TestEnv::new();

  let output = env
    .cmd()
    .arg("--config")
    .arg(&env.config_path)
    .args(["--manifest", "-o", "json"])
    .output()
    .unwrap();
  assert!(output.status.success());

  let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  let paths: Vec<_> = report["files"]
    .as_array()
    .unwrap()
    .iter()
    .map(|f| f["path"].as_str().unwrap().to_string())
    .collect();
  assert_eq!(paths, vec!["buildsomething.cmd", "subdir/testfile.txt"]);
}

#[test]
fn manifest_requires_config() {
  let env = TestEnv::new();

  env.cmd().arg("--manifest").assert().failure();
}

#[test]
fn manifest_with_missing_root_fails() {
  let env = TestEnv::new();
  std::fs::remove_dir_all(env.path().join("prj")).unwrap();

  env
    .cmd()
    .arg("--config")
    .arg(&env.config_path)
    .arg("--manifest")
    .assert()
    .failure()
    .stderr(predicate::str::contains("input root does not exist"));
}

#[test]
fn treehash_uses_default_ignores() {
  let env = TestEnv::new();
  env.write_file("tree/src/main.rs", "fn main() {}\n");
  env.write_file("tree/.git/HEAD", "ref: refs/heads/main\n");
  env.write_file("tree/node_modules/left-pad/index.js", "\n");

  env
    .cmd()
    .args(["--treehash", "tree", "-v"])
    .assert()
    .success()
    .stdout(predicate::str::contains("src/main.rs"))
    .stdout(predicate::str::contains(".git").not())
    .stdout(predicate::str::contains("node_modules").not())
    .stdout(predicate::str::contains("Total: "));
}
