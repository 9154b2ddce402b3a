use predicates::prelude::*;

use hashibuild_lib::archive::list_entries;

use super::common::{PROJECT_NAME, TestEnv};

#[test]
fn first_build_creates_one_named_archive() {
  let env = TestEnv::new();

  env
    .build()
    .assert()
    .success()
    .stdout(predicate::str::contains("Zipping"));

  let files = env.archive_files();
  assert_eq!(files.len(), 1, "{files:?}");
  assert!(files[0].contains(PROJECT_NAME));

  let entries = list_entries(&env.archive_dir().join(&files[0])).unwrap();
  assert!(entries.iter().any(|e| e == "testfile.txt"), "{entries:?}");
  assert!(env.output_dir().join("testfile.txt").exists());
  assert_eq!(env.build_count(), 1);
}

#[test]
fn second_build_restores_without_zipping() {
  let env = TestEnv::new();
  env.build().assert().success();
  std::fs::remove_dir_all(env.output_dir()).unwrap();

  env
    .build()
    .assert()
    .success()
    .stdout(predicate::str::contains("Zipping").not())
    .stdout(predicate::str::contains("Unzip"));

  assert_eq!(env.archive_files().len(), 1);
  assert_eq!(env.build_count(), 1);
  assert!(env.output_dir().join("testfile.txt").exists());
}

#[cfg(unix)]
#[test]
fn output_inside_input_root_is_reused() {
  let env = TestEnv::new();
  env.write_file("test/subdir/testfile.txt", "test content\n");
  let config = serde_json::json!({
    "Name": PROJECT_NAME,
    "InputRoot": "test",
    "OutputDir": "test/out",
    "BuildCmd": "mkdir -p out && cp subdir/testfile.txt out/testfile.txt && echo built >> ../build.log",
  });
  let config_path = env.path().join("nested.json");
  std::fs::write(&config_path, config.to_string()).unwrap();

  let build = || {
    let mut cmd = env.archived_cmd();
    cmd.arg("--config").arg(&config_path).arg("--build");
    cmd
  };

  build()
    .assert()
    .success()
    .stdout(predicate::str::contains("Zipping"));
  build()
    .assert()
    .success()
    .stdout(predicate::str::contains("Zipping").not());

  assert_eq!(env.archive_files().len(), 1);
  assert_eq!(env.build_count(), 1);
  assert!(env.path().join("test/out/testfile.txt").exists());
}

#[test]
fn changing_an_input_rebuilds() {
  let env = TestEnv::new();
  env.build().assert().success();

  env.write_file("prj/subdir/testfile.txt", "changed content\n");
  env
    .build()
    .assert()
    .success()
    .stdout(predicate::str::contains("Zipping"));

  assert_eq!(env.archive_files().len(), 2);
  assert_eq!(env.build_count(), 2);
}

#[test]
fn changing_an_ignored_file_does_not_rebuild() {
  let env = TestEnv::new();
  env.build().assert().success();

  env.write_file("prj/ignored.txt", "edited\n");
  env.build().assert().success();

  assert_eq!(env.build_count(), 1);
}

#[test]
fn build_without_archive_dir_still_builds() {
  let env = TestEnv::new();

  env
    .cmd()
    .arg("--config")
    .arg(&env.config_path)
    .arg("--build")
    .assert()
    .success()
    .stdout(predicate::str::contains("Zipping").not());

  assert!(env.output_dir().join("testfile.txt").exists());
  assert!(!env.archive_dir().exists());
}

#[test]
fn failing_build_exits_non_zero_and_stores_nothing() {
  let env = TestEnv::with_build_cmd("echo compiler exploded && exit 3");

  env
    .build()
    .assert()
    .failure()
    .stderr(predicate::str::contains("Build failed"))
    .stderr(predicate::str::contains("compiler exploded"));

  assert!(env.archive_files().is_empty());
}

#[test]
fn missing_config_file_fails() {
  let env = TestEnv::new();

  env
    .archived_cmd()
    .args(["--config", "does-not-exist.json", "--build"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("Failed to load project config"));
}

#[test]
fn unsafe_project_name_is_rejected() {
  let env = TestEnv::new();
  env.write_file(
    "bad.json",
    r#"{"Name": "../escape", "InputRoot": "prj", "OutputDir": "out", "BuildCmd": "true"}"#,
  );

  env
    .archived_cmd()
    .args(["--config", "bad.json", "--build"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("invalid project name"));
}

#[test]
fn json_output_reports_status() {
  let env = TestEnv::new();

  env
    .build()
    .args(["-o", "json"])
    .assert()
    .success()
    .stdout(predicate::str::contains("\"status\": \"built\""))
    .stdout(predicate::str::contains("\"fingerprint\""));

  env
    .build()
    .args(["-o", "json"])
    .assert()
    .success()
    .stdout(predicate::str::contains("\"status\": \"local_hit\""));
}

#[test]
#[cfg(unix)]
fn uploader_receives_archive_path() {
  let env = TestEnv::new();
  let uploads = env.path().join("uploads");
  std::fs::create_dir_all(&uploads).unwrap();

  env
    .build()
    .env("HASHIBUILD_UPLOADER", format!("cp [ZIP] {}", uploads.display()))
    .assert()
    .success();

  let uploaded: Vec<_> = std::fs::read_dir(&uploads)
    .unwrap()
    .flatten()
    .map(|e| e.file_name().to_string_lossy().into_owned())
    .collect();
  assert_eq!(uploaded, env.archive_files());
}

#[test]
fn uploader_failure_is_a_warning() {
  let env = TestEnv::new();

  env
    .build()
    .env("HASHIBUILD_UPLOADER", "exit 9")
    .assert()
    .success()
    .stderr(predicate::str::contains("Upload failed"));

  assert_eq!(env.archive_files().len(), 1);
}
