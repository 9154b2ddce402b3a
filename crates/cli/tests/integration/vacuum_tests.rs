use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn vacuum_after_build_empties_archive_dir() {
  let env = TestEnv::new();
  env.build().assert().success();
  assert_eq!(env.archive_files().len(), 1);

  env
    .archived_cmd()
    .arg("--vacuum")
    .assert()
    .success()
    .stdout(predicate::str::contains("Vacuum complete"));

  assert!(env.archive_files().is_empty());
}

#[test]
fn vacuum_of_missing_archive_dir_succeeds() {
  let env = TestEnv::new();

  env.archived_cmd().arg("--vacuum").assert().success();
}

#[test]
fn vacuum_requires_archive_dir() {
  let env = TestEnv::new();

  env
    .cmd()
    .arg("--vacuum")
    .assert()
    .failure()
    .stderr(predicate::str::contains("HASHIBUILD_ARCHIVE"));
}

#[test]
fn vacuum_dry_run_keeps_archives() {
  let env = TestEnv::new();
  env.build().assert().success();

  env
    .archived_cmd()
    .args(["--vacuum", "--dry-run"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Dry run"));

  assert_eq!(env.archive_files().len(), 1);
}

#[test]
fn vacuum_keep_latest_keeps_current_archive() {
  let env = TestEnv::new();
  env.build().assert().success();
  env.write_file("prj/subdir/testfile.txt", "second version\n");
  env.build().assert().success();
  assert_eq!(env.archive_files().len(), 2);

  env.archived_cmd().args(["--vacuum", "--keep", "5"]).assert().success();
  assert_eq!(env.archive_files().len(), 2);

  env.archived_cmd().args(["--vacuum", "--keep", "1"]).assert().success();
  assert_eq!(env.archive_files().len(), 1);
}

#[test]
fn vacuum_older_than_spares_fresh_archives() {
  let env = TestEnv::new();
  env.build().assert().success();

  env
    .archived_cmd()
    .args(["--vacuum", "--older-than", "1h"])
    .assert()
    .success();

  assert_eq!(env.archive_files().len(), 1);
}

#[test]
fn vacuum_json_output_is_valid() {
  let env = TestEnv::new();

  env
    .archived_cmd()
    .args(["--vacuum", "-o", "json"])
    .assert()
    .success()
    .stdout(predicate::str::contains("archives_deleted"))
    .stdout(predicate::str::contains("deleted_paths"));
}
