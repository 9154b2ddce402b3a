use mockito::Matcher;
use predicates::prelude::*;

use hashibuild_lib::archive::create_archive;

use super::common::TestEnv;

const ARCHIVE_PATH: &str = r"^/cache/hashibuildtest-[0-9a-f]{20}\.zip$";

/// Zip bytes for an output directory holding `testfile.txt`.
fn prebuilt_archive(env: &TestEnv) -> Vec<u8> {
  env.write_file("prebuilt/testfile.txt", "from the mirror\n");
  let staged = create_archive(&env.path().join("prebuilt"), env.path()).unwrap();
  std::fs::read(staged.path()).unwrap()
}

#[test]
fn remote_hit_skips_build() {
  let env = TestEnv::with_build_cmd("exit 1");
  let body = prebuilt_archive(&env);

  let mut server = mockito::Server::new();
  let mock = server
    .mock("GET", Matcher::Regex(ARCHIVE_PATH.to_string()))
    .with_status(200)
    .with_body(body)
    .create();

  env
    .build()
    .env("HASHIBUILD_ARCHIVE_REMOTE", format!("{}/cache/[ZIP]", server.url()))
    .assert()
    .success()
    .stdout(predicate::str::contains("Zipping").not());

  mock.assert();
  assert_eq!(
    std::fs::read_to_string(env.output_dir().join("testfile.txt")).unwrap(),
    "from the mirror\n"
  );
  assert_eq!(env.archive_files().len(), 1);
}

#[test]
fn remote_hit_without_archive_dir() {
  let env = TestEnv::with_build_cmd("exit 1");
  let body = prebuilt_archive(&env);

  let mut server = mockito::Server::new();
  let _mock = server
    .mock("GET", Matcher::Regex(ARCHIVE_PATH.to_string()))
    .with_body(body)
    .create();

  env
    .cmd()
    .arg("--config")
    .arg(&env.config_path)
    .arg("--build")
    .env("HASHIBUILD_ARCHIVE_REMOTE", format!("{}/cache/[ZIP]", server.url()))
    .assert()
    .success();

  assert!(env.output_dir().join("testfile.txt").exists());
  assert!(!env.archive_dir().exists());
}

#[test]
fn remote_miss_falls_back_to_build() {
  let env = TestEnv::new();

  let mut server = mockito::Server::new();
  let _mock = server
    .mock("GET", Matcher::Regex(ARCHIVE_PATH.to_string()))
    .with_status(404)
    .create();

  env
    .build()
    .env("HASHIBUILD_ARCHIVE_REMOTE", format!("{}/cache/[ZIP]", server.url()))
    .assert()
    .success()
    .stdout(predicate::str::contains("Zipping"));

  assert_eq!(env.build_count(), 1);
}

#[test]
fn malformed_remote_body_falls_back_to_build() {
  let env = TestEnv::new();

  let mut server = mockito::Server::new();
  let _mock = server
    .mock("GET", Matcher::Regex(ARCHIVE_PATH.to_string()))
    .with_body("<html>sign in</html>")
    .create();

  env
    .build()
    .env("HASHIBUILD_ARCHIVE_REMOTE", format!("{}/cache/[ZIP]", server.url()))
    .assert()
    .success();

  assert_eq!(env.build_count(), 1);
  let entries = hashibuild_lib::archive::list_entries(&env.archive_dir().join(&env.archive_files()[0])).unwrap();
  assert!(entries.iter().any(|e| e == "testfile.txt"));
}
