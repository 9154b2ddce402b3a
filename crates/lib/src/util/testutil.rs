//! Test utilities for hashibuild-lib.
//!
//! Provides fakes for `CommandRunner` and `RemoteSource` so build, upload and
//! fetch paths can be tested without processes or a network, plus small
//! filesystem helpers.

use std::cell::RefCell;
use std::io;
use std::path::Path;

use crate::remote::{FetchMiss, RemoteSource};
use crate::runner::{CommandOutput, CommandRunner, Invocation};

type Handler = Box<dyn Fn(&Invocation) -> CommandOutput>;

/// A `CommandRunner` that records invocations and answers with a handler.
pub struct FakeRunner {
  calls: RefCell<Vec<Invocation>>,
  handler: Handler,
}

impl FakeRunner {
  pub fn new(handler: impl Fn(&Invocation) -> CommandOutput + 'static) -> Self {
    Self {
      calls: RefCell::new(Vec::new()),
      handler: Box::new(handler),
    }
  }

  /// Every invocation exits 0 with no output.
  pub fn succeeding() -> Self {
    Self::new(|_| exit_with(0))
  }

  /// Every invocation exits with `code`.
  pub fn failing(code: i32) -> Self {
    Self::new(move |_| exit_with(code))
  }

  pub fn calls(&self) -> Vec<Invocation> {
    self.calls.borrow().clone()
  }

  pub fn call_count(&self) -> usize {
    self.calls.borrow().len()
  }

  /// Scripts of all recorded shell invocations, in call order.
  pub fn scripts(&self) -> Vec<String> {
    self
      .calls
      .borrow()
      .iter()
      .filter_map(|call| call.script().map(str::to_string))
      .collect()
  }
}

impl CommandRunner for FakeRunner {
  fn run(&self, invocation: &Invocation) -> io::Result<CommandOutput> {
    self.calls.borrow_mut().push(invocation.clone());
    Ok((self.handler)(invocation))
  }
}

/// A `RemoteSource` that answers every request with the same response.
pub struct StaticRemote {
  response: Result<Vec<u8>, FetchMiss>,
  requested: RefCell<Vec<String>>,
}

impl StaticRemote {
  pub fn new(response: Result<Vec<u8>, FetchMiss>) -> Self {
    Self {
      response,
      requested: RefCell::new(Vec::new()),
    }
  }

  /// Every request fails as if the network were down.
  pub fn offline() -> Self {
    Self::new(Err(FetchMiss::Transport("offline".to_string())))
  }

  pub fn requested(&self) -> Vec<String> {
    self.requested.borrow().clone()
  }
}

impl RemoteSource for StaticRemote {
  fn get(&self, url: &str) -> Result<Vec<u8>, FetchMiss> {
    self.requested.borrow_mut().push(url.to_string());
    self.response.clone()
  }
}

pub fn exit_with(code: i32) -> CommandOutput {
  CommandOutput {
    code: Some(code),
    stdout: String::new(),
    stderr: String::new(),
  }
}

/// Write a file relative to `root`, creating parent directories.
pub fn write_file(root: &Path, relative_path: &str, content: &str) {
  let path = root.join(relative_path);
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent).unwrap();
  }
  std::fs::write(&path, content).unwrap();
}
