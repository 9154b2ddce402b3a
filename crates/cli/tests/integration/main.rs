mod common;

mod build_tests;
mod manifest_tests;
mod remote_tests;
mod vacuum_tests;
