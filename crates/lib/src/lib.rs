//! hashibuild-lib: manifest computation and archive lifecycle for hashibuild
//!
//! This crate provides the pieces behind a fingerprinted build cache:
//! - `manifest`: the ordered set of project files selected by ignore rules
//! - `fingerprint`: a stable identifier for a project's manifest state
//! - `store`: the local directory of fingerprinted zip archives
//! - `remote`: GET-based retrieval of prebuilt archives
//! - `build` / `archive` / `upload`: the miss path (build, zip, hand off)
//! - `vacuum`: operator-triggered pruning of the store
//! - `pipeline`: a single build invocation tying it all together

pub mod archive;
pub mod build;
pub mod config;
pub mod consts;
pub mod fingerprint;
pub mod manifest;
pub mod pipeline;
pub mod remote;
pub mod runner;
pub mod store;
pub mod store_lock;
pub mod upload;
pub mod util;
pub mod vacuum;
