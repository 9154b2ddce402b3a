mod build;
mod manifest;
mod vacuum;

pub use build::cmd_build;
pub use manifest::{cmd_manifest, cmd_treehash};
pub use vacuum::cmd_vacuum;
