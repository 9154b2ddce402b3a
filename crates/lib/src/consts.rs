pub const APP_NAME: &str = "hashibuild";

/// Extension of every archive in the store.
pub const ARCHIVE_EXTENSION: &str = "zip";

/// Number of hex characters kept from the SHA-256 when fingerprinting.
pub const FINGERPRINT_LEN: usize = 20;

/// Token replaced by the archive filename (remote) or archive path (uploader).
pub const ZIP_PLACEHOLDER: &str = "[ZIP]";

/// Prefix of in-progress files; never listed as archives.
pub const STAGING_PREFIX: &str = ".hashibuild-";

pub const ENV_ARCHIVE: &str = "HASHIBUILD_ARCHIVE";
pub const ENV_UPLOADER: &str = "HASHIBUILD_UPLOADER";
pub const ENV_ARCHIVE_REMOTE: &str = "HASHIBUILD_ARCHIVE_REMOTE";

/// Ignores applied by `--treehash`, which runs without a project config.
pub const DEFAULT_TREE_IGNORES: &[&str] = &[".git", "node_modules"];
