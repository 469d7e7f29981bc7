//! Build metadata embedded by the build script.

/// Short git commit hash, or `unknown` outside a checkout.
pub const GIT_HASH: &str = env!("CMDALIAS_GIT_HASH");

/// Cargo profile the crate was built with.
pub const BUILD_PROFILE: &str = env!("CMDALIAS_BUILD_PROFILE");

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// `"0.1.0 (abc1234, debug)"`
pub fn version_string() -> String {
    format!("{VERSION} ({GIT_HASH}, {BUILD_PROFILE})")
}
