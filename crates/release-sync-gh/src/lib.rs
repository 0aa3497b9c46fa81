pub mod release;

pub use release::{DEFAULT_PATTERN, GhReleaseConfig, GhReleaseFetcher};
