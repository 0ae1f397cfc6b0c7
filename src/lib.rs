pub mod api;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod web;

/// Re-exported at the crate root because askama's derive macro resolves
/// custom filters as `crate::filters::name` by default.
pub mod filters {
    pub use crate::web::filters::*;
}

/// Returns the Planet CF user agent string with the current version.
///
/// Format: "PlanetCF/X.Y.Z" — descriptive and contactable, per the Fetcher
/// Worker's conditional-fetch requirements.
pub fn user_agent() -> String {
    format!("PlanetCF/{}", env!("CARGO_PKG_VERSION"))
}
