//! Configuration module

mod site;

pub use site::ConfigError;
pub use site::BASE_PATH_VAR;
pub use site::KbarConfig;
pub use site::SearchConfig;
pub use site::SearchProvider;
pub use site::SiteMetadata;
pub use site::ThemeMode;
