pub mod i18n;
pub mod models;
pub mod storage;

pub use color_eyre::{
    eyre::{bail, eyre as err, Context, Report},
    install,
};

pub const DEFAULT_BUCKET: &str = "story-images";
pub const DEFAULT_BIND: &str = "0.0.0.0:8080";

#[twelf::config]
pub struct Conf {
    /// PostgreSQL connection URI
    pub database: String,

    /// Base URL of the storage API
    pub storage_url: String,

    /// Service role key for the storage API
    pub storage_key: String,

    /// Storage bucket holding story image binaries
    pub bucket: Option<String>,

    /// Public base URL of the site, used for absolute sitemap locations
    pub site_url: String,

    /// Locale served when a request does not ask for one
    pub default_locale: Option<String>,

    /// Address the web server binds to
    pub bind: Option<String>,
}

impl Conf {
    pub fn bucket(&self) -> &str {
        self.bucket.as_deref().unwrap_or(DEFAULT_BUCKET)
    }

    pub fn default_locale(&self) -> &str {
        self.default_locale.as_deref().unwrap_or(i18n::DEFAULT_LOCALE)
    }

    pub fn bind(&self) -> &str {
        self.bind.as_deref().unwrap_or(DEFAULT_BIND)
    }
}
