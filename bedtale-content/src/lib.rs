pub mod interleave;
pub mod sitemap;

pub use interleave::{interleave, Block};
pub use sitemap::{ChangeFreq, Sitemap, SitemapUrl};
