//! Sitemap building for the static pages plus every tag and story page.
//! The same URL list backs both the XML and the JSON form.

use std::collections::HashSet;

use bedtale_common::models::{Story, Tag};
use chrono::{DateTime, Utc};

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeFreq {
    Always,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
    Never,
}

impl ChangeFreq {
    fn as_str(&self) -> &'static str {
        match self {
            ChangeFreq::Always => "always",
            ChangeFreq::Hourly => "hourly",
            ChangeFreq::Daily => "daily",
            ChangeFreq::Weekly => "weekly",
            ChangeFreq::Monthly => "monthly",
            ChangeFreq::Yearly => "yearly",
            ChangeFreq::Never => "never",
        }
    }
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct SitemapUrl {
    pub loc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changefreq: Option<ChangeFreq>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lastmod: Option<DateTime<Utc>>,
}

const STATIC_PAGES: &[(&str, f32, ChangeFreq)] = &[
    ("/", 1.0, ChangeFreq::Daily),
    ("/stories", 0.9, ChangeFreq::Daily),
    ("/stories/all", 0.9, ChangeFreq::Daily),
    ("/search", 0.7, ChangeFreq::Weekly),
    ("/about", 0.6, ChangeFreq::Monthly),
    ("/contact", 0.5, ChangeFreq::Monthly),
    ("/terms-of-use", 0.3, ChangeFreq::Yearly),
    ("/privacy-policy", 0.3, ChangeFreq::Yearly),
];

pub struct Sitemap {
    base_url: String,
    urls: Vec<SitemapUrl>,
    seen: HashSet<String>,
}

impl Sitemap {
    /// Starts a sitemap already holding the static pages.
    pub fn new(base_url: &str) -> Self {
        let mut sitemap = Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            urls: Vec::new(),
            seen: HashSet::new(),
        };

        for (path, priority, changefreq) in STATIC_PAGES {
            sitemap.push(path, Some(*priority), Some(*changefreq), None);
        }

        sitemap
    }

    /// Adds a page unless its location is already present; the first
    /// occurrence wins, so every location appears exactly once.
    pub fn push(
        &mut self,
        path: &str,
        priority: Option<f32>,
        changefreq: Option<ChangeFreq>,
        lastmod: Option<DateTime<Utc>>,
    ) -> bool {
        let loc = format!("{}{}", self.base_url, path);

        if !self.seen.insert(loc.clone()) {
            return false;
        }

        self.urls.push(SitemapUrl {
            loc,
            changefreq,
            priority,
            lastmod,
        });

        true
    }

    /// Static pages plus one page per tag and one per story.
    pub fn with_catalog(mut self, tags: &[Tag], stories: &[Story]) -> Self {
        let now = Utc::now();

        for tag in tags {
            self.push(
                &format!("/stories/{}", tag.slug),
                Some(0.8),
                Some(ChangeFreq::Weekly),
                Some(now),
            );
        }

        for story in stories {
            self.push(
                &format!("/stories/all/{}", story.slug),
                Some(0.7),
                Some(ChangeFreq::Monthly),
                Some(story.updated_at),
            );
        }

        self
    }

    pub fn urls(&self) -> &[SitemapUrl] {
        &self.urls
    }

    pub fn into_urls(self) -> Vec<SitemapUrl> {
        self.urls
    }

    pub fn to_xml(&self) -> String {
        let mut out = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
        );

        for url in &self.urls {
            out.push_str("  <url>\n");
            out.push_str(&format!("    <loc>{}</loc>\n", xml_escape(&url.loc)));

            if let Some(lastmod) = &url.lastmod {
                out.push_str(&format!(
                    "    <lastmod>{}</lastmod>\n",
                    lastmod.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
                ));
            }

            if let Some(changefreq) = &url.changefreq {
                out.push_str(&format!(
                    "    <changefreq>{}</changefreq>\n",
                    changefreq.as_str()
                ));
            }

            if let Some(priority) = url.priority {
                out.push_str(&format!("    <priority>{:.1}</priority>\n", priority));
            }

            out.push_str("  </url>\n");
        }

        out.push_str("</urlset>\n");

        out
    }
}

fn xml_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::{ChangeFreq, Sitemap, STATIC_PAGES};
    use bedtale_common::models::{AgeGroup, Story, Tag};
    use chrono::{TimeZone, Utc};

    fn tag(slug: &str) -> Tag {
        Tag {
            id: 1,
            slug: slug.to_string(),
            name: slug.to_string(),
            description: String::new(),
            color: "#888888".to_string(),
        }
    }

    fn story(slug: &str) -> Story {
        let when = Utc.ymd(2024, 3, 1).and_hms(12, 0, 0);

        Story {
            id: 1,
            slug: slug.to_string(),
            title: slug.to_string(),
            description: String::new(),
            content: String::new(),
            tags: Vec::new(),
            images: Vec::new(),
            reading_time: 4,
            age_group: AgeGroup::Preschool,
            created_at: when,
            updated_at: when,
        }
    }

    #[test]
    fn url_count_is_static_plus_tags_plus_stories() {
        let tags = vec![tag("animals"), tag("winter")];
        let stories = vec![story("sleepy-bear"), story("brave-fox"), story("tiny-owl")];

        let sitemap = Sitemap::new("https://bedtale.example").with_catalog(&tags, &stories);

        assert_eq!(
            sitemap.urls().len(),
            STATIC_PAGES.len() + tags.len() + stories.len()
        );
    }

    #[test]
    fn duplicate_locations_are_kept_once() {
        // A tag slugged "all" would collide with the static /stories/all page.
        let sitemap = Sitemap::new("https://bedtale.example").with_catalog(&[tag("all")], &[]);

        assert_eq!(sitemap.urls().len(), STATIC_PAGES.len());
    }

    #[test]
    fn xml_lists_every_location_once() {
        let sitemap =
            Sitemap::new("https://bedtale.example").with_catalog(&[tag("animals")], &[story("sleepy-bear")]);

        let xml = sitemap.to_xml();

        assert_eq!(
            xml.matches("<loc>").count(),
            STATIC_PAGES.len() + 2
        );
        assert!(xml.contains("<loc>https://bedtale.example/stories/animals</loc>"));
        assert!(xml.contains("<loc>https://bedtale.example/stories/all/sleepy-bear</loc>"));
        assert!(xml.contains("<changefreq>weekly</changefreq>"));
        assert!(xml.contains("<priority>1.0</priority>"));
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
    }

    #[test]
    fn json_form_matches_the_url_list() {
        let sitemap = Sitemap::new("https://bedtale.example");

        let json = serde_json::to_value(sitemap.urls()).unwrap();
        let list = json.as_array().unwrap();

        assert_eq!(list.len(), STATIC_PAGES.len());
        assert_eq!(list[0]["loc"], "https://bedtale.example/");
        assert_eq!(list[0]["changefreq"], "daily");
        assert!(list[0].get("lastmod").is_none());
    }

    #[test]
    fn trailing_slash_on_the_base_url_is_trimmed() {
        let mut sitemap = Sitemap::new("https://bedtale.example/");

        assert!(sitemap.push("/extra", None, Some(ChangeFreq::Never), None));
        assert_eq!(
            sitemap.urls().last().unwrap().loc,
            "https://bedtale.example/extra"
        );
    }
}
