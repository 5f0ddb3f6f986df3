use std::{sync::Arc, time::Duration};

use askama::Template;
use axum::{
    error_handling::HandleErrorLayer,
    extract::{Extension, Multipart, Path, Query},
    http::{header, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{delete, get, post},
    BoxError, Json, Router, Server,
};
use bedtale_common::{
    err,
    i18n::{self, Label},
    models::{Story, Tag},
    storage::Bucket,
    Conf, Report,
};
use bedtale_content::{Block, Sitemap};
use bedtale_queries::{images, Pool};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

mod pages;

use pages::StaticPage;

static STYLE: &str = include_str!("../../assets/site.css");

/// Per-request site chrome: locale plus every label the shared layout needs.
/// Built once per handler so templates never reach into global state.
pub struct Chrome {
    pub lang: String,
    /// Query-string suffix carrying the locale on internal links, empty for
    /// the default locale.
    pub suffix: String,
    pub site_name: &'static str,
    pub tagline: &'static str,
    pub home: &'static str,
    pub stories: &'static str,
    pub all_stories: &'static str,
    pub search: &'static str,
    pub search_placeholder: &'static str,
    pub search_no_results: &'static str,
    pub browse_all: &'static str,
    pub reading_minutes: &'static str,
    pub age_group: &'static str,
    pub about: &'static str,
    pub contact: &'static str,
    pub terms_of_use: &'static str,
    pub privacy_policy: &'static str,
}

impl Chrome {
    fn new(locale: &str, default_locale: &str) -> Self {
        let suffix = if locale == default_locale {
            String::new()
        } else {
            format!("?lang={}", locale)
        };

        Self {
            lang: locale.to_string(),
            suffix,
            site_name: i18n::label(locale, Label::SiteName),
            tagline: i18n::label(locale, Label::Tagline),
            home: i18n::label(locale, Label::Home),
            stories: i18n::label(locale, Label::Stories),
            all_stories: i18n::label(locale, Label::AllStories),
            search: i18n::label(locale, Label::Search),
            search_placeholder: i18n::label(locale, Label::SearchPlaceholder),
            search_no_results: i18n::label(locale, Label::SearchNoResults),
            browse_all: i18n::label(locale, Label::BrowseAll),
            reading_minutes: i18n::label(locale, Label::ReadingMinutes),
            age_group: i18n::label(locale, Label::AgeGroup),
            about: i18n::label(locale, Label::About),
            contact: i18n::label(locale, Label::Contact),
            terms_of_use: i18n::label(locale, Label::TermsOfUse),
            privacy_policy: i18n::label(locale, Label::PrivacyPolicy),
        }
    }
}

/// The request-independent parts of the site the handlers need.
pub struct Site {
    pub site_url: String,
    pub default_locale: String,
}

impl Site {
    /// Resolves the requested locale and the language to query translations
    /// for. The default locale reads base fields, so it queries as `None`.
    fn locale<'s>(&'s self, lang: &'s Option<String>) -> (&'s str, Option<&'s str>) {
        match lang.as_deref() {
            Some(lang) if !lang.is_empty() && lang != self.default_locale => (lang, Some(lang)),
            _ => (&self.default_locale, None),
        }
    }
}

pub async fn run(conf: &Conf) -> Result<(), Report> {
    let pool = bedtale_queries::init_database_connection(conf).await?;
    let bucket = Arc::new(Bucket::new(conf)?);
    let site = Arc::new(Site {
        site_url: conf.site_url.clone(),
        default_locale: conf.default_locale().to_string(),
    });

    let app = Router::new()
        .route("/", get(index))
        .route("/stories", get(stories))
        .route("/stories/:tag_slug", get(stories_by_tag))
        .route("/stories/:tag_slug/:story_slug", get(story))
        .route("/search", get(search))
        .route("/about", get(about))
        .route("/contact", get(contact))
        .route("/terms-of-use", get(terms_of_use))
        .route("/privacy-policy", get(privacy_policy))
        .route("/sitemap.xml", get(sitemap_xml))
        .route("/sitemap.json", get(sitemap_json))
        .route("/admin/images", post(admin_upload_image))
        .route("/admin/images/:id", delete(admin_delete_image))
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(|error: BoxError| async move {
                    if error.is::<tower::timeout::error::Elapsed>() {
                        (StatusCode::REQUEST_TIMEOUT, String::new())
                    } else {
                        (StatusCode::INTERNAL_SERVER_ERROR, String::new())
                    }
                }))
                .load_shed()
                .concurrency_limit(1024)
                .timeout(Duration::from_secs(10))
                .layer(Extension(pool))
                .layer(Extension(bucket))
                .layer(Extension(site))
                .layer(TraceLayer::new_for_http())
                .into_inner(),
        );

    let bind = conf.bind().parse()?;

    tracing::info!(addr = %bind, "starting web server");

    Server::bind(&bind).serve(app.into_make_service()).await?;

    Ok(())
}

#[derive(Debug, serde::Deserialize)]
struct PageQuery {
    lang: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
    lang: Option<String>,
}

#[derive(askama::Template)]
#[template(path = "index.html")]
struct IndexPage {
    css: &'static str,
    chrome: Chrome,
    tags: Vec<Tag>,
    recent: Vec<Story>,
}

async fn index(
    Extension(pool): Extension<Pool>,
    Extension(site): Extension<Arc<Site>>,
    Query(page): Query<PageQuery>,
) -> Result<Response, Error> {
    const RECENT_LIMIT: usize = 6;

    let (locale, language) = site.locale(&page.lang);

    let tags = bedtale_queries::tags_with_stories(&pool, language).await?;
    let mut recent = bedtale_queries::all_stories(&pool, language).await?;
    recent.truncate(RECENT_LIMIT);

    Ok(Html(
        IndexPage {
            css: STYLE,
            chrome: Chrome::new(locale, &site.default_locale),
            tags,
            recent,
        }
        .render()
        .map_err(Error::from_any)?,
    )
    .into_response())
}

#[derive(askama::Template)]
#[template(path = "stories.html")]
struct StoriesPage {
    css: &'static str,
    chrome: Chrome,
    heading: String,
    tags: Vec<Tag>,
    stories: Vec<Story>,
}

async fn stories(
    pool: Extension<Pool>,
    site: Extension<Arc<Site>>,
    page: Query<PageQuery>,
) -> Result<Response, Error> {
    stories_by_tag(pool, site, Path("all".to_string()), page).await
}

async fn stories_by_tag(
    Extension(pool): Extension<Pool>,
    Extension(site): Extension<Arc<Site>>,
    Path(tag_slug): Path<String>,
    Query(page): Query<PageQuery>,
) -> Result<Response, Error> {
    let (locale, language) = site.locale(&page.lang);
    let chrome = Chrome::new(locale, &site.default_locale);

    let tags = bedtale_queries::tags_with_stories(&pool, language).await?;

    let (heading, stories) = if tag_slug == "all" {
        (
            chrome.all_stories.to_string(),
            bedtale_queries::all_stories(&pool, language).await?,
        )
    } else {
        let heading = bedtale_queries::tag_by_slug(&pool, &tag_slug, language)
            .await?
            .map(|tag| tag.name)
            .unwrap_or_else(|| tag_slug.clone());

        (
            heading,
            bedtale_queries::stories_by_tag_slug(&pool, &tag_slug, language).await?,
        )
    };

    Ok(Html(
        StoriesPage {
            css: STYLE,
            chrome,
            heading,
            tags,
            stories,
        }
        .render()
        .map_err(Error::from_any)?,
    )
    .into_response())
}

#[derive(askama::Template)]
#[template(path = "story.html")]
struct StoryPage<'s> {
    css: &'static str,
    chrome: Chrome,
    tag_slug: &'s str,
    story: &'s Story,
    blocks: Vec<Block<'s>>,
}

async fn story(
    Extension(pool): Extension<Pool>,
    Extension(site): Extension<Arc<Site>>,
    Path((tag_slug, story_slug)): Path<(String, String)>,
    Query(page): Query<PageQuery>,
) -> Result<Response, Error> {
    let (locale, language) = site.locale(&page.lang);
    let chrome = Chrome::new(locale, &site.default_locale);

    let Some(story) = bedtale_queries::story_by_slug(&pool, &story_slug, language).await? else {
        return Ok(not_found(chrome, locale));
    };

    let blocks = bedtale_content::interleave(&story.content, &story.images);

    Ok(Html(
        StoryPage {
            css: STYLE,
            chrome,
            tag_slug: &tag_slug,
            story: &story,
            blocks,
        }
        .render()
        .map_err(Error::from_any)?,
    )
    .into_response())
}

#[derive(askama::Template)]
#[template(path = "search.html")]
struct SearchPage {
    css: &'static str,
    chrome: Chrome,
    query: String,
    stories: Vec<Story>,
}

async fn search(
    Extension(pool): Extension<Pool>,
    Extension(site): Extension<Arc<Site>>,
    Query(params): Query<SearchQuery>,
) -> Result<Response, Error> {
    let (locale, _) = site.locale(&params.lang);

    let stories = bedtale_queries::search(&pool, &params.q).await?;

    Ok(Html(
        SearchPage {
            css: STYLE,
            chrome: Chrome::new(locale, &site.default_locale),
            query: params.q,
            stories,
        }
        .render()
        .map_err(Error::from_any)?,
    )
    .into_response())
}

async fn about(
    site: Extension<Arc<Site>>,
    page: Query<PageQuery>,
) -> Result<Response, Error> {
    static_page(site, page, StaticPage::About)
}

async fn contact(
    site: Extension<Arc<Site>>,
    page: Query<PageQuery>,
) -> Result<Response, Error> {
    static_page(site, page, StaticPage::Contact)
}

async fn terms_of_use(
    site: Extension<Arc<Site>>,
    page: Query<PageQuery>,
) -> Result<Response, Error> {
    static_page(site, page, StaticPage::TermsOfUse)
}

async fn privacy_policy(
    site: Extension<Arc<Site>>,
    page: Query<PageQuery>,
) -> Result<Response, Error> {
    static_page(site, page, StaticPage::PrivacyPolicy)
}

#[derive(askama::Template)]
#[template(path = "page.html")]
struct InfoPage {
    css: &'static str,
    chrome: Chrome,
    heading: &'static str,
    body: &'static str,
}

fn static_page(
    Extension(site): Extension<Arc<Site>>,
    Query(page): Query<PageQuery>,
    which: StaticPage,
) -> Result<Response, Error> {
    let (locale, _) = site.locale(&page.lang);

    Ok(Html(
        InfoPage {
            css: STYLE,
            chrome: Chrome::new(locale, &site.default_locale),
            heading: which.heading(locale),
            body: which.body(locale),
        }
        .render()
        .map_err(Error::from_any)?,
    )
    .into_response())
}

fn not_found(chrome: Chrome, locale: &str) -> Response {
    let page = InfoPage {
        css: STYLE,
        chrome,
        heading: i18n::label(locale, Label::StoryNotFound),
        body: i18n::label(locale, Label::BrowseAll),
    };

    match page.render() {
        Ok(html) => (StatusCode::NOT_FOUND, Html(html)).into_response(),
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn build_sitemap(pool: &Pool, site: &Site) -> Result<Sitemap, Report> {
    let tags = bedtale_queries::all_tags(pool, None).await?;
    let stories = bedtale_queries::all_stories(pool, None).await?;

    Ok(Sitemap::new(&site.site_url).with_catalog(&tags, &stories))
}

async fn sitemap_xml(
    Extension(pool): Extension<Pool>,
    Extension(site): Extension<Arc<Site>>,
) -> Result<Response, Error> {
    let sitemap = build_sitemap(&pool, &site).await?;

    let mut res = sitemap.to_xml().into_response();
    res.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/xml"),
    );

    Ok(res)
}

async fn sitemap_json(
    Extension(pool): Extension<Pool>,
    Extension(site): Extension<Arc<Site>>,
) -> Result<Response, Error> {
    let sitemap = build_sitemap(&pool, &site).await?;

    Ok(Json(sitemap.into_urls()).into_response())
}

async fn admin_upload_image(
    Extension(pool): Extension<Pool>,
    Extension(bucket): Extension<Arc<Bucket>>,
    mut multipart: Multipart,
) -> Result<Response, Error> {
    let mut story_id = None;
    let mut alt = String::new();
    let mut position = 0;
    let mut file: Option<(String, String, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await.map_err(Error::from_any)? {
        match field.name() {
            Some("story_id") => {
                story_id = Some(
                    field
                        .text()
                        .await
                        .map_err(Error::from_any)?
                        .parse::<i32>()
                        .map_err(Error::from_any)?,
                );
            }
            Some("alt") => alt = field.text().await.map_err(Error::from_any)?,
            Some("position") => {
                position = field
                    .text()
                    .await
                    .map_err(Error::from_any)?
                    .parse::<i32>()
                    .map_err(Error::from_any)?;
            }
            Some("file") => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let mime_type = field
                    .content_type()
                    .map(|mime| mime.to_string())
                    .unwrap_or_default();
                let bytes = field.bytes().await.map_err(Error::from_any)?.to_vec();

                file = Some((file_name, mime_type, bytes));
            }
            _ => {}
        }
    }

    let story_id = story_id.ok_or_else(|| Error::from_any(err!("missing story_id field")))?;
    let (file_name, mime_type, bytes) =
        file.ok_or_else(|| Error::from_any(err!("missing file field")))?;

    let image = images::upload_story_image(
        &pool,
        &bucket,
        images::NewImage {
            story_id,
            alt: &alt,
            position,
            file_name: &file_name,
            mime_type: &mime_type,
            bytes,
        },
    )
    .await?;

    Ok(Json(image).into_response())
}

async fn admin_delete_image(
    Extension(pool): Extension<Pool>,
    Extension(bucket): Extension<Arc<Bucket>>,
    Path(image_id): Path<i32>,
) -> Result<Response, Error> {
    images::delete_story_image(&pool, &bucket, image_id).await?;

    Ok(StatusCode::NO_CONTENT.into_response())
}

#[derive(Debug)]
pub struct Error(Report);

impl Error {
    pub fn from_any<A>(err: A) -> Self
    where
        A: Into<Report>,
    {
        Self(err.into())
    }
}

impl From<Report> for Error {
    fn from(err: Report) -> Self {
        Self(err)
    }
}

impl axum::response::IntoResponse for Error {
    fn into_response(self) -> axum_core::response::Response {
        #[derive(serde::Serialize)]
        struct Res {
            error: ResErr,
        }

        #[derive(serde::Serialize)]
        struct ResErr {
            code: u16,
            status: &'static str,
        }

        let err = self.0;

        tracing::error!(error = ?err, "error handling request");

        let (status, message) = (StatusCode::INTERNAL_SERVER_ERROR, "internal server error");

        let body = Res {
            error: ResErr {
                code: status.as_u16(),
                status: message,
            },
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::{Chrome, Site};

    fn site() -> Site {
        Site {
            site_url: "https://bedtale.example".to_string(),
            default_locale: "en".to_string(),
        }
    }

    #[test]
    fn default_locale_queries_base_fields() {
        let site = site();

        assert_eq!(site.locale(&None), ("en", None));
        assert_eq!(site.locale(&Some(String::new())), ("en", None));
        assert_eq!(site.locale(&Some("en".to_string())), ("en", None));
    }

    #[test]
    fn other_locales_query_translations() {
        let site = site();
        let lang = Some("ru".to_string());

        assert_eq!(site.locale(&lang), ("ru", Some("ru")));
    }

    #[test]
    fn link_suffix_carries_non_default_locales_only() {
        assert_eq!(Chrome::new("en", "en").suffix, "");
        assert_eq!(Chrome::new("ru", "en").suffix, "?lang=ru");
    }
}
