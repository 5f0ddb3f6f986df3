//! Read side of the content store: stories, tags, and locales with per-locale
//! translation fallback, plus the image rows the maintenance commands touch.
//!
//! Every call takes the active language explicitly; there is no ambient
//! locale. A missing row is an empty result or `None`, never an error.

pub mod images;
mod normalize;

use bedtale_common::{Conf, Report};
use sqlx::{migrate::Migrator, postgres::PgPoolOptions};

use crate::normalize::{ImageRow, StoryRow, TagNameRow, TagRow};

pub use sqlx::PgPool as Pool;

#[tracing::instrument(skip(conf), err)]
pub async fn init_database_connection(conf: &Conf) -> Result<Pool, Report> {
    static MIGRATOR: Migrator = sqlx::migrate!();

    let pool = PgPoolOptions::new().connect(&conf.database).await?;

    MIGRATOR.run(&pool).await?;

    Ok(pool)
}

const STORY_SELECT: &str = "
    SELECT s.id, s.slug, s.title, s.description, s.content,
           s.reading_time, s.age_group, s.created_at, s.updated_at,
           tr.title AS tr_title, tr.description AS tr_description, tr.content AS tr_content
    FROM stories s
    LEFT JOIN story_translation tr ON tr.story_id = s.id AND tr.language = $1
";

#[tracing::instrument(skip(pool), err)]
pub async fn all_stories(
    pool: &Pool,
    language: Option<&str>,
) -> Result<Vec<bedtale_common::models::Story>, Report> {
    let query = format!("{} ORDER BY s.created_at DESC", STORY_SELECT);

    let rows = sqlx::query_as::<_, StoryRow>(&query)
        .bind(language)
        .fetch_all(pool)
        .await?;

    attach_relations(pool, language, rows).await
}

#[tracing::instrument(skip(pool), err)]
pub async fn stories_by_tag_slug(
    pool: &Pool,
    tag_slug: &str,
    language: Option<&str>,
) -> Result<Vec<bedtale_common::models::Story>, Report> {
    let query = format!(
        "{} WHERE EXISTS (
             SELECT 1 FROM story_tags st
             JOIN tags t ON t.id = st.tag_id
             WHERE st.story_id = s.id AND t.slug = $2
         )
         ORDER BY s.created_at DESC",
        STORY_SELECT
    );

    let rows = sqlx::query_as::<_, StoryRow>(&query)
        .bind(language)
        .bind(tag_slug)
        .fetch_all(pool)
        .await?;

    attach_relations(pool, language, rows).await
}

#[tracing::instrument(skip(pool), err)]
pub async fn story_by_slug(
    pool: &Pool,
    slug: &str,
    language: Option<&str>,
) -> Result<Option<bedtale_common::models::Story>, Report> {
    let query = format!("{} WHERE s.slug = $2", STORY_SELECT);

    let row = sqlx::query_as::<_, StoryRow>(&query)
        .bind(language)
        .bind(slug)
        .fetch_optional(pool)
        .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    Ok(attach_relations(pool, language, vec![row])
        .await?
        .into_iter()
        .next())
}

/// Case-insensitive substring search over title, description, and body.
/// An empty (or whitespace-only) query short-circuits to no results.
#[tracing::instrument(skip(pool), err)]
pub async fn search(
    pool: &Pool,
    query: &str,
) -> Result<Vec<bedtale_common::models::Story>, Report> {
    let Some(pattern) = normalize::search_pattern(query) else {
        return Ok(Vec::new());
    };

    let query = format!(
        "{} WHERE s.title ILIKE $2 OR s.description ILIKE $2 OR s.content ILIKE $2
         ORDER BY s.created_at DESC",
        STORY_SELECT
    );

    let rows = sqlx::query_as::<_, StoryRow>(&query)
        .bind(None::<&str>)
        .bind(&pattern)
        .fetch_all(pool)
        .await?;

    attach_relations(pool, None, rows).await
}

/// Pulls tag names and images for a batch of stories and folds everything
/// into normalized models.
async fn attach_relations(
    pool: &Pool,
    language: Option<&str>,
    rows: Vec<StoryRow>,
) -> Result<Vec<bedtale_common::models::Story>, Report> {
    let ids: Vec<i32> = rows.iter().map(|row| row.id).collect();

    let tags = sqlx::query_as::<_, TagNameRow>(
        "SELECT st.story_id, COALESCE(ttr.name, t.name) AS name
         FROM story_tags st
         JOIN tags t ON t.id = st.tag_id
         LEFT JOIN tag_translation ttr ON ttr.tag_id = t.id AND ttr.language = $1
         WHERE st.story_id = ANY($2)
         ORDER BY st.story_id, t.name",
    )
    .bind(language)
    .bind(ids.clone())
    .fetch_all(pool)
    .await?;

    // id order reflects insertion, which the renderer uses to break position
    // ties stably.
    let images = sqlx::query_as::<_, ImageRow>(
        "SELECT id, story_id, src, alt, position, file_name, file_size, mime_type, storage_path
         FROM story_images
         WHERE story_id = ANY($1)
         ORDER BY story_id, id",
    )
    .bind(ids)
    .fetch_all(pool)
    .await?;

    Ok(normalize::assemble(rows, tags, images))
}

const TAG_SELECT: &str = "
    SELECT t.id, t.slug,
           COALESCE(ttr.name, t.name) AS name,
           COALESCE(ttr.description, t.description) AS description,
           t.color
    FROM tags t
    LEFT JOIN tag_translation ttr ON ttr.tag_id = t.id AND ttr.language = $1
";

#[tracing::instrument(skip(pool), err)]
pub async fn all_tags(
    pool: &Pool,
    language: Option<&str>,
) -> Result<Vec<bedtale_common::models::Tag>, Report> {
    let query = format!("{} ORDER BY t.name", TAG_SELECT);

    let rows = sqlx::query_as::<_, TagRow>(&query)
        .bind(language)
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().map(TagRow::into_model).collect())
}

/// Only tags that have at least one story, and when a language is given,
/// at least one story translated into it.
#[tracing::instrument(skip(pool), err)]
pub async fn tags_with_stories(
    pool: &Pool,
    language: Option<&str>,
) -> Result<Vec<bedtale_common::models::Tag>, Report> {
    let query = format!(
        "{} WHERE EXISTS (
             SELECT 1 FROM story_tags st
             WHERE st.tag_id = t.id
               AND ($1::text IS NULL OR EXISTS (
                   SELECT 1 FROM story_translation str
                   WHERE str.story_id = st.story_id AND str.language = $1
               ))
         )
         ORDER BY t.name",
        TAG_SELECT
    );

    let rows = sqlx::query_as::<_, TagRow>(&query)
        .bind(language)
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().map(TagRow::into_model).collect())
}

#[tracing::instrument(skip(pool), err)]
pub async fn tag_by_slug(
    pool: &Pool,
    slug: &str,
    language: Option<&str>,
) -> Result<Option<bedtale_common::models::Tag>, Report> {
    let query = format!("{} WHERE t.slug = $2", TAG_SELECT);

    let row = sqlx::query_as::<_, TagRow>(&query)
        .bind(language)
        .bind(slug)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(TagRow::into_model))
}

#[tracing::instrument(skip(pool), err)]
pub async fn all_locales(pool: &Pool) -> Result<Vec<bedtale_common::models::Locale>, Report> {
    #[derive(sqlx::FromRow)]
    struct LocaleRow {
        code: String,
        name: String,
    }

    let rows = sqlx::query_as::<_, LocaleRow>("SELECT code, name FROM locales ORDER BY code")
        .fetch_all(pool)
        .await?;

    Ok(rows
        .into_iter()
        .map(|row| bedtale_common::models::Locale {
            code: row.code,
            name: row.name,
        })
        .collect())
}

#[tracing::instrument(skip(pool), err)]
pub async fn story_id_by_slug(pool: &Pool, slug: &str) -> Result<Option<i32>, Report> {
    #[derive(sqlx::FromRow)]
    struct IdRow {
        id: i32,
    }

    let row = sqlx::query_as::<_, IdRow>("SELECT id FROM stories WHERE slug = $1")
        .bind(slug)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|row| row.id))
}
