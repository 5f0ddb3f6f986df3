//! Write side for story images. The store is the source of truth: every
//! mutation here is an explicit upload or delete against the bucket plus the
//! matching row change.

use bedtale_common::{
    models::StoryImage,
    storage::{self, Bucket},
    Report,
};

use crate::{normalize::ImageRow, Pool};

pub struct NewImage<'a> {
    pub story_id: i32,
    pub alt: &'a str,
    pub position: i32,
    pub file_name: &'a str,
    pub mime_type: &'a str,
    pub bytes: Vec<u8>,
}

/// Validates, uploads to the bucket, then records the row. If the row insert
/// fails the uploaded object is removed again so the bucket never holds a
/// file the database does not know about.
#[tracing::instrument(skip(pool, bucket, new), fields(story_id = new.story_id, file_name = new.file_name), err)]
pub async fn upload_story_image(
    pool: &Pool,
    bucket: &Bucket,
    new: NewImage<'_>,
) -> Result<StoryImage, Report> {
    storage::validate_upload(new.file_name, new.bytes.len() as u64, new.mime_type)?;

    let path = storage::object_path(new.story_id, new.file_name);
    let size = new.bytes.len() as i64;

    bucket.upload(&path, new.bytes, new.mime_type).await?;

    let src = bucket.public_url(&path);

    let inserted = sqlx::query_as::<_, ImageRow>(
        "INSERT INTO story_images (story_id, src, alt, position, file_name, file_size, mime_type, storage_path)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         RETURNING id, story_id, src, alt, position, file_name, file_size, mime_type, storage_path",
    )
    .bind(new.story_id)
    .bind(&src)
    .bind(new.alt)
    .bind(new.position)
    .bind(new.file_name)
    .bind(size)
    .bind(new.mime_type)
    .bind(&path)
    .fetch_one(pool)
    .await;

    match inserted {
        Ok(row) => Ok(row.into_model()),
        Err(db_err) => {
            if let Err(err) = bucket.remove(&[path]).await {
                tracing::error!(err = ?err, "unable to remove object after failed insert");
            }

            Err(db_err.into())
        }
    }
}

/// Removes an image's object (best effort) and its row. A missing row is a
/// no-op, and a storage failure does not keep the row alive.
#[tracing::instrument(skip(pool, bucket), err)]
pub async fn delete_story_image(pool: &Pool, bucket: &Bucket, image_id: i32) -> Result<(), Report> {
    #[derive(sqlx::FromRow)]
    struct PathRow {
        storage_path: Option<String>,
    }

    let row = sqlx::query_as::<_, PathRow>("SELECT storage_path FROM story_images WHERE id = $1")
        .bind(image_id)
        .fetch_optional(pool)
        .await?;

    let Some(row) = row else {
        tracing::warn!("image does not exist, nothing to delete");

        return Ok(());
    };

    if let Some(path) = row.storage_path {
        if let Err(err) = bucket.remove(&[path]).await {
            tracing::error!(err = ?err, "unable to remove object, deleting the row anyway");
        }
    }

    sqlx::query("DELETE FROM story_images WHERE id = $1")
        .bind(image_id)
        .execute(pool)
        .await?;

    Ok(())
}

#[derive(Debug, sqlx::FromRow)]
pub struct UnmigratedImage {
    pub id: i32,
    pub story_id: i32,
    pub src: String,
    pub alt: String,
}

/// Rows still pointing at local files instead of bucket objects.
#[tracing::instrument(skip(pool), err)]
pub async fn unmigrated_images(pool: &Pool) -> Result<Vec<UnmigratedImage>, Report> {
    let rows = sqlx::query_as::<_, UnmigratedImage>(
        "SELECT id, story_id, src, alt FROM story_images WHERE storage_path IS NULL ORDER BY story_id, id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Backfills a row once its file has been uploaded to the bucket.
#[tracing::instrument(skip(pool, src), err)]
pub async fn mark_migrated(
    pool: &Pool,
    image_id: i32,
    src: &str,
    storage_path: &str,
    file_name: &str,
    file_size: i64,
    mime_type: &str,
) -> Result<(), Report> {
    sqlx::query(
        "UPDATE story_images
         SET src = $2, storage_path = $3, file_name = $4, file_size = $5, mime_type = $6
         WHERE id = $1",
    )
    .bind(image_id)
    .bind(src)
    .bind(storage_path)
    .bind(file_name)
    .bind(file_size)
    .bind(mime_type)
    .execute(pool)
    .await?;

    Ok(())
}

/// Every storage path the database knows about; anything in the bucket that
/// is not in this set is an orphan.
#[tracing::instrument(skip(pool), err)]
pub async fn all_storage_paths(pool: &Pool) -> Result<Vec<String>, Report> {
    #[derive(sqlx::FromRow)]
    struct PathRow {
        storage_path: String,
    }

    let rows = sqlx::query_as::<_, PathRow>(
        "SELECT storage_path FROM story_images WHERE storage_path IS NOT NULL",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|row| row.storage_path).collect())
}

/// Images of one story in fetch order (position ties keep insertion order).
#[tracing::instrument(skip(pool), err)]
pub async fn story_images(pool: &Pool, story_id: i32) -> Result<Vec<StoryImage>, Report> {
    let rows = sqlx::query_as::<_, ImageRow>(
        "SELECT id, story_id, src, alt, position, file_name, file_size, mime_type, storage_path
         FROM story_images
         WHERE story_id = $1
         ORDER BY position, id",
    )
    .bind(story_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(ImageRow::into_model).collect())
}

#[tracing::instrument(skip(pool), err)]
pub async fn set_image_position(pool: &Pool, image_id: i32, position: i32) -> Result<(), Report> {
    sqlx::query("UPDATE story_images SET position = $2 WHERE id = $1")
        .bind(image_id)
        .bind(position)
        .execute(pool)
        .await?;

    Ok(())
}
