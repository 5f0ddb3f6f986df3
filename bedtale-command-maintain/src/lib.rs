//! Offline maintenance run against the service-role credential: image
//! migration into the bucket, orphaned-object cleanup, unmigrated-row
//! listing, position fixing, and sitemap file generation.

use std::collections::HashSet;
use std::path::Path;

use bedtale_common::{
    bail, err,
    storage::{self, Bucket},
    Conf, Context as _, Report,
};
use bedtale_content::Sitemap;
use bedtale_queries::images;

/// Uploads every story image still served from local disk into the bucket
/// and backfills its row. Rows whose local file cannot be found are skipped
/// with a warning so a partial image set does not abort the whole run.
#[tracing::instrument(skip(conf), err)]
pub async fn migrate(conf: &Conf, images_dir: &Path) -> Result<(), Report> {
    let pool = bedtale_queries::init_database_connection(conf).await?;
    let bucket = Bucket::new(conf)?;

    let pending = images::unmigrated_images(&pool).await?;

    tracing::info!(count = pending.len(), "images to migrate");

    for image in pending {
        let Some(file_name) = storage::file_name_from_src(&image.src) else {
            tracing::warn!(image_id = image.id, src = %image.src, "src has no file name");

            continue;
        };

        let extension = file_name.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
        let Some(mime_type) = storage::mime_for_extension(extension) else {
            tracing::warn!(image_id = image.id, file_name, "not an image file");

            continue;
        };

        let local_path = images_dir.join(file_name);
        let bytes = match tokio::fs::read(&local_path).await {
            Ok(bytes) => bytes,
            Err(io_err) => {
                tracing::warn!(
                    image_id = image.id,
                    path = %local_path.display(),
                    err = %io_err,
                    "local file missing, skipping"
                );

                continue;
            }
        };

        let object = storage::object_path(image.story_id, file_name);
        let size = bytes.len() as i64;

        bucket.upload(&object, bytes, mime_type).await?;

        let src = bucket.public_url(&object);

        images::mark_migrated(&pool, image.id, &src, &object, file_name, size, mime_type).await?;

        tracing::info!(image_id = image.id, object = %object, "migrated");
    }

    Ok(())
}

/// Bucket objects no story_images row points at. Reports by default,
/// deletes only when asked.
#[tracing::instrument(skip(conf), err)]
pub async fn orphans(conf: &Conf, delete: bool) -> Result<(), Report> {
    let pool = bedtale_queries::init_database_connection(conf).await?;
    let bucket = Bucket::new(conf)?;

    let known: HashSet<String> = images::all_storage_paths(&pool).await?.into_iter().collect();

    tracing::info!(count = known.len(), "storage paths known to the database");

    let files = walk_bucket(&bucket).await?;

    tracing::info!(count = files.len(), "objects found in the bucket");

    let orphaned: Vec<String> = files
        .into_iter()
        .filter(|file| !known.contains(&file.path))
        .map(|file| {
            tracing::info!(path = %file.path, size = file.size, "orphaned object");

            file.path
        })
        .collect();

    if orphaned.is_empty() {
        tracing::info!("no orphaned objects");
    } else if delete {
        bucket.remove(&orphaned).await?;

        tracing::info!(count = orphaned.len(), "orphaned objects deleted");
    } else {
        tracing::info!(
            count = orphaned.len(),
            "dry run, pass --delete to remove these objects"
        );
    }

    Ok(())
}

/// Lists story_images rows that still have no storage path.
#[tracing::instrument(skip(conf), err)]
pub async fn unmigrated(conf: &Conf) -> Result<(), Report> {
    let pool = bedtale_queries::init_database_connection(conf).await?;

    let pending = images::unmigrated_images(&pool).await?;

    for image in &pending {
        tracing::info!(
            image_id = image.id,
            story_id = image.story_id,
            src = %image.src,
            "not migrated"
        );
    }

    tracing::info!(count = pending.len(), "unmigrated images");

    Ok(())
}

/// Clamps the lowest-position image of a story to position 0, so the cover
/// image renders with the first paragraph.
#[tracing::instrument(skip(conf), err)]
pub async fn fix_positions(conf: &Conf, story_slug: &str) -> Result<(), Report> {
    let pool = bedtale_queries::init_database_connection(conf).await?;

    let story_id = bedtale_queries::story_id_by_slug(&pool, story_slug)
        .await?
        .ok_or_else(|| err!("no story with slug `{}`", story_slug))?;

    let story_images = images::story_images(&pool, story_id).await?;

    let Some(first) = story_images.first() else {
        bail!("story `{}` has no images", story_slug);
    };

    if first.position == 0 {
        tracing::info!(image_id = first.id, "lowest position is already 0");

        return Ok(());
    }

    tracing::info!(
        image_id = first.id,
        position = first.position,
        "clamping lowest position to 0"
    );

    images::set_image_position(&pool, first.id, 0).await?;

    Ok(())
}

/// Writes the full sitemap to a file, XML by default or JSON when asked.
#[tracing::instrument(skip(conf), err)]
pub async fn sitemap(conf: &Conf, out: &Path, json: bool) -> Result<(), Report> {
    let pool = bedtale_queries::init_database_connection(conf).await?;

    let tags = bedtale_queries::all_tags(&pool, None).await?;
    let stories = bedtale_queries::all_stories(&pool, None).await?;

    let sitemap = Sitemap::new(&conf.site_url).with_catalog(&tags, &stories);

    tracing::info!(urls = sitemap.urls().len(), "sitemap built");

    let body = if json {
        serde_json::to_string_pretty(sitemap.urls())?
    } else {
        sitemap.to_xml()
    };

    tokio::fs::write(out, body)
        .await
        .with_context(|| format!("unable to write sitemap to `{}`", out.display()))?;

    tracing::info!(path = %out.display(), "sitemap written");

    Ok(())
}

struct BucketFile {
    path: String,
    size: i64,
}

/// Walks the bucket one folder level at a time; listings only return a
/// single level, so folders are queued and revisited.
async fn walk_bucket(bucket: &Bucket) -> Result<Vec<BucketFile>, Report> {
    let mut files = Vec::new();
    let mut pending = vec![String::new()];

    while let Some(prefix) = pending.pop() {
        for entry in bucket.list(&prefix).await? {
            let path = storage::join_prefix(&prefix, &entry.name);

            if entry.is_folder() {
                pending.push(path);
            } else {
                let size = entry
                    .metadata
                    .as_ref()
                    .and_then(|metadata| metadata.size)
                    .unwrap_or(0);

                files.push(BucketFile { path, size });
            }
        }
    }

    Ok(files)
}
