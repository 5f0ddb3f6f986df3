//! Thin typed client for the hosted object-storage API (Supabase style),
//! plus the client-side checks that run before any bytes leave the machine.

use isahc::{AsyncReadResponseExt as _, HttpClient, Request};

use crate::{bail, Conf, Context as _, Report};

pub const MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;

const ALLOWED_MIME: &[&str] = &["image/jpeg", "image/png", "image/webp", "image/gif"];

const CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

pub struct Bucket {
    client: HttpClient,
    base: String,
    name: String,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ObjectEntry {
    pub name: String,
    pub id: Option<String>,
    pub metadata: Option<ObjectMetadata>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ObjectMetadata {
    pub size: Option<i64>,
    pub mimetype: Option<String>,
}

impl ObjectEntry {
    /// Folder placeholders come back without an id or metadata.
    pub fn is_folder(&self) -> bool {
        self.metadata.is_none()
    }
}

impl Bucket {
    pub fn new(conf: &Conf) -> Result<Self, Report> {
        let client = HttpClient::builder()
            .default_header("Authorization", format!("Bearer {}", conf.storage_key))
            .build()?;

        Ok(Self {
            client,
            base: conf.storage_url.trim_end_matches('/').to_string(),
            name: conf.bucket().to_string(),
        })
    }

    pub fn public_url(&self, path: &str) -> String {
        format!("{}/object/public/{}/{}", self.base, self.name, path)
    }

    #[tracing::instrument(skip(self, bytes), err)]
    pub async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), Report> {
        let req = Request::builder()
            .method("POST")
            .uri(format!("{}/object/{}/{}", self.base, self.name, path))
            .header("Content-Type", content_type)
            .header("Cache-Control", CACHE_CONTROL)
            .header("x-upsert", "false")
            .body(bytes)?;

        let mut res = self.client.send_async(req).await?;

        if !res.status().is_success() {
            let body = res.text().await.unwrap_or_default();

            bail!("storage upload of `{}` failed: {} {}", path, res.status(), body);
        }

        Ok(())
    }

    #[tracing::instrument(skip(self), err)]
    pub async fn remove(&self, paths: &[String]) -> Result<(), Report> {
        if paths.is_empty() {
            return Ok(());
        }

        let body = serde_json::to_vec(&serde_json::json!({ "prefixes": paths }))?;

        let req = Request::builder()
            .method("DELETE")
            .uri(format!("{}/object/{}", self.base, self.name))
            .header("Content-Type", "application/json")
            .body(body)?;

        let mut res = self.client.send_async(req).await?;

        if !res.status().is_success() {
            let body = res.text().await.unwrap_or_default();

            bail!("storage remove failed: {} {}", res.status(), body);
        }

        Ok(())
    }

    /// Lists a single level of the bucket; callers walk folders themselves.
    #[tracing::instrument(skip(self), err)]
    pub async fn list(&self, prefix: &str) -> Result<Vec<ObjectEntry>, Report> {
        let body = serde_json::to_vec(&serde_json::json!({
            "prefix": prefix,
            "limit": 1000,
        }))?;

        let req = Request::builder()
            .method("POST")
            .uri(format!("{}/object/list/{}", self.base, self.name))
            .header("Content-Type", "application/json")
            .body(body)?;

        let mut res = self.client.send_async(req).await?;

        if !res.status().is_success() {
            let body = res.text().await.unwrap_or_default();

            bail!("storage list of `{}` failed: {} {}", prefix, res.status(), body);
        }

        let text = res.text().await?;

        serde_json::from_str(&text)
            .with_context(|| format!("malformed storage listing for `{}`", prefix))
    }
}

/// Rejects files the site will not serve before any network call is made.
pub fn validate_upload(file_name: &str, size: u64, mime: &str) -> Result<(), Report> {
    if !ALLOWED_MIME.contains(&mime) {
        bail!("unsupported image type `{}` for `{}`", mime, file_name);
    }

    if size == 0 {
        bail!("`{}` is empty", file_name);
    }

    if size > MAX_UPLOAD_BYTES {
        bail!(
            "`{}` is {} bytes, over the {} byte limit",
            file_name,
            size,
            MAX_UPLOAD_BYTES
        );
    }

    Ok(())
}

/// Object name that cannot collide with an earlier upload of the same file.
pub fn unique_object_name(file_name: &str) -> String {
    use rand::Rng as _;

    let millis = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();

    let suffix: String = rand::thread_rng()
        .sample_iter(rand::distributions::Alphanumeric)
        .take(10)
        .map(char::from)
        .collect();

    match file_name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => format!("{}-{}.{}", millis, suffix, ext),
        _ => format!("{}-{}", millis, suffix),
    }
}

/// Bucket path for a story image: `stories/{story_id}/{unique-name}`.
pub fn object_path(story_id: i32, file_name: &str) -> String {
    format!("stories/{}/{}", story_id, unique_object_name(file_name))
}

pub fn join_prefix(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", prefix, name)
    }
}

pub fn mime_for_extension(ext: &str) -> Option<&'static str> {
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}

/// File name component of an image `src`, whether it is a URL or a bare path.
pub fn file_name_from_src(src: &str) -> Option<&str> {
    src.rsplit('/').next().filter(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_upload_rejects_bad_types_and_sizes() {
        assert!(validate_upload("a.jpg", 10, "image/jpeg").is_ok());
        assert!(validate_upload("a.svg", 10, "image/svg+xml").is_err());
        assert!(validate_upload("a.jpg", 0, "image/jpeg").is_err());
        assert!(validate_upload("a.jpg", MAX_UPLOAD_BYTES + 1, "image/jpeg").is_err());
    }

    #[test]
    fn unique_object_name_keeps_extension() {
        let name = unique_object_name("bear.png");
        assert!(name.ends_with(".png"));

        let other = unique_object_name("bear.png");
        assert_ne!(name, other);
    }

    #[test]
    fn join_prefix_handles_the_bucket_root() {
        assert_eq!(join_prefix("", "stories"), "stories");
        assert_eq!(join_prefix("stories/3", "a.png"), "stories/3/a.png");
    }

    #[test]
    fn file_name_from_src_takes_the_last_segment() {
        assert_eq!(
            file_name_from_src("https://cdn.example.com/images/bear.png"),
            Some("bear.png")
        );
        assert_eq!(file_name_from_src("/images/bear.png"), Some("bear.png"));
        assert_eq!(file_name_from_src("https://cdn.example.com/"), None);
    }

    #[test]
    fn mime_for_extension_is_case_insensitive() {
        assert_eq!(mime_for_extension("JPG"), Some("image/jpeg"));
        assert_eq!(mime_for_extension("tiff"), None);
    }
}
