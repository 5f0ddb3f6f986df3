//! Folds the flat result sets (stories, tag names, images) into the
//! normalized models, applying translation fallback in one place so it can
//! be exercised without a database.

use std::collections::HashMap;

use bedtale_common::models::{AgeGroup, Story, StoryImage};
use chrono::{DateTime, Utc};

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct StoryRow {
    pub id: i32,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub content: String,
    pub reading_time: i32,
    pub age_group: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub tr_title: Option<String>,
    pub tr_description: Option<String>,
    pub tr_content: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct TagNameRow {
    pub story_id: i32,
    pub name: String,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ImageRow {
    pub id: i32,
    pub story_id: i32,
    pub src: String,
    pub alt: String,
    pub position: i32,
    pub file_name: Option<String>,
    pub file_size: Option<i64>,
    pub mime_type: Option<String>,
    pub storage_path: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct TagRow {
    pub id: i32,
    pub slug: String,
    pub name: String,
    pub description: String,
    pub color: String,
}

impl TagRow {
    pub(crate) fn into_model(self) -> bedtale_common::models::Tag {
        bedtale_common::models::Tag {
            id: self.id,
            slug: self.slug,
            name: self.name,
            description: self.description,
            color: self.color,
        }
    }
}

impl ImageRow {
    pub(crate) fn into_model(self) -> StoryImage {
        StoryImage {
            id: self.id,
            src: self.src,
            alt: self.alt,
            position: self.position,
            file_name: self.file_name,
            file_size: self.file_size,
            mime_type: self.mime_type,
            storage_path: self.storage_path,
        }
    }
}

/// Groups tag names and images by story and builds the final models,
/// preserving the story order of `rows`. Images arrive in fetch order and
/// are stably sorted by position, so ties keep that order.
pub(crate) fn assemble(
    rows: Vec<StoryRow>,
    tags: Vec<TagNameRow>,
    images: Vec<ImageRow>,
) -> Vec<Story> {
    let mut tags_by_story: HashMap<i32, Vec<String>> = HashMap::new();
    for tag in tags {
        tags_by_story.entry(tag.story_id).or_default().push(tag.name);
    }

    let mut images_by_story: HashMap<i32, Vec<StoryImage>> = HashMap::new();
    for image in images {
        images_by_story
            .entry(image.story_id)
            .or_default()
            .push(image.into_model());
    }

    rows.into_iter()
        .map(|row| {
            let mut story_images = images_by_story.remove(&row.id).unwrap_or_default();
            story_images.sort_by_key(|image| image.position);

            Story {
                id: row.id,
                slug: row.slug,
                title: pick(row.tr_title, row.title),
                description: pick(row.tr_description, row.description),
                content: pick(row.tr_content, row.content),
                tags: tags_by_story.remove(&row.id).unwrap_or_default(),
                images: story_images,
                reading_time: row.reading_time,
                age_group: AgeGroup::from_column(&row.age_group),
                created_at: row.created_at,
                updated_at: row.updated_at,
            }
        })
        .collect()
}

/// Translation fallback: the override wins only when it is present and
/// non-empty, so a story never renders with an empty title.
fn pick(translated: Option<String>, base: String) -> String {
    match translated {
        Some(text) if !text.is_empty() => text,
        _ => base,
    }
}

/// ILIKE pattern for a user query, or `None` when the query is blank.
pub(crate) fn search_pattern(query: &str) -> Option<String> {
    let trimmed = query.trim();

    if trimmed.is_empty() {
        None
    } else {
        Some(format!("%{}%", trimmed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn story_row(id: i32, title: &str, tr_title: Option<&str>) -> StoryRow {
        let when = Utc.ymd(2024, 3, 1).and_hms(12, 0, 0);

        StoryRow {
            id,
            slug: format!("story-{}", id),
            title: title.to_string(),
            description: "base description".to_string(),
            content: "base content".to_string(),
            reading_time: 5,
            age_group: "3-5".to_string(),
            created_at: when,
            updated_at: when,
            tr_title: tr_title.map(str::to_string),
            tr_description: None,
            tr_content: None,
        }
    }

    fn image_row(id: i32, story_id: i32, position: i32) -> ImageRow {
        ImageRow {
            id,
            story_id,
            src: format!("https://cdn.example.com/{}.png", id),
            alt: String::new(),
            position,
            file_name: None,
            file_size: None,
            mime_type: None,
            storage_path: None,
        }
    }

    #[test]
    fn missing_translation_keeps_the_base_title() {
        let stories = assemble(vec![story_row(1, "The Sleepy Bear", None)], vec![], vec![]);

        assert_eq!(stories[0].title, "The Sleepy Bear");
    }

    #[test]
    fn empty_translation_keeps_the_base_title() {
        let stories = assemble(vec![story_row(1, "The Sleepy Bear", Some(""))], vec![], vec![]);

        assert_eq!(stories[0].title, "The Sleepy Bear");
    }

    #[test]
    fn present_translation_overrides_the_base() {
        let stories = assemble(
            vec![story_row(1, "The Sleepy Bear", Some("Сонный мишка"))],
            vec![],
            vec![],
        );

        assert_eq!(stories[0].title, "Сонный мишка");
        assert_eq!(stories[0].description, "base description");
    }

    #[test]
    fn relations_group_by_story_and_keep_story_order() {
        let rows = vec![story_row(2, "Second", None), story_row(1, "First", None)];
        let tags = vec![
            TagNameRow { story_id: 1, name: "animals".to_string() },
            TagNameRow { story_id: 2, name: "winter".to_string() },
            TagNameRow { story_id: 2, name: "животные".to_string() },
        ];
        let images = vec![image_row(10, 1, 40), image_row(11, 2, 0)];

        let stories = assemble(rows, tags, images);

        assert_eq!(stories[0].id, 2);
        assert_eq!(stories[0].tags, vec!["winter", "животные"]);
        assert_eq!(stories[0].images.len(), 1);
        assert_eq!(stories[1].id, 1);
        assert_eq!(stories[1].tags, vec!["animals"]);
        assert_eq!(stories[1].images[0].id, 10);
    }

    #[test]
    fn images_sort_by_position_with_stable_ties() {
        let images = vec![
            image_row(10, 1, 50),
            image_row(11, 1, 0),
            image_row(12, 1, 50),
        ];

        let stories = assemble(vec![story_row(1, "First", None)], vec![], images);

        let ids: Vec<i32> = stories[0].images.iter().map(|image| image.id).collect();
        assert_eq!(ids, vec![11, 10, 12]);
    }

    #[test]
    fn search_pattern_is_none_for_blank_queries() {
        assert_eq!(search_pattern(""), None);
        assert_eq!(search_pattern("   "), None);
        assert_eq!(search_pattern(" fox "), Some("%fox%".to_string()));
    }
}
