//! Inline image placement for the story reader.
//!
//! A story body is a flat string with blank-line paragraph breaks, and each
//! image carries the character offset it was authored at. Rendering is a
//! single co-merge of the two sorted sequences: paragraph boundaries on one
//! side, image offsets on the other.

use bedtale_common::models::StoryImage;

/// Paragraph separator is two characters, and the running offset counts it
/// for every consumed paragraph.
const SEPARATOR_LEN: i64 = 2;

#[derive(Debug, PartialEq)]
pub enum Block<'s> {
    Paragraph(&'s str),
    Image(&'s StoryImage),
}

/// Interleaves a story body with its images, in reading order.
///
/// Images are taken ascending by position (stable on ties, so equal offsets
/// keep their fetch order) and each one is emitted exactly once, after the
/// first paragraph whose cumulative end offset reaches it. An image whose
/// position lies past the end of the text is emitted after the final
/// paragraph instead of being dropped.
pub fn interleave<'s>(content: &'s str, images: &'s [StoryImage]) -> Vec<Block<'s>> {
    let mut sorted: Vec<&StoryImage> = images.iter().collect();
    sorted.sort_by_key(|image| image.position);

    let mut blocks = Vec::with_capacity(sorted.len() + 1);
    let mut cursor = 0;
    let mut offset: i64 = 0;

    for paragraph in content.split("\n\n") {
        offset += paragraph.chars().count() as i64 + SEPARATOR_LEN;

        blocks.push(Block::Paragraph(paragraph));

        while cursor < sorted.len() && i64::from(sorted[cursor].position) <= offset {
            blocks.push(Block::Image(sorted[cursor]));

            cursor += 1;
        }
    }

    for &image in &sorted[cursor..] {
        blocks.push(Block::Image(image));
    }

    blocks
}

#[cfg(test)]
mod tests {
    use super::{interleave, Block};
    use bedtale_common::models::StoryImage;

    fn image(id: i32, position: i32) -> StoryImage {
        StoryImage {
            id,
            src: format!("https://cdn.example.com/{}.png", id),
            alt: String::new(),
            position,
            file_name: None,
            file_size: None,
            mime_type: None,
            storage_path: None,
        }
    }

    fn shape(blocks: &[Block<'_>]) -> Vec<String> {
        blocks
            .iter()
            .map(|block| match block {
                Block::Paragraph(text) => format!("p:{}", text),
                Block::Image(image) => format!("i:{}", image.id),
            })
            .collect()
    }

    #[test]
    fn images_land_at_their_paragraph_breaks() {
        let content = "Hello world\n\nSecond para\n\nThird para is longer";
        let images = vec![image(1, 5), image(2, 15), image(3, 1000)];

        let blocks = interleave(content, &images);

        assert_eq!(
            shape(&blocks),
            vec![
                "p:Hello world",
                "i:1",
                "p:Second para",
                "i:2",
                "p:Third para is longer",
                "i:3",
            ]
        );
    }

    #[test]
    fn past_the_end_images_flush_after_the_last_paragraph() {
        let images = [image(7, 9000)];

        let blocks = interleave("Only one", &images);

        assert_eq!(shape(&blocks), vec!["p:Only one", "i:7"]);
    }

    #[test]
    fn offsets_count_characters_not_bytes() {
        // Three ten-character paragraphs; Cyrillic text is two bytes per
        // character, so a byte-based offset would place the image a
        // paragraph early.
        let content = "буря мглою\n\nнебо кроет\n\nвихри снег";
        let images = [image(1, 20)];

        let blocks = interleave(content, &images);

        assert_eq!(
            shape(&blocks),
            vec!["p:буря мглою", "p:небо кроет", "i:1", "p:вихри снег"]
        );
    }

    #[test]
    fn shared_boundary_emits_in_position_order_before_the_next_paragraph() {
        let content = "aaaa\n\nbbbb";
        let images = vec![image(2, 6), image(1, 3), image(3, 6)];

        let blocks = interleave(content, &images);

        // offset after "aaaa" is 6, so all three fit the first break; the
        // position-6 pair keeps fetch order.
        assert_eq!(shape(&blocks), vec!["p:aaaa", "i:1", "i:2", "i:3", "p:bbbb"]);
    }

    #[test]
    fn each_image_is_emitted_exactly_once() {
        let content = "aa\n\nbb\n\ncc";
        let images = vec![image(1, 0), image(2, 4), image(3, 4), image(4, 100)];

        let blocks = interleave(content, &images);

        let emitted: Vec<i32> = blocks
            .iter()
            .filter_map(|block| match block {
                Block::Image(image) => Some(image.id),
                _ => None,
            })
            .collect();

        assert_eq!(emitted, vec![1, 2, 3, 4]);
    }

    #[test]
    fn no_images_is_just_paragraphs() {
        let blocks = interleave("aa\n\nbb", &[]);

        assert_eq!(shape(&blocks), vec!["p:aa", "p:bb"]);
    }

    #[test]
    fn negative_positions_are_not_lost() {
        let images = [image(1, -5)];

        let blocks = interleave("aa", &images);

        assert_eq!(shape(&blocks), vec!["p:aa", "i:1"]);
    }
}
