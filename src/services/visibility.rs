use uuid::Uuid;

use crate::models::story::Story;

/// Whether a story shows up for viewers other than its author. The flag
/// fails open: only an explicit false hides a story, so rows written before
/// the flag existed (None) stay shared.
pub fn is_visible(story: &Story) -> bool {
    story.is_public != Some(false)
}

/// Filter a shared timeline for `viewer`. Authors always see their own
/// stories; other people's hidden stories are dropped.
pub fn filter_for_viewer(stories: Vec<Story>, viewer: Uuid) -> Vec<Story> {
    stories
        .into_iter()
        .filter(|s| s.user_id == viewer || is_visible(s))
        .collect()
}
