use chrono::NaiveDate;
use serde::Serialize;

use crate::models::story::Story;

pub const HOURS_PER_DAY: usize = 24;

#[derive(Debug, Serialize)]
pub struct TimelineDay {
    pub date: NaiveDate,
    pub slots: Vec<HourSlot>,
}

#[derive(Debug, Serialize)]
pub struct HourSlot {
    pub hour: i16,
    pub stories: Vec<Story>,
}

/// Group one day's stories into 24 hour buckets. Every hour is present even
/// when empty, and input order within an hour is preserved.
pub fn project_day(date: NaiveDate, stories: Vec<Story>) -> TimelineDay {
    let mut slots: Vec<HourSlot> = (0..HOURS_PER_DAY as i16)
        .map(|hour| HourSlot {
            hour,
            stories: Vec::new(),
        })
        .collect();

    for story in stories {
        match slots.get_mut(story.story_hour as usize) {
            Some(slot) => slot.stories.push(story),
            None => {
                tracing::warn!(
                    story_id = %story.id,
                    hour = story.story_hour,
                    "Story hour is out of range; leaving it off the timeline"
                );
            }
        }
    }

    TimelineDay { date, slots }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing;
    use uuid::Uuid;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    #[test]
    fn test_empty_day_still_has_24_slots() {
        let day = project_day(date(), vec![]);
        assert_eq!(day.slots.len(), HOURS_PER_DAY);
        assert!(day.slots.iter().all(|s| s.stories.is_empty()));
        assert_eq!(day.slots[0].hour, 0);
        assert_eq!(day.slots[23].hour, 23);
    }

    #[test]
    fn test_stories_land_in_their_hour_buckets() {
        let owner = Uuid::new_v4();
        let stories = vec![
            testing::story(owner, date(), 3, "first at three"),
            testing::story(owner, date(), 3, "second at three"),
            testing::story(owner, date(), 17, "late afternoon"),
        ];

        let day = project_day(date(), stories);
        assert_eq!(day.slots[3].stories.len(), 2);
        assert_eq!(day.slots[17].stories.len(), 1);

        let occupied = day.slots.iter().filter(|s| !s.stories.is_empty()).count();
        assert_eq!(occupied, 2);
        assert_eq!(day.slots.len(), HOURS_PER_DAY);
    }

    #[test]
    fn test_order_within_hour_is_preserved() {
        let owner = Uuid::new_v4();
        let stories = vec![
            testing::story(owner, date(), 8, "breakfast"),
            testing::story(owner, date(), 8, "coffee after"),
        ];

        let day = project_day(date(), stories);
        assert_eq!(day.slots[8].stories[0].content, "breakfast");
        assert_eq!(day.slots[8].stories[1].content, "coffee after");
    }

    #[test]
    fn test_out_of_range_hour_is_dropped() {
        let owner = Uuid::new_v4();
        let stray = testing::story(owner, date(), 24, "should not appear");

        let day = project_day(date(), vec![stray]);
        assert!(day.slots.iter().all(|s| s.stories.is_empty()));
    }
}
