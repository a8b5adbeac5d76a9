//! Response shaping per mode
//!
//! Applied to every accepted or fallback draft, from the draft itself and the
//! active profile only. Nothing carries over between calls.

use draftgate_core::{GeneratedDraft, MediaSlot};
use draftgate_quality::ModeProfile;

/// Truncate on a character boundary; trailing whitespace is trimmed.
pub fn truncate_title(title: &str, max_chars: usize) -> String {
    let trimmed = title.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }
    trimmed
        .chars()
        .take(max_chars)
        .collect::<String>()
        .trim_end()
        .to_string()
}

/// Bring the media slot count within the profile's bounds.
pub fn fit_media_slots(
    mut slots: Vec<MediaSlot>,
    section_count: usize,
    keyword: &str,
    profile: &ModeProfile,
) -> Vec<MediaSlot> {
    if let Some(max) = profile.max_media_slots {
        slots.truncate(max);
    }

    let last_anchor = section_count.saturating_sub(1);
    for slot in slots.iter_mut() {
        slot.anchor = slot.anchor.min(last_anchor);
    }

    let mut next_id = 1;
    while slots.len() < profile.min_media_slots {
        while slots.iter().any(|s| s.id == format!("slot-{}", next_id)) {
            next_id += 1;
        }
        let position = slots.len();
        slots.push(MediaSlot {
            id: format!("slot-{}", next_id),
            kind: if position % 2 == 0 { "image" } else { "chart" }.to_string(),
            caption: format!("{} 관련 자료 {}", keyword, position + 1),
            anchor: position.min(last_anchor),
        });
    }
    slots
}

pub fn shape_draft(
    mut draft: GeneratedDraft,
    keyword: &str,
    profile: &ModeProfile,
    title_max_length: u32,
) -> GeneratedDraft {
    draft.title = truncate_title(&draft.title, title_max_length as usize);
    let slots = std::mem::take(&mut draft.media_slots);
    draft.media_slots = fit_media_slots(slots, draft.sections.len(), keyword, profile);
    draft
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(id: &str, anchor: usize) -> MediaSlot {
        MediaSlot {
            id: id.into(),
            kind: "image".into(),
            caption: String::new(),
            anchor,
        }
    }

    #[test]
    fn test_truncate_title_on_char_boundary() {
        assert_eq!(truncate_title("가나다라마바사", 3), "가나다");
        assert_eq!(truncate_title("  짧은 제목 ", 60), "짧은 제목");
        assert_eq!(truncate_title("ab cd", 3), "ab");
    }

    #[test]
    fn test_draft_keeps_at_most_one_slot() {
        let slots = vec![slot("a", 0), slot("b", 1), slot("c", 2)];
        let fitted = fit_media_slots(slots, 3, "금리", &ModeProfile::draft());
        assert_eq!(fitted.len(), 1);
        assert_eq!(fitted[0].id, "a");
    }

    #[test]
    fn test_longform_pads_to_three_with_unique_ids() {
        let slots = vec![slot("slot-1", 9)];
        let fitted = fit_media_slots(slots, 3, "금리", &ModeProfile::interactive_longform());
        assert_eq!(fitted.len(), 3);
        let ids: Vec<&str> = fitted.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["slot-1", "slot-2", "slot-3"]);
        assert!(fitted.iter().all(|s| s.anchor <= 2));
    }

    #[test]
    fn test_longform_keeps_extra_slots() {
        let slots = (0..5).map(|i| slot(&format!("s{}", i), i)).collect();
        let fitted = fit_media_slots(slots, 5, "금리", &ModeProfile::interactive_longform());
        assert_eq!(fitted.len(), 5);
    }
}
