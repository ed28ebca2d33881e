use crate::CaptionTrack;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Tier {
    Exact,
    Contains,
    Other,
}

fn tier(label: &str, desired: &str) -> Tier {
    let label = label.to_lowercase();
    if label == desired {
        Tier::Exact
    } else if label.contains(desired) {
        Tier::Contains
    } else {
        Tier::Other
    }
}

/// Order tracks by closeness to `desired` (case-insensitive): exact label match,
/// then labels containing it, then the rest. Ties keep their original order.
pub fn rank_tracks(tracks: &[CaptionTrack], desired: &str) -> Vec<CaptionTrack> {
    let desired = desired.to_lowercase();
    let mut keyed: Vec<(Tier, usize, &CaptionTrack)> = tracks
        .iter()
        .enumerate()
        .map(|(idx, t)| (tier(&t.language_label, &desired), idx, t))
        .collect();
    keyed.sort_unstable_by_key(|&(tier, idx, _)| (tier, idx));
    keyed.into_iter().map(|(_, _, t)| t.clone()).collect()
}
