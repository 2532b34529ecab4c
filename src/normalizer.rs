use crate::model::RegionOutcome;

const BIDEN_FILL: &str = "#1665cf";
const TRUMP_FILL: &str = "#cd2d37";
const TIED_FILL: &str = "#d78401";
const IN_PROGRESS_FILL: &str = "url(#inProgress)";
const NO_RESULTS_FILL: &str = "#a4a4a4";

/// Maps a region's fill attribute to its outcome. Unrecognized fills are `Unknown`.
pub fn normalize_fill(fill: &str) -> RegionOutcome {
    let fill = fill.trim();

    if fill == IN_PROGRESS_FILL {
        return RegionOutcome::InProgress;
    }

    match fill.to_ascii_lowercase().as_str() {
        BIDEN_FILL => RegionOutcome::Biden,
        TRUMP_FILL => RegionOutcome::Trump,
        TIED_FILL => RegionOutcome::Tied,
        NO_RESULTS_FILL => RegionOutcome::NoResults,
        _ => RegionOutcome::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_fills_map_to_outcomes() {
        assert_eq!(normalize_fill("#1665cf"), RegionOutcome::Biden);
        assert_eq!(normalize_fill("#cd2d37"), RegionOutcome::Trump);
        assert_eq!(normalize_fill("#d78401"), RegionOutcome::Tied);
        assert_eq!(normalize_fill("url(#inProgress)"), RegionOutcome::InProgress);
        assert_eq!(normalize_fill("#a4a4a4"), RegionOutcome::NoResults);
    }

    #[test]
    fn hex_fills_ignore_case_and_padding() {
        assert_eq!(normalize_fill(" #1665CF "), RegionOutcome::Biden);
        assert_eq!(normalize_fill("#CD2D37"), RegionOutcome::Trump);
    }

    #[test]
    fn anything_else_is_unknown() {
        assert_eq!(normalize_fill(""), RegionOutcome::Unknown);
        assert_eq!(normalize_fill("#000000"), RegionOutcome::Unknown);
        assert_eq!(normalize_fill("url(#somethingElse)"), RegionOutcome::Unknown);
        assert_eq!(normalize_fill("blue"), RegionOutcome::Unknown);
    }
}
