// crates/credence-scoring/src/calculator.rs
//
// Pure scoring functions mapping raw signal counts to clamped sub-scores.
//
//   total = clamp(0, 100, base + https + analysis + community)
//
//   base       50 (constant)
//   https      0 or 10
//   analysis   clamp(-30, 30, 2 * supporting - 3 * contradicting)
//   community  clamp(-20, 20, upvotes - downvotes)
//
// Stateless, deterministic, side-effect-free. Never touches storage.

/// Fixed base score of every domain.
pub const BASE_SCORE: i64 = 50;

/// Bonus for domains first seen over HTTPS.
pub const HTTPS_BONUS: i64 = 10;

/// Points per supporting citation.
pub const SUPPORTING_WEIGHT: i64 = 2;

/// Points lost per contradicting citation.
pub const CONTRADICTING_WEIGHT: i64 = 3;

/// Absolute bound of the analysis sub-score.
pub const ANALYSIS_BOUND: i64 = 30;

/// Absolute bound of the community sub-score.
pub const COMMUNITY_BOUND: i64 = 20;

/// Upper bound of the total score.
pub const MAX_TOTAL: i64 = 100;

fn count(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// `10` for HTTPS, `0` otherwise.
pub fn https_score(is_https: bool) -> i64 {
    if is_https {
        HTTPS_BONUS
    } else {
        0
    }
}

/// Evidence sub-score in `[-30, 30]`.
pub fn analysis_score(supporting: u64, contradicting: u64) -> i64 {
    let raw = count(supporting)
        .saturating_mul(SUPPORTING_WEIGHT)
        .saturating_sub(count(contradicting).saturating_mul(CONTRADICTING_WEIGHT));
    raw.clamp(-ANALYSIS_BOUND, ANALYSIS_BOUND)
}

/// Community sub-score in `[-20, 20]`.
pub fn community_score(upvotes: u64, downvotes: u64) -> i64 {
    count(upvotes)
        .saturating_sub(count(downvotes))
        .clamp(-COMMUNITY_BOUND, COMMUNITY_BOUND)
}

/// Total credibility in `[0, 100]`.
pub fn total_score(https: i64, analysis: i64, community: i64) -> i64 {
    BASE_SCORE
        .saturating_add(https)
        .saturating_add(analysis)
        .saturating_add(community)
        .clamp(0, MAX_TOTAL)
}
