//! Weights, thresholds and buckets of the answer evaluator.

pub const SUPPORT_MAX: f64 = 4.0;
pub const CITATION_MAX: f64 = 2.0;
pub const COMPLETENESS_MAX: f64 = 3.0;
pub const CLARITY_MAX: f64 = 1.0;
pub const FINAL_MAX: f64 = 10.0;

/// Distinct content tokens an answer sentence must share with the evidence to count as
/// supported. Distinct from `lexical::DEFAULT_OVERLAP_THRESHOLD`.
pub const SUPPORT_OVERLAP_THRESHOLD: usize = 2;

/// Size of the expected keyword set drawn from the evidence.
pub const KEYWORD_TOP_K: usize = 20;

pub const CLARITY_IDEAL_MIN: f64 = 6.0;
pub const CLARITY_IDEAL_MAX: f64 = 40.0;
pub const CLARITY_ACCEPTABLE_MIN: f64 = 3.0;
pub const CLARITY_ACCEPTABLE_MAX: f64 = 60.0;

pub const CLARITY_IDEAL_SCORE: f64 = 1.0;
pub const CLARITY_ACCEPTABLE_SCORE: f64 = 0.5;
pub const CLARITY_POOR_SCORE: f64 = 0.2;

/// Bucket the mean tokens per sentence into a clarity score.
///
/// `0` maps to `0`; `[6, 40]` is ideal; `[3, 6)` and `(40, 60]` are acceptable; anything else
/// (including `(0, 3)` and above `60`) is poor.
pub fn clarity_for_avg_len(avg_tokens: f64) -> f64 {
    if avg_tokens <= 0.0 {
        0.0
    } else if (CLARITY_IDEAL_MIN..=CLARITY_IDEAL_MAX).contains(&avg_tokens) {
        CLARITY_IDEAL_SCORE
    } else if (CLARITY_ACCEPTABLE_MIN..CLARITY_IDEAL_MIN).contains(&avg_tokens)
        || (avg_tokens > CLARITY_IDEAL_MAX && avg_tokens <= CLARITY_ACCEPTABLE_MAX)
    {
        CLARITY_ACCEPTABLE_SCORE
    } else {
        CLARITY_POOR_SCORE
    }
}

/// Round to two decimals using the exact decimal value of `x`, with ties going to the even
/// digit (`1.125` becomes `1.12`, `0.375` becomes `0.38`).
pub fn round2(x: f64) -> f64 {
    format!("{x:.2}").parse().unwrap_or(x)
}
