//! Externally tunable search parameters.

use serde::Deserialize;

/// Default number of candidates each fused retriever contributes.
pub const DEFAULT_RANK_WINDOW_SIZE: usize = 100;

/// Default rank constant in the reciprocal-rank-fusion formula.
pub const DEFAULT_RANK_CONSTANT: f32 = 60.0;

/// Default minimum fused score.
///
/// Fused scores are reciprocal-rank sums, so they live well below any
/// lexical score floor; this cutoff only sheds candidates that ranked
/// near the bottom of a single retriever's window.
pub const DEFAULT_MIN_FUSED_SCORE: f32 = 0.01;

/// Tunable knobs for one search deployment.
///
/// Loaded from configuration rather than hard-coded: the fusion numbers
/// in particular are tuning observations, not invariants.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchTuning {
    /// Candidates each fused retriever contributes before fusion.
    pub rank_window_size: usize,
    /// Rank constant in the fusion formula `1 / (rank_constant + rank)`.
    pub rank_constant: f32,
    /// Whether fused hits must pass a text-match confirmation query.
    pub require_text_match: bool,
    /// Fused hits scoring below this are discarded.
    pub min_fused_score: f32,
    /// Whether the strict-matching policy applies to plain queries.
    pub strict_relevance: bool,
    /// Whether specifications with semantic fields run the fused path.
    pub hybrid: bool,
}

impl Default for SearchTuning {
    fn default() -> Self {
        Self {
            rank_window_size: DEFAULT_RANK_WINDOW_SIZE,
            rank_constant: DEFAULT_RANK_CONSTANT,
            require_text_match: true,
            min_fused_score: DEFAULT_MIN_FUSED_SCORE,
            strict_relevance: true,
            hybrid: true,
        }
    }
}

impl SearchTuning {
    /// Parses tuning from a TOML document, filling omitted keys with
    /// defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    /// Sets the fusion candidate window.
    pub fn with_rank_window_size(mut self, size: usize) -> Self {
        self.rank_window_size = size;
        self
    }

    /// Sets the fusion rank constant.
    pub fn with_rank_constant(mut self, constant: f32) -> Self {
        self.rank_constant = constant;
        self
    }

    /// Enables or disables the text-match confirmation pass.
    pub fn with_require_text_match(mut self, required: bool) -> Self {
        self.require_text_match = required;
        self
    }

    /// Sets the minimum fused score.
    pub fn with_min_fused_score(mut self, score: f32) -> Self {
        self.min_fused_score = score;
        self
    }

    /// Enables or disables the strict-matching policy.
    pub fn with_strict_relevance(mut self, strict: bool) -> Self {
        self.strict_relevance = strict;
        self
    }

    /// Enables or disables hybrid execution.
    pub fn with_hybrid(mut self, hybrid: bool) -> Self {
        self.hybrid = hybrid;
        self
    }
}
