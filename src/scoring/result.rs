//! Score aggregate returned by a completed evaluation.

use std::fmt;

// ---------------------------------------------------------------------------
// Score
// ---------------------------------------------------------------------------

/// One scoring dimension as extracted from the server payload.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Score {
    Found(f64),
    /// No tag for this dimension was present.
    #[default]
    NotFound,
}

impl Score {
    /// Numeric value, with `NotFound` reported as `0.0`.
    ///
    /// ```
    /// use twister_eval::scoring::Score;
    ///
    /// assert_eq!(Score::Found(87.0).value(), 87.0);
    /// assert_eq!(Score::NotFound.value(), 0.0);
    /// ```
    pub fn value(&self) -> f64 {
        match self {
            Score::Found(v) => *v,
            Score::NotFound => 0.0,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Score::Found(_))
    }

    pub fn as_option(&self) -> Option<f64> {
        match self {
            Score::Found(v) => Some(*v),
            Score::NotFound => None,
        }
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Score::Found(v) => write!(f, "{v:.1}"),
            Score::NotFound => f.write_str("n/a"),
        }
    }
}

// ---------------------------------------------------------------------------
// Dimension
// ---------------------------------------------------------------------------

/// The scored dimensions, each with the tag names that may carry it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Overall,
    Pronunciation,
    Fluency,
    Integrity,
    Tone,
    Accuracy,
    Emotion,
}

impl Dimension {
    pub const ALL: [Dimension; 7] = [
        Dimension::Overall,
        Dimension::Pronunciation,
        Dimension::Fluency,
        Dimension::Integrity,
        Dimension::Tone,
        Dimension::Accuracy,
        Dimension::Emotion,
    ];

    /// Tag names searched for this dimension, primary first.
    pub fn tag_names(&self) -> &'static [&'static str] {
        match self {
            Dimension::Overall => &["overall_score", "overall", "total_score"],
            Dimension::Pronunciation => &["pronunciation_score", "pronunciation", "phone_score"],
            Dimension::Fluency => &["fluency_score", "fluency"],
            Dimension::Integrity => &["integrity_score", "integrity"],
            Dimension::Tone => &["tone_score", "tone"],
            Dimension::Accuracy => &["accuracy_score", "accuracy"],
            Dimension::Emotion => &["emotion_score", "emotion"],
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Dimension::Overall => "overall",
            Dimension::Pronunciation => "pronunciation",
            Dimension::Fluency => "fluency",
            Dimension::Integrity => "integrity",
            Dimension::Tone => "tone",
            Dimension::Accuracy => "accuracy",
            Dimension::Emotion => "emotion",
        }
    }
}

// ---------------------------------------------------------------------------
// WordScore
// ---------------------------------------------------------------------------

/// One mispronounced phone inside a word.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PhoneError {
    /// Phone as written by the engine, e.g. `h` or `ong`.
    pub content: String,
    /// `perr_msg` value; 0 means correct and never appears here.
    pub level: u8,
    /// Final (yunmu) rather than initial.
    pub is_yun: bool,
    /// `mono_tone` marker, e.g. `TONE2`; empty when absent.
    pub tone: String,
}

impl PhoneError {
    pub fn severity(&self) -> &'static str {
        match self.level {
            1 => "minor",
            2 => "clear",
            3 => "severe",
            _ => "unknown",
        }
    }
}

/// Phone-level error detail for a word.
///
/// `Unavailable` when the word carries no `<phone>` children at all;
/// otherwise the phones flagged with a nonzero `perr_msg`, possibly none.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PhoneDetail {
    #[default]
    Unavailable,
    Errors(Vec<PhoneError>),
}

impl PhoneDetail {
    /// Flagged phones; empty when unavailable.
    pub fn errors(&self) -> &[PhoneError] {
        match self {
            PhoneDetail::Unavailable => &[],
            PhoneDetail::Errors(errors) => errors,
        }
    }
}

/// Per-word detail from a `<word ...>` element.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WordScore {
    pub content: String,
    /// Pinyin with tone digit, e.g. `hong2`.
    pub symbol: String,
    /// Start position in 10 ms frames.
    pub start_offset: u32,
    /// End position in 10 ms frames.
    pub end_offset: u32,
    pub duration_ms: u32,
    pub phone_errors: PhoneDetail,
}

// ---------------------------------------------------------------------------
// ScoreResult
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScoreResult {
    pub overall: Score,
    pub pronunciation: Score,
    pub fluency: Score,
    pub integrity: Score,
    pub tone: Score,
    pub accuracy: Score,
    pub emotion: Score,
    pub word_details: Vec<WordScore>,
    pub rejected: bool,
    pub reject_reason: Option<String>,
    /// Decoded payload text the scores were extracted from.
    pub raw_payload: String,
}

impl ScoreResult {
    pub fn get(&self, dim: Dimension) -> Score {
        match dim {
            Dimension::Overall => self.overall,
            Dimension::Pronunciation => self.pronunciation,
            Dimension::Fluency => self.fluency,
            Dimension::Integrity => self.integrity,
            Dimension::Tone => self.tone,
            Dimension::Accuracy => self.accuracy,
            Dimension::Emotion => self.emotion,
        }
    }

    pub(crate) fn set(&mut self, dim: Dimension, score: Score) {
        let slot = match dim {
            Dimension::Overall => &mut self.overall,
            Dimension::Pronunciation => &mut self.pronunciation,
            Dimension::Fluency => &mut self.fluency,
            Dimension::Integrity => &mut self.integrity,
            Dimension::Tone => &mut self.tone,
            Dimension::Accuracy => &mut self.accuracy,
            Dimension::Emotion => &mut self.emotion,
        };
        *slot = score;
    }

    /// Number of dimensions that were present in the payload.
    pub fn found_count(&self) -> usize {
        Dimension::ALL
            .iter()
            .filter(|d| self.get(**d).is_found())
            .count()
    }
}
