//! Result payload parsing and score presentation.
//!
//! ```text
//! final envelope ──▶ parse_envelope ──▶ ScoreResult ──▶ Grade::from_score(overall)
//!                    (base64 decode,      (Score::Found / NotFound
//!                     tag scan)            per dimension)
//! ```

pub mod grade;
pub mod parser;
pub mod result;

pub use grade::Grade;
pub use parser::{decode_payload, parse_envelope, parse_payload, ParseError};
pub use result::{Dimension, PhoneDetail, PhoneError, Score, ScoreResult, WordScore};
