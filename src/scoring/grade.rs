//! Grade bands for an overall score.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Grade {
    NeedsWork,
    Pass,
    Good,
    Excellent,
}

impl Grade {
    /// ```
    /// use twister_eval::scoring::Grade;
    ///
    /// assert_eq!(Grade::from_score(95.0), Grade::Excellent);
    /// assert_eq!(Grade::from_score(84.9), Grade::Pass);
    /// ```
    pub fn from_score(score: f64) -> Self {
        if score >= 95.0 {
            Grade::Excellent
        } else if score >= 85.0 {
            Grade::Good
        } else if score >= 75.0 {
            Grade::Pass
        } else {
            Grade::NeedsWork
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Grade::Excellent => "Excellent",
            Grade::Good => "Good",
            Grade::Pass => "Pass",
            Grade::NeedsWork => "Needs work",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_boundaries() {
        assert_eq!(Grade::from_score(100.0), Grade::Excellent);
        assert_eq!(Grade::from_score(95.0), Grade::Excellent);
        assert_eq!(Grade::from_score(94.99), Grade::Good);
        assert_eq!(Grade::from_score(85.0), Grade::Good);
        assert_eq!(Grade::from_score(75.0), Grade::Pass);
        assert_eq!(Grade::from_score(74.9), Grade::NeedsWork);
        assert_eq!(Grade::from_score(0.0), Grade::NeedsWork);
    }

    #[test]
    fn grades_are_ordered() {
        assert!(Grade::Excellent > Grade::Good);
        assert!(Grade::Pass > Grade::NeedsWork);
    }

    #[test]
    fn label_needs_work() {
        assert_eq!(Grade::NeedsWork.to_string(), "Needs work");
    }
}
