// Copyright (c) The difftest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Judging the program under test against the voted oracle.

/// The result of comparing the program under test's output with the oracle.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Verdict {
    /// The outputs agree.
    Match,

    /// The outputs differ. The input is a bug-triggering case worth
    /// persisting.
    Defect,
}

/// Compares the output of the program under test against the oracle text.
///
/// Both sides are already normalized, so equality is exact: any difference,
/// including internal whitespace, is a defect.
pub fn judge(oracle_text: &str, put_output: &str) -> Verdict {
    if oracle_text == put_output {
        Verdict::Match
    } else {
        Verdict::Defect
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_equality() {
        assert_eq!(judge("42", "42"), Verdict::Match);
        assert_eq!(judge("42", "43"), Verdict::Defect);
        assert_eq!(judge("", ""), Verdict::Match);
    }

    #[test]
    fn internal_whitespace_matters() {
        assert_eq!(judge("1 2", "1  2"), Verdict::Defect);
        assert_eq!(judge("a\nb", "a\r\nb"), Verdict::Defect);
    }
}
