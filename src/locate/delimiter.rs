use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{NormalizeError, Result};

/// Candidates tried by [`Delimiter::Detect`], in tie-breaking order.
pub const CANDIDATES: [char; 4] = [',', ';', '\t', '|'];

/// How the field separator of a file is chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Delimiter {
    /// Pick the most frequent candidate on the header line.
    #[default]
    Detect,
    Explicit(char),
}

impl Delimiter {
    /// Resolves the policy to the byte the CSV reader needs.
    /// `header` and `line` are only consulted for [`Delimiter::Detect`].
    pub fn resolve(&self, header: &str, line: usize) -> Result<u8> {
        match *self {
            Delimiter::Explicit(c) => ascii_byte(c),
            Delimiter::Detect => detect_delimiter(header)
                .map(|c| c as u8)
                .ok_or(NormalizeError::UndetectableDelimiter { line }),
        }
    }

    pub fn validate(&self) -> Result<()> {
        match *self {
            Delimiter::Explicit(c) => ascii_byte(c).map(|_| ()),
            Delimiter::Detect => Ok(()),
        }
    }
}

/// Parses a user answer: blank or `detect`, `tab` / `\t`, or one character.
impl FromStr for Delimiter {
    type Err = NormalizeError;

    fn from_str(s: &str) -> Result<Self> {
        if s == "\t" {
            return Ok(Delimiter::Explicit('\t'));
        }
        let t = s.trim();
        let mut chars = t.chars();
        match (t, chars.next(), chars.next()) {
            ("" | "detect", _, _) => Ok(Delimiter::Detect),
            ("tab" | "\\t", _, _) => Ok(Delimiter::Explicit('\t')),
            (_, Some(c), None) => {
                ascii_byte(c)?;
                Ok(Delimiter::Explicit(c))
            }
            _ => Err(NormalizeError::InvalidTemplate(format!(
                "`{}` is not a delimiter",
                s
            ))),
        }
    }
}

pub fn ascii_byte(c: char) -> Result<u8> {
    if c.is_ascii() && c != '"' && c != '\n' && c != '\r' {
        Ok(c as u8)
    } else {
        Err(NormalizeError::InvalidDelimiter(c))
    }
}

/// Counts each candidate outside double-quoted sections and returns the most frequent one.
pub fn detect_delimiter(line: &str) -> Option<char> {
    let mut counts = [0usize; CANDIDATES.len()];
    let mut in_quotes = false;
    for ch in line.chars() {
        if ch == '"' {
            in_quotes = !in_quotes;
            continue;
        }
        if in_quotes {
            continue;
        }
        if let Some(i) = CANDIDATES.iter().position(|&c| c == ch) {
            counts[i] += 1;
        }
    }

    // max_by_key keeps the last maximum, so walk in reverse to favour earlier candidates
    counts
        .iter()
        .enumerate()
        .rev()
        .filter(|&(_, &n)| n > 0)
        .max_by_key(|&(_, &n)| n)
        .map(|(i, _)| CANDIDATES[i])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_common_separators() {
        assert_eq!(detect_delimiter("time,rpm,speed"), Some(','));
        assert_eq!(detect_delimiter("time;rpm;speed"), Some(';'));
        assert_eq!(detect_delimiter("time\trpm\tspeed"), Some('\t'));
        assert_eq!(detect_delimiter("time|rpm"), Some('|'));
    }

    #[test]
    fn ignores_separators_inside_quotes() {
        assert_eq!(detect_delimiter(r#""a,b,c";"d";"e""#), Some(';'));
    }

    #[test]
    fn ties_go_to_the_earlier_candidate() {
        assert_eq!(detect_delimiter("a;b,c"), Some(','));
    }

    #[test]
    fn single_field_header_cannot_be_detected() {
        assert_eq!(detect_delimiter("TIME"), None);
        let err = Delimiter::Detect.resolve("TIME", 4).unwrap_err();
        assert!(matches!(err, NormalizeError::UndetectableDelimiter { line: 4 }));
    }

    #[test]
    fn parses_answers() {
        assert_eq!("".parse::<Delimiter>().unwrap(), Delimiter::Detect);
        assert_eq!(" detect ".parse::<Delimiter>().unwrap(), Delimiter::Detect);
        assert_eq!("\t".parse::<Delimiter>().unwrap(), Delimiter::Explicit('\t'));
        assert_eq!("\\t".parse::<Delimiter>().unwrap(), Delimiter::Explicit('\t'));
        assert_eq!("tab".parse::<Delimiter>().unwrap(), Delimiter::Explicit('\t'));
        assert_eq!(";".parse::<Delimiter>().unwrap(), Delimiter::Explicit(';'));
        assert!(";;".parse::<Delimiter>().is_err());
        assert!("µ".parse::<Delimiter>().is_err());
    }

    #[test]
    fn explicit_must_be_ascii() {
        assert_eq!(Delimiter::Explicit(';').resolve("", 1).unwrap(), b';');
        assert!(Delimiter::Explicit('§').validate().is_err());
        assert!(Delimiter::Explicit('"').validate().is_err());
    }
}
