//! Rating tokens → integer 1..=5
//!
//! Accepts integers, numeral strings and rating words. Words and digits are
//! found anywhere in the text, so `"star-rating Three"`, `"starRatingFive"`
//! and `"4stars"` all resolve. Text that is a number as a whole is
//! range-checked instead of searched.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::RawValue;

/// Word → rating table. Digits `1..=5` are always recognised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingVocabulary {
    pub words: BTreeMap<String, u8>,
}

impl Default for RatingVocabulary {
    fn default() -> Self {
        let words = [("one", 1), ("two", 2), ("three", 3), ("four", 4), ("five", 5)]
            .into_iter()
            .map(|(word, value)| (word.to_string(), value))
            .collect();
        Self { words }
    }
}

/// Rating parser built from an immutable vocabulary.
#[derive(Debug, Clone)]
pub struct RatingParser {
    words: BTreeMap<String, u8>,
    pattern: Regex,
}

impl RatingParser {
    pub fn new(vocabulary: &RatingVocabulary) -> Result<Self, regex::Error> {
        let words: BTreeMap<String, u8> = vocabulary
            .words
            .iter()
            .map(|(word, value)| (word.to_lowercase(), *value))
            .collect();

        // Longer words first so that alternation never stops at a prefix.
        let mut alternatives: Vec<String> = words.keys().map(|w| regex::escape(w)).collect();
        alternatives.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        alternatives.push("[1-5]".to_string());

        let pattern = RegexBuilder::new(&format!("({})", alternatives.join("|")))
            .case_insensitive(true)
            .build()?;

        Ok(Self { words, pattern })
    }

    pub fn parse(&self, raw: &RawValue) -> Option<u8> {
        match raw {
            RawValue::Integer(n) => Self::in_range(*n),
            RawValue::Float(f) => Self::from_float(*f),
            RawValue::Text(text) => self.parse_text(text),
        }
    }

    pub fn parse_text(&self, text: &str) -> Option<u8> {
        let trimmed = text.trim();
        if let Ok(n) = trimmed.parse::<i64>() {
            return Self::in_range(n);
        }
        if let Ok(f) = trimmed.parse::<f64>() {
            return Self::from_float(f);
        }

        let token = self.pattern.captures(text)?.get(1)?.as_str().to_lowercase();
        let value = match token.parse::<i64>() {
            Ok(n) => Self::in_range(n)?,
            Err(_) => *self.words.get(&token)?,
        };
        Self::in_range(i64::from(value))
    }

    fn from_float(f: f64) -> Option<u8> {
        (f.is_finite() && f.fract() == 0.0).then(|| Self::in_range(f as i64)).flatten()
    }

    fn in_range(n: i64) -> Option<u8> {
        (1..=5).contains(&n).then_some(n as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn parser() -> RatingParser {
        RatingParser::new(&RatingVocabulary::default()).unwrap()
    }

    #[rstest]
    #[case("star-rating Three", Some(3))]
    #[case("Three", Some(3))]
    #[case("FIVE", Some(5))]
    #[case("star-rating one", Some(1))]
    #[case("4", Some(4))]
    #[case("rated 2 of 5", Some(2))]
    #[case("star-rating_Three", Some(3))]
    #[case("4stars", Some(4))]
    #[case("rating:3stars", Some(3))]
    #[case("starRatingFive", Some(5))]
    #[case("none", Some(1))]
    #[case(" 3.0 ", Some(3))]
    #[case("star-rating Zero", None)]
    #[case("10", None)]
    #[case("-2", None)]
    #[case("4.5", None)]
    #[case("", None)]
    fn parses_rating_text(#[case] raw: &str, #[case] expected: Option<u8>) {
        assert_eq!(parser().parse_text(raw), expected);
    }

    #[rstest]
    #[case(RawValue::Integer(3), Some(3))]
    #[case(RawValue::Integer(0), None)]
    #[case(RawValue::Integer(6), None)]
    #[case(RawValue::Integer(-2), None)]
    #[case(RawValue::Float(4.0), Some(4))]
    #[case(RawValue::Float(4.5), None)]
    fn numeric_ratings_are_never_clamped(#[case] raw: RawValue, #[case] expected: Option<u8>) {
        assert_eq!(parser().parse(&raw), expected);
    }

    #[test]
    fn custom_vocabulary_replaces_words() {
        let mut vocabulary = RatingVocabulary { words: BTreeMap::new() };
        vocabulary.words.insert("trois".to_string(), 3);
        let parser = RatingParser::new(&vocabulary).unwrap();

        assert_eq!(parser.parse_text("star-rating Trois"), Some(3));
        assert_eq!(parser.parse_text("star-rating Three"), None);
        assert_eq!(parser.parse_text("5"), Some(5));
    }

    proptest! {
        #[test]
        fn embedded_token_is_found(
            index in 0usize..10,
            upper in any::<bool>(),
            prefix in "[a-z\\-]{0,12}",
        ) {
            let tokens = ["one", "two", "three", "four", "five", "1", "2", "3", "4", "5"];
            let token = if upper { tokens[index].to_uppercase() } else { tokens[index].to_string() };
            let text = format!("{prefix} {token} star");
            let expected = (index % 5 + 1) as u8;

            // the prefix may itself spell a rating word
            let rating_parser = parser();
            if rating_parser.parse_text(&prefix).is_none() {
                prop_assert_eq!(rating_parser.parse_text(&text), Some(expected));
            }
        }
    }
}
