//! Parser for the cohort list syntax used in scenario files:
//!
//! ```text
//! 10-30(A-35.0) 45 50-60(20)
//! ```
//!
//! Items are whitespace separated. Each is a value or a `start-end` range,
//! optionally followed by `(N)` trees to remove or `(T-R)` where `T` is a
//! distribution tag (`A`, `B`, `D`) and `R` the residual basal area (m²/ha).

use thiserror::Error;

use super::range::MeasureRange;
use super::selector::{CohortMeasure, CohortSelector, DistributionOrder, RangeEntry, RemovalSpec};

/// Upper bound for tree counts and residual basal areas.
pub const MAX_REMOVAL_VALUE: u32 = 500_000;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SelectionParseError {
    #[error("no cohort values or ranges given")]
    Empty,
    #[error("\"{literal}\" is not a valid value or range: {reason}")]
    Range { literal: String, reason: String },
    #[error("\"{literal}\" is not a valid removal specifier: {reason}")]
    Removal { literal: String, reason: String },
}

/// Parse state for one cohort list. Consumed by [`RangeListParser::parse`].
pub struct RangeListParser<'a> {
    text: &'a str,
    pos: usize,
    measure: CohortMeasure,
}

impl<'a> RangeListParser<'a> {
    pub fn new(text: &'a str, measure: CohortMeasure) -> Self {
        Self {
            text,
            pos: 0,
            measure,
        }
    }

    pub fn parse(mut self) -> Result<CohortSelector, SelectionParseError> {
        let mut entries = Vec::new();
        loop {
            self.skip_whitespace();
            if self.peek().is_none() {
                break;
            }
            entries.push(self.read_entry()?);
        }
        if entries.is_empty() {
            return Err(SelectionParseError::Empty);
        }
        Ok(CohortSelector::new(self.measure, entries))
    }

    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn read_while(&mut self, keep: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if keep(c)) {
            self.bump();
        }
        &self.text[start..self.pos]
    }

    fn skip_whitespace(&mut self) {
        self.read_while(char::is_whitespace);
    }

    fn read_entry(&mut self) -> Result<RangeEntry, SelectionParseError> {
        let word = self.read_while(|c| !c.is_whitespace() && c != '(');
        if word.is_empty() {
            let literal = self.read_while(|c| !c.is_whitespace());
            return Err(SelectionParseError::Range {
                literal: literal.to_string(),
                reason: "expected a value or range before \"(\"".to_string(),
            });
        }
        let range = parse_range(word, self.measure).map_err(|reason| SelectionParseError::Range {
            literal: word.to_string(),
            reason,
        })?;

        let checkpoint = self.pos;
        self.skip_whitespace();
        let removal = if self.peek() == Some('(') {
            Some(self.read_removal()?)
        } else {
            self.pos = checkpoint;
            None
        };
        Ok(RangeEntry { range, removal })
    }

    fn read_removal(&mut self) -> Result<RemovalSpec, SelectionParseError> {
        let start = self.pos;
        self.bump();
        self.skip_whitespace();
        let value = self.read_while(|c| !c.is_whitespace() && c != ')' && c != '(');
        self.skip_whitespace();
        let next = self.peek();
        if next == Some(')') {
            self.bump();
        }
        let literal = self.text[start..self.pos].to_string();

        if value.is_empty() {
            return Err(SelectionParseError::Removal {
                literal,
                reason: "missing value after \"(\"".to_string(),
            });
        }
        match next {
            Some(')') => {}
            None => {
                return Err(SelectionParseError::Removal {
                    literal,
                    reason: "missing \")\"".to_string(),
                })
            }
            Some(c) => {
                return Err(SelectionParseError::Removal {
                    literal,
                    reason: format!("expected \")\" but found \"{c}\""),
                })
            }
        }
        parse_removal(value).map_err(|reason| SelectionParseError::Removal { literal, reason })
    }
}

fn parse_range(word: &str, measure: CohortMeasure) -> Result<MeasureRange, String> {
    let Some((start, end)) = word.split_once('-') else {
        return parse_value(word, measure).map(MeasureRange::single);
    };
    if end.contains('-') {
        return Err("valid format for a range is #-#".to_string());
    }
    match (start.is_empty(), end.is_empty()) {
        (true, true) => return Err("the range has no start and end values".to_string()),
        (true, false) => return Err("the range has no start value".to_string()),
        (false, true) => return Err("the range has no end value".to_string()),
        (false, false) => {}
    }
    let start = parse_value(start, measure)?;
    let end = parse_value(end, measure)?;
    if start < 0.0 {
        return Err("the start value must be >= 0".to_string());
    }
    if start > end {
        return Err(format!("the start value {start} is greater than the end value {end}"));
    }
    Ok(MeasureRange::new(start, end))
}

fn parse_value(text: &str, measure: CohortMeasure) -> Result<f64, String> {
    match measure {
        CohortMeasure::Diameter => {
            let value: f64 = text
                .parse()
                .map_err(|_| format!("\"{text}\" is not a valid diameter"))?;
            if !value.is_finite() || value < 0.0 {
                return Err(format!("\"{text}\" is not a valid diameter"));
            }
            Ok((value * 10.0).round() / 10.0)
        }
        CohortMeasure::Age => {
            let value: u32 = text
                .parse()
                .map_err(|_| format!("\"{text}\" is not a valid age"))?;
            if value > u32::from(u16::MAX) {
                return Err(format!("{value} is too large for an age; max = 65,535"));
            }
            Ok(f64::from(value))
        }
    }
}

fn parse_removal(value: &str) -> Result<RemovalSpec, String> {
    match value.split_once('-') {
        Some((tag, residual)) if !tag.is_empty() => {
            let order = DistributionOrder::from_tag(tag)
                .ok_or_else(|| format!("unknown distribution \"{tag}\"; expected A, B or D"))?;
            let basal_area: f64 = residual
                .parse()
                .map_err(|_| format!("\"{residual}\" is not a valid residual basal area"))?;
            if !(0.0..=f64::from(MAX_REMOVAL_VALUE)).contains(&basal_area) {
                return Err(format!(
                    "residual basal area {residual} is not between 0 and 500,000"
                ));
            }
            Ok(RemovalSpec::Residual { order, basal_area })
        }
        _ => {
            let trees: i64 = value
                .parse()
                .map_err(|_| format!("\"{value}\" is not a valid number of trees"))?;
            if !(0..=i64::from(MAX_REMOVAL_VALUE)).contains(&trees) {
                return Err(format!("{trees} is not between 0 and 500,000"));
            }
            Ok(RemovalSpec::TreeCount(trees as u32))
        }
    }
}
