use core::ops::RangeInclusive;
use core::str::FromStr;

/// Comma separated field reader over one NMEA sentence.
///
/// Every read consumes one field. A field that is missing or does not parse
/// yields `None` without affecting the following fields.
#[derive(Debug, Clone)]
pub struct NmeaInputLine<'a> {
    rest: Option<&'a str>,
}

impl<'a> NmeaInputLine<'a> {
    /// Takes a sentence with or without the `*HH` checksum and line end.
    pub fn new(line: &'a str) -> Self {
        let line = match line.rfind('*') {
            Some(star) => &line[..star],
            None => line.trim_end_matches(['\r', '\n']),
        };
        Self { rest: Some(line) }
    }

    pub fn is_empty(&self) -> bool {
        self.rest.is_none()
    }

    /// Raw next field, empty when exhausted.
    pub fn read_view(&mut self) -> &'a str {
        let Some(rest) = self.rest else {
            return "";
        };
        match rest.split_once(',') {
            Some((field, tail)) => {
                self.rest = Some(tail);
                field
            }
            None => {
                self.rest = None;
                rest
            }
        }
    }

    pub fn skip(&mut self, fields: usize) {
        for _ in 0..fields {
            self.read_view();
        }
    }

    /// The field if it is exactly one character.
    pub fn read_one_char(&mut self) -> Option<char> {
        let mut chars = self.read_view().chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Some(c),
            _ => None,
        }
    }

    pub fn read_compare(&mut self, expected: &str) -> bool {
        self.read_view() == expected
    }

    pub fn read_checked<T: FromStr>(&mut self) -> Option<T> {
        let field = self.read_view().trim();
        if field.is_empty() {
            return None;
        }
        field.parse().ok()
    }

    /// Like [`Self::read_checked`], but values outside `range` (and NaN)
    /// are dropped.
    pub fn read_checked_range<T: FromStr + PartialOrd>(
        &mut self,
        range: RangeInclusive<T>,
    ) -> Option<T> {
        self.read_checked().filter(|v| range.contains(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_fields_in_order() {
        let mut line = NmeaInputLine::new("PLARW,270,T,15.5,K,A,A*3C\r\n");
        assert!(line.read_compare("PLARW"));
        assert_eq!(line.read_checked::<u16>(), Some(270));
        assert_eq!(line.read_one_char(), Some('T'));
        assert_eq!(line.read_checked::<f32>(), Some(15.5));
        line.skip(2);
        assert!(!line.is_empty());
        assert_eq!(line.read_view(), "A");
        assert!(line.is_empty());
        assert_eq!(line.read_view(), "");
        assert_eq!(line.read_checked::<f32>(), None);
    }

    #[test]
    fn malformed_fields_do_not_stop_parsing() {
        let mut line = NmeaInputLine::new("POV,E,abc,,1.5,S,999");
        line.skip(1);
        assert_eq!(line.read_one_char(), Some('E'));
        assert_eq!(line.read_checked::<f32>(), None);
        assert_eq!(line.read_checked::<f32>(), None);
        assert_eq!(line.read_checked::<f32>(), Some(1.5));
        assert_eq!(line.read_one_char(), Some('S'));
        assert_eq!(line.read_checked_range(0.0f32..=500.0), None);
        assert!(line.is_empty());
    }

    #[test]
    fn range_check_rejects_nan() {
        let mut line = NmeaInputLine::new("NaN,inf,42");
        assert_eq!(line.read_checked_range(0.0f32..=100.0), None);
        assert_eq!(line.read_checked_range(0.0f32..=100.0), None);
        assert_eq!(line.read_checked_range(0.0f32..=100.0), Some(42.0));
    }

    #[test]
    fn multi_char_field_is_not_a_char() {
        let mut line = NmeaInputLine::new("AB,,C");
        assert_eq!(line.read_one_char(), None);
        assert_eq!(line.read_one_char(), None);
        assert_eq!(line.read_one_char(), Some('C'));
    }
}
