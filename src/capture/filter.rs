use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use crate::error::ImportError;

/// Which actions of a capture get imported.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EventFilter {
    #[default]
    All,
    /// Inclusive event id window.
    Window { min: u32, max: u32 },
    /// Inclusive ranges, parsed from `"1-200;500-685"`.
    Ranges(Vec<RangeInclusive<u32>>),
}

impl EventFilter {
    /// Build a filter from the operator inputs: a window wins when `max` is
    /// set and not negative, then explicit ranges, then everything.
    pub fn from_bounds(min: Option<u32>, max: Option<i64>, ranges: Option<&str>) -> Result<Self, ImportError> {
        if let Some(max) = max.filter(|m| *m >= 0) {
            let max = u32::try_from(max)
                .map_err(|_| ImportError::Config(format!("event id {} is out of range", max)))?;
            let min = min.unwrap_or(0);
            if min > max {
                return Err(ImportError::Config(format!(
                    "event window {}..{} is reversed",
                    min, max
                )));
            }
            return Ok(EventFilter::Window { min, max });
        }
        match ranges {
            Some(text) => text.parse(),
            None => Ok(EventFilter::All),
        }
    }

    pub fn contains(&self, event_id: u32) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::Window { min, max } => (*min..=*max).contains(&event_id),
            EventFilter::Ranges(ranges) => ranges.iter().any(|r| r.contains(&event_id)),
        }
    }
}

fn parse_id(text: &str, whole: &str) -> Result<u32, ImportError> {
    text.trim()
        .parse()
        .map_err(|_| ImportError::Config(format!("invalid action range '{}'", whole)))
}

impl FromStr for EventFilter {
    type Err = ImportError;

    /// Empty input means every action.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut ranges = vec![];
        for part in s.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (start, end) = match part.split_once('-') {
                Some((a, b)) => (parse_id(a, part)?, parse_id(b, part)?),
                None => {
                    let id = parse_id(part, part)?;
                    (id, id)
                }
            };
            if start > end {
                return Err(ImportError::Config(format!(
                    "action range '{}' is reversed",
                    part
                )));
            }
            ranges.push(start..=end);
        }
        if ranges.is_empty() {
            Ok(EventFilter::All)
        } else {
            Ok(EventFilter::Ranges(ranges))
        }
    }
}

impl fmt::Display for EventFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventFilter::All => write!(f, "all actions"),
            EventFilter::Window { min, max } => write!(f, "actions {}-{}", min, max),
            EventFilter::Ranges(ranges) => {
                let parts: Vec<String> = ranges
                    .iter()
                    .map(|r| format!("{}-{}", r.start(), r.end()))
                    .collect();
                write!(f, "actions {}", parts.join(";"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ranges() {
        let filter: EventFilter = " 1-200; 500 - 685 ;42".parse().unwrap();
        assert_eq!(filter, EventFilter::Ranges(vec![1..=200, 500..=685, 42..=42]));
        assert!(filter.contains(1));
        assert!(filter.contains(685));
        assert!(filter.contains(42));
        assert!(!filter.contains(201));
        assert_eq!(filter.to_string(), "actions 1-200;500-685;42-42");
    }

    #[test]
    fn rejects_bad_ranges() {
        assert!(matches!("10-5".parse::<EventFilter>(), Err(ImportError::Config(_))));
        assert!(matches!("a-b".parse::<EventFilter>(), Err(ImportError::Config(_))));
        assert!(matches!("1-2-3".parse::<EventFilter>(), Err(ImportError::Config(_))));
    }

    #[test]
    fn empty_text_is_everything() {
        assert_eq!("".parse::<EventFilter>().unwrap(), EventFilter::All);
        assert_eq!(" ; ".parse::<EventFilter>().unwrap(), EventFilter::All);
    }

    #[test]
    fn window_takes_priority() {
        let filter = EventFilter::from_bounds(Some(10), Some(20), Some("1-5")).unwrap();
        assert_eq!(filter, EventFilter::Window { min: 10, max: 20 });
        assert!(filter.contains(10));
        assert!(filter.contains(20));
        assert!(!filter.contains(21));

        let unlimited = EventFilter::from_bounds(Some(10), Some(-1), Some("1-5")).unwrap();
        assert_eq!(unlimited, EventFilter::Ranges(vec![1..=5]));
        assert_eq!(EventFilter::from_bounds(None, None, None).unwrap(), EventFilter::All);
        assert!(EventFilter::from_bounds(Some(30), Some(20), None).is_err());
    }
}
