//! Timeclock text parser
//!
//! Turns text pasted from Timeero into raw visit records. The export is
//! line-oriented: each entry is seven meaningful lines (branch, time in,
//! date in, time out, date out, duration, mileage) and the mileage line is
//! the only one containing the word "miles". Blank lines, dashes and
//! timezone markers are interleaved unpredictably and carry no data.
//!
//! Entries with the wrong number of fields are dropped whole; a partial
//! record is never emitted.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{RawVisit, FIELDS_PER_VISIT};

/// Marker found only on the last line of each entry
pub const DEFAULT_TERMINATOR: &str = "miles";

/// Lines that never carry entry data
pub const DEFAULT_NOISE_TOKENS: [&str; 3] = ["CST", "", "-"];

/// Tunable tokens for the line grammar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserSettings {
    /// Lines equal to one of these (after control characters are stripped) are skipped
    pub noise_tokens: Vec<String>,
    /// Substring that closes an entry
    pub terminator: String,
}

impl Default for ParserSettings {
    fn default() -> Self {
        Self {
            noise_tokens: DEFAULT_NOISE_TOKENS.iter().map(|s| s.to_string()).collect(),
            terminator: DEFAULT_TERMINATOR.to_string(),
        }
    }
}

/// Line counters collected while parsing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    pub lines_read: usize,
    pub noise_lines: usize,
    pub groups_discarded: usize,
    pub trailing_fields: usize,
}

/// Visits extracted from one paste, in input order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseOutcome {
    pub visits: Vec<RawVisit>,
    pub stats: ParseStats,
}

/// Parser for pasted timeclock text
#[derive(Debug, Clone, Default)]
pub struct VisitParser {
    settings: ParserSettings,
}

impl VisitParser {
    pub fn new(settings: ParserSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ParserSettings {
        &self.settings
    }

    /// Parse a whole paste, splitting on newlines
    pub fn parse(&self, text: &str) -> ParseOutcome {
        self.parse_lines(text.split('\n'))
    }

    /// Parse an already split sequence of lines
    pub fn parse_lines<I, S>(&self, lines: I) -> ParseOutcome
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut state = ParseState::default();
        for (idx, line) in lines.into_iter().enumerate() {
            state.feed(idx + 1, line.as_ref(), &self.settings);
        }
        state.finish()
    }
}

/// Accumulator for the entry currently being assembled
#[derive(Default)]
struct ParseState {
    buffer: Vec<String>,
    visits: Vec<RawVisit>,
    stats: ParseStats,
}

impl ParseState {
    fn feed(&mut self, line_no: usize, line: &str, settings: &ParserSettings) {
        self.stats.lines_read += 1;

        let line = strip_control(line);
        if settings.noise_tokens.iter().any(|t| *t == line) {
            self.stats.noise_lines += 1;
            return;
        }

        let closes_entry = line.contains(settings.terminator.as_str());
        self.buffer.push(line);

        if closes_entry {
            self.close_entry(line_no);
        }
    }

    fn close_entry(&mut self, line_no: usize) {
        let fields = std::mem::take(&mut self.buffer);
        match <[String; FIELDS_PER_VISIT]>::try_from(fields) {
            Ok(fields) => self.visits.push(RawVisit::from_fields(fields, line_no)),
            Err(rejected) => {
                debug!(
                    line = line_no,
                    fields = rejected.len(),
                    "discarding incomplete timeclock entry"
                );
                self.stats.groups_discarded += 1;
            }
        }
    }

    fn finish(mut self) -> ParseOutcome {
        if !self.buffer.is_empty() {
            debug!(
                fields = self.buffer.len(),
                "discarding unterminated trailing entry"
            );
            self.stats.trailing_fields = self.buffer.len();
            self.buffer.clear();
        }
        ParseOutcome {
            visits: self.visits,
            stats: self.stats,
        }
    }
}

/// Remove tabs and line-break characters anywhere in the line
fn strip_control(line: &str) -> String {
    line.chars()
        .filter(|c| !matches!(c, '\t' | '\n' | '\r'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entry(branch: &str, day: &str, duration: &str) -> Vec<String> {
        vec![
            branch.to_string(),
            "08:00 AM".to_string(),
            day.to_string(),
            "09:30 AM".to_string(),
            day.to_string(),
            duration.to_string(),
            "12.3 miles".to_string(),
        ]
    }

    #[test]
    fn test_parse_single_entry() {
        let parser = VisitParser::default();
        let outcome = parser.parse_lines(entry("Main Library", "Jan 05, 2024", "1:30"));

        assert_eq!(outcome.visits.len(), 1);
        let visit = &outcome.visits[0];
        assert_eq!(visit.branch, "Main Library");
        assert_eq!(visit.date_in, "Jan 05, 2024");
        assert_eq!(visit.duration, "1:30");
        assert_eq!(visit.distance_label, "12.3 miles");
        assert_eq!(visit.line, 7);
    }

    #[test]
    fn test_noise_lines_are_ignored() {
        let text = "\tMain Library\n\n08:00 AM\nCST\nJan 05, 2024\n-\n\
                    09:30 AM\nJan 05, 2024\n\t\n1:30\n12.3 miles\n";
        let outcome = VisitParser::default().parse(text);

        assert_eq!(outcome.visits.len(), 1);
        assert_eq!(outcome.visits[0].branch, "Main Library");
        assert_eq!(outcome.visits[0].time_in, "08:00 AM");
        assert_eq!(outcome.stats.noise_lines, 5);
        assert_eq!(outcome.stats.groups_discarded, 0);
    }

    #[test]
    fn test_carriage_returns_are_stripped() {
        let text = entry("Kent Branch", "Jan 05, 2024", "0:45").join("\r\n");
        let outcome = VisitParser::default().parse(&text);

        assert_eq!(outcome.visits.len(), 1);
        assert_eq!(outcome.visits[0].branch, "Kent Branch");
        assert_eq!(outcome.visits[0].distance_label, "12.3 miles");
    }

    #[test]
    fn test_short_entry_is_discarded() {
        let lines = vec![
            "Main Library",
            "08:00 AM",
            "Jan 05, 2024",
            "09:30 AM",
            "2.0 miles",
        ];
        let outcome = VisitParser::default().parse_lines(lines);

        assert!(outcome.visits.is_empty());
        assert_eq!(outcome.stats.groups_discarded, 1);
    }

    #[test]
    fn test_long_entry_is_discarded_and_next_entry_survives() {
        let mut lines = vec!["stray token".to_string()];
        lines.extend(entry("Main Library", "Jan 05, 2024", "1:30"));
        lines.extend(entry("Kent Branch", "Jan 05, 2024", "0:45"));

        let outcome = VisitParser::default().parse_lines(lines);

        assert_eq!(outcome.visits.len(), 1);
        assert_eq!(outcome.visits[0].branch, "Kent Branch");
        assert_eq!(outcome.stats.groups_discarded, 1);
    }

    #[test]
    fn test_trailing_fragment_is_dropped() {
        let mut lines = entry("Main Library", "Jan 05, 2024", "1:30");
        lines.extend(["Kent Branch".to_string(), "10:00 AM".to_string()]);

        let outcome = VisitParser::default().parse_lines(lines);

        assert_eq!(outcome.visits.len(), 1);
        assert_eq!(outcome.stats.trailing_fields, 2);
    }

    #[test]
    fn test_output_follows_input_order() {
        let mut lines = entry("Sanger Branch", "Jan 06, 2024", "1:00");
        lines.extend(entry("Main Library", "Jan 05, 2024", "1:00"));

        let outcome = VisitParser::default().parse_lines(lines);
        let branches: Vec<&str> = outcome.visits.iter().map(|v| v.branch.as_str()).collect();

        assert_eq!(branches, vec!["Sanger Branch", "Main Library"]);
    }

    #[test]
    fn test_count_matches_complete_groups() {
        let mut lines = Vec::new();
        for i in 0..4 {
            lines.extend(entry("Main Library", "Jan 05, 2024", "1:00"));
            if i % 2 == 0 {
                lines.extend(["orphan".to_string(), "3 miles".to_string()]);
            }
        }

        let outcome = VisitParser::default().parse_lines(lines);

        assert_eq!(outcome.visits.len(), 4);
        assert_eq!(outcome.stats.groups_discarded, 2);
    }

    #[test]
    fn test_custom_settings() {
        let parser = VisitParser::new(ParserSettings {
            noise_tokens: vec!["EST".to_string(), String::new()],
            terminator: "km".to_string(),
        });
        let lines = vec![
            "Main Library",
            "EST",
            "08:00 AM",
            "Jan 05, 2024",
            "09:30 AM",
            "Jan 05, 2024",
            "1:30",
            "19.8 km",
        ];

        let outcome = parser.parse_lines(lines);

        assert_eq!(outcome.visits.len(), 1);
        assert_eq!(outcome.visits[0].distance_label, "19.8 km");
    }
}
