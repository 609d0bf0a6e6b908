use std::sync::LazyLock;

use chrono::NaiveTime;
use regex::Regex;
use scraper::ElementRef;

use crate::archive::ArchiveParser;
use crate::current::CurrentParser;
use crate::types::{HansardFormat, ParsedSitting, Speaker, Statement};
use crate::utils::{mentioned_bills, tame_whitespace, word_count};

/// Speaker label given to statements that nobody spoke.
pub const PROCEDURAL_SPEAKER: &str = "Proceedings";

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Failed to parse URL: {0}")]
    Url(String),
    #[error("Couldn't parse number from Hansard title: {0}")]
    HansardNumber(String),
    #[error("Failed to parse date: {0}")]
    DateParse(String),
    #[error("Missing required field: {0}")]
    MissingField(String),
}

pub trait HansardParser {
    fn parse(&self) -> Result<ParsedSitting, ParseError>;
}

pub fn parser_for(format: HansardFormat, html: &str) -> Box<dyn HansardParser + '_> {
    match format {
        HansardFormat::Archive => Box::new(ArchiveParser::new(html)),
        HansardFormat::Current => Box::new(CurrentParser::new(html)),
    }
}

static RE_PARTY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][A-Za-z.]{0,5}$").expect("invalid regex: party"));

static RE_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?)\s*\((.+)\)$").expect("invalid regex: speaker label"));

pub(crate) fn elem_text(element: ElementRef) -> String {
    element.text().collect::<String>()
}

/// Text of `element` with everything inside `skip` left out.
pub(crate) fn text_excluding(element: ElementRef, skip: ElementRef) -> String {
    element
        .descendants()
        .filter(|node| !node.ancestors().any(|a| a.id() == skip.id()))
        .filter_map(|node| node.value().as_text().map(|t| &**t))
        .collect()
}

pub(crate) fn is_language_marker(text: &str) -> bool {
    matches!(text, "[English]" | "[Translation]" | "[Français]")
}

/// Splits `Mr. John Williams (St. Albert, CPC)` into name, details and party.
pub fn parse_speaker_label(label: &str) -> Speaker {
    let label = tame_whitespace(label.trim().trim_end_matches(':'));

    let Some(caps) = RE_LABEL.captures(&label) else {
        return Speaker {
            name: label,
            details: None,
            party: None,
        };
    };

    let name = caps[1].trim().to_string();
    let inner = caps[2].trim();

    let (details, party) = match inner.rsplit_once(',') {
        Some((rest, last)) if RE_PARTY.is_match(last.trim()) => {
            (Some(rest.trim().to_string()), Some(last.trim().to_string()))
        }
        None if RE_PARTY.is_match(inner) => (None, Some(inner.to_string())),
        _ => (Some(inner.to_string()), None),
    };

    Speaker {
        name,
        details: details.filter(|d| !d.is_empty()),
        party,
    }
}

struct OpenStatement {
    who: String,
    speaker: Option<Speaker>,
    procedural: bool,
    time: Option<NaiveTime>,
    h1: Option<String>,
    h2: Option<String>,
    paragraphs: Vec<String>,
}

/// Walking state shared by the format parsers.
///
/// Parsers feed it the document's headings, timestamps and paragraphs in order;
/// it tracks the enclosing headings and clock and emits numbered statements.
#[derive(Default)]
pub struct StatementBuilder {
    h1: Option<String>,
    h2: Option<String>,
    time: Option<NaiveTime>,
    open: Option<OpenStatement>,
    statements: Vec<Statement>,
}

impl StatementBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn heading1(&mut self, text: &str) {
        let text = tame_whitespace(text);
        if text.is_empty() || is_language_marker(&text) {
            return;
        }
        self.h1 = Some(text);
        self.h2 = None;
    }

    pub fn heading2(&mut self, text: &str) {
        let text = tame_whitespace(text);
        if text.is_empty() || is_language_marker(&text) {
            return;
        }
        self.h2 = Some(text);
    }

    pub fn timestamp(&mut self, time: NaiveTime) {
        self.time = Some(time);
    }

    /// Whether a clock reading has been seen yet.
    pub fn has_time(&self) -> bool {
        self.time.is_some()
    }

    pub fn speech(&mut self, label: &str, text: &str) {
        self.flush();
        let speaker = parse_speaker_label(label);
        self.open = Some(OpenStatement {
            who: tame_whitespace(label.trim().trim_end_matches(':')),
            speaker: Some(speaker),
            procedural: false,
            time: self.time,
            h1: self.h1.clone(),
            h2: self.h2.clone(),
            paragraphs: Vec::new(),
        });
        self.push_text(text);
    }

    pub fn paragraph(&mut self, text: &str) {
        if self.open.is_none() {
            self.procedural(text);
            return;
        }
        self.push_text(text);
    }

    pub fn procedural(&mut self, text: &str) {
        let text = tame_whitespace(text);
        if text.is_empty() || is_language_marker(&text) {
            return;
        }
        self.flush();
        self.open = Some(OpenStatement {
            who: PROCEDURAL_SPEAKER.to_string(),
            speaker: None,
            procedural: true,
            time: self.time,
            h1: self.h1.clone(),
            h2: self.h2.clone(),
            paragraphs: vec![text],
        });
        self.flush();
    }

    pub fn finish(mut self) -> Vec<Statement> {
        self.flush();
        self.statements
    }

    fn push_text(&mut self, text: &str) {
        let text = tame_whitespace(text);
        if text.is_empty() || is_language_marker(&text) {
            return;
        }
        if let Some(open) = self.open.as_mut() {
            open.paragraphs.push(text);
        }
    }

    fn flush(&mut self) {
        let Some(open) = self.open.take() else {
            return;
        };

        let text = open.paragraphs.join("\n\n");
        if text.is_empty() && open.speaker.is_none() {
            return;
        }

        self.statements.push(Statement {
            sequence: self.statements.len() as u32,
            time: open.time,
            who: open.who,
            speaker: open.speaker,
            h1: open.h1,
            h2: open.h2,
            wordcount: word_count(&text),
            bills: mentioned_bills(&text),
            text,
            procedural: open.procedural,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_speaker_with_riding_and_party() {
        let speaker = parse_speaker_label("Mr. John Williams (St. Albert, CPC):");
        assert_eq!(speaker.name, "Mr. John Williams");
        assert_eq!(speaker.details.as_deref(), Some("St. Albert"));
        assert_eq!(speaker.party.as_deref(), Some("CPC"));
    }

    #[test]
    fn test_parse_speaker_with_title_and_comma() {
        let speaker =
            parse_speaker_label("Hon. Ralph Goodale (Minister of Finance, Lib.)");
        assert_eq!(speaker.name, "Hon. Ralph Goodale");
        assert_eq!(speaker.details.as_deref(), Some("Minister of Finance"));
        assert_eq!(speaker.party.as_deref(), Some("Lib."));
    }

    #[test]
    fn test_parse_speaker_details_without_party() {
        let speaker = parse_speaker_label("Mr. Bob Kilger (Stormont—Dundas, Glengarry)");
        assert_eq!(speaker.name, "Mr. Bob Kilger");
        assert_eq!(speaker.details.as_deref(), Some("Stormont—Dundas, Glengarry"));
        assert!(speaker.party.is_none());
    }

    #[test]
    fn test_parse_speaker_plain() {
        let speaker = parse_speaker_label("The Speaker:");
        assert_eq!(speaker.name, "The Speaker");
        assert!(speaker.details.is_none());
        assert!(speaker.party.is_none());
    }

    #[test]
    fn test_builder_tracks_headings_and_sequence() {
        let mut b = StatementBuilder::new();
        b.heading1("GOVERNMENT ORDERS");
        b.heading2("Budget Implementation Act");
        b.timestamp(NaiveTime::from_hms_opt(10, 5, 0).unwrap());
        b.speech("Mr. A (Here, NDP):", "I support Bill C-43.");
        b.paragraph("[Translation]");
        b.paragraph("Second paragraph.");
        b.heading1("ORAL QUESTIONS");
        b.speech("Ms. B:", "Question.");
        let statements = b.finish();

        assert_eq!(statements.len(), 2);
        let first = &statements[0];
        assert_eq!(first.sequence, 0);
        assert_eq!(first.who, "Mr. A (Here, NDP)");
        assert_eq!(first.h1.as_deref(), Some("GOVERNMENT ORDERS"));
        assert_eq!(first.h2.as_deref(), Some("Budget Implementation Act"));
        assert_eq!(first.text, "I support Bill C-43.\n\nSecond paragraph.");
        assert_eq!(first.wordcount, 6);
        assert_eq!(first.bills, vec!["C-43"]);
        assert_eq!(first.time, NaiveTime::from_hms_opt(10, 5, 0));

        let second = &statements[1];
        assert_eq!(second.sequence, 1);
        assert_eq!(second.h1.as_deref(), Some("ORAL QUESTIONS"));
        assert!(second.h2.is_none());
    }

    #[test]
    fn test_builder_procedural_and_orphan_paragraphs() {
        let mut b = StatementBuilder::new();
        b.paragraph("Prayers");
        b.speech("The Speaker:", "Order.");
        b.procedural("(Motion agreed to)");
        b.paragraph("   ");
        let statements = b.finish();

        assert_eq!(statements.len(), 3);
        assert!(statements[0].procedural);
        assert_eq!(statements[0].who, PROCEDURAL_SPEAKER);
        assert_eq!(statements[0].text, "Prayers");
        assert!(!statements[1].procedural);
        assert!(statements[2].procedural);
        assert_eq!(statements[2].text, "(Motion agreed to)");
        assert_eq!(statements[2].sequence, 2);
    }

    #[test]
    fn test_builder_keeps_speech_without_text() {
        let mut b = StatementBuilder::new();
        b.speech("Some hon. members:", "");
        let statements = b.finish();
        assert_eq!(statements.len(), 1);
        assert_eq!(statements[0].text, "");
        assert_eq!(statements[0].wordcount, 0);
    }

    #[test]
    fn test_builder_speech_continues_under_new_heading() {
        let mut b = StatementBuilder::new();
        b.heading1("GOVERNMENT ORDERS");
        b.speech("Mr. A:", "First part.");
        b.heading2("Subject");
        b.paragraph("Continuation of Mr. A.");
        b.speech("Ms. B:", "Reply.");
        let statements = b.finish();

        assert_eq!(statements.len(), 2);
        let first = &statements[0];
        assert_eq!(first.who, "Mr. A");
        assert!(!first.procedural);
        assert_eq!(first.text, "First part.\n\nContinuation of Mr. A.");
        assert!(first.h2.is_none());

        assert_eq!(statements[1].h1.as_deref(), Some("GOVERNMENT ORDERS"));
        assert_eq!(statements[1].h2.as_deref(), Some("Subject"));
    }
}
