use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveTime};
use regex::Regex;
use url::Url;

use crate::parser::ParseError;

static RE_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<title>([^<]+)</title>").expect("invalid regex: title"));

static RE_NUMBER_CURRENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Number +(\d+\S*) ").expect("invalid regex: current hansard number")
});

static RE_NUMBER_ARCHIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\((\d+\S*)\)").expect("invalid regex: archive hansard number")
});

static RE_BILL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bBill ([CS]-\d+[A-Z]?)\b").expect("invalid regex: bill"));

static RE_SITTING_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:Monday|Tuesday|Wednesday|Thursday|Friday|Saturday|Sunday),?\s+([a-z]+)\s+(\d{1,2}),?\s+(\d{4})",
    )
    .expect("invalid regex: sitting date")
});

static RE_MEETING_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)The House met at (?:(\d{1,2})(?:[.:](\d{2}))?\s*([ap])\.\s?m\.|(noon))")
        .expect("invalid regex: meeting time")
});

static RE_TIMESTAMP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\((\d{2})(\d{2})\)$").expect("invalid regex: timestamp"));

/// Collapses runs of whitespace (non-breaking spaces included) into single spaces.
pub fn tame_whitespace(text: &str) -> String {
    text.split(|c: char| c.is_whitespace() || c == '\u{a0}')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Rewrites a Publication.aspx link to its canonical English form.
///
/// The same sitting is reachable through many query-string spellings (language,
/// display mode, extra parameters, anchors). Links without a `DocId`/`Parl`/`Ses`
/// triple are only stripped of their fragment.
pub fn normalize_hansard_url(raw: &str) -> Result<String, ParseError> {
    let mut url =
        Url::parse(raw.trim()).map_err(|e| ParseError::Url(format!("{}: {}", raw, e)))?;
    url.set_fragment(None);

    let param = |key: &str| {
        url.query_pairs()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.into_owned())
    };

    if let (Some(doc_id), Some(parl), Some(ses)) = (param("DocId"), param("Parl"), param("Ses")) {
        return Ok(format!(
            "{}/HousePublications/Publication.aspx?Language=E&Mode=1&Parl={}&Ses={}&DocId={}",
            url.origin().ascii_serialization(),
            parl,
            ses,
            doc_id
        ));
    }

    Ok(url.to_string())
}

/// Extracts the sitting number from the page `<title>`.
///
/// Current pages read `... Number 079 ...`, archive pages `... (079)`.
pub fn hansard_number_from_page(html: &str) -> Result<String, ParseError> {
    let title = RE_TITLE
        .captures(html)
        .map(|caps| caps[1].to_string())
        .ok_or_else(|| ParseError::MissingField("title".to_string()))?;

    if let Some(caps) = RE_NUMBER_CURRENT.captures(&tame_whitespace(&title)) {
        return Ok(caps[1].trim_start_matches('0').to_string());
    }

    if let Some(caps) = RE_NUMBER_ARCHIVE.captures(&title) {
        return Ok(caps[1].trim_start_matches('0').to_string());
    }

    Err(ParseError::HansardNumber(title))
}

pub fn word_count(text: &str) -> u32 {
    text.split_whitespace().count() as u32
}

/// Bill numbers (`C-10`, `S-3`) in order of first mention.
pub fn mentioned_bills(text: &str) -> Vec<String> {
    let mut bills: Vec<String> = Vec::new();
    for caps in RE_BILL.captures_iter(text) {
        let bill = caps[1].to_string();
        if !bills.contains(&bill) {
            bills.push(bill);
        }
    }
    bills
}

fn parse_month(month: &str) -> Option<u32> {
    match month.to_lowercase().as_str() {
        "january" => Some(1),
        "february" => Some(2),
        "march" => Some(3),
        "april" => Some(4),
        "may" => Some(5),
        "june" => Some(6),
        "july" => Some(7),
        "august" => Some(8),
        "september" => Some(9),
        "october" => Some(10),
        "november" => Some(11),
        "december" => Some(12),
        _ => None,
    }
}

/// First `Weekday, Month D, YYYY` date in the text.
pub fn parse_sitting_date(text: &str) -> Option<NaiveDate> {
    RE_SITTING_DATE.captures_iter(text).find_map(|caps| {
        let month = parse_month(&caps[1])?;
        let day = caps[2].parse::<u32>().ok()?;
        let year = caps[3].parse::<i32>().ok()?;
        NaiveDate::from_ymd_opt(year, month, day)
    })
}

/// Reads the opening line, e.g. "The House met at 11 a.m.".
pub fn parse_meeting_time(text: &str) -> Option<NaiveTime> {
    let caps = RE_MEETING_TIME.captures(text)?;

    if caps.get(4).is_some() {
        return NaiveTime::from_hms_opt(12, 0, 0);
    }

    let hour = caps.get(1)?.as_str().parse::<u32>().ok()?;
    let minute = caps
        .get(2)
        .map_or(Ok(0), |m| m.as_str().parse::<u32>())
        .ok()?;
    if hour == 0 || hour > 12 {
        return None;
    }

    let hour_24 = match (caps.get(3)?.as_str().to_ascii_lowercase().as_str(), hour) {
        ("a", 12) => 0,
        ("a", h) => h,
        ("p", 12) => 12,
        (_, h) => h + 12,
    };

    NaiveTime::from_hms_opt(hour_24, minute, 0)
}

/// Parses a `(HHMM)` marker.
pub fn parse_timestamp(text: &str) -> Option<NaiveTime> {
    let caps = RE_TIMESTAMP.captures(text.trim())?;
    let hour = caps[1].parse::<u32>().ok()?;
    let minute = caps[2].parse::<u32>().ok()?;
    NaiveTime::from_hms_opt(hour, minute, 0)
}
