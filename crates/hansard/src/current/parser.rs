use std::sync::LazyLock;

use chrono::NaiveDate;
use scraper::{ElementRef, Html, Selector};

use crate::parser::{HansardParser, ParseError, StatementBuilder, elem_text, text_excluding};
use crate::types::ParsedSitting;
use crate::utils::{parse_meeting_time, parse_sitting_date, parse_timestamp, tame_whitespace};

static BLOCK_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(
        ".OrderOfBusiness, .SubjectOfBusiness, .Timestamp, .ParaText, .ProceduralText",
    )
    .expect("invalid selector: blocks")
});

static PERSON_SPEAKING_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(".PersonSpeaking").expect("invalid selector: person speaking")
});

static DATE_META_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"meta[name="Date"]"#).expect("invalid selector: date meta")
});

pub struct CurrentParser<'a> {
    html: &'a str,
}

impl<'a> CurrentParser<'a> {
    pub fn new(html: &'a str) -> Self {
        Self { html }
    }
}

impl HansardParser for CurrentParser<'_> {
    fn parse(&self) -> Result<ParsedSitting, ParseError> {
        let document = Html::parse_document(self.html);
        let mut builder = StatementBuilder::new();

        for element in document.select(&BLOCK_SELECTOR) {
            let classes: Vec<&str> = element.value().classes().collect();

            if classes.contains(&"OrderOfBusiness") {
                builder.heading1(&elem_text(element));
            } else if classes.contains(&"SubjectOfBusiness") {
                builder.heading2(&elem_text(element));
            } else if classes.contains(&"Timestamp") {
                match parse_timestamp(&tame_whitespace(&elem_text(element))) {
                    Some(time) => builder.timestamp(time),
                    None => log::warn!(
                        "Ignoring malformed timestamp '{}'",
                        tame_whitespace(&elem_text(element))
                    ),
                }
            } else if classes.contains(&"ProceduralText") {
                builder.procedural(&elem_text(element));
            } else {
                parse_para_text(element, &mut builder);
            }
        }

        let date = sitting_date(&document)?;
        let statements = builder.finish();

        log::debug!(
            "Parsed {} statements from current Hansard (date: {:?})",
            statements.len(),
            date
        );

        Ok(ParsedSitting { date, statements })
    }
}

fn parse_para_text(element: ElementRef, builder: &mut StatementBuilder) {
    if let Some(person) = element.select(&PERSON_SPEAKING_SELECTOR).next() {
        let label = tame_whitespace(&elem_text(person));
        let rest = tame_whitespace(&text_excluding(element, person));
        let rest = rest.strip_prefix(':').map(str::trim).unwrap_or(rest.as_str());
        builder.speech(&label, rest);
        return;
    }

    let text = tame_whitespace(&elem_text(element));
    if !builder.has_time()
        && let Some(time) = parse_meeting_time(&text)
    {
        builder.timestamp(time);
    }
    builder.paragraph(&text);
}

fn sitting_date(document: &Html) -> Result<Option<NaiveDate>, ParseError> {
    if let Some(content) = document
        .select(&DATE_META_SELECTOR)
        .next()
        .and_then(|meta| meta.value().attr("content"))
    {
        return NaiveDate::parse_from_str(content.trim(), "%Y-%m-%d")
            .map(Some)
            .map_err(|_| ParseError::DateParse(format!("Invalid date meta: {}", content)));
    }

    let body_text = tame_whitespace(&elem_text(document.root_element()));
    Ok(parse_sitting_date(&body_text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    const SITTING: &str = r#"
<html>
<head>
  <title>House of Commons Debates - Number 079 (Official Version)</title>
  <meta name="Date" content="2009-06-04">
</head>
<body>
<div class="HansardContent">
  <div class="ParaText">The House met at 10 a.m.</div>
  <div class="ProceduralText">Prayers</div>
  <div class="OrderOfBusiness">Government Orders</div>
  <div class="SubjectOfBusiness">Budget Implementation Act, 2009</div>
  <div class="ParaText"><a name="Int-2734107"></a><span class="PersonSpeaking">Hon. Jim Flaherty (Minister of Finance, CPC):</span> Mr. Speaker, Bill C-10 is before the House.</div>
  <div class="ParaText">[Translation]</div>
  <div class="ParaText">It provides stimulus.</div>
  <div class="Timestamp">(1015)</div>
  <div class="ParaText"><span class="PersonSpeaking">Mr. Thomas Mulcair (Outremont, NDP)</span>: Mr. Speaker, Bill C-10 and Bill C-11 fall short.</div>
  <div class="Timestamp">(soon)</div>
  <div class="OrderOfBusiness">Oral Questions</div>
  <div class="ParaText"><span class="PersonSpeaking">The Speaker:</span> Order, please.</div>
  <div class="ProceduralText">(Motion agreed to)</div>
</div>
</body>
</html>
"#;

    #[test]
    fn test_parse_current_sitting() {
        let parsed = CurrentParser::new(SITTING).parse().expect("Failed to parse");

        assert_eq!(parsed.date, NaiveDate::from_ymd_opt(2009, 6, 4));

        let s = &parsed.statements;
        for statement in s {
            println!("{}", statement);
        }
        assert_eq!(s.len(), 6);

        assert!(s[0].procedural);
        assert_eq!(s[0].time, NaiveTime::from_hms_opt(10, 0, 0));
        assert_eq!(s[1].text, "Prayers");

        let flaherty = &s[2];
        assert!(!flaherty.procedural);
        assert_eq!(flaherty.who, "Hon. Jim Flaherty (Minister of Finance, CPC)");
        assert_eq!(flaherty.h1.as_deref(), Some("Government Orders"));
        assert_eq!(flaherty.h2.as_deref(), Some("Budget Implementation Act, 2009"));
        assert_eq!(
            flaherty.text,
            "Mr. Speaker, Bill C-10 is before the House.\n\nIt provides stimulus."
        );
        assert_eq!(flaherty.time, NaiveTime::from_hms_opt(10, 0, 0));

        let mulcair = &s[3];
        assert_eq!(mulcair.who, "Mr. Thomas Mulcair (Outremont, NDP)");
        assert_eq!(mulcair.text, "Mr. Speaker, Bill C-10 and Bill C-11 fall short.");
        assert_eq!(mulcair.bills, vec!["C-10", "C-11"]);
        assert_eq!(mulcair.time, NaiveTime::from_hms_opt(10, 15, 0));
        let speaker = mulcair.speaker.as_ref().expect("Should have speaker");
        assert_eq!(speaker.details.as_deref(), Some("Outremont"));
        assert_eq!(speaker.party.as_deref(), Some("NDP"));

        let chair = &s[4];
        assert_eq!(chair.who, "The Speaker");
        assert_eq!(chair.h1.as_deref(), Some("Oral Questions"));
        assert!(chair.h2.is_none());
        assert_eq!(chair.time, NaiveTime::from_hms_opt(10, 15, 0));

        assert!(s[5].procedural);
        assert_eq!(s[5].text, "(Motion agreed to)");
    }

    #[test]
    fn test_date_falls_back_to_body_text() {
        let html = r#"<html><body><div class="ParaText">Thursday, February 12, 2009</div></body></html>"#;
        let parsed = CurrentParser::new(html).parse().unwrap();
        assert_eq!(parsed.date, NaiveDate::from_ymd_opt(2009, 2, 12));
    }

    #[test]
    fn test_invalid_date_meta_is_an_error() {
        let html = r#"<html><head><meta name="Date" content="June 4th"></head><body></body></html>"#;
        assert!(matches!(
            CurrentParser::new(html).parse(),
            Err(ParseError::DateParse(_))
        ));
    }
}
