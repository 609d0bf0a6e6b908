use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use crate::parser::{
    HansardParser, ParseError, StatementBuilder, elem_text, is_language_marker, text_excluding,
};
use crate::types::ParsedSitting;
use crate::utils::{parse_meeting_time, parse_sitting_date, parse_timestamp, tame_whitespace};

static BLOCK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h2, h3, h4, p").expect("invalid selector: blocks"));

pub struct ArchiveParser<'a> {
    html: &'a str,
}

impl<'a> ArchiveParser<'a> {
    pub fn new(html: &'a str) -> Self {
        Self { html }
    }
}

impl HansardParser for ArchiveParser<'_> {
    fn parse(&self) -> Result<ParsedSitting, ParseError> {
        let document = Html::parse_document(self.html);
        let mut builder = StatementBuilder::new();

        for element in document.select(&BLOCK_SELECTOR) {
            match element.value().name() {
                "h2" => builder.heading1(&elem_text(element)),
                "h3" | "h4" => builder.heading2(&elem_text(element)),
                _ => parse_paragraph(element, &mut builder),
            }
        }

        let body_text = tame_whitespace(&elem_text(document.root_element()));
        let date = parse_sitting_date(&body_text);
        let statements = builder.finish();

        log::debug!(
            "Parsed {} statements from archive Hansard (date: {:?})",
            statements.len(),
            date
        );

        Ok(ParsedSitting { date, statements })
    }
}

fn parse_paragraph(p: ElementRef, builder: &mut StatementBuilder) {
    let text = tame_whitespace(&elem_text(p));
    if text.is_empty() || is_language_marker(&text) {
        return;
    }

    if let Some(time) = parse_timestamp(&text) {
        builder.timestamp(time);
        return;
    }

    let leading = leading_child(p);

    if let Some(label_elem) = leading.filter(|e| is_label_tag(e.value().name())) {
        let label = tame_whitespace(&elem_text(label_elem));
        let rest = tame_whitespace(&text_excluding(p, label_elem));

        if label.ends_with(':') {
            builder.speech(&label, &rest);
            return;
        }
        // <B>Mr. Smith</B>: Mr. Speaker, ...
        if let Some(rest) = rest.strip_prefix(':') {
            builder.speech(&label, rest);
            return;
        }
        // <B>Mr. Silye</B> (Calgary Centre, Ref.): Mr. Speaker, ...
        if rest.starts_with('(')
            && let Some(end) = rest.find("):")
        {
            let full_label = format!("{} {}", label, &rest[..=end]);
            builder.speech(&full_label, &rest[end + 2..]);
            return;
        }
    }

    if text.starts_with('(') && text.ends_with(')') {
        builder.procedural(&text);
        return;
    }

    if let Some(italic) = leading.filter(|e| matches!(e.value().name(), "i" | "em"))
        && tame_whitespace(&text_excluding(p, italic)).is_empty()
    {
        builder.procedural(&text);
        return;
    }

    if !builder.has_time()
        && let Some(time) = parse_meeting_time(&text)
    {
        builder.timestamp(time);
    }

    builder.paragraph(&text);
}

fn is_label_tag(name: &str) -> bool {
    matches!(name, "b" | "strong" | "i" | "em")
}

/// First child carrying text, if that child is an element.
///
/// Empty anchors (`<A NAME="...">`) that precede speaker labels are skipped.
fn leading_child(p: ElementRef) -> Option<ElementRef> {
    for node in p.children() {
        if let Some(text) = node.value().as_text() {
            if text.trim().is_empty() {
                continue;
            }
            return None;
        }
        if let Some(element) = ElementRef::wrap(node) {
            if tame_whitespace(&elem_text(element)).is_empty() {
                continue;
            }
            return Some(element);
        }
    }
    None
}
