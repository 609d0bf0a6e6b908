use std::{fmt::Display, str::FromStr};

use chrono::{Datelike, NaiveDate, NaiveTime};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Sessions starting before this year publish their Hansards in the archive markup.
pub const CURRENT_FORMAT_YEAR: i32 = 2006;

#[derive(Debug, thiserror::Error)]
#[error("Invalid format '{0}'. Accepted values: 'archive', 'current'")]
pub struct FormatParseError(String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum HansardFormat {
    /// Markup used from 1994 to 2005.
    Archive,
    /// Markup used from 2006 onwards.
    Current,
}

impl FromStr for HansardFormat {
    type Err = FormatParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "archive" | "old" => Ok(HansardFormat::Archive),
            "current" => Ok(HansardFormat::Current),
            _ => Err(FormatParseError(s.to_string())),
        }
    }
}

impl Display for HansardFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HansardFormat::Archive => write!(f, "archive"),
            HansardFormat::Current => write!(f, "current"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Short identifier such as `39-1`.
    pub id: String,
    pub parliament: u32,
    pub number: u32,
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
}

impl Session {
    pub fn format(&self) -> HansardFormat {
        if self.start.year() < CURRENT_FORMAT_YEAR {
            HansardFormat::Archive
        } else {
            HansardFormat::Current
        }
    }
}

impl Display for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] Parliament {}, Session {} — from {}",
            self.id, self.parliament, self.number, self.start
        )?;
        if let Some(end) = self.end {
            write!(f, " to {}", end)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hansard {
    pub id: i64,
    pub session_id: String,
    pub number: String,
    pub url: Option<String>,
    pub date: Option<NaiveDate>,
}

impl Display for Hansard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Hansard #{} ({})", self.number, self.session_id)?;
        if let Some(date) = self.date {
            write!(f, " {}", date)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HansardSummary {
    #[serde(flatten)]
    pub hansard: Hansard,
    pub statements: usize,
    pub cached: bool,
}

impl Display for HansardSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] {} — {} statement(s)",
            self.hansard.id, self.hansard, self.statements
        )?;
        if !self.cached {
            write!(f, " (not cached)")?;
        }
        if let Some(url) = &self.hansard.url {
            write!(f, "\n   {}", url)?;
        }
        Ok(())
    }
}

/// Raw page of a Hansard as it was downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HansardCache {
    pub hansard: Hansard,
    pub html: String,
    pub fetched_at: String,
}

impl HansardCache {
    pub fn html(&self) -> &str {
        &self.html
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Speaker {
    pub name: String,
    /// Riding or ministerial title printed next to the name.
    pub details: Option<String>,
    pub party: Option<String>,
}

/// A single speech act or procedural line of a sitting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Statement {
    pub sequence: u32,
    pub time: Option<NaiveTime>,
    pub who: String,
    pub speaker: Option<Speaker>,
    pub h1: Option<String>,
    pub h2: Option<String>,
    pub text: String,
    pub wordcount: u32,
    pub procedural: bool,
    pub bills: Vec<String>,
}

impl Display for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:>4}. ", self.sequence)?;
        if let Some(time) = self.time {
            write!(f, "[{}] ", time.format("%H:%M"))?;
        }
        if self.procedural {
            write!(f, "({})", self.who)?;
        } else {
            write!(f, "{}", self.who)?;
        }
        writeln!(f)?;
        if let Some(h1) = &self.h1 {
            write!(f, "      ── {}", h1)?;
            if let Some(h2) = &self.h2 {
                write!(f, " / {}", h2)?;
            }
            writeln!(f)?;
        }
        let preview: String = self.text.chars().take(120).collect();
        writeln!(f, "      {}", preview)?;
        if !self.bills.is_empty() {
            writeln!(f, "      Bills: {}", self.bills.join(", "))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedSitting {
    pub date: Option<NaiveDate>,
    pub statements: Vec<Statement>,
}

impl Display for ParsedSitting {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.date {
            Some(date) => writeln!(f, "┌─ Sitting of {}", date)?,
            None => writeln!(f, "┌─ Sitting of unknown date")?,
        }
        writeln!(f, "└─ {} statement(s)", self.statements.len())?;
        writeln!(f)?;
        for statement in &self.statements {
            write!(f, "{}", statement)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved(usize),
    Skipped,
}
