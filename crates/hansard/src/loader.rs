//! Fetch, cache, parse and save orchestration.
//!
//! A Hansard is loaded either from its cached page or by downloading its URL;
//! the page is then handed to the parser matching its session's format and the
//! resulting statements are saved in a single transaction.

use std::io::{self, BufRead, StdinLock, Stdout, Write};

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use rusqlite::Connection;

use crate::db::{self, OperationError};
use crate::parser::{ParseError, parser_for};
use crate::scraper::{PageSource, ScraperError};
use crate::types::{Hansard, HansardCache, ParsedSitting, SaveOutcome, Session};
use crate::utils::{hansard_number_from_page, normalize_hansard_url};

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Database error: {0}")]
    Database(#[from] OperationError),
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Fetch error: {0}")]
    Fetch(#[from] ScraperError),
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("Prompt failed: {0}")]
    Prompt(#[from] io::Error),
    #[error("Found cached Hansard, but session doesn't match: expected {expected}, found {found}")]
    SessionMismatch { expected: String, found: String },
    #[error("Hansard exists, with a different url: {url} {existing}")]
    UrlConflict { url: String, existing: String },
    #[error("Hansard {0} has no cached page and no URL to fetch it from")]
    NoSource(i64),
    #[error("Unknown session: {0}")]
    UnknownSession(String),
}

/// Decides what happens to statements already saved for a Hansard.
pub trait ConflictResolver {
    /// Returns `true` when the existing statements may be deleted and replaced.
    fn confirm_replace(&mut self, hansard: &Hansard, existing: usize) -> io::Result<bool>;
}

/// Asks a human on a terminal.
pub struct Prompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl Prompt<StdinLock<'static>, Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> ConflictResolver for Prompt<R, W> {
    fn confirm_replace(&mut self, hansard: &Hansard, existing: usize) -> io::Result<bool> {
        writeln!(
            self.output,
            "There are already {} statements for {}.",
            existing, hansard
        )?;
        write!(self.output, "Delete them? (y/n) ")?;
        self.output.flush()?;

        let mut answer = String::new();
        self.input.read_line(&mut answer)?;
        Ok(answer.trim() == "y")
    }
}

/// Answers every conflict the same way without asking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    Replace,
    Skip,
}

impl ConflictResolver for Policy {
    fn confirm_replace(&mut self, hansard: &Hansard, existing: usize) -> io::Result<bool> {
        log::info!(
            "{} already has {} statements, policy: {:?}",
            hansard,
            existing,
            self
        );
        Ok(*self == Policy::Replace)
    }
}

fn session_of(conn: &Connection, hansard: &Hansard) -> Result<Session, LoadError> {
    db::get_session(conn, &hansard.session_id)?
        .ok_or_else(|| LoadError::UnknownSession(hansard.session_id.clone()))
}

fn normalize_logged(url: &str) -> Result<String, LoadError> {
    let normurl = normalize_hansard_url(url)?;
    if normurl != url {
        log::warn!("Normalized URL {} to {}", url, normurl);
    }
    Ok(normurl)
}

/// Returns the cached copy of a Hansard, downloading it if it was never cached.
pub async fn load_hansard<S: PageSource>(
    conn: &Connection,
    source: &S,
    hansard: &Hansard,
) -> Result<HansardCache, LoadError> {
    if let Some(cache) = db::get_cache(conn, hansard)? {
        return Ok(cache);
    }

    let Some(url) = hansard.url.as_deref() else {
        return Err(LoadError::NoSource(hansard.id));
    };
    let session = session_of(conn, hansard)?;
    load_hansard_url(conn, source, url, &session).await
}

/// Returns the cached page for `url`, downloading and registering it if needed.
pub async fn load_hansard_url<S: PageSource>(
    conn: &Connection,
    source: &S,
    url: &str,
    session: &Session,
) -> Result<HansardCache, LoadError> {
    let normurl = normalize_logged(url)?;
    if let Some(cached) = find_cached(conn, &normurl, session)? {
        return Ok(cached);
    }

    log::info!("Downloading Hansard from {}", normurl);
    let page = source.fetch_page(&normurl).await?;
    store_page(conn, &normurl, &page, session)
}

/// Same as [`load_hansard_url`] for a page that was already downloaded.
pub fn load_fetched(
    conn: &Connection,
    url: &str,
    page: &str,
    session: &Session,
) -> Result<HansardCache, LoadError> {
    let normurl = normalize_logged(url)?;
    if let Some(cached) = find_cached(conn, &normurl, session)? {
        return Ok(cached);
    }
    store_page(conn, &normurl, page, session)
}

/// Cached page downloaded from an already normalized URL.
pub fn find_cached(
    conn: &Connection,
    normurl: &str,
    session: &Session,
) -> Result<Option<HansardCache>, LoadError> {
    match db::find_cache_by_url(conn, normurl)? {
        Some(cached) if cached.hansard.session_id != session.id => {
            Err(LoadError::SessionMismatch {
                expected: session.id.clone(),
                found: cached.hansard.session_id,
            })
        }
        cached => Ok(cached),
    }
}

fn store_page(
    conn: &Connection,
    normurl: &str,
    page: &str,
    session: &Session,
) -> Result<HansardCache, LoadError> {
    let number = hansard_number_from_page(page)?;

    let tx = conn.unchecked_transaction()?;
    let hansard = match db::find_hansard(&tx, &session.id, &number)? {
        None => db::insert_hansard(&tx, &session.id, &number, Some(normurl))?,
        Some(existing) if existing.url.as_deref() == Some(normurl) => existing,
        Some(existing) => {
            return Err(LoadError::UrlConflict {
                url: normurl.to_string(),
                existing: existing.url.unwrap_or_default(),
            });
        }
    };
    let cache = db::save_cache(&tx, &hansard, page)?;
    tx.commit()?;

    log::info!("Cached {} from {}", hansard, normurl);
    Ok(cache)
}

/// Downloads several pages concurrently. Results come back in input order.
pub async fn fetch_all<S: PageSource>(
    source: &S,
    urls: &[String],
) -> Vec<(String, Result<String, ScraperError>)> {
    let mut futures: FuturesUnordered<_> = urls
        .iter()
        .enumerate()
        .map(|(i, url)| async move {
            log::info!("Downloading Hansard from {}", url);
            (i, url.clone(), source.fetch_page(url).await)
        })
        .collect();

    let mut pages = Vec::with_capacity(urls.len());
    while let Some(result) = futures.next().await {
        if let (_, url, Err(e)) = &result {
            log::warn!("Failed to fetch {}: {}", url, e);
        }
        pages.push(result);
    }

    pages.sort_by_key(|(i, _, _)| *i);
    pages
        .into_iter()
        .map(|(_, url, result)| (url, result))
        .collect()
}

/// Loads several URLs into the cache, downloading the uncached ones concurrently.
///
/// Each URL is normalized before it is looked up or fetched. Results are keyed
/// by the URL as given and come back in input order.
pub async fn load_all<S: PageSource>(
    conn: &Connection,
    source: &S,
    urls: &[String],
    session: &Session,
) -> Vec<(String, Result<HansardCache, LoadError>)> {
    let mut loaded: Vec<Option<Result<HansardCache, LoadError>>> = Vec::with_capacity(urls.len());
    let mut pending = Vec::new();

    for (i, url) in urls.iter().enumerate() {
        let lookup = normalize_logged(url)
            .and_then(|normurl| Ok((find_cached(conn, &normurl, session)?, normurl)));
        match lookup {
            Ok((Some(cache), _)) => {
                log::info!("Using cached copy of {}", url);
                loaded.push(Some(Ok(cache)));
            }
            Ok((None, normurl)) => {
                pending.push((i, normurl));
                loaded.push(None);
            }
            Err(e) => loaded.push(Some(Err(e))),
        }
    }

    let normurls: Vec<String> = pending.iter().map(|(_, normurl)| normurl.clone()).collect();
    let pages = fetch_all(source, &normurls).await;
    for ((i, _), (normurl, page)) in pending.into_iter().zip(pages) {
        let cache = page
            .map_err(LoadError::from)
            .and_then(|html| store_page(conn, &normurl, &html, session));
        loaded[i] = Some(cache);
    }

    urls.iter()
        .cloned()
        .zip(loaded)
        .filter_map(|(url, cache)| cache.map(|cache| (url, cache)))
        .collect()
}

/// Parses a cached page with the parser for its session's format, without saving.
pub fn parse_cached(conn: &Connection, cache: &HansardCache) -> Result<ParsedSitting, LoadError> {
    let session = session_of(conn, &cache.hansard)?;
    let format = session.format();
    log::debug!("Parsing {} with the {} parser", cache.hansard, format);
    Ok(parser_for(format, cache.html()).parse()?)
}

/// Parses a cached page and saves its statements.
///
/// Existing statements are only replaced when `resolver` agrees; otherwise
/// nothing is written and [`SaveOutcome::Skipped`] is returned.
pub fn parse_and_save<R: ConflictResolver + ?Sized>(
    conn: &Connection,
    cache: &HansardCache,
    resolver: &mut R,
) -> Result<SaveOutcome, LoadError> {
    let hansard = &cache.hansard;

    let existing = db::count_statements(conn, hansard.id)?;
    if existing > 0 && !resolver.confirm_replace(hansard, existing)? {
        log::info!("Keeping existing statements for {}", hansard);
        return Ok(SaveOutcome::Skipped);
    }

    let parsed = parse_cached(conn, cache)?;

    let tx = conn.unchecked_transaction()?;
    if existing > 0 {
        let deleted = db::delete_statements(&tx, hansard.id)?;
        log::info!("Deleted {} statements for {}", deleted, hansard);
    }
    for statement in &parsed.statements {
        db::insert_statement(&tx, hansard.id, statement)?;
    }
    if let Some(date) = parsed.date {
        db::set_hansard_date(&tx, hansard.id, date)?;
    }
    tx.commit()?;

    log::info!("Saved {} statements for {}", parsed.statements.len(), hansard);
    Ok(SaveOutcome::Saved(parsed.statements.len()))
}

/// Loads a stored Hansard (downloading it if needed), then parses and saves it.
pub async fn parse_and_save_hansard<S: PageSource, R: ConflictResolver + ?Sized>(
    conn: &Connection,
    source: &S,
    hansard: &Hansard,
    resolver: &mut R,
) -> Result<SaveOutcome, LoadError> {
    let cache = load_hansard(conn, source, hansard).await?;
    parse_and_save(conn, &cache, resolver)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hansard() -> Hansard {
        Hansard {
            id: 7,
            session_id: "39-2".to_string(),
            number: "79".to_string(),
            url: None,
            date: None,
        }
    }

    #[test]
    fn test_prompt_accepts_only_y() {
        let mut output = Vec::new();
        let mut prompt = Prompt::new(&b"y\n"[..], &mut output);
        assert!(prompt.confirm_replace(&hansard(), 12).unwrap());
        let shown = String::from_utf8(output).unwrap();
        assert!(shown.contains("There are already 12 statements for Hansard #79 (39-2)."));
        assert!(shown.ends_with("Delete them? (y/n) "));

        for answer in ["n\n", "yes\n", "Y\n", ""] {
            let mut prompt = Prompt::new(answer.as_bytes(), Vec::new());
            assert!(!prompt.confirm_replace(&hansard(), 1).unwrap(), "{answer:?}");
        }

        let mut prompt = Prompt::new(&b"  y  \n"[..], Vec::new());
        assert!(prompt.confirm_replace(&hansard(), 1).unwrap());
    }

    #[test]
    fn test_policy() {
        assert!(Policy::Replace.confirm_replace(&hansard(), 3).unwrap());
        assert!(!Policy::Skip.confirm_replace(&hansard(), 3).unwrap());
    }
}
