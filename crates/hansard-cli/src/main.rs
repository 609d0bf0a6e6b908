use std::path::{Path, PathBuf};
use std::process;
use std::str::FromStr;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use hansard::db::{self, Connection, open_database};
use hansard::loader::{self, ConflictResolver, Policy, Prompt};
use hansard::parser::parser_for;
use hansard::scraper::WebScraper;
use hansard::types::{HansardCache, HansardFormat, SaveOutcome, Session, Statement};
use log::LevelFilter;

#[derive(Parser)]
#[command(name = "hansard")]
#[command(about = "Imports House of Commons Hansard transcripts into a local database", long_about = None)]
struct Cli {
    #[arg(
        short = 'l',
        long = "log-level",
        value_enum,
        default_value = "info",
        global = true,
        help = "Set the logging level"
    )]
    log_level: LogLevel,

    #[arg(
        long,
        env = "HANSARD_DATABASE",
        default_value = "hansard.db",
        global = true,
        help = "Path to the SQLite database"
    )]
    database: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Register or list parliamentary sessions
    Session {
        #[command(subcommand)]
        command: SessionCommands,
    },
    /// Download and cache a Hansard page without parsing it
    Fetch {
        #[arg(help = "URL of the Hansard page")]
        url: String,

        #[arg(long, help = "Session the Hansard belongs to, e.g. 39-2")]
        session: String,
    },
    /// Download, parse and save one or more Hansards
    Import {
        #[arg(required = true, help = "URLs of the Hansard pages")]
        urls: Vec<String>,

        #[arg(long, help = "Session the Hansards belong to, e.g. 39-2")]
        session: String,

        #[arg(long, conflicts_with = "skip", help = "Replace saved statements without asking")]
        replace: bool,

        #[arg(long, help = "Keep saved statements without asking")]
        skip: bool,
    },
    /// Parse and save a stored Hansard again, downloading it if it was never cached
    Reparse {
        #[arg(help = "ID of the stored Hansard")]
        hansard_id: i64,

        #[arg(long, conflicts_with = "skip", help = "Replace saved statements without asking")]
        replace: bool,

        #[arg(long, help = "Keep saved statements without asking")]
        skip: bool,
    },
    /// Parse a cached Hansard and print the statements without saving them
    Inspect {
        #[arg(help = "ID of the stored Hansard")]
        hansard_id: i64,

        #[arg(
            long = "format",
            value_parser = parse_format,
            help = "Parse with this markup instead of the session's (archive, current)"
        )]
        markup: Option<HansardFormat>,

        #[arg(
            short = 'o',
            long = "output",
            value_enum,
            default_value = "text",
            help = "Output format"
        )]
        format: OutputFormat,
    },
    /// List stored Hansards with their statement counts
    List {
        #[arg(long, help = "Only Hansards of this session")]
        session: Option<String>,

        #[arg(
            short = 'o',
            long = "output",
            value_enum,
            default_value = "text",
            help = "Output format"
        )]
        format: OutputFormat,
    },
    /// Print the saved statements of a Hansard
    Statements {
        #[arg(help = "ID of the stored Hansard")]
        hansard_id: i64,

        #[arg(
            short = 'o',
            long = "output",
            value_enum,
            default_value = "text",
            help = "Output format"
        )]
        format: OutputFormat,
    },
    /// Print the JSON Schema of an exported statement
    Schema,
}

#[derive(Subcommand)]
enum SessionCommands {
    /// Register a session, or update it if the ID is already known
    Add {
        #[arg(help = "Session ID, e.g. 39-2")]
        id: String,

        #[arg(long)]
        parliament: u32,

        #[arg(long)]
        number: u32,

        #[arg(
            long,
            value_name = "YYYY-MM-DD",
            value_parser = parse_date,
            help = "First day of the session"
        )]
        start: NaiveDate,

        #[arg(
            long,
            value_name = "YYYY-MM-DD",
            value_parser = parse_date,
            help = "Last day of the session"
        )]
        end: Option<NaiveDate>,
    },
    /// List registered sessions
    List {
        #[arg(
            short = 'o',
            long = "output",
            value_enum,
            default_value = "text",
            help = "Output format"
        )]
        format: OutputFormat,
    },
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| e.to_string())
}

fn parse_format(s: &str) -> Result<HansardFormat, String> {
    HansardFormat::from_str(s).map_err(|e| e.to_string())
}

fn serialize_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            log::error!("Error serializing to JSON: {}", e);
            process::exit(1);
        }
    }
}

fn resolver(replace: bool, skip: bool) -> Box<dyn ConflictResolver> {
    if replace {
        Box::new(Policy::Replace)
    } else if skip {
        Box::new(Policy::Skip)
    } else {
        Box::new(Prompt::stdio())
    }
}

fn open(path: &Path) -> Connection {
    open_database(path).unwrap_or_else(|e| {
        log::error!("Error opening database {}: {}", path.display(), e);
        process::exit(1);
    })
}

fn scraper() -> WebScraper {
    WebScraper::new().unwrap_or_else(|e| {
        log::error!("Error creating scraper: {}", e);
        process::exit(1);
    })
}

fn session(conn: &Connection, id: &str) -> Session {
    match db::get_session(conn, id) {
        Ok(Some(session)) => session,
        Ok(None) => {
            log::error!("Unknown session {}, register it with `hansard session add`", id);
            process::exit(1);
        }
        Err(e) => {
            log::error!("Error reading session {}: {}", id, e);
            process::exit(1);
        }
    }
}

fn cached(conn: &Connection, hansard_id: i64) -> HansardCache {
    let hansard = db::get_hansard(conn, hansard_id).unwrap_or_else(|e| {
        log::error!("Error reading Hansard: {}", e);
        process::exit(1);
    });

    match db::get_cache(conn, &hansard) {
        Ok(Some(cache)) => cache,
        Ok(None) => {
            log::error!("{} has not been downloaded, run `hansard reparse {}`", hansard, hansard_id);
            process::exit(1);
        }
        Err(e) => {
            log::error!("Error reading cached page: {}", e);
            process::exit(1);
        }
    }
}

fn report(outcome: SaveOutcome, cache: &HansardCache) {
    match outcome {
        SaveOutcome::Saved(n) => println!("Saved {} statement(s) for {}", n, cache.hansard),
        SaveOutcome::Skipped => println!("Skipped {}", cache.hansard),
    }
}

async fn import(
    conn: &Connection,
    urls: &[String],
    session: &Session,
    resolver: &mut dyn ConflictResolver,
) -> usize {
    let scraper = scraper();
    let mut failures = 0;

    for (url, cache) in loader::load_all(conn, &scraper, urls, session).await {
        let saved = cache.and_then(|cache| {
            loader::parse_and_save(conn, &cache, resolver).map(|outcome| (outcome, cache))
        });
        match saved {
            Ok((outcome, cache)) => report(outcome, &cache),
            Err(e) => {
                log::error!("Error importing {}: {}", url, e);
                failures += 1;
            }
        }
    }

    failures
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level.clone().into())
        .init();

    match cli.command {
        Commands::Session { command } => {
            let conn = open(&cli.database);
            match command {
                SessionCommands::Add {
                    id,
                    parliament,
                    number,
                    start,
                    end,
                } => {
                    let session = Session {
                        id,
                        parliament,
                        number,
                        start,
                        end,
                    };
                    db::upsert_session(&conn, &session).unwrap_or_else(|e| {
                        log::error!("Error saving session: {}", e);
                        process::exit(1);
                    });
                    println!("{} ({} format)", session, session.format());
                }
                SessionCommands::List { format } => {
                    let sessions = db::list_sessions(&conn).unwrap_or_else(|e| {
                        log::error!("Error listing sessions: {}", e);
                        process::exit(1);
                    });
                    match format {
                        OutputFormat::Json => serialize_json(&sessions),
                        OutputFormat::Text => {
                            if sessions.is_empty() {
                                println!("No sessions registered.");
                            }
                            for session in &sessions {
                                println!("{}", session);
                            }
                        }
                    }
                }
            }
        }

        Commands::Fetch { url, session: id } => {
            let conn = open(&cli.database);
            let session = session(&conn, &id);
            let cache = loader::load_hansard_url(&conn, &scraper(), &url, &session)
                .await
                .unwrap_or_else(|e| {
                    log::error!("Error fetching {}: {}", url, e);
                    process::exit(1);
                });
            println!("[{}] {} cached at {}", cache.hansard.id, cache.hansard, cache.fetched_at);
        }

        Commands::Import {
            urls,
            session: id,
            replace,
            skip,
        } => {
            let conn = open(&cli.database);
            let session = session(&conn, &id);
            let mut resolver = resolver(replace, skip);

            let failures = import(&conn, &urls, &session, resolver.as_mut()).await;
            if failures > 0 {
                log::error!("{} of {} Hansard(s) failed to import", failures, urls.len());
                process::exit(1);
            }
        }

        Commands::Reparse {
            hansard_id,
            replace,
            skip,
        } => {
            let conn = open(&cli.database);
            let hansard = db::get_hansard(&conn, hansard_id).unwrap_or_else(|e| {
                log::error!("Error reading Hansard: {}", e);
                process::exit(1);
            });
            let mut resolver = resolver(replace, skip);

            let outcome =
                loader::parse_and_save_hansard(&conn, &scraper(), &hansard, resolver.as_mut())
                    .await
                    .unwrap_or_else(|e| {
                        log::error!("Error parsing {}: {}", hansard, e);
                        process::exit(1);
                    });
            match outcome {
                SaveOutcome::Saved(n) => println!("Saved {} statement(s) for {}", n, hansard),
                SaveOutcome::Skipped => println!("Skipped {}", hansard),
            }
        }

        Commands::Inspect {
            hansard_id,
            markup,
            format,
        } => {
            let conn = open(&cli.database);
            let cache = cached(&conn, hansard_id);

            let parsed = match markup {
                Some(markup) => {
                    log::info!("Parsing {} as {} markup", cache.hansard, markup);
                    parser_for(markup, cache.html()).parse().map_err(Into::into)
                }
                None => loader::parse_cached(&conn, &cache),
            }
            .unwrap_or_else(|e: loader::LoadError| {
                log::error!("Error parsing {}: {}", cache.hansard, e);
                process::exit(1);
            });

            match format {
                OutputFormat::Json => serialize_json(&parsed),
                OutputFormat::Text => print!("{}", parsed),
            }
        }

        Commands::List { session, format } => {
            let conn = open(&cli.database);
            let hansards = db::list_hansards(&conn, session.as_deref()).unwrap_or_else(|e| {
                log::error!("Error listing Hansards: {}", e);
                process::exit(1);
            });

            match format {
                OutputFormat::Json => serialize_json(&hansards),
                OutputFormat::Text => {
                    if hansards.is_empty() {
                        println!("No entries to display.");
                    } else {
                        for summary in &hansards {
                            println!("{}", summary);
                        }
                        let total: usize = hansards.iter().map(|h| h.statements).sum();
                        println!("\n{} Hansard(s), {} statement(s)", hansards.len(), total);
                    }
                }
            }
        }

        Commands::Statements { hansard_id, format } => {
            let conn = open(&cli.database);
            let hansard = db::get_hansard(&conn, hansard_id).unwrap_or_else(|e| {
                log::error!("Error reading Hansard: {}", e);
                process::exit(1);
            });
            let statements = db::statements_for(&conn, hansard.id).unwrap_or_else(|e| {
                log::error!("Error reading statements: {}", e);
                process::exit(1);
            });

            match format {
                OutputFormat::Json => serialize_json(&statements),
                OutputFormat::Text => {
                    println!("{}", hansard);
                    if statements.is_empty() {
                        println!("No statements saved.");
                    }
                    for statement in &statements {
                        print!("{}", statement);
                    }
                }
            }
        }

        Commands::Schema => serialize_json(&schemars::schema_for!(Statement)),
    }
}
