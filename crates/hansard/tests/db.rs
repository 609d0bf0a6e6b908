use chrono::{NaiveDate, NaiveTime};
use hansard::db::schema::{CURRENT_VERSION, create_schema, get_schema_version};
use hansard::db::*;
use hansard::types::{Session, Speaker, Statement};

fn test_session() -> Session {
    Session {
        id: "39-2".to_string(),
        parliament: 39,
        number: 2,
        start: NaiveDate::from_ymd_opt(2007, 10, 16).unwrap(),
        end: Some(NaiveDate::from_ymd_opt(2008, 9, 7).unwrap()),
    }
}

fn test_statement(sequence: u32) -> Statement {
    Statement {
        sequence,
        time: NaiveTime::from_hms_opt(10, 5, 0),
        who: "Hon. Jim Flaherty (Minister of Finance, CPC)".to_string(),
        speaker: Some(Speaker {
            name: "Hon. Jim Flaherty".to_string(),
            details: Some("Minister of Finance".to_string()),
            party: Some("CPC".to_string()),
        }),
        h1: Some("Government Orders".to_string()),
        h2: None,
        text: "Bill C-10 and Bill C-2 are before the House.".to_string(),
        wordcount: 9,
        procedural: false,
        bills: vec!["C-10".to_string(), "C-2".to_string()],
    }
}

#[test]
fn create_schema_in_memory() {
    let conn = open_memory().unwrap();
    assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_VERSION);
    // Running the DDL again must not fail
    conn.execute_batch("DELETE FROM schema_version").unwrap();
    create_schema(&conn).unwrap();
}

#[test]
fn foreign_keys_enabled() {
    let conn = open_memory().unwrap();
    let fk: i32 = conn
        .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
        .unwrap();
    assert_eq!(fk, 1);
}

#[test]
fn open_database_reopens_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hansard.db");

    {
        let conn = open_database(&path).unwrap();
        upsert_session(&conn, &test_session()).unwrap();
    }

    let conn = open_database(&path).unwrap();
    assert_eq!(list_sessions(&conn).unwrap(), vec![test_session()]);
}

#[test]
fn open_database_rejects_newer_schema() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hansard.db");

    {
        let conn = open_database(&path).unwrap();
        conn.execute("INSERT INTO schema_version (version) VALUES (99)", [])
            .unwrap();
    }

    assert!(matches!(
        open_database(&path),
        Err(SchemaError::VersionMismatch {
            expected: CURRENT_VERSION,
            found: 99
        })
    ));
}

#[test]
fn upsert_session_is_idempotent() {
    let conn = open_memory().unwrap();
    let mut session = test_session();
    upsert_session(&conn, &session).unwrap();

    session.end = None;
    upsert_session(&conn, &session).unwrap();

    let sessions = list_sessions(&conn).unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].end, None);
    assert_eq!(get_session(&conn, "39-2").unwrap(), Some(session));
    assert_eq!(get_session(&conn, "35-1").unwrap(), None);
}

#[test]
fn hansard_crud() {
    let conn = open_memory().unwrap();
    upsert_session(&conn, &test_session()).unwrap();

    let inserted = insert_hansard(&conn, "39-2", "79", Some("http://example.com/79")).unwrap();
    assert_eq!(find_hansard(&conn, "39-2", "79").unwrap(), Some(inserted.clone()));
    assert_eq!(find_hansard(&conn, "39-2", "80").unwrap(), None);

    set_hansard_date(&conn, inserted.id, NaiveDate::from_ymd_opt(2008, 4, 3).unwrap()).unwrap();
    let fetched = get_hansard(&conn, inserted.id).unwrap();
    assert_eq!(fetched.date, NaiveDate::from_ymd_opt(2008, 4, 3));

    assert!(matches!(
        get_hansard(&conn, 404),
        Err(OperationError::NotFound { .. })
    ));
}

#[test]
fn hansard_number_is_unique_per_session() {
    let conn = open_memory().unwrap();
    upsert_session(&conn, &test_session()).unwrap();

    insert_hansard(&conn, "39-2", "79", None).unwrap();
    assert!(insert_hansard(&conn, "39-2", "79", None).is_err());
}

#[test]
fn hansard_requires_known_session() {
    let conn = open_memory().unwrap();
    assert!(insert_hansard(&conn, "39-2", "79", None).is_err());
}

#[test]
fn cache_is_replaced_in_place() {
    let conn = open_memory().unwrap();
    upsert_session(&conn, &test_session()).unwrap();
    let hansard = insert_hansard(&conn, "39-2", "79", Some("http://example.com/79")).unwrap();

    assert_eq!(get_cache(&conn, &hansard).unwrap(), None);

    save_cache(&conn, &hansard, "<html>first</html>").unwrap();
    let cache = save_cache(&conn, &hansard, "<html>second</html>").unwrap();
    assert_eq!(cache.html(), "<html>second</html>");

    let by_url = find_cache_by_url(&conn, "http://example.com/79")
        .unwrap()
        .expect("cache should be found by url");
    assert_eq!(by_url.hansard, hansard);
    assert_eq!(by_url.html, "<html>second</html>");
    assert_eq!(find_cache_by_url(&conn, "http://example.com/80").unwrap(), None);

    assert!(delete_cache(&conn, hansard.id).unwrap());
    assert!(!delete_cache(&conn, hansard.id).unwrap());
}

#[test]
fn statements_roundtrip_with_bills() {
    let conn = open_memory().unwrap();
    upsert_session(&conn, &test_session()).unwrap();
    let hansard = insert_hansard(&conn, "39-2", "79", None).unwrap();

    let procedural = Statement {
        sequence: 0,
        time: None,
        who: "Proceedings".to_string(),
        speaker: None,
        h1: None,
        h2: None,
        text: "Prayers".to_string(),
        wordcount: 1,
        procedural: true,
        bills: vec![],
    };
    insert_statement(&conn, hansard.id, &procedural).unwrap();
    insert_statement(&conn, hansard.id, &test_statement(1)).unwrap();

    assert_eq!(count_statements(&conn, hansard.id).unwrap(), 2);
    let saved = statements_for(&conn, hansard.id).unwrap();
    assert_eq!(saved, vec![procedural, test_statement(1)]);
    assert_eq!(saved[1].bills, vec!["C-10", "C-2"]);

    // Same sequence twice is rejected
    assert!(insert_statement(&conn, hansard.id, &test_statement(1)).is_err());
}

#[test]
fn delete_statements_cascades_to_bills() {
    let conn = open_memory().unwrap();
    upsert_session(&conn, &test_session()).unwrap();
    let hansard = insert_hansard(&conn, "39-2", "79", None).unwrap();
    insert_statement(&conn, hansard.id, &test_statement(0)).unwrap();
    insert_statement(&conn, hansard.id, &test_statement(1)).unwrap();

    assert_eq!(delete_statements(&conn, hansard.id).unwrap(), 2);
    assert_eq!(count_statements(&conn, hansard.id).unwrap(), 0);

    let bills: i32 = conn
        .query_row("SELECT COUNT(*) FROM statement_bills", [], |row| row.get(0))
        .unwrap();
    assert_eq!(bills, 0);
}

#[test]
fn list_hansards_reports_counts() {
    let conn = open_memory().unwrap();
    upsert_session(&conn, &test_session()).unwrap();
    upsert_session(
        &conn,
        &Session {
            id: "35-1".to_string(),
            parliament: 35,
            number: 1,
            start: NaiveDate::from_ymd_opt(1994, 1, 17).unwrap(),
            end: None,
        },
    )
    .unwrap();

    let cached = insert_hansard(&conn, "39-2", "79", Some("http://example.com/79")).unwrap();
    save_cache(&conn, &cached, "<html></html>").unwrap();
    insert_statement(&conn, cached.id, &test_statement(0)).unwrap();
    insert_hansard(&conn, "35-1", "12", None).unwrap();

    let all = list_hansards(&conn, None).unwrap();
    assert_eq!(all.len(), 2);

    let session = list_hansards(&conn, Some("39-2")).unwrap();
    assert_eq!(session.len(), 1);
    assert_eq!(session[0].hansard, cached);
    assert_eq!(session[0].statements, 1);
    assert!(session[0].cached);

    let archive = list_hansards(&conn, Some("35-1")).unwrap();
    assert_eq!(archive[0].statements, 0);
    assert!(!archive[0].cached);
}
