//! Materializing real SQLite result rows through the sqlx adapter.

use rowbind::db::sqlite::cursor_from_rows;
use rowbind::{
    CellValue, Entity, Materializer, RawRow, RowCursor, TypeDescriptor, TypeTag,
};
use sqlx::{Connection, SqliteConnection};
use tempfile::NamedTempFile;

#[derive(Debug, Default, PartialEq)]
struct Track {
    id: i64,
    title: String,
    rating: Option<f64>,
    explicit: bool,
}

impl Entity for Track {
    fn descriptor() -> TypeDescriptor<Self> {
        TypeDescriptor::builder("Track")
            .default_fn(Track::default)
            .member("id", |t: &mut Track, v: i64| t.id = v)
            .member("title", |t: &mut Track, v: String| t.title = v)
            .member("rating", |t: &mut Track, v: Option<f64>| t.rating = v)
            .member("explicit", |t: &mut Track, v: bool| t.explicit = v)
            .build()
    }
}

async fn seed_tracks(conn: &mut SqliteConnection) {
    sqlx::query(
        "CREATE TABLE tracks (
            id INTEGER PRIMARY KEY,
            title TEXT NOT NULL,
            rating REAL,
            explicit BOOLEAN NOT NULL DEFAULT 0
        )",
    )
    .execute(&mut *conn)
    .await
    .unwrap();

    sqlx::query("INSERT INTO tracks (id, title, rating, explicit) VALUES (1, 'Intro', 4.5, 0)")
        .execute(&mut *conn)
        .await
        .unwrap();
    sqlx::query("INSERT INTO tracks (id, title, rating, explicit) VALUES (2, 'Outro', NULL, 1)")
        .execute(&mut *conn)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_materialize_from_sqlite_rows() {
    let mut conn = SqliteConnection::connect("sqlite::memory:").await.unwrap();
    seed_tracks(&mut conn).await;

    let rows = sqlx::query("SELECT id, title, rating, explicit FROM tracks ORDER BY id")
        .fetch_all(&mut conn)
        .await
        .unwrap();

    let cursor = cursor_from_rows(&rows);
    assert_eq!(cursor.schema().len(), 4);
    assert_eq!(
        cursor.schema().column(0).unwrap().source_type,
        TypeTag::Integer
    );
    assert_eq!(
        cursor.schema().column(3).unwrap().source_type,
        TypeTag::Bool
    );

    let engine = Materializer::new();
    let tracks: Vec<Track> = engine.materialize_all(cursor).unwrap();
    assert_eq!(
        tracks,
        vec![
            Track {
                id: 1,
                title: "Intro".to_string(),
                rating: Some(4.5),
                explicit: false,
            },
            Track {
                id: 2,
                title: "Outro".to_string(),
                rating: None,
                explicit: true,
            },
        ]
    );
}

#[tokio::test]
async fn test_extra_columns_are_ignored() {
    let mut conn = SqliteConnection::connect("sqlite::memory:").await.unwrap();
    seed_tracks(&mut conn).await;

    let rows = sqlx::query(
        "SELECT id, title, rating, explicit, length(title) AS title_len FROM tracks ORDER BY id",
    )
    .fetch_all(&mut conn)
    .await
    .unwrap();

    let engine = Materializer::new();
    let tracks: Vec<Track> = engine.materialize_all(cursor_from_rows(&rows)).unwrap();
    assert_eq!(tracks.len(), 2);
    assert_eq!(tracks[0].title, "Intro");
}

#[tokio::test]
async fn test_decoded_cells_match_storage() {
    let mut conn = SqliteConnection::connect("sqlite::memory:").await.unwrap();
    seed_tracks(&mut conn).await;

    let rows = sqlx::query("SELECT id, title, rating FROM tracks WHERE id = 2")
        .fetch_all(&mut conn)
        .await
        .unwrap();
    let mut cursor = cursor_from_rows(&rows);
    let row = cursor.next_row().unwrap();
    assert_eq!(row.value(0), CellValue::Int(2));
    assert_eq!(row.value(1), CellValue::Text("Outro".to_string()));
    assert!(row.is_null(2));
}

#[tokio::test]
async fn test_empty_result_set_yields_empty_cursor() {
    let mut conn = SqliteConnection::connect("sqlite::memory:").await.unwrap();
    seed_tracks(&mut conn).await;

    let rows = sqlx::query("SELECT id, title, rating, explicit FROM tracks WHERE id > 100")
        .fetch_all(&mut conn)
        .await
        .unwrap();
    let mut cursor = cursor_from_rows(&rows);
    assert!(cursor.schema().is_empty());
    assert!(cursor.next_row().is_none());
}

#[tokio::test]
async fn test_file_backed_database_round_trip() {
    let temp_file = NamedTempFile::new().unwrap();
    let url = format!("sqlite:{}?mode=rwc", temp_file.path().to_str().unwrap());
    let mut conn = SqliteConnection::connect(&url).await.unwrap();
    seed_tracks(&mut conn).await;

    let rows = sqlx::query("SELECT id, title, rating, explicit FROM tracks ORDER BY id")
        .fetch_all(&mut conn)
        .await
        .unwrap();

    let engine = Materializer::new();
    let tracks: Vec<Track> = engine.materialize_all(cursor_from_rows(&rows)).unwrap();
    assert_eq!(tracks.len(), 2);
    assert_eq!(tracks[1].explicit, true);
}
