use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};

use crate::config::ProblemConfig;
use crate::create_timestamp;
use crate::routes::ProblemView;

const DATABASE_NAME: &str = "ace.sqlite3";

/// Columns of the public problem view; hidden test cases are deliberately absent
const PUBLIC_COLUMNS: &str = "problem_id, title, difficulty, description, examples, constraints, \
     starter_code, entry_method, public_test_cases, created_time, updated_time";

pub fn get_db_path() -> std::io::Result<PathBuf> {
    use directories::ProjectDirs;

    let proj_dirs = ProjectDirs::from("", "", "ace").ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::NotFound, "Unable to find user directory")
    })?;
    let data_dir = proj_dirs.data_local_dir();

    fs::create_dir_all(data_dir)?;

    Ok(data_dir.join(DATABASE_NAME))
}

pub async fn init_db(db_path: impl AsRef<Path>) -> sqlx::Result<SqlitePool> {
    let db_url = format!("sqlite://{}?mode=rwc", db_path.as_ref().display()); // rwc = read/write/create
    let db_pool = SqlitePoolOptions::new()
        .max_connections(4)
        .min_connections(0)
        .connect(&db_url)
        .await?;

    // PRAGMA statements cannot run inside a transaction
    for pragma_sql in &[
        "PRAGMA busy_timeout = 2000;", // 2 seconds timeout for lock contention
        "PRAGMA journal_mode = WAL;",
        "PRAGMA synchronous = NORMAL;",
    ] {
        sqlx::query(pragma_sql).execute(&db_pool).await?;
    }

    let mut tx = db_pool.begin().await?;

    sqlx::query(
        r"
        CREATE TABLE IF NOT EXISTS problems (
            problem_id         TEXT  PRIMARY KEY,
            title              TEXT  NOT NULL,
            difficulty         TEXT  NOT NULL,
            description        TEXT  NOT NULL,
            examples           TEXT  NOT NULL DEFAULT '[]',
            constraints        TEXT  NOT NULL DEFAULT '[]',
            starter_code       TEXT  NOT NULL DEFAULT '{}',
            entry_method       TEXT,
            public_test_cases  TEXT  NOT NULL DEFAULT '[]',
            hidden_test_cases  TEXT  NOT NULL DEFAULT '[]',
            created_time       TEXT  NOT NULL,
            updated_time       TEXT  NOT NULL
        );",
    )
    .execute(tx.as_mut())
    .await?;

    tx.commit().await?;

    log::info!("Initialized database at {}", db_path.as_ref().display());

    Ok(db_pool)
}

pub fn remove_db(db_path: impl AsRef<Path>) {
    // Remove WAL and SHM files (ignore errors as they might not exist)
    let wal_path = format!("{}-wal", db_path.as_ref().display());
    let shm_path = format!("{}-shm", db_path.as_ref().display());
    let _ = fs::remove_file(wal_path);
    let _ = fs::remove_file(shm_path);

    if let Err(e) = fs::remove_file(&db_path) {
        log::warn!(
            "Unable to remove database at {}: {e}",
            db_path.as_ref().display()
        );
    } else {
        log::info!("Removed database at {}", db_path.as_ref().display());
    }
}

/// Inserts a problem or replaces every field of an existing one, keeping its creation time
pub async fn upsert_problem<'e, E>(problem: &ProblemConfig, executor: E) -> sqlx::Result<()>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    let now = create_timestamp();

    sqlx::query(
        r#"
        INSERT INTO problems (
            problem_id, title, difficulty, description, examples, constraints, starter_code,
            entry_method, public_test_cases, hidden_test_cases, created_time, updated_time
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(problem_id) DO UPDATE SET
            title = excluded.title,
            difficulty = excluded.difficulty,
            description = excluded.description,
            examples = excluded.examples,
            constraints = excluded.constraints,
            starter_code = excluded.starter_code,
            entry_method = excluded.entry_method,
            public_test_cases = excluded.public_test_cases,
            hidden_test_cases = excluded.hidden_test_cases,
            updated_time = excluded.updated_time
        "#,
    )
    .bind(&problem.problem_id)
    .bind(&problem.title)
    .bind(problem.difficulty.as_str())
    .bind(&problem.description)
    .bind(encode_json(&problem.examples)?)
    .bind(encode_json(&problem.constraints)?)
    .bind(encode_json(&problem.starter_code)?)
    .bind(&problem.entry_method)
    .bind(encode_json(&problem.public_test_cases)?)
    .bind(encode_json(&problem.hidden_test_cases)?)
    .bind(&now)
    .bind(&now)
    .execute(executor)
    .await?;

    Ok(())
}

/// Upserts all `problems` in one transaction and returns how many were written
pub async fn seed_problems(problems: &[ProblemConfig], pool: &SqlitePool) -> sqlx::Result<usize> {
    let mut tx = pool.begin().await?;

    for problem in problems {
        upsert_problem(problem, tx.as_mut()).await?;
        log::debug!("Seeded problem {}", problem.problem_id);
    }

    tx.commit().await?;
    Ok(problems.len())
}

pub async fn count_problems(pool: &SqlitePool) -> sqlx::Result<i64> {
    sqlx::query_scalar("SELECT COUNT(*) FROM problems")
        .fetch_one(pool)
        .await
}

/// All problems, public view only, ordered by id
pub async fn fetch_problems(pool: &SqlitePool) -> sqlx::Result<Vec<ProblemView>> {
    let sql = format!("SELECT {PUBLIC_COLUMNS} FROM problems ORDER BY problem_id");
    let rows = sqlx::query(&sql).fetch_all(pool).await?;

    rows.iter().map(view_from_row).collect()
}

/// Public view of one problem; `RowNotFound` if it does not exist
pub async fn fetch_problem(id: &str, pool: &SqlitePool) -> sqlx::Result<ProblemView> {
    log::debug!("Trying to fetch problem {id} from database");

    let sql = format!("SELECT {PUBLIC_COLUMNS} FROM problems WHERE problem_id = ?");
    let row = sqlx::query(&sql).bind(id).fetch_one(pool).await?;

    view_from_row(&row)
}

/// Full problem document including hidden test cases, for the validation path only
pub async fn fetch_problem_with_hidden(id: &str, pool: &SqlitePool) -> sqlx::Result<ProblemConfig> {
    log::debug!("Trying to fetch problem {id} with hidden test cases from database");

    let sql = format!("SELECT {PUBLIC_COLUMNS}, hidden_test_cases FROM problems WHERE problem_id = ?");
    let row = sqlx::query(&sql).bind(id).fetch_one(pool).await?;

    let view = view_from_row(&row)?;
    Ok(ProblemConfig {
        problem_id: view.problem_id,
        title: view.title,
        difficulty: view.difficulty,
        description: view.description,
        examples: view.examples,
        constraints: view.constraints,
        starter_code: view.starter_code,
        entry_method: view.entry_method,
        public_test_cases: view.public_test_cases,
        hidden_test_cases: decode_json(&row, "hidden_test_cases")?,
    })
}

fn view_from_row(row: &SqliteRow) -> sqlx::Result<ProblemView> {
    let difficulty: String = row.try_get("difficulty")?;

    Ok(ProblemView {
        problem_id: row.try_get("problem_id")?,
        title: row.try_get("title")?,
        difficulty: difficulty.parse().map_err(|e: String| sqlx::Error::ColumnDecode {
            index: "difficulty".to_string(),
            source: e.into(),
        })?,
        description: row.try_get("description")?,
        examples: decode_json(row, "examples")?,
        constraints: decode_json(row, "constraints")?,
        starter_code: decode_json(row, "starter_code")?,
        entry_method: row.try_get("entry_method")?,
        public_test_cases: decode_json(row, "public_test_cases")?,
        created_time: row.try_get("created_time")?,
        updated_time: row.try_get("updated_time")?,
    })
}

fn decode_json<T: DeserializeOwned>(row: &SqliteRow, column: &str) -> sqlx::Result<T> {
    let text: String = row.try_get(column)?;
    serde_json::from_str(&text).map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

fn encode_json<T: serde::Serialize + ?Sized>(value: &T) -> sqlx::Result<String> {
    serde_json::to_string(value).map_err(|e| sqlx::Error::Encode(Box::new(e)))
}
