use actix_web::{HttpResponse, Responder, get, web};
use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::sqlite::SqlitePool;

use super::{external_error, not_found};
use crate::config::Difficulty;
use crate::database as db;
use crate::sandbox::TestCase;

/// Problem as shown to candidates, without hidden test cases
#[derive(Serialize, Debug, Clone)]
pub struct ProblemView {
    pub problem_id: String,
    pub title: String,
    pub difficulty: Difficulty,
    pub description: String,
    pub examples: Vec<Value>,
    pub constraints: Vec<String>,
    pub starter_code: Map<String, Value>,
    pub entry_method: Option<String>,
    pub public_test_cases: Vec<TestCase>,
    pub created_time: String,
    pub updated_time: String,
}

#[get("/problems")]
pub async fn get_problems_handler(pool: web::Data<SqlitePool>) -> impl Responder {
    match db::fetch_problems(pool.get_ref()).await {
        Ok(problems) => {
            log::info!("Got {} problems", problems.len());
            HttpResponse::Ok().json(problems)
        }
        Err(e) => {
            log::error!("Failed to retrieve problems: {e}");
            external_error()
        }
    }
}

#[get("/problems/{id}")]
pub async fn get_problem_handler(
    pool: web::Data<SqlitePool>,
    path: web::Path<(String,)>,
) -> impl Responder {
    let problem_id = path.into_inner().0;

    match db::fetch_problem(&problem_id, pool.get_ref()).await {
        Ok(problem) => HttpResponse::Ok().json(problem),
        Err(sqlx::Error::RowNotFound) => {
            log::info!("Got nothing with problem id {problem_id} from database");
            not_found(format!("Problem {problem_id} not found."))
        }
        Err(e) => {
            log::error!("Failed to retrieve problem {problem_id}: {e}");
            external_error()
        }
    }
}
