use actix_web::{HttpResponse, Responder, post, web};
use serde::Deserialize;
use sqlx::sqlite::SqlitePool;

use super::{ErrorResponse, external_error, not_found};
use crate::database as db;
use crate::sandbox::{Judge, Submission};

#[derive(Deserialize, Debug)]
pub struct ValidateRequest {
    pub code: String,
    /// Kept as free text so unknown languages are reported per test case
    pub language: String,
}

#[post("/problems/{id}/validate")]
pub async fn validate_handler(
    pool: web::Data<SqlitePool>,
    judge: web::Data<Judge>,
    path: web::Path<(String,)>,
    body: web::Json<ValidateRequest>,
) -> impl Responder {
    let problem_id = path.into_inner().0;

    let problem = match db::fetch_problem_with_hidden(&problem_id, pool.get_ref()).await {
        Ok(problem) => problem,
        Err(sqlx::Error::RowNotFound) => {
            log::info!("Validation requested for unknown problem {problem_id}");
            return not_found(format!("Problem {problem_id} not found."));
        }
        Err(e) => {
            log::error!("Failed to load hidden test cases of {problem_id}: {e}");
            return external_error();
        }
    };

    let ValidateRequest { code, language } = body.into_inner();
    let submission = Submission {
        problem_id,
        code,
        language,
    };

    // Panics inside the judge come back as a JoinError
    let judge = judge.into_inner();
    let handle = tokio::spawn(async move { judge.validate(&problem, &submission).await });

    match handle.await {
        Ok(report) => HttpResponse::Ok().json(report),
        Err(e) => {
            log::error!("Validation task failed: {e}");
            HttpResponse::InternalServerError().json(ErrorResponse {
                reason: "ERR_INTERNAL",
                code: 6,
            })
        }
    }
}
