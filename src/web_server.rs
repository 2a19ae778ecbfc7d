use actix_web::{App, HttpServer, dev::Server, middleware, web};
use sqlx::sqlite::SqlitePool;

use crate::config::ServerConfig;
use crate::routes::{
    get_problem_handler, get_problems_handler, health_handler, json_error_handler,
    validate_handler,
};
use crate::sandbox::Judge;

/// Registers every route and shared state of the service on `cfg`
pub fn configure_app(
    db_pool: web::Data<SqlitePool>,
    judge: web::Data<Judge>,
) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        cfg.app_data(db_pool)
            .app_data(judge)
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .service(health_handler)
            .service(get_problems_handler)
            .service(get_problem_handler)
            .service(validate_handler);
    }
}

pub fn build_server(
    server_config: ServerConfig,
    db_pool: SqlitePool,
    judge: Judge,
) -> std::io::Result<Server> {
    let db_pool = web::Data::new(db_pool);
    let judge = web::Data::new(judge);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .configure(configure_app(db_pool.clone(), judge.clone()))
    })
    .bind((
        server_config
            .bind_address
            .unwrap_or("127.0.0.1".to_string()),
        server_config.bind_port.unwrap_or(5001),
    ))?
    .run();

    Ok(server)
}
