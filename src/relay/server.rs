use super::Relay;
use crate::{config::RelayConfig, logger};
use actix_web::{
    http::{Method, StatusCode},
    middleware, web, App, HttpResponse, HttpServer,
};

const ALLOW_ORIGIN: (&str, &str) = ("Access-Control-Allow-Origin", "*");

async fn relay_action(relay: web::Data<Relay>, body: web::Bytes) -> HttpResponse {
    let reply = relay.handle(&body).await;
    let status =
        StatusCode::from_u16(reply.status.as_u16()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    HttpResponse::build(status).json(reply.body)
}

async fn preflight() -> HttpResponse {
    HttpResponse::Ok()
        .insert_header(("Access-Control-Allow-Methods", "POST, OPTIONS"))
        .insert_header(("Access-Control-Allow-Headers", "*"))
        .finish()
}

async fn method_not_allowed() -> HttpResponse {
    HttpResponse::MethodNotAllowed()
        .content_type("text/plain")
        .body("Method not allowed")
}

/// Mounts the relay endpoint at `path`.
pub fn routes(cfg: &mut web::ServiceConfig, path: &str) {
    cfg.service(
        web::resource(path)
            .route(web::post().to(relay_action))
            .route(web::method(Method::OPTIONS).to(preflight))
            .default_service(web::to(method_not_allowed)),
    );
}

pub fn cors_headers() -> middleware::DefaultHeaders {
    middleware::DefaultHeaders::new().add(ALLOW_ORIGIN)
}

pub async fn run(relay: Relay, config: &RelayConfig) -> std::io::Result<()> {
    let data = web::Data::new(relay);
    let path = config.path.clone();

    logger::log_startup_info(
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        &config.host,
        config.port,
    );

    HttpServer::new(move || {
        let path = path.clone();
        App::new()
            .app_data(data.clone())
            .wrap(cors_headers())
            .wrap(middleware::Logger::new("%r -> %s in %Dms"))
            .configure(move |cfg| routes(cfg, &path))
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
