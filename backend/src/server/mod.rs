//! Server construction and middleware wiring.

mod config;
mod jobs;
mod state_builders;

pub use config::ServerConfig;

use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};

use crate::inbound::http::health::{HealthState, live, ready};
use crate::inbound::http::state::HttpState;
use crate::inbound::http::{conversations, groups, interactions, jobs as job_routes, matches};
use crate::inbound::ws;
use crate::inbound::ws::state::WsState;
use crate::middleware::Trace;
use state_builders::build_state;

/// Assemble the application: routes, state, and middleware. Public so
/// tests can host the exact production app over test adapters.
pub fn build_app(
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
    ws_state: web::Data<WsState>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let api = web::scope("/api/v1")
        .service(matches::list_matches)
        .service(matches::swipe)
        .service(interactions::list_interactions)
        .service(interactions::reset_rejections)
        .service(interactions::remove_rejection)
        .service(conversations::open_conversation)
        .service(conversations::list_conversations)
        .service(conversations::list_messages)
        .service(conversations::post_message)
        .service(groups::list_groups)
        .service(groups::list_group_members)
        .service(job_routes::refresh_cache)
        .service(job_routes::refresh_all_caches)
        .service(job_routes::run_grouping)
        .service(job_routes::deactivate_idle);

    App::new()
        .app_data(health_state)
        .app_data(http_state)
        .app_data(ws_state)
        .wrap(Trace)
        .service(api)
        .service(ws::chat_entry)
        .service(ws::notify_entry)
        .service(ready)
        .service(live)
}

/// Construct the Actix HTTP server: wire adapters and services from the
/// configuration, start the background jobs, and bind the listener.
///
/// # Errors
///
/// Propagates [`std::io::Error`] when a configured backend is unreachable
/// or binding the socket fails.
pub async fn create_server(
    health_state: web::Data<HealthState>,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let state = build_state(&config).await?;
    jobs::spawn_background_jobs(&state, &config);

    let server_health_state = health_state.clone();
    let server = HttpServer::new(move || {
        build_app(
            server_health_state.clone(),
            state.http_state.clone(),
            state.ws_state.clone(),
        )
    })
    .bind(config.bind_addr())?
    .run();

    health_state.mark_ready();
    Ok(server)
}
