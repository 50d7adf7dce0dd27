//! Server construction and middleware wiring.

mod config;
mod state_builders;

pub use config::ServerConfig;

use state_builders::{AppStates, build_app_states};

use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};

use companion::Trace;
#[cfg(debug_assertions)]
use companion::doc::ApiDoc;
use companion::domain::MAX_IMAGE_BYTES;
use companion::inbound::http::chat_messages::{list_messages, mark_read, send_message, unread_count};
use companion::inbound::http::chat_rooms::{
    create_chat_room, get_chat_room, kick_member, leave_chat_room, list_chat_rooms,
    update_notification_setting, update_room_image,
};
use companion::inbound::http::enrollments::{
    accept_enrollment, cancel_enrollment, count_new_enrollments, list_board_enrollments,
    list_received_enrollments, list_sent_enrollments, reject_enrollment, request_enrollment,
};
use companion::inbound::http::health::{HealthState, live, ready};
use companion::inbound::http::internal::delete_all_messages;
use companion::inbound::http::state::HttpState;
use companion::inbound::ws;
use companion::inbound::ws::state::WsState;
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

#[derive(Clone)]
struct AppDependencies {
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
    ws_state: web::Data<WsState>,
}

fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let AppDependencies {
        health_state,
        http_state,
        ws_state,
    } = deps;

    // Literal segments register ahead of `/enrollments/{enrollment_id}`.
    let api = web::scope("/api/v1")
        .service(count_new_enrollments)
        .service(list_sent_enrollments)
        .service(list_received_enrollments)
        .service(request_enrollment)
        .service(list_board_enrollments)
        .service(cancel_enrollment)
        .service(accept_enrollment)
        .service(reject_enrollment)
        .service(create_chat_room)
        .service(list_chat_rooms)
        .service(get_chat_room)
        .service(leave_chat_room)
        .service(kick_member)
        .service(update_room_image)
        .service(update_notification_setting)
        .service(send_message)
        .service(list_messages)
        .service(mark_read)
        .service(unread_count);

    let internal = web::scope("/internal").service(delete_all_messages);

    let app = App::new()
        .app_data(health_state)
        .app_data(http_state)
        .app_data(ws_state)
        .app_data(web::PayloadConfig::new(MAX_IMAGE_BYTES + 1))
        .wrap(Trace)
        .service(api)
        .service(internal)
        .service(ws::ws_entry)
        .service(ready)
        .service(live);

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));
    #[cfg(not(debug_assertions))]
    let app = app;

    app
}

/// Construct an Actix HTTP server using the provided health state and configuration.
///
/// # Parameters
/// - `health_state`: shared readiness state updated once the server is initialised.
/// - `config`: pre-built [`ServerConfig`] carrying the bind address and the
///   optional external adapters.
///
/// # Returns
/// A spawned [`Server`] that must be awaited to drive the listener.
///
/// # Errors
/// Propagates [`std::io::Error`] when binding the socket or starting the server fails.
pub fn create_server(
    health_state: web::Data<HealthState>,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let server_health_state = health_state.clone();
    let AppStates { http, ws } = build_app_states(&config);
    let http_state = web::Data::new(http);
    let ws_state = web::Data::new(ws);

    let server = HttpServer::new(move || {
        build_app(AppDependencies {
            health_state: server_health_state.clone(),
            http_state: http_state.clone(),
            ws_state: ws_state.clone(),
        })
    })
    .bind(config.bind_addr())?
    .run();

    health_state.mark_ready();
    Ok(server)
}
