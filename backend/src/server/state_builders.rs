//! Builders for the driven-port bundle and the adapter states.

use std::sync::Arc;

use mockable::DefaultClock;

use companion::domain::ports::CompanionPorts;
use companion::domain::{EnrollmentService, MessageService, RoomService};
use companion::inbound::http::state::{HttpState, HttpStatePorts};
use companion::inbound::ws::state::{WsState, WsStatePorts};
use companion::outbound::memory::{InMemoryCompanionStore, InMemoryMessageLog};
use companion::outbound::persistence::{
    DbPool, DieselChatRoomRepository, DieselCompanionStore, DieselDirectory,
    DieselEnrollmentRepository, DieselMessageLog,
};
use companion::outbound::presence::InMemoryPresenceRegistry;
use companion::outbound::push::DisabledPushGateway;
use companion::outbound::realtime::BroadcastHub;

use super::ServerConfig;

/// Adapter states shared by every worker.
pub(crate) struct AppStates {
    pub(crate) http: HttpState,
    pub(crate) ws: WsState,
}

/// Relational adapters and message log, backed by PostgreSQL when a pool is
/// configured and by process memory otherwise.
fn relational_ports(
    pool: Option<&DbPool>,
    hub: &BroadcastHub,
    config: &ServerConfig,
) -> CompanionPorts {
    let presence = config
        .presence
        .clone()
        .unwrap_or_else(|| Arc::new(InMemoryPresenceRegistry::new()));
    let push = config
        .push
        .clone()
        .unwrap_or_else(|| Arc::new(DisabledPushGateway));
    match pool {
        Some(pool) => {
            let directory = Arc::new(DieselDirectory::new(pool.clone()));
            CompanionPorts {
                store: Arc::new(DieselCompanionStore::new(pool.clone())),
                enrollments: Arc::new(DieselEnrollmentRepository::new(pool.clone())),
                rooms: Arc::new(DieselChatRoomRepository::new(pool.clone())),
                message_log: Arc::new(DieselMessageLog::new(pool.clone())),
                boards: directory.clone(),
                users: directory,
                presence,
                push,
                publisher: Arc::new(hub.clone()),
                storage: config.storage.clone(),
            }
        }
        None => {
            let store = InMemoryCompanionStore::new();
            CompanionPorts {
                store: Arc::new(store.clone()),
                enrollments: Arc::new(store.clone()),
                rooms: Arc::new(store.clone()),
                message_log: Arc::new(InMemoryMessageLog::new()),
                boards: Arc::new(store.clone()),
                users: Arc::new(store),
                presence,
                push,
                publisher: Arc::new(hub.clone()),
                storage: config.storage.clone(),
            }
        }
    }
}

/// Wire the domain services and wrap them in the inbound adapter states.
pub(crate) fn build_app_states(config: &ServerConfig) -> AppStates {
    let hub = BroadcastHub::default();
    let ports = relational_ports(config.db_pool.as_ref(), &hub, config);
    let clock = Arc::new(DefaultClock);

    let messages = Arc::new(MessageService::new(
        &ports,
        clock.clone(),
        config.day_boundary,
    ));
    let rooms = Arc::new(RoomService::new(&ports, messages.clone(), clock.clone()));
    let enrollments = Arc::new(EnrollmentService::new(&ports, messages.clone(), clock));

    let http = HttpState::new(HttpStatePorts {
        enrollments: enrollments.clone(),
        enrollments_query: enrollments,
        chat_rooms: rooms.clone(),
        chat_rooms_query: rooms.clone(),
        messages: messages.clone(),
        messages_query: messages.clone(),
    });
    let ws = WsState::new(
        WsStatePorts {
            messages,
            rooms,
            presence: ports.presence.clone(),
            topics: Arc::new(hub),
        },
        config.origins.clone(),
    );
    AppStates { http, ws }
}

#[cfg(test)]
mod tests {
    use super::*;
    use companion::domain::ports::FixtureObjectStorage;
    use rstest::rstest;

    #[rstest]
    #[tokio::test]
    async fn in_memory_states_share_one_presence_registry() {
        let config = ServerConfig::new(
            "127.0.0.1:0".parse().expect("socket addr"),
            Arc::new(FixtureObjectStorage),
        );
        let states = build_app_states(&config);
        let room = companion::domain::ChatRoomId::random();
        let user = companion::domain::UserId::random();

        states
            .ws
            .presence
            .join(&room, &user)
            .await
            .expect("join presence");

        assert!(
            states
                .ws
                .presence
                .is_present(&room, &user)
                .await
                .expect("presence lookup")
        );
    }
}
