//! Shared fixtures for the crate's unit tests.
//!
//! [`CompanionHarness`] wires the in-memory adapters into a
//! [`CompanionPorts`] bundle. Tests that need a failing collaborator replace
//! single fields of the bundle with mockall doubles before building services.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use mockable::Clock;

use crate::domain::ports::{
    CompanionPorts, CompanionStore, FixtureObjectStorage, FixturePushGateway,
    FixtureRealtimePublisher,
};
use crate::domain::{
    Board, BoardId, CapacityLedger, ChatRoom, RoomMembership, UserContact, UserId,
};
use crate::outbound::memory::{InMemoryCompanionStore, InMemoryMessageLog};
use crate::outbound::presence::InMemoryPresenceRegistry;

/// Timestamp every fixture clock starts at.
pub fn fixture_timestamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 14, 18, 30, 0)
        .single()
        .expect("valid fixture timestamp")
}

/// Clock the test moves by hand.
#[derive(Debug)]
pub struct FixtureClock {
    utc_now: Mutex<DateTime<Utc>>,
}

impl FixtureClock {
    /// Clock frozen at `at`.
    pub fn at(at: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self {
            utc_now: Mutex::new(at),
        })
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut now = self.utc_now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for FixtureClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.utc_now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// In-memory adapters plus seeding helpers.
pub struct CompanionHarness {
    pub store: InMemoryCompanionStore,
    pub log: InMemoryMessageLog,
    pub presence: InMemoryPresenceRegistry,
    pub clock: Arc<FixtureClock>,
}

impl Default for CompanionHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl CompanionHarness {
    /// Fresh adapters and a clock at [`fixture_timestamp`].
    pub fn new() -> Self {
        Self {
            store: InMemoryCompanionStore::new(),
            log: InMemoryMessageLog::new(),
            presence: InMemoryPresenceRegistry::new(),
            clock: FixtureClock::at(fixture_timestamp()),
        }
    }

    /// Port bundle over the in-memory adapters with inert push and realtime.
    pub fn ports(&self) -> CompanionPorts {
        let store = Arc::new(self.store.clone());
        CompanionPorts {
            store: store.clone(),
            enrollments: store.clone(),
            rooms: store.clone(),
            message_log: Arc::new(self.log.clone()),
            boards: store.clone(),
            users: store,
            presence: Arc::new(self.presence.clone()),
            push: Arc::new(FixturePushGateway),
            publisher: Arc::new(FixtureRealtimePublisher),
            storage: Arc::new(FixtureObjectStorage),
        }
    }

    /// Shared clock as the trait object services take.
    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    /// Register a user with an optional push token.
    pub async fn user(&self, nickname: &str, push_token: Option<&str>) -> UserId {
        let id = UserId::random();
        self.store
            .upsert_user(UserContact::new(id, nickname, push_token.map(str::to_owned)))
            .await;
        id
    }

    /// Create an open board owned by `owner_id` with `max` guest slots.
    pub async fn board(&self, owner_id: UserId, title: &str, max: u32) -> Board {
        let board = Board {
            id: BoardId::random(),
            owner_id,
            title: title.to_owned(),
            capacity: CapacityLedger::new(0, max).expect("valid counters"),
            is_completed: true,
            deleted_at: None,
        };
        self.store.upsert_board(board.clone()).await;
        board
    }

    /// Open the room of `board` with its owner as the only member.
    pub async fn room(&self, board: &Board) -> ChatRoom {
        let now = self.clock.utc();
        let room = ChatRoom::open(board.id, now);
        let mut tx = self.store.begin().await.expect("begin");
        tx.insert_room(&room).await.expect("insert room");
        tx.insert_membership(&RoomMembership::join(room.id, board.owner_id, now))
            .await
            .expect("insert owner membership");
        tx.commit().await.expect("commit");
        room
    }

    /// Seat `user_id` in `room`, consuming one board slot.
    pub async fn seat(&self, board: &Board, room: &ChatRoom, user_id: UserId) {
        let now = self.clock.utc();
        let mut tx = self.store.begin().await.expect("begin");
        let mut locked_board = tx
            .lock_board(&board.id)
            .await
            .expect("lock board")
            .expect("board exists");
        locked_board.capacity.try_occupy().expect("free slot");
        tx.save_board(&locked_board).await.expect("save board");
        let mut locked_room = tx
            .lock_room(&room.id)
            .await
            .expect("lock room")
            .expect("room exists");
        locked_room.admit();
        tx.save_room(&locked_room).await.expect("save room");
        tx.insert_membership(&RoomMembership::join(room.id, user_id, now))
            .await
            .expect("insert membership");
        tx.commit().await.expect("commit");
    }
}
