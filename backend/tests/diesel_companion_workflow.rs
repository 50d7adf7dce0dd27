//! Integration tests for the Diesel adapters against embedded PostgreSQL.
//!
//! The domain services run on the real store, repositories, directory and
//! message log, so row locks, partial unique indexes and the `bigserial`
//! message ordering are exercised end to end. Presence, push, realtime and
//! storage use their in-process doubles.
//!
//! Cluster bootstrap is synchronous and may start its own runtime, so each
//! test owns a Tokio runtime and blocks on the async calls.

use std::sync::Arc;

use companion::domain::ports::{
    CancelEnrollmentRequest, ChatMessageCommand, ChatMessageQuery, ChatRoomCommand,
    ChatRoomQuery, CompanionPorts, CreateChatRoomRequest, EnrollmentCommand, EnrollmentQuery,
    FixtureObjectStorage, FixtureRealtimePublisher, KickMemberRequest, ListEnrollmentsRequest,
    ListMessagesRequest, RequestEnrollmentRequest, RespondEnrollmentRequest, SendMessageRequest,
};
use companion::domain::{
    BoardId, ChatRoomId, DayBoundary, EnrollmentId, EnrollmentService, EnrollmentStatus,
    ErrorCode, MessageService, MessageType, RoomService, UserId,
};
use companion::outbound::persistence::{
    DbPool, DieselChatRoomRepository, DieselCompanionStore, DieselDirectory,
    DieselEnrollmentRepository, DieselMessageLog, PoolConfig,
};
use companion::outbound::presence::InMemoryPresenceRegistry;
use companion::outbound::push::DisabledPushGateway;
use mockable::DefaultClock;
use pagination::PageParams;
use pg_embedded_setup_unpriv::TemporaryDatabase;
use rstest::{fixture, rstest};
use tokio::runtime::Runtime;

mod support;

use support::{Seeder, handle_cluster_setup_failure, provision_template_database, shared_cluster};

struct Services {
    enrollments: Arc<EnrollmentService>,
    rooms: Arc<RoomService>,
    messages: Arc<MessageService>,
}

struct TestContext {
    runtime: Runtime,
    services: Services,
    seeder: Seeder,
    _database: TemporaryDatabase,
}

fn diesel_ports(pool: &DbPool) -> CompanionPorts {
    let directory = Arc::new(DieselDirectory::new(pool.clone()));
    CompanionPorts {
        store: Arc::new(DieselCompanionStore::new(pool.clone())),
        enrollments: Arc::new(DieselEnrollmentRepository::new(pool.clone())),
        rooms: Arc::new(DieselChatRoomRepository::new(pool.clone())),
        message_log: Arc::new(DieselMessageLog::new(pool.clone())),
        boards: directory.clone(),
        users: directory,
        presence: Arc::new(InMemoryPresenceRegistry::new()),
        push: Arc::new(DisabledPushGateway),
        publisher: Arc::new(FixtureRealtimePublisher),
        storage: Arc::new(FixtureObjectStorage),
    }
}

fn setup_test_context() -> Result<TestContext, String> {
    let runtime = Runtime::new().map_err(|err| err.to_string())?;
    let cluster = shared_cluster()?;
    let database = provision_template_database(cluster)?;
    let database_url = database.url().to_string();

    let config = PoolConfig::new(&database_url).with_max_connections(4);
    let pool = runtime
        .block_on(DbPool::new(config))
        .map_err(|err| err.to_string())?;

    let ports = diesel_ports(&pool);
    let clock = Arc::new(DefaultClock);
    let messages = Arc::new(MessageService::new(
        &ports,
        clock.clone(),
        DayBoundary::utc(),
    ));
    let services = Services {
        enrollments: Arc::new(EnrollmentService::new(&ports, messages.clone(), clock.clone())),
        rooms: Arc::new(RoomService::new(&ports, messages.clone(), clock)),
        messages,
    };

    Ok(TestContext {
        runtime,
        services,
        seeder: Seeder::connect(&database_url),
        _database: database,
    })
}

#[fixture]
fn context() -> Option<TestContext> {
    match setup_test_context() {
        Ok(ctx) => Some(ctx),
        Err(reason) => handle_cluster_setup_failure(reason),
    }
}

#[derive(Debug, Clone, Copy)]
enum Decision {
    Accept,
    Reject,
}

struct Seated {
    owner: UserId,
    board: BoardId,
    room: ChatRoomId,
}

impl TestContext {
    fn seat_board(&mut self, max_person: i32) -> Seated {
        let owner = self.seeder.user("host", Some("token-host"));
        let board = self.seeder.board(owner, "Jazz night", max_person);
        let owner = UserId::from_uuid(owner);
        let board = BoardId::from_uuid(board);
        let room = self
            .runtime
            .block_on(self.services.rooms.create_room_for_board(CreateChatRoomRequest {
                owner_id: owner,
                board_id: board,
            }))
            .expect("room created");
        Seated {
            owner,
            board,
            room: room.id,
        }
    }

    fn applicant(&mut self, nickname: &str) -> UserId {
        UserId::from_uuid(self.seeder.user(nickname, None))
    }

    fn request(&self, applicant: UserId, board: BoardId) -> Result<EnrollmentId, ErrorCode> {
        self.runtime
            .block_on(self.services.enrollments.request(RequestEnrollmentRequest {
                applicant_id: applicant,
                board_id: board,
                description: "count me in".to_owned(),
            }))
            .map(|response| response.enrollment_id)
            .map_err(|err| err.code())
    }

    fn accept(&self, owner: UserId, enrollment: EnrollmentId) -> Result<Option<ChatRoomId>, ErrorCode> {
        self.runtime
            .block_on(self.services.enrollments.accept(RespondEnrollmentRequest {
                owner_id: owner,
                enrollment_id: enrollment,
            }))
            .map(|response| response.chat_room_id)
            .map_err(|err| err.code())
    }

    /// Run both decisions at once on separate tasks, each on its own pooled
    /// connection. Losers report their error message.
    fn respond_concurrently(
        &self,
        owner: UserId,
        decisions: [(EnrollmentId, Decision); 2],
    ) -> Vec<Result<(), String>> {
        let handles: Vec<_> = decisions
            .into_iter()
            .map(|(enrollment_id, decision)| {
                let enrollments = Arc::clone(&self.services.enrollments);
                self.runtime.spawn(async move {
                    let request = RespondEnrollmentRequest {
                        owner_id: owner,
                        enrollment_id,
                    };
                    let outcome = match decision {
                        Decision::Accept => enrollments.accept(request).await,
                        Decision::Reject => enrollments.reject(request).await,
                    };
                    outcome
                        .map(|_| ())
                        .map_err(|err| err.message().to_owned())
                })
            })
            .collect();
        self.runtime.block_on(async {
            let mut outcomes = Vec::with_capacity(handles.len());
            for handle in handles {
                outcomes.push(handle.await.expect("respond task"));
            }
            outcomes
        })
    }
}

#[rstest]
fn accepted_applicants_join_the_room_and_chat(context: Option<TestContext>) {
    let Some(mut ctx) = context else {
        return;
    };
    let seated = ctx.seat_board(3);
    let guest = ctx.applicant("guest");

    let enrollment = ctx.request(guest, seated.board).expect("request accepted");
    let new_count = ctx
        .runtime
        .block_on(ctx.services.enrollments.count_new(seated.owner))
        .expect("count new");
    assert_eq!(new_count, 1);
    assert_eq!(ctx.seeder.notifications_for(*seated.owner.as_uuid()), 1);

    let joined = ctx.accept(seated.owner, enrollment).expect("accepted");
    assert_eq!(joined, Some(seated.room));
    assert_eq!(ctx.seeder.current_person(*seated.board.as_uuid()), 1);
    assert_eq!(ctx.seeder.participant_count(*seated.room.as_uuid()), 2);

    ctx.runtime
        .block_on(ctx.services.messages.send(SendMessageRequest {
            chat_room_id: seated.room,
            sender_id: guest,
            content: "see you at 8".to_owned(),
        }))
        .expect("message sent");
    let unread = ctx
        .runtime
        .block_on(ctx.services.messages.unread_count(seated.owner, seated.room))
        .expect("unread count");
    assert_eq!(unread, 1);

    let page = ctx
        .runtime
        .block_on(ctx.services.messages.list(ListMessagesRequest {
            user_id: seated.owner,
            chat_room_id: seated.room,
            page: PageParams::default(),
        }))
        .expect("history");
    let types: Vec<MessageType> = page.data.iter().map(|message| message.message_type).collect();
    assert!(types.contains(&MessageType::Enter));
    assert!(types.contains(&MessageType::Talk));
    let newest = page.data.first().expect("newest message");
    assert_eq!(newest.content, "see you at 8");

    let unread = ctx
        .runtime
        .block_on(ctx.services.messages.unread_count(seated.owner, seated.room))
        .expect("unread count");
    assert_eq!(unread, 0, "listing history marks the room read");

    let overview = ctx
        .runtime
        .block_on(ctx.services.rooms.get_room(guest, seated.room))
        .expect("guest sees the room");
    assert!(!overview.is_owner);
    assert_eq!(overview.board_title, "Jazz night");
}

#[rstest]
fn duplicate_requests_conflict_until_cancelled(context: Option<TestContext>) {
    let Some(mut ctx) = context else {
        return;
    };
    let seated = ctx.seat_board(3);
    let guest = ctx.applicant("guest");

    let first = ctx.request(guest, seated.board).expect("first request");
    assert_eq!(ctx.request(guest, seated.board), Err(ErrorCode::Conflict));

    ctx.runtime
        .block_on(ctx.services.enrollments.cancel(CancelEnrollmentRequest {
            applicant_id: guest,
            enrollment_id: first,
        }))
        .expect("cancelled");
    assert_eq!(ctx.seeder.notifications_for(*seated.owner.as_uuid()), 0);

    let second = ctx.request(guest, seated.board).expect("request after cancel");
    assert_ne!(first, second);

    let sent = ctx
        .runtime
        .block_on(ctx.services.enrollments.list_sent(ListEnrollmentsRequest {
            user_id: guest,
            page: PageParams::default(),
        }))
        .expect("sent listing");
    assert_eq!(sent.data.len(), 1);
    assert_eq!(sent.data[0].id, second);
    assert_eq!(sent.data[0].status, EnrollmentStatus::Pending);
}

#[rstest]
fn full_boards_reject_further_acceptances(context: Option<TestContext>) {
    let Some(mut ctx) = context else {
        return;
    };
    let seated = ctx.seat_board(1);
    let first = ctx.applicant("first");
    let second = ctx.applicant("second");
    let first_enrollment = ctx.request(first, seated.board).expect("first request");
    let second_enrollment = ctx.request(second, seated.board).expect("second request");

    ctx.accept(seated.owner, first_enrollment).expect("first accepted");
    assert_eq!(
        ctx.accept(seated.owner, second_enrollment),
        Err(ErrorCode::Conflict)
    );
    assert_eq!(ctx.seeder.current_person(*seated.board.as_uuid()), 1);
    assert_eq!(ctx.seeder.participant_count(*seated.room.as_uuid()), 2);
}

#[rstest]
fn racing_accepts_fill_the_last_slot_once(context: Option<TestContext>) {
    let Some(mut ctx) = context else {
        return;
    };
    for _ in 0..3 {
        let seated = ctx.seat_board(1);
        let first = ctx.applicant("first");
        let second = ctx.applicant("second");
        let first_enrollment = ctx.request(first, seated.board).expect("first request");
        let second_enrollment = ctx.request(second, seated.board).expect("second request");

        let outcomes = ctx.respond_concurrently(
            seated.owner,
            [
                (first_enrollment, Decision::Accept),
                (second_enrollment, Decision::Accept),
            ],
        );

        let winners = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
        assert_eq!(winners, 1, "exactly one accept wins: {outcomes:?}");
        let loser = outcomes
            .iter()
            .find_map(|outcome| outcome.as_ref().err())
            .expect("one accept loses");
        assert!(
            loser.contains("board is full") || loser.contains("already responded"),
            "unexpected loser: {loser}"
        );
        assert_eq!(ctx.seeder.current_person(*seated.board.as_uuid()), 1);
        assert_eq!(ctx.seeder.participant_count(*seated.room.as_uuid()), 2);
    }
}

#[rstest]
fn accept_and_reject_of_one_enrollment_are_exclusive(context: Option<TestContext>) {
    let Some(mut ctx) = context else {
        return;
    };
    let seated = ctx.seat_board(2);
    let guest = ctx.applicant("guest");
    let enrollment = ctx.request(guest, seated.board).expect("request");

    let outcomes = ctx.respond_concurrently(
        seated.owner,
        [(enrollment, Decision::Accept), (enrollment, Decision::Reject)],
    );

    let winners = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    assert_eq!(winners, 1, "exactly one decision wins: {outcomes:?}");
    let loser = outcomes
        .iter()
        .find_map(|outcome| outcome.as_ref().err())
        .expect("one decision loses");
    assert!(loser.contains("already responded"), "unexpected loser: {loser}");

    let accepted = outcomes.first().is_some_and(Result::is_ok);
    let seats = i32::from(accepted);
    assert_eq!(ctx.seeder.current_person(*seated.board.as_uuid()), seats);
    assert_eq!(ctx.seeder.participant_count(*seated.room.as_uuid()), 1 + seats);
}

#[rstest]
fn kicked_members_free_their_seat(context: Option<TestContext>) {
    let Some(mut ctx) = context else {
        return;
    };
    let seated = ctx.seat_board(1);
    let guest = ctx.applicant("guest");
    let enrollment = ctx.request(guest, seated.board).expect("request");
    ctx.accept(seated.owner, enrollment).expect("accepted");

    ctx.runtime
        .block_on(ctx.services.rooms.kick(KickMemberRequest {
            owner_id: seated.owner,
            chat_room_id: seated.room,
            target_user_id: guest,
        }))
        .expect("kicked");

    assert_eq!(ctx.seeder.current_person(*seated.board.as_uuid()), 0);
    assert_eq!(ctx.seeder.participant_count(*seated.room.as_uuid()), 1);
    let error = ctx
        .runtime
        .block_on(ctx.services.rooms.get_room(guest, seated.room))
        .expect_err("kicked member loses access");
    assert_eq!(error.code(), ErrorCode::Forbidden);
}

#[rstest]
fn message_history_pages_backwards_and_can_be_purged(context: Option<TestContext>) {
    let Some(mut ctx) = context else {
        return;
    };
    let seated = ctx.seat_board(3);
    for index in 0..5 {
        ctx.runtime
            .block_on(ctx.services.messages.send(SendMessageRequest {
                chat_room_id: seated.room,
                sender_id: seated.owner,
                content: format!("message {index}"),
            }))
            .expect("message sent");
    }

    let first_page = ctx
        .runtime
        .block_on(ctx.services.messages.list(ListMessagesRequest {
            user_id: seated.owner,
            chat_room_id: seated.room,
            page: PageParams::new(None, Some(2)),
        }))
        .expect("first page");
    let contents: Vec<&str> = first_page
        .data
        .iter()
        .map(|message| message.content.as_str())
        .collect();
    assert_eq!(contents, ["message 4", "message 3"]);
    let cursor = first_page.next_cursor.clone().expect("more history");

    let second_page = ctx
        .runtime
        .block_on(ctx.services.messages.list(ListMessagesRequest {
            user_id: seated.owner,
            chat_room_id: seated.room,
            page: PageParams::new(Some(cursor), Some(2)),
        }))
        .expect("second page");
    assert_eq!(second_page.data[0].content, "message 2");
    assert!(second_page.data[0].seq < first_page.data[1].seq);

    let deleted = ctx
        .runtime
        .block_on(ctx.services.messages.delete_all_messages(seated.room))
        .expect("purged");
    assert!(deleted >= 5, "five talks plus the day divider");
    let emptied = ctx
        .runtime
        .block_on(ctx.services.messages.list(ListMessagesRequest {
            user_id: seated.owner,
            chat_room_id: seated.room,
            page: PageParams::default(),
        }))
        .expect("empty history");
    assert!(emptied.data.is_empty());
}
