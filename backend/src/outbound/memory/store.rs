//! Mutex-guarded relational state behind the store and read ports.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::ports::{
    BoardDirectory, ChatRoomRepository, ChatRoomRepositoryError, CompanionStore,
    CompanionStoreError, DirectoryError, EnrollmentKey, EnrollmentRepository,
    EnrollmentRepositoryError, MemberRoom, StoreTransaction, UserDirectory,
};
use crate::domain::{
    Board, BoardId, ChatRoom, ChatRoomId, Enrollment, EnrollmentId, MembershipId, Notification,
    NotificationId, RoomMembership, UserContact, UserId,
};

#[derive(Debug, Clone, Default)]
struct CompanionData {
    users: HashMap<UserId, UserContact>,
    boards: HashMap<BoardId, Board>,
    enrollments: HashMap<EnrollmentId, Enrollment>,
    rooms: HashMap<ChatRoomId, ChatRoom>,
    memberships: HashMap<MembershipId, RoomMembership>,
    notifications: HashMap<NotificationId, Notification>,
}

impl CompanionData {
    fn active_board(&self, id: &BoardId) -> Option<&Board> {
        self.boards.get(id).filter(|board| board.is_active())
    }

    fn active_room(&self, id: &ChatRoomId) -> Option<&ChatRoom> {
        self.rooms.get(id).filter(|room| room.is_active())
    }

    fn active_membership(&self, room_id: &ChatRoomId, user_id: &UserId) -> Option<&RoomMembership> {
        self.memberships.values().find(|membership| {
            membership.is_active()
                && membership.chat_room_id == *room_id
                && membership.user_id == *user_id
        })
    }

    fn member_room(&self, membership: &RoomMembership) -> Option<MemberRoom> {
        let room = self.active_room(&membership.chat_room_id)?;
        let board = self.boards.get(&room.board_id)?;
        Some(MemberRoom {
            room: room.clone(),
            membership: membership.clone(),
            board_title: board.title.clone(),
            board_owner_id: board.owner_id,
        })
    }

    fn page<F>(&self, filter: F, after: Option<EnrollmentKey>, limit: usize) -> Vec<Enrollment>
    where
        F: Fn(&Enrollment) -> bool,
    {
        let mut rows: Vec<Enrollment> = self
            .enrollments
            .values()
            .filter(|enrollment| enrollment.is_active() && filter(enrollment))
            .filter(|enrollment| {
                after.is_none_or(|key| (enrollment.created_at, enrollment.id) < (key.created_at, key.id))
            })
            .cloned()
            .collect();
        rows.sort_by_key(|enrollment| Reverse((enrollment.created_at, enrollment.id)));
        rows.truncate(limit);
        rows
    }

    fn owns_active_board(&self, board_id: &BoardId, owner_id: &UserId) -> bool {
        self.active_board(board_id)
            .is_some_and(|board| board.is_owned_by(owner_id))
    }
}

/// In-process implementation of the relational ports.
///
/// Cloning shares the underlying state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCompanionStore {
    data: Arc<Mutex<CompanionData>>,
}

impl InMemoryCompanionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a user contact.
    pub async fn upsert_user(&self, user: UserContact) {
        self.data.lock().await.users.insert(user.id, user);
    }

    /// Insert or replace a board.
    pub async fn upsert_board(&self, board: Board) {
        self.data.lock().await.boards.insert(board.id, board);
    }

    /// Board by id, including soft-deleted ones.
    pub async fn board(&self, id: &BoardId) -> Option<Board> {
        self.data.lock().await.boards.get(id).cloned()
    }

    /// Enrollment by id, including retired ones.
    pub async fn enrollment(&self, id: &EnrollmentId) -> Option<Enrollment> {
        self.data.lock().await.enrollments.get(id).cloned()
    }

    /// Active enrollments on a board.
    pub async fn active_enrollments(&self, board_id: &BoardId) -> Vec<Enrollment> {
        self.data
            .lock()
            .await
            .enrollments
            .values()
            .filter(|enrollment| enrollment.is_active() && enrollment.board_id == *board_id)
            .cloned()
            .collect()
    }

    /// Room by id, including soft-deleted ones.
    pub async fn room(&self, id: &ChatRoomId) -> Option<ChatRoom> {
        self.data.lock().await.rooms.get(id).cloned()
    }

    /// Active memberships of a room.
    pub async fn active_memberships(&self, room_id: &ChatRoomId) -> Vec<RoomMembership> {
        self.data
            .lock()
            .await
            .memberships
            .values()
            .filter(|membership| membership.is_active() && membership.chat_room_id == *room_id)
            .cloned()
            .collect()
    }

    /// Every notification addressed to a user, oldest first.
    pub async fn notifications_for(&self, user_id: &UserId) -> Vec<Notification> {
        let mut rows: Vec<Notification> = self
            .data
            .lock()
            .await
            .notifications
            .values()
            .filter(|notification| notification.recipient_id == *user_id)
            .cloned()
            .collect();
        rows.sort_by_key(|notification| notification.created_at);
        rows
    }

    /// The notification that announced an enrollment, including deleted ones.
    pub async fn notification_for_enrollment(&self, id: &EnrollmentId) -> Option<Notification> {
        self.data
            .lock()
            .await
            .notifications
            .values()
            .find(|notification| notification.enrollment_id == Some(*id))
            .cloned()
    }
}

#[async_trait]
impl CompanionStore for InMemoryCompanionStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, CompanionStoreError> {
        let data = Arc::clone(&self.data).lock_owned().await;
        Ok(Box::new(InMemoryTransaction {
            data,
            undo: Vec::new(),
        }))
    }
}

/// Prior value of one row written inside a transaction; `None` means the
/// row did not exist.
enum Undo {
    Board(BoardId, Option<Board>),
    Enrollment(EnrollmentId, Option<Enrollment>),
    Room(ChatRoomId, Option<ChatRoom>),
    Membership(MembershipId, Option<RoomMembership>),
    Notification(NotificationId, Option<Notification>),
}

fn restore<K: Eq + Hash, V>(rows: &mut HashMap<K, V>, key: K, previous: Option<V>) {
    match previous {
        Some(row) => {
            rows.insert(key, row);
        }
        None => {
            rows.remove(&key);
        }
    }
}

impl Undo {
    fn apply(self, data: &mut CompanionData) {
        match self {
            Self::Board(id, row) => restore(&mut data.boards, id, row),
            Self::Enrollment(id, row) => restore(&mut data.enrollments, id, row),
            Self::Room(id, row) => restore(&mut data.rooms, id, row),
            Self::Membership(id, row) => restore(&mut data.memberships, id, row),
            Self::Notification(id, row) => restore(&mut data.notifications, id, row),
        }
    }
}

/// Writes land in the shared state under the lock; the undo log restores
/// the touched rows unless the transaction commits.
struct InMemoryTransaction {
    data: OwnedMutexGuard<CompanionData>,
    undo: Vec<Undo>,
}

impl InMemoryTransaction {
    fn put_board(&mut self, board: &Board) {
        let previous = self.data.boards.insert(board.id, board.clone());
        self.undo.push(Undo::Board(board.id, previous));
    }

    fn put_enrollment(&mut self, enrollment: &Enrollment) {
        let previous = self
            .data
            .enrollments
            .insert(enrollment.id, enrollment.clone());
        self.undo.push(Undo::Enrollment(enrollment.id, previous));
    }

    fn put_room(&mut self, room: &ChatRoom) {
        let previous = self.data.rooms.insert(room.id, room.clone());
        self.undo.push(Undo::Room(room.id, previous));
    }

    fn put_membership(&mut self, membership: &RoomMembership) {
        let previous = self
            .data
            .memberships
            .insert(membership.id, membership.clone());
        self.undo.push(Undo::Membership(membership.id, previous));
    }

    fn put_notification(&mut self, notification: &Notification) {
        let previous = self
            .data
            .notifications
            .insert(notification.id, notification.clone());
        self.undo.push(Undo::Notification(notification.id, previous));
    }
}

impl Drop for InMemoryTransaction {
    fn drop(&mut self) {
        while let Some(undo) = self.undo.pop() {
            undo.apply(&mut self.data);
        }
    }
}

#[async_trait]
impl StoreTransaction for InMemoryTransaction {
    async fn find_board(&mut self, id: &BoardId) -> Result<Option<Board>, CompanionStoreError> {
        Ok(self.data.active_board(id).cloned())
    }

    async fn lock_board(&mut self, id: &BoardId) -> Result<Option<Board>, CompanionStoreError> {
        Ok(self.data.active_board(id).cloned())
    }

    async fn save_board(&mut self, board: &Board) -> Result<(), CompanionStoreError> {
        self.put_board(board);
        Ok(())
    }

    async fn lock_enrollment(
        &mut self,
        id: &EnrollmentId,
    ) -> Result<Option<Enrollment>, CompanionStoreError> {
        Ok(self.data.enrollments.get(id).cloned())
    }

    async fn find_active_enrollment(
        &mut self,
        board_id: &BoardId,
        applicant_id: &UserId,
    ) -> Result<Option<Enrollment>, CompanionStoreError> {
        Ok(self
            .data
            .enrollments
            .values()
            .find(|enrollment| {
                enrollment.is_active()
                    && enrollment.board_id == *board_id
                    && enrollment.applicant_id == *applicant_id
            })
            .cloned())
    }

    async fn insert_enrollment(
        &mut self,
        enrollment: &Enrollment,
    ) -> Result<(), CompanionStoreError> {
        let duplicate = self.data.enrollments.values().any(|existing| {
            existing.is_active()
                && existing.board_id == enrollment.board_id
                && existing.applicant_id == enrollment.applicant_id
        });
        if duplicate {
            return Err(CompanionStoreError::conflict(
                "an active enrollment already exists for this board",
            ));
        }
        self.put_enrollment(enrollment);
        Ok(())
    }

    async fn save_enrollment(
        &mut self,
        enrollment: &Enrollment,
    ) -> Result<(), CompanionStoreError> {
        self.put_enrollment(enrollment);
        Ok(())
    }

    async fn soft_delete_enrollments(
        &mut self,
        board_id: &BoardId,
        applicant_id: Option<&UserId>,
        at: DateTime<Utc>,
    ) -> Result<u64, CompanionStoreError> {
        let withdrawn: Vec<Enrollment> = self
            .data
            .enrollments
            .values()
            .filter(|enrollment| {
                enrollment.is_active()
                    && enrollment.board_id == *board_id
                    && applicant_id.is_none_or(|applicant| enrollment.applicant_id == *applicant)
            })
            .cloned()
            .collect();
        let affected = withdrawn.len() as u64;
        for mut enrollment in withdrawn {
            enrollment.withdraw(at);
            self.put_enrollment(&enrollment);
        }
        Ok(affected)
    }

    async fn find_room_for_board(
        &mut self,
        board_id: &BoardId,
    ) -> Result<Option<ChatRoom>, CompanionStoreError> {
        Ok(self
            .data
            .rooms
            .values()
            .find(|room| room.is_active() && room.board_id == *board_id)
            .cloned())
    }

    async fn find_room(
        &mut self,
        id: &ChatRoomId,
    ) -> Result<Option<ChatRoom>, CompanionStoreError> {
        Ok(self.data.active_room(id).cloned())
    }

    async fn lock_room(
        &mut self,
        id: &ChatRoomId,
    ) -> Result<Option<ChatRoom>, CompanionStoreError> {
        Ok(self.data.active_room(id).cloned())
    }

    async fn insert_room(&mut self, room: &ChatRoom) -> Result<(), CompanionStoreError> {
        let duplicate = self
            .data
            .rooms
            .values()
            .any(|existing| existing.is_active() && existing.board_id == room.board_id);
        if duplicate {
            return Err(CompanionStoreError::conflict(
                "a chat room already exists for this board",
            ));
        }
        self.put_room(room);
        Ok(())
    }

    async fn save_room(&mut self, room: &ChatRoom) -> Result<(), CompanionStoreError> {
        self.put_room(room);
        Ok(())
    }

    async fn find_membership(
        &mut self,
        room_id: &ChatRoomId,
        user_id: &UserId,
    ) -> Result<Option<RoomMembership>, CompanionStoreError> {
        Ok(self.data.active_membership(room_id, user_id).cloned())
    }

    async fn insert_membership(
        &mut self,
        membership: &RoomMembership,
    ) -> Result<(), CompanionStoreError> {
        if self
            .data
            .active_membership(&membership.chat_room_id, &membership.user_id)
            .is_some()
        {
            return Err(CompanionStoreError::conflict(
                "user already participates in this chat room",
            ));
        }
        self.put_membership(membership);
        Ok(())
    }

    async fn save_membership(
        &mut self,
        membership: &RoomMembership,
    ) -> Result<(), CompanionStoreError> {
        self.put_membership(membership);
        Ok(())
    }

    async fn soft_delete_memberships(
        &mut self,
        room_id: &ChatRoomId,
        at: DateTime<Utc>,
    ) -> Result<u64, CompanionStoreError> {
        let removed: Vec<RoomMembership> = self
            .data
            .memberships
            .values()
            .filter(|membership| membership.is_active() && membership.chat_room_id == *room_id)
            .cloned()
            .collect();
        let affected = removed.len() as u64;
        for mut membership in removed {
            membership.soft_delete(at);
            self.put_membership(&membership);
        }
        Ok(affected)
    }

    async fn find_notification_for_enrollment(
        &mut self,
        enrollment_id: &EnrollmentId,
    ) -> Result<Option<Notification>, CompanionStoreError> {
        Ok(self
            .data
            .notifications
            .values()
            .find(|notification| {
                notification.deleted_at.is_none()
                    && notification.enrollment_id == Some(*enrollment_id)
            })
            .cloned())
    }

    async fn insert_notification(
        &mut self,
        notification: &Notification,
    ) -> Result<(), CompanionStoreError> {
        self.put_notification(notification);
        Ok(())
    }

    async fn save_notification(
        &mut self,
        notification: &Notification,
    ) -> Result<(), CompanionStoreError> {
        self.put_notification(notification);
        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> Result<(), CompanionStoreError> {
        self.undo.clear();
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), CompanionStoreError> {
        Ok(())
    }
}

#[async_trait]
impl EnrollmentRepository for InMemoryCompanionStore {
    async fn list_sent(
        &self,
        applicant_id: &UserId,
        after: Option<EnrollmentKey>,
        limit: usize,
    ) -> Result<Vec<Enrollment>, EnrollmentRepositoryError> {
        let data = self.data.lock().await;
        Ok(data.page(|enrollment| enrollment.applicant_id == *applicant_id, after, limit))
    }

    async fn list_received_for_owner(
        &self,
        owner_id: &UserId,
        after: Option<EnrollmentKey>,
        limit: usize,
    ) -> Result<Vec<Enrollment>, EnrollmentRepositoryError> {
        let data = self.data.lock().await;
        Ok(data.page(
            |enrollment| data.owns_active_board(&enrollment.board_id, owner_id),
            after,
            limit,
        ))
    }

    async fn list_received_for_board(
        &self,
        board_id: &BoardId,
        after: Option<EnrollmentKey>,
        limit: usize,
    ) -> Result<Vec<Enrollment>, EnrollmentRepositoryError> {
        let data = self.data.lock().await;
        Ok(data.page(|enrollment| enrollment.board_id == *board_id, after, limit))
    }

    async fn mark_seen(&self, ids: &[EnrollmentId]) -> Result<(), EnrollmentRepositoryError> {
        let mut data = self.data.lock().await;
        for id in ids {
            if let Some(enrollment) = data.enrollments.get_mut(id) {
                enrollment.is_new = false;
            }
        }
        Ok(())
    }

    async fn count_new(&self, owner_id: &UserId) -> Result<u64, EnrollmentRepositoryError> {
        let data = self.data.lock().await;
        let count = data
            .enrollments
            .values()
            .filter(|enrollment| {
                enrollment.is_active()
                    && enrollment.is_new
                    && data.owns_active_board(&enrollment.board_id, owner_id)
            })
            .count();
        Ok(count as u64)
    }
}

#[async_trait]
impl ChatRoomRepository for InMemoryCompanionStore {
    async fn find_member_room(
        &self,
        room_id: &ChatRoomId,
        user_id: &UserId,
    ) -> Result<Option<MemberRoom>, ChatRoomRepositoryError> {
        let data = self.data.lock().await;
        Ok(data
            .active_membership(room_id, user_id)
            .and_then(|membership| data.member_room(membership)))
    }

    async fn list_member_rooms(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<MemberRoom>, ChatRoomRepositoryError> {
        let data = self.data.lock().await;
        let mut rooms: Vec<MemberRoom> = data
            .memberships
            .values()
            .filter(|membership| membership.is_active() && membership.user_id == *user_id)
            .filter_map(|membership| data.member_room(membership))
            .collect();
        rooms.sort_by_key(|entry| {
            Reverse((
                entry.room.last_message_at.unwrap_or(entry.room.created_at),
                entry.room.id,
            ))
        });
        Ok(rooms)
    }

    async fn list_memberships(
        &self,
        room_id: &ChatRoomId,
    ) -> Result<Vec<RoomMembership>, ChatRoomRepositoryError> {
        Ok(self.active_memberships(room_id).await)
    }

    async fn touch_last_message(
        &self,
        room_id: &ChatRoomId,
        sent_at: DateTime<Utc>,
        content: &str,
    ) -> Result<(), ChatRoomRepositoryError> {
        let mut data = self.data.lock().await;
        let newer = |room: &&mut ChatRoom| room.last_message_at.is_none_or(|latest| latest <= sent_at);
        if let Some(room) = data.rooms.get_mut(room_id).filter(newer) {
            room.last_message_at = Some(sent_at);
            room.last_message_content = Some(content.to_owned());
        }
        Ok(())
    }

    async fn mark_read(
        &self,
        room_id: &ChatRoomId,
        user_id: &UserId,
        at: DateTime<Utc>,
    ) -> Result<bool, ChatRoomRepositoryError> {
        let mut data = self.data.lock().await;
        let membership = data.memberships.values_mut().find(|membership| {
            membership.is_active()
                && membership.chat_room_id == *room_id
                && membership.user_id == *user_id
        });
        Ok(membership.is_some_and(|membership| {
            membership.last_read_at = at;
            true
        }))
    }

    async fn set_notifications(
        &self,
        room_id: &ChatRoomId,
        user_id: &UserId,
        enabled: bool,
    ) -> Result<bool, ChatRoomRepositoryError> {
        let mut data = self.data.lock().await;
        let membership = data.memberships.values_mut().find(|membership| {
            membership.is_active()
                && membership.chat_room_id == *room_id
                && membership.user_id == *user_id
        });
        Ok(membership.is_some_and(|membership| {
            membership.notifications_enabled = enabled;
            true
        }))
    }

    async fn set_image(
        &self,
        room_id: &ChatRoomId,
        image_url: &str,
    ) -> Result<(), ChatRoomRepositoryError> {
        let mut data = self.data.lock().await;
        if let Some(room) = data.rooms.get_mut(room_id) {
            room.image_url = Some(image_url.to_owned());
        }
        Ok(())
    }
}

#[async_trait]
impl BoardDirectory for InMemoryCompanionStore {
    async fn find_board(&self, id: &BoardId) -> Result<Option<Board>, DirectoryError> {
        Ok(self.data.lock().await.active_board(id).cloned())
    }
}

#[async_trait]
impl UserDirectory for InMemoryCompanionStore {
    async fn find_user(&self, id: &UserId) -> Result<Option<UserContact>, DirectoryError> {
        Ok(self.data.lock().await.users.get(id).cloned())
    }

    async fn find_users(&self, ids: &[UserId]) -> Result<Vec<UserContact>, DirectoryError> {
        let data = self.data.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| data.users.get(id).cloned())
            .collect())
    }
}
