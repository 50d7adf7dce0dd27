//! Presence-aware push notification dispatch.
//!
//! Chat messages go to every other member who has notifications enabled and
//! no live connection to the room, in one multicast. Enrollment events go to
//! a single recipient regardless of presence. Delivery is best effort: every
//! failure is logged here and never reaches the caller.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::ports::{
    ChatRoomRepository, CompanionPorts, PresenceRegistry, PushGateway, UserDirectory,
};
use crate::domain::{Message, PushMessage, PushPayload, RoomMembership, UserId};

/// Decides who gets a push notification and hands it to the gateway.
#[derive(Clone)]
pub struct NotificationFanout {
    rooms: Arc<dyn ChatRoomRepository>,
    users: Arc<dyn UserDirectory>,
    presence: Arc<dyn PresenceRegistry>,
    gateway: Arc<dyn PushGateway>,
}

impl NotificationFanout {
    /// Build the fanout from the shared port bundle.
    pub fn new(ports: &CompanionPorts) -> Self {
        Self {
            rooms: Arc::clone(&ports.rooms),
            users: Arc::clone(&ports.users),
            presence: Arc::clone(&ports.presence),
            gateway: Arc::clone(&ports.push),
        }
    }

    /// Push a chat message to offline members of its room.
    ///
    /// `room_title` becomes the notification headline. Messages without a
    /// sender (date dividers) are never pushed.
    pub async fn dispatch_chat_message(&self, room_title: &str, message: &Message) {
        let Some(sender_id) = message.sender_id else {
            return;
        };
        let room_id = message.chat_room_id;

        let memberships = match self.rooms.list_memberships(&room_id).await {
            Ok(memberships) => memberships,
            Err(error) => {
                warn!(%room_id, error = %error, "push fanout skipped: memberships unavailable");
                return;
            }
        };

        let recipients = self.offline_recipients(&memberships, &sender_id).await;
        if recipients.is_empty() {
            debug!(%room_id, "push fanout skipped: no offline recipients");
            return;
        }

        let mut lookup: Vec<UserId> = recipients.iter().copied().collect();
        lookup.push(sender_id);
        let contacts = match self.users.find_users(&lookup).await {
            Ok(contacts) => contacts,
            Err(error) => {
                warn!(%room_id, error = %error, "push fanout skipped: contacts unavailable");
                return;
            }
        };

        let sender_name = contacts
            .iter()
            .find(|contact| contact.id == sender_id)
            .map_or("Someone", |contact| contact.nickname.as_str());
        let tokens: Vec<String> = contacts
            .iter()
            .filter(|contact| recipients.contains(&contact.id))
            .filter_map(|contact| contact.usable_push_token().map(str::to_owned))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if tokens.is_empty() {
            debug!(%room_id, "push fanout skipped: no usable tokens");
            return;
        }

        let push = PushMessage::new(
            room_title,
            format!("{sender_name}: {}", message.content),
            PushPayload::ChatMessageEvent {
                chat_room_id: room_id,
                message_id: message.id,
                sender_id,
                message_type: message.message_type,
            },
        );

        match self.gateway.send_multicast(&tokens, &push).await {
            Ok(report) => {
                let mut failed = 0_usize;
                for delivery in report.failures() {
                    failed += 1;
                    if let Err(error) = &delivery.outcome {
                        debug!(%room_id, error = %error, "push delivery failed for token");
                    }
                }
                if failed > 0 {
                    warn!(
                        %room_id,
                        failed,
                        delivered = report.success_count(),
                        "chat push partially failed"
                    );
                }
            }
            Err(error) => warn!(%room_id, error = %error, "chat push failed"),
        }
    }

    /// Push an enrollment event to one user.
    pub async fn dispatch_enrollment_event(&self, recipient_id: &UserId, push: &PushMessage) {
        let contact = match self.users.find_user(recipient_id).await {
            Ok(Some(contact)) => contact,
            Ok(None) => {
                debug!(user_id = %recipient_id, "enrollment push skipped: unknown user");
                return;
            }
            Err(error) => {
                warn!(user_id = %recipient_id, error = %error, "enrollment push skipped");
                return;
            }
        };
        let Some(token) = contact.usable_push_token() else {
            debug!(user_id = %recipient_id, "enrollment push skipped: no push token");
            return;
        };

        if let Err(error) = self.gateway.send_single(token, push).await {
            warn!(user_id = %recipient_id, error = %error, "enrollment push failed");
        }
    }

    async fn offline_recipients(
        &self,
        memberships: &[RoomMembership],
        sender_id: &UserId,
    ) -> BTreeSet<UserId> {
        let mut recipients = BTreeSet::new();
        for membership in memberships {
            if membership.user_id == *sender_id || !membership.notifications_enabled {
                continue;
            }
            let present = self
                .presence
                .is_present(&membership.chat_room_id, &membership.user_id)
                .await
                .unwrap_or_else(|error| {
                    warn!(
                        user_id = %membership.user_id,
                        error = %error,
                        "presence lookup failed; treating user as offline"
                    );
                    false
                });
            if !present {
                recipients.insert(membership.user_id);
            }
        }
        recipients
    }
}

#[cfg(test)]
#[path = "notification_fanout_tests.rs"]
mod tests;
