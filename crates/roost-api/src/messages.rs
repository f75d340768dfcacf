use std::collections::{BTreeSet, HashMap};

use axum::extract::State;
use chrono::Utc;
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use roost_db::models::MessageRow;
use roost_db::timestamp;
use roost_types::api::SendMessageRequest;
use roost_types::models::{Conversation, Message};

use crate::convert::{self, parse_id, stored_id, stored_time};
use crate::error::ApiError;
use crate::extract::{Json, Path, Query};
use crate::state::{AppState, blocking};

#[derive(Debug, Deserialize)]
pub struct SenderQuery {
    pub sender_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ViewerQuery {
    pub user_id: String,
}

pub async fn send_message(
    State(state): State<AppState>,
    Query(sender): Query<SenderQuery>,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<Message>, ApiError> {
    let sender_id = parse_id(&sender.sender_id, "User not found")?;
    let receiver_id = parse_id(&req.receiver_id, "User not found")?;
    let listing_id = parse_id(&req.listing_id, "Listing not found")?;

    let content = req.content.trim().to_string();
    if content.is_empty() {
        return Err(ApiError::Validation("Message content is required"));
    }
    if sender_id == receiver_id {
        return Err(ApiError::Validation("You cannot message yourself"));
    }

    let row = MessageRow {
        id: Uuid::new_v4().to_string(),
        sender_id: sender_id.to_string(),
        receiver_id: receiver_id.to_string(),
        listing_id: listing_id.to_string(),
        content,
        read: false,
        created_at: timestamp(&Utc::now()),
    };

    let row = blocking(&state, move |db| {
        if !db.user_exists(&row.sender_id)? || !db.user_exists(&row.receiver_id)? {
            return Err(ApiError::NotFound("User not found"));
        }
        if db.get_listing(&row.listing_id)?.is_none() {
            return Err(ApiError::NotFound("Listing not found"));
        }
        db.insert_message(&row)?;
        Ok(row)
    })
    .await?;

    debug!("Message {} sent on listing {}", row.id, row.listing_id);
    Ok(Json(convert::message(row)))
}

/// One row per (listing, counterpart), most recent activity first.
pub async fn get_conversations(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Conversation>>, ApiError> {
    let user_id = parse_id(&user_id, "User not found")?.to_string();

    let conversations = blocking(&state, move |db| {
        let messages = db.get_messages_involving(&user_id)?;
        let groups = group_conversations(&user_id, &messages);

        let listing_ids: Vec<String> = groups
            .iter()
            .map(|g| g.listing_id.to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let user_ids: Vec<String> = groups
            .iter()
            .map(|g| g.other_user_id.to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let titles = db.get_listing_titles(&listing_ids)?;
        let names = db.get_user_names(&user_ids)?;

        Ok(groups
            .into_iter()
            .map(|g| conversation(g, &titles, &names))
            .collect::<Vec<_>>())
    })
    .await?;

    Ok(Json(conversations))
}

/// Both directions of a conversation, oldest first. Messages addressed to
/// the viewer are marked read before the thread is returned.
pub async fn get_thread(
    State(state): State<AppState>,
    Path((listing_id, other_user_id)): Path<(String, String)>,
    Query(viewer): Query<ViewerQuery>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let listing_id = parse_id(&listing_id, "Listing not found")?.to_string();
    let other_user_id = parse_id(&other_user_id, "User not found")?.to_string();
    let user_id = parse_id(&viewer.user_id, "User not found")?.to_string();

    let rows = blocking(&state, move |db| {
        let marked = db.mark_thread_read(&listing_id, &user_id, &other_user_id)?;
        if marked > 0 {
            debug!("Marked {} messages read for {}", marked, user_id);
        }
        Ok(db.get_thread(&listing_id, &user_id, &other_user_id)?)
    })
    .await?;

    Ok(Json(rows.into_iter().map(convert::message).collect()))
}

/// A conversation before its listing title and counterpart name are known.
#[derive(Debug)]
pub struct ConversationGroup<'a> {
    pub listing_id: &'a str,
    pub other_user_id: &'a str,
    pub last: &'a MessageRow,
    pub unread_count: usize,
}

/// Groups a user's messages by (listing, counterpart). The latest message
/// wins by timestamp; among equal timestamps the first one in `messages`
/// is kept. Groups come back ordered by their latest message, newest first.
pub fn group_conversations<'a>(user_id: &str, messages: &'a [MessageRow]) -> Vec<ConversationGroup<'a>> {
    let mut groups: Vec<ConversationGroup<'a>> = Vec::new();
    let mut index: HashMap<(&'a str, &'a str), usize> = HashMap::new();

    for message in messages {
        let other = if message.sender_id == user_id {
            message.receiver_id.as_str()
        } else {
            message.sender_id.as_str()
        };
        let unread = message.receiver_id == user_id && !message.read;
        let key = (message.listing_id.as_str(), other);

        match index.get(&key) {
            Some(&i) => {
                let group = &mut groups[i];
                if message.created_at > group.last.created_at {
                    group.last = message;
                }
                if unread {
                    group.unread_count += 1;
                }
            }
            None => {
                index.insert(key, groups.len());
                groups.push(ConversationGroup {
                    listing_id: key.0,
                    other_user_id: key.1,
                    last: message,
                    unread_count: usize::from(unread),
                });
            }
        }
    }

    groups.sort_by(|a, b| b.last.created_at.cmp(&a.last.created_at));
    groups
}

fn conversation(
    group: ConversationGroup<'_>,
    titles: &HashMap<String, String>,
    names: &HashMap<String, String>,
) -> Conversation {
    Conversation {
        id: format!("{}_{}", group.listing_id, group.other_user_id),
        listing_id: stored_id(group.listing_id),
        listing_title: titles
            .get(group.listing_id)
            .cloned()
            .unwrap_or_else(|| "Unknown Listing".into()),
        other_user_id: stored_id(group.other_user_id),
        other_user_name: names
            .get(group.other_user_id)
            .cloned()
            .unwrap_or_else(|| "Unknown User".into()),
        last_message: group.last.content.clone(),
        last_message_time: stored_time(&group.last.created_at),
        unread_count: group.unread_count,
    }
}
