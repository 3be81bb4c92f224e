use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::content::{ChatMessage, ChatSession};
use crate::dispatch::{self, ContentView};

pub const ERROR_REPLY: &str = "Sorry, something went wrong. Please try again.";

const TITLE_CHARS: usize = 30;

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
    pub query: String,
}

/// Agent reply: a chat message plus the session it was filed under.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatReply {
    #[serde(flatten)]
    pub message: ChatMessage,
    #[serde(rename = "sessionId", default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendRejected {
    Blank,
    Pending,
}

/// Issued by [`Conversation::begin_send`] and handed back on settle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    epoch: u64,
    query: String,
    session_id: Option<String>,
}

/// A message together with the views rendered from its content.
#[derive(Debug, Clone)]
pub struct Turn {
    pub message: ChatMessage,
    pub views: Vec<ContentView>,
}

impl Turn {
    fn new(message: ChatMessage) -> Self {
        let views = dispatch::render_message_content(&message.content);
        Turn { message, views }
    }
}

#[derive(Debug, Default)]
pub struct Conversation {
    turns: Vec<Turn>,
    sessions: Vec<ChatSession>,
    active_session: Option<String>,
    pending: bool,
    /// Bumped whenever the transcript is swapped out, so late replies can be
    /// told apart from current ones.
    epoch: u64,
}

impl Conversation {
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn turn_mut(&mut self, index: usize) -> Option<&mut Turn> {
        self.turns.get_mut(index)
    }

    pub fn sessions(&self) -> &[ChatSession] {
        &self.sessions
    }

    pub fn active_session(&self) -> Option<&str> {
        self.active_session.as_deref()
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn can_send(&self, query: &str) -> bool {
        !self.pending && !query.trim().is_empty()
    }

    /// Appends the user message and returns the request to dispatch. Only one
    /// request may be in flight.
    pub fn begin_send(&mut self, query: &str) -> Result<(ChatRequest, Ticket), SendRejected> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SendRejected::Blank);
        }
        if self.pending {
            return Err(SendRejected::Pending);
        }

        self.turns.push(Turn::new(ChatMessage::user(query)));
        self.pending = true;

        let request = ChatRequest {
            session_id: self.active_session.clone(),
            query: query.to_string(),
        };
        let ticket = Ticket {
            epoch: self.epoch,
            query: query.to_string(),
            session_id: self.active_session.clone(),
        };
        Ok((request, ticket))
    }

    /// Records the outcome of a request. Returns whether a turn was appended.
    pub fn settle(&mut self, ticket: Ticket, result: Result<ChatReply, String>) -> bool {
        self.pending = false;
        let current = ticket.epoch == self.epoch;

        match result {
            Ok(reply) => {
                if let Some(session_id) = reply.session_id {
                    if ticket.session_id.is_none()
                        && !self.sessions.iter().any(|s| s.id == session_id)
                    {
                        self.sessions.insert(
                            0,
                            ChatSession {
                                id: session_id.clone(),
                                title: session_title(&ticket.query),
                                last_updated: Local::now().to_rfc3339(),
                            },
                        );
                    }
                    if current {
                        self.active_session = Some(session_id);
                    }
                }
                if !current {
                    tracing::debug!("dropping reply for a conversation that is no longer shown");
                    return false;
                }
                self.turns.push(Turn::new(reply.message));
            }
            Err(error) => {
                tracing::error!("chat request failed: {}", error);
                if !current {
                    return false;
                }
                self.turns.push(Turn::new(ChatMessage::agent_notice(ERROR_REPLY)));
            }
        }
        true
    }

    pub fn new_chat(&mut self) {
        self.active_session = None;
        self.turns.clear();
        self.epoch += 1;
    }

    /// Messages of past sessions are not reloaded; the transcript starts empty.
    pub fn select_session(&mut self, id: &str) {
        self.active_session = Some(id.to_string());
        self.turns.clear();
        self.epoch += 1;
    }
}

fn session_title(query: &str) -> String {
    let mut title: String = query.chars().take(TITLE_CHARS).collect();
    if query.chars().count() > TITLE_CHARS {
        title.push_str("...");
    }
    title
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryGroup {
    Today,
    Yesterday,
    Previous,
}

impl HistoryGroup {
    pub fn title(self) -> &'static str {
        match self {
            HistoryGroup::Today => "Today",
            HistoryGroup::Yesterday => "Yesterday",
            HistoryGroup::Previous => "Previous 7 days",
        }
    }
}

pub fn history_group(last_updated: &str, today: NaiveDate) -> HistoryGroup {
    if let Ok(stamp) = DateTime::parse_from_rfc3339(last_updated) {
        let date = stamp.with_timezone(&Local).date_naive();
        return if date == today {
            HistoryGroup::Today
        } else if today.pred_opt() == Some(date) {
            HistoryGroup::Yesterday
        } else {
            HistoryGroup::Previous
        };
    }
    if last_updated.contains("AM") || last_updated.contains("PM") {
        HistoryGroup::Today
    } else if last_updated == "Yesterday" {
        HistoryGroup::Yesterday
    } else {
        HistoryGroup::Previous
    }
}

/// Sessions bucketed for the sidebar, empty groups left out, list order kept.
pub fn group_sessions(
    sessions: &[ChatSession],
    today: NaiveDate,
) -> Vec<(HistoryGroup, Vec<&ChatSession>)> {
    [HistoryGroup::Today, HistoryGroup::Yesterday, HistoryGroup::Previous]
        .into_iter()
        .map(|group| {
            let members: Vec<&ChatSession> = sessions
                .iter()
                .filter(|s| history_group(&s.last_updated, today) == group)
                .collect();
            (group, members)
        })
        .filter(|(_, members)| !members.is_empty())
        .collect()
}

/// Short display form of a session timestamp.
pub fn display_time(last_updated: &str) -> String {
    match DateTime::parse_from_rfc3339(last_updated) {
        Ok(stamp) => stamp.with_timezone(&Local).format("%H:%M").to_string(),
        Err(_) => last_updated.to_string(),
    }
}
