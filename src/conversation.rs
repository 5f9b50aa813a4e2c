// Conversation log - ordered turns with per-turn lifecycle status
//
// The log is the single source of truth for what has been sent versus what is
// still in progress. While a turn is streaming its `raw_text` is not yet
// authoritative; readers must use the reveal scheduler's buffer until the
// turn is finalized.
//
// Invariants:
// - every assistant turn is immediately preceded by a user turn
//   (no consecutive assistant turns, no assistant turn at index 0)
// - at most one turn is Streaming or Editing at any time

use std::fmt;
use std::time::Instant;

/// Stable identity for a turn, issued by the log.
/// Identity checks protect against mutating a turn that a concurrent
/// delete/edit already removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TurnId(u64);

/// Who authored a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "You",
            Role::Assistant => "Claude",
        }
    }
}

/// Lifecycle status of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStatus {
    Idle,
    /// Response text is still arriving; raw_text is not authoritative yet
    Streaming,
    /// User is editing this turn's text
    Editing,
    /// Marked for removal; actually removed once the deadline passes,
    /// giving the UI time for an exit transition
    Deleting { remove_at: Instant },
}

/// One message in the conversation.
#[derive(Debug, Clone)]
pub struct Turn {
    pub id: TurnId,
    pub role: Role,
    /// Authoritative content once status leaves Streaming
    pub raw_text: String,
    pub status: TurnStatus,
}

impl Turn {
    pub fn is_streaming(&self) -> bool {
        self.status == TurnStatus::Streaming
    }

    pub fn is_deleting(&self) -> bool {
        matches!(self.status, TurnStatus::Deleting { .. })
    }
}

/// Errors from invalid lifecycle operations.
///
/// These abort the single requested mutation and leave the log unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    /// Regenerate requested on a turn with no preceding user turn
    NoPrecedingUserTurn,
    /// Operation requires an assistant turn
    NotAnAssistantTurn,
    /// Operation requires a user turn
    NotAUserTurn,
    /// Turn is streaming and cannot be edited
    TurnStreaming,
    /// The referenced turn no longer exists
    TurnGone,
}

impl fmt::Display for LifecycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleError::NoPrecedingUserTurn => {
                write!(f, "no preceding user turn to regenerate from")
            }
            LifecycleError::NotAnAssistantTurn => write!(f, "not an assistant turn"),
            LifecycleError::NotAUserTurn => write!(f, "not a user turn"),
            LifecycleError::TurnStreaming => write!(f, "turn is still streaming"),
            LifecycleError::TurnGone => write!(f, "turn no longer exists"),
        }
    }
}

impl std::error::Error for LifecycleError {}

/// Ordered sequence of turns; insertion order is conversation order.
#[derive(Debug, Default)]
pub struct ConversationLog {
    turns: Vec<Turn>,
    next_id: u64,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn issue_id(&mut self) -> TurnId {
        let id = TurnId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Append a user turn with the given text.
    pub fn push_user(&mut self, text: impl Into<String>) -> TurnId {
        let id = self.issue_id();
        self.turns.push(Turn {
            id,
            role: Role::User,
            raw_text: text.into(),
            status: TurnStatus::Idle,
        });
        id
    }

    /// Append an assistant turn in streaming state with empty content.
    ///
    /// Callers must only do this right after a user turn; the log refuses an
    /// orphan assistant turn to preserve the alternation invariant.
    pub fn push_assistant_streaming(&mut self) -> Result<TurnId, LifecycleError> {
        match self.turns.last() {
            Some(turn) if turn.role == Role::User => {}
            _ => return Err(LifecycleError::NoPrecedingUserTurn),
        }
        let id = self.issue_id();
        self.turns.push(Turn {
            id,
            role: Role::Assistant,
            raw_text: String::new(),
            status: TurnStatus::Streaming,
        });
        Ok(id)
    }

    pub fn get(&self, id: TurnId) -> Option<&Turn> {
        self.turns.iter().find(|t| t.id == id)
    }

    pub fn get_mut(&mut self, id: TurnId) -> Option<&mut Turn> {
        self.turns.iter_mut().find(|t| t.id == id)
    }

    pub fn index_of(&self, id: TurnId) -> Option<usize> {
        self.turns.iter().position(|t| t.id == id)
    }

    /// The turn immediately before `id` in log order.
    pub fn predecessor(&self, id: TurnId) -> Option<&Turn> {
        let index = self.index_of(id)?;
        index.checked_sub(1).map(|i| &self.turns[i])
    }

    /// Remove every turn ordered after `id`. Turns at or before `id` are
    /// untouched. No-op if the turn is gone.
    pub fn truncate_after(&mut self, id: TurnId) {
        if let Some(index) = self.index_of(id) {
            self.turns.truncate(index + 1);
        }
    }

    /// Remove one turn by identity. Returns the removed turn, if present.
    pub fn remove(&mut self, id: TurnId) -> Option<Turn> {
        let index = self.index_of(id)?;
        Some(self.turns.remove(index))
    }

    /// Finalize a streaming turn with its authoritative text.
    /// No-op (returns false) if the turn was removed while streaming.
    pub fn finalize(&mut self, id: TurnId, text: impl Into<String>) -> bool {
        match self.get_mut(id) {
            Some(turn) if turn.is_streaming() => {
                turn.raw_text = text.into();
                turn.status = TurnStatus::Idle;
                true
            }
            _ => false,
        }
    }

    /// Remove every turn whose deletion deadline has passed.
    /// Returns the number of turns removed.
    pub fn expire_deletions(&mut self, now: Instant) -> usize {
        let before = self.turns.len();
        self.turns.retain(|turn| match turn.status {
            TurnStatus::Deleting { remove_at } => now < remove_at,
            _ => true,
        });
        before - self.turns.len()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Drop all turns (new chat). Ids keep increasing so stale references
    /// from a previous conversation can never alias a new turn.
    pub fn clear(&mut self) {
        self.turns.clear();
    }
}
