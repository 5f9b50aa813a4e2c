// Turn lifecycle - edit, regenerate, delete as explicit state transitions
//
// Each operation is an atomic transition over the conversation log. An
// invalid request fails with a LifecycleError and performs no mutation.
// Operations that require a new send cycle (edit-save, regenerate) return the
// prompt text to resend; actually cancelling any in-flight stream and opening
// the new one is the caller's job, since that crosses into session state.
//
// State machine per turn:
//   Idle -> Editing -> Idle (cancel)
//                   -> Idle + truncate + resend (save)
//   Idle -> Deleting -> removed (after DELETE_DELAY)
//   Streaming -> Idle (finalize or error, handled by the log)

use crate::conversation::{ConversationLog, LifecycleError, Role, TurnId, TurnStatus};
use std::time::{Duration, Instant};

/// How long a turn lingers in Deleting before removal (exit transition).
pub const DELETE_DELAY: Duration = Duration::from_millis(250);

/// The commands available on a transcript turn.
///
/// An explicit enumeration rather than stringly-typed UI attributes; the key
/// handler maps key presses onto these and `App` dispatches over them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnCommand {
    Copy,
    Edit,
    Regenerate,
    Delete,
}

/// Begin editing a turn. Valid only on a non-streaming user turn.
/// Returns the current text to seed the editor.
pub fn begin_edit(log: &mut ConversationLog, id: TurnId) -> Result<String, LifecycleError> {
    let turn = log.get_mut(id).ok_or(LifecycleError::TurnGone)?;
    if turn.role != Role::User {
        return Err(LifecycleError::NotAUserTurn);
    }
    if turn.is_streaming() {
        return Err(LifecycleError::TurnStreaming);
    }
    turn.status = TurnStatus::Editing;
    Ok(turn.raw_text.clone())
}

/// Cancel an in-progress edit; no mutation beyond restoring Idle status.
pub fn cancel_edit(log: &mut ConversationLog, id: TurnId) {
    if let Some(turn) = log.get_mut(id) {
        if turn.status == TurnStatus::Editing {
            turn.status = TurnStatus::Idle;
        }
    }
}

/// Save an edit.
///
/// With non-empty, changed text: every turn after the edited one is removed
/// (the edit invalidates downstream context), the turn's text is updated, and
/// the new text is returned for a resend. Empty or unchanged text behaves
/// like cancel and returns None.
pub fn save_edit(
    log: &mut ConversationLog,
    id: TurnId,
    new_text: &str,
) -> Result<Option<String>, LifecycleError> {
    let turn = log.get_mut(id).ok_or(LifecycleError::TurnGone)?;
    let new_text = new_text.trim();

    if new_text.is_empty() || new_text == turn.raw_text {
        turn.status = TurnStatus::Idle;
        return Ok(None);
    }

    turn.raw_text = new_text.to_string();
    turn.status = TurnStatus::Idle;
    log.truncate_after(id);
    Ok(Some(new_text.to_string()))
}

/// Regenerate an assistant turn.
///
/// Valid only when the turn's immediate predecessor is a user turn. Removes
/// the assistant turn and returns the predecessor's text for a resend. On
/// failure nothing is mutated.
pub fn regenerate(log: &mut ConversationLog, id: TurnId) -> Result<String, LifecycleError> {
    let turn = log.get(id).ok_or(LifecycleError::TurnGone)?;
    if turn.role != Role::Assistant {
        return Err(LifecycleError::NotAnAssistantTurn);
    }

    let prompt = match log.predecessor(id) {
        Some(prev) if prev.role == Role::User => prev.raw_text.clone(),
        _ => return Err(LifecycleError::NoPrecedingUserTurn),
    };

    log.remove(id);
    Ok(prompt)
}

/// Mark a turn for deletion. Valid in any state. The turn transitions to
/// Deleting immediately and is removed by `ConversationLog::expire_deletions`
/// once `DELETE_DELAY` has passed.
pub fn delete(log: &mut ConversationLog, id: TurnId, now: Instant) -> Result<(), LifecycleError> {
    let turn = log.get_mut(id).ok_or(LifecycleError::TurnGone)?;
    turn.status = TurnStatus::Deleting {
        remove_at: now + DELETE_DELAY,
    };
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build the log [user A, assistant B, user C, assistant D]
    fn four_turn_log() -> (ConversationLog, Vec<TurnId>) {
        let mut log = ConversationLog::new();
        let a = log.push_user("A");
        let b = log.push_assistant_streaming().unwrap();
        log.finalize(b, "B");
        let c = log.push_user("C");
        let d = log.push_assistant_streaming().unwrap();
        log.finalize(d, "D");
        (log, vec![a, b, c, d])
    }

    #[test]
    fn test_edit_save_truncates_downstream() {
        let (mut log, ids) = four_turn_log();
        let a = ids[0];

        begin_edit(&mut log, a).unwrap();
        let resend = save_edit(&mut log, a, "A-prime").unwrap();

        assert_eq!(resend, Some("A-prime".to_string()));
        assert_eq!(log.len(), 1);
        assert_eq!(log.turns()[0].raw_text, "A-prime");
        assert_eq!(log.turns()[0].status, TurnStatus::Idle);
    }

    #[test]
    fn test_edit_mid_log_keeps_earlier_turns_untouched() {
        let (mut log, ids) = four_turn_log();
        let c = ids[2];

        begin_edit(&mut log, c).unwrap();
        save_edit(&mut log, c, "C-prime").unwrap();

        // Turns <= k untouched except k's text; turns > k removed
        assert_eq!(log.len(), 3);
        assert_eq!(log.turns()[0].raw_text, "A");
        assert_eq!(log.turns()[1].raw_text, "B");
        assert_eq!(log.turns()[2].raw_text, "C-prime");
    }

    #[test]
    fn test_edit_save_unchanged_text_is_cancel() {
        let (mut log, ids) = four_turn_log();
        let a = ids[0];

        begin_edit(&mut log, a).unwrap();
        let resend = save_edit(&mut log, a, "A").unwrap();
        assert_eq!(resend, None);
        assert_eq!(log.len(), 4);
    }

    #[test]
    fn test_edit_save_empty_text_is_cancel() {
        let (mut log, ids) = four_turn_log();
        let a = ids[0];

        begin_edit(&mut log, a).unwrap();
        let resend = save_edit(&mut log, a, "   ").unwrap();
        assert_eq!(resend, None);
        assert_eq!(log.len(), 4);
        assert_eq!(log.turns()[0].raw_text, "A");
    }

    #[test]
    fn test_cancel_edit_restores_idle() {
        let (mut log, ids) = four_turn_log();
        let a = ids[0];
        begin_edit(&mut log, a).unwrap();
        assert_eq!(log.get(a).unwrap().status, TurnStatus::Editing);
        cancel_edit(&mut log, a);
        assert_eq!(log.get(a).unwrap().status, TurnStatus::Idle);
        assert_eq!(log.len(), 4);
    }

    #[test]
    fn test_edit_rejected_on_assistant_turn() {
        let (mut log, ids) = four_turn_log();
        assert_eq!(
            begin_edit(&mut log, ids[1]),
            Err(LifecycleError::NotAUserTurn)
        );
    }

    #[test]
    fn test_regenerate_resends_predecessor_prompt() {
        let (mut log, ids) = four_turn_log();
        let d = ids[3];

        let prompt = regenerate(&mut log, d).unwrap();
        assert_eq!(prompt, "C");
        assert_eq!(log.len(), 3);
        assert!(log.get(d).is_none());
    }

    #[test]
    fn test_regenerate_without_predecessor_fails_unchanged() {
        // Force an assistant turn at position 0 by removing its user turn
        let mut log = ConversationLog::new();
        let user = log.push_user("q");
        let assistant = log.push_assistant_streaming().unwrap();
        log.finalize(assistant, "a");
        log.remove(user);

        assert_eq!(
            regenerate(&mut log, assistant),
            Err(LifecycleError::NoPrecedingUserTurn)
        );
        // Log left unchanged
        assert_eq!(log.len(), 1);
        assert_eq!(log.get(assistant).unwrap().raw_text, "a");
    }

    #[test]
    fn test_regenerate_rejected_on_user_turn() {
        let (mut log, ids) = four_turn_log();
        assert_eq!(
            regenerate(&mut log, ids[0]),
            Err(LifecycleError::NotAnAssistantTurn)
        );
        assert_eq!(log.len(), 4);
    }

    #[test]
    fn test_delete_transitions_then_removes_after_delay() {
        let (mut log, ids) = four_turn_log();
        let d = ids[3];
        let now = Instant::now();

        delete(&mut log, d, now).unwrap();
        assert!(log.get(d).unwrap().is_deleting());
        assert_eq!(log.len(), 4);

        // Not removed before the delay
        assert_eq!(log.expire_deletions(now + DELETE_DELAY / 2), 0);
        assert_eq!(log.len(), 4);

        // Removed exactly once after the delay
        assert_eq!(log.expire_deletions(now + DELETE_DELAY), 1);
        assert_eq!(log.len(), 3);
        assert_eq!(log.expire_deletions(now + DELETE_DELAY * 2), 0);
    }

    #[test]
    fn test_scenario_edit_first_user_turn() {
        // [user A, assistant B, user C, assistant D]; edit A => [user A']
        let (mut log, ids) = four_turn_log();
        begin_edit(&mut log, ids[0]).unwrap();
        let resend = save_edit(&mut log, ids[0], "A'").unwrap();
        assert_eq!(resend, Some("A'".to_string()));
        assert_eq!(log.len(), 1);
        assert_eq!(log.turns()[0].raw_text, "A'");
        assert_eq!(log.turns()[0].role, Role::User);
    }
}
