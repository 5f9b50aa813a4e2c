// Reveal scheduler - paces how fast streamed text becomes visible
//
// Network frames arrive in bursts, but we want the transcript to grow at a
// steady, readable rate. This module owns the accumulated text buffer and a
// monotonically increasing "revealed" watermark. The pacing logic is a pure
// function of elapsed time, so the TUI tick loop can drive it and tests can
// drive it with synthetic durations - no real timer involved.
//
// Invariants:
// - `revealed` counts whole characters and never decreases
// - the visible prefix always ends on a UTF-8 character boundary
// - `finish()` reveals everything; later appends and ticks are ignored

use std::time::Duration;

/// Default milliseconds per revealed character.
/// Matches a comfortable reading speed for streamed prose.
pub const DEFAULT_REVEAL_SPEED_MS: u64 = 12;

/// Paces the reveal of an append-only text buffer.
#[derive(Debug)]
pub struct RevealScheduler {
    /// All text received so far (authoritative once the stream finishes)
    buffer: String,
    /// Number of characters currently visible
    revealed_chars: usize,
    /// Byte offset matching `revealed_chars` (kept in sync for O(1) slicing)
    revealed_bytes: usize,
    /// Total characters in `buffer`
    total_chars: usize,
    /// Time budget per character
    speed: Duration,
    /// Set by finish(); freezes the buffer and the watermark
    finished: bool,
}

impl RevealScheduler {
    pub fn new(speed: Duration) -> Self {
        Self {
            buffer: String::new(),
            revealed_chars: 0,
            revealed_bytes: 0,
            total_chars: 0,
            // Guard against a zero speed from config; one char per tick minimum
            // is enforced in tick() anyway, but avoid div-by-zero here.
            speed: speed.max(Duration::from_millis(1)),
            finished: false,
        }
    }

    /// Append incoming text to the buffer. Ignored once finish() has been
    /// called: the buffer is authoritative after the stream closes.
    pub fn append(&mut self, text: &str) {
        if text.is_empty() || self.finished {
            return;
        }
        self.buffer.push_str(text);
        self.total_chars += text.chars().count();
    }

    /// Advance the watermark based on wall-clock time since the last tick.
    ///
    /// Reveals `max(1, elapsed / speed)` characters, clamped to the buffer
    /// length. Returns true if the visible prefix changed. Time-based rather
    /// than tick-count-based, so the reveal rate stays stable even when the
    /// tick interval jitters.
    pub fn tick(&mut self, elapsed: Duration) -> bool {
        if self.finished || self.revealed_chars >= self.total_chars {
            return false;
        }

        let budget = (elapsed.as_millis() / self.speed.as_millis()).max(1) as usize;
        let step = budget.min(self.total_chars - self.revealed_chars);

        // Advance the byte offset across exactly `step` characters.
        // nth(step) yields the byte start of the first char left unrevealed;
        // None means the tail held exactly `step` chars.
        let tail = &self.buffer[self.revealed_bytes..];
        let consumed = match tail.char_indices().nth(step) {
            Some((offset, _)) => offset,
            None => tail.len(),
        };
        self.revealed_bytes += consumed;
        self.revealed_chars += step;
        true
    }

    /// Reveal everything immediately and stop the reveal process.
    pub fn finish(&mut self) {
        self.revealed_chars = self.total_chars;
        self.revealed_bytes = self.buffer.len();
        self.finished = true;
    }

    /// The currently visible prefix of the buffer.
    pub fn visible(&self) -> &str {
        &self.buffer[..self.revealed_bytes]
    }

    /// The full buffer, including not-yet-revealed text.
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Number of characters currently revealed.
    pub fn revealed(&self) -> usize {
        self.revealed_chars
    }

    /// True while there is still text waiting to be revealed.
    pub fn pending(&self) -> bool {
        self.revealed_chars < self.total_chars
    }

    /// True once finish() has been called.
    pub fn finished(&self) -> bool {
        self.finished
    }
}

impl Default for RevealScheduler {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_REVEAL_SPEED_MS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduler_10ms() -> RevealScheduler {
        RevealScheduler::new(Duration::from_millis(10))
    }

    #[test]
    fn test_append_then_finish_reveals_everything() {
        let mut reveal = scheduler_10ms();
        reveal.append("Hello");
        reveal.append(" world");
        reveal.finish();
        assert_eq!(reveal.visible(), "Hello world");
        assert_eq!(reveal.buffer(), "Hello world");
        assert_eq!(reveal.revealed(), "Hello world".chars().count());
        assert!(reveal.finished());
    }

    #[test]
    fn test_tick_reveals_at_least_one_char() {
        let mut reveal = scheduler_10ms();
        reveal.append("abc");
        // Elapsed shorter than the per-char budget still reveals one char
        assert!(reveal.tick(Duration::from_millis(1)));
        assert_eq!(reveal.visible(), "a");
    }

    #[test]
    fn test_tick_is_time_based() {
        let mut reveal = scheduler_10ms();
        reveal.append("abcdefgh");
        // 35ms at 10ms/char => 3 chars
        reveal.tick(Duration::from_millis(35));
        assert_eq!(reveal.visible(), "abc");
        // A long stall catches up in one tick, clamped to the buffer
        reveal.tick(Duration::from_secs(10));
        assert_eq!(reveal.visible(), "abcdefgh");
    }

    #[test]
    fn test_revealed_is_monotonic_for_any_tick_pattern() {
        let mut reveal = scheduler_10ms();
        reveal.append("The quick brown fox jumps over the lazy dog");
        let mut last = 0;
        for elapsed_ms in [0u64, 3, 50, 1, 1, 200, 7, 0, 1000] {
            reveal.tick(Duration::from_millis(elapsed_ms));
            assert!(reveal.revealed() >= last, "watermark regressed");
            last = reveal.revealed();
        }
        reveal.finish();
        assert!(reveal.revealed() >= last);
    }

    #[test]
    fn test_chars_revealed_in_order_never_skipped() {
        let mut reveal = scheduler_10ms();
        let text = "streaming";
        reveal.append(text);
        let mut seen = String::new();
        while reveal.pending() {
            reveal.tick(Duration::from_millis(10));
            let visible = reveal.visible();
            // Each observation extends the previous one
            assert!(visible.starts_with(&seen));
            seen = visible.to_string();
        }
        assert_eq!(seen, text);
    }

    #[test]
    fn test_multibyte_boundary_safety() {
        let mut reveal = scheduler_10ms();
        reveal.append("héllo 世界 🚀");
        // Reveal one char at a time; slicing must never panic mid-codepoint
        while reveal.pending() {
            reveal.tick(Duration::from_millis(1));
            let _ = reveal.visible();
        }
        assert_eq!(reveal.visible(), "héllo 世界 🚀");
    }

    #[test]
    fn test_append_after_drain_resumes() {
        let mut reveal = scheduler_10ms();
        reveal.append("ab");
        reveal.tick(Duration::from_secs(1));
        assert_eq!(reveal.visible(), "ab");
        assert!(!reveal.pending());

        reveal.append("cd");
        assert!(reveal.pending());
        reveal.tick(Duration::from_secs(1));
        assert_eq!(reveal.visible(), "abcd");
    }

    #[test]
    fn test_tick_after_finish_is_inert() {
        let mut reveal = scheduler_10ms();
        reveal.append("done");
        reveal.finish();
        assert!(!reveal.tick(Duration::from_secs(1)));
        assert_eq!(reveal.visible(), "done");
    }

    #[test]
    fn test_append_after_finish_is_ignored() {
        let mut reveal = scheduler_10ms();
        reveal.append("done");
        reveal.finish();

        // The watermark is final; a late append changes nothing
        reveal.append(" more");
        assert!(!reveal.tick(Duration::from_secs(1)));
        assert_eq!(reveal.visible(), "done");
        assert_eq!(reveal.buffer(), "done");
        assert!(reveal.finished());
    }

    #[test]
    fn test_empty_append_does_not_activate() {
        let mut reveal = scheduler_10ms();
        reveal.append("");
        assert!(!reveal.tick(Duration::from_millis(100)));
        assert_eq!(reveal.visible(), "");
    }
}
