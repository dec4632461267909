//! Transcript debounce and duplicate suppression
//!
//! A transcript becomes "the command" only after a quiet period with no
//! further change. A transcript identical to the one just dispatched is
//! dropped if it arrived inside the cool-down window.

use std::time::Duration;

use tokio::time::Instant;

/// Default quiet period before dispatch
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(1500);

/// Default duplicate-suppression window
pub const DEFAULT_COOLDOWN: Duration = Duration::from_millis(2000);

#[derive(Debug)]
struct Pending {
    transcript: String,
    arrived: Instant,
    due: Instant,
}

/// Debounces transcript updates into single dispatches
#[derive(Debug)]
pub struct CommandDebouncer {
    quiet_period: Duration,
    cooldown: Duration,
    pending: Option<Pending>,
    last_dispatched: Option<(String, Instant)>,
    in_flight: bool,
}

impl Default for CommandDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_QUIET_PERIOD, DEFAULT_COOLDOWN)
    }
}

impl CommandDebouncer {
    /// Create a debouncer
    #[must_use]
    pub const fn new(quiet_period: Duration, cooldown: Duration) -> Self {
        Self {
            quiet_period,
            cooldown,
            pending: None,
            last_dispatched: None,
            in_flight: false,
        }
    }

    /// Record a new transcript, restarting the quiet period
    pub fn update(&mut self, transcript: &str, now: Instant) {
        let transcript = transcript.trim();
        if transcript.is_empty() {
            return;
        }
        self.pending = Some(Pending {
            transcript: transcript.to_string(),
            arrived: now,
            due: now + self.quiet_period,
        });
    }

    /// Return the transcript to dispatch if its quiet period has elapsed
    ///
    /// Marks the dispatch in flight; call [`Self::finish`] once handled.
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        if self.in_flight {
            return None;
        }

        let due = self.pending.as_ref().is_some_and(|p| p.due <= now);
        if !due {
            return None;
        }
        let Pending {
            transcript, arrived, ..
        } = self.pending.take()?;

        // Cool-down runs from when the repeat was heard, not when it came due
        if let Some((last, at)) = &self.last_dispatched {
            if *last == transcript && arrived.saturating_duration_since(*at) < self.cooldown {
                tracing::debug!(transcript = %transcript, "suppressing duplicate dispatch");
                return None;
            }
        }

        self.last_dispatched = Some((transcript.clone(), now));
        self.in_flight = true;
        Some(transcript)
    }

    /// Dispatch outside the quiet-period path (typed input)
    ///
    /// Applies the same duplicate and re-entrancy checks as [`Self::poll`].
    pub fn dispatch_now(&mut self, transcript: &str, now: Instant) -> Option<String> {
        self.update(transcript, now);
        if let Some(pending) = self.pending.as_mut() {
            pending.due = now;
        }
        self.poll(now)
    }

    /// Mark the in-flight dispatch as handled
    pub const fn finish(&mut self) {
        self.in_flight = false;
    }

    /// Whether a dispatch is being handled
    #[must_use]
    pub const fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Drop any pending transcript
    pub fn cancel(&mut self) {
        if self.pending.take().is_some() {
            tracing::debug!("pending dispatch cancelled");
        }
    }

    /// Forget everything, including the last dispatch
    pub fn reset(&mut self) {
        self.pending = None;
        self.last_dispatched = None;
        self.in_flight = false;
    }

    /// When the pending transcript becomes due
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        if self.in_flight {
            return None;
        }
        self.pending.as_ref().map(|p| p.due)
    }
}
