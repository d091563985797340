//! Exam countdown.
//!
//! The countdown is a pure state machine: it never reads a clock. Whoever owns
//! it calls [`Countdown::tick`] once per elapsed second and reacts to the
//! returned [`CountdownTick`].

/// Remaining time at or below which the warning fires by default.
pub const DEFAULT_WARNING_AT_SECS: u64 = 600;

/// Remaining time at or below which the countdown is considered critical.
pub const DANGER_AT_SECS: u64 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownConfig {
    pub warning_at: u64,
    pub start_paused: bool,
}

impl Default for CountdownConfig {
    fn default() -> Self {
        Self {
            warning_at: DEFAULT_WARNING_AT_SECS,
            start_paused: false,
        }
    }
}

impl CountdownConfig {
    #[must_use]
    pub fn with_warning_at(mut self, warning_at: u64) -> Self {
        self.warning_at = warning_at;
        self
    }

    #[must_use]
    pub fn paused(mut self) -> Self {
        self.start_paused = true;
        self
    }
}

/// Events produced by a single tick. Both can fire on the same tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CountdownTick {
    pub warning: bool,
    pub expired: bool,
}

impl CountdownTick {
    #[must_use]
    pub fn is_quiet(&self) -> bool {
        !self.warning && !self.expired
    }
}

/// How close the countdown is to expiring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerUrgency {
    Normal,
    Warning,
    Danger,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Countdown {
    total: u64,
    remaining: u64,
    running: bool,
    warned: bool,
    expired: bool,
    stopped: bool,
    config: CountdownConfig,
}

impl Countdown {
    #[must_use]
    pub fn new(total_secs: u64, config: CountdownConfig) -> Self {
        Self {
            total: total_secs,
            remaining: total_secs,
            running: !config.start_paused,
            warned: false,
            expired: false,
            stopped: false,
            config,
        }
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.total
    }

    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expired
    }

    #[must_use]
    pub fn warning_at(&self) -> u64 {
        self.config.warning_at
    }

    pub fn pause(&mut self) {
        self.running = false;
    }

    /// Whether the countdown has ended, by expiry or by [`Countdown::stop`].
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.expired || self.stopped
    }

    /// Resume after a pause. A finished countdown stays stopped.
    pub fn resume(&mut self) {
        if !self.is_finished() {
            self.running = true;
        }
    }

    /// Stop permanently without firing expiry, e.g. after a manual submission.
    pub fn stop(&mut self) {
        self.running = false;
        self.stopped = true;
    }

    /// Account for one elapsed second.
    pub fn tick(&mut self) -> CountdownTick {
        let mut out = CountdownTick::default();
        if !self.running || self.is_finished() {
            return out;
        }

        self.remaining = self.remaining.saturating_sub(1);

        if !self.warned && self.remaining <= self.config.warning_at {
            self.warned = true;
            out.warning = true;
        }

        if self.remaining == 0 {
            self.running = false;
            self.expired = true;
            out.expired = true;
        }

        out
    }

    #[must_use]
    pub fn urgency(&self) -> TimerUrgency {
        if self.remaining <= DANGER_AT_SECS {
            TimerUrgency::Danger
        } else if self.remaining <= self.config.warning_at {
            TimerUrgency::Warning
        } else {
            TimerUrgency::Normal
        }
    }

    #[must_use]
    pub fn formatted(&self) -> String {
        format_clock(self.remaining)
    }
}

/// Formats seconds as `MM:SS`, or `H:MM:SS` from one hour up.
#[must_use]
pub fn format_clock(secs: u64) -> String {
    let h = secs / 3600;
    let m = (secs % 3600) / 60;
    let s = secs % 60;
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m:02}:{s:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(countdown: &mut Countdown, secs: u64) -> Vec<(u64, CountdownTick)> {
        (0..secs)
            .map(|_| {
                let tick = countdown.tick();
                (countdown.remaining(), tick)
            })
            .filter(|(_, tick)| !tick.is_quiet())
            .collect()
    }

    #[test]
    fn expires_once_at_zero() {
        let mut countdown = Countdown::new(5, CountdownConfig::default());
        let events = run(&mut countdown, 10);

        let expiries: Vec<_> = events.iter().filter(|(_, t)| t.expired).collect();
        assert_eq!(expiries.len(), 1);
        assert_eq!(expiries[0].0, 0);
        assert_eq!(countdown.remaining(), 0);
        assert!(!countdown.is_running());
        assert!(countdown.is_expired());
    }

    #[test]
    fn short_countdown_warns_on_first_tick() {
        let mut countdown = Countdown::new(5, CountdownConfig::default());
        let tick = countdown.tick();
        assert!(tick.warning);
        assert!(!tick.expired);
        assert_eq!(countdown.remaining(), 4);
    }

    #[test]
    fn warns_once_when_crossing_threshold() {
        let mut countdown = Countdown::new(601, CountdownConfig::default().with_warning_at(600));
        let events = run(&mut countdown, 300);

        let warnings: Vec<_> = events.iter().filter(|(_, t)| t.warning).collect();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].0, 600);
    }

    #[test]
    fn zero_length_expires_on_first_tick() {
        let mut countdown = Countdown::new(0, CountdownConfig::default());
        let tick = countdown.tick();
        assert!(tick.expired);
        assert!(countdown.tick().is_quiet());
    }

    #[test]
    fn pause_keeps_remaining_and_resume_continues() {
        let mut countdown = Countdown::new(10, CountdownConfig::default());
        countdown.tick();
        countdown.pause();
        countdown.tick();
        countdown.tick();
        assert_eq!(countdown.remaining(), 9);

        countdown.resume();
        countdown.tick();
        assert_eq!(countdown.remaining(), 8);
    }

    #[test]
    fn starts_paused_when_configured() {
        let mut countdown = Countdown::new(10, CountdownConfig::default().paused());
        assert!(!countdown.is_running());
        countdown.tick();
        assert_eq!(countdown.remaining(), 10);
    }

    #[test]
    fn resume_after_expiry_is_ignored() {
        let mut countdown = Countdown::new(1, CountdownConfig::default());
        assert!(countdown.tick().expired);
        countdown.resume();
        assert!(!countdown.is_running());
        assert!(countdown.tick().is_quiet());
    }

    #[test]
    fn stopped_countdown_cannot_resume() {
        let mut countdown = Countdown::new(660, CountdownConfig::default());
        countdown.tick();
        countdown.stop();
        assert!(countdown.is_finished());
        assert!(!countdown.is_expired());

        countdown.resume();
        assert!(!countdown.is_running());
        for _ in 0..120 {
            assert!(countdown.tick().is_quiet());
        }
        assert_eq!(countdown.remaining(), 659);
    }

    #[test]
    fn urgency_bands() {
        let config = CountdownConfig::default();
        assert_eq!(Countdown::new(601, config).urgency(), TimerUrgency::Normal);
        assert_eq!(Countdown::new(600, config).urgency(), TimerUrgency::Warning);
        assert_eq!(Countdown::new(121, config).urgency(), TimerUrgency::Warning);
        assert_eq!(Countdown::new(120, config).urgency(), TimerUrgency::Danger);
    }

    #[test]
    fn formats_minutes_and_hours() {
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(65), "01:05");
        assert_eq!(format_clock(3599), "59:59");
        assert_eq!(format_clock(3600), "1:00:00");
        assert_eq!(format_clock(5400), "1:30:00");
        assert_eq!(Countdown::new(4200, CountdownConfig::default()).formatted(), "1:10:00");
    }
}
