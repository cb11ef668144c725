use std::fmt;

/// Slider position meaning "only the requesting process".
pub const THIS_PROCESS_POSITION: i32 = -1;
/// Slider position meaning "forever".
pub const FOREVER_POSITION: i32 = 0;

/// How long an allow is meant to last. Shown to the user only; the decision
/// record never carries it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantDuration {
    ThisProcess,
    Forever,
    Minutes(u32),
}

impl GrantDuration {
    pub fn from_position(position: i32) -> Self {
        match position {
            p if p <= THIS_PROCESS_POSITION => GrantDuration::ThisProcess,
            FOREVER_POSITION => GrantDuration::Forever,
            p => GrantDuration::Minutes(p.unsigned_abs()),
        }
    }
}

impl fmt::Display for GrantDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrantDuration::ThisProcess => write!(f, "Allow only for this process"),
            GrantDuration::Forever => write!(f, "Allow forever"),
            GrantDuration::Minutes(1) => write!(f, "Allow for: (1) minute"),
            GrantDuration::Minutes(n) => write!(f, "Allow for: ({n}) minutes"),
        }
    }
}

/// The "notify" switch whose availability follows the duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotifyToggle {
    pub checked: bool,
    pub enabled: bool,
}

/// Slider over `-1..=max_minutes` plus the dependent notify toggle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DurationSelector {
    position: i32,
    max_minutes: i32,
    notify: NotifyToggle,
}

impl DurationSelector {
    /// Starts at "forever" with notifications on.
    pub fn new(max_minutes: u32) -> Self {
        let mut selector = Self {
            position: FOREVER_POSITION,
            max_minutes: i32::try_from(max_minutes).unwrap_or(i32::MAX),
            notify: NotifyToggle {
                checked: true,
                enabled: true,
            },
        };
        selector.set_position(FOREVER_POSITION);
        selector
    }

    pub fn position(&self) -> i32 {
        self.position
    }

    pub fn max_minutes(&self) -> i32 {
        self.max_minutes
    }

    pub fn duration(&self) -> GrantDuration {
        GrantDuration::from_position(self.position)
    }

    pub fn notify(&self) -> NotifyToggle {
        self.notify
    }

    /// Moves the slider, clamping to its range, and reconciles the toggle:
    /// this-process-only forces it off and locks it; any other position
    /// unlocks it and switches it on if it was off.
    pub fn set_position(&mut self, position: i32) {
        self.position = position.clamp(THIS_PROCESS_POSITION, self.max_minutes);
        if self.position == THIS_PROCESS_POSITION {
            self.notify = NotifyToggle {
                checked: false,
                enabled: false,
            };
        } else {
            self.notify = NotifyToggle {
                checked: true,
                enabled: true,
            };
        }
    }

    pub fn step(&mut self, delta: i32) {
        self.set_position(self.position.saturating_add(delta));
    }

    /// Flips the toggle unless it is locked. Returns the new checked state.
    pub fn toggle_notify(&mut self) -> bool {
        if self.notify.enabled {
            self.notify.checked = !self.notify.checked;
        }
        self.notify.checked
    }
}
