/// Touch sampling, the hold-to-sleep state machine and the animation counter
use crate::settings::SleepTouchThreshold;

/// Raw touch readings below this value count as a touch
pub const TOUCH_THRESHOLD: u16 = 100;

/// Number of distinct animation steps
pub const ANIMATION_STEPS: u8 = 4;

/// Cyclic 0..=3 counter driving the Wi-Fi reveal and side-line decorations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnimationStep(u8);

impl AnimationStep {
    pub fn value(self) -> u8 {
        self.0
    }

    pub fn advance(&mut self) {
        self.0 = (self.0 + 1) % ANIMATION_STEPS;
    }

    pub fn reset(&mut self) {
        self.0 = 0;
    }
}

pub fn is_touched(raw: u16) -> bool {
    raw < TOUCH_THRESHOLD
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TouchState {
    Idle,
    Active { since: u32 },
    /// Terminal: the sleep request has been handed out
    Asleep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchEvent {
    None,
    Pressed,
    Held { duration_ms: u32 },
    Released,
    SleepRequested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TouchTracker {
    state: TouchState,
}

impl Default for TouchTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl TouchTracker {
    pub fn new() -> Self {
        Self {
            state: TouchState::Idle,
        }
    }

    /// Feed one sample. `hold_ms` is the duration after which a continuous
    /// touch requests sleep; the request is produced exactly once.
    pub fn sample(&mut self, now: u32, touched: bool, hold_ms: u32) -> TouchEvent {
        match (self.state, touched) {
            (TouchState::Asleep, _) => TouchEvent::None,
            (TouchState::Idle, false) => TouchEvent::None,
            (TouchState::Idle, true) => {
                self.state = TouchState::Active { since: now };
                if hold_ms == 0 {
                    self.state = TouchState::Asleep;
                    return TouchEvent::SleepRequested;
                }
                TouchEvent::Pressed
            }
            (TouchState::Active { since }, true) => {
                let duration_ms = now.wrapping_sub(since);
                if duration_ms >= hold_ms {
                    self.state = TouchState::Asleep;
                    TouchEvent::SleepRequested
                } else {
                    TouchEvent::Held { duration_ms }
                }
            }
            (TouchState::Active { .. }, false) => {
                self.state = TouchState::Idle;
                TouchEvent::Released
            }
        }
    }

    /// Start of the current touch, `None` while no touch is active
    pub fn touch_start_millis(&self) -> Option<u32> {
        match self.state {
            TouchState::Active { since } => Some(since),
            _ => None,
        }
    }

    pub fn is_asleep(&self) -> bool {
        self.state == TouchState::Asleep
    }
}

/// Transient interaction state, reset to neutral on every boot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InteractionState {
    pub touch: TouchTracker,
    pub animation: AnimationStep,
    pub show_activity_indicator: bool,
}

impl InteractionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one raw touch sample and update the shared indicator state.
    pub fn sample_touch(&mut self, now: u32, raw: u16, threshold: SleepTouchThreshold) -> TouchEvent {
        let event = self.touch.sample(now, is_touched(raw), threshold.hold_millis());
        match event {
            TouchEvent::Pressed => {
                log::debug!("Touch started at {} ms", now);
                self.animation.reset();
                self.show_activity_indicator = true;
            }
            TouchEvent::Held { .. } => self.show_activity_indicator = true,
            TouchEvent::Released => {
                log::debug!("Touch released");
                self.show_activity_indicator = false;
            }
            TouchEvent::SleepRequested => {
                log::info!("Touch held past {} ms, going to sleep", threshold.hold_millis());
            }
            TouchEvent::None => {}
        }
        event
    }

    pub fn touch_start_millis(&self) -> Option<u32> {
        self.touch.touch_start_millis()
    }
}
