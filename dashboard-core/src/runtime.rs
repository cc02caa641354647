/// Runtime orchestrator: boot sequencing and dispatch of timer, HTTP and
/// settings events into the shared device state.
///
/// Events are handled one at a time to completion, so nothing here needs a
/// lock. Effects that end normal execution (deep sleep, restart) are returned
/// as [`Control`] values and carried out by the caller.
use log::LevelFilter;

use crate::compositor::{self, Frame, WifiGlyph};
use crate::connectivity::{ConnectStep, ConnectionManager, CONNECT_POLL_MS};
use crate::form::SettingsSubmission;
use crate::interaction::{InteractionState, TouchEvent};
use crate::platform::{Board, Platform, WakeCause};
use crate::poller::{HttpEvent, HttpTransport, SensorPoller, TriggerOutcome};
use crate::reading::{SensorKind, SensorReading};
use crate::settings::DeviceSettings;
use crate::store::{ConfigStore, SettingsStorage};

/// Touch sampling cadence
pub const UI_TICK_MS: u32 = 100;

/// Display refresh cadence
pub const MAIN_TICK_MS: u32 = 500;

/// How long the connection failure message stays up before restarting
pub const CONNECT_FAILURE_PAUSE_MS: u32 = 5_000;

/// How long "Turning off..." stays up before the display powers down
pub const SLEEP_PAUSE_MS: u32 = 2_000;

/// Pause after a normal (non-wake) boot connect
pub const BOOT_PAUSE_MS: u32 = 2_000;

/// Pause before restarting to apply new settings
pub const RESTART_PAUSE_MS: u32 = 1_000;

/// Pause between forced time sync attempts at boot
pub const TIME_SYNC_RETRY_MS: u32 = 250;

/// Log level selected by the debug mode setting
pub fn max_log_level(debug_mode: bool) -> LevelFilter {
    if debug_mode {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Touch sampling timer
    UiTick,
    /// Display refresh timer
    MainTick,
    /// Poll interval of one sensor elapsed
    PollTick(SensorKind),
    /// Progress or completion of a sensor request
    Http(SensorKind, HttpEvent),
    /// The configuration form was submitted
    Settings(SettingsSubmission),
}

/// What the caller must do after an event was handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Control {
    Continue,
    /// Enter deep sleep. The next code to run is the boot sequence.
    Suspend,
    Restart,
}

/// State shared by every handler
#[derive(Debug, Clone)]
pub struct RuntimeState {
    pub settings: DeviceSettings,
    pub interaction: InteractionState,
    pub link: ConnectionManager,
}

pub struct Runtime<S, T> {
    store: ConfigStore<S>,
    state: RuntimeState,
    inside: SensorPoller<T>,
    outside: SensorPoller<T>,
}

impl<S: SettingsStorage, T: HttpTransport> Runtime<S, T> {
    /// Load the persisted settings; nothing else runs before this.
    pub fn new(mut store: ConfigStore<S>, inside: SensorPoller<T>, outside: SensorPoller<T>) -> Self {
        let settings = store.load();
        Self {
            store,
            state: RuntimeState {
                settings,
                interaction: InteractionState::new(),
                link: ConnectionManager::new(),
            },
            inside,
            outside,
        }
    }

    pub fn settings(&self) -> &DeviceSettings {
        &self.state.settings
    }

    pub fn state(&self) -> &RuntimeState {
        &self.state
    }

    pub fn store(&self) -> &ConfigStore<S> {
        &self.store
    }

    pub fn poller(&self, kind: SensorKind) -> &SensorPoller<T> {
        match kind {
            SensorKind::Inside => &self.inside,
            SensorKind::Outside => &self.outside,
        }
    }

    pub fn reading(&self, kind: SensorKind) -> &SensorReading {
        self.poller(kind).reading()
    }

    /// Run the boot sequence up to normal operation.
    ///
    /// Blocks while associating (bounded by the connect timeout) and while the
    /// clock is first synchronised.
    pub fn boot<P: Platform>(&mut self, p: &mut P, wake: WakeCause) -> Control {
        self.apply_display(p);

        if !self.state.settings.is_setup {
            log::info!("Device is not set up, showing setup instructions");
            let step = self.state.interaction.animation;
            render(p, |canvas| compositor::draw_setup_screen(canvas, step));
            return Control::Continue;
        }

        let control = match wake {
            WakeCause::Touch => {
                log::info!("Woke up from touch");
                let step = self.state.interaction.animation;
                render(p, |canvas| compositor::draw_status(canvas, "Waking up...", Some(step)));
                self.connect(p, true)
            }
            WakeCause::PowerOn => {
                let control = self.connect(p, false);
                if control == Control::Continue {
                    p.delay_ms(BOOT_PAUSE_MS);
                }
                control
            }
        };
        if control != Control::Continue {
            return control;
        }

        self.sync_time(p);

        for kind in SensorKind::ALL {
            self.trigger(kind);
        }
        Control::Continue
    }

    pub fn handle<P: Platform>(&mut self, event: Event, p: &mut P) -> Control {
        match event {
            Event::UiTick => self.on_ui_tick(p),
            Event::MainTick => self.on_main_tick(p),
            Event::PollTick(kind) => {
                if self.state.settings.is_setup && self.state.link.is_connected() {
                    self.trigger(kind);
                } else {
                    log::debug!("Skipping {} sensor poll while offline", kind.label());
                }
                Control::Continue
            }
            Event::Http(kind, http) => {
                let RuntimeState { interaction, .. } = &mut self.state;
                match kind {
                    SensorKind::Inside => self.inside.on_http_event(http, interaction),
                    SensorKind::Outside => self.outside.on_http_event(http, interaction),
                }
                Control::Continue
            }
            Event::Settings(submission) => self.apply_settings(submission, p),
        }
    }

    fn trigger(&mut self, kind: SensorKind) -> TriggerOutcome {
        let settings = &self.state.settings;
        match kind {
            SensorKind::Inside => self.inside.trigger_request(settings),
            SensorKind::Outside => self.outside.trigger_request(settings),
        }
    }

    fn on_ui_tick<P: Platform>(&mut self, p: &mut P) -> Control {
        let raw = p.touch_value();
        let now = p.uptime_ms();
        let threshold = self.state.settings.sleep_touch_threshold;

        match self.state.interaction.sample_touch(now, raw, threshold) {
            TouchEvent::SleepRequested => self.enter_sleep(p),
            _ => Control::Continue,
        }
    }

    fn on_main_tick<P: Platform>(&mut self, p: &mut P) -> Control {
        if !self.state.settings.is_setup {
            let step = self.state.interaction.animation;
            render(p, |canvas| compositor::draw_setup_screen(canvas, step));
            self.state.interaction.animation.advance();
            return Control::Continue;
        }

        let now = p.uptime_ms();
        let RuntimeState {
            settings,
            interaction,
            link,
        } = &mut self.state;

        let wifi = match link.poll(now, p, &settings.wifi_ssid, &settings.wifi_password) {
            ConnectStep::Connected => {
                if !p.update() {
                    p.force_update();
                }
                link.quality(&*p)
                    .filter(|_| settings.display_wifi_indicator && !interaction.show_activity_indicator)
                    .map(WifiGlyph::Signal)
            }
            ConnectStep::Pending => Some(WifiGlyph::Animated(interaction.animation)),
            ConnectStep::TimedOut | ConnectStep::Failed => return self.fail_connect(p),
        };

        let frame = Frame {
            clock: p.now(),
            inside: self.inside.reading(),
            outside: self.outside.reading(),
            animation: interaction.animation,
            show_activity_indicator: interaction.show_activity_indicator,
            wifi,
        };
        render(p, |canvas| compositor::draw_dashboard(canvas, &frame));

        interaction.animation.advance();
        Control::Continue
    }

    /// Associate with the configured network, blocking until connected or
    /// until the timeout ends in a restart. Quiet mode draws nothing.
    fn connect<P: Platform>(&mut self, p: &mut P, quiet: bool) -> Control {
        loop {
            let now = p.uptime_ms();
            let RuntimeState {
                settings,
                interaction,
                link,
            } = &mut self.state;

            match link.poll(now, p, &settings.wifi_ssid, &settings.wifi_password) {
                ConnectStep::Connected => {
                    if !quiet {
                        render(p, |canvas| compositor::draw_status(canvas, "WiFi connected!", None));
                    }
                    return Control::Continue;
                }
                ConnectStep::Pending => {
                    if !quiet {
                        let step = interaction.animation;
                        render(p, |canvas| compositor::draw_status(canvas, "WiFi setup...", Some(step)));
                    }
                    interaction.animation.advance();
                    p.delay_ms(CONNECT_POLL_MS);
                }
                ConnectStep::TimedOut | ConnectStep::Failed => return self.fail_connect(p),
            }
        }
    }

    fn fail_connect<P: Platform>(&mut self, p: &mut P) -> Control {
        log::error!("WiFi setup failed, restarting in {}s!", CONNECT_FAILURE_PAUSE_MS / 1000);
        render(p, |canvas| compositor::draw_status(canvas, "WiFi setup FAILED!", None));
        p.delay_ms(CONNECT_FAILURE_PAUSE_MS);
        Control::Restart
    }

    /// Retry until the clock reports a valid time, as long as the link is up.
    fn sync_time<P: Platform>(&mut self, p: &mut P) {
        log::info!("Synchronising time...");
        let mut attempts = 0u32;
        while p.is_connected() && !p.update() {
            attempts += 1;
            if p.force_update() {
                break;
            }
            p.delay_ms(TIME_SYNC_RETRY_MS);
        }
        log::debug!("Time sync finished after {} forced attempts", attempts);
    }

    fn enter_sleep<P: Platform>(&mut self, p: &mut P) -> Control {
        render(p, |canvas| compositor::draw_status(canvas, "Turning off...", None));
        p.delay_ms(SLEEP_PAUSE_MS);
        if let Err(e) = p.set_display_enabled(false) {
            log::warn!("Failed to turn the display off: {:?}", e);
        }
        log::info!("Going to sleep now");
        Control::Suspend
    }

    fn apply_settings<P: Platform>(&mut self, submission: SettingsSubmission, p: &mut P) -> Control {
        let next = submission.resolve(&self.store.defaults());

        // The live record is kept even if flash lags behind
        if let Err(e) = self.store.save(&next) {
            log::error!("Failed to save configuration: {}", e);
        }

        let restart = self.state.settings.requires_restart(&next);
        self.state.settings = next;

        self.apply_display(p);
        log::set_max_level(max_log_level(self.state.settings.debug_mode));

        if restart {
            log::info!("Restarting to apply new settings");
            p.delay_ms(RESTART_PAUSE_MS);
            return Control::Restart;
        }
        Control::Continue
    }

    fn apply_display<P: Platform>(&mut self, p: &mut P) {
        let settings = &self.state.settings;
        if let Err(e) = p.configure_display(settings.screen_brightness, settings.invert_screen) {
            log::warn!("Failed to configure display: {:?}", e);
        }
    }
}

/// Draw a full frame and push it to the panel. Drawing failures are logged
/// and never stop the caller.
fn render<P, F>(p: &mut P, draw: F)
where
    P: Board,
    F: FnOnce(&mut P::Canvas) -> Result<(), P::DrawError>,
{
    if let Err(e) = draw(p.canvas()) {
        log::warn!("Failed to draw frame: {:?}", e);
        return;
    }
    if let Err(e) = p.present() {
        log::warn!("Failed to update display: {:?}", e);
    }
}
