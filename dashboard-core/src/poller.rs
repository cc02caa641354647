/// Guarded sensor polling over an asynchronous HTTP transport
use thiserror::Error;

use crate::interaction::InteractionState;
use crate::reading::{parse_reading, SensorKind, SensorReading};
use crate::settings::DeviceSettings;

/// Responses larger than this are cut before parsing
pub const SENSOR_RESPONSE_LIMIT: usize = 4096;

/// Lifecycle of the single request a poller may have outstanding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Unsent,
    Opened,
    HeadersReceived,
    Loading,
    Done,
}

impl ReadyState {
    /// A new request may only be issued from these states
    pub fn is_idle(self) -> bool {
        matches!(self, ReadyState::Unsent | ReadyState::Done)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorRequest {
    pub kind: SensorKind,
    pub url: String,
    pub authorization: String,
}

impl SensorRequest {
    pub fn headers(&self) -> [(&str, &str); 2] {
        [
            ("Accept", "application/json"),
            ("Authorization", self.authorization.as_str()),
        ]
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request could not be opened: {0}")]
    Unavailable(String),
}

/// Starts requests without waiting for them. Progress and completion come
/// back later as [`HttpEvent`]s tagged with the sensor kind.
pub trait HttpTransport {
    fn submit(&mut self, request: SensorRequest) -> Result<(), TransportError>;
}

impl<T: HttpTransport + ?Sized> HttpTransport for &mut T {
    fn submit(&mut self, request: SensorRequest) -> Result<(), TransportError> {
        (**self).submit(request)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpEvent {
    Progress(ReadyState),
    Completed { status: u16, body: Vec<u8> },
    /// The request died in the network layer without a response
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    Sent,
    /// A previous request is still outstanding
    Busy,
    /// The request could not be built or opened; the next tick retries
    Dropped,
}

pub struct SensorPoller<T> {
    kind: SensorKind,
    transport: T,
    ready_state: ReadyState,
    reading: SensorReading,
}

impl<T: HttpTransport> SensorPoller<T> {
    pub fn new(kind: SensorKind, transport: T) -> Self {
        Self::with_reading(kind, transport, SensorReading::no_value())
    }

    /// Start from a reading retained across deep sleep
    pub fn with_reading(kind: SensorKind, transport: T, reading: SensorReading) -> Self {
        Self {
            kind,
            transport,
            ready_state: ReadyState::Unsent,
            reading,
        }
    }

    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    pub fn reading(&self) -> &SensorReading {
        &self.reading
    }

    pub fn ready_state(&self) -> ReadyState {
        self.ready_state
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Issue a request unless one is already in flight.
    pub fn trigger_request(&mut self, settings: &DeviceSettings) -> TriggerOutcome {
        if !self.ready_state.is_idle() {
            log::debug!("{} sensor request still in flight, skipping", self.kind.label());
            return TriggerOutcome::Busy;
        }

        let sensor_id = match self.kind {
            SensorKind::Inside => settings.in_sensor_id.as_str(),
            SensorKind::Outside => settings.out_sensor_id.as_str(),
        };
        if settings.base_url.is_empty() || sensor_id.is_empty() {
            log::warn!("Can't send {} sensor request: no endpoint configured", self.kind.label());
            return TriggerOutcome::Dropped;
        }

        let request = SensorRequest {
            kind: self.kind,
            url: format!("{}{}", settings.base_url, sensor_id),
            authorization: format!("Bearer {}", settings.auth_token),
        };
        log::debug!("GET {}", request.url);

        match self.transport.submit(request) {
            Ok(()) => {
                self.ready_state = ReadyState::Opened;
                TriggerOutcome::Sent
            }
            Err(e) => {
                log::warn!("Can't open {} sensor request: {}", self.kind.label(), e);
                TriggerOutcome::Dropped
            }
        }
    }

    /// Apply one progress or completion report for this poller's request.
    ///
    /// Only a 200 response with a parseable body replaces the reading; every
    /// other outcome leaves the previous value in place.
    pub fn on_http_event(&mut self, event: HttpEvent, interaction: &mut InteractionState) {
        match event {
            HttpEvent::Progress(state) => {
                self.ready_state = state;
                interaction.show_activity_indicator = true;
            }
            HttpEvent::Completed { status, body } => {
                self.ready_state = ReadyState::Done;
                interaction.show_activity_indicator = false;

                if status != 200 {
                    log::warn!("{} sensor responded with HTTP {}", self.kind.label(), status);
                    return;
                }

                let body = &body[..body.len().min(SENSOR_RESPONSE_LIMIT)];
                match parse_reading(self.kind, body) {
                    Ok(reading) => {
                        log::debug!("{} sensor reading: {}", self.kind.label(), reading);
                        self.reading = reading;
                    }
                    Err(e) => log::warn!("{} sensor response rejected: {}", self.kind.label(), e),
                }
            }
            HttpEvent::Failed(reason) => {
                self.ready_state = ReadyState::Done;
                interaction.show_activity_indicator = false;
                log::warn!("{} sensor request failed: {}", self.kind.label(), reason);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{bounded_text, FactoryDefaults};

    #[derive(Default)]
    struct RecordingTransport {
        sent: Vec<SensorRequest>,
        refuse: bool,
    }

    impl HttpTransport for RecordingTransport {
        fn submit(&mut self, request: SensorRequest) -> Result<(), TransportError> {
            if self.refuse {
                return Err(TransportError::Unavailable("no socket".to_string()));
            }
            self.sent.push(request);
            Ok(())
        }
    }

    fn settings() -> DeviceSettings {
        DeviceSettings::defaults(&FactoryDefaults {
            wifi_ssid: "ssid",
            wifi_password: "pw",
            base_url: "http://hass.local:8123/api/states/",
            auth_token: "t0ken",
            in_sensor_id: "sensor.living_room",
            out_sensor_id: "weather.home",
        })
    }

    fn ok(body: &str) -> HttpEvent {
        HttpEvent::Completed {
            status: 200,
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_request_carries_url_and_headers() {
        let mut poller = SensorPoller::new(SensorKind::Outside, RecordingTransport::default());
        assert_eq!(poller.trigger_request(&settings()), TriggerOutcome::Sent);

        let request = &poller.transport().sent[0];
        assert_eq!(request.url, "http://hass.local:8123/api/states/weather.home");
        assert_eq!(
            request.headers(),
            [("Accept", "application/json"), ("Authorization", "Bearer t0ken")]
        );
    }

    #[test]
    fn test_trigger_is_skipped_while_busy() {
        let mut poller = SensorPoller::new(SensorKind::Inside, RecordingTransport::default());
        let mut interaction = InteractionState::new();

        assert_eq!(poller.trigger_request(&settings()), TriggerOutcome::Sent);
        assert_eq!(poller.trigger_request(&settings()), TriggerOutcome::Busy);
        poller.on_http_event(HttpEvent::Progress(ReadyState::Loading), &mut interaction);
        assert_eq!(poller.trigger_request(&settings()), TriggerOutcome::Busy);

        poller.on_http_event(ok(r#"{"state":"22.1"}"#), &mut interaction);
        assert_eq!(poller.trigger_request(&settings()), TriggerOutcome::Sent);
        assert_eq!(poller.transport().sent.len(), 2);
    }

    #[test]
    fn test_refused_request_is_dropped_and_retried() {
        let mut poller = SensorPoller::new(
            SensorKind::Inside,
            RecordingTransport {
                refuse: true,
                ..Default::default()
            },
        );
        assert_eq!(poller.trigger_request(&settings()), TriggerOutcome::Dropped);
        assert_eq!(poller.ready_state(), ReadyState::Unsent);

        poller.transport_mut().refuse = false;
        assert_eq!(poller.trigger_request(&settings()), TriggerOutcome::Sent);
    }

    #[test]
    fn test_missing_endpoint_is_dropped() {
        let mut settings = settings();
        settings.base_url = bounded_text("");
        let mut poller = SensorPoller::new(SensorKind::Inside, RecordingTransport::default());
        assert_eq!(poller.trigger_request(&settings), TriggerOutcome::Dropped);
        assert!(poller.transport().sent.is_empty());
    }

    #[test]
    fn test_activity_indicator_follows_progress() {
        let mut poller = SensorPoller::new(SensorKind::Inside, RecordingTransport::default());
        let mut interaction = InteractionState::new();
        poller.trigger_request(&settings());

        poller.on_http_event(HttpEvent::Progress(ReadyState::HeadersReceived), &mut interaction);
        assert!(interaction.show_activity_indicator);

        poller.on_http_event(
            HttpEvent::Completed {
                status: 503,
                body: Vec::new(),
            },
            &mut interaction,
        );
        assert!(!interaction.show_activity_indicator);
        assert_eq!(poller.ready_state(), ReadyState::Done);
    }

    #[test]
    fn test_failures_keep_stale_reading() {
        let mut poller = SensorPoller::new(SensorKind::Outside, RecordingTransport::default());
        let mut interaction = InteractionState::new();

        poller.on_http_event(ok(r#"{"attributes":{"temperature":7.26}}"#), &mut interaction);
        assert_eq!(poller.reading().as_str(), "7.3");

        poller.on_http_event(ok("not json"), &mut interaction);
        poller.on_http_event(ok(r#"{"attributes":{}}"#), &mut interaction);
        poller.on_http_event(
            HttpEvent::Completed {
                status: 401,
                body: br#"{"attributes":{"temperature":1.0}}"#.to_vec(),
            },
            &mut interaction,
        );
        poller.on_http_event(HttpEvent::Failed("reset".to_string()), &mut interaction);
        assert_eq!(poller.reading().as_str(), "7.3");

        poller.on_http_event(ok(r#"{"state":"unavailable"}"#), &mut interaction);
        assert!(poller.reading().is_no_value());
    }
}
