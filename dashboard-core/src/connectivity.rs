/// Wireless link state machine and signal quality buckets
use crate::platform::WifiLink;

/// Association must succeed within this window or the device restarts
pub const WIFI_TIMEOUT_MS: u32 = 15_000;

/// Cadence of status checks while associating
pub const CONNECT_POLL_MS: u32 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connecting { since: u32 },
    Connected,
    /// Terminal until the device restarts
    Failed,
}

/// Outcome of one [`ConnectionManager::poll`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectStep {
    Pending,
    Connected,
    /// The association window just ran out. Reported once.
    TimedOut,
    /// Already failed on an earlier poll
    Failed,
}

/// Signal quality tier shown by the Wi-Fi indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConnectionQuality {
    NoSignal,
    Weak,
    Fair,
    Strong,
}

impl ConnectionQuality {
    pub fn from_rssi(rssi: i32) -> Self {
        match rssi {
            r if r >= -67 => ConnectionQuality::Strong,
            r if r >= -70 => ConnectionQuality::Fair,
            r if r >= -80 => ConnectionQuality::Weak,
            _ => ConnectionQuality::NoSignal,
        }
    }

    /// Number of indicator arcs lit for this tier
    pub fn arcs(self) -> u8 {
        match self {
            ConnectionQuality::NoSignal => 0,
            ConnectionQuality::Weak => 1,
            ConnectionQuality::Fair => 2,
            ConnectionQuality::Strong => 3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConnectionManager {
    state: LinkState,
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            state: LinkState::Disconnected,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == LinkState::Connected
    }

    /// Advance the link state machine by one check.
    ///
    /// Starts association when disconnected or when an established link was
    /// lost, and reports [`ConnectStep::TimedOut`] exactly once when no link
    /// came up within [`WIFI_TIMEOUT_MS`].
    pub fn poll<W: WifiLink + ?Sized>(
        &mut self,
        now: u32,
        link: &mut W,
        ssid: &str,
        password: &str,
    ) -> ConnectStep {
        match self.state {
            LinkState::Failed => return ConnectStep::Failed,
            LinkState::Disconnected => self.begin(now, link, ssid, password),
            LinkState::Connected => {
                if link.is_connected() {
                    return ConnectStep::Connected;
                }
                log::warn!("WiFi link lost, reconnecting");
                self.begin(now, link, ssid, password);
            }
            LinkState::Connecting { .. } => {}
        }

        let LinkState::Connecting { since } = self.state else {
            return ConnectStep::Pending;
        };

        if link.is_connected() {
            log::info!("WiFi connected after {} ms", now.wrapping_sub(since));
            self.state = LinkState::Connected;
            ConnectStep::Connected
        } else if now.wrapping_sub(since) >= WIFI_TIMEOUT_MS {
            log::error!("WiFi setup failed after {} ms", WIFI_TIMEOUT_MS);
            self.state = LinkState::Failed;
            ConnectStep::TimedOut
        } else {
            ConnectStep::Pending
        }
    }

    /// Classify the current signal, `None` while not connected.
    pub fn quality<W: WifiLink + ?Sized>(&self, link: &W) -> Option<ConnectionQuality> {
        self.is_connected()
            .then(|| ConnectionQuality::from_rssi(link.rssi()))
    }

    fn begin<W: WifiLink + ?Sized>(&mut self, now: u32, link: &mut W, ssid: &str, password: &str) {
        log::info!("Connecting to WiFi '{}'", ssid);
        link.begin(ssid, password);
        self.state = LinkState::Connecting { since: now };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Link that comes up after a fixed number of status checks
    struct ScriptedLink {
        connect_after: Option<usize>,
        checks: usize,
        begins: usize,
        up: bool,
        rssi: i32,
    }

    impl ScriptedLink {
        fn new(connect_after: Option<usize>) -> Self {
            Self {
                connect_after,
                checks: 0,
                begins: 0,
                up: false,
                rssi: -60,
            }
        }
    }

    impl WifiLink for ScriptedLink {
        fn begin(&mut self, _ssid: &str, _password: &str) {
            self.begins += 1;
            self.checks = 0;
            self.up = false;
        }

        fn is_connected(&self) -> bool {
            self.up
        }

        fn rssi(&self) -> i32 {
            self.rssi
        }
    }

    impl ScriptedLink {
        fn tick(&mut self) {
            self.checks += 1;
            if self.connect_after.is_some_and(|n| self.checks > n) {
                self.up = true;
            }
        }
    }

    #[test]
    fn test_quality_tiers() {
        assert_eq!(ConnectionQuality::from_rssi(-50).arcs(), 3);
        assert_eq!(ConnectionQuality::from_rssi(-67).arcs(), 3);
        assert_eq!(ConnectionQuality::from_rssi(-68).arcs(), 2);
        assert_eq!(ConnectionQuality::from_rssi(-70).arcs(), 2);
        assert_eq!(ConnectionQuality::from_rssi(-75).arcs(), 1);
        assert_eq!(ConnectionQuality::from_rssi(-80).arcs(), 1);
        assert_eq!(ConnectionQuality::from_rssi(-81).arcs(), 0);
    }

    #[test]
    fn test_connects_within_window() {
        let mut link = ScriptedLink::new(Some(3));
        let mut manager = ConnectionManager::new();
        let mut now = 0;
        loop {
            match manager.poll(now, &mut link, "ssid", "pw") {
                ConnectStep::Connected => break,
                ConnectStep::Pending => {}
                other => panic!("unexpected step {:?}", other),
            }
            link.tick();
            now += CONNECT_POLL_MS;
        }
        assert_eq!(link.begins, 1);
        assert!(manager.is_connected());
        assert_eq!(manager.quality(&link), Some(ConnectionQuality::Strong));
    }

    #[test]
    fn test_times_out_exactly_once() {
        let mut link = ScriptedLink::new(None);
        let mut manager = ConnectionManager::new();
        let mut timeouts = 0;
        let mut first_timeout = None;
        for i in 0..100u32 {
            let now = i * CONNECT_POLL_MS;
            if manager.poll(now, &mut link, "ssid", "pw") == ConnectStep::TimedOut {
                timeouts += 1;
                first_timeout.get_or_insert(now);
            }
        }
        assert_eq!(timeouts, 1);
        assert_eq!(first_timeout, Some(WIFI_TIMEOUT_MS));
        assert_eq!(manager.state(), LinkState::Failed);
        assert_eq!(manager.poll(100_000, &mut link, "ssid", "pw"), ConnectStep::Failed);
        assert_eq!(link.begins, 1);
    }

    #[test]
    fn test_link_loss_reenters_connecting() {
        let mut link = ScriptedLink::new(Some(0));
        let mut manager = ConnectionManager::new();
        manager.poll(0, &mut link, "ssid", "pw");
        link.tick();
        assert_eq!(manager.poll(500, &mut link, "ssid", "pw"), ConnectStep::Connected);

        link.up = false;
        link.connect_after = None;
        assert_eq!(manager.poll(10_000, &mut link, "ssid", "pw"), ConnectStep::Pending);
        assert_eq!(manager.state(), LinkState::Connecting { since: 10_000 });
        assert_eq!(manager.quality(&link), None);
        assert_eq!(link.begins, 2);
    }
}
