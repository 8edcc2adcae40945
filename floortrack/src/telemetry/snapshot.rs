//! Point-in-time view of the pipeline counters.

use std::time::Duration;

/// A copy of the pipeline metrics taken at one instant, safe to hand to
/// display layers without touching the live counters again.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TelemetrySnapshot {
    pub uptime: Duration,
    pub updates_received: u64,
    pub updates_normalized: u64,
    pub transform_failures: u64,
    pub entities_auto_created: u64,
    pub events_emitted: u64,
    pub broadcasts_sent: u64,
    pub broadcast_failures: u64,
    pub subscribers_connected: u64,
    pub subscribers_dropped: u64,
}

impl TelemetrySnapshot {
    /// Subscribers currently attached.
    pub fn subscribers_active(&self) -> u64 {
        self.subscribers_connected
            .saturating_sub(self.subscribers_dropped)
    }

    /// Uptime as `1h 02m 03s`.
    pub fn uptime_human(&self) -> String {
        let total = self.uptime.as_secs();
        let hours = total / 3600;
        let minutes = (total % 3600) / 60;
        let seconds = total % 60;
        if hours > 0 {
            format!("{}h {:02}m {:02}s", hours, minutes, seconds)
        } else {
            format!("{}m {:02}s", minutes, seconds)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uptime_human_formats() {
        let snapshot = TelemetrySnapshot {
            uptime: Duration::from_secs(3723),
            ..Default::default()
        };
        assert_eq!(snapshot.uptime_human(), "1h 02m 03s");

        let snapshot = TelemetrySnapshot {
            uptime: Duration::from_secs(62),
            ..Default::default()
        };
        assert_eq!(snapshot.uptime_human(), "1m 02s");
    }

    #[test]
    fn test_active_subscribers_never_underflows() {
        let snapshot = TelemetrySnapshot {
            subscribers_connected: 2,
            subscribers_dropped: 5,
            ..Default::default()
        };
        assert_eq!(snapshot.subscribers_active(), 0);
    }
}
