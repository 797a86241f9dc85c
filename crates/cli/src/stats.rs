//! Run statistics.

use std::collections::BTreeMap;
use std::time::Duration;

use contracts::BroadcastSummary;
use dispatcher::MetricsSnapshot;
use gateway::{GatewayResponse, Route};
use observability::BroadcastStatsAggregator;

/// Statistics from one `run` invocation
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    /// Events handed to the gateway
    pub events: u64,

    /// Lines that did not parse as events
    pub rejected: u64,

    /// Responses per status code
    pub responses: BTreeMap<u16, u64>,

    /// Messages drained by attached connections
    pub received: u64,

    /// Wall time of the run
    pub duration: Duration,

    /// Broadcast aggregates parsed from `sendmessage` responses
    pub broadcasts: BroadcastStatsAggregator,

    /// Dispatcher counters at the end of the run
    pub dispatch: MetricsSnapshot,
}

impl RunStats {
    /// Count one handled event
    pub fn record(&mut self, route: &Route, response: &GatewayResponse, elapsed: Duration) {
        self.events += 1;
        *self
            .responses
            .entry(response.status_code.as_u16())
            .or_insert(0) += 1;

        if *route != Route::SendMessage || !response.is_success() {
            return;
        }
        let summary = response
            .body
            .as_deref()
            .and_then(|body| serde_json::from_str::<BroadcastSummary>(body).ok());
        if let Some(summary) = summary {
            self.broadcasts.update_summary(&summary, elapsed);
        }
    }

    pub fn record_rejected(&mut self) {
        self.rejected += 1;
        *self.responses.entry(400).or_insert(0) += 1;
    }

    pub fn events_per_sec(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.events as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== Run Statistics ===\n");
        println!("Overview");
        println!("   Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   Events: {} ({:.2}/s)", self.events, self.events_per_sec());
        println!("   Rejected lines: {}", self.rejected);
        for (code, count) in &self.responses {
            println!("   HTTP {}: {}", code, count);
        }
        println!("   Messages received by connections: {}", self.received);

        println!("\n{}", self.broadcasts.summary());

        println!("Dispatcher");
        println!("   Peak in-flight sends: {}", self.dispatch.peak_in_flight);
        println!(
            "   Stale cleanup: {} ok, {} failed",
            self.dispatch.cleanup_ok, self.dispatch.cleanup_failed
        );
        println!();
    }
}
