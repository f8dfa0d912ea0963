use std::time::Instant;

use crate::receiver::ProbeOutcome;

/// Aggregate statistics of a ping session
///
/// All times are whole milliseconds. Averages and percentages are rounded half up.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub transmitted: u64,
    pub received: u64,
    pub loss_percent: u64,
    pub rtt_min: u64,
    pub rtt_avg: u64,
    pub rtt_max: u64,
    pub elapsed_ms: u64,
}

/// Integer division of `num` by `den`, rounding half up
fn div_round(num: u64, den: u64) -> u64 {
    (2 * num + den) / (2 * den)
}

impl ProbeReport {
    /// Reduce the outcomes of a session into summary statistics
    ///
    /// `sent` is the number of probes the session was configured with. Probes that produced no
    /// outcome at all, because their transport failed, count as lost.
    ///
    /// # Panics
    ///
    /// Loss cannot be expressed for a session that sent nothing, so this function panics if `sent`
    /// is zero.
    pub fn summarize(outcomes: &[ProbeOutcome], sent: u64, start: Instant, end: Instant) -> Self {
        assert!(sent > 0, "cannot summarize a session without probes");

        let rtts: Vec<u64> = outcomes
            .iter()
            .filter_map(ProbeOutcome::rtt)
            .map(|rtt| rtt.as_millis() as u64)
            .collect();
        let received = rtts.len() as u64;

        let (rtt_min, rtt_avg, rtt_max) = match (rtts.iter().min(), rtts.iter().max()) {
            (Some(&min), Some(&max)) => (min, div_round(rtts.iter().sum(), received), max),
            // Total loss is a valid outcome, not an error
            _ => (0, 0, 0),
        };

        Self {
            transmitted: sent,
            received,
            loss_percent: div_round(100 * sent.saturating_sub(received), sent),
            rtt_min,
            rtt_avg,
            rtt_max,
            elapsed_ms: end.saturating_duration_since(start).as_millis() as u64,
        }
    }
}

/// Summarising information about session outcome
#[derive(Debug)]
pub struct Summary {
    host: String,
    report: ProbeReport,
}

impl Summary {
    pub fn new(host: String, report: ProbeReport) -> Self {
        Self { host, report }
    }

    /// The statistics gathered during the session
    pub fn report(&self) -> &ProbeReport {
        &self.report
    }

    /// Print summary statistics for this ping session
    pub fn tally(&self) {
        let r = &self.report;
        println!("\n--- {} ping statistics ---", self.host);
        println!(
            "{} transmitted, {} received, {}% loss, time {}ms",
            r.transmitted, r.received, r.loss_percent, r.elapsed_ms
        );
        println!(
            "rtt min/avg/max = {}/{}/{} ms",
            r.rtt_min, r.rtt_avg, r.rtt_max
        );
    }
}
