//! Canonical topology: approved destinations dealt round-robin across the
//! monitored ports.

use super::rules::AllowList;
use crate::graph::AudioGraph;

/// Outcome of one [`ReconnectPolicy::apply`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub attempted: usize,
    pub failed: usize,
}

pub struct ReconnectPolicy<'a> {
    policy: &'a AllowList,
}

impl<'a> ReconnectPolicy<'a> {
    pub fn new(policy: &'a AllowList) -> Self {
        Self { policy }
    }

    /// `(monitored, destination)` pairs in connect order. Destination `i`
    /// goes to monitored port `i mod |monitored|`.
    pub fn assignments(&self) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        let monitored = self.policy.monitored();
        self.policy
            .approved()
            .iter()
            .enumerate()
            .map(move |(i, dest)| (monitored[i % monitored.len()].as_str(), dest.as_str()))
    }

    /// Issue every connect command. Failures are logged and counted; an
    /// already linked pair is left alone by the graph.
    pub fn apply<G: AudioGraph + ?Sized>(&self, graph: &G) -> ApplyReport {
        let mut report = ApplyReport::default();
        for (output, input) in self.assignments() {
            report.attempted += 1;
            log::debug!("reconnect: {} -> {}", output, input);
            if let Err(e) = graph.connect(output, input) {
                report.failed += 1;
                log::warn!("Failed to connect {} -> {}: {}", output, input, e);
            }
        }
        report
    }
}
