//! Inbound commands to the supervisor service.
//!
//! The remote messaging channel delivers free text; the dispatch layer in
//! the composition root maps it onto this closed enum, so the core never
//! parses strings.

/// Commands the remote operator can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Run the full gate pulse sequence (gate relay, then aux release).
    TriggerGate,

    /// Reply with a status snapshot (tier, link, uptime, counters).
    Status,

    /// Liveness echo — replies immediately, no side effects.
    Ping,
}
