//! Resolution failures.
//!
//! None of these ever reach a client; the resolver recovers from all of them
//! by moving on to the next source.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// Configured header absent or empty.
    #[error("no {0} header found")]
    HeaderMissing(String),

    /// Header present but no segment matched either grammar.
    #[error("no parseable address in {header} header: {value}")]
    NoParseableCandidate { header: String, value: String },

    /// Every parsed candidate belongs to a trusted proxy network.
    #[error("all addresses in {header} header are trusted proxies: {value}")]
    AllCandidatesTrusted { header: String, value: String },

    /// Transport peer address is not `ip:port`.
    #[error("unable to parse peer address {0:?}")]
    MalformedPeerAddress(String),
}
