//! Interactive REPL for valuebridge
//!
//! Bridges the configured bindings against an in-memory broker so their
//! behaviour can be exercised by hand: write local values, play the part of
//! another broker client, and inspect both sides.

mod session;

pub use session::{ReplCommand, ReplSession, SlashResult};

use eyre::Result;

use crate::config::Config;
use crate::events::spawn_event_logger;

/// Run the interactive REPL
///
/// This is the main entry point for `vb run`.
pub async fn run_interactive(config: &Config) -> Result<()> {
    let mut session = ReplSession::new(config)?;
    let _logger = spawn_event_logger(session.bridge().subscribe());
    let result = session.run().await;
    session.close().await?;
    result
}
