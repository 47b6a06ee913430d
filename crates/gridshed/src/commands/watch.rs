//! `watch` and `status`: the poll loop and a single-cycle probe.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;

use gridshed_core::{InventorySummary, LogBreaker, Poller, SummarySink};

use crate::cli::{GlobalOpts, WatchArgs};
use crate::error::CliError;

/// Sink that prints each cycle's rendering to stdout.
struct StdoutSink {
    quiet: bool,
}

impl SummarySink for StdoutSink {
    fn emit(&mut self, summary: &InventorySummary) {
        if !self.quiet {
            println!("{}", summary.render());
        }
    }
}

/// Poll on an interval until interrupted.
pub async fn watch(args: WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    if args.interval == 0 {
        return Err(CliError::Validation {
            field: "interval".into(),
            reason: "must be at least 1 second".into(),
        });
    }

    let ctx = super::build_context(global)?;
    let mut poller = Poller::new(ctx, LogBreaker, StdoutSink { quiet: global.quiet });

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received; shutting down");
            signal_cancel.cancel();
        }
    });

    poller
        .run(Duration::from_secs(args.interval), cancel)
        .await;
    Ok(())
}

/// Run exactly one poll cycle and print the summary.
pub async fn status(global: &GlobalOpts) -> Result<(), CliError> {
    let ctx = super::build_context(global)?;
    let mut poller = Poller::new(ctx, LogBreaker, StdoutSink { quiet: global.quiet });

    let summary = poller.cycle().await?;
    if global.quiet {
        // Quiet mode still reports the one thing scripts care about.
        println!("{}", summary.grid_status);
    }
    Ok(())
}
