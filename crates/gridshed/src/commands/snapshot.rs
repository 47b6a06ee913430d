//! `snapshot`: dump every read-only gateway endpoint as one document.

use crate::cli::{GlobalOpts, SnapshotArgs};
use crate::error::CliError;

pub async fn handle(args: SnapshotArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut ctx = super::build_context(global)?;
    let snapshot = ctx.snapshot().await?;

    let body = serde_json::to_string_pretty(&snapshot)?;
    match args.output {
        Some(path) => {
            std::fs::write(&path, body)?;
            if !global.quiet {
                eprintln!("Snapshot written to {}", path.display());
            }
        }
        None => println!("{body}"),
    }
    Ok(())
}
