//! Cutout compositing CLI tool
//!
//! Command-line interface for recoloring backgrounds behind subject cutouts,
//! painting mask overlays and running segmentation sessions on files.

#[cfg(feature = "cli")]
use cutout_compose::cli;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    panic!("CLI feature not enabled. Please rebuild with --features cli");
}
