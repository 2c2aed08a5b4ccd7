use anyhow::{Context, Result};
use tokio::task::LocalSet;
use tracing_subscriber::EnvFilter;

use gallery_view::driver;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("gallery_view=info".parse()?))
        .init();

    let args = driver::parse_args(std::env::args().skip(1))?;

    // Controllers share state through Rc, so everything runs on one thread.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build async runtime")?;
    LocalSet::new().block_on(&runtime, driver::run(args))
}
