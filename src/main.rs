//! # Platform Operator
//!
//! Watches `Platform` resources and drives every platform component through its
//! install, upgrade and uninstall lifecycle.

use anyhow::Result;
use platform_operator::runtime::{initialization::initialize, watch_loop::run_watch_loop};

#[tokio::main]
async fn main() -> Result<()> {
    let init = initialize().await?;
    run_watch_loop(
        init.platforms,
        init.reconciler,
        init.server_state,
        init.controller_config,
    )
    .await
}
