#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Forest-fire dashboard server.
//!
//! Loads and joins the sources, writes the joined `GeoJSON` artifact and
//! serves the aggregation API. With `--prepare-only` the process exits
//! after the artifact is written.

use clap::Parser as _;
use fire_map_server::{Args, DashboardConfig, DashboardContext, run_server};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let args = Args::parse();

    let prepared = DashboardConfig::resolve(&args).and_then(|config| {
        let context = DashboardContext::prepare(&config)?;
        Ok((config, context))
    });
    let (config, context) = match prepared {
        Ok(prepared) => prepared,
        Err(e) => {
            log::error!("Startup aborted: {e}");
            return Err(std::io::Error::other(e));
        }
    };

    let join = &context.report.join;
    log::info!(
        "Joined {} rows ({} matched communes, {} without incidents)",
        join.output_rows,
        join.matched_boundaries,
        join.unmatched_boundaries
    );

    if args.prepare_only {
        log::info!("Prepare-only run, not starting the server");
        return Ok(());
    }

    run_server(&config, context).await
}
