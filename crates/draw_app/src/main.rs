mod config;
mod logging;

use anyhow::Context;
use clap::Parser;
use draw_engine::{
    backfill, ensure_output_dir, Clock, DigestArchive, FixedOffsetClock, Poller,
    ReqwestResultSource,
};
use relay_logging::{relay_info, relay_warn};

use crate::config::{build_dispatcher, BackfillArgs, Cli, Command, CommonArgs, RunArgs};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is normal.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    logging::initialize(cli.common.log_level, cli.common.log_file.as_deref());

    match cli.command {
        Some(Command::Backfill(args)) => run_backfill(&cli.common, &args).await,
        None => run_relay(&cli.common, &cli.run).await,
    }
}

async fn run_relay(common: &CommonArgs, run: &RunArgs) -> anyhow::Result<()> {
    let feed = common.feed_settings()?;
    let clock = FixedOffsetClock::new(feed.utc_offset);
    let source = ReqwestResultSource::new(feed).context("building feed client")?;

    let dispatcher = build_dispatcher(run, &common.http_settings())?;
    if dispatcher.is_empty() {
        relay_warn!("No channels configured; rounds are tracked but not published");
    }

    let mut poller = Poller::new(
        Box::new(source),
        Box::new(clock),
        dispatcher,
        run.poll_settings(),
    );
    if let Some(dir) = &run.archive_dir {
        ensure_output_dir(dir).with_context(|| format!("preparing archive dir {dir:?}"))?;
        relay_info!("Archiving day files to {:?}", dir);
        poller = poller.with_archive(DigestArchive::new(dir.clone()));
    }

    poller.run().await;
    Ok(())
}

async fn run_backfill(common: &CommonArgs, args: &BackfillArgs) -> anyhow::Result<()> {
    let feed = common.feed_settings()?;
    let today = FixedOffsetClock::new(feed.utc_offset).today();
    let source = ReqwestResultSource::new(feed).context("building feed client")?;

    ensure_output_dir(&args.out_dir)
        .with_context(|| format!("preparing output dir {:?}", args.out_dir))?;
    let archive = DigestArchive::new(args.out_dir.clone());

    let report = backfill(&source, &archive, today, args.days).await?;
    relay_info!(
        "Backfill done: {} day file(s) written, {} day(s) without results",
        report.written.len(),
        report.skipped.len()
    );
    Ok(())
}
