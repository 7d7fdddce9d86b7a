use anyhow::Result;
use clap::Parser;
use sitecast::{cli::Cli, Crawler};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let out_dir = cli.out.clone();
    let config = cli.into_config()?;

    let mut crawler = Crawler::new(config);
    crawler.start().await?;
    crawler.crawl().await?;
    crawler.stop().await;

    crawler.save_all(std::path::Path::new(&out_dir))?;

    let stats = crawler.statistics();
    let frontier_stats = crawler.frontier().stats();
    log::info!(
        "crawl finished: {} succeeded, {} failed, {} pending",
        stats.success_count,
        stats.error_count,
        frontier_stats.pending
    );

    Ok(())
}
