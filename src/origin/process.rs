//! Sub-process origin binding: a caller-supplied argv launches a child
//! that is health-probed until ready, then torn down on `stop`.
//!
//! Shaped after `crawl_engine/core.rs`'s subprocess/browser teardown
//! discipline (SIGTERM, grace period, SIGKILL) and
//! `browser_pool/mod.rs`'s health-probe-before-use idiom.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::time::Instant;

use crate::error::CrawlerError;

const TERM_GRACE: Duration = Duration::from_secs(5);
const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct ProcessOrigin {
    child: Child,
    origin: String,
}

impl ProcessOrigin {
    /// Launch `argv`, then block until a GET to `origin`'s `/` succeeds
    /// or `ready_timeout` elapses.
    pub async fn spawn(argv: &[String], origin: String, ready_timeout: Duration) -> Result<Self, CrawlerError> {
        let (program, args) = argv.split_first().ok_or(CrawlerError::BootTimeout(ready_timeout))?;

        let child = Command::new(program)
            .args(args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        let binding = Self { child, origin };
        binding.wait_until_ready(ready_timeout).await?;
        Ok(binding)
    }

    async fn wait_until_ready(&self, timeout: Duration) -> Result<(), CrawlerError> {
        let deadline = Instant::now() + timeout;
        let client = reqwest::Client::new();
        loop {
            if client.get(&self.origin).send().await.is_ok() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(CrawlerError::BootTimeout(timeout));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    pub fn origin_url(&self) -> &str {
        &self.origin
    }

    /// A periodic liveness check; the crawl loop treats `false` as fatal.
    pub async fn alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// SIGTERM, wait briefly, then SIGKILL.
    pub async fn teardown(mut self) {
        #[cfg(unix)]
        if let Some(pid) = self.child.id() {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;
            let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
            if tokio::time::timeout(TERM_GRACE, self.child.wait()).await.is_ok() {
                return;
            }
        }

        let _ = self.child.start_kill();
        let _ = self.child.wait().await;
    }
}
