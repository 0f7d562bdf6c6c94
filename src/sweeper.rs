//! Periodic cache sweep for long-running hosts.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::Result;
use crate::frontend::FrontendDb;

/// Run `clear_expired` every `every` until `shutdown` resolves.
///
/// The first sweep happens immediately. Returns the total number of entries removed.
pub async fn sweep_until<F>(db: &FrontendDb, every: Duration, shutdown: F) -> Result<usize>
where
  F: Future<Output = ()>,
{
  let mut ticker = tokio::time::interval(every);
  ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
  tokio::pin!(shutdown);

  let mut total = 0;
  loop {
    tokio::select! {
      _ = &mut shutdown => break,
      _ = ticker.tick() => {
        let removed = db.cache().clear_expired()?;
        if removed > 0 {
          info!(removed, "swept expired cache entries");
        } else {
          debug!("cache sweep found nothing to remove");
        }
        total += removed;
      }
    }
  }

  Ok(total)
}
