// service/background_jobs.rs
use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};

use crate::db::{db::DBClient, dealdb::DealExt};
use crate::models::dealmodel::compute_payout;

/// Handle to the auto-completion reaper. `start` spawns the loop; `stop`
/// signals cancellation and awaits the task, letting an in-flight cycle
/// finish. Each deal's completion is a single guarded update, so stopping
/// never leaves a deal half-mutated.
pub struct AutoCompleteJob {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl AutoCompleteJob {
    pub fn start(
        db_client: Arc<DBClient>,
        commission_percent: i64,
        review_period_hours: i64,
        poll_interval_secs: u64,
    ) -> Self {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker = interval(Duration::from_secs(poll_interval_secs));

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match run_auto_complete_cycle(&db_client, commission_percent, review_period_hours).await {
                            Ok(0) => {}
                            Ok(completed) => {
                                tracing::info!("auto-completion cycle completed {} deal(s)", completed)
                            }
                            // Storage hiccups are retried next cycle; the loop never dies.
                            Err(e) => tracing::error!("auto-completion cycle failed: {}", e),
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        tracing::info!("auto-completion job: shutdown requested, exiting loop");
                        break;
                    }
                }
            }
        });

        Self { shutdown_tx, handle }
    }

    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.handle.await;
    }
}

/// Submissions at or before this instant have exhausted their review window.
pub fn review_window_cutoff(
    now: DateTime<Utc>,
    review_period_hours: i64,
) -> DateTime<Utc> {
    now - ChronoDuration::hours(review_period_hours)
}

/// One reaper cycle: force-complete every deal whose review window has
/// elapsed, with the same payout computation as a manual confirm. The
/// per-deal update is guarded on `work_submitted`, so a deal completed by a
/// previous cycle (or by the advertiser meanwhile) is simply skipped.
pub async fn run_auto_complete_cycle(
    db_client: &DBClient,
    commission_percent: i64,
    review_period_hours: i64,
) -> Result<usize, sqlx::Error> {
    let cutoff = review_window_cutoff(Utc::now(), review_period_hours);
    let stale = db_client.find_deals_past_review_window(cutoff).await?;

    let mut completed = 0usize;
    for deal in stale {
        let (fee, payout) = compute_payout(deal.budget, commission_percent);
        match db_client.auto_complete_deal(deal.id, fee, payout).await? {
            Some(done) => {
                completed += 1;
                tracing::info!(
                    deal_id = %done.id,
                    platform_fee = fee,
                    creator_payout = payout,
                    "deal auto-completed after review window"
                );
            }
            None => {
                // Lost the guard to a concurrent confirm/dispute; nothing to do.
            }
        }
    }

    Ok(completed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn submission_older_than_the_window_qualifies() {
        let now = fixed_now();
        let cutoff = review_window_cutoff(now, 24);

        let submitted = now - ChronoDuration::hours(25);
        assert!(submitted <= cutoff);
    }

    #[test]
    fn fresh_submission_does_not_qualify() {
        let now = fixed_now();
        let cutoff = review_window_cutoff(now, 24);

        let submitted = now - ChronoDuration::hours(23);
        assert!(submitted > cutoff);
    }

    #[test]
    fn submission_exactly_at_the_window_boundary_qualifies() {
        let now = fixed_now();
        let cutoff = review_window_cutoff(now, 24);

        // The candidate query selects work_submitted_at <= cutoff.
        let submitted = now - ChronoDuration::hours(24);
        assert!(submitted <= cutoff);
    }
}
