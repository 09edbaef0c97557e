//! Periodic sweeper: drives pause timeouts and zone degradation.
//!
//! The engine never reads a clock, so time-based rules only advance
//! when someone sends a `Sweep` command. This task does that on a
//! fixed interval for every registered game.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::GameRegistry;

/// Spawns the background sweeper task.
///
/// Each round sweeps every game, then archives games that have ended
/// or sat idle longer than `max_idle`. The first round is delayed by a
/// random jitter so that several server processes restarting together
/// don't sweep in lockstep. Handles are collected under the lock and
/// swept outside it, so a slow game actor never stalls registry
/// access.
pub fn spawn_sweeper(
    registry: Arc<Mutex<GameRegistry>>,
    interval: Duration,
    max_idle: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let jitter = rand::rng().random_range(0..interval.as_millis().max(1) as u64);
        tokio::time::sleep(Duration::from_millis(jitter)).await;

        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let handles = registry.lock().await.handles();
            tracing::debug!(games = handles.len(), "sweep round");
            for handle in handles {
                if let Err(err) = handle.sweep().await {
                    tracing::warn!(game = %handle.game_id(), %err, "sweep dispatch failed");
                }
            }
            let mut reg = registry.lock().await;
            reg.archive_finished().await;
            reg.archive_idle(max_idle).await;
        }
    })
}
