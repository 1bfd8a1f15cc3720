use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::watch::Receiver;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Periodic maintenance work owned by a store or cache. The service keeps its
/// own watch channel; `stop` flips it and the runner loop exits.
#[async_trait]
pub trait BackgroundService: Send + Sync {
    fn background_period(&self) -> Duration;

    async fn background(&mut self);

    fn cancel_token(&self) -> Receiver<bool>;

    async fn stop(&mut self);
}

pub fn spawn_background<S>(mut service: S) -> JoinHandle<()>
where
    S: BackgroundService + 'static,
{
    tokio::spawn(async move {
        let mut cancel = service.cancel_token();
        let mut ticker = tokio::time::interval(service.background_period());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // interval fires immediately once; skip that tick
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => service.background().await,
                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow() {
                        break;
                    }
                }
            }
        }
    })
}
