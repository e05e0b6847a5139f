use std::sync::Arc;

use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::mqtt::Publisher;
use crate::neato::Robot;

use super::topic_map::{TopicMap, map_state};
use super::{Bridge, Lifecycle};

impl<R: Robot, P: Publisher> Bridge<R, P> {
    /// Publish every topic for the current robot state and seed the cache.
    ///
    /// Returns how many topics were published successfully.
    pub async fn publish_all(&self) -> Result<usize, Error> {
        let state = self.robot.get_robot_state().await?;
        let map = map_state(&self.root, &state);
        let published = self.publish_entries(&map).await;
        self.cache.replace(map);
        Ok(published)
    }

    /// Fetch state and publish only the topics that changed since the last refresh.
    ///
    /// The cache is replaced even when nothing changed.
    pub async fn refresh(&self) -> Result<usize, Error> {
        let state = self.robot.get_robot_state().await?;
        let changes = self.cache.swap_changes(map_state(&self.root, &state));
        debug!("Refresh found {} changed topics", changes.len());
        Ok(self.publish_entries(&changes).await)
    }

    async fn publish_entries(&self, entries: &TopicMap) -> usize {
        let mut published = 0;
        for (topic, value) in entries {
            info!("Publishing {}: {}", topic, value);
            match self.publisher.publish(topic, value).await {
                Ok(()) => published += 1,
                Err(e) => warn!("{}", e),
            }
        }
        published
    }
}

impl<R: Robot + 'static, P: Publisher + 'static> Bridge<R, P> {
    /// Publish the full state, then refresh every `refresh_interval`.
    ///
    /// On failure the bridge is left stopped and no timer runs.
    pub async fn start(self: &Arc<Self>) -> Result<(), Error> {
        {
            let mut lifecycle = self.lifecycle.lock();
            if *lifecycle != Lifecycle::Stopped {
                return Err(Error::Lifecycle {
                    action: "start",
                    state: *lifecycle,
                });
            }
            *lifecycle = Lifecycle::Starting;
        }

        let result = self.publish_all().await;

        let mut lifecycle = self.lifecycle.lock();
        let published = match result {
            Ok(published) => published,
            Err(e) => {
                *lifecycle = Lifecycle::Stopped;
                return Err(e);
            }
        };
        info!("Published {} topics under {}", published, self.root);

        // stop() arrived while the startup publish was running
        if *lifecycle == Lifecycle::Stopping {
            *lifecycle = Lifecycle::Stopped;
            info!("Stop requested during startup, not refreshing {}", self.root);
            return Ok(());
        }

        let bridge = Arc::clone(self);
        *self.timer.lock() = Some(tokio::spawn(bridge.run_timer()));
        *lifecycle = Lifecycle::Running;
        info!(
            "Refreshing {} every {:?}",
            self.root, self.refresh_interval
        );
        Ok(())
    }

    /// Stop the refresh timer. In-flight refreshes are left to finish.
    ///
    /// Called during startup, the bridge ends up stopped once the startup
    /// publish completes and no timer is started.
    pub fn stop(&self) {
        let mut lifecycle = self.lifecycle.lock();
        match *lifecycle {
            Lifecycle::Running => {}
            Lifecycle::Starting => {
                *lifecycle = Lifecycle::Stopping;
                return;
            }
            Lifecycle::Stopping | Lifecycle::Stopped => return,
        }
        *lifecycle = Lifecycle::Stopping;
        if let Some(timer) = self.timer.lock().take() {
            timer.abort();
        }
        *lifecycle = Lifecycle::Stopped;
        info!("Stopped refreshing {}", self.root);
    }

    async fn run_timer(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.refresh_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // Skip first tick (startup publish already ran)
        ticker.tick().await;

        loop {
            ticker.tick().await;
            // Own task, so stopping the timer never cancels a refresh midway.
            let bridge = Arc::clone(&self);
            tokio::spawn(async move {
                if let Err(e) = bridge.refresh().await {
                    warn!("Scheduled refresh of {} failed: {}", bridge.root, e);
                }
            });
        }
    }
}
