use std::str::FromStr;

use tracing::{debug, error, info};

use crate::error::Error;
use crate::mqtt::Publisher;
use crate::neato::{CleaningFrequency, Robot, StartCleaningParameters, UnknownVariant};

use super::Bridge;
use super::topic_map::StateField;

/// Robot actions reachable through `<root>/<action>/set`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Dock,
    FindMe,
    Start,
    Stop,
    Pause,
    Resume,
    StartPersistentMapExploration,
    EnableSchedule,
    DismissCurrentAlert,
}

impl Command {
    const ROUTES: [(&'static str, Command); 9] = [
        ("/dock/set", Command::Dock),
        ("/findMe/set", Command::FindMe),
        ("/start/set", Command::Start),
        ("/stop/set", Command::Stop),
        ("/pause/set", Command::Pause),
        ("/resume/set", Command::Resume),
        (
            "/startPersistentMapExploration/set",
            Command::StartPersistentMapExploration,
        ),
        ("/enableSchedule/set", Command::EnableSchedule),
        ("/dismissCurrentAlert/set", Command::DismissCurrentAlert),
    ];

    /// Look up the command for a topic with the root already stripped.
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        Self::ROUTES
            .iter()
            .find(|(route, _)| *route == suffix)
            .map(|(_, command)| *command)
    }
}

impl<R: Robot, P: Publisher> Bridge<R, P> {
    /// Handle one inbound message: run its command, if any, then refresh.
    ///
    /// Failures are logged here; a failed command still refreshes.
    pub async fn handle_message(&self, topic: &str, payload: &str) {
        info!("MQTT message received for {}: {}", topic, payload);

        let command = topic
            .strip_prefix(self.root.as_str())
            .and_then(Command::from_suffix);

        match command {
            Some(command) => {
                if let Err(e) = self.dispatch(command, payload).await {
                    error!("{:?} command failed: {}", command, e);
                }
            }
            None => debug!("No command for topic {}", topic),
        }

        if let Err(e) = self.refresh().await {
            error!("Refresh after {} failed: {}", topic, e);
        }
    }

    /// Run the robot call for `command`. Does not refresh.
    pub async fn dispatch(&self, command: Command, payload: &str) -> Result<(), Error> {
        match command {
            Command::Dock => self.robot.send_to_base().await?,
            Command::FindMe => self.robot.find_me().await?,
            Command::Start => {
                let params = self.cleaning_parameters(payload)?;
                info!("Starting cleaning with {:?}", params);
                self.robot.start_cleaning(&params).await?
            }
            Command::Stop => self.robot.stop_cleaning().await?,
            Command::Pause => self.robot.pause_cleaning().await?,
            Command::Resume => self.robot.resume_cleaning().await?,
            Command::StartPersistentMapExploration => {
                self.robot.start_persistent_map_exploration().await?
            }
            Command::EnableSchedule if payload == "true" => self.robot.enable_schedule().await?,
            Command::EnableSchedule => self.robot.disable_schedule().await?,
            Command::DismissCurrentAlert => self.robot.dismiss_current_alert().await?,
        }
        Ok(())
    }

    /// Parameters from a JSON payload, or from the cached cleaning settings
    /// when the payload has no object in it.
    fn cleaning_parameters(&self, payload: &str) -> Result<StartCleaningParameters, Error> {
        if payload.contains('{') {
            return serde_json::from_str(payload).map_err(Error::Decode);
        }

        Ok(StartCleaningParameters {
            category: self.cached(StateField::CleaningCategory)?,
            mode: self.cached(StateField::CleaningMode)?,
            modifier: CleaningFrequency::Normal,
            navigation_mode: self.cached(StateField::CleaningNavigationMode)?,
            spot_width: None,
            spot_height: None,
        })
    }

    fn cached<T: FromStr<Err = UnknownVariant>>(&self, field: StateField) -> Result<T, Error> {
        let key = field.topic(&self.root);
        let value = self
            .cache
            .get(&key)
            .ok_or_else(|| Error::MissingState(key.clone()))?;
        value
            .parse()
            .map_err(|source| Error::InvalidState { key, source })
    }
}
