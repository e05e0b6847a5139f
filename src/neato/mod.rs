pub mod client;
pub mod types;

use async_trait::async_trait;

pub use types::{
    ActionType, Cleaning, CleaningCategory, CleaningFrequency, CleaningMode, Details,
    NavigationMode, RobotState, StartCleaningParameters, StateType, UnknownVariant,
};

/// Failures talking to the robot.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {0}")]
    Status(reqwest::StatusCode),

    #[error("robot rejected {command}: {result}")]
    Rejected { command: String, result: String },

    #[error("invalid response to {command}: {source}")]
    InvalidResponse {
        command: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to sign request: {0}")]
    Signing(String),
}

/// Operations the bridge needs from a robot.
#[async_trait]
pub trait Robot: Send + Sync {
    async fn get_robot_state(&self) -> Result<RobotState, DeviceError>;

    async fn send_to_base(&self) -> Result<(), DeviceError>;

    async fn find_me(&self) -> Result<(), DeviceError>;

    async fn start_cleaning(&self, params: &StartCleaningParameters) -> Result<(), DeviceError>;

    async fn stop_cleaning(&self) -> Result<(), DeviceError>;

    async fn pause_cleaning(&self) -> Result<(), DeviceError>;

    async fn resume_cleaning(&self) -> Result<(), DeviceError>;

    async fn start_persistent_map_exploration(&self) -> Result<(), DeviceError>;

    async fn enable_schedule(&self) -> Result<(), DeviceError>;

    async fn disable_schedule(&self) -> Result<(), DeviceError>;

    async fn dismiss_current_alert(&self) -> Result<(), DeviceError>;
}
