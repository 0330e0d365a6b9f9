//! The SDK's JSON component listing.

use serde::{Deserialize, Serialize};

use crate::errors::SdkError;

/// State name the SDK reports for components with a newer release.
pub const UPDATE_AVAILABLE: &str = "Update Available";

/// Installation state of a component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentState {
    /// Human readable state, e.g. `Installed`, `Not Installed`,
    /// `Update Available`.
    pub name: String,
}

/// One row of `components list --format=json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SdkComponent {
    /// Component id, e.g. `app-engine-java`.
    pub id: String,
    /// Display name.
    pub name: String,
    pub state: ComponentState,
    pub current_version_string: Option<String>,
    pub latest_version_string: Option<String>,
    /// Download size.
    #[serde(rename = "size")]
    pub size_in_bytes: Option<u64>,
    pub is_hidden: bool,
    pub is_configuration: bool,
}

impl SdkComponent {
    /// Returns `true` if the SDK reports a newer release of this component.
    #[must_use = "returns the update state without side effects"]
    pub fn has_update(&self) -> bool {
        self.state.name == UPDATE_AVAILABLE
    }
}

/// Parses the JSON printed by `components list --format=json`.
///
/// # Errors
///
/// Returns [`SdkError::Verification`] if the output is not a JSON list of
/// components.
pub fn parse_component_list(json: &str) -> Result<Vec<SdkComponent>, SdkError> {
    serde_json::from_str(json)
        .map_err(|e| SdkError::verification_with_source("Failed to parse SDK component list", e))
}
