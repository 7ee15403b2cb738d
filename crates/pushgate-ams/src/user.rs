//! User profiles as exposed by the broker's REST API.

use serde::{Deserialize, Serialize};

/// The push worker's user profile, listing the subscriptions it serves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    /// User name.
    #[serde(rename = "name", default)]
    pub name: String,
    /// Projects the user participates in.
    #[serde(rename = "projects", default)]
    pub projects: Vec<Project>,
}

/// A project entry inside a user profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Project name.
    #[serde(rename = "project", default)]
    pub project: String,
    /// Short subscription names belonging to the project.
    #[serde(rename = "subscriptions", default)]
    pub subscriptions: Vec<String>,
}
