use serde::{Deserialize, Serialize};

/// Storefront-wide settings, edited from the admin dashboard.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(rename = "siteName", default)]
    pub site_name: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(rename = "maintenanceMode", default)]
    pub maintenance_mode: bool,
    #[serde(rename = "parentalControlsEnabled", default)]
    pub parental_controls_enabled: bool,
    #[serde(rename = "featuredModuleIds", default)]
    pub featured_module_ids: Vec<String>,
}
