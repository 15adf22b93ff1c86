// src/system/host.rs
// Static facts about where the service runs, read once at startup.
use serde::Serialize;

use crate::config::Config;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostInfo {
    pub version: String,
    pub environment: String,
    pub hostname: String,
    pub port: u16,
    pub platform: &'static str,
    pub architecture: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub azure: Option<AzureHost>,
}

impl HostInfo {
    pub fn from_env(config: &Config) -> Self {
        Self::from_lookup(config, |key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(config: &Config, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let azure = AzureHost::from_lookup(&lookup);
        let hostname = azure
            .as_ref()
            .and_then(|a| a.hostname.clone())
            .unwrap_or_else(|| "localhost".to_string());

        Self {
            version: config.app.version.clone(),
            environment: config.app.environment.clone(),
            hostname,
            port: config.server.port,
            platform: std::env::consts::OS,
            architecture: std::env::consts::ARCH,
            azure,
        }
    }
}

/// Azure App Service metadata, surfaced verbatim from the `WEBSITE_*`
/// variables the platform injects.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureHost {
    pub site_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    pub slot: String,
}

impl AzureHost {
    fn from_lookup<F>(lookup: &F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let site_name = lookup("WEBSITE_SITE_NAME").filter(|s| !s.is_empty())?;
        Some(Self {
            site_name,
            resource_group: lookup("WEBSITE_RESOURCE_GROUP"),
            subscription_id: lookup("WEBSITE_OWNER_NAME"),
            hostname: lookup("WEBSITE_HOSTNAME"),
            instance_id: lookup("WEBSITE_INSTANCE_ID"),
            sku: lookup("WEBSITE_SKU"),
            slot: lookup("WEBSITE_SLOT_NAME").unwrap_or_else(|| "production".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn bare_host_has_no_azure_section() {
        let info = HostInfo::from_lookup(&Config::default(), lookup(&[]));
        assert!(info.azure.is_none());
        assert_eq!(info.hostname, "localhost");
        assert_eq!(info.platform, std::env::consts::OS);

        let json = serde_json::to_value(&info).unwrap();
        assert!(json.get("azure").is_none());
    }

    #[test]
    fn azure_metadata_is_surfaced() {
        let info = HostInfo::from_lookup(
            &Config::default(),
            lookup(&[
                ("WEBSITE_SITE_NAME", "probe-demo"),
                ("WEBSITE_HOSTNAME", "probe-demo.azurewebsites.net"),
                ("WEBSITE_INSTANCE_ID", "abc123"),
            ]),
        );

        let azure = info.azure.as_ref().unwrap();
        assert_eq!(azure.site_name, "probe-demo");
        assert_eq!(azure.slot, "production");
        assert_eq!(azure.sku, None);
        assert_eq!(info.hostname, "probe-demo.azurewebsites.net");

        let json = serde_json::to_value(azure).unwrap();
        assert_eq!(json["instanceId"], "abc123");
        assert_eq!(json["siteName"], "probe-demo");
    }
}
