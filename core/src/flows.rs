//! The flow (experience) model accepted by the tenant API's `/v3/flows`
//! surface, plus the boundary-validated argument structure the creation
//! tool deserializes into.
//!
//! Wire casing follows the tenant API: camelCase object keys, upper-case
//! snake enum tokens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Campaign kind. Tool callers use the short tokens ("Web", "API",
/// "Triggered"); the wire uses the tenant enum values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowType {
    #[serde(rename = "WEB_FLOW")]
    Web,
    #[serde(rename = "API_FLOW")]
    Api,
    #[serde(rename = "TRIGGERED")]
    Triggered,
}

impl FlowType {
    pub const ACCEPTED_TOKENS: [&'static str; 3] = ["Web", "API", "Triggered"];

    /// Map the tool-facing token onto the API enum. Unmapped input yields
    /// `None`; callers turn that into a typed error result, never a panic.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "Web" => Some(FlowType::Web),
            "API" => Some(FlowType::Api),
            "Triggered" => Some(FlowType::Triggered),
            _ => None,
        }
    }
}

/// Delivery channel an experience runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowChannel {
    #[serde(rename = "CALL_CENTER")]
    CallCenter,
    #[serde(rename = "EMAIL")]
    Email,
    #[serde(rename = "MOBILE_APP")]
    MobileApp,
    #[serde(rename = "MOBILE_WEB")]
    MobileWeb,
    #[serde(rename = "WEB")]
    Web,
    #[serde(rename = "SMS")]
    Sms,
}

impl FlowChannel {
    pub const ACCEPTED_TOKENS: [&'static str; 6] = [
        "Call Center",
        "Email",
        "Mobile App",
        "Mobile Web",
        "Web",
        "SMS",
    ];

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "Call Center" => Some(FlowChannel::CallCenter),
            "Email" => Some(FlowChannel::Email),
            "Mobile App" => Some(FlowChannel::MobileApp),
            "Mobile Web" => Some(FlowChannel::MobileWeb),
            "Web" => Some(FlowChannel::Web),
            "SMS" => Some(FlowChannel::Sms),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowStatus {
    #[serde(rename = "DRAFT")]
    Draft,
    #[serde(rename = "PUBLISHED")]
    Published,
    #[serde(rename = "PAUSED")]
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowScheduleType {
    #[serde(rename = "SIMPLE")]
    Simple,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowSchedule {
    #[serde(rename = "type")]
    pub schedule_type: FlowScheduleType,
    pub start_date: DateTime<Utc>,
}

impl FlowSchedule {
    /// The fixed schedule new experiences are created with: simple, starting
    /// at creation time.
    pub fn simple_starting_now() -> Self {
        Self {
            schedule_type: FlowScheduleType::Simple,
            start_date: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantAssets {
    pub html: String,
    pub js: String,
    pub css: String,
}

/// Server-side template render task attached to a variant when freemarker
/// source is supplied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderTaskInput {
    pub implementation: String,
    pub input: RenderTaskBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderTaskBody {
    pub body: String,
    pub render_language: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowVariant {
    pub name: String,
    pub assets: VariantAssets,
    pub template_variables: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tasks: Option<Vec<RenderTaskInput>>,
}

/// A full experience definition as posted to the tenant API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowDefinition {
    pub name: String,
    pub friendly_id: String,
    #[serde(rename = "type")]
    pub flow_type: FlowType,
    pub channels: Vec<FlowChannel>,
    pub status: FlowStatus,
    pub schedule: FlowSchedule,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variants: Option<Vec<FlowVariant>>,
}

/// Derive the URL-safe identifier from an experience name: lowercase, runs
/// of whitespace collapsed to a single underscore.
pub fn derive_friendly_id(name: &str) -> String {
    name.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

/// Arguments accepted by the experience-creation tool. Deserialized at the
/// boundary so invalid shapes are rejected before any business logic runs.
#[derive(Debug, Clone, Deserialize)]
pub struct ExperienceSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub flow_type: String,
    #[serde(default)]
    pub channels: Vec<String>,
    #[serde(default)]
    pub assets: Option<AssetBundle>,
}

/// Optional visual/code payloads for the default variant.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssetBundle {
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub css: Option<String>,
    #[serde(default)]
    pub javascript: Option<String>,
    #[serde(default)]
    pub freemarker: Option<String>,
}

impl AssetBundle {
    /// True when at least one asset carries non-empty content. Empty strings
    /// count as absent, so a variant is only attached for real payloads.
    pub fn has_content(&self) -> bool {
        [&self.html, &self.css, &self.javascript, &self.freemarker]
            .into_iter()
            .any(|asset| asset.as_deref().is_some_and(|text| !text.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flow_type_tokens_map_and_unknown_is_none() {
        assert_eq!(FlowType::from_token("Web"), Some(FlowType::Web));
        assert_eq!(FlowType::from_token("API"), Some(FlowType::Api));
        assert_eq!(FlowType::from_token("Triggered"), Some(FlowType::Triggered));
        assert_eq!(FlowType::from_token("web"), None);
        assert_eq!(FlowType::from_token("Banner"), None);
    }

    #[test]
    fn channel_tokens_cover_the_exposed_enumeration() {
        for token in FlowChannel::ACCEPTED_TOKENS {
            assert!(FlowChannel::from_token(token).is_some(), "{token}");
        }
        assert_eq!(FlowChannel::from_token("Fax"), None);
    }

    #[test]
    fn friendly_id_lowercases_and_underscores_whitespace() {
        assert_eq!(derive_friendly_id("My Experience"), "my_experience");
        assert_eq!(derive_friendly_id("Spring  Sale   2026"), "spring_sale_2026");
        assert_eq!(derive_friendly_id("single"), "single");
    }

    #[test]
    fn definition_serializes_camel_case_and_skips_absent_variants() {
        let definition = FlowDefinition {
            name: "My Experience".to_string(),
            friendly_id: derive_friendly_id("My Experience"),
            flow_type: FlowType::Web,
            channels: vec![FlowChannel::Web],
            status: FlowStatus::Draft,
            schedule: FlowSchedule::simple_starting_now(),
            variants: None,
        };
        let value = serde_json::to_value(&definition).unwrap();
        assert_eq!(value["friendlyId"], "my_experience");
        assert_eq!(value["type"], "WEB_FLOW");
        assert_eq!(value["channels"], json!(["WEB"]));
        assert_eq!(value["status"], "DRAFT");
        assert_eq!(value["schedule"]["type"], "SIMPLE");
        assert!(value["schedule"]["startDate"].is_string());
        assert!(value.get("variants").is_none());
    }

    #[test]
    fn asset_bundle_content_ignores_empty_strings() {
        assert!(!AssetBundle::default().has_content());
        let empties = AssetBundle {
            html: Some(String::new()),
            css: Some(String::new()),
            ..Default::default()
        };
        assert!(!empties.has_content());
        let with_html = AssetBundle {
            html: Some("<p>hi</p>".to_string()),
            ..Default::default()
        };
        assert!(with_html.has_content());
    }

    #[test]
    fn experience_spec_accepts_minimal_arguments() {
        let spec: ExperienceSpec = serde_json::from_value(json!({
            "name": "My Experience",
            "type": "Web",
            "channels": ["Web"]
        }))
        .unwrap();
        assert_eq!(spec.flow_type, "Web");
        assert!(spec.assets.is_none());
    }
}
