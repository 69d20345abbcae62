//! Personalization service facade.
//!
//! One pure async function per remote operation, each taking the configured
//! client explicitly. Remote failures never escape: every path resolves to
//! the uniform outcome envelope.

use personalize_core::flows::{
    ExperienceSpec, FlowChannel, FlowDefinition, FlowSchedule, FlowStatus, FlowType, FlowVariant,
    VariantAssets, derive_friendly_id,
};
use personalize_core::outcome::ToolOutcome;
use personalize_sdk::{Client, Flows};
use serde_json::Map;

/// Fixed first page requested by the listing tool.
const FLOW_PAGE_LIMIT: u32 = 25;
const FLOW_PAGE_OFFSET: u32 = 0;

/// Name given to the single variant generated from supplied assets.
const DEFAULT_VARIANT_NAME: &str = "Default Variant";

pub async fn list_experiences(client: &Client) -> ToolOutcome {
    match client.flows().get_all(FLOW_PAGE_LIMIT, FLOW_PAGE_OFFSET).await {
        Ok(data) => ToolOutcome::success_with_data("Found your experiences successfully.", data),
        Err(err) => ToolOutcome::error(format!(
            "Failed to retrieve personalization experiences: {err}"
        )),
    }
}

pub async fn get_experience_by_ref(reference: &str, client: &Client) -> ToolOutcome {
    match client.flows().get_by_ref(reference).await {
        Ok(data) => {
            ToolOutcome::success_with_data("Found your experience or experiment successfully.", data)
        }
        Err(err) => ToolOutcome::error(format!(
            "Failed to retrieve personalization experience {reference}: {err}"
        )),
    }
}

/// Validate an experience spec and build the definition the tenant API
/// accepts.
///
/// Validation failures come back as error outcomes, and the remote create
/// operation must not be attempted for them. New experiences are always
/// drafts on a simple schedule starting now; a single default variant is
/// attached only when at least one asset carries content.
pub fn plan_experience(spec: &ExperienceSpec) -> Result<FlowDefinition, ToolOutcome> {
    let Some(flow_type) = FlowType::from_token(&spec.flow_type) else {
        return Err(ToolOutcome::error(format!(
            "Invalid flow type: {} it should match one of the following: {}",
            spec.flow_type,
            FlowType::ACCEPTED_TOKENS.join(", ")
        )));
    };

    let mut channels = Vec::with_capacity(spec.channels.len());
    for token in &spec.channels {
        match FlowChannel::from_token(token) {
            Some(channel) => channels.push(channel),
            None => {
                return Err(ToolOutcome::error(format!(
                    "Invalid channel: {token} it should match one of the following: {}",
                    FlowChannel::ACCEPTED_TOKENS.join(", ")
                )));
            }
        }
    }

    let mut definition = FlowDefinition {
        name: spec.name.clone(),
        friendly_id: derive_friendly_id(&spec.name),
        flow_type,
        channels,
        status: FlowStatus::Draft,
        schedule: FlowSchedule::simple_starting_now(),
        variants: None,
    };

    if let Some(assets) = spec.assets.as_ref().filter(|assets| assets.has_content()) {
        let tasks = assets
            .freemarker
            .as_deref()
            .filter(|text| !text.is_empty())
            .map(|text| vec![Flows::template_render_task_input(text)]);

        definition.variants = Some(vec![FlowVariant {
            name: DEFAULT_VARIANT_NAME.to_string(),
            assets: VariantAssets {
                html: assets.html.clone().unwrap_or_default(),
                js: assets.javascript.clone().unwrap_or_default(),
                css: assets.css.clone().unwrap_or_default(),
            },
            template_variables: Map::new(),
            tasks,
        }]);
    }

    Ok(definition)
}

pub async fn create_experience(definition: &FlowDefinition, client: &Client) -> ToolOutcome {
    match client.flows().create_experience(definition).await {
        Ok(data) => ToolOutcome::success_with_data(
            "Personalization experience created successfully.",
            data,
        ),
        Err(err) => ToolOutcome::error(format!(
            "Failed to create personalization experience: {err}"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::plan_experience;
    use personalize_core::flows::{AssetBundle, ExperienceSpec, FlowStatus, FlowType};

    fn spec(name: &str, flow_type: &str, channels: &[&str]) -> ExperienceSpec {
        ExperienceSpec {
            name: name.to_string(),
            flow_type: flow_type.to_string(),
            channels: channels.iter().map(|c| c.to_string()).collect(),
            assets: None,
        }
    }

    #[test]
    fn plan_builds_a_draft_without_variants_when_no_assets_given() {
        let definition = plan_experience(&spec("My Experience", "Web", &["Web"])).unwrap();
        assert_eq!(definition.friendly_id, "my_experience");
        assert_eq!(definition.flow_type, FlowType::Web);
        assert_eq!(definition.status, FlowStatus::Draft);
        assert!(definition.variants.is_none());
    }

    #[test]
    fn plan_rejects_unmapped_flow_types_as_error_outcomes() {
        let outcome = plan_experience(&spec("X", "Banner", &["Web"])).unwrap_err();
        assert!(!outcome.is_success());
        assert!(outcome.message.contains("Invalid flow type: Banner"));
        assert!(outcome.message.contains("Web, API, Triggered"));
    }

    #[test]
    fn plan_rejects_unmapped_channels_as_error_outcomes() {
        let outcome = plan_experience(&spec("X", "API", &["Email", "Fax"])).unwrap_err();
        assert!(outcome.message.contains("Invalid channel: Fax"));
    }

    #[test]
    fn html_asset_produces_exactly_one_default_variant() {
        let mut spec = spec("X", "API", &["Email"]);
        spec.assets = Some(AssetBundle {
            html: Some("<p>hi</p>".to_string()),
            ..Default::default()
        });
        let definition = plan_experience(&spec).unwrap();
        let variants = definition.variants.unwrap();
        assert_eq!(variants.len(), 1);
        assert_eq!(variants[0].name, "Default Variant");
        assert_eq!(variants[0].assets.html, "<p>hi</p>");
        assert_eq!(variants[0].assets.js, "");
        assert_eq!(variants[0].assets.css, "");
        assert!(variants[0].tasks.is_none());
    }

    #[test]
    fn freemarker_asset_attaches_a_render_task() {
        let mut spec = spec("X", "Triggered", &["SMS"]);
        spec.assets = Some(AssetBundle {
            freemarker: Some("<#if vip>Hello</#if>".to_string()),
            ..Default::default()
        });
        let definition = plan_experience(&spec).unwrap();
        let variants = definition.variants.unwrap();
        let tasks = variants[0].tasks.as_ref().unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].input.body, "<#if vip>Hello</#if>");
    }

    #[test]
    fn empty_asset_strings_do_not_create_a_variant() {
        let mut spec = spec("X", "Web", &["Web"]);
        spec.assets = Some(AssetBundle {
            html: Some(String::new()),
            css: Some(String::new()),
            ..Default::default()
        });
        assert!(plan_experience(&spec).unwrap().variants.is_none());
    }
}
