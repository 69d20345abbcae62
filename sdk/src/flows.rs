//! The `Flows` resource: list, fetch and create personalization
//! experiences on the tenant.

use personalize_core::flows::{FlowDefinition, RenderTaskBody, RenderTaskInput};
use reqwest::Method;
use serde_json::Value;

use crate::{Client, SdkError};

/// Implementation identifier the render service expects on variant tasks.
const RENDER_TASK_IMPLEMENTATION: &str = "templateRenderService";
const RENDER_LANGUAGE_FREEMARKER: &str = "freemarker";

pub struct Flows<'a> {
    pub(crate) client: &'a Client,
}

impl Flows<'_> {
    /// Fetch one page of flow definitions.
    pub async fn get_all(&self, limit: u32, offset: u32) -> Result<Value, SdkError> {
        self.client
            .send(
                Method::GET,
                "/v3/flows",
                &[("limit", limit.to_string()), ("offset", offset.to_string())],
                None,
            )
            .await
    }

    /// Fetch a single flow by reference (id or friendly id).
    pub async fn get_by_ref(&self, reference: &str) -> Result<Value, SdkError> {
        self.client
            .send(Method::GET, &format!("/v3/flows/{reference}"), &[], None)
            .await
    }

    /// Create a new experience from a full definition.
    pub async fn create_experience(&self, definition: &FlowDefinition) -> Result<Value, SdkError> {
        let body = serde_json::to_value(definition)?;
        self.client
            .send(Method::POST, "/v3/flows", &[], Some(&body))
            .await
    }

    /// Build the render-task input attached to a variant that carries
    /// freemarker source. Pure — no network.
    pub fn template_render_task_input(freemarker: &str) -> RenderTaskInput {
        RenderTaskInput {
            implementation: RENDER_TASK_IMPLEMENTATION.to_string(),
            input: RenderTaskBody {
                body: freemarker.to_string(),
                render_language: RENDER_LANGUAGE_FREEMARKER.to_string(),
            },
        }
    }
}
