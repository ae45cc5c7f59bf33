//! Template instantiation and snapshotting.

use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Value};
use tracing::info;

use crate::activity::{Activity, CreateActivityParams};
use crate::component::{Component, ComponentDescriptor};
use crate::error::LifecycleError;
use crate::lifecycle::ActivityLifecycle;
use crate::store::ContentStore;
use crate::template::{NewTemplate, Template};

type Result<T> = std::result::Result<T, LifecycleError>;

/// Caller overrides applied on top of a template's defaults.
#[derive(Debug, Clone, Default)]
pub struct InstantiateOverrides {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub cover_image: Option<String>,
}

/// Turns templates into activities and activities back into templates.
pub struct TemplateEngine {
    store: Arc<dyn ContentStore>,
    lifecycle: Arc<ActivityLifecycle>,
}

impl TemplateEngine {
    pub fn new(store: Arc<dyn ContentStore>, lifecycle: Arc<ActivityLifecycle>) -> Self {
        Self { store, lifecycle }
    }

    /// Create a draft activity seeded from a template.
    ///
    /// The usage counter bumps up-front, before the activity is built, so
    /// an instantiation that fails midway is still counted as usage. The
    /// default title is "<template name> - <today>"; caller overrides win
    /// over the template's `default_data`. Components come from the
    /// template's `layout_config.components` array; every seeded component
    /// starts visible regardless of what the blueprint says.
    pub async fn instantiate(
        &self,
        template: &Template,
        overrides: InstantiateOverrides,
    ) -> Result<(Activity, Vec<Component>)> {
        self.store.increment_template_usage(template.id).await?;

        let title = overrides.title.unwrap_or_else(|| {
            format!("{} - {}", template.name, Utc::now().date_naive())
        });
        let description = overrides
            .description
            .or_else(|| string_field(&template.default_data, "description"));
        let cover_image = overrides
            .cover_image
            .or_else(|| string_field(&template.default_data, "cover_image"));

        let activity = self
            .lifecycle
            .create_activity(CreateActivityParams {
                title,
                slug: overrides.slug,
                description,
                cover_image,
                layout_config: Some(template.layout_config.clone()),
                template_id: Some(template.id),
                ..Default::default()
            })
            .await?;

        let descriptors = blueprint_components(&template.layout_config);
        let components = self
            .lifecycle
            .replace_components(activity.id, &descriptors)
            .await?;

        info!(
            template_id = template.id,
            activity_id = activity.id,
            components = components.len(),
            "activity instantiated from template"
        );
        Ok((activity, components))
    }

    /// Capture an activity's current layout as a reusable template.
    ///
    /// Snapshots always land in the "custom" category, active and
    /// non-system. The code must be globally unique.
    pub async fn snapshot(
        &self,
        activity: &Activity,
        name: &str,
        code: &str,
        description: Option<String>,
    ) -> Result<Template> {
        if self.store.template_code_exists(code).await? {
            return Err(LifecycleError::DuplicateTemplateCode(code.to_string()));
        }

        let components = self.store.components_for_activity(activity.id).await?;
        let blueprint: Vec<Value> = components
            .iter()
            .map(|c| json!({ "type": c.component_type, "props": c.config }))
            .collect();

        let template = self
            .store
            .insert_template(NewTemplate {
                name: name.to_string(),
                code: code.to_string(),
                category: "custom".to_string(),
                description,
                layout_config: json!({ "components": blueprint }),
                default_data: json!({
                    "title": activity.title,
                    "description": activity.description,
                    "cover_image": activity.cover_image,
                }),
                is_system: false,
                is_active: true,
            })
            .await?;
        Ok(template)
    }

    /// Delete a template. System templates are refused.
    pub async fn delete(&self, template: &Template) -> Result<bool> {
        if template.is_system {
            return Err(LifecycleError::SystemTemplate(template.id));
        }
        Ok(self.store.delete_template(template.id).await?)
    }
}

fn string_field(data: &Value, key: &str) -> Option<String> {
    data.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Parse the `components` array of a template blueprint into descriptors.
///
/// Missing `type` degrades to an empty string and non-object `props` to an
/// empty object; a blueprint with no `components` array seeds nothing.
fn blueprint_components(layout_config: &Value) -> Vec<ComponentDescriptor> {
    let Some(entries) = layout_config.get("components").and_then(Value::as_array) else {
        return Vec::new();
    };
    entries
        .iter()
        .map(|entry| {
            let component_type = entry
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string();
            let config = match entry.get("props") {
                Some(props) if props.is_object() => props.clone(),
                _ => Value::Object(Default::default()),
            };
            ComponentDescriptor {
                component_type,
                config,
                position: None,
                is_visible: Some(true),
            }
        })
        .collect()
}
