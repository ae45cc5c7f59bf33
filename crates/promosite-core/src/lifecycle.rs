//! Activity lifecycle: creation, status machine, duplication, component
//! ordering, and the batch sweeps.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tracing::{error, info};

use crate::activity::{
    slugify, Activity, ActivityStatus, CreateActivityParams, NewActivity, UpdateActivityParams,
};
use crate::component::{Component, ComponentDescriptor, NewComponent};
use crate::error::LifecycleError;
use crate::store::{lifecycle_event, ContentStore, LifecycleEventBus};

type Result<T> = std::result::Result<T, LifecycleError>;

/// Manages slug generation, status transitions, soft-delete/restore,
/// duplication, and component ordering for activities.
///
/// Every mutating operation notifies the lifecycle bus twice — before and
/// after the store flush — so downstream listeners see both phases.
pub struct ActivityLifecycle {
    store: Arc<dyn ContentStore>,
    bus: Arc<dyn LifecycleEventBus>,
}

impl ActivityLifecycle {
    pub fn new(store: Arc<dyn ContentStore>, bus: Arc<dyn LifecycleEventBus>) -> Self {
        Self { store, bus }
    }

    /// Create a new draft activity.
    ///
    /// The slug comes from `params.slug` when given, else from the title;
    /// either way it is made globally unique with a numeric suffix.
    pub async fn create_activity(&self, params: CreateActivityParams) -> Result<Activity> {
        let base = params
            .slug
            .clone()
            .unwrap_or_else(|| slugify(&params.title));
        let slug = self.unique_slug(&base).await?;

        let mut row = NewActivity::draft(&params.title, &slug);
        row.description = params.description;
        row.cover_image = params.cover_image;
        row.start_time = params.start_time;
        row.end_time = params.end_time;
        if let Some(layout) = params.layout_config {
            row.layout_config = layout;
        }
        if let Some(seo) = params.seo_config {
            row.seo_config = seo;
        }
        if let Some(share) = params.share_config {
            row.share_config = share;
        }
        if let Some(access) = params.access_config {
            row.access_config = access;
        }
        row.template_id = params.template_id;

        let activity = self.store.insert_activity(row).await?;
        self.notify(lifecycle_event::CREATE, &activity, json!({}))
            .await?;
        Ok(activity)
    }

    /// Partial update. A slug change re-runs uniqueness resolution.
    pub async fn update_activity(
        &self,
        activity: &mut Activity,
        params: UpdateActivityParams,
    ) -> Result<()> {
        if let Some(title) = params.title {
            activity.title = title;
        }
        if let Some(slug) = params.slug {
            if slug != activity.slug {
                activity.slug = self.unique_slug(&slug).await?;
            }
        }
        if let Some(description) = params.description {
            activity.description = Some(description);
        }
        if let Some(cover) = params.cover_image {
            activity.cover_image = Some(cover);
        }
        if let Some(start) = params.start_time {
            activity.start_time = Some(start);
        }
        if let Some(end) = params.end_time {
            activity.end_time = Some(end);
        }
        if let Some(layout) = params.layout_config {
            activity.layout_config = layout;
        }
        if let Some(seo) = params.seo_config {
            activity.seo_config = seo;
        }
        if let Some(share) = params.share_config {
            activity.share_config = share;
        }
        if let Some(access) = params.access_config {
            activity.access_config = access;
        }
        activity.updated_at = Utc::now();

        self.store.save_activity(activity).await?;
        self.notify(lifecycle_event::UPDATE, activity, json!({}))
            .await?;
        Ok(())
    }

    /// Publish now, or schedule for a future instant.
    ///
    /// A future `scheduled_time` parks the activity in `scheduled` with
    /// `start_time` set; the actual flip to `published` happens in
    /// [`Self::process_scheduled`]. A past or absent `scheduled_time`
    /// publishes immediately and stamps `publish_time`.
    pub async fn publish(
        &self,
        activity: &mut Activity,
        scheduled_time: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let now = Utc::now();
        self.require_transition(activity, ActivityStatus::Published)?;

        match scheduled_time {
            Some(at) if at > now => {
                activity.status = ActivityStatus::Scheduled;
                activity.start_time = Some(at);
            }
            _ => {
                activity.status = ActivityStatus::Published;
                activity.publish_time = Some(now);
            }
        }
        activity.updated_at = now;

        self.store.save_activity(activity).await?;
        self.notify(
            lifecycle_event::PUBLISH,
            activity,
            json!({ "scheduled_time": scheduled_time.map(|t| t.to_rfc3339()) }),
        )
        .await?;
        Ok(())
    }

    pub async fn archive(&self, activity: &mut Activity) -> Result<()> {
        self.require_transition(activity, ActivityStatus::Archived)?;
        activity.status = ActivityStatus::Archived;
        activity.archive_time = Some(Utc::now());
        activity.updated_at = Utc::now();

        self.store.save_activity(activity).await?;
        self.notify(lifecycle_event::ARCHIVE, activity, json!({}))
            .await?;
        Ok(())
    }

    /// Soft delete by default; `hard` removes the row and its components.
    pub async fn delete(&self, activity: &mut Activity, hard: bool) -> Result<()> {
        if hard {
            self.store.delete_components_for_activity(activity.id).await?;
            self.store.remove_activity(activity.id).await?;
            self.notify(lifecycle_event::DELETE, activity, json!({ "hard": true }))
                .await?;
            return Ok(());
        }

        self.require_transition(activity, ActivityStatus::Deleted)?;
        activity.status = ActivityStatus::Deleted;
        activity.deleted_at = Some(Utc::now());
        activity.updated_at = Utc::now();

        self.store.save_activity(activity).await?;
        self.notify(lifecycle_event::DELETE, activity, json!({ "hard": false }))
            .await?;
        Ok(())
    }

    /// Reverse a soft delete. Only deleted activities can restore, and
    /// they always come back as drafts.
    pub async fn restore(&self, activity: &mut Activity) -> Result<()> {
        if activity.status != ActivityStatus::Deleted {
            return Err(LifecycleError::NotDeleted(activity.id));
        }
        activity.status = ActivityStatus::Draft;
        activity.deleted_at = None;
        activity.updated_at = Utc::now();

        self.store.save_activity(activity).await?;
        self.notify(lifecycle_event::RESTORE, activity, json!({}))
            .await?;
        Ok(())
    }

    /// Whole-activity deep copy.
    ///
    /// Title gets a " (Copy)" suffix unless overridden; the slug is
    /// regenerated and made unique; every component is copied with the
    /// same type/config/position/visibility onto the new activity. The
    /// copy always starts as a draft regardless of the source's status.
    pub async fn duplicate(
        &self,
        source: &Activity,
        new_title: Option<String>,
    ) -> Result<Activity> {
        let title = new_title.unwrap_or_else(|| format!("{} (Copy)", source.title));
        let slug = self.unique_slug(&slugify(&title)).await?;

        let mut row = NewActivity::draft(&title, &slug);
        row.description = source.description.clone();
        row.cover_image = source.cover_image.clone();
        row.layout_config = source.layout_config.clone();
        row.seo_config = source.seo_config.clone();
        row.share_config = source.share_config.clone();
        row.access_config = source.access_config.clone();
        row.template_id = source.template_id;

        let copy = self.store.insert_activity(row).await?;

        let components = self.store.components_for_activity(source.id).await?;
        for component in &components {
            self.store
                .insert_component(
                    copy.id,
                    NewComponent {
                        component_type: component.component_type.clone(),
                        config: component.config.clone(),
                        position: component.position,
                        is_visible: component.is_visible,
                    },
                )
                .await?;
        }

        self.notify(
            lifecycle_event::DUPLICATE,
            &copy,
            json!({ "source": source.id }),
        )
        .await?;
        Ok(copy)
    }

    /// Publish every scheduled activity whose window has opened.
    ///
    /// Items are processed independently: one failure is logged and
    /// skipped, never aborting the batch. Returns the success count.
    pub async fn process_scheduled(&self, now: DateTime<Utc>) -> Result<usize> {
        let due = self.store.activities_due_for_publish(now).await?;
        let mut published = 0;
        for mut activity in due {
            activity.status = ActivityStatus::Published;
            activity.publish_time = Some(now);
            activity.updated_at = now;
            match self.store.save_activity(&activity).await {
                Ok(()) => {
                    self.notify(lifecycle_event::PUBLISH, &activity, json!({ "sweep": true }))
                        .await?;
                    published += 1;
                }
                Err(e) => {
                    error!(activity_id = activity.id, error = %e, "scheduled publish failed");
                }
            }
        }
        if published > 0 {
            info!(count = published, "scheduled activities published");
        }
        Ok(published)
    }

    /// Archive every published activity whose `end_time` has passed.
    pub async fn process_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let due = self.store.activities_due_for_archive(now).await?;
        let mut archived = 0;
        for mut activity in due {
            activity.status = ActivityStatus::Archived;
            activity.archive_time = Some(now);
            activity.updated_at = now;
            match self.store.save_activity(&activity).await {
                Ok(()) => {
                    self.notify(lifecycle_event::ARCHIVE, &activity, json!({ "sweep": true }))
                        .await?;
                    archived += 1;
                }
                Err(e) => {
                    error!(activity_id = activity.id, error = %e, "expiry archive failed");
                }
            }
        }
        if archived > 0 {
            info!(count = archived, "expired activities archived");
        }
        Ok(archived)
    }

    // --- component ordering ---

    /// Swap the component with its predecessor. Position 0 is a no-op,
    /// not an error; returns whether anything moved.
    pub async fn move_component_up(&self, component: &mut Component) -> Result<bool> {
        if !component.move_up() {
            return Ok(false);
        }
        component.updated_at = Utc::now();
        self.store.save_component(component).await?;
        Ok(true)
    }

    pub async fn move_component_down(&self, component: &mut Component) -> Result<()> {
        component.move_down();
        component.updated_at = Utc::now();
        self.store.save_component(component).await?;
        Ok(())
    }

    /// Insert a copy of the component right after the original.
    pub async fn duplicate_component(&self, component: &Component) -> Result<Component> {
        let copy = self
            .store
            .insert_component(component.activity_id, component.duplicate())
            .await?;
        Ok(copy)
    }

    /// Rewrite every component's position to its index in `ordered_ids`.
    ///
    /// The list must cover the activity's components exactly. Ids belonging
    /// to another activity (or no activity) are rejected, as are lists that
    /// repeat or omit components — never silently dropped.
    pub async fn reorder_components(
        &self,
        activity_id: i64,
        ordered_ids: &[i64],
    ) -> Result<()> {
        let mut components = self.store.components_for_activity(activity_id).await?;
        let known: HashSet<i64> = components.iter().map(|c| c.id).collect();
        if let Some(&foreign) = ordered_ids.iter().find(|id| !known.contains(id)) {
            return Err(LifecycleError::ForeignComponent {
                component_id: foreign,
                activity_id,
            });
        }
        let supplied: HashSet<i64> = ordered_ids.iter().copied().collect();
        if supplied.len() != ordered_ids.len() || supplied != known {
            return Err(LifecycleError::IncompleteOrder(activity_id));
        }

        for component in &mut components {
            let index = ordered_ids
                .iter()
                .position(|&id| id == component.id)
                .unwrap_or(0) as i32;
            if component.position != index {
                component.position = index;
                component.updated_at = Utc::now();
                self.store.save_component(component).await?;
            }
        }
        Ok(())
    }

    /// Destructive full replacement of the activity's component list.
    ///
    /// NOT a diff: every existing component is deleted first, then fresh
    /// ones are built from the descriptors in order. Callers wanting a
    /// partial update must resupply the complete desired set.
    pub async fn replace_components(
        &self,
        activity_id: i64,
        descriptors: &[ComponentDescriptor],
    ) -> Result<Vec<Component>> {
        self.store.delete_components_for_activity(activity_id).await?;

        let mut created = Vec::with_capacity(descriptors.len());
        for (index, descriptor) in descriptors.iter().enumerate() {
            let config = if descriptor.config.is_object() {
                descriptor.config.clone()
            } else {
                // Shape errors are coerced, not raised.
                Value::Object(Default::default())
            };
            let component = self
                .store
                .insert_component(
                    activity_id,
                    NewComponent {
                        component_type: descriptor.component_type.clone(),
                        config,
                        position: descriptor.position.unwrap_or(index as i32),
                        is_visible: descriptor.is_visible.unwrap_or(true),
                    },
                )
                .await?;
            created.push(component);
        }
        Ok(created)
    }

    /// Resolve slug collisions with an incrementing numeric suffix.
    async fn unique_slug(&self, base: &str) -> Result<String> {
        if !self.store.slug_exists(base).await? {
            return Ok(base.to_string());
        }
        let mut counter = 1;
        loop {
            let candidate = format!("{base}-{counter}");
            if !self.store.slug_exists(&candidate).await? {
                return Ok(candidate);
            }
            counter += 1;
        }
    }

    fn require_transition(&self, activity: &Activity, to: ActivityStatus) -> Result<()> {
        if !activity.status.can_transition_to(to) {
            return Err(LifecycleError::InvalidTransition {
                id: activity.id,
                from: activity.status,
                to,
            });
        }
        Ok(())
    }

    /// Dispatch the same lifecycle event before and after the store flush.
    async fn notify(&self, event: &str, activity: &Activity, context: Value) -> Result<()> {
        self.bus.dispatch(event, activity, &context);
        self.store.flush().await?;
        self.bus.dispatch(event, activity, &context);
        Ok(())
    }
}
