//! In-memory implementations of the port traits for service tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{json, Value};

use crate::activity::{Activity, NewActivity};
use crate::component::{Component, NewComponent};
use crate::event::{event_type, Event};
use crate::stats::{increment_stats_counter, DailyStats};
use crate::store::{
    ContentStore, Counter, Dimension, EventStore, LifecycleEventBus, SessionStore, StatsStore,
};
use crate::template::{NewTemplate, Template};

/// Single in-memory backend standing in for every storage port at once.
#[derive(Default)]
pub struct MemoryBackend {
    events: Mutex<Vec<Event>>,
    stats: Mutex<HashMap<(i64, NaiveDate), DailyStats>>,
    sessions: Mutex<HashMap<(String, String), String>>,
    activities: Mutex<HashMap<i64, Activity>>,
    components: Mutex<HashMap<i64, Component>>,
    templates: Mutex<HashMap<i64, Template>>,
    next_id: Mutex<i64>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn mint_id(&self) -> i64 {
        let mut next = self.next_id.lock().unwrap();
        *next += 1;
        *next
    }

    /// Seed an event with an arbitrary timestamp, for retention tests.
    pub async fn insert_aged_event(
        &self,
        activity_id: i64,
        session_id: &str,
        created_at: DateTime<Utc>,
    ) {
        let mut event = Event::new(activity_id, session_id, event_type::VIEW, json!({}));
        event.created_at = created_at;
        self.events.lock().unwrap().push(event);
    }

    fn with_stats_row<F>(&self, activity_id: i64, date: NaiveDate, mutate: F)
    where
        F: FnOnce(&mut DailyStats),
    {
        let mut stats = self.stats.lock().unwrap();
        let row = stats
            .entry((activity_id, date))
            .or_insert_with(|| DailyStats::empty(activity_id, date));
        mutate(row);
    }
}

#[async_trait]
impl EventStore for MemoryBackend {
    async fn insert_event(&self, event: &Event) -> anyhow::Result<()> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }

    async fn has_visitor_event(
        &self,
        activity_id: i64,
        visitor_id: &str,
    ) -> anyhow::Result<bool> {
        Ok(self.events.lock().unwrap().iter().any(|e| {
            e.activity_id == activity_id
                && e.event_type == event_type::VISITOR
                && e.visitor_id.as_deref() == Some(visitor_id)
        }))
    }

    async fn events_on_day(
        &self,
        activity_id: i64,
        day: NaiveDate,
    ) -> anyhow::Result<Vec<Event>> {
        Ok(self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.activity_id == activity_id && e.created_at.date_naive() == day)
            .cloned()
            .collect())
    }

    async fn delete_events_before(&self, cutoff: DateTime<Utc>) -> anyhow::Result<u64> {
        let mut events = self.events.lock().unwrap();
        let before = events.len();
        events.retain(|e| e.created_at >= cutoff);
        Ok((before - events.len()) as u64)
    }
}

#[async_trait]
impl StatsStore for MemoryBackend {
    async fn get_or_create(
        &self,
        activity_id: i64,
        date: NaiveDate,
    ) -> anyhow::Result<DailyStats> {
        let mut stats = self.stats.lock().unwrap();
        let row = stats
            .entry((activity_id, date))
            .or_insert_with(|| DailyStats::empty(activity_id, date));
        Ok(row.clone())
    }

    async fn bump_counter(
        &self,
        activity_id: i64,
        date: NaiveDate,
        counter: Counter,
        by: i64,
    ) -> anyhow::Result<()> {
        self.with_stats_row(activity_id, date, |row| match counter {
            Counter::Pv => row.pv += by,
            Counter::Uv => row.uv += by,
            Counter::Share => row.share_count += by,
            Counter::FormSubmit => row.form_submit_count += by,
            Counter::Conversion => row.conversion_count += by,
        });
        Ok(())
    }

    async fn add_stay_duration(
        &self,
        activity_id: i64,
        date: NaiveDate,
        seconds: f64,
    ) -> anyhow::Result<()> {
        self.with_stats_row(activity_id, date, |row| row.stay_duration += seconds);
        Ok(())
    }

    async fn bump_dimension(
        &self,
        activity_id: i64,
        date: NaiveDate,
        dimension: Dimension,
        key: &str,
    ) -> anyhow::Result<()> {
        self.with_stats_row(activity_id, date, |row| {
            let map = match dimension {
                Dimension::Device => &mut row.device_stats,
                Dimension::Source => &mut row.source_stats,
                Dimension::Region => &mut row.region_stats,
            };
            *map = increment_stats_counter(map, key);
        });
        Ok(())
    }

    async fn set_bounce_rate(
        &self,
        activity_id: i64,
        date: NaiveDate,
        rate: f64,
    ) -> anyhow::Result<()> {
        self.with_stats_row(activity_id, date, |row| row.bounce_rate = rate);
        Ok(())
    }

    async fn range(
        &self,
        activity_id: i64,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> anyhow::Result<Vec<DailyStats>> {
        let stats = self.stats.lock().unwrap();
        let mut rows: Vec<DailyStats> = stats
            .values()
            .filter(|row| {
                row.activity_id == activity_id
                    && start.map_or(true, |s| row.date >= s)
                    && end.map_or(true, |e| row.date <= e)
            })
            .cloned()
            .collect();
        rows.sort_by_key(|row| row.date);
        Ok(rows)
    }
}

#[async_trait]
impl SessionStore for MemoryBackend {
    async fn get(&self, session_id: &str, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .get(&(session_id.to_string(), key.to_string()))
            .cloned())
    }

    async fn set(&self, session_id: &str, key: &str, value: &str) -> anyhow::Result<()> {
        self.sessions
            .lock()
            .unwrap()
            .insert((session_id.to_string(), key.to_string()), value.to_string());
        Ok(())
    }
}

#[async_trait]
impl ContentStore for MemoryBackend {
    async fn insert_activity(&self, activity: NewActivity) -> anyhow::Result<Activity> {
        let now = Utc::now();
        let row = Activity {
            id: self.mint_id(),
            title: activity.title,
            slug: activity.slug,
            description: activity.description,
            cover_image: activity.cover_image,
            status: activity.status,
            start_time: activity.start_time,
            end_time: activity.end_time,
            publish_time: None,
            archive_time: None,
            layout_config: activity.layout_config,
            seo_config: activity.seo_config,
            share_config: activity.share_config,
            access_config: activity.access_config,
            template_id: activity.template_id,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        self.activities.lock().unwrap().insert(row.id, row.clone());
        Ok(row)
    }

    async fn get_activity(&self, id: i64) -> anyhow::Result<Option<Activity>> {
        Ok(self.activities.lock().unwrap().get(&id).cloned())
    }

    async fn save_activity(&self, activity: &Activity) -> anyhow::Result<()> {
        self.activities
            .lock()
            .unwrap()
            .insert(activity.id, activity.clone());
        Ok(())
    }

    async fn remove_activity(&self, id: i64) -> anyhow::Result<bool> {
        Ok(self.activities.lock().unwrap().remove(&id).is_some())
    }

    async fn slug_exists(&self, slug: &str) -> anyhow::Result<bool> {
        Ok(self
            .activities
            .lock()
            .unwrap()
            .values()
            .any(|a| a.slug == slug))
    }

    async fn activities_due_for_publish(
        &self,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Vec<Activity>> {
        Ok(self
            .activities
            .lock()
            .unwrap()
            .values()
            .filter(|a| {
                a.status == crate::activity::ActivityStatus::Scheduled
                    && a.start_time.map_or(false, |t| t <= now)
            })
            .cloned()
            .collect())
    }

    async fn activities_due_for_archive(
        &self,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Vec<Activity>> {
        Ok(self
            .activities
            .lock()
            .unwrap()
            .values()
            .filter(|a| {
                a.status == crate::activity::ActivityStatus::Published
                    && a.end_time.map_or(false, |t| t <= now)
            })
            .cloned()
            .collect())
    }

    async fn components_for_activity(
        &self,
        activity_id: i64,
    ) -> anyhow::Result<Vec<Component>> {
        let mut rows: Vec<Component> = self
            .components
            .lock()
            .unwrap()
            .values()
            .filter(|c| c.activity_id == activity_id)
            .cloned()
            .collect();
        rows.sort_by_key(|c| (c.position, c.id));
        Ok(rows)
    }

    async fn get_component(&self, id: i64) -> anyhow::Result<Option<Component>> {
        Ok(self.components.lock().unwrap().get(&id).cloned())
    }

    async fn insert_component(
        &self,
        activity_id: i64,
        component: NewComponent,
    ) -> anyhow::Result<Component> {
        let now = Utc::now();
        let row = Component {
            id: self.mint_id(),
            activity_id,
            component_type: component.component_type,
            config: component.config,
            position: component.position,
            is_visible: component.is_visible,
            created_at: now,
            updated_at: now,
        };
        self.components.lock().unwrap().insert(row.id, row.clone());
        Ok(row)
    }

    async fn save_component(&self, component: &Component) -> anyhow::Result<()> {
        self.components
            .lock()
            .unwrap()
            .insert(component.id, component.clone());
        Ok(())
    }

    async fn delete_components_for_activity(&self, activity_id: i64) -> anyhow::Result<u64> {
        let mut components = self.components.lock().unwrap();
        let before = components.len();
        components.retain(|_, c| c.activity_id != activity_id);
        Ok((before - components.len()) as u64)
    }

    async fn insert_template(&self, template: NewTemplate) -> anyhow::Result<Template> {
        let now = Utc::now();
        let row = Template {
            id: self.mint_id(),
            name: template.name,
            code: template.code,
            category: template.category,
            description: template.description,
            layout_config: template.layout_config,
            default_data: template.default_data,
            is_system: template.is_system,
            is_active: template.is_active,
            usage_count: 0,
            created_at: now,
            updated_at: now,
        };
        self.templates.lock().unwrap().insert(row.id, row.clone());
        Ok(row)
    }

    async fn get_template(&self, id: i64) -> anyhow::Result<Option<Template>> {
        Ok(self.templates.lock().unwrap().get(&id).cloned())
    }

    async fn list_templates(&self, only_active: bool) -> anyhow::Result<Vec<Template>> {
        let mut rows: Vec<Template> = self
            .templates
            .lock()
            .unwrap()
            .values()
            .filter(|t| !only_active || t.is_active)
            .cloned()
            .collect();
        rows.sort_by_key(|t| t.id);
        Ok(rows)
    }

    async fn template_code_exists(&self, code: &str) -> anyhow::Result<bool> {
        Ok(self
            .templates
            .lock()
            .unwrap()
            .values()
            .any(|t| t.code == code))
    }

    async fn increment_template_usage(&self, id: i64) -> anyhow::Result<()> {
        if let Some(template) = self.templates.lock().unwrap().get_mut(&id) {
            template.usage_count += 1;
        }
        Ok(())
    }

    async fn delete_template(&self, id: i64) -> anyhow::Result<bool> {
        Ok(self.templates.lock().unwrap().remove(&id).is_some())
    }

    async fn flush(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Bus that records every dispatch as (event name, activity id).
#[derive(Default)]
pub struct RecordingBus {
    dispatched: Mutex<Vec<(String, i64)>>,
}

impl RecordingBus {
    pub fn dispatched(&self) -> Vec<(String, i64)> {
        self.dispatched.lock().unwrap().clone()
    }
}

impl LifecycleEventBus for RecordingBus {
    fn dispatch(&self, event: &str, activity: &Activity, _context: &Value) {
        self.dispatched
            .lock()
            .unwrap()
            .push((event.to_string(), activity.id));
    }
}
