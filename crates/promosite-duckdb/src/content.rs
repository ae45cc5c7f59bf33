//! `ContentStore` implementation: activities, components, templates.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use duckdb::Connection;

use promosite_core::activity::{Activity, ActivityStatus, NewActivity};
use promosite_core::component::{Component, NewComponent};
use promosite_core::store::ContentStore;
use promosite_core::template::{NewTemplate, Template};

use crate::backend::{fmt_ts, fmt_ts_opt, parse_json, parse_ts, parse_ts_opt};
use crate::DuckDbBackend;

const ACTIVITY_COLUMNS: &str = "id, title, slug, description, cover_image, status, \
     CAST(start_time AS VARCHAR), CAST(end_time AS VARCHAR), \
     CAST(publish_time AS VARCHAR), CAST(archive_time AS VARCHAR), \
     layout_config, seo_config, share_config, access_config, template_id, \
     CAST(deleted_at AS VARCHAR), CAST(created_at AS VARCHAR), CAST(updated_at AS VARCHAR)";

const COMPONENT_COLUMNS: &str = "id, activity_id, component_type, config, position, is_visible, \
     CAST(created_at AS VARCHAR), CAST(updated_at AS VARCHAR)";

const TEMPLATE_COLUMNS: &str = "id, name, code, category, description, layout_config, \
     default_data, is_system, is_active, usage_count, \
     CAST(created_at AS VARCHAR), CAST(updated_at AS VARCHAR)";

struct ActivityRow {
    id: i64,
    title: String,
    slug: String,
    description: Option<String>,
    cover_image: Option<String>,
    status: String,
    start_time: Option<String>,
    end_time: Option<String>,
    publish_time: Option<String>,
    archive_time: Option<String>,
    layout_config: String,
    seo_config: String,
    share_config: String,
    access_config: String,
    template_id: Option<i64>,
    deleted_at: Option<String>,
    created_at: String,
    updated_at: String,
}

impl ActivityRow {
    fn from_row(row: &duckdb::Row<'_>) -> duckdb::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            slug: row.get(2)?,
            description: row.get(3)?,
            cover_image: row.get(4)?,
            status: row.get(5)?,
            start_time: row.get(6)?,
            end_time: row.get(7)?,
            publish_time: row.get(8)?,
            archive_time: row.get(9)?,
            layout_config: row.get(10)?,
            seo_config: row.get(11)?,
            share_config: row.get(12)?,
            access_config: row.get(13)?,
            template_id: row.get(14)?,
            deleted_at: row.get(15)?,
            created_at: row.get(16)?,
            updated_at: row.get(17)?,
        })
    }

    fn into_activity(self) -> Result<Activity> {
        let status = ActivityStatus::parse(&self.status)
            .ok_or_else(|| anyhow::anyhow!("unknown activity status '{}'", self.status))?;
        Ok(Activity {
            id: self.id,
            title: self.title,
            slug: self.slug,
            description: self.description,
            cover_image: self.cover_image,
            status,
            start_time: parse_ts_opt(self.start_time)?,
            end_time: parse_ts_opt(self.end_time)?,
            publish_time: parse_ts_opt(self.publish_time)?,
            archive_time: parse_ts_opt(self.archive_time)?,
            layout_config: parse_json(&self.layout_config),
            seo_config: parse_json(&self.seo_config),
            share_config: parse_json(&self.share_config),
            access_config: parse_json(&self.access_config),
            template_id: self.template_id,
            deleted_at: parse_ts_opt(self.deleted_at)?,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
        })
    }
}

struct ComponentRow {
    id: i64,
    activity_id: i64,
    component_type: String,
    config: String,
    position: i32,
    is_visible: bool,
    created_at: String,
    updated_at: String,
}

impl ComponentRow {
    fn from_row(row: &duckdb::Row<'_>) -> duckdb::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            activity_id: row.get(1)?,
            component_type: row.get(2)?,
            config: row.get(3)?,
            position: row.get(4)?,
            is_visible: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    fn into_component(self) -> Result<Component> {
        Ok(Component {
            id: self.id,
            activity_id: self.activity_id,
            component_type: self.component_type,
            config: parse_json(&self.config),
            position: self.position,
            is_visible: self.is_visible,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
        })
    }
}

struct TemplateRow {
    id: i64,
    name: String,
    code: String,
    category: String,
    description: Option<String>,
    layout_config: String,
    default_data: String,
    is_system: bool,
    is_active: bool,
    usage_count: i64,
    created_at: String,
    updated_at: String,
}

impl TemplateRow {
    fn from_row(row: &duckdb::Row<'_>) -> duckdb::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            code: row.get(2)?,
            category: row.get(3)?,
            description: row.get(4)?,
            layout_config: row.get(5)?,
            default_data: row.get(6)?,
            is_system: row.get(7)?,
            is_active: row.get(8)?,
            usage_count: row.get(9)?,
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
        })
    }

    fn into_template(self) -> Result<Template> {
        Ok(Template {
            id: self.id,
            name: self.name,
            code: self.code,
            category: self.category,
            description: self.description,
            layout_config: parse_json(&self.layout_config),
            default_data: parse_json(&self.default_data),
            is_system: self.is_system,
            is_active: self.is_active,
            usage_count: self.usage_count,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
        })
    }
}

fn get_activity_sync(conn: &Connection, id: i64) -> Result<Option<Activity>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ACTIVITY_COLUMNS} FROM activities WHERE id = ?1"
    ))?;
    let row = stmt
        .query_row(duckdb::params![id], ActivityRow::from_row)
        .map(Some)
        .or_else(|e| match e {
            duckdb::Error::QueryReturnedNoRows => Ok(None),
            other => Err(other),
        })?;
    row.map(ActivityRow::into_activity).transpose()
}

fn activities_by_due_query(
    conn: &Connection,
    sql: &str,
    now: DateTime<Utc>,
) -> Result<Vec<Activity>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(duckdb::params![fmt_ts(now)], ActivityRow::from_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?.into_activity()?);
    }
    Ok(out)
}

#[async_trait]
impl ContentStore for DuckDbBackend {
    async fn insert_activity(&self, activity: NewActivity) -> Result<Activity> {
        let conn = self.conn.lock().await;
        let id = Self::next_id(&conn, "seq_activity_id")?;
        let now = fmt_ts(Utc::now());
        conn.execute(
            "INSERT INTO activities (id, title, slug, description, cover_image, status, \
             start_time, end_time, layout_config, seo_config, share_config, access_config, \
             template_id, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            duckdb::params![
                id,
                activity.title,
                activity.slug,
                activity.description,
                activity.cover_image,
                activity.status.as_str(),
                fmt_ts_opt(activity.start_time),
                fmt_ts_opt(activity.end_time),
                activity.layout_config.to_string(),
                activity.seo_config.to_string(),
                activity.share_config.to_string(),
                activity.access_config.to_string(),
                activity.template_id,
                now,
                now,
            ],
        )?;
        get_activity_sync(&conn, id)?
            .ok_or_else(|| anyhow::anyhow!("activity {id} vanished after insert"))
    }

    async fn get_activity(&self, id: i64) -> Result<Option<Activity>> {
        let conn = self.conn.lock().await;
        get_activity_sync(&conn, id)
    }

    async fn save_activity(&self, activity: &Activity) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "UPDATE activities SET title = ?1, slug = ?2, description = ?3, cover_image = ?4, \
             status = ?5, start_time = ?6, end_time = ?7, publish_time = ?8, archive_time = ?9, \
             layout_config = ?10, seo_config = ?11, share_config = ?12, access_config = ?13, \
             template_id = ?14, deleted_at = ?15, updated_at = ?16 \
             WHERE id = ?17",
            duckdb::params![
                activity.title,
                activity.slug,
                activity.description,
                activity.cover_image,
                activity.status.as_str(),
                fmt_ts_opt(activity.start_time),
                fmt_ts_opt(activity.end_time),
                fmt_ts_opt(activity.publish_time),
                fmt_ts_opt(activity.archive_time),
                activity.layout_config.to_string(),
                activity.seo_config.to_string(),
                activity.share_config.to_string(),
                activity.access_config.to_string(),
                activity.template_id,
                fmt_ts_opt(activity.deleted_at),
                fmt_ts(activity.updated_at),
                activity.id,
            ],
        )?;
        Ok(())
    }

    async fn remove_activity(&self, id: i64) -> Result<bool> {
        let conn = self.conn.lock().await;
        let removed = conn.execute("DELETE FROM activities WHERE id = ?1", duckdb::params![id])?;
        Ok(removed > 0)
    }

    async fn slug_exists(&self, slug: &str) -> Result<bool> {
        let conn = self.conn.lock().await;
        let count: i64 = conn
            .prepare("SELECT COUNT(*) FROM activities WHERE slug = ?1")?
            .query_row(duckdb::params![slug], |row| row.get(0))?;
        Ok(count > 0)
    }

    async fn activities_due_for_publish(&self, now: DateTime<Utc>) -> Result<Vec<Activity>> {
        let conn = self.conn.lock().await;
        activities_by_due_query(
            &conn,
            &format!(
                "SELECT {ACTIVITY_COLUMNS} FROM activities \
                 WHERE status = 'scheduled' AND start_time IS NOT NULL AND start_time <= ?1 \
                 ORDER BY start_time"
            ),
            now,
        )
    }

    async fn activities_due_for_archive(&self, now: DateTime<Utc>) -> Result<Vec<Activity>> {
        let conn = self.conn.lock().await;
        activities_by_due_query(
            &conn,
            &format!(
                "SELECT {ACTIVITY_COLUMNS} FROM activities \
                 WHERE status = 'published' AND end_time IS NOT NULL AND end_time <= ?1 \
                 ORDER BY end_time"
            ),
            now,
        )
    }

    async fn components_for_activity(&self, activity_id: i64) -> Result<Vec<Component>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&format!(
            "SELECT {COMPONENT_COLUMNS} FROM components \
             WHERE activity_id = ?1 ORDER BY position, id"
        ))?;
        let rows = stmt.query_map(duckdb::params![activity_id], ComponentRow::from_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?.into_component()?);
        }
        Ok(out)
    }

    async fn get_component(&self, id: i64) -> Result<Option<Component>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&format!(
            "SELECT {COMPONENT_COLUMNS} FROM components WHERE id = ?1"
        ))?;
        let row = stmt
            .query_row(duckdb::params![id], ComponentRow::from_row)
            .map(Some)
            .or_else(|e| match e {
                duckdb::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })?;
        row.map(ComponentRow::into_component).transpose()
    }

    async fn insert_component(
        &self,
        activity_id: i64,
        component: NewComponent,
    ) -> Result<Component> {
        let conn = self.conn.lock().await;
        let id = Self::next_id(&conn, "seq_component_id")?;
        let now = fmt_ts(Utc::now());
        conn.execute(
            "INSERT INTO components (id, activity_id, component_type, config, position, \
             is_visible, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            duckdb::params![
                id,
                activity_id,
                component.component_type,
                component.config.to_string(),
                component.position,
                component.is_visible,
                now,
                now,
            ],
        )?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {COMPONENT_COLUMNS} FROM components WHERE id = ?1"
        ))?;
        let row = stmt.query_row(duckdb::params![id], ComponentRow::from_row)?;
        row.into_component()
    }

    async fn save_component(&self, component: &Component) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "UPDATE components SET component_type = ?1, config = ?2, position = ?3, \
             is_visible = ?4, updated_at = ?5 WHERE id = ?6",
            duckdb::params![
                component.component_type,
                component.config.to_string(),
                component.position,
                component.is_visible,
                fmt_ts(component.updated_at),
                component.id,
            ],
        )?;
        Ok(())
    }

    async fn delete_components_for_activity(&self, activity_id: i64) -> Result<u64> {
        let conn = self.conn.lock().await;
        let removed = conn.execute(
            "DELETE FROM components WHERE activity_id = ?1",
            duckdb::params![activity_id],
        )?;
        Ok(removed as u64)
    }

    async fn insert_template(&self, template: NewTemplate) -> Result<Template> {
        let conn = self.conn.lock().await;
        let id = Self::next_id(&conn, "seq_template_id")?;
        let now = fmt_ts(Utc::now());
        conn.execute(
            "INSERT INTO templates (id, name, code, category, description, layout_config, \
             default_data, is_system, is_active, usage_count, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0, ?10, ?11)",
            duckdb::params![
                id,
                template.name,
                template.code,
                template.category,
                template.description,
                template.layout_config.to_string(),
                template.default_data.to_string(),
                template.is_system,
                template.is_active,
                now,
                now,
            ],
        )?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM templates WHERE id = ?1"
        ))?;
        let row = stmt.query_row(duckdb::params![id], TemplateRow::from_row)?;
        row.into_template()
    }

    async fn get_template(&self, id: i64) -> Result<Option<Template>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM templates WHERE id = ?1"
        ))?;
        let row = stmt
            .query_row(duckdb::params![id], TemplateRow::from_row)
            .map(Some)
            .or_else(|e| match e {
                duckdb::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })?;
        row.map(TemplateRow::into_template).transpose()
    }

    async fn list_templates(&self, only_active: bool) -> Result<Vec<Template>> {
        let conn = self.conn.lock().await;
        let sql = if only_active {
            format!("SELECT {TEMPLATE_COLUMNS} FROM templates WHERE is_active ORDER BY id")
        } else {
            format!("SELECT {TEMPLATE_COLUMNS} FROM templates ORDER BY id")
        };
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], TemplateRow::from_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?.into_template()?);
        }
        Ok(out)
    }

    async fn template_code_exists(&self, code: &str) -> Result<bool> {
        let conn = self.conn.lock().await;
        let count: i64 = conn
            .prepare("SELECT COUNT(*) FROM templates WHERE code = ?1")?
            .query_row(duckdb::params![code], |row| row.get(0))?;
        Ok(count > 0)
    }

    async fn increment_template_usage(&self, id: i64) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "UPDATE templates SET usage_count = usage_count + 1, \
             updated_at = CURRENT_TIMESTAMP WHERE id = ?1",
            duckdb::params![id],
        )?;
        Ok(())
    }

    async fn delete_template(&self, id: i64) -> Result<bool> {
        let conn = self.conn.lock().await;
        let removed = conn.execute("DELETE FROM templates WHERE id = ?1", duckdb::params![id])?;
        Ok(removed > 0)
    }

    async fn flush(&self) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute_batch("CHECKPOINT")?;
        Ok(())
    }
}
