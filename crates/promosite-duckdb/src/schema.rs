/// DuckDB initialization SQL.
///
/// Executed once at database open time via `Connection::execute_batch`.
/// Every statement uses `IF NOT EXISTS` so the whole block is safe to
/// re-run on every startup.
///
/// `memory_limit` is a DuckDB size string ("512MB", "1GB", ...) passed
/// through from `Config.duckdb_memory_limit`. An explicit limit is always
/// set — the DuckDB default of 80% of system RAM is not acceptable for a
/// server process. `threads = 2` bounds the background pool for
/// single-writer embedded use.
pub fn init_sql(memory_limit: &str) -> String {
    format!(
        r#"SET memory_limit = '{memory_limit}';
SET threads = 2;

CREATE SEQUENCE IF NOT EXISTS seq_activity_id;
CREATE SEQUENCE IF NOT EXISTS seq_component_id;
CREATE SEQUENCE IF NOT EXISTS seq_template_id;

-- ===========================================
-- ACTIVITIES
-- ===========================================
CREATE TABLE IF NOT EXISTS activities (
    id              BIGINT PRIMARY KEY,
    title           VARCHAR NOT NULL,
    slug            VARCHAR NOT NULL UNIQUE,
    description     VARCHAR,
    cover_image     VARCHAR,
    status          VARCHAR NOT NULL,              -- draft | scheduled | published | archived | deleted
    start_time      TIMESTAMP,
    end_time        TIMESTAMP,
    publish_time    TIMESTAMP,
    archive_time    TIMESTAMP,
    layout_config   VARCHAR NOT NULL,              -- JSON text
    seo_config      VARCHAR NOT NULL,              -- JSON text
    share_config    VARCHAR NOT NULL,              -- JSON text
    access_config   VARCHAR NOT NULL,              -- JSON text
    template_id     BIGINT,
    deleted_at      TIMESTAMP,
    created_at      TIMESTAMP NOT NULL,
    updated_at      TIMESTAMP NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_activities_status ON activities(status);
-- Accelerates the scheduler sweeps (due-for-publish / due-for-archive)
CREATE INDEX IF NOT EXISTS idx_activities_status_start ON activities(status, start_time);
CREATE INDEX IF NOT EXISTS idx_activities_status_end   ON activities(status, end_time);

-- ===========================================
-- COMPONENTS (ordered blocks of an activity)
-- ===========================================
CREATE TABLE IF NOT EXISTS components (
    id              BIGINT PRIMARY KEY,
    activity_id     BIGINT NOT NULL,
    component_type  VARCHAR NOT NULL,
    config          VARCHAR NOT NULL,              -- JSON text
    position        INTEGER NOT NULL,
    is_visible      BOOLEAN NOT NULL DEFAULT true,
    created_at      TIMESTAMP NOT NULL,
    updated_at      TIMESTAMP NOT NULL
);
-- Primary read pattern: one activity's list in render order
CREATE INDEX IF NOT EXISTS idx_components_activity_position
    ON components(activity_id, position, id);

-- ===========================================
-- TEMPLATES
-- ===========================================
CREATE TABLE IF NOT EXISTS templates (
    id              BIGINT PRIMARY KEY,
    name            VARCHAR NOT NULL,
    code            VARCHAR NOT NULL UNIQUE,
    category        VARCHAR NOT NULL,
    description     VARCHAR,
    layout_config   VARCHAR NOT NULL,              -- JSON text
    default_data    VARCHAR NOT NULL,              -- JSON text
    is_system       BOOLEAN NOT NULL DEFAULT false,
    is_active       BOOLEAN NOT NULL DEFAULT true,
    usage_count     BIGINT NOT NULL DEFAULT 0,
    created_at      TIMESTAMP NOT NULL,
    updated_at      TIMESTAMP NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_templates_active ON templates(is_active);

-- ===========================================
-- EVENTS (raw interaction log)
-- ===========================================
CREATE TABLE IF NOT EXISTS events (
    id              VARCHAR NOT NULL,              -- UUID v4
    activity_id     BIGINT NOT NULL,
    session_id      VARCHAR NOT NULL,
    visitor_id      VARCHAR,                       -- set on view/visitor events
    user_id         BIGINT,
    event_type      VARCHAR NOT NULL,              -- view | click | share | form_submit | conversion | component_interact | visitor | stay_duration
    event_data      VARCHAR NOT NULL,              -- JSON text
    client_ip       VARCHAR,
    user_agent      VARCHAR,
    referer         VARCHAR,
    created_at      TIMESTAMP NOT NULL
);
-- Primary query pattern: activity + date range
CREATE INDEX IF NOT EXISTS idx_events_activity_time
    ON events(activity_id, created_at DESC);
-- Accelerates the uv dedup lookup (activity, type, visitor)
CREATE INDEX IF NOT EXISTS idx_events_activity_type_visitor
    ON events(activity_id, event_type, visitor_id);
-- Accelerates per-session grouping for bounce-rate recomputation
CREATE INDEX IF NOT EXISTS idx_events_activity_session
    ON events(activity_id, session_id, created_at);

-- ===========================================
-- DAILY STATS (one row per activity per day)
-- ===========================================
CREATE TABLE IF NOT EXISTS daily_stats (
    activity_id         BIGINT NOT NULL,
    date                DATE NOT NULL,
    pv                  BIGINT NOT NULL DEFAULT 0,
    uv                  BIGINT NOT NULL DEFAULT 0,
    share_count         BIGINT NOT NULL DEFAULT 0,
    form_submit_count   BIGINT NOT NULL DEFAULT 0,
    conversion_count    BIGINT NOT NULL DEFAULT 0,
    stay_duration       DOUBLE NOT NULL DEFAULT 0,
    bounce_rate         DOUBLE NOT NULL DEFAULT 0,
    device_stats        VARCHAR NOT NULL DEFAULT '{{}}',   -- JSON frequency map
    source_stats        VARCHAR NOT NULL DEFAULT '{{}}',   -- JSON frequency map
    region_stats        VARCHAR NOT NULL DEFAULT '{{}}',   -- JSON frequency map
    PRIMARY KEY (activity_id, date)
);

-- ===========================================
-- SESSIONS (per-visitor key/value storage)
-- ===========================================
CREATE TABLE IF NOT EXISTS sessions (
    session_id      VARCHAR NOT NULL,
    key             VARCHAR NOT NULL,
    value           VARCHAR NOT NULL,
    updated_at      TIMESTAMP NOT NULL,
    PRIMARY KEY (session_id, key)
);
"#
    )
}
