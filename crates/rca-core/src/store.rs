use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::{RcaError, Result};
use crate::incident::{parse_timestamp, to_wire, Incident, IncidentUpdate, MissedKpi};
use crate::similarity::{rank_neighbors, DistanceMetric, VectorQuery};
use crate::types::{IncidentStatus, Severity};

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One (eNodeB, cell) group whose KPI fell below the threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct KpiBreach {
    pub enodeb_id: String,
    pub cell_id: String,
    pub kpi: String,
    pub avg_value: f64,
    pub started: DateTime<Utc>,
    pub ended: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellTraceStat {
    pub connection_outcome: String,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UplinkConfiguration {
    pub p_zero_nominal_pucch: i64,
    pub p_zero_nominal_pusch: i64,
}

/// A stored incident close to the query embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct PriorIncident {
    pub incident_id: String,
    pub distance: f64,
    pub events: String,
    pub final_analysis: Option<String>,
    pub cause: Option<String>,
    pub resolution: Option<String>,
}

// ---------------------------------------------------------------------------
// IncidentStore
// ---------------------------------------------------------------------------

/// The structured store the workflow runs queries against. Every call is
/// bounded by the store's query timeout.
#[async_trait]
pub trait IncidentStore: Send + Sync {
    /// `Ok(None)` when no row matches; more than one row is a validation
    /// violation.
    async fn get_incident(&self, id: &str) -> Result<Option<Incident>>;
    async fn list_incidents(&self) -> Result<Vec<Incident>>;
    async fn insert_incident(&self, incident: &Incident) -> Result<()>;
    async fn update_incident(&self, id: &str, update: &IncidentUpdate) -> Result<()>;
    async fn kpi_breaches(&self, kpi: &str, threshold: f64) -> Result<Vec<KpiBreach>>;
    async fn cell_trace_stats(
        &self,
        enodeb_id: &str,
        cell_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CellTraceStat>>;
    async fn uplink_rssi(&self, enodeb_id: &str, cell_id: &str) -> Result<Option<f64>>;
    async fn uplink_configuration(
        &self,
        enodeb_id: &str,
        cell_id: &str,
    ) -> Result<Option<UplinkConfiguration>>;
    async fn request_uplink_adjustment(&self, enodeb_id: &str, cell_id: &str) -> Result<()>;
    /// Nearest stored incidents by `events_embeddings`, ascending distance.
    async fn nearest_incidents(&self, query: VectorQuery<'_>) -> Result<Vec<PriorIncident>>;
}

// ---------------------------------------------------------------------------
// Fixture data
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiMeasurement {
    pub enodeb_id: String,
    pub cell_id: String,
    pub kpi: String,
    pub value: f64,
    pub measurement_start: DateTime<Utc>,
    pub measurement_end: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellTrace {
    pub enodeb_id: String,
    pub cell_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub connection_outcome: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellConfig {
    pub enodeb_id: String,
    pub cell_id: String,
    pub uplink_rssi: f64,
    pub p_zero_nominal_pucch: i64,
    pub p_zero_nominal_pusch: i64,
}

/// Network data loaded with `rca data load`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataSet {
    #[serde(default)]
    pub performance_kpi: Vec<KpiMeasurement>,
    #[serde(default)]
    pub cell_traces: Vec<CellTrace>,
    #[serde(default)]
    pub cell_config: Vec<CellConfig>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadCounts {
    pub performance_kpi: usize,
    pub cell_traces: usize,
    pub cell_config: usize,
}

// ---------------------------------------------------------------------------
// SqliteStore
// ---------------------------------------------------------------------------

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS incidents (
    incident_id TEXT NOT NULL,
    enodeb_id TEXT,
    cell_id TEXT,
    start_ts TEXT NOT NULL,
    end_ts TEXT,
    status TEXT NOT NULL,
    description TEXT NOT NULL,
    kpi_missed TEXT NOT NULL DEFAULT '[]',
    severity TEXT,
    cause TEXT,
    preliminary_analysis TEXT,
    final_analysis TEXT,
    resolution TEXT,
    events TEXT,
    events_embeddings TEXT
);
CREATE INDEX IF NOT EXISTS incidents_by_id ON incidents (incident_id);
CREATE TABLE IF NOT EXISTS performance_kpi (
    enodeb_id TEXT NOT NULL,
    cell_id TEXT NOT NULL,
    kpi TEXT NOT NULL,
    value REAL NOT NULL,
    measurement_start TEXT NOT NULL,
    measurement_end TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS cell_traces (
    enodeb_id TEXT NOT NULL,
    cell_id TEXT NOT NULL,
    start_time TEXT NOT NULL,
    end_time TEXT NOT NULL,
    connection_outcome TEXT
);
CREATE TABLE IF NOT EXISTS cell_config (
    enodeb_id TEXT NOT NULL,
    cell_id TEXT NOT NULL,
    uplink_rssi REAL NOT NULL,
    p_zero_nominal_pucch INTEGER NOT NULL,
    p_zero_nominal_pusch INTEGER NOT NULL,
    PRIMARY KEY (enodeb_id, cell_id)
);
CREATE TABLE IF NOT EXISTS uplink_adjustments (
    enodeb_id TEXT NOT NULL,
    cell_id TEXT NOT NULL,
    requested_at TEXT NOT NULL
);
";

const INCIDENT_COLUMNS: &str =
    "incident_id, enodeb_id, cell_id, start_ts, end_ts, status, description, kpi_missed, severity, cause, resolution";

/// SQLite-backed store. Timestamps are stored in the wire format, which
/// sorts lexicographically; embeddings and KPI lists as JSON arrays.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    timeout: Duration,
}

impl SqliteStore {
    pub fn open(path: &Path, timeout: Duration) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::with_connection(Connection::open(path)?, timeout)
    }

    pub fn open_in_memory(timeout: Duration) -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, timeout)
    }

    fn with_connection(conn: Connection, timeout: Duration) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            timeout,
        })
    }

    /// Run `f` on the blocking pool under the query timeout. Driver errors
    /// surface as `Upstream`; decoding errors keep their own kind.
    async fn call<F, T>(&self, op: &'static str, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let task = tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| RcaError::Upstream("store connection poisoned".into()))?;
            f(&*guard)
        });
        match tokio::time::timeout(self.timeout, task).await {
            Err(_) => {
                tracing::error!(op, timeout_secs = self.timeout.as_secs(), "store call timed out");
                Err(RcaError::Timeout(self.timeout.as_secs()))
            }
            Ok(Err(join)) => Err(RcaError::Upstream(format!("{op}: store task failed: {join}"))),
            Ok(Ok(res)) => res.map_err(|e| match e {
                RcaError::Sqlite(err) => {
                    tracing::error!(op, error = %err, "store call failed");
                    RcaError::Upstream(format!("{op}: {err}"))
                }
                other => other,
            }),
        }
    }

    pub async fn load_dataset(&self, data: DataSet) -> Result<LoadCounts> {
        self.call("load_dataset", move |conn| {
            let tx = conn.unchecked_transaction()?;
            for m in &data.performance_kpi {
                tx.execute(
                    "INSERT INTO performance_kpi (enodeb_id, cell_id, kpi, value, measurement_start, measurement_end)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        m.enodeb_id,
                        m.cell_id,
                        m.kpi,
                        m.value,
                        to_wire(&m.measurement_start),
                        to_wire(&m.measurement_end)
                    ],
                )?;
            }
            for t in &data.cell_traces {
                tx.execute(
                    "INSERT INTO cell_traces (enodeb_id, cell_id, start_time, end_time, connection_outcome)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        t.enodeb_id,
                        t.cell_id,
                        to_wire(&t.start_time),
                        to_wire(&t.end_time),
                        t.connection_outcome
                    ],
                )?;
            }
            for c in &data.cell_config {
                tx.execute(
                    "INSERT OR REPLACE INTO cell_config (enodeb_id, cell_id, uplink_rssi, p_zero_nominal_pucch, p_zero_nominal_pusch)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        c.enodeb_id,
                        c.cell_id,
                        c.uplink_rssi,
                        c.p_zero_nominal_pucch,
                        c.p_zero_nominal_pusch
                    ],
                )?;
            }
            tx.commit()?;
            Ok(LoadCounts {
                performance_kpi: data.performance_kpi.len(),
                cell_traces: data.cell_traces.len(),
                cell_config: data.cell_config.len(),
            })
        })
        .await
    }

    /// Pending adjustment requests for a cell.
    pub async fn uplink_adjustment_count(&self, enodeb_id: &str, cell_id: &str) -> Result<u64> {
        let (e, c) = (enodeb_id.to_string(), cell_id.to_string());
        self.call("uplink_adjustment_count", move |conn| {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM uplink_adjustments WHERE enodeb_id = ?1 AND cell_id = ?2",
                params![e, c],
                |r| r.get(0),
            )?;
            Ok(n as u64)
        })
        .await
    }
}

struct IncidentRow {
    incident_id: String,
    enodeb_id: Option<String>,
    cell_id: Option<String>,
    start_ts: String,
    end_ts: Option<String>,
    status: String,
    description: String,
    kpi_missed: String,
    severity: Option<String>,
    cause: Option<String>,
    resolution: Option<String>,
}

impl IncidentRow {
    fn read(r: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            incident_id: r.get(0)?,
            enodeb_id: r.get(1)?,
            cell_id: r.get(2)?,
            start_ts: r.get(3)?,
            end_ts: r.get(4)?,
            status: r.get(5)?,
            description: r.get(6)?,
            kpi_missed: r.get(7)?,
            severity: r.get(8)?,
            cause: r.get(9)?,
            resolution: r.get(10)?,
        })
    }

    fn into_incident(self) -> Result<Incident> {
        let kpi_missed: Vec<MissedKpi> = serde_json::from_str(&self.kpi_missed)?;
        let severity = match self.severity.as_deref() {
            Some(s) if !s.is_empty() => Some(s.parse::<Severity>()?),
            _ => None,
        };
        Ok(Incident {
            id: self.incident_id,
            description: self.description,
            kpi_missed,
            enodeb_id: self.enodeb_id,
            cell_id: self.cell_id,
            status: self.status.parse::<IncidentStatus>()?,
            start_time: parse_timestamp(&self.start_ts)?,
            end_time: self.end_ts.as_deref().map(parse_timestamp).transpose()?,
            severity,
            cause: self.cause,
            resolution: self.resolution,
        })
    }
}

#[async_trait]
impl IncidentStore for SqliteStore {
    async fn get_incident(&self, id: &str) -> Result<Option<Incident>> {
        let id = id.to_string();
        self.call("get_incident", move |conn| {
            let sql = format!("SELECT {INCIDENT_COLUMNS} FROM incidents WHERE incident_id = ?1");
            tracing::debug!(sql = %sql, incident_id = %id, "query");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![id], IncidentRow::read)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            if rows.len() > 1 {
                return Err(RcaError::Validation(format!(
                    "retrieved more than one row for incident {id}"
                )));
            }
            rows.into_iter().next().map(IncidentRow::into_incident).transpose()
        })
        .await
    }

    async fn list_incidents(&self) -> Result<Vec<Incident>> {
        self.call("list_incidents", |conn| {
            let sql = format!("SELECT {INCIDENT_COLUMNS} FROM incidents ORDER BY start_ts, incident_id");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], IncidentRow::read)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows.into_iter().map(IncidentRow::into_incident).collect()
        })
        .await
    }

    async fn insert_incident(&self, incident: &Incident) -> Result<()> {
        let inc = incident.clone();
        let kpis = serde_json::to_string(&inc.kpi_missed)?;
        self.call("insert_incident", move |conn| {
            conn.execute(
                "INSERT INTO incidents (incident_id, enodeb_id, cell_id, start_ts, end_ts, status, description, kpi_missed, severity, cause, resolution)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    inc.id,
                    inc.enodeb_id,
                    inc.cell_id,
                    to_wire(&inc.start_time),
                    inc.end_time.as_ref().map(to_wire),
                    inc.status.as_str(),
                    inc.description,
                    kpis,
                    inc.severity.map(|s| s.as_str()),
                    inc.cause,
                    inc.resolution
                ],
            )?;
            tracing::info!(incident_id = %inc.id, "incident inserted");
            Ok(())
        })
        .await
    }

    async fn update_incident(&self, id: &str, update: &IncidentUpdate) -> Result<()> {
        let id = id.to_string();
        let up = update.clone();
        let embeddings = serde_json::to_string(&up.events_embeddings)?;
        self.call("update_incident", move |conn| {
            let changed = conn.execute(
                "UPDATE incidents SET status = ?1, preliminary_analysis = ?2, severity = ?3, events = ?4, events_embeddings = ?5
                 WHERE incident_id = ?6",
                params![
                    up.status.as_str(),
                    up.preliminary_analysis,
                    up.severity.map(|s| s.as_str()),
                    up.events,
                    embeddings,
                    id
                ],
            )?;
            if changed == 0 {
                return Err(RcaError::NotFound(id));
            }
            tracing::info!(incident_id = %id, "incident updated");
            Ok(())
        })
        .await
    }

    async fn kpi_breaches(&self, kpi: &str, threshold: f64) -> Result<Vec<KpiBreach>> {
        let kpi = kpi.to_string();
        self.call("kpi_breaches", move |conn| {
            // One group per cell: breaches are assumed contiguous in time.
            let mut stmt = conn.prepare(
                "SELECT enodeb_id, cell_id, AVG(value), MIN(measurement_end), MAX(measurement_end)
                 FROM performance_kpi WHERE kpi = ?1 AND value < ?2
                 GROUP BY enodeb_id, cell_id ORDER BY enodeb_id, cell_id",
            )?;
            let rows = stmt
                .query_map(params![kpi, threshold], |r| {
                    Ok((
                        r.get::<_, String>(0)?,
                        r.get::<_, String>(1)?,
                        r.get::<_, f64>(2)?,
                        r.get::<_, String>(3)?,
                        r.get::<_, String>(4)?,
                    ))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows.into_iter()
                .map(|(enodeb_id, cell_id, avg_value, first, last)| {
                    Ok(KpiBreach {
                        enodeb_id,
                        cell_id,
                        kpi: kpi.clone(),
                        avg_value,
                        started: parse_timestamp(&first)?,
                        ended: parse_timestamp(&last)?,
                    })
                })
                .collect()
        })
        .await
    }

    async fn cell_trace_stats(
        &self,
        enodeb_id: &str,
        cell_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CellTraceStat>> {
        let (e, c) = (enodeb_id.to_string(), cell_id.to_string());
        self.call("cell_trace_stats", move |conn| {
            let mut stmt = conn.prepare(
                "SELECT connection_outcome, COUNT(*) FROM cell_traces
                 WHERE enodeb_id = ?1 AND cell_id = ?2 AND start_time >= ?3 AND end_time <= ?4
                 GROUP BY connection_outcome ORDER BY connection_outcome",
            )?;
            let rows = stmt
                .query_map(params![e, c, to_wire(&start), to_wire(&end)], |r| {
                    let outcome: Option<String> = r.get(0)?;
                    let count: i64 = r.get(1)?;
                    Ok(CellTraceStat {
                        connection_outcome: outcome
                            .filter(|o| !o.is_empty())
                            .unwrap_or_else(|| "OTHER".to_string()),
                        count: count as u64,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
        .await
    }

    async fn uplink_rssi(&self, enodeb_id: &str, cell_id: &str) -> Result<Option<f64>> {
        let (e, c) = (enodeb_id.to_string(), cell_id.to_string());
        self.call("uplink_rssi", move |conn| {
            Ok(conn
                .query_row(
                    "SELECT uplink_rssi FROM cell_config WHERE enodeb_id = ?1 AND cell_id = ?2",
                    params![e, c],
                    |r| r.get(0),
                )
                .optional()?)
        })
        .await
    }

    async fn uplink_configuration(
        &self,
        enodeb_id: &str,
        cell_id: &str,
    ) -> Result<Option<UplinkConfiguration>> {
        let (e, c) = (enodeb_id.to_string(), cell_id.to_string());
        self.call("uplink_configuration", move |conn| {
            Ok(conn
                .query_row(
                    "SELECT p_zero_nominal_pucch, p_zero_nominal_pusch FROM cell_config
                     WHERE enodeb_id = ?1 AND cell_id = ?2",
                    params![e, c],
                    |r| {
                        Ok(UplinkConfiguration {
                            p_zero_nominal_pucch: r.get(0)?,
                            p_zero_nominal_pusch: r.get(1)?,
                        })
                    },
                )
                .optional()?)
        })
        .await
    }

    async fn request_uplink_adjustment(&self, enodeb_id: &str, cell_id: &str) -> Result<()> {
        let (e, c) = (enodeb_id.to_string(), cell_id.to_string());
        self.call("request_uplink_adjustment", move |conn| {
            conn.execute(
                "INSERT INTO uplink_adjustments (enodeb_id, cell_id, requested_at) VALUES (?1, ?2, ?3)",
                params![e, c, to_wire(&Utc::now())],
            )?;
            tracing::info!(enodeb_id = %e, cell_id = %c, "uplink adjustment requested");
            Ok(())
        })
        .await
    }

    async fn nearest_incidents(&self, query: VectorQuery<'_>) -> Result<Vec<PriorIncident>> {
        let embedding = query.embedding.to_vec();
        let (top_k, cutoff, metric): (usize, f64, DistanceMetric) =
            (query.top_k, query.cutoff, query.metric);
        self.call("nearest_incidents", move |conn| {
            let mut stmt = conn.prepare(
                "SELECT incident_id, events, final_analysis, cause, resolution, events_embeddings
                 FROM incidents WHERE events_embeddings IS NOT NULL",
            )?;
            let rows = stmt
                .query_map([], |r| {
                    Ok((
                        PriorIncident {
                            incident_id: r.get(0)?,
                            distance: 0.0,
                            events: r.get::<_, Option<String>>(1)?.unwrap_or_default(),
                            final_analysis: r.get(2)?,
                            cause: r.get(3)?,
                            resolution: r.get(4)?,
                        },
                        r.get::<_, String>(5)?,
                    ))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            let mut candidates = Vec::with_capacity(rows.len());
            for (prior, raw) in rows {
                let emb: Vec<f32> = serde_json::from_str(&raw)?;
                candidates.push((prior, emb));
            }
            let q = VectorQuery {
                embedding: &embedding,
                top_k,
                cutoff,
                metric,
            };
            Ok(rank_neighbors(&q, candidates)
                .into_iter()
                .map(|(mut prior, d)| {
                    prior.distance = d;
                    prior
                })
                .collect())
        })
        .await
    }
}

// ---------------------------------------------------------------------------
// Test support
// ---------------------------------------------------------------------------


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
