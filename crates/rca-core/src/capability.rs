use reasoning_agent::ToolSpec;
use serde_json::{json, Map, Value};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::error::{RcaError, Result};
use crate::state::WorkflowState;
use crate::store::IncidentStore;

pub const ADJUSTMENT_ISSUED: &str = "Uplink adjustment request has been issued. It can take up to an hour for the changes to take the effect.";

// ---------------------------------------------------------------------------
// NetworkTool
// ---------------------------------------------------------------------------

/// Network operations a rule may allow a reasoning step to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NetworkTool {
    GetCellTraceStatistics,
    GetUplinkRssiLevel,
    GetUplinkConfiguration,
    InitiateUplinkConfigurationAdjustment,
}

impl NetworkTool {
    pub fn all() -> &'static [NetworkTool] {
        &[
            NetworkTool::GetCellTraceStatistics,
            NetworkTool::GetUplinkRssiLevel,
            NetworkTool::GetUplinkConfiguration,
            NetworkTool::InitiateUplinkConfigurationAdjustment,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NetworkTool::GetCellTraceStatistics => "get_cell_trace_statistics",
            NetworkTool::GetUplinkRssiLevel => "get_uplink_rssi_level",
            NetworkTool::GetUplinkConfiguration => "get_uplink_configuration",
            NetworkTool::InitiateUplinkConfigurationAdjustment => {
                "initiate_uplink_configuration_adjustment"
            }
        }
    }

    pub fn spec(self) -> ToolSpec {
        let cell_args = json!({
            "type": "object",
            "properties": {
                "enodeb_id": { "type": "string" },
                "cell_id": { "type": "string" }
            },
            "required": ["enodeb_id", "cell_id"]
        });
        match self {
            NetworkTool::GetCellTraceStatistics => ToolSpec::new(
                self.as_str(),
                "Connection outcome counts of the incident cell's traces during the incident window.",
                json!({ "type": "object", "properties": {} }),
            ),
            NetworkTool::GetUplinkRssiLevel => ToolSpec::new(
                self.as_str(),
                "Uplink received signal strength of a cell.",
                cell_args,
            ),
            NetworkTool::GetUplinkConfiguration => ToolSpec::new(
                self.as_str(),
                "Uplink power control configuration (pZeroNominalPucch, pZeroNominalPusch) of a cell.",
                cell_args,
            ),
            NetworkTool::InitiateUplinkConfigurationAdjustment => ToolSpec::new(
                self.as_str(),
                "Request an uplink power configuration adjustment for a cell.",
                cell_args,
            ),
        }
    }
}

impl fmt::Display for NetworkTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NetworkTool {
    type Err = RcaError;

    fn from_str(s: &str) -> Result<Self> {
        NetworkTool::all()
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| RcaError::Validation(format!("unknown tool '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// CapabilitySet
// ---------------------------------------------------------------------------

/// The tools one step invocation may call, computed from a state slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilitySet {
    tools: BTreeSet<NetworkTool>,
}

impl CapabilitySet {
    /// Unknown names are logged and ignored.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Self {
        let mut tools = BTreeSet::new();
        for name in names {
            match name.as_ref().parse::<NetworkTool>() {
                Ok(t) => {
                    tools.insert(t);
                }
                Err(_) => tracing::warn!(tool = name.as_ref(), "ignoring unknown tool in allow-list"),
            }
        }
        Self { tools }
    }

    pub fn resolve(&self, name: &str) -> Option<NetworkTool> {
        name.parse::<NetworkTool>()
            .ok()
            .filter(|t| self.tools.contains(t))
    }

    pub fn contains(&self, tool: NetworkTool) -> bool {
        self.tools.contains(&tool)
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tools.iter().map(|t| t.as_str()).collect()
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|t| t.spec()).collect()
    }
}

// ---------------------------------------------------------------------------
// NetworkTools
// ---------------------------------------------------------------------------

/// `{"status":"error","description":..}` reply handed back to the model or
/// the operator.
pub fn error_reply(description: impl fmt::Display) -> Value {
    json!({ "status": "error", "description": description.to_string() })
}

fn cell_args(args: &Value) -> std::result::Result<(String, String), Value> {
    let get = |key: &str| {
        args.get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| error_reply(format!("missing argument '{key}'")))
    };
    Ok((get("enodeb_id")?, get("cell_id")?))
}

/// Executes network tools against the store.
#[derive(Clone)]
pub struct NetworkTools {
    store: Arc<dyn IncidentStore>,
}

impl NetworkTools {
    pub fn new(store: Arc<dyn IncidentStore>) -> Self {
        Self { store }
    }

    /// Run one tool. Expected failures (missing arguments, store errors)
    /// come back as an error reply; invariant breaches propagate.
    pub async fn invoke(
        &self,
        tool: NetworkTool,
        args: &Value,
        state: &mut WorkflowState,
    ) -> Result<Value> {
        tracing::info!(tool = %tool, "invoking network tool");
        match self.dispatch(tool, args, state).await {
            Ok(v) => Ok(v),
            Err(e) if e.is_recoverable() => {
                tracing::error!(tool = %tool, error = %e, "network tool failed");
                Ok(error_reply(e))
            }
            Err(e) => Err(e),
        }
    }

    async fn dispatch(
        &self,
        tool: NetworkTool,
        args: &Value,
        state: &mut WorkflowState,
    ) -> Result<Value> {
        match tool {
            NetworkTool::GetCellTraceStatistics => self.cell_trace_statistics(state).await,
            NetworkTool::GetUplinkRssiLevel => self.uplink_rssi_level(args).await,
            NetworkTool::GetUplinkConfiguration => self.uplink_configuration(args).await,
            NetworkTool::InitiateUplinkConfigurationAdjustment => {
                self.uplink_adjustment(args).await
            }
        }
    }

    async fn uplink_rssi_level(&self, args: &Value) -> Result<Value> {
        let (enodeb_id, cell_id) = match cell_args(args) {
            Ok(ids) => ids,
            Err(reply) => return Ok(reply),
        };
        Ok(match self.store.uplink_rssi(&enodeb_id, &cell_id).await? {
            Some(rssi) => json!({
                "status": "success",
                "uplink_signal_strength": rssi.to_string(),
            }),
            None => not_configured(&enodeb_id, &cell_id),
        })
    }

    async fn uplink_configuration(&self, args: &Value) -> Result<Value> {
        let (enodeb_id, cell_id) = match cell_args(args) {
            Ok(ids) => ids,
            Err(reply) => return Ok(reply),
        };
        Ok(match self.store.uplink_configuration(&enodeb_id, &cell_id).await? {
            Some(cfg) => json!({
                "status": "success",
                "pZeroNominalPucch": cfg.p_zero_nominal_pucch.to_string(),
                "pZeroNominalPusch": cfg.p_zero_nominal_pusch.to_string(),
            }),
            None => not_configured(&enodeb_id, &cell_id),
        })
    }

    async fn uplink_adjustment(&self, args: &Value) -> Result<Value> {
        let (enodeb_id, cell_id) = match cell_args(args) {
            Ok(ids) => ids,
            Err(reply) => return Ok(reply),
        };
        self.store
            .request_uplink_adjustment(&enodeb_id, &cell_id)
            .await?;
        Ok(json!({ "status": "success", "message": ADJUSTMENT_ISSUED }))
    }

    async fn cell_trace_statistics(&self, state: &mut WorkflowState) -> Result<Value> {
        let incident = state.incident()?;
        let (Some(enodeb_id), Some(cell_id)) = (&incident.enodeb_id, &incident.cell_id) else {
            return Ok(error_reply("incident has no eNodeB or cell id"));
        };
        let end = incident.end_time.unwrap_or_else(chrono::Utc::now);
        let stats = self
            .store
            .cell_trace_stats(enodeb_id, cell_id, incident.start_time, end)
            .await?;
        if stats.is_empty() {
            return Ok(json!({ "status": "No cell traces found" }));
        }
        let summary: Vec<String> = stats
            .iter()
            .map(|s| format!("{}: {}", s.connection_outcome, s.count))
            .collect();
        state.append_narrative("Cell traces statistics", &summary.join(", "));
        let counts: Map<String, Value> = stats
            .into_iter()
            .map(|s| (s.connection_outcome, Value::from(s.count)))
            .collect();
        Ok(json!({ "status": "Success", "cell_traces_statistics": counts }))
    }
}

fn not_configured(enodeb_id: &str, cell_id: &str) -> Value {
    json!({
        "status": "not found",
        "description": format!("No configuration found for eNodeB {enodeb_id} cell {cell_id}"),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
