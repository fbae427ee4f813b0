use crate::state::WorkflowState;

pub const NO_INFORMATION: &str = "No relevant information available.";

pub const SECTIONS: [&str; 8] = [
    "Incident description",
    "Root cause analysis",
    "Severity level",
    "Similar prior incidents",
    "Internal documentation",
    "External documentation",
    "Recommendations",
    "References",
];

fn or_none(body: Option<String>) -> String {
    body.filter(|b| !b.trim().is_empty())
        .unwrap_or_else(|| NO_INFORMATION.to_string())
}

/// Assemble the eight-section report from whatever slots are filled and
/// store it in `report`. Every section is always present. References list
/// internal documents before external ones, each in retrieval order.
pub fn generate(state: &mut WorkflowState) -> String {
    let description = state.incident.as_ref().map(|i| i.summary());

    let severity = state.severity.map(|s| match &state.severity_explanation {
        Some(why) if !why.is_empty() => format!("{s}\n\n{why}"),
        _ => s.to_string(),
    });

    let prior = state
        .prior_incidents
        .as_ref()
        .filter(|p| !p.is_empty())
        .map(|p| p.join("\n"));

    let internal = state
        .internal_search
        .as_ref()
        .map(|r| r.search_result.clone());
    let external = state
        .external_search
        .as_ref()
        .map(|r| r.search_results.clone());

    let recommendations = if state.actions.is_empty() {
        None
    } else {
        let lines: Vec<String> = state
            .actions
            .iter()
            .map(|a| {
                format!(
                    "- {}({}): {} [{}]",
                    a.tool_name,
                    a.parameters_display(),
                    a.reason_to_perform,
                    a.status
                )
            })
            .collect();
        Some(lines.join("\n"))
    };

    let references: Vec<String> = state
        .internal_search
        .iter()
        .flat_map(|r| r.references.iter())
        .chain(state.external_search.iter().flat_map(|r| r.references.iter()))
        .map(|d| format!("- [{}]({})", d.title, d.url))
        .collect();
    let references = (!references.is_empty()).then(|| references.join("\n"));

    let bodies = [
        description,
        state.analysis.clone(),
        severity,
        prior,
        internal,
        external,
        recommendations,
        references,
    ];

    let title = match &state.incident {
        Some(i) => format!("# Root cause analysis report: incident {}", i.id),
        None => "# Root cause analysis report".to_string(),
    };
    let mut out = title;
    for (i, (name, body)) in SECTIONS.iter().zip(bodies).enumerate() {
        out.push_str(&format!("\n\n## {}. {name}\n\n{}", i + 1, or_none(body)));
    }
    out.push('\n');

    tracing::info!(bytes = out.len(), "report generated");
    state.report = Some(out.clone());
    out
}
