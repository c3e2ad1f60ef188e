//! Human-readable report rendering. `--json` bypasses this module.

use datashift_ingest::{
    DESCRIPTION_PREVIEW_CHARS, LoadReport, ProbeReport, Verdict, VerificationReport, preview,
};
use serde_json::Value;

pub fn render_load(report: &LoadReport) -> String {
    let mut lines = vec![format!(
        "Indexed {} of {} documents into {}",
        report.indexed, report.loaded, report.index
    )];
    if !report.failures.is_empty() {
        lines.push(format!("Failed: {}", report.failures.len()));
        for failure in &report.failures {
            let id = failure.id.as_deref().unwrap_or("<no id>");
            lines.push(format!("  {id}: {} {}", failure.status, failure.reason));
        }
    }
    lines.push(format!("Documents in {}: {}", report.index, report.final_count));
    lines.join("\n")
}

pub fn render_verification(report: &VerificationReport) -> String {
    let search = &report.search;
    let sql = &report.sql;
    let mut lines = vec![format!("Checked at {}", report.checked_at.to_rfc3339())];

    lines.push("Elasticsearch".to_string());
    if let Some(error) = &search.error {
        lines.push(format!("  error: {error}"));
    }
    lines.push(format!(
        "  cluster health: {}",
        search.health.as_deref().unwrap_or("unknown")
    ));
    lines.push(format!("  index exists: {}", yes_no(search.index_exists)));
    lines.push(format!("  documents: {}", search.count));
    if let Some(sample) = &search.sample {
        lines.push(format!("  sample: {}", compact(sample)));
    }

    lines.push("PostgreSQL".to_string());
    if let Some(error) = &sql.error {
        lines.push(format!("  error: {error}"));
    }
    lines.push(format!("  table exists: {}", yes_no(sql.table_exists)));
    if !sql.columns.is_empty() {
        let columns = sql
            .columns
            .iter()
            .map(|column| format!("{} {}", column.column_name, column.data_type))
            .collect::<Vec<_>>()
            .join(", ");
        lines.push(format!("  columns: {columns}"));
    }
    lines.push(format!("  rows: {}", sql.row_count));
    if let Some(sample) = &sql.sample {
        lines.push(format!("  sample: {}", compact(&Value::Object(sample.clone()))));
    }

    lines.push(format!("Verdict: {}", describe_verdict(report)));
    lines.join("\n")
}

pub fn render_probe(report: &ProbeReport) -> String {
    let mut lines = vec![format!(
        "Server: {}",
        report.server_name.as_deref().unwrap_or("<unnamed>")
    )];
    lines.push(format!("Tools: {}", report.tools.len()));
    for tool in &report.tools {
        lines.push(format!(
            "  - {}: {}",
            tool.name,
            preview(&tool.description, DESCRIPTION_PREVIEW_CHARS)
        ));
    }
    lines.join("\n")
}

fn describe_verdict(report: &VerificationReport) -> String {
    match report.verdict {
        Verdict::SourceEmpty => "no documents in the source index".to_string(),
        Verdict::TargetEmpty => "no transferred rows in the target table".to_string(),
        Verdict::Match => format!(
            "match ({} documents, {} transferred rows)",
            report.source_count, report.transferred_rows
        ),
        Verdict::Mismatch { difference } => format!(
            "mismatch ({} documents, {} transferred rows, difference {difference})",
            report.source_count, report.transferred_rows
        ),
    }
}

const fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

fn compact(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use datashift_ingest::{ProbedTool, SearchSide, SqlSide};
    use datashift_store::models::{BulkFailure, ColumnInfo};
    use serde_json::json;

    use super::*;

    #[test]
    fn load_lists_failures_by_id() {
        let report = LoadReport {
            index: "products".to_string(),
            loaded: 3,
            indexed: 2,
            failures: vec![BulkFailure {
                id: Some("P-3".to_string()),
                status: 400,
                reason: "mapper_parsing_exception".to_string(),
            }],
            final_count: 2,
        };

        let text = render_load(&report);

        assert!(text.starts_with("Indexed 2 of 3 documents into products"));
        assert!(text.contains("  P-3: 400 mapper_parsing_exception"));
        assert!(text.ends_with("Documents in products: 2"));
    }

    #[test]
    fn verification_shows_both_sides_and_verdict() {
        let mut sample = datashift_store::models::Row::new();
        sample.insert("id".to_string(), json!("P-1"));
        let report = VerificationReport {
            checked_at: Utc::now(),
            search: SearchSide {
                health: Some("yellow".to_string()),
                index_exists: true,
                count: 10,
                sample: Some(json!({"id": "P-1"})),
                error: None,
            },
            sql: SqlSide {
                table_exists: true,
                columns: vec![ColumnInfo {
                    column_name: "id".to_string(),
                    data_type: "character varying".to_string(),
                    character_maximum_length: Some(50),
                    is_nullable: "NO".to_string(),
                    column_default: None,
                }],
                row_count: 9,
                sample: Some(sample),
                error: None,
            },
            source_count: 10,
            transferred_rows: 8,
            verdict: Verdict::Mismatch { difference: 2 },
        };

        let text = render_verification(&report);

        assert!(text.contains("  cluster health: yellow"));
        assert!(text.contains("  columns: id character varying"));
        assert!(text.contains("  sample: {\"id\":\"P-1\"}"));
        assert!(text.ends_with("Verdict: mismatch (10 documents, 8 transferred rows, difference 2)"));
    }

    #[test]
    fn unreachable_side_reports_its_error() {
        let report = VerificationReport {
            checked_at: Utc::now(),
            search: SearchSide {
                error: Some("cannot connect".to_string()),
                ..SearchSide::default()
            },
            sql: SqlSide::default(),
            source_count: 0,
            transferred_rows: 0,
            verdict: Verdict::SourceEmpty,
        };

        let text = render_verification(&report);

        assert!(text.contains("  error: cannot connect"));
        assert!(text.contains("  cluster health: unknown"));
        assert!(text.ends_with("Verdict: no documents in the source index"));
    }

    #[test]
    fn probe_truncates_long_descriptions() {
        let report = ProbeReport {
            server_name: Some("postgres-mcp".to_string()),
            tools: vec![ProbedTool {
                name: "execute_query".to_string(),
                description: "x".repeat(80),
            }],
        };

        let text = render_probe(&report);

        assert!(text.starts_with("Server: postgres-mcp\nTools: 1"));
        assert!(text.ends_with(&format!("  - execute_query: {}...", "x".repeat(60))));
    }
}
