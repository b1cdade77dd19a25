//! Read-only commands: `insights`, `signals`, `runs`.

use std::collections::HashMap;
use std::fmt::Write as _;

use chrono::{Duration, Utc};
use cwatch_core::{Signal, SignalCategory};
use cwatch_patterns::{compute_insights, AggregationSettings, PatternInsights};

const TITLE_WIDTH: usize = 60;

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() > width {
        format!("{}...", text.chars().take(width).collect::<String>())
    } else {
        text.to_string()
    }
}

/// Render insights as a markdown document.
pub(crate) fn render_insights(insights: &PatternInsights) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Competitive Pattern Insights");
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "**Generated**: {}",
        insights.generated_at.format("%Y-%m-%d %H:%M UTC")
    );
    let _ = writeln!(
        out,
        "**Strategic Pressure Index**: {} | **Market Heat**: {} | **Parallel Moves**: {}",
        insights.strategic_pressure_index, insights.market_heat, insights.parallel_moves
    );
    let _ = writeln!(
        out,
        "**Signals**: {} total, {} strategic ({:.0}%), avg relevance {:.1}",
        insights.total_signals,
        insights.strategic_signals,
        insights.strategic_ratio * 100.0,
        insights.avg_strategic_relevance
    );

    if insights.patterns.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "No cross-entity patterns in the current window.");
        return out;
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "## Patterns");
    let _ = writeln!(out);
    let _ = writeln!(out, "| Category | Momentum | Priority | Signals | Entities |");
    let _ = writeln!(out, "|----------|----------|----------|---------|----------|");
    for pattern in &insights.patterns {
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {} |",
            pattern.category,
            pattern.momentum,
            pattern.priority.as_str(),
            pattern.total_signals,
            pattern.entities.join(", ")
        );
    }

    if !insights.recommendations.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "## Recommendations");
        for rec in &insights.recommendations {
            let _ = writeln!(out);
            let _ = writeln!(
                out,
                "### {} ({}, confidence {})",
                rec.action,
                rec.priority.as_str(),
                rec.confidence
            );
            let _ = writeln!(out);
            let _ = writeln!(
                out,
                "**Owner**: {} | **Horizon**: {}",
                rec.owner, rec.time_horizon
            );
            let _ = writeln!(out);
            let _ = writeln!(out, "{}", rec.rationale);
        }
    }
    out
}

/// Compute and print pattern insights over the configured window.
///
/// # Errors
///
/// Returns an error if the filter file cannot be loaded or a query fails.
pub(crate) async fn run_insights(
    pool: &sqlx::PgPool,
    config: &cwatch_core::AppConfig,
    json: bool,
) -> anyhow::Result<()> {
    let settings = AggregationSettings {
        window: Duration::days(config.pattern_window_days),
        filters: cwatch_core::load_filters(config.filters_path.as_deref())?,
    };
    let now = Utc::now();
    let signals =
        cwatch_db::list_signals_since(pool, now - settings.window, config.pattern_signal_cap)
            .await?;
    let names: HashMap<i64, String> = cwatch_db::list_entity_names(pool)
        .await?
        .into_iter()
        .collect();

    let insights = compute_insights(&signals, &names, &settings, now);
    if json {
        println!("{}", serde_json::to_string_pretty(&insights)?);
    } else {
        print!("{}", render_insights(&insights));
    }
    Ok(())
}

pub(crate) fn signal_line(signal: &Signal) -> String {
    let marker = if signal.is_relevant { '*' } else { ' ' };
    format!(
        "{:<17}{:<13}{:>3}{marker} {}",
        signal.detected_at.format("%Y-%m-%d %H:%M"),
        signal.category.as_str(),
        signal.relevance_score,
        truncate(&signal.title, TITLE_WIDTH)
    )
}

/// Print recent signals for one entity, newest first.
///
/// # Errors
///
/// Returns an error if the entity does not exist or the query fails.
pub(crate) async fn run_signals(
    pool: &sqlx::PgPool,
    slug: &str,
    category: Option<SignalCategory>,
    limit: i64,
) -> anyhow::Result<()> {
    let entity = cwatch_db::get_entity_by_slug(pool, slug)
        .await?
        .ok_or_else(|| anyhow::anyhow!("entity '{slug}' not found; run `seed` first"))?;
    let signals = cwatch_db::list_entity_signals(pool, entity.id, category, limit).await?;

    if signals.is_empty() {
        println!("no signals recorded for {slug}; run `collect --entity {slug}` first");
        return Ok(());
    }

    println!("{:<17}{:<13}{:>4} TITLE", "DETECTED", "CATEGORY", "SCORE");
    for signal in &signals {
        println!("{}", signal_line(signal));
    }
    Ok(())
}

/// Print recent runs, or the unit results of one run.
///
/// # Errors
///
/// Returns an error if the run does not exist or a query fails.
pub(crate) async fn run_runs(
    pool: &sqlx::PgPool,
    run_id: Option<i64>,
    limit: i64,
) -> anyhow::Result<()> {
    if let Some(id) = run_id {
        let run = cwatch_db::get_collection_run(pool, id).await?;
        let units = cwatch_db::list_collection_run_units(pool, id).await?;
        let names: HashMap<i64, String> = cwatch_db::list_entity_names(pool)
            .await?
            .into_iter()
            .collect();
        println!(
            "run {} ({}) {}: {} signals",
            run.id, run.trigger_source, run.status, run.signals_written
        );
        for unit in &units {
            let name = names.get(&unit.entity_id).map_or("?", String::as_str);
            println!(
                "  {:<24}{:<18}{:<11}{:>4}  {}",
                name,
                unit.source_kind,
                unit.status,
                unit.signals_written,
                unit.error_message.as_deref().unwrap_or("")
            );
        }
        return Ok(());
    }

    let runs = cwatch_db::list_collection_runs(pool, limit).await?;
    if runs.is_empty() {
        println!("no collection runs recorded");
        return Ok(());
    }
    println!(
        "{:<8}{:<11}{:<11}{:<18}{:>8}  ERROR",
        "ID", "TRIGGER", "STATUS", "CREATED", "SIGNALS"
    );
    for run in &runs {
        println!(
            "{:<8}{:<11}{:<11}{:<18}{:>8}  {}",
            run.id,
            run.trigger_source,
            run.status,
            run.created_at.format("%Y-%m-%d %H:%M"),
            run.signals_written,
            run.error_message.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use cwatch_patterns::{Pattern, Priority, Recommendation};

    fn signal(title: &str, score: u8) -> Signal {
        Signal {
            id: 1,
            public_id: uuid::Uuid::nil(),
            entity_id: 1,
            category: SignalCategory::Hiring,
            title: title.to_string(),
            summary: String::new(),
            raw_payload: serde_json::json!({}),
            source_url: None,
            content_hash: None,
            relevance_score: score,
            is_relevant: score >= 5,
            detected_at: Utc::now(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn empty_insights_render_a_placeholder() {
        let text = render_insights(&PatternInsights::empty(Utc::now()));
        assert!(text.contains("**Strategic Pressure Index**: 0"));
        assert!(text.contains("No cross-entity patterns"));
        assert!(!text.contains("## Recommendations"));
    }

    #[test]
    fn patterns_and_recommendations_are_rendered() {
        let mut insights = PatternInsights::empty(Utc::now());
        insights.parallel_moves = 1;
        insights.patterns.push(Pattern {
            category: SignalCategory::Pricing,
            entities: vec!["Desk Harbor".to_string(), "Nook Works".to_string()],
            competitor_count: 2,
            total_signals: 4,
            avg_relevance: 7.5,
            momentum: 62,
            priority: Priority::High,
            evidence: Vec::new(),
            latest_signal_at: Utc::now(),
        });
        insights.recommendations.push(Recommendation {
            category: SignalCategory::Pricing,
            priority: Priority::High,
            confidence: 62,
            action: "Run pricing war-game".to_string(),
            rationale: "2 competitors moved prices.".to_string(),
            owner: "Revenue+RealEstate".to_string(),
            time_horizon: "this quarter".to_string(),
        });

        let text = render_insights(&insights);
        assert!(text.contains("| pricing | 62 | high | 4 | Desk Harbor, Nook Works |"));
        assert!(text.contains("### Run pricing war-game (high, confidence 62)"));
        assert!(text.contains("**Owner**: Revenue+RealEstate | **Horizon**: this quarter"));
    }

    #[test]
    fn signal_line_marks_relevant_and_truncates() {
        let long_title = "x".repeat(80);
        let line = signal_line(&signal(&long_title, 7));
        assert!(line.contains("hiring"));
        assert!(line.contains("  7* "));
        assert!(line.ends_with(&format!("{}...", "x".repeat(TITLE_WIDTH))));

        let quiet = signal_line(&signal("Barista (Austin)", 2));
        assert!(quiet.contains("  2  Barista (Austin)"));
    }
}
