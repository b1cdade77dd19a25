//! Careers-board collector (discovery).
//!
//! Understands the two common public ATS payloads: an object with a `jobs`
//! array (Greenhouse) and a bare array of postings (Lever).

use chrono::{DateTime, Utc};
use cwatch_core::{Entity, SignalCandidate, SignalCategory};
use serde_json::{json, Value};

use crate::error::CollectError;

const MAX_POSTINGS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct JobPosting {
    pub title: String,
    pub location: String,
    pub department: String,
    pub url: Option<String>,
}

pub(crate) fn discover(
    entity: &Entity,
    raw: &str,
    now: DateTime<Utc>,
) -> Result<Vec<SignalCandidate>, CollectError> {
    let postings = parse_postings(raw)?;
    Ok(postings
        .into_iter()
        .map(|job| {
            // Title and hash key carry the same fields. The title stops exact
            // repeats for the retention window; the lowercased key stops
            // case-only drift within the hash window.
            let title = if job.location.is_empty() {
                format!("{} hiring: {}", entity.name, job.title)
            } else {
                format!("{} hiring: {} ({})", entity.name, job.title, job.location)
            };
            SignalCandidate {
                category: SignalCategory::Hiring,
                summary: format!("Open role posted: {}", title_with_team(&job)),
                content: format!("hiring {}\n{}\n{}", job.title, job.department, job.location),
                source_url: job.url.clone(),
                dedup_key: Some(format!("{}|{}|{}", entity.name, job.title, job.location)),
                raw_payload: json!({
                    "job_title": job.title,
                    "location": job.location,
                    "department": job.department,
                    "url": job.url,
                }),
                title,
                detected_at: now,
            }
        })
        .collect())
}

fn title_with_team(job: &JobPosting) -> String {
    if job.department.is_empty() {
        job.title.clone()
    } else {
        format!("{} on the {} team", job.title, job.department)
    }
}

/// Parse either ATS shape; an unrecognized shape yields no postings.
pub(crate) fn parse_postings(raw: &str) -> Result<Vec<JobPosting>, CollectError> {
    let value: Value = serde_json::from_str(raw).map_err(|source| CollectError::Deserialize {
        context: "careers board".to_string(),
        source,
    })?;

    let postings: Vec<JobPosting> = match &value {
        Value::Object(map) => map
            .get("jobs")
            .and_then(Value::as_array)
            .map(|jobs| jobs.iter().filter_map(greenhouse_posting).collect())
            .unwrap_or_default(),
        Value::Array(jobs) => jobs.iter().filter_map(lever_posting).collect(),
        _ => Vec::new(),
    };

    if postings.is_empty() {
        tracing::debug!("careers board returned no recognizable postings");
    }

    Ok(postings.into_iter().take(MAX_POSTINGS).collect())
}

fn str_at<'a>(value: &'a Value, pointer: &str) -> &'a str {
    value.pointer(pointer).and_then(Value::as_str).map_or("", str::trim)
}

fn greenhouse_posting(job: &Value) -> Option<JobPosting> {
    let title = str_at(job, "/title");
    if title.is_empty() {
        return None;
    }
    Some(JobPosting {
        title: title.to_string(),
        location: str_at(job, "/location/name").to_string(),
        department: str_at(job, "/departments/0/name").to_string(),
        url: Some(str_at(job, "/absolute_url"))
            .filter(|u| !u.is_empty())
            .map(str::to_string),
    })
}

fn lever_posting(job: &Value) -> Option<JobPosting> {
    let title = str_at(job, "/text");
    if title.is_empty() {
        return None;
    }
    Some(JobPosting {
        title: title.to_string(),
        location: str_at(job, "/categories/location").to_string(),
        department: str_at(job, "/categories/team").to_string(),
        url: Some(str_at(job, "/hostedUrl"))
            .filter(|u| !u.is_empty())
            .map(str::to_string),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::test_entity;

    #[test]
    fn parses_greenhouse_board() {
        let raw = r#"{"jobs": [
            {"title": "VP of Sales", "absolute_url": "https://boards.example/1",
             "location": {"name": "New York"}, "departments": [{"name": "Sales"}]},
            {"title": "", "absolute_url": "https://boards.example/2"}
        ]}"#;
        let jobs = parse_postings(raw).unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].location, "New York");
        assert_eq!(jobs[0].department, "Sales");
        assert_eq!(jobs[0].url.as_deref(), Some("https://boards.example/1"));
    }

    #[test]
    fn parses_lever_array() {
        let raw = r#"[{"text": "Community Associate", "hostedUrl": "https://jobs.lever.example/x",
                       "categories": {"location": "Austin", "team": "Operations"}}]"#;
        let jobs = parse_postings(raw).unwrap();
        assert_eq!(jobs[0].title, "Community Associate");
        assert_eq!(jobs[0].location, "Austin");
    }

    #[test]
    fn unknown_shape_is_empty_and_invalid_json_errors() {
        assert!(parse_postings(r#"{"positions": []}"#).unwrap().is_empty());
        assert!(matches!(
            parse_postings("<html>"),
            Err(CollectError::Deserialize { .. })
        ));
    }

    #[test]
    fn candidate_hash_key_is_entity_title_location() {
        let raw = r#"{"jobs": [{"title": "Head of Growth", "location": {"name": "Remote"}}]}"#;
        let candidates = discover(&test_entity(), raw, Utc::now()).unwrap();
        assert_eq!(candidates.len(), 1);
        let c = &candidates[0];
        assert_eq!(c.title, "Desk Harbor hiring: Head of Growth (Remote)");
        assert_eq!(c.dedup_key.as_deref(), Some("Desk Harbor|Head of Growth|Remote"));
        assert!(c.source_url.is_none());
        assert_eq!(c.raw_payload["job_title"], "Head of Growth");
    }
}
