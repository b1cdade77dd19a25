//! Regulatory filings collector (discovery), reading EDGAR-style submission
//! indexes where `filings.recent` holds parallel arrays.

use chrono::{DateTime, Utc};
use cwatch_core::{Entity, SignalCandidate, SignalCategory};
use serde_json::{json, Value};

use crate::error::CollectError;

const SUBMISSIONS_URL: &str = "https://data.sec.gov/submissions";
const ARCHIVES_URL: &str = "https://www.sec.gov/Archives/edgar/data";
const MAX_FILINGS: usize = 20;

/// Material form types and the plain-language meaning fed to the scorer.
const MATERIAL_FORMS: &[(&str, &str)] = &[
    ("8-K", "current report on material events"),
    ("10-K", "annual report"),
    ("10-Q", "quarterly report"),
    ("S-1", "IPO registration statement"),
    ("S-4", "merger registration statement"),
    ("D", "exempt securities offering (funding round)"),
    ("425", "merger communication"),
    ("SC 13D", "acquisition of a significant ownership stake"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Filing {
    pub form: String,
    pub accession: String,
    pub filed_on: String,
    pub document: String,
    pub description: String,
}

/// Submission index URL for a numeric registrant id; `None` if it has no digits.
pub(crate) fn submissions_url(regulatory_id: &str) -> Option<String> {
    let digits = registrant_digits(regulatory_id)?;
    Some(format!("{SUBMISSIONS_URL}/CIK{digits:0>10}.json"))
}

fn registrant_digits(regulatory_id: &str) -> Option<String> {
    let digits: String = regulatory_id.chars().filter(char::is_ascii_digit).collect();
    let trimmed = digits.trim_start_matches('0');
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn form_meaning(form: &str) -> Option<&'static str> {
    MATERIAL_FORMS
        .iter()
        .find(|(f, _)| *f == form)
        .map(|(_, meaning)| *meaning)
}

fn category_for(form: &str) -> SignalCategory {
    match form {
        "S-1" | "D" => SignalCategory::Funding,
        _ => SignalCategory::Regulatory,
    }
}

pub(crate) fn discover(
    entity: &Entity,
    raw: &str,
    now: DateTime<Utc>,
) -> Result<Vec<SignalCandidate>, CollectError> {
    let registrant = entity
        .regulatory_id
        .as_deref()
        .and_then(registrant_digits)
        .unwrap_or_default();

    Ok(parse_recent(raw)?
        .into_iter()
        .filter_map(|filing| {
            let meaning = form_meaning(&filing.form)?;
            let url = format!(
                "{ARCHIVES_URL}/{registrant}/{}/{}",
                filing.accession.replace('-', ""),
                filing.document
            );
            let detail = if filing.description.is_empty() {
                meaning.to_string()
            } else {
                format!("{meaning}: {}", filing.description)
            };
            Some(SignalCandidate {
                category: category_for(&filing.form),
                title: format!("{} filed {} ({})", entity.name, filing.form, filing.filed_on),
                summary: format!("{} filed a {} {detail}.", entity.name, filing.form),
                content: format!("{} {detail}", filing.form),
                source_url: Some(url),
                dedup_key: Some(filing.accession.clone()),
                raw_payload: json!({
                    "form": filing.form,
                    "accession_number": filing.accession,
                    "filing_date": filing.filed_on,
                    "primary_document": filing.document,
                }),
                detected_at: now,
            })
        })
        .take(MAX_FILINGS)
        .collect())
}

/// Zip the parallel `filings.recent` arrays into rows.
pub(crate) fn parse_recent(raw: &str) -> Result<Vec<Filing>, CollectError> {
    let value: Value = serde_json::from_str(raw).map_err(|source| CollectError::Deserialize {
        context: "filings index".to_string(),
        source,
    })?;

    let column = |name: &str| -> Vec<String> {
        value
            .pointer(&format!("/filings/recent/{name}"))
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .map(|v| v.as_str().unwrap_or_default().trim().to_string())
                    .collect()
            })
            .unwrap_or_default()
    };

    let forms = column("form");
    let accessions = column("accessionNumber");
    let dates = column("filingDate");
    let documents = column("primaryDocument");
    let descriptions = column("primaryDocDescription");

    let at = |col: &[String], i: usize| col.get(i).cloned().unwrap_or_default();

    Ok(forms
        .iter()
        .enumerate()
        .filter(|(i, _)| !at(&accessions, *i).is_empty())
        .map(|(i, form)| Filing {
            form: form.clone(),
            accession: at(&accessions, i),
            filed_on: at(&dates, i),
            document: at(&documents, i),
            description: at(&descriptions, i),
        })
        .collect())
}
