//! Homepage collector (snapshot, text).

use cwatch_core::{SignalCandidate, SignalCategory};
use serde_json::json;

use super::{truncate_chars, Context};
use crate::canonical::canonicalize_html;
use crate::change::diff_lines;

const TITLE_LINE_CHARS: usize = 80;
const PAYLOAD_LINES: usize = 50;

pub(crate) fn canonicalize(raw: &str) -> Option<String> {
    let text = canonicalize_html(raw);
    (!text.is_empty()).then_some(text)
}

pub(crate) fn diff(ctx: &Context<'_>, old: &str, new: &str) -> Option<SignalCandidate> {
    let diff = diff_lines(old, new);
    if diff.is_empty() {
        return None;
    }

    let headline = diff
        .added
        .first()
        .map(|line| format!("added \"{}\"", truncate_chars(line, TITLE_LINE_CHARS)))
        .or_else(|| {
            diff.removed
                .first()
                .map(|line| format!("removed \"{}\"", truncate_chars(line, TITLE_LINE_CHARS)))
        })?;

    let mut content = diff.added.join("\n");
    if !diff.removed.is_empty() {
        content.push_str("\nremoved:\n");
        content.push_str(&diff.removed.join("\n"));
    }

    Some(SignalCandidate {
        category: SignalCategory::Webpage,
        title: format!("{} website changed: {headline}", ctx.entity.name),
        summary: format!(
            "{} website changed: {} lines added, {} removed.",
            ctx.entity.name,
            diff.added.len(),
            diff.removed.len()
        ),
        content,
        source_url: None,
        dedup_key: None,
        raw_payload: json!({
            "page_url": ctx.endpoint,
            "added": diff.added.iter().take(PAYLOAD_LINES).collect::<Vec<_>>(),
            "removed": diff.removed.iter().take(PAYLOAD_LINES).collect::<Vec<_>>(),
        }),
        detected_at: ctx.now,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::collector::test_entity;

    #[test]
    fn boilerplate_only_page_has_no_canonical_form() {
        assert!(canonicalize("<nav>Home</nav><footer>(c) 2026</footer>").is_none());
    }

    #[test]
    fn reordering_is_not_a_change() {
        let entity = test_entity();
        let ctx = Context {
            entity: &entity,
            endpoint: "https://deskharbor.example",
            now: Utc::now(),
        };
        let old = canonicalize("<p>Flexible desks</p><p>Meeting rooms</p>").unwrap();
        let new = canonicalize("<p>Meeting rooms</p><p>Flexible desks</p>").unwrap();
        assert!(diff(&ctx, &old, &new).is_none());
    }

    #[test]
    fn added_line_leads_the_title() {
        let entity = test_entity();
        let ctx = Context {
            entity: &entity,
            endpoint: "https://deskharbor.example",
            now: Utc::now(),
        };
        let old = canonicalize("<p>Flexible desks</p><p>Old promo</p>").unwrap();
        let new = canonicalize("<p>Flexible desks</p><p>Now open in Austin</p>").unwrap();
        let candidate = diff(&ctx, &old, &new).unwrap();
        assert_eq!(
            candidate.title,
            "Desk Harbor website changed: added \"Now open in Austin\""
        );
        assert_eq!(candidate.raw_payload["removed"][0], "Old promo");
        assert!(candidate.source_url.is_none());
    }
}
