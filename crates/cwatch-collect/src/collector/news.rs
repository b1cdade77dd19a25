//! News search collector (discovery).

use chrono::{DateTime, Utc};
use cwatch_core::filters::contains_keyword;
use cwatch_core::{Entity, SignalCandidate, SignalCategory};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use quick_xml::events::Event;
use quick_xml::Reader;
use serde_json::json;

use super::truncate_chars;
use crate::canonical::canonicalize_html;
use crate::error::CollectError;

const SEARCH_URL: &str = "https://news.google.com/rss/search";
const MAX_ITEMS: usize = 25;

/// Headline keywords that route a news item to a more specific category.
/// Checked in order; the first matching group wins.
const CATEGORY_KEYWORDS: &[(SignalCategory, &[&str])] = &[
    (
        SignalCategory::Funding,
        &["raises", "funding", "series a", "series b", "series c", "ipo", "investment", "valuation"],
    ),
    (
        SignalCategory::Leadership,
        &["ceo", "cfo", "coo", "cto", "appoints", "names", "steps down", "resigns", "hires"],
    ),
    (
        SignalCategory::Expansion,
        &["expands", "expansion", "opens", "launches in", "new location", "acquires", "acquisition"],
    ),
    (
        SignalCategory::Partnership,
        &["partners", "partnership", "teams up", "collaboration", "alliance"],
    ),
    (
        SignalCategory::Product,
        &["launches", "unveils", "introduces", "release", "new feature", "app"],
    ),
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct FeedItem {
    pub title: String,
    pub link: String,
    pub description: String,
    pub published: String,
}

pub(crate) fn search_url(entity_name: &str) -> String {
    let query = format!("\"{entity_name}\"");
    let encoded = utf8_percent_encode(&query, NON_ALPHANUMERIC);
    format!("{SEARCH_URL}?q={encoded}&hl=en-US&gl=US&ceid=US:en")
}

pub(crate) fn infer_category(headline: &str) -> SignalCategory {
    let lower = headline.to_lowercase();
    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|kw| contains_keyword(&lower, kw)))
        .map_or(SignalCategory::News, |(category, _)| *category)
}

pub(crate) fn discover(
    entity: &Entity,
    raw: &str,
    now: DateTime<Utc>,
) -> Result<Vec<SignalCandidate>, CollectError> {
    let items = parse_feed(raw)?;
    Ok(items
        .into_iter()
        .map(|item| {
            let summary = if item.description.is_empty() {
                item.title.clone()
            } else {
                truncate_chars(&item.description, 280)
            };
            SignalCandidate {
                category: infer_category(&item.title),
                title: item.title.clone(),
                summary,
                content: format!("{}\n{}", item.title, item.description),
                source_url: Some(item.link.clone()),
                dedup_key: None,
                raw_payload: json!({
                    "entity": entity.name,
                    "headline": item.title,
                    "link": item.link,
                    "published": item.published,
                }),
                detected_at: now,
            }
        })
        .collect())
}

/// Parse RSS `<item>`s with a title and link, stopping after [`MAX_ITEMS`].
pub(crate) fn parse_feed(xml: &str) -> Result<Vec<FeedItem>, CollectError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut items = Vec::new();
    let mut current = FeedItem::default();
    let mut in_item = false;
    let mut current_tag = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if name == "item" {
                    in_item = true;
                    current = FeedItem::default();
                }
                current_tag = name;
            }
            Ok(Event::End(e)) => {
                if e.name().as_ref() == b"item" && in_item {
                    in_item = false;
                    if !current.title.is_empty() && !current.link.is_empty() {
                        items.push(std::mem::take(&mut current));
                        if items.len() >= MAX_ITEMS {
                            break;
                        }
                    }
                }
                current_tag.clear();
            }
            Ok(Event::Text(e)) if in_item => {
                let text = e.unescape().unwrap_or_default().into_owned();
                assign_field(&mut current, &current_tag, &text);
            }
            Ok(Event::CData(e)) if in_item => {
                let text = String::from_utf8_lossy(e.as_ref()).into_owned();
                assign_field(&mut current, &current_tag, &text);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(CollectError::Xml(e)),
            _ => {}
        }
    }

    Ok(items)
}

fn assign_field(item: &mut FeedItem, tag: &str, text: &str) {
    match tag {
        "title" => item.title = text.trim().to_string(),
        "link" => item.link = text.trim().to_string(),
        "description" => {
            item.description = canonicalize_html(text).replace('\n', " ");
        }
        "pubDate" => item.published = text.trim().to_string(),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::test_entity;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel>
  <title>News</title>
  <item>
    <title>Desk Harbor raises $40M Series B</title>
    <link>https://news.example/a</link>
    <description><![CDATA[<p>The flexible office operator <b>raised</b> new capital.</p>]]></description>
    <pubDate>Mon, 05 Oct 2026 10:00:00 GMT</pubDate>
  </item>
  <item>
    <title>Desk Harbor opens Austin site</title>
    <link>https://news.example/b</link>
  </item>
  <item>
    <title>No link here</title>
  </item>
</channel></rss>"#;

    #[test]
    fn parses_items_with_title_and_link() {
        let items = parse_feed(FEED).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].link, "https://news.example/a");
        assert_eq!(items[0].description, "The flexible office operator raised new capital.");
        assert_eq!(items[0].published, "Mon, 05 Oct 2026 10:00:00 GMT");
        assert!(items[1].description.is_empty());
    }

    #[test]
    fn malformed_xml_is_an_error() {
        let err = parse_feed("<rss><channel><item><title>x</link></item>").unwrap_err();
        assert!(matches!(err, CollectError::Xml(_)));
    }

    #[test]
    fn headline_keywords_pick_category() {
        assert_eq!(infer_category("Acme raises $10M"), SignalCategory::Funding);
        assert_eq!(infer_category("Acme names new CFO"), SignalCategory::Leadership);
        assert_eq!(infer_category("Acme opens Denver hub"), SignalCategory::Expansion);
        assert_eq!(infer_category("Acme partners with Initech"), SignalCategory::Partnership);
        assert_eq!(infer_category("Acme unveils booking tool"), SignalCategory::Product);
        assert_eq!(infer_category("Acme in the news"), SignalCategory::News);
    }

    #[test]
    fn candidates_carry_url_for_dedup() {
        let candidates = discover(&test_entity(), FEED, Utc::now()).unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].category, SignalCategory::Funding);
        assert_eq!(candidates[0].source_url.as_deref(), Some("https://news.example/a"));
        assert_eq!(candidates[1].summary, "Desk Harbor opens Austin site");
        assert_eq!(candidates[1].category, SignalCategory::Expansion);
    }

    #[test]
    fn search_url_quotes_entity_name() {
        assert_eq!(
            search_url("Desk Harbor"),
            "https://news.google.com/rss/search?q=%22Desk%20Harbor%22&hl=en-US&gl=US&ceid=US:en"
        );
    }
}
