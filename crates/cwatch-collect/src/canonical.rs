//! Canonicalization and fingerprinting of fetched content.
//!
//! Fingerprints are computed over canonical text so that markup churn
//! (scripts, navigation, footers, whitespace) never registers as a change.

use std::sync::LazyLock;

use regex::Regex;
use sha2::{Digest, Sha256};

/// Hex length of a fingerprint (128 bits).
pub const FINGERPRINT_HEX_LEN: usize = 32;

static BOILERPLATE_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?is)<!--.*?-->",
        r"(?is)<script\b[^>]*>.*?</script\s*>",
        r"(?is)<style\b[^>]*>.*?</style\s*>",
        r"(?is)<noscript\b[^>]*>.*?</noscript\s*>",
        r"(?is)<template\b[^>]*>.*?</template\s*>",
        r"(?is)<svg\b[^>]*>.*?</svg\s*>",
        r"(?is)<nav\b[^>]*>.*?</nav\s*>",
        r"(?is)<header\b[^>]*>.*?</header\s*>",
        r"(?is)<footer\b[^>]*>.*?</footer\s*>",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid boilerplate regex"))
    .collect()
});

static BLOCK_BREAK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)<br\s*/?>|</(?:p|div|li|h[1-6]|tr|td|section|article|ul|ol|table|blockquote|dd|dt)\s*>",
    )
    .expect("valid block break regex")
});

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid tag regex"));

static NUMERIC_ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&#(?:[xX]([0-9a-fA-F]{1,6})|([0-9]{1,7}));").expect("valid entity regex")
});

/// Reduce an HTML document to its visible text, one block per line.
///
/// Boilerplate regions are removed, tags stripped, entities decoded,
/// whitespace collapsed within each line, and blank lines dropped.
#[must_use]
pub fn canonicalize_html(html: &str) -> String {
    let mut text = html.to_string();
    for re in BOILERPLATE_RES.iter() {
        text = re.replace_all(&text, " ").into_owned();
    }
    let text = BLOCK_BREAK_RE.replace_all(&text, "\n");
    let text = TAG_RE.replace_all(&text, " ");
    let text = decode_entities(&text);

    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Decode the handful of named entities that matter for text comparison,
/// plus decimal and hex numeric references.
#[must_use]
pub fn decode_entities(text: &str) -> String {
    let decoded = NUMERIC_ENTITY_RE.replace_all(text, |caps: &regex::Captures<'_>| {
        let code = caps
            .get(1)
            .and_then(|m| u32::from_str_radix(m.as_str(), 16).ok())
            .or_else(|| caps.get(2).and_then(|m| m.as_str().parse::<u32>().ok()));
        code.and_then(char::from_u32)
            .map_or_else(|| " ".to_string(), |c| c.to_string())
    });
    decoded
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Deterministic 128-bit fingerprint of canonical content, as lowercase hex.
#[must_use]
pub fn fingerprint(canonical: &str) -> String {
    let full = format!("{:x}", Sha256::digest(canonical.as_bytes()));
    full[..FINGERPRINT_HEX_LEN].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><head><style>body { color: red }</style>
<script>window.track = 1;</script></head>
<body>
<header><a href="/">Home</a></header>
<nav><ul><li>Pricing</li><li>About</li></ul></nav>
<h1>Desk Harbor</h1>
<p>Flexible   desks in <b>12</b> cities.</p>
<p>Fish &amp; chips&nbsp;on Fridays &#8212; free.</p>
<footer>&copy; 2026 Desk Harbor</footer>
</body></html>"#;

    #[test]
    fn strips_boilerplate_and_markup() {
        let text = canonicalize_html(PAGE);
        assert_eq!(
            text,
            "Desk Harbor\nFlexible desks in 12 cities.\nFish & chips on Fridays \u{2014} free."
        );
    }

    #[test]
    fn boilerplate_churn_does_not_change_fingerprint() {
        let churned = PAGE
            .replace("window.track = 1;", "window.track = 2;")
            .replace("2026 Desk Harbor", "2027 Desk Harbor")
            .replace("<li>About</li>", "<li>About us</li>");
        assert_eq!(
            fingerprint(&canonicalize_html(PAGE)),
            fingerprint(&canonicalize_html(&churned))
        );
    }

    #[test]
    fn meaningful_text_change_changes_fingerprint() {
        let changed = PAGE.replace("12", "13");
        assert_ne!(
            fingerprint(&canonicalize_html(PAGE)),
            fingerprint(&canonicalize_html(&changed))
        );
    }

    #[test]
    fn fingerprint_is_stable_and_128_bits() {
        let a = fingerprint("same content");
        let b = fingerprint("same content");
        assert_eq!(a, b);
        assert_eq!(a.len(), FINGERPRINT_HEX_LEN);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn decodes_hex_entities() {
        assert_eq!(decode_entities("a&#x27;b"), "a'b");
    }
}
