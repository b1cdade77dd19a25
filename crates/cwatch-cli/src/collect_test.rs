use super::*;

fn entity(careers_url: Option<&str>) -> Entity {
    Entity {
        id: 1,
        name: "Desk Harbor".to_string(),
        slug: "desk-harbor".to_string(),
        website: "https://deskharbor.example".to_string(),
        careers_url: careers_url.map(str::to_string),
        listings_url: None,
        social_handle: None,
        app_id: None,
        reviews_url: None,
        regulatory_id: None,
        is_active: true,
    }
}

fn report(skipped: Option<&str>, errors: &[&str], new_signal_count: usize) -> UnitReport {
    UnitReport {
        entity_id: 1,
        entity_slug: "desk-harbor".to_string(),
        kind: SourceKind::Hiring,
        new_signal_count,
        errors: errors.iter().map(|e| (*e).to_string()).collect(),
        skipped: skipped.map(str::to_string),
    }
}

#[test]
fn empty_kind_list_means_every_kind() {
    assert_eq!(resolve_kinds(&[]), SourceKind::ALL.to_vec());
}

#[test]
fn requested_kinds_are_deduplicated_in_declaration_order() {
    let kinds = resolve_kinds(&[SourceKind::Webpage, SourceKind::News, SourceKind::Webpage]);
    assert_eq!(kinds, vec![SourceKind::News, SourceKind::Webpage]);
}

#[test]
fn plan_line_shows_endpoint_or_skip_reason() {
    let with_careers = entity(Some("https://boards.example/dh"));
    assert_eq!(
        plan_line(&with_careers, SourceKind::Hiring),
        "desk-harbor/hiring: https://boards.example/dh"
    );

    let bare = entity(None);
    let line = plan_line(&bare, SourceKind::Hiring);
    assert!(line.starts_with("desk-harbor/hiring: skip ("), "{line}");
    assert!(line.contains("careers_url"), "{line}");
}

#[test]
fn unit_line_reflects_outcome() {
    assert!(unit_line(&report(None, &[], 2)).ends_with("ok       2 new"));
    assert!(unit_line(&report(Some("careers_url not configured"), &[], 0))
        .ends_with("skipped  careers_url not configured"));
    assert!(unit_line(&report(None, &["timeout", "retry exhausted"], 0))
        .ends_with("failed   timeout; retry exhausted"));
}
