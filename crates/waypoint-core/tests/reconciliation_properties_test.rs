//! Properties of tag reconciliation and import parsing, checked over
//! exhaustive small input grids.

use waypoint_core::tags::{DOCUMENT_CATEGORIES, REFERENCE_FILE};
use waypoint_core::{
    extract_day_prefix, parse_csv, reconcile_tags, Change, IntegrationGroup, RefScope, TagIntent,
    TagSet, UseCaseChoice,
};

fn s(tags: &[&str]) -> Vec<String> {
    tags.iter().map(|t| t.to_string()).collect()
}

fn existing_samples() -> Vec<Vec<String>> {
    vec![
        vec![],
        s(&["foo"]),
        s(&["Contracts", "desc:old"]),
        s(&["Policies", "Reference File", "refscope:full", "usecase:APIs", "bar"]),
        s(&["Index File", "Templates", "foo", "desc:x", "desc:y"]),
        // Legacy row with a dangling scope and two categories.
        s(&["refscope:open", "Contracts", "policies", "foo"]),
    ]
}

fn category_changes() -> Vec<Change<String>> {
    vec![
        Change::Keep,
        Change::Clear,
        Change::Set("Contracts".into()),
        Change::Set("Various documents".into()),
    ]
}

fn integration_changes() -> Vec<Change<Vec<IntegrationGroup>>> {
    vec![
        Change::Keep,
        Change::Clear,
        Change::Set(vec![IntegrationGroup::IndexFile]),
        Change::Set(vec![IntegrationGroup::ReferenceFile]),
        Change::Set(vec![IntegrationGroup::IndexFile, IntegrationGroup::ReferenceFile]),
    ]
}

fn scope_changes() -> Vec<Change<RefScope>> {
    vec![
        Change::Keep,
        Change::Clear,
        Change::Set(RefScope::Open),
        Change::Set(RefScope::Full),
    ]
}

fn description_changes() -> Vec<Change<String>> {
    vec![Change::Keep, Change::Clear, Change::Set("new".into())]
}

/// Every combination of intents over every sample tag list.
fn all_cases() -> Vec<(Vec<String>, TagIntent)> {
    let mut cases = Vec::new();
    for existing in existing_samples() {
        for category in category_changes() {
            for integration in integration_changes() {
                for scope in scope_changes() {
                    for description in description_changes() {
                        cases.push((
                            existing.clone(),
                            TagIntent {
                                category: category.clone(),
                                integration: integration.clone(),
                                scope: scope.clone(),
                                description,
                                use_case: Change::Keep,
                            },
                        ));
                    }
                }
            }
        }
    }
    cases
}

fn is_category(tag: &str) -> bool {
    DOCUMENT_CATEGORIES
        .iter()
        .any(|c| c.eq_ignore_ascii_case(tag))
}

#[test]
fn test_reconcile_never_duplicates() {
    for (existing, intent) in all_cases() {
        let out = reconcile_tags(&existing, &intent, DOCUMENT_CATEGORIES);
        let mut sorted = out.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), out.len(), "duplicate in {:?} from {:?}", out, intent);
    }
}

#[test]
fn test_set_category_is_exclusive() {
    for (existing, intent) in all_cases() {
        let out = reconcile_tags(&existing, &intent, DOCUMENT_CATEGORIES);
        let categories = out.iter().filter(|t| is_category(t)).count();
        match &intent.category {
            Change::Set(_) => assert_eq!(categories, 1, "{:?}", out),
            Change::Clear => assert_eq!(categories, 0, "{:?}", out),
            Change::Keep => {}
        }
    }
}

#[test]
fn test_category_sequence_keeps_at_most_one() {
    let mut tags = s(&["foo"]);
    for category in ["Contracts", "Policies", "templates", "Various documents", "Contracts"] {
        tags = reconcile_tags(&tags, &TagIntent::keep().with_category(category), DOCUMENT_CATEGORIES);
        assert_eq!(tags.iter().filter(|t| is_category(t)).count(), 1);
        assert!(tags.contains(&"foo".to_string()));
    }
    assert_eq!(tags, s(&["foo", "Contracts"]));
}

#[test]
fn test_untouched_roles_are_preserved() {
    for (existing, intent) in all_cases() {
        let out = reconcile_tags(&existing, &intent, DOCUMENT_CATEGORIES);
        let before = TagSet::parse(&existing, DOCUMENT_CATEGORIES);
        let after = TagSet::parse(&out, DOCUMENT_CATEGORIES);

        for tag in &before.freeform {
            if is_category(tag) && intent.category.is_touched() {
                continue;
            }
            assert!(out.contains(tag), "lost {:?}: {:?} -> {:?}", tag, existing, out);
        }
        if !intent.category.is_touched() {
            assert_eq!(before.category, after.category);
        }
        if !intent.integration.is_touched() {
            assert_eq!(before.integration_groups, after.integration_groups);
        }
        if !intent.description.is_touched() {
            assert_eq!(before.description, after.description);
        }
        assert_eq!(before.use_case, after.use_case);
    }
}

#[test]
fn test_description_replaces_previous() {
    let out = reconcile_tags(
        &s(&["foo", "Contracts", "desc:old"]),
        &TagIntent::keep().with_description("new"),
        DOCUMENT_CATEGORIES,
    );
    assert!(out.contains(&"foo".to_string()));
    assert!(out.contains(&"Contracts".to_string()));
    let descriptions: Vec<_> = out.iter().filter(|t| t.starts_with("desc:")).collect();
    assert_eq!(descriptions, vec!["desc:new"]);
}

#[test]
fn test_scope_only_with_reference_file() {
    for (existing, intent) in all_cases() {
        if !intent.integration.is_touched() && !intent.scope.is_touched() {
            continue;
        }
        let out = reconcile_tags(&existing, &intent, DOCUMENT_CATEGORIES);
        let scopes = out.iter().filter(|t| t.starts_with("refscope:")).count();
        let has_reference = out.iter().any(|t| t == REFERENCE_FILE);

        if !has_reference {
            assert_eq!(scopes, 0, "dangling scope in {:?} from {:?}", out, intent);
        } else if matches!(intent.scope, Change::Clear) {
            assert_eq!(scopes, 0, "{:?}", out);
        } else {
            assert_eq!(scopes, 1, "{:?}", out);
        }
        if let (true, Change::Set(scope)) = (has_reference, &intent.scope) {
            assert!(out.contains(&scope.as_tag().to_string()));
        }
    }
}

#[test]
fn test_full_scope_without_reference_group_is_dropped() {
    let intent = TagIntent::keep()
        .with_integration(vec![IntegrationGroup::IndexFile])
        .with_scope(RefScope::Full);
    let out = reconcile_tags(&s(&["Reference File", "refscope:open"]), &intent, DOCUMENT_CATEGORIES);
    assert_eq!(out, s(&["Index File"]));
}

#[test]
fn test_reconcile_is_idempotent() {
    for (existing, intent) in all_cases() {
        let once = reconcile_tags(&existing, &intent, DOCUMENT_CATEGORIES);
        let twice = reconcile_tags(&once, &intent, DOCUMENT_CATEGORIES);
        assert_eq!(once, twice, "not idempotent for {:?}", intent);
    }
}

#[test]
fn test_custom_use_case_takes_free_text() {
    let out = reconcile_tags(
        &s(&["usecase:APIs"]),
        &TagIntent::keep().with_use_case(UseCaseChoice::custom("Social Media")),
        DOCUMENT_CATEGORIES,
    );
    assert_eq!(out, s(&["usecase:Social Media"]));

    let out = reconcile_tags(
        &out,
        &TagIntent::keep().with_use_case(UseCaseChoice::custom("   ")),
        DOCUMENT_CATEGORIES,
    );
    assert!(out.is_empty());
}

#[test]
fn test_tag_set_round_trip_is_canonical() {
    for (existing, intent) in all_cases() {
        let out = reconcile_tags(&existing, &intent, DOCUMENT_CATEGORIES);
        let canonical = TagSet::parse(&out, DOCUMENT_CATEGORIES).to_tags();
        let again = TagSet::parse(&canonical, DOCUMENT_CATEGORIES).to_tags();
        assert_eq!(canonical, again);
    }
}

// =============================================================================
// PARSERS
// =============================================================================

#[test]
fn test_csv_quotes() {
    assert_eq!(
        parse_csv("\"a,b\",\"c\"\"d\"\n1,2"),
        vec![s(&["a,b", "c\"d"]), s(&["1", "2"])]
    );
}

#[test]
fn test_csv_quoted_newline_stays_in_field() {
    assert_eq!(
        parse_csv("\"line one\nline two\",x\n"),
        vec![s(&["line one\nline two", "x"])]
    );
}

#[test]
fn test_day_prefix() {
    assert_eq!(extract_day_prefix("3 – Security Basics"), (Some(3), "Security Basics".to_string()));
    assert_eq!(extract_day_prefix("12 - Review"), (Some(12), "Review".to_string()));
    assert_eq!(extract_day_prefix("Orientation"), (None, "Orientation".to_string()));
    assert_eq!(extract_day_prefix("2024 plans"), (None, "2024 plans".to_string()));
}
