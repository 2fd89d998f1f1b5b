//! Curated axe rule lists and the WCAG success criteria each rule relates to

use std::collections::BTreeMap;

use crate::models::RunOnly;

/// Rule identifiers audited on every page by default.
pub const CURATED_RULES: &[&str] = &[
    "button-name",
    "document-title",
    "input-button-name",
    "input-image-alt",
    "label",
    "link-name",
    "object-alt",
    "role-img-alt",
    "select-name",
    "svg-img-alt",
    "autocomplete-valid",
    "empty-heading",
    "heading-order",
    "empty-table-header",
    "image-redundant-alt",
];

pub const DEFAULT_PROFILE: &str = "curated";

/// Built-in audit profiles, keyed by name.
pub fn default_profiles() -> BTreeMap<String, RunOnly> {
    BTreeMap::from([
        (DEFAULT_PROFILE.to_string(), RunOnly::rules(CURATED_RULES.iter().copied())),
        ("semantics".to_string(), RunOnly::tags(["cat.semantics"])),
        ("wcag2aa".to_string(), RunOnly::tags(["wcag2aa"])),
    ])
}

/// WCAG 2.x success criteria touched by an axe rule, if known.
pub fn wcag_criteria(rule_id: &str) -> &'static [&'static str] {
    match rule_id {
        "aria-alt" => &["2.4.4 Link Purpose (In Context)", "4.1.2 Name, Role, Value"],
        "button-name" | "input-button-name" | "select-name" => &["4.1.2 Name, Role, Value"],
        "document-title" => &["2.4.2 Page Titled"],
        "image-alt" | "object-alt" | "role-img-alt" | "svg-img-alt" | "image-redundant-alt"
        | "empty-table-header" => &["1.1.1 Non-text Content"],
        "input-image-alt" => &["1.1.1 Non-text Content", "4.1.2 Name, Role, Value"],
        "label" => &[
            "1.3.1 Info and Relationships",
            "3.3.2 Labels or Instructions",
            "4.1.2 Name, Role, Value",
        ],
        "link-name" => &["2.4.4 Link Purpose (In Context)", "4.1.2 Name, Role, Value"],
        "autocomplete-valid" => &["1.3.5 Identify Input Purpose"],
        "empty-heading" => &["1.3.1 Info and Relationships"],
        "heading-order" => &["1.3.1 Info and Relationships", "2.4.6 Headings and Labels"],
        _ => &[],
    }
}
