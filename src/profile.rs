//! Selector presets for the activity pages the sweeper knows about.
//!
//! The markup of these pages changes without notice, so every selector can be
//! overridden from a JSON file. Matching on text or styling is expressed as a
//! [`Matcher`] so the sequencer never hard-codes it.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::document::{LoadStep, NodeInfo};
use crate::error::{Error, Result};

/// Rule deciding whether a rendered candidate is the element being looked for.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Matcher {
    /// Any visible candidate.
    Any,
    /// Trimmed text equals `label`.
    Label { label: String },
    /// Trimmed text equals `label`, or the candidate carries `class`.
    LabelOrClass { label: String, class: String },
}

impl Matcher {
    pub fn label(label: impl Into<String>) -> Self {
        Matcher::Label {
            label: label.into(),
        }
    }

    pub fn label_or_class(label: impl Into<String>, class: impl Into<String>) -> Self {
        Matcher::LabelOrClass {
            label: label.into(),
            class: class.into(),
        }
    }

    pub fn matches(&self, info: &NodeInfo) -> bool {
        match self {
            Matcher::Any => true,
            Matcher::Label { label } => info.label == *label,
            Matcher::LabelOrClass { label, class } => info.label == *label || info.has_class(class),
        }
    }
}

/// Where to find each element of the delete sequence on one kind of page.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SweepProfile {
    pub name: String,
    /// Container of one deletable item. Its removal marks a completed deletion.
    pub item: String,
    /// Control inside the item that opens the item menu.
    pub trigger: String,
    /// Delete entry of the opened menu.
    pub delete_option: String,
    pub delete_match: Matcher,
    /// Confirmation dialog shown after choosing delete.
    pub dialog: String,
    /// Candidate buttons inside the dialog.
    pub confirm_button: String,
    pub confirm_match: Matcher,
    pub load_step: LoadStep,
}

impl SweepProfile {
    /// Comments on the recent activity page.
    pub fn comments() -> Self {
        Self {
            name: "comments".into(),
            item: "article.comments-comment-entity:has(svg.comment-options-dropdown__trigger-icon)"
                .into(),
            trigger: "button:has(svg.comment-options-dropdown__trigger-icon)".into(),
            delete_option: "div.comment-options-dropdown__option-text span.t-bold".into(),
            delete_match: Matcher::label("Delete"),
            dialog: ".feed-components-shared-decision-modal, .artdeco-modal[role=\"dialog\"]".into(),
            confirm_button: "button".into(),
            confirm_match: Matcher::label_or_class("Delete", "artdeco-button--primary"),
            load_step: LoadStep::ScrollBy(500),
        }
    }

    /// Posts on the recent activity page.
    pub fn posts() -> Self {
        Self {
            name: "posts".into(),
            item: "div.feed-shared-update-v2:has(.feed-shared-control-menu__trigger)".into(),
            trigger: ".feed-shared-control-menu__trigger".into(),
            delete_option:
                ".feed-shared-control-menu__content .option-delete .feed-shared-control-menu__headline"
                    .into(),
            delete_match: Matcher::Any,
            dialog: ".feed-components-shared-decision-modal".into(),
            confirm_button: "button.artdeco-button--primary".into(),
            confirm_match: Matcher::Any,
            load_step: LoadStep::ScrollToBottom,
        }
    }

    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "comments" => Some(Self::comments()),
            "posts" => Some(Self::posts()),
            _ => None,
        }
    }

    /// Load a profile from a JSON file holding every field.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(label: &str, classes: &[&str]) -> NodeInfo {
        NodeInfo {
            attached: true,
            visible: true,
            label: label.into(),
            classes: classes.iter().map(|c| c.to_string()).collect(),
        }
    }

    #[test]
    fn label_match_is_exact() {
        let m = Matcher::label("Delete");
        assert!(m.matches(&info("Delete", &[])));
        assert!(!m.matches(&info("Delete comment", &[])));
        assert!(!m.matches(&info("delete", &[])));
    }

    #[test]
    fn class_fallback_applies_when_label_differs() {
        let m = Matcher::label_or_class("Delete", "artdeco-button--primary");
        assert!(m.matches(&info("Remove", &["artdeco-button", "artdeco-button--primary"])));
        assert!(m.matches(&info("Delete", &["artdeco-button--secondary"])));
        assert!(!m.matches(&info("Cancel", &["artdeco-button--secondary"])));
    }

    #[test]
    fn presets_resolve_by_name() {
        assert_eq!(SweepProfile::preset("comments"), Some(SweepProfile::comments()));
        assert_eq!(SweepProfile::preset("posts").map(|p| p.load_step), Some(LoadStep::ScrollToBottom));
        assert!(SweepProfile::preset("likes").is_none());
    }

    #[test]
    fn profile_loads_from_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.json");
        let mut profile = SweepProfile::posts();
        profile.name = "custom".into();
        std::fs::write(&path, serde_json::to_string_pretty(&profile).unwrap()).unwrap();

        let loaded = SweepProfile::from_json_file(&path).unwrap();
        assert_eq!(loaded, profile);
    }

    #[test]
    fn malformed_profile_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.json");
        std::fs::write(&path, "{\"name\": \"broken\"}").unwrap();

        let err = SweepProfile::from_json_file(&path).unwrap_err();
        assert!(matches!(err, Error::Config(_)), "got {err:?}");
    }
}
