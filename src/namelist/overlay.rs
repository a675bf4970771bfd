// ABOUTME: Overlay merge engine applying override specs onto decoded namelist documents
// ABOUTME: Only keys the document already declares are replaced; others are dropped or rejected

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use super::document::Document;
use super::error::{NamelistError, Result};
use super::value::NmlValue;

/// Candidate overrides, `{group: {key: value}}`
pub type OverlaySpec = IndexMap<String, IndexMap<String, NmlValue>>;

/// What to do with overlay entries the document does not declare
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlayMode {
    /// Drop them with a warning
    #[default]
    Lenient,
    /// Fail with `OverlayKeyDropped` and leave the document untouched
    Strict,
}

impl OverlayMode {
    pub fn from_strict(strict: bool) -> Self {
        if strict {
            OverlayMode::Strict
        } else {
            OverlayMode::Lenient
        }
    }
}

/// Convert an environment-store mapping into an overlay spec.
///
/// A null value (no overrides configured) yields an empty spec.
pub fn overlay_from_value(value: &JsonValue) -> Result<OverlaySpec> {
    let groups = match value {
        JsonValue::Null => return Ok(OverlaySpec::new()),
        JsonValue::Object(groups) => groups,
        _ => {
            return Err(NamelistError::InvalidOverlay {
                reason: "expected a mapping of groups".to_string(),
            })
        }
    };

    let mut spec = OverlaySpec::new();
    for (group, keys) in groups {
        let keys = match keys {
            JsonValue::Object(keys) => keys,
            JsonValue::Null => continue,
            _ => {
                return Err(NamelistError::InvalidOverlay {
                    reason: format!("group '{}' must be a mapping of keys", group),
                })
            }
        };
        let entry = spec.entry(group.clone()).or_default();
        for (key, value) in keys {
            let value =
                NmlValue::try_from(value).map_err(|reason| NamelistError::UnsupportedValue {
                    key: format!("{}.{}", group, key),
                    reason,
                })?;
            entry.insert(key.clone(), value);
        }
    }

    Ok(spec)
}

/// Apply an overlay leniently, returning the merged copy
pub fn apply(document: &Document, spec: &OverlaySpec) -> Document {
    let mut merged = document.clone();
    for (group, key, value) in intersection(&merged, spec) {
        replace(&mut merged, &group, &key, value);
    }
    report_dropped(document, spec);
    merged
}

/// Apply an overlay in the given mode, returning the merged copy
pub fn apply_with_mode(document: &Document, spec: &OverlaySpec, mode: OverlayMode) -> Result<Document> {
    let mut merged = document.clone();
    apply_in_place(&mut merged, spec, mode)?;
    Ok(merged)
}

/// Apply an overlay to a document owned by the caller.
///
/// In strict mode every entry is checked before the first replacement, so a
/// failure leaves the document as it was.
pub fn apply_in_place(document: &mut Document, spec: &OverlaySpec, mode: OverlayMode) -> Result<()> {
    if mode == OverlayMode::Strict {
        if let Some(path) = dropped(document, spec).into_iter().next() {
            return Err(NamelistError::OverlayKeyDropped { path });
        }
    } else {
        report_dropped(document, spec);
    }

    for (group, key, value) in intersection(document, spec) {
        replace(document, &group, &key, value);
    }
    Ok(())
}

fn intersection(document: &Document, spec: &OverlaySpec) -> Vec<(String, String, NmlValue)> {
    let mut hits = Vec::new();
    for (group, keys) in spec {
        let Some(declared) = document.group(group) else {
            continue;
        };
        for (key, value) in keys {
            if declared.contains_key(key) {
                hits.push((group.clone(), key.clone(), value.clone()));
            }
        }
    }
    hits
}

fn replace(document: &mut Document, group: &str, key: &str, value: NmlValue) {
    if let Some(slot) = document.group_mut(group).and_then(|g| g.get_mut(key)) {
        debug!("Overlay {}.{} = {:?}", group, key, value);
        *slot = value;
    }
}

fn dropped(document: &Document, spec: &OverlaySpec) -> Vec<String> {
    let mut paths = Vec::new();
    for (group, keys) in spec {
        match document.group(group) {
            None => paths.push(group.clone()),
            Some(declared) => paths.extend(
                keys.keys()
                    .filter(|key| !declared.contains_key(*key))
                    .map(|key| format!("{}.{}", group, key)),
            ),
        }
    }
    paths
}

fn report_dropped(document: &Document, spec: &OverlaySpec) {
    for path in dropped(document, spec) {
        warn!("Overlay key dropped: '{}' is not declared in the namelist", path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namelist::{decode, Scalar};
    use serde_json::json;

    fn document() -> Document {
        decode("&coupler_nml\n days = 1\n months = 0\n/\n&ocean_model_nml\n dt_ocean = 1800\n/")
            .unwrap()
    }

    fn spec(value: JsonValue) -> OverlaySpec {
        overlay_from_value(&value).unwrap()
    }

    #[test]
    fn test_apply_replaces_declared_keys_only() {
        let doc = document();
        let overlay = spec(json!({
            "coupler_nml": {"days": 5, "hours": 3},
            "ocean_model_nml": {"dt_ocean": 3600},
            "extra_nml": {"x": 1}
        }));

        let merged = apply(&doc, &overlay);
        assert_eq!(merged.get("coupler_nml", "days"), Some(&NmlValue::from(5i64)));
        assert_eq!(merged.get("ocean_model_nml", "dt_ocean"), Some(&NmlValue::from(3600i64)));
        assert!(merged.get("coupler_nml", "hours").is_none());
        assert!(!merged.contains_group("extra_nml"));
        assert_eq!(merged.group_names(), doc.group_names());
        assert_eq!(merged.keys("coupler_nml"), doc.keys("coupler_nml"));

        // Input untouched
        assert_eq!(doc.get("coupler_nml", "days"), Some(&NmlValue::from(1i64)));
    }

    #[test]
    fn test_apply_is_idempotent() {
        let doc = document();
        let overlay = spec(json!({"coupler_nml": {"days": 5, "nope": true}}));
        let once = apply(&doc, &overlay);
        assert_eq!(apply(&once, &overlay), once);
    }

    #[test]
    fn test_strict_mode_rejects_without_changes() {
        let mut doc = document();
        let overlay = spec(json!({"coupler_nml": {"days": 5, "hours": 3}}));

        let err = apply_in_place(&mut doc, &overlay, OverlayMode::Strict).unwrap_err();
        assert_eq!(
            err,
            NamelistError::OverlayKeyDropped {
                path: "coupler_nml.hours".to_string()
            }
        );
        assert_eq!(doc, document());

        let err = apply_with_mode(&doc, &spec(json!({"extra_nml": {}})), OverlayMode::Strict)
            .unwrap_err();
        assert!(matches!(err, NamelistError::OverlayKeyDropped { path } if path == "extra_nml"));
    }

    #[test]
    fn test_strict_mode_accepts_declared_keys() {
        let overlay = spec(json!({"coupler_nml": {"months": 2}}));
        let merged = apply_with_mode(&document(), &overlay, OverlayMode::Strict).unwrap();
        assert_eq!(merged.get("coupler_nml", "months"), Some(&NmlValue::from(2i64)));
    }

    #[test]
    fn test_overlay_from_value() {
        assert!(overlay_from_value(&JsonValue::Null).unwrap().is_empty());

        let overlay = spec(json!({"g": {"layout": [2, 4]}, "h": null}));
        assert_eq!(
            overlay["g"]["layout"],
            NmlValue::List(vec![Scalar::Int(2), Scalar::Int(4)])
        );
        assert!(!overlay.contains_key("h"));

        assert!(matches!(
            overlay_from_value(&json!([1])),
            Err(NamelistError::InvalidOverlay { .. })
        ));
        assert!(matches!(
            overlay_from_value(&json!({"g": 1})),
            Err(NamelistError::InvalidOverlay { .. })
        ));
        assert!(matches!(
            overlay_from_value(&json!({"g": {"k": {"nested": 1}}})),
            Err(NamelistError::UnsupportedValue { key, .. }) if key == "g.k"
        ));
    }

    #[test]
    fn test_mode_serde() {
        let mode: OverlayMode = serde_yaml::from_str("strict").unwrap();
        assert_eq!(mode, OverlayMode::Strict);
        assert_eq!(OverlayMode::default(), OverlayMode::Lenient);
        assert_eq!(OverlayMode::from_strict(false), OverlayMode::Lenient);
    }
}
