//! Classifies change notifications pushed by the field store.
//!
//! A push is one of:
//! - the echo of this session's own write (canonically equal to the last
//!   written component list, or to the one still being written when the
//!   backend notifies before acknowledging), dropped so a save never
//!   bounces back as an edit;
//! - identical to what the editor already shows, nothing to apply;
//! - a genuine external change, applied (last writer wins);
//! - empty (`null`) or malformed, ignored without touching state.

use strata_core::{canonical_components, normalize, EnvelopeError, Layout, PayloadFormat};

use crate::store::RawValue;

#[derive(Debug)]
pub enum Reconciliation {
    Apply {
        layout: Layout,
        canonical: String,
        format: PayloadFormat,
    },
    Echo,
    Unchanged { canonical: String },
    Ignored,
    Rejected(EnvelopeError),
}

/// Counters for monitoring push traffic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub applied: u64,
    pub echoes: u64,
    pub unchanged: u64,
    pub ignored: u64,
    pub rejected: u64,
}

#[derive(Debug, Default)]
pub struct Reconciler {
    stats: ReconcileStats,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide what to do with `raw`, given the last value this session
    /// wrote, the value of a write still in flight and the layout
    /// currently shown.
    pub fn reconcile(
        &mut self,
        raw: &RawValue,
        last_written: Option<&str>,
        in_flight: Option<&str>,
        current: &Layout,
    ) -> Reconciliation {
        let payload = match normalize(raw) {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                self.stats.ignored += 1;
                return Reconciliation::Ignored;
            }
            Err(e) => {
                self.stats.rejected += 1;
                return Reconciliation::Rejected(e);
            }
        };

        let canonical = canonical_components(&payload.layout);
        let own = Some(canonical.as_str());
        if last_written == own || in_flight == own {
            self.stats.echoes += 1;
            return Reconciliation::Echo;
        }
        if canonical_components(current) == canonical {
            self.stats.unchanged += 1;
            return Reconciliation::Unchanged { canonical };
        }

        self.stats.applied += 1;
        Reconciliation::Apply {
            layout: payload.layout,
            canonical,
            format: payload.format,
        }
    }

    pub fn stats(&self) -> &ReconcileStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use strata_core::{ComponentType, PlacedComponent};

    fn layout(ids: &[&str]) -> Layout {
        Layout::new(
            ids.iter()
                .map(|id| PlacedComponent::with_id(*id, ComponentType::ImageGrid))
                .collect(),
        )
        .unwrap()
    }

    fn envelope(layout: &Layout) -> RawValue {
        json!({
            "components": layout,
            "lastModified": "2025-06-01T10:00:00.000Z",
            "version": "1.0"
        })
    }

    #[test]
    fn test_echo_is_dropped() {
        let mut reconciler = Reconciler::new();
        let written = layout(&["a", "b"]);
        let last = canonical_components(&written);
        let result = reconciler.reconcile(&envelope(&written), Some(&last), None, &layout(&["a"]));
        assert!(matches!(result, Reconciliation::Echo));
        assert_eq!(reconciler.stats().echoes, 1);
    }

    #[test]
    fn test_echo_detected_regardless_of_key_order() {
        let mut reconciler = Reconciler::new();
        let written = layout(&["a"]);
        let last = canonical_components(&written);
        let shuffled: RawValue = serde_json::from_str(
            r#"{"version":"1.0","components":[{"name":"2x2 Image Grid","type":"ImageGrid","id":"a"}],
                "lastModified":"2030-01-01T00:00:00.000Z"}"#,
        )
        .unwrap();
        let result = reconciler.reconcile(&shuffled, Some(&last), None, &Layout::empty());
        assert!(matches!(result, Reconciliation::Echo));
    }

    #[test]
    fn test_in_flight_echo_is_dropped() {
        let mut reconciler = Reconciler::new();
        let older = canonical_components(&layout(&["a"]));
        let writing = layout(&["a", "b"]);
        let in_flight = canonical_components(&writing);
        // The editor has moved on since this write started.
        let current = layout(&["a", "b", "c"]);
        let result =
            reconciler.reconcile(&envelope(&writing), Some(&older), Some(&in_flight), &current);
        assert!(matches!(result, Reconciliation::Echo));
        assert_eq!(reconciler.stats().echoes, 1);
        assert_eq!(reconciler.stats().applied, 0);
    }

    #[test]
    fn test_external_change_during_write_still_applies() {
        let mut reconciler = Reconciler::new();
        let in_flight = canonical_components(&layout(&["a"]));
        let result = reconciler.reconcile(
            &envelope(&layout(&["z"])),
            None,
            Some(&in_flight),
            &layout(&["a"]),
        );
        assert!(matches!(result, Reconciliation::Apply { .. }));
    }

    #[test]
    fn test_external_change_applies() {
        let mut reconciler = Reconciler::new();
        let last = canonical_components(&layout(&["a"]));
        let incoming = layout(&["z", "a"]);
        match reconciler.reconcile(&envelope(&incoming), Some(&last), None, &layout(&["a"])) {
            Reconciliation::Apply { layout, canonical, format } => {
                assert_eq!(layout, incoming);
                assert_eq!(canonical, canonical_components(&incoming));
                assert_eq!(format, PayloadFormat::Envelope);
            }
            other => panic!("expected Apply, got {other:?}"),
        }
        assert_eq!(reconciler.stats().applied, 1);
    }

    #[test]
    fn test_reorder_is_a_change() {
        let mut reconciler = Reconciler::new();
        let current = layout(&["a", "b"]);
        let last = canonical_components(&current);
        let result = reconciler.reconcile(&envelope(&layout(&["b", "a"])), Some(&last), None, &current);
        assert!(matches!(result, Reconciliation::Apply { .. }));
    }

    #[test]
    fn test_same_as_current_is_unchanged() {
        let mut reconciler = Reconciler::new();
        let current = layout(&["a"]);
        let result = reconciler.reconcile(&json!(current.clone()), None, None, &current);
        assert!(matches!(result, Reconciliation::Unchanged { .. }));
    }

    #[test]
    fn test_legacy_payloads_apply() {
        let mut reconciler = Reconciler::new();
        let incoming = layout(&["x"]);
        let bare = json!(incoming.clone());
        let encoded = RawValue::String(bare.to_string());
        for raw in [bare, encoded] {
            match reconciler.reconcile(&raw, None, None, &Layout::empty()) {
                Reconciliation::Apply { layout, format, .. } => {
                    assert_eq!(layout, incoming);
                    assert!(format.is_legacy());
                }
                other => panic!("expected Apply, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_malformed_and_null() {
        let mut reconciler = Reconciler::new();
        let current = layout(&["a"]);
        assert!(matches!(
            reconciler.reconcile(&json!("{broken"), None, None, &current),
            Reconciliation::Rejected(EnvelopeError::InvalidJson(_))
        ));
        assert!(matches!(
            reconciler.reconcile(&json!({ "foo": 1 }), None, None, &current),
            Reconciliation::Rejected(EnvelopeError::MissingComponents)
        ));
        assert!(matches!(
            reconciler.reconcile(&RawValue::Null, None, None, &current),
            Reconciliation::Ignored
        ));
        assert_eq!(
            reconciler.stats(),
            &ReconcileStats {
                rejected: 2,
                ignored: 1,
                ..ReconcileStats::default()
            }
        );
    }
}
