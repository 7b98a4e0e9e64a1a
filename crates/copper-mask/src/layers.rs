//! Layer lookup and the "does this item sit on the layer" test.

use crate::error::ExportError;
use crate::types::*;

/// Resolve a layer name to its slot in the board's layer table.
///
/// Canonical names (`F.Cu`, `In1.Cu`) are tried first. Failing that, every
/// slot is scanned for a matching user-visible name, then for a canonical
/// name differing only in case.
pub fn resolve_layer<'a>(table: &'a LayerTable, name: &str) -> Result<&'a LayerEntry, ExportError> {
    if let Some(entry) = table.by_name(name) {
        return Ok(entry);
    }
    table
        .entries
        .iter()
        .find(|e| e.user_name.as_deref() == Some(name))
        .or_else(|| {
            table
                .entries
                .iter()
                .find(|e| e.name.eq_ignore_ascii_case(name))
        })
        .ok_or_else(|| ExportError::LayerNotFound(name.to_string()))
}

/// Whether `item` belongs to `layer`.
///
/// Items with a layer set answer from it, single-layer items compare their
/// layer, and vias whose span cannot be placed in the copper stack are
/// accepted so that conversion has the final say.
pub fn item_on_layer(item: &Primitive, layer: &LayerEntry, table: &LayerTable) -> bool {
    match item {
        Primitive::Pad(pad) => in_layer_set(&pad.layers, layer, table),
        Primitive::Zone(zone) => in_layer_set(&zone.layers, layer, table),
        Primitive::Track(t) => t.layer == layer.name,
        Primitive::ArcTrack(t) => t.layer == layer.name,
        Primitive::Shape(s) => s.layer == layer.name,
        Primitive::Via(via) => {
            if !layer.is_copper() {
                return false;
            }
            via_spans(via, layer, table).unwrap_or(true)
        }
    }
}

fn in_layer_set(patterns: &[String], layer: &LayerEntry, table: &LayerTable) -> bool {
    patterns
        .iter()
        .any(|p| table.expand(p).contains(&layer.name.as_str()))
}

/// `None` when the via's span is unknown or names layers missing from the stack.
fn via_spans(via: &Via, layer: &LayerEntry, table: &LayerTable) -> Option<bool> {
    let (a, b) = via.span.as_ref()?;
    let top = table.copper_depth(a)?;
    let bottom = table.copper_depth(b)?;
    let depth = table.copper_depth(&layer.name)?;
    let (lo, hi) = if top <= bottom { (top, bottom) } else { (bottom, top) };
    Some((lo..=hi).contains(&depth))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> LayerTable {
        let entry = |id, name: &str, user: Option<&str>| LayerEntry {
            id: LayerId(id),
            name: name.to_string(),
            user_name: user.map(|s| s.to_string()),
        };
        LayerTable {
            entries: vec![
                entry(0, "F.Cu", Some("Top")),
                entry(1, "In1.Cu", None),
                entry(2, "In2.Cu", None),
                entry(31, "B.Cu", None),
                entry(35, "F.Paste", None),
                entry(39, "F.Mask", None),
            ],
        }
    }

    fn via(span: Option<(&str, &str)>) -> Primitive {
        Primitive::Via(Via {
            at: [0.0, 0.0],
            size: 0.6,
            span: span.map(|(a, b)| (a.to_string(), b.to_string())),
        })
    }

    #[test]
    fn test_resolve_canonical_then_user_name() {
        let t = table();
        assert_eq!(resolve_layer(&t, "In1.Cu").unwrap().id, LayerId(1));
        assert_eq!(resolve_layer(&t, "Top").unwrap().id, LayerId(0));
        assert_eq!(resolve_layer(&t, "b.cu").unwrap().id, LayerId(31));
    }

    #[test]
    fn test_resolve_unknown_layer_fails() {
        let err = resolve_layer(&table(), "In7.Cu").unwrap_err();
        assert!(matches!(err, ExportError::LayerNotFound(name) if name == "In7.Cu"));
    }

    #[test]
    fn test_single_layer_items() {
        let t = table();
        let front = t.by_name("F.Cu").unwrap();
        let track = Primitive::Track(TrackSegment {
            start: [0.0, 0.0],
            end: [1.0, 0.0],
            width: 0.2,
            layer: "F.Cu".to_string(),
        });
        assert!(item_on_layer(&track, front, &t));
        assert!(!item_on_layer(&track, t.by_name("B.Cu").unwrap(), &t));
    }

    #[test]
    fn test_pad_layer_patterns() {
        let t = table();
        let pad = |layers: &[&str]| {
            Primitive::Pad(Pad {
                name: "1".to_string(),
                position: [0.0, 0.0],
                angle: 0.0,
                size: [1.0, 1.0],
                offset: [0.0, 0.0],
                shape: PadShape::Rect,
                layers: layers.iter().map(|s| s.to_string()).collect(),
            })
        };
        let tht = pad(&["*.Cu", "*.Mask"]);
        let smd = pad(&["F.Cu", "F.Paste", "F.Mask"]);
        let both = pad(&["F&B.Cu"]);
        let in2 = t.by_name("In2.Cu").unwrap();
        let paste = t.by_name("F.Paste").unwrap();

        assert!(item_on_layer(&tht, in2, &t));
        assert!(!item_on_layer(&tht, paste, &t));
        assert!(!item_on_layer(&smd, in2, &t));
        assert!(item_on_layer(&smd, paste, &t));
        assert!(item_on_layer(&both, t.by_name("B.Cu").unwrap(), &t));
        assert!(!item_on_layer(&both, in2, &t));
    }

    #[test]
    fn test_via_spans() {
        let t = table();
        let blind = via(Some(("F.Cu", "In1.Cu")));
        assert!(item_on_layer(&blind, t.by_name("F.Cu").unwrap(), &t));
        assert!(item_on_layer(&blind, t.by_name("In1.Cu").unwrap(), &t));
        assert!(!item_on_layer(&blind, t.by_name("B.Cu").unwrap(), &t));

        let reversed = via(Some(("B.Cu", "In2.Cu")));
        assert!(item_on_layer(&reversed, t.by_name("In2.Cu").unwrap(), &t));
        assert!(!item_on_layer(&reversed, t.by_name("In1.Cu").unwrap(), &t));
    }

    #[test]
    fn test_via_with_unknown_span_is_accepted_on_copper_only() {
        let t = table();
        assert!(item_on_layer(&via(None), t.by_name("In2.Cu").unwrap(), &t));
        assert!(item_on_layer(
            &via(Some(("F.Cu", "In9.Cu"))),
            t.by_name("B.Cu").unwrap(),
            &t
        ));
        assert!(!item_on_layer(&via(None), t.by_name("F.Mask").unwrap(), &t));
    }
}
