//! Vision service codec
//!
//! Response shape: `{"count":N,"objects":[{"class_label":"Number 1 - 0.93","img_id":11},...]}`.
//! `class` is accepted in place of `class_label`. When `img_id` is missing or
//! negative the label is resolved through [`LABELS`].

use super::scan;
use crate::error::{Error, Result};

/// Class name to target id
pub const LABELS: &[(&str, i32)] = &[
    ("Number 1", 11),
    ("Number 2", 12),
    ("Number 3", 13),
    ("Number 4", 14),
    ("Number 5", 15),
    ("Number 6", 16),
    ("Number 7", 17),
    ("Number 8", 18),
    ("Number 9", 19),
    ("Alphabet A", 20),
    ("Alphabet B", 21),
    ("Alphabet C", 22),
    ("Alphabet D", 23),
    ("Alphabet E", 24),
    ("Alphabet F", 25),
    ("Alphabet G", 26),
    ("Alphabet H", 27),
    ("Alphabet S", 28),
    ("Alphabet T", 29),
    ("Alphabet U", 30),
    ("Alphabet V", 31),
    ("Alphabet W", 32),
    ("Alphabet X", 33),
    ("Alphabet Y", 34),
    ("Alphabet Z", 35),
    ("Up Arrow", 36),
    ("Down Arrow", 37),
    ("Right Arrow", 38),
    ("Left Arrow", 39),
    ("Stop sign", 40),
];

/// Marker on unclaimed obstacle faces; never a target
const BULLSEYE: &str = "Bullseye";

/// One detected object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    /// Class name with any ` - ...` suffix removed
    pub label: Option<String>,
    pub img_id: Option<i64>,
}

impl Detection {
    fn is_bullseye(&self) -> bool {
        self.label
            .as_deref()
            .is_some_and(|l| l.eq_ignore_ascii_case(BULLSEYE))
    }

    /// Target id carried or implied by this detection
    pub fn target_id(&self) -> Option<i32> {
        if self.is_bullseye() {
            return None;
        }
        match self.img_id {
            Some(id) if id >= 0 => i32::try_from(id).ok(),
            _ => self.label.as_deref().and_then(label_to_id),
        }
    }
}

/// Strip a trailing ` - confidence` style suffix
pub fn strip_label(label: &str) -> &str {
    label.split(" - ").next().unwrap_or(label).trim()
}

/// Resolve a class name through the fixed table
pub fn label_to_id(label: &str) -> Option<i32> {
    let name = strip_label(label);
    LABELS
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(name))
        .map(|&(_, id)| id)
}

/// Decode the detection list; `count: 0` yields no detections
pub fn decode_response(body: &str) -> Result<Vec<Detection>> {
    let count = scan::int_field(body, "count");
    if count == Some(0) {
        return Ok(Vec::new());
    }
    let Some(list) = scan::field(body, "objects") else {
        return match count {
            Some(_) => Err(Error::Decode("detections without objects".to_string())),
            None => Err(Error::Decode("not a detection response".to_string())),
        };
    };

    Ok(scan::objects(list)
        .map(|raw| Detection {
            label: scan::str_field(raw, "class_label")
                .or_else(|| scan::str_field(raw, "class"))
                .map(|l| strip_label(&l).to_string()),
            img_id: scan::int_field(raw, "img_id"),
        })
        .collect())
}

/// First detection that resolves to a target id
pub fn select_target(detections: &[Detection]) -> Option<i32> {
    detections.iter().find_map(Detection::target_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_table() {
        assert_eq!(label_to_id("Number 1"), Some(11));
        assert_eq!(label_to_id("Alphabet H"), Some(27));
        assert_eq!(label_to_id("Alphabet S"), Some(28));
        assert_eq!(label_to_id("Stop sign - 0.88"), Some(40));
        assert_eq!(label_to_id("left arrow"), Some(39));
        assert_eq!(label_to_id("Alphabet I"), None);
        assert_eq!(LABELS.len(), 30);
    }

    #[test]
    fn test_decode_and_select() {
        let body = r#"{"count":3,"objects":[
            {"class_label":"Bullseye - 0.99","img_id":10},
            {"class":"Up Arrow - 0.91","bbox":{"x1":1,"y1":2}},
            {"class_label":"Number 5","img_id":15}
        ]}"#;
        let detections = decode_response(body).unwrap();
        assert_eq!(detections.len(), 3);
        assert_eq!(detections[0].label.as_deref(), Some("Bullseye"));
        assert_eq!(detections[1].img_id, None);
        assert_eq!(select_target(&detections), Some(36));
    }

    #[test]
    fn test_img_id_preferred_over_label() {
        let detections = decode_response(
            r#"{"count":1,"objects":[{"class_label":"Number 1","img_id":19}]}"#,
        )
        .unwrap();
        assert_eq!(select_target(&detections), Some(19));

        let detections = decode_response(
            r#"{"count":1,"objects":[{"class_label":"Number 1","img_id":-1}]}"#,
        )
        .unwrap();
        assert_eq!(select_target(&detections), Some(11));
    }

    #[test]
    fn test_nothing_resolvable() {
        assert!(decode_response(r#"{"count":0}"#).unwrap().is_empty());
        assert!(decode_response(r#"{"count":0,"objects":[{"img_id":11}]}"#).unwrap().is_empty());

        let detections =
            decode_response(r#"{"count":1,"objects":[{"class":"Mystery"}]}"#).unwrap();
        assert_eq!(select_target(&detections), None);
        assert_eq!(select_target(&[]), None);
    }

    #[test]
    fn test_malformed_response() {
        assert!(decode_response(r#"{"count":2}"#).is_err());
        assert!(decode_response("Internal Server Error").is_err());
    }
}
