///! Student record model and row normalization
///!
///! Maps raw CSV rows onto the fixed record shape consumed by the
///! renderers, with optional column mapping and passthrough of
///! unclaimed columns.

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Logical field name -> raw CSV column name.
pub type ColumnMapping = HashMap<String, String>;

/// Logical field names every template can rely on. Normalized records always
/// carry these keys, empty-valued when the source row has no data for them.
pub const WELL_KNOWN_FIELDS: &[&str] = &[
    "name",
    "nickname",
    "department",
    "stateOfOrigin",
    "mostChallengingCourse",
    "favoriteCourse",
    "bestLevel",
    "hobbies",
    "bestMoment",
    "worstExperience",
    "afterSchool",
    "relationshipStatus",
    "photoPath",
    "photoUrl",
    "photoBase64",
];

/// One normalized student row.
///
/// Well-known fields are plain struct members so renderers get them without
/// lookups; everything else rides along in `extra`. Serialization flattens
/// the extras next to the camelCase field names, which is the shape the
/// page templates interpolate against.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRecord {
    pub name: String,
    pub nickname: String,
    pub department: String,
    pub state_of_origin: String,
    pub most_challenging_course: String,
    pub favorite_course: String,
    pub best_level: String,
    pub hobbies: String,
    pub best_moment: String,
    pub worst_experience: String,
    pub after_school: String,
    pub relationship_status: String,
    pub photo_path: String,
    pub photo_url: String,
    pub photo_base64: String,
    #[serde(flatten)]
    pub extra: HashMap<String, String>,
}

impl StudentRecord {
    /// Look up a field by its logical (camelCase) name, falling back to the
    /// passthrough map.
    pub fn field(&self, key: &str) -> Option<&str> {
        let value = match key {
            "name" => &self.name,
            "nickname" => &self.nickname,
            "department" => &self.department,
            "stateOfOrigin" => &self.state_of_origin,
            "mostChallengingCourse" => &self.most_challenging_course,
            "favoriteCourse" => &self.favorite_course,
            "bestLevel" => &self.best_level,
            "hobbies" => &self.hobbies,
            "bestMoment" => &self.best_moment,
            "worstExperience" => &self.worst_experience,
            "afterSchool" => &self.after_school,
            "relationshipStatus" => &self.relationship_status,
            "photoPath" => &self.photo_path,
            "photoUrl" => &self.photo_url,
            "photoBase64" => &self.photo_base64,
            _ => return self.extra.get(key).map(String::as_str),
        };
        Some(value.as_str())
    }

    /// Assign a field by logical name; unknown names land in the
    /// passthrough map.
    pub fn set_field(&mut self, key: &str, value: &str) {
        let slot = match key {
            "name" => &mut self.name,
            "nickname" => &mut self.nickname,
            "department" => &mut self.department,
            "stateOfOrigin" => &mut self.state_of_origin,
            "mostChallengingCourse" => &mut self.most_challenging_course,
            "favoriteCourse" => &mut self.favorite_course,
            "bestLevel" => &mut self.best_level,
            "hobbies" => &mut self.hobbies,
            "bestMoment" => &mut self.best_moment,
            "worstExperience" => &mut self.worst_experience,
            "afterSchool" => &mut self.after_school,
            "relationshipStatus" => &mut self.relationship_status,
            "photoPath" => &mut self.photo_path,
            "photoUrl" => &mut self.photo_url,
            "photoBase64" => &mut self.photo_base64,
            _ => {
                self.extra.insert(key.to_string(), value.to_string());
                return;
            }
        };
        *slot = value.to_string();
    }
}

/// Normalize one raw row into a [`StudentRecord`].
///
/// When a mapping is supplied it is authoritative: only mapped fields are
/// populated, name-equality matching is not applied. Without a mapping,
/// well-known fields are copied from identically named columns. In both
/// modes, raw columns that were not consumed under their own name pass
/// through verbatim: a column the mapping consumed under a different
/// logical name still surfaces under its raw name.
pub fn normalize(row: &HashMap<String, String>, mapping: Option<&ColumnMapping>) -> StudentRecord {
    let mut record = StudentRecord::default();
    let mut consumed: HashSet<&str> = HashSet::new();

    match mapping {
        Some(mapping) => {
            for (logical, raw_column) in mapping {
                let Some(value) = row.get(raw_column) else {
                    continue;
                };
                record.set_field(logical, value);
                if logical == raw_column {
                    consumed.insert(raw_column.as_str());
                }
            }
        }
        None => {
            for key in WELL_KNOWN_FIELDS.iter().copied() {
                if let Some(value) = row.get(key) {
                    record.set_field(key, value);
                    consumed.insert(key);
                }
            }
        }
    }

    for (column, value) in row {
        if consumed.contains(column.as_str()) || record.extra.contains_key(column) {
            continue;
        }
        record.extra.insert(column.clone(), value.clone());
    }

    record
}

/// Load a column mapping from a JSON file.
pub async fn load_mapping(path: impl AsRef<Path>) -> Result<ColumnMapping> {
    let path = path.as_ref();
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read mapping file: {}", path.display()))?;
    let mapping: ColumnMapping =
        serde_json::from_str(&content).context("Invalid column mapping JSON")?;
    Ok(mapping)
}

/// Sample mapping emitted by `init-config` and the HTTP mapping endpoint.
pub const SAMPLE_MAPPING_JSON: &str = r#"{
  "name": "Full Name",
  "nickname": "Nickname",
  "department": "Department",
  "stateOfOrigin": "State",
  "mostChallengingCourse": "Hardest Course",
  "favoriteCourse": "Best Course",
  "bestLevel": "Favorite Level",
  "hobbies": "Hobbies",
  "bestMoment": "Best Memory",
  "worstExperience": "Worst Experience",
  "afterSchool": "Future Plans",
  "relationshipStatus": "Relationship",
  "photoPath": "Photo Path",
  "photoUrl": "Photo URL",
  "photoBase64": "Photo Base64"
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn default_match_copies_well_known_columns() {
        let raw = row(&[
            ("name", "John Doe"),
            ("department", "Computer Science"),
            ("Matric Number", "2019/12345"),
        ]);

        let record = normalize(&raw, None);

        assert_eq!(record.name, "John Doe");
        assert_eq!(record.department, "Computer Science");
        // unresolved fields are present but empty, never absent
        assert_eq!(record.field("stateOfOrigin"), Some(""));
        assert_eq!(record.field("photoPath"), Some(""));
        // unmapped columns pass through verbatim
        assert_eq!(record.extra.get("Matric Number").map(String::as_str), Some("2019/12345"));
        // name-matched columns are not duplicated into the passthrough map
        assert!(!record.extra.contains_key("name"));
    }

    #[test]
    fn mapping_is_authoritative() {
        let mut mapping = ColumnMapping::new();
        mapping.insert("name".to_string(), "Full Name".to_string());

        let raw = row(&[("Full Name", "Ada"), ("name", "ignored")]);
        let record = normalize(&raw, Some(&mapping));

        assert_eq!(record.name, "Ada");
        // mapping mode applies no name-equality fallback, so the raw `name`
        // column is untouched data and passes through
        assert_eq!(record.extra.get("name").map(String::as_str), Some("ignored"));
        // the consumed column also surfaces under its own raw name
        assert_eq!(record.extra.get("Full Name").map(String::as_str), Some("Ada"));
    }

    #[test]
    fn mapping_leaves_unmapped_fields_empty() {
        let mut mapping = ColumnMapping::new();
        mapping.insert("name".to_string(), "Full Name".to_string());

        let raw = row(&[("Full Name", "Ada"), ("department", "Maths")]);
        let record = normalize(&raw, Some(&mapping));

        // `department` is not in the mapping, so it stays empty even though
        // a same-named column exists
        assert_eq!(record.department, "");
        assert_eq!(record.extra.get("department").map(String::as_str), Some("Maths"));
    }

    #[test]
    fn identity_mapping_does_not_duplicate() {
        let mut mapping = ColumnMapping::new();
        mapping.insert("name".to_string(), "name".to_string());

        let raw = row(&[("name", "Ada")]);
        let record = normalize(&raw, Some(&mapping));

        assert_eq!(record.name, "Ada");
        assert!(record.extra.is_empty());
    }

    #[test]
    fn custom_logical_fields_land_in_extras() {
        let mut mapping = ColumnMapping::new();
        mapping.insert("motto".to_string(), "Class Motto".to_string());

        let raw = row(&[("Class Motto", "Forward ever")]);
        let record = normalize(&raw, Some(&mapping));

        assert_eq!(record.extra.get("motto").map(String::as_str), Some("Forward ever"));
        assert_eq!(
            record.extra.get("Class Motto").map(String::as_str),
            Some("Forward ever")
        );
    }

    #[test]
    fn serializes_with_camel_case_and_flattened_extras() {
        let mut record = StudentRecord::default();
        record.name = "Ada".to_string();
        record.state_of_origin = "Lagos".to_string();
        record.extra.insert("Matric Number".to_string(), "123".to_string());

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["name"], "Ada");
        assert_eq!(value["stateOfOrigin"], "Lagos");
        assert_eq!(value["Matric Number"], "123");
    }

    #[test]
    fn sample_mapping_parses() {
        let mapping: ColumnMapping = serde_json::from_str(SAMPLE_MAPPING_JSON).unwrap();
        assert_eq!(mapping.get("name").map(String::as_str), Some("Full Name"));
        assert_eq!(mapping.len(), 15);
    }
}
