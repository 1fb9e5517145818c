//! Required-section completeness report

use super::Section;
use crate::disclosure::{PARENT_OF_SUBSECTIONS, SECTIONS, SUBSECTIONS};
use serde::{Deserialize, Serialize};

/// Which required sections and subsections are present
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Completeness {
    pub is_complete: bool,
    pub missing_sections: Vec<String>,
    pub missing_subsections: Vec<String>,
    /// Number of top-level sections parsed
    pub all_sections_found: usize,
    /// Number of required top-level sections
    pub expected_sections: usize,
}

/// Compare parsed sections against the required layout
///
/// Missing subsections are only reported when their parent section exists.
pub fn check_completeness(sections: &[Section]) -> Completeness {
    let missing_sections: Vec<String> = SECTIONS
        .iter()
        .filter(|spec| !sections.iter().any(|s| s.number == spec.id))
        .map(|spec| spec.id.to_string())
        .collect();

    let missing_subsections: Vec<String> = sections
        .iter()
        .find(|s| s.number == PARENT_OF_SUBSECTIONS)
        .map(|parent| {
            SUBSECTIONS
                .iter()
                .filter(|spec| !parent.subsections.iter().any(|sub| sub.number == spec.id))
                .map(|spec| spec.id.to_string())
                .collect()
        })
        .unwrap_or_default();

    Completeness {
        is_complete: missing_sections.is_empty() && missing_subsections.is_empty(),
        missing_sections,
        missing_subsections,
        all_sections_found: sections.len(),
        expected_sections: SECTIONS.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::super::parse_str;
    use super::*;

    fn disclosure(skip: &[u32]) -> String {
        let mut md = String::from("# 交底书\n");
        for spec in SECTIONS {
            if skip.contains(&spec.ordinal) {
                continue;
            }
            md.push_str(&format!("## **{}. {}**\n正文{}\n", spec.ordinal, spec.title, spec.ordinal));
            if spec.id == "4" {
                for sub in SUBSECTIONS {
                    md.push_str(&format!("### **（{}）{}**\n子正文\n", sub.ordinal, sub.title));
                }
            }
        }
        md
    }

    #[test]
    fn test_complete_disclosure() {
        let report = parse_str(&disclosure(&[])).validation;
        assert!(report.is_complete);
        assert!(report.missing_sections.is_empty());
        assert!(report.missing_subsections.is_empty());
        assert_eq!(report.all_sections_found, 7);
        assert_eq!(report.expected_sections, 7);
    }

    #[test]
    fn test_missing_section_six() {
        let report = parse_str(&disclosure(&[6])).validation;
        assert!(!report.is_complete);
        assert_eq!(report.missing_sections, vec!["6"]);
        assert_eq!(report.all_sections_found, 6);
        assert_eq!(report.expected_sections, 7);
    }

    #[test]
    fn test_counts_serialize_as_numbers() {
        let report = parse_str(&disclosure(&[2, 3])).validation;
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["all_sections_found"], 5);
        assert_eq!(json["expected_sections"], 7);
    }

    #[test]
    fn test_missing_subsections_only_when_parent_exists() {
        let without_four = parse_str(&disclosure(&[4])).validation;
        assert_eq!(without_four.missing_sections, vec!["4"]);
        assert!(without_four.missing_subsections.is_empty());

        let bare_four = check_completeness(&[Section::new("4", "发明内容", 2)]);
        assert_eq!(bare_four.missing_subsections, vec!["4.1", "4.2", "4.3"]);
    }
}
