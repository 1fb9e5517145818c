//! Pick the paragraph a figure is inserted next to

use super::mapping::{rule_for, PlacementPolicy, PlacementRule};
use crate::disclosure::recognize_heading;
use crate::docx::Side;
use regex::Regex;
use serde::Serialize;

/// Number of paragraphs from the section heading searched for a keyword
pub const SEARCH_WINDOW: usize = 50;

/// Resolved insertion target
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InsertionPoint {
    /// Paragraph index the figure is inserted next to
    pub index: usize,
    pub side: Side,
    /// Display name of the target section
    pub section: String,
    /// True when the target section was not found and index 0 was used
    #[serde(skip)]
    pub fell_back: bool,
}

/// Index of the target section heading, if any
fn find_section(rule: &PlacementRule, paragraphs: &[String]) -> Option<usize> {
    paragraphs
        .iter()
        .position(|text| recognize_heading(text) == Some(rule.section_id))
        .or_else(|| paragraphs.iter().position(|text| text.contains(rule.section_name)))
}

/// Matching paragraph indices within the search window
fn keyword_matches(keyword: &str, section: usize, paragraphs: &[String]) -> Vec<usize> {
    let regex = match Regex::new(keyword) {
        Ok(regex) => regex,
        Err(e) => {
            log::warn!("Invalid placement keyword {}: {}", keyword, e);
            return Vec::new();
        }
    };
    let end = paragraphs.len().min(section + SEARCH_WINDOW);
    (section..end)
        .filter(|&i| regex.is_match(&paragraphs[i]))
        .collect()
}

/// Where figure `number` goes among `paragraphs`
///
/// Unknown figure numbers use the default rule. A missing target section
/// falls back to paragraph 0; a keyword with no match in the window places
/// the figure right after the section heading.
pub fn resolve(number: &str, paragraphs: &[String]) -> InsertionPoint {
    let rule = rule_for(number);

    let Some(section) = find_section(&rule, paragraphs) else {
        log::warn!(
            "Section {} for {} not found, inserting at the start",
            rule.section_name,
            number
        );
        return InsertionPoint {
            index: 0,
            side: Side::After,
            section: rule.section_name.to_string(),
            fell_back: true,
        };
    };

    let after_heading = (section, Side::After);
    let (index, side) = match (rule.policy, rule.keyword) {
        (PlacementPolicy::FirstParagraph, _) | (_, None) => after_heading,
        (PlacementPolicy::BeforeKeyword, Some(keyword)) => {
            match keyword_matches(keyword, section, paragraphs).first() {
                Some(&i) if i == section => (i, Side::After),
                Some(&i) => (i, Side::Before),
                None => after_heading,
            }
        }
        (PlacementPolicy::AfterKeyword, Some(keyword)) => {
            match keyword_matches(keyword, section, paragraphs).last() {
                Some(&i) => (i, Side::After),
                None => after_heading,
            }
        }
    };

    log::debug!("{} goes {:?} paragraph {} in {}", number, side, index, rule.section_name);
    InsertionPoint {
        index,
        side,
        section: rule.section_name.to_string(),
        fell_back: false,
    }
}
