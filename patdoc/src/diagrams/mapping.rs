//! Where each figure goes in the disclosure

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// How a figure is placed relative to its target section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlacementPolicy {
    /// Right after the section heading
    FirstParagraph,
    /// Before the first paragraph matching the keyword
    BeforeKeyword,
    /// After the last paragraph matching the keyword
    AfterKeyword,
}

/// Placement rule for one figure number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementRule {
    pub section_id: &'static str,
    pub section_name: &'static str,
    pub policy: PlacementPolicy,
    /// Regex alternatives such as `协议格式|IP分配协议`
    pub keyword: Option<&'static str>,
}

impl PlacementRule {
    const fn first(section_id: &'static str, section_name: &'static str) -> Self {
        Self {
            section_id,
            section_name,
            policy: PlacementPolicy::FirstParagraph,
            keyword: None,
        }
    }

    const fn before(section_id: &'static str, section_name: &'static str, keyword: &'static str) -> Self {
        Self {
            section_id,
            section_name,
            policy: PlacementPolicy::BeforeKeyword,
            keyword: Some(keyword),
        }
    }

    const fn after(section_id: &'static str, section_name: &'static str, keyword: &'static str) -> Self {
        Self {
            section_id,
            section_name,
            policy: PlacementPolicy::AfterKeyword,
            keyword: Some(keyword),
        }
    }
}

/// Rule for figures missing from the table
pub const DEFAULT_RULE: PlacementRule = PlacementRule::first("4.2", "技术方案");

fn placement_table() -> &'static BTreeMap<&'static str, PlacementRule> {
    static TABLE: OnceLock<BTreeMap<&'static str, PlacementRule>> = OnceLock::new();
    TABLE.get_or_init(|| {
        BTreeMap::from([
            ("图1", PlacementRule::first("4.2", "技术方案")),
            ("图2", PlacementRule::after("4.2", "技术方案", "软件架构")),
            ("图3", PlacementRule::after("4.2", "技术方案", "功能模块")),
            ("图4", PlacementRule::before("5", "具体实施方式", "设备发现")),
            ("图5", PlacementRule::before("5", "具体实施方式", "IP分配")),
            ("图6", PlacementRule::before("5", "具体实施方式", "时序|交互|消息")),
            ("图7", PlacementRule::after("4.2", "技术方案", "冲突检测")),
            ("图8", PlacementRule::before("5", "具体实施方式", "初始化")),
            ("图9", PlacementRule::before("5", "具体实施方式", "故障切换")),
            ("图10", PlacementRule::before("5", "具体实施方式", "协议格式|设备发现协议")),
            ("图11", PlacementRule::before("5", "具体实施方式", "协议格式|IP分配协议")),
            ("图12", PlacementRule::first("4.3", "有益效果")),
        ])
    })
}

/// Placement rule for a figure number, or [`DEFAULT_RULE`] when it has none
pub fn rule_for(number: &str) -> PlacementRule {
    match placement_table().get(number) {
        Some(rule) => *rule,
        None => {
            log::debug!("No placement rule for {}, using the default", number);
            DEFAULT_RULE
        }
    }
}
