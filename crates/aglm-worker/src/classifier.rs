use aglm_contracts::Intent;

/// One ordered rule: the first rule whose keyword list contains a
/// case-insensitive substring match of `content` wins.
struct Rule {
    intent: &'static str,
    workflow: &'static str,
    keywords: &'static [&'static str],
}

const RULES: &[Rule] = &[
    Rule {
        intent: "deployment_check",
        workflow: "deployment_check",
        keywords: &[
            "部署", "上线", "发布", "deployment", "health", "健康", "接口", "模型",
        ],
    },
    Rule {
        intent: "report_query",
        workflow: "report_stub",
        keywords: &["查询", "报表", "统计", "数据", "report", "流量"],
    },
    Rule {
        intent: "travel_plan",
        workflow: "travel_plan",
        keywords: &[
            "旅游", "旅行", "行程", "攻略", "机票", "航班", "高铁", "火车", "12306", "携程",
            "美团", "住宿", "酒店", "比价",
        ],
    },
];

/// Classify free-text `content` into an `(intent, workflow)` pair. Falls
/// back to `{intent: general, workflow: echo}` when nothing matches.
pub fn classify(content: &str) -> Intent {
    let lower = content.to_lowercase();
    for rule in RULES {
        if rule.keywords.iter().any(|kw| lower.contains(&kw.to_lowercase())) {
            return Intent::new(rule.intent, rule.workflow);
        }
    }
    Intent::general()
}
