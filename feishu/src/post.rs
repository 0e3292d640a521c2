use serde_json::{json, Value};

/// One task line extracted from the generated summary text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskItem {
    /// Feishu user id, mentionable via an `at` node.
    pub user_id: String,
    /// Remaining display text (project, task, status).
    pub text: String,
}

/// Summary text split into its two blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummarySections {
    /// Label in front of the first block header, e.g. "今日" or "2025/09/26".
    pub date_label: String,
    pub today: Vec<TaskItem>,
    pub week: Vec<TaskItem>,
}

const SECTION_SUFFIX: &str = "任务:";
const WEEK_PREFIX: &str = "本周";

/// Split the frontend summary text into a date label plus today/week task
/// lists. Section headers end with `任务:`; a `本周` prefix selects the
/// week block, any other header sets the date label for the first block.
pub fn parse_sections(text: &str) -> SummarySections {
    let mut date_label = "今日".to_string();
    let mut today = Vec::new();
    let mut week = Vec::new();

    enum Block {
        None,
        Today,
        Week,
    }
    let mut current = Block::None;

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(label) = line.strip_suffix(SECTION_SUFFIX) {
            if line.starts_with(WEEK_PREFIX) {
                current = Block::Week;
            } else {
                date_label = label.to_string();
                current = Block::Today;
            }
            continue;
        }

        let item = match parse_task_line(line) {
            Some(item) => item,
            None => continue,
        };
        match current {
            Block::Today => today.push(item),
            Block::Week => week.push(item),
            Block::None => {}
        }
    }

    SummarySections {
        date_label,
        today,
        week,
    }
}

/// Parse one task line of the form
/// `(第1条) @ou_xxx, 项目名称, 任务名称, 状态` (the ordinal prefix and the
/// `@` are both optional; fullwidth commas are accepted). Returns `None`
/// when no user id can be extracted.
pub fn parse_task_line(line: &str) -> Option<TaskItem> {
    let mut line = line.trim();
    if line.starts_with('(') {
        if let Some((_, rest)) = line.split_once(')') {
            line = rest.trim();
        }
    }

    let normalized = line.replace('，', ",");
    let mut parts = normalized
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty());

    let first = parts.next()?;
    let user_id = first.strip_prefix('@').unwrap_or(first);
    if user_id.is_empty() {
        return None;
    }

    Some(TaskItem {
        user_id: user_id.to_string(),
        text: parts.collect::<Vec<_>>().join(", "),
    })
}

/// One rendered task line: ☐ + @user + italic/bold text.
fn task_line_nodes(item: &TaskItem) -> Value {
    let text = if item.text.is_empty() {
        String::new()
    } else {
        format!(" {}", item.text)
    };
    json!([
        { "tag": "text", "text": "☐   ", "style": ["italic"] },
        { "tag": "at", "user_id": item.user_id },
        { "tag": "text", "text": text, "style": ["italic", "bold"] },
    ])
}

fn header_nodes(label: &str) -> Value {
    json!([{ "tag": "text", "text": format!("{}{}", label, SECTION_SUFFIX), "style": ["bold"] }])
}

/// Assemble the `zh_cn` locale block for a rich-text post from parsed
/// sections. The week block is omitted entirely when it has no items.
pub fn build_post_from_sections(title: &str, sections: &SummarySections) -> Value {
    let mut blocks: Vec<Value> = Vec::new();
    blocks.push(header_nodes(&sections.date_label));
    for item in &sections.today {
        blocks.push(task_line_nodes(item));
    }
    if !sections.week.is_empty() {
        blocks.push(header_nodes(WEEK_PREFIX));
        for item in &sections.week {
            blocks.push(task_line_nodes(item));
        }
    }

    json!({
        "title": title,
        "content": blocks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_task_line_with_ordinal_prefix() {
        let item = parse_task_line("(第1条) @ou_abc, 项目A, 修复登录, 进行中").unwrap();
        assert_eq!(item.user_id, "ou_abc");
        assert_eq!(item.text, "项目A, 修复登录, 进行中");
    }

    #[test]
    fn parses_task_line_without_at_prefix() {
        let item = parse_task_line("ou_abc，项目A，任务B").unwrap();
        assert_eq!(item.user_id, "ou_abc");
        assert_eq!(item.text, "项目A, 任务B");
    }

    #[test]
    fn rejects_empty_task_line() {
        assert_eq!(parse_task_line(""), None);
        assert_eq!(parse_task_line("@,"), None);
    }

    #[test]
    fn splits_today_and_week_sections() {
        let text = "2025/09/26任务:\n@ou_a, 项目A, 任务1, 完成\n本周任务:\n@ou_b, 项目B, 任务2, 进行中\n";
        let sections = parse_sections(text);
        assert_eq!(sections.date_label, "2025/09/26");
        assert_eq!(sections.today.len(), 1);
        assert_eq!(sections.week.len(), 1);
        assert_eq!(sections.today[0].user_id, "ou_a");
        assert_eq!(sections.week[0].user_id, "ou_b");
    }

    #[test]
    fn default_date_label_when_no_header() {
        let sections = parse_sections("@ou_a, 孤儿行");
        assert_eq!(sections.date_label, "今日");
        // Lines outside any section are dropped.
        assert!(sections.today.is_empty());
        assert!(sections.week.is_empty());
    }

    #[test]
    fn post_omits_empty_week_block() {
        let sections = SummarySections {
            date_label: "今日".into(),
            today: vec![TaskItem {
                user_id: "ou_a".into(),
                text: "项目A, 任务1".into(),
            }],
            week: vec![],
        };
        let zh_cn = build_post_from_sections("任务汇总", &sections);
        assert_eq!(zh_cn["title"], "任务汇总");
        let blocks = zh_cn["content"].as_array().unwrap();
        // Header plus one task line, no week header.
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0][0]["text"], "今日任务:");
        assert_eq!(blocks[1][1]["tag"], "at");
        assert_eq!(blocks[1][1]["user_id"], "ou_a");
    }
}
