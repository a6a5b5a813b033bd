//! Indented Markdown-checkbox import/export.
//!
//! ```text
//! - [ ] Write report !!!
//!   - [x] Collect numbers (2🍅)
//!   - [ ] Draft summary
//! - [ ] Inbox zero !
//! ```
//!
//! Decoding auto-detects the indent unit (tab, or the smallest run of leading
//! spaces), rebuilds parent links from indentation, and reads the optional
//! trailing priority marker and pomodoro count. Encoding walks the tree in
//! hierarchy order and writes the same dialect back.

use serde::{Deserialize, Serialize};

use super::ordering::hierarchy_order;
use super::{Priority, Task};

const DEFAULT_INDENT_SPACES: usize = 2;
const POMODORO_MARK: char = '🍅';

/// Indentation written by the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IndentStyle {
    #[default]
    Spaces,
    Tab,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodeOptions {
    /// Accept plain `- `, `* ` and `1. ` list items, not only checkboxes.
    pub allow_list_format: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOptions {
    pub indent_style: IndentStyle,
    /// Spaces per level when `indent_style` is `Spaces`.
    pub indent_spaces: usize,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            indent_style: IndentStyle::Spaces,
            indent_spaces: DEFAULT_INDENT_SPACES,
        }
    }
}

impl EncodeOptions {
    fn unit(&self) -> String {
        match self.indent_style {
            IndentStyle::Tab => "\t".to_string(),
            IndentStyle::Spaces => {
                let width = if self.indent_spaces == 0 {
                    DEFAULT_INDENT_SPACES
                } else {
                    self.indent_spaces
                };
                " ".repeat(width)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IndentUnit {
    Tab,
    Spaces(usize),
}

impl IndentUnit {
    fn detect(text: &str) -> Self {
        if text.lines().any(|line| line.starts_with('\t')) {
            return IndentUnit::Tab;
        }
        let min = text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| leading(line, ' '))
            .filter(|&n| n > 0)
            .min();
        IndentUnit::Spaces(min.unwrap_or(DEFAULT_INDENT_SPACES))
    }

    fn level_of(self, line: &str) -> usize {
        match self {
            IndentUnit::Tab => leading(line, '\t'),
            IndentUnit::Spaces(0) => 0,
            IndentUnit::Spaces(width) => leading(line, ' ') / width,
        }
    }
}

fn leading(line: &str, ch: char) -> usize {
    line.chars().take_while(|&c| c == ch).count()
}

/// One recognized line before parent links are resolved.
#[derive(Debug, Clone, PartialEq)]
struct ParsedLine {
    title: String,
    priority: Priority,
    completed: bool,
    pomodoros: u32,
    level: usize,
}

pub struct TextHierarchyCodec;

impl TextHierarchyCodec {
    /// Parse `text` into tasks in hierarchy order (parents before children).
    ///
    /// Unrecognized and blank lines are skipped. Actual indent levels are
    /// always contiguous: a line indented three units under a root still
    /// becomes a level-1 child of that root.
    pub fn decode(text: &str, options: &DecodeOptions) -> Vec<Task> {
        let unit = IndentUnit::detect(text);
        let parsed: Vec<ParsedLine> = text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| parse_line(line, unit, options))
            .collect();

        // (source level, task index, actual indent)
        let mut stack: Vec<(usize, usize, u32)> = Vec::new();
        let mut tasks: Vec<Task> = Vec::with_capacity(parsed.len());

        for line in parsed {
            while stack.last().is_some_and(|&(level, _, _)| level >= line.level) {
                stack.pop();
            }

            let mut task = Task::new(line.title, line.priority);
            task.completed = line.completed;
            task.pomodoro_count = line.pomodoros;
            if let Some(&(_, parent_idx, parent_indent)) = stack.last() {
                task.parent_id = Some(tasks[parent_idx].id.clone());
                task.indent_level = parent_indent + 1;
            }

            stack.push((line.level, tasks.len(), task.indent_level));
            tasks.push(task);
        }

        tasks
    }

    /// Render `tasks` (any order) as indented checkbox lines.
    pub fn encode(tasks: &[Task], options: &EncodeOptions) -> String {
        let unit = options.unit();
        hierarchy_order(tasks, true)
            .into_iter()
            .map(|task| {
                let mut line = unit.repeat(task.indent_level as usize);
                line.push_str(if task.completed { "- [x] " } else { "- [ ] " });
                line.push_str(&task.title);
                if task.is_root() {
                    line.push(' ');
                    line.push_str(task.priority.symbol());
                }
                if task.pomodoro_count > 0 {
                    line.push_str(&format!(" ({}{})", task.pomodoro_count, POMODORO_MARK));
                }
                line
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn parse_line(line: &str, unit: IndentUnit, options: &DecodeOptions) -> Option<ParsedLine> {
    let level = unit.level_of(line);
    let body = line.trim();

    let (rest, completed) = if let Some(rest) = body
        .strip_prefix("- [x]")
        .or_else(|| body.strip_prefix("- [X]"))
    {
        (rest, true)
    } else if let Some(rest) = body.strip_prefix("- [ ]") {
        (rest, false)
    } else if !options.allow_list_format {
        return None;
    } else if let Some(rest) = body.strip_prefix("- ").or_else(|| body.strip_prefix("* ")) {
        (rest, false)
    } else {
        (strip_numbered(body)?, false)
    };

    let mut title = rest.trim();
    if title.is_empty() {
        return None;
    }

    let mut pomodoros = 0;
    if let Some((head, count)) = split_pomodoro_suffix(title) {
        title = head;
        pomodoros = count;
    }

    let mut priority = Priority::Medium;
    for candidate in [Priority::High, Priority::Medium, Priority::Low] {
        let suffix = format!(" {}", candidate.symbol());
        if let Some(head) = title.strip_suffix(suffix.as_str()) {
            title = head;
            priority = candidate;
            break;
        }
    }

    Some(ParsedLine {
        title: title.to_string(),
        priority,
        completed,
        pomodoros,
        level,
    })
}

/// `"12. rest"` -> `"rest"`; requires digits, a dot and whitespace.
fn strip_numbered(body: &str) -> Option<&str> {
    let digits = body.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let after = body[digits..].strip_prefix('.')?;
    let trimmed = after.trim_start();
    if trimmed.len() == after.len() {
        return None;
    }
    Some(trimmed)
}

/// `"Title (3🍅)"` -> `("Title", 3)`.
fn split_pomodoro_suffix(title: &str) -> Option<(&str, u32)> {
    let inner = title.strip_suffix(')')?;
    let open = inner.rfind(" (")?;
    let count = inner[open + 2..].strip_suffix(POMODORO_MARK)?;
    let count: u32 = count.parse().ok()?;
    Some((&title[..open], count))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titles(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|t| t.title.as_str()).collect()
    }

    #[test]
    fn detects_space_unit_from_smallest_indent() {
        assert_eq!(IndentUnit::detect("- a\n    - b\n  - c"), IndentUnit::Spaces(2));
        assert_eq!(IndentUnit::detect("- a\n- b"), IndentUnit::Spaces(2));
        assert_eq!(IndentUnit::detect("- a\n\t- b\n    - c"), IndentUnit::Tab);
        assert_eq!(IndentUnit::detect("- a\n   - b"), IndentUnit::Spaces(3));
    }

    #[test]
    fn decodes_checkboxes_priorities_and_parents() {
        let tasks = TextHierarchyCodec::decode(
            "- [ ] A !!!\n  - [x] B\n    - [ ] C !\n- [X] D",
            &DecodeOptions::default(),
        );
        assert_eq!(titles(&tasks), ["A", "B", "C", "D"]);
        assert_eq!(tasks[0].priority, Priority::High);
        assert!(tasks[1].completed);
        assert_eq!(tasks[1].parent_id.as_deref(), Some(tasks[0].id.as_str()));
        assert_eq!(tasks[2].parent_id.as_deref(), Some(tasks[1].id.as_str()));
        assert_eq!(tasks[2].indent_level, 2);
        assert_eq!(tasks[2].priority, Priority::Low);
        assert!(tasks[3].is_root());
        assert!(tasks[3].completed);
    }

    #[test]
    fn irregular_indentation_yields_contiguous_levels() {
        let tasks = TextHierarchyCodec::decode(
            "- [ ] root\n      - [ ] deep\n  - [ ] shallow",
            &DecodeOptions::default(),
        );
        assert_eq!(tasks[1].indent_level, 1);
        assert_eq!(tasks[1].parent_id.as_deref(), Some(tasks[0].id.as_str()));
        // "shallow" (level 1) pops "deep" (level 3) and hangs off root.
        assert_eq!(tasks[2].parent_id.as_deref(), Some(tasks[0].id.as_str()));
        assert_eq!(tasks[2].indent_level, 1);
    }

    #[test]
    fn plain_list_items_need_opt_in() {
        let text = "- bullet\n* star\n3. numbered\n- [ ] box";
        let strict = TextHierarchyCodec::decode(text, &DecodeOptions::default());
        assert_eq!(titles(&strict), ["box"]);

        let relaxed = TextHierarchyCodec::decode(
            text,
            &DecodeOptions {
                allow_list_format: true,
            },
        );
        assert_eq!(titles(&relaxed), ["bullet", "star", "numbered", "box"]);
    }

    #[test]
    fn skips_noise_and_empty_titles() {
        let tasks = TextHierarchyCodec::decode(
            "# Heading\n\nsome prose\n- [ ]   \n- [ ] real\n12.no-space",
            &DecodeOptions {
                allow_list_format: true,
            },
        );
        assert_eq!(titles(&tasks), ["real"]);
    }

    #[test]
    fn reads_pomodoro_count_before_priority() {
        let tasks = TextHierarchyCodec::decode(
            "- [ ] Write (draft) !!! (3🍅)",
            &DecodeOptions::default(),
        );
        assert_eq!(tasks[0].title, "Write (draft)");
        assert_eq!(tasks[0].priority, Priority::High);
        assert_eq!(tasks[0].pomodoro_count, 3);
    }

    #[test]
    fn encodes_priority_on_roots_only() {
        let mut root = Task::new("Root", Priority::High);
        root.pomodoro_count = 2;
        let mut child = Task::new("Child", Priority::Low).with_parent(&root);
        child.completed = true;
        let text = TextHierarchyCodec::encode(&[child, root], &EncodeOptions::default());
        assert_eq!(text, "- [ ] Root !!! (2🍅)\n  - [x] Child");
    }

    #[test]
    fn encodes_with_tabs() {
        let root = Task::new("Root", Priority::Medium);
        let child = Task::new("Child", Priority::Medium).with_parent(&root);
        let text = TextHierarchyCodec::encode(
            &[child, root],
            &EncodeOptions {
                indent_style: IndentStyle::Tab,
                indent_spaces: 4,
            },
        );
        assert_eq!(text, "- [ ] Root !!\n\t- [ ] Child");
    }
}
