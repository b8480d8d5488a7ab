use serde::Serialize;

use crate::model::task::{Task, TaskStatus};
use crate::ops::{RelocationOutcome, ScanReport};

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct TaskJson {
    /// 1-based line number, as shown to the user.
    pub line: usize,
    pub status: TaskStatus,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repeat: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

#[derive(Serialize)]
pub struct MoveJson {
    pub destination: String,
    pub new_line: String,
    pub origin_preserved: bool,
}

pub fn task_to_json(task: &Task, line_no: usize) -> TaskJson {
    TaskJson {
        line: line_no,
        status: task.status,
        text: task.text.clone(),
        due: task.due.map(|d| d.format("%Y-%m-%d").to_string()),
        repeat: task.repeat.as_ref().map(|r| r.to_string()),
        link: task.origin.as_ref().map(|l| l.to_string()),
        tags: task.extra_tags.clone(),
    }
}

pub fn move_to_json(outcome: &RelocationOutcome) -> MoveJson {
    MoveJson {
        destination: outcome.destination.to_string(),
        new_line: outcome.new_line.clone(),
        origin_preserved: outcome.origin_preserved,
    }
}

// ---------------------------------------------------------------------------
// Human output
// ---------------------------------------------------------------------------

pub fn format_task_line(task: &Task, line_no: usize) -> String {
    let mut out = format!("{:>4} [{}]", line_no, task.status.checkbox_char());
    if task.status == TaskStatus::Moved {
        if let Some(ref link) = task.origin {
            out.push_str(&format!(" -> {}", link.note));
        }
        return out;
    }
    out.push(' ');
    out.push_str(&task.text);
    if let Some(due) = task.due {
        out.push_str(&format!("  due {}", due.format("%Y-%m-%d")));
    }
    if let Some(ref rule) = task.repeat {
        out.push_str(&format!("  every {}", rule));
    }
    out
}

pub fn format_scan_report(report: &ScanReport) -> Vec<String> {
    let mut out = Vec::new();
    for fired in &report.fired {
        out.push(format!(
            "{}: \"{}\" -> {} ({})",
            report.note, fired.text, fired.destination, fired.date
        ));
    }
    for err in &report.errors {
        out.push(format!("{}: error: {}", report.note, err));
    }
    out
}
