use chrono::NaiveDate;

use crate::model::repeat::RepeatRule;

/// The user-facing picker the engine's command handlers block on before
/// relocating anything. `None` means the user cancelled; the operation
/// becomes a no-op. Implementations may take arbitrarily long to answer
/// (a modal dialog, a TUI widget); nothing else is held up meanwhile.
pub trait Prompt {
    /// Ask for a destination date. `default` is a suggestion the
    /// implementation is free to ignore.
    fn pick_date(&mut self, default: NaiveDate) -> Option<NaiveDate>;

    /// Ask for a recurrence rule.
    fn pick_rule(&mut self) -> Option<RepeatRule>;
}

/// A prompt whose answers were supplied up front — command-line
/// arguments, test scripts. An absent value reads as cancellation.
#[derive(Debug, Default)]
pub struct FixedPrompt {
    pub date: Option<NaiveDate>,
    pub rule: Option<RepeatRule>,
}

impl Prompt for FixedPrompt {
    fn pick_date(&mut self, _default: NaiveDate) -> Option<NaiveDate> {
        self.date
    }

    fn pick_rule(&mut self) -> Option<RepeatRule> {
        self.rule.clone()
    }
}
