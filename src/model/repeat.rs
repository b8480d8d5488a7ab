use chrono::{Datelike, Days, Months, NaiveDate, Weekday};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Interval unit of a repeat rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatUnit {
    Day,
    Week,
    Month,
}

impl RepeatUnit {
    fn suffix(self) -> char {
        match self {
            RepeatUnit::Day => 'd',
            RepeatUnit::Week => 'w',
            RepeatUnit::Month => 'm',
        }
    }
}

/// A recurrence specification: interval unit × count, plus an optional
/// weekday set for week rules. Text form is compact: `1d`, `3w`, `1m`,
/// `1w mon,thu`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepeatRule {
    pub unit: RepeatUnit,
    pub count: u32,
    /// Only valid on week rules. When non-empty, the count is ignored and
    /// the next occurrence is the earliest listed weekday strictly after
    /// the anchor date.
    pub weekdays: Vec<Weekday>,
}

impl RepeatRule {
    pub fn every(count: u32, unit: RepeatUnit) -> Self {
        RepeatRule {
            unit,
            count,
            weekdays: Vec::new(),
        }
    }

    pub fn on_weekdays(weekdays: Vec<Weekday>) -> Self {
        RepeatRule {
            unit: RepeatUnit::Week,
            count: 1,
            weekdays,
        }
    }
}

/// Error from decoding a repeat rule's text form. Callers treat the tag
/// as opaque text rather than failing the whole line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid repeat rule: {0}")]
pub struct RuleParseError(String);

impl FromStr for RepeatRule {
    type Err = RuleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let mut parts = s.split_whitespace();
        let interval = parts
            .next()
            .ok_or_else(|| RuleParseError(s.to_string()))?;

        let unit = match interval.chars().last() {
            Some('d') => RepeatUnit::Day,
            Some('w') => RepeatUnit::Week,
            Some('m') => RepeatUnit::Month,
            _ => return Err(RuleParseError(s.to_string())),
        };
        let count: u32 = interval[..interval.len() - 1]
            .parse()
            .map_err(|_| RuleParseError(s.to_string()))?;
        if count == 0 {
            return Err(RuleParseError(s.to_string()));
        }

        let mut weekdays = Vec::new();
        if let Some(days) = parts.next() {
            if unit != RepeatUnit::Week {
                return Err(RuleParseError(s.to_string()));
            }
            for day in days.split(',') {
                let day = parse_weekday(day).ok_or_else(|| RuleParseError(s.to_string()))?;
                if !weekdays.contains(&day) {
                    weekdays.push(day);
                }
            }
        }
        if parts.next().is_some() {
            return Err(RuleParseError(s.to_string()));
        }

        Ok(RepeatRule {
            unit,
            count,
            weekdays,
        })
    }
}

impl fmt::Display for RepeatRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.count, self.unit.suffix())?;
        if !self.weekdays.is_empty() {
            let days: Vec<&str> = self.weekdays.iter().map(|d| weekday_name(*d)).collect();
            write!(f, " {}", days.join(","))?;
        }
        Ok(())
    }
}

fn parse_weekday(s: &str) -> Option<Weekday> {
    match s.trim().to_ascii_lowercase().as_str() {
        "mon" => Some(Weekday::Mon),
        "tue" => Some(Weekday::Tue),
        "wed" => Some(Weekday::Wed),
        "thu" => Some(Weekday::Thu),
        "fri" => Some(Weekday::Fri),
        "sat" => Some(Weekday::Sat),
        "sun" => Some(Weekday::Sun),
        _ => None,
    }
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "mon",
        Weekday::Tue => "tue",
        Weekday::Wed => "wed",
        Weekday::Thu => "thu",
        Weekday::Fri => "fri",
        Weekday::Sat => "sat",
        Weekday::Sun => "sun",
    }
}

/// Compute the next occurrence of `rule` strictly after `from`.
///
/// Day rules add `count` days. Week rules with a weekday set pick the
/// earliest listed weekday after `from`; without a set they add
/// `count × 7` days. Month rules keep the day-of-month, clamped to the
/// last valid day of the target month (chrono's month addition already
/// clamps). Total for any valid rule and date.
pub fn next_occurrence(rule: &RepeatRule, from: NaiveDate) -> NaiveDate {
    match rule.unit {
        RepeatUnit::Day => from
            .checked_add_days(Days::new(rule.count as u64))
            .unwrap_or(NaiveDate::MAX),
        RepeatUnit::Week => {
            if rule.weekdays.is_empty() {
                from.checked_add_days(Days::new(rule.count as u64 * 7))
                    .unwrap_or(NaiveDate::MAX)
            } else {
                // The set is non-empty, so one of the next 7 days matches.
                let mut next = from.succ_opt().unwrap_or(NaiveDate::MAX);
                for _ in 0..7 {
                    if rule.weekdays.contains(&next.weekday()) {
                        break;
                    }
                    next = next.succ_opt().unwrap_or(NaiveDate::MAX);
                }
                next
            }
        }
        RepeatUnit::Month => from
            .checked_add_months(Months::new(rule.count))
            .unwrap_or(NaiveDate::MAX),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_day_rule() {
        let rule: RepeatRule = "1d".parse().unwrap();
        assert_eq!(rule, RepeatRule::every(1, RepeatUnit::Day));
        assert_eq!(rule.to_string(), "1d");
    }

    #[test]
    fn test_parse_week_rule_with_days() {
        let rule: RepeatRule = "1w mon,thu".parse().unwrap();
        assert_eq!(rule.unit, RepeatUnit::Week);
        assert_eq!(rule.weekdays, vec![Weekday::Mon, Weekday::Thu]);
        assert_eq!(rule.to_string(), "1w mon,thu");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!("".parse::<RepeatRule>().is_err());
        assert!("0d".parse::<RepeatRule>().is_err());
        assert!("2x".parse::<RepeatRule>().is_err());
        assert!("w".parse::<RepeatRule>().is_err());
        assert!("1d mon".parse::<RepeatRule>().is_err()); // weekdays only on week rules
        assert!("1w mon tue".parse::<RepeatRule>().is_err());
        assert!("1w funday".parse::<RepeatRule>().is_err());
    }

    #[test]
    fn test_parse_dedups_weekdays() {
        let rule: RepeatRule = "1w mon,mon,fri".parse().unwrap();
        assert_eq!(rule.weekdays, vec![Weekday::Mon, Weekday::Fri]);
    }

    #[test]
    fn test_next_day_rule() {
        let rule = RepeatRule::every(3, RepeatUnit::Day);
        assert_eq!(next_occurrence(&rule, date("2026-03-01")), date("2026-03-04"));
    }

    #[test]
    fn test_next_week_rule_no_set() {
        let rule = RepeatRule::every(2, RepeatUnit::Week);
        assert_eq!(next_occurrence(&rule, date("2026-03-01")), date("2026-03-15"));
    }

    #[test]
    fn test_next_week_rule_with_set() {
        // 2026-03-02 is a Monday
        let rule = RepeatRule::on_weekdays(vec![Weekday::Mon, Weekday::Thu]);
        assert_eq!(next_occurrence(&rule, date("2026-03-02")), date("2026-03-05"));
        assert_eq!(next_occurrence(&rule, date("2026-03-05")), date("2026-03-09"));
        // Same weekday next week when the anchor is the only listed day
        let rule = RepeatRule::on_weekdays(vec![Weekday::Mon]);
        assert_eq!(next_occurrence(&rule, date("2026-03-02")), date("2026-03-09"));
    }

    #[test]
    fn test_next_month_rule_clamps() {
        let rule = RepeatRule::every(1, RepeatUnit::Month);
        assert_eq!(next_occurrence(&rule, date("2026-01-31")), date("2026-02-28"));
        assert_eq!(next_occurrence(&rule, date("2024-01-31")), date("2024-02-29"));
        assert_eq!(next_occurrence(&rule, date("2026-03-31")), date("2026-04-30"));
    }

    #[test]
    fn test_next_is_strictly_after_and_deterministic() {
        let rules = [
            "1d".parse::<RepeatRule>().unwrap(),
            "4w".parse().unwrap(),
            "1w sat,sun".parse().unwrap(),
            "6m".parse().unwrap(),
        ];
        for rule in &rules {
            for from in ["2026-02-28", "2026-12-31", "2024-02-29"] {
                let from = date(from);
                let next = next_occurrence(rule, from);
                assert!(next > from, "{rule} from {from} gave {next}");
                assert_eq!(next, next_occurrence(rule, from));
            }
        }
    }
}
