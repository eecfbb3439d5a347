use chrono::{Datelike, NaiveDate};
use crossterm::event::KeyCode;

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum DatePart {
    Year,
    Month,
    Day,
}

impl DatePart {
    fn width(self) -> usize {
        match self {
            DatePart::Year => 4,
            DatePart::Month | DatePart::Day => 2,
        }
    }
}

/// A date typed one part at a time. The date may be unset; the first
/// completed part fills the other two from `anchor`.
pub struct DateInputState {
    pub date: Option<NaiveDate>,
    pub anchor: NaiveDate,
    pub editing: bool,
    pub date_part: DatePart,
    pub current_date_input: String,
}

impl DateInputState {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date: Some(date),
            anchor: date,
            editing: false,
            date_part: DatePart::Year,
            current_date_input: String::new(),
        }
    }

    pub fn empty(anchor: NaiveDate) -> Self {
        Self {
            date: None,
            ..Self::new(anchor)
        }
    }

    pub fn toggle_editing(&mut self) {
        self.editing = !self.editing;
        if self.editing {
            self.date_part = DatePart::Year;
        }
        self.current_date_input.clear();
    }

    pub fn next_date_part(&mut self) {
        self.date_part = match self.date_part {
            DatePart::Year => DatePart::Month,
            DatePart::Month => DatePart::Day,
            DatePart::Day => DatePart::Year,
        };
        self.current_date_input.clear();
    }

    pub fn previous_date_part(&mut self) {
        self.date_part = match self.date_part {
            DatePart::Year => DatePart::Day,
            DatePart::Month => DatePart::Year,
            DatePart::Day => DatePart::Month,
        };
        self.current_date_input.clear();
    }

    pub fn handle_input(&mut self, key: KeyCode) {
        if !self.editing {
            return;
        }

        match key {
            KeyCode::Char(c) if c.is_ascii_digit() => {
                self.current_date_input.push(c);
                if self.current_date_input.len() == self.date_part.width() {
                    self.apply_current_part();
                    self.current_date_input.clear();
                }
            }
            KeyCode::Backspace => {
                self.current_date_input.pop();
            }
            KeyCode::Delete => {
                self.date = None;
                self.current_date_input.clear();
            }
            KeyCode::Right => self.next_date_part(),
            KeyCode::Left => self.previous_date_part(),
            _ => {}
        }
    }

    /// Out-of-range parts and impossible dates leave the date as it was.
    fn apply_current_part(&mut self) {
        let base = self.date.unwrap_or(self.anchor);
        let (year, month, day) = (base.year(), base.month(), base.day());
        let updated = match self.date_part {
            DatePart::Year => self
                .current_date_input
                .parse::<i32>()
                .ok()
                .filter(|y| (1900..=2100).contains(y))
                .and_then(|y| NaiveDate::from_ymd_opt(y, month, day)),
            DatePart::Month => self
                .current_date_input
                .parse::<u32>()
                .ok()
                .and_then(|m| NaiveDate::from_ymd_opt(year, m, day)),
            DatePart::Day => self
                .current_date_input
                .parse::<u32>()
                .ok()
                .and_then(|d| NaiveDate::from_ymd_opt(year, month, d)),
        };
        if let Some(date) = updated {
            self.date = Some(date);
        }
    }

    pub fn get_display_string(&self) -> String {
        let Some(date) = self.date else {
            return if self.editing {
                format!("YYYY-MM-DD [{}]", self.current_date_input)
            } else {
                "Not set".to_string()
            };
        };

        let (year, month, day) = (
            format!("{:04}", date.year()),
            format!("{:02}", date.month()),
            format!("{:02}", date.day()),
        );
        if !self.editing {
            return format!("{}-{}-{}", year, month, day);
        }

        let current_input = if !self.current_date_input.is_empty() {
            format!("[{}]", self.current_date_input)
        } else {
            match self.date_part {
                DatePart::Year => "[YYYY]".to_string(),
                DatePart::Month => "[MM]".to_string(),
                DatePart::Day => "[DD]".to_string(),
            }
        };

        match self.date_part {
            DatePart::Year => format!("{}{}-{}-{}", year, current_input, month, day),
            DatePart::Month => format!("{}-{}{}-{}", year, month, current_input, day),
            DatePart::Day => format!("{}-{}-{}{}", year, month, day, current_input),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn type_digits(state: &mut DateInputState, digits: &str) {
        for c in digits.chars() {
            state.handle_input(KeyCode::Char(c));
        }
    }

    #[test]
    fn ignores_keys_unless_editing() {
        let mut state = DateInputState::new(ymd(2025, 1, 1));
        type_digits(&mut state, "2030");
        assert_eq!(state.date, Some(ymd(2025, 1, 1)));
    }

    #[test]
    fn typing_each_part_builds_a_date() {
        let mut state = DateInputState::empty(ymd(2025, 1, 1));
        assert_eq!(state.get_display_string(), "Not set");

        state.toggle_editing();
        type_digits(&mut state, "2026");
        state.handle_input(KeyCode::Right);
        type_digits(&mut state, "03");
        state.handle_input(KeyCode::Right);
        type_digits(&mut state, "15");

        assert_eq!(state.date, Some(ymd(2026, 3, 15)));
    }

    #[test]
    fn impossible_dates_are_rejected() {
        let mut state = DateInputState::new(ymd(2025, 2, 10));
        state.toggle_editing();
        state.date_part = DatePart::Day;
        type_digits(&mut state, "30");
        assert_eq!(state.date, Some(ymd(2025, 2, 10)));

        state.date_part = DatePart::Month;
        type_digits(&mut state, "13");
        assert_eq!(state.date, Some(ymd(2025, 2, 10)));

        state.date_part = DatePart::Year;
        type_digits(&mut state, "1800");
        assert_eq!(state.date, Some(ymd(2025, 2, 10)));
    }

    #[test]
    fn delete_unsets_the_date() {
        let mut state = DateInputState::new(ymd(2025, 2, 10));
        state.toggle_editing();
        state.handle_input(KeyCode::Delete);
        assert_eq!(state.date, None);
    }

    #[test]
    fn display_marks_the_part_being_edited() {
        let mut state = DateInputState::new(ymd(2025, 2, 10));
        assert_eq!(state.get_display_string(), "2025-02-10");

        state.toggle_editing();
        state.next_date_part();
        assert_eq!(state.get_display_string(), "2025-02[MM]-10");
        type_digits(&mut state, "1");
        assert_eq!(state.get_display_string(), "2025-02[1]-10");
    }
}
