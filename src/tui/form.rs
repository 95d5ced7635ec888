use chrono::{DateTime, Utc};

use crate::models::{parse_tags, Difficulty, NewNote, NewProblem, Note, Problem, ProblemStatus};

/// Languages offered for a problem's stored solution.
pub const SOLUTION_LANGUAGES: [&str; 8] = [
    "JavaScript",
    "Python",
    "Java",
    "C++",
    "C#",
    "Go",
    "Rust",
    "TypeScript",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProblemField {
    Title,
    Difficulty,
    Category,
    Status,
    Url,
    Language,
    Tags,
    TimeComplexity,
    SpaceComplexity,
    Notes,
    Solution,
    Description,
}

impl ProblemField {
    pub const ALL: [ProblemField; 12] = [
        ProblemField::Title,
        ProblemField::Difficulty,
        ProblemField::Category,
        ProblemField::Status,
        ProblemField::Url,
        ProblemField::Language,
        ProblemField::Tags,
        ProblemField::TimeComplexity,
        ProblemField::SpaceComplexity,
        ProblemField::Notes,
        ProblemField::Solution,
        ProblemField::Description,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ProblemField::Title => "Title *",
            ProblemField::Difficulty => "Difficulty",
            ProblemField::Category => "Category *",
            ProblemField::Status => "Status",
            ProblemField::Url => "LeetCode URL",
            ProblemField::Language => "Language",
            ProblemField::Tags => "Tags",
            ProblemField::TimeComplexity => "Time",
            ProblemField::SpaceComplexity => "Space",
            ProblemField::Notes => "Notes",
            ProblemField::Solution => "Solution",
            ProblemField::Description => "Description",
        }
    }

    /// Fields edited with Left/Right rather than typed.
    pub fn is_choice(&self) -> bool {
        matches!(
            self,
            ProblemField::Difficulty | ProblemField::Status | ProblemField::Language
        )
    }

    pub fn is_multiline(&self) -> bool {
        matches!(
            self,
            ProblemField::Notes | ProblemField::Solution | ProblemField::Description
        )
    }
}

fn step<T: Copy + PartialEq>(all: &[T], current: T, forward: bool) -> T {
    let len = all.len();
    let pos = all.iter().position(|v| *v == current).unwrap_or(0);
    let next = if forward { (pos + 1) % len } else { (pos + len - 1) % len };
    all[next]
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProblemForm {
    /// Id of the problem being edited; `None` for a new one.
    pub editing: Option<String>,
    pub draft: NewProblem,
    pub tags: String,
    pub description: String,
    pub focus: usize,
    pub error: Option<String>,
}

impl ProblemForm {
    pub fn new() -> Self {
        Self::prefilled(NewProblem::default())
    }

    pub fn prefilled(mut draft: NewProblem) -> Self {
        if draft.language.is_empty() {
            draft.language = SOLUTION_LANGUAGES[0].to_string();
        }
        Self {
            editing: None,
            tags: draft.tags.join(", "),
            description: draft.description.clone().unwrap_or_default(),
            draft,
            focus: 0,
            error: None,
        }
    }

    pub fn edit(problem: &Problem) -> Self {
        Self {
            editing: Some(problem.id.clone()),
            ..Self::prefilled(problem.to_new())
        }
    }

    pub fn title(&self) -> &'static str {
        if self.editing.is_some() {
            " Edit Problem "
        } else {
            " Add New Problem "
        }
    }

    pub fn field(&self) -> ProblemField {
        ProblemField::ALL[self.focus]
    }

    pub fn next_field(&mut self) {
        self.focus = (self.focus + 1) % ProblemField::ALL.len();
    }

    pub fn prev_field(&mut self) {
        let len = ProblemField::ALL.len();
        self.focus = (self.focus + len - 1) % len;
    }

    pub fn value(&self, field: ProblemField) -> String {
        match field {
            ProblemField::Title => self.draft.title.clone(),
            ProblemField::Difficulty => self.draft.difficulty.label().to_string(),
            ProblemField::Category => self.draft.category.clone(),
            ProblemField::Status => self.draft.status.label().to_string(),
            ProblemField::Url => self.draft.url.clone(),
            ProblemField::Language => self.draft.language.clone(),
            ProblemField::Tags => self.tags.clone(),
            ProblemField::TimeComplexity => self.draft.time_complexity.clone(),
            ProblemField::SpaceComplexity => self.draft.space_complexity.clone(),
            ProblemField::Notes => self.draft.notes.clone(),
            ProblemField::Solution => self.draft.solution.clone(),
            ProblemField::Description => self.description.clone(),
        }
    }

    fn text_mut(&mut self) -> Option<&mut String> {
        match self.field() {
            ProblemField::Title => Some(&mut self.draft.title),
            ProblemField::Category => Some(&mut self.draft.category),
            ProblemField::Url => Some(&mut self.draft.url),
            ProblemField::Tags => Some(&mut self.tags),
            ProblemField::TimeComplexity => Some(&mut self.draft.time_complexity),
            ProblemField::SpaceComplexity => Some(&mut self.draft.space_complexity),
            ProblemField::Notes => Some(&mut self.draft.notes),
            ProblemField::Solution => Some(&mut self.draft.solution),
            ProblemField::Description => Some(&mut self.description),
            ProblemField::Difficulty | ProblemField::Status | ProblemField::Language => None,
        }
    }

    pub fn input_char(&mut self, c: char) {
        if let Some(text) = self.text_mut() {
            text.push(c);
        }
    }

    pub fn backspace(&mut self) {
        if let Some(text) = self.text_mut() {
            text.pop();
        }
    }

    pub fn newline(&mut self) {
        if self.field().is_multiline() {
            self.input_char('\n');
        }
    }

    pub fn cycle(&mut self, forward: bool) {
        match self.field() {
            ProblemField::Difficulty => {
                self.draft.difficulty = step(&Difficulty::ALL, self.draft.difficulty, forward);
            }
            ProblemField::Status => {
                self.draft.status = step(&ProblemStatus::ALL, self.draft.status, forward);
            }
            ProblemField::Language => {
                let current = SOLUTION_LANGUAGES
                    .iter()
                    .copied()
                    .find(|l| *l == self.draft.language)
                    .unwrap_or(SOLUTION_LANGUAGES[0]);
                self.draft.language = step(&SOLUTION_LANGUAGES, current, forward).to_string();
            }
            _ => {}
        }
    }

    /// Validates and normalizes the draft. On error the message is kept on the form.
    pub fn submit(&mut self, now: DateTime<Utc>) -> Result<NewProblem, String> {
        let mut fields = self.draft.clone();
        fields.title = fields.title.trim().to_string();
        fields.category = fields.category.trim().to_string();
        fields.url = fields.url.trim().to_string();
        fields.tags = parse_tags(&self.tags);
        fields.description = Some(self.description.trim())
            .filter(|d| !d.is_empty())
            .map(str::to_string);

        if let Err(msg) = fields.validate() {
            self.error = Some(msg.clone());
            return Err(msg);
        }
        fields.stamp_completion(now);
        self.error = None;
        Ok(fields)
    }
}

impl Default for ProblemForm {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteField {
    Content,
    Tags,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteForm {
    pub editing: Option<i64>,
    pub problem_id: Option<String>,
    pub content: String,
    pub tags: String,
    pub on_tags: bool,
    pub error: Option<String>,
}

impl NoteForm {
    pub fn new(problem_id: Option<String>) -> Self {
        Self {
            problem_id,
            ..Default::default()
        }
    }

    pub fn edit(note: &Note) -> Self {
        Self {
            editing: Some(note.id),
            problem_id: note.problem_id.clone(),
            content: note.content.clone(),
            tags: note.tags.join(", "),
            on_tags: false,
            error: None,
        }
    }

    pub fn field(&self) -> NoteField {
        if self.on_tags {
            NoteField::Tags
        } else {
            NoteField::Content
        }
    }

    pub fn toggle_field(&mut self) {
        self.on_tags = !self.on_tags;
    }

    pub fn input_char(&mut self, c: char) {
        match self.field() {
            NoteField::Content => self.content.push(c),
            NoteField::Tags => self.tags.push(c),
        }
    }

    pub fn backspace(&mut self) {
        match self.field() {
            NoteField::Content => self.content.pop(),
            NoteField::Tags => self.tags.pop(),
        };
    }

    pub fn newline(&mut self) {
        if self.field() == NoteField::Content {
            self.content.push('\n');
        }
    }

    pub fn submit(&mut self) -> Result<NewNote, String> {
        if self.content.trim().is_empty() {
            let msg = "Note content cannot be empty".to_string();
            self.error = Some(msg.clone());
            return Err(msg);
        }
        self.error = None;
        Ok(NewNote {
            problem_id: self.problem_id.clone(),
            content: self.content.trim_end().to_string(),
            tags: parse_tags(&self.tags),
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::models::fixtures;

    fn type_str(form: &mut ProblemForm, s: &str) {
        s.chars().for_each(|c| form.input_char(c));
    }

    #[test]
    fn new_form_requires_title_and_category() {
        let mut form = ProblemForm::new();
        assert_eq!(form.draft.language, "JavaScript");
        type_str(&mut form, "Two Sum");

        let err = form.submit(Utc::now()).unwrap_err();
        assert_eq!(err, "Please fill in all required fields");
        assert_eq!(form.error.as_deref(), Some("Please fill in all required fields"));

        form.focus = 2;
        assert_eq!(form.field(), ProblemField::Category);
        type_str(&mut form, " Arrays ");
        form.focus = 6;
        type_str(&mut form, "hash table, two pointers,");

        let fields = form.submit(Utc::now()).unwrap();
        assert_eq!(fields.category, "Arrays");
        assert_eq!(fields.tags, vec!["hash table", "two pointers"]);
        assert_eq!(fields.description, None);
        assert!(form.error.is_none());
    }

    #[test]
    fn field_navigation_wraps() {
        let mut form = ProblemForm::new();
        form.prev_field();
        assert_eq!(form.field(), ProblemField::Description);
        form.next_field();
        assert_eq!(form.field(), ProblemField::Title);
    }

    #[test]
    fn choice_fields_cycle_both_ways_and_ignore_typing() {
        let mut form = ProblemForm::new();
        form.focus = 1;
        form.input_char('x');
        assert_eq!(form.draft.difficulty, Difficulty::Easy);

        form.cycle(true);
        assert_eq!(form.draft.difficulty, Difficulty::Medium);
        form.cycle(false);
        form.cycle(false);
        assert_eq!(form.draft.difficulty, Difficulty::Hard);

        form.focus = 5;
        form.cycle(false);
        assert_eq!(form.draft.language, "TypeScript");
    }

    #[test]
    fn saving_as_completed_stamps_completion() {
        let now = Utc.with_ymd_and_hms(2024, 2, 1, 8, 0, 0).unwrap();
        let problem = fixtures::problem("p1", "Two Sum", Difficulty::Easy, "Arrays");
        let mut form = ProblemForm::edit(&problem);
        assert_eq!(form.editing.as_deref(), Some("p1"));

        form.focus = 3;
        form.cycle(true);
        form.cycle(true);
        assert_eq!(form.draft.status, ProblemStatus::Completed);

        let fields = form.submit(now).unwrap();
        assert_eq!(fields.completed_at, Some(now));
    }

    #[test]
    fn newline_only_in_multiline_fields() {
        let mut form = ProblemForm::new();
        form.newline();
        assert_eq!(form.draft.title, "");

        form.focus = 10;
        type_str(&mut form, "return 1;");
        form.newline();
        assert_eq!(form.draft.solution, "return 1;\n");
        form.backspace();
        assert_eq!(form.draft.solution, "return 1;");
    }

    #[test]
    fn note_form_edits_content_and_tags() {
        let mut form = NoteForm::new(Some("p1".to_string()));
        assert!(form.submit().is_err());

        "Sliding window".chars().for_each(|c| form.input_char(c));
        form.newline();
        form.toggle_field();
        "arrays, windows".chars().for_each(|c| form.input_char(c));

        let note = form.submit().unwrap();
        assert_eq!(note.content, "Sliding window");
        assert_eq!(note.tags, vec!["arrays", "windows"]);
        assert_eq!(note.problem_id.as_deref(), Some("p1"));
    }
}
