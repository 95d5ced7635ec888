use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{InputMode, View};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    Quit,
    NextView,
    PrevView,
    MoveUp,
    MoveDown,
    MoveToTop,
    MoveToBottom,
    ShowHelp,
    HideHelp,
    Reload,
    // Filters and sorting
    StartSearch,
    CycleStatusFilter,
    CycleDifficultyFilter,
    CycleStarFilter,
    CycleSortField,
    FlipSortDirection,
    // Problem actions
    AddProblem,
    EditProblem,
    DeleteProblem,
    ToggleStar,
    CycleStatus,
    AnalyzeProblem,
    RunSolution,
    StartImport,
    OpenUrl,
    AddProblemNote,
    // Dashboard
    GenerateInsights,
    GenerateRecommendations,
    GeneratePlan,
    CyclePlanStatus,
    // Notes
    AddNote,
    EditNote,
    DeleteNote,
    // Compiler
    CycleLanguage,
    LoadCode,
    SaveCode,
    ResetCode,
    // Text input
    InputChar(char),
    InputBackspace,
    InputNewline,
    InputConfirm,
    InputCancel,
    NextField,
    PrevField,
    CycleChoice(bool),
    // Delete confirmation
    ConfirmYes,
    ConfirmNo,
}

pub fn handle_key_event(key: KeyEvent, mode: &InputMode, view: View) -> Option<AppAction> {
    match mode {
        // If help is showing, any key closes it
        InputMode::Help => Some(AppAction::HideHelp),

        InputMode::Confirm(_) => match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => Some(AppAction::ConfirmYes),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => Some(AppAction::ConfirmNo),
            _ => None,
        },

        InputMode::Prompt(_) => match key.code {
            KeyCode::Enter => Some(AppAction::InputConfirm),
            KeyCode::Esc => Some(AppAction::InputCancel),
            KeyCode::Backspace => Some(AppAction::InputBackspace),
            KeyCode::Char(c) => Some(AppAction::InputChar(c)),
            _ => None,
        },

        InputMode::ProblemForm | InputMode::NoteForm => form_key(key),

        InputMode::Normal => normal_key(key, view),
    }
}

fn form_key(key: KeyEvent) -> Option<AppAction> {
    match (key.code, key.modifiers) {
        (KeyCode::Char('j'), KeyModifiers::CONTROL) => Some(AppAction::InputNewline),
        (KeyCode::Enter, _) => Some(AppAction::InputConfirm),
        (KeyCode::Esc, _) => Some(AppAction::InputCancel),
        (KeyCode::Tab, _) => Some(AppAction::NextField),
        (KeyCode::BackTab, _) => Some(AppAction::PrevField),
        (KeyCode::Left, _) => Some(AppAction::CycleChoice(false)),
        (KeyCode::Right, _) => Some(AppAction::CycleChoice(true)),
        (KeyCode::Backspace, _) => Some(AppAction::InputBackspace),
        (KeyCode::Char(c), m) if !m.contains(KeyModifiers::CONTROL) => {
            Some(AppAction::InputChar(c))
        }
        _ => None,
    }
}

fn normal_key(key: KeyEvent, view: View) -> Option<AppAction> {
    if key.code == KeyCode::Char('c') && key.modifiers == KeyModifiers::CONTROL {
        return Some(AppAction::Quit);
    }
    // Commands are plain or shifted keys only
    if key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) {
        return None;
    }

    // Global keys
    let global = match (key.code, key.modifiers) {
        (KeyCode::Char('q'), _) => Some(AppAction::Quit),
        (KeyCode::Tab, _) => Some(AppAction::NextView),
        (KeyCode::BackTab, _) => Some(AppAction::PrevView),
        (KeyCode::Char('j'), _) | (KeyCode::Down, _) => Some(AppAction::MoveDown),
        (KeyCode::Char('k'), _) | (KeyCode::Up, _) => Some(AppAction::MoveUp),
        (KeyCode::Char('<'), _) | (KeyCode::Home, _) => Some(AppAction::MoveToTop),
        (KeyCode::Char('>'), _) | (KeyCode::End, _) => Some(AppAction::MoveToBottom),
        (KeyCode::Char('?'), _) => Some(AppAction::ShowHelp),
        _ => None,
    };
    if global.is_some() {
        return global;
    }

    let KeyCode::Char(c) = key.code else {
        return None;
    };

    match view {
        View::Problems => match c {
            '/' => Some(AppAction::StartSearch),
            'f' => Some(AppAction::CycleStatusFilter),
            'F' => Some(AppAction::CycleDifficultyFilter),
            '*' => Some(AppAction::CycleStarFilter),
            'o' => Some(AppAction::CycleSortField),
            'O' => Some(AppAction::FlipSortDirection),
            'a' => Some(AppAction::AddProblem),
            'e' => Some(AppAction::EditProblem),
            'd' => Some(AppAction::DeleteProblem),
            's' => Some(AppAction::ToggleStar),
            'x' => Some(AppAction::CycleStatus),
            'A' => Some(AppAction::AnalyzeProblem),
            'r' => Some(AppAction::RunSolution),
            'i' => Some(AppAction::StartImport),
            'w' => Some(AppAction::OpenUrl),
            'n' => Some(AppAction::AddProblemNote),
            'g' => Some(AppAction::Reload),
            _ => None,
        },
        View::Dashboard => match c {
            'I' => Some(AppAction::GenerateInsights),
            'R' => Some(AppAction::GenerateRecommendations),
            'P' => Some(AppAction::GeneratePlan),
            'c' => Some(AppAction::CyclePlanStatus),
            'g' => Some(AppAction::Reload),
            _ => None,
        },
        View::Notes => match c {
            '/' => Some(AppAction::StartSearch),
            'a' => Some(AppAction::AddNote),
            'e' => Some(AppAction::EditNote),
            'd' => Some(AppAction::DeleteNote),
            _ => None,
        },
        View::Compiler => match c {
            'l' => Some(AppAction::CycleLanguage),
            'r' => Some(AppAction::RunSolution),
            'o' => Some(AppAction::LoadCode),
            'w' => Some(AppAction::SaveCode),
            'c' => Some(AppAction::ResetCode),
            _ => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{ConfirmTarget, PromptKind};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ch(c: char) -> KeyEvent {
        key(KeyCode::Char(c))
    }

    #[test]
    fn same_key_means_different_things_per_view() {
        let normal = InputMode::Normal;
        assert_eq!(
            handle_key_event(ch('a'), &normal, View::Problems),
            Some(AppAction::AddProblem)
        );
        assert_eq!(
            handle_key_event(ch('a'), &normal, View::Notes),
            Some(AppAction::AddNote)
        );
        assert_eq!(
            handle_key_event(ch('r'), &normal, View::Compiler),
            Some(AppAction::RunSolution)
        );
        assert_eq!(handle_key_event(ch('a'), &normal, View::Compiler), None);
        assert_eq!(
            handle_key_event(ch('R'), &normal, View::Dashboard),
            Some(AppAction::GenerateRecommendations)
        );
    }

    #[test]
    fn global_keys_work_in_every_view() {
        for view in View::ALL {
            assert_eq!(
                handle_key_event(ch('q'), &InputMode::Normal, view),
                Some(AppAction::Quit)
            );
            assert_eq!(
                handle_key_event(key(KeyCode::Tab), &InputMode::Normal, view),
                Some(AppAction::NextView)
            );
        }
    }

    #[test]
    fn modified_letters_are_not_commands() {
        let normal = InputMode::Normal;
        let with = |c, m| KeyEvent::new(KeyCode::Char(c), m);
        assert_eq!(
            handle_key_event(with('d', KeyModifiers::CONTROL), &normal, View::Problems),
            None
        );
        assert_eq!(
            handle_key_event(with('q', KeyModifiers::ALT), &normal, View::Problems),
            None
        );
        assert_eq!(
            handle_key_event(with('c', KeyModifiers::CONTROL), &normal, View::Compiler),
            Some(AppAction::Quit)
        );
        assert_eq!(
            handle_key_event(with('A', KeyModifiers::SHIFT), &normal, View::Problems),
            Some(AppAction::AnalyzeProblem)
        );
        assert_eq!(
            handle_key_event(key(KeyCode::BackTab), &normal, View::Problems),
            Some(AppAction::PrevView)
        );
    }

    #[test]
    fn compiler_file_keys() {
        let normal = InputMode::Normal;
        assert_eq!(
            handle_key_event(ch('o'), &normal, View::Compiler),
            Some(AppAction::LoadCode)
        );
        assert_eq!(
            handle_key_event(ch('w'), &normal, View::Compiler),
            Some(AppAction::SaveCode)
        );
        assert_eq!(
            handle_key_event(ch('c'), &normal, View::Compiler),
            Some(AppAction::ResetCode)
        );
        assert_eq!(
            handle_key_event(ch('c'), &normal, View::Dashboard),
            Some(AppAction::CyclePlanStatus)
        );
    }

    #[test]
    fn prompt_captures_letters_that_are_normally_commands() {
        let mode = InputMode::Prompt(PromptKind::Search);
        assert_eq!(
            handle_key_event(ch('q'), &mode, View::Problems),
            Some(AppAction::InputChar('q'))
        );
        assert_eq!(
            handle_key_event(key(KeyCode::Esc), &mode, View::Problems),
            Some(AppAction::InputCancel)
        );
    }

    #[test]
    fn form_keys() {
        let mode = InputMode::ProblemForm;
        assert_eq!(
            handle_key_event(key(KeyCode::BackTab), &mode, View::Problems),
            Some(AppAction::PrevField)
        );
        assert_eq!(
            handle_key_event(key(KeyCode::Left), &mode, View::Problems),
            Some(AppAction::CycleChoice(false))
        );
        assert_eq!(
            handle_key_event(
                KeyEvent::new(KeyCode::Char('j'), KeyModifiers::CONTROL),
                &mode,
                View::Problems
            ),
            Some(AppAction::InputNewline)
        );
        assert_eq!(
            handle_key_event(
                KeyEvent::new(KeyCode::Char('S'), KeyModifiers::SHIFT),
                &mode,
                View::Problems
            ),
            Some(AppAction::InputChar('S'))
        );
    }

    #[test]
    fn confirm_and_help_modes() {
        let confirm = InputMode::Confirm(ConfirmTarget::Note(1));
        assert_eq!(
            handle_key_event(ch('y'), &confirm, View::Notes),
            Some(AppAction::ConfirmYes)
        );
        assert_eq!(handle_key_event(ch('x'), &confirm, View::Notes), None);
        assert_eq!(
            handle_key_event(ch('x'), &InputMode::Help, View::Notes),
            Some(AppAction::HideHelp)
        );
    }
}
