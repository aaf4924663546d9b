use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{App, Screen};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Action {
    None,
    Quit,
    /// Run `lookup.search`(...) with the typed address
    SearchProperties,
    /// Run `lookup.collections`(...) for the highlighted property
    OpenCurrentProperty,
}

pub(crate) fn handle_key_event(key: KeyEvent, app: &mut App) -> Action {
    use KeyCode::{Backspace, Char, Down, Enter, Esc, Left, Right, Tab, Up};

    // Global quit shortcut; plain `q` is text on the search screen
    if key.code == Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Action::Quit;
    }

    let mut action = Action::None;

    match app.screen {
        Screen::AddressSearch => match key.code {
            Up => {
                if app.property_list_index > 0 {
                    app.property_list_index -= 1;
                }
            }
            Down => {
                if app.property_list_index + 1 < app.properties.len() {
                    app.property_list_index += 1;
                }
            }
            Char(character) => {
                if !key.modifiers.contains(KeyModifiers::CONTROL)
                    && !key.modifiers.contains(KeyModifiers::ALT)
                {
                    app.address_input.push(character);
                }
            }
            Backspace => {
                app.address_input.pop();
            }
            Enter => {
                action = Action::SearchProperties;
            }
            Right | Tab => {
                action = Action::OpenCurrentProperty;
            }
            Esc => {
                action = Action::Quit;
            }
            _ => {}
        },

        Screen::PropertyView => match key.code {
            Left | Esc | Char('b') => {
                app.screen = Screen::AddressSearch;
                app.collections.clear();
            }
            Char('q') => {
                action = Action::Quit;
            }
            _ => {}
        },
    }
    action
}
