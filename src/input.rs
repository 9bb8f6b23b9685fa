use crate::backend::HttpCommentBackend;
use crate::renderer::{Renderer, PROMPT_INPUT_CLASS};
use crate::terminal::Terminal;
use crate::utils;
use std::rc::Rc;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{HtmlInputElement, KeyboardEvent};

pub type PageTerminal = Terminal<Renderer, HttpCommentBackend>;

const TOGGLE_KEY: &str = "T";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyAction {
    Toggle,
    Submit,
    Autocomplete,
    RecallHistory,
}

/// Where the key went, as far as the shell cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PromptFocus {
    Elsewhere,
    Empty,
    Typing,
}

pub fn install_listeners(terminal: Rc<PageTerminal>) -> Result<(), JsValue> {
    let document = utils::document()?;

    let keydown_terminal = Rc::clone(&terminal);
    let keydown_closure = Closure::wrap(Box::new(move |event: KeyboardEvent| {
        handle_keydown(&keydown_terminal, event);
    }) as Box<dyn FnMut(_)>);

    document
        .add_event_listener_with_callback("keydown", keydown_closure.as_ref().unchecked_ref())?;
    keydown_closure.forget();

    Ok(())
}

fn handle_keydown(terminal: &Rc<PageTerminal>, event: KeyboardEvent) {
    let focus = prompt_focus(&event);
    let Some(action) = classify_key(&event.key(), event.shift_key(), focus) else {
        return;
    };

    match action {
        KeyAction::Toggle => {
            event.prevent_default();
            let terminal = Rc::clone(terminal);
            spawn_local(async move {
                terminal.toggle().await;
            });
        }
        _ if !terminal.accepts_input() => {}
        KeyAction::Submit => {
            event.prevent_default();
            let terminal = Rc::clone(terminal);
            spawn_local(async move {
                terminal.submit().await;
            });
        }
        KeyAction::Autocomplete => {
            event.prevent_default();
            terminal.reject_autocomplete();
        }
        KeyAction::RecallHistory => {
            event.prevent_default();
            terminal.recall_history();
        }
    }
}

/// Only the live prompt input counts; a read-only input belongs to a
/// finished command line.
fn prompt_focus(event: &KeyboardEvent) -> PromptFocus {
    let Some(input) = event
        .target()
        .and_then(|target| target.dyn_into::<HtmlInputElement>().ok())
    else {
        return PromptFocus::Elsewhere;
    };
    if input.read_only() || !input.class_list().contains(PROMPT_INPUT_CLASS) {
        return PromptFocus::Elsewhere;
    }
    if input.value().is_empty() {
        PromptFocus::Empty
    } else {
        PromptFocus::Typing
    }
}

fn classify_key(key: &str, shift: bool, focus: PromptFocus) -> Option<KeyAction> {
    match (key, focus) {
        (TOGGLE_KEY, PromptFocus::Typing) => None,
        (TOGGLE_KEY, _) if shift => Some(KeyAction::Toggle),
        (_, PromptFocus::Elsewhere) => None,
        ("Enter", _) => Some(KeyAction::Submit),
        ("Tab", _) => Some(KeyAction::Autocomplete),
        ("ArrowUp", _) => Some(KeyAction::RecallHistory),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shift_t_toggles_outside_the_prompt_or_on_an_empty_one() {
        assert_eq!(
            classify_key("T", true, PromptFocus::Elsewhere),
            Some(KeyAction::Toggle)
        );
        assert_eq!(
            classify_key("T", true, PromptFocus::Empty),
            Some(KeyAction::Toggle)
        );
        assert_eq!(classify_key("t", false, PromptFocus::Elsewhere), None);
        assert_eq!(classify_key("T", false, PromptFocus::Elsewhere), None);
    }

    #[test]
    fn uppercase_t_is_typed_while_a_command_is_being_written() {
        assert_eq!(classify_key("T", true, PromptFocus::Typing), None);
    }

    #[test]
    fn prompt_keys_are_recognised_on_the_prompt() {
        for focus in [PromptFocus::Empty, PromptFocus::Typing] {
            assert_eq!(classify_key("Enter", false, focus), Some(KeyAction::Submit));
            assert_eq!(classify_key("Tab", false, focus), Some(KeyAction::Autocomplete));
            assert_eq!(classify_key("Tab", true, focus), Some(KeyAction::Autocomplete));
            assert_eq!(
                classify_key("ArrowUp", false, focus),
                Some(KeyAction::RecallHistory)
            );
            assert_eq!(classify_key("ArrowDown", false, focus), None);
        }
    }

    #[test]
    fn prompt_keys_elsewhere_on_the_page_are_left_alone() {
        for key in ["Enter", "Tab", "ArrowUp"] {
            assert_eq!(classify_key(key, false, PromptFocus::Elsewhere), None);
            assert_eq!(classify_key(key, true, PromptFocus::Elsewhere), None);
        }
    }
}
