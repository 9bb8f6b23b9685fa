use crate::catalog::SectionId;
use crate::state::{AuthStatus, Comment};
use crate::utils;
use futures::future::LocalBoxFuture;
use gloo_timers::future::TimeoutFuture;
use std::cell::RefCell;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, HtmlAnchorElement, HtmlElement, HtmlInputElement, HtmlSpanElement, Node};

const TERMINAL_ID: &str = "terminal";
const OUTPUT_ID: &str = "terminal-output";
const COMMENT_LIST_ID: &str = "comment-list";
const COMMENT_AUTH_ID: &str = "comment-auth";

pub const PROMPT_INPUT_CLASS: &str = "prompt-input";
const ACTIVE_LINE_CLASS: &str = "line--active";
const CURSOR_GLYPH: &str = "\u{2588}";

/// Everything the interpreter needs from the page. Lines are addressed through
/// the handles the screen hands out, never looked up again.
pub trait Screen {
    type Line: Clone;
    type CommentItem;

    fn set_visible(&self, visible: bool) -> Result<(), JsValue>;

    /// Appends a new line at the end of the terminal and makes it the active one.
    fn append_line(&self, content: Option<&str>) -> Result<Self::Line, JsValue>;
    fn write_line(&self, line: &Self::Line, text: &str) -> Result<(), JsValue>;
    /// Hides the blinking cursor once a line is fully rendered.
    fn finish_line(&self, line: &Self::Line) -> Result<(), JsValue>;

    fn append_prompt(&self, line: &Self::Line, label: &str, text: &str) -> Result<(), JsValue>;
    fn prompt_text(&self, line: &Self::Line) -> String;
    fn set_prompt_text(&self, line: &Self::Line, text: &str);
    fn focus_prompt(&self, line: &Self::Line);
    /// Freezes the prompt's contents and demotes its line from active.
    fn disable_prompt(&self, line: &Self::Line) -> Result<(), JsValue>;

    fn show_section(&self, hide: SectionId, reveal: SectionId) -> Result<(), JsValue>;

    fn render_comments(&self, comments: &[Comment], auth: &AuthStatus) -> Result<(), JsValue>;
    fn prepend_comment(&self, comment: &Comment) -> Result<Self::CommentItem, JsValue>;
    fn remove_comment(&self, item: &Self::CommentItem) -> Result<(), JsValue>;

    fn pause(&self, millis: u32) -> LocalBoxFuture<'static, ()>;
}

#[derive(Clone)]
pub struct LineHandle {
    root: HtmlElement,
    text: HtmlSpanElement,
    cursor: HtmlSpanElement,
}

impl LineHandle {
    fn prompt_input(&self) -> Option<HtmlInputElement> {
        self.root
            .query_selector(&format!("input.{PROMPT_INPUT_CLASS}"))
            .ok()
            .flatten()
            .and_then(|element| element.dyn_into::<HtmlInputElement>().ok())
    }
}

pub struct Renderer {
    document: Document,
    terminal_root: HtmlElement,
    output: HtmlElement,
    comment_list: HtmlElement,
    comment_auth: HtmlElement,
    active_line: RefCell<Option<HtmlElement>>,
}

impl Renderer {
    pub fn new() -> Result<Self, JsValue> {
        let document = utils::document()?;
        let terminal_root = get_html_element(&document, TERMINAL_ID)?;
        let output = get_html_element(&document, OUTPUT_ID)?;
        let comment_list = get_html_element(&document, COMMENT_LIST_ID)?;
        let comment_auth = get_html_element(&document, COMMENT_AUTH_ID)?;

        Ok(Self {
            document,
            terminal_root,
            output,
            comment_list,
            comment_auth,
            active_line: RefCell::new(None),
        })
    }

    fn create_span(&self, class: &str) -> Result<HtmlSpanElement, JsValue> {
        let span = self
            .document
            .create_element("span")?
            .dyn_into::<HtmlSpanElement>()?;
        span.set_class_name(class);
        Ok(span)
    }

    fn mark_active(&self, line: &HtmlElement) -> Result<(), JsValue> {
        let mut active = self.active_line.borrow_mut();
        if let Some(previous) = active.take() {
            previous.class_list().remove_1(ACTIVE_LINE_CLASS)?;
        }
        line.class_list().add_1(ACTIVE_LINE_CLASS)?;
        *active = Some(line.clone());
        Ok(())
    }

    fn demote(&self, line: &HtmlElement) -> Result<(), JsValue> {
        line.class_list().remove_1(ACTIVE_LINE_CLASS)?;
        let mut active = self.active_line.borrow_mut();
        if active.as_ref().is_some_and(|current| current == line) {
            active.take();
        }
        Ok(())
    }

    fn scroll_to_bottom(&self) {
        let scroll_height = self.output.scroll_height();
        self.output.set_scroll_top(scroll_height);
    }

    fn build_comment_item(&self, comment: &Comment) -> Result<HtmlElement, JsValue> {
        let item = self
            .document
            .create_element("li")?
            .dyn_into::<HtmlElement>()?;
        item.set_class_name("comment");

        let author = self.create_span("comment-author")?;
        author.set_text_content(Some(&comment.author));

        let time = self.create_span("comment-time")?;
        time.set_text_content(Some(&format_timestamp(comment.timestamp)));

        let text = self
            .document
            .create_element("p")?
            .dyn_into::<HtmlElement>()?;
        text.set_class_name("comment-text");
        text.set_text_content(Some(&comment.text));

        item.append_child(&author)?;
        item.append_child(&time)?;
        item.append_child(&text)?;
        Ok(item)
    }

    fn build_auth_link(&self, label: &str, href: &str) -> Result<HtmlAnchorElement, JsValue> {
        let link = self
            .document
            .create_element("a")?
            .dyn_into::<HtmlAnchorElement>()?;
        link.set_class_name("comment-auth__link");
        link.set_href(href);
        link.set_text_content(Some(label));
        Ok(link)
    }
}

impl Screen for Renderer {
    type Line = LineHandle;
    type CommentItem = HtmlElement;

    fn set_visible(&self, visible: bool) -> Result<(), JsValue> {
        self.terminal_root
            .style()
            .set_property("visibility", if visible { "visible" } else { "hidden" })?;
        self.terminal_root
            .set_attribute("aria-hidden", if visible { "false" } else { "true" })?;
        if visible {
            self.scroll_to_bottom();
        }
        Ok(())
    }

    fn append_line(&self, content: Option<&str>) -> Result<LineHandle, JsValue> {
        let root = self
            .document
            .create_element("div")?
            .dyn_into::<HtmlElement>()?;
        root.set_class_name("line");

        let text = self.create_span("line-text")?;
        text.set_text_content(content);
        let cursor = self.create_span("cursor")?;
        cursor.set_text_content(Some(CURSOR_GLYPH));

        root.append_child(&text)?;
        root.append_child(&cursor)?;
        self.output.append_child(&root)?;
        self.mark_active(&root)?;
        self.scroll_to_bottom();

        Ok(LineHandle { root, text, cursor })
    }

    fn write_line(&self, line: &LineHandle, text: &str) -> Result<(), JsValue> {
        line.text.set_text_content(Some(text));
        self.scroll_to_bottom();
        Ok(())
    }

    fn finish_line(&self, line: &LineHandle) -> Result<(), JsValue> {
        line.cursor.class_list().add_1("cursor--hidden")?;
        Ok(())
    }

    fn append_prompt(&self, line: &LineHandle, label: &str, text: &str) -> Result<(), JsValue> {
        self.finish_line(line)?;

        let label_span = self.create_span("prompt-label")?;
        label_span.set_text_content(Some(label));

        let input = self
            .document
            .create_element("input")?
            .dyn_into::<HtmlInputElement>()?;
        input.set_class_name(PROMPT_INPUT_CLASS);
        input.set_type("text");
        input.set_value(text);
        input.set_attribute("autocomplete", "off")?;
        input.set_attribute("autocapitalize", "off")?;
        input.set_attribute("spellcheck", "false")?;
        input.set_attribute("aria-label", "Terminal command")?;

        line.root.append_child(&label_span)?;
        line.root.append_child(&input)?;
        self.scroll_to_bottom();
        self.focus_prompt(line);
        Ok(())
    }

    fn prompt_text(&self, line: &LineHandle) -> String {
        line.prompt_input()
            .map(|input| input.value())
            .unwrap_or_default()
    }

    fn set_prompt_text(&self, line: &LineHandle, text: &str) {
        if let Some(input) = line.prompt_input() {
            input.set_value(text);
            let end = text.encode_utf16().count() as u32;
            let _ = input.set_selection_range(end, end);
        }
    }

    fn focus_prompt(&self, line: &LineHandle) {
        if let Some(input) = line.prompt_input() {
            let _ = input.focus();
            let end = input.value().encode_utf16().count() as u32;
            let _ = input.set_selection_range(end, end);
        }
    }

    fn disable_prompt(&self, line: &LineHandle) -> Result<(), JsValue> {
        if let Some(input) = line.prompt_input() {
            input.set_read_only(true);
            input.set_attribute("aria-readonly", "true")?;
            input.set_tab_index(-1);
            let _ = input.blur();
        }
        self.demote(&line.root)
    }

    fn show_section(&self, hide: SectionId, reveal: SectionId) -> Result<(), JsValue> {
        get_html_element(&self.document, hide.dom_id())?
            .style()
            .set_property("display", "none")?;
        get_html_element(&self.document, reveal.dom_id())?
            .style()
            .remove_property("display")?;
        Ok(())
    }

    fn render_comments(&self, comments: &[Comment], auth: &AuthStatus) -> Result<(), JsValue> {
        clear_children(&self.comment_list)?;
        for comment in comments {
            let item = self.build_comment_item(comment)?;
            self.comment_list.append_child(&item)?;
        }

        clear_children(&self.comment_auth)?;
        let link = match (auth.logged_in, &auth.logout_url, &auth.login_url) {
            (true, Some(logout), _) => Some(self.build_auth_link("Log out", logout)?),
            (false, _, Some(login)) => Some(self.build_auth_link("Log in to comment", login)?),
            _ => None,
        };
        if let Some(link) = link {
            self.comment_auth.append_child(&link)?;
        }
        Ok(())
    }

    fn prepend_comment(&self, comment: &Comment) -> Result<HtmlElement, JsValue> {
        let item = self.build_comment_item(comment)?;
        item.class_list().add_1("comment--pending")?;
        let first: Option<Node> = self.comment_list.first_child();
        self.comment_list.insert_before(&item, first.as_ref())?;
        Ok(item)
    }

    fn remove_comment(&self, item: &HtmlElement) -> Result<(), JsValue> {
        if let Some(parent) = item.parent_node() {
            let node: Node = item.clone().into();
            parent.remove_child(&node)?;
        }
        Ok(())
    }

    fn pause(&self, millis: u32) -> LocalBoxFuture<'static, ()> {
        Box::pin(TimeoutFuture::new(millis))
    }
}

fn format_timestamp(timestamp: i64) -> String {
    let date = js_sys::Date::new(&JsValue::from_f64(timestamp as f64));
    String::from(date.to_locale_string("en-US", &JsValue::UNDEFINED))
}

fn get_html_element(document: &Document, id: &str) -> Result<HtmlElement, JsValue> {
    document
        .get_element_by_id(id)
        .ok_or_else(|| JsValue::from_str(&format!("Missing element #{id}")))
        .and_then(|el| {
            el.dyn_into::<HtmlElement>()
                .map_err(|_| JsValue::from_str(&format!("Element #{id} is not HtmlElement")))
        })
}

fn clear_children(element: &HtmlElement) -> Result<(), JsValue> {
    while let Some(child) = element.first_child() {
        element.remove_child(&child)?;
    }
    Ok(())
}
