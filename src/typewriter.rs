use crate::renderer::Screen;
use wasm_bindgen::JsValue;

const PAUSE_MARKER: char = '^';

/// A piece of terminal text: either characters to reveal or a pause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Pause(u32),
}

/// Splits `^<ms>` pause directives out of `text`. A marker without digits is
/// kept as a literal `^`.
pub fn parse(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut run = String::new();
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != PAUSE_MARKER || !chars.peek().is_some_and(char::is_ascii_digit) {
            run.push(ch);
            continue;
        }

        let mut millis: u32 = 0;
        while let Some(digit) = chars.peek().and_then(|next| next.to_digit(10)) {
            millis = millis.saturating_mul(10).saturating_add(digit);
            chars.next();
        }
        if !run.is_empty() {
            segments.push(Segment::Text(std::mem::take(&mut run)));
        }
        segments.push(Segment::Pause(millis));
    }

    if !run.is_empty() {
        segments.push(Segment::Text(run));
    }
    segments
}

/// Reveals `text` into `line` one character every `speed_ms`, honouring pause
/// directives, then hides the line's cursor.
pub async fn render<S: Screen>(
    screen: &S,
    line: &S::Line,
    text: &str,
    speed_ms: u32,
) -> Result<(), JsValue> {
    let mut shown = String::with_capacity(text.len());
    for segment in parse(text) {
        match segment {
            Segment::Text(run) if speed_ms == 0 => {
                shown.push_str(&run);
                screen.write_line(line, &shown)?;
            }
            Segment::Text(run) => {
                for ch in run.chars() {
                    shown.push(ch);
                    screen.write_line(line, &shown)?;
                    screen.pause(speed_ms).await;
                }
            }
            Segment::Pause(0) => {}
            Segment::Pause(millis) => screen.pause(millis).await,
        }
    }
    screen.finish_line(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn visible_text(segments: &[Segment]) -> String {
        segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Text(text) => Some(text.as_str()),
                Segment::Pause(_) => None,
            })
            .collect()
    }

    #[test]
    fn plain_text_is_one_run() {
        assert_eq!(parse("hello"), vec![Segment::Text("hello".to_string())]);
        assert!(parse("").is_empty());
    }

    #[test]
    fn pause_directives_split_runs() {
        assert_eq!(
            parse("Hi^500 there^20"),
            vec![
                Segment::Text("Hi".to_string()),
                Segment::Pause(500),
                Segment::Text(" there".to_string()),
                Segment::Pause(20),
            ]
        );
    }

    #[test]
    fn leading_and_adjacent_pauses() {
        assert_eq!(
            parse("^100^0go"),
            vec![
                Segment::Pause(100),
                Segment::Pause(0),
                Segment::Text("go".to_string()),
            ]
        );
    }

    #[test]
    fn caret_without_digits_is_literal() {
        assert_eq!(
            parse("2^x and ^"),
            vec![Segment::Text("2^x and ^".to_string())]
        );
    }

    #[test]
    fn visible_text_drops_pauses() {
        let segments = parse("Loading^300...^1000 done");
        assert_eq!(visible_text(&segments), "Loading... done");
    }

    #[test]
    fn huge_pause_saturates() {
        assert_eq!(
            parse("^99999999999"),
            vec![Segment::Pause(u32::MAX)]
        );
    }
}
