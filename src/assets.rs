//! Snippets queued once at startup and spliced into every rendered page.

const FONT_AWESOME_LINK: &str = r#"<link href="https://maxcdn.bootstrapcdn.com/font-awesome/4.6.3/css/font-awesome.min.css" rel="stylesheet" integrity="sha384-T8Gy5hrqNKT+hzMclPo118YTQO6cYprQmhrYwIiQ/3axmI1hQomh7Ud2hPOy8SP1" crossorigin="anonymous">"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// After the last stylesheet link in `<head>`.
    AfterHeadCss,
    BeforeHeadClose,
    EndOfBody,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snippet {
    pub location: Location,
    pub html: String,
}

pub fn font_awesome() -> Snippet {
    Snippet {
        location: Location::AfterHeadCss,
        html: FONT_AWESOME_LINK.to_string(),
    }
}

pub fn inject(html: &str, snippets: &[Snippet]) -> String {
    let mut out = html.to_string();
    for snippet in snippets {
        let at = match snippet.location {
            Location::AfterHeadCss => after_head_css(&out),
            Location::BeforeHeadClose => find_ignore_case(&out, "</head>"),
            Location::EndOfBody => find_ignore_case(&out, "</body>").or(Some(out.len())),
        }
        .unwrap_or(0);

        let mut piece = snippet.html.clone();
        piece.push('\n');
        out.insert_str(at, &piece);
    }
    out
}

fn after_head_css(html: &str) -> Option<usize> {
    let head_end = find_ignore_case(html, "</head>")?;
    let head = &html[..head_end].to_ascii_lowercase();

    let mut last = None;
    let mut from = 0;
    while let Some(pos) = head[from..].find("<link") {
        let start = from + pos;
        let Some(close) = head[start..].find('>') else {
            break;
        };
        let end = start + close + 1;
        if head[start..end].contains("stylesheet") {
            last = Some(end);
        }
        from = end;
    }

    match last {
        // Keep the snippet on its own line after the link.
        Some(end) if html[end..].starts_with('\n') => Some(end + 1),
        Some(end) => Some(end),
        None => Some(head_end),
    }
}

fn find_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    haystack.to_ascii_lowercase().find(needle)
}
