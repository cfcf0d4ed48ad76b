//! DingTalk `markdown` message payload.

use serde::Serialize;

/// An immutable Markdown alert: a title plus a body assembled from ordered
/// fragments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownMessage {
    title: String,
    text: String,
}

#[derive(Serialize)]
struct Payload<'a> {
    msgtype: &'static str,
    markdown: MarkdownBody<'a>,
}

#[derive(Serialize)]
struct MarkdownBody<'a> {
    title: &'a str,
    text: &'a str,
}

impl MarkdownMessage {
    /// Build a message whose body is the fragments joined with no separator.
    pub fn new<I, S>(title: impl Into<String>, fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let text = fragments
            .into_iter()
            .fold(String::new(), |mut acc, fragment| {
                acc.push_str(fragment.as_ref());
                acc
            });
        Self {
            title: title.into(),
            text,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// `{"msgtype":"markdown","markdown":{"title":..,"text":..}}`
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&Payload {
            msgtype: "markdown",
            markdown: MarkdownBody {
                title: &self.title,
                text: &self.text,
            },
        })
    }
}
