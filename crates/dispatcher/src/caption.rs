//! Post layout

use contracts::LinkButton;

/// Caption text of a post
pub fn format_caption(caption_name: &str, prompt_text: &str, link: &str) -> String {
    format!("{caption_name}\n\n{prompt_text}\n{link}")
}

/// Inline button opening the link
///
/// Buttons need an absolute URL, so bare `www.` links get an `https://` scheme.
pub fn link_button(label: &str, link: &str) -> LinkButton {
    let url = if link.starts_with("www.") {
        format!("https://{link}")
    } else {
        link.to_string()
    };
    LinkButton {
        label: label.to_string(),
        url,
    }
}
