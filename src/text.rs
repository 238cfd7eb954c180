//! Fitting event titles into a fixed pixel width.

/// Marker appended to a shortened title.
pub const ELLIPSIS: &str = ".";

/// Shorten `text` until it measures less than `max_width` pixels.
///
/// Characters are dropped from the end one at a time and a single
/// [`ELLIPSIS`] marker is appended; the marker counts towards the measured
/// width. Text that already fits is returned unchanged. When not even the
/// bare marker fits (e.g. `max_width == 0`) the result degenerates to `"."`.
///
/// `measure` is the font metric: the rendered width of a string in pixels.
///
/// # Example
///
/// ```
/// use oepl_dashboard::text::shorten;
///
/// // 6 px per character
/// let measure = |s: &str| s.chars().count() as u32 * 6;
///
/// assert_eq!(shorten("Standup", 60, measure), "Standup");
/// assert_eq!(shorten("Quarterly planning", 60, measure), "Quarterl.");
/// ```
pub fn shorten<F>(text: &str, max_width: u32, measure: F) -> String
where
    F: Fn(&str) -> u32,
{
    if measure(text) < max_width {
        return text.to_string();
    }

    let mut cut = text.len();
    loop {
        let Some((idx, _)) = text[..cut].char_indices().next_back() else {
            return ELLIPSIS.to_string();
        };
        cut = idx;

        let candidate = format!("{}{}", &text[..cut], ELLIPSIS);
        if measure(&candidate) < max_width || cut == 0 {
            return candidate;
        }
    }
}
