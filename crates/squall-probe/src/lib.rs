/// The in-page probe JavaScript.
/// This string is injected into the page by the driver and answers
/// `window.Squall.process(request)` calls.
pub const PROBE_JS: &str = include_str!("probe.js");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[allow(clippy::const_is_empty)]
    fn probe_source_embeds() {
        assert!(!PROBE_JS.is_empty());
        assert!(PROBE_JS.contains("Squall"));
        assert!(PROBE_JS.contains("process"));
    }

    #[test]
    fn probe_handles_every_protocol_action() {
        for action in [
            "scan", "click", "focus", "type", "select", "remove", "click_text",
            "style_override", "purge", "close_sweep", "get_text",
        ] {
            assert!(
                PROBE_JS.contains(&format!("{action}:")) || PROBE_JS.contains(&format!("'{action}'")),
                "probe.js is missing a handler for {action}"
            );
        }
    }
}
