pub fn parse_bool_flag(value: String) -> Option<bool> {
    parse_bool_str(value.as_str())
}

pub fn parse_bool_str(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn is_local_endpoint_url(url: &str) -> bool {
    let normalized = url.trim().to_ascii_lowercase();
    let Some((_, rest)) = normalized.split_once("://") else {
        return false;
    };
    rest.starts_with("localhost") || rest.starts_with("127.0.0.1") || rest.starts_with("0.0.0.0")
}

/// Maps an `http(s)://` server URL onto the matching `ws(s)://` stream endpoint.
pub fn stream_url_for_server(server_url: &str, path: &str) -> String {
    let base = server_url.trim().trim_end_matches('/');
    let base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base.to_string()
    };
    format!("{base}{path}")
}

/// First line of `text`, cut to `max_chars` with an ellipsis.
pub fn preview(text: &str, max_chars: usize) -> String {
    let first_line = text.lines().next().unwrap_or_default().trim();
    if first_line.chars().count() <= max_chars {
        if text.trim().lines().nth(1).is_some() {
            return format!("{first_line}…");
        }
        return first_line.to_string();
    }
    let cut: String = first_line.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{cut}…")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_helpers() {
        assert_eq!(parse_bool_str("true"), Some(true));
        assert_eq!(parse_bool_str("0"), Some(false));
        assert_eq!(parse_bool_flag("YES".to_string()), Some(true));
        assert_eq!(parse_bool_flag("off".to_string()), Some(false));
        assert_eq!(parse_bool_str("maybe"), None);
    }

    #[test]
    fn test_is_local_endpoint_url_covers_ws_schemes() {
        assert!(is_local_endpoint_url(" HTTP://LOCALHOST:8000 "));
        assert!(is_local_endpoint_url("ws://127.0.0.1:8000/api/rlm/stream"));
        assert!(!is_local_endpoint_url("wss://rlm.example.com/api/rlm/stream"));
        assert!(!is_local_endpoint_url("localhost:8000"));
    }

    #[test]
    fn test_stream_url_for_server_swaps_scheme() {
        assert_eq!(
            stream_url_for_server("http://localhost:8000/", "/api/rlm/stream"),
            "ws://localhost:8000/api/rlm/stream"
        );
        assert_eq!(
            stream_url_for_server("https://rlm.example.com", "/api/rlm/stream"),
            "wss://rlm.example.com/api/rlm/stream"
        );
    }

    #[test]
    fn test_preview_marks_truncation() {
        assert_eq!(preview("short", 10), "short");
        assert_eq!(preview("line one\nline two", 20), "line one…");
        assert_eq!(preview("abcdefghij", 5), "abcd…");
        assert_eq!(preview("", 5), "");
    }
}
