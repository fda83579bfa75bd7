//! Browser error instrumentation spliced into compiled pages.

pub const DEFAULT_ENDPOINT: &str = "http://localhost:3002/log-browser-error";

const BODY_CLOSE: &str = "</body>";

const SCRIPT_TEMPLATE: &str = r#"
<script>
// Error logging for Blueprint
const ERROR_LOG_ENDPOINT = '%ENDPOINT%';
const PAGE_NAME = '%PAGE%';
const originalFetchForReports = window.fetch.bind(window);

function reportToBlueprint(type, message, source, line, column, stack) {
  originalFetchForReports(ERROR_LOG_ENDPOINT, {
    method: 'POST',
    headers: { 'Content-Type': 'application/json' },
    body: JSON.stringify({
      timestamp: new Date().toISOString(),
      page: PAGE_NAME,
      type: type,
      message: message,
      source: source,
      line: line,
      column: column,
      stack: stack,
      url: window.location.href,
      userAgent: navigator.userAgent
    })
  }).catch(() => {});
}

window.onerror = function(message, source, line, column, error) {
  reportToBlueprint('error', message, source, line, column, error?.stack || null);
  return false;
};

window.addEventListener('unhandledrejection', function(event) {
  reportToBlueprint('error', 'Unhandled Promise: ' + event.reason, 'promise', null, null, event.reason?.stack || null);
});

const originalConsole = {
  log: console.log,
  warn: console.warn,
  error: console.error
};

console.log = function(...args) {
  reportToBlueprint('log', args.join(' '), 'console', null, null, null);
  originalConsole.log.apply(console, args);
};

console.warn = function(...args) {
  reportToBlueprint('warning', args.join(' '), 'console', null, null, null);
  originalConsole.warn.apply(console, args);
};

console.error = function(...args) {
  reportToBlueprint('error', args.join(' '), 'console', null, null, null);
  originalConsole.error.apply(console, args);
};

const originalFetch = window.fetch;
window.fetch = function(...args) {
  return originalFetch.apply(this, args)
    .catch(error => {
      reportToBlueprint('network', 'Fetch failed: ' + error.message, args[0], null, null, error.stack);
      throw error;
    });
};
</script>"#;

/// The instrumentation script for `<page>.html`, posting to `endpoint`.
///
/// The reporter keeps its own reference to the original `fetch`, so the
/// network hook never reports its own requests.
pub fn error_logging_script(page: &str, endpoint: &str) -> String {
    SCRIPT_TEMPLATE
        .replace("%ENDPOINT%", &js_string(endpoint))
        .replace("%PAGE%", &js_string(&format!("{page}.html")))
}

/// Insert `script` right before the first `</body>`. Returns `None` when the
/// document has no closing body tag.
pub fn splice_before_body_close(html: &str, script: &str) -> Option<String> {
    let at = html.find(BODY_CLOSE)?;
    let mut out = String::with_capacity(html.len() + script.len());
    out.push_str(&html[..at]);
    out.push_str(script);
    out.push_str(&html[at..]);
    Some(out)
}

/// Escape for a single-quoted JS string literal.
fn js_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '<' => out.push_str("\\x3C"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_names_page_and_endpoint() {
        let script = error_logging_script("demo", DEFAULT_ENDPOINT);
        assert!(script.contains("const PAGE_NAME = 'demo.html';"));
        assert!(script.contains(
            "const ERROR_LOG_ENDPOINT = 'http://localhost:3002/log-browser-error';"
        ));
        assert!(script.contains("window.onerror"));
        assert!(script.contains("unhandledrejection"));
        assert!(script.contains("console.warn = function"));
        assert!(script.contains("window.fetch = function"));
        assert!(script.trim_start().starts_with("<script>"));
        assert!(script.ends_with("</script>"));
    }

    #[test]
    fn test_reports_bypass_wrapped_fetch() {
        let script = error_logging_script("demo", DEFAULT_ENDPOINT);
        assert!(script.contains("originalFetchForReports(ERROR_LOG_ENDPOINT"));
        assert!(!script.contains("  fetch(ERROR_LOG_ENDPOINT"));
    }

    #[test]
    fn test_page_name_is_escaped() {
        let script = error_logging_script("it's", DEFAULT_ENDPOINT);
        assert!(script.contains(r"const PAGE_NAME = 'it\'s.html';"));
    }

    #[test]
    fn test_splice_first_body_close() {
        let html = "<body><p>x</p></body><!-- </body> -->";
        let out = splice_before_body_close(html, "<script></script>").unwrap();
        assert_eq!(out, "<body><p>x</p><script></script></body><!-- </body> -->");
    }

    #[test]
    fn test_splice_without_body() {
        assert!(splice_before_body_close("<div></div>", "<script></script>").is_none());
    }
}
