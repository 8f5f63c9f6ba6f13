use tracing::warn;

/// One structured data-anomaly warning. Every field is rendered as a single
/// whitespace-free token so lines stay greppable.
#[derive(Debug, Clone, Copy)]
pub struct WarnEvent<'a> {
    pub code: &'a str,
    pub stage: &'a str,
    pub item: &'a str,
    pub file: &'a str,
    pub reason: &'a str,
    pub err: &'a str,
}

impl<'a> WarnEvent<'a> {
    pub fn new(code: &'a str, stage: &'a str) -> Self {
        Self {
            code,
            stage,
            item: "",
            file: "",
            reason: "",
            err: "",
        }
    }

    pub fn item(mut self, item: &'a str) -> Self {
        self.item = item;
        self
    }

    pub fn file(mut self, file: &'a str) -> Self {
        self.file = file;
        self
    }

    pub fn reason(mut self, reason: &'a str) -> Self {
        self.reason = reason;
        self
    }

    pub fn err(mut self, err: &'a str) -> Self {
        self.err = err;
        self
    }
}

fn sanitize_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut prev_sep = false;
    for ch in value.chars() {
        if ch.is_whitespace() {
            if !out.is_empty() && !prev_sep {
                out.push('_');
                prev_sep = true;
            }
        } else if !ch.is_control() {
            out.push(ch);
            prev_sep = false;
        }
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        "na".to_string()
    } else {
        trimmed.to_string()
    }
}

pub fn render(event: &WarnEvent<'_>) -> String {
    format!(
        "MIGRATE_WARN code={} stage={} item={} file={} reason={} err={}",
        sanitize_value(event.code),
        sanitize_value(event.stage),
        sanitize_value(event.item),
        sanitize_value(event.file),
        sanitize_value(event.reason),
        sanitize_value(event.err),
    )
}

pub fn emit(event: WarnEvent<'_>) {
    warn!("{}", render(&event));
}
