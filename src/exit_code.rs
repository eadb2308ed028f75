use crate::error::XhrError;

pub fn exit_code_for_error(err: &XhrError) -> i32 {
    match err {
        XhrError::InvalidUrl(_) => 3,
        XhrError::Config(_) => 2,
        XhrError::Encode(_) | XhrError::Json(_) => 26,
        XhrError::Auth(_) => 94,
        XhrError::Hook(_) => 4,
        XhrError::Io(_) => 23,
        XhrError::Http(err) => http_exit_code(err),
        XhrError::Transport(response) => transport_exit_code(response.error.as_deref()),
        XhrError::Status { .. } => 22,
    }
}

fn http_exit_code(err: &reqwest::Error) -> i32 {
    if err.is_timeout() {
        return 28;
    }
    if err.is_connect() {
        return 7;
    }
    if err.is_builder() {
        return 2;
    }
    43
}

fn transport_exit_code(detail: Option<&str>) -> i32 {
    let lower = detail.unwrap_or_default().to_ascii_lowercase();
    if lower.contains("timed out") || lower.contains("timeout") {
        return 28;
    }
    if lower.contains("connect") {
        return 7;
    }
    56
}
