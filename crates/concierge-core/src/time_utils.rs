/// Returns the current Unix timestamp in milliseconds.
pub fn current_unix_timestamp_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
        .try_into()
        .unwrap_or(u64::MAX)
}

/// Returns the current Unix timestamp in seconds.
pub fn current_unix_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Returns the current UTC time as an RFC 3339 string, the format embed timestamps use.
pub fn current_rfc3339_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Renders `unix_seconds` as platform timestamp markup shown in each reader's local time.
pub fn timestamp_markup(unix_seconds: u64) -> String {
    format!("<t:{unix_seconds}:F>")
}

/// Renders `unix_seconds` as markup shown relative to the reader's clock ("2 minutes ago").
pub fn relative_timestamp_markup(unix_seconds: u64) -> String {
    format!("<t:{unix_seconds}:R>")
}
