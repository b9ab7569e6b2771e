use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Current UTC time formatted as RFC 3339, the format used for object timestamps.
pub fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}
