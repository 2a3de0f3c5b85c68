use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Current UTC time in RFC 3339 form, the format of every timestamp column
/// and of the sync cursor file.
pub fn now_utc_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .expect("RFC 3339 formatting of the current time cannot fail")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_parses_back_as_rfc3339() {
        let stamp = now_utc_rfc3339();
        let parsed = OffsetDateTime::parse(&stamp, &Rfc3339).unwrap();
        assert_eq!(parsed.offset(), time::UtcOffset::UTC);
    }
}
