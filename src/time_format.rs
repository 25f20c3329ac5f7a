use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};

use crate::error::{GpxError, Result};
use crate::options::RenderOptions;

/// Formats timestamps with the configured pattern and output timezone.
#[derive(Debug, Clone)]
pub struct TimeFormatter<'a> {
    items: Vec<Item<'a>>,
    offset: FixedOffset,
}

impl<'a> TimeFormatter<'a> {
    /// Validates the pattern and offset up front so formatting itself cannot fail.
    pub fn new(opts: &'a RenderOptions) -> Result<Self> {
        let items: Vec<Item<'a>> = StrftimeItems::new(&opts.datetime_format).collect();
        if items.iter().any(|item| matches!(item, Item::Error)) {
            return Err(GpxError::InvalidTimeFormat(opts.datetime_format.clone()));
        }
        let offset = opts
            .utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or(GpxError::InvalidUtcOffset(opts.utc_offset_minutes))?;
        Ok(Self { items, offset })
    }

    pub fn format(&self, time: &DateTime<Utc>) -> String {
        time.with_timezone(&self.offset)
            .format_with_items(self.items.iter())
            .to_string()
    }

    pub fn format_opt(&self, time: Option<&DateTime<Utc>>) -> Option<String> {
        time.map(|t| self.format(t))
    }
}

/// `xsd:dateTime` rendering used inside GPX documents.
pub fn to_xsd_datetime(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Parse a GPX timestamp. Values without a zone designator are taken as UTC.
pub fn parse_gpx_time(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(text) {
        return Some(t.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
