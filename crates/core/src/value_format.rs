//! Unit formatters.
//!
//! A unit id resolves to a `UnitFormat`, a sealed set of formatter kinds:
//! plain fixed-point, grouped locale digits, scaled ladders (short/bytes),
//! SI prefixes, currency, graduated durations, boolean words and date/time
//! patterns. Resolution never fails; unknown ids fall back to plain
//! numeric formatting.

use chrono::TimeZone as _;
use chrono_tz::Tz;

use vizfield_types::value::format_number_text;

/// Number of fixed decimal places; `None` selects automatically.
pub type DecimalCount = Option<u32>;

/// Output of a formatter: the number text plus optional unit decoration.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FormattedValue {
    pub text: String,
    pub prefix: Option<String>,
    pub suffix: Option<String>,
}

impl FormattedValue {
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            prefix: None,
            suffix: None,
        }
    }

    /// Concatenate prefix, text and suffix.
    pub fn render(&self) -> String {
        format!(
            "{}{}{}",
            self.prefix.as_deref().unwrap_or(""),
            self.text,
            self.suffix.as_deref().unwrap_or("")
        )
    }
}

/// Time zone used when rendering date units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DisplayTimeZone {
    /// The environment's local zone
    #[default]
    Local,
    Utc,
    Tz(Tz),
}

impl DisplayTimeZone {
    /// Parse a zone spec: empty or "browser" selects the local zone, "utc"
    /// selects UTC, anything else is looked up as an IANA zone name.
    pub fn parse(spec: &str) -> Self {
        if spec.is_empty() || spec == "browser" {
            return DisplayTimeZone::Local;
        }
        if spec.eq_ignore_ascii_case("utc") {
            return DisplayTimeZone::Utc;
        }
        match spec.parse::<Tz>() {
            Ok(tz) => DisplayTimeZone::Tz(tz),
            Err(_) => {
                log::warn!("unknown time zone {:?}, falling back to local", spec);
                DisplayTimeZone::Local
            }
        }
    }
}

/// Date rendering styles.
#[derive(Debug, Clone, PartialEq)]
pub enum DateFormat {
    /// `YYYY-MM-DD HH:mm:ss`
    Iso,
    /// `MM/DD/YYYY h:mm:ss am`
    Us,
    /// The system default pattern (same shape as Iso)
    System,
    /// Relative text ("5 minutes ago")
    FromNow,
    /// A translated `time:<pattern>` chrono format string
    Pattern(String),
}

const SHORT_SUFFIXES: &[&str] = &[
    "", " K", " Mil", " Bil", " Tri", " Quadr", " Quint", " Sext", " Sept",
];
const BYTES_IEC_SUFFIXES: &[&str] = &[
    " B", " KiB", " MiB", " GiB", " TiB", " PiB", " EiB", " ZiB", " YiB",
];
const BYTES_SI_SUFFIXES: &[&str] = &[
    " B", " kB", " MB", " GB", " TB", " PB", " EB", " ZB", " YB",
];
const CURRENCY_SUFFIXES: &[&str] = &["", "K", "M", "B", "T"];

const SI_PREFIXES: &[&str] = &[
    "f", "p", "n", "µ", "m", "", "k", "M", "G", "T", "P", "E", "Z", "Y",
];
const SI_BASE_INDEX: usize = 5;

/// A resolved unit formatter.
#[derive(Debug, Clone, PartialEq)]
pub enum UnitFormat {
    /// Fixed-point number, no decoration (also the unknown-unit fallback)
    Plain,
    /// Grouped thousands ("1,234,567")
    Locale,
    /// 0-100 value with a `%` suffix
    Percent,
    /// 0.0-1.0 ratio scaled to percent
    PercentUnit,
    /// Magnitude ladder: divide by `factor` per step
    Scaled {
        factor: f64,
        suffixes: &'static [&'static str],
    },
    /// SI prefix scaling in both directions around a unit symbol
    SiPrefix { symbol: &'static str },
    /// Currency symbol prefix with short-scale suffixes
    Currency { symbol: &'static str },
    /// Milliseconds promoted to s/min/hour/day as magnitude grows
    DurationMs,
    /// Seconds promoted to min/hour/day/week as magnitude grows
    DurationSeconds,
    /// Word pair for zero/nonzero
    Bool {
        truthy: &'static str,
        falsy: &'static str,
    },
    Date(DateFormat),
}

impl UnitFormat {
    /// Resolve a unit id. Unknown ids fall back to plain formatting.
    pub fn resolve(id: &str) -> UnitFormat {
        match id {
            "" | "none" | "string" => UnitFormat::Plain,
            "short" => UnitFormat::Scaled {
                factor: 1000.0,
                suffixes: SHORT_SUFFIXES,
            },
            "bytes" => UnitFormat::Scaled {
                factor: 1024.0,
                suffixes: BYTES_IEC_SUFFIXES,
            },
            "decbytes" => UnitFormat::Scaled {
                factor: 1000.0,
                suffixes: BYTES_SI_SUFFIXES,
            },
            "locale" => UnitFormat::Locale,
            "percent" => UnitFormat::Percent,
            "percentunit" => UnitFormat::PercentUnit,
            "watt" => UnitFormat::SiPrefix { symbol: "W" },
            "hertz" => UnitFormat::SiPrefix { symbol: "Hz" },
            "volt" => UnitFormat::SiPrefix { symbol: "V" },
            "amp" => UnitFormat::SiPrefix { symbol: "A" },
            "currencyUSD" => UnitFormat::Currency { symbol: "$" },
            "ms" => UnitFormat::DurationMs,
            "s" => UnitFormat::DurationSeconds,
            "bool" => UnitFormat::Bool {
                truthy: "True",
                falsy: "False",
            },
            "bool_yes_no" => UnitFormat::Bool {
                truthy: "Yes",
                falsy: "No",
            },
            "bool_on_off" => UnitFormat::Bool {
                truthy: "On",
                falsy: "Off",
            },
            "dateTimeAsIso" | "dateTimeAsIsoNoDateIfToday" => UnitFormat::Date(DateFormat::Iso),
            "dateTimeAsUS" | "dateTimeAsUSNoDateIfToday" => UnitFormat::Date(DateFormat::Us),
            "dateTimeAsLocal" | "dateTimeAsLocalNoDateIfToday" | "dateTimeAsSystem" => {
                UnitFormat::Date(DateFormat::System)
            }
            "dateTimeFromNow" => UnitFormat::Date(DateFormat::FromNow),
            _ => {
                if let Some(pattern) = id.strip_prefix("time:") {
                    UnitFormat::Date(DateFormat::Pattern(moment_to_chrono(pattern)))
                } else {
                    log::debug!("unknown unit id {:?}, using plain formatting", id);
                    UnitFormat::Plain
                }
            }
        }
    }

    /// Format a numeric value. `tz`/`show_ms` only affect date units.
    pub fn format(
        &self,
        value: f64,
        decimals: DecimalCount,
        tz: DisplayTimeZone,
        show_ms: bool,
    ) -> FormattedValue {
        match self {
            UnitFormat::Plain => FormattedValue::text_only(to_fixed(value, decimals)),
            UnitFormat::Locale => format_locale(value, decimals),
            UnitFormat::Percent => FormattedValue {
                text: to_fixed(value, decimals),
                prefix: None,
                suffix: Some("%".to_string()),
            },
            UnitFormat::PercentUnit => FormattedValue {
                text: to_fixed(value * 100.0, decimals),
                prefix: None,
                suffix: Some("%".to_string()),
            },
            UnitFormat::Scaled { factor, suffixes } => {
                format_scaled(value, *factor, suffixes, decimals)
            }
            UnitFormat::SiPrefix { symbol } => format_si(value, symbol, decimals),
            UnitFormat::Currency { symbol } => {
                let mut formatted = format_scaled(value, 1000.0, CURRENCY_SUFFIXES, decimals);
                formatted.prefix = Some((*symbol).to_string());
                formatted
            }
            UnitFormat::DurationMs => format_duration_ms(value, decimals),
            UnitFormat::DurationSeconds => format_duration_seconds(value, decimals),
            UnitFormat::Bool { truthy, falsy } => {
                FormattedValue::text_only(if value != 0.0 { *truthy } else { *falsy })
            }
            UnitFormat::Date(format) => format_date(format, value, tz, show_ms),
        }
    }
}

/// True for unit ids rendered from epoch milliseconds.
pub fn is_date_unit(id: &str) -> bool {
    matches!(
        id,
        "dateTimeAsIso"
            | "dateTimeAsIsoNoDateIfToday"
            | "dateTimeAsUS"
            | "dateTimeAsUSNoDateIfToday"
            | "dateTimeAsLocal"
            | "dateTimeAsLocalNoDateIfToday"
            | "dateTimeAsSystem"
            | "dateTimeFromNow"
    ) || id.starts_with("time:")
}

/// True for unit ids that format through the boolean word pairs.
pub fn is_boolean_unit(id: &str) -> bool {
    id.starts_with("bool")
}

/// Fixed-point rendering with the pipeline's rounding rules: round half
/// up, strip insignificant zeros on auto decimals, pad explicit decimals.
pub fn to_fixed(value: f64, decimals: DecimalCount) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return non_finite_text(value);
    }

    let decimals = decimals.unwrap_or_else(|| get_decimals_for_value(value));
    let factor = if decimals > 0 {
        10f64.powi(decimals as i32)
    } else {
        1.0
    };
    let formatted = format_number_text(round_half_up(value * factor) / factor);
    if formatted.contains('e') || value == 0.0 {
        return formatted;
    }

    let precision = match formatted.find('.') {
        Some(pos) => formatted.len() - pos - 1,
        None => 0,
    };
    if precision < decimals as usize {
        let mut padded = formatted;
        if precision == 0 {
            padded.push('.');
        }
        for _ in 0..(decimals as usize - precision) {
            padded.push('0');
        }
        return padded;
    }
    formatted
}

/// Pick the smallest decimal count that keeps a value distinguishable
/// from its rounded neighbors: one digit per magnitude below 10, an extra
/// digit once the normalized value passes 2.25, none for integers.
pub fn get_decimals_for_value(value: f64) -> u32 {
    if value == 0.0 || !value.is_finite() || value % 1.0 == 0.0 {
        return 0;
    }
    let abs = value.abs();
    let log10 = abs.log10().floor();
    let mut dec = -(log10 as i64) + 1;
    let magn = 10f64.powi(-(dec as i32));
    let norm = abs / magn;
    if norm > 2.25 {
        dec += 1;
    }
    dec.max(0) as u32
}

fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

fn non_finite_text(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value > 0.0 {
        "∞".to_string()
    } else {
        "-∞".to_string()
    }
}

fn format_scaled(
    value: f64,
    factor: f64,
    suffixes: &'static [&'static str],
    decimals: DecimalCount,
) -> FormattedValue {
    if !value.is_finite() {
        return FormattedValue::text_only(non_finite_text(value));
    }
    let mut size = value;
    let mut steps = 0usize;
    while size.abs() >= factor {
        steps += 1;
        size /= factor;
        if steps >= suffixes.len() {
            return FormattedValue::text_only("NA");
        }
    }
    let suffix = suffixes[steps];
    FormattedValue {
        text: to_fixed(size, decimals),
        prefix: None,
        suffix: if suffix.is_empty() {
            None
        } else {
            Some(suffix.to_string())
        },
    }
}

fn format_si(value: f64, symbol: &str, decimals: DecimalCount) -> FormattedValue {
    if !value.is_finite() {
        return FormattedValue::text_only(non_finite_text(value));
    }
    let mut size = value;
    let mut index = SI_BASE_INDEX;
    if size != 0.0 {
        while size.abs() >= 1000.0 && index < SI_PREFIXES.len() - 1 {
            size /= 1000.0;
            index += 1;
        }
        while size.abs() < 1.0 && index > 0 {
            size *= 1000.0;
            index -= 1;
        }
    }
    FormattedValue {
        text: to_fixed(size, decimals),
        prefix: None,
        suffix: Some(format!(" {}{}", SI_PREFIXES[index], symbol)),
    }
}

fn format_locale(value: f64, decimals: DecimalCount) -> FormattedValue {
    if !value.is_finite() {
        return FormattedValue::text_only(non_finite_text(value));
    }
    let decimals = decimals.unwrap_or_else(|| get_decimals_for_value(value).min(3));
    FormattedValue::text_only(group_thousands(&to_fixed(value, Some(decimals))))
}

fn group_thousands(fixed: &str) -> String {
    let (sign, rest) = match fixed.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", fixed),
    };
    let (int_part, frac_part) = match rest.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (rest, None),
    };
    let mut grouped = String::new();
    let digits: Vec<char> = int_part.chars().collect();
    for (i, c) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(*c);
    }
    match frac_part {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}

fn format_duration_ms(value: f64, decimals: DecimalCount) -> FormattedValue {
    if !value.is_finite() {
        return FormattedValue::text_only(non_finite_text(value));
    }
    let abs = value.abs();
    let (scaled, suffix) = if abs < 1_000.0 {
        (value, " ms")
    } else if abs < 60_000.0 {
        (value / 1_000.0, " s")
    } else if abs < 3_600_000.0 {
        (value / 60_000.0, " min")
    } else if abs < 86_400_000.0 {
        (value / 3_600_000.0, " hour")
    } else if abs < 31_536_000_000.0 {
        (value / 86_400_000.0, " day")
    } else {
        (value / 31_536_000_000.0, " year")
    };
    FormattedValue {
        text: to_fixed(scaled, decimals),
        prefix: None,
        suffix: Some(suffix.to_string()),
    }
}

fn format_duration_seconds(value: f64, decimals: DecimalCount) -> FormattedValue {
    if !value.is_finite() {
        return FormattedValue::text_only(non_finite_text(value));
    }
    let abs = value.abs();
    let (scaled, suffix) = if abs < 60.0 {
        (value, " s")
    } else if abs < 3_600.0 {
        (value / 60.0, " min")
    } else if abs < 86_400.0 {
        (value / 3_600.0, " hour")
    } else if abs < 604_800.0 {
        (value / 86_400.0, " day")
    } else if abs < 31_536_000.0 {
        (value / 604_800.0, " week")
    } else {
        (value / 31_536_000.0, " year")
    };
    FormattedValue {
        text: to_fixed(scaled, decimals),
        prefix: None,
        suffix: Some(suffix.to_string()),
    }
}

fn format_date(
    format: &DateFormat,
    epoch_ms: f64,
    tz: DisplayTimeZone,
    show_ms: bool,
) -> FormattedValue {
    if !epoch_ms.is_finite() {
        return FormattedValue::text_only(non_finite_text(epoch_ms));
    }
    let text = match format {
        DateFormat::Iso | DateFormat::System => {
            let pattern = if show_ms {
                "%Y-%m-%d %H:%M:%S%.3f"
            } else {
                "%Y-%m-%d %H:%M:%S"
            };
            format_epoch_ms(epoch_ms, pattern, tz)
        }
        DateFormat::Us => {
            let pattern = if show_ms {
                "%m/%d/%Y %-I:%M:%S%.3f %P"
            } else {
                "%m/%d/%Y %-I:%M:%S %P"
            };
            format_epoch_ms(epoch_ms, pattern, tz)
        }
        DateFormat::FromNow => format_from_now(epoch_ms),
        DateFormat::Pattern(pattern) => format_epoch_ms(epoch_ms, pattern, tz),
    };
    FormattedValue::text_only(text)
}

fn format_epoch_ms(epoch_ms: f64, pattern: &str, tz: DisplayTimeZone) -> String {
    let utc = match chrono::Utc.timestamp_millis_opt(epoch_ms as i64).single() {
        Some(dt) => dt,
        None => return format_number_text(epoch_ms),
    };
    match tz {
        DisplayTimeZone::Utc => utc.format(pattern).to_string(),
        DisplayTimeZone::Local => utc.with_timezone(&chrono::Local).format(pattern).to_string(),
        DisplayTimeZone::Tz(zone) => utc.with_timezone(&zone).format(pattern).to_string(),
    }
}

fn format_from_now(epoch_ms: f64) -> String {
    let now_ms = chrono::Utc::now().timestamp_millis() as f64;
    let diff_ms = now_ms - epoch_ms;
    let future = diff_ms < 0.0;
    let secs = diff_ms.abs() / 1000.0;

    let phrase = if secs < 45.0 {
        "a few seconds".to_string()
    } else if secs < 90.0 {
        "a minute".to_string()
    } else if secs < 45.0 * 60.0 {
        format!("{} minutes", (secs / 60.0).round() as i64)
    } else if secs < 90.0 * 60.0 {
        "an hour".to_string()
    } else if secs < 22.0 * 3_600.0 {
        format!("{} hours", (secs / 3_600.0).round() as i64)
    } else if secs < 36.0 * 3_600.0 {
        "a day".to_string()
    } else if secs < 26.0 * 86_400.0 {
        format!("{} days", (secs / 86_400.0).round() as i64)
    } else if secs < 46.0 * 86_400.0 {
        "a month".to_string()
    } else if secs < 320.0 * 86_400.0 {
        format!("{} months", (secs / (30.44 * 86_400.0)).round() as i64)
    } else if secs < 548.0 * 86_400.0 {
        "a year".to_string()
    } else {
        format!("{} years", (secs / (365.25 * 86_400.0)).round() as i64)
    };

    if future {
        format!("in {phrase}")
    } else {
        format!("{phrase} ago")
    }
}

/// Parse a textual timestamp (RFC 3339 or the common dashboard shapes)
/// to epoch milliseconds. Naive timestamps are read as UTC.
pub fn parse_date_text(text: &str) -> Option<f64> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(text) {
        return Some(dt.timestamp_millis() as f64);
    }
    for pattern in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(text, pattern) {
            return Some(chrono::Utc.from_utc_datetime(&naive).timestamp_millis() as f64);
        }
    }
    if let Ok(date) = chrono::NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        let naive = date.and_hms_opt(0, 0, 0)?;
        return Some(chrono::Utc.from_utc_datetime(&naive).timestamp_millis() as f64);
    }
    None
}

/// Translate a moment.js-style pattern (`YYYY-MM-DD HH:mm:ss`) to a
/// chrono format string. Unknown characters pass through as literals.
fn moment_to_chrono(pattern: &str) -> String {
    const TOKENS: &[(&str, &str)] = &[
        ("YYYY", "%Y"),
        ("YY", "%y"),
        ("MMMM", "%B"),
        ("MMM", "%b"),
        ("MM", "%m"),
        ("M", "%-m"),
        ("dddd", "%A"),
        ("ddd", "%a"),
        ("DD", "%d"),
        ("D", "%-d"),
        ("HH", "%H"),
        ("H", "%-H"),
        ("hh", "%I"),
        ("h", "%-I"),
        ("mm", "%M"),
        ("m", "%-M"),
        ("ss", "%S"),
        ("s", "%-S"),
        ("SSS", "%3f"),
        ("A", "%p"),
        ("a", "%P"),
        ("ZZ", "%z"),
        ("Z", "%:z"),
    ];

    let mut out = String::with_capacity(pattern.len() + 8);
    let mut rest = pattern;
    'outer: while !rest.is_empty() {
        for (token, replacement) in TOKENS {
            if let Some(tail) = rest.strip_prefix(token) {
                out.push_str(replacement);
                rest = tail;
                continue 'outer;
            }
        }
        let ch = rest.chars().next().unwrap();
        if ch == '%' {
            out.push_str("%%");
        } else {
            out.push(ch);
        }
        rest = &rest[ch.len_utf8()..];
    }
    out
}
