// src/template/helpers.rs
//! The helper function library injected into every template.
//!
//! All helpers are pure and stateless except `image`/`resource`, which read
//! from the immutable [`Environment`] snapshot captured at registration
//! time. Precondition failures (bad dates, mismatched comparison operands,
//! inverted periods) raise render errors that the renderer surfaces as
//! malformed-input failures; they are never swallowed.

use crate::environment::Environment;
use crate::template::value::{display, is_truthy, stringify};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use handlebars::{
    html_escape, Context, Handlebars, Helper, HelperDef, HelperResult, Output, RenderContext,
    RenderError, RenderErrorReason, Renderable,
};
use serde_json::Value;
use std::sync::Arc;

const MONTHS_NB: [&str; 12] = [
    "januar", "februar", "mars", "april", "mai", "juni", "juli", "august", "september",
    "oktober", "november", "desember",
];

/// Registers every helper on the given registry. The environment snapshot
/// is captured by the `image` and `resource` helpers.
pub fn register(handlebars: &mut Handlebars<'static>, env: Arc<Environment>) {
    handlebars.register_helper("iso_to_nor_date", Box::new(iso_to_nor_date_helper));
    handlebars.register_helper("iso_to_nor_datetime", Box::new(iso_to_nor_datetime_helper));
    handlebars.register_helper("iso_to_date", Box::new(iso_to_date_helper));
    handlebars.register_helper("iso_to_long_date", Box::new(iso_to_long_date_helper));
    handlebars.register_helper("duration", Box::new(duration_helper));
    handlebars.register_helper("json_to_period", Box::new(json_to_period_helper));
    handlebars.register_helper("insert_at", Box::new(insert_at_helper));
    handlebars.register_helper("eq", Box::new(BlockHelper { truth: eq_truth }));
    handlebars.register_helper("not_eq", Box::new(BlockHelper { truth: not_eq_truth }));
    handlebars.register_helper("gt", Box::new(BlockHelper { truth: gt_truth }));
    handlebars.register_helper("lt", Box::new(BlockHelper { truth: lt_truth }));
    handlebars.register_helper("safe", Box::new(safe_helper));
    handlebars.register_helper("capitalize", Box::new(capitalize_helper));
    handlebars.register_helper("capitalize_names", Box::new(capitalize_names_helper));
    handlebars.register_helper("uppercase", Box::new(uppercase_helper));
    handlebars.register_helper("inc", Box::new(inc_helper));
    handlebars.register_helper("formatComma", Box::new(format_comma_helper));
    handlebars.register_helper("any", Box::new(BlockHelper { truth: any_truth }));
    handlebars.register_helper("contains_field", Box::new(BlockHelper { truth: contains_field_truth }));
    handlebars.register_helper("contains_all", Box::new(BlockHelper { truth: contains_all_truth }));
    handlebars.register_helper("currency_no", Box::new(currency_no_helper));
    handlebars.register_helper("int_as_currency_no", Box::new(int_as_currency_no_helper));
    handlebars.register_helper("string_as_currency_no", Box::new(string_as_currency_no_helper));
    handlebars.register_helper("is_defined", Box::new(BlockHelper { truth: is_defined_truth }));
    handlebars.register_helper("breaklines", Box::new(breaklines_helper));
    handlebars.register_helper("image", Box::new(ImageHelper { env: Arc::clone(&env) }));
    handlebars.register_helper("resource", Box::new(ResourceHelper { env }));
}

fn helper_error(name: &str, message: impl std::fmt::Display) -> RenderError {
    RenderErrorReason::Other(format!("{}: {}", name, message)).into()
}

/// Param that is present and not null, or `None`.
fn param<'a>(h: &'a Helper, idx: usize) -> Option<&'a Value> {
    h.param(idx)
        .filter(|p| !p.is_value_missing())
        .map(|p| p.value())
        .filter(|v| !v.is_null())
}

fn required_str<'a>(h: &'a Helper, idx: usize, name: &str) -> Result<&'a str, RenderError> {
    param(h, idx)
        .and_then(|v| v.as_str())
        .ok_or_else(|| helper_error(name, format!("missing string argument #{}", idx)))
}

/// Conditional helper: evaluates a predicate over the params, then renders
/// the then/else branch in block position or a bool literal inline.
struct BlockHelper {
    truth: fn(&Helper) -> Result<bool, RenderError>,
}

impl HelperDef for BlockHelper {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        r: &'reg Handlebars<'reg>,
        ctx: &'rc Context,
        rc: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        let truth = (self.truth)(h)?;
        if h.is_block() {
            let branch = if truth { h.template() } else { h.inverse() };
            match branch {
                Some(t) => t.render(r, ctx, rc, out),
                None => Ok(()),
            }
        } else {
            out.write(if truth { "true" } else { "false" })?;
            Ok(())
        }
    }
}

// --- date and period helpers ---

fn parse_offset_datetime(name: &str, input: &str) -> Result<NaiveDateTime, RenderError> {
    DateTime::parse_from_rfc3339(input)
        .map(|dt| dt.naive_local())
        .map_err(|e| helper_error(name, format!("invalid date-time '{}': {}", input, e)))
}

/// Offset date-time with a fallback to a plain (offset-less) date-time.
fn parse_any_datetime(name: &str, input: &str) -> Result<NaiveDateTime, RenderError> {
    DateTime::parse_from_rfc3339(input)
        .map(|dt| dt.naive_local())
        .or_else(|_| NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S%.f"))
        .map_err(|e| helper_error(name, format!("invalid date-time '{}': {}", input, e)))
}

fn parse_date(name: &str, input: &str) -> Result<NaiveDate, RenderError> {
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .map_err(|e| helper_error(name, format!("invalid date '{}': {}", input, e)))
}

fn iso_to_nor_date_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    // Null/absent renders empty rather than failing.
    let input = match param(h, 0).and_then(|v| v.as_str()) {
        Some(s) => s,
        None => return Ok(()),
    };
    let dt = parse_offset_datetime("iso_to_nor_date", input)?;
    out.write(&dt.format("%d.%m.%Y").to_string())?;
    Ok(())
}

fn iso_to_nor_datetime_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let input = required_str(h, 0, "iso_to_nor_datetime")?;
    let dt = parse_any_datetime("iso_to_nor_datetime", input)?;
    out.write(&dt.format("%d.%m.%Y %H:%M").to_string())?;
    Ok(())
}

fn iso_to_date_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let input = required_str(h, 0, "iso_to_date")?;
    let date = parse_date("iso_to_date", input)?;
    out.write(&date.format("%d.%m.%Y").to_string())?;
    Ok(())
}

fn iso_to_long_date_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let input = required_str(h, 0, "iso_to_long_date")?;
    let date = parse_any_datetime("iso_to_long_date", input)
        .map(|dt| dt.date())
        .or_else(|_| parse_date("iso_to_long_date", input))?;
    out.write(&format_long_date(date))?;
    Ok(())
}

fn format_long_date(date: NaiveDate) -> String {
    format!(
        "{}. {} {}",
        date.day(),
        MONTHS_NB[date.month0() as usize],
        date.year()
    )
}

fn duration_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let from = parse_date("duration", required_str(h, 0, "duration")?)?;
    let to = parse_date("duration", required_str(h, 1, "duration")?)?;
    out.write(&(to - from).num_days().to_string())?;
    Ok(())
}

fn json_to_period_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let value = param(h, 0).ok_or_else(|| helper_error("json_to_period", "missing period"))?;
    let period: Value = match value {
        Value::String(s) => serde_json::from_str(s)
            .map_err(|e| helper_error("json_to_period", format!("invalid period JSON: {}", e)))?,
        v @ Value::Object(_) => v.clone(),
        _ => return Err(helper_error("json_to_period", "period must be an object")),
    };

    let fom = period
        .get("fom")
        .and_then(|v| v.as_str())
        .ok_or_else(|| helper_error("json_to_period", "missing field 'fom'"))?;
    let tom = period
        .get("tom")
        .and_then(|v| v.as_str())
        .ok_or_else(|| helper_error("json_to_period", "missing field 'tom'"))?;
    let fom = parse_date("json_to_period", fom)?;
    let tom = parse_date("json_to_period", tom)?;
    if fom > tom {
        return Err(helper_error(
            "json_to_period",
            format!("invalid period: {} is after {}", fom, tom),
        ));
    }
    out.write(&format!(
        "{} - {}",
        fom.format("%d.%m.%Y"),
        tom.format("%d.%m.%Y")
    ))?;
    Ok(())
}

// --- string shaping helpers ---

fn insert_at_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let input = required_str(h, 0, "insert_at")?;
    let divider = h
        .hash_get("divider")
        .and_then(|p| p.value().as_str())
        .unwrap_or(" ");
    let divider_chars: Vec<char> = divider.chars().collect();

    let mut chars: Vec<char> = input.chars().collect();
    // Positions refer to the original string; each insertion shifts the
    // ones that follow.
    let mut shift = 0usize;
    for idx in 1..h.params().len() {
        let position = param(h, idx)
            .and_then(|v| v.as_i64())
            .ok_or_else(|| helper_error("insert_at", "positions must be integers"))?;
        if position < 0 {
            continue;
        }
        let at = position as usize + shift;
        if at <= chars.len() {
            chars.splice(at..at, divider_chars.iter().cloned());
            shift += divider_chars.len();
        }
    }
    out.write(&chars.into_iter().collect::<String>())?;
    Ok(())
}

fn safe_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    if let Some(v) = param(h, 0) {
        out.write(&display(v))?;
    }
    Ok(())
}

fn capitalize_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let input = param(h, 0).map(display).unwrap_or_default();
    out.write(&capitalize(&input))?;
    Ok(())
}

fn capitalize(input: &str) -> String {
    let lower = input.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn capitalize_names_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let input = param(h, 0).map(display).unwrap_or_default();
    out.write(&capitalize_names(&input))?;
    Ok(())
}

fn capitalize_names(input: &str) -> String {
    let collapsed = input.split_whitespace().collect::<Vec<_>>().join(" ");
    let lower = collapsed.to_lowercase();
    let mut out = String::with_capacity(lower.len());
    let mut capitalize_next = true;
    for c in lower.chars() {
        if capitalize_next {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        // Word-like segments restart after space, hyphen and apostrophe.
        capitalize_next = matches!(c, ' ' | '-' | '\'');
    }
    out
}

fn uppercase_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let input = param(h, 0).map(display).unwrap_or_default();
    out.write(&input.to_uppercase())?;
    Ok(())
}

fn inc_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let n = param(h, 0)
        .and_then(|v| match v {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
        .ok_or_else(|| helper_error("inc", "missing integer argument"))?;
    out.write(&(n + 1).to_string())?;
    Ok(())
}

fn format_comma_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let input = param(h, 0).map(display).unwrap_or_default();
    out.write(&input.replace('.', ","))?;
    Ok(())
}

fn breaklines_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let input = param(h, 0).map(display).unwrap_or_default();
    let escaped = html_escape(&input);
    // Literal two-character escape sequences first, then real line breaks.
    let replaced = escaped
        .replace("\\r\\n", "<br/>")
        .replace("\\n", "<br/>")
        .replace("\r\n", "<br/>")
        .replace('\n', "<br/>");
    out.write(&replaced)?;
    Ok(())
}

// --- comparison and conditional block helpers ---

fn loose_eq(h: &Helper) -> bool {
    let a = param(h, 0).and_then(stringify);
    let b = param(h, 1).and_then(stringify);
    match (a, b) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn eq_truth(h: &Helper) -> Result<bool, RenderError> {
    Ok(loose_eq(h))
}

fn not_eq_truth(h: &Helper) -> Result<bool, RenderError> {
    Ok(!loose_eq(h))
}

fn compare(h: &Helper, name: &str) -> Result<std::cmp::Ordering, RenderError> {
    let a = param(h, 0).ok_or_else(|| helper_error(name, "missing left operand"))?;
    let b = param(h, 1).ok_or_else(|| helper_error(name, "missing right operand"))?;
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => {
            let (a, b) = (a.as_f64().unwrap_or(f64::NAN), b.as_f64().unwrap_or(f64::NAN));
            a.partial_cmp(&b)
                .ok_or_else(|| helper_error(name, "operands are not comparable numbers"))
        }
        (Value::String(a), Value::String(b)) => Ok(a.cmp(b)),
        _ => Err(helper_error(name, "operands must both be numbers or both be strings")),
    }
}

fn gt_truth(h: &Helper) -> Result<bool, RenderError> {
    Ok(compare(h, "gt")? == std::cmp::Ordering::Greater)
}

fn lt_truth(h: &Helper) -> Result<bool, RenderError> {
    Ok(compare(h, "lt")? == std::cmp::Ordering::Less)
}

fn any_truth(h: &Helper) -> Result<bool, RenderError> {
    Ok((0..h.params().len()).any(|i| param(h, i).map(is_truthy).unwrap_or(false)))
}

fn is_defined_truth(h: &Helper) -> Result<bool, RenderError> {
    // Explicit false/0 count as defined; a missing path does not.
    Ok(param(h, 0).is_some())
}

fn contains_field_truth(h: &Helper) -> Result<bool, RenderError> {
    let field = required_str(h, 1, "contains_field")?;
    Ok(param(h, 0)
        .and_then(|v| v.as_array())
        .map(|list| {
            list.iter()
                .any(|el| el.get(field).map(is_truthy).unwrap_or(false))
        })
        .unwrap_or(false))
}

fn contains_all_truth(h: &Helper) -> Result<bool, RenderError> {
    let list: Vec<String> = param(h, 0)
        .and_then(|v| v.as_array())
        .map(|a| a.iter().map(display).collect())
        .unwrap_or_default();
    let wanted: Vec<String> = (1..h.params().len())
        .filter_map(|i| param(h, i).and_then(stringify))
        .collect();
    // Exhaustive but order-independent; vacuous matches are rejected.
    Ok(!list.is_empty() && !wanted.is_empty() && wanted.iter().all(|w| list.contains(w)))
}

// --- currency helpers ---

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push('\u{a0}');
        }
        out.push(c);
    }
    out
}

fn format_currency(value: f64, without_decimals: bool) -> String {
    let formatted = format!("{:.2}", value.abs());
    let (whole, frac) = formatted.split_once('.').unwrap_or((formatted.as_str(), "00"));
    let mut out = String::new();
    if value < 0.0 {
        out.push('-');
    }
    out.push_str(&group_thousands(whole));
    if !without_decimals {
        out.push(',');
        out.push_str(frac);
    }
    out
}

fn format_minor_units(minor: i64) -> String {
    let whole = (minor / 100).abs();
    let frac = (minor % 100).abs();
    let mut out = String::new();
    if minor < 0 {
        out.push('-');
    }
    out.push_str(&group_thousands(&whole.to_string()));
    out.push(',');
    out.push_str(&format!("{:02}", frac));
    out
}

fn currency_no_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let value = param(h, 0).ok_or_else(|| helper_error("currency_no", "missing value"))?;
    let number = match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| helper_error("currency_no", "value is not a finite number"))?,
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| helper_error("currency_no", format!("invalid number '{}': {}", s, e)))?,
        _ => return Err(helper_error("currency_no", "value must be numeric")),
    };
    let without_decimals = param(h, 1).map(is_truthy).unwrap_or(false);
    out.write(&format_currency(number, without_decimals))?;
    Ok(())
}

fn int_as_currency_no_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let minor = param(h, 0)
        .and_then(|v| match v {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
        .ok_or_else(|| helper_error("int_as_currency_no", "missing integer value"))?;
    out.write(&format_minor_units(minor))?;
    Ok(())
}

fn string_as_currency_no_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let input = required_str(h, 0, "string_as_currency_no")?;
    let digits: String = input.chars().filter(|c| c.is_ascii_digit()).collect();
    let minor = digits
        .parse::<i64>()
        .map_err(|e| helper_error("string_as_currency_no", format!("no amount in '{}': {}", input, e)))?;
    out.write(&format_minor_units(minor))?;
    Ok(())
}

// --- environment lookups ---

struct ImageHelper {
    env: Arc<Environment>,
}

impl HelperDef for ImageHelper {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        if let Some(name) = param(h, 0).and_then(|v| v.as_str()) {
            if let Some(uri) = self.env.images.get(name) {
                out.write(uri)?;
            }
        }
        Ok(())
    }
}

struct ResourceHelper {
    env: Arc<Environment>,
}

impl HelperDef for ResourceHelper {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        if let Some(name) = param(h, 0).and_then(|v| v.as_str()) {
            if let Some(bytes) = self.env.resources.get(name) {
                out.write(&String::from_utf8_lossy(bytes))?;
            }
        }
        Ok(())
    }
}
