//! Built-in template functions.
//!
//! Names are case-insensitive and arity is fixed. Booleans render as
//! `true`/`false` and are parsed case-insensitively.

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use std::fmt::{self, Write as _};

use super::calc;
use super::eval::{Environment, Namespace};

/// Why a function call failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallError {
    /// Unknown function, wrong arity, or an argument of the wrong shape
    Invalid(String),
    /// An argument that had to be numeric was not
    Numeric(String),
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallError::Invalid(message) | CallError::Numeric(message) => write!(f, "{}", message),
        }
    }
}

type CallResult = Result<String, CallError>;

const BUILTINS: &[(&str, usize)] = &[
    ("If", 3),
    ("IfNot", 3),
    ("IfBlank", 3),
    ("IfNotBlank", 3),
    ("Equal", 2),
    ("NotEqual", 2),
    ("Index", 2),
    ("LastIndex", 2),
    ("Length", 1),
    ("Calc", 1),
    ("RegexMatch", 2),
    ("RegexReplace", 3),
    ("PadLeft", 3),
    ("PadRight", 3),
    ("Substring", 3),
    ("Trim", 1),
    ("TrimStart", 1),
    ("TrimEnd", 1),
    ("DateTime", 2),
    ("DateTimeNow", 1),
    ("Add", 2),
    ("Sub", 2),
    ("Mul", 2),
    ("Div", 2),
    ("Env", 1),
    ("Arg", 1),
    ("Match", 1),
    ("VersionSource", 1),
    ("Vs", 1),
    ("GitInfo", 1),
    ("Common", 1),
    ("Head", 1),
];

/// Invoke a built-in with already-rendered arguments.
pub fn call(name: &str, args: &[String], env: &Environment) -> CallResult {
    let Some(&(canonical, arity)) = BUILTINS
        .iter()
        .find(|(builtin, _)| builtin.eq_ignore_ascii_case(name))
    else {
        return Err(CallError::Invalid(format!(
            "'${}' is not a known function",
            name
        )));
    };

    if args.len() != arity {
        return Err(CallError::Invalid(format!(
            "The ${} function takes {} argument(s) but {} were given",
            canonical,
            arity,
            args.len()
        )));
    }

    let call = Call {
        name: canonical,
        args,
    };

    match canonical {
        "If" => Ok(call.pick(call.boolean(0)?)),
        "IfNot" => Ok(call.pick(!call.boolean(0)?)),
        "IfBlank" => Ok(call.pick(args[0].trim().is_empty())),
        "IfNotBlank" => Ok(call.pick(!args[0].trim().is_empty())),
        "Equal" => Ok((args[0] == args[1]).to_string()),
        "NotEqual" => Ok((args[0] != args[1]).to_string()),
        "Index" => Ok(char_index(&args[0], args[0].find(args[1].as_str())).to_string()),
        "LastIndex" => Ok(char_index(&args[0], args[0].rfind(args[1].as_str())).to_string()),
        "Length" => Ok(args[0].chars().count().to_string()),
        "Calc" => calc::evaluate(&args[0]).map_err(|e| {
            CallError::Numeric(format!(
                "The $Calc function could not evaluate '{}': {}",
                args[0], e
            ))
        }),
        "RegexMatch" => Ok(call.regex(1)?.is_match(&args[0]).to_string()),
        "RegexReplace" => Ok(call
            .regex(1)?
            .replace_all(&args[0], args[2].as_str())
            .into_owned()),
        "PadLeft" | "PadRight" => call.pad(canonical == "PadLeft"),
        "Substring" => call.substring(),
        "Trim" => Ok(args[0].trim().to_string()),
        "TrimStart" => Ok(args[0].trim_start().to_string()),
        "TrimEnd" => Ok(args[0].trim_end().to_string()),
        "DateTime" => {
            let date = parse_date(&args[0]).ok_or_else(|| {
                CallError::Invalid(format!(
                    "The $DateTime function's 1st argument '{}' is not a recognised date",
                    args[0]
                ))
            })?;
            format_date(&date, &args[1]).map_err(CallError::Invalid)
        }
        "DateTimeNow" => format_date(&Local::now(), &args[0]).map_err(CallError::Invalid),
        "Add" | "Sub" | "Mul" | "Div" => call.arithmetic(),
        _ => call.lookup(env),
    }
}

struct Call<'a> {
    name: &'static str,
    args: &'a [String],
}

impl Call<'_> {
    fn pick(&self, first: bool) -> String {
        if first {
            self.args[1].clone()
        } else {
            self.args[2].clone()
        }
    }

    fn boolean(&self, index: usize) -> Result<bool, CallError> {
        let value = self.args[index].trim();
        if value.eq_ignore_ascii_case("true") {
            Ok(true)
        } else if value.eq_ignore_ascii_case("false") {
            Ok(false)
        } else {
            Err(CallError::Invalid(format!(
                "The ${} function's {} argument must be convertible to a boolean, got '{}'",
                self.name,
                ordinal(index),
                self.args[index]
            )))
        }
    }

    fn int(&self, index: usize) -> Result<i64, CallError> {
        self.args[index].trim().parse().map_err(|_| {
            CallError::Numeric(format!(
                "The ${} function's {} argument must be convertible to an integer, got '{}'",
                self.name,
                ordinal(index),
                self.args[index]
            ))
        })
    }

    fn regex(&self, index: usize) -> Result<Regex, CallError> {
        Regex::new(&self.args[index]).map_err(|e| {
            CallError::Invalid(format!(
                "The ${} function's {} argument is not a valid pattern: {}",
                self.name,
                ordinal(index),
                e
            ))
        })
    }

    fn pad(&self, left: bool) -> CallResult {
        let width = self.int(1)?;
        let width = usize::try_from(width).map_err(|_| {
            CallError::Invalid(format!(
                "The ${} function's 2nd argument must not be negative, got {}",
                self.name, width
            ))
        })?;

        let mut fill = self.args[2].chars();
        let (Some(fill), None) = (fill.next(), fill.next()) else {
            return Err(CallError::Invalid(format!(
                "The ${} function's 3rd argument must be a single character, got '{}'",
                self.name, self.args[2]
            )));
        };

        let value = &self.args[0];
        let missing = width.saturating_sub(value.chars().count());
        let padding: String = std::iter::repeat(fill).take(missing).collect();
        Ok(if left {
            padding + value
        } else {
            value.clone() + &padding
        })
    }

    fn substring(&self) -> CallResult {
        let chars: Vec<char> = self.args[0].chars().collect();
        let start = self.int(1)?;
        let length = self.int(2)?;

        let start = usize::try_from(start)
            .ok()
            .filter(|start| *start <= chars.len())
            .ok_or_else(|| {
                CallError::Invalid(format!(
                    "The $Substring function's 2nd argument {} is outside '{}'",
                    start, self.args[0]
                ))
            })?;
        let length = usize::try_from(length).map_err(|_| {
            CallError::Invalid(format!(
                "The $Substring function's 3rd argument must not be negative, got {}",
                length
            ))
        })?;

        let end = start + length.min(chars.len() - start);
        Ok(chars[start..end].iter().collect())
    }

    fn arithmetic(&self) -> CallResult {
        let (lhs, rhs) = (self.int(0)?, self.int(1)?);
        let result = match self.name {
            "Add" => lhs.checked_add(rhs),
            "Sub" => lhs.checked_sub(rhs),
            "Mul" => lhs.checked_mul(rhs),
            _ if rhs == 0 => {
                return Err(CallError::Numeric(format!(
                    "The $Div function cannot divide {} by zero",
                    lhs
                )))
            }
            _ => lhs.checked_div(rhs),
        };

        result.map(|value| value.to_string()).ok_or_else(|| {
            CallError::Numeric(format!(
                "The ${} function overflowed on {} and {}",
                self.name, lhs, rhs
            ))
        })
    }

    fn lookup(&self, env: &Environment) -> CallResult {
        let namespace = Namespace::parse(self.name).ok_or_else(|| {
            CallError::Invalid(format!("'${}' is not a known function", self.name))
        })?;
        env.lookup_in(namespace, &self.args[0]).ok_or_else(|| {
            CallError::Invalid(format!(
                "The ${} function could not find '{}'",
                self.name, self.args[0]
            ))
        })
    }
}

fn ordinal(index: usize) -> &'static str {
    match index {
        0 => "1st",
        1 => "2nd",
        2 => "3rd",
        _ => "nth",
    }
}

/// Convert a byte offset from `str::find` into a character index, or -1.
fn char_index(haystack: &str, byte_offset: Option<usize>) -> i64 {
    match byte_offset {
        Some(offset) => haystack[..offset].chars().count() as i64,
        None => -1,
    }
}

/// Whether `format` is a usable strftime string.
pub fn is_valid_date_format(format: &str) -> bool {
    !StrftimeItems::new(format).any(|item| matches!(item, Item::Error))
}

/// Format a timestamp, reporting an invalid format instead of panicking.
pub fn format_date<Tz>(date: &DateTime<Tz>, format: &str) -> Result<String, String>
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    if !is_valid_date_format(format) {
        return Err(format!("'{}' is not a valid date format", format));
    }

    let mut rendered = String::new();
    write!(rendered, "{}", date.format(format))
        .map_err(|_| format!("'{}' cannot be applied to {}", format, date.to_rfc3339()))?;
    Ok(rendered)
}

/// Parse the date shapes `$DateTime` accepts. Values without an offset are UTC.
pub fn parse_date(input: &str) -> Option<DateTime<FixedOffset>> {
    let input = input.trim();
    if let Ok(date) = DateTime::parse_from_rfc3339(input) {
        return Some(date);
    }

    let naive = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(input, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(input, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })?;
    Some(Utc.from_utc_datetime(&naive).into())
}
