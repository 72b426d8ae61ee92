//! Cookie parsing and rendering.
//!
//! Handles the request `cookie` line (`a=1; b=2`) and individual
//! `set-cookie` lines with their attributes. Entries with an invalid name or
//! value are dropped rather than reported.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// `SameSite` cookie attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown SameSite mode: {0}")]
pub struct UnknownSameSite(pub String);

impl FromStr for SameSite {
    type Err = UnknownSameSite;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(SameSite::Strict),
            "lax" => Ok(SameSite::Lax),
            "none" => Ok(SameSite::None),
            _ => Err(UnknownSameSite(s.to_string())),
        }
    }
}

/// A cookie as found in a `cookie` or `set-cookie` header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub path: Option<String>,
    pub domain: Option<String>,
    /// Raw `Expires` date, kept verbatim.
    pub expires: Option<String>,
    pub max_age: Option<i64>,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: Option<SameSite>,
    pub partitioned: bool,
    /// Attributes this parser does not know, re-emitted as-is.
    pub unparsed: Vec<String>,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            ..Default::default()
        }
    }

    /// Render as a request `cookie` pair (`name=value`).
    pub fn pair(&self) -> String {
        format!("{}={}", self.name, quote_value(&self.value))
    }
}

/// Renders the `set-cookie` form.
impl fmt::Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.pair())?;
        if let Some(path) = &self.path {
            write!(f, "; Path={path}")?;
        }
        if let Some(domain) = &self.domain {
            write!(f, "; Domain={}", domain.trim_start_matches('.'))?;
        }
        if let Some(expires) = &self.expires {
            write!(f, "; Expires={expires}")?;
        }
        if let Some(max_age) = self.max_age {
            // Non-positive means "delete now".
            write!(f, "; Max-Age={}", max_age.max(0))?;
        }
        if self.http_only {
            f.write_str("; HttpOnly")?;
        }
        if self.secure {
            f.write_str("; Secure")?;
        }
        if let Some(same_site) = self.same_site {
            write!(f, "; SameSite={same_site}")?;
        }
        if self.partitioned {
            f.write_str("; Partitioned")?;
        }
        for attr in &self.unparsed {
            write!(f, "; {attr}")?;
        }
        Ok(())
    }
}

/// Parse a request `cookie` header line into its cookies.
pub fn parse_cookie_line(line: &str) -> Vec<Cookie> {
    line.split(';')
        .filter_map(|part| {
            let part = part.trim();
            if part.is_empty() {
                return None;
            }
            let (name, value) = part.split_once('=').unwrap_or((part, ""));
            parse_pair(name, value)
        })
        .collect()
}

/// Parse one `set-cookie` header line.
///
/// Returns `None` when the leading `name=value` pair is missing or invalid.
pub fn parse_set_cookie(line: &str) -> Option<Cookie> {
    let mut parts = line.split(';');
    let (name, value) = parts.next()?.trim().split_once('=')?;
    let mut cookie = parse_pair(name, value)?;

    for attr in parts {
        let attr = attr.trim();
        if attr.is_empty() {
            continue;
        }
        let (key, val) = match attr.split_once('=') {
            Some((k, v)) => (k.trim(), v.trim()),
            None => (attr, ""),
        };
        match key.to_ascii_lowercase().as_str() {
            "path" => cookie.path = Some(val.to_string()),
            "domain" => cookie.domain = Some(val.to_string()),
            "expires" => cookie.expires = Some(val.to_string()),
            "max-age" => {
                if let Ok(secs) = val.parse::<i64>() {
                    cookie.max_age = Some(secs);
                }
            }
            "secure" => cookie.secure = true,
            "httponly" => cookie.http_only = true,
            "samesite" => cookie.same_site = val.parse().ok(),
            "partitioned" => cookie.partitioned = true,
            _ => cookie.unparsed.push(attr.to_string()),
        }
    }
    Some(cookie)
}

/// Parse every `cookie` line of a request.
pub fn parse_cookies<'a>(lines: impl IntoIterator<Item = &'a String>) -> Vec<Cookie> {
    lines
        .into_iter()
        .flat_map(|line| parse_cookie_line(line))
        .collect()
}

/// Parse every `set-cookie` line of a response, one cookie per line.
pub fn parse_set_cookies<'a>(lines: impl IntoIterator<Item = &'a String>) -> Vec<Cookie> {
    lines
        .into_iter()
        .filter_map(|line| parse_set_cookie(line))
        .collect()
}

fn parse_pair(name: &str, value: &str) -> Option<Cookie> {
    let name = name.trim();
    if name.is_empty() || !name.bytes().all(is_token_byte) {
        return None;
    }
    let value = value.trim();
    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value);
    if !value.bytes().all(is_cookie_value_byte) {
        return None;
    }
    Some(Cookie::new(name, value))
}

fn quote_value(value: &str) -> String {
    if value.contains([' ', ',']) {
        format!("\"{value}\"")
    } else {
        value.to_string()
    }
}

fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

// cookie-octet, plus space and comma which are accepted and quoted on output.
fn is_cookie_value_byte(b: u8) -> bool {
    (0x20..0x7f).contains(&b) && b != b'"' && b != b';' && b != b'\\'
}
