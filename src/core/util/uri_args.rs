//! Request URL with an ordered, duplicate-tolerant argument list.

use std::fmt;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};

/// Argument carrying an opaque, base64 encoded copy of a full argument set.
pub const RTP_ARG: &str = "rtp_";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UriArgs {
    uri: String,
    args: Vec<(String, String)>,
}

impl UriArgs {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            args: Vec::new(),
        }
    }

    /// Parses `path?k=v&k2=v2`. Undecodable pairs are kept verbatim.
    pub fn parse(url: &str) -> Self {
        match url.split_once('?') {
            Some((path, query)) => Self::from_parts(path, Some(query)),
            None => Self::from_parts(url, None),
        }
    }

    pub fn from_parts(path: &str, query: Option<&str>) -> Self {
        let mut out = Self::new(path);
        if let Some(query) = query {
            for pair in query.split('&').filter(|p| !p.is_empty()) {
                let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
                out.args.push((decode_component(k), decode_component(v)));
            }
        }
        out
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn set_uri(&mut self, uri: impl Into<String>) -> &mut Self {
        self.uri = uri.into();
        self
    }

    pub fn args(&self) -> &[(String, String)] {
        &self.args
    }

    /// First value stored under any of `keys`.
    pub fn arg_value(&self, keys: &[&str]) -> Option<&str> {
        self.args
            .iter()
            .find(|(k, _)| keys.contains(&k.as_str()))
            .map(|(_, v)| v.as_str())
    }

    pub fn has_arg(&self, keys: &[&str]) -> bool {
        self.arg_value(keys).is_some()
    }

    pub fn add_arg(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.args.push((key.into(), value.into()));
        self
    }

    pub fn remove_arg(&mut self, keys: &[&str]) -> &mut Self {
        self.args.retain(|(k, _)| !keys.contains(&k.as_str()));
        self
    }

    /// Replaces the first occurrence in place and drops the rest; appends under `keys[0]` when absent.
    pub fn set_arg_value(&mut self, keys: &[&str], value: impl Into<String>) -> &mut Self {
        let value = value.into();
        match self.args.iter().position(|(k, _)| keys.contains(&k.as_str())) {
            Some(pos) => {
                self.args[pos].1 = value;
                let mut idx = 0;
                self.args.retain(|(k, _)| {
                    let keep = idx <= pos || !keys.contains(&k.as_str());
                    idx += 1;
                    keep
                });
            }
            None => {
                if let Some(key) = keys.first() {
                    self.args.push((key.to_string(), value));
                }
            }
        }
        self
    }

    pub fn remove_blank_values(&mut self) -> &mut Self {
        self.args.retain(|(_, v)| !v.trim().is_empty());
        self
    }

    /// Appends `ext` to the path unless it already ends with it.
    pub fn add_extension(&mut self, ext: &str) -> &mut Self {
        if !self.uri.ends_with(ext) {
            self.uri.push_str(ext);
        }
        self
    }

    pub fn query_string(&self) -> String {
        self.args
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Encodes every argument into a single opaque value (see [`RTP_ARG`]).
    pub fn encode_rtp(&self) -> String {
        let text = self
            .args
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join(" ");
        URL_SAFE_NO_PAD.encode(text.as_bytes())
    }

    pub fn decode_rtp(value: &str) -> Option<Vec<(String, String)>> {
        let bytes = URL_SAFE_NO_PAD.decode(value.trim()).ok()?;
        let text = String::from_utf8(bytes).ok()?;
        Some(
            text.split(' ')
                .filter(|p| !p.is_empty())
                .map(|pair| {
                    let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
                    (decode_component(k), decode_component(v))
                })
                .collect(),
        )
    }

    /// Replaces an `rtp_` argument by the arguments it carries. Explicit arguments win.
    pub fn expand_rtp(&mut self) -> bool {
        let Some(encoded) = self.arg_value(&[RTP_ARG]).map(str::to_string) else {
            return false;
        };
        self.remove_arg(&[RTP_ARG]);
        let Some(decoded) = Self::decode_rtp(&encoded) else {
            return false;
        };
        for (k, v) in decoded {
            if !self.has_arg(&[k.as_str()]) {
                self.args.push((k, v));
            }
        }
        true
    }
}

impl fmt::Display for UriArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.args.is_empty() {
            write!(f, "{}", self.uri)
        } else {
            write!(f, "{}?{}", self.uri, self.query_string())
        }
    }
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|v| v.into_owned())
        .unwrap_or(spaced)
}
