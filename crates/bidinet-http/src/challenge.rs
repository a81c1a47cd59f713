use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthChallenge {
    pub scheme: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub realm: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedChallenge {
    pub scheme: String,
    pub params: Vec<(String, String)>,
}

impl ParsedChallenge {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(param, _)| param.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Returns the challenges of a 401/407 response, `None` for any other status.
pub fn extract_auth_challenges(
    status: u16,
    headers: &[(String, String)],
) -> Option<Vec<AuthChallenge>> {
    let header_name = match status {
        401 => "www-authenticate",
        407 => "proxy-authenticate",
        _ => return None,
    };

    let challenges = headers
        .iter()
        .filter(|(name, _)| name.eq_ignore_ascii_case(header_name))
        .flat_map(|(_, value)| parse_challenge_header(value))
        .map(|challenge| AuthChallenge {
            realm: challenge.param("realm").map(str::to_string),
            scheme: challenge.scheme,
        })
        .collect();
    Some(challenges)
}

/// Parses one `WWW-Authenticate`-style header value, which may carry several
/// comma separated challenges.
pub fn parse_challenge_header(value: &str) -> Vec<ParsedChallenge> {
    let mut challenges: Vec<ParsedChallenge> = Vec::new();

    for part in split_unquoted(value, ',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        let first_space = part.find([' ', '\t']);
        let first_equals = part.find('=');
        let starts_challenge = match (first_space, first_equals) {
            (Some(space), Some(equals)) => space < equals,
            (_, None) => true,
            (None, Some(_)) => false,
        };

        if starts_challenge {
            let (scheme, rest) = match first_space {
                Some(space) => (&part[..space], part[space..].trim()),
                None => (part, ""),
            };
            let mut challenge = ParsedChallenge {
                scheme: scheme.to_string(),
                params: Vec::new(),
            };
            if let Some(param) = parse_param(rest) {
                challenge.params.push(param);
            }
            challenges.push(challenge);
        } else if let (Some(current), Some(param)) = (challenges.last_mut(), parse_param(part)) {
            current.params.push(param);
        }
    }

    challenges
}

fn parse_param(raw: &str) -> Option<(String, String)> {
    let (name, value) = raw.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), unquote(value.trim())))
}

fn unquote(value: &str) -> String {
    let Some(inner) = value
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    else {
        return value.to_string();
    };

    let mut unquoted = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(escaped) = chars.next() {
                unquoted.push(escaped);
            }
        } else {
            unquoted.push(ch);
        }
    }
    unquoted
}

fn split_unquoted(value: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut escaped = false;
    let mut start = 0usize;

    for (index, ch) in value.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ch if ch == separator && !in_quotes => {
                parts.push(&value[start..index]);
                start = index + ch.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&value[start..]);
    parts
}
