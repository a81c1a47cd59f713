mod bytes_value;
mod challenge;
mod cookie;
mod error;
mod header;

pub use bytes_value::BytesValue;
pub use challenge::{
    extract_auth_challenges, parse_challenge_header, AuthChallenge, ParsedChallenge,
};
pub use cookie::{
    parse_cookie_header, serialize_cookie_header, serialize_set_cookie_header, CookieHeader,
    SameSite, SetCookieHeader,
};
pub use error::HeaderCodecError;
pub use header::{
    deserialize_header, deserialize_headers, is_immutable_response_header,
    is_valid_header_value, is_valid_http_token, parse_status_code, serialize_headers, Header,
    IMMUTABLE_RESPONSE_HEADERS,
};
