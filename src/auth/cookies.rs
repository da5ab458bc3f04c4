use axum::http::{header, HeaderMap, HeaderValue};

/// Value of the first cookie called `name` across all `Cookie` headers.
/// Empty values count as absent.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
        .filter(|value| !value.is_empty())
}

/// First non-empty cookie among `names`, honoring their order.
pub fn first_cookie<S: AsRef<str>>(headers: &HeaderMap, names: &[S]) -> Option<String> {
    names
        .iter()
        .find_map(|name| cookie_value(headers, name.as_ref()))
}

/// All inbound `Cookie` headers joined into one header value.
pub fn raw_cookie_header(headers: &HeaderMap) -> Option<HeaderValue> {
    let parts: Vec<&str> = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .collect();

    match parts.len() {
        0 => None,
        1 => HeaderValue::from_str(parts[0]).ok(),
        _ => HeaderValue::from_str(&parts.join("; ")).ok(),
    }
}

/// `Set-Cookie` value for a cookie readable only by the server.
pub fn session_cookie(name: &str, value: &str, max_age_secs: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
        name,
        value,
        max_age_secs.max(0)
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that removes `name` from the browser.
pub fn expired_cookie(name: &str, secure: bool) -> String {
    session_cookie(name, "", 0, secure)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(cookies: &[&str]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for c in cookies {
            map.append(header::COOKIE, HeaderValue::from_str(c).unwrap());
        }
        map
    }

    #[test]
    fn finds_cookie_among_many() {
        let h = headers(&["theme=dark; vbs_session=abc.def.ghi; lang=tr"]);
        assert_eq!(cookie_value(&h, "vbs_session").as_deref(), Some("abc.def.ghi"));
        assert_eq!(cookie_value(&h, "missing"), None);
    }

    #[test]
    fn searches_every_cookie_header() {
        let h = headers(&["theme=dark", "authToken=legacy"]);
        assert_eq!(cookie_value(&h, "authToken").as_deref(), Some("legacy"));
    }

    #[test]
    fn empty_cookie_is_absent() {
        let h = headers(&["vbs_session=; authToken=legacy"]);
        assert_eq!(cookie_value(&h, "vbs_session"), None);
        assert_eq!(
            first_cookie(&h, &["vbs_session", "authToken"]).as_deref(),
            Some("legacy")
        );
    }

    #[test]
    fn first_cookie_respects_priority() {
        let h = headers(&["authToken=legacy; vbs_session=primary"]);
        assert_eq!(
            first_cookie(&h, &["vbs_session", "authToken"]).as_deref(),
            Some("primary")
        );
    }

    #[test]
    fn raw_header_joins_multiple_values() {
        let h = headers(&["a=1", "b=2"]);
        assert_eq!(raw_cookie_header(&h).unwrap(), "a=1; b=2");
        assert!(raw_cookie_header(&HeaderMap::new()).is_none());
    }

    #[test]
    fn session_cookie_attributes() {
        let c = session_cookie("vbs_session", "tok", 60, true);
        assert_eq!(c, "vbs_session=tok; Path=/; Max-Age=60; HttpOnly; SameSite=Lax; Secure");
        assert!(expired_cookie("vbs_role", false).contains("Max-Age=0"));
    }
}
