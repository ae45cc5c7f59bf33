//! Visit classification: device type, traffic source, region.

/// Referrer host suffix → traffic source label.
const SOURCE_TABLE: &[(&str, &str)] = &[
    ("baidu.com", "baidu"),
    ("google.com", "google"),
    ("weixin.qq.com", "wechat"),
    ("weibo.com", "weibo"),
];

/// Classify a User-Agent string as `tablet`, `mobile`, or `desktop`.
///
/// Tablet signatures are checked BEFORE mobile signatures: tablet UAs
/// routinely also contain "Mobile" (e.g. iPad Safari), so the order of the
/// two checks is load-bearing. Unmatched UAs fall back to `desktop`.
pub fn classify_device(user_agent: &str) -> &'static str {
    let ua = user_agent.to_lowercase();
    if ua.contains("tablet") || ua.contains("ipad") {
        return "tablet";
    }
    if ua.contains("mobile") || ua.contains("android") || ua.contains("iphone") {
        return "mobile";
    }
    "desktop"
}

/// Classify the traffic source for a visit.
///
/// An explicit non-empty `utm_source` always wins. Otherwise the referrer
/// host is suffix-matched against the fixed domain table; any other
/// non-empty referrer is `referral`, and no referrer at all is `direct`.
pub fn classify_source(utm_source: Option<&str>, referer: Option<&str>) -> String {
    if let Some(utm) = utm_source {
        if !utm.is_empty() {
            return utm.to_string();
        }
    }

    let domain = referer.and_then(extract_referrer_domain);
    match domain {
        Some(host) => {
            for (suffix, label) in SOURCE_TABLE {
                if host == *suffix || host.ends_with(&format!(".{suffix}")) {
                    return (*label).to_string();
                }
            }
            "referral".to_string()
        }
        None => "direct".to_string(),
    }
}

/// Extract the lowercased host from a referrer URL.
///
/// Returns `None` if the referrer is empty or has no host. Ports are
/// stripped so `example.com:8080` matches the same as `example.com`.
pub fn extract_referrer_domain(referrer: &str) -> Option<String> {
    if referrer.is_empty() {
        return None;
    }
    let stripped = referrer
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    let host = stripped.split('/').next()?.split(':').next()?;
    if host.is_empty() {
        None
    } else {
        Some(host.to_lowercase())
    }
}

/// Classify the visitor's region from the client IP.
///
/// Loopback, RFC 1918, and link-local addresses map to `local`; everything
/// else — including unparseable input — is `unknown`. This is the
/// placeholder for a real geo-IP lookup.
pub fn classify_region(client_ip: Option<&str>) -> &'static str {
    use std::net::IpAddr;

    let Some(ip) = client_ip else {
        return "unknown";
    };
    let Ok(addr) = ip.parse::<IpAddr>() else {
        return "unknown";
    };
    let is_local = match addr {
        IpAddr::V4(v4) => v4.is_loopback() || v4.is_private() || v4.is_link_local(),
        IpAddr::V6(v6) => v6.is_loopback(),
    };
    if is_local {
        "local"
    } else {
        "unknown"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tablet_wins_over_mobile() {
        // iPad Safari advertises both "iPad" and "Mobile".
        let ua = "Mozilla/5.0 (iPad; CPU OS 16_0 like Mac OS X) Mobile/15E148";
        assert_eq!(classify_device(ua), "tablet");
    }

    #[test]
    fn android_phone_is_mobile() {
        let ua = "Mozilla/5.0 (Linux; Android 13; Pixel 7) Mobile Safari/537.36";
        assert_eq!(classify_device(ua), "mobile");
    }

    #[test]
    fn unmatched_ua_is_desktop() {
        assert_eq!(classify_device("Mozilla/5.0 (X11; Linux x86_64)"), "desktop");
        assert_eq!(classify_device(""), "desktop");
    }

    #[test]
    fn utm_source_beats_referrer() {
        let source = classify_source(Some("newsletter"), Some("https://google.com/search"));
        assert_eq!(source, "newsletter");
    }

    #[test]
    fn empty_utm_falls_through_to_referrer() {
        let source = classify_source(Some(""), Some("https://www.google.com/search?q=x"));
        assert_eq!(source, "google");
    }

    #[test]
    fn known_referrer_domains() {
        assert_eq!(classify_source(None, Some("https://baidu.com/s?wd=x")), "baidu");
        assert_eq!(classify_source(None, Some("https://weixin.qq.com/article")), "wechat");
        assert_eq!(classify_source(None, Some("http://weibo.com/u/1")), "weibo");
    }

    #[test]
    fn unknown_referrer_is_referral_and_empty_is_direct() {
        assert_eq!(classify_source(None, Some("https://example.org/page")), "referral");
        assert_eq!(classify_source(None, Some("")), "direct");
        assert_eq!(classify_source(None, None), "direct");
    }

    #[test]
    fn referrer_domain_strips_scheme_path_and_port() {
        assert_eq!(
            extract_referrer_domain("https://News.Ycombinator.com/item?id=1"),
            Some("news.ycombinator.com".to_string())
        );
        assert_eq!(
            extract_referrer_domain("http://example.com:8080/x"),
            Some("example.com".to_string())
        );
        assert_eq!(extract_referrer_domain(""), None);
    }

    #[test]
    fn private_ips_are_local() {
        assert_eq!(classify_region(Some("127.0.0.1")), "local");
        assert_eq!(classify_region(Some("10.1.2.3")), "local");
        assert_eq!(classify_region(Some("192.168.0.4")), "local");
        assert_eq!(classify_region(Some("8.8.8.8")), "unknown");
        assert_eq!(classify_region(Some("not-an-ip")), "unknown");
        assert_eq!(classify_region(None), "unknown");
    }
}
