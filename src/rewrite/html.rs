//! HTML body rewriting.
//!
//! Applied in order to the decoded body of `text/html` responses:
//! 1. `http(s)://{target}/` → `{scheme}://{proxy}/{target}/` everywhere
//! 2. `href=`, `src=` and `action=` values starting with a single `/`
//!    → `{scheme}://{proxy}/{target}/...`
//! 3. the first `<base href="/` (case-insensitive)
//!    → `<base href="{scheme}://{proxy}/{target}/`
//!
//! This is a textual rewrite. It misses URLs built in inline scripts and
//! styles, and may touch matching text outside of markup. Rewritten
//! attribute values always close with `"`, even when opened with `'`.

use once_cell::sync::Lazy;
use regex::{Captures, NoExpand, Regex};

use crate::rewrite::RewriteContext;

/// Attribute values that are root-relative (`/x`, not protocol-relative `//x`).
static ROOT_RELATIVE_ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"((?:href|src|action)=["'])/([^/"'][^"']*)["']"#)
        .expect("root-relative attribute pattern is valid")
});

static BASE_HREF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<base\s+href=["']/"#).expect("base href pattern is valid")
});

/// Rewrite an HTML document so its links stay routed through the proxy.
pub fn rewrite_html(body: &str, ctx: &RewriteContext<'_>) -> Result<String, regex::Error> {
    let origin = ctx.proxied_origin(ctx.target_host);

    let absolute = Regex::new(&format!(
        "https?://{}/",
        regex::escape(ctx.target_host)
    ))?;
    let body = absolute.replace_all(body, NoExpand(&format!("{origin}/")));

    let body = ROOT_RELATIVE_ATTR.replace_all(&body, |caps: &Captures<'_>| {
        format!("{}{}/{}\"", &caps[1], origin, &caps[2])
    });

    let base = format!("<base href=\"{origin}/");
    Ok(BASE_HREF.replacen(&body, 1, NoExpand(&base)).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CTX: RewriteContext<'static> = RewriteContext {
        scheme: "https",
        proxy_host: "proxy.test",
        target_host: "foo.com",
    };

    fn rewrite(body: &str) -> String {
        rewrite_html(body, &CTX).unwrap()
    }

    #[test]
    fn test_root_relative_href() {
        assert_eq!(
            rewrite(r#"<a href="/a">A</a>"#),
            r#"<a href="https://proxy.test/foo.com/a">A</a>"#
        );
    }

    #[test]
    fn test_src_and_action() {
        let html = r#"<img src="/img/logo.png"><form action="/submit?x=1"></form>"#;
        assert_eq!(
            rewrite(html),
            r#"<img src="https://proxy.test/foo.com/img/logo.png"><form action="https://proxy.test/foo.com/submit?x=1"></form>"#
        );
    }

    #[test]
    fn test_absolute_target_urls() {
        assert_eq!(
            rewrite("see https://foo.com/b and http://foo.com/c"),
            "see https://proxy.test/foo.com/b and https://proxy.test/foo.com/c"
        );
    }

    #[test]
    fn test_other_hosts_untouched() {
        let html = r#"<a href="https://bar.com/x">x</a> https://foo.company.com/y"#;
        assert_eq!(rewrite(html), html);
    }

    #[test]
    fn test_host_is_matched_literally() {
        // The dot in the target host must not match arbitrary characters.
        let html = "https://fooXcom/a";
        assert_eq!(rewrite(html), html);
    }

    #[test]
    fn test_protocol_relative_untouched() {
        let html = r#"<script src="//cdn.example.com/app.js"></script>"#;
        assert_eq!(rewrite(html), html);
    }

    #[test]
    fn test_single_quotes_close_with_double_quote() {
        assert_eq!(
            rewrite("<a href='/a'>"),
            r#"<a href='https://proxy.test/foo.com/a">"#
        );
    }

    #[test]
    fn test_base_tag() {
        assert_eq!(
            rewrite(r#"<BASE  href="/">"#),
            r#"<base href="https://proxy.test/foo.com/">"#
        );
    }

    #[test]
    fn test_only_first_base_tag() {
        assert_eq!(
            rewrite(r#"<base href='/'><base href="/">"#),
            r#"<base href="https://proxy.test/foo.com/'><base href="/">"#
        );
    }

    #[test]
    fn test_replacement_text_is_literal() {
        assert_eq!(
            rewrite(r#"<a href="/$1">"#),
            r#"<a href="https://proxy.test/foo.com/$1">"#
        );
    }

    #[test]
    fn test_plain_text_unchanged() {
        let html = "<p>no links here</p>";
        assert_eq!(rewrite(html), html);
    }
}
