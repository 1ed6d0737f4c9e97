//! XML sitemap of the storefront.

fn escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;").replace('\'', "&apos;")
}

pub fn build_sitemap<'a>(site_url: &str, shop_slugs: impl IntoIterator<Item = &'a str>, product_handles: impl IntoIterator<Item = &'a str>) -> String {
    let base = site_url.trim_end_matches('/');
    let urls = std::iter::once(format!("{base}/"))
        .chain(shop_slugs.into_iter().map(|s| format!("{base}/shops/{s}")))
        .chain(product_handles.into_iter().map(|h| format!("{base}/products/{h}")));
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n");
    for url in urls {
        xml.push_str("  <url><loc>");
        xml.push_str(&escape(&url));
        xml.push_str("</loc></url>\n");
    }
    xml.push_str("</urlset>\n");
    xml
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sitemap_entries() {
        let xml = build_sitemap("https://merch.example/", ["tour"], ["tee", "mug"]);
        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("<loc>https://merch.example/</loc>"));
        assert!(xml.contains("<loc>https://merch.example/shops/tour</loc>"));
        assert!(xml.contains("<loc>https://merch.example/products/mug</loc>"));
        assert_eq!(xml.matches("<url>").count(), 4);
    }

    #[test]
    fn test_sitemap_escapes() {
        let xml = build_sitemap("https://m.example", Vec::<&str>::new(), ["a&b"]);
        assert!(xml.contains("/products/a&amp;b"));
    }
}
