//! Built-in signal knowledge base.
//!
//! Names are lower-case. Prefix entries match any header that starts with
//! them.

/// Headers present on nearly every site regardless of platform.
pub const GENERIC_HEADERS: &[&str] = &[
    "accept-ranges",
    "access-control-allow-origin",
    "age",
    "alt-svc",
    "cache-control",
    "connection",
    "content-encoding",
    "content-language",
    "content-length",
    "content-security-policy",
    "content-type",
    "date",
    "etag",
    "expires",
    "keep-alive",
    "last-modified",
    "location",
    "permissions-policy",
    "pragma",
    "referrer-policy",
    "report-to",
    "server-timing",
    "set-cookie",
    "strict-transport-security",
    "transfer-encoding",
    "vary",
    "x-content-type-options",
    "x-frame-options",
    "x-xss-protection",
];

/// CDN, proxy and hosting headers.
pub const INFRASTRUCTURE_HEADERS: &[&str] = &[
    "cdn-cache-control",
    "nel",
    "server",
    "via",
    "x-cache",
    "x-cache-hits",
    "x-served-by",
    "x-timer",
    "x-request-id",
    "x-runtime",
];

pub const INFRASTRUCTURE_PREFIXES: &[&str] = &[
    "cf-",
    "x-akamai-",
    "x-amz-",
    "x-azure-",
    "x-cdn-",
    "x-fastly-",
    "x-github-",
    "x-netlify-",
    "x-nf-",
    "x-varnish",
    "x-vercel-",
];

/// Headers that commonly reveal a CMS but do not name one.
pub const CMS_INDICATIVE_HEADERS: &[&str] = &[
    "link",
    "x-content-encoded-by",
    "x-drupal-cache",
    "x-drupal-dynamic-cache",
    "x-generator",
    "x-pingback",
    "x-powered-by",
    "x-redirect-by",
];

/// Vendor tokens and the platform each one names.
pub const VENDOR_TOKENS: &[(&str, &str)] = &[
    ("bigcommerce", "BigCommerce"),
    ("drupal", "Drupal"),
    ("duda", "Duda"),
    ("ghost", "Ghost"),
    ("hubspot", "HubSpot"),
    ("joomla", "Joomla"),
    ("magento", "Magento"),
    ("prestashop", "PrestaShop"),
    ("shopify", "Shopify"),
    ("squarespace", "Squarespace"),
    ("typo3", "TYPO3"),
    ("webflow", "Webflow"),
    ("weebly", "Weebly"),
    ("wix", "Wix"),
    ("wordpress", "WordPress"),
    ("wp", "WordPress"),
];

pub const GENERIC_PRIOR: f64 = 0.05;
pub const INFRASTRUCTURE_PRIOR: f64 = 0.2;
pub const CUSTOM_PRIOR: f64 = 0.5;
pub const CMS_INDICATIVE_PRIOR: f64 = 0.7;
pub const PLATFORM_PRIOR: f64 = 0.95;

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn tables_are_lowercase_and_disjoint() {
        let mut seen = HashSet::new();
        for name in GENERIC_HEADERS
            .iter()
            .chain(INFRASTRUCTURE_HEADERS)
            .chain(CMS_INDICATIVE_HEADERS)
        {
            assert_eq!(*name, name.to_ascii_lowercase());
            assert!(seen.insert(*name), "{name} listed twice");
        }
    }
}
