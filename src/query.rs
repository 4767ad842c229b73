//! Page query parameters: `category` on the listing page, `id` on the detail page.

use url::{form_urlencoded, Url};

use crate::catalog::ProductFilter;
use crate::domain::value_objects::ProductId;

/// Returns the first value of `name` in `input`, which may be a full URL,
/// a query string with or without the leading `?`, or empty.
pub fn query_param(input: &str, name: &str) -> Option<String> {
    let input = input.trim();
    let query = match Url::parse(input) {
        Ok(url) => url.query().unwrap_or_default().to_string(),
        Err(_) => input.trim_start_matches('?').to_string(),
    };
    form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

/// Product selected on the detail page; absent or non-numeric yields `None`.
pub fn product_id_from_query(input: &str) -> Option<ProductId> {
    query_param(input, "id")?.parse().ok()
}

impl ProductFilter {
    /// Initial listing filter from the landing page link.
    pub fn from_query(input: &str) -> Self {
        match query_param(input, "category").filter(|c| !c.trim().is_empty()) {
            Some(category) => Self::all().category(category),
            None => Self::all(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_from_query() {
        assert_eq!(ProductFilter::from_query("?category=laptop"), ProductFilter::all().category("laptop"));
        assert_eq!(ProductFilter::from_query("category=Gaming%20Mice&x=1"), ProductFilter::all().category("Gaming Mice"));
        assert_eq!(ProductFilter::from_query("https://shop.example.com/products.html?category=mouse"), ProductFilter::all().category("mouse"));
        assert_eq!(ProductFilter::from_query(""), ProductFilter::all());
        assert_eq!(ProductFilter::from_query("?category="), ProductFilter::all());
    }

    #[test]
    fn test_product_id_from_query() {
        assert_eq!(product_id_from_query("?id=12"), Some(ProductId::new(12)));
        assert_eq!(product_id_from_query("https://shop.example.com/productDetail.html?id=3"), Some(ProductId::new(3)));
        assert_eq!(product_id_from_query("?id=abc"), None);
        assert_eq!(product_id_from_query("?category=laptop"), None);
    }
}
