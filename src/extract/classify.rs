use crate::schema::CompiledSchema;
use scraper::{ElementRef, Html};

/// Which extraction path a detail page takes
#[derive(Debug, Clone, Copy)]
pub enum PageClass<'a> {
    /// The page carries a rating container; rating fields are read inside it
    Rated { container: ElementRef<'a> },

    /// No rating container; only identity and location are read
    IdentityOnly,
}

impl PageClass<'_> {
    pub fn is_rated(&self) -> bool {
        matches!(self, Self::Rated { .. })
    }
}

/// Decides whether a detail page carries rating data
pub fn classify<'a>(document: &'a Html, schema: &CompiledSchema) -> PageClass<'a> {
    match schema.rating_container.find(document) {
        Some(container) => PageClass::Rated { container },
        None => PageClass::IdentityOnly,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SiteSchema;

    #[test]
    fn test_rating_wrapper_means_rated() {
        let schema = SiteSchema::default().compile().unwrap();
        let doc = Html::parse_document(
            r#"<html><body><div class="rating-wrapper"><p>x</p></div></body></html>"#,
        );
        match classify(&doc, &schema) {
            PageClass::Rated { container } => {
                assert_eq!(container.value().attr("class"), Some("rating-wrapper"));
            }
            PageClass::IdentityOnly => panic!("expected a rated page"),
        }
    }

    #[test]
    fn test_no_wrapper_means_identity_only() {
        let schema = SiteSchema::default().compile().unwrap();
        let doc = Html::parse_document(r#"<html><body><h1 class="charityname">X</h1></body></html>"#);
        assert!(!classify(&doc, &schema).is_rated());
    }

    #[test]
    fn test_class_match_is_exact() {
        let schema = SiteSchema::default().compile().unwrap();
        let doc = Html::parse_document(
            r#"<html><body><div class="rating-wrapper hidden"></div></body></html>"#,
        );
        assert!(!classify(&doc, &schema).is_rated());
    }
}
