use serde::Deserialize;

/// List endpoints answer either a bare array or a DRF page
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ListEnvelope<T> {
    Paginated {
        #[serde(default)]
        count: Option<u64>,
        #[serde(default)]
        next: Option<String>,
        results: Vec<T>,
    },
    Bare(Vec<T>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next: Option<String>,
    pub count: Option<u64>,
}

impl<T> ListEnvelope<T> {
    pub fn into_page(self) -> Page<T> {
        match self {
            ListEnvelope::Paginated { count, next, results } => Page {
                items: results,
                next: next.filter(|link| !link.trim().is_empty()),
                count,
            },
            ListEnvelope::Bare(items) => Page {
                count: Some(items.len() as u64),
                items,
                next: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_bare_arrays() {
        let envelope: ListEnvelope<u32> = serde_json::from_str("[1, 2, 3]").unwrap();
        let page = envelope.into_page();
        assert_eq!(page.items, vec![1, 2, 3]);
        assert_eq!(page.next, None);
    }

    #[test]
    fn decodes_drf_pages() {
        let body = r#"{"count": 12, "next": "http://127.0.0.1:8000/api/departments/?page=2", "previous": null, "results": [1]}"#;
        let page = serde_json::from_str::<ListEnvelope<u32>>(body).unwrap().into_page();
        assert_eq!(page.count, Some(12));
        assert_eq!(page.items, vec![1]);
        assert_eq!(page.next.as_deref(), Some("http://127.0.0.1:8000/api/departments/?page=2"));
    }

    #[test]
    fn rejects_other_shapes() {
        assert!(serde_json::from_str::<ListEnvelope<u32>>(r#"{"items": []}"#).is_err());
    }
}
