use std::collections::VecDeque;

use reqwest::Method;
use serde_json::Value;

use crate::client::{Client, Error};
use crate::schema::{ConvertState, Record, SchemaRef};

#[derive(Debug, Clone, Copy)]
/// Endpoint-specific pagination field names, passed through opaquely.
pub struct PageShape {
    /// Response field holding the item array.
    pub items_field: &'static str,
    /// Request query parameter carrying the cursor.
    pub cursor_param: &'static str,
    /// Response field carrying the next-page cursor.
    pub next_cursor_field: &'static str,
}

/// One page of a list response.
///
/// A page owns the raw decoded body, the materialized item records, and
/// everything needed to re-issue the originating request with an updated
/// cursor. Pages are immutable; [`Page::next_page`] returns a new,
/// independent page.
pub struct Page<'a> {
    client: &'a Client,
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    shape: PageShape,
    item_schema: SchemaRef,
    body: Value,
    items: Vec<Record>,
    next_cursor: Option<String>,
}

impl<'a> Page<'a> {
    pub(crate) fn from_body(
        client: &'a Client,
        method: Method,
        path: String,
        query: Vec<(String, String)>,
        shape: PageShape,
        item_schema: SchemaRef,
        body: Value,
    ) -> Result<Self, Error> {
        let mut items = Vec::new();
        if let Some(Value::Array(raw_items)) = body.get(shape.items_field) {
            let schema = item_schema()?;
            let mut state = ConvertState::strict();
            items.reserve(raw_items.len());
            for raw_item in raw_items {
                items.push(Record::from_wire(schema, raw_item, &mut state)?);
            }
        }

        let next_cursor = body
            .get(shape.next_cursor_field)
            .and_then(Value::as_str)
            .filter(|cursor| !cursor.is_empty())
            .map(ToOwned::to_owned);

        Ok(Self {
            client,
            method,
            path,
            query,
            shape,
            item_schema,
            body,
            items,
            next_cursor,
        })
    }

    /// Materialized items of this page.
    pub fn items(&self) -> &[Record] {
        &self.items
    }

    /// Raw decoded response body.
    pub fn body(&self) -> &Value {
        &self.body
    }

    /// Cursor for the next page, when the response carried one.
    pub fn next_cursor(&self) -> Option<&str> {
        self.next_cursor.as_deref()
    }

    /// Whether another page can be fetched.
    ///
    /// False when this page's item list is empty (regardless of any cursor
    /// signal) or when the response carried no usable cursor.
    pub fn has_next_page(&self) -> bool {
        !self.items.is_empty() && self.next_cursor.is_some()
    }

    /// Fetch the next page by re-issuing the originating request with an
    /// updated cursor.
    ///
    /// # Panics
    ///
    /// Calling this without `has_next_page()` being true is a caller bug and
    /// panics; it is never a retryable condition.
    pub fn next_page(&self) -> Result<Page<'a>, Error> {
        let Some(fetch) = self.resume() else {
            panic!("next_page() called on an exhausted page; check has_next_page() first");
        };
        fetch.run()
    }

    /// Lazy iteration over this and all following pages.
    ///
    /// Each advance past the current page issues one network round-trip; the
    /// iterator is consumed by traversal and cannot be restarted.
    pub fn pages(self) -> Pages<'a> {
        Pages {
            first: Some(self),
            pending: None,
        }
    }

    /// Lazy, flattened iteration over every item across all pages.
    ///
    /// Pages are fetched only as iteration reaches them; like [`Page::pages`],
    /// the traversal is not restartable.
    pub fn all_items(self) -> PageItems<'a> {
        PageItems {
            pages: self.pages(),
            buffer: VecDeque::new(),
        }
    }

    fn into_items(self) -> Vec<Record> {
        self.items
    }

    /// Everything needed to fetch the page after this one, if there is one.
    fn resume(&self) -> Option<PageFetch<'a>> {
        if !self.has_next_page() {
            return None;
        }
        let cursor = self.next_cursor.clone()?;

        let mut query: Vec<(String, String)> = self
            .query
            .iter()
            .filter(|(name, _)| name != self.shape.cursor_param)
            .cloned()
            .collect();
        query.push((self.shape.cursor_param.to_owned(), cursor));

        Some(PageFetch {
            client: self.client,
            method: self.method.clone(),
            path: self.path.clone(),
            query,
            shape: self.shape,
            item_schema: self.item_schema,
        })
    }
}

/// Deferred fetch of one page; holds no response data.
struct PageFetch<'a> {
    client: &'a Client,
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    shape: PageShape,
    item_schema: SchemaRef,
}

impl<'a> PageFetch<'a> {
    fn run(self) -> Result<Page<'a>, Error> {
        let body = self
            .client
            .request_value(self.method.clone(), &self.path, &self.query, None)?;
        Page::from_body(
            self.client,
            self.method,
            self.path,
            self.query,
            self.shape,
            self.item_schema,
            body,
        )
    }
}

/// Iterator over pages; see [`Page::pages`].
pub struct Pages<'a> {
    first: Option<Page<'a>>,
    pending: Option<PageFetch<'a>>,
}

impl<'a> Iterator for Pages<'a> {
    type Item = Result<Page<'a>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(page) = self.first.take() {
            self.pending = page.resume();
            return Some(Ok(page));
        }

        let fetch = self.pending.take()?;
        match fetch.run() {
            Ok(page) => {
                self.pending = page.resume();
                Some(Ok(page))
            }
            // The fetch failed; iteration ends after surfacing the error.
            Err(err) => Some(Err(err)),
        }
    }
}

/// Iterator over items across pages; see [`Page::all_items`].
pub struct PageItems<'a> {
    pages: Pages<'a>,
    buffer: VecDeque<Record>,
}

impl Iterator for PageItems<'_> {
    type Item = Result<Record, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.buffer.pop_front() {
                return Some(Ok(record));
            }
            match self.pages.next()? {
                Ok(page) => self.buffer.extend(page.into_items()),
                Err(err) => return Some(Err(err)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::OnceLock;

    use super::*;
    use crate::client::testing::{FakeTransport, make_client};
    use crate::schema::{
        ConfigurationError, FieldValue, ModelSchema, PropertyDecl, TypeDecl, cached_schema,
    };
    use crate::transport::TransportFailure;

    const SHAPE: PageShape = PageShape {
        items_field: "subscriptions",
        cursor_param: "cursor",
        next_cursor_field: "next_cursor",
    };

    fn item_schema() -> Result<&'static ModelSchema, ConfigurationError> {
        static SCHEMA: OnceLock<Result<ModelSchema, ConfigurationError>> = OnceLock::new();
        cached_schema(&SCHEMA, || {
            ModelSchema::builder("TestSubscription")
                .field(PropertyDecl::new("id", TypeDecl::string()))
                .build()
        })
    }

    fn list_page<'a>(client: &'a Client, query: Vec<(String, String)>) -> Result<Page<'a>, Error> {
        let body =
            client.request_value(Method::GET, "/v2/subscriptions", &query, None)?;
        Page::from_body(
            client,
            Method::GET,
            "/v2/subscriptions".to_owned(),
            query,
            SHAPE,
            item_schema,
            body,
        )
    }

    fn item_ids(page: &Page<'_>) -> Vec<String> {
        page.items()
            .iter()
            .map(|record| {
                record
                    .get("id")
                    .value()
                    .and_then(FieldValue::as_str)
                    .unwrap()
                    .to_owned()
            })
            .collect()
    }

    #[test]
    fn empty_item_list_means_no_next_page_even_with_cursor() {
        let transport = FakeTransport::new(
            200,
            r#"{"subscriptions": [], "next_cursor": "c_2"}"#,
        );
        let client = make_client(transport);

        let page = list_page(&client, Vec::new()).unwrap();
        assert!(page.items().is_empty());
        assert!(!page.has_next_page());
    }

    #[test]
    fn missing_cursor_means_no_next_page() {
        let transport =
            FakeTransport::new(200, r#"{"subscriptions": [{"id": "sub_1"}]}"#);
        let client = make_client(transport);

        let page = list_page(&client, Vec::new()).unwrap();
        assert_eq!(page.items().len(), 1);
        assert!(!page.has_next_page());
    }

    #[test]
    fn next_page_reissues_the_request_with_the_cursor() {
        let transport = FakeTransport::new(
            200,
            r#"{"subscriptions": [{"id": "sub_2"}]}"#,
        );
        transport.push_response(
            200,
            r#"{"subscriptions": [{"id": "sub_1"}], "next_cursor": "c_2"}"#,
        );
        let client = make_client(transport.clone());

        let page = list_page(&client, vec![("page_size".to_owned(), "1".to_owned())]).unwrap();
        assert!(page.has_next_page());
        assert_eq!(page.next_cursor(), Some("c_2"));

        let next = page.next_page().unwrap();
        assert_eq!(item_ids(&next), vec!["sub_2"]);
        assert!(!next.has_next_page());

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(
            requests[1].url.query(),
            Some("page_size=1&cursor=c_2")
        );
    }

    #[test]
    fn next_page_replaces_a_previous_cursor_parameter() {
        let transport = FakeTransport::new(
            200,
            r#"{"subscriptions": [{"id": "sub_3"}]}"#,
        );
        transport.push_response(
            200,
            r#"{"subscriptions": [{"id": "sub_2"}], "next_cursor": "c_3"}"#,
        );
        let client = make_client(transport.clone());

        let page = list_page(&client, vec![("cursor".to_owned(), "c_2".to_owned())]).unwrap();
        page.next_page().unwrap();

        let requests = transport.requests();
        assert_eq!(requests[1].url.query(), Some("cursor=c_3"));
    }

    #[test]
    #[should_panic(expected = "next_page() called on an exhausted page")]
    fn next_page_without_has_next_page_is_a_caller_bug() {
        let transport = FakeTransport::new(200, r#"{"subscriptions": []}"#);
        let client = make_client(transport);

        let page = list_page(&client, Vec::new()).unwrap();
        let _ = page.next_page();
    }

    #[test]
    fn page_iteration_is_lazy() {
        let transport = FakeTransport::new(
            200,
            r#"{"subscriptions": [{"id": "sub_3"}]}"#,
        );
        transport.push_response(
            200,
            r#"{"subscriptions": [{"id": "sub_1"}], "next_cursor": "c_2"}"#,
        );
        transport.push_response(
            200,
            r#"{"subscriptions": [{"id": "sub_2"}], "next_cursor": "c_3"}"#,
        );
        let client = make_client(transport.clone());

        let page = list_page(&client, Vec::new()).unwrap();
        assert_eq!(transport.request_count(), 1);

        let mut pages = page.pages();

        let first = pages.next().unwrap().unwrap();
        assert_eq!(item_ids(&first), vec!["sub_1"]);
        // Yielding the first page must not have fetched the second.
        assert_eq!(transport.request_count(), 1);

        let second = pages.next().unwrap().unwrap();
        assert_eq!(item_ids(&second), vec!["sub_2"]);
        assert_eq!(transport.request_count(), 2);

        let third = pages.next().unwrap().unwrap();
        assert_eq!(item_ids(&third), vec!["sub_3"]);
        assert_eq!(transport.request_count(), 3);

        assert!(pages.next().is_none());
        assert_eq!(transport.request_count(), 3);
    }

    #[test]
    fn all_items_flattens_across_pages() {
        let transport = FakeTransport::new(
            200,
            r#"{"subscriptions": [{"id": "sub_3"}]}"#,
        );
        transport.push_response(
            200,
            r#"{"subscriptions": [{"id": "sub_1"}, {"id": "sub_2"}], "next_cursor": "c_2"}"#,
        );
        let client = make_client(transport);

        let page = list_page(&client, Vec::new()).unwrap();
        let ids: Vec<String> = page
            .all_items()
            .map(|item| {
                item.unwrap()
                    .get("id")
                    .value()
                    .and_then(FieldValue::as_str)
                    .unwrap()
                    .to_owned()
            })
            .collect();
        assert_eq!(ids, vec!["sub_1", "sub_2", "sub_3"]);
    }

    #[test]
    fn fetch_failure_ends_iteration_after_the_error() {
        let transport = FakeTransport::new(200, "{}");
        transport.push_response(
            200,
            r#"{"subscriptions": [{"id": "sub_1"}], "next_cursor": "c_2"}"#,
        );
        transport.push_failure(TransportFailure::Connection(Box::new(
            std::io::Error::other("refused"),
        )));
        let client = make_client(transport);

        let page = list_page(&client, Vec::new()).unwrap();
        let mut pages = page.pages();

        assert!(pages.next().unwrap().is_ok());
        assert!(pages.next().unwrap().is_err());
        assert!(pages.next().is_none());
    }
}
