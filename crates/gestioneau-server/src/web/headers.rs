//! Response headers: alerts and pagination

use axum::http::header::{HeaderName, InvalidHeaderName, LINK};
use axum::http::{HeaderMap, HeaderValue, Uri};
use gestioneau_core::domain::{EntityDescriptor, Page};

pub const X_TOTAL_COUNT: &str = "x-total-count";

/// Alert header names for one application
///
/// Alerts are `X-{app}-alert: {app}.{entity}.{action}` with the entity id in
/// `X-{app}-params`; failures are `X-{app}-error: error.{key}` with the
/// entity name in `X-{app}-params`.
#[derive(Debug, Clone)]
pub struct Alerts {
    application: String,
    entity_prefix: String,
    alert: HeaderName,
    error: HeaderName,
    params: HeaderName,
}

impl Alerts {
    pub fn new(application: &str, entity_prefix: &str) -> Result<Self, InvalidHeaderName> {
        Ok(Self {
            application: application.to_string(),
            entity_prefix: entity_prefix.to_string(),
            alert: HeaderName::try_from(format!("x-{}-alert", application))?,
            error: HeaderName::try_from(format!("x-{}-error", application))?,
            params: HeaderName::try_from(format!("x-{}-params", application))?,
        })
    }

    /// Name of the entity in alert messages, e.g. `gestioneauProvince`
    pub fn entity_name(&self, descriptor: &EntityDescriptor) -> String {
        descriptor.alert_name(&self.entity_prefix)
    }

    pub fn created(&self, descriptor: &EntityDescriptor, id: i64) -> HeaderMap {
        self.alert(descriptor, "created", id)
    }

    pub fn updated(&self, descriptor: &EntityDescriptor, id: i64) -> HeaderMap {
        self.alert(descriptor, "updated", id)
    }

    pub fn deleted(&self, descriptor: &EntityDescriptor, id: i64) -> HeaderMap {
        self.alert(descriptor, "deleted", id)
    }

    fn alert(&self, descriptor: &EntityDescriptor, action: &str, id: i64) -> HeaderMap {
        let message = format!(
            "{}.{}.{}",
            self.application,
            self.entity_name(descriptor),
            action
        );
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::try_from(message) {
            headers.insert(self.alert.clone(), value);
        }
        headers.insert(self.params.clone(), HeaderValue::from(id));
        headers
    }

    /// Headers for a rejected request on `descriptor`
    pub fn failure(&self, descriptor: &EntityDescriptor, error_key: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::try_from(format!("error.{}", error_key)) {
            headers.insert(self.error.clone(), value);
        }
        if let Ok(value) = HeaderValue::try_from(self.entity_name(descriptor)) {
            headers.insert(self.params.clone(), value);
        }
        headers
    }
}

/// `X-Total-Count` and `Link` headers for one page
///
/// Links keep the request's query parameters and replace `page` and `size`.
pub fn pagination_headers<T>(uri: &Uri, page: &Page<T>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(X_TOTAL_COUNT, HeaderValue::from(page.total_elements));

    let total_pages = page.total_pages();
    let mut links = Vec::new();
    if let Some(next) = page.number.checked_add(1).filter(|next| *next < total_pages) {
        links.push(page_link(uri, next, page.size, "next"));
    }
    if page.number > 0 {
        links.push(page_link(uri, page.number - 1, page.size, "prev"));
    }
    links.push(page_link(uri, total_pages.saturating_sub(1), page.size, "last"));
    links.push(page_link(uri, 0, page.size, "first"));

    if let Ok(value) = HeaderValue::try_from(links.join(",")) {
        headers.insert(LINK, value);
    }
    headers
}

fn page_link(uri: &Uri, page: u32, size: u32, rel: &str) -> String {
    let paging = format!("page={}&size={}", page, size);
    let mut query: Vec<&str> = uri
        .query()
        .unwrap_or_default()
        .split('&')
        .filter(|pair| {
            let key = pair.split('=').next().unwrap_or_default();
            !pair.is_empty() && key != "page" && key != "size"
        })
        .collect();
    query.push(&paging);

    let target = format!("{}?{}", uri.path(), query.join("&"))
        .replace(',', "%2C")
        .replace(';', "%3B");
    format!("<{}>; rel=\"{}\"", target, rel)
}
