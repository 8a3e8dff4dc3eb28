/// Builds request URLs against one upstream API base.
///
/// Two instances exist at runtime, one per base URL (football domain and
/// reference/core). Construction is plain string work with no I/O.
#[derive(Debug, Clone)]
pub struct EndpointBuilder {
    base_url: String,
    api_token: String,
}

impl EndpointBuilder {
    pub fn new(base_url: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_token: api_token.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `includes` are joined with `;`, the API's own include syntax.
    /// The `page` parameter is only emitted past the first page.
    pub fn build(
        &self,
        entity_path: &str,
        unique_id: Option<i64>,
        includes: &[&str],
        page: u32,
    ) -> String {
        let mut endpoint = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            entity_path.trim_start_matches('/')
        );

        if let Some(id) = unique_id {
            endpoint.push('/');
            endpoint.push_str(&id.to_string());
        }

        endpoint.push_str("?api_token=");
        endpoint.push_str(&self.api_token);

        if !includes.is_empty() {
            endpoint.push_str("&includes=");
            endpoint.push_str(&includes.join(";"));
        }

        if page > 1 {
            endpoint.push_str("&page=");
            endpoint.push_str(&page.to_string());
        }

        endpoint
    }
}
