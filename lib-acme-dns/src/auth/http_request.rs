use reqwest::{header, Client, Response};
use serde::Serialize;

use super::errors::AcmeDnsErrors;

pub(crate) const APPLICATION_JSON: &str = "application/json";

/// POSTs to an acme-dns endpoint with the given extra headers, JSON encoding
/// `body` when there is one.
pub(crate) async fn post<T: Serialize + ?Sized>(
    client: &Client,
    url_value: String,
    headers: &[(&str, &str)],
    body: Option<&T>,
) -> Result<Response, AcmeDnsErrors> {
    let mut request = client.post(url_value);
    for (name, value) in headers {
        request = request.header(*name, *value);
    }
    if let Some(body) = body {
        if !headers
            .iter()
            .any(|(name, _)| name.eq_ignore_ascii_case(header::CONTENT_TYPE.as_str()))
        {
            request = request.header(header::CONTENT_TYPE, APPLICATION_JSON);
        }
        request = request.body(serde_json::to_vec(body)?);
    }
    Ok(request.send().await?)
}
