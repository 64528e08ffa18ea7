//! Git smart-HTTP request classification.
//!
//! This is the only gate deciding what the proxy relays to arbitrary
//! upstream hosts. A request is allowed when it has the shape of one of
//! the smart-HTTP exchanges:
//!
//! ```text
//! GET     …/info/refs?service=git-upload-pack|git-receive-pack
//! POST    …/git-upload-pack    content-type: application/x-git-upload-pack-request
//! POST    …/git-receive-pack   content-type: application/x-git-receive-pack-request
//! OPTIONS preflight for any of the above
//! ```

use axum::http::{header, HeaderMap, Method, Uri};
use url::form_urlencoded;

const UPLOAD_PACK: &str = "git-upload-pack";
const RECEIVE_PACK: &str = "git-receive-pack";
const UPLOAD_PACK_REQUEST: &str = "application/x-git-upload-pack-request";
const RECEIVE_PACK_REQUEST: &str = "application/x-git-receive-pack-request";

/// Last value of a header as a string, if it is valid visible ASCII.
pub(crate) fn header_str<'a>(headers: &'a HeaderMap, name: header::HeaderName) -> Option<&'a str> {
    headers
        .get_all(name)
        .iter()
        .last()
        .and_then(|v| v.to_str().ok())
}

/// First value of a query parameter, percent-decoded.
fn query_param(uri: &Uri, key: &str) -> Option<String> {
    let query = uri.query()?;
    form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

/// `…/info/refs?service=git-upload-pack` or `…?service=git-receive-pack`.
pub fn is_info_refs(uri: &Uri) -> bool {
    uri.path().ends_with("/info/refs")
        && matches!(
            query_param(uri, "service").as_deref(),
            Some(UPLOAD_PACK) | Some(RECEIVE_PACK)
        )
}

fn is_pack_endpoint(path: &str) -> bool {
    path.ends_with(UPLOAD_PACK) || path.ends_with(RECEIVE_PACK)
}

/// Decide whether a request is a legitimate Git smart-HTTP operation or a
/// preflight for one.
pub fn is_allowed(method: &Method, uri: &Uri, headers: &HeaderMap) -> bool {
    let path = uri.path();

    match *method {
        Method::OPTIONS => {
            if is_info_refs(uri) {
                return true;
            }
            let wants_content_type = header_str(headers, header::ACCESS_CONTROL_REQUEST_HEADERS)
                .is_some_and(|h| h.contains("content-type"));
            wants_content_type && is_pack_endpoint(path)
        }
        Method::POST => {
            let content_type = header_str(headers, header::CONTENT_TYPE);
            // pull
            (content_type == Some(UPLOAD_PACK_REQUEST) && path.ends_with(UPLOAD_PACK))
                // push
                || (content_type == Some(RECEIVE_PACK_REQUEST) && path.ends_with(RECEIVE_PACK))
        }
        Method::GET => is_info_refs(uri),
        _ => false,
    }
}
