//! Logical request descriptors.
//!
//! A [`RequestDescriptor`] captures the caller's intent (method, target URI,
//! headers, optional body) independent of wire encoding. The descriptor is
//! immutable once built; the execution core rebuilds the wire request from it
//! fresh on every attempt.

use crate::{Error, Result};
use http::{HeaderMap, HeaderName, HeaderValue};
use std::fmt;
use std::path::PathBuf;
use url::Url;

/// The HTTP methods the platform API accepts.
///
/// The wire protocol only ever uses these four verbs, so they are a closed
/// enum rather than the open-ended `http::Method`; conversion from an
/// arbitrary method is fallible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// HTTP GET.
    Get,
    /// HTTP POST.
    Post,
    /// HTTP PUT.
    Put,
    /// HTTP DELETE.
    Delete,
}

impl Method {
    /// Returns the equivalent `http::Method`.
    pub fn as_http(&self) -> http::Method {
        match self {
            Method::Get => http::Method::GET,
            Method::Post => http::Method::POST,
            Method::Put => http::Method::PUT,
            Method::Delete => http::Method::DELETE,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_http())
    }
}

impl TryFrom<http::Method> for Method {
    type Error = Error;

    /// Fails with [`Error::UnsupportedMethod`] for any verb outside
    /// {GET, POST, PUT, DELETE}.
    fn try_from(method: http::Method) -> Result<Self> {
        match method.as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            _ => Err(Error::UnsupportedMethod(method)),
        }
    }
}

/// A request body: content type plus raw bytes.
///
/// JSON bodies are carried as already-serialized UTF-8 bytes; anything else
/// is treated as an opaque byte payload tagged with its content type.
#[derive(Debug, Clone)]
pub struct Entity {
    /// The declared content type of the body.
    pub content_type: String,
    /// The body bytes.
    pub content: Vec<u8>,
}

impl Entity {
    /// Creates an entity with an arbitrary content type.
    pub fn new(content_type: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            content_type: content_type.into(),
            content,
        }
    }

    /// Creates a JSON entity from already-serialized bytes.
    pub fn json(content: Vec<u8>) -> Self {
        Self::new("application/json", content)
    }

    /// Returns `true` if the declared content type is JSON.
    pub fn is_json(&self) -> bool {
        self.content_type.starts_with("application/json")
    }
}

/// Describes the file side of a multipart upload.
///
/// The file is attached as a form part named `file`; any JSON entity on the
/// same descriptor rides along in a part named by the lower-cased
/// `object_type` tag (for example `comment` or `discussion`).
#[derive(Debug, Clone)]
pub struct MultipartPayload {
    /// Path of the file to upload.
    pub file_path: PathBuf,
    /// Content type of the file.
    pub file_content_type: String,
    /// Object-type tag naming the metadata form part.
    pub object_type: String,
}

impl MultipartPayload {
    /// Creates a multipart payload descriptor.
    pub fn new(
        file_path: impl Into<PathBuf>,
        file_content_type: impl Into<String>,
        object_type: impl Into<String>,
    ) -> Self {
        Self {
            file_path: file_path.into(),
            file_content_type: file_content_type.into(),
            object_type: object_type.into(),
        }
    }
}

/// A logical request: method, target URI, headers, optional body.
///
/// The target URI is mandatory by construction. Headers are copied verbatim
/// onto the wire request on every attempt.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    method: Method,
    uri: Url,
    headers: HeaderMap,
    entity: Option<Entity>,
}

impl RequestDescriptor {
    /// Creates a descriptor for the given method and absolute URI.
    pub fn new(method: Method, uri: Url) -> Self {
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
            entity: None,
        }
    }

    /// Adds a header.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the header name or value is
    /// invalid.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::Configuration(format!("invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::Configuration(format!("invalid header value: {}", e)))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Replaces the header map wholesale. Used by the client to seed a
    /// descriptor with its default headers.
    pub fn with_header_map(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Appends a query parameter to the target URI.
    pub fn with_query_param(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.uri
            .query_pairs_mut()
            .append_pair(key.as_ref(), value.as_ref());
        self
    }

    /// Attaches a body entity.
    pub fn with_entity(mut self, entity: Entity) -> Self {
        self.entity = Some(entity);
        self
    }

    /// The HTTP method.
    pub fn method(&self) -> Method {
        self.method
    }

    /// The target URI.
    pub fn uri(&self) -> &Url {
        &self.uri
    }

    /// The request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The body entity, if any.
    pub fn entity(&self) -> Option<&Entity> {
        self.entity.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supported_methods_convert_both_ways() {
        for (ours, theirs) in [
            (Method::Get, http::Method::GET),
            (Method::Post, http::Method::POST),
            (Method::Put, http::Method::PUT),
            (Method::Delete, http::Method::DELETE),
        ] {
            assert_eq!(ours.as_http(), theirs);
            assert_eq!(Method::try_from(theirs).unwrap(), ours);
        }
    }

    #[test]
    fn methods_outside_the_contract_are_rejected() {
        for method in [
            http::Method::PATCH,
            http::Method::HEAD,
            http::Method::OPTIONS,
        ] {
            match Method::try_from(method.clone()) {
                Err(Error::UnsupportedMethod(m)) => assert_eq!(m, method),
                other => panic!("expected UnsupportedMethod, got {:?}", other),
            }
        }
    }

    #[test]
    fn query_params_append_to_the_uri() {
        let uri = Url::parse("https://api.example.com/2.0/sheets").unwrap();
        let request = RequestDescriptor::new(Method::Get, uri)
            .with_query_param("pageSize", "100")
            .with_query_param("page", "2");
        assert_eq!(
            request.uri().as_str(),
            "https://api.example.com/2.0/sheets?pageSize=100&page=2"
        );
    }

    #[test]
    fn json_entity_is_tagged_as_json() {
        let entity = Entity::json(b"{}".to_vec());
        assert!(entity.is_json());
        assert!(!Entity::new("text/csv", b"a,b".to_vec()).is_json());
    }

    #[test]
    fn invalid_header_names_are_configuration_errors() {
        let uri = Url::parse("https://api.example.com/").unwrap();
        let result = RequestDescriptor::new(Method::Get, uri).with_header("bad header", "v");
        assert!(matches!(result, Err(Error::Configuration(_))));
    }
}
