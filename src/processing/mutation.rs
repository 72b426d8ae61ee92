//! Per-phase response mutation builder.
//!
//! # Design Decisions
//! - One builder per header phase, handed to each processor by `&mut`
//! - Header values are always encoded in `raw_value`; the proxy ignores
//!   `value` when `raw_value` is set
//! - Append operations also set the deprecated `append` flag to `true`.
//!   Proxies honouring only the older field otherwise overwrite instead of
//!   appending. Non-append operations leave the flag unset, never `false`

use crate::proto::{
    body_mutation::Mutation, BodyMutation, BoolValue, CommonResponse, HeaderAppendAction,
    HeaderMutation, HeaderValue, HeaderValueOption, ResponseStatus, Validate, ValidationError,
};

/// How the proxy should continue after applying the mutation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusDirective {
    /// Apply the mutation and continue the filter chain.
    #[default]
    Continue,
    /// Replace the message with the mutation's headers and body.
    ContinueAndReplace,
}

impl From<StatusDirective> for ResponseStatus {
    fn from(directive: StatusDirective) -> Self {
        match directive {
            StatusDirective::Continue => ResponseStatus::Continue,
            StatusDirective::ContinueAndReplace => ResponseStatus::ContinueAndReplace,
        }
    }
}

/// Replacement for the message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyReplacement {
    Replace(Vec<u8>),
    Clear,
}

/// Encode one header operation the way the proxy expects it.
pub fn encode_header(key: &str, value: &str, action: HeaderAppendAction) -> HeaderValueOption {
    let append = (action == HeaderAppendAction::AppendIfExistsOrAdd)
        .then_some(BoolValue { value: true });
    HeaderValueOption {
        header: Some(HeaderValue {
            key: key.to_string(),
            raw_value: value.as_bytes().to_vec(),
            ..Default::default()
        }),
        append,
        append_action: action as i32,
        keep_empty_value: false,
    }
}

/// Accumulates the mutation for one phase reply.
#[derive(Debug, Default)]
pub struct MutationBuilder {
    set_headers: Vec<HeaderValueOption>,
    remove_headers: Vec<String>,
    body: Option<BodyReplacement>,
    status: StatusDirective,
    clear_route_cache: bool,
}

impl MutationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a header operation with an explicit append action.
    pub fn header(&mut self, key: &str, value: &str, action: HeaderAppendAction) -> &mut Self {
        self.set_headers.push(encode_header(key, value, action));
        self
    }

    /// Overwrite `key` if present, add it otherwise.
    pub fn set_header(&mut self, key: &str, value: &str) -> &mut Self {
        self.header(key, value, HeaderAppendAction::OverwriteIfExistsOrAdd)
    }

    /// Append a value to `key`, adding it if absent.
    pub fn append_header(&mut self, key: &str, value: &str) -> &mut Self {
        self.header(key, value, HeaderAppendAction::AppendIfExistsOrAdd)
    }

    /// Remove headers by name. Repeated names are recorded once.
    pub fn remove_headers<I, K>(&mut self, keys: I) -> &mut Self
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        for key in keys {
            let key = key.as_ref();
            if !self
                .remove_headers
                .iter()
                .any(|existing| existing.eq_ignore_ascii_case(key))
            {
                self.remove_headers.push(key.to_string());
            }
        }
        self
    }

    pub fn set_body_replacement(&mut self, body: impl Into<Vec<u8>>) -> &mut Self {
        self.body = Some(BodyReplacement::Replace(body.into()));
        self
    }

    pub fn clear_body(&mut self) -> &mut Self {
        self.body = Some(BodyReplacement::Clear);
        self
    }

    pub fn set_status(&mut self, status: StatusDirective) -> &mut Self {
        self.status = status;
        self
    }

    pub fn set_clear_route_cache(&mut self, clear: bool) -> &mut Self {
        self.clear_route_cache = clear;
        self
    }

    /// Header operations recorded so far, in order.
    pub fn set_headers(&self) -> &[HeaderValueOption] {
        &self.set_headers
    }

    pub fn removed_headers(&self) -> &[String] {
        &self.remove_headers
    }

    /// Last value written for `key` by this builder, case-insensitive.
    pub fn get_header(&self, key: &str) -> Option<String> {
        self.set_headers
            .iter()
            .rev()
            .filter_map(|option| option.header.as_ref())
            .find(|header| header.key.eq_ignore_ascii_case(key))
            .map(|header| String::from_utf8_lossy(&header.raw_value).into_owned())
    }

    pub fn body(&self) -> Option<&BodyReplacement> {
        self.body.as_ref()
    }

    pub fn status(&self) -> StatusDirective {
        self.status
    }

    pub fn clear_route_cache(&self) -> bool {
        self.clear_route_cache
    }

    /// Check the accumulated header operations against the protocol schema.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.set_headers.iter().try_for_each(Validate::validate)
    }

    /// Finalize into the wire `CommonResponse`.
    ///
    /// The header mutation is always present, even when empty.
    pub fn into_common_response(self) -> CommonResponse {
        let body_mutation = self.body.map(|body| BodyMutation {
            mutation: Some(match body {
                BodyReplacement::Replace(bytes) => Mutation::Body(bytes),
                BodyReplacement::Clear => Mutation::ClearBody(true),
            }),
        });
        CommonResponse {
            status: ResponseStatus::from(self.status) as i32,
            header_mutation: Some(HeaderMutation {
                set_headers: self.set_headers,
                remove_headers: self.remove_headers,
            }),
            body_mutation,
            clear_route_cache: self.clear_route_cache,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_sets_deprecated_flag() {
        let option = encode_header("x-a", "1", HeaderAppendAction::AppendIfExistsOrAdd);
        assert_eq!(option.append, Some(BoolValue { value: true }));
        assert_eq!(option.append_action, HeaderAppendAction::AppendIfExistsOrAdd as i32);
    }

    #[test]
    fn test_non_append_leaves_flag_unset() {
        for action in [
            HeaderAppendAction::AddIfAbsent,
            HeaderAppendAction::OverwriteIfExistsOrAdd,
            HeaderAppendAction::OverwriteIfExists,
        ] {
            let option = encode_header("x-a", "1", action);
            assert_eq!(option.append, None);
            assert_eq!(option.append_action, action as i32);
        }
    }

    #[test]
    fn test_value_goes_to_raw_value() {
        let option = encode_header("x-a", "hello", HeaderAppendAction::OverwriteIfExistsOrAdd);
        let header = option.header.unwrap();
        assert_eq!(header.value, "");
        assert_eq!(header.raw_value, b"hello");
    }

    #[test]
    fn test_remove_headers_deduplicates() {
        let mut builder = MutationBuilder::new();
        builder.remove_headers(["x-a", "X-A", "x-b"]);
        builder.remove_headers(vec!["x-b".to_string()]);
        assert_eq!(builder.removed_headers(), ["x-a", "x-b"]);
    }

    #[test]
    fn test_get_header_is_case_insensitive() {
        let mut builder = MutationBuilder::new();
        builder.set_header("Content-Type", "text/plain");
        builder.set_header("content-type", "application/json");
        assert_eq!(builder.get_header("CONTENT-TYPE").as_deref(), Some("application/json"));
        assert_eq!(builder.get_header("missing"), None);
    }

    #[test]
    fn test_empty_builder_is_pass_through() {
        let response = MutationBuilder::new().into_common_response();
        assert_eq!(response.status, ResponseStatus::Continue as i32);
        let mutation = response.header_mutation.unwrap();
        assert!(mutation.set_headers.is_empty());
        assert!(mutation.remove_headers.is_empty());
        assert!(response.body_mutation.is_none());
        assert!(!response.clear_route_cache);
    }

    #[test]
    fn test_body_and_status() {
        let mut builder = MutationBuilder::new();
        builder
            .set_body_replacement("new body")
            .set_status(StatusDirective::ContinueAndReplace)
            .set_clear_route_cache(true);
        let response = builder.into_common_response();
        assert_eq!(response.status, ResponseStatus::ContinueAndReplace as i32);
        assert!(response.clear_route_cache);
        assert_eq!(
            response.body_mutation.unwrap().mutation,
            Some(Mutation::Body(b"new body".to_vec()))
        );

        let mut builder = MutationBuilder::new();
        builder.set_body_replacement("x").clear_body();
        assert_eq!(builder.body(), Some(&BodyReplacement::Clear));
    }

    #[test]
    fn test_validate_rejects_bad_key() {
        let mut builder = MutationBuilder::new();
        builder.set_header("x-ok", "1");
        assert!(builder.validate().is_ok());
        builder.set_header("", "1");
        assert!(matches!(builder.validate(), Err(ValidationError::Empty { .. })));
    }
}
