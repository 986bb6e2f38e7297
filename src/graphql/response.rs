//! Execution results and JSON formatting.
//!
//! # Responsibilities
//! - Model the `{data, errors}` envelope returned by the engine
//! - Reshape errors through the optional user callback
//! - Serialize pretty (tab-indented) or compact JSON
//!
//! # Design Decisions
//! - Struct field order fixes key order, so identical input gives identical bytes
//! - `data` is always emitted, `errors` only when non-empty
//! - `<`, `>`, `&`, U+2028 and U+2029 are `\u`-escaped inside strings, so the
//!   bytes match Go's `encoding/json` and stay safe to embed in HTML

use std::io;
use std::sync::Arc;

use axum::body::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::ser::{CompactFormatter, Formatter, PrettyFormatter};
use serde_json::{Map, Value};

use crate::graphql::engine::{ExecutionParams, RequestContext};

/// Reshapes a single error before it is written to the client.
pub type FormatErrorFn = Arc<dyn Fn(FormattedError) -> FormattedError + Send + Sync>;

/// Observes every JSON response after it has been serialized.
pub type ResultObserverFn =
    Arc<dyn Fn(&RequestContext, &ExecutionParams, &ExecutionResult, &[u8]) + Send + Sync>;

/// Result envelope produced by the execution engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FormattedError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Map<String, Value>>,
}

impl ExecutionResult {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Replace each error with `reshape(error)`, keeping order and count.
    pub fn reshape_errors(&mut self, reshape: &dyn Fn(FormattedError) -> FormattedError) {
        if !self.has_errors() {
            return;
        }
        self.errors = std::mem::take(&mut self.errors)
            .into_iter()
            .map(reshape)
            .collect();
    }
}

/// A GraphQL error as it appears in the `errors` array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormattedError {
    pub message: String,
    #[serde(default)]
    pub locations: Vec<Location>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<PathSegment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Map<String, Value>>,
}

impl FormattedError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Field(String),
    Index(usize),
}

/// Error returned when a result cannot be serialized.
#[derive(Debug, thiserror::Error)]
#[error("failed to serialize execution result: {0}")]
pub struct FormatError(#[from] serde_json::Error);

/// Serializes execution results for the JSON response path.
#[derive(Debug, Clone, Copy)]
pub struct ResultFormatter {
    pretty: bool,
}

impl ResultFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    pub fn is_pretty(&self) -> bool {
        self.pretty
    }

    /// Apply the error reshaper (if any) and serialize.
    pub fn format(
        &self,
        result: &mut ExecutionResult,
        reshape: Option<&FormatErrorFn>,
    ) -> Result<Bytes, FormatError> {
        if let Some(reshape) = reshape {
            result.reshape_errors(reshape.as_ref());
        }
        self.serialize(result)
    }

    pub fn serialize(&self, result: &ExecutionResult) -> Result<Bytes, FormatError> {
        let mut buf = Vec::with_capacity(256);
        if self.pretty {
            let formatter = HtmlSafe(PrettyFormatter::with_indent(b"\t"));
            result.serialize(&mut serde_json::Serializer::with_formatter(&mut buf, formatter))?;
        } else {
            let formatter = HtmlSafe(CompactFormatter);
            result.serialize(&mut serde_json::Serializer::with_formatter(&mut buf, formatter))?;
        }
        Ok(Bytes::from(buf))
    }
}

/// Wraps a formatter and escapes HTML-significant characters in strings.
struct HtmlSafe<F>(F);

impl<F: Formatter> Formatter for HtmlSafe<F> {
    fn write_string_fragment<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        fragment: &str,
    ) -> io::Result<()> {
        let bytes = fragment.as_bytes();
        let mut start = 0;
        for (idx, c) in fragment.char_indices() {
            let escaped = match c {
                '<' => "\\u003c",
                '>' => "\\u003e",
                '&' => "\\u0026",
                '\u{2028}' => "\\u2028",
                '\u{2029}' => "\\u2029",
                _ => continue,
            };
            writer.write_all(&bytes[start..idx])?;
            writer.write_all(escaped.as_bytes())?;
            start = idx + c.len_utf8();
        }
        writer.write_all(&bytes[start..])
    }

    fn begin_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.begin_array(writer)
    }

    fn end_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_array(writer)
    }

    fn begin_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        self.0.begin_array_value(writer, first)
    }

    fn end_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_array_value(writer)
    }

    fn begin_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.begin_object(writer)
    }

    fn end_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_object(writer)
    }

    fn begin_object_key<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        self.0.begin_object_key(writer, first)
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.begin_object_value(writer)
    }

    fn end_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_object_value(writer)
    }
}
