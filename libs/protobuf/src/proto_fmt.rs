//! Conversion between domain types and `prost` messages.
//!
//! `prost` emits the fields of a message in ascending tag order and skips
//! absent optional fields, so for messages without unknown fields the
//! encoding produced here is deterministic and can be hashed and signed.
use anyhow::Context as _;
use prost::Message as _;

/// Encodes a value through its proto representation.
pub fn encode<T: ProtoFmt>(x: &T) -> Vec<u8> {
    x.build().encode_to_vec()
}

/// Decodes a value through its proto representation.
pub fn decode<T: ProtoFmt>(bytes: &[u8]) -> anyhow::Result<T> {
    T::read(&<T as ProtoFmt>::Proto::decode(bytes)?)
}

/// Trait defining a proto representation for a type.
pub trait ProtoFmt: Sized {
    /// Proto message type representing Self.
    type Proto: prost::Message + Default;
    /// Converts Proto to Self.
    fn read(r: &Self::Proto) -> anyhow::Result<Self>;
    /// Converts Self to Proto.
    fn build(&self) -> Self::Proto;
}

/// Parses a required proto field.
pub fn read_required<T: ProtoFmt>(field: &Option<T::Proto>) -> anyhow::Result<T> {
    ProtoFmt::read(field.as_ref().context("missing field")?)
}

/// Parses an optional proto field.
pub fn read_optional<T: ProtoFmt>(field: &Option<T::Proto>) -> anyhow::Result<Option<T>> {
    field.as_ref().map(ProtoFmt::read).transpose()
}

/// Parses every element of a repeated proto field, annotating failures with the index.
pub fn read_repeated<T: ProtoFmt>(items: &[T::Proto]) -> anyhow::Result<Vec<T>> {
    items
        .iter()
        .enumerate()
        .map(|(i, x)| T::read(x).with_context(|| format!("[{i}]")))
        .collect()
}

/// Extracts a required field.
pub fn required<T>(field: &Option<T>) -> anyhow::Result<&T> {
    field.as_ref().context("missing")
}
