//! Literal embedding: data values to Python literal source text.
//!
//! [`embed`] drives any `Serialize` value through a type-directed writer
//! that only ever emits literal syntax: quoted strings, numbers,
//! `True`/`False`/`None`, lists and dicts. Nothing is round-tripped through
//! an interchange format or an evaluator, so no substring of the data can
//! become executable source.
//!
//! Output is pure printable ASCII. Map keys are always emitted in the order
//! the value serializes them, which for `serde_json::Map` and `BTreeMap` is
//! sorted order; embedding is therefore deterministic.

use std::fmt::{Display, Write as _};

use serde::ser::{self, Serialize};

/// Nesting limit; guards against pathological or self-referential values.
pub const MAX_DEPTH: usize = 128;

/// Raised for values outside the literal closure (scalars, sequences,
/// string-keyed mappings).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EmbedError {
    #[error("unsupported value type: {0}")]
    Unsupported(&'static str),

    #[error("non-finite float {0} has no literal form")]
    NonFiniteFloat(String),

    #[error("mapping key must be a string, got {0}")]
    NonStringKey(String),

    #[error("value nested deeper than {MAX_DEPTH} levels")]
    TooDeep,

    #[error("{0}")]
    Custom(String),
}

impl ser::Error for EmbedError {
    fn custom<T: Display>(msg: T) -> Self {
        EmbedError::Custom(msg.to_string())
    }
}

/// Render `value` as a Python literal expression.
pub fn embed<T: ?Sized + Serialize>(value: &T) -> Result<String, EmbedError> {
    let mut writer = LiteralWriter::default();
    value.serialize(&mut writer)?;
    Ok(writer.output)
}

/// Append `s` as a double-quoted, fully escaped Python string literal.
pub fn write_str_literal(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            ' '..='~' => out.push(c),
            c if (c as u32) < 0x100 => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c if (c as u32) < 0x1_0000 => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => {
                let _ = write!(out, "\\U{:08x}", c as u32);
            }
        }
    }
    out.push('"');
}

/// Streaming Python-literal writer.
#[derive(Debug, Default)]
pub struct LiteralWriter {
    output: String,
    depth: usize,
}

impl LiteralWriter {
    fn open(&mut self, delim: &str) -> Result<(), EmbedError> {
        if self.depth >= MAX_DEPTH {
            return Err(EmbedError::TooDeep);
        }
        self.depth += 1;
        self.output.push_str(delim);
        Ok(())
    }

    fn close(&mut self, delim: &str) {
        self.depth = self.depth.saturating_sub(1);
        self.output.push_str(delim);
    }

    fn write_float(&mut self, v: f64) -> Result<(), EmbedError> {
        if !v.is_finite() {
            return Err(EmbedError::NonFiniteFloat(v.to_string()));
        }
        // Debug always yields a float spelling ("1.0", "1e-7", "1e21").
        let _ = write!(self.output, "{v:?}");
        Ok(())
    }

    fn open_variant(&mut self, variant: &str, delim: &str) -> Result<(), EmbedError> {
        self.open("{")?;
        write_str_literal(&mut self.output, variant);
        self.output.push_str(": ");
        self.open(delim)
    }
}

/// Shared state for every compound form (lists, dicts, variants).
pub struct Compound<'a> {
    writer: &'a mut LiteralWriter,
    first: bool,
    closers: &'static [&'static str],
}

impl<'a> Compound<'a> {
    fn new(writer: &'a mut LiteralWriter, closers: &'static [&'static str]) -> Self {
        Self {
            writer,
            first: true,
            closers,
        }
    }

    fn separator(&mut self) {
        if !self.first {
            self.writer.output.push_str(", ");
        }
        self.first = false;
    }

    fn element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), EmbedError> {
        self.separator();
        value.serialize(&mut *self.writer)
    }

    fn key<T: ?Sized + Serialize>(&mut self, key: &T) -> Result<(), EmbedError> {
        self.separator();
        let rendered = embed_nested(key, self.writer.depth)?;
        if !rendered.starts_with('"') {
            return Err(EmbedError::NonStringKey(rendered));
        }
        self.writer.output.push_str(&rendered);
        self.writer.output.push_str(": ");
        Ok(())
    }

    fn value<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), EmbedError> {
        value.serialize(&mut *self.writer)
    }

    fn field<T: ?Sized + Serialize>(&mut self, name: &str, value: &T) -> Result<(), EmbedError> {
        self.separator();
        write_str_literal(&mut self.writer.output, name);
        self.writer.output.push_str(": ");
        value.serialize(&mut *self.writer)
    }

    fn finish(self) -> Result<(), EmbedError> {
        for closer in self.closers {
            self.writer.close(closer);
        }
        Ok(())
    }
}

fn embed_nested<T: ?Sized + Serialize>(value: &T, depth: usize) -> Result<String, EmbedError> {
    let mut writer = LiteralWriter {
        output: String::new(),
        depth,
    };
    value.serialize(&mut writer)?;
    Ok(writer.output)
}

impl<'a> ser::Serializer for &'a mut LiteralWriter {
    type Ok = ();
    type Error = EmbedError;

    type SerializeSeq = Compound<'a>;
    type SerializeTuple = Compound<'a>;
    type SerializeTupleStruct = Compound<'a>;
    type SerializeTupleVariant = Compound<'a>;
    type SerializeMap = Compound<'a>;
    type SerializeStruct = Compound<'a>;
    type SerializeStructVariant = Compound<'a>;

    fn serialize_bool(self, v: bool) -> Result<(), EmbedError> {
        self.output.push_str(if v { "True" } else { "False" });
        Ok(())
    }

    fn serialize_i8(self, v: i8) -> Result<(), EmbedError> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_i16(self, v: i16) -> Result<(), EmbedError> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_i32(self, v: i32) -> Result<(), EmbedError> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_i64(self, v: i64) -> Result<(), EmbedError> {
        let _ = write!(self.output, "{v}");
        Ok(())
    }

    fn serialize_i128(self, v: i128) -> Result<(), EmbedError> {
        let _ = write!(self.output, "{v}");
        Ok(())
    }

    fn serialize_u8(self, v: u8) -> Result<(), EmbedError> {
        self.serialize_u64(u64::from(v))
    }

    fn serialize_u16(self, v: u16) -> Result<(), EmbedError> {
        self.serialize_u64(u64::from(v))
    }

    fn serialize_u32(self, v: u32) -> Result<(), EmbedError> {
        self.serialize_u64(u64::from(v))
    }

    fn serialize_u64(self, v: u64) -> Result<(), EmbedError> {
        let _ = write!(self.output, "{v}");
        Ok(())
    }

    fn serialize_u128(self, v: u128) -> Result<(), EmbedError> {
        let _ = write!(self.output, "{v}");
        Ok(())
    }

    fn serialize_f32(self, v: f32) -> Result<(), EmbedError> {
        if !v.is_finite() {
            return Err(EmbedError::NonFiniteFloat(v.to_string()));
        }
        let _ = write!(self.output, "{v:?}");
        Ok(())
    }

    fn serialize_f64(self, v: f64) -> Result<(), EmbedError> {
        self.write_float(v)
    }

    fn serialize_char(self, v: char) -> Result<(), EmbedError> {
        let mut buf = [0u8; 4];
        write_str_literal(&mut self.output, v.encode_utf8(&mut buf));
        Ok(())
    }

    fn serialize_str(self, v: &str) -> Result<(), EmbedError> {
        write_str_literal(&mut self.output, v);
        Ok(())
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<(), EmbedError> {
        Err(EmbedError::Unsupported("bytes"))
    }

    fn serialize_none(self) -> Result<(), EmbedError> {
        self.output.push_str("None");
        Ok(())
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<(), EmbedError> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<(), EmbedError> {
        self.output.push_str("None");
        Ok(())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<(), EmbedError> {
        self.serialize_unit()
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> Result<(), EmbedError> {
        write_str_literal(&mut self.output, variant);
        Ok(())
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<(), EmbedError> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<(), EmbedError> {
        self.open("{")?;
        write_str_literal(&mut self.output, variant);
        self.output.push_str(": ");
        value.serialize(&mut *self)?;
        self.close("}");
        Ok(())
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Compound<'a>, EmbedError> {
        self.open("[")?;
        Ok(Compound::new(self, &["]"]))
    }

    fn serialize_tuple(self, _len: usize) -> Result<Compound<'a>, EmbedError> {
        self.open("[")?;
        Ok(Compound::new(self, &["]"]))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Compound<'a>, EmbedError> {
        self.open("[")?;
        Ok(Compound::new(self, &["]"]))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Compound<'a>, EmbedError> {
        self.open_variant(variant, "[")?;
        Ok(Compound::new(self, &["]", "}"]))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Compound<'a>, EmbedError> {
        self.open("{")?;
        Ok(Compound::new(self, &["}"]))
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Compound<'a>, EmbedError> {
        self.open("{")?;
        Ok(Compound::new(self, &["}"]))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Compound<'a>, EmbedError> {
        self.open_variant(variant, "{")?;
        Ok(Compound::new(self, &["}", "}"]))
    }
}

impl ser::SerializeSeq for Compound<'_> {
    type Ok = ();
    type Error = EmbedError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), EmbedError> {
        self.element(value)
    }

    fn end(self) -> Result<(), EmbedError> {
        self.finish()
    }
}

impl ser::SerializeTuple for Compound<'_> {
    type Ok = ();
    type Error = EmbedError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), EmbedError> {
        self.element(value)
    }

    fn end(self) -> Result<(), EmbedError> {
        self.finish()
    }
}

impl ser::SerializeTupleStruct for Compound<'_> {
    type Ok = ();
    type Error = EmbedError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), EmbedError> {
        self.element(value)
    }

    fn end(self) -> Result<(), EmbedError> {
        self.finish()
    }
}

impl ser::SerializeTupleVariant for Compound<'_> {
    type Ok = ();
    type Error = EmbedError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), EmbedError> {
        self.element(value)
    }

    fn end(self) -> Result<(), EmbedError> {
        self.finish()
    }
}

impl ser::SerializeMap for Compound<'_> {
    type Ok = ();
    type Error = EmbedError;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Result<(), EmbedError> {
        self.key(key)
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), EmbedError> {
        self.value(value)
    }

    fn end(self) -> Result<(), EmbedError> {
        self.finish()
    }
}

impl ser::SerializeStruct for Compound<'_> {
    type Ok = ();
    type Error = EmbedError;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), EmbedError> {
        self.field(key, value)
    }

    fn end(self) -> Result<(), EmbedError> {
        self.finish()
    }
}

impl ser::SerializeStructVariant for Compound<'_> {
    type Ok = ();
    type Error = EmbedError;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), EmbedError> {
        self.field(key, value)
    }

    fn end(self) -> Result<(), EmbedError> {
        self.finish()
    }
}
