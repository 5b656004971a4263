//! Fixed-layout record (de)serialisation.
//!
//! Records derive [`StructPack`]/[`StructUnpack`] through `gamearc_macro`;
//! primitive numbers honour the [`Endian`] passed in by the caller.
use crate::error::ArcError;
use crate::types::{Encoding, Endian};
use gamearc_macro::struct_pack_impl_for_num;

pub trait StructUnpack: Sized {
    fn unpack<R: std::io::Read>(
        reader: &mut R,
        endian: Endian,
        encoding: Encoding,
    ) -> Result<Self, ArcError>;
}

pub trait StructPack {
    fn pack<W: std::io::Write>(
        &self,
        writer: &mut W,
        endian: Endian,
        encoding: Encoding,
    ) -> Result<(), ArcError>;
}

impl<T: StructPack> StructPack for Vec<T> {
    fn pack<W: std::io::Write>(
        &self,
        writer: &mut W,
        endian: Endian,
        encoding: Encoding,
    ) -> Result<(), ArcError> {
        for item in self {
            item.pack(writer, endian, encoding)?;
        }
        Ok(())
    }
}

struct_pack_impl_for_num!(u8);
struct_pack_impl_for_num!(u16);
struct_pack_impl_for_num!(u32);
struct_pack_impl_for_num!(u64);
struct_pack_impl_for_num!(i8);
struct_pack_impl_for_num!(i16);
struct_pack_impl_for_num!(i32);
struct_pack_impl_for_num!(i64);
