use proc_macro::TokenStream;
use quote::quote;
use syn::spanned::Spanned;

/// Layout options collected from a field's attributes.
#[derive(Default)]
struct FieldAttrs {
    skip: bool,
    fixed_string: Option<usize>,
    prefix_type: Option<syn::Ident>,
}

fn parse_field_attrs(field: &syn::Field, skip_name: &str) -> syn::Result<FieldAttrs> {
    let mut out = FieldAttrs::default();
    for attr in &field.attrs {
        let path = attr.path();
        if path.is_ident(skip_name) {
            out.skip = true;
        } else if path.is_ident("fstring") {
            let nv = attr.meta.require_name_value()?;
            match &nv.value {
                syn::Expr::Lit(syn::ExprLit {
                    lit: syn::Lit::Int(len),
                    ..
                }) => out.fixed_string = Some(len.base10_parse()?),
                other => {
                    return Err(syn::Error::new(
                        other.span(),
                        "expected an integer length for fstring",
                    ));
                }
            }
        } else if path.is_ident("pstring") {
            let list = attr.meta.require_list()?;
            list.parse_nested_meta(|meta| {
                for ty in ["u8", "u16", "u32"] {
                    if meta.path.is_ident(ty) {
                        out.prefix_type = Some(syn::Ident::new(ty, meta.path.span()));
                        return Ok(());
                    }
                }
                Err(meta.error("expected u8, u16 or u32 for pstring"))
            })?;
        }
    }
    Ok(out)
}

fn named_fields(item: &syn::ItemStruct) -> syn::Result<Vec<&syn::Field>> {
    match &item.fields {
        syn::Fields::Named(named) => Ok(named.named.iter().collect()),
        other => Err(syn::Error::new(
            other.span(),
            "records must be structs with named fields",
        )),
    }
}

/// Derives `StructPack` for a record struct.
///
/// * `skip_pack` leaves the field out.
/// * `fstring = <len>` writes a String into a NUL padded field of `len` bytes.
/// * `pstring(u8|u16|u32)` writes a String prefixed by its encoded length.
#[proc_macro_derive(StructPack, attributes(skip_pack, fstring, pstring))]
pub fn struct_pack_derive(input: TokenStream) -> TokenStream {
    let item = syn::parse_macro_input!(input as syn::ItemStruct);
    match expand_pack(&item) {
        Ok(ts) => ts.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

fn expand_pack(item: &syn::ItemStruct) -> syn::Result<proc_macro2::TokenStream> {
    let name = &item.ident;
    let mut stmts = Vec::new();
    for field in named_fields(item)? {
        let attrs = parse_field_attrs(field, "skip_pack")?;
        if attrs.skip {
            continue;
        }
        let ident = &field.ident;
        let stmt = if let Some(len) = attrs.fixed_string {
            quote! {
                crate::ext::io::WriteExt::write_fstring(writer, &self.#ident, #len, encoding)?;
            }
        } else if let Some(prefix) = attrs.prefix_type {
            quote! {
                let encoded = crate::utils::encoding::encode_string(encoding, &self.#ident, true)?;
                let len = #prefix::try_from(encoded.len()).map_err(|_| {
                    crate::error::ArcError::implausible(stringify!(#ident), encoded.len() as u64)
                })?;
                crate::utils::struct_pack::StructPack::pack(&len, writer, endian, encoding)?;
                writer.write_all(&encoded)?;
            }
        } else {
            quote! {
                crate::utils::struct_pack::StructPack::pack(&self.#ident, writer, endian, encoding)?;
            }
        };
        stmts.push(stmt);
    }
    Ok(quote! {
        impl crate::utils::struct_pack::StructPack for #name {
            fn pack<W: std::io::Write>(
                &self,
                writer: &mut W,
                endian: crate::types::Endian,
                encoding: crate::types::Encoding,
            ) -> Result<(), crate::error::ArcError> {
                #(#stmts)*
                Ok(())
            }
        }
    })
}

/// Derives `StructUnpack` for a record struct.
///
/// * `skip_unpack` fills the field with `Default::default()`.
/// * `fstring = <len>` reads a NUL padded String field of `len` bytes.
/// * `pstring(u8|u16|u32)` reads a String prefixed by its encoded length.
#[proc_macro_derive(StructUnpack, attributes(skip_unpack, fstring, pstring))]
pub fn struct_unpack_derive(input: TokenStream) -> TokenStream {
    let item = syn::parse_macro_input!(input as syn::ItemStruct);
    match expand_unpack(&item) {
        Ok(ts) => ts.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

fn expand_unpack(item: &syn::ItemStruct) -> syn::Result<proc_macro2::TokenStream> {
    let name = &item.ident;
    let mut stmts = Vec::new();
    let mut idents = Vec::new();
    for field in named_fields(item)? {
        let attrs = parse_field_attrs(field, "skip_unpack")?;
        let ident = &field.ident;
        let ty = &field.ty;
        idents.push(ident.clone());
        let stmt = if attrs.skip {
            quote! { let #ident = Default::default(); }
        } else if let Some(len) = attrs.fixed_string {
            quote! {
                let #ident = crate::ext::io::ReadExt::read_fstring(reader, #len, encoding, true)?;
            }
        } else if let Some(prefix) = attrs.prefix_type {
            quote! {
                let len = <#prefix as crate::utils::struct_pack::StructUnpack>::unpack(reader, endian, encoding)? as usize;
                let raw = crate::ext::io::ReadExt::read_exact_vec(reader, len)?;
                let #ident = crate::utils::encoding::decode_to_string(encoding, &raw)?;
            }
        } else {
            quote! {
                let #ident = <#ty as crate::utils::struct_pack::StructUnpack>::unpack(reader, endian, encoding)?;
            }
        };
        stmts.push(stmt);
    }
    Ok(quote! {
        impl crate::utils::struct_pack::StructUnpack for #name {
            fn unpack<R: std::io::Read>(
                reader: &mut R,
                endian: crate::types::Endian,
                encoding: crate::types::Encoding,
            ) -> Result<Self, crate::error::ArcError> {
                #(#stmts)*
                Ok(Self { #(#idents),* })
            }
        }
    })
}

/// Implements `StructPack` and `StructUnpack` for a primitive number type.
#[proc_macro]
pub fn struct_pack_impl_for_num(item: TokenStream) -> TokenStream {
    let i = syn::parse_macro_input!(item as syn::Ident);
    let output = quote! {
        impl StructUnpack for #i {
            fn unpack<R: std::io::Read>(reader: &mut R, endian: Endian, _encoding: Encoding) -> Result<Self, ArcError> {
                let mut buf = [0u8; std::mem::size_of::<#i>()];
                reader.read_exact(&mut buf)?;
                Ok(match endian {
                    Endian::Big => #i::from_be_bytes(buf),
                    Endian::Little => #i::from_le_bytes(buf),
                })
            }
        }

        impl StructPack for #i {
            fn pack<W: std::io::Write>(&self, writer: &mut W, endian: Endian, _encoding: Encoding) -> Result<(), ArcError> {
                let bytes = match endian {
                    Endian::Big => self.to_be_bytes(),
                    Endian::Little => self.to_le_bytes(),
                };
                writer.write_all(&bytes)?;
                Ok(())
            }
        }
    };
    output.into()
}
