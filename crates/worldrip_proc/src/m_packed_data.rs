use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Attribute, Data, DeriveInput, Lit, Meta, NestedMeta};

pub fn packed_data_derive(input: TokenStream) -> TokenStream {
    let parsed = parse_macro_input!(input as DeriveInput);
    let name = parsed.ident;

    let data = match parsed.data {
        Data::Struct(data) => data,
        _ => {
            return syn::Error::new(name.span(), "PackedData can only be derived for structs")
                .to_compile_error()
                .into()
        }
    };

    let declared_size = match find_declared_size(&parsed.attrs) {
        Ok(size) => size,
        Err(e) => return e.to_compile_error().into(),
    };

    let mut initializers = TokenStream2::new();
    let mut writers = TokenStream2::new();
    let mut field_types = Vec::new();

    for field in data.fields {
        let field_name = match field.ident {
            Some(ident) => ident,
            None => {
                return syn::Error::new(name.span(), "tuple structs are not supported")
                    .to_compile_error()
                    .into()
            }
        };
        let field_ty = field.ty;

        initializers.extend(quote! {
            #field_name: <#field_ty as ::worldrip_utils::packed::PackedData>::read_packed(r)? ,
        });

        writers.extend(quote! {
            ::worldrip_utils::packed::PackedData::write_packed(&self.#field_name, w)?;
        });

        field_types.push(field_ty);
    }

    // Every field type used in records (integers, floats, byte arrays, colors) has the same
    // in-memory and packed size, so the layout size can be verified at compile time.
    let size_check = declared_size.map(|size| {
        quote! {
            impl #name {
                /// Size of this record in the game's memory layout.
                pub const SIZE: usize = #size;
            }

            const _: () = assert!(
                0 #(+ ::std::mem::size_of::<#field_types>())* == #size,
                "packed record layout doesn't match its declared size",
            );
        }
    });

    quote! {
        impl ::worldrip_utils::packed::PackedData for #name {
            fn read_packed<R: ::std::io::Read>(
                r: &mut R,
            ) -> ::worldrip_utils::AnyResult<Self> {
                Ok(Self {
                    #initializers
                })
            }

            fn write_packed<W: ::std::io::Write>(
                &self,
                w: &mut W,
            ) -> ::worldrip_utils::AnyResult {
                #writers
                Ok(())
            }
        }

        #size_check
    }
    .into()
}

/// Looks for `#[packed(size = N)]` among the attributes.
fn find_declared_size(attrs: &[Attribute]) -> syn::Result<Option<usize>> {
    for attribute in attrs {
        if !attribute.path.is_ident("packed") {
            continue;
        }

        let list = match attribute.parse_meta()? {
            Meta::List(list) => list,
            other => return Err(syn::Error::new_spanned(other, "expected #[packed(size = N)]")),
        };

        for nested in list.nested {
            match nested {
                NestedMeta::Meta(Meta::NameValue(pair)) if pair.path.is_ident("size") => {
                    match pair.lit {
                        Lit::Int(size) => return Ok(Some(size.base10_parse()?)),
                        other => {
                            return Err(syn::Error::new_spanned(other, "size must be an integer"))
                        }
                    }
                }
                other => return Err(syn::Error::new_spanned(other, "unknown packed attribute")),
            }
        }
    }

    Ok(None)
}
