use proc_macro::TokenStream;

mod m_packed_data;

/// Implements the [`worldrip_utils::packed::PackedData`] trait on a fixed-layout record struct.
///
/// All fields must implement `PackedData`. The generated implementation reads and writes struct
/// fields in order of definition, with no padding between them. Padding that exists in the
/// game's layout has to be declared as a `Padding<N>` field, and the size of the whole record can
/// be checked with `#[packed(size = N)]`, which emits a `SIZE` constant and fails compilation if
/// the fields don't add up to it.
///
/// *(Note, at the moment tuple structs and enums are not supported)*
#[proc_macro_derive(PackedData, attributes(packed))]
pub fn packed_data_derive(input: TokenStream) -> TokenStream {
    m_packed_data::packed_data_derive(input)
}
