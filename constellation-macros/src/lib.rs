use proc_macro::TokenStream;
use quote::quote;
use syn::{
    parse_macro_input, punctuated::Punctuated, spanned::Spanned, token::Comma, Data, DeriveInput,
    Error, Field, Fields, Ident,
};

/// Derives `crate::output::TableOutputRow` for a struct with named fields.
///
/// Every field becomes a tab-separated column, headers are the uppercased
/// field names. The field marked with `#[name_column]` is printed alone for
/// the `names` output format.
#[proc_macro_derive(TableOutputRow, attributes(name_column))]
pub fn derive_table_output_row(input: TokenStream) -> TokenStream {
    let parsed_input = parse_macro_input!(input as DeriveInput);

    expand_table_output_row(parsed_input)
        .unwrap_or_else(Error::into_compile_error)
        .into()
}

fn expand_table_output_row(input: DeriveInput) -> Result<proc_macro2::TokenStream, Error> {
    let struct_ident = &input.ident;
    let (impl_generics, type_generics, where_clause) = input.generics.split_for_impl();
    let fields = named_fields(&input)?;
    let name_field = name_column_field(fields, input.span())?;
    let header = column_headers(fields);
    let field_names = fields
        .iter()
        .filter_map(|f| f.ident.as_ref())
        .collect::<Vec<_>>();
    let row_format = vec!["{}"; field_names.len()].join("\t");

    Ok(quote! {
        impl #impl_generics crate::output::TableOutputRow for #struct_ident #type_generics #where_clause {
            fn print_name(&self) {
                ::std::println!("{}", self.#name_field);
            }

            fn print_header() {
                ::std::println!(#header);
            }

            fn print_row(&self) {
                ::std::println!(#row_format, #(self.#field_names),*);
            }
        }
    })
}

fn named_fields(input: &DeriveInput) -> Result<&Punctuated<Field, Comma>, Error> {
    match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => Ok(&fields.named),
            other => Err(Error::new(
                other.span(),
                "TableOutputRow needs a struct with named fields",
            )),
        },
        _ => Err(Error::new(
            input.span(),
            "TableOutputRow can only be derived for structs",
        )),
    }
}

fn column_headers(fields: &Punctuated<Field, Comma>) -> String {
    fields
        .iter()
        .filter_map(|f| f.ident.as_ref())
        .map(|ident| ident.to_string().replace('_', " ").to_uppercase())
        .collect::<Vec<_>>()
        .join("\t")
}

fn name_column_field(
    fields: &Punctuated<Field, Comma>,
    span: proc_macro2::Span,
) -> Result<&Ident, Error> {
    let mut marked = fields.iter().filter(|f| {
        f.attrs
            .iter()
            .any(|a| a.meta.path().is_ident("name_column"))
    });

    let field = marked
        .next()
        .ok_or_else(|| Error::new(span, "one field must be marked with #[name_column]"))?;

    if let Some(duplicate) = marked.next() {
        return Err(Error::new(
            duplicate.span(),
            "only one field can be marked with #[name_column]",
        ));
    }

    field
        .ident
        .as_ref()
        .ok_or_else(|| Error::new(field.span(), "the name column must be a named field"))
}
