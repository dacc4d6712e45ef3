use proc_macro::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Field, Fields, parse_macro_input};

/// True for `#[inject(default)]`.
fn is_default(field: &Field) -> syn::Result<bool> {
    let mut default = false;
    for attr in field.attrs.iter().filter(|a| a.path().is_ident("inject")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("default") {
                default = true;
                Ok(())
            } else {
                Err(meta.error("expected `default`"))
            }
        })?;
    }
    Ok(default)
}

fn field_value(field: &Field) -> syn::Result<proc_macro2::TokenStream> {
    let ty = &field.ty;
    if is_default(field)? {
        return Ok(quote! { ::core::default::Default::default() });
    }
    Ok(quote! {
        <#ty as ::trellis_core::Dependency>::extract(resolver, &mut __args).await?
    })
}

pub fn injectable_derive_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let struct_name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let Data::Struct(data) = &input.data else {
        return syn::Error::new_spanned(struct_name, "Injectable can only be derived for structs")
            .to_compile_error()
            .into();
    };

    let construct = match &data.fields {
        Fields::Named(fields) => {
            let mut inits = Vec::new();
            for field in &fields.named {
                let ident = &field.ident;
                match field_value(field) {
                    Ok(value) => inits.push(quote! { #ident: #value }),
                    Err(err) => return err.to_compile_error().into(),
                }
            }
            quote! { Self { #(#inits),* } }
        }
        Fields::Unnamed(fields) => {
            let mut values = Vec::new();
            for field in &fields.unnamed {
                match field_value(field) {
                    Ok(value) => values.push(value),
                    Err(err) => return err.to_compile_error().into(),
                }
            }
            quote! { Self(#(#values),*) }
        }
        Fields::Unit => quote! { Self },
    };

    let expanded = quote! {
        #[::trellis_core::async_trait]
        impl #impl_generics ::trellis_core::Injectable for #struct_name #ty_generics #where_clause {
            #[allow(unused_mut, unused_variables)]
            async fn inject(resolver: &::trellis_core::Resolver) -> ::trellis_core::Result<Self> {
                let mut __args = ::trellis_core::Arguments::new();
                Ok(#construct)
            }
        }
    };

    TokenStream::from(expanded)
}
