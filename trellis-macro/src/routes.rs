use crate::route_validation::validate_route_path;
use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::parse::{Parse, ParseStream};
use syn::{FnArg, Ident, ItemFn, LitInt, LitStr, Token, parse_macro_input};

/// `"/path"` followed by optional `name = "..."` and `priority = N`.
struct RouteArgs {
    path: LitStr,
    name: Option<LitStr>,
    priority: Option<LitInt>,
}

impl Parse for RouteArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let path: LitStr = input.parse()?;
        let mut name = None;
        let mut priority = None;

        while !input.is_empty() {
            input.parse::<Token![,]>()?;
            if input.is_empty() {
                break;
            }
            let key: Ident = input.parse()?;
            input.parse::<Token![=]>()?;
            match key.to_string().as_str() {
                "name" => name = Some(input.parse::<LitStr>()?),
                "priority" => priority = Some(input.parse::<LitInt>()?),
                other => {
                    return Err(syn::Error::new(
                        key.span(),
                        format!("unknown route option '{}', expected `name` or `priority`", other),
                    ));
                }
            }
        }

        Ok(Self {
            path,
            name,
            priority,
        })
    }
}

pub fn route_impl(attr: TokenStream, item: TokenStream, method: &str) -> TokenStream {
    let args = parse_macro_input!(attr as RouteArgs);
    let input = parse_macro_input!(item as ItemFn);
    let func_name = &input.sig.ident;

    if let Some(FnArg::Receiver(receiver)) = input.sig.inputs.first() {
        return syn::Error::new_spanned(
            receiver,
            "route handlers must be free functions; resolve services through parameters instead of `self`",
        )
        .to_compile_error()
        .into();
    }
    if !input.sig.generics.params.is_empty() {
        return syn::Error::new_spanned(&input.sig.generics, "route handlers cannot be generic")
            .to_compile_error()
            .into();
    }

    let path_value = args.path.value();
    if let Err(err) = validate_route_path(&path_value, args.path.span()) {
        return err.to_compile_error().into();
    }

    let endpoint = if input.sig.asyncness.is_some() {
        quote! { #func_name }
    } else {
        quote! { ::trellis_core::Endpoint::sync(#func_name) }
    };
    let name = args.name.map(|name| quote! { .name(#name) });
    let priority = args.priority.map(|priority| quote! { .priority(#priority) });
    let register_fn = format_ident!("__trellis_register_{}", func_name);
    let handler_name = func_name.to_string();

    let expanded = quote! {
        #input

        #[doc(hidden)]
        #[allow(non_snake_case)]
        fn #register_fn(router: &mut ::trellis_core::Router) -> ::trellis_core::Result<()> {
            let route = ::trellis_core::Route::new([#method], #path_value, #endpoint) #name #priority;
            router.add(route)?;
            Ok(())
        }

        ::trellis_core::register_route!(#method, #path_value, #handler_name, #register_fn);
    };

    TokenStream::from(expanded)
}
