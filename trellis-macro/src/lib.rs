// Procedural macros for the Trellis framework
// Route attributes register handlers for `Router::discover`, the derive wires
// struct fields from the container.

use proc_macro::TokenStream;

mod injectable;
mod route_validation;
mod routes;

/// Implements `Injectable`, resolving every field from the container.
///
/// Fields marked `#[inject(default)]` are filled with `Default::default()`.
#[proc_macro_derive(Injectable, attributes(inject))]
pub fn injectable_derive(input: TokenStream) -> TokenStream {
    injectable::injectable_derive_impl(input)
}

/// HTTP GET route: `#[get("/users/{id}", name = "users.show")]`
#[proc_macro_attribute]
pub fn get(attr: TokenStream, item: TokenStream) -> TokenStream {
    routes::route_impl(attr, item, "GET")
}

/// HTTP POST route
#[proc_macro_attribute]
pub fn post(attr: TokenStream, item: TokenStream) -> TokenStream {
    routes::route_impl(attr, item, "POST")
}

/// HTTP PUT route
#[proc_macro_attribute]
pub fn put(attr: TokenStream, item: TokenStream) -> TokenStream {
    routes::route_impl(attr, item, "PUT")
}

/// HTTP PATCH route
#[proc_macro_attribute]
pub fn patch(attr: TokenStream, item: TokenStream) -> TokenStream {
    routes::route_impl(attr, item, "PATCH")
}

/// HTTP DELETE route
#[proc_macro_attribute]
pub fn delete(attr: TokenStream, item: TokenStream) -> TokenStream {
    routes::route_impl(attr, item, "DELETE")
}

/// HTTP HEAD route
#[proc_macro_attribute]
pub fn head(attr: TokenStream, item: TokenStream) -> TokenStream {
    routes::route_impl(attr, item, "HEAD")
}

/// HTTP OPTIONS route
#[proc_macro_attribute]
pub fn options(attr: TokenStream, item: TokenStream) -> TokenStream {
    routes::route_impl(attr, item, "OPTIONS")
}

/// Route answering every method
#[proc_macro_attribute]
pub fn any(attr: TokenStream, item: TokenStream) -> TokenStream {
    routes::route_impl(attr, item, "*")
}
