use proc_macro::TokenStream;

use quote::quote;
use syn::{parse_macro_input, ItemFn, ReturnType};

/// Runs the function body on the root coroutine of a fresh registry.
///
/// The registry is torn down when the body returns.
///
/// # Panics
/// If the thread already has a coroutine registry.
#[proc_macro_attribute]
pub fn start(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let item = parse_macro_input!(item as ItemFn);

    let attributes = &item.attrs;
    let visibility = &item.vis;
    let signature = &item.sig;
    let body = &item.block;

    // closures don't inherit the function's return type, `?` in the body needs it spelled out
    let closure = match &signature.output {
        ReturnType::Default => quote! { move || #body },
        ReturnType::Type(_, output) => quote! { move || -> #output #body },
    };

    let result = quote! {
        #(#attributes)*
        #visibility #signature {
            ::fibril::start(#closure).expect("thread already has a coroutine registry")
        }
    };

    result.into()
}
