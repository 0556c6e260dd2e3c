use proc_macro::TokenStream;
use quote::quote;
use syn::{ItemFn, LitStr, ReturnType, parse_macro_input};

pub fn timer_inner(attr: TokenStream, item: TokenStream) -> TokenStream {
    let label = if attr.is_empty() {
        None
    } else {
        Some(parse_macro_input!(attr as LitStr).value())
    };
    let ItemFn {
        attrs,
        vis,
        sig,
        block,
    } = parse_macro_input!(item as ItemFn);

    let fn_name = sig.ident.to_string();
    let label = label.unwrap_or_else(|| fn_name.clone());
    let label_lit = LitStr::new(&label, sig.ident.span());
    let name_lit = LitStr::new(&fn_name, sig.ident.span());
    let output = &sig.output;

    let result_ty = match output {
        ReturnType::Default => quote! { () },
        ReturnType::Type(_, ty) => quote! { #ty },
    };

    let timed_body = if sig.asyncness.is_some() {
        quote! { async move #block.await }
    } else {
        quote! { (move || #output #block)() }
    };

    let expanded = quote! {
        #(#attrs)*
        #vis #sig {
            let __timer_start = std::time::Instant::now();
            let __timer_result: #result_ty = #timed_body;
            log::debug!(
                "{}: {} took {:.3}s",
                #label_lit,
                #name_lit,
                __timer_start.elapsed().as_secs_f64()
            );
            __timer_result
        }
    };

    TokenStream::from(expanded)
}
