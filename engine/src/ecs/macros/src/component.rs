use proc_macro::TokenStream;
use quote::quote;
use syn::{DeriveInput, parse_macro_input};

/// Options read from `#[component(...)]` attributes.
#[derive(Default)]
struct Options {
    /// The component keeps a secondary index through its `IndexedComponent` impl.
    indexed: bool,
}

fn parse_options(ast: &DeriveInput) -> syn::Result<Options> {
    let mut options = Options::default();
    for attr in ast.attrs.iter().filter(|a| a.path().is_ident("component")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("indexed") {
                options.indexed = true;
                Ok(())
            } else {
                Err(meta.error("unsupported component attribute, expected `indexed`"))
            }
        })?;
    }
    Ok(options)
}

pub fn derive_component(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);

    let options = match parse_options(&ast) {
        Ok(options) => options,
        Err(err) => return err.to_compile_error().into(),
    };

    let struct_name = &ast.ident;
    let (impl_generics, type_generics, where_clause) = ast.generics.split_for_impl();

    // Indexed components hand the registry a factory for their index table.
    let body = if options.indexed {
        quote! {
            fn index_factory() -> ::core::option::Option<::rusty_store::ecs::index::IndexFactory> {
                ::core::option::Option::Some(
                    ::rusty_store::ecs::index::new_index::<Self> as ::rusty_store::ecs::index::IndexFactory,
                )
            }
        }
    } else {
        quote! {}
    };

    TokenStream::from(quote! {
        impl #impl_generics ::rusty_store::ecs::Component for #struct_name #type_generics #where_clause {
            #body
        }
    })
}
