use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{parse_macro_input, spanned::Spanned, FnArg, Ident, ItemFn, Pat, Signature, Type};

/// The store a test's fixture is seeded into.
enum Backend {
    Memory,
    Mongo,
}

/// Transform an asynchronous test into a synchronous one running on a
/// multi-threaded runtime, and inject dependencies.
///
/// Injectable dependencies are `crate::testing::Fixture`, a freshly seeded
/// store with its services, and [`rocket::local::asynchronous::Client`], a
/// local client for a server over that same fixture.
///
/// `#[backend_test]` seeds an in-memory store. `#[backend_test(mongo)]` seeds
/// a fresh database on the deployment named by
/// `crate::testing::TEST_DB_URI_VAR`, drops it once the test is over, and
/// skips the test if the variable is unset.
#[proc_macro_attribute]
pub fn backend_test(args: TokenStream, input: TokenStream) -> TokenStream {
    let backend = if args.is_empty() {
        Backend::Memory
    } else {
        match syn::parse::<Ident>(args) {
            Ok(ident) if ident == "mongo" => Backend::Mongo,
            Ok(ident) => {
                return syn::Error::new(ident.span(), "Expected no backend or `mongo`")
                    .into_compile_error()
                    .into();
            }
            Err(err) => return err.into_compile_error().into(),
        }
    };
    let mut item_fn = parse_macro_input!(input as ItemFn);

    // Extract the injected arguments and reject invalid function signatures.
    let (test_args, needs_client, needs_fixture) = match check_sig(item_fn.sig.clone()) {
        Ok(args) => args,
        Err(err) => {
            return err.into_compile_error().into();
        }
    };

    // Rename the future so the test can have its original name.
    let name = item_fn.sig.ident.clone();
    let new_name = format_ident!("{}_fut", name);
    item_fn.sig.ident = new_name.clone();

    let maybe_client = if needs_client {
        quote! {
            let rocket_client = fixture.client().await;
        }
    } else {
        TokenStream2::new()
    };
    let maybe_drop_fixture = if needs_fixture {
        TokenStream2::new()
    } else {
        quote! {
            drop(fixture);
        }
    };

    let run = match backend {
        Backend::Memory => quote! {
            let fixture = crate::testing::Fixture::new().await;
            #maybe_client
            #maybe_drop_fixture
            #new_name(#(#test_args),*).await;
        },
        Backend::Mongo => quote! {
            let db = match crate::testing::test_database().await {
                Some(db) => db,
                None => {
                    eprintln!(
                        "Skipping {}: {} is not set",
                        stringify!(#name),
                        crate::testing::TEST_DB_URI_VAR,
                    );
                    return;
                }
            };
            let fixture = crate::testing::Fixture::mongo(db.clone()).await;
            #maybe_client
            #maybe_drop_fixture

            // Run the test on its own task, so the database is dropped even
            // if it fails.
            let outcome = rocket::tokio::spawn(#new_name(#(#test_args),*)).await;
            db.drop(None).await.expect("Failed to drop the test database");
            if let Err(err) = outcome {
                if err.is_panic() {
                    std::panic::resume_unwind(err.into_panic());
                }
                panic!("{err}");
            }
        },
    };

    // Rewrite the test function.
    quote! {
        #[test]
        fn #name() {
            /// The test itself.
            #item_fn

            let runtime = rocket::tokio::runtime::Builder::new_multi_thread()
                .thread_name("rocket-worker-test-thread")
                .worker_threads(4)
                .enable_all()
                .build()
                .unwrap();

            runtime.block_on(async {
                #run
            });
        }
    }
    .into()
}

/// Ensure the wrapped test is async, extract parameters to inject, and reject unknown parameters.
fn check_sig(sig: Signature) -> Result<(Vec<TokenStream2>, bool, bool), syn::Error> {
    if sig.asyncness.is_none() {
        return Err(syn::Error::new(sig.span(), "Test must be marked `async`"));
    }

    let mut has_client = false;
    let mut has_fixture = false;
    let mut args = vec![];

    for input in &sig.inputs {
        if let FnArg::Typed(pat_type) = input {
            if let (Pat::Ident(_), Type::Path(type_path)) = (&*pat_type.pat, &*pat_type.ty) {
                if let Some(type_ident) = type_path.path.segments.last().map(|s| &s.ident) {
                    if type_ident == "Client" {
                        if has_client {
                            return Err(syn::Error::new(
                                input.span(),
                                "Test cannot accept more than one `rocket::local::asynchronous::Client`",
                            ));
                        }
                        has_client = true;
                        args.push(quote! { rocket_client });
                        continue;
                    } else if type_ident == "Fixture" {
                        if has_fixture {
                            return Err(syn::Error::new(
                                input.span(),
                                "Test cannot accept more than one `Fixture`",
                            ));
                        }
                        has_fixture = true;
                        args.push(quote! { fixture });
                        continue;
                    }
                }
            }
        }

        return Err(syn::Error::new(
            input.span(),
            "Expected one of `client_ident: Client` or `fixture_ident: Fixture`",
        ));
    }

    Ok((args, has_client, has_fixture))
}
