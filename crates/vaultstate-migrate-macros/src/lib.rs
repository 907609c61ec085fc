//! Proc macros for `vaultstate-migrate`.
//!
//! - **`#[migration]`** wraps an in-place function into a modern step.
//! - **`#[legacy_migration]`** wraps a replacement-returning function into a
//!   legacy step.
//!
//! Both stamp `meta.version` for you and generate a `register_<fn>` helper
//! returning a `vaultstate_migrate::MigrationStep`.

use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::{parse_macro_input, punctuated::Punctuated, token::Comma, Ident, ItemFn, Meta};

/// Wrap an in-place migration function into a modern step.
///
/// # Attributes
///
/// - `version = N` (required): The version the step brings state to.
///
/// The function must take `(&mut PersistedState, &mut ChangeSet)` and return
/// `Result<(), StepError>`. The version is stamped before the body runs, so
/// the body only has to transform controllers and report them.
///
/// # Example
///
/// ```ignore
/// use vaultstate_migrate::{migration, ChangeSet, PersistedState, StepError};
///
/// #[migration(version = 187)]
/// fn drop_cached_balances(
///     state: &mut PersistedState,
///     changed: &mut ChangeSet,
/// ) -> Result<(), StepError> {
///     if let Some(map) = state.controllers_mut() {
///         map.remove("CachedBalancesController");
///         changed.insert("CachedBalancesController");
///     }
///     Ok(())
/// }
/// // Generates: DropCachedBalancesMigration + impl Migration
/// // Generates: fn register_drop_cached_balances() -> MigrationStep
/// ```
#[proc_macro_attribute]
pub fn migration(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);
    let args = parse_macro_input!(attr with Punctuated::<Meta, Comma>::parse_terminated);

    let version = match parse_version(&args) {
        Ok(v) => v,
        Err(e) => return e.to_compile_error().into(),
    };
    if input.sig.inputs.len() != 2 {
        return syn::Error::new_spanned(
            &input.sig,
            "#[migration] functions take (&mut PersistedState, &mut ChangeSet)",
        )
        .to_compile_error()
        .into();
    }

    let vis = &input.vis;
    let fn_name = &input.sig.ident;
    let struct_name = step_struct_name(fn_name);
    let register_fn = Ident::new(&format!("register_{fn_name}"), fn_name.span());

    let expanded = quote! {
        #input

        /// Generated modern migration step.
        #vis struct #struct_name;

        impl vaultstate_migrate::Migration for #struct_name {
            fn version(&self) -> u32 {
                #version
            }

            fn migrate(
                &self,
                state: &mut vaultstate_migrate::PersistedState,
                changed: &mut vaultstate_migrate::ChangeSet,
            ) -> ::core::result::Result<(), vaultstate_migrate::StepError> {
                state.set_version(#version);
                #fn_name(state, changed)
            }
        }

        /// Build this step for a `MigrationRegistry`.
        #vis fn #register_fn() -> vaultstate_migrate::MigrationStep {
            vaultstate_migrate::MigrationStep::modern(#struct_name)
        }
    };

    expanded.into()
}

/// Wrap a replacement-returning migration function into a legacy step.
///
/// # Attributes
///
/// - `version = N` (required): The version the step brings state to.
///
/// The function must take `PersistedState` by value and return
/// `Result<PersistedState, StepError>`. The returned state is stamped with the
/// version after the body runs.
///
/// # Example
///
/// ```ignore
/// use vaultstate_migrate::{legacy_migration, PersistedState, StepError};
///
/// #[legacy_migration(version = 54)]
/// fn retype_decimals(state: PersistedState) -> Result<PersistedState, StepError> {
///     Ok(state)
/// }
/// // Generates: RetypeDecimalsMigration + impl LegacyMigration
/// // Generates: fn register_retype_decimals() -> MigrationStep
/// ```
#[proc_macro_attribute]
pub fn legacy_migration(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);
    let args = parse_macro_input!(attr with Punctuated::<Meta, Comma>::parse_terminated);

    let version = match parse_version(&args) {
        Ok(v) => v,
        Err(e) => return e.to_compile_error().into(),
    };
    if input.sig.inputs.len() != 1 {
        return syn::Error::new_spanned(
            &input.sig,
            "#[legacy_migration] functions take a single PersistedState",
        )
        .to_compile_error()
        .into();
    }
    if let syn::ReturnType::Default = input.sig.output {
        return syn::Error::new_spanned(
            &input.sig,
            "#[legacy_migration] functions must return Result<PersistedState, StepError>",
        )
        .to_compile_error()
        .into();
    }

    let vis = &input.vis;
    let fn_name = &input.sig.ident;
    let struct_name = step_struct_name(fn_name);
    let register_fn = Ident::new(&format!("register_{fn_name}"), fn_name.span());

    let expanded = quote! {
        #input

        /// Generated legacy migration step.
        #vis struct #struct_name;

        impl vaultstate_migrate::LegacyMigration for #struct_name {
            fn version(&self) -> u32 {
                #version
            }

            fn migrate(
                &self,
                state: vaultstate_migrate::PersistedState,
            ) -> ::core::result::Result<vaultstate_migrate::PersistedState, vaultstate_migrate::StepError> {
                let mut next = #fn_name(state)?;
                next.set_version(#version);
                Ok(next)
            }
        }

        /// Build this step for a `MigrationRegistry`.
        #vis fn #register_fn() -> vaultstate_migrate::MigrationStep {
            vaultstate_migrate::MigrationStep::legacy(#struct_name)
        }
    };

    expanded.into()
}

fn parse_version(args: &Punctuated<Meta, Comma>) -> syn::Result<u32> {
    let mut version: Option<u32> = None;

    for meta in args {
        let Meta::NameValue(nv) = meta else {
            return Err(syn::Error::new_spanned(meta, "expected `version = N`"));
        };
        let key = nv
            .path
            .get_ident()
            .map(|i| i.to_string())
            .unwrap_or_default();
        match key.as_str() {
            "version" => {
                let syn::Expr::Lit(syn::ExprLit {
                    lit: syn::Lit::Int(lit),
                    ..
                }) = &nv.value
                else {
                    return Err(syn::Error::new_spanned(
                        &nv.value,
                        "`version` must be an integer literal",
                    ));
                };
                version = Some(lit.base10_parse()?);
            }
            _ => {
                return Err(syn::Error::new_spanned(
                    &nv.path,
                    format!("unknown attribute `{key}`"),
                ));
            }
        }
    }

    version.ok_or_else(|| syn::Error::new(Span::call_site(), "missing required attribute `version`"))
}

/// `snake_case` function name to `PascalCaseMigration`.
fn step_struct_name(fn_name: &Ident) -> Ident {
    let pascal: String = fn_name
        .to_string()
        .split('_')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect();
    Ident::new(&format!("{pascal}Migration"), fn_name.span())
}
