//! Lowering of Rust source (`syn` trees) into the language-neutral source model.
//!
//! - traits become capabilities (methods with a `self` receiver are its operations)
//! - named-field structs become records, with serde attributes folded into a tag
//! - methods in `impl` blocks become functions with a receiver
//! - inline `mod` bodies are flattened in place
use quote::ToTokens;
use syn::punctuated::Punctuated;

use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::model::{CapabilityDecl, Decl, FieldDecl, FunctionDecl, Operation, RecordDecl, TypeExpr};

#[derive(Debug, Default)]
pub struct Lowering {
    pub decls: Vec<Decl>,
    pub diagnostics: Vec<Diagnostic>,
}

pub fn lower_source(src: &str) -> syn::Result<Lowering> {
    let file = syn::parse_file(src)?;
    Ok(Lowering::file(&file))
}

impl Lowering {
    pub fn file(file: &syn::File) -> Self {
        let mut lowering = Self::default();
        lowering.items(&file.items);
        lowering
    }

    fn items(&mut self, items: &[syn::Item]) {
        for item in items {
            match item {
                syn::Item::Trait(t) => {
                    self.decls.push(Decl::Capability(lower_trait(t)));
                }
                syn::Item::Struct(s) => {
                    if let Some(record) = self.lower_struct(s) {
                        self.decls.push(Decl::Record(record));
                    }
                }
                syn::Item::Impl(i) => self.lower_impl(i),
                syn::Item::Fn(f) => {
                    self.decls.push(Decl::Function(FunctionDecl {
                        name: f.sig.ident.to_string(),
                        receiver: None,
                        implements: None,
                    }));
                }
                syn::Item::Mod(m) => {
                    if let Some((_, items)) = &m.content {
                        self.items(items);
                    }
                }
                _ => {}
            }
        }
    }

    fn lower_struct(&mut self, item: &syn::ItemStruct) -> Option<RecordDecl> {
        let syn::Fields::Named(named) = &item.fields else {
            return None;
        };
        let name = item.ident.to_string();

        let (serialize, deserialize) = serde_derives(&item.attrs);
        if serialize != deserialize {
            let (has, lacks) = if serialize { ("Serialize", "Deserialize") } else { ("Deserialize", "Serialize") };
            self.diagnostics.push(
                Diagnostic::warning(
                    DiagnosticCode::PJ0210PartialSerdeDerive,
                    format!("derives {has} without {lacks}; treated as deriving serde"),
                )
                .at(&name, None),
            );
        }

        let mut fields = Vec::with_capacity(named.named.len());
        for field in &named.named {
            let Some(ident) = &field.ident else { continue };
            let field_name = ident.to_string();
            let tag = match serde_tag(&field.attrs) {
                Ok(tag) => tag,
                Err(err) => {
                    self.diagnostics.push(
                        Diagnostic::warning(
                            DiagnosticCode::PJ0200UnreadableAttribute,
                            format!("ignoring unreadable #[serde] attribute: {err}"),
                        )
                        .at(&name, Some(field_name.as_str())),
                    );
                    None
                }
            };
            fields.push(FieldDecl { name: field_name, ty: lower_type(&field.ty), tag });
        }

        Some(RecordDecl {
            name,
            type_params: type_params(&item.generics),
            derives_serde: serialize || deserialize,
            fields,
        })
    }

    fn lower_impl(&mut self, item: &syn::ItemImpl) {
        let generic = item
            .generics
            .params
            .iter()
            .any(|p| !matches!(p, syn::GenericParam::Lifetime(_)));
        // `impl dyn C` is an inherent impl on the capability itself, never a variant.
        let self_ty = match &*item.self_ty {
            syn::Type::TraitObject(_) => opaque(&item.self_ty),
            _ if generic => opaque(&item.self_ty),
            ty => lower_type(ty),
        };
        let implements = item
            .trait_
            .as_ref()
            .and_then(|(_, path, _)| path.segments.last())
            .map(|segment| segment.ident.to_string());

        for impl_item in &item.items {
            let syn::ImplItem::Fn(f) = impl_item else { continue };
            self.decls.push(Decl::Function(FunctionDecl {
                name: f.sig.ident.to_string(),
                receiver: f.sig.receiver().map(|_| self_ty.clone()),
                implements: implements.clone(),
            }));
        }
    }
}

fn lower_trait(item: &syn::ItemTrait) -> CapabilityDecl {
    let operations = item
        .items
        .iter()
        .filter_map(|trait_item| match trait_item {
            syn::TraitItem::Fn(f) => lower_operation(f),
            _ => None,
        })
        .collect();
    CapabilityDecl { name: item.ident.to_string(), operations }
}

fn lower_operation(f: &syn::TraitItemFn) -> Option<Operation> {
    f.sig.receiver()?;
    let params = f
        .sig
        .inputs
        .iter()
        .filter_map(|arg| match arg {
            syn::FnArg::Typed(pat_ty) => Some(lower_type(&pat_ty.ty)),
            syn::FnArg::Receiver(_) => None,
        })
        .collect();
    let results = match &f.sig.output {
        syn::ReturnType::Default => Vec::new(),
        syn::ReturnType::Type(_, ty) => match &**ty {
            syn::Type::Tuple(t) => t.elems.iter().map(lower_type).collect(),
            ty => vec![lower_type(ty)],
        },
    };
    let name = f.sig.ident.to_string();
    Some(Operation {
        hidden: name.starts_with('_') || is_doc_hidden(&f.attrs),
        name,
        params,
        results,
        type_params: type_params(&f.sig.generics),
        provided: f.default.is_some(),
    })
}

fn type_params(generics: &syn::Generics) -> Vec<String> {
    generics
        .params
        .iter()
        .filter_map(|p| match p {
            syn::GenericParam::Type(t) => Some(t.ident.to_string()),
            syn::GenericParam::Const(c) => Some(c.ident.to_string()),
            syn::GenericParam::Lifetime(_) => None,
        })
        .collect()
}

fn is_doc_hidden(attrs: &[syn::Attribute]) -> bool {
    attrs.iter().filter(|attr| attr.path().is_ident("doc")).any(|attr| {
        let syn::Meta::List(list) = &attr.meta else { return false };
        list.parse_args_with(Punctuated::<syn::Meta, syn::Token![,]>::parse_terminated)
            .map(|metas| metas.iter().any(|meta| meta.path().is_ident("hidden")))
            .unwrap_or(false)
    })
}

/// Whether `#[derive(..)]` lists `Serialize` and `Deserialize`, by last path segment.
fn serde_derives(attrs: &[syn::Attribute]) -> (bool, bool) {
    let mut serialize = false;
    let mut deserialize = false;
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("derive")) {
        let _ = attr.parse_nested_meta(|meta| {
            if let Some(last) = meta.path.segments.last() {
                if last.ident == "Serialize" {
                    serialize = true;
                } else if last.ident == "Deserialize" {
                    deserialize = true;
                }
            }
            Ok(())
        });
    }
    (serialize, deserialize)
}

/// Folds a field's `#[serde(..)]` attributes into a serialization tag.
fn serde_tag(attrs: &[syn::Attribute]) -> syn::Result<Option<String>> {
    let mut rename = None;
    let mut skip = false;
    let mut skip_serializing = false;
    let mut skip_deserializing = false;

    for attr in attrs.iter().filter(|attr| attr.path().is_ident("serde")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                if meta.input.peek(syn::Token![=]) {
                    let lit: syn::LitStr = meta.value()?.parse()?;
                    rename = Some(lit.value());
                } else {
                    // rename(serialize = "..", deserialize = "..")
                    meta.parse_nested_meta(|inner| {
                        let lit: syn::LitStr = inner.value()?.parse()?;
                        if inner.path.is_ident("serialize") {
                            rename = Some(lit.value());
                        }
                        Ok(())
                    })?;
                }
            } else if meta.path.is_ident("skip") {
                skip = true;
            } else if meta.path.is_ident("skip_serializing") {
                skip_serializing = true;
            } else if meta.path.is_ident("skip_deserializing") {
                skip_deserializing = true;
            } else {
                skip_meta_value(&meta)?;
            }
            Ok(())
        })?;
    }

    if skip || (skip_serializing && skip_deserializing) {
        return Ok(Some("-".to_string()));
    }
    Ok(rename)
}

fn skip_meta_value(meta: &syn::meta::ParseNestedMeta<'_>) -> syn::Result<()> {
    if meta.input.peek(syn::Token![=]) {
        let _: syn::Expr = meta.value()?.parse()?;
    } else if meta.input.peek(syn::token::Paren) {
        meta.parse_nested_meta(|inner| skip_meta_value(&inner))?;
    }
    Ok(())
}

pub fn lower_type(ty: &syn::Type) -> TypeExpr {
    match ty {
        syn::Type::Paren(p) => lower_type(&p.elem),
        syn::Type::Group(g) => lower_type(&g.elem),
        syn::Type::Reference(r) => TypeExpr::Borrowed(Box::new(lower_type(&r.elem))),
        syn::Type::Ptr(p) => TypeExpr::Borrowed(Box::new(lower_type(&p.elem))),
        syn::Type::Array(a) => TypeExpr::Array(Box::new(lower_type(&a.elem))),
        syn::Type::Slice(s) => TypeExpr::Array(Box::new(lower_type(&s.elem))),
        syn::Type::Tuple(t) => TypeExpr::Tuple(t.elems.iter().map(lower_type).collect()),
        syn::Type::TraitObject(t) => t
            .bounds
            .iter()
            .find_map(|bound| match bound {
                syn::TypeParamBound::Trait(tb) => tb.path.segments.last(),
                _ => None,
            })
            .map(|segment| TypeExpr::Named(segment.ident.to_string()))
            .unwrap_or_else(|| opaque(ty)),
        syn::Type::Path(p) if p.qself.is_none() => lower_path(&p.path).unwrap_or_else(|| opaque(ty)),
        _ => opaque(ty),
    }
}

fn lower_path(path: &syn::Path) -> Option<TypeExpr> {
    let last = path.segments.last()?;
    let ident = last.ident.to_string();
    let args: Vec<TypeExpr> = match &last.arguments {
        syn::PathArguments::None => Vec::new(),
        syn::PathArguments::AngleBracketed(a) => a
            .args
            .iter()
            .filter_map(|arg| match arg {
                syn::GenericArgument::Type(t) => Some(lower_type(t)),
                _ => None,
            })
            .collect(),
        syn::PathArguments::Parenthesized(_) => return None,
    };

    let boxed = |t: &TypeExpr| Box::new(t.clone());
    let lowered = match (ident.as_str(), args.as_slice()) {
        ("String" | "str", []) => TypeExpr::Text,
        ("Option", [inner]) => TypeExpr::Optional(boxed(inner)),
        ("Box" | "Rc" | "Arc", [inner, ..]) => TypeExpr::Pointer(boxed(inner)),
        ("Vec" | "VecDeque", [inner, ..]) => TypeExpr::Sequence(boxed(inner)),
        ("HashMap" | "BTreeMap" | "IndexMap", [key, value, ..]) => TypeExpr::Mapping {
            key: boxed(key),
            value: boxed(value),
        },
        (_, []) if path.segments.len() == 1 => TypeExpr::Named(ident.clone()),
        (_, []) => {
            let joined = path
                .segments
                .iter()
                .map(|segment| segment.ident.to_string())
                .collect::<Vec<_>>()
                .join("::");
            TypeExpr::Named(joined)
        }
        (_, _) => TypeExpr::Generic { name: ident.clone(), args: args.clone() },
    };
    Some(lowered)
}

fn opaque(ty: &syn::Type) -> TypeExpr {
    TypeExpr::Opaque(ty.to_token_stream().to_string())
}
