//! Attribute parsing for `#[conf(...)]` annotations.
//!
//! Every `name = literal` pair becomes a tag on the generated field
//! descriptor. Which tag means what (key override, default, help) is decided
//! at runtime by `tagconf::Settings`, so the macro never interprets them.

use syn::{Field, Lit, Token};

/// Parsed `#[conf(...)]` attributes and doc comments of a struct field.
#[derive(Debug, Default)]
pub struct FieldAttrs {
    /// `(tag, value)` pairs in declaration order.
    pub tags: Vec<(String, String)>,

    /// `#[conf(flatten)]`: the field's fields are spliced into the parent.
    pub flatten: bool,

    /// `///` doc comment lines, trimmed and joined with a space.
    pub doc: String,
}

impl FieldAttrs {
    /// Extract `#[conf(...)]` and `#[doc]` attributes from a struct field.
    ///
    /// Attributes of other macros are left alone.
    pub fn from_field(field: &Field) -> syn::Result<Self> {
        let mut attrs = Self::default();
        let mut doc_lines = Vec::new();

        for attr in &field.attrs {
            if attr.path().is_ident("doc") {
                if let syn::Meta::NameValue(nv) = &attr.meta
                    && let syn::Expr::Lit(expr) = &nv.value
                    && let Lit::Str(s) = &expr.lit
                {
                    let line = s.value();
                    let line = line.trim();
                    if !line.is_empty() {
                        doc_lines.push(line.to_string());
                    }
                }
                continue;
            }

            if !attr.path().is_ident("conf") {
                continue;
            }

            attr.parse_nested_meta(|meta| {
                let name = meta
                    .path
                    .get_ident()
                    .map(|ident| ident.to_string())
                    .ok_or_else(|| meta.error("expected a tag name"))?;

                if meta.input.peek(Token![=]) {
                    let value = meta.value()?;
                    let negative = value.peek(Token![-]);
                    if negative {
                        value.parse::<Token![-]>()?;
                    }
                    let lit: Lit = value.parse()?;
                    let mut text = lit_to_string(&lit)?;
                    if negative {
                        text.insert(0, '-');
                    }
                    if attrs.tags.iter().any(|(existing, _)| *existing == name) {
                        return Err(meta.error(format!("duplicate conf tag `{name}`")));
                    }
                    attrs.tags.push((name, text));
                    return Ok(());
                }

                match name.as_str() {
                    "flatten" => {
                        attrs.flatten = true;
                        Ok(())
                    }
                    "required" => {
                        attrs.tags.push((name, "true".to_string()));
                        Ok(())
                    }
                    _ => Err(meta.error(format!("unsupported conf flag `{name}`"))),
                }
            })?;
        }

        attrs.doc = doc_lines.join(" ");
        Ok(attrs)
    }
}

fn lit_to_string(lit: &Lit) -> syn::Result<String> {
    match lit {
        Lit::Str(s) => Ok(s.value()),
        Lit::Int(i) => Ok(i.base10_digits().to_string()),
        Lit::Float(f) => Ok(f.base10_digits().to_string()),
        Lit::Bool(b) => Ok(b.value.to_string()),
        Lit::Char(c) => Ok(c.value().to_string()),
        other => Err(syn::Error::new_spanned(
            other,
            "conf tag values must be string, number, bool or char literals",
        )),
    }
}
