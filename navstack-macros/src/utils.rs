use syn::{Attribute, Lit, LitStr};

/// Extract string value from attribute like `rename = "key"`
pub fn get_attr_string(attr: &Attribute, key: &str) -> Option<String> {
    let mut result = None;
    let _ = attr.parse_nested_meta(|meta| {
        if meta.path.is_ident(key) {
            let lit: LitStr = meta.value()?.parse()?;
            result = Some(lit.value());
        } else if meta.input.peek(syn::Token![=]) {
            let _: Lit = meta.value()?.parse()?;
        }
        Ok(())
    });
    result
}

/// Check if attribute contains a bare flag like `skip`
pub fn has_attr_flag(attr: &Attribute, flag: &str) -> bool {
    let mut found = false;
    let _ = attr.parse_nested_meta(|meta| {
        if meta.path.is_ident(flag) {
            found = true;
        } else if meta.input.peek(syn::Token![=]) {
            // Consume `key = value` pairs so parsing continues past them
            let _: Lit = meta.value()?.parse()?;
        }
        Ok(())
    });
    found
}
