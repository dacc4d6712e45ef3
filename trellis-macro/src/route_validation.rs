//! Compile-time route pattern validation
//!
//! Rejects what the router would reject at registration, so a typo in a
//! route attribute fails the build instead of `Router::discover`:
//! - path must start with "/"
//! - no double slashes
//! - placeholders `{name}`, `{name:regex}` or `{*name}` spanning a whole segment
//! - parameter names are identifiers, without duplicates
//! - catch-all only as the final segment

use proc_macro2::Span;
use syn::Error;

/// Parameter names of a validated pattern, in order.
#[allow(dead_code)]
pub struct ValidatedRoute {
    pub params: Vec<String>,
    pub has_catch_all: bool,
}

pub fn validate_route_path(path: &str, span: Span) -> Result<ValidatedRoute, Error> {
    if !path.starts_with('/') {
        return Err(Error::new(
            span,
            format!(
                "route path must start with '/', got: \"{}\"\nhint: change to \"/{}\"",
                path, path
            ),
        ));
    }
    if path.contains("//") {
        return Err(Error::new(
            span,
            format!("route path contains double slashes: \"{}\"", path),
        ));
    }

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let mut params: Vec<String> = Vec::new();
    let mut has_catch_all = false;

    for (index, segment) in segments.iter().enumerate() {
        if !segment.contains('{') {
            if segment.contains('}') {
                return Err(Error::new(span, format!("unmatched '}}' in segment \"{}\"", segment)));
            }
            continue;
        }

        let inner = segment
            .strip_prefix('{')
            .and_then(|rest| rest.strip_suffix('}'))
            .ok_or_else(|| {
                Error::new(
                    span,
                    format!(
                        "placeholder must span the whole segment: \"{}\"\nhint: use \"{{name}}\" as its own segment",
                        segment
                    ),
                )
            })?;

        let name = if let Some(name) = inner.strip_prefix('*') {
            if index + 1 != segments.len() {
                return Err(Error::new(
                    span,
                    format!("catch-all \"{{*{}}}\" must be the last segment", name),
                ));
            }
            has_catch_all = true;
            name
        } else {
            match inner.split_once(':') {
                Some((name, "")) => {
                    return Err(Error::new(span, format!("empty regex for parameter '{}'", name)));
                }
                Some((name, _)) => name,
                None => inner,
            }
        };

        validate_identifier(name, span)?;
        if params.iter().any(|p| p == name) {
            return Err(Error::new(
                span,
                format!("duplicate parameter '{}' in \"{}\"", name, path),
            ));
        }
        params.push(name.to_string());
    }

    Ok(ValidatedRoute {
        params,
        has_catch_all,
    })
}

fn validate_identifier(name: &str, span: Span) -> Result<(), Error> {
    if name.is_empty() {
        return Err(Error::new(span, "parameter name cannot be empty"));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(Error::new(
            span,
            format!(
                "invalid parameter name '{}'\nhint: use letters, digits and underscores",
                name
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validate(path: &str) -> Result<ValidatedRoute, String> {
        validate_route_path(path, Span::call_site()).map_err(|e| e.to_string())
    }

    #[test]
    fn test_valid_paths() {
        assert!(validate("/").unwrap().params.is_empty());
        assert_eq!(validate("/users/{id}").unwrap().params, vec!["id"]);
        assert_eq!(
            validate(r"/posts/{year:\d{4}}/{slug}").unwrap().params,
            vec!["year", "slug"]
        );
        assert!(validate("/files/{*path}").unwrap().has_catch_all);
    }

    #[test]
    fn test_invalid_paths() {
        assert!(validate("users").is_err());
        assert!(validate("/users//list").is_err());
        assert!(validate("/users/{id").is_err());
        assert!(validate("/users/id}").is_err());
        assert!(validate("/users/x{id}").is_err());
        assert!(validate("/users/{}").is_err());
        assert!(validate("/users/{id:}").is_err());
        assert!(validate("/files/{*path}/meta").is_err());
        assert!(validate("/a/{id}/b/{id}").is_err());
        assert!(validate("/a/{my-id}").is_err());
    }
}
