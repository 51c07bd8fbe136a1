// ABOUTME: Route template translation from panel placeholder syntax to axum's
// ABOUTME: Accepts {name}, :name and *name segments and emits {name} / {*name}

use crate::error::MountError;

/// Translate a panel route template into an axum route path.
///
/// `/resources/{resourceId}/records/:recordId/{action}` becomes
/// `/resources/{resourceId}/records/{recordId}/{action}`. Wildcards (`*rest`
/// or `{*rest}`) are only allowed as the final segment. The empty template
/// maps to `/`.
pub fn translate_path(template: &str) -> Result<String, MountError> {
    let trimmed = template.trim();
    if trimmed.is_empty() || trimmed == "/" {
        return Ok("/".to_string());
    }

    let body = trimmed.strip_prefix('/').unwrap_or(trimmed);
    let segments: Vec<&str> = body.split('/').collect();
    let last = segments.len() - 1;
    let mut translated = String::with_capacity(trimmed.len() + 1);

    for (index, segment) in segments.iter().enumerate() {
        translated.push('/');
        let placeholder = match segment.as_bytes().first() {
            Some(b'{') => Some(parse_braced(segment, template)?),
            Some(b':') => Some(Placeholder::Named(&segment[1..])),
            Some(b'*') => Some(Placeholder::Wildcard(&segment[1..])),
            _ => None,
        };

        match placeholder {
            None => {
                if segment.contains(['{', '}']) {
                    return Err(MountError::invalid_argument(format!(
                        "route template {template:?} mixes literal text and placeholders in segment {segment:?}"
                    )));
                }
                translated.push_str(segment);
            }
            Some(Placeholder::Named(name)) => {
                validate_name(name, template)?;
                translated.push('{');
                translated.push_str(name);
                translated.push('}');
            }
            Some(Placeholder::Wildcard(name)) => {
                validate_name(name, template)?;
                if index != last {
                    return Err(MountError::invalid_argument(format!(
                        "route template {template:?} has a wildcard before the last segment"
                    )));
                }
                translated.push_str("{*");
                translated.push_str(name);
                translated.push('}');
            }
        }
    }

    Ok(translated)
}

enum Placeholder<'a> {
    Named(&'a str),
    Wildcard(&'a str),
}

fn parse_braced<'a>(segment: &'a str, template: &str) -> Result<Placeholder<'a>, MountError> {
    let inner = segment
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .ok_or_else(|| {
            MountError::invalid_argument(format!(
                "route template {template:?} has an unbalanced placeholder {segment:?}"
            ))
        })?;

    Ok(match inner.strip_prefix('*') {
        Some(name) => Placeholder::Wildcard(name),
        None => Placeholder::Named(inner),
    })
}

fn validate_name(name: &str, template: &str) -> Result<(), MountError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(MountError::invalid_argument(format!(
            "route template {template:?} has an invalid placeholder name {name:?}"
        )))
    }
}

/// Strip the panel root from an absolute panel path, giving the path as seen
/// inside a router nested at `root`.
pub(crate) fn relative_to_root(root: &str, path: &str) -> String {
    let root = root.trim_end_matches('/');
    match path.strip_prefix(root) {
        Some("") => "/".to_string(),
        Some(rest) if rest.starts_with('/') => rest.to_string(),
        _ => path.to_string(),
    }
}
