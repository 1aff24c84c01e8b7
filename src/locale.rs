//! Locale-prefixed URL handling (`/{locale}/...`).

use std::borrow::Cow;

use crate::types::Locale;

/// Languages the dashboard ships translations for.
pub const SUPPORTED_LOCALES: &[&str] = &["en", "pt", "es"];

pub const DEFAULT_LOCALE: &str = "en";

/// Split a leading `/{locale}` segment off `path`.
///
/// The first segment is treated as a locale only if it is a well-formed tag
/// (`en`, `pt-BR`); support is not checked. The remainder always starts with
/// `/`, so `/en?x=1` leaves `/?x=1`.
#[must_use]
pub fn split_locale(path: &str) -> (Option<Locale>, Cow<'_, str>) {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    let end = trimmed.find(['/', '?', '#']).unwrap_or(trimmed.len());
    let (segment, rest) = trimmed.split_at(end);

    if !Locale::is_well_formed(segment) {
        return (None, Cow::Borrowed(path));
    }
    let Ok(locale) = segment.parse::<Locale>() else {
        return (None, Cow::Borrowed(path));
    };

    let rest = if rest.starts_with('/') {
        Cow::Borrowed(rest)
    } else {
        Cow::Owned(format!("/{rest}"))
    };
    (Some(locale), rest)
}

/// `path` without its locale prefix.
#[must_use]
pub fn strip_locale(path: &str) -> Cow<'_, str> {
    split_locale(path).1
}

/// Prefix `path` with `locale`, replacing any locale already present.
#[must_use]
pub fn localize_path(locale: &Locale, path: &str) -> String {
    let rest = strip_locale(path);
    match rest.as_ref() {
        "" | "/" => format!("/{locale}"),
        r => match r.strip_prefix('/') {
            Some(tail) if tail.starts_with(['?', '#']) => format!("/{locale}{tail}"),
            Some(_) => format!("/{locale}{r}"),
            None if r.starts_with(['?', '#']) => format!("/{locale}{r}"),
            None => format!("/{locale}/{r}"),
        },
    }
}

/// Re-address `path` in `locale`, keeping the suffix and query intact.
///
/// `/en/admin/settings` switched to `pt` becomes `/pt/admin/settings`.
#[must_use]
pub fn switch_locale(path: &str, locale: &Locale) -> String {
    localize_path(locale, path)
}
