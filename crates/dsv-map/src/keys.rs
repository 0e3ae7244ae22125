//! Structural keys.
//!
//! A structural key is derived only from an entity's content, never from a
//! storage id, so the same entity in two versions produces the same key.
//!
//! Parts are normalized (trimmed, lowercased, whitespace runs collapsed),
//! escaped and joined with `|`. Escaping `%`, `|` and `#` makes the tuple
//! encoding injective and leaves `#` free for the duplicate suffix added by
//! [`assign_keys`].

use std::collections::BTreeMap;

use dsv_model::{
    FilterInfo, FilterMeta, FilterOptionInfo, FilterOptionMeta, IndicatorInfo, IndicatorMeta,
    LocationOptionInfo, LocationOptionMeta, PublicId,
};

/// Normalizes one key part for comparison.
pub fn normalize_part(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn escape(part: &str) -> String {
    let mut out = String::with_capacity(part.len());
    for c in part.chars() {
        match c {
            '%' => out.push_str("%25"),
            '|' => out.push_str("%7C"),
            '#' => out.push_str("%23"),
            _ => out.push(c),
        }
    }
    out
}

/// Escapes and joins already-normalized parts.
pub fn encode<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    parts
        .into_iter()
        .map(|p| escape(p.as_ref()))
        .collect::<Vec<_>>()
        .join("|")
}

pub fn filter_key(info: &FilterInfo) -> String {
    encode([normalize_part(&info.column)])
}

/// Key of an option within its owning filter.
pub fn filter_option_match_key(info: &FilterOptionInfo) -> String {
    encode([
        normalize_part(info.group_label.as_deref().unwrap_or_default()),
        normalize_part(&info.label),
    ])
}

/// Key of an option across the whole filter plan.
pub fn filter_option_key(filter_key: &str, info: &FilterOptionInfo) -> String {
    encode([
        filter_key.to_string(),
        normalize_part(info.group_label.as_deref().unwrap_or_default()),
        normalize_part(&info.label),
    ])
}

/// Primary code, then the secondary identifiers combined, then the label.
pub fn location_option_key(info: &LocationOptionInfo) -> String {
    let codes = &info.codes;
    if let Some(code) = codes.code() {
        return encode(["code".to_string(), normalize_part(code)]);
    }
    let secondary = [codes.old_code(), codes.urn(), codes.la_estab(), codes.ukprn()];
    if secondary.iter().any(Option::is_some) {
        let mut parts = vec!["ids".to_string()];
        parts.extend(
            secondary
                .iter()
                .map(|part| normalize_part(part.unwrap_or_default())),
        );
        return encode(parts);
    }
    encode(["label".to_string(), normalize_part(&info.label)])
}

pub fn indicator_key(info: &IndicatorInfo) -> String {
    encode([normalize_part(&info.column)])
}

/// An entity that can be matched across versions.
pub trait Mappable {
    type Info: Clone;

    fn info(&self) -> &Self::Info;

    fn public_id(&self) -> Option<&PublicId>;

    /// Key compared during matching, within the entity's level or owner.
    fn match_key(&self) -> String;

    fn label(&self) -> &str;
}

impl Mappable for FilterMeta {
    type Info = FilterInfo;

    fn info(&self) -> &FilterInfo {
        &self.info
    }

    fn public_id(&self) -> Option<&PublicId> {
        self.public_id.as_ref()
    }

    fn match_key(&self) -> String {
        filter_key(&self.info)
    }

    fn label(&self) -> &str {
        &self.info.label
    }
}

impl Mappable for FilterOptionMeta {
    type Info = FilterOptionInfo;

    fn info(&self) -> &FilterOptionInfo {
        &self.info
    }

    fn public_id(&self) -> Option<&PublicId> {
        self.public_id.as_ref()
    }

    fn match_key(&self) -> String {
        filter_option_match_key(&self.info)
    }

    fn label(&self) -> &str {
        &self.info.label
    }
}

impl Mappable for LocationOptionMeta {
    type Info = LocationOptionInfo;

    fn info(&self) -> &LocationOptionInfo {
        &self.info
    }

    fn public_id(&self) -> Option<&PublicId> {
        self.public_id.as_ref()
    }

    fn match_key(&self) -> String {
        location_option_key(&self.info)
    }

    fn label(&self) -> &str {
        &self.info.label
    }
}

impl Mappable for IndicatorMeta {
    type Info = IndicatorInfo;

    fn info(&self) -> &IndicatorInfo {
        &self.info
    }

    fn public_id(&self) -> Option<&PublicId> {
        self.public_id.as_ref()
    }

    fn match_key(&self) -> String {
        indicator_key(&self.info)
    }

    fn label(&self) -> &str {
        &self.info.label
    }
}

/// An entity with its stored key and its match key.
#[derive(Debug, Clone)]
pub struct Keyed<'a, T> {
    /// Unique within the snapshot scope; used as the map key in plans.
    pub key: String,
    pub match_key: String,
    pub item: &'a T,
}

/// Assigns unique stored keys in snapshot order.
///
/// The first entity with a given base key keeps it; later ones get `#2`,
/// `#3`, ... appended.
pub fn assign_keys<'a, T>(
    items: &'a [T],
    base_key: impl Fn(&T) -> String,
    match_key: impl Fn(&T) -> String,
) -> Vec<Keyed<'a, T>> {
    let mut seen: BTreeMap<String, usize> = BTreeMap::new();
    items
        .iter()
        .map(|item| {
            let base = base_key(item);
            let count = seen.entry(base.clone()).or_insert(0);
            *count += 1;
            let key = if *count == 1 {
                base
            } else {
                format!("{base}#{count}")
            };
            Keyed {
                key,
                match_key: match_key(item),
                item,
            }
        })
        .collect()
}

/// Keys for entities whose stored base key is their match key.
pub fn assign_mappable_keys<T: Mappable>(items: &[T]) -> Vec<Keyed<'_, T>> {
    assign_keys(items, T::match_key, T::match_key)
}

/// Keys for the options of the filter stored under `filter_key`.
pub fn assign_option_keys<'a>(
    filter_key: &str,
    options: &'a [FilterOptionMeta],
) -> Vec<Keyed<'a, FilterOptionMeta>> {
    assign_keys(
        options,
        |o| filter_option_key(filter_key, &o.info),
        FilterOptionMeta::match_key,
    )
}
