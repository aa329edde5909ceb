//! Listing SKU expansion.
//!
//! A marketplace SKU may carry variant suffixes after the base part number,
//! e.g. `PART00001-A-B`. Each variant denotes a sibling part whose IPN is the
//! base with its trailing characters overwritten by the suffix, so `A`
//! yields `PART0000A` and `B` yields `PART0000B`.

/// Separator between the base part number and variant suffixes.
pub const VARIANT_SEPARATOR: char = '-';

/// One variant segment and the identifier it reconstructs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant<'a> {
    pub segment: &'a str,
    /// `None` when the segment is empty or at least as long as the base.
    pub candidate: Option<String>,
}

/// A SKU split into its base and ordered variant candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion<'a> {
    pub base: &'a str,
    pub variants: Vec<Variant<'a>>,
}

impl Expansion<'_> {
    /// Base first, then every well-formed variant candidate in SKU order.
    pub fn candidates(&self) -> Vec<String> {
        std::iter::once(self.base.to_string())
            .chain(self.variants.iter().filter_map(|v| v.candidate.clone()))
            .collect()
    }

    /// Segments that could not be substituted into the base.
    pub fn degenerate_segments(&self) -> Vec<String> {
        self.variants
            .iter()
            .filter(|v| v.candidate.is_none())
            .map(|v| v.segment.to_string())
            .collect()
    }
}

/// Overwrite the trailing `variant.len()` characters of `base` with `variant`.
///
/// Returns `None` for an empty variant, or when the variant is as long as or
/// longer than the base: no prefix of the base would survive.
pub fn replace_suffix(base: &str, variant: &str) -> Option<String> {
    let base_len = base.chars().count();
    let variant_len = variant.chars().count();
    if variant_len == 0 || variant_len >= base_len {
        return None;
    }

    let keep: String = base.chars().take(base_len - variant_len).collect();
    Some(keep + variant)
}

/// Split a listing SKU on its first separator into base and variant segments.
pub fn expand(sku: &str) -> Expansion<'_> {
    let Some((base, rest)) = sku.split_once(VARIANT_SEPARATOR) else {
        return Expansion {
            base: sku,
            variants: Vec::new(),
        };
    };

    let variants = rest
        .split(VARIANT_SEPARATOR)
        .map(|segment| Variant {
            segment,
            candidate: replace_suffix(base, segment),
        })
        .collect();

    Expansion { base, variants }
}
