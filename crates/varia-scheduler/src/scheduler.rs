//! Format scheduling: the order format passes run in.

use varia_core::{Category, Format, Framework, MajorVersion, ThemeMode};

/// Produces the pass order for one run.
pub struct FormatScheduler;

impl FormatScheduler {
    /// Every format combination for `category`, starting at `current`, with
    /// consecutive entries differing in exactly one dimension.
    ///
    /// Dimensions are nested framework (outermost), version, mode
    /// (innermost). Categories without theme modes collapse the mode
    /// dimension to a single `None` value.
    #[must_use]
    pub fn sequence(current: Format, category: Category) -> Vec<Format> {
        let current = current.for_category(category);

        let frameworks = ordered_values(current.framework, &Framework::ALL);
        let versions = ordered_values(current.version, &MajorVersion::ALL);
        let modes: Vec<Option<ThemeMode>> = if category.has_theme_modes() {
            ordered_values(current.mode.unwrap_or(ThemeMode::Light), &ThemeMode::ALL)
                .into_iter()
                .map(Some)
                .collect()
        } else {
            vec![None]
        };

        let sequence: Vec<Format> =
            reflected_product(&[frameworks.len(), versions.len(), modes.len()])
                .into_iter()
                .map(|digits| Format::new(frameworks[digits[0]], versions[digits[1]], modes[digits[2]]))
                .collect();

        tracing::debug!(
            "Scheduled {} format passes for {} starting at {}",
            sequence.len(),
            category,
            current
        );
        sequence
    }
}

/// `current` followed by the remaining values of `all` in declaration order.
#[must_use]
pub fn ordered_values<T: Copy + PartialEq>(current: T, all: &[T]) -> Vec<T> {
    std::iter::once(current)
        .chain(all.iter().copied().filter(|v| *v != current))
        .collect()
}

/// Reflected mixed-radix Gray code over dimensions of the given sizes.
///
/// Returns index tuples, outermost dimension first. The first tuple is all
/// zeros and adjacent tuples differ in exactly one position. Each inner
/// dimension runs forward on even passes of its enclosing dimension and
/// backward on odd ones, so direction is a pure function of the index.
#[must_use]
pub fn reflected_product(sizes: &[usize]) -> Vec<Vec<usize>> {
    if sizes.is_empty() || sizes.contains(&0) {
        return Vec::new();
    }

    let total: usize = sizes.iter().product();

    // strides[d] = product of the sizes inside dimension d
    let mut strides = vec![1; sizes.len()];
    for d in (0..sizes.len().saturating_sub(1)).rev() {
        strides[d] = strides[d + 1] * sizes[d + 1];
    }

    (0..total)
        .map(|index| {
            sizes
                .iter()
                .zip(&strides)
                .map(|(&size, &stride)| {
                    let step = index / stride;
                    let offset = step % size;
                    let pass = step / size;
                    if pass % 2 == 0 {
                        offset
                    } else {
                        size - 1 - offset
                    }
                })
                .collect()
        })
        .collect()
}
