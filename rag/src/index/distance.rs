/// Squared Euclidean distance between two vectors of equal length.
///
/// Only the common prefix is compared; callers check lengths beforehand.
#[must_use]
pub fn squared_euclidean(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(lhs, rhs)| {
            let diff = lhs - rhs;
            diff * diff
        })
        .sum()
}
