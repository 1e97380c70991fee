//! Interest-similarity scoring.
//!
//! Combines the cosine similarity of mean-centred interest vectors with a
//! normalised Euclidean "closeness" term. The blend weight `alpha` chooses
//! between shape agreement (cosine) and absolute rating proximity.

use crate::domain::user::InterestVector;

/// Floor applied to denominators so zero-variance vectors degrade to a zero
/// cosine term instead of dividing by zero.
const EPSILON: f64 = 1e-8;

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn dot(u: &[f64], v: &[f64]) -> f64 {
    u.iter().zip(v).map(|(a, b)| a * b).sum()
}

fn norm(values: &[f64]) -> f64 {
    dot(values, values).sqrt()
}

/// Blend of centred-cosine similarity and normalised distance closeness.
///
/// Both vectors are resolved to their neutral form first (unrated slots
/// become `1.0`). The result is `alpha * cosine + (1 - alpha) * closeness`
/// where `closeness = 1 - dist(u, v) / ||1||`. Identical non-degenerate
/// vectors score `1.0` for any `alpha`.
pub fn blend_similarity(u: &InterestVector, v: &InterestVector, alpha: f64) -> f64 {
    let u = u.resolved();
    let v = v.resolved();

    let u_mean = mean(&u);
    let v_mean = mean(&v);
    let u0: Vec<f64> = u.iter().map(|x| x - u_mean).collect();
    let v0: Vec<f64> = v.iter().map(|x| x - v_mean).collect();

    let cosine = dot(&u0, &v0) / (norm(&u0) * norm(&v0) + EPSILON);

    let difference: Vec<f64> = u.iter().zip(&v).map(|(a, b)| a - b).collect();
    let max_distance = (u.len() as f64).sqrt();
    let closeness = 1.0 - norm(&difference) / (max_distance + EPSILON);

    alpha * cosine + (1.0 - alpha) * closeness
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn vector(slots: &[f64]) -> InterestVector {
        InterestVector::new(slots.iter().copied().map(Some).collect())
    }

    #[rstest]
    #[case(0.0)]
    #[case(0.5)]
    #[case(1.0)]
    fn identical_vectors_score_one(#[case] alpha: f64) {
        let u = vector(&[5.0, 1.0, 3.0, 2.0, 4.0]);
        let score = blend_similarity(&u, &u, alpha);
        assert!((score - 1.0).abs() < 1e-6, "alpha={alpha} score={score}");
    }

    #[rstest]
    fn zero_variance_vector_degrades_instead_of_failing() {
        // All-neutral against all-neutral: cosine collapses to zero via the
        // epsilon floor, closeness stays exact.
        let score = blend_similarity(&InterestVector::neutral(), &InterestVector::neutral(), 0.5);
        assert!((score - 0.5).abs() < 1e-6, "score={score}");
    }

    #[rstest]
    fn unrated_slots_are_treated_as_neutral() {
        let sparse = InterestVector::new(vec![Some(1.0), None, None]);
        let explicit = vector(&[1.0, 1.0, 1.0]);
        let a = blend_similarity(&sparse, &explicit, 0.7);
        let b = blend_similarity(&explicit, &explicit, 0.7);
        assert!((a - b).abs() < 1e-9);
    }

    #[rstest]
    fn closer_vectors_rank_higher() {
        let me = vector(&[5.0, 4.0, 1.0, 1.0, 1.0]);
        let near = vector(&[5.0, 3.0, 1.0, 1.0, 1.0]);
        let far = vector(&[1.0, 1.0, 5.0, 5.0, 5.0]);
        assert!(blend_similarity(&me, &near, 0.5) > blend_similarity(&me, &far, 0.5));
    }

    #[rstest]
    fn alpha_zero_ignores_shape() {
        // With alpha = 0 only raw distance matters; scaled copies of the
        // same shape no longer score as equals.
        let me = vector(&[4.0, 2.0, 4.0, 2.0]);
        let same_shape_far = vector(&[8.0, 4.0, 8.0, 4.0]);
        let score = blend_similarity(&me, &same_shape_far, 0.0);
        assert!(score < 1.0);
    }
}
