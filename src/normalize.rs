/// Logistic curve mapping the reals onto (0, 1).
///
/// `scale` must be non-zero; sport configs are validated for that at startup.
pub fn sigmoid(x: f64, scale: f64, center: f64) -> f64 {
    1.0 / (1.0 + (-(x - center) / scale).exp())
}

/// Exact inverse of [`sigmoid`] for `p` in (0, 1).
pub fn inverse_sigmoid(p: f64, scale: f64, center: f64) -> f64 {
    center + scale * (p / (1.0 - p)).ln()
}

/// Gaussian-shaped falloff: 1 at `x == 0`, approaching 0 as |x| grows.
pub fn neg_exp(x: f64, scale: f64) -> f64 {
    (-(x * x) / scale).exp()
}
