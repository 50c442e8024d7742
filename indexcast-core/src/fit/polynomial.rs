//! Lag-polynomial helpers for ARMA models.
//!
//! AR coefficients follow `y_t = φ₁y_{t-1} + … + φ_p y_{t-p} + e_t`, i.e. the
//! lag polynomial `1 - φ₁L - … - φ_pL^p`. MA coefficients follow
//! `e_t + θ₁e_{t-1} + …`, i.e. `1 + θ₁L + …`.

/// True when all roots of `1 - φ₁z - … - φ_pz^p` lie outside the unit circle.
///
/// Uses the step-down recursion: the polynomial is stationary exactly when
/// every partial autocorrelation it implies has magnitude below one.
pub fn is_stationary(ar: &[f64]) -> bool {
    let mut a = ar.to_vec();
    while let Some(&r) = a.last() {
        if !r.is_finite() || r.abs() >= 1.0 {
            return false;
        }
        let k = a.len();
        let denom = 1.0 - r * r;
        a = (0..k - 1)
            .map(|j| (a[j] + r * a[k - 2 - j]) / denom)
            .collect();
    }
    true
}

/// True when all roots of `1 + θ₁z + … + θ_qz^q` lie outside the unit circle.
pub fn is_invertible(ma: &[f64]) -> bool {
    let negated: Vec<f64> = ma.iter().map(|t| -t).collect();
    is_stationary(&negated)
}

/// AR coefficients of `(1 - φ₁L - …)(1 - L)^d`, in the same sign convention.
pub fn integrate_ar(ar: &[f64], d: usize) -> Vec<f64> {
    let mut poly: Vec<f64> = std::iter::once(1.0).chain(ar.iter().map(|a| -a)).collect();
    for _ in 0..d {
        let mut next = vec![0.0; poly.len() + 1];
        for (i, c) in poly.iter().enumerate() {
            next[i] += c;
            next[i + 1] -= c;
        }
        poly = next;
    }
    poly.iter().skip(1).map(|c| -c).collect()
}

/// First `n` weights of the MA(∞) representation, starting with ψ₀ = 1.
pub fn psi_weights(ar: &[f64], ma: &[f64], n: usize) -> Vec<f64> {
    let mut psi = Vec::with_capacity(n);
    for j in 0..n {
        if j == 0 {
            psi.push(1.0);
            continue;
        }
        let mut value = ma.get(j - 1).copied().unwrap_or(0.0);
        for (i, phi) in ar.iter().enumerate().take(j) {
            value += phi * psi[j - 1 - i];
        }
        psi.push(value);
    }
    psi
}
