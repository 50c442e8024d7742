//! Derivative-free minimisation (Nelder–Mead simplex).

/// Nelder–Mead settings.
#[derive(Debug, Clone, Copy)]
pub struct NelderMead {
    /// Hard cap on simplex iterations.
    pub max_iterations: usize,
    /// Stop when the spread of objective values across the simplex is
    /// below `tolerance * (1 + |best|)`.
    pub tolerance: f64,
    /// Edge length of the initial simplex along each axis.
    pub initial_step: f64,
}

impl Default for NelderMead {
    fn default() -> Self {
        Self {
            max_iterations: 2_000,
            tolerance: 1e-10,
            initial_step: 0.1,
        }
    }
}

/// Result of a minimisation.
#[derive(Debug, Clone, PartialEq)]
pub struct Minimum {
    pub point: Vec<f64>,
    pub value: f64,
    pub iterations: usize,
    pub converged: bool,
}

const REFLECT: f64 = 1.0;
const EXPAND: f64 = 2.0;
const CONTRACT: f64 = 0.5;
const SHRINK: f64 = 0.5;

impl NelderMead {
    /// Minimise `objective` starting from `start`.
    ///
    /// Infeasible points should return a large finite penalty; `NaN` is
    /// treated as `+inf`.
    pub fn minimize<F>(&self, objective: F, start: &[f64]) -> Minimum
    where
        F: Fn(&[f64]) -> f64,
    {
        let eval = |x: &[f64]| {
            let v = objective(x);
            if v.is_nan() {
                f64::INFINITY
            } else {
                v
            }
        };

        let dim = start.len();
        if dim == 0 {
            return Minimum {
                point: Vec::new(),
                value: eval(start),
                iterations: 0,
                converged: true,
            };
        }

        let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(dim + 1);
        simplex.push(start.to_vec());
        for i in 0..dim {
            let mut vertex = start.to_vec();
            vertex[i] += self.initial_step;
            simplex.push(vertex);
        }
        let mut values: Vec<f64> = simplex.iter().map(|v| eval(v)).collect();

        for iteration in 0..self.max_iterations {
            let mut order: Vec<usize> = (0..=dim).collect();
            order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
            simplex = order.iter().map(|&i| simplex[i].clone()).collect();
            values = order.iter().map(|&i| values[i]).collect();

            let best = values[0];
            let worst = values[dim];
            if (worst - best).abs() <= self.tolerance * (1.0 + best.abs()) {
                return Minimum {
                    point: simplex[0].clone(),
                    value: best,
                    iterations: iteration,
                    converged: true,
                };
            }

            let centroid: Vec<f64> = (0..dim)
                .map(|j| simplex[..dim].iter().map(|v| v[j]).sum::<f64>() / dim as f64)
                .collect();
            let worst_vertex = simplex[dim].clone();
            let toward = |coef: f64| -> Vec<f64> {
                centroid
                    .iter()
                    .zip(&worst_vertex)
                    .map(|(c, w)| c + coef * (c - w))
                    .collect()
            };

            let reflected = toward(REFLECT);
            let f_reflected = eval(&reflected);

            if f_reflected < values[0] {
                let expanded = toward(EXPAND);
                let f_expanded = eval(&expanded);
                if f_expanded < f_reflected {
                    simplex[dim] = expanded;
                    values[dim] = f_expanded;
                } else {
                    simplex[dim] = reflected;
                    values[dim] = f_reflected;
                }
                continue;
            }

            if f_reflected < values[dim - 1] {
                simplex[dim] = reflected;
                values[dim] = f_reflected;
                continue;
            }

            let (contracted, f_contracted) = if f_reflected < values[dim] {
                let c = toward(CONTRACT);
                let f = eval(&c);
                (c, f)
            } else {
                let c = toward(-CONTRACT);
                let f = eval(&c);
                (c, f)
            };

            if f_contracted < values[dim].min(f_reflected) {
                simplex[dim] = contracted;
                values[dim] = f_contracted;
                continue;
            }

            let best_vertex = simplex[0].clone();
            for i in 1..=dim {
                for (x, b) in simplex[i].iter_mut().zip(&best_vertex) {
                    *x = b + SHRINK * (*x - b);
                }
                values[i] = eval(&simplex[i]);
            }
        }

        let (best_idx, _) = values
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(b.1))
            .unwrap_or((0, &f64::INFINITY));
        Minimum {
            point: simplex[best_idx].clone(),
            value: values[best_idx],
            iterations: self.max_iterations,
            converged: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimises_quadratic_bowl() {
        let nm = NelderMead::default();
        let result = nm.minimize(|x| (x[0] - 1.5).powi(2) + 2.0 * (x[1] + 0.5).powi(2), &[0.0, 0.0]);
        assert!(result.converged);
        assert!((result.point[0] - 1.5).abs() < 1e-4);
        assert!((result.point[1] + 0.5).abs() < 1e-4);
    }

    #[test]
    fn minimises_rosenbrock() {
        let nm = NelderMead {
            max_iterations: 5_000,
            tolerance: 1e-14,
            initial_step: 0.5,
        };
        let result = nm.minimize(
            |x| (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2),
            &[-1.2, 1.0],
        );
        assert!((result.point[0] - 1.0).abs() < 1e-2);
        assert!((result.point[1] - 1.0).abs() < 1e-2);
    }

    #[test]
    fn respects_iteration_cap() {
        let nm = NelderMead {
            max_iterations: 3,
            tolerance: 0.0,
            initial_step: 0.1,
        };
        let result = nm.minimize(|x| x[0] * x[0], &[10.0]);
        assert!(!result.converged);
        assert_eq!(result.iterations, 3);
    }

    #[test]
    fn avoids_penalised_region() {
        let nm = NelderMead::default();
        let result = nm.minimize(|x| if x[0] > 0.9 { 1e300 } else { (x[0] - 2.0).powi(2) }, &[0.0]);
        assert!(result.point[0] <= 0.9);
        assert!(result.point[0] > 0.8);
    }
}
