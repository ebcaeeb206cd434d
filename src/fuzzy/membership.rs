//! Membership functions and linguistic variables.

/// Shape of a fuzzy term.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Membership {
    /// Triangle with feet at `a`, `c` and peak at `b`. `a == b` or `b == c`
    /// gives a shoulder.
    Triangle {
        /// Left foot.
        a: f64,
        /// Peak.
        b: f64,
        /// Right foot.
        c: f64,
    },
    /// Gaussian bell.
    Gaussian {
        /// Centre.
        mean: f64,
        /// Standard deviation.
        sigma: f64,
    },
}

impl Membership {
    /// Degree of membership of `x`, in `[0, 1]`.
    #[must_use]
    pub fn degree(&self, x: f64) -> f64 {
        match *self {
            Self::Triangle { a, b, c } => {
                if x == b {
                    1.0
                } else if x < b {
                    if a < b && x > a {
                        (x - a) / (b - a)
                    } else {
                        0.0
                    }
                } else if b < c && x < c {
                    (c - x) / (c - b)
                } else {
                    0.0
                }
            }
            Self::Gaussian { mean, sigma } => {
                let d = x - mean;
                (-(d * d) / (2.0 * sigma * sigma)).exp()
            }
        }
    }
}

/// Evenly spaced overlapping triangles covering `[min, max]`.
///
/// Each triangle peaks on one of `count` evenly spaced centres and reaches
/// zero at the neighbouring centres.
#[must_use]
pub fn auto_partition(min: f64, max: f64, count: usize) -> Vec<Membership> {
    if count < 2 {
        let mid = (min + max) / 2.0;
        return vec![Membership::Triangle { a: min, b: mid, c: max }];
    }
    #[allow(clippy::cast_precision_loss)]
    let steps = (count - 1) as f64;
    let half_width = (max - min) / steps;
    (0..count)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let centre = min + half_width * i as f64;
            Membership::Triangle {
                a: centre - half_width,
                b: centre,
                c: centre + half_width,
            }
        })
        .collect()
}

/// A fuzzy variable over a bounded universe.
#[derive(Debug, Clone)]
pub struct Variable {
    /// Variable name.
    pub name: &'static str,
    /// Lower bound of the universe.
    pub min: f64,
    /// Upper bound of the universe.
    pub max: f64,
    terms: Vec<(&'static str, Membership)>,
}

impl Variable {
    /// A variable with explicitly shaped terms.
    #[must_use]
    pub fn new(name: &'static str, min: f64, max: f64, terms: Vec<(&'static str, Membership)>) -> Self {
        Self { name, min, max, terms }
    }

    /// A variable whose terms evenly partition the universe.
    #[must_use]
    pub fn auto(name: &'static str, min: f64, max: f64, term_names: &[&'static str]) -> Self {
        let terms = term_names
            .iter()
            .copied()
            .zip(auto_partition(min, max, term_names.len()))
            .collect();
        Self::new(name, min, max, terms)
    }

    /// Shape of a named term.
    #[must_use]
    pub fn term(&self, name: &str) -> Option<Membership> {
        self.terms
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, m)| *m)
    }

    /// Degree to which `x` (clamped to the universe) belongs to `term`.
    /// Unknown terms have degree zero.
    #[must_use]
    pub fn degree(&self, term: &str, x: f64) -> f64 {
        let x = x.clamp(self.min, self.max);
        self.term(term).map_or(0.0, |m| m.degree(x))
    }

    /// Term names in declaration order.
    pub fn term_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.terms.iter().map(|(n, _)| *n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn triangle_shape() {
        let t = Membership::Triangle { a: 0.0, b: 5.0, c: 10.0 };
        assert!(close(t.degree(0.0), 0.0));
        assert!(close(t.degree(2.5), 0.5));
        assert!(close(t.degree(5.0), 1.0));
        assert!(close(t.degree(7.5), 0.5));
        assert!(close(t.degree(11.0), 0.0));
    }

    #[test]
    fn shoulder_triangles() {
        let left = Membership::Triangle { a: 0.0, b: 0.0, c: 1.0 };
        assert!(close(left.degree(0.0), 1.0));
        assert!(close(left.degree(1.0), 0.0));
        let right = Membership::Triangle { a: 0.0, b: 1.0, c: 1.0 };
        assert!(close(right.degree(1.0), 1.0));
        assert!(close(right.degree(0.0), 0.0));
    }

    #[test]
    fn gaussian_peak_and_tail() {
        let g = Membership::Gaussian { mean: 250.0, sigma: 30.0 };
        assert!(close(g.degree(250.0), 1.0));
        assert!((g.degree(280.0) - (-0.5f64).exp()).abs() < 1e-12);
    }

    #[test]
    fn auto_partition_three_terms() {
        let v = Variable::auto("age", 0.0, 100.0, &["Young", "Middle", "Old"]);
        assert_eq!(
            v.term("Young"),
            Some(Membership::Triangle { a: -50.0, b: 0.0, c: 50.0 })
        );
        assert!(close(v.degree("Young", 0.0), 1.0));
        assert!(close(v.degree("Middle", 50.0), 1.0));
        assert!(close(v.degree("Old", 75.0), 0.5));
        assert!(close(v.degree("Young", 25.0), 0.5));
    }

    #[test]
    fn auto_partition_four_terms() {
        let v = Variable::auto("cp", 0.0, 3.0, &["Typical", "Atypical", "Non-anginal", "Asymptomatic"]);
        assert!(close(v.degree("Asymptomatic", 3.0), 1.0));
        assert!(close(v.degree("Asymptomatic", 2.0), 0.0));
        assert!(close(v.degree("Atypical", 1.0), 1.0));
        assert!(close(v.degree("Atypical", 1.5), 0.5));
    }

    #[test]
    fn degree_clamps_to_universe_and_ignores_unknown_terms() {
        let v = Variable::auto("x", 0.0, 10.0, &["Low", "High"]);
        assert!(close(v.degree("High", 50.0), 1.0));
        assert!(close(v.degree("Missing", 5.0), 0.0));
        assert_eq!(v.term_names().collect::<Vec<_>>(), vec!["Low", "High"]);
    }
}
